//! MQTT client adapter (ESP-IDF only).
//!
//! Wraps `EspMqttClient` as a [`TransportPort`] and pumps client events
//! into the node's [`Inbox`] from a dedicated thread:
//!
//! ```text
//!   esp-mqtt task ──▶ EspMqttConnection::next() ──▶ Inbox::deliver ──▶ runtime
//!   runtime ──▶ TransportPort::publish ──▶ EspMqttClient::publish
//! ```
//!
//! The broker keeps a retained `{"status":"offline"}` last-will on the
//! node's status topic, so consumers see the node drop even when it dies
//! without a clean disconnect.
//!
//! While the session is down, publishes fail fast with
//! [`TransportError::NotConnected`] instead of filling the client outbox.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
};
use log::{debug, info, warn};

use crate::adapters::wifi;
use crate::app::ports::TransportPort;
use crate::config::NodeConfig;
use crate::error::TransportError;
use crate::mqtt::channels::{Inbox, LinkEvent};
use crate::mqtt::codec::OFFLINE_PAYLOAD;
use crate::mqtt::topics::{TopicSuffix, topic_for};

const EVENT_THREAD_STACK: usize = 6 * 1024;

/// Largest payload handed to the client outbox. Node payloads stay well
/// under 512 B.
const MAX_PUBLISH_PAYLOAD: usize = 1024;

/// Publishing half of the broker session.
pub struct MqttTransport {
    client: EspMqttClient<'static>,
    /// Mirrors the broker session, maintained by the event thread.
    connected: Arc<AtomicBool>,
}

impl MqttTransport {
    /// Open the broker session and start forwarding its events to `inbox`.
    ///
    /// Returns as soon as the client is created; the node learns that the
    /// session is up from [`LinkEvent::Connected`].
    pub fn connect(cfg: &NodeConfig, inbox: &'static Inbox) -> anyhow::Result<Self> {
        let url = format!("mqtt://{}:{}", cfg.broker.host, cfg.broker.port);
        let will_topic = topic_for(cfg.role, TopicSuffix::Status, cfg.identity.id());

        let conf = MqttClientConfiguration {
            client_id: Some(cfg.identity.id()),
            username: (!cfg.broker.username.is_empty()).then_some(cfg.broker.username.as_str()),
            password: (!cfg.broker.password.is_empty()).then_some(cfg.broker.password.as_str()),
            lwt: Some(LwtConfiguration {
                topic: &will_topic,
                payload: OFFLINE_PAYLOAD,
                qos: QoS::AtLeastOnce,
                retain: true,
            }),
            ..Default::default()
        };

        let (client, mut conn) = EspMqttClient::new(&url, &conf)?;
        info!("MQTT: client for {} created, will on {}", url, will_topic);

        let connected = Arc::new(AtomicBool::new(false));
        let link = Arc::clone(&connected);
        std::thread::Builder::new()
            .name("mqtt-events".to_string())
            .stack_size(EVENT_THREAD_STACK)
            .spawn(move || pump_events(&mut conn, inbox, &link))?;

        Ok(Self { client, connected })
    }
}

/// Forward client events until the connection object is closed.
fn pump_events(conn: &mut EspMqttConnection, inbox: &Inbox, connected: &AtomicBool) {
    while let Ok(event) = conn.next() {
        match event.payload() {
            EventPayload::Connected(_) => {
                info!("MQTT: connected");
                connected.store(true, Ordering::Release);
                inbox.deliver(LinkEvent::Connected);
            }
            EventPayload::Disconnected => {
                warn!("MQTT: disconnected");
                connected.store(false, Ordering::Release);
                inbox.deliver(LinkEvent::Disconnected);
            }
            EventPayload::Received {
                topic: Some(topic),
                data,
                ..
            } => {
                debug!("MQTT: {} B on {}", data.len(), topic);
                inbox.deliver_message(topic, data);
            }
            EventPayload::Error(e) => warn!("MQTT: {:?}", e),
            _ => {}
        }
    }
    info!("MQTT: event stream closed");
    connected.store(false, Ordering::Release);
    inbox.deliver(LinkEvent::Disconnected);
}

impl TransportPort for MqttTransport {
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected);
        }
        if payload.len() > MAX_PUBLISH_PAYLOAD {
            warn!("MQTT: {} B payload for {} exceeds {} B", payload.len(), topic, MAX_PUBLISH_PAYLOAD);
            return Err(TransportError::PayloadTooLarge);
        }
        self.client
            .enqueue(topic, QoS::AtLeastOnce, retain, payload)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: enqueue on {} failed: {}", topic, e);
                TransportError::PublishRejected
            })
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected);
        }
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: subscribe {} failed: {}", topic, e);
                TransportError::SubscribeRejected
            })
    }

    fn signal_strength(&self) -> Option<i8> {
        wifi::station_rssi()
    }
}
