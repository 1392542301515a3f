//! Mock hardware and transport for integration tests.
//!
//! Records every publish and every relay drive so tests can assert on the
//! full history without touching GPIO or a broker.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use homeguard::app::events::{Measurement, RelayState};
use homeguard::app::ports::{RelayPort, SensorPort, StorageError, StoragePort, TransportPort};
use homeguard::error::{ActuatorError, SensorError, TransportError};

// ── ScriptedSensor ────────────────────────────────────────────

/// Replays queued results; repeats the last one when the script runs out.
pub struct ScriptedSensor {
    script: VecDeque<Result<Measurement, SensorError>>,
    last: Result<Measurement, SensorError>,
    pub samples: u32,
}

#[allow(dead_code)]
impl ScriptedSensor {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            last: Err(SensorError::Timeout),
            samples: 0,
        }
    }

    pub fn steady(temperature: f32, humidity: f32) -> Self {
        let mut s = Self::new();
        s.last = Ok(Measurement {
            temperature,
            humidity,
        });
        s
    }

    pub fn then(mut self, temperature: f32, humidity: f32) -> Self {
        self.script.push_back(Ok(Measurement {
            temperature,
            humidity,
        }));
        self
    }

    pub fn then_fail(mut self, e: SensorError) -> Self {
        self.script.push_back(Err(e));
        self
    }
}

impl SensorPort for ScriptedSensor {
    fn sample(&mut self) -> Result<Measurement, SensorError> {
        self.samples += 1;
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last
    }
}

// ── MockRelay ─────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockRelay {
    pub level: Option<RelayState>,
    /// Output ignores drives and stays here.
    pub stuck: Option<RelayState>,
    pub fail_writes: bool,
    pub drives: Vec<RelayState>,
}

#[allow(dead_code)]
impl MockRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stuck_at(state: RelayState) -> Self {
        Self {
            stuck: Some(state),
            level: Some(state),
            ..Self::default()
        }
    }
}

impl RelayPort for MockRelay {
    fn drive(&mut self, state: RelayState) -> Result<(), ActuatorError> {
        self.drives.push(state);
        if self.fail_writes {
            return Err(ActuatorError::GpioWriteFailed);
        }
        self.level = Some(self.stuck.unwrap_or(state));
        Ok(())
    }

    fn observe(&mut self) -> Option<RelayState> {
        self.level
    }
}

// ── RecordingTransport ────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[allow(dead_code)]
impl Published {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.payload).expect("payload is JSON")
    }
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub published: Vec<Published>,
    pub subscriptions: Vec<String>,
    pub reject_publish: bool,
    pub rssi: Option<i8>,
}

#[allow(dead_code)]
impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published on `topic`, oldest first.
    pub fn on(&self, topic: &str) -> Vec<&Published> {
        self.published.iter().filter(|p| p.topic == topic).collect()
    }

    pub fn last_on(&self, topic: &str) -> Option<&Published> {
        self.published.iter().rev().find(|p| p.topic == topic)
    }

    pub fn clear(&mut self) {
        self.published.clear();
    }
}

impl TransportPort for RecordingTransport {
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), TransportError> {
        if self.reject_publish {
            return Err(TransportError::PublishRejected);
        }
        self.published.push(Published {
            topic: topic.to_string(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            retain,
        });
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn signal_strength(&self) -> Option<i8> {
        self.rssi
    }
}

// ── SharedStorage ─────────────────────────────────────────────

/// In-memory flash that outlives the node owning it, to simulate reboots.
#[derive(Debug, Clone, Default)]
pub struct SharedStorage(Rc<RefCell<HashMap<(String, String), Vec<u8>>>>);

#[allow(dead_code)]
impl SharedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> usize {
        self.0.borrow().len()
    }
}

impl StoragePort for SharedStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let map = self.0.borrow();
        let data = map
            .get(&(namespace.to_string(), key.to_string()))
            .ok_or(StorageError::NotFound)?;
        if data.len() > buf.len() {
            return Err(StorageError::BufferTooSmall);
        }
        buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.0
            .borrow_mut()
            .insert((namespace.to_string(), key.to_string()), data.to_vec());
        Ok(())
    }
}
