//! HomeGuard node firmware: main entry point.
//!
//! One binary, two roles. The node config stored in NVS (or, on a blank
//! board, the registry entry for the build-time device id) decides whether
//! this board runs the DHT11 sensor core or the relay core.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  MqttTransport     NvsStore        MonotonicClock   WiFi STA   │
//! │  (TransportPort)   (Config+Storage)(Clock)          (startup)  │
//! │  Dht11 / RelayDriver (SensorPort / RelayPort)                  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │        SensorNode | RelayNode  (pure logic)            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  runtime::block_on_node · Inbox (embassy-sync channel)         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::Ets;
use esp_idf_svc::hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use log::{info, warn};

use homeguard::adapters::mqtt::MqttTransport;
use homeguard::adapters::nvs::NvsStore;
use homeguard::adapters::time::MonotonicClock;
use homeguard::adapters::wifi;
use homeguard::app::ports::ConfigPort;
use homeguard::app::relay_service::RelayNode;
use homeguard::app::sensor_service::SensorNode;
use homeguard::config::{NodeConfig, NodeRole};
use homeguard::drivers::dht11::Dht11;
use homeguard::drivers::relay::RelayDriver;
use homeguard::mqtt::channels::Inbox;
use homeguard::{pins, registry, runtime};

/// Events from the MQTT client thread to the node loop.
static INBOX: Inbox = Inbox::new();

// ── Build-time provisioning ───────────────────────────────────

/// Replace `dst` with a build-time value when one was provided.
fn override_from<const N: usize>(dst: &mut heapless::String<N>, var: &str, value: Option<&str>) {
    let Some(v) = value else { return };
    match heapless::String::try_from(v) {
        Ok(s) => *dst = s,
        Err(()) => warn!("{} longer than {} bytes, ignored", var, N),
    }
}

/// Apply build-time credentials to a registry-derived config.
fn apply_build_env(cfg: &mut NodeConfig) {
    override_from(&mut cfg.wifi.ssid, "HOMEGUARD_WIFI_SSID", option_env!("HOMEGUARD_WIFI_SSID"));
    override_from(&mut cfg.wifi.password, "HOMEGUARD_WIFI_PASS", option_env!("HOMEGUARD_WIFI_PASS"));
    override_from(&mut cfg.broker.host, "HOMEGUARD_MQTT_HOST", option_env!("HOMEGUARD_MQTT_HOST"));
    override_from(&mut cfg.broker.password, "HOMEGUARD_MQTT_PASS", option_env!("HOMEGUARD_MQTT_PASS"));
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  HomeGuard node v{}                  ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Identity + config ──────────────────────────────────
    // A provisioned config in NVS wins, so one image serves every board.
    // The build-time device id only seeds a blank board.
    let nvs = NvsStore::new()?;
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using registry defaults", e);
            let entry = registry::select(option_env!("HOMEGUARD_DEVICE").unwrap_or(registry::DEFAULT_SENSOR.id));
            fresh_config(&nvs, entry)
        }
    };
    let static_ip = registry::lookup(config.identity.id()).map(|e| e.static_ip);
    info!(
        "Device {} \"{}\" @ {} as {}",
        config.identity.id(),
        config.identity.name(),
        config.identity.location(),
        config.role
    );

    // ── 3. Network ────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let _wifi = wifi::connect_station(
        peripherals.modem,
        sys_loop,
        &config.wifi,
        static_ip,
    )?;
    let mut transport = MqttTransport::connect(&config, &INBOX)?;
    let clock = MonotonicClock::new();

    // ── 4. Role-specific core ─────────────────────────────────
    match config.role {
        NodeRole::Sensor => {
            // SAFETY: the DHT pin is not claimed anywhere else.
            let pin = PinDriver::input_output_od(unsafe { AnyIOPin::new(pins::DHT_GPIO) })?;
            let sensor = Dht11::new(pin, Ets, MonotonicClock::new()).map_err(homeguard::error::Error::from)?;
            let mut node = SensorNode::new(&config, sensor);
            runtime::block_on_node(&mut node, &mut transport, &INBOX, &clock);
        }
        NodeRole::Relay => {
            // SAFETY: the relay pin is not claimed anywhere else.
            let pin = PinDriver::output(unsafe { AnyIOPin::new(pins::RELAY_GPIO) })?;
            let relay = RelayDriver::new(pin, config.relay.active_low);
            let mut node = RelayNode::with_storage(&config, relay, Box::new(NvsStore::new()?));
            runtime::block_on_node(&mut node, &mut transport, &INBOX, &clock);
        }
    }

    warn!("node loop exited, restarting");
    esp_idf_svc::hal::reset::restart();
}

/// Registry defaults plus build-time credentials, persisted for next boot.
fn fresh_config(nvs: &NvsStore, entry: &registry::RegistryEntry) -> NodeConfig {
    let mut cfg = entry.to_config();
    apply_build_env(&mut cfg);
    if let Err(e) = nvs.save(&cfg) {
        warn!("Config not persisted: {}", e);
    }
    cfg
}
