//! WiFi station-mode adapter.
//!
//! Brings the station up once at startup and reports signal strength.
//! Reconnection is left to the ESP-IDF driver; the node only learns about
//! link loss through the MQTT client's `Disconnected` event.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: validation only, RSSI is unknown.

use core::fmt;

use crate::config::WifiConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

/// Check station credentials before handing them to the driver.
pub fn validate_credentials(cfg: &WifiConfig) -> Result<(), ConnectivityError> {
    if cfg.ssid.is_empty() {
        return Err(ConnectivityError::NoCredentials);
    }
    validate_ssid(&cfg.ssid)?;
    validate_password(&cfg.password)
}

/// Dotted-quad rendering for logs.
pub fn format_ip(ip: [u8; 4]) -> heapless::String<15> {
    let mut s = heapless::String::new();
    let _ = core::fmt::Write::write_fmt(&mut s, format_args!("{}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]));
    s
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF station
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use std::net::Ipv4Addr;

    use anyhow::{Context, anyhow};
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::ipv4::{
        ClientConfiguration as IpClientConfiguration, ClientSettings as IpClientSettings,
        Configuration as IpConfiguration, Mask, Subnet,
    };
    use esp_idf_svc::netif::{EspNetif, NetifConfiguration};
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::{info, warn};

    use super::{format_ip, validate_credentials};
    use crate::config::WifiConfig;
    use crate::registry::GATEWAY;

    const CONNECT_ATTEMPTS: u32 = 5;
    const RETRY_DELAY_MS: u64 = 3_000;

    /// Associate with the access point and wait for the interface to come up.
    ///
    /// `static_ip` replaces DHCP with a fixed /24 address on the home network.
    pub fn connect_station(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        cfg: &WifiConfig,
        static_ip: Option<[u8; 4]>,
    ) -> anyhow::Result<EspWifi<'static>> {
        validate_credentials(cfg).map_err(|e| anyhow!("{e}"))?;

        let mut esp_wifi = EspWifi::new(modem, sys_loop.clone(), None)?;

        if let Some(ip) = static_ip {
            let conf = NetifConfiguration {
                ip_configuration: Some(IpConfiguration::Client(IpClientConfiguration::Fixed(
                    IpClientSettings {
                        ip: Ipv4Addr::from(ip),
                        subnet: Subnet {
                            gateway: Ipv4Addr::from(GATEWAY),
                            mask: Mask(24),
                        },
                        dns: Some(Ipv4Addr::from(GATEWAY)),
                        secondary_dns: None,
                    },
                ))),
                ..NetifConfiguration::wifi_default_client()
            };
            let netif = EspNetif::new_with_conf(&conf).context("static IP netif")?;
            esp_wifi.swap_netif_sta(netif).context("apply static IP")?;
            info!("WiFi: static address {}", format_ip(ip));
        }

        let mut wifi = BlockingWifi::wrap(&mut esp_wifi, sys_loop)?;
        let auth_method = if cfg.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: cfg.ssid.as_str().try_into().map_err(|_| anyhow!("ssid too long"))?,
            password: cfg
                .password
                .as_str()
                .try_into()
                .map_err(|_| anyhow!("password too long"))?,
            auth_method,
            ..Default::default()
        }))?;
        wifi.start()?;
        info!("WiFi: connecting to '{}'", cfg.ssid);

        let mut last_err = None;
        for attempt in 1..=CONNECT_ATTEMPTS {
            match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
                Ok(()) => {
                    info!("WiFi: connected on attempt {} (RSSI={:?})", attempt, station_rssi());
                    last_err = None;
                    break;
                }
                Err(e) => {
                    warn!("WiFi: attempt {}/{} failed: {}", attempt, CONNECT_ATTEMPTS, e);
                    last_err = Some(e);
                    let _ = wifi.disconnect();
                    std::thread::sleep(std::time::Duration::from_millis(RETRY_DELAY_MS));
                }
            }
        }
        if let Some(e) = last_err {
            return Err(anyhow::Error::from(e).context("WiFi connection failed"));
        }
        drop(wifi);
        Ok(esp_wifi)
    }

    /// RSSI of the associated access point in dBm.
    pub fn station_rssi() -> Option<i8> {
        // SAFETY: plain C struct, all-zero is a valid value; `ap` is a valid
        // out-pointer for the duration of the call.
        let mut ap: esp_idf_svc::sys::wifi_ap_record_t = unsafe { core::mem::zeroed() };
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap) };
        (ret == esp_idf_svc::sys::ESP_OK).then_some(ap.rssi)
    }
}

#[cfg(target_os = "espidf")]
pub use esp::{connect_station, station_rssi};

/// RSSI of the associated access point. Unknown off-device.
#[cfg(not(target_os = "espidf"))]
pub fn station_rssi() -> Option<i8> {
    None
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
