//! # Configuration Management
//!
//! This module handles loading configuration from the clock-config.toml file.
//! Every setting has a compiled-in default, so the clock runs without any
//! file at all; a file only needs the sections it wants to override. The
//! configuration is read once at startup and never written back.

use crate::timezone::TimezonePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Default configuration file, relative to the working directory
pub const CONFIG_FILE: &str = "clock-config.toml";

/// Application configuration loaded from clock-config.toml
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Main loop period in milliseconds
    pub tick_millis: u64,
    /// How long the "connected" icon stays up after a reconnect
    pub icon_hold_millis: u64,
    /// Time server settings
    pub ntp: NtpConfig,
    /// Application-level resync cadence
    pub sync: SyncConfig,
    /// Summer and winter rules for local time
    pub timezone: TimezonePolicy,
    /// LED matrix settings
    pub display: DisplayConfig,
    /// Wireless connection settings
    pub network: NetworkConfig,
}

/// NTP server and request settings
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NtpConfig {
    /// Time server hostname (pick a pool close to you, see ntp.org)
    pub server: String,
    pub port: u16,
    /// Upper bound on one request/response exchange
    pub timeout_ms: u64,
    /// Minimum spacing between successful network exchanges
    pub retry_interval_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between application-level time refreshes
    pub interval_secs: u64,
}

/// HT16K33 LED matrix configuration
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// I2C character device
    pub i2c_bus: String,
    /// 7-bit I2C address of the backpack
    pub address: u8,
    /// 0 (dimmest) to 15 (brightest)
    pub brightness: u8,
    /// Quarter turns applied to the whole image, 1 or 3 (the two landscape mountings)
    pub rotation: u8,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// NetworkManager connection profile to bring up
    pub connection: String,
    /// Upper bound on one reconnect attempt
    pub connect_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tick_millis: 1000,
            icon_hold_millis: 1000,
            ntp: NtpConfig::default(),
            sync: SyncConfig::default(),
            timezone: TimezonePolicy::us_eastern(),
            display: DisplayConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl Default for NtpConfig {
    fn default() -> Self {
        NtpConfig {
            server: "ca.pool.ntp.org".to_string(),
            port: 123,
            timeout_ms: 1000,
            retry_interval_secs: 60,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig { interval_secs: 300 }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            i2c_bus: "/dev/i2c-1".to_string(),
            address: 0x70,
            brightness: 8,
            rotation: 1,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            connection: "clock".to_string(),
            connect_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from clock-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => match config.timezone.validate() {
                    Ok(()) => {
                        info!(
                            path = %path.display(),
                            server = %config.ntp.server,
                            "loaded configuration"
                        );
                        config
                    }
                    Err(e) => {
                        warn!(%e, "invalid timezone rules, using default configuration");
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!(%e, "invalid config file format, using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using default configuration");
                Self::default()
            }
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn icon_hold(&self) -> Duration {
        Duration::from_millis(self.icon_hold_millis)
    }
}
