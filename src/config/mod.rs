//! # Configuration Management Module
//!
//! This module handles all configuration aspects of the Meshbbs system, providing
//! a centralized configuration system with validation, defaults, and persistence.
//!
//! ## Features
//!
//! - **Structured Configuration**: Type-safe configuration with serde serialization
//! - **Validation**: Comprehensive validation of all configuration values
//! - **Defaults**: Sensible default values for all configuration options
//! - **Hot Reloading**: Support for runtime configuration updates
//! - **Environment Integration**: Integration with environment variables and CLI args
//!
//! ## Configuration Structure
//!
//! The configuration is organized into logical sections:
//!
//! - [`BbsConfig`] - Core BBS settings (name, sysop, limits)
//! - [`MeshtasticConfig`] - Device communication settings
//! - [`StorageConfig`] - Data persistence settings
//! - [`MessageTopicConfig`] - Individual message topic configuration
//! - [`LoggingConfig`] - Logging and debugging settings
//! - [`SecurityConfig`] - Security and authentication parameters
//!
//! ## Usage
//!
//! ```rust,no_run
//! use meshbbs::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration from file
//!     let config = Config::load("config.toml").await?;
//!     
//!     // Access configuration sections
//!     println!("BBS Name: {}", config.bbs.name);
//!     println!("Serial Port: {}", config.meshtastic.port);
//!     
//!     // Create default configuration
//!     Config::create_default("config.toml").await?;
//!     
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! Meshbbs uses TOML format for human-readable configuration:
//!
//! ```toml
//! [bbs]
//! name = "My Mesh BBS"
//! sysop = "sysop"
//! location = "Mesh Network"
//! max_users = 100
//! session_timeout = 10
//!
//! [meshtastic]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//! channel = 0
//!
//! # Note: message topics are initialized into data/topics.json during `meshbbs init`
//! ```
//!
//! ## Validation and Security
//!
//! - **Input Validation**: All configuration values are validated on load
//! - **Type Safety**: Strong typing prevents configuration errors
//! - **Secure Defaults**: Default values are chosen for security and stability
//! - **Sanitization**: String values are sanitized to prevent injection attacks
//!
//! ## Environment Integration
//!
//! Configuration values can be overridden via environment variables and CLI arguments,
//! following a clear precedence order: CLI args > Environment > Config file > Defaults

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::fs;

/// Main configuration structure

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BbsConfig {
    pub name: String,
    pub sysop: String,
    pub location: String,
    pub description: String,
    pub max_users: u32,
    pub session_timeout: u32, // minutes
    pub welcome_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sysop_password_hash: Option<String>,
    /// Public command prefix. Must be one of a hard-coded allowed set for safety.
    /// Examples: "^", "!", "+", "$", "/", ">". If unset or invalid, defaults to "^".
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "public_command_prefixes"
    )]
    pub public_command_prefix: Option<String>,
    /// Allow public channel LOGIN command. When false, users must initiate login via DM only.
    /// Defaults to true for backwards compatibility. Set to false for enhanced security.
    #[serde(default = "default_allow_public_login")]
    pub allow_public_login: bool,
    /// Public help command keyword. Must be one of: "HELP", "MENU", "INFO".
    /// Defaults to "HELP" if unset or invalid.
    #[serde(default = "default_help_command")]
    pub help_command: String,
}

fn default_allow_public_login() -> bool {
    true
}

fn default_help_command() -> String {
    "HELP".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bbs: BbsConfig,
    pub meshtastic: MeshtasticConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub message_topics: HashMap<String, MessageTopicConfig>,
    pub logging: LoggingConfig,
    pub security: Option<SecurityConfig>,
    #[serde(default)]
    pub ident_beacon: IdentBeaconConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Feature toggles for built-in mini-games and doors
    #[serde(default)]
    pub games: GamesConfig,
    /// New user welcome system
    #[serde(default)]
    pub welcome: crate::bbs::welcome::WelcomeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshtasticConfig {
    pub port: String,
    pub baud_rate: u32,
    #[serde(default)]
    pub node_id: String,
    pub channel: u8,
    /// Require device to be available at startup. If true and device connection fails,
    /// the BBS will exit with an error code. If false (default), the BBS will start
    /// without a device connection (useful for testing or alternative transport methods).
    /// Applies to all transport types: serial, Bluetooth, TCP/UDP.
    #[serde(default)]
    pub require_device_at_startup: bool,
    /// Minimum gap between consecutive text sends (ms). Must be >= 2000ms.
    #[serde(default)]
    pub min_send_gap_ms: Option<u64>,
    /// Retransmit backoff schedule in seconds, e.g. [4, 8, 16]
    #[serde(default)]
    pub dm_resend_backoff_seconds: Option<Vec<u64>>,
    /// Additional pacing delay for a broadcast sent immediately after a reliable DM (ms)
    #[serde(default)]
    pub post_dm_broadcast_gap_ms: Option<u64>,
    /// Minimum gap between two consecutive reliable DMs (ms)
    #[serde(default)]
    pub dm_to_dm_gap_ms: Option<u64>,
    /// Delay before sending the public HELP broadcast after the DM is queued (ms). This is a higher-level
    /// scheduling cushion to avoid immediate RateLimitExceeded following a reliable DM. If unset, defaults
    /// to 3500ms. Must be >= post_dm_broadcast_gap_ms.
    #[serde(default)]
    pub help_broadcast_delay_ms: Option<u64>,
    /// Maximum number of queued outbound messages in scheduler before drop policy engages.
    #[serde(default)]
    pub scheduler_max_queue: Option<usize>,
    /// Aging threshold (ms) after which a waiting message may have its effective priority boosted.
    #[serde(default)]
    pub scheduler_aging_threshold_ms: Option<u64>,
    /// Interval (ms) for periodic scheduler stats logging (0 disables periodic stats logs).
    #[serde(default)]
    pub scheduler_stats_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    pub max_message_size: usize,
    /// Add [n/total] chunk markers to multi-part messages to help detect out-of-order delivery
    #[serde(default)]
    pub show_chunk_markers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTopicConfig {
    pub name: String,
    pub description: String,
    pub read_level: u8,
    pub post_level: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default)]
    pub security_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GamesConfig {
    /// Enable the TinyHack mini-game in the Games submenu.
    #[serde(default)]
    pub tinyhack_enabled: bool,
    /// Surface the upcoming TinyMUSH experience in the Games submenu.
    #[serde(default)]
    pub tinymush_enabled: bool,
    /// Optional override for TinyMUSH Sled database path; defaults to `<data_dir>/tinymush`.
    #[serde(default)]
    pub tinymush_db_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Argon2Config {
    #[serde(default)]
    pub memory_kib: Option<u32>,
    #[serde(default)]
    pub time_cost: Option<u32>,
    #[serde(default)]
    pub parallelism: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    #[serde(default)]
    pub argon2: Option<Argon2Config>,
}

/// Configuration for the periodic station identification beacon.
///
/// The ident beacon broadcasts a message to the public channel on a UTC schedule.
/// Supported frequencies: "5min", "15min" (default), "30min", "1hour", "2hours", "4hours".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentBeaconConfig {
    pub enabled: bool,
    pub frequency: String,
}

impl Default for IdentBeaconConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: "15min".to_string(),
        }
    }
}

impl IdentBeaconConfig {
    /// Convert frequency string to minutes.
    ///
    /// Returns one of: 5, 15, 30, 60, 120, 240. Invalid values default to 15.
    pub fn frequency_minutes(&self) -> u32 {
        match self.frequency.as_str() {
            "5min" => 5,
            "15min" => 15,
            "30min" => 30,
            "1hour" => 60,
            "2hours" => 120,
            "4hours" => 240,
            _ => {
                eprintln!(
                    "Invalid ident beacon frequency '{}', defaulting to 15min",
                    self.frequency
                );
                15
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key
    pub api_key: String,
    /// Default location for weather queries (city name, zipcode, or city ID)
    pub default_location: String,
    /// Location type: "city", "zipcode", or "city_id"
    pub location_type: String,
    /// Country code for zipcode lookups (e.g., "US", "GB")
    pub country_code: Option<String>,
    /// Cache TTL in minutes
    pub cache_ttl_minutes: u32,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// Enable/disable weather functionality
    pub enabled: bool,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            default_location: "Los Angeles".to_string(),
            location_type: "city".to_string(),
            country_code: Some("US".to_string()),
            cache_ttl_minutes: 10,
            timeout_seconds: 5,
            enabled: false, // Disabled by default until API key is provided
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut message_topics = HashMap::new();

        message_topics.insert(
            "general".to_string(),
            MessageTopicConfig {
                name: "General".to_string(),
                description: "General discussions".to_string(),
                read_level: 0,
                post_level: 0,
            },
        );

        message_topics.insert(
            "community".to_string(),
            MessageTopicConfig {
                name: "Community".to_string(),
                description: "Events, meet-ups, and community discussions".to_string(),
                read_level: 0,
                post_level: 0,
            },
        );

        message_topics.insert(
            "technical".to_string(),
            MessageTopicConfig {
                name: "Technical".to_string(),
                description: "Tech, hardware, and administrative discussions".to_string(),
                read_level: 0,
                post_level: 0,
            },
        );

        Config {
            bbs: BbsConfig {
                name: "meshbbs Station".to_string(),
                sysop: "sysop".to_string(),
                location: "Your Location".to_string(),
                description: "A bulletin board system for mesh networks".to_string(),
                max_users: 100,
                session_timeout: 10,
                welcome_message: "".to_string(),
                sysop_password_hash: None,
                public_command_prefix: Some("^".to_string()),
                allow_public_login: true,
                help_command: "HELP".to_string(),
            },
            meshtastic: MeshtasticConfig {
                port: "/dev/ttyUSB0".to_string(),
                baud_rate: 115200,
                node_id: "".to_string(),
                channel: 0,
                require_device_at_startup: false,
                min_send_gap_ms: Some(2000),
                dm_resend_backoff_seconds: Some(vec![4, 8, 16]),
                post_dm_broadcast_gap_ms: Some(1200),
                dm_to_dm_gap_ms: Some(600),
                help_broadcast_delay_ms: Some(3500),
                scheduler_max_queue: Some(512),
                scheduler_aging_threshold_ms: Some(5000),
                scheduler_stats_interval_ms: Some(10000),
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                max_message_size: 200, // Reduced from 230 to account for ~30 bytes Meshtastic protocol overhead
                show_chunk_markers: false, // Set to true to add [n/total] markers for debugging out-of-order delivery
            },
            message_topics,
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("meshbbs.log".to_string()),
                security_file: Some("meshbbs-security.log".to_string()),
            },
            security: Some(SecurityConfig::default()),
            ident_beacon: IdentBeaconConfig::default(),
            weather: WeatherConfig::default(),
            games: GamesConfig::default(),
            welcome: crate::bbs::welcome::WelcomeConfig {
                enabled: false,
                public_greeting: true,
                private_guide: true,
                cooldown_minutes: 5,
                max_welcomes_per_node: 1,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_beacon_config_default() {
        let config = IdentBeaconConfig::default();
        assert_eq!(config.enabled, true);
        assert_eq!(config.frequency, "15min");
    }

    #[test]
    fn test_ident_beacon_frequency_minutes_valid() {
        let test_cases = vec![
            ("5min", 5),
            ("15min", 15),
            ("30min", 30),
            ("1hour", 60),
            ("2hours", 120),
            ("4hours", 240),
        ];

        for (frequency, expected_minutes) in test_cases {
            let config = IdentBeaconConfig {
                enabled: true,
                frequency: frequency.to_string(),
            };
            assert_eq!(
                config.frequency_minutes(),
                expected_minutes,
                "Expected {} to convert to {} minutes",
                frequency,
                expected_minutes
            );
        }
    }

    #[test]
    fn test_ident_beacon_frequency_minutes_invalid() {
        let invalid_frequencies = vec!["invalid", "10hours", "", "60min", "30mins", "1hr"];

        for invalid_freq in invalid_frequencies {
            let config = IdentBeaconConfig {
                enabled: true,
                frequency: invalid_freq.to_string(),
            };
            // Invalid frequencies should default to 15 minutes
            assert_eq!(
                config.frequency_minutes(),
                15,
                "Expected invalid frequency '{}' to default to 15 minutes",
                invalid_freq
            );
        }
    }

    #[test]
    fn test_ident_beacon_disabled() {
        let config = IdentBeaconConfig {
            enabled: false,
            frequency: "30min".to_string(),
        };
        assert_eq!(config.enabled, false);
        assert_eq!(config.frequency_minutes(), 30);
    }

    #[test]
    fn test_ident_beacon_config_serde() {
        let config = IdentBeaconConfig {
            enabled: true,
            frequency: "1hour".to_string(),
        };

        // Test serialization
        let serialized = serde_json::to_string(&config).unwrap();
        assert!(serialized.contains("\"enabled\":true"));
        assert!(serialized.contains("\"frequency\":\"1hour\""));

        // Test deserialization
        let deserialized: IdentBeaconConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.enabled, config.enabled);
        assert_eq!(deserialized.frequency, config.frequency);
    }

    #[test]
    fn test_config_includes_ident_beacon() {
        let config = Config::default();
        assert_eq!(config.ident_beacon.enabled, true);
        assert_eq!(config.ident_beacon.frequency, "15min");
    }

    #[test]
    fn test_ident_beacon_config_clone() {
        let config = IdentBeaconConfig {
            enabled: false,
            frequency: "4hours".to_string(),
        };

        let cloned = config.clone();
        assert_eq!(cloned.enabled, config.enabled);
        assert_eq!(cloned.frequency, config.frequency);
        assert_eq!(cloned.frequency_minutes(), 240);
    }
}
