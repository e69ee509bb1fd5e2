//! Channel-definition configuration.
//!
//! Channel definitions arrive as plain data: from an external configuration
//! system in production, from TOML `[[channel]]` tables in tests and tools.
//! All semantic validation (type grammar, address conversion, thresholds)
//! happens in channel construction, not here.
//!
//! # Example
//!
//! ```toml
//! [[channel]]
//! name = "temp0"
//! data_type = "double"
//! address = "0x1000"
//! alarms_enabled = true
//! hi = "100.0"
//! hihi = "200.0"
//! latch_alarms = true
//! ```

use crate::error::Result;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

fn default_delay() -> u64 {
    1
}

fn default_save_path() -> PathBuf {
    PathBuf::from(".")
}

/// Static definition of one slow-controls channel.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Channel name, unique within its front-end.
    pub name: String,
    /// Textual data-type spec (see [`crate::types::SampleType`]).
    pub data_type: String,
    /// Hardware address text, decimal or `0x`-prefixed hex.
    pub address: String,
    /// Bit offset of the value within the raw read buffer.
    #[serde(default)]
    pub bit_offset: u32,
    /// Whether the hardware point is readable.
    #[serde(default = "default_true")]
    pub read_access: bool,
    /// Whether the hardware point is writable.
    #[serde(default)]
    pub write_access: bool,
    /// Whether samples feed the live-monitor transmit stream.
    #[serde(default = "default_true")]
    pub monitoring_enabled: bool,
    /// Suppress encoding when a sample equals the previous one.
    #[serde(default)]
    pub record_changes_only: bool,
    /// Seconds between samples; values below 1 clamp up to 1.
    #[serde(default = "default_delay")]
    pub delay_between_samples: u64,
    /// Whether the channel keeps its own save file.
    #[serde(default)]
    pub save_enabled: bool,
    /// Directory for the per-channel save file.
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,
    /// File-name prefix for the per-channel save file.
    #[serde(default)]
    pub save_file_radix: String,
    /// Binary (`.dat`) instead of text (`.txt`) save format.
    #[serde(default)]
    pub save_binary_format: bool,
    /// Whether the four alarm levels are evaluated.
    #[serde(default)]
    pub alarms_enabled: bool,
    /// Whether a fired alarm level stays latched until cleared.
    #[serde(default)]
    pub latch_alarms: bool,
    /// Low-low threshold text; required when alarms are enabled.
    #[serde(default)]
    pub lolo: String,
    /// Low threshold text; required when alarms are enabled.
    #[serde(default)]
    pub lo: String,
    /// High threshold text; required when alarms are enabled.
    #[serde(default)]
    pub hi: String,
    /// High-high threshold text; required when alarms are enabled.
    #[serde(default)]
    pub hihi: String,
}

impl ChannelConfig {
    /// A definition with the three required fields set and every optional
    /// field at its deserialization default.
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            address: address.into(),
            bit_offset: 0,
            read_access: true,
            write_access: false,
            monitoring_enabled: true,
            record_changes_only: false,
            delay_between_samples: default_delay(),
            save_enabled: false,
            save_path: default_save_path(),
            save_file_radix: String::new(),
            save_binary_format: false,
            alarms_enabled: false,
            latch_alarms: false,
            lolo: String::new(),
            lo: String::new(),
            hi: String::new(),
            hihi: String::new(),
        }
    }
}

/// A set of channel definitions for one front-end.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlowControlsConfig {
    /// The `[[channel]]` tables.
    #[serde(default, rename = "channel")]
    pub channels: Vec<ChannelConfig>,
}

impl SlowControlsConfig {
    /// Parse a TOML document of `[[channel]]` tables.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load and parse a TOML file of `[[channel]]` tables.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read channel config {:?}", path))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("failed to parse channel config {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_channel_table() {
        let config = SlowControlsConfig::from_toml_str(
            r#"
            [[channel]]
            name = "temp0"
            data_type = "int"
            address = "0x10"
            "#,
        )
        .unwrap();

        assert_eq!(config.channels.len(), 1);
        let ch = &config.channels[0];
        assert_eq!(ch.name, "temp0");
        assert_eq!(ch.data_type, "int");
        assert_eq!(ch.address, "0x10");
        assert!(ch.read_access, "read access defaults on");
        assert!(ch.monitoring_enabled, "monitoring defaults on");
        assert!(!ch.alarms_enabled);
        assert_eq!(ch.delay_between_samples, 1);
    }

    #[test]
    fn test_full_channel_table() {
        let config = SlowControlsConfig::from_toml_str(
            r#"
            [[channel]]
            name = "pressure"
            data_type = "double"
            address = "0x2000"
            bit_offset = 0
            record_changes_only = true
            delay_between_samples = 5
            save_enabled = true
            save_path = "/tmp/slowctl"
            save_file_radix = "pressure"
            save_binary_format = true
            alarms_enabled = true
            latch_alarms = true
            lolo = "0.5"
            lo = "1.0"
            hi = "9.0"
            hihi = "9.5"

            [[channel]]
            name = "status_bits"
            data_type = "12b"
            address = "64"
            "#,
        )
        .unwrap();

        assert_eq!(config.channels.len(), 2);
        let ch = &config.channels[0];
        assert!(ch.alarms_enabled && ch.latch_alarms);
        assert_eq!(ch.hi, "9.0");
        assert_eq!(ch.save_path, PathBuf::from("/tmp/slowctl"));
        assert_eq!(config.channels[1].data_type, "12b");
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let err = SlowControlsConfig::from_toml_str(
            r#"
            [[channel]]
            name = "incomplete"
            data_type = "int"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("address"));
    }
}
