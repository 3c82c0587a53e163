//! Engine configuration.
//!
//! Channel defaults and the timeline resolution can be loaded from a JSON
//! file. Every field is optional; missing fields take the standard MML
//! defaults (velocity 100, octave 4, quarter-note default length, full gate).

use crate::timeline::{Length, Resolution, Ticks, DEFAULT_BASE_COUNT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Initial per-channel performance state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelDefaults {
    /// MIDI channel (0-based).
    pub channel: u8,
    pub velocity: i32,
    /// Amount added or removed by one velocity increment/decrement.
    pub velocity_sensitivity: i32,
    pub octave: i32,
    pub default_length: Length,
    pub key_delay: Ticks,
    pub gate_denominator: i32,
    pub gate_relative: i32,
    pub gate_absolute: Ticks,
    pub transpose: i32,
}

impl Default for ChannelDefaults {
    fn default() -> Self {
        Self {
            channel: 0,
            velocity: 100,
            velocity_sensitivity: 4,
            octave: 4,
            default_length: Length::QUARTER,
            key_delay: 0,
            gate_denominator: 8,
            gate_relative: 8,
            gate_absolute: 0,
            transpose: 0,
        }
    }
}

/// Top-level configuration for a track controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ticks per whole note.
    pub base_count: Ticks,
    pub channel: ChannelDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_count: DEFAULT_BASE_COUNT,
            channel: ChannelDefaults::default(),
        }
    }
}

impl EngineConfig {
    /// Timeline resolution described by this configuration.
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.base_count)
    }

    /// Serializes the configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if file reading or parsing fails
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.base_count, 192);
        assert_eq!(config.channel.velocity, 100);
        assert_eq!(config.channel.gate_relative, 8);
        assert_eq!(config.channel.gate_denominator, 8);
        assert_eq!(config.resolution().to_ticks(config.channel.default_length), 48);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = EngineConfig::from_json(r#"{ "channel": { "velocity": 90, "octave": 5 } }"#)
            .unwrap();
        assert_eq!(config.base_count, 192);
        assert_eq!(config.channel.velocity, 90);
        assert_eq!(config.channel.octave, 5);
        assert_eq!(config.channel.velocity_sensitivity, 4);
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = EngineConfig::default();
        config.base_count = 480;
        config.channel.default_length = Length(8);
        let json = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(EngineConfig::load_from_file("/nonexistent/mmlengine.json").is_err());
    }
}
