//! Engine Configuration
//!
//! Tunables for the orchestrator and the pure transforms it drives. Every
//! field has a default, so an empty JSON object is a valid config.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigResult};
use crate::ot::compose::COMPOSE_WINDOW_MS;
use crate::ot::resolver::CONFLICT_WINDOW;
use crate::ot::transform::CITATION_PROXIMITY;
use crate::ot::{Composer, MissedOrdering, TransformPipeline};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Max gap between composable operations (default: 5000)
    #[serde(default = "default_compose_window_ms")]
    pub compose_window_ms: i64,

    /// Offset distance under which pending operations contend (default: 5)
    #[serde(default = "default_conflict_window")]
    pub conflict_window: i64,

    /// Offset distance under which two citations collide (default: 5)
    #[serde(default = "default_citation_proximity")]
    pub citation_proximity: i64,

    /// Fold order for missed operations (default: "timestamp")
    #[serde(default)]
    pub missed_ordering: MissedOrdering,

    /// Compare-and-swap attempts before giving up (default: 3)
    #[serde(default = "default_max_apply_retries")]
    pub max_apply_retries: u32,

    /// Buffered events per subscriber (default: 256)
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_compose_window_ms() -> i64 {
    COMPOSE_WINDOW_MS
}

fn default_conflict_window() -> i64 {
    CONFLICT_WINDOW
}

fn default_citation_proximity() -> i64 {
    CITATION_PROXIMITY
}

fn default_max_apply_retries() -> u32 {
    3
}

fn default_event_channel_capacity() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compose_window_ms: default_compose_window_ms(),
            conflict_window: default_conflict_window(),
            citation_proximity: default_citation_proximity(),
            missed_ordering: MissedOrdering::default(),
            max_apply_retries: default_max_apply_retries(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl EngineConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from JSON text
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.compose_window_ms < 0 {
            return Err(ConfigError::Invalid(
                "compose_window_ms must be >= 0".to_string(),
            ));
        }
        if self.conflict_window <= 0 {
            return Err(ConfigError::Invalid("conflict_window must be > 0".to_string()));
        }
        if self.citation_proximity < 0 {
            return Err(ConfigError::Invalid(
                "citation_proximity must be >= 0".to_string(),
            ));
        }
        if self.max_apply_retries == 0 {
            return Err(ConfigError::Invalid(
                "max_apply_retries must be > 0".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_channel_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Transform pipeline configured from this config
    pub fn pipeline(&self) -> TransformPipeline {
        TransformPipeline::new(self.missed_ordering, self.citation_proximity)
    }

    /// Composer configured from this config
    pub fn composer(&self) -> Composer {
        Composer::with_window_ms(self.compose_window_ms)
    }
}
