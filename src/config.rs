//! Flow graph configuration.
//!
//! A [`GraphConfig`] is handed to the engine every time a graph is made.
//! It can be built in code or loaded from TOML:
//!
//! ```
//! use flowpath::GraphConfig;
//!
//! let config = GraphConfig::from_toml_str(r#"
//!     name = "scope"
//!     sample_rate = 100
//! "#).unwrap();
//! assert_eq!(config.name, "scope");
//! assert_eq!(config.message_queue_size, 64);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Default sample rate handed to blocks that don't set their own
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Default capacity of each block's parameter message queue
pub const DEFAULT_MESSAGE_QUEUE_SIZE: usize = 64;

/// Default bound for recursive signal path resolution
pub const DEFAULT_MAX_PATH_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Name given to every engine graph made from this config
    pub name: String,

    /// Sample rate in Hz passed to blocks via the process context
    pub sample_rate: u32,

    /// Capacity of the per-block parameter queue
    pub message_queue_size: usize,

    /// Maximum nesting of signal path references
    pub max_path_depth: usize,

    /// Scheduler back-off between cycles in microseconds (0 = just yield)
    pub cycle_sleep_us: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            name: "top".to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            message_queue_size: DEFAULT_MESSAGE_QUEUE_SIZE,
            max_path_depth: DEFAULT_MAX_PATH_DEPTH,
            cycle_sleep_us: 0,
        }
    }
}

impl GraphConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_message_queue_size(mut self, size: usize) -> Self {
        self.message_queue_size = size;
        self
    }

    pub fn with_max_path_depth(mut self, depth: usize) -> Self {
        self.max_path_depth = depth;
        self
    }

    pub fn with_cycle_sleep_us(mut self, micros: u64) -> Self {
        self.cycle_sleep_us = micros;
        self
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GraphConfig = toml::from_str(content)
            .map_err(|e| GraphError::Config(format!("failed to parse graph config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            GraphError::Config(msg) => GraphError::Config(format!("{:?}: {}", path, msg)),
            other => other,
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| GraphError::Config(format!("failed to serialize graph config: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(GraphError::Config("sample_rate must be non-zero".to_string()));
        }
        if self.message_queue_size == 0 {
            return Err(GraphError::Config(
                "message_queue_size must be non-zero".to_string(),
            ));
        }
        if self.max_path_depth == 0 {
            return Err(GraphError::Config("max_path_depth must be non-zero".to_string()));
        }
        Ok(())
    }
}
