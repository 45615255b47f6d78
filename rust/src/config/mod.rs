use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading buffer config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing buffer config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid buffer config: {0}")]
    Invalid(&'static str),
}

/// Which end a push evicts from when the buffer is over budget.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvictionKind {
    #[default]
    OppositeEnd,
    Front,
    RandomEnd,
}

/// Settings for a `FixedSizeRecordBuffer`.
///
/// ```json
/// { "capacity_bytes": 32768, "element_overhead": 16, "eviction": "opposite_end" }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BufferConfig {
    pub capacity_bytes: usize,
    // None picks the slot size of the record type.
    #[serde(default)]
    pub element_overhead: Option<usize>,
    #[serde(default)]
    pub eviction: EvictionKind,
    // Slots to pre-allocate in the internal deque.
    #[serde(default)]
    pub reserve: usize,
}

impl BufferConfig {
    pub fn new(capacity_bytes: usize) -> Self {
        BufferConfig {
            capacity_bytes,
            element_overhead: None,
            eviction: EvictionKind::default(),
            reserve: 0,
        }
    }

    pub fn with_element_overhead(mut self, overhead: usize) -> Self {
        self.element_overhead = Some(overhead);
        self
    }

    pub fn with_eviction(mut self, eviction: EvictionKind) -> Self {
        self.eviction = eviction;
        self
    }

    pub fn with_reserve(mut self, reserve: usize) -> Self {
        self.reserve = reserve;
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: BufferConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity_bytes == 0 {
            return Err(ConfigError::Invalid("capacity_bytes must be greater than zero"));
        }
        Ok(())
    }
}
