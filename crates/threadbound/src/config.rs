//! # Harness Configuration
//!
//! Loaded once at startup from TOML. Every key is optional:
//!
//! ```toml
//! tick_ms = 1              # worker sleep between edits
//! seed = 2016              # base seed; omit for a time-derived seed
//! seed_item = 2147483647   # value of the single item at startup
//! event_capacity = 1024    # event bus capacity
//! journal_capacity = 4096  # executed tasks kept in the journal
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use threadbound_core::{Item, ThreadboundError, ThreadboundResult, SEED_ITEM};

/// Configuration for the harness.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Milliseconds each worker sleeps between edits. At least 1.
    pub tick_ms: u64,
    /// Base seed for worker generators. `None` derives one from the clock.
    pub seed: Option<u64>,
    /// The single item the collection starts with.
    pub seed_item: Item,
    /// Event bus capacity.
    pub event_capacity: usize,
    /// Executed tasks kept in the executor journal.
    pub journal_capacity: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1,
            seed: None,
            seed_item: SEED_ITEM,
            event_capacity: 1024,
            journal_capacity: 4096,
        }
    }
}

impl HarnessConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::Config`] on malformed TOML, unknown keys or
    /// out-of-range values.
    pub fn from_toml_str(source: &str) -> ThreadboundResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| ThreadboundError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> ThreadboundResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            ThreadboundError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`ThreadboundError::Config`] naming the offending key.
    pub fn validate(&self) -> ThreadboundResult<()> {
        if self.tick_ms == 0 {
            // Without a pause safe workers outrun the affinity thread
            return Err(ThreadboundError::Config(
                "tick_ms must be at least 1".to_string(),
            ));
        }
        if self.seed_item < 0 {
            return Err(ThreadboundError::Config(format!(
                "seed_item must be non-negative, got {}",
                self.seed_item
            )));
        }
        if self.event_capacity == 0 {
            return Err(ThreadboundError::Config(
                "event_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Worker sleep interval.
    #[inline]
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(HarnessConfig::from_toml_str("").unwrap(), HarnessConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = HarnessConfig::from_toml_str("tick_ms = 5\nseed = 99\n").unwrap();
        assert_eq!(config.tick(), Duration::from_millis(5));
        assert_eq!(config.seed, Some(99));
        assert_eq!(config.seed_item, SEED_ITEM);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = HarnessConfig::from_toml_str("tick = 5").unwrap_err();
        assert!(matches!(err, ThreadboundError::Config(_)));
    }

    #[test]
    fn test_rejects_negative_seed_item() {
        let err = HarnessConfig::from_toml_str("seed_item = -1").unwrap_err();
        assert!(matches!(err, ThreadboundError::Config(msg) if msg.contains("seed_item")));
    }

    #[test]
    fn test_rejects_zero_tick() {
        let err = HarnessConfig::from_toml_str("tick_ms = 0").unwrap_err();
        assert!(matches!(err, ThreadboundError::Config(msg) if msg.contains("tick_ms")));
    }

    #[test]
    fn test_missing_file() {
        let err = HarnessConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ThreadboundError::Config(_)));
    }
}
