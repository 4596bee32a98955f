//! Batch processing configuration.

use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_millis(100);

/// Tuning for batch processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Fixed number of worker threads for per-item units.
    pub workers: usize,
    /// Latency applied to every per-item unit before it touches the store.
    pub item_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            item_delay: DEFAULT_ITEM_DELAY,
        }
    }
}

impl BatchConfig {
    /// Config without artificial latency.
    pub fn immediate(workers: usize) -> Self {
        Self {
            workers,
            item_delay: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BatchConfig;

    #[test]
    fn default_matches_documented_values() {
        let config = BatchConfig::default();
        assert_eq!(config.workers, 10);
        assert_eq!(config.item_delay.as_millis(), 100);
    }

    #[test]
    fn immediate_has_no_item_delay() {
        let config = BatchConfig::immediate(3);
        assert_eq!(config.workers, 3);
        assert!(config.item_delay.is_zero());
    }
}
