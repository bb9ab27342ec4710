// ============================================================================
// spark-observer - Configuration
// Thread-wide knobs for the leak guard
// ============================================================================

use std::time::Duration;

use super::constants::{DEFAULT_CLEANUP_DELAY, DEFAULT_SWEEP_INTERVAL};
use super::context::with_context;
use super::error::{ObserverError, Result};

// =============================================================================
// OBSERVER CONFIG
// =============================================================================

/// Observer configuration.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use spark_observer::{configure, config, ObserverConfig};
///
/// configure(ObserverConfig::new().with_cleanup_delay(Duration::from_millis(500))).unwrap();
/// assert_eq!(config().cleanup_delay(), Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverConfig {
    cleanup_delay: Duration,
    sweep_interval: Duration,
}

impl ObserverConfig {
    pub fn new() -> Self {
        Self {
            cleanup_delay: DEFAULT_CLEANUP_DELAY,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// How long a reaction created by an uncommitted render may live
    /// before the leak guard disposes it.
    #[must_use]
    pub fn with_cleanup_delay(mut self, delay: Duration) -> Self {
        self.cleanup_delay = delay;
        self
    }

    /// Minimum spacing between two leak-guard sweeps.
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn cleanup_delay(&self) -> Duration {
        self.cleanup_delay
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    pub fn validate(&self) -> Result<()> {
        if self.cleanup_delay.is_zero() {
            return Err(ObserverError::InvalidConfig {
                field: "cleanup_delay",
                reason: "must be greater than zero",
            });
        }
        if self.sweep_interval.is_zero() {
            return Err(ObserverError::InvalidConfig {
                field: "sweep_interval",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Replace the observer configuration for this thread.
///
/// Only reactions created afterwards pick up a new cleanup delay.
pub fn configure(config: ObserverConfig) -> Result<()> {
    config.validate()?;
    with_context(|ctx| ctx.set_config(config));
    tracing::debug!(
        cleanup_delay_ms = config.cleanup_delay.as_millis() as u64,
        sweep_interval_ms = config.sweep_interval.as_millis() as u64,
        "observer configuration updated"
    );
    Ok(())
}

/// Current observer configuration for this thread
pub fn config() -> ObserverConfig {
    with_context(|ctx| ctx.config())
}

/// Restore the default configuration
pub fn reset_config() {
    with_context(|ctx| ctx.set_config(ObserverConfig::default()));
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ObserverConfig::default();
        assert_eq!(config.cleanup_delay(), DEFAULT_CLEANUP_DELAY);
        assert_eq!(config.sweep_interval(), DEFAULT_SWEEP_INTERVAL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_durations_are_rejected() {
        let err = configure(ObserverConfig::new().with_cleanup_delay(Duration::ZERO)).unwrap_err();
        assert_eq!(
            err,
            ObserverError::InvalidConfig {
                field: "cleanup_delay",
                reason: "must be greater than zero",
            }
        );

        let err = configure(ObserverConfig::new().with_sweep_interval(Duration::ZERO)).unwrap_err();
        assert!(matches!(err, ObserverError::InvalidConfig { field: "sweep_interval", .. }));

        // Rejected configs leave the current one untouched
        assert_eq!(config(), ObserverConfig::default());
    }

    #[test]
    fn configure_and_reset() {
        let custom = ObserverConfig::new()
            .with_cleanup_delay(Duration::from_millis(250))
            .with_sweep_interval(Duration::from_millis(50));

        configure(custom).unwrap();
        assert_eq!(config(), custom);

        reset_config();
        assert_eq!(config(), ObserverConfig::default());
    }
}
