// ============================================================================
// spark-observer - Errors
// ============================================================================

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ObserverError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObserverError {
    /// The host renderer cannot provide per-instance hook state.
    #[error("spark-observer requires a host renderer with hooks support")]
    HooksUnavailable,

    #[error("invalid observer configuration: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
}
