//! Error taxonomy for the placement and sizing core

use thiserror::Error;

/// Errors raised by the geometry and sizing core.
///
/// All of these are local and recoverable. Callers keep their previous state
/// when one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Rejected before any computation (non-positive size, bad pitch, wrong point count)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Coincident or collinear corners, or a near-singular homography system
    ///
    /// `measure` is the corner sine or elimination pivot that fell below tolerance.
    #[error("degenerate corner configuration (measure {measure:e})")]
    DegenerateConfiguration { measure: f64 },
}

impl CoreError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        CoreError::InvalidInput(msg.into())
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Reject anything that is not a strictly positive, finite number
pub fn ensure_positive(name: &str, value: f64) -> CoreResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CoreError::invalid(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}
