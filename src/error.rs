//! Error taxonomy for propagation
//!
//! Three families of failure surface from this crate:
//!
//! - **Configuration**: rejected at construction, the object is never created
//! - **Range**: a collaborator (ephemeris, frame conversion) was queried outside
//!   the span it supports; reported to whoever triggered the evaluation
//! - **Nonconvergence**: the multistep corrector could not settle; the
//!   integrator stays invalid until restarted
//!
//! Nothing in the crate retries. Providers and the equations of motion pass
//! collaborator errors through unchanged.

use satkit::Instant;
use thiserror::Error;

/// Result type for propagation operations
pub type Result<T> = std::result::Result<T, PropagationError>;

/// Errors raised while building or advancing a propagation
#[derive(Debug, Clone, Error)]
pub enum PropagationError {
    /// Invalid construction parameters (e.g. unsupported gravity degree)
    #[error("unsupported configuration: {message}")]
    UnsupportedConfiguration { message: String },

    /// A collaborator was queried outside its supported time span
    #[error("time {epoch:?} out of supported range: {message}")]
    OutOfRange { epoch: Instant, message: String },

    /// Multistep corrector failed to converge within its pass budget
    #[error("corrector failed to converge at {epoch:?} after {passes} passes (test = {test:e})")]
    NonConvergence {
        epoch: Instant,
        passes: usize,
        test: f64,
    },

    /// The integrator was invalidated by an earlier nonconvergence
    #[error("integrator invalidated by an earlier nonconvergence; restart it before advancing")]
    Invalidated,

    /// Initial conditions the integrators cannot work with
    #[error("invalid state: {message}")]
    InvalidState { message: String },
}

impl PropagationError {
    /// Shorthand for a configuration error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration {
            message: message.into(),
        }
    }

    /// Shorthand for a range error at `epoch`
    pub fn out_of_range(epoch: Instant, message: impl Into<String>) -> Self {
        Self::OutOfRange {
            epoch,
            message: message.into(),
        }
    }

    /// Whether this is a corrector nonconvergence (or its sticky aftermath)
    pub fn is_nonconvergence(&self) -> bool {
        matches!(self, Self::NonConvergence { .. } | Self::Invalidated)
    }
}
