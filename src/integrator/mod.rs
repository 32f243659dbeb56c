//! Numerical integrators for orbit propagation
//!
//! Every integrator owns one `EquationsOfMotion` plus the current
//! (time, state, derivative) triple, and moves it forward one internal step
//! per `advance` call. The triple is always consistent: the derivative is
//! the composer's evaluation at the current time and state.
//!
//! # Available Integrators
//!
//! - **Rk4**: classical fixed-step Runge-Kutta, self-starting (reference baseline)
//! - **RegularizedRk4**: fixed step in a regularized independent variable,
//!   delegating the transform to a `Regularization` collaborator
//! - **GaussJackson**: order-8 multistep predictor-corrector with RK4 startup,
//!   optional step doubling/halving, and explicit nonconvergence reporting

mod multistep;
mod regularized;
mod rk4;

pub use multistep::{Coefficients, DifferenceTable, GaussJackson, MultistepDiagnostics, ORDER};
pub use regularized::{Regularization, RegularizedRk4, SundmanTransform};
pub use rk4::Rk4;

use satkit::{Duration, Instant};

use crate::error::Result;
use crate::state::{OrbitalState, StateVector};

/// Single-state integrator
///
/// Implementations are `Send` so independent integrators may be driven from
/// separate threads; a single instance is never shared.
pub trait Integrator: Send {
    /// Take one internal step and return the new epoch
    fn advance(&mut self) -> Result<Instant>;

    /// Current epoch
    fn time(&self) -> Instant;

    /// Current inertial state (DU, DU/TU)
    fn state(&self) -> &StateVector;

    /// Derivative at the current time and state
    fn derivative(&self) -> &StateVector;

    /// Integrator name
    fn name(&self) -> &'static str;

    /// Continue from the current time and state with a new step
    ///
    /// This is the recovery path after a nonconvergence. Integrators whose
    /// step is not a physical duration refuse it.
    fn restart(&mut self, step: Duration) -> Result<()>;

    /// Current state tagged with its epoch
    fn orbital_state(&self) -> OrbitalState {
        OrbitalState::from_vector(self.state(), self.time())
    }
}
