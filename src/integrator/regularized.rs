//! Time-regularized RK4
//!
//! Steps a transformed independent variable s instead of physical time.
//! The transform lives behind the `Regularization` trait; the integrator
//! only fixes the increment and maps elapsed physical time back onto an
//! epoch.
//!
//! `SundmanTransform` is the stock transform: dt = r^α ds. With α = 1 the
//! step in s is proportional to the eccentric anomaly, so steps bunch up at
//! periapsis where the dynamics are fastest.

use satkit::{Duration, Instant};

use super::rk4::evaluate;
use super::Integrator;
use crate::equations::EquationsOfMotion;
use crate::error::{PropagationError, Result};
use crate::state::{self, EvaluationMode, OrbitalState, StateVector};

/// State carried in a regularized independent variable
pub trait Regularization: Send {
    /// Current physical state
    fn state(&self) -> &StateVector;

    /// Physical time derivative (d/dt, not d/ds) at the current state
    fn derivative(&self) -> &StateVector;

    /// Current value of the regularized variable
    fn independent_variable(&self) -> f64;

    /// Epoch the transform was started at
    fn origin(&self) -> Instant;

    /// Physical time elapsed since `origin`
    fn elapsed_time(&self) -> Duration;

    /// Step the regularized variable by `increment`
    fn advance(&mut self, increment: f64) -> Result<()>;
}

/// Sundman transform dt = r^α ds, integrated with classical RK4 in s
///
/// Physical time is carried as a seventh component alongside the state.
pub struct SundmanTransform {
    eom: EquationsOfMotion,
    origin: Instant,
    exponent: f64,

    /// Regularized variable
    s: f64,

    /// Physical time since `origin` (TU)
    t: f64,

    state: StateVector,
    derivative: StateVector,
}

impl SundmanTransform {
    pub fn new(
        eom: EquationsOfMotion,
        epoch: Instant,
        state: StateVector,
        exponent: f64,
    ) -> Result<Self> {
        OrbitalState::from_vector(&state, epoch).validate()?;
        if !exponent.is_finite() || exponent < 0.0 {
            return Err(PropagationError::unsupported(format!(
                "Sundman exponent must be finite and non-negative (got {exponent})"
            )));
        }

        let derivative = evaluate(&eom, &epoch, 0.0, &state, EvaluationMode::Corrector)?;
        Ok(Self {
            eom,
            origin: epoch,
            exponent,
            s: 0.0,
            t: 0.0,
            state,
            derivative,
        })
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    /// dt/ds at a state
    fn time_scale(&self, state: &StateVector) -> f64 {
        state::position(state).norm().powf(self.exponent)
    }

    /// d/ds of (state, t) at physical time `t`
    fn stage(&self, t: f64, state: &StateVector) -> Result<(StateVector, f64)> {
        let xdot = evaluate(&self.eom, &self.origin, t, state, EvaluationMode::Corrector)?;
        let scale = self.time_scale(state);
        Ok((xdot * scale, scale))
    }
}

impl Regularization for SundmanTransform {
    fn state(&self) -> &StateVector {
        &self.state
    }

    fn derivative(&self) -> &StateVector {
        &self.derivative
    }

    fn independent_variable(&self) -> f64 {
        self.s
    }

    fn origin(&self) -> Instant {
        self.origin
    }

    fn elapsed_time(&self) -> Duration {
        self.eom.units().duration(self.t)
    }

    fn advance(&mut self, ds: f64) -> Result<()> {
        let half = 0.5 * ds;
        let y = self.state;
        let t = self.t;

        let scale1 = self.time_scale(&y);
        let (k1, c1) = (self.derivative * scale1, scale1);
        let (k2, c2) = self.stage(t + c1 * half, &(y + k1 * half))?;
        let (k3, c3) = self.stage(t + c2 * half, &(y + k2 * half))?;
        let (k4, c4) = self.stage(t + c3 * ds, &(y + k3 * ds))?;

        let y_new = y + (k1 + 2.0 * k2 + 2.0 * k3 + k4) * (ds / 6.0);
        let t_new = t + (c1 + 2.0 * c2 + 2.0 * c3 + c4) * (ds / 6.0);
        let derivative = evaluate(
            &self.eom,
            &self.origin,
            t_new,
            &y_new,
            EvaluationMode::Corrector,
        )?;

        self.s += ds;
        self.t = t_new;
        self.state = y_new;
        self.derivative = derivative;
        Ok(())
    }
}

/// Fixed increment in a regularized variable
pub struct RegularizedRk4 {
    regularization: Box<dyn Regularization>,
    increment: f64,
}

impl RegularizedRk4 {
    pub fn new(regularization: Box<dyn Regularization>, increment: f64) -> Result<Self> {
        if !increment.is_finite() || increment == 0.0 {
            return Err(PropagationError::unsupported(format!(
                "regularized increment must be finite and non-zero (got {increment})"
            )));
        }
        log::debug!("Regularized RK4: increment {increment}");
        Ok(Self {
            regularization,
            increment,
        })
    }

    /// Sundman-regularized integrator with exponent α
    pub fn sundman(
        eom: EquationsOfMotion,
        epoch: Instant,
        state: StateVector,
        increment: f64,
        exponent: f64,
    ) -> Result<Self> {
        let transform = SundmanTransform::new(eom, epoch, state, exponent)?;
        Self::new(Box::new(transform), increment)
    }

    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// Current value of the regularized variable
    pub fn independent_variable(&self) -> f64 {
        self.regularization.independent_variable()
    }
}

impl Integrator for RegularizedRk4 {
    fn advance(&mut self) -> Result<Instant> {
        self.regularization.advance(self.increment)?;
        let time = self.time();
        log::trace!(
            "Regularized step to s = {:.6}",
            self.regularization.independent_variable()
        );
        Ok(time)
    }

    fn time(&self) -> Instant {
        self.regularization.origin() + self.regularization.elapsed_time()
    }

    fn state(&self) -> &StateVector {
        self.regularization.state()
    }

    fn derivative(&self) -> &StateVector {
        self.regularization.derivative()
    }

    fn name(&self) -> &'static str {
        "RK4 (regularized)"
    }

    /// The step is an increment in s, not a duration
    fn restart(&mut self, step: Duration) -> Result<()> {
        Err(PropagationError::unsupported(format!(
            "{} steps in its regularized variable; cannot restart with a {} s step",
            self.name(),
            step.as_seconds()
        )))
    }
}
