//! Classical fixed-step Runge-Kutta 4

use satkit::{Duration, Instant};

use super::Integrator;
use crate::equations::EquationsOfMotion;
use crate::error::{PropagationError, Result};
use crate::state::{EvaluationMode, OrbitalState, StateVector};

/// Composer evaluation at `elapsed` TU past `origin`
pub(super) fn evaluate(
    eom: &EquationsOfMotion,
    origin: &Instant,
    elapsed: f64,
    state: &StateVector,
    mode: EvaluationMode,
) -> Result<StateVector> {
    let time = *origin + eom.units().duration(elapsed);
    eom.derivative(&time, state, mode)
}

/// One RK4 step from `t0` to `t1` (TU), reusing the cached start derivative `k1`
///
/// Returns the new state and the derivative there, evaluated at exactly
/// `t1`. Every evaluation uses the corrector mode.
pub(super) fn classical_step(
    eom: &EquationsOfMotion,
    origin: &Instant,
    t0: f64,
    t1: f64,
    y: &StateVector,
    k1: &StateVector,
) -> Result<(StateVector, StateVector)> {
    let mode = EvaluationMode::Corrector;
    let h = t1 - t0;
    let half = 0.5 * h;

    let k2 = evaluate(eom, origin, t0 + half, &(y + k1 * half), mode)?;
    let k3 = evaluate(eom, origin, t0 + half, &(y + k2 * half), mode)?;
    let k4 = evaluate(eom, origin, t1, &(y + k3 * h), mode)?;

    let y_new = y + (k1 + 2.0 * k2 + 2.0 * k3 + k4) * (h / 6.0);
    let dy_new = evaluate(eom, origin, t1, &y_new, mode)?;
    Ok((y_new, dy_new))
}

/// Fixed-step RK4 integrator
///
/// Self-starting; the derivative at the end of each step is kept as the
/// first stage of the next, so each advance costs four composer evaluations.
pub struct Rk4 {
    eom: EquationsOfMotion,

    /// Signed step (TU)
    h: f64,

    origin: Instant,
    steps: u64,
    state: StateVector,
    derivative: StateVector,
}

impl Rk4 {
    /// Step used when constructed with a zero duration
    pub const NOMINAL_STEP_SECONDS: f64 = 60.0;

    /// Build from an initial condition; a zero `step` selects the nominal step
    pub fn new(
        eom: EquationsOfMotion,
        step: Duration,
        epoch: Instant,
        state: StateVector,
    ) -> Result<Self> {
        OrbitalState::from_vector(&state, epoch).validate()?;

        let h = Self::step_tu(&eom, step)?;
        let derivative = evaluate(&eom, &epoch, 0.0, &state, EvaluationMode::Corrector)?;
        log::debug!("RK4 integrator: step {} s ({h:.6} TU)", eom.units().tu_to_seconds(h));

        Ok(Self {
            eom,
            h,
            origin: epoch,
            steps: 0,
            state,
            derivative,
        })
    }

    fn step_tu(eom: &EquationsOfMotion, step: Duration) -> Result<f64> {
        let mut step_s = step.as_seconds();
        if !step_s.is_finite() {
            return Err(PropagationError::unsupported(format!(
                "RK4 step must be finite (got {step_s} s)"
            )));
        }
        if step_s == 0.0 {
            step_s = Self::NOMINAL_STEP_SECONDS;
        }
        Ok(eom.units().seconds_to_tu(step_s))
    }

    /// Step length in seconds (negative when integrating backward)
    pub fn step_seconds(&self) -> f64 {
        self.eom.units().tu_to_seconds(self.h)
    }

    /// Steps taken since construction or the last restart
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Elapsed TU after `n` steps; a product keeps the epoch free of drift
    fn elapsed(&self, n: u64) -> f64 {
        n as f64 * self.h
    }
}

impl Integrator for Rk4 {
    fn advance(&mut self) -> Result<Instant> {
        let (state, derivative) = classical_step(
            &self.eom,
            &self.origin,
            self.elapsed(self.steps),
            self.elapsed(self.steps + 1),
            &self.state,
            &self.derivative,
        )?;

        self.steps += 1;
        self.state = state;
        self.derivative = derivative;
        log::trace!("RK4 step {} to t = {:.6} TU", self.steps, self.elapsed(self.steps));
        Ok(self.time())
    }

    fn time(&self) -> Instant {
        self.origin + self.eom.units().duration(self.elapsed(self.steps))
    }

    fn state(&self) -> &StateVector {
        &self.state
    }

    fn derivative(&self) -> &StateVector {
        &self.derivative
    }

    fn name(&self) -> &'static str {
        "RK4 (fixed step)"
    }

    /// Rebase the step count on the current epoch; the derivative still holds
    fn restart(&mut self, step: Duration) -> Result<()> {
        let h = Self::step_tu(&self.eom, step)?;
        self.origin = self.time();
        self.steps = 0;
        self.h = h;
        log::debug!("RK4 restart with step {} s", self.step_seconds());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forces::{PerturbationModel, PointMassGravity};
    use crate::frames::IdentityFrame;
    use crate::state::CanonicalUnits;
    use nalgebra::Vector3;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn epoch() -> Instant {
        Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap()
    }

    fn two_body() -> EquationsOfMotion {
        EquationsOfMotion::new(
            Box::new(PointMassGravity::new()),
            Arc::new(IdentityFrame),
            CanonicalUnits::earth(),
        )
    }

    struct Counter(Arc<AtomicUsize>);

    impl PerturbationModel for Counter {
        fn acceleration(
            &self,
            _time: &Instant,
            _state: &StateVector,
            mode: EvaluationMode,
        ) -> Result<Vector3<f64>> {
            assert_eq!(mode, EvaluationMode::Corrector);
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Vector3::zeros())
        }

        fn name(&self) -> &'static str {
            "Counter"
        }
    }

    /// Fails every evaluation while switched on
    struct Outage(Arc<AtomicBool>);

    impl PerturbationModel for Outage {
        fn acceleration(
            &self,
            time: &Instant,
            _state: &StateVector,
            _mode: EvaluationMode,
        ) -> Result<Vector3<f64>> {
            if self.0.load(Ordering::SeqCst) {
                return Err(PropagationError::out_of_range(*time, "ephemeris gap"));
            }
            Ok(Vector3::zeros())
        }

        fn name(&self) -> &'static str {
            "Outage"
        }
    }

    #[test]
    fn test_rk_circular_orbit() {
        let r: f64 = 1.0 + 400.0 / 6378.135;
        let v = (1.0 / r).sqrt();
        let state = StateVector::new(r, 0.0, 0.0, 0.0, v, 0.0);

        let mut rk = Rk4::new(two_body(), Duration::from_seconds(60.0), epoch(), state).unwrap();
        rk.advance().unwrap();

        let s = rk.orbital_state();
        assert!((s.radius() - r).abs() / r < 1e-6);
        assert!((s.speed() - v).abs() / v < 1e-6);
        assert!(((s.epoch - epoch()).as_seconds() - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_step_uses_nominal() {
        let state = StateVector::new(2.0, 0.0, 0.0, 0.0, 0.5_f64.sqrt(), 0.0);
        let rk = Rk4::new(two_body(), Duration::from_seconds(0.0), epoch(), state).unwrap();
        assert!((rk.step_seconds() - Rk4::NOMINAL_STEP_SECONDS).abs() < 1e-9);
    }

    #[test]
    fn test_four_evaluations_per_step() {
        let count = Arc::new(AtomicUsize::new(0));
        let eom = two_body().with_perturbation(Box::new(Counter(count.clone())));
        let state = StateVector::new(2.0, 0.0, 0.0, 0.0, 0.5_f64.sqrt(), 0.0);

        let mut rk = Rk4::new(eom, Duration::from_seconds(30.0), epoch(), state).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        for _ in 0..5 {
            rk.advance().unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), 1 + 5 * 4);
        assert_eq!(rk.steps(), 5);
    }

    #[test]
    fn test_derivative_matches_composer() {
        let state = StateVector::new(2.0, 0.1, -0.2, 0.0, 0.5_f64.sqrt(), 0.05);
        let mut rk = Rk4::new(two_body(), Duration::from_seconds(45.0), epoch(), state).unwrap();
        rk.advance().unwrap();
        rk.advance().unwrap();

        let direct = two_body()
            .derivative(&rk.time(), rk.state(), EvaluationMode::Corrector)
            .unwrap();
        assert_eq!(direct, *rk.derivative());
    }

    #[test]
    fn test_collaborator_error_leaves_step_uncommitted() {
        let outage = Arc::new(AtomicBool::new(false));
        let eom = two_body().with_perturbation(Box::new(Outage(outage.clone())));
        let state = StateVector::new(2.0, 0.0, 0.0, 0.0, 0.5_f64.sqrt(), 0.0);
        let mut rk = Rk4::new(eom, Duration::from_seconds(60.0), epoch(), state).unwrap();
        rk.advance().unwrap();

        let time = rk.time();
        let before = *rk.state();
        let derivative = *rk.derivative();

        outage.store(true, Ordering::SeqCst);
        assert!(matches!(
            rk.advance(),
            Err(PropagationError::OutOfRange { .. })
        ));
        assert_eq!(rk.steps(), 1);
        assert_eq!((rk.time() - time).as_seconds(), 0.0);
        assert_eq!(*rk.state(), before);
        assert_eq!(*rk.derivative(), derivative);

        outage.store(false, Ordering::SeqCst);
        rk.advance().unwrap();
        assert_eq!(rk.steps(), 2);
    }

    #[test]
    fn test_restart_rebases_on_current_epoch() {
        let state = StateVector::new(2.0, 0.0, 0.0, 0.0, 0.5_f64.sqrt(), 0.0);
        let mut rk = Rk4::new(two_body(), Duration::from_seconds(60.0), epoch(), state).unwrap();
        for _ in 0..3 {
            rk.advance().unwrap();
        }
        let at = rk.time();
        let state = *rk.state();

        Integrator::restart(&mut rk, Duration::from_seconds(0.0)).unwrap();
        assert_eq!(rk.steps(), 0);
        assert!((rk.step_seconds() - Rk4::NOMINAL_STEP_SECONDS).abs() < 1e-9);
        assert!((rk.time() - at).as_seconds().abs() < 1e-6);
        assert_eq!(*rk.state(), state);

        Integrator::restart(&mut rk, Duration::from_seconds(-20.0)).unwrap();
        let t = rk.advance().unwrap();
        assert!(((t - at).as_seconds() + 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_rejects_degenerate_start() {
        let state = StateVector::new(0.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        assert!(Rk4::new(two_body(), Duration::from_seconds(60.0), epoch(), state).is_err());

        let state = StateVector::new(2.0, f64::NAN, 0.0, 0.0, 0.5_f64.sqrt(), 0.0);
        assert!(Rk4::new(two_body(), Duration::from_seconds(60.0), epoch(), state).is_err());
    }
}
