//! Propagation driver
//!
//! Repeatedly advances any `Integrator` until a target epoch is reached or
//! passed. The integrator keeps its own fixed step, so the final state lands
//! on the first internal step at or beyond the target; no interpolation is
//! done here.

use satkit::{Duration, Instant};

use crate::error::{PropagationError, Result};
use crate::integrator::Integrator;
use crate::settings::PropagatorConfig;
use crate::state::OrbitalState;

/// Epochs closer than this count as reached (seconds)
const EPOCH_TOLERANCE_S: f64 = 1e-6;

/// Result of a `propagate_until` call
#[derive(Debug, Clone)]
pub struct PropagationResult {
    /// State after the last advance
    pub final_state: OrbitalState,

    /// State after every advance (if requested)
    pub history: Vec<OrbitalState>,

    /// Number of advances taken
    pub steps_taken: usize,

    /// Whether the target was reached within `max_steps`
    pub reached_target: bool,
}

/// Owns one integrator and drives it toward target epochs
pub struct Propagator {
    integrator: Box<dyn Integrator>,
    config: PropagatorConfig,
}

impl Propagator {
    pub fn new(integrator: impl Integrator + 'static) -> Self {
        Self::with_config(Box::new(integrator), PropagatorConfig::default())
    }

    pub fn with_config(integrator: Box<dyn Integrator>, config: PropagatorConfig) -> Self {
        log::debug!("Propagator using {}", integrator.name());
        Self { integrator, config }
    }

    pub fn config(&self) -> &PropagatorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PropagatorConfig {
        &mut self.config
    }

    pub fn integrator(&self) -> &dyn Integrator {
        self.integrator.as_ref()
    }

    /// Mutable access, e.g. to restart a multistep integrator after a failure
    pub fn integrator_mut(&mut self) -> &mut dyn Integrator {
        self.integrator.as_mut()
    }

    /// Current state tagged with its epoch
    pub fn current(&self) -> OrbitalState {
        self.integrator.orbital_state()
    }

    /// Advance until the integrator's epoch reaches or passes `target`
    ///
    /// The direction of travel is whatever the integrator's step is; a
    /// target behind it is an error rather than an endless loop.
    pub fn propagate_until(&mut self, target: Instant) -> Result<PropagationResult> {
        let start = self.integrator.time();
        let mut history = Vec::new();
        let mut steps = 0;

        if (target - start).as_seconds().abs() <= EPOCH_TOLERANCE_S {
            return Ok(PropagationResult {
                final_state: self.current(),
                history,
                steps_taken: 0,
                reached_target: true,
            });
        }
        let forward = (target - start).as_seconds() > 0.0;

        let reached = |t: Instant| {
            let remaining = (target - t).as_seconds();
            if forward {
                remaining <= EPOCH_TOLERANCE_S
            } else {
                remaining >= -EPOCH_TOLERANCE_S
            }
        };

        let mut reached_target = false;
        while steps < self.config.max_steps {
            let before = self.integrator.time();
            let t = self.integrator.advance()?;
            steps += 1;

            if steps == 1 && (((t - before).as_seconds() > 0.0) != forward) {
                return Err(PropagationError::unsupported(format!(
                    "{} steps away from the target epoch",
                    self.integrator.name()
                )));
            }

            if self.config.store_history {
                history.push(self.integrator.orbital_state());
            }

            if reached(t) {
                reached_target = true;
                break;
            }
        }

        if !reached_target {
            log::warn!(
                "Propagation stopped after {} steps short of the target",
                self.config.max_steps
            );
        }

        Ok(PropagationResult {
            final_state: self.current(),
            history,
            steps_taken: steps,
            reached_target,
        })
    }

    /// Advance for a duration past the current epoch
    pub fn propagate_duration(&mut self, duration: Duration) -> Result<PropagationResult> {
        let target = self.integrator.time() + duration;
        self.propagate_until(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equations::EquationsOfMotion;
    use crate::forces::{PointMassGravity, ZonalGravity};
    use crate::frames::{IdentityFrame, UniformRotation};
    use crate::integrator::Rk4;
    use crate::state::{CanonicalUnits, StateVector};
    use std::sync::Arc;

    fn epoch() -> Instant {
        Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap()
    }

    fn leo() -> StateVector {
        let r: f64 = 1.0 + 400.0 / 6378.135;
        StateVector::new(r, 0.0, 0.0, 0.0, (1.0 / r).sqrt(), 0.0)
    }

    fn rk4(central: Box<dyn crate::forces::CentralBodyModel>, step_s: f64) -> Rk4 {
        let eom = EquationsOfMotion::new(central, Arc::new(IdentityFrame), CanonicalUnits::earth());
        Rk4::new(eom, Duration::from_seconds(step_s), epoch(), leo()).unwrap()
    }

    #[test]
    fn test_propagate_one_orbit() {
        let mut propagator = Propagator::new(rk4(Box::new(PointMassGravity::new()), 10.0));
        let initial = propagator.current();
        let period_s = CanonicalUnits::earth().tu_to_seconds(initial.period().unwrap());

        let result = propagator
            .propagate_duration(Duration::from_seconds(period_s))
            .unwrap();

        // Lands within one 10 s step past a full revolution
        let pos_error = (result.final_state.position - initial.position).norm() / initial.radius();
        assert!(pos_error < 2e-2, "Position error too large: {}", pos_error);
        assert!((result.final_state.radius() - initial.radius()).abs() / initial.radius() < 1e-6);
        assert!(result.reached_target);
        assert!(result.steps_taken > 0);
    }

    #[test]
    fn test_history_and_max_steps() {
        let config = PropagatorConfig {
            max_steps: 5,
            store_history: true,
        };
        let mut propagator =
            Propagator::with_config(Box::new(rk4(Box::new(PointMassGravity::new()), 60.0)), config);

        let result = propagator
            .propagate_duration(Duration::from_seconds(3600.0))
            .unwrap();
        assert!(!result.reached_target);
        assert_eq!(result.steps_taken, 5);
        assert_eq!(result.history.len(), 5);
        assert!((result.history[4].epoch - result.history[0].epoch).as_seconds() > 0.0);
    }

    #[test]
    fn test_backward_propagation() {
        let mut propagator = Propagator::new(rk4(Box::new(PointMassGravity::new()), -60.0));
        let target = epoch() + Duration::from_seconds(-600.0);

        let result = propagator.propagate_until(target).unwrap();
        assert!(result.reached_target);
        assert_eq!(result.steps_taken, 10);
    }

    #[test]
    fn test_wrong_direction_rejected() {
        let mut propagator = Propagator::new(rk4(Box::new(PointMassGravity::new()), 60.0));
        let target = epoch() + Duration::from_seconds(-600.0);
        assert!(propagator.propagate_until(target).is_err());
    }

    #[test]
    fn test_propagate_with_j2() {
        // 45° inclined orbit: J2 pulls the orbit plane, so z-momentum is conserved
        // but the x/y angular momentum components drift
        let r: f64 = 1.0 + 400.0 / 6378.135;
        let v = (1.0 / r).sqrt();
        let state = StateVector::new(r, 0.0, 0.0, 0.0, v * 0.707, v * 0.707);
        let eom = EquationsOfMotion::new(
            Box::new(ZonalGravity::j2_only()),
            Arc::new(UniformRotation::earth(epoch())),
            CanonicalUnits::earth(),
        );
        let mut propagator =
            Propagator::new(Rk4::new(eom, Duration::from_seconds(30.0), epoch(), state).unwrap());
        let h0 = propagator.current().angular_momentum();

        let result = propagator
            .propagate_duration(Duration::from_seconds(600.0))
            .unwrap();
        let h1 = result.final_state.angular_momentum();

        assert!((h1.z - h0.z).abs() / h0.norm() < 1e-7);
        assert!((h1 - h0).norm() / h0.norm() > 1e-5);
    }
}
