//! Equations of motion
//!
//! Turns an inertial state into its time derivative by combining one
//! central-body model with any number of additive perturbations.
//!
//! # Example
//!
//! ```ignore
//! let eom = EquationsOfMotion::new(
//!     Box::new(ZonalGravity::new(4)?),
//!     Arc::new(ItrfFrame::new()?),
//!     CanonicalUnits::earth(),
//! )
//! .with_perturbation(Box::new(SunGravity::new(sun.clone(), &units)))
//! .with_perturbation(Box::new(SolarRadiationPressure::new(1.3, 0.01, sun, &units)?));
//!
//! let xdot = eom.derivative(&epoch, &state, EvaluationMode::Corrector)?;
//! ```

use std::sync::Arc;

use nalgebra::Vector3;
use satkit::Instant;

use crate::error::Result;
use crate::forces::{CentralBodyModel, PerturbationModel};
use crate::frames::FrameConversion;
use crate::state::{self, CanonicalUnits, EvaluationMode, StateVector};

/// Central body plus perturbations, evaluated as a 6-state derivative
///
/// Owns its models outright; the frame conversion is shared.
pub struct EquationsOfMotion {
    central: Box<dyn CentralBodyModel>,
    perturbations: Vec<Box<dyn PerturbationModel>>,
    frame: Arc<dyn FrameConversion>,
    units: CanonicalUnits,
}

impl EquationsOfMotion {
    pub fn new(
        central: Box<dyn CentralBodyModel>,
        frame: Arc<dyn FrameConversion>,
        units: CanonicalUnits,
    ) -> Self {
        log::debug!(
            "Equations of motion: {} in {} frame",
            central.name(),
            frame.name()
        );
        Self {
            central,
            perturbations: Vec::new(),
            frame,
            units,
        }
    }

    /// Builder-style `add_perturbation`
    pub fn with_perturbation(mut self, model: Box<dyn PerturbationModel>) -> Self {
        self.add_perturbation(model);
        self
    }

    /// Append a perturbation; evaluated after those already registered
    pub fn add_perturbation(&mut self, model: Box<dyn PerturbationModel>) {
        log::debug!("Adding perturbation: {}", model.name());
        self.perturbations.push(model);
    }

    pub fn units(&self) -> &CanonicalUnits {
        &self.units
    }

    pub fn perturbation_count(&self) -> usize {
        self.perturbations.len()
    }

    /// Central-body model first, then perturbations in evaluation order
    pub fn model_names(&self) -> Vec<&'static str> {
        std::iter::once(self.central.name())
            .chain(self.perturbations.iter().map(|p| p.name()))
            .collect()
    }

    /// Inertial derivative of `state` at `time`
    ///
    /// The velocity half of the result is the input velocity, copied as is.
    pub fn derivative(
        &self,
        time: &Instant,
        state: &StateVector,
        mode: EvaluationMode,
    ) -> Result<StateVector> {
        let mut accel = self.central_acceleration(time, state, mode)?;
        for p in &self.perturbations {
            accel += p.acceleration(time, state, mode)?;
        }

        Ok(state::from_parts(&state::velocity(state), &accel))
    }

    /// Per-model contributions, central body first
    pub fn acceleration_breakdown(
        &self,
        time: &Instant,
        state: &StateVector,
        mode: EvaluationMode,
    ) -> Result<Vec<(&'static str, Vector3<f64>)>> {
        let mut parts = Vec::with_capacity(self.perturbations.len() + 1);
        parts.push((
            self.central.name(),
            self.central_acceleration(time, state, mode)?,
        ));
        for p in &self.perturbations {
            parts.push((p.name(), p.acceleration(time, state, mode)?));
        }
        Ok(parts)
    }

    /// Central-body term: rotate in, evaluate, rotate back out
    fn central_acceleration(
        &self,
        time: &Instant,
        state: &StateVector,
        mode: EvaluationMode,
    ) -> Result<Vector3<f64>> {
        let body_fixed = self.frame.to_body_fixed(time, &state::position(state))?;
        let accel = self.central.acceleration(&body_fixed, mode)?;
        self.frame.to_inertial(time, &accel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PropagationError;
    use crate::forces::{PointMassGravity, ZonalGravity};
    use crate::frames::{IdentityFrame, UniformRotation};

    struct ConstantPush(Vector3<f64>);

    impl PerturbationModel for ConstantPush {
        fn acceleration(
            &self,
            _time: &Instant,
            _state: &StateVector,
            _mode: EvaluationMode,
        ) -> Result<Vector3<f64>> {
            Ok(self.0)
        }

        fn name(&self) -> &'static str {
            "Constant push"
        }
    }

    struct OutOfSpan;

    impl PerturbationModel for OutOfSpan {
        fn acceleration(
            &self,
            time: &Instant,
            _state: &StateVector,
            _mode: EvaluationMode,
        ) -> Result<Vector3<f64>> {
            Err(PropagationError::out_of_range(*time, "no data"))
        }

        fn name(&self) -> &'static str {
            "Out of span"
        }
    }

    fn epoch() -> Instant {
        Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap()
    }

    fn sample_state() -> StateVector {
        StateVector::new(1.05, -0.2, 0.31, 0.123_456_789, 0.87, -0.000_1)
    }

    #[test]
    fn test_velocity_copied_exactly() {
        let eom = EquationsOfMotion::new(
            Box::new(ZonalGravity::new(4).unwrap()),
            Arc::new(UniformRotation::earth(epoch())),
            CanonicalUnits::earth(),
        )
        .with_perturbation(Box::new(ConstantPush(Vector3::new(1e3, -7.0, 1e-9))));

        let state = sample_state();
        let xdot = eom.derivative(&epoch(), &state, EvaluationMode::Predictor).unwrap();
        for i in 0..3 {
            assert_eq!(xdot[i].to_bits(), state[i + 3].to_bits());
        }
    }

    #[test]
    fn test_perturbations_are_additive() {
        let push = Vector3::new(1e-3, 2e-3, -3e-3);
        let bare = EquationsOfMotion::new(
            Box::new(PointMassGravity::new()),
            Arc::new(IdentityFrame),
            CanonicalUnits::earth(),
        );
        let mut pushed = EquationsOfMotion::new(
            Box::new(PointMassGravity::new()),
            Arc::new(IdentityFrame),
            CanonicalUnits::earth(),
        );
        pushed.add_perturbation(Box::new(ConstantPush(push)));
        pushed.add_perturbation(Box::new(ConstantPush(push)));

        let state = sample_state();
        let a0 = bare.derivative(&epoch(), &state, EvaluationMode::Corrector).unwrap();
        let a1 = pushed.derivative(&epoch(), &state, EvaluationMode::Corrector).unwrap();

        let diff = state::velocity(&a1) - state::velocity(&a0);
        assert!((diff - 2.0 * push).norm() < 1e-15);
        assert_eq!(pushed.perturbation_count(), 2);
        assert_eq!(
            pushed.model_names(),
            vec!["Point mass gravity", "Constant push", "Constant push"]
        );
    }

    #[test]
    fn test_zonal_field_invariant_under_spin() {
        // Zonal terms are symmetric about z, so a z-axis rotation must not change them
        let spun = EquationsOfMotion::new(
            Box::new(ZonalGravity::new(4).unwrap()),
            Arc::new(UniformRotation::new(epoch(), 0.7, 1e-3)),
            CanonicalUnits::earth(),
        );
        let fixed = EquationsOfMotion::new(
            Box::new(ZonalGravity::new(4).unwrap()),
            Arc::new(IdentityFrame),
            CanonicalUnits::earth(),
        );

        let state = sample_state();
        let a_spun = spun.derivative(&epoch(), &state, EvaluationMode::Corrector).unwrap();
        let a_fixed = fixed.derivative(&epoch(), &state, EvaluationMode::Corrector).unwrap();
        assert!((a_spun - a_fixed).norm() < 1e-14);
    }

    #[test]
    fn test_provider_error_propagates() {
        let eom = EquationsOfMotion::new(
            Box::new(PointMassGravity::new()),
            Arc::new(IdentityFrame),
            CanonicalUnits::earth(),
        )
        .with_perturbation(Box::new(OutOfSpan));

        let err = eom
            .derivative(&epoch(), &sample_state(), EvaluationMode::Corrector)
            .unwrap_err();
        assert!(matches!(err, PropagationError::OutOfRange { .. }));

        assert!(eom
            .acceleration_breakdown(&epoch(), &sample_state(), EvaluationMode::Corrector)
            .is_err());
    }

    #[test]
    fn test_breakdown_sums_to_derivative() {
        let eom = EquationsOfMotion::new(
            Box::new(ZonalGravity::j2_only()),
            Arc::new(IdentityFrame),
            CanonicalUnits::earth(),
        )
        .with_perturbation(Box::new(ConstantPush(Vector3::new(0.0, 1e-6, 0.0))));

        let state = sample_state();
        let parts = eom
            .acceleration_breakdown(&epoch(), &state, EvaluationMode::Corrector)
            .unwrap();
        let total = parts.iter().fold(Vector3::zeros(), |acc, (_, a)| acc + a);
        let xdot = eom.derivative(&epoch(), &state, EvaluationMode::Corrector).unwrap();

        assert_eq!(parts[0].0, eom.model_names()[0]);
        assert!((total - state::velocity(&xdot)).norm() < 1e-16);
    }
}
