//! Third-body gravitational perturbations
//!
//! Point-mass attraction of a distant body, expressed relative to the
//! accelerating central-body origin.

use std::sync::Arc;

use nalgebra::Vector3;
use satkit::Instant;

use super::PerturbationModel;
use crate::ephemeris::{Ephemeris, Frame};
use crate::error::{PropagationError, Result};
use crate::state::{self, CanonicalUnits, EvaluationMode, StateVector, MU_MOON, MU_SUN};

/// Third-body gravitational perturbation model
pub struct ThirdBody {
    /// Gravitational parameter relative to the central body
    mu: f64,

    /// Position source for the perturbing body
    ephemeris: Arc<dyn Ephemeris>,
}

impl ThirdBody {
    /// Perturbing body with gravitational parameter ratio `mu`
    pub fn new(mu: f64, ephemeris: Arc<dyn Ephemeris>) -> Result<Self> {
        if !(mu > 0.0 && mu.is_finite()) {
            return Err(PropagationError::unsupported(format!(
                "third-body gravitational parameter ratio must be positive (got {mu})"
            )));
        }
        Ok(Self { mu, ephemeris })
    }

    /// Lunar perturbation in the given units
    pub fn moon(ephemeris: Arc<dyn Ephemeris>, units: &CanonicalUnits) -> Self {
        Self {
            mu: units.mu_ratio(MU_MOON),
            ephemeris,
        }
    }

    /// Gravitational parameter ratio
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Compute third-body acceleration
    ///
    /// Uses the standard formula:
    /// a = μ_body × (r_sat_body/|r_sat_body|³ - r_earth_body/|r_earth_body|³)
    ///
    /// The second (indirect) term is the pull on the central body itself.
    fn third_body_accel(&self, sat_pos: &Vector3<f64>, body_pos: &Vector3<f64>) -> Vector3<f64> {
        let r_sat_body = body_pos - sat_pos;
        let d = r_sat_body.norm();
        let s = body_pos.norm();

        self.mu * (r_sat_body / (d * d * d) - body_pos / (s * s * s))
    }
}

impl PerturbationModel for ThirdBody {
    fn acceleration(
        &self,
        time: &Instant,
        state: &StateVector,
        _mode: EvaluationMode,
    ) -> Result<Vector3<f64>> {
        let body = self.ephemeris.position_at(time, Frame::Inertial)?;
        Ok(self.third_body_accel(&state::position(state), &body))
    }

    fn name(&self) -> &'static str {
        "Third-body gravity"
    }
}

/// Solar point-mass perturbation
///
/// Same algorithm as `ThirdBody`, fixed to the Sun's gravitational parameter.
pub struct SunGravity {
    inner: ThirdBody,
}

impl SunGravity {
    pub fn new(sun: Arc<dyn Ephemeris>, units: &CanonicalUnits) -> Self {
        Self {
            inner: ThirdBody {
                mu: units.mu_ratio(MU_SUN),
                ephemeris: sun,
            },
        }
    }
}

impl PerturbationModel for SunGravity {
    fn acceleration(
        &self,
        time: &Instant,
        state: &StateVector,
        mode: EvaluationMode,
    ) -> Result<Vector3<f64>> {
        self.inner.acceleration(time, state, mode)
    }

    fn name(&self) -> &'static str {
        "Sun gravity"
    }
}
