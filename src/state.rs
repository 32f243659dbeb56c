//! State vectors, canonical units and evaluation modes
//!
//! All integration happens in canonical units: the distance unit (DU) is the
//! central body's reference radius and the time unit (TU) is scaled so the
//! central body's gravitational parameter is exactly 1.

use nalgebra::{Vector3, Vector6};
use satkit::{Duration, Instant};
use serde::{Deserialize, Serialize};

use crate::error::{PropagationError, Result};

/// Six-element state: position (DU) followed by velocity (DU/TU)
pub type StateVector = Vector6<f64>;

/// Position sub-vector of a state
#[inline]
pub fn position(state: &StateVector) -> Vector3<f64> {
    Vector3::new(state[0], state[1], state[2])
}

/// Velocity sub-vector of a state
#[inline]
pub fn velocity(state: &StateVector) -> Vector3<f64> {
    Vector3::new(state[3], state[4], state[5])
}

/// Assemble a state from position and velocity
#[inline]
pub fn from_parts(position: &Vector3<f64>, velocity: &Vector3<f64>) -> StateVector {
    StateVector::new(
        position.x, position.y, position.z, velocity.x, velocity.y, velocity.z,
    )
}

/// Hint passed to every acceleration evaluation
///
/// Multistep integrators evaluate a forecast state before refining it.
/// Expensive providers may reuse their last corrector-pass result during a
/// predictor pass; cheap providers ignore the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EvaluationMode {
    /// Forecast evaluation, always followed by a corrector pass in the same step
    Predictor,
    /// Full evaluation
    #[default]
    Corrector,
}

/// Canonical distance and time units for a central body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanonicalUnits {
    /// Length of one distance unit in metres
    pub distance_m: f64,
    /// Length of one time unit in seconds
    pub time_s: f64,
}

impl CanonicalUnits {
    /// Units derived from a reference radius and gravitational parameter
    pub fn from_gravitational_parameter(radius_m: f64, mu_m3_s2: f64) -> Result<Self> {
        if !(radius_m > 0.0 && mu_m3_s2 > 0.0 && radius_m.is_finite() && mu_m3_s2.is_finite()) {
            return Err(PropagationError::unsupported(format!(
                "canonical units need a positive radius and gravitational parameter \
                 (got {radius_m}, {mu_m3_s2})"
            )));
        }
        Ok(Self {
            distance_m: radius_m,
            time_s: (radius_m * radius_m * radius_m / mu_m3_s2).sqrt(),
        })
    }

    /// Earth units (WGS-72 radius and GM)
    pub fn earth() -> Self {
        Self {
            distance_m: EARTH_RADIUS_M,
            time_s: (EARTH_RADIUS_M * EARTH_RADIUS_M * EARTH_RADIUS_M / MU_EARTH).sqrt(),
        }
    }

    #[inline]
    pub fn seconds_to_tu(&self, seconds: f64) -> f64 {
        seconds / self.time_s
    }

    #[inline]
    pub fn tu_to_seconds(&self, tu: f64) -> f64 {
        tu * self.time_s
    }

    #[inline]
    pub fn meters_to_du(&self, meters: f64) -> f64 {
        meters / self.distance_m
    }

    #[inline]
    pub fn du_to_meters(&self, du: f64) -> f64 {
        du * self.distance_m
    }

    /// Convert an acceleration in m/s² to DU/TU²
    #[inline]
    pub fn acceleration_to_canonical(&self, accel_m_s2: f64) -> f64 {
        accel_m_s2 * self.time_s * self.time_s / self.distance_m
    }

    /// Duration spanning `tu` time units
    pub fn duration(&self, tu: f64) -> Duration {
        Duration::from_seconds(self.tu_to_seconds(tu))
    }

    /// Gravitational parameter ratio of another body relative to the central body
    pub fn mu_ratio(&self, mu_m3_s2: f64) -> f64 {
        let mu_central = self.distance_m * self.distance_m * self.distance_m
            / (self.time_s * self.time_s);
        mu_m3_s2 / mu_central
    }
}

impl Default for CanonicalUnits {
    fn default() -> Self {
        Self::earth()
    }
}

/// Epoch-tagged orbital state in canonical units
#[derive(Debug, Clone)]
pub struct OrbitalState {
    /// Position (DU)
    pub position: Vector3<f64>,

    /// Velocity (DU/TU)
    pub velocity: Vector3<f64>,

    /// Epoch of this state
    pub epoch: Instant,
}

impl OrbitalState {
    /// Create a new orbital state
    pub fn new(position: Vector3<f64>, velocity: Vector3<f64>, epoch: Instant) -> Self {
        Self {
            position,
            velocity,
            epoch,
        }
    }

    /// Build from a packed state vector
    pub fn from_vector(state: &StateVector, epoch: Instant) -> Self {
        Self::new(position(state), velocity(state), epoch)
    }

    /// Packed state vector
    pub fn to_vector(&self) -> StateVector {
        from_parts(&self.position, &self.velocity)
    }

    /// Reject states the integrators cannot start from
    pub fn validate(&self) -> Result<()> {
        if !self.to_vector().iter().all(|c| c.is_finite()) {
            return Err(PropagationError::InvalidState {
                message: "state has non-finite components".to_string(),
            });
        }
        if self.radius() <= 0.0 {
            return Err(PropagationError::InvalidState {
                message: "position magnitude is zero".to_string(),
            });
        }
        Ok(())
    }

    /// Distance from the central body (DU)
    pub fn radius(&self) -> f64 {
        self.position.norm()
    }

    /// Speed (DU/TU)
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    /// Two-body specific orbital energy with μ = 1
    pub fn specific_energy(&self) -> f64 {
        0.5 * self.velocity.norm_squared() - 1.0 / self.radius()
    }

    /// Specific angular momentum vector
    pub fn angular_momentum(&self) -> Vector3<f64> {
        self.position.cross(&self.velocity)
    }

    /// Semi-major axis (DU, negative for hyperbolic)
    pub fn semi_major_axis(&self) -> f64 {
        -1.0 / (2.0 * self.specific_energy())
    }

    /// Orbital period in TU (only for elliptical orbits)
    pub fn period(&self) -> Option<f64> {
        let a = self.semi_major_axis();
        if a > 0.0 {
            Some(2.0 * std::f64::consts::PI * a.powi(3).sqrt())
        } else {
            None
        }
    }
}

// Physical constants
/// Earth's gravitational parameter (WGS-72) in m³/s²
pub const MU_EARTH: f64 = 3.986008e14;

/// Earth's equatorial radius (WGS-72) in metres
pub const EARTH_RADIUS_M: f64 = 6_378_135.0;

/// Earth's rotation rate in rad/s
pub const OMEGA_EARTH: f64 = 7.292_115_146_7e-5;

/// Sun's gravitational parameter in m³/s²
pub const MU_SUN: f64 = 1.327_124_400_18e20;

/// Moon's gravitational parameter in m³/s²
pub const MU_MOON: f64 = 4.902_800_066e12;

/// Astronomical unit in metres
pub const AU_M: f64 = 149_597_870_700.0;

/// Solar radiation pressure at 1 AU in N/m² (W/m² / c)
pub const SOLAR_PRESSURE_1AU: f64 = 4.56e-6;
