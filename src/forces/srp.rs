//! Solar radiation pressure force model
//!
//! Cannonball model: the body is a sphere, so the acceleration always points
//! along the Sun-to-body line and scales with the inverse square of the
//! distance from the Sun.
//!
//! # Eclipse test
//!
//! Shadowing uses a cheap angular check rather than a cylindrical or conical
//! umbra/penumbra model. The body is judged in shadow when it lies on the
//! same side of the central body as the Sun (positive dot product of the two
//! position vectors) and the angle between the two directions, scaled by the
//! body's distance, is under one central-body radius. Scenario results built
//! on this approximation depend on its exact behaviour, so it is kept as is.

use std::sync::Arc;

use nalgebra::Vector3;
use satkit::Instant;
use serde::{Deserialize, Serialize};

use super::PerturbationModel;
use crate::ephemeris::{Ephemeris, Frame};
use crate::error::{PropagationError, Result};
use crate::state::{self, CanonicalUnits, EvaluationMode, StateVector, AU_M, SOLAR_PRESSURE_1AU};

/// Reflectivity coefficient split into its reflected and absorbed fractions
///
/// The coefficient runs from 0 (translucent) through 1 (black body) to 2
/// (perfect reflector). Below 1 the surface only absorbs part of the light;
/// above 1 the excess over a black body is specular reflection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reflectivity {
    /// Fraction of incident light reflected
    pub reflected: f64,
    /// Fraction of incident light absorbed or diffused
    pub absorbed: f64,
}

impl Reflectivity {
    /// Split a reflectivity coefficient in [0, 2]
    pub fn from_coefficient(cr: f64) -> Result<Self> {
        if !(0.0..=2.0).contains(&cr) {
            return Err(PropagationError::unsupported(format!(
                "reflectivity coefficient {cr} outside [0, 2]"
            )));
        }
        Ok(if cr <= 1.0 {
            Self {
                reflected: 0.0,
                absorbed: cr,
            }
        } else {
            let reflected = cr - 1.0;
            Self {
                reflected,
                absorbed: 1.0 - reflected,
            }
        })
    }

    /// Momentum transfer coefficient (absorbed photons push once, reflected twice)
    pub fn coefficient(&self) -> f64 {
        self.absorbed + 2.0 * self.reflected
    }
}

/// Solar radiation pressure force model
pub struct SolarRadiationPressure {
    reflectivity: Reflectivity,

    /// Pressure at 1 AU times area-to-mass, in DU/TU²
    accel_1au: f64,

    /// One astronomical unit in DU
    au: f64,

    sun: Arc<dyn Ephemeris>,
}

impl SolarRadiationPressure {
    /// Cannonball SRP for reflectivity `cr` and area-to-mass ratio in m²/kg
    pub fn new(
        cr: f64,
        area_to_mass_m2_kg: f64,
        sun: Arc<dyn Ephemeris>,
        units: &CanonicalUnits,
    ) -> Result<Self> {
        let reflectivity = Reflectivity::from_coefficient(cr)?;
        if !(area_to_mass_m2_kg >= 0.0 && area_to_mass_m2_kg.is_finite()) {
            return Err(PropagationError::unsupported(format!(
                "area-to-mass ratio must be non-negative (got {area_to_mass_m2_kg})"
            )));
        }

        Ok(Self {
            reflectivity,
            accel_1au: units.acceleration_to_canonical(SOLAR_PRESSURE_1AU * area_to_mass_m2_kg),
            au: units.meters_to_du(AU_M),
            sun,
        })
    }

    pub fn reflectivity(&self) -> Reflectivity {
        self.reflectivity
    }

    /// Angular shadow test (see module docs)
    pub fn in_shadow(sat_pos: &Vector3<f64>, sun_pos: &Vector3<f64>) -> bool {
        if sat_pos.dot(sun_pos) <= 0.0 {
            return false;
        }
        let r = sat_pos.norm();
        sat_pos.angle(sun_pos) * r < 1.0
    }
}

impl PerturbationModel for SolarRadiationPressure {
    fn acceleration(
        &self,
        time: &Instant,
        state: &StateVector,
        _mode: EvaluationMode,
    ) -> Result<Vector3<f64>> {
        let sun_pos = self.sun.position_at(time, Frame::Inertial)?;
        let sat_pos = state::position(state);

        if Self::in_shadow(&sat_pos, &sun_pos) {
            return Ok(Vector3::zeros());
        }

        // Unit vector away from Sun
        let r_sun_sat = sat_pos - sun_pos;
        let d = r_sun_sat.norm();
        let scale = self.au / d;

        Ok(self.accel_1au * self.reflectivity.coefficient() * scale * scale * (r_sun_sat / d))
    }

    fn name(&self) -> &'static str {
        "Solar radiation pressure"
    }
}
