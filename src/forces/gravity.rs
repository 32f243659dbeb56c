//! Central-body gravity models
//!
//! Provides the central-body fields the equations of motion can own:
//! - Point mass (1/r² in canonical units)
//! - Zonal harmonics J2..J4 (closed form)
//! - A predictor-pass cache over either of the above

use nalgebra::Vector3;
use parking_lot::RwLock;

use super::CentralBodyModel;
use crate::error::{PropagationError, Result};
use crate::state::EvaluationMode;

/// Highest zonal degree with a closed-form term
pub const MAX_ZONAL_DEGREE: u8 = 4;

/// Earth zonal coefficients J2, J3, J4 (EGM-96, unnormalised)
const EARTH_ZONALS: [f64; 3] = [1.082_626_683_55e-3, -2.532_656_485_33e-6, -1.619_621_591_37e-6];

/// Inverse-square term with μ = 1
#[inline]
fn point_mass(position: &Vector3<f64>) -> Vector3<f64> {
    let r = position.norm();
    -position / (r * r * r)
}

/// Inverse-square field scaled by a gravitational parameter ratio
///
/// With canonical units of the same body `mu` is exactly 1.
#[derive(Debug, Clone, Copy)]
pub struct PointMassGravity {
    mu: f64,
}

impl PointMassGravity {
    pub fn new() -> Self {
        Self { mu: 1.0 }
    }

    /// Field of a body whose μ is `mu` times the canonical one
    pub fn with_mu(mu: f64) -> Result<Self> {
        if !(mu > 0.0 && mu.is_finite()) {
            return Err(PropagationError::unsupported(format!(
                "gravitational parameter ratio must be positive (got {mu})"
            )));
        }
        Ok(Self { mu })
    }
}

impl Default for PointMassGravity {
    fn default() -> Self {
        Self::new()
    }
}

impl CentralBodyModel for PointMassGravity {
    fn acceleration(
        &self,
        position: &Vector3<f64>,
        _mode: EvaluationMode,
    ) -> Result<Vector3<f64>> {
        let r = position.norm();
        Ok(position * (-self.mu) / (r * r * r))
    }

    fn name(&self) -> &'static str {
        "Point mass gravity"
    }
}

/// Point mass plus J2..J4 zonal harmonics
///
/// Terms are accumulated from the highest requested degree down, each
/// reusing the inverse radius powers already formed. Immutable once built,
/// so a single instance may be evaluated from several threads.
#[derive(Debug, Clone, Copy)]
pub struct ZonalGravity {
    degree: u8,
    zonals: [f64; 3],
}

impl ZonalGravity {
    /// Earth zonal field truncated at `degree` (1 = point mass only)
    pub fn new(degree: u8) -> Result<Self> {
        Self::with_coefficients(degree, EARTH_ZONALS)
    }

    /// Zonal field with explicit J2, J3, J4 (radius = 1 DU, μ = 1)
    pub fn with_coefficients(degree: u8, zonals: [f64; 3]) -> Result<Self> {
        if degree == 0 || degree > MAX_ZONAL_DEGREE {
            log::warn!("Rejecting zonal gravity of degree {}", degree);
            return Err(PropagationError::unsupported(format!(
                "zonal gravity degree {degree} outside 1..={MAX_ZONAL_DEGREE}"
            )));
        }
        Ok(Self { degree, zonals })
    }

    /// Truncation degree
    pub fn degree(&self) -> u8 {
        self.degree
    }

    /// J2 only
    pub fn j2_only() -> Self {
        Self {
            degree: 2,
            zonals: EARTH_ZONALS,
        }
    }

    fn zonal_accel(&self, p: &Vector3<f64>) -> Vector3<f64> {
        let [j2, j3, j4] = self.zonals;
        let (x, y, z) = (p.x, p.y, p.z);

        let r2 = p.norm_squared();
        let inv_r2 = 1.0 / r2;
        let inv_r = inv_r2.sqrt();
        let inv_r3 = inv_r * inv_r2;

        // Degree 1 leaves this zero
        let mut accel = Vector3::zeros();

        if self.degree >= 2 {
            let inv_r5 = inv_r3 * inv_r2;
            let u2 = z * z * inv_r2;

            if self.degree >= 3 {
                let inv_r7 = inv_r5 * inv_r2;

                if self.degree >= 4 {
                    // (15/8) J4 x / r^7 (1 - 14u² + 21u⁴)
                    let u4 = u2 * u2;
                    let f = 0.625 * j4 * inv_r7;
                    let horiz = f * (3.0 - 42.0 * u2 + 63.0 * u4);
                    accel.x += horiz * x;
                    accel.y += horiz * y;
                    accel.z += f * z * (15.0 - 70.0 * u2 + 63.0 * u4);
                }

                // -(5/2) J3 x z / r^7 (3 - 7u²)
                let f = -2.5 * j3 * inv_r7;
                let horiz = f * z * (3.0 - 7.0 * u2);
                accel.x += horiz * x;
                accel.y += horiz * y;
                accel.z += f * r2 * (6.0 * u2 - 7.0 * u2 * u2 - 0.6);
            }

            // -(3/2) J2 x / r^5 (1 - 5u²)
            let f = -1.5 * j2 * inv_r5;
            let horiz = f * (1.0 - 5.0 * u2);
            accel.x += horiz * x;
            accel.y += horiz * y;
            accel.z += f * z * (3.0 - 5.0 * u2);
        }

        accel + point_mass(p)
    }
}

impl CentralBodyModel for ZonalGravity {
    fn acceleration(
        &self,
        position: &Vector3<f64>,
        _mode: EvaluationMode,
    ) -> Result<Vector3<f64>> {
        Ok(self.zonal_accel(position))
    }

    fn name(&self) -> &'static str {
        match self.degree {
            1 => "Zonal gravity (point mass)",
            2 => "Zonal gravity (J2)",
            3 => "Zonal gravity (J2-J3)",
            _ => "Zonal gravity (J2-J4)",
        }
    }
}

/// Predictor-pass cache over a central-body model
///
/// On a corrector pass the wrapped model is evaluated in full and the part
/// beyond the point-mass term is retained. On a predictor pass that retained
/// part is recombined with a fresh point-mass term at the new position, so
/// an expensive field is only expanded once per multistep step.
pub struct CachedGravity<G: CentralBodyModel> {
    model: G,
    residual: RwLock<Option<Vector3<f64>>>,
}

impl<G: CentralBodyModel> CachedGravity<G> {
    pub fn new(model: G) -> Self {
        Self {
            model,
            residual: RwLock::new(None),
        }
    }

    /// Wrapped model
    pub fn inner(&self) -> &G {
        &self.model
    }
}

impl<G: CentralBodyModel> CentralBodyModel for CachedGravity<G> {
    fn acceleration(
        &self,
        position: &Vector3<f64>,
        mode: EvaluationMode,
    ) -> Result<Vector3<f64>> {
        if mode == EvaluationMode::Predictor {
            if let Some(residual) = *self.residual.read() {
                return Ok(point_mass(position) + residual);
            }
        }

        let full = self.model.acceleration(position, EvaluationMode::Corrector)?;
        *self.residual.write() = Some(full - point_mass(position));
        Ok(full)
    }

    fn name(&self) -> &'static str {
        self.model.name()
    }
}
