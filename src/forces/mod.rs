//! Acceleration providers
//!
//! Two families feed the equations of motion:
//!
//! - **Central-body models** (`CentralBodyModel`): body-fixed position in,
//!   body-fixed acceleration components out. The caller rotates the result
//!   back into the inertial frame; no Coriolis or centrifugal terms are added.
//! - **Perturbations** (`PerturbationModel`): inertial state in, inertial
//!   acceleration out. Contributions are additive.
//!
//! # Available Models
//!
//! - **ZonalGravity**: point mass plus J2..J4 zonal harmonics
//! - **PointMassGravity**: bare inverse-square field
//! - **CachedGravity**: predictor-pass cache around any central-body model
//! - **ThirdBody / SunGravity**: point-mass third-body perturbation
//! - **SolarRadiationPressure**: cannonball SRP with a coarse eclipse test
//!
//! All providers are `Send + Sync`, so independent integrators on separate
//! threads may each own their own copies.

mod gravity;
mod srp;
mod third_body;

pub use gravity::{CachedGravity, PointMassGravity, ZonalGravity, MAX_ZONAL_DEGREE};
pub use srp::{Reflectivity, SolarRadiationPressure};
pub use third_body::{SunGravity, ThirdBody};

use nalgebra::Vector3;
use satkit::Instant;

use crate::error::Result;
use crate::state::{EvaluationMode, StateVector};

/// Central-body gravity field
pub trait CentralBodyModel: Send + Sync {
    /// Acceleration at a body-fixed position (DU/TU², body-fixed components)
    fn acceleration(&self, position: &Vector3<f64>, mode: EvaluationMode)
        -> Result<Vector3<f64>>;

    /// Model name for debugging and logging
    fn name(&self) -> &'static str;
}

/// Additive perturbing acceleration
pub trait PerturbationModel: Send + Sync {
    /// Inertial acceleration (DU/TU²) at `time` for the inertial `state`
    fn acceleration(
        &self,
        time: &Instant,
        state: &StateVector,
        mode: EvaluationMode,
    ) -> Result<Vector3<f64>>;

    /// Model name for debugging and logging
    fn name(&self) -> &'static str;
}
