//! Numerical orbit propagation
//!
//! Integrates the motion of one body about a central body, combining a
//! central-body gravity field with any number of additive perturbations,
//! behind interchangeable integrators.
//!
//! # Architecture
//!
//! - **CentralBodyModel / PerturbationModel**: acceleration providers
//!   (zonal gravity, third-body gravity, solar radiation pressure)
//! - **EquationsOfMotion**: owns the providers and turns a state into its
//!   time derivative
//! - **Integrator**: owns one `EquationsOfMotion` and advances the
//!   (time, state, derivative) triple one internal step at a time
//! - **Propagator**: drives an integrator toward a target epoch
//!
//! Frame conversion and ephemerides are collaborators behind the
//! `FrameConversion` and `Ephemeris` traits; satkit-backed implementations
//! are provided. All quantities are in canonical units (`CanonicalUnits`).
//!
//! # Example
//!
//! ```ignore
//! use orbitprop::*;
//! use std::sync::Arc;
//!
//! let units = CanonicalUnits::earth();
//! let sun: Arc<dyn Ephemeris> = Arc::new(SatkitEphemeris::sun());
//!
//! let eom = EquationsOfMotion::new(Box::new(ZonalGravity::new(4)?), Arc::new(ItrfFrame::new()?), units)
//!     .with_perturbation(Box::new(SunGravity::new(sun.clone(), &units)))
//!     .with_perturbation(Box::new(SolarRadiationPressure::new(1.3, 0.01, sun, &units)?));
//!
//! let integrator = GaussJackson::new(eom, &GaussJacksonConfig::default(), epoch, state)?;
//! let mut propagator = Propagator::new(integrator);
//! let result = propagator.propagate_until(target_epoch)?;
//! ```

pub mod ephemeris;
pub mod equations;
pub mod error;
pub mod forces;
pub mod frames;
pub mod integrator;
pub mod settings;
pub mod state;

mod propagator;

// Re-export main types
pub use ephemeris::{Body, Ephemeris, EphemerisType, Frame, SatkitEphemeris, StaticEphemeris};
pub use equations::EquationsOfMotion;
pub use error::{PropagationError, Result};
pub use forces::{
    CachedGravity, CentralBodyModel, PerturbationModel, PointMassGravity, Reflectivity,
    SolarRadiationPressure, SunGravity, ThirdBody, ZonalGravity,
};
pub use frames::{FrameConversion, IdentityFrame, ItrfFrame, UniformRotation};
pub use integrator::{
    GaussJackson, Integrator, MultistepDiagnostics, Regularization, RegularizedRk4, Rk4,
    SundmanTransform,
};
pub use propagator::{PropagationResult, Propagator};
pub use settings::{
    GaussJacksonConfig, IntegratorSettings, IntegratorType, PropagatorConfig, RegularizedConfig,
    Rk4Config,
};
pub use state::{CanonicalUnits, EvaluationMode, OrbitalState, StateVector};
