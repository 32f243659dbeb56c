//! Ephemeris sources for perturbing bodies
//!
//! Perturbation providers only ever see the `Ephemeris` trait. Positions are
//! returned in canonical distance units, centred on the central body.
//!
//! # Ephemeris Options
//!
//! - **LowPrecision (lpephem)**: Fast analytical approximations, no external data needed
//! - **HighPrecision (jplephem)**: JPL DE440 ephemeris, ~100MB download, sub-arcsecond accuracy

use nalgebra::Vector3;
use satkit::{jplephem, lpephem, Instant, SolarSystem};
use serde::{Deserialize, Serialize};

use crate::error::{PropagationError, Result};
use crate::frames::{require_data_file, FrameConversion, ItrfFrame};
use crate::state::CanonicalUnits;

/// DE440 file satkit reads for `HighPrecision`, covering 1550 to 2650
const JPL_DE440_FILE: &str = "linux_p1550p2650.440";

/// Frame in which an ephemeris position is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    Inertial,
    BodyFixed,
}

/// Position source for a perturbing body
///
/// Shared read-only between providers (`Arc<dyn Ephemeris>`); must not be
/// mutated once constructed.
pub trait Ephemeris: Send + Sync {
    /// Body position relative to the central body, in DU
    fn position_at(&self, time: &Instant, frame: Frame) -> Result<Vector3<f64>>;

    /// Name for logging
    fn name(&self) -> &'static str;
}

/// Body parked at a fixed position in both frames
#[derive(Debug, Clone, Copy)]
pub struct StaticEphemeris {
    position: Vector3<f64>,
}

impl StaticEphemeris {
    pub fn new(position: Vector3<f64>) -> Self {
        Self { position }
    }
}

impl Ephemeris for StaticEphemeris {
    fn position_at(&self, _time: &Instant, _frame: Frame) -> Result<Vector3<f64>> {
        Ok(self.position)
    }

    fn name(&self) -> &'static str {
        "Static"
    }
}

/// Ephemeris precision level for satkit-backed sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EphemerisType {
    /// Low-precision analytical ephemeris (fast, no external data)
    /// Accuracy: ~0.1° for Sun, ~0.3° for Moon
    #[default]
    LowPrecision,

    /// High-precision JPL DE440 ephemeris (requires ~100MB download)
    /// Accuracy: sub-arcsecond
    HighPrecision,
}

impl EphemerisType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LowPrecision => "Low-Precision (lpephem)",
            Self::HighPrecision => "High-Precision (jplephem/DE440)",
        }
    }
}

/// Perturbing bodies satkit can locate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Body {
    Sun,
    Moon,
}

/// Geocentric Sun/Moon positions from satkit
///
/// Inertial requests return GCRF; body-fixed requests return ITRF and need
/// satkit's IERS tables.
#[derive(Debug, Clone, Copy)]
pub struct SatkitEphemeris {
    body: Body,
    precision: EphemerisType,
    units: CanonicalUnits,
}

impl SatkitEphemeris {
    /// Fails for `HighPrecision` when the DE440 file has not been downloaded
    pub fn new(body: Body, precision: EphemerisType, units: CanonicalUnits) -> Result<Self> {
        if precision == EphemerisType::HighPrecision {
            require_data_file(JPL_DE440_FILE)?;
        }
        Ok(Self::unchecked(body, precision, units))
    }

    fn unchecked(body: Body, precision: EphemerisType, units: CanonicalUnits) -> Self {
        Self {
            body,
            precision,
            units,
        }
    }

    /// Low-precision Sun in Earth canonical units
    pub fn sun() -> Self {
        Self::unchecked(Body::Sun, EphemerisType::LowPrecision, CanonicalUnits::earth())
    }

    /// Low-precision Moon in Earth canonical units
    pub fn moon() -> Self {
        Self::unchecked(Body::Moon, EphemerisType::LowPrecision, CanonicalUnits::earth())
    }

    /// Get ephemeris type
    pub fn ephemeris_type(&self) -> EphemerisType {
        self.precision
    }

    /// GCRF position in metres
    fn gcrf_position_m(&self, epoch: &Instant) -> Result<Vector3<f64>> {
        match self.precision {
            EphemerisType::LowPrecision => {
                let pos = match self.body {
                    Body::Sun => lpephem::sun::pos_gcrf(epoch),
                    Body::Moon => lpephem::moon::pos_gcrf(epoch),
                };
                Ok(Vector3::new(pos[0], pos[1], pos[2]))
            }
            EphemerisType::HighPrecision => {
                let target = match self.body {
                    Body::Sun => SolarSystem::Sun,
                    Body::Moon => SolarSystem::Moon,
                };
                // No silent fallback to lpephem: the caller decides what to do
                let pos = jplephem::geocentric_pos(target, epoch).map_err(|e| {
                    PropagationError::out_of_range(*epoch, format!("JPL ephemeris: {e}"))
                })?;
                Ok(Vector3::new(pos[0], pos[1], pos[2]))
            }
        }
    }
}

impl Ephemeris for SatkitEphemeris {
    fn position_at(&self, time: &Instant, frame: Frame) -> Result<Vector3<f64>> {
        let gcrf = self.gcrf_position_m(time)? / self.units.distance_m;
        match frame {
            Frame::Inertial => Ok(gcrf),
            Frame::BodyFixed => ItrfFrame::new()?.to_body_fixed(time, &gcrf),
        }
    }

    fn name(&self) -> &'static str {
        match (self.body, self.precision) {
            (Body::Sun, EphemerisType::LowPrecision) => "Sun (lpephem)",
            (Body::Sun, EphemerisType::HighPrecision) => "Sun (DE440)",
            (Body::Moon, EphemerisType::LowPrecision) => "Moon (lpephem)",
            (Body::Moon, EphemerisType::HighPrecision) => "Moon (DE440)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AU_M;

    #[test]
    fn test_low_precision_sun_distance() {
        let epoch = Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap();
        let sun = SatkitEphemeris::sun();
        let units = CanonicalUnits::earth();

        let pos = sun.position_at(&epoch, Frame::Inertial).unwrap();
        let au_du = units.meters_to_du(AU_M);

        // Earth-Sun distance stays within ~2% of 1 AU
        assert!((pos.norm() / au_du - 1.0).abs() < 0.02);
    }

    #[test]
    fn test_low_precision_moon_distance() {
        let epoch = Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap();
        let moon = SatkitEphemeris::moon();

        let r = moon.position_at(&epoch, Frame::Inertial).unwrap().norm();
        // Perigee ~56 DU, apogee ~64 DU
        assert!(r > 54.0 && r < 66.0);
    }

    #[test]
    fn test_high_precision_needs_de440() {
        let units = CanonicalUnits::earth();
        let sun = match SatkitEphemeris::new(Body::Sun, EphemerisType::HighPrecision, units) {
            Ok(sun) => sun,
            Err(e) => {
                assert!(matches!(e, PropagationError::UnsupportedConfiguration { .. }));
                return;
            }
        };
        assert_eq!(sun.ephemeris_type(), EphemerisType::HighPrecision);

        let epoch = Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap();
        let pos = sun.position_at(&epoch, Frame::Inertial).unwrap();
        assert!((pos.norm() / units.meters_to_du(AU_M) - 1.0).abs() < 0.02);

        // DE440 ends in 2650
        let late = Instant::from_datetime(2700, 1, 1, 0, 0, 0.0).unwrap();
        assert!(matches!(
            sun.position_at(&late, Frame::Inertial),
            Err(PropagationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_low_precision_needs_no_data() {
        let moon =
            SatkitEphemeris::new(Body::Moon, EphemerisType::LowPrecision, CanonicalUnits::earth())
                .unwrap();
        assert_eq!(moon.ephemeris_type(), EphemerisType::LowPrecision);
        assert_eq!(moon.name(), "Moon (lpephem)");
    }

    #[test]
    fn test_body_fixed_sun_keeps_distance() {
        let epoch = Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap();
        let sun = SatkitEphemeris::sun();
        let inertial = sun.position_at(&epoch, Frame::Inertial).unwrap();

        match sun.position_at(&epoch, Frame::BodyFixed) {
            Ok(fixed) => assert!((fixed.norm() - inertial.norm()).abs() < 1e-9 * inertial.norm()),
            Err(e) => assert!(matches!(e, PropagationError::UnsupportedConfiguration { .. })),
        }
    }

    #[test]
    fn test_static_ephemeris() {
        let epoch = Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap();
        let eph = StaticEphemeris::new(Vector3::new(10.0, 0.0, 0.0));
        assert_eq!(
            eph.position_at(&epoch, Frame::BodyFixed).unwrap(),
            Vector3::new(10.0, 0.0, 0.0)
        );
    }
}
