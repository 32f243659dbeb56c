//! Frame conversion between the inertial and body-fixed frames
//!
//! The equations of motion evaluate the central-body field in the body-fixed
//! frame and integrate in the inertial frame. Conversion is delegated to a
//! `FrameConversion` collaborator so the composer never does rotation
//! arithmetic itself.

use nalgebra::{Quaternion, Rotation3, UnitQuaternion, Vector3};
use satkit::Instant;

use crate::error::{PropagationError, Result};

/// IERS tables satkit reads for the IAU-2006 reduction
const IERS_TABLES: [&str; 3] = ["tab5.2a.txt", "tab5.2b.txt", "tab5.2d.txt"];

/// Fail unless satkit's data directory holds `file`
///
/// satkit loads its data files lazily and panics when one is missing, so
/// anything backed by them checks here first.
pub(crate) fn require_data_file(file: &str) -> Result<()> {
    let dir = satkit::utils::datadir()
        .map_err(|e| PropagationError::unsupported(format!("satkit data directory: {e}")))?;
    if dir.join(file).is_file() {
        return Ok(());
    }

    log::warn!("satkit data file {} missing from {}", file, dir.display());
    Err(PropagationError::unsupported(format!(
        "satkit data file {file} not found in {} (see satkit::utils::update_datafiles)",
        dir.display()
    )))
}

/// Inertial ↔ body-fixed vector conversion at a given time
///
/// Implementations are shared read-only between providers and composers,
/// so they must be `Send + Sync` and must not mutate after construction.
pub trait FrameConversion: Send + Sync {
    /// Rotate an inertial vector into body-fixed components
    fn to_body_fixed(&self, time: &Instant, inertial: &Vector3<f64>) -> Result<Vector3<f64>>;

    /// Rotate body-fixed components back into the inertial frame
    fn to_inertial(&self, time: &Instant, body_fixed: &Vector3<f64>) -> Result<Vector3<f64>>;

    /// Name for logging
    fn name(&self) -> &'static str;
}

/// Body-fixed frame coincident with the inertial frame
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFrame;

impl FrameConversion for IdentityFrame {
    fn to_body_fixed(&self, _time: &Instant, inertial: &Vector3<f64>) -> Result<Vector3<f64>> {
        Ok(*inertial)
    }

    fn to_inertial(&self, _time: &Instant, body_fixed: &Vector3<f64>) -> Result<Vector3<f64>> {
        Ok(*body_fixed)
    }

    fn name(&self) -> &'static str {
        "Identity"
    }
}

/// Body-fixed frame spinning uniformly about the inertial z axis
///
/// Cheap analytic stand-in for Earth rotation: the body-fixed x axis sits at
/// `angle_at_reference` from the inertial x axis at `reference`, and turns at
/// `rate_rad_s`.
#[derive(Debug, Clone, Copy)]
pub struct UniformRotation {
    reference: Instant,
    angle_at_reference: f64,
    rate_rad_s: f64,
}

impl UniformRotation {
    pub fn new(reference: Instant, angle_at_reference: f64, rate_rad_s: f64) -> Self {
        Self {
            reference,
            angle_at_reference,
            rate_rad_s,
        }
    }

    /// Earth rotation rate, x axes aligned at `reference`
    pub fn earth(reference: Instant) -> Self {
        Self::new(reference, 0.0, crate::state::OMEGA_EARTH)
    }

    /// Rotation taking body-fixed components to inertial components
    fn rotation(&self, time: &Instant) -> Rotation3<f64> {
        let elapsed = (*time - self.reference).as_seconds();
        let angle = self.angle_at_reference + self.rate_rad_s * elapsed;
        Rotation3::from_axis_angle(&Vector3::z_axis(), angle)
    }
}

impl FrameConversion for UniformRotation {
    fn to_body_fixed(&self, time: &Instant, inertial: &Vector3<f64>) -> Result<Vector3<f64>> {
        Ok(self.rotation(time).inverse() * inertial)
    }

    fn to_inertial(&self, time: &Instant, body_fixed: &Vector3<f64>) -> Result<Vector3<f64>> {
        Ok(self.rotation(time) * body_fixed)
    }

    fn name(&self) -> &'static str {
        "Uniform rotation"
    }
}

/// GCRF ↔ ITRF via satkit's IAU-2006 reduction
///
/// Accuracy depends on the Earth orientation parameters satkit has loaded.
/// Construction fails when the IERS tables are not in satkit's data
/// directory.
#[derive(Debug, Clone, Copy)]
pub struct ItrfFrame {
    _checked: (),
}

impl ItrfFrame {
    pub fn new() -> Result<Self> {
        for table in IERS_TABLES {
            require_data_file(table)?;
        }
        Ok(Self { _checked: () })
    }

    /// Quaternion rotating GCRF components into ITRF
    fn gcrf_to_itrf(time: &Instant) -> UnitQuaternion<f64> {
        let q = satkit::frametransform::qgcrf2itrf(time);
        UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.i, q.j, q.k))
    }
}

impl FrameConversion for ItrfFrame {
    fn to_body_fixed(&self, time: &Instant, inertial: &Vector3<f64>) -> Result<Vector3<f64>> {
        Ok(Self::gcrf_to_itrf(time) * inertial)
    }

    fn to_inertial(&self, time: &Instant, body_fixed: &Vector3<f64>) -> Result<Vector3<f64>> {
        Ok(Self::gcrf_to_itrf(time).inverse() * body_fixed)
    }

    fn name(&self) -> &'static str {
        "GCRF/ITRF (satkit)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satkit::Duration;

    #[test]
    fn test_uniform_rotation_round_trip() {
        let epoch = Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap();
        let frame = UniformRotation::earth(epoch);
        let later = epoch + Duration::from_seconds(3600.0);

        let v = Vector3::new(1.2, -0.4, 0.3);
        let bf = frame.to_body_fixed(&later, &v).unwrap();
        let back = frame.to_inertial(&later, &bf).unwrap();

        assert!((back - v).norm() < 1e-14);
        // z is the spin axis
        assert!((bf.z - v.z).abs() < 1e-15);
        // After an hour the body-fixed frame has turned ~15 degrees
        let angle = v.y.atan2(v.x) - bf.y.atan2(bf.x);
        assert!((angle - crate::state::OMEGA_EARTH * 3600.0).abs() < 1e-12);
    }

    #[test]
    fn test_identity_frame() {
        let epoch = Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap();
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(IdentityFrame.to_body_fixed(&epoch, &v).unwrap(), v);
        assert_eq!(IdentityFrame.to_inertial(&epoch, &v).unwrap(), v);
    }

    #[test]
    fn test_itrf_frame_needs_iers_tables() {
        let epoch = Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap();

        let frame = match ItrfFrame::new() {
            Ok(frame) => frame,
            Err(e) => {
                // No data files on this machine: refused up front
                assert!(matches!(e, PropagationError::UnsupportedConfiguration { .. }));
                return;
            }
        };

        let v = Vector3::new(1.2, -0.4, 0.3);
        let bf = frame.to_body_fixed(&epoch, &v).unwrap();
        let back = frame.to_inertial(&epoch, &bf).unwrap();
        assert!((back - v).norm() < 1e-14);
        assert!((bf.norm() - v.norm()).abs() < 1e-14);

        // Precession since J2000 moves the pole by a few milliradians
        let pole = frame.to_body_fixed(&epoch, &Vector3::z()).unwrap();
        assert!(pole.z > 1.0 - 1e-4);
    }

    #[test]
    fn test_missing_data_file_rejected() {
        assert!(matches!(
            require_data_file("no_such_satkit_file.dat"),
            Err(PropagationError::UnsupportedConfiguration { .. })
        ));
    }
}
