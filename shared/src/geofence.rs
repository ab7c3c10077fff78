//! Attendance geofence
//!
//! A visit may only be recorded when the salesperson stands within the
//! configured tolerance of the customer's registered coordinates.

use thiserror::Error;

use crate::types::GeoPoint;

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Distances within this many meters of the tolerance count as on the edge
const DISTANCE_EPSILON_M: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeofenceError {
    #[error("Customer location is not registered; update the customer before recording a visit")]
    LocationMissing,

    #[error("You are too far from the customer ({distance_m:.0} meters, allowed {tolerance_m:.0}); attendance rejected")]
    TooFar { distance_m: f64, tolerance_m: f64 },
}

/// Great-circle distance between two points in meters (haversine)
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Check a submitted position against the customer's registered one
///
/// Returns the measured distance on success. A point exactly at the
/// tolerance is accepted.
pub fn check_attendance(
    submitted: GeoPoint,
    registered: Option<GeoPoint>,
    tolerance_m: f64,
) -> Result<f64, GeofenceError> {
    let registered = registered.ok_or(GeofenceError::LocationMissing)?;
    let distance_m = haversine_distance(submitted, registered);

    if distance_m > tolerance_m + DISTANCE_EPSILON_M {
        return Err(GeofenceError::TooFar {
            distance_m,
            tolerance_m,
        });
    }
    Ok(distance_m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let p = GeoPoint::new(-6.2, 106.8);
        assert_eq!(haversine_distance(p, p), 0.0);
    }

    #[test]
    fn test_one_degree_latitude() {
        let d = haversine_distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((d - 111_194.93).abs() < 0.1);
    }

    #[test]
    fn test_missing_location() {
        let err = check_attendance(GeoPoint::new(0.0, 0.0), None, 200.0).unwrap_err();
        assert_eq!(err, GeofenceError::LocationMissing);
    }

    #[test]
    fn test_too_far_message_has_rounded_distance() {
        let err = GeofenceError::TooFar {
            distance_m: 1234.56,
            tolerance_m: 200.0,
        };
        assert!(err.to_string().contains("1235 meters"));
    }
}
