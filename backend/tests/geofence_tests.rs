//! Attendance geofence tests
//!
//! Tests for the visit location check including:
//! - Property 3: Exactly at the tolerance passes, one meter beyond fails

use proptest::prelude::*;
use shared::geofence::{check_attendance, haversine_distance, GeofenceError, EARTH_RADIUS_M};
use shared::types::GeoPoint;

/// A point `meters` due north of `origin`
fn north_of(origin: GeoPoint, meters: f64) -> GeoPoint {
    let delta_deg = (meters / EARTH_RADIUS_M).to_degrees();
    GeoPoint::new(origin.latitude + delta_deg, origin.longitude)
}

fn monas() -> GeoPoint {
    GeoPoint::new(-6.175392, 106.827153)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Property 3: at the tolerance is accepted
    #[test]
    fn test_exactly_at_tolerance_is_accepted() {
        let store = monas();
        let rep = north_of(store, 200.0);

        let distance = check_attendance(rep, Some(store), 200.0).unwrap();
        assert!((distance - 200.0).abs() < 1e-6);
    }

    /// Property 3: one meter beyond is rejected with the distance in the message
    #[test]
    fn test_one_meter_beyond_is_rejected() {
        let store = monas();
        let rep = north_of(store, 201.0);

        let err = check_attendance(rep, Some(store), 200.0).unwrap_err();
        match &err {
            GeofenceError::TooFar { distance_m, tolerance_m } => {
                assert!((distance_m - 201.0).abs() < 1e-6);
                assert_eq!(*tolerance_m, 200.0);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("201 meters"));
    }

    #[test]
    fn test_missing_customer_location() {
        assert_eq!(
            check_attendance(monas(), None, 200.0),
            Err(GeofenceError::LocationMissing)
        );
    }

    #[test]
    fn test_known_distance_jakarta_bandung() {
        let bandung = GeoPoint::new(-6.917464, 107.619123);
        let km = haversine_distance(monas(), bandung) / 1000.0;
        // roughly 120 km as the crow flies
        assert!(km > 115.0 && km < 125.0, "got {} km", km);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn point_strategy() -> impl Strategy<Value = GeoPoint> {
        (-80.0f64..80.0, -179.0f64..179.0).prop_map(|(lat, lon)| GeoPoint::new(lat, lon))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Distance is symmetric and never negative
        #[test]
        fn prop_distance_symmetric(a in point_strategy(), b in point_strategy()) {
            let ab = haversine_distance(a, b);
            let ba = haversine_distance(b, a);
            prop_assert!(ab >= 0.0);
            prop_assert!((ab - ba).abs() < 1e-6);
        }

        /// Property 3: for any tolerance, the edge passes and edge + 1 m fails
        #[test]
        fn prop_tolerance_edge(origin in point_strategy(), tolerance in 10.0f64..5000.0) {
            prop_assert!(check_attendance(north_of(origin, tolerance), Some(origin), tolerance).is_ok());
            prop_assert!(check_attendance(north_of(origin, tolerance + 1.0), Some(origin), tolerance).is_err());
        }
    }
}
