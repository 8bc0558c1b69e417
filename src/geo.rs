//! Great-circle distances between coordinates.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Pair an optional latitude and longitude; both must be present and finite.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some(Self { lat, lng }),
            _ => None,
        }
    }
}

/// Haversine distance in meters.
pub fn haversine_m(a: Coordinates, b: Coordinates) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Distance from `reference` to an optional point; infinite when the point is unknown.
pub fn distance_or_infinite(reference: Coordinates, lat: Option<f64>, lng: Option<f64>) -> f64 {
    Coordinates::from_parts(lat, lng)
        .map(|point| haversine_m(reference, point))
        .unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let dam = Coordinates::new(52.3728, 4.8936);
        assert_eq!(haversine_m(dam, dam), 0.0);
    }

    #[test]
    fn test_one_degree_of_longitude_at_equator() {
        let d = haversine_m(Coordinates::new(0.0, 0.0), Coordinates::new(0.0, 1.0));
        assert!((d - 111_195.0).abs() < 50.0, "distance {}", d);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Coordinates::new(52.3791, 4.9003);
        let b = Coordinates::new(52.3600, 4.8852);
        assert!((haversine_m(a, b) - haversine_m(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_missing_coordinates_are_infinitely_far() {
        let dam = Coordinates::new(52.3728, 4.8936);
        assert!(distance_or_infinite(dam, None, Some(4.9)).is_infinite());
        assert!(distance_or_infinite(dam, Some(f64::NAN), Some(4.9)).is_infinite());
        assert!(distance_or_infinite(dam, Some(52.3728), Some(4.8936)) < 1e-6);
    }
}
