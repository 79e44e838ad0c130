use crate::models::Coordinates;

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Radius used for the inquired-property proximity check
pub const DEFAULT_RADIUS_KM: f64 = 3.0;

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `a` - First point in degrees
/// * `b` - Second point in degrees
///
/// # Returns
/// Distance in kilometers
#[inline]
pub fn haversine_distance(a: Coordinates, b: Coordinates) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Check whether two points lie within `radius_km` of each other (inclusive)
#[inline]
pub fn within_radius(a: Coordinates, b: Coordinates, radius_km: f64) -> bool {
    haversine_distance(a, b) <= radius_km
}

/// Distance between two optional points, if both are known and valid
///
/// A missing side is the degraded path: no distance, no match.
pub fn distance_if_known(a: Option<Coordinates>, b: Option<Coordinates>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) if a.is_valid() && b.is_valid() => Some(haversine_distance(a, b)),
        _ => None,
    }
}
