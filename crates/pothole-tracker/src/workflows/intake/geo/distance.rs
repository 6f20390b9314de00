use crate::workflows::intake::domain::Coordinates;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters, or `None` when any coordinate is missing.
pub fn distance_meters(
    lat1: Option<f64>,
    lon1: Option<f64>,
    lat2: Option<f64>,
    lon2: Option<f64>,
) -> Option<f64> {
    match (lat1, lon1, lat2, lon2) {
        (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) => Some(haversine_meters(
            Coordinates::new(lat1, lon1),
            Coordinates::new(lat2, lon2),
        )),
        _ => None,
    }
}

/// Haversine with `atan2`, which stays defined when rounding pushes the half-chord past 1.
pub fn haversine_meters(from: Coordinates, to: Coordinates) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_phi = (to.latitude - from.latitude).to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let a = ((delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
}
