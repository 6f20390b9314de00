//! Address canonicalization and great-circle distance used for duplicate detection.

mod distance;
mod normalizer;

pub use distance::{distance_meters, haversine_meters, EARTH_RADIUS_METERS};
pub use normalizer::normalize_address;
