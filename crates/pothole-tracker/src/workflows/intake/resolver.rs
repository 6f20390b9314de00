use serde::{Deserialize, Serialize};

use super::domain::{Coordinates, Pothole};
use super::geo::haversine_meters;
use super::repository::{PotholeLookup, RepositoryError};

pub const DEFAULT_CANDIDATE_WINDOW: usize = 200;
pub const DEFAULT_THRESHOLD_METERS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// How many of the most recently created potholes the proximity scan inspects.
    pub candidate_window: usize,
    /// Inclusive match radius.
    pub threshold_meters: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            candidate_window: DEFAULT_CANDIDATE_WINDOW,
            threshold_meters: DEFAULT_THRESHOLD_METERS,
        }
    }
}

/// How an existing pothole was matched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    Address,
    Proximity { distance_meters: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Existing {
        pothole: Pothole,
        matched_by: MatchKind,
    },
    Novel,
}

impl Resolution {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Resolution::Existing { .. })
    }
}

/// Decides whether a new report describes a pothole that is already on file.
#[derive(Debug, Clone, Default)]
pub struct DuplicateResolver {
    config: ResolverConfig,
}

impl DuplicateResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Exact normalized-address match first; the proximity scan only runs when that misses
    /// and the report carries coordinates. An empty key never matches by address.
    pub fn resolve<L>(
        &self,
        lookup: &L,
        normalized_address: &str,
        coordinates: Option<Coordinates>,
    ) -> Result<Resolution, RepositoryError>
    where
        L: PotholeLookup + ?Sized,
    {
        if !normalized_address.is_empty() {
            if let Some(pothole) = lookup.find_by_normalized_address(normalized_address)? {
                return Ok(Resolution::Existing {
                    pothole,
                    matched_by: MatchKind::Address,
                });
            }
        }

        let Some(origin) = coordinates else {
            return Ok(Resolution::Novel);
        };

        let candidates = lookup.recent_potholes(self.config.candidate_window)?;
        Ok(
            match first_within(&candidates, origin, self.config.threshold_meters) {
                Some((pothole, distance_meters)) => Resolution::Existing {
                    pothole: pothole.clone(),
                    matched_by: MatchKind::Proximity { distance_meters },
                },
                None => Resolution::Novel,
            },
        )
    }
}

/// First candidate, in the given order, lying within `threshold_meters` of `origin`.
/// Candidates without coordinates are skipped. This is not a nearest-neighbour search.
pub fn first_within(
    candidates: &[Pothole],
    origin: Coordinates,
    threshold_meters: f64,
) -> Option<(&Pothole, f64)> {
    candidates.iter().find_map(|candidate| {
        let position = candidate.coordinates?;
        let distance = haversine_meters(origin, position);
        (distance <= threshold_meters).then_some((candidate, distance))
    })
}
