use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geo::normalize_address;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Citizen account identifier, trusted as already authenticated.
    UserId
);
numeric_id!(
    /// Store-assigned pothole key.
    PotholeId
);
numeric_id!(ReportId);
numeric_id!(PhotoId);

/// Public tracking code shared with citizens (8 upper-case hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingCode(pub String);

impl TrackingCode {
    pub fn generate() -> Self {
        let raw = Uuid::new_v4().simple().to_string();
        Self(raw[..8].to_ascii_uppercase())
    }

    /// Normalizes user-typed input; `None` when nothing usable remains.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_ascii_uppercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Reported size of the defect on a 1..=10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Severity(u8);

impl Severity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: i64) -> Option<Self> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Some(Self(value as u8))
        } else {
            None
        }
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Severity {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("severity {value} outside 1..=10"))
    }
}

impl From<Severity> for u8 {
    fn from(value: Severity) -> Self {
        value.0
    }
}

/// Where on the carriageway the pothole sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Curb,
    #[default]
    Middle,
    Edge,
}

impl LocationType {
    pub const fn label(self) -> &'static str {
        match self {
            LocationType::Curb => "curb",
            LocationType::Middle => "middle",
            LocationType::Edge => "edge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriorityTier {
    Low,
    Medium,
    High,
}

impl PriorityTier {
    pub const fn label(self) -> &'static str {
        match self {
            PriorityTier::Low => "Low",
            PriorityTier::Medium => "Medium",
            PriorityTier::High => "High",
        }
    }
}

/// Repair lifecycle; only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotholeStatus {
    #[default]
    Reported,
    InProgress,
    Repaired,
}

impl PotholeStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PotholeStatus::Reported => "reported",
            PotholeStatus::InProgress => "in_progress",
            PotholeStatus::Repaired => "repaired",
        }
    }

    /// Staying put counts as a valid transition.
    pub fn can_advance_to(self, next: PotholeStatus) -> bool {
        next >= self
    }
}

/// Contact details of the acting citizen, supplied by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReporterIdentity {
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pothole {
    pub id: PotholeId,
    pub tracking_code: TrackingCode,
    pub street_address: String,
    pub normalized_address: String,
    pub coordinates: Option<Coordinates>,
    pub severity: Severity,
    pub location: LocationType,
    pub priority: PriorityTier,
    pub status: PotholeStatus,
    pub reporter: Option<ReporterIdentity>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pothole awaiting its store-assigned id.
///
/// The normalized key is derived from the raw address here and nowhere else, so a stored
/// record can never disagree with its own address.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPothole {
    tracking_code: TrackingCode,
    street_address: String,
    normalized_address: String,
    pub coordinates: Option<Coordinates>,
    pub severity: Severity,
    pub location: LocationType,
    pub priority: PriorityTier,
    pub reporter: Option<ReporterIdentity>,
}

impl NewPothole {
    pub fn new(
        tracking_code: TrackingCode,
        street_address: impl Into<String>,
        coordinates: Option<Coordinates>,
        severity: Severity,
        location: LocationType,
        priority: PriorityTier,
    ) -> Self {
        let street_address = street_address.into();
        let normalized_address = normalize_address(&street_address);
        Self {
            tracking_code,
            street_address,
            normalized_address,
            coordinates,
            severity,
            location,
            priority,
            reporter: None,
        }
    }

    pub fn with_reporter(mut self, reporter: ReporterIdentity) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn tracking_code(&self) -> &TrackingCode {
        &self.tracking_code
    }

    pub fn street_address(&self) -> &str {
        &self.street_address
    }

    pub fn normalized_address(&self) -> &str {
        &self.normalized_address
    }

    pub fn into_pothole(self, id: PotholeId, now: DateTime<Utc>) -> Pothole {
        Pothole {
            id,
            tracking_code: self.tracking_code,
            street_address: self.street_address,
            normalized_address: self.normalized_address,
            coordinates: self.coordinates,
            severity: self.severity,
            location: self.location,
            priority: self.priority,
            status: PotholeStatus::Reported,
            reporter: self.reporter,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One citizen submission event referencing a pothole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub pothole_id: PotholeId,
    pub reporter_id: UserId,
    pub is_duplicate: bool,
    pub reward_granted: bool,
    pub photo_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub pothole_id: PotholeId,
    pub reporter_id: UserId,
    pub is_duplicate: bool,
    pub photo_count: usize,
}

impl NewReport {
    /// Reports always start unrewarded; the flag flips only alongside a ledger credit.
    pub fn into_report(self, id: ReportId, now: DateTime<Utc>) -> Report {
        Report {
            id,
            pothole_id: self.pothole_id,
            reporter_id: self.reporter_id,
            is_duplicate: self.is_duplicate,
            reward_granted: false,
            photo_count: self.photo_count,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    pub pothole_id: PotholeId,
    pub reporter_id: UserId,
    pub filename: String,
    pub original_filename: String,
    pub media_type: String,
    pub content_hash: String,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhoto {
    pub pothole_id: PotholeId,
    pub reporter_id: UserId,
    pub filename: String,
    pub original_filename: String,
    pub media_type: String,
    pub content_hash: String,
    pub size_bytes: usize,
}

impl NewPhoto {
    pub fn into_photo(self, id: PhotoId, now: DateTime<Utc>) -> Photo {
        Photo {
            id,
            pothole_id: self.pothole_id,
            reporter_id: self.reporter_id,
            filename: self.filename,
            original_filename: self.original_filename,
            media_type: self.media_type,
            content_hash: self.content_hash,
            size_bytes: self.size_bytes,
            created_at: now,
        }
    }
}

/// Uploaded photo bytes as received from the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoUpload {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Raw report as submitted by a citizen, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSubmission {
    pub street_address: String,
    pub severity: i64,
    #[serde(default)]
    pub location: LocationType,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub reporter: ReporterIdentity,
    #[serde(default)]
    pub photos: Vec<PhotoUpload>,
}

/// Counts of potholes per status for public dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: usize,
    pub reported: usize,
    pub in_progress: usize,
    pub repaired: usize,
}

impl StatusSummary {
    pub fn tally<'a>(statuses: impl IntoIterator<Item = &'a PotholeStatus>) -> Self {
        statuses
            .into_iter()
            .fold(Self::default(), |mut summary, status| {
                summary.total += 1;
                match status {
                    PotholeStatus::Reported => summary.reported += 1,
                    PotholeStatus::InProgress => summary.in_progress += 1,
                    PotholeStatus::Repaired => summary.repaired += 1,
                }
                summary
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_bounds_are_inclusive() {
        assert!(Severity::new(0).is_none());
        assert_eq!(Severity::new(1).map(Severity::value), Some(1));
        assert_eq!(Severity::new(10).map(Severity::value), Some(10));
        assert!(Severity::new(11).is_none());
    }

    #[test]
    fn tracking_codes_are_eight_upper_hex_chars() {
        let code = TrackingCode::generate();
        assert_eq!(code.as_str().len(), 8);
        assert!(code
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        assert_eq!(
            TrackingCode::parse("  ab12cd34 "),
            Some(TrackingCode("AB12CD34".to_string()))
        );
        assert_eq!(TrackingCode::parse("   "), None);
    }

    #[test]
    fn new_pothole_derives_normalized_key() {
        let pothole = NewPothole::new(
            TrackingCode("ABCDEF01".to_string()),
            "  12, Main Street!! ",
            None,
            Severity::new(5).expect("valid"),
            LocationType::Curb,
            PriorityTier::Medium,
        );
        assert_eq!(pothole.normalized_address(), "12 main street");
        assert_eq!(pothole.street_address(), "  12, Main Street!! ");
    }

    #[test]
    fn status_only_moves_forward() {
        assert!(PotholeStatus::Reported.can_advance_to(PotholeStatus::InProgress));
        assert!(PotholeStatus::InProgress.can_advance_to(PotholeStatus::InProgress));
        assert!(PotholeStatus::InProgress.can_advance_to(PotholeStatus::Repaired));
        assert!(!PotholeStatus::Repaired.can_advance_to(PotholeStatus::Reported));
    }

    #[test]
    fn status_summary_counts_each_state() {
        let statuses = [
            PotholeStatus::Reported,
            PotholeStatus::Reported,
            PotholeStatus::InProgress,
            PotholeStatus::Repaired,
        ];
        let summary = StatusSummary::tally(statuses.iter());
        assert_eq!(
            summary,
            StatusSummary {
                total: 4,
                reported: 2,
                in_progress: 1,
                repaired: 1,
            }
        );
    }

    #[test]
    fn severity_deserializes_with_range_check() {
        let ok: Severity = serde_json::from_str("7").expect("in range");
        assert_eq!(ok.value(), 7);
        assert!(serde_json::from_str::<Severity>("11").is_err());
    }
}
