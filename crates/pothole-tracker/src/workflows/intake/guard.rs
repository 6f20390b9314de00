use super::domain::{
    Coordinates, LocationType, PhotoUpload, ReportSubmission, ReporterIdentity, Severity,
};
use super::geo::normalize_address;

/// Validation errors raised before anything touches the store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntakeViolation {
    #[error("street address is required")]
    MissingAddress,
    #[error("street address '{0}' contains no letters or digits")]
    UnrecognizableAddress(String),
    #[error("severity must be between 1 and 10 (found {0})")]
    SeverityOutOfRange(i64),
    #[error("latitude and longitude must be supplied together")]
    IncompleteCoordinates,
    #[error("coordinates out of range (lat {latitude}, lon {longitude})")]
    CoordinatesOutOfRange { latitude: f64, longitude: f64 },
    #[error("reporter name is required")]
    MissingReporter,
}

/// Submission that passed validation; the normalized key is computed once here.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedReport {
    pub street_address: String,
    pub normalized_address: String,
    pub severity: Severity,
    pub location: LocationType,
    pub coordinates: Option<Coordinates>,
    pub reporter: ReporterIdentity,
    pub photos: Vec<PhotoUpload>,
}

/// Guard responsible for producing `ValidatedReport` instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    pub fn validate(&self, submission: ReportSubmission) -> Result<ValidatedReport, IntakeViolation> {
        let street_address = submission.street_address.trim().to_string();
        if street_address.is_empty() {
            return Err(IntakeViolation::MissingAddress);
        }

        let normalized_address = normalize_address(&street_address);
        if normalized_address.is_empty() {
            return Err(IntakeViolation::UnrecognizableAddress(street_address));
        }

        let severity = Severity::new(submission.severity)
            .ok_or(IntakeViolation::SeverityOutOfRange(submission.severity))?;

        let coordinates = match (submission.latitude, submission.longitude) {
            (Some(latitude), Some(longitude)) => {
                let position = Coordinates::new(latitude, longitude);
                if !position.is_valid() {
                    return Err(IntakeViolation::CoordinatesOutOfRange {
                        latitude,
                        longitude,
                    });
                }
                Some(position)
            }
            (None, None) => None,
            _ => return Err(IntakeViolation::IncompleteCoordinates),
        };

        let mut reporter = submission.reporter;
        reporter.name = reporter.name.trim().to_string();
        if reporter.name.is_empty() {
            return Err(IntakeViolation::MissingReporter);
        }

        Ok(ValidatedReport {
            street_address,
            normalized_address,
            severity,
            location: submission.location,
            coordinates,
            reporter,
            photos: submission.photos,
        })
    }
}
