use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::intake::{IntakeServiceError, LedgerError, RepositoryError};
use crate::workflows::repairs::{RepairError, RepairServiceError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Intake(IntakeServiceError),
    Repair(RepairServiceError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Intake(IntakeServiceError::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Intake(IntakeServiceError::Ledger(
                LedgerError::RewardAlreadyGranted(_)
                | LedgerError::InvalidAmount(_)
                | LedgerError::InsufficientBalance { .. },
            )) => StatusCode::CONFLICT,
            AppError::Intake(IntakeServiceError::Repository(err))
            | AppError::Intake(IntakeServiceError::Ledger(LedgerError::Repository(err)))
            | AppError::Repair(RepairServiceError::Repository(err)) => repository_status(err),
            AppError::Repair(RepairServiceError::Repair(
                RepairError::StatusRegression { .. } | RepairError::WorkOrderRegression { .. },
            )) => StatusCode::CONFLICT,
            AppError::Repair(RepairServiceError::Repair(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) | RepositoryError::Unavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Intake(err) => write!(f, "{}", err),
            AppError::Repair(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Intake(err) => Some(err),
            AppError::Repair(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::Intake(_) | AppError::Repair(_) => Json(json!({
                "error": self.to_string(),
                "saved": false,
                "retryable": status == StatusCode::SERVICE_UNAVAILABLE,
            })),
            _ => Json(json!({ "error": self.to_string() })),
        };
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<IntakeServiceError> for AppError {
    fn from(value: IntakeServiceError) -> Self {
        Self::Intake(value)
    }
}

impl From<RepairServiceError> for AppError {
    fn from(value: RepairServiceError) -> Self {
        Self::Repair(value)
    }
}
