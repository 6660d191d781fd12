use crate::config::ConfigError;
use crate::store::StoreError;
use crate::telemetry::TelemetryError;
use crate::workflows::ami::{AmiTableError, FormError};
use crate::workflows::search::{FilterChangeError, SessionError, SourceError};
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
    Store(StoreError),
    Session(SessionError),
    FilterChange(FilterChangeError),
    Form(FormError),
    Source(SourceError),
    AmiTable(AmiTableError),
    BadRequest(String),
    Unavailable(&'static str),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Store(err) => write!(f, "state store error: {}", err),
            AppError::Session(err) => write!(f, "search session error: {}", err),
            AppError::FilterChange(err) => write!(f, "invalid filter change: {}", err),
            AppError::Form(err) => write!(f, "invalid estimator input: {}", err),
            AppError::Source(err) => write!(f, "data source error: {}", err),
            AppError::AmiTable(err) => write!(f, "AMI table error: {}", err),
            AppError::BadRequest(message) => write!(f, "bad request: {}", message),
            AppError::Unavailable(what) => write!(f, "{} is not available", what),
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
            AppError::Store(err) => Some(err),
            AppError::Session(err) => Some(err),
            AppError::FilterChange(err) => Some(err),
            AppError::Form(err) => Some(err),
            AppError::Source(err) => Some(err),
            AppError::AmiTable(err) => Some(err),
            AppError::BadRequest(_) | AppError::Unavailable(_) => None,
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::FilterChange(_) | AppError::Session(SessionError::FilterChange(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Session(SessionError::NothingToUndo) => StatusCode::CONFLICT,
            AppError::Form(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Source(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Store(_)
            | AppError::Session(_)
            | AppError::AmiTable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
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

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<SessionError> for AppError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

impl From<FilterChangeError> for AppError {
    fn from(value: FilterChangeError) -> Self {
        Self::FilterChange(value)
    }
}

impl From<FormError> for AppError {
    fn from(value: FormError) -> Self {
        Self::Form(value)
    }
}

impl From<SourceError> for AppError {
    fn from(value: SourceError) -> Self {
        Self::Source(value)
    }
}

impl From<AmiTableError> for AppError {
    fn from(value: AmiTableError) -> Self {
        Self::AmiTable(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_caller_errors_to_client_statuses() {
        let change = AppError::from(FilterChangeError::NotAnInteger("lots".to_string()));
        assert_eq!(change.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let undo = AppError::from(SessionError::NothingToUndo);
        assert_eq!(undo.status(), StatusCode::CONFLICT);

        let unavailable = AppError::Unavailable("AMI table");
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(unavailable.to_string(), "AMI table is not available");
    }

    #[test]
    fn fatal_table_errors_are_server_errors() {
        let err = AppError::from(AmiTableError::MissingFullAmiTier);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
