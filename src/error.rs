//! Error handling.

use axum::{
    extract::rejection::QueryRejection,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ndarray::ShapeError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::AcquireError;
use tokio::task::JoinError;
use tracing::{event, Level};

use crate::catalog::SelectorKind;

/// MapMaker server error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum MapMakerError {
    /// The underlying dataset file is missing or unreadable
    #[error("dataset {} is unavailable", path.display())]
    DatasetUnavailable {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    /// A spatial axis of the dataset has no coordinates
    #[error("{axis} axis is empty")]
    EmptyAxis { axis: &'static str },

    /// Box or point selection is incomplete or ambiguous
    #[error("either (x, y) or (xMin, xMax, yMin, yMax) must be provided")]
    InvalidSelection,

    /// A selector required by the requested index was not supplied
    #[error("{kind} must be provided")]
    MissingSelector { kind: SelectorKind },

    /// Error reading from an open dataset
    #[error("failed to read dataset")]
    NetCdf(#[from] netcdf::Error),

    /// Error deserialising the query string
    #[error("request data is not valid")]
    RequestQueryRejection(#[from] QueryRejection),

    /// Error validating request data (single error)
    #[error("request data is not valid")]
    RequestDataValidationSingle(#[from] validator::ValidationError),

    /// Error validating request data (multiple errors)
    #[error("request data is not valid")]
    RequestDataValidation(#[from] validator::ValidationErrors),

    /// Error acquiring the dataset lock
    #[error("error acquiring resources")]
    SemaphoreAcquireError(#[from] AcquireError),

    /// Error creating ndarray Array from Shape
    #[error("failed to create array from shape")]
    ShapeInvalid(#[from] ShapeError),

    /// A worker running a data operation failed
    #[error("data operation did not complete")]
    TaskJoin(#[from] JoinError),

    /// Selector string has no entry in the catalog
    #[error("unknown {kind} {value:?}")]
    UnknownSelector { kind: SelectorKind, value: String },

    /// Variable is not numeric, or its dimensions are not (time, lat, lon) or (lat, lon)
    #[error("variable {variable} has an unsupported type or layout")]
    UnsupportedVariable { variable: String },

    /// Variable is not present in the dataset
    #[error("variable {variable} not found in {}", path.display())]
    VariableNotFound { variable: String, path: PathBuf },

    /// Requested year is outside the time extent of the variable
    #[error("year {year} is outside the available range {first}-{last}")]
    YearOutOfRange { year: i32, first: i32, last: i32 },
}

impl IntoResponse for MapMakerError {
    /// Convert from a `MapMakerError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut caused_by = None;
        let mut current = error.source();
        while let Some(source) = current {
            let mut causes: Vec<String> = caused_by.unwrap_or_default();
            causes.push(source.to_string());
            caused_by = Some(causes);
            current = source.source();
        }
        // Remove duplicate entries.
        if let Some(caused_by) = caused_by.as_mut() {
            caused_by.dedup()
        }
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<MapMakerError> for ErrorResponse {
    /// Convert from a `MapMakerError` into an `ErrorResponse`.
    fn from(error: MapMakerError) -> Self {
        let response = match &error {
            // Bad request
            MapMakerError::InvalidSelection
            | MapMakerError::MissingSelector { kind: _ }
            | MapMakerError::RequestQueryRejection(_)
            | MapMakerError::RequestDataValidationSingle(_)
            | MapMakerError::RequestDataValidation(_)
            | MapMakerError::UnknownSelector { kind: _, value: _ }
            | MapMakerError::VariableNotFound {
                variable: _,
                path: _,
            }
            | MapMakerError::YearOutOfRange {
                year: _,
                first: _,
                last: _,
            } => Self::bad_request(&error),

            // Internal server error
            MapMakerError::DatasetUnavailable { path: _, source: _ }
            | MapMakerError::EmptyAxis { axis: _ }
            | MapMakerError::NetCdf(_)
            | MapMakerError::SemaphoreAcquireError(_)
            | MapMakerError::ShapeInvalid(_)
            | MapMakerError::TaskJoin(_)
            | MapMakerError::UnsupportedVariable { variable: _ } => {
                Self::internal_server_error(&error)
            }
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
