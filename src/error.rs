use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failure talking to the grade tables
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),
}

/// Every way a personality request can end without a result
#[derive(Error, Debug)]
pub enum PersonaError {
    #[error("subject marks must be valid numbers")]
    InvalidMarks,

    #[error("no grade range covers average {average}")]
    GradeNotFound { average: f64 },

    #[error("no personality pattern contains grade '{grade}'")]
    TraitNotFound { grade: String },

    #[error("grade lookup failed: {0}")]
    GradeLookup(#[source] StoreError),

    #[error("trait lookup failed: {0}")]
    TraitLookup(#[source] StoreError),
}

impl PersonaError {
    pub fn status(&self) -> StatusCode {
        match self {
            PersonaError::InvalidMarks
            | PersonaError::GradeNotFound { .. }
            | PersonaError::TraitNotFound { .. } => StatusCode::BAD_REQUEST,
            PersonaError::GradeLookup(_) | PersonaError::TraitLookup(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Body sent to the caller. Store causes stay in the server log.
    pub fn public_message(&self) -> &'static str {
        match self {
            PersonaError::InvalidMarks => "Error: Subject marks must be valid numbers.",
            PersonaError::GradeNotFound { .. } => "No grade found for the given marks",
            PersonaError::TraitNotFound { .. } => "No personality trait found for the given grade",
            PersonaError::GradeLookup(_) => "Error fetching grade",
            PersonaError::TraitLookup(_) => "Error fetching personality trait",
        }
    }
}

impl IntoResponse for PersonaError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}
