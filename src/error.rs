use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::ApiResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Precondition,
    NotFound,
    Persistence,
}

#[derive(Debug, Error)]
pub enum LeagueError {
    /// Entity rejected at its boundary (bad strength, empty name, same home/away team...)
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation not allowed in the current league state
    #[error("{0}")]
    Precondition(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl LeagueError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::Precondition(reason.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Precondition => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LeagueError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body: ApiResponse<()> = ApiResponse::error(self.to_string());
        (status, Json(body)).into_response()
    }
}

pub type LeagueResult<T> = Result<T, LeagueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_map_to_distinct_statuses() {
        assert_eq!(LeagueError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(LeagueError::precondition("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(LeagueError::not_found("team 1").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            LeagueError::from(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_reason_strings_are_human_readable() {
        assert_eq!(LeagueError::not_found("league 7").to_string(), "league 7 not found");
        assert_eq!(
            LeagueError::precondition("all weeks have been played").to_string(),
            "all weeks have been played"
        );
        assert_eq!(LeagueError::validation("bad").kind(), ErrorKind::Validation);
    }
}
