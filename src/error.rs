use std::time::Duration;

use axum::http::{self, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failures of the paste store.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("empty paste")]
    EmptyPaste,
    #[error("title too long ({len} > {max} characters)")]
    TitleTooLong { len: usize, max: usize },
    #[error("no free identifier after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },
    #[error("identifier taken at insert in all {rounds} rounds")]
    IdContention { rounds: u32 },
    #[error("duplicate key")]
    DuplicateKey,
    #[error("not found")]
    NotFound,
    #[error("store unavailable")]
    StoreUnavailable { source: sqlx::Error },
    #[error("store did not respond within {after:?}")]
    TimedOut { after: Duration },
}

impl StoreError {
    /// Whether the failure came from the backing store rather than the request.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::StoreUnavailable { .. } | StoreError::TimedOut { .. }
        )
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            ref error if is_unique_violation(error) => StoreError::DuplicateKey,
            _ => StoreError::StoreUnavailable { source },
        }
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    // sqlite: SQLITE_CONSTRAINT_UNIQUE, SQLITE_CONSTRAINT_PRIMARYKEY; postgres: unique_violation
    matches!(
        error,
        sqlx::Error::Database(db_error)
            if matches!(db_error.code().as_deref(), Some("2067" | "1555" | "23505"))
    )
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    #[error("{source}")]
    Store {
        #[from]
        source: StoreError,
    },
    #[error("missing delete key")]
    MissingDeleteKey,
    #[error("http error")]
    Http {
        #[from]
        source: http::Error,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            ApiError::Store { source } if source.is_unavailable() => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Store { source } => match source {
                StoreError::EmptyPaste | StoreError::TitleTooLong { .. } => {
                    StatusCode::BAD_REQUEST
                }
                StoreError::NotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::MissingDeleteKey => StatusCode::BAD_REQUEST,
            ApiError::Http { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status_code, format!("{self}")).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_is_not_found() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
    }

    #[test]
    fn pool_timeout_is_unavailable() {
        let error = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(error.is_unavailable());
    }

    #[test]
    fn status_codes() {
        let status = |error: StoreError| ApiError::from(error).into_response().status();

        assert_eq!(status(StoreError::EmptyPaste), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(StoreError::TitleTooLong { len: 51, max: 50 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(StoreError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status(StoreError::TimedOut {
                after: Duration::from_secs(1)
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(StoreError::from(sqlx::Error::PoolTimedOut)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(StoreError::AllocationExhausted { attempts: 3 }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(StoreError::IdContention { rounds: 2 }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
