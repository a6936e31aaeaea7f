//! HTTP mapping of songbook errors.

use super::metrics::record_error;
use crate::songbook::SongbookError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

pub type ApiResult<T> = Result<T, SongbookError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl SongbookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SongbookError::NotFound(_) => StatusCode::NOT_FOUND,
            SongbookError::Invalid { .. } => StatusCode::BAD_REQUEST,
            SongbookError::Forbidden => StatusCode::FORBIDDEN,
            SongbookError::Conflict(_) => StatusCode::CONFLICT,
            SongbookError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SongbookError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            SongbookError::Store(err) => {
                error!("Store failure: {:?}", err);
                record_error("store");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(
            SongbookError::not_found("song", "x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SongbookError::invalid("title", "is required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(SongbookError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            SongbookError::Conflict("taken".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            SongbookError::Store(anyhow::anyhow!("disk")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_details_stay_private() {
        let response = SongbookError::Store(anyhow::anyhow!("secret path")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
