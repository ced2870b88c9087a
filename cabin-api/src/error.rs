use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cabin_booking::BookingError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    /// Generator invariant broken; message passed through unchanged.
    UnrecoverableError(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::UnrecoverableError(msg) => {
                tracing::error!("Booking invariant violated: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Booking storage failed; nothing was changed".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let msg = err.to_string();
        match err {
            BookingError::OutOfRange(_) => AppError::NotFoundError(msg),
            BookingError::NotSelectable { .. } => AppError::ConflictError(msg),
            BookingError::NoSeatsSelected | BookingError::MissingPassengerInfo(_) => {
                AppError::ValidationError(msg)
            }
            BookingError::DuplicateReference(_) | BookingError::ReferenceSpaceExhausted(_) => {
                AppError::UnrecoverableError(msg)
            }
            BookingError::PersistenceFailure(_) | BookingError::InvalidLayout(_) => {
                AppError::InternalServerError(msg)
            }
        }
    }
}
