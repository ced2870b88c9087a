use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use cabin_booking::{BookingMessage, FreeMessage};
use cabin_core::Passenger;
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(book_selected))
        .route("/v1/bookings/free", post(free_selected))
}

async fn book_selected(
    State(state): State<AppState>,
    Json(passenger): Json<Passenger>,
) -> Result<Json<BookingMessage>, AppError> {
    let mut service = state.service.lock().await;
    let message = service.book_selected(&passenger).await?;
    info!("{}", message.message);
    Ok(Json(message))
}

async fn free_selected(State(state): State<AppState>) -> Result<Json<FreeMessage>, AppError> {
    let mut service = state.service.lock().await;
    let message = service.free_selected().await?;
    info!("{}", message.message);
    Ok(Json(message))
}
