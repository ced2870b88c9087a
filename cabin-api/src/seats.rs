use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use cabin_booking::{BookingError, SeatRecord, SelectionMessage};
use cabin_core::{Occupancy, SeatPosition};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct SeatStatusResponse {
    seat: String,
    status: String,
}

#[derive(Debug, Serialize)]
struct SelectionResponse {
    seats: Vec<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/seats", get(export_seats))
        .route("/v1/seats/{label}", get(seat_status))
        .route("/v1/seats/{label}/select", post(toggle_selection))
        .route("/v1/selection", get(list_selection).delete(clear_selection))
        .route("/v1/occupancy", get(occupancy))
}

fn parse_label(label: &str) -> Result<SeatPosition, AppError> {
    label
        .parse::<SeatPosition>()
        .map_err(|e| AppError::from(BookingError::from(e)))
}

async fn export_seats(State(state): State<AppState>) -> Json<Vec<SeatRecord>> {
    let service = state.service.lock().await;
    Json(service.export_dataset())
}

async fn seat_status(
    State(state): State<AppState>,
    Path(label): Path<String>,
) -> Result<Json<SeatStatusResponse>, AppError> {
    let pos = parse_label(&label)?;
    let service = state.service.lock().await;
    if !service.seat_map().contains(pos) {
        return Err(BookingError::OutOfRange(pos.label()).into());
    }

    Ok(Json(SeatStatusResponse {
        seat: pos.label(),
        status: service.status_of(pos).await,
    }))
}

async fn toggle_selection(
    State(state): State<AppState>,
    Path(label): Path<String>,
) -> Result<Json<SelectionMessage>, AppError> {
    let pos = parse_label(&label)?;
    let mut service = state.service.lock().await;
    Ok(Json(service.select_toggle(pos)?))
}

async fn list_selection(State(state): State<AppState>) -> Json<SelectionResponse> {
    let service = state.service.lock().await;
    Json(SelectionResponse {
        seats: service.selection(),
    })
}

async fn clear_selection(State(state): State<AppState>) -> Json<SelectionResponse> {
    let mut service = state.service.lock().await;
    service.clear_selection();
    Json(SelectionResponse { seats: Vec::new() })
}

async fn occupancy(State(state): State<AppState>) -> Json<Occupancy> {
    let service = state.service.lock().await;
    Json(service.occupancy())
}
