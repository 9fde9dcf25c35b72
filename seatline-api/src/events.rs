use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use seatline_domain::{Booking, CreateEvent, Event, EventAvailability, EventDetail, EventId};
use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct BookRequest {
    user_name: String,
    seats: i32,
}

#[derive(Debug, Deserialize)]
struct ConfirmRequest {
    user_name: String,
}

#[derive(Debug, Serialize)]
struct ConfirmResponse {
    status: &'static str,
    confirmed: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event).get(list_events))
        .route("/events/{id}", get(get_event).delete(delete_event))
        .route("/events/{id}/book", post(book_seats))
        .route("/events/{id}/confirm", post(confirm_booking))
}

async fn create_event(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateEvent>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let event = state.service.catalog.create_event(req).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventAvailability>>, AppError> {
    let events = state.service.queries.list_events_with_availability().await?;
    Ok(Json(events))
}

async fn get_event(
    State(state): State<AppState>,
    AppPath(id): AppPath<EventId>,
) -> Result<Json<EventDetail>, AppError> {
    let detail = state.service.queries.get_event_detail(id).await?;
    Ok(Json(detail))
}

async fn delete_event(
    State(state): State<AppState>,
    AppPath(id): AppPath<EventId>,
) -> Result<StatusCode, AppError> {
    state.service.catalog.delete_event(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn book_seats(
    State(state): State<AppState>,
    AppPath(id): AppPath<EventId>,
    AppJson(req): AppJson<BookRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state
        .service
        .inventory
        .book_seats(id, &req.user_name, req.seats)
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn confirm_booking(
    State(state): State<AppState>,
    AppPath(id): AppPath<EventId>,
    AppJson(req): AppJson<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, AppError> {
    let confirmed = state.service.ledger.confirm_booking(id, &req.user_name).await?;
    info!("Booking confirmed via API: event {}, user {}", id, req.user_name);
    Ok(Json(ConfirmResponse { status: "confirmed", confirmed }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
