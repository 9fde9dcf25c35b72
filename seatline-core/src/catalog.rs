use std::sync::Arc;
use chrono::Utc;
use tracing::{info, warn};
use seatline_domain::{CreateEvent, Event, EventId, NewEvent, SeatError, SeatResult, SeatStore};

/// Event definitions: capacity, schedule and payment window.
#[derive(Clone)]
pub struct EventCatalog {
    store: Arc<dyn SeatStore>,
}

impl EventCatalog {
    pub fn new(store: Arc<dyn SeatStore>) -> Self {
        Self { store }
    }

    pub async fn create_event(&self, request: CreateEvent) -> SeatResult<Event> {
        let new_event = validate(request)?;

        info!(
            "Creating event - Name: {}, Date: {}, Total Seats: {}, Payment Time: {} min",
            new_event.name,
            new_event.date.format("%Y-%m-%d %H:%M:%S"),
            new_event.total_seats,
            new_event.payment_time_minutes
        );

        let event = self.store.insert_event(&new_event).await?;
        info!("Created event with ID: {}", event.id);
        Ok(event)
    }

    pub async fn get_event(&self, id: EventId) -> SeatResult<Event> {
        self.store
            .find_event(id)
            .await?
            .ok_or_else(|| SeatError::event_not_found(id))
    }

    /// Events by scheduled date, earliest first.
    pub async fn list_events(&self) -> SeatResult<Vec<Event>> {
        self.store.list_events().await
    }

    /// Removes the event together with all of its bookings.
    pub async fn delete_event(&self, id: EventId) -> SeatResult<()> {
        if !self.store.delete_event(id).await? {
            warn!("Delete requested for unknown event {}", id);
            return Err(SeatError::event_not_found(id));
        }
        info!("Deleted event {} and its bookings", id);
        Ok(())
    }
}

fn validate(request: CreateEvent) -> SeatResult<NewEvent> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(SeatError::ValidationError("name must not be empty".to_string()));
    }
    if request.total_seats <= 0 {
        return Err(SeatError::ValidationError(format!(
            "total_seats must be positive, got {}",
            request.total_seats
        )));
    }
    if request.payment_time_minutes <= 0 {
        return Err(SeatError::ValidationError(format!(
            "payment_time_minutes must be positive, got {}",
            request.payment_time_minutes
        )));
    }

    Ok(NewEvent {
        name: name.to_string(),
        date: request.date.with_timezone(&Utc),
        total_seats: request.total_seats,
        payment_time_minutes: request.payment_time_minutes,
    })
}
