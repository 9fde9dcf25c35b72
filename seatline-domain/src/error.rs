use crate::event::EventId;

#[derive(Debug, thiserror::Error)]
pub enum SeatError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFound(String),
    #[error("not enough seats: requested {requested}, available {available}")]
    CapacityError {
        requested: i64,
        available: i64,
    },
    #[error("Storage error: {0}")]
    StorageError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SeatError {
    pub fn event_not_found(id: EventId) -> Self {
        SeatError::NotFound(format!("event {} not found", id))
    }

    pub fn booking_not_found() -> Self {
        SeatError::NotFound("booking not found".to_string())
    }

    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SeatError::StorageError(Box::new(err))
    }
}

pub type SeatResult<T> = Result<T, SeatError>;
