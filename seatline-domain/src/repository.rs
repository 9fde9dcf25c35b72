use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::booking::{Booking, NewBooking};
use crate::error::SeatResult;
use crate::event::{Event, EventId, NewEvent};

/// Shared handle to the backing store for events and bookings.
///
/// Single-statement reads and writes live here. Anything that must check and
/// write atomically goes through [`SeatStore::begin`].
#[async_trait]
pub trait SeatStore: Send + Sync {
    /// Opens an atomic unit of work.
    async fn begin(&self) -> SeatResult<Box<dyn UnitOfWork>>;

    async fn insert_event(&self, event: &NewEvent) -> SeatResult<Event>;

    async fn find_event(&self, id: EventId) -> SeatResult<Option<Event>>;

    /// All events ordered by scheduled date, then id.
    async fn list_events(&self) -> SeatResult<Vec<Event>>;

    /// Deletes the event and its bookings. Returns `false` if it did not exist.
    async fn delete_event(&self, id: EventId) -> SeatResult<bool>;

    /// All bookings of an event in id order, any status.
    async fn list_bookings(&self, event_id: EventId) -> SeatResult<Vec<Booking>>;

    /// `total_seats - confirmed seats`, or `None` for an unknown event.
    async fn available_seats(&self, event_id: EventId) -> SeatResult<Option<i64>>;

    /// Cancels every pending booking whose payment window closed before `now`.
    async fn expire_pending_older_than(&self, now: DateTime<Utc>) -> SeatResult<u64>;
}

/// An open transaction. Dropping it without `commit` discards every write.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Loads the event and holds its lock until the unit ends.
    async fn lock_event(&mut self, id: EventId) -> SeatResult<Option<Event>>;

    async fn confirmed_seats(&mut self, event_id: EventId) -> SeatResult<i64>;

    /// Seats held by the requester's pending bookings for the event.
    async fn pending_seats_for(&mut self, event_id: EventId, user_name: &str) -> SeatResult<i64>;

    /// Inserts a `pending` booking.
    async fn record_booking(&mut self, booking: &NewBooking) -> SeatResult<Booking>;

    /// Confirms every pending booking of the requester for the event.
    async fn confirm_pending(&mut self, event_id: EventId, user_name: &str) -> SeatResult<u64>;

    async fn commit(self: Box<Self>) -> SeatResult<()>;

    async fn rollback(self: Box<Self>) -> SeatResult<()>;
}
