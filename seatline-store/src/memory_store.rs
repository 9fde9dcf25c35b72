use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use seatline_domain::{
    Booking, BookingStatus, Clock, Event, EventId, NewBooking, NewEvent, SeatResult, SeatStore,
    SystemClock, UnitOfWork,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    events: BTreeMap<EventId, Event>,
    bookings: Vec<Booking>,
    next_event_id: i64,
    next_booking_id: i64,
}

impl MemoryState {
    fn confirmed_seats(&self, event_id: EventId) -> i64 {
        self.bookings
            .iter()
            .filter(|b| b.event_id == event_id && b.status == BookingStatus::Confirmed)
            .map(|b| i64::from(b.seats))
            .sum()
    }
}

/// In-process store with the same contract as the Postgres one.
///
/// A unit of work owns the state lock from `begin` until commit or drop, so
/// units are fully serialized. Writes go to a copy that replaces the state
/// only on commit. Calling other store methods while holding a unit on the
/// same task deadlocks.
#[derive(Clone)]
pub struct InMemorySeatStore {
    state: Arc<Mutex<MemoryState>>,
    clock: Arc<dyn Clock>,
}

impl InMemorySeatStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Timestamps (`created_at`) come from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            clock,
        }
    }
}

impl Default for InMemorySeatStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeatStore for InMemorySeatStore {
    async fn begin(&self) -> SeatResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            clock: self.clock.clone(),
        }))
    }

    async fn insert_event(&self, event: &NewEvent) -> SeatResult<Event> {
        let mut state = self.state.lock().await;
        state.next_event_id += 1;
        let created = Event {
            id: state.next_event_id,
            name: event.name.clone(),
            date: event.date,
            total_seats: event.total_seats,
            payment_time_minutes: event.payment_time_minutes,
            created_at: self.clock.now(),
        };
        state.events.insert(created.id, created.clone());
        debug!("Inserted event {} ({})", created.id, created.name);
        Ok(created)
    }

    async fn find_event(&self, id: EventId) -> SeatResult<Option<Event>> {
        Ok(self.state.lock().await.events.get(&id).cloned())
    }

    async fn list_events(&self) -> SeatResult<Vec<Event>> {
        let mut events: Vec<Event> = self.state.lock().await.events.values().cloned().collect();
        events.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn delete_event(&self, id: EventId) -> SeatResult<bool> {
        let mut state = self.state.lock().await;
        if state.events.remove(&id).is_none() {
            return Ok(false);
        }
        state.bookings.retain(|b| b.event_id != id);
        Ok(true)
    }

    async fn list_bookings(&self, event_id: EventId) -> SeatResult<Vec<Booking>> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .iter()
            .filter(|b| b.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn available_seats(&self, event_id: EventId) -> SeatResult<Option<i64>> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .get(&event_id)
            .map(|e| i64::from(e.total_seats) - state.confirmed_seats(event_id)))
    }

    async fn expire_pending_older_than(&self, now: DateTime<Utc>) -> SeatResult<u64> {
        let mut state = self.state.lock().await;
        let MemoryState { events, bookings, .. } = &mut *state;

        let mut expired = 0;
        for booking in bookings.iter_mut() {
            let Some(event) = events.get(&booking.event_id) else {
                continue;
            };
            if event.payment_deadline(booking.created_at) < now
                && booking.transition(BookingStatus::Cancelled)
            {
                expired += 1;
            }
        }
        Ok(expired)
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_event(&mut self, id: EventId) -> SeatResult<Option<Event>> {
        // the whole state is already locked
        Ok(self.working.events.get(&id).cloned())
    }

    async fn confirmed_seats(&mut self, event_id: EventId) -> SeatResult<i64> {
        Ok(self.working.confirmed_seats(event_id))
    }

    async fn pending_seats_for(&mut self, event_id: EventId, user_name: &str) -> SeatResult<i64> {
        Ok(self
            .working
            .bookings
            .iter()
            .filter(|b| {
                b.event_id == event_id
                    && b.user_name == user_name
                    && b.status == BookingStatus::Pending
            })
            .map(|b| i64::from(b.seats))
            .sum())
    }

    async fn record_booking(&mut self, booking: &NewBooking) -> SeatResult<Booking> {
        self.working.next_booking_id += 1;
        let created = Booking {
            id: self.working.next_booking_id,
            event_id: booking.event_id,
            user_name: booking.user_name.clone(),
            seats: booking.seats,
            status: BookingStatus::Pending,
            created_at: self.clock.now(),
        };
        self.working.bookings.push(created.clone());
        Ok(created)
    }

    async fn confirm_pending(&mut self, event_id: EventId, user_name: &str) -> SeatResult<u64> {
        let mut confirmed = 0;
        for booking in self.working.bookings.iter_mut() {
            if booking.event_id == event_id
                && booking.user_name == user_name
                && booking.transition(BookingStatus::Confirmed)
            {
                confirmed += 1;
            }
        }
        Ok(confirmed)
    }

    async fn commit(self: Box<Self>) -> SeatResult<()> {
        let MemoryUnitOfWork { mut guard, working, .. } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> SeatResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use seatline_domain::ManualClock;

    fn new_event(total_seats: i32, payment_time_minutes: i32) -> NewEvent {
        NewEvent {
            name: "Test Event".to_string(),
            date: Utc.with_ymd_and_hms(2025, 6, 1, 19, 0, 0).unwrap(),
            total_seats,
            payment_time_minutes,
        }
    }

    fn new_booking(event_id: EventId, user_name: &str, seats: i32) -> NewBooking {
        NewBooking { event_id, user_name: user_name.to_string(), seats }
    }

    #[tokio::test]
    async fn test_uncommitted_unit_is_discarded() {
        let store = InMemorySeatStore::new();
        let event = store.insert_event(&new_event(10, 30)).await.unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.record_booking(&new_booking(event.id, "alice", 2)).await.unwrap();
        drop(uow);

        let mut uow = store.begin().await.unwrap();
        uow.record_booking(&new_booking(event.id, "bob", 2)).await.unwrap();
        uow.rollback().await.unwrap();

        assert!(store.list_bookings(event.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_committed_unit_is_visible() {
        let store = InMemorySeatStore::new();
        let event = store.insert_event(&new_event(10, 30)).await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let booking = uow.record_booking(&new_booking(event.id, "alice", 4)).await.unwrap();
        assert_eq!(uow.confirm_pending(event.id, "alice").await.unwrap(), 1);
        uow.commit().await.unwrap();

        let bookings = store.list_bookings(event.id).await.unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].id, booking.id);
        assert_eq!(bookings[0].status, BookingStatus::Confirmed);
        assert_eq!(store.available_seats(event.id).await.unwrap(), Some(6));
    }

    #[tokio::test]
    async fn test_expiry_uses_each_events_window() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let store = InMemorySeatStore::with_clock(Arc::new(clock.clone()));

        let short = store.insert_event(&new_event(10, 5)).await.unwrap();
        let long = store.insert_event(&new_event(10, 60)).await.unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.record_booking(&new_booking(short.id, "alice", 1)).await.unwrap();
        uow.record_booking(&new_booking(long.id, "bob", 1)).await.unwrap();
        uow.commit().await.unwrap();

        // exactly at the deadline nothing expires
        assert_eq!(store.expire_pending_older_than(start + Duration::minutes(5)).await.unwrap(), 0);
        assert_eq!(store.expire_pending_older_than(start + Duration::minutes(6)).await.unwrap(), 1);
        assert_eq!(store.expire_pending_older_than(start + Duration::minutes(61)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_terminal_bookings_never_change_status() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let store = InMemorySeatStore::with_clock(Arc::new(clock.clone()));
        let event = store.insert_event(&new_event(10, 5)).await.unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.record_booking(&new_booking(event.id, "alice", 1)).await.unwrap();
        uow.record_booking(&new_booking(event.id, "bob", 2)).await.unwrap();
        uow.confirm_pending(event.id, "bob").await.unwrap();
        uow.commit().await.unwrap();

        // alice's hold lapses, bob's confirmed seats stay
        assert_eq!(store.expire_pending_older_than(start + Duration::minutes(6)).await.unwrap(), 1);

        clock.advance(Duration::minutes(10));
        let mut uow = store.begin().await.unwrap();
        uow.record_booking(&new_booking(event.id, "alice", 3)).await.unwrap();
        assert_eq!(uow.confirm_pending(event.id, "alice").await.unwrap(), 1);
        assert_eq!(uow.confirm_pending(event.id, "bob").await.unwrap(), 0);
        uow.commit().await.unwrap();

        let statuses: Vec<BookingStatus> =
            store.list_bookings(event.id).await.unwrap().iter().map(|b| b.status).collect();
        assert_eq!(
            statuses,
            vec![BookingStatus::Cancelled, BookingStatus::Confirmed, BookingStatus::Confirmed]
        );
        assert_eq!(store.available_seats(event.id).await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_delete_event_cascades() {
        let store = InMemorySeatStore::new();
        let event = store.insert_event(&new_event(10, 30)).await.unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.record_booking(&new_booking(event.id, "alice", 1)).await.unwrap();
        uow.commit().await.unwrap();

        assert!(store.delete_event(event.id).await.unwrap());
        assert!(!store.delete_event(event.id).await.unwrap());
        assert!(store.list_bookings(event.id).await.unwrap().is_empty());
        assert_eq!(store.available_seats(event.id).await.unwrap(), None);
    }
}
