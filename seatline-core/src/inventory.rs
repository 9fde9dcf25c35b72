use std::sync::Arc;
use tracing::{debug, info, warn};
use seatline_domain::{Booking, EventId, NewBooking, SeatError, SeatResult, SeatStore};
use crate::ledger::{abort, validate_requester, BookingLedger};

/// The only writer of new bookings.
///
/// Admission is checked against confirmed seats only, so pending holds may
/// add up to more than the event's capacity. Which of them turn into seats
/// is decided at confirmation time (see [`BookingLedger::confirm_booking`]).
#[derive(Clone)]
pub struct InventoryEngine {
    store: Arc<dyn SeatStore>,
    ledger: BookingLedger,
}

impl InventoryEngine {
    pub fn new(store: Arc<dyn SeatStore>, ledger: BookingLedger) -> Self {
        Self { store, ledger }
    }

    pub async fn book_seats(
        &self,
        event_id: EventId,
        user_name: &str,
        seats: i32,
    ) -> SeatResult<Booking> {
        validate_requester(user_name)?;
        if seats <= 0 {
            return Err(SeatError::ValidationError(format!(
                "seats must be positive, got {}",
                seats
            )));
        }

        info!(
            "Starting seat booking - User: {}, Seats: {}, Event ID: {}",
            user_name, seats, event_id
        );

        // 1. Begin unit of work
        let mut uow = self.store.begin().await?;

        // 2. Fresh capacity snapshot under the event lock
        let event = match uow.lock_event(event_id).await? {
            Some(event) => event,
            None => return Err(abort(uow, SeatError::event_not_found(event_id)).await),
        };
        let confirmed = uow.confirmed_seats(event_id).await?;
        let available = i64::from(event.total_seats) - confirmed;

        debug!(
            "Available seats for event {}: {}, requested: {}",
            event_id, available, seats
        );

        // 3. Reject without writing anything
        if available < i64::from(seats) {
            warn!(
                "Not enough seats - Available: {}, Requested: {}, User: {}, Event: {}",
                available, seats, user_name, event_id
            );
            return Err(abort(
                uow,
                SeatError::CapacityError { requested: i64::from(seats), available },
            )
            .await);
        }

        // 4. Record the pending hold in the same unit
        let request = NewBooking {
            event_id,
            user_name: user_name.to_string(),
            seats,
        };
        let booking = self.ledger.record_booking(uow.as_mut(), &request).await?;

        // 5. All or nothing
        uow.commit().await?;

        info!(
            "Created booking ID: {} for user: {}, seats: {}, event: {}",
            booking.id, booking.user_name, booking.seats, booking.event_id
        );
        Ok(booking)
    }

    /// `total_seats - confirmed seats`. Pending holds do not reduce it.
    pub async fn available_seats(&self, event_id: EventId) -> SeatResult<i64> {
        let available = self
            .store
            .available_seats(event_id)
            .await?
            .ok_or_else(|| SeatError::event_not_found(event_id))?;

        debug!("Event ID {} has {} available seats", event_id, available);
        Ok(available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use seatline_domain::{
        BookingStatus, ConfirmPolicy, Event, NewEvent, UnitOfWork,
    };
    use seatline_store::InMemorySeatStore;
    use std::io;

    fn engine(store: Arc<dyn SeatStore>) -> (InventoryEngine, BookingLedger) {
        let ledger = BookingLedger::new(store.clone(), ConfirmPolicy::Revalidate);
        (InventoryEngine::new(store, ledger.clone()), ledger)
    }

    async fn event(store: &dyn SeatStore, total_seats: i32) -> Event {
        store
            .insert_event(&NewEvent {
                name: "Small Event".to_string(),
                date: Utc.with_ymd_and_hms(2025, 6, 1, 19, 0, 0).unwrap(),
                total_seats,
                payment_time_minutes: 30,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fresh_event_has_full_availability() {
        let store = Arc::new(InMemorySeatStore::new());
        let (inventory, _) = engine(store.clone());
        let event = event(store.as_ref(), 100).await;

        assert_eq!(inventory.available_seats(event.id).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_available_seats_unknown_event() {
        let (inventory, _) = engine(Arc::new(InMemorySeatStore::new()));
        assert!(matches!(inventory.available_seats(42).await, Err(SeatError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_book_seats_creates_pending_booking() {
        let store = Arc::new(InMemorySeatStore::new());
        let (inventory, _) = engine(store.clone());
        let event = event(store.as_ref(), 100).await;

        let booking = inventory.book_seats(event.id, "john_doe", 5).await.unwrap();
        assert!(booking.id > 0);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.seats, 5);

        // pending holds never reduce availability
        assert_eq!(inventory.available_seats(event.id).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_sold_out_after_confirmation() {
        let store = Arc::new(InMemorySeatStore::new());
        let (inventory, ledger) = engine(store.clone());
        let event = event(store.as_ref(), 10).await;

        let first = inventory.book_seats(event.id, "user1", 10).await.unwrap();
        assert_eq!(first.id, 1);
        ledger.confirm_booking(event.id, "user1").await.unwrap();

        let err = inventory.book_seats(event.id, "user2", 1).await.unwrap_err();
        assert!(matches!(err, SeatError::CapacityError { requested: 1, available: 0 }));
        assert!(err.to_string().contains("not enough seats"));

        assert_eq!(ledger.list_bookings_for_event(event.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_over_capacity_request_leaves_ledger_unchanged() {
        let store = Arc::new(InMemorySeatStore::new());
        let (inventory, ledger) = engine(store.clone());
        let event = event(store.as_ref(), 5).await;

        assert!(matches!(
            inventory.book_seats(event.id, "greedy", 6).await,
            Err(SeatError::CapacityError { .. })
        ));
        assert!(ledger.list_bookings_for_event(event.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_holds_may_exceed_capacity() {
        let store = Arc::new(InMemorySeatStore::new());
        let (inventory, _) = engine(store.clone());
        let event = event(store.as_ref(), 10).await;

        inventory.book_seats(event.id, "a", 10).await.unwrap();
        inventory.book_seats(event.id, "b", 10).await.unwrap();
    }

    #[tokio::test]
    async fn test_book_seats_validation_and_not_found() {
        let store = Arc::new(InMemorySeatStore::new());
        let (inventory, _) = engine(store.clone());
        let event = event(store.as_ref(), 10).await;

        assert!(matches!(
            inventory.book_seats(event.id, "a", 0).await,
            Err(SeatError::ValidationError(_))
        ));
        assert!(matches!(
            inventory.book_seats(event.id, "", 1).await,
            Err(SeatError::ValidationError(_))
        ));
        assert!(matches!(
            inventory.book_seats(event.id + 1, "a", 1).await,
            Err(SeatError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_book_and_confirm_never_oversell() {
        let store = Arc::new(InMemorySeatStore::new());
        let (inventory, ledger) = engine(store.clone());
        let event_id = event(store.as_ref(), 25).await.id;

        let mut handles = Vec::new();
        for i in 0..40 {
            let inventory = inventory.clone();
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                let user = format!("user{}", i);
                if inventory.book_seats(event_id, &user, 1 + i % 3).await.is_ok() {
                    let _ = ledger.confirm_booking(event_id, &user).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let confirmed: i64 = ledger
            .list_bookings_for_event(event_id)
            .await
            .unwrap()
            .iter()
            .filter(|b| b.status == BookingStatus::Confirmed)
            .map(|b| i64::from(b.seats))
            .sum();
        assert!(confirmed <= 25, "confirmed {} seats of 25", confirmed);
        assert_eq!(inventory.available_seats(event_id).await.unwrap(), 25 - confirmed);
    }

    /// Store whose units always fail to commit.
    struct FailingCommitStore {
        inner: InMemorySeatStore,
    }

    struct FailingCommitUnit {
        inner: Box<dyn UnitOfWork>,
    }

    #[async_trait]
    impl SeatStore for FailingCommitStore {
        async fn begin(&self) -> SeatResult<Box<dyn UnitOfWork>> {
            Ok(Box::new(FailingCommitUnit { inner: self.inner.begin().await? }))
        }
        async fn insert_event(&self, event: &NewEvent) -> SeatResult<Event> {
            self.inner.insert_event(event).await
        }
        async fn find_event(&self, id: EventId) -> SeatResult<Option<Event>> {
            self.inner.find_event(id).await
        }
        async fn list_events(&self) -> SeatResult<Vec<Event>> {
            self.inner.list_events().await
        }
        async fn delete_event(&self, id: EventId) -> SeatResult<bool> {
            self.inner.delete_event(id).await
        }
        async fn list_bookings(&self, event_id: EventId) -> SeatResult<Vec<Booking>> {
            self.inner.list_bookings(event_id).await
        }
        async fn available_seats(&self, event_id: EventId) -> SeatResult<Option<i64>> {
            self.inner.available_seats(event_id).await
        }
        async fn expire_pending_older_than(&self, now: DateTime<Utc>) -> SeatResult<u64> {
            self.inner.expire_pending_older_than(now).await
        }
    }

    #[async_trait]
    impl UnitOfWork for FailingCommitUnit {
        async fn lock_event(&mut self, id: EventId) -> SeatResult<Option<Event>> {
            self.inner.lock_event(id).await
        }
        async fn confirmed_seats(&mut self, event_id: EventId) -> SeatResult<i64> {
            self.inner.confirmed_seats(event_id).await
        }
        async fn pending_seats_for(&mut self, event_id: EventId, user_name: &str) -> SeatResult<i64> {
            self.inner.pending_seats_for(event_id, user_name).await
        }
        async fn record_booking(&mut self, booking: &NewBooking) -> SeatResult<Booking> {
            self.inner.record_booking(booking).await
        }
        async fn confirm_pending(&mut self, event_id: EventId, user_name: &str) -> SeatResult<u64> {
            self.inner.confirm_pending(event_id, user_name).await
        }
        async fn commit(self: Box<Self>) -> SeatResult<()> {
            let FailingCommitUnit { inner } = *self;
            inner.rollback().await?;
            Err(SeatError::storage(io::Error::new(io::ErrorKind::BrokenPipe, "connection lost")))
        }
        async fn rollback(self: Box<Self>) -> SeatResult<()> {
            self.inner.rollback().await
        }
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_booking() {
        let store = Arc::new(FailingCommitStore { inner: InMemorySeatStore::new() });
        let (inventory, ledger) = engine(store.clone());
        let event = event(store.as_ref(), 10).await;

        let err = inventory.book_seats(event.id, "alice", 2).await.unwrap_err();
        assert!(matches!(err, SeatError::StorageError(_)));
        assert!(ledger.list_bookings_for_event(event.id).await.unwrap().is_empty());
    }
}
