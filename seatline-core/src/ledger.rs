use std::sync::Arc;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use seatline_domain::{
    Booking, ConfirmPolicy, EventId, NewBooking, SeatError, SeatResult, SeatStore, UnitOfWork,
};

/// Booking records and their status transitions.
#[derive(Clone)]
pub struct BookingLedger {
    store: Arc<dyn SeatStore>,
    policy: ConfirmPolicy,
}

impl BookingLedger {
    pub fn new(store: Arc<dyn SeatStore>, policy: ConfirmPolicy) -> Self {
        Self { store, policy }
    }

    /// Writes a `pending` booking into an open unit. Capacity is the caller's job.
    pub async fn record_booking(
        &self,
        uow: &mut dyn UnitOfWork,
        booking: &NewBooking,
    ) -> SeatResult<Booking> {
        let created = uow.record_booking(booking).await?;
        debug!(
            "Recorded pending booking {} - User: {}, Seats: {}, Event: {}",
            created.id, created.user_name, created.seats, created.event_id
        );
        Ok(created)
    }

    /// Confirms every pending booking `user_name` holds for the event.
    ///
    /// Returns how many bookings were confirmed. With
    /// [`ConfirmPolicy::Revalidate`] either all of them fit into the remaining
    /// capacity and are confirmed, or none is.
    pub async fn confirm_booking(&self, event_id: EventId, user_name: &str) -> SeatResult<u64> {
        validate_requester(user_name)?;
        info!("Confirming booking for user: {}, event ID: {}", user_name, event_id);

        let mut uow = self.store.begin().await?;

        // 1. Serialize against other writers on this event
        let event = match uow.lock_event(event_id).await? {
            Some(event) => event,
            None => return Err(abort(uow, SeatError::booking_not_found()).await),
        };

        // 2. Re-check capacity for everything about to be confirmed
        if self.policy == ConfirmPolicy::Revalidate {
            let pending = uow.pending_seats_for(event_id, user_name).await?;
            if pending == 0 {
                info!("No pending booking found for user: {}, event ID: {}", user_name, event_id);
                return Err(abort(uow, SeatError::booking_not_found()).await);
            }

            let confirmed = uow.confirmed_seats(event_id).await?;
            let available = i64::from(event.total_seats) - confirmed;
            if pending > available {
                warn!(
                    "Refusing confirmation - Pending: {}, Available: {}, User: {}, Event: {}",
                    pending, available, user_name, event_id
                );
                return Err(abort(uow, SeatError::CapacityError { requested: pending, available }).await);
            }
        }

        // 3. Flip pending -> confirmed
        let confirmed = uow.confirm_pending(event_id, user_name).await?;
        if confirmed == 0 {
            info!("No pending booking found for user: {}, event ID: {}", user_name, event_id);
            return Err(abort(uow, SeatError::booking_not_found()).await);
        }

        uow.commit().await?;

        info!(
            "Confirmed {} booking(s) for user: {}, event ID: {}",
            confirmed, user_name, event_id
        );
        Ok(confirmed)
    }

    pub async fn list_bookings_for_event(&self, event_id: EventId) -> SeatResult<Vec<Booking>> {
        let bookings = self.store.list_bookings(event_id).await?;
        debug!("Retrieved {} bookings for event ID: {}", bookings.len(), event_id);
        Ok(bookings)
    }

    /// Cancels pending bookings whose payment window closed before `now`.
    pub async fn expire_pending_older_than(&self, now: DateTime<Utc>) -> SeatResult<u64> {
        let cancelled = self.store.expire_pending_older_than(now).await?;
        if cancelled > 0 {
            info!("Cancelled {} expired bookings", cancelled);
        } else {
            debug!("No expired bookings at {}", now);
        }
        Ok(cancelled)
    }
}

pub(crate) fn validate_requester(user_name: &str) -> SeatResult<()> {
    if user_name.trim().is_empty() {
        return Err(SeatError::ValidationError("user_name must not be empty".to_string()));
    }
    Ok(())
}

/// Rolls the unit back and hands `err` back to the caller.
pub(crate) async fn abort(uow: Box<dyn UnitOfWork>, err: SeatError) -> SeatError {
    if let Err(e) = uow.rollback().await {
        warn!("Rollback failed after {}: {}", err, e);
    }
    err
}
