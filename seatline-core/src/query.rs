use tracing::{debug, warn};
use seatline_domain::{EventAvailability, EventDetail, EventId, SeatError, SeatResult};
use crate::catalog::EventCatalog;
use crate::inventory::InventoryEngine;
use crate::ledger::BookingLedger;

/// Read side for the request layer. Composes the other components; every
/// call reads the store afresh.
#[derive(Clone)]
pub struct EventQueries {
    catalog: EventCatalog,
    ledger: BookingLedger,
    inventory: InventoryEngine,
}

impl EventQueries {
    pub fn new(catalog: EventCatalog, ledger: BookingLedger, inventory: InventoryEngine) -> Self {
        Self { catalog, ledger, inventory }
    }

    pub async fn get_event_detail(&self, id: EventId) -> SeatResult<EventDetail> {
        let event = self.catalog.get_event(id).await?;
        let bookings = self.ledger.list_bookings_for_event(id).await?;
        let available_seats = self.inventory.available_seats(id).await?;

        Ok(EventDetail { event, bookings, available_seats })
    }

    pub async fn list_events_with_availability(&self) -> SeatResult<Vec<EventAvailability>> {
        let events = self.catalog.list_events().await?;
        let mut result = Vec::with_capacity(events.len());

        for event in events {
            match self.inventory.available_seats(event.id).await {
                Ok(available_seats) => result.push(EventAvailability { event, available_seats }),
                // deleted between the two reads
                Err(SeatError::NotFound(_)) => {
                    warn!("Event {} vanished while listing", event.id);
                }
                Err(e) => return Err(e),
            }
        }

        debug!("Listed {} events with availability", result.len());
        Ok(result)
    }
}
