pub mod catalog;
pub mod inventory;
pub mod ledger;
pub mod query;
pub mod sweeper;

pub use catalog::EventCatalog;
pub use inventory::InventoryEngine;
pub use ledger::BookingLedger;
pub use query::EventQueries;
pub use sweeper::ExpirationSweeper;

use std::sync::Arc;
use std::time::Duration;
use seatline_domain::{Clock, ConfirmPolicy, SeatStore, SystemClock};

/// All components wired to one shared store handle.
#[derive(Clone)]
pub struct SeatingService {
    pub catalog: EventCatalog,
    pub ledger: BookingLedger,
    pub inventory: InventoryEngine,
    pub queries: EventQueries,
    clock: Arc<dyn Clock>,
}

impl SeatingService {
    pub fn new(store: Arc<dyn SeatStore>, clock: Arc<dyn Clock>, policy: ConfirmPolicy) -> Self {
        let catalog = EventCatalog::new(store.clone());
        let ledger = BookingLedger::new(store.clone(), policy);
        let inventory = InventoryEngine::new(store, ledger.clone());
        let queries = EventQueries::new(catalog.clone(), ledger.clone(), inventory.clone());

        Self { catalog, ledger, inventory, queries, clock }
    }

    /// System clock and the default confirmation policy.
    pub fn with_store(store: Arc<dyn SeatStore>) -> Self {
        Self::new(store, Arc::new(SystemClock), ConfirmPolicy::default())
    }

    pub fn sweeper(&self, interval: Duration) -> ExpirationSweeper {
        ExpirationSweeper::new(self.ledger.clone(), self.clock.clone(), interval)
    }
}
