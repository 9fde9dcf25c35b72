pub mod booking;
pub mod clock;
pub mod error;
pub mod event;
pub mod policy;
pub mod repository;

pub use booking::{Booking, BookingStatus, NewBooking};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{SeatError, SeatResult};
pub use event::{CreateEvent, Event, EventAvailability, EventDetail, EventId, NewEvent};
pub use policy::ConfirmPolicy;
pub use repository::{SeatStore, UnitOfWork};
