use serde::{Deserialize, Serialize};
use chrono::{DateTime, FixedOffset, Utc};
use crate::booking::Booking;

pub type EventId = i64;

/// A dated, capacity-bounded resource. `date` and `created_at` are always UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub date: DateTime<Utc>,
    pub total_seats: i32,
    #[serde(rename = "payment_time", alias = "payment_time_minutes")]
    pub payment_time_minutes: i32,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Deadline for a pending booking created at `created_at`.
    pub fn payment_deadline(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + chrono::Duration::minutes(i64::from(self.payment_time_minutes))
    }
}

/// Event creation request as it arrives. `date` may carry any UTC offset.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEvent {
    pub name: String,
    pub date: DateTime<FixedOffset>,
    pub total_seats: i32,
    #[serde(alias = "payment_time")]
    pub payment_time_minutes: i32,
}

/// Validated input for a new event, already normalized to UTC.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub date: DateTime<Utc>,
    pub total_seats: i32,
    pub payment_time_minutes: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    pub event: Event,
    pub bookings: Vec<Booking>,
    pub available_seats: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventAvailability {
    #[serde(flatten)]
    pub event: Event,
    pub available_seats: i64,
}
