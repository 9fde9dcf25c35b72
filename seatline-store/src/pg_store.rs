use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tracing::{debug, error};
use seatline_domain::{
    Booking, BookingStatus, Clock, Event, EventId, NewBooking, NewEvent, SeatError, SeatResult,
    SeatStore, SystemClock, UnitOfWork,
};

/// Postgres-backed store. Every transactional guarantee comes from the database.
///
/// `created_at` is written from the store's clock rather than the database's
/// `NOW()`, so payment deadlines and the sweeper's `now` share one time source.
#[derive(Clone)]
pub struct PostgresSeatStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PostgresSeatStore {
    pub fn new(pool: PgPool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct EventRow {
    id: i64,
    name: String,
    date: DateTime<Utc>,
    total_seats: i32,
    payment_time_minutes: i32,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            name: row.name,
            date: row.date,
            total_seats: row.total_seats,
            payment_time_minutes: row.payment_time_minutes,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    event_id: i64,
    user_name: String,
    seats: i32,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = SeatError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<BookingStatus>()
            .map_err(|e| SeatError::StorageError(e.into()))?;

        Ok(Booking {
            id: row.id,
            event_id: row.event_id,
            user_name: row.user_name,
            seats: row.seats,
            status,
            created_at: row.created_at,
        })
    }
}

const EVENT_COLUMNS: &str = "id, name, date, total_seats, payment_time_minutes, created_at";
const BOOKING_COLUMNS: &str = "id, event_id, user_name, seats, status, created_at";

fn storage(op: &str, err: sqlx::Error) -> SeatError {
    error!("{}: {}", op, err);
    SeatError::storage(err)
}

#[async_trait]
impl SeatStore for PostgresSeatStore {
    async fn begin(&self) -> SeatResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await.map_err(|e| storage("begin", e))?;
        Ok(Box::new(PgUnitOfWork { tx, clock: self.clock.clone() }))
    }

    async fn insert_event(&self, event: &NewEvent) -> SeatResult<Event> {
        let row: EventRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO events (name, date, total_seats, payment_time_minutes, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(&event.name)
        .bind(event.date)
        .bind(event.total_seats)
        .bind(event.payment_time_minutes)
        .bind(self.clock.now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage("insert_event", e))?;

        debug!("Inserted event {} ({})", row.id, row.name);
        Ok(row.into())
    }

    async fn find_event(&self, id: EventId) -> SeatResult<Option<Event>> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| storage("find_event", e))?;

        Ok(row.map(Event::from))
    }

    async fn list_events(&self) -> SeatResult<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM events ORDER BY date ASC, id ASC",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage("list_events", e))?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn delete_event(&self, id: EventId) -> SeatResult<bool> {
        // bookings go with it via ON DELETE CASCADE
        let res = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage("delete_event", e))?;

        Ok(res.rows_affected() > 0)
    }

    async fn list_bookings(&self, event_id: EventId) -> SeatResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE event_id = $1 ORDER BY id ASC",
            BOOKING_COLUMNS
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage("list_bookings", e))?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn available_seats(&self, event_id: EventId) -> SeatResult<Option<i64>> {
        // LEFT JOIN so an event without bookings still yields a row
        let available: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT (e.total_seats - COALESCE(SUM(b.seats), 0))::BIGINT
            FROM events e
            LEFT JOIN bookings b ON e.id = b.event_id AND b.status = 'confirmed'
            WHERE e.id = $1
            GROUP BY e.id, e.total_seats
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage("available_seats", e))?;

        Ok(available)
    }

    async fn expire_pending_older_than(&self, now: DateTime<Utc>) -> SeatResult<u64> {
        let res = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'cancelled'
            FROM events
            WHERE bookings.event_id = events.id
              AND bookings.status = 'pending'
              AND bookings.created_at + make_interval(mins => events.payment_time_minutes) < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| storage("expire_pending_older_than", e))?;

        Ok(res.rows_affected())
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_event(&mut self, id: EventId) -> SeatResult<Option<Event>> {
        let row: Option<EventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM events WHERE id = $1 FOR UPDATE",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| storage("lock_event", e))?;

        Ok(row.map(Event::from))
    }

    async fn confirmed_seats(&mut self, event_id: EventId) -> SeatResult<i64> {
        let seats: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(seats), 0)::BIGINT
            FROM bookings
            WHERE event_id = $1 AND status = 'confirmed'
            "#,
        )
        .bind(event_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| storage("confirmed_seats", e))?;

        Ok(seats)
    }

    async fn pending_seats_for(&mut self, event_id: EventId, user_name: &str) -> SeatResult<i64> {
        let seats: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(seats), 0)::BIGINT
            FROM bookings
            WHERE event_id = $1 AND user_name = $2 AND status = 'pending'
            "#,
        )
        .bind(event_id)
        .bind(user_name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| storage("pending_seats_for", e))?;

        Ok(seats)
    }

    async fn record_booking(&mut self, booking: &NewBooking) -> SeatResult<Booking> {
        let row: BookingRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO bookings (event_id, user_name, seats, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(booking.event_id)
        .bind(&booking.user_name)
        .bind(booking.seats)
        .bind(BookingStatus::Pending.as_str())
        .bind(self.clock.now())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| storage("record_booking", e))?;

        Booking::try_from(row)
    }

    async fn confirm_pending(&mut self, event_id: EventId, user_name: &str) -> SeatResult<u64> {
        let res = sqlx::query(
            r#"
            UPDATE bookings SET status = 'confirmed'
            WHERE event_id = $1 AND user_name = $2 AND status = 'pending'
            "#,
        )
        .bind(event_id)
        .bind(user_name)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| storage("confirm_pending", e))?;

        Ok(res.rows_affected())
    }

    async fn commit(self: Box<Self>) -> SeatResult<()> {
        let PgUnitOfWork { tx, .. } = *self;
        tx.commit().await.map_err(|e| storage("commit", e))
    }

    async fn rollback(self: Box<Self>) -> SeatResult<()> {
        let PgUnitOfWork { tx, .. } = *self;
        tx.rollback().await.map_err(|e| storage("rollback", e))
    }
}
