//! PostgreSQL storage implementation.
//!
//! Rows are read into `FromRow` structs and converted into domain types;
//! status and role columns are plain text checked by the schema.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use goalhub_core::{
    Booking, BookingId, CheckoutRequestId, Event, EventId, Notification, NotificationId, Payment,
    PaymentId, Settlement, Turf, TurfId, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::{SettleResult, Store};

const PAYMENT_COLUMNS: &str = "id, checkout_request_id, merchant_request_id, phone, amount, \
     status, reference, failure_reason, raw_callback, created_at, completed_at";

const BOOKING_COLUMNS: &str = "id, turf_id, user_id, payment_id, date, time_slot, duration, \
     amount, status, customer_name, customer_phone, customer_email, extras, created_at";

const TURF_COLUMNS: &str = "id, name, location, type AS kind, price, image, description";

const EVENT_COLUMNS: &str = "id, title, description, date, time, image, location, created_at";

const NOTIFICATION_COLUMNS: &str = "id, user_id, type AS kind, message, read, created_at";

const USER_COLUMNS: &str = "id, email, name, phone, role, avatar, is_active, created_at";

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database and apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool })
    }
}

fn decode_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Serialization(e.to_string())
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    checkout_request_id: String,
    merchant_request_id: Option<String>,
    phone: String,
    amount: i64,
    status: String,
    reference: Option<String>,
    failure_reason: Option<String>,
    raw_callback: Option<Json<Value>>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self> {
        Ok(Self {
            id: PaymentId::from_uuid(row.id),
            checkout_request_id: CheckoutRequestId::new(row.checkout_request_id)
                .map_err(decode_err)?,
            merchant_request_id: row.merchant_request_id,
            phone: row.phone,
            amount: row.amount,
            status: row.status.parse().map_err(decode_err)?,
            reference: row.reference,
            failure_reason: row.failure_reason,
            raw_callback: row.raw_callback.map(|Json(v)| v),
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    turf_id: Uuid,
    user_id: Option<Uuid>,
    payment_id: Option<Uuid>,
    date: NaiveDate,
    time_slot: String,
    duration: i32,
    amount: i64,
    status: String,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    customer_email: Option<String>,
    extras: Option<Json<Value>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self> {
        Ok(Self {
            id: BookingId::from_uuid(row.id),
            turf_id: TurfId::from_uuid(row.turf_id),
            user_id: row.user_id.map(UserId::from_uuid),
            payment_id: row.payment_id.map(PaymentId::from_uuid),
            date: row.date,
            time_slot: row.time_slot,
            duration: row.duration,
            amount: row.amount,
            status: row.status.parse().map_err(decode_err)?,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_email: row.customer_email,
            extras: row.extras.map(|Json(v)| v),
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TurfRow {
    id: Uuid,
    name: String,
    location: String,
    kind: String,
    price: i64,
    image: Option<String>,
    description: Option<String>,
}

impl From<TurfRow> for Turf {
    fn from(row: TurfRow) -> Self {
        Self {
            id: TurfId::from_uuid(row.id),
            name: row.name,
            location: row.location,
            kind: row.kind,
            price: row.price,
            image: row.image,
            description: row.description,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    date: String,
    time: String,
    image: Option<String>,
    location: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: EventId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            date: row.date,
            time: row.time,
            image: row.image,
            location: row.location,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Option<Uuid>,
    kind: String,
    message: String,
    read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: NotificationId::from_uuid(row.id),
            user_id: row.user_id.map(UserId::from_uuid),
            kind: row.kind,
            message: row.message,
            read: row.read,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: Option<String>,
    phone: Option<String>,
    role: String,
    avatar: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            email: row.email,
            name: row.name,
            phone: row.phone,
            role: row.role.parse().map_err(decode_err)?,
            avatar: row.avatar,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

// ============================================================================
// Store implementation
// ============================================================================

#[async_trait]
impl Store for PgStore {
    async fn insert_payment(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            "INSERT INTO payments (id, checkout_request_id, merchant_request_id, phone, amount, \
             status, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(payment.id.as_uuid())
        .bind(payment.checkout_request_id.as_str())
        .bind(payment.merchant_request_id.as_deref())
        .bind(&payment.phone)
        .bind(payment.amount)
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_payment(
        &self,
        checkout_request_id: &CheckoutRequestId,
    ) -> Result<Option<Payment>> {
        sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE checkout_request_id = $1"
        ))
        .bind(checkout_request_id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(Payment::try_from)
        .transpose()
    }

    async fn settle_payment(
        &self,
        checkout_request_id: &CheckoutRequestId,
        settlement: &Settlement,
        at: DateTime<Utc>,
    ) -> Result<SettleResult> {
        let (reference, failure_reason, raw_callback) = match settlement {
            Settlement::Completed {
                reference,
                raw_callback,
            } => (reference.as_deref(), None, raw_callback),
            Settlement::Failed {
                reason,
                raw_callback,
            } => (None, Some(reason.as_str()), raw_callback),
        };

        let updated = sqlx::query_as::<_, PaymentRow>(&format!(
            "UPDATE payments SET status = $2, reference = $3, failure_reason = $4, \
             raw_callback = $5, completed_at = $6 \
             WHERE checkout_request_id = $1 AND status = 'pending' \
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(checkout_request_id.as_str())
        .bind(settlement.status().as_str())
        .bind(reference)
        .bind(failure_reason)
        .bind(Json(raw_callback))
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(SettleResult::Settled(row.try_into()?));
        }

        Ok(match self.get_payment(checkout_request_id).await? {
            Some(payment) => SettleResult::AlreadySettled(payment),
            None => SettleResult::NotFound,
        })
    }

    async fn insert_booking(&self, booking: &Booking, exclusive_payment: bool) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if let (true, Some(payment_id)) = (exclusive_payment, booking.payment_id) {
            // Serialize concurrent links of the same payment on its row lock.
            sqlx::query("SELECT id FROM payments WHERE id = $1 FOR UPDATE")
                .bind(payment_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;

            let linked: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM bookings WHERE payment_id = $1 LIMIT 1")
                    .bind(payment_id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;

            if linked.is_some() {
                return Err(StoreError::Conflict(format!(
                    "payment {payment_id} is already linked to a booking"
                )));
            }
        }

        sqlx::query(
            "INSERT INTO bookings (id, turf_id, user_id, payment_id, date, time_slot, duration, \
             amount, status, customer_name, customer_phone, customer_email, extras, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.turf_id.as_uuid())
        .bind(booking.user_id.map(|id| *id.as_uuid()))
        .bind(booking.payment_id.map(|id| *id.as_uuid()))
        .bind(booking.date)
        .bind(&booking.time_slot)
        .bind(booking.duration)
        .bind(booking.amount)
        .bind(booking.status.as_str())
        .bind(booking.customer_name.as_deref())
        .bind(booking.customer_phone.as_deref())
        .bind(booking.customer_email.as_deref())
        .bind(booking.extras.as_ref().map(Json))
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_booking(&self, id: &BookingId) -> Result<Option<Booking>> {
        sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map(Booking::try_from)
        .transpose()
    }

    async fn list_bookings(&self) -> Result<Vec<Booking>> {
        sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Booking::try_from)
        .collect()
    }

    async fn update_booking(&self, booking: &Booking) -> Result<()> {
        let result = sqlx::query(
            "UPDATE bookings SET turf_id = $2, date = $3, time_slot = $4, status = $5 \
             WHERE id = $1",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.turf_id.as_uuid())
        .bind(booking.date)
        .bind(&booking.time_slot)
        .bind(booking.status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("booking", booking.id));
        }
        Ok(())
    }

    async fn insert_turf(&self, turf: &Turf) -> Result<()> {
        sqlx::query(
            "INSERT INTO turfs (id, name, location, type, price, image, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(turf.id.as_uuid())
        .bind(&turf.name)
        .bind(&turf.location)
        .bind(&turf.kind)
        .bind(turf.price)
        .bind(turf.image.as_deref())
        .bind(turf.description.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_turf(&self, id: &TurfId) -> Result<Option<Turf>> {
        let row = sqlx::query_as::<_, TurfRow>(&format!(
            "SELECT {TURF_COLUMNS} FROM turfs WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Turf::from))
    }

    async fn list_turfs(&self) -> Result<Vec<Turf>> {
        let rows = sqlx::query_as::<_, TurfRow>(&format!(
            "SELECT {TURF_COLUMNS} FROM turfs ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Turf::from).collect())
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        sqlx::query(
            "INSERT INTO events (id, title, description, date, time, image, location, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(event.id.as_uuid())
        .bind(&event.title)
        .bind(event.description.as_deref())
        .bind(&event.date)
        .bind(&event.time)
        .bind(event.image.as_deref())
        .bind(event.location.as_deref())
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_event(&self, id: &EventId) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Event::from))
    }

    async fn list_events(&self) -> Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn update_event(&self, event: &Event) -> Result<()> {
        let result = sqlx::query(
            "UPDATE events SET title = $2, description = $3, date = $4, time = $5, image = $6, \
             location = $7 WHERE id = $1",
        )
        .bind(event.id.as_uuid())
        .bind(&event.title)
        .bind(event.description.as_deref())
        .bind(&event.date)
        .bind(&event.time)
        .bind(event.image.as_deref())
        .bind(event.location.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("event", event.id));
        }
        Ok(())
    }

    async fn delete_event(&self, id: &EventId) -> Result<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("event", id));
        }
        Ok(())
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, type, message, read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(notification.id.as_uuid())
        .bind(notification.user_id.map(|id| *id.as_uuid()))
        .bind(&notification.kind)
        .bind(&notification.message)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn mark_notification_read(&self, id: &NotificationId) -> Result<Notification> {
        sqlx::query_as::<_, NotificationRow>(&format!(
            "UPDATE notifications SET read = TRUE WHERE id = $1 RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map(Notification::from)
        .ok_or_else(|| StoreError::not_found("notification", id))
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, email, name, phone, role, avatar, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(user.name.as_deref())
        .bind(user.phone.as_deref())
        .bind(user.role.as_str())
        .bind(user.avatar.as_deref())
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, phone = $3, role = $4, avatar = $5, is_active = $6 \
             WHERE id = $1",
        )
        .bind(user.id.as_uuid())
        .bind(user.name.as_deref())
        .bind(user.phone.as_deref())
        .bind(user.role.as_str())
        .bind(user.avatar.as_deref())
        .bind(user.is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", user.id));
        }
        Ok(())
    }

    async fn delete_user(&self, id: &UserId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE bookings SET user_id = NULL WHERE user_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE notifications SET user_id = NULL WHERE user_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn count_users(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
