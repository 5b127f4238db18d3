//! Booking handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use goalhub_core::{Booking, BookingId, BookingUpdate, CheckoutRequestId, NewBooking, Turf};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for booking creation.
#[derive(Debug, Default, Deserialize)]
pub struct CreateBookingQuery {
    /// Checkout request id of the payment backing this booking.
    #[serde(default)]
    pub checkout_request_id: Option<String>,
}

/// A booking with its turf embedded.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    /// The booking.
    #[serde(flatten)]
    pub booking: Booking,
    /// Full turf details, when the turf still exists.
    pub turf: Option<Turf>,
}

/// Create a booking, confirmed if backed by a completed payment.
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<CreateBookingQuery>,
    Json(details): Json<NewBooking>,
) -> Result<Json<BookingResponse>, ApiError> {
    let checkout_request_id = query
        .checkout_request_id
        .filter(|id| !id.trim().is_empty())
        .map(CheckoutRequestId::new)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let booking = state
        .linker
        .create_booking(details, Some(auth.user.id), checkout_request_id.as_ref())
        .await?;
    let turf = state.store.get_turf(&booking.turf_id).await?;

    Ok(Json(BookingResponse { booking, turf }))
}

/// List bookings, newest first.
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let turfs: HashMap<_, _> = state
        .store
        .list_turfs()
        .await?
        .into_iter()
        .map(|turf| (turf.id, turf))
        .collect();

    let bookings = state
        .store
        .list_bookings()
        .await?
        .into_iter()
        .map(|booking| BookingResponse {
            turf: turfs.get(&booking.turf_id).cloned(),
            booking,
        })
        .collect();

    Ok(Json(bookings))
}

/// Edit a booking (admin or manager).
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(booking_id): Path<BookingId>,
    Json(update): Json<BookingUpdate>,
) -> Result<Json<BookingResponse>, ApiError> {
    auth.require_staff()?;

    let mut booking = state
        .store
        .get_booking(&booking_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".into()))?;

    if let Some(turf_id) = update.turf_id.as_ref() {
        if state.store.get_turf(turf_id).await?.is_none() {
            return Err(ApiError::NotFound(format!("turf not found: {turf_id}")));
        }
    }

    booking.apply(update);
    state.store.update_booking(&booking).await?;

    tracing::info!(
        booking_id = %booking.id,
        status = %booking.status,
        updated_by = %auth.user.id,
        "Booking updated"
    );

    let turf = state.store.get_turf(&booking.turf_id).await?;
    Ok(Json(BookingResponse { booking, turf }))
}
