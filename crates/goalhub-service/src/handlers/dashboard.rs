//! Dashboard aggregation handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;

use goalhub_core::{Booking, BookingStatus};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Number of bookings in `recent_activity`.
const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Days covered by the chart, ending today.
const CHART_DAYS: u64 = 7;

/// Headline numbers.
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    /// Sum of confirmed booking amounts.
    pub revenue: i64,
    /// Number of confirmed bookings.
    pub bookings: usize,
    /// Number of users.
    pub users: i64,
    /// Most recent bookings of any status, newest first.
    pub recent_activity: Vec<Booking>,
}

/// One day of the chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    /// Short weekday, e.g. `Mon`.
    pub date: String,
    /// `YYYY-MM-DD`.
    pub full_date: String,
    /// Confirmed revenue booked that day.
    pub revenue: i64,
    /// Confirmed bookings made that day.
    pub bookings: usize,
}

/// Headline numbers (admin or manager).
pub async fn stats(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<DashboardStats>, ApiError> {
    auth.require_staff()?;

    let bookings = state.store.list_bookings().await?;
    let users = state.store.count_users().await?;

    Ok(Json(summarize(bookings, users)))
}

/// Last seven days of confirmed bookings (admin or manager).
pub async fn chart_data(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<ChartPoint>>, ApiError> {
    auth.require_staff()?;

    let bookings = state.store.list_bookings().await?;
    Ok(Json(chart(&bookings, Utc::now().date_naive())))
}

/// `bookings` must be newest first.
fn summarize(bookings: Vec<Booking>, users: i64) -> DashboardStats {
    let (revenue, confirmed) = bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Confirmed)
        .fold((0, 0), |(revenue, count), b| (revenue + b.amount, count + 1));

    DashboardStats {
        revenue,
        bookings: confirmed,
        users,
        recent_activity: bookings.into_iter().take(RECENT_ACTIVITY_LIMIT).collect(),
    }
}

fn chart(bookings: &[Booking], today: NaiveDate) -> Vec<ChartPoint> {
    let start = today
        .checked_sub_days(Days::new(CHART_DAYS - 1))
        .unwrap_or(today);

    start
        .iter_days()
        .take_while(|day| *day <= today)
        .map(|day| {
            let (revenue, count) = bookings
                .iter()
                .filter(|b| {
                    b.status == BookingStatus::Confirmed && b.created_at.date_naive() == day
                })
                .fold((0, 0), |(revenue, count), b| (revenue + b.amount, count + 1));

            ChartPoint {
                date: day.format("%a").to_string(),
                full_date: day.format("%Y-%m-%d").to_string(),
                revenue,
                bookings: count,
            }
        })
        .collect()
}
