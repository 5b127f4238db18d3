//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{bookings, dashboard, events, health, notifications, payments, turfs, users};
use crate::rate_limit::limit_payment_requests;
use crate::security::security_headers;
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent payment initiations.
/// Each one may hold an outbound provider call for up to the push timeout.
const PAYMENT_MAX_CONCURRENT_REQUESTS: usize = 32;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /api/turfs`, `GET /api/events`, `GET /api/events/{id}`
///
/// ## Payments
/// - `POST /api/stkpush` - Initiate STK push (rate limited per IP)
/// - `POST /api/callback` - Provider result callback (always acknowledged,
///   outside the body limit and request timeout)
/// - `GET /api/payment-status/{checkout_request_id}` - Poll status
///
/// ## Bookings (JWT auth)
/// - `GET /api/bookings`, `POST /api/bookings?checkout_request_id=`
/// - `PUT /api/bookings/{id}` - Staff only
///
/// ## Collaborators (JWT auth, role checked per handler)
/// - `POST /api/turfs`, `POST|PUT|DELETE /api/events`
/// - `/api/notifications`, `/api/users`, `/api/dashboard`
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Only payment initiation is rate limited; the callback and status
    // routes are outside the limiter.
    let stk_push_routes = Router::new()
        .route("/stkpush", post(payments::initiate_stk_push))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            limit_payment_requests,
        ))
        .layer(ConcurrencyLimitLayer::new(PAYMENT_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Payments
        .merge(stk_push_routes)
        .route(
            "/payment-status/:checkout_request_id",
            get(payments::payment_status),
        )
        // Bookings
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/bookings/:booking_id", put(bookings::update_booking))
        // Turfs
        .route("/turfs", get(turfs::list_turfs).post(turfs::create_turf))
        // Events
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/:event_id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        // Notifications
        .route(
            "/notifications",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route(
            "/notifications/:notification_id/read",
            put(notifications::mark_notification_read),
        )
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/me", get(users::get_me))
        .route(
            "/users/:user_id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Dashboard
        .route("/dashboard/stats", get(dashboard::stats))
        .route("/dashboard/chart-data", get(dashboard::chart_data))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    let guarded_routes = Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .nest("/api", api_routes)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )));

    // The provider callback is acknowledged whatever happens, so it stays
    // outside the body limit and request timeout. The handler bounds its own read.
    let callback_routes = Router::new().route("/api/callback", post(payments::mpesa_callback));

    guarded_routes
        .merge(callback_routes)
        // Global middleware
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
