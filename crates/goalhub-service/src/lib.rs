//! Goalhub HTTP API Service.
//!
//! This crate provides the HTTP API for the Goalhub turf booking platform:
//!
//! - M-Pesa STK push initiation and callback reconciliation
//! - Payment status polling
//! - Bookings gated on completed payments
//! - Turfs, events, notifications, users and the staff dashboard
//!
//! # Payment flow
//!
//! 1. `POST /api/stkpush` asks Daraja to prompt the customer's phone. An
//!    accepted push is recorded as a `pending` payment keyed by its
//!    `CheckoutRequestID`.
//! 2. Daraja posts the outcome to `POST /api/callback`. The first callback
//!    for a pending payment moves it to `completed` or `failed`; every callback
//!    is acknowledged the same way.
//! 3. The client polls `GET /api/payment-status/{id}` and then creates a
//!    booking with `POST /api/bookings?checkout_request_id={id}`, which is
//!    confirmed only if the payment completed.
//!
//! # Authentication
//!
//! Bearer JWTs from the identity provider, verified against its JWKS. In
//! development without a JWKS URL, `mock-token-<uid>` tokens are accepted.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for the Axum signature

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod linkage;
pub mod mpesa;
pub mod rate_limit;
pub mod reconcile;
pub mod routes;
pub mod security;
pub mod state;

pub use config::{ConfigError, Environment, PaymentReusePolicy, ServiceConfig};
pub use error::ApiError;
pub use linkage::{BookingLinker, LinkageError};
pub use mpesa::{AccessToken, GatewayError, MpesaClient};
pub use reconcile::{CallbackOutcome, EngineError, ReconciliationEngine};
pub use routes::create_router;
pub use state::AppState;
