//! M-Pesa Daraja integration.
//!
//! Daraja handles:
//! - OAuth client-credentials token exchange
//! - STK push (Lipa na M-Pesa Online) initiation
//!
//! The asynchronous result arrives later on the callback route and is handled
//! by [`crate::reconcile`].

pub mod client;
pub mod types;

pub use client::{AccessToken, GatewayError, MpesaClient, PushResult};
pub use types::*;
