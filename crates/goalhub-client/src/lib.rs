//! Goalhub Client SDK.
//!
//! Typed access to the public payment endpoints: prompt a customer to pay,
//! wait for the outcome, then book against the completed payment.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use goalhub_client::{ClientOptions, GoalhubClient};
//! use goalhub_core::PaymentStatus;
//!
//! # async fn example(details: goalhub_core::NewBooking) -> Result<(), goalhub_client::ClientError> {
//! let client = GoalhubClient::with_options(
//!     "http://localhost:8000",
//!     ClientOptions::with_bearer_token("user-jwt"),
//! )?;
//!
//! let push = client.initiate_payment("0712345678", 2500).await?;
//! let view = client
//!     .wait_for_payment(&push.checkout_request_id, Duration::from_secs(90))
//!     .await?;
//!
//! if view.status == PaymentStatus::Completed {
//!     let booking = client
//!         .create_booking(&details, Some(&push.checkout_request_id))
//!         .await?;
//!     println!("Booked {}", booking.booking.id);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, GoalhubClient};
pub use error::ClientError;
pub use types::*;
