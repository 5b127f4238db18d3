//! API handlers.

pub mod bookings;
pub mod dashboard;
pub mod events;
pub mod health;
pub mod notifications;
pub mod payments;
pub mod turfs;
pub mod users;
