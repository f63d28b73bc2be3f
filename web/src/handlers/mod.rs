//! HTTP request handlers, one module per resource.

pub mod admin;
pub mod availability;
pub mod bookings;
pub mod health;
pub mod payments;
pub mod tickets;
pub mod tontine;

pub use health::health_check;
