//! API endpoint handlers.
//!
//! Handlers take the database lock, call into the managers and map the
//! result to a JSON response.

pub mod appointments;
pub mod connections;
pub mod doctors;
pub mod health;
pub mod reports;
