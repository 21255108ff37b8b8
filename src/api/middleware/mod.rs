//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Auth validator: bearer token to session to `Caller`
//! 2. Audit logger: logs after auth, has the caller's email
//!
//! Admin routes swap the auth validator for the admin token check.

pub mod admin;
pub mod audit;
pub mod auth;
