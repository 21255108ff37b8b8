//! Portal HTTP API.
//!
//! Exposes the connection, appointment and report managers as JSON
//! endpoints under `/api/`. Everything except the health check and the
//! admin routes sits behind the bearer-session middleware:
//! Auth → Audit → Handler.
//!
//! The router is composable: `portal_api_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::portal_api_router;
pub use server::{start_server, PortalServer, ServerInfo};
pub use types::ApiContext;
