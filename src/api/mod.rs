//! # HTTP Trigger
//!
//! Exposes the connectivity probe over HTTP so it can sit behind a function
//! URL or a load balancer health check. Each request to `/` or `/ping-db`
//! runs one invocation; all requests share the process-wide secret cache.

pub mod handlers;
pub mod routes;
pub mod server;

pub use routes::{build_router, ApiState};
pub use server::start_api_server;
