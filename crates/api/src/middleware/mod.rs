//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (record into the span, echo in the response)
//! 4. CORS (allowed origins and host suffixes)
//! 5. Rate limiting (governor, `/api/users/*` only)
//!
//! Bearer authentication is an extractor ([`RequireAuth`]) rather than a
//! layer, so each handler states whether it needs an owner.

pub mod auth;
pub mod cors;
pub mod rate_limit;
pub mod request_id;

pub use auth::{BearerToken, RequireAuth};
pub use cors::cors_layer;
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
