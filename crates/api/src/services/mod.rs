//! Business logic services.
//!
//! Services are generic over the store traits so handlers pass the shared
//! `dyn Store` and tests pass a concrete in-memory store.

pub mod auth;
pub mod contacts;

pub use auth::{AuthError, AuthService};
pub use contacts::{ContactError, ContactInput, ContactService, ContactUpdateInput};
