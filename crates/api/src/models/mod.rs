//! Domain models for the contacts API.
//!
//! These types represent validated domain objects separate from database row
//! types and from request payloads.

pub mod contact;
pub mod session;
pub mod user;

pub use contact::{Contact, ContactChanges, NewContact};
pub use session::{AuthenticatedUser, IssuedToken};
pub use user::User;
