//! Core types for the contacts workspace.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact_name;
pub mod id;
pub mod username;

pub use contact_name::{ContactName, ContactNameError};
pub use id::*;
pub use username::{Username, UsernameError};
