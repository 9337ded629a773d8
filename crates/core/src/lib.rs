//! Contacts Core - Shared types library.
//!
//! This crate provides the validated types used across the contacts workspace:
//! - `api` - REST API server (users, sessions, contacts)
//! - `cli` - Command-line tools for migrations and index maintenance
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, usernames and contact names

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
