//! Tillpoint Core - Shared types library.
//!
//! This crate provides common types used across all Tillpoint components:
//! - `client` - Session store, API gateway and navigation guards for the dashboard
//! - `api` - Authentication and settings HTTP service
//! - `cli` - Command-line tools for schema migrations
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, roles, session records, business type and the
//!   wire error body shared by client and server

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
