//! CLI command implementations.

pub mod migrate;
pub mod user;
