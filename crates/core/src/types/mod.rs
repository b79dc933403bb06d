//! Core types for Tillpoint.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod business;
pub mod error_body;
pub mod id;
pub mod role;
pub mod route;
pub mod session;

pub use business::{BusinessType, BusinessTypeError, BusinessTypeSetting};
pub use error_body::{ApiErrorBody, ApiErrorCode, AuthFailure, legacy_messages};
pub use id::*;
pub use role::Role;
pub use route::RouteRequirement;
pub use session::{AuthResponse, LoginRequest, Session, UserProfile};
