//! Centralized error handling for dramashort
//!
//! # Error Categories
//!
//! - **Source Errors**: upstream catalog connectivity and decoding
//! - **Web Errors**: request parameter problems at the HTTP boundary
//! - **Validation / Configuration Errors**: bad input or settings
//!
//! The player controller has no error type: playback failures are states,
//! not errors, and escalation cannot fail.
//!
//! # Usage
//!
//! ```rust
//! use dramashort::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Err(AppError::validation("offset must be a number"))
//! }
//! assert!(example_function().is_err());
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;
