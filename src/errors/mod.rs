//! Centralized error handling for the token icon resolver
//!
//! Two layers of errors live here:
//!
//! - **Resolution errors** (`ResolveError`): the failures a single icon
//!   resolution walks through. They are recoverable and never reach
//!   the caller of `IconResolver::resolve`; the resolver folds them into
//!   `ResolvedIcon::Unresolved`.
//! - **Application errors** (`AppError`): configuration, I/O and client
//!   construction failures that the binary reports at startup.
//!
//! # Usage
//!
//! ```rust
//! use token_icon_resolver::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Err(AppError::configuration("base_url is required"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for a single resolution step
pub type ResolveResult<T> = Result<T, ResolveError>;
