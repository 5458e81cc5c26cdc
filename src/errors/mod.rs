//! Centralized error handling for the status hub
//!
//! Errors are grouped by the layer that produces them:
//!
//! - **Fetch Errors**: the FiveM upstream was unreachable, slow or returned garbage.
//!   These never reach a client; they select the fallback tier.
//! - **Repository Errors**: settings store failures (SeaORM or in-memory).
//! - **Hub Errors**: delivery to a single WebSocket subscriber failed.
//! - **Application Errors**: configuration and bootstrap failures.
//!
//! # Usage
//!
//! ```rust
//! use fivem_status_hub::errors::{AppError, AppResult};
//!
//! fn check_port(port: u16) -> AppResult<u16> {
//!     if port == 0 {
//!         return Err(AppError::configuration("port must be non-zero"));
//!     }
//!     Ok(port)
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Repository Results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Convenience type alias for upstream fetch Results
pub type FetchResult<T> = Result<T, FetchError>;
