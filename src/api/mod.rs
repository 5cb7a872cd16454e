//! HTTP resources.
//!
//! # Data Flow
//! ```text
//! handler
//!     → permissions.rs (request-level checks)
//!     → models (load target)
//!     → permissions.rs (object-level checks)
//!     → representation.rs (record → JSON)
//! ```
//!
//! Failures of any step become an [`error::ApiError`].

pub mod conversations;
pub mod error;
pub mod filters;
pub mod health;
pub mod messages;
pub mod permissions;
pub mod representation;
pub mod users;

pub use error::{ApiError, ApiResult};
