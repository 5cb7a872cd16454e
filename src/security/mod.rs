//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → auth.rs (resolve X-User-Id into CurrentUser)
//!     → access_window.rs (time-of-day restriction)
//!     → rate_limit.rs (per-IP limit on message POSTs)
//!     → access_control.rs (admin/moderator routes)
//!     → handlers, which apply api::permissions
//! ```
//!
//! Every check fails closed: a refused request never reaches a handler.

pub mod access_control;
pub mod access_window;
pub mod auth;
pub mod rate_limit;

pub use access_control::{role_check_middleware, RoleGuard};
pub use access_window::{access_window_middleware, AccessWindow};
pub use auth::{authenticate, CurrentUser, X_USER_ID};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
