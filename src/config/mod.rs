//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to the middleware and handlers
//! ```
//!
//! All fields have defaults, so an empty file is a valid configuration.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::AccessWindowConfig;
pub use schema::AppConfig;
pub use schema::DatabaseConfig;
pub use schema::RateLimitConfig;
pub use schema::RequestLogConfig;
pub use schema::RoleCheckConfig;
