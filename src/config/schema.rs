//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Root configuration for the messaging service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Database location and pool sizing.
    pub database: DatabaseConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Per-IP limit on message submissions.
    pub rate_limit: RateLimitConfig,

    /// Time-of-day access restriction.
    pub access_window: AccessWindowConfig,

    /// Append-only request log.
    pub request_log: RequestLogConfig,

    /// Role requirement for user administration routes.
    pub roles: RoleCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL (e.g., "sqlite://messaging.db", "sqlite::memory:").
    pub url: String,

    /// Maximum pooled connections. Forced to 1 for in-memory databases.
    pub max_connections: u32,

    /// Create the database file when it does not exist.
    pub create_if_missing: bool,

    /// Apply embedded migrations on start-up.
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://messaging.db".to_string(),
            max_connections: 5,
            create_if_missing: true,
            run_migrations: true,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum accepted POSTs per client within one window.
    pub max_requests: usize,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Only POSTs whose path starts with this prefix are counted.
    pub path_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 5,
            window_secs: 60,
            path_prefix: "/api/messages".to_string(),
        }
    }
}

/// Time-of-day restriction. Requests are served only while
/// `start <= now < end`; a window with `start > end` wraps past midnight.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessWindowConfig {
    pub enabled: bool,

    /// Opening time, "HH:MM:SS".
    pub start: NaiveTime,

    /// Closing time (exclusive), "HH:MM:SS".
    pub end: NaiveTime,

    /// Offset from UTC, in minutes, of the clock the window is expressed in.
    pub utc_offset_minutes: i32,
}

impl Default for AccessWindowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(21, 0, 0).unwrap_or_default(),
            utc_offset_minutes: 0,
        }
    }
}

/// Request log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestLogConfig {
    pub enabled: bool,

    /// File every request line is appended to.
    pub path: String,
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "request_log.txt".to_string(),
        }
    }
}

/// Role check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoleCheckConfig {
    pub enabled: bool,

    /// Roles admitted to the guarded routes.
    pub allowed_roles: Vec<Role>,
}

impl Default for RoleCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_roles: vec![Role::Admin, Role::Moderator],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
