//! Time-of-day access restriction.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{FixedOffset, NaiveTime, Offset, Utc};

use crate::config::AccessWindowConfig;
use crate::observability::metrics;

/// Daily interval `[start, end)` during which requests are served.
#[derive(Debug, Clone, Copy)]
pub struct AccessWindow {
    start: NaiveTime,
    end: NaiveTime,
    offset: FixedOffset,
}

impl AccessWindow {
    pub fn new(start: NaiveTime, end: NaiveTime, offset: FixedOffset) -> Self {
        Self { start, end, offset }
    }

    pub fn from_config(config: &AccessWindowConfig) -> Self {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix());
        Self::new(config.start, config.end, offset)
    }

    /// Whether `time` falls inside the window. A window whose start is after
    /// its end spans midnight.
    pub fn permits(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }

    /// Current time-of-day in the window's offset.
    pub fn now(&self) -> NaiveTime {
        Utc::now().with_timezone(&self.offset).time()
    }

    pub fn denial_message(&self) -> String {
        format!(
            "Access denied outside allowed hours ({} - {}).",
            clock_label(self.start),
            clock_label(self.end)
        )
    }
}

/// "18:00" → "6 PM", "09:30" → "9:30 AM".
fn clock_label(time: NaiveTime) -> String {
    if time.format("%M").to_string() == "00" {
        time.format("%-I %p").to_string()
    } else {
        time.format("%-I:%M %p").to_string()
    }
}

pub async fn access_window_middleware(
    State(window): State<AccessWindow>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let now = window.now();
    if window.permits(now) {
        return next.run(request).await;
    }

    tracing::info!(time = %now, path = %request.uri().path(), "Request outside access window");
    metrics::record_access_denied("access_window");
    (StatusCode::FORBIDDEN, window.denial_message()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn evening() -> AccessWindow {
        AccessWindow::from_config(&AccessWindowConfig::default())
    }

    #[test]
    fn test_blocks_outside_six_to_nine() {
        let window = evening();
        assert!(!window.permits(hms(9, 0, 0)));
        assert!(!window.permits(hms(17, 59, 59)));
        assert!(window.permits(hms(18, 0, 0)));
        assert!(window.permits(hms(20, 59, 59)));
        assert!(!window.permits(hms(21, 0, 0)));
        assert!(!window.permits(hms(23, 30, 0)));
    }

    #[test]
    fn test_window_across_midnight() {
        let window = AccessWindow::new(hms(22, 0, 0), hms(2, 0, 0), Utc.fix());
        assert!(window.permits(hms(23, 0, 0)));
        assert!(window.permits(hms(0, 30, 0)));
        assert!(!window.permits(hms(2, 0, 0)));
        assert!(!window.permits(hms(12, 0, 0)));
    }

    #[test]
    fn test_empty_window_permits_nothing() {
        let window = AccessWindow::new(hms(12, 0, 0), hms(12, 0, 0), Utc.fix());
        assert!(!window.permits(hms(12, 0, 0)));
        assert!(!window.permits(hms(0, 0, 0)));
    }

    #[test]
    fn test_denial_message() {
        assert_eq!(
            evening().denial_message(),
            "Access denied outside allowed hours (6 PM - 9 PM)."
        );
        let window = AccessWindow::new(hms(9, 30, 0), hms(17, 0, 0), Utc.fix());
        assert_eq!(
            window.denial_message(),
            "Access denied outside allowed hours (9:30 AM - 5 PM)."
        );
    }
}
