//! Append-only request log.
//!
//! One line per request: `{timestamp} - User: {user} - Path: {path}`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Local};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

use crate::security::auth::CurrentUser;

pub struct RequestLog {
    path: PathBuf,
    // Serialises appends so concurrent lines never interleave.
    write_lock: Mutex<()>,
}

impl RequestLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format_entry(at: DateTime<Local>, user: &str, path: &str) -> String {
        format!("{} - User: {user} - Path: {path}\n", at.format("%Y-%m-%d %H:%M:%S%.6f"))
    }

    pub async fn append(&self, entry: &str) -> io::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await
    }
}

pub async fn request_log_middleware(
    State(log): State<Arc<RequestLog>>,
    caller: CurrentUser,
    request: Request<Body>,
    next: Next,
) -> Response {
    let user = caller.display_name();
    let path = request.uri().path().to_string();

    tracing::info!(user = %user, method = %request.method(), path = %path, "Request");
    let entry = RequestLog::format_entry(Local::now(), &user, &path);
    if let Err(e) = log.append(&entry).await {
        tracing::error!(file = %log.path().display(), error = %e, "Failed to write request log");
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_entry_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 18, 5, 7).unwrap();
        assert_eq!(
            RequestLog::format_entry(at, "AnonymousUser", "/api/messages"),
            "2024-03-09 18:05:07.000000 - User: AnonymousUser - Path: /api/messages\n"
        );
    }

    #[tokio::test]
    async fn test_append_keeps_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("request_log.txt");
        std::fs::write(&file, "earlier\n").unwrap();

        let log = RequestLog::new(&file);
        log.append("first\n").await.unwrap();
        log.append("second\n").await.unwrap();

        assert_eq!(std::fs::read_to_string(&file).unwrap(), "earlier\nfirst\nsecond\n");
    }
}
