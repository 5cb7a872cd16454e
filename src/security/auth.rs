//! Caller identification.
//!
//! The caller names itself with an `X-User-Id` header holding a user id. The
//! resolved user is attached to the request as a [`CurrentUser`] extension
//! that later layers and handlers read.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::models::{user, User};

pub const X_USER_ID: &str = "x-user-id";

/// The authenticated user, or `None` for an anonymous request.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }

    /// Name written to the request log.
    pub fn display_name(&self) -> String {
        match &self.0 {
            Some(user) => user.to_string(),
            None => "AnonymousUser".to_string(),
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned().unwrap_or_default())
    }
}

pub async fn authenticate(
    State(db): State<SqlitePool>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let caller = match request.headers().get(X_USER_ID).cloned() {
        None => CurrentUser::default(),
        Some(value) => match resolve(&db, &value).await {
            Ok(user) => CurrentUser(Some(user)),
            Err(err) => {
                tracing::warn!(path = %request.uri().path(), error = %err, "Authentication failed");
                return err.into_response();
            }
        },
    };

    request.extensions_mut().insert(caller);
    next.run(request).await
}

async fn resolve(db: &SqlitePool, value: &HeaderValue) -> Result<User, ApiError> {
    let user_id = value
        .to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or_else(|| ApiError::NotAuthenticated("Invalid X-User-Id header.".into()))?;

    let mut conn = db.acquire().await?;
    user::find(&mut conn, user_id)
        .await?
        .ok_or_else(|| ApiError::NotAuthenticated("Unknown user.".into()))
}
