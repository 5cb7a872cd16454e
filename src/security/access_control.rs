//! Role requirement for privileged routes.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::models::Role;
use crate::observability::metrics;
use crate::security::auth::CurrentUser;

/// Roles admitted past [`role_check_middleware`].
#[derive(Debug, Clone)]
pub struct RoleGuard {
    allowed: Arc<[Role]>,
}

impl RoleGuard {
    pub fn new(allowed: impl Into<Arc<[Role]>>) -> Self {
        Self { allowed: allowed.into() }
    }

    pub fn admits(&self, caller: &CurrentUser) -> Result<(), &'static str> {
        match caller.user() {
            None => Err("Access denied. Authentication required."),
            Some(user) if self.allowed.contains(&user.role) => Ok(()),
            Some(_) => Err("Access denied. Admin or Moderator role required."),
        }
    }
}

impl Default for RoleGuard {
    fn default() -> Self {
        Self::new(vec![Role::Admin, Role::Moderator])
    }
}

pub async fn role_check_middleware(
    State(guard): State<RoleGuard>,
    caller: CurrentUser,
    request: Request<Body>,
    next: Next,
) -> Response {
    match guard.admits(&caller) {
        Ok(()) => next.run(request).await,
        Err(reason) => {
            tracing::warn!(user = %caller.display_name(), path = %request.uri().path(), "Role check failed");
            metrics::record_access_denied("role");
            (StatusCode::FORBIDDEN, reason).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use chrono::Utc;
    use uuid::Uuid;

    fn caller(role: Role) -> CurrentUser {
        CurrentUser(Some(User {
            user_id: Uuid::new_v4(),
            first_name: "A".into(),
            last_name: "B".into(),
            email: "a@b.example".into(),
            phone_number: None,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }))
    }

    #[test]
    fn test_admin_and_moderator_pass() {
        let guard = RoleGuard::default();
        assert!(guard.admits(&caller(Role::Admin)).is_ok());
        assert!(guard.admits(&caller(Role::Moderator)).is_ok());
    }

    #[test]
    fn test_other_roles_and_anonymous_fail() {
        let guard = RoleGuard::default();
        assert_eq!(
            guard.admits(&caller(Role::Guest)),
            Err("Access denied. Admin or Moderator role required.")
        );
        assert_eq!(
            guard.admits(&CurrentUser::default()),
            Err("Access denied. Authentication required.")
        );
    }
}
