//! `/api/users`, mounted behind the role check.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::{Method, StatusCode},
    routing::get,
    Json, Router,
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult, Validator};
use crate::api::representation::{UserView, UserWrite};
use crate::http::server::AppState;
use crate::models::{user, NewUser, Role, UserChanges};
use crate::security::CurrentUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list).post(create))
        .route(
            "/api/users/{id}",
            get(retrieve).put(update).patch(update).delete(destroy),
        )
}

async fn list(State(db): State<SqlitePool>) -> ApiResult<Json<Vec<UserView>>> {
    let mut conn = db.acquire().await?;
    let users = user::list(&mut conn).await?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

async fn create(
    State(db): State<SqlitePool>,
    caller: CurrentUser,
    payload: Result<Json<UserWrite>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    let Json(body) = payload?;
    if body.role == Some(Role::Admin) {
        require_admin(&caller)?;
    }

    let mut v = Validator::new();
    let first_name = v.require("first_name", body.first_name);
    let last_name = v.require("last_name", body.last_name);
    let email = v.require("email", body.email);
    check_email(&mut v, email.as_deref());
    v.finish()?;
    let (Some(first_name), Some(last_name), Some(email)) = (first_name, last_name, email) else {
        return Err(ApiError::BadRequest("Incomplete user.".into()));
    };

    let mut conn = db.acquire().await?;
    let created = user::insert(
        &mut conn,
        NewUser {
            first_name,
            last_name,
            email,
            phone_number: body.phone_number,
            role: body.role.unwrap_or(Role::Guest),
        },
    )
    .await
    .map_err(unique_email)?;

    tracing::info!(user_id = %created.user_id, role = %created.role, "User created");
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn retrieve(
    State(db): State<SqlitePool>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<UserView>> {
    let Path(id) = id?;
    let mut conn = db.acquire().await?;
    let found = user::find(&mut conn, id).await?.ok_or_else(ApiError::not_found)?;
    Ok(Json(found.into()))
}

/// PUT requires the names and e-mail; PATCH takes any subset.
async fn update(
    State(db): State<SqlitePool>,
    method: Method,
    caller: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UserWrite>, JsonRejection>,
) -> ApiResult<Json<UserView>> {
    let Path(id) = id?;
    let Json(body) = payload?;
    if body.role.is_some() {
        require_admin(&caller)?;
    }

    let mut v = Validator::new();
    if method == Method::PUT {
        v.require("first_name", body.first_name.as_ref());
        v.require("last_name", body.last_name.as_ref());
        v.require("email", body.email.as_ref());
    }
    check_email(&mut v, body.email.as_deref());
    v.finish()?;

    let mut conn = db.acquire().await?;
    let changes = UserChanges {
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email,
        phone_number: body.phone_number,
        role: body.role,
    };
    let updated = user::update(&mut conn, id, changes)
        .await
        .map_err(unique_email)?
        .ok_or_else(ApiError::not_found)?;

    tracing::info!(user_id = %id, "User updated");
    Ok(Json(updated.into()))
}

async fn destroy(
    State(db): State<SqlitePool>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    let mut conn = db.acquire().await?;
    if !user::delete(&mut conn, id).await? {
        return Err(ApiError::not_found());
    }
    tracing::info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Roles are assigned by admins only; moderators may manage everything else.
fn require_admin(caller: &CurrentUser) -> ApiResult<()> {
    match caller.user() {
        Some(user) if user.is_admin() => Ok(()),
        Some(user) => {
            tracing::warn!(user = %user.user_id, "Role change refused");
            Err(ApiError::PermissionDenied("Only admins may assign roles.".into()))
        }
        None => Err(ApiError::not_authenticated()),
    }
}

fn check_email(v: &mut Validator, email: Option<&str>) {
    if let Some(email) = email {
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid {
            v.add("email", "Enter a valid email address.");
        }
    }
}

fn unique_email(err: sqlx::Error) -> ApiError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::invalid("email", "user with this email already exists.")
        }
        _ => ApiError::Database(err),
    }
}
