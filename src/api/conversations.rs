//! `/api/conversations`
//!
//! Callers only ever see conversations they take part in; the creator of a
//! conversation is always one of its participants.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::{Method, StatusCode},
    routing::get,
    Json, Router,
};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::permissions::{
    check_object_permissions, check_permissions, AccessTarget, IsAuthenticated, IsParticipantOfConversation, Permission,
};
use crate::api::representation::{ensure_users_exist, render_conversation, ConversationView, ConversationWrite};
use crate::db::transactional;
use crate::http::server::AppState;
use crate::models::{conversation, Conversation, User};
use crate::security::CurrentUser;

const PERMISSIONS: &[&dyn Permission] = &[&IsAuthenticated, &IsParticipantOfConversation];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/conversations", get(list).post(create))
        .route(
            "/api/conversations/{id}",
            get(retrieve).put(update).patch(update).delete(destroy),
        )
}

async fn list(
    State(db): State<SqlitePool>,
    method: Method,
    caller: CurrentUser,
) -> ApiResult<Json<Vec<ConversationView>>> {
    let user = check_permissions(PERMISSIONS, caller.user(), &method)?;
    let mut conn = db.acquire().await?;

    let conversations = conversation::list_for_participant(&mut conn, user.user_id).await?;
    let mut views = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        views.push(render_conversation(&mut conn, conversation).await?);
    }
    Ok(Json(views))
}

async fn create(
    State(db): State<SqlitePool>,
    method: Method,
    caller: CurrentUser,
    payload: Result<Json<ConversationWrite>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ConversationView>)> {
    let user = check_permissions(PERMISSIONS, caller.user(), &method)?;
    let Json(body) = payload?;

    let mut participants = body.participant_ids.unwrap_or_default();
    participants.push(user.user_id);
    participants.sort();
    participants.dedup();

    let created = transactional(&db, move |conn| {
        Box::pin(async move {
            ensure_users_exist(conn, "participant_ids", &participants).await?;
            let created = conversation::insert(conn).await?;
            conversation::set_participants(conn, created.conversation_id, &participants).await?;
            Ok::<_, ApiError>(created)
        })
    })
    .await?;

    tracing::info!(
        conversation_id = %created.conversation_id,
        creator = %user.user_id,
        "Conversation created"
    );

    let mut conn = db.acquire().await?;
    let view = render_conversation(&mut conn, created).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn retrieve(
    State(db): State<SqlitePool>,
    method: Method,
    caller: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ConversationView>> {
    let user = check_permissions(PERMISSIONS, caller.user(), &method)?;
    let Path(id) = id?;
    let mut conn = db.acquire().await?;

    let (conversation, _) = load_checked(&mut conn, user, &method, id).await?;
    Ok(Json(render_conversation(&mut conn, conversation).await?))
}

/// PUT and PATCH: `participant_ids`, when present, replaces the participant set.
async fn update(
    State(db): State<SqlitePool>,
    method: Method,
    caller: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ConversationWrite>, JsonRejection>,
) -> ApiResult<Json<ConversationView>> {
    let user = check_permissions(PERMISSIONS, caller.user(), &method)?;
    let Path(id) = id?;
    let Json(body) = payload?;

    {
        let mut conn = db.acquire().await?;
        load_checked(&mut conn, user, &method, id).await?;
    }

    let updated = transactional(&db, move |conn| {
        Box::pin(async move {
            if let Some(mut participants) = body.participant_ids {
                participants.sort();
                participants.dedup();
                ensure_users_exist(conn, "participant_ids", &participants).await?;
                conversation::set_participants(conn, id, &participants).await?;
            }
            conversation::touch(conn, id).await?.ok_or_else(ApiError::not_found)
        })
    })
    .await?;

    tracing::info!(conversation_id = %id, user = %user.user_id, "Conversation updated");

    let mut conn = db.acquire().await?;
    Ok(Json(render_conversation(&mut conn, updated).await?))
}

async fn destroy(
    State(db): State<SqlitePool>,
    method: Method,
    caller: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let user = check_permissions(PERMISSIONS, caller.user(), &method)?;
    let Path(id) = id?;
    let mut conn = db.acquire().await?;

    load_checked(&mut conn, user, &method, id).await?;
    conversation::delete(&mut conn, id).await?;

    tracing::info!(conversation_id = %id, user = %user.user_id, "Conversation deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Load a conversation visible to `user` and run the object-level checks.
/// Conversations the caller is not part of are reported as missing, staff
/// included, so the staff branch of the object checks never applies here.
async fn load_checked(
    conn: &mut SqliteConnection,
    user: &User,
    method: &Method,
    id: Uuid,
) -> ApiResult<(Conversation, Vec<Uuid>)> {
    let conversation = conversation::find(conn, id).await?.ok_or_else(ApiError::not_found)?;
    let participants = conversation::participant_ids(conn, id).await?;
    if !participants.contains(&user.user_id) {
        return Err(ApiError::not_found());
    }

    check_object_permissions(
        PERMISSIONS,
        user,
        method,
        &AccessTarget::Conversation {
            participants: &participants,
        },
    )?;
    Ok((conversation, participants))
}
