//! `/api/messages`

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{Method, StatusCode},
    routing::get,
    Json, Router,
};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult, Validator};
use crate::api::filters::MessageFilter;
use crate::api::permissions::{
    check_object_permissions, check_permissions, AccessTarget, IsOwnerOrAdmin, IsParticipantOfConversation, Permission,
};
use crate::api::representation::{
    ensure_users_exist, render_message, render_messages, MessageCreate, MessageUpdate, MessageView,
};
use crate::http::server::AppState;
use crate::models::{conversation, message, Message, NewMessage, User};
use crate::security::CurrentUser;

const PERMISSIONS: &[&dyn Permission] = &[&IsParticipantOfConversation, &IsOwnerOrAdmin];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/messages", get(list).post(create))
        .route(
            "/api/messages/{id}",
            get(retrieve).put(update).patch(update).delete(destroy),
        )
}

/// Without a `conversation_id`, or for an unknown conversation, the listing is empty.
async fn list(
    State(db): State<SqlitePool>,
    method: Method,
    caller: CurrentUser,
    filter: Result<Query<MessageFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<MessageView>>> {
    let user = check_permissions(PERMISSIONS, caller.user(), &method)?;
    let Query(filter) = filter?;

    let Some(conversation_id) = filter.conversation_id else {
        return Ok(Json(Vec::new()));
    };

    let mut conn = db.acquire().await?;
    if conversation::find(&mut conn, conversation_id).await?.is_none() {
        return Ok(Json(Vec::new()));
    }
    let participants = conversation::participant_ids(&mut conn, conversation_id).await?;
    check_object_permissions(
        PERMISSIONS,
        user,
        &method,
        &AccessTarget::Conversation {
            participants: &participants,
        },
    )?;

    let messages = message::list(&mut conn, &filter).await?;
    Ok(Json(render_messages(&mut conn, messages).await?))
}

async fn create(
    State(db): State<SqlitePool>,
    method: Method,
    caller: CurrentUser,
    payload: Result<Json<MessageCreate>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageView>)> {
    let user = check_permissions(PERMISSIONS, caller.user(), &method)?;
    let Json(body) = payload?;

    if body.sender_id.is_some_and(|id| id != user.user_id) {
        tracing::debug!(sender_id = ?body.sender_id, user = %user.user_id, "Ignoring sender_id from body");
    }

    let mut v = Validator::new();
    let conversation_id = v.require("conversation_id", body.conversation_id);
    let recipient_id = v.require("recipient_id", body.recipient_id);
    let message_body = v.require("message_body", body.message_body);
    if message_body.as_deref().is_some_and(|b| b.trim().is_empty()) {
        v.add("message_body", "This field may not be blank.");
    }
    v.finish()?;
    let (Some(conversation_id), Some(recipient_id), Some(message_body)) =
        (conversation_id, recipient_id, message_body)
    else {
        return Err(ApiError::BadRequest("Incomplete message.".into()));
    };

    let mut conn = db.acquire().await?;
    if conversation::find(&mut conn, conversation_id).await?.is_none() {
        return Err(ApiError::NotFound("Conversation not found".into()));
    }
    let participants = conversation::participant_ids(&mut conn, conversation_id).await?;
    if !participants.contains(&user.user_id) {
        return Err(ApiError::PermissionDenied(
            "You are not a participant of this conversation".into(),
        ));
    }
    ensure_users_exist(&mut conn, "recipient_id", &[recipient_id]).await?;

    let created = message::insert(
        &mut conn,
        NewMessage {
            conversation_id,
            sender_id: user.user_id,
            recipient_id,
            message_body,
        },
    )
    .await?;
    conversation::touch(&mut conn, conversation_id).await?;

    tracing::info!(
        message_id = %created.message_id,
        conversation_id = %conversation_id,
        sender = %user.user_id,
        "Message sent"
    );
    Ok((StatusCode::CREATED, Json(render_message(&mut conn, created).await?)))
}

async fn retrieve(
    State(db): State<SqlitePool>,
    method: Method,
    caller: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<MessageView>> {
    let user = check_permissions(PERMISSIONS, caller.user(), &method)?;
    let Path(id) = id?;
    let mut conn = db.acquire().await?;

    let found = load_checked(&mut conn, user, &method, id).await?;
    Ok(Json(render_message(&mut conn, found).await?))
}

/// PUT requires `message_body` and `recipient_id`; PATCH takes either.
async fn update(
    State(db): State<SqlitePool>,
    method: Method,
    caller: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<MessageUpdate>, JsonRejection>,
) -> ApiResult<Json<MessageView>> {
    let user = check_permissions(PERMISSIONS, caller.user(), &method)?;
    let Path(id) = id?;
    let Json(body) = payload?;

    let mut v = Validator::new();
    if method == Method::PUT {
        v.require("message_body", body.message_body.as_ref());
        v.require("recipient_id", body.recipient_id.as_ref());
    }
    if body.message_body.as_deref().is_some_and(|b| b.trim().is_empty()) {
        v.add("message_body", "This field may not be blank.");
    }
    v.finish()?;

    let mut conn = db.acquire().await?;
    load_checked(&mut conn, user, &method, id).await?;
    if let Some(recipient_id) = body.recipient_id {
        ensure_users_exist(&mut conn, "recipient_id", &[recipient_id]).await?;
    }

    let updated = message::update(&mut conn, id, body.message_body, body.recipient_id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    tracing::info!(message_id = %id, user = %user.user_id, "Message updated");
    Ok(Json(render_message(&mut conn, updated).await?))
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
    message::delete(&mut conn, id).await?;

    tracing::info!(message_id = %id, user = %user.user_id, "Message deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn load_checked(conn: &mut SqliteConnection, user: &User, method: &Method, id: Uuid) -> ApiResult<Message> {
    let found = message::find(conn, id).await?.ok_or_else(ApiError::not_found)?;
    let participants = conversation::participant_ids(conn, found.conversation_id).await?;

    check_object_permissions(
        PERMISSIONS,
        user,
        method,
        &AccessTarget::Message {
            sender_id: found.sender_id,
            conversation_participants: &participants,
        },
    )?;
    Ok(found)
}
