//! Wire representations of stored records, and the request bodies that write them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::models::{conversation, message, user, Conversation, Message, Role, User};

/// Full user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone_number: user.phone_number,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Nested form used inside messages and conversations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleUser {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&User> for SimpleUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub message_id: Uuid,
    pub conversation: Uuid,
    pub sender: SimpleUser,
    pub recipient: SimpleUser,
    pub message_body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationView {
    pub conversation_id: Uuid,
    pub participants: Vec<SimpleUser>,
    pub messages: Vec<MessageView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of POST/PUT/PATCH on a conversation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationWrite {
    pub participant_ids: Option<Vec<Uuid>>,
}

/// Body of POST on the message collection. The sender is always the caller;
/// a `sender_id` in the body is accepted and ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageCreate {
    pub conversation_id: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
    pub message_body: Option<String>,
    pub sender_id: Option<Uuid>,
}

/// Body of PUT/PATCH on a message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageUpdate {
    pub recipient_id: Option<Uuid>,
    pub message_body: Option<String>,
}

/// Body of POST/PUT/PATCH on a user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserWrite {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<Role>,
}

/// Render messages, loading every referenced user once.
pub async fn render_messages(conn: &mut SqliteConnection, messages: Vec<Message>) -> ApiResult<Vec<MessageView>> {
    let mut ids: Vec<Uuid> = messages
        .iter()
        .flat_map(|m| [m.sender_id, m.recipient_id])
        .collect();
    ids.sort();
    ids.dedup();

    let users: HashMap<Uuid, SimpleUser> = user::find_many(conn, &ids)
        .await?
        .iter()
        .map(|u| (u.user_id, SimpleUser::from(u)))
        .collect();
    let lookup = |id: Uuid| users.get(&id).cloned().ok_or_else(ApiError::not_found);

    messages
        .into_iter()
        .map(|m| -> ApiResult<MessageView> {
            Ok(MessageView {
                message_id: m.message_id,
                conversation: m.conversation_id,
                sender: lookup(m.sender_id)?,
                recipient: lookup(m.recipient_id)?,
                message_body: m.message_body,
                sent_at: m.sent_at,
            })
        })
        .collect()
}

pub async fn render_message(conn: &mut SqliteConnection, message: Message) -> ApiResult<MessageView> {
    render_messages(conn, vec![message])
        .await?
        .pop()
        .ok_or_else(ApiError::not_found)
}

/// Render a conversation with its participants and messages.
pub async fn render_conversation(conn: &mut SqliteConnection, conversation: Conversation) -> ApiResult<ConversationView> {
    let participant_ids = conversation::participant_ids(conn, conversation.conversation_id).await?;
    let mut participants: Vec<SimpleUser> = user::find_many(conn, &participant_ids)
        .await?
        .iter()
        .map(SimpleUser::from)
        .collect();
    participants.sort_by(|a, b| a.email.cmp(&b.email));

    let messages = message::list_for_conversation(conn, conversation.conversation_id).await?;
    let messages = render_messages(conn, messages).await?;

    Ok(ConversationView {
        conversation_id: conversation.conversation_id,
        participants,
        messages,
        created_at: conversation.created_at,
        updated_at: conversation.updated_at,
    })
}

/// Fail with a field error naming the first id in `ids` with no user.
pub async fn ensure_users_exist(conn: &mut SqliteConnection, field: &str, ids: &[Uuid]) -> ApiResult<()> {
    let found: Vec<Uuid> = user::find_many(conn, ids).await?.iter().map(|u| u.user_id).collect();
    match ids.iter().find(|id| !found.contains(*id)) {
        Some(missing) => Err(ApiError::invalid(
            field,
            format!("Invalid pk \"{missing}\" - object does not exist."),
        )),
        None => Ok(()),
    }
}
