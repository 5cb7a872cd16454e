use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::api::filters::MessageFilter;
use crate::db::log_query;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Message {
    pub message_id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub message_body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub message_body: String,
}

pub async fn insert(conn: &mut SqliteConnection, new: NewMessage) -> Result<Message, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO messages (message_id, conversation_id, sender_id, recipient_id, message_body, sent_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(new.conversation_id)
    .bind(new.sender_id)
    .bind(new.recipient_id)
    .bind(new.message_body)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
}

pub async fn find(conn: &mut SqliteConnection, message_id: Uuid) -> Result<Option<Message>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM messages WHERE message_id = ?")
        .bind(message_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn list_for_conversation(conn: &mut SqliteConnection, conversation_id: Uuid) -> Result<Vec<Message>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM messages WHERE conversation_id = ? ORDER BY sent_at")
        .bind(conversation_id)
        .fetch_all(&mut *conn)
        .await
}

/// Messages matching every condition set on `filter`, oldest first.
pub async fn list(conn: &mut SqliteConnection, filter: &MessageFilter) -> Result<Vec<Message>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM messages WHERE 1 = 1");
    filter.apply(&mut qb);
    qb.push(" ORDER BY sent_at");

    let sql = qb.sql().to_owned();
    log_query(&sql, qb.build_query_as().fetch_all(&mut *conn)).await
}

pub async fn update(
    conn: &mut SqliteConnection,
    message_id: Uuid,
    message_body: Option<String>,
    recipient_id: Option<Uuid>,
) -> Result<Option<Message>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE messages SET \
             message_body = COALESCE(?, message_body), \
             recipient_id = COALESCE(?, recipient_id) \
         WHERE message_id = ? RETURNING *",
    )
    .bind(message_body)
    .bind(recipient_id)
    .bind(message_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn delete(conn: &mut SqliteConnection, message_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM messages WHERE message_id = ?")
        .bind(message_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() == 1)
}
