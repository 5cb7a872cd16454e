use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Conversation {
    pub conversation_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn insert(conn: &mut SqliteConnection) -> Result<Conversation, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as(
        "INSERT INTO conversations (conversation_id, created_at, updated_at) VALUES (?, ?, ?) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

pub async fn find(conn: &mut SqliteConnection, conversation_id: Uuid) -> Result<Option<Conversation>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM conversations WHERE conversation_id = ?")
        .bind(conversation_id)
        .fetch_optional(&mut *conn)
        .await
}

/// Conversations `user_id` takes part in, newest first.
pub async fn list_for_participant(conn: &mut SqliteConnection, user_id: Uuid) -> Result<Vec<Conversation>, sqlx::Error> {
    sqlx::query_as(
        "SELECT c.* FROM conversations c \
         JOIN conversation_participants p ON p.conversation_id = c.conversation_id \
         WHERE p.user_id = ? \
         ORDER BY c.updated_at DESC",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn participant_ids(conn: &mut SqliteConnection, conversation_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar("SELECT user_id FROM conversation_participants WHERE conversation_id = ?")
        .bind(conversation_id)
        .fetch_all(&mut *conn)
        .await
}

pub async fn add_participant(conn: &mut SqliteConnection, conversation_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO conversation_participants (conversation_id, user_id) VALUES (?, ?)")
        .bind(conversation_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Replace the participant set with exactly `user_ids`.
pub async fn set_participants(
    conn: &mut SqliteConnection,
    conversation_id: Uuid,
    user_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM conversation_participants WHERE conversation_id = ?")
        .bind(conversation_id)
        .execute(&mut *conn)
        .await?;
    for user_id in user_ids {
        add_participant(conn, conversation_id, *user_id).await?;
    }
    Ok(())
}

pub async fn touch(conn: &mut SqliteConnection, conversation_id: Uuid) -> Result<Option<Conversation>, sqlx::Error> {
    sqlx::query_as("UPDATE conversations SET updated_at = ? WHERE conversation_id = ? RETURNING *")
        .bind(Utc::now())
        .bind(conversation_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn delete(conn: &mut SqliteConnection, conversation_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM conversations WHERE conversation_id = ?")
        .bind(conversation_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() == 1)
}
