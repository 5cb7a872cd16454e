use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::db::log_query;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Guest,
    Host,
    Admin,
    Moderator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Host => "host",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "guest" => Ok(Role::Guest),
            "host" => Ok(Role::Host),
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Staff members bypass object-level permission checks.
    pub fn is_staff(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.email)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: Role,
}

/// Column updates; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<Role>,
}

pub async fn insert(conn: &mut SqliteConnection, new: NewUser) -> Result<User, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as(
        "INSERT INTO users (user_id, first_name, last_name, email, phone_number, role, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(new.first_name)
    .bind(new.last_name)
    .bind(new.email)
    .bind(new.phone_number)
    .bind(new.role)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

pub async fn find(conn: &mut SqliteConnection, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<User>, sqlx::Error> {
    const SQL: &str = "SELECT * FROM users ORDER BY created_at, email";
    log_query(SQL, sqlx::query_as(SQL).fetch_all(&mut *conn)).await
}

/// Fetch the users whose ids appear in `ids`; unknown ids are skipped.
pub async fn find_many(conn: &mut SqliteConnection, ids: &[Uuid]) -> Result<Vec<User>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM users WHERE user_id IN (");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    qb.build_query_as().fetch_all(&mut *conn).await
}

pub async fn update(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    changes: UserChanges,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE users SET \
             first_name = COALESCE(?, first_name), \
             last_name = COALESCE(?, last_name), \
             email = COALESCE(?, email), \
             phone_number = COALESCE(?, phone_number), \
             role = COALESCE(?, role), \
             updated_at = ? \
         WHERE user_id = ? RETURNING *",
    )
    .bind(changes.first_name)
    .bind(changes.last_name)
    .bind(changes.email)
    .bind(changes.phone_number)
    .bind(changes.role)
    .bind(Utc::now())
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn set_email(conn: &mut SqliteConnection, user_id: Uuid, email: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET email = ?, updated_at = ? WHERE user_id = ?")
        .bind(email)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete(conn: &mut SqliteConnection, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() == 1)
}
