use chrono::{DateTime, SecondsFormat, Utc};

/// Numeric identity of a user, shared by tokens and owner columns.
pub type UserId = i64;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// A question row joined with its owner's public profile columns.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Question {
    pub id: String,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub tag: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_username: String,
    pub owner_first_name: String,
    pub owner_last_name: String,
}

/// An answer row joined with its owner's public profile columns.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Answer {
    pub id: String,
    pub user_id: UserId,
    pub question_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_username: String,
    pub owner_first_name: String,
    pub owner_last_name: String,
}

/// Fixed-width RFC 3339 timestamps sort lexically in the store.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now_timestamp() -> String {
    timestamp(Utc::now())
}
