use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,          // store-assigned
    pub email: String,
    pub username: String, // unique
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Column values for an insert or a full overwrite.
#[derive(Debug, Clone)]
pub struct UserFields {
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

/// Outcome of a delete; `affected` is the number of removed rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    pub affected: u64,
}
