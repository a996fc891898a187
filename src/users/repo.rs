use async_trait::async_trait;
use sqlx::PgPool;

use crate::users::repo_types::{DeleteResult, User, UserFields};

/// Unique constraint on `users.username`, see migrations.
const USERNAME_CONSTRAINT: &str = "users_username_key";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username already taken")]
    UsernameTaken,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence seam for user rows.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError>;
    async fn list(&self) -> Result<Vec<User>, StoreError>;
    async fn insert(&self, fields: &UserFields) -> Result<User, StoreError>;
    /// Writes every column of row `id`, creating it when absent.
    async fn upsert(&self, id: i32, fields: &UserFields) -> Result<User, StoreError>;
    async fn delete(&self, id: i32) -> Result<DeleteResult, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn is_username_conflict(constraint: Option<&str>) -> bool {
    constraint == Some(USERNAME_CONSTRAINT)
}

fn map_err(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if is_username_conflict(db.constraint()) => {
            StoreError::UsernameTaken
        }
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, created_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn insert(&self, fields: &UserFields) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, username, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, username, password_hash, created_at
            "#,
        )
        .bind(&fields.email)
        .bind(&fields.username)
        .bind(&fields.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(map_err)
    }

    async fn upsert(&self, id: i32, fields: &UserFields) -> Result<User, StoreError> {
        let mut tx = self.db.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, username, password_hash)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email,
                username = EXCLUDED.username,
                password_hash = EXCLUDED.password_hash
            RETURNING id, email, username, password_hash, created_at
            "#,
        )
        .bind(id)
        .bind(&fields.email)
        .bind(&fields.username)
        .bind(&fields.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_err)?;

        // An explicit id can run ahead of the identity sequence. Only ever move
        // the sequence forward; `nextval` is not transactional, so values handed
        // out to concurrent inserts are already reflected in `last_value`.
        sqlx::query(
            r#"
            SELECT setval(pg_get_serial_sequence('users', 'id'), $1)
            FROM users_id_seq
            WHERE $1 > CASE WHEN is_called THEN last_value ELSE last_value - 1 END
            "#,
        )
        .bind(i64::from(id))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn delete(&self, id: i32) -> Result<DeleteResult, StoreError> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(DeleteResult {
            affected: res.rows_affected(),
        })
    }
}
