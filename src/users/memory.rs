use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::users::{
    repo::{StoreError, UserStore},
    repo_types::{DeleteResult, User, UserFields},
};

/// In-process `UserStore` used by unit tests in place of Postgres.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: BTreeMap<i32, User>,
    last_id: i32,
}

impl Inner {
    fn username_taken(&self, username: &str, except: Option<i32>) -> bool {
        self.rows
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.rows.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.inner.read().await.rows.values().cloned().collect())
    }

    async fn insert(&self, fields: &UserFields) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.username_taken(&fields.username, None) {
            return Err(StoreError::UsernameTaken);
        }
        inner.last_id += 1;
        let user = User {
            id: inner.last_id,
            email: fields.email.clone(),
            username: fields.username.clone(),
            password_hash: fields.password_hash.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        inner.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn upsert(&self, id: i32, fields: &UserFields) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.username_taken(&fields.username, Some(id)) {
            return Err(StoreError::UsernameTaken);
        }
        let created_at = inner
            .rows
            .get(&id)
            .map(|u| u.created_at)
            .unwrap_or_else(OffsetDateTime::now_utc);
        let user = User {
            id,
            email: fields.email.clone(),
            username: fields.username.clone(),
            password_hash: fields.password_hash.clone(),
            created_at,
        };
        inner.rows.insert(id, user.clone());
        inner.last_id = inner.last_id.max(id);
        Ok(user)
    }

    async fn delete(&self, id: i32) -> Result<DeleteResult, StoreError> {
        let removed = self.inner.write().await.rows.remove(&id);
        Ok(DeleteResult {
            affected: u64::from(removed.is_some()),
        })
    }
}

/// `UserStore` whose every call fails as if the pool were exhausted.
pub struct FailingUserStore;

#[async_trait]
impl UserStore for FailingUserStore {
    async fn find_by_username(&self, _username: &str) -> Result<Option<User>, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn find_by_id(&self, _id: i32) -> Result<Option<User>, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn insert(&self, _fields: &UserFields) -> Result<User, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn upsert(&self, _id: i32, _fields: &UserFields) -> Result<User, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn delete(&self, _id: i32) -> Result<DeleteResult, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }
}
