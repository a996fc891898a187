use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    auth::password::{hash_password, verify_password},
    error::ApiError,
    users::{
        repo::{StoreError, UserStore},
        repo_types::{DeleteResult, User, UserFields},
    },
};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("User already exists with this username")]
    Duplicate,
    #[error("User does not exist")]
    NotFound,
    #[error("Invalid Password")]
    InvalidPassword,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<StoreError> for AccountError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UsernameTaken => AccountError::Duplicate,
            StoreError::Database(e) => AccountError::Store(e.into()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::Store(e) => ApiError::Internal(e),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

/// Account rules over a [`UserStore`].
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<User, AccountError> {
        if self.store.find_by_username(username).await?.is_some() {
            warn!(%username, "username already registered");
            return Err(AccountError::Duplicate);
        }

        let fields = UserFields {
            email: email.to_string(),
            username: username.to_string(),
            password_hash: hash_password(password)?,
        };
        let user = self.store.insert(&fields).await?;
        info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, AccountError> {
        let Some(user) = self.store.find_by_username(username).await? else {
            warn!(%username, "login unknown username");
            return Err(AccountError::NotFound);
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = user.id, "login invalid password");
            return Err(AccountError::InvalidPassword);
        }

        info!(user_id = user.id, "user logged in");
        Ok(user)
    }

    pub async fn find_all(&self) -> Result<Vec<User>, AccountError> {
        Ok(self.store.list().await?)
    }

    pub async fn find_one(&self, id: i32) -> Result<User, AccountError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(AccountError::NotFound)
    }

    /// Overwrites every field of row `id`. There is no existence check: a
    /// missing id is created with exactly that id.
    pub async fn update(
        &self,
        id: i32,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<User, AccountError> {
        let fields = UserFields {
            email: email.to_string(),
            username: username.to_string(),
            password_hash: hash_password(password)?,
        };
        let user = self.store.upsert(id, &fields).await?;
        info!(user_id = user.id, "user overwritten");
        Ok(user)
    }

    pub async fn remove(&self, id: i32) -> Result<DeleteResult, AccountError> {
        if self.store.find_by_id(id).await?.is_none() {
            debug!(user_id = id, "remove of missing user");
            return Err(AccountError::NotFound);
        }
        let res = self.store.delete(id).await?;
        info!(user_id = id, affected = res.affected, "user removed");
        Ok(res)
    }
}
