use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// The user store the receiver acts on.
///
/// Identifiers are the subject URIs carried by incoming events. Every method
/// may touch a remote system, and any failure surfaces as
/// [`Error::Directory`].
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Whether a user with this identifier exists.
    async fn exists(&self, user_id: &str) -> Result<bool>;
    /// Invalidate every session the user holds.
    async fn sign_out(&self, user_id: &str) -> Result<()>;
    /// Replace the user's email address.
    async fn update_email(&self, user_id: &str, email: &str) -> Result<()>;
    /// Remove the user entirely.
    async fn delete(&self, user_id: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryUser {
    pub email: Option<String>,
    pub signed_in: bool,
}

/// In-memory [`UserDirectory`].
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<String, DirectoryUser>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user_id: impl Into<String>, user: DirectoryUser) {
        self.users.write().await.insert(user_id.into(), user);
    }

    pub async fn get(&self, user_id: &str) -> Option<DirectoryUser> {
        self.users.read().await.get(user_id).cloned()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.users.read().await.contains_key(user_id))
    }

    async fn sign_out(&self, user_id: &str) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| Error::Directory(format!("no such user {user_id}")))?;
        user.signed_in = false;
        Ok(())
    }

    async fn update_email(&self, user_id: &str, email: &str) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| Error::Directory(format!("no such user {user_id}")))?;
        user.email = Some(email.to_owned());
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        self.users
            .write()
            .await
            .remove(user_id)
            .map(|_| ())
            .ok_or_else(|| Error::Directory(format!("no such user {user_id}")))
    }
}
