//! In-process `UserStore` for development and tests (no DATABASE_URL).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::repos::error::RepoError;
use crate::repos::user_repo::{NewUser, ProfileUpdate, UserRecord, UserStatus, UserStore};

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, RepoError> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, RepoError> {
        let email = user.email.to_lowercase();
        let mut users = self.users.write().await;

        // Check and insert under one lock, like the unique index does.
        if users.values().any(|u| u.email == email) {
            return Err(RepoError::Conflict);
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            fullname: user.fullname,
            email,
            password_hash: user.password_hash,
            role: user.role,
            status: UserStatus::Active,
            phone: user.phone,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<UserRecord>, RepoError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(fullname) = update.fullname {
            user.fullname = fullname;
        }
        if let Some(phone) = update.phone {
            user.phone = phone;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, RepoError> {
        let mut users = self.users.write().await;
        Ok(users
            .get_mut(&id)
            .map(|user| {
                user.password_hash = password_hash.to_string();
                user.updated_at = Utc::now();
            })
            .is_some())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: UserStatus,
    ) -> Result<Option<UserRecord>, RepoError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            user.status = status;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<(), RepoError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<UserRecord>, RepoError> {
        let mut users: Vec<UserRecord> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }
}
