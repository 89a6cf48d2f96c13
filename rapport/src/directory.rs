//! User directory
//!
//! The concepts only know opaque [`UserId`]s. The directory maps the
//! usernames people type to those identifiers and back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::UserId;
use crate::storage::{KeyedStore, Record, RecordFilter, StorageError, StoreFactory};

const MAX_USERNAME_LEN: usize = 64;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("User '{0}' not found")]
    NotFound(String),

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl Record for UserProfile {
    const COLLECTION: &'static str = "user";
}

/// Username reservation, keyed by username
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsernameRecord {
    pub username: String,
    pub id: UserId,
}

impl Record for UsernameRecord {
    const COLLECTION: &'static str = "username";
}

/// Resolves between usernames and user identifiers
#[async_trait]
pub trait UserDirectory: Send + Sync + Debug {
    /// Identifier of the user called `username`
    async fn resolve_username(&self, username: &str) -> Result<UserId, DirectoryError>;

    /// Username of the user `id`
    async fn username_of(&self, id: UserId) -> Result<String, DirectoryError>;

    /// Usernames of `ids`, in the same order
    async fn usernames_for(&self, ids: &[UserId]) -> Result<Vec<String>, DirectoryError> {
        futures::future::try_join_all(ids.iter().map(|id| self.username_of(*id))).await
    }
}

/// [`UserDirectory`] over keyed stores
#[derive(Debug, Clone)]
pub struct StoreUserDirectory {
    profiles: Arc<dyn KeyedStore<UserProfile>>,
    usernames: Arc<dyn KeyedStore<UsernameRecord>>,
}

impl StoreUserDirectory {
    pub fn new(
        profiles: Arc<dyn KeyedStore<UserProfile>>,
        usernames: Arc<dyn KeyedStore<UsernameRecord>>,
    ) -> Self {
        Self {
            profiles,
            usernames,
        }
    }

    pub fn from_factory(factory: &StoreFactory) -> Self {
        Self::new(factory.store(), factory.store())
    }

    /// Register a new user under `username`
    pub async fn register(&self, username: &str) -> Result<UserProfile, DirectoryError> {
        let username = validate_username(username)?;
        let profile = UserProfile {
            id: UserId::new(),
            username: username.to_string(),
            created_at: Utc::now(),
        };

        // The reservation is the uniqueness check
        let reservation = UsernameRecord {
            username: profile.username.clone(),
            id: profile.id,
        };
        match self.usernames.insert(username, reservation).await {
            Ok(_) => {}
            Err(e) if e.is_already_exists() => {
                return Err(DirectoryError::UsernameTaken(username.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self
            .profiles
            .insert(&profile.id.to_string(), profile.clone())
            .await
        {
            if let Err(release) = self.usernames.remove(username).await {
                warn!("Failed to release username '{}': {}", username, release);
            }
            return Err(e.into());
        }

        debug!("Registered user '{}' as {}", profile.username, profile.id);
        Ok(profile)
    }

    pub async fn get_profile(&self, id: UserId) -> Result<Option<UserProfile>, DirectoryError> {
        Ok(self.profiles.get(&id.to_string()).await?)
    }

    /// Every registered user, ordered by username
    pub async fn list_users(&self) -> Result<Vec<UserProfile>, DirectoryError> {
        let mut users = self.profiles.list(&RecordFilter::all()).await?;
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }
}

#[async_trait]
impl UserDirectory for StoreUserDirectory {
    async fn resolve_username(&self, username: &str) -> Result<UserId, DirectoryError> {
        self.usernames
            .get(username)
            .await?
            .map(|record| record.id)
            .ok_or_else(|| DirectoryError::NotFound(username.to_string()))
    }

    async fn username_of(&self, id: UserId) -> Result<String, DirectoryError> {
        self.get_profile(id)
            .await?
            .map(|profile| profile.username)
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))
    }
}

fn validate_username(username: &str) -> Result<&str, DirectoryError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(DirectoryError::InvalidUsername(
            "username cannot be blank".to_string(),
        ));
    }
    if trimmed.len() > MAX_USERNAME_LEN {
        return Err(DirectoryError::InvalidUsername(format!(
            "username cannot exceed {} bytes",
            MAX_USERNAME_LEN
        )));
    }
    if trimmed.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(DirectoryError::InvalidUsername(format!(
            "'{}' contains whitespace or '/'",
            trimmed
        )));
    }
    Ok(trimmed)
}
