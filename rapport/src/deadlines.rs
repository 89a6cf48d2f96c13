//! Subject deadlines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::models::SubjectId;
use crate::storage::{KeyedStore, Record, RecordFilter, StorageError, StoreFactory};

/// Deadline of one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineRecord {
    pub subject: SubjectId,
    pub deadline: DateTime<Utc>,
}

impl Record for DeadlineRecord {
    const COLLECTION: &'static str = "deadline";
}

/// Whether a subject's deadline has passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineStatus {
    /// No deadline was set
    NoDeadline,
    /// The deadline is now or in the future
    Active,
    /// The deadline is strictly in the past
    Expired,
}

impl DeadlineStatus {
    /// `None` when no deadline is set
    pub fn is_expired(&self) -> Option<bool> {
        match self {
            DeadlineStatus::NoDeadline => None,
            DeadlineStatus::Active => Some(false),
            DeadlineStatus::Expired => Some(true),
        }
    }
}

/// Stores at most one deadline per subject
#[derive(Debug, Clone)]
pub struct DeadlineTracker {
    store: Arc<dyn KeyedStore<DeadlineRecord>>,
}

impl DeadlineTracker {
    pub fn new(store: Arc<dyn KeyedStore<DeadlineRecord>>) -> Self {
        Self { store }
    }

    pub fn from_factory(factory: &StoreFactory) -> Self {
        Self::new(factory.store())
    }

    /// Set or replace the deadline of `subject`
    pub async fn set_deadline(
        &self,
        subject: &SubjectId,
        deadline: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let record = DeadlineRecord {
            subject: subject.clone(),
            deadline,
        };
        self.store.upsert(subject.as_str(), record).await?;
        debug!("Deadline of {} set to {}", subject, deadline);
        Ok(())
    }

    pub async fn get_deadline(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        Ok(self
            .store
            .get(subject.as_str())
            .await?
            .map(|record| record.deadline))
    }

    /// Status of `subject` relative to the current time
    pub async fn status(&self, subject: &SubjectId) -> Result<DeadlineStatus, StorageError> {
        self.status_at(subject, Utc::now()).await
    }

    /// Status of `subject` relative to `now`
    pub async fn status_at(
        &self,
        subject: &SubjectId,
        now: DateTime<Utc>,
    ) -> Result<DeadlineStatus, StorageError> {
        Ok(match self.get_deadline(subject).await? {
            None => DeadlineStatus::NoDeadline,
            Some(deadline) if deadline < now => DeadlineStatus::Expired,
            Some(_) => DeadlineStatus::Active,
        })
    }

    /// Whether the deadline of `subject` has passed, `None` if it has none
    pub async fn is_expired(&self, subject: &SubjectId) -> Result<Option<bool>, StorageError> {
        Ok(self.status(subject).await?.is_expired())
    }

    /// Drop the deadline of `subject`. Returns whether one was set.
    pub async fn clear_deadline(&self, subject: &SubjectId) -> Result<bool, StorageError> {
        Ok(self.store.remove(subject.as_str()).await?.is_some())
    }

    /// Subjects whose deadline is strictly before now
    pub async fn expired_subjects(&self) -> Result<Vec<SubjectId>, StorageError> {
        let expired = self
            .store
            .list(&RecordFilter::before("deadline", Utc::now()))
            .await?;
        Ok(expired.into_iter().map(|record| record.subject).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use chrono::Duration;

    fn tracker() -> DeadlineTracker {
        DeadlineTracker::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn test_status_is_three_valued() {
        let deadlines = tracker();
        let post = SubjectId::from("post-1");
        let now = Utc::now();

        assert_eq!(
            deadlines.status(&post).await.unwrap(),
            DeadlineStatus::NoDeadline
        );
        assert_eq!(deadlines.is_expired(&post).await.unwrap(), None);

        deadlines
            .set_deadline(&post, now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(deadlines.is_expired(&post).await.unwrap(), Some(false));

        deadlines
            .set_deadline(&post, now - Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(deadlines.is_expired(&post).await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_deadline_equal_to_now_is_active() {
        let deadlines = tracker();
        let post = SubjectId::from("post-1");
        let now = Utc::now();

        deadlines.set_deadline(&post, now).await.unwrap();
        assert_eq!(
            deadlines.status_at(&post, now).await.unwrap(),
            DeadlineStatus::Active
        );
    }

    #[tokio::test]
    async fn test_clear_and_expired_subjects() {
        let deadlines = tracker();
        let past = SubjectId::from("past");
        let future = SubjectId::from("future");
        let now = Utc::now();

        deadlines
            .set_deadline(&past, now - Duration::minutes(5))
            .await
            .unwrap();
        deadlines
            .set_deadline(&future, now + Duration::minutes(5))
            .await
            .unwrap();

        assert_eq!(deadlines.expired_subjects().await.unwrap(), vec![past.clone()]);

        assert!(deadlines.clear_deadline(&past).await.unwrap());
        assert!(!deadlines.clear_deadline(&past).await.unwrap());
        assert!(deadlines.expired_subjects().await.unwrap().is_empty());
    }
}
