//! Threads of linked content
//!
//! A thread is headed by one piece of content and collects links to other
//! content. Deleting a thread removes its head and every link.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::models::{SubjectId, ThreadId, UserId};
use crate::storage::{KeyLocks, KeyedStore, Record, RecordFilter, StorageError, StoreFactory, store_key};

/// Errors raised by the thread tracker
#[derive(Error, Debug)]
pub enum ThreadError {
    #[error("Thread {thread} not found")]
    ThreadNotFound { thread: ThreadId },

    #[error("Content '{content}' is not linked to any thread")]
    ParentNotFound { content: SubjectId },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ThreadError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ThreadError::ThreadNotFound { .. } | ThreadError::ParentNotFound { .. }
        )
    }
}

/// The content a thread starts from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadHead {
    pub id: ThreadId,
    pub content: SubjectId,
    pub creator: UserId,
    pub created_at: DateTime<Utc>,
}

impl Record for ThreadHead {
    const COLLECTION: &'static str = "thread";
}

/// Content linked into a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadLink {
    pub parent: ThreadId,
    pub content: SubjectId,
    pub created_at: DateTime<Utc>,
}

impl ThreadLink {
    fn key_for(parent: ThreadId, content: &SubjectId) -> String {
        store_key([parent.to_string(), content.to_string()])
    }
}

impl Record for ThreadLink {
    const COLLECTION: &'static str = "thread_link";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOutcome {
    Linked,
    AlreadyLinked,
}

/// Tracks thread heads and the content linked to them
#[derive(Debug)]
pub struct ThreadTracker {
    heads: Arc<dyn KeyedStore<ThreadHead>>,
    links: Arc<dyn KeyedStore<ThreadLink>>,
    locks: KeyLocks,
}

impl ThreadTracker {
    pub fn new(heads: Arc<dyn KeyedStore<ThreadHead>>, links: Arc<dyn KeyedStore<ThreadLink>>) -> Self {
        Self {
            heads,
            links,
            locks: KeyLocks::new(),
        }
    }

    pub fn from_factory(factory: &StoreFactory) -> Self {
        Self::new(factory.store(), factory.store())
    }

    /// Start a thread headed by `content`
    pub async fn create_thread(
        &self,
        content: &SubjectId,
        creator: UserId,
    ) -> Result<ThreadHead, ThreadError> {
        let head = ThreadHead {
            id: ThreadId::new(),
            content: content.clone(),
            creator,
            created_at: Utc::now(),
        };
        let head = self.heads.insert(&head.id.to_string(), head).await?;
        debug!("Thread {} created by {}", head.id, creator);
        Ok(head)
    }

    /// Link `content` into the thread `parent`
    pub async fn link_to_thread(
        &self,
        content: &SubjectId,
        parent: ThreadId,
    ) -> Result<LinkOutcome, ThreadError> {
        let _guard = self.locks.lock(&parent).await;
        if !self.heads.contains(&parent.to_string()).await? {
            return Err(ThreadError::ThreadNotFound { thread: parent });
        }

        let link = ThreadLink {
            parent,
            content: content.clone(),
            created_at: Utc::now(),
        };
        match self
            .links
            .insert(&ThreadLink::key_for(parent, content), link)
            .await
        {
            Ok(_) => Ok(LinkOutcome::Linked),
            Err(e) if e.is_already_exists() => Ok(LinkOutcome::AlreadyLinked),
            Err(e) => Err(e.into()),
        }
    }

    /// The thread `content` is linked to
    pub async fn get_parent(&self, content: &SubjectId) -> Result<ThreadId, ThreadError> {
        self.links
            .list(&RecordFilter::equals("content", content))
            .await?
            .into_iter()
            .min_by_key(|link| link.created_at)
            .map(|link| link.parent)
            .ok_or_else(|| ThreadError::ParentNotFound {
                content: content.clone(),
            })
    }

    /// Every thread, oldest first
    pub async fn list_threads(&self) -> Result<Vec<ThreadHead>, ThreadError> {
        let mut heads = self.heads.list(&RecordFilter::all()).await?;
        heads.sort_by_key(|head| head.created_at);
        Ok(heads)
    }

    /// Content linked into `parent`, oldest first
    pub async fn list_thread(&self, parent: ThreadId) -> Result<Vec<ThreadLink>, ThreadError> {
        let mut links = self
            .links
            .list(&RecordFilter::equals("parent", parent))
            .await?;
        links.sort_by_key(|link| link.created_at);
        Ok(links)
    }

    /// Threads started by `creator`, oldest first
    pub async fn threads_by_creator(&self, creator: UserId) -> Result<Vec<ThreadHead>, ThreadError> {
        let mut heads = self
            .heads
            .list(&RecordFilter::equals("creator", creator))
            .await?;
        heads.sort_by_key(|head| head.created_at);
        Ok(heads)
    }

    pub async fn get_thread(&self, parent: ThreadId) -> Result<Option<ThreadHead>, ThreadError> {
        Ok(self.heads.get(&parent.to_string()).await?)
    }

    /// Unlink `content` from `parent`. Returns whether it was linked.
    pub async fn remove_from_thread(
        &self,
        content: &SubjectId,
        parent: ThreadId,
    ) -> Result<bool, ThreadError> {
        let _guard = self.locks.lock(&parent).await;
        Ok(self
            .links
            .remove(&ThreadLink::key_for(parent, content))
            .await?
            .is_some())
    }

    /// Delete the thread and all its links. Returns whether it existed.
    pub async fn delete_thread(&self, parent: ThreadId) -> Result<bool, ThreadError> {
        let _guard = self.locks.lock(&parent).await;
        let existed = self.heads.remove(&parent.to_string()).await?.is_some();
        let unlinked = self
            .links
            .remove_where(&RecordFilter::equals("parent", parent))
            .await?;
        debug!("Thread {} deleted with {} links", parent, unlinked);
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    fn tracker() -> ThreadTracker {
        ThreadTracker::new(Arc::new(InMemoryStore::new()), Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn test_thread_lifecycle() {
        let threads = tracker();
        let author = UserId::new();
        let head = threads
            .create_thread(&SubjectId::from("post-1"), author)
            .await
            .unwrap();

        let reply = SubjectId::from("post-2");
        assert_eq!(
            threads.link_to_thread(&reply, head.id).await.unwrap(),
            LinkOutcome::Linked
        );
        assert_eq!(
            threads.link_to_thread(&reply, head.id).await.unwrap(),
            LinkOutcome::AlreadyLinked
        );
        assert_eq!(threads.get_parent(&reply).await.unwrap(), head.id);
        assert_eq!(threads.list_thread(head.id).await.unwrap().len(), 1);
        assert_eq!(threads.threads_by_creator(author).await.unwrap(), vec![head.clone()]);

        assert!(threads.delete_thread(head.id).await.unwrap());
        assert!(threads.list_threads().await.unwrap().is_empty());
        assert!(threads.list_thread(head.id).await.unwrap().is_empty());
        assert!(threads.get_parent(&reply).await.unwrap_err().is_not_found());
        assert!(!threads.delete_thread(head.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_link_requires_existing_thread() {
        let threads = tracker();
        let err = threads
            .link_to_thread(&SubjectId::from("post-1"), ThreadId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ThreadError::ThreadNotFound { .. }));
    }

    #[tokio::test]
    async fn test_remove_from_thread_is_tolerant() {
        let threads = tracker();
        let head = threads
            .create_thread(&SubjectId::from("post-1"), UserId::new())
            .await
            .unwrap();
        let reply = SubjectId::from("post-2");

        assert!(!threads.remove_from_thread(&reply, head.id).await.unwrap());
        threads.link_to_thread(&reply, head.id).await.unwrap();
        assert!(threads.remove_from_thread(&reply, head.id).await.unwrap());
        assert!(threads.get_parent(&reply).await.is_err());
    }
}
