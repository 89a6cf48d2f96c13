//! Per-subject voting
//!
//! Each voter holds at most one vote per subject. Setting a vote overwrites
//! the previous one; the last write wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::models::{SubjectId, UserId};
use crate::storage::{KeyedStore, Record, RecordFilter, StorageError, StoreFactory, store_key};

/// Direction of a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Upvote,
    Downvote,
}

impl VoteChoice {
    /// Contribution to a subject's score
    pub fn weight(&self) -> i64 {
        match self {
            VoteChoice::Upvote => 1,
            VoteChoice::Downvote => -1,
        }
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteChoice::Upvote => write!(f, "upvote"),
            VoteChoice::Downvote => write!(f, "downvote"),
        }
    }
}

impl FromStr for VoteChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "upvote" | "up" => Ok(VoteChoice::Upvote),
            "downvote" | "down" => Ok(VoteChoice::Downvote),
            _ => Err(format!("Invalid vote choice: {}", s)),
        }
    }
}

/// A stored vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub subject: SubjectId,
    pub voter: UserId,
    pub choice: VoteChoice,
    pub updated_at: DateTime<Utc>,
}

impl Record for VoteRecord {
    const COLLECTION: &'static str = "vote";
}

/// Aggregated votes of one subject
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub upvotes: u64,
    pub downvotes: u64,
    /// Upvotes minus downvotes
    pub score: i64,
}

/// Records up/down votes per (subject, voter)
#[derive(Debug, Clone)]
pub struct VoteTracker {
    store: Arc<dyn KeyedStore<VoteRecord>>,
}

impl VoteTracker {
    pub fn new(store: Arc<dyn KeyedStore<VoteRecord>>) -> Self {
        Self { store }
    }

    pub fn from_factory(factory: &StoreFactory) -> Self {
        Self::new(factory.store())
    }

    fn key(subject: &SubjectId, voter: UserId) -> String {
        store_key([voter.to_string(), subject.to_string()])
    }

    /// Record `voter`'s vote on `subject`, replacing any earlier vote
    pub async fn set_vote(
        &self,
        choice: VoteChoice,
        subject: &SubjectId,
        voter: UserId,
    ) -> Result<(), StorageError> {
        let record = VoteRecord {
            subject: subject.clone(),
            voter,
            choice,
            updated_at: Utc::now(),
        };
        let previous = self.store.upsert(&Self::key(subject, voter), record).await?;
        debug!(
            "Vote on {} by {} set to {} (was {:?})",
            subject,
            voter,
            choice,
            previous.map(|p| p.choice)
        );
        Ok(())
    }

    /// Remove `voter`'s vote on `subject`. Returns whether a vote existed.
    pub async fn remove_vote(&self, subject: &SubjectId, voter: UserId) -> Result<bool, StorageError> {
        Ok(self.store.remove(&Self::key(subject, voter)).await?.is_some())
    }

    /// `voter`'s current vote on `subject`, `None` when they have not voted
    pub async fn get_vote(
        &self,
        subject: &SubjectId,
        voter: UserId,
    ) -> Result<Option<VoteChoice>, StorageError> {
        Ok(self
            .store
            .get(&Self::key(subject, voter))
            .await?
            .map(|record| record.choice))
    }

    /// Count the votes on `subject`
    pub async fn tally(&self, subject: &SubjectId) -> Result<VoteTally, StorageError> {
        let votes = self
            .store
            .list(&RecordFilter::equals("subject", subject))
            .await?;

        let mut tally = VoteTally::default();
        for vote in &votes {
            match vote.choice {
                VoteChoice::Upvote => tally.upvotes += 1,
                VoteChoice::Downvote => tally.downvotes += 1,
            }
            tally.score += vote.choice.weight();
        }
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    fn tracker() -> VoteTracker {
        VoteTracker::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let votes = tracker();
        let post = SubjectId::from("post-1");
        let voter = UserId::new();

        assert_eq!(votes.get_vote(&post, voter).await.unwrap(), None);

        votes.set_vote(VoteChoice::Upvote, &post, voter).await.unwrap();
        votes.set_vote(VoteChoice::Downvote, &post, voter).await.unwrap();
        assert_eq!(
            votes.get_vote(&post, voter).await.unwrap(),
            Some(VoteChoice::Downvote)
        );

        assert!(votes.remove_vote(&post, voter).await.unwrap());
        assert!(!votes.remove_vote(&post, voter).await.unwrap());
        assert_eq!(votes.get_vote(&post, voter).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_tally_counts_one_vote_per_voter() {
        let votes = tracker();
        let post = SubjectId::from("post-1");
        let other = SubjectId::from("post-2");
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());

        votes.set_vote(VoteChoice::Upvote, &post, a).await.unwrap();
        votes.set_vote(VoteChoice::Upvote, &post, a).await.unwrap();
        votes.set_vote(VoteChoice::Upvote, &post, b).await.unwrap();
        votes.set_vote(VoteChoice::Downvote, &post, c).await.unwrap();
        votes.set_vote(VoteChoice::Downvote, &other, c).await.unwrap();

        assert_eq!(
            votes.tally(&post).await.unwrap(),
            VoteTally {
                upvotes: 2,
                downvotes: 1,
                score: 1
            }
        );
    }

    #[test]
    fn test_choice_parsing() {
        assert_eq!("UP".parse::<VoteChoice>().unwrap(), VoteChoice::Upvote);
        assert_eq!("downvote".parse::<VoteChoice>().unwrap(), VoteChoice::Downvote);
        assert!("sideways".parse::<VoteChoice>().is_err());
    }
}
