//! Friendship request workflow

use std::sync::Arc;
use tracing::{debug, warn};

use super::error::FriendshipError;
use super::types::{FriendRequest, Friendship, RelationshipStatus, SendOutcome, canonical};
use crate::config::{FriendshipConfig, ReverseRequestPolicy};
use crate::models::UserId;
use crate::storage::{KeyLocks, KeyedStore, RecordFilter, StoreFactory};

type Result<T> = std::result::Result<T, FriendshipError>;

/// Maintains the friendship graph through a request/accept/reject workflow.
///
/// Every mutating operation holds the lock of the unordered pair it touches,
/// and consuming a pending request goes through the store's `remove`, so two
/// racing answers to the same request produce exactly one success.
///
/// The engine is identity agnostic: `accept_request(from, to)` does not know
/// who is calling. Callers must only invoke it on behalf of `to`.
#[derive(Debug)]
pub struct RelationshipEngine {
    requests: Arc<dyn KeyedStore<FriendRequest>>,
    friendships: Arc<dyn KeyedStore<Friendship>>,
    locks: KeyLocks,
    reverse_policy: ReverseRequestPolicy,
}

impl RelationshipEngine {
    /// Create an engine over the given stores with the default policy
    pub fn new(
        requests: Arc<dyn KeyedStore<FriendRequest>>,
        friendships: Arc<dyn KeyedStore<Friendship>>,
    ) -> Self {
        Self {
            requests,
            friendships,
            locks: KeyLocks::new(),
            reverse_policy: ReverseRequestPolicy::default(),
        }
    }

    /// Create an engine with stores from `factory`
    pub fn from_factory(factory: &StoreFactory, config: &FriendshipConfig) -> Self {
        Self::new(factory.store(), factory.store())
            .with_reverse_policy(config.reverse_request_policy)
    }

    /// Choose what happens when a user answers a pending request with a
    /// request of their own
    pub fn with_reverse_policy(mut self, policy: ReverseRequestPolicy) -> Self {
        self.reverse_policy = policy;
        self
    }

    pub fn reverse_policy(&self) -> ReverseRequestPolicy {
        self.reverse_policy
    }

    /// Send a friend request from `from` to `to`
    pub async fn send_request(&self, from: UserId, to: UserId) -> Result<SendOutcome> {
        if from == to {
            return Err(FriendshipError::invalid_request(
                "cannot send a friend request to yourself",
            ));
        }

        let _guard = self.locks.lock(&canonical(from, to)).await;

        if self.friendships.contains(&Friendship::key_for(from, to)).await? {
            return Err(FriendshipError::already_friends(from, to));
        }

        let key = FriendRequest::key_for(from, to);
        if self.requests.contains(&key).await? {
            return Err(FriendshipError::duplicate_request(from, to));
        }

        if self
            .requests
            .contains(&FriendRequest::key_for(to, from))
            .await?
        {
            return match self.reverse_policy {
                ReverseRequestPolicy::Reject => Err(FriendshipError::request_exists(from, to)),
                ReverseRequestPolicy::AutoAccept => {
                    debug!("Auto-accepting pending request from {} to {}", to, from);
                    let friendship = self.consume_request(to, from).await?;
                    Ok(SendOutcome::Accepted(friendship))
                }
            };
        }

        match self.requests.insert(&key, FriendRequest::new(from, to)).await {
            Ok(request) => {
                debug!("Friend request sent from {} to {}", from, to);
                Ok(SendOutcome::Requested(request))
            }
            Err(e) if e.is_already_exists() => Err(FriendshipError::duplicate_request(from, to)),
            Err(e) => Err(e.into()),
        }
    }

    /// Withdraw a pending request. Returns whether a request was removed.
    pub async fn remove_request(&self, from: UserId, to: UserId) -> Result<bool> {
        let _guard = self.locks.lock(&canonical(from, to)).await;
        let removed = self
            .requests
            .remove(&FriendRequest::key_for(from, to))
            .await?
            .is_some();
        debug!(
            "Friend request from {} to {} withdrawn: {}",
            from, to, removed
        );
        Ok(removed)
    }

    /// Accept the pending request from `from` to `to`, making them friends
    pub async fn accept_request(&self, from: UserId, to: UserId) -> Result<Friendship> {
        let _guard = self.locks.lock(&canonical(from, to)).await;
        self.consume_request(from, to).await
    }

    /// Reject the pending request from `from` to `to`
    pub async fn reject_request(&self, from: UserId, to: UserId) -> Result<()> {
        let _guard = self.locks.lock(&canonical(from, to)).await;
        match self.requests.remove(&FriendRequest::key_for(from, to)).await? {
            Some(_) => {
                debug!("Friend request from {} to {} rejected", from, to);
                Ok(())
            }
            None => Err(FriendshipError::request_not_found(from, to)),
        }
    }

    /// End a friendship. Returns whether the pair were friends.
    pub async fn remove_friend(&self, a: UserId, b: UserId) -> Result<bool> {
        let _guard = self.locks.lock(&canonical(a, b)).await;
        let removed = self
            .friendships
            .remove(&Friendship::key_for(a, b))
            .await?
            .is_some();
        debug!("Friendship between {} and {} removed: {}", a, b, removed);
        Ok(removed)
    }

    /// Users paired with `user`, in no particular order
    pub async fn get_friends(&self, user: UserId) -> Result<Vec<UserId>> {
        let filter =
            RecordFilter::equals("user_a", user).or(RecordFilter::equals("user_b", user));
        let friendships = self.friendships.list(&filter).await?;
        Ok(friendships.iter().filter_map(|f| f.other(user)).collect())
    }

    /// Pending requests addressed to `user`
    pub async fn get_requests(&self, user: UserId) -> Result<Vec<FriendRequest>> {
        Ok(self
            .requests
            .list(&RecordFilter::equals("to", user))
            .await?)
    }

    /// Pending requests sent by `user`
    pub async fn get_sent_requests(&self, user: UserId) -> Result<Vec<FriendRequest>> {
        Ok(self
            .requests
            .list(&RecordFilter::equals("from", user))
            .await?)
    }

    pub async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool> {
        if a == b {
            return Ok(false);
        }
        Ok(self.friendships.contains(&Friendship::key_for(a, b)).await?)
    }

    /// Relationship between `a` and `b` as seen by `a`
    pub async fn relationship_status(&self, a: UserId, b: UserId) -> Result<RelationshipStatus> {
        if self.are_friends(a, b).await? {
            return Ok(RelationshipStatus::Friends);
        }
        if self.requests.contains(&FriendRequest::key_for(a, b)).await? {
            return Ok(RelationshipStatus::RequestSent);
        }
        if self.requests.contains(&FriendRequest::key_for(b, a)).await? {
            return Ok(RelationshipStatus::RequestReceived);
        }
        Ok(RelationshipStatus::None)
    }

    /// Turn the pending request into a friendship. Caller holds the pair lock.
    async fn consume_request(&self, from: UserId, to: UserId) -> Result<Friendship> {
        let key = FriendRequest::key_for(from, to);
        let request = self
            .requests
            .remove(&key)
            .await?
            .ok_or_else(|| FriendshipError::request_not_found(from, to))?;

        let error = match self
            .friendships
            .insert(&Friendship::key_for(from, to), Friendship::new(from, to))
            .await
        {
            Ok(friendship) => {
                debug!("Friend request from {} to {} accepted", from, to);
                return Ok(friendship);
            }
            Err(e) if e.is_already_exists() => FriendshipError::already_friends(from, to),
            Err(e) => e.into(),
        };

        // Put the request back so a failed accept changes nothing
        if let Err(restore) = self.requests.insert(&key, request).await {
            warn!(
                "Failed to restore friend request from {} to {}: {}",
                from, to, restore
            );
        }
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    fn engine() -> RelationshipEngine {
        RelationshipEngine::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryStore::new()),
        )
    }

    #[tokio::test]
    async fn test_accept_creates_symmetric_friendship() {
        let engine = engine();
        let (alice, bob) = (UserId::new(), UserId::new());

        let outcome = engine.send_request(alice, bob).await.unwrap();
        assert!(!outcome.is_accepted());
        assert_eq!(engine.get_requests(bob).await.unwrap().len(), 1);
        assert_eq!(engine.get_sent_requests(alice).await.unwrap().len(), 1);

        engine.accept_request(alice, bob).await.unwrap();

        assert_eq!(engine.get_friends(alice).await.unwrap(), vec![bob]);
        assert_eq!(engine.get_friends(bob).await.unwrap(), vec![alice]);
        assert!(engine.get_requests(bob).await.unwrap().is_empty());
        assert!(engine.are_friends(bob, alice).await.unwrap());
    }

    #[tokio::test]
    async fn test_self_request_is_invalid() {
        let engine = engine();
        let alice = UserId::new();

        let err = engine.send_request(alice, alice).await.unwrap_err();
        assert!(err.is_invalid_request());
        assert!(engine.get_sent_requests(alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_and_reverse_requests() {
        let engine = engine();
        let (alice, bob) = (UserId::new(), UserId::new());

        engine.send_request(alice, bob).await.unwrap();
        assert!(
            engine
                .send_request(alice, bob)
                .await
                .unwrap_err()
                .is_duplicate_request()
        );
        assert!(
            engine
                .send_request(bob, alice)
                .await
                .unwrap_err()
                .is_request_exists()
        );
        assert_eq!(
            engine.relationship_status(bob, alice).await.unwrap(),
            RelationshipStatus::RequestReceived
        );
    }

    #[tokio::test]
    async fn test_auto_accept_reverse_request() {
        let engine = engine().with_reverse_policy(ReverseRequestPolicy::AutoAccept);
        let (alice, bob) = (UserId::new(), UserId::new());

        engine.send_request(alice, bob).await.unwrap();
        let outcome = engine.send_request(bob, alice).await.unwrap();

        assert!(outcome.is_accepted());
        assert!(engine.are_friends(alice, bob).await.unwrap());
        assert!(engine.get_requests(bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_after_accept_reports_already_friends() {
        let engine = engine();
        let (alice, bob) = (UserId::new(), UserId::new());

        engine.send_request(alice, bob).await.unwrap();
        engine.accept_request(alice, bob).await.unwrap();

        assert!(
            engine
                .send_request(bob, alice)
                .await
                .unwrap_err()
                .is_already_friends()
        );
    }

    #[tokio::test]
    async fn test_reject_and_withdraw() {
        let engine = engine();
        let (alice, bob) = (UserId::new(), UserId::new());

        assert!(
            engine
                .reject_request(alice, bob)
                .await
                .unwrap_err()
                .is_request_not_found()
        );
        assert!(
            engine
                .accept_request(alice, bob)
                .await
                .unwrap_err()
                .is_request_not_found()
        );

        engine.send_request(alice, bob).await.unwrap();
        engine.reject_request(alice, bob).await.unwrap();
        assert!(!engine.are_friends(alice, bob).await.unwrap());
        assert_eq!(
            engine.relationship_status(alice, bob).await.unwrap(),
            RelationshipStatus::None
        );

        engine.send_request(alice, bob).await.unwrap();
        assert!(engine.remove_request(alice, bob).await.unwrap());
        assert!(!engine.remove_request(alice, bob).await.unwrap());
    }

    #[tokio::test]
    async fn test_accept_onto_existing_friendship_keeps_request() {
        let requests: Arc<dyn KeyedStore<FriendRequest>> = Arc::new(InMemoryStore::new());
        let friendships: Arc<dyn KeyedStore<Friendship>> = Arc::new(InMemoryStore::new());
        let engine = RelationshipEngine::new(requests.clone(), friendships.clone());
        let (alice, bob) = (UserId::new(), UserId::new());

        // A pending request next to a friendship, written behind the engine's back
        requests
            .insert(&FriendRequest::key_for(alice, bob), FriendRequest::new(alice, bob))
            .await
            .unwrap();
        friendships
            .insert(&Friendship::key_for(alice, bob), Friendship::new(alice, bob))
            .await
            .unwrap();

        let err = engine.accept_request(alice, bob).await.unwrap_err();
        assert!(err.is_already_friends());
        assert_eq!(engine.get_requests(bob).await.unwrap().len(), 1);
        assert_eq!(
            friendships.count(&RecordFilter::all()).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_remove_friend_is_tolerant() {
        let engine = engine();
        let (alice, bob) = (UserId::new(), UserId::new());

        engine.send_request(alice, bob).await.unwrap();
        engine.accept_request(alice, bob).await.unwrap();

        assert!(engine.remove_friend(bob, alice).await.unwrap());
        assert!(!engine.remove_friend(alice, bob).await.unwrap());
        assert!(engine.get_friends(alice).await.unwrap().is_empty());
    }
}
