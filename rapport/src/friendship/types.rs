//! Records managed by the relationship engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::UserId;
use crate::storage::{Record, store_key};

/// A pending, directed friend request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub from: UserId,
    pub to: UserId,
    pub created_at: DateTime<Utc>,
}

impl FriendRequest {
    pub fn new(from: UserId, to: UserId) -> Self {
        Self {
            from,
            to,
            created_at: Utc::now(),
        }
    }

    /// Store key of the directed pair
    pub fn key_for(from: UserId, to: UserId) -> String {
        store_key([from.to_string(), to.to_string()])
    }
}

impl Record for FriendRequest {
    const COLLECTION: &'static str = "friend_request";
}

/// A symmetric friendship.
///
/// Stored once per unordered pair with `user_a < user_b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friendship {
    pub user_a: UserId,
    pub user_b: UserId,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    /// Create a friendship between two users, in either order
    pub fn new(x: UserId, y: UserId) -> Self {
        let (user_a, user_b) = canonical(x, y);
        Self {
            user_a,
            user_b,
            created_at: Utc::now(),
        }
    }

    /// Store key of the unordered pair
    pub fn key_for(x: UserId, y: UserId) -> String {
        let (a, b) = canonical(x, y);
        store_key([a.to_string(), b.to_string()])
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.user_a == user || self.user_b == user
    }

    /// The friend of `user` in this pair
    pub fn other(&self, user: UserId) -> Option<UserId> {
        if self.user_a == user {
            Some(self.user_b)
        } else if self.user_b == user {
            Some(self.user_a)
        } else {
            None
        }
    }
}

impl Record for Friendship {
    const COLLECTION: &'static str = "friendship";
}

pub(crate) fn canonical(x: UserId, y: UserId) -> (UserId, UserId) {
    if x <= y { (x, y) } else { (y, x) }
}

/// Relationship between two users, from the first user's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    None,
    Friends,
    /// The first user has a pending request to the second
    RequestSent,
    /// The second user has a pending request to the first
    RequestReceived,
}

/// Result of a successful `send_request`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SendOutcome {
    /// A new request is pending
    Requested(FriendRequest),
    /// The opposite request was pending and got accepted instead
    Accepted(Friendship),
}

impl SendOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SendOutcome::Accepted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friendship_is_canonical() {
        let (x, y) = (UserId::new(), UserId::new());
        let forward = Friendship::new(x, y);
        let backward = Friendship::new(y, x);

        assert!(forward.user_a < forward.user_b);
        assert_eq!(forward.user_a, backward.user_a);
        assert_eq!(Friendship::key_for(x, y), Friendship::key_for(y, x));
        assert_eq!(forward.other(x), Some(y));
        assert_eq!(forward.other(UserId::new()), None);
    }

    #[test]
    fn test_request_key_is_directed() {
        let (x, y) = (UserId::new(), UserId::new());
        assert_ne!(FriendRequest::key_for(x, y), FriendRequest::key_for(y, x));
    }
}
