//! Data Transfer Objects for the API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use rapport::allocator::Allocation;
use rapport::deadlines::DeadlineStatus;
use rapport::directory::UserProfile;
use rapport::friendship::{FriendRequest, SendOutcome};
use rapport::threads::{LinkOutcome, ThreadHead, ThreadLink};
use rapport::votes::{VoteChoice, VoteTally};

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserProfile> for UserDto {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: *profile.id.as_uuid(),
            username: profile.username,
            created_at: profile.created_at,
        }
    }
}

/// Request to register a username
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterUserRequest {
    pub username: String,
}

/// A pending friend request, with usernames resolved
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FriendRequestDto {
    /// Username of the sender
    pub from: String,
    /// Username of the recipient
    pub to: String,
    pub created_at: DateTime<Utc>,
}

impl FriendRequestDto {
    pub fn new(request: &FriendRequest, from: String, to: String) -> Self {
        Self {
            from,
            to,
            created_at: request.created_at,
        }
    }
}

/// Outcome of sending a friend request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendRequestResponse {
    /// `requested` or `accepted`
    pub status: String,
}

impl From<&SendOutcome> for SendRequestResponse {
    fn from(outcome: &SendOutcome) -> Self {
        let status = if outcome.is_accepted() {
            "accepted"
        } else {
            "requested"
        };
        Self {
            status: status.to_string(),
        }
    }
}

/// The caller's vote on a post
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoteStatusDto {
    pub post: String,
    /// `upvote`, `downvote` or absent
    pub vote: Option<String>,
}

impl VoteStatusDto {
    pub fn new(post: &str, vote: Option<VoteChoice>) -> Self {
        Self {
            post: post.to_string(),
            vote: vote.map(|choice| choice.to_string()),
        }
    }
}

/// Aggregated votes on a post
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoteTallyDto {
    pub post: String,
    pub upvotes: u64,
    pub downvotes: u64,
    pub score: i64,
}

impl VoteTallyDto {
    pub fn new(post: &str, tally: VoteTally) -> Self {
        Self {
            post: post.to_string(),
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
            score: tally.score,
        }
    }
}

/// Deadline of a subject
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeadlineDto {
    pub subject: String,
    pub deadline: Option<DateTime<Utc>>,
    /// `no_deadline`, `active` or `expired`
    pub status: String,
}

impl DeadlineDto {
    pub fn new(subject: &str, deadline: Option<DateTime<Utc>>, status: DeadlineStatus) -> Self {
        let status = match status {
            DeadlineStatus::NoDeadline => "no_deadline",
            DeadlineStatus::Active => "active",
            DeadlineStatus::Expired => "expired",
        };
        Self {
            subject: subject.to_string(),
            deadline,
            status: status.to_string(),
        }
    }
}

/// Request to set a deadline
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetDeadlineRequest {
    pub deadline: DateTime<Utc>,
}

/// Request to start a thread
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateThreadRequest {
    /// Content heading the thread
    pub content: String,
}

/// A thread head
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ThreadDto {
    pub id: Uuid,
    pub content: String,
    /// Username of the creator
    pub creator: String,
    pub created_at: DateTime<Utc>,
}

impl ThreadDto {
    pub fn new(head: ThreadHead, creator: String) -> Self {
        Self {
            id: *head.id.as_uuid(),
            content: head.content.to_string(),
            creator,
            created_at: head.created_at,
        }
    }
}

/// Content linked into a thread
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ThreadLinkDto {
    pub thread: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<ThreadLink> for ThreadLinkDto {
    fn from(link: ThreadLink) -> Self {
        Self {
            thread: *link.parent.as_uuid(),
            content: link.content.to_string(),
            created_at: link.created_at,
        }
    }
}

/// Outcome of linking content into a thread
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LinkResponse {
    /// `linked` or `already_linked`
    pub status: String,
}

impl From<LinkOutcome> for LinkResponse {
    fn from(outcome: LinkOutcome) -> Self {
        let status = match outcome {
            LinkOutcome::Linked => "linked",
            LinkOutcome::AlreadyLinked => "already_linked",
        };
        Self {
            status: status.to_string(),
        }
    }
}

/// Request to allocate a resource
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct AllocateRequest {
    /// Hold duration in seconds; the configured default when absent
    pub duration_secs: Option<u64>,
}

/// A live allocation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AllocationDto {
    pub resource: String,
    /// Username of the holder
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub fencing_token: u64,
}

impl AllocationDto {
    pub fn new(allocation: Allocation, holder: String) -> Self {
        Self {
            resource: allocation.resource.to_string(),
            holder,
            acquired_at: allocation.acquired_at,
            expires_at: allocation.expires_at,
            fencing_token: allocation.fencing_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapport::models::UserId;

    #[test]
    fn test_deadline_status_names() {
        let dto = DeadlineDto::new("post-1", None, DeadlineStatus::NoDeadline);
        assert_eq!(dto.status, "no_deadline");
        assert!(dto.deadline.is_none());

        let now = Utc::now();
        let dto = DeadlineDto::new("post-1", Some(now), DeadlineStatus::Expired);
        assert_eq!(dto.status, "expired");
        assert_eq!(dto.deadline, Some(now));
    }

    #[test]
    fn test_send_outcome_status() {
        let requested = SendOutcome::Requested(FriendRequest::new(UserId::new(), UserId::new()));
        assert_eq!(SendRequestResponse::from(&requested).status, "requested");
    }

    #[test]
    fn test_vote_status_serializes_choice() {
        let dto = VoteStatusDto::new("post-1", Some(VoteChoice::Downvote));
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["vote"], "downvote");
        assert_eq!(VoteStatusDto::new("post-1", None).vote, None);
    }
}
