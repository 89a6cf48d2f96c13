//! Friendship relationships
//!
//! A directed [`FriendRequest`] is created by `send_request` and consumed by
//! exactly one of accept, reject or withdraw. Accepting turns it into a
//! symmetric [`Friendship`]. A pair never holds both a pending request and a
//! friendship.

mod engine;
mod error;
mod types;

pub use engine::RelationshipEngine;
pub use error::FriendshipError;
pub use types::{FriendRequest, Friendship, RelationshipStatus, SendOutcome};
