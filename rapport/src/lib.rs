//! # Rapport
//!
//! Social-graph backend concepts built on a keyed state store: a friendship
//! workflow engine (request, accept, reject, remove), per-subject vote
//! tracking, deadlines, threads, and time-boxed resource allocation with
//! cancellable auto-release.
//!
//! ## Quick Start
//!
//! ```rust
//! use rapport::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // In-memory stores, nothing touches disk
//!     let rapport = Rapport::new(ConfigBuilder::testing().build()?).await?;
//!
//!     let alice = rapport.directory().register("alice").await?;
//!     let bob = rapport.directory().register("bob").await?;
//!
//!     rapport.friendships().send_request(alice.id, bob.id).await?;
//!     rapport.friendships().accept_request(alice.id, bob.id).await?;
//!
//!     assert!(rapport.friendships().are_friends(alice.id, bob.id).await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **storage**: the `KeyedStore` abstraction every concept is built on,
//!   with in-memory and embedded SurrealDB backends
//! - **friendship**: the request/accept/reject/remove state machine
//! - **votes**, **deadlines**, **threads**, **allocator**: independent
//!   concepts keyed by opaque subject identifiers
//! - **directory**: username to identifier resolution
//!
//! The crate performs no authentication; callers resolve identities before
//! invoking a concept.

pub mod allocator;
pub mod config;
pub mod deadlines;
pub mod directory;
pub mod friendship;
pub mod logging;
pub mod models;
pub mod services;
pub mod storage;
pub mod threads;
pub mod votes;

pub use services::Rapport;

/// The prelude re-exports commonly used types for convenience
pub mod prelude {
    pub use crate::services::Rapport;

    // Re-export core initialization functions
    pub use crate::{init, init_with_defaults};

    // Re-export config types
    pub use crate::config::{
        AllocatorConfig, ConfigBuilder, FriendshipConfig, LogLevel, RapportConfig,
        ReverseRequestPolicy, StorageBackend, StorageConfig,
    };

    // Re-export identifiers
    pub use crate::models::{SubjectId, ThreadId, UserId};

    // Re-export concepts
    pub use crate::allocator::{Allocation, AllocationError, TimeBoxedAllocator};
    pub use crate::deadlines::{DeadlineStatus, DeadlineTracker};
    pub use crate::directory::{DirectoryError, StoreUserDirectory, UserDirectory, UserProfile};
    pub use crate::friendship::{
        FriendRequest, Friendship, FriendshipError, RelationshipEngine, RelationshipStatus,
        SendOutcome,
    };
    pub use crate::threads::{LinkOutcome, ThreadError, ThreadHead, ThreadLink, ThreadTracker};
    pub use crate::votes::{VoteChoice, VoteTally, VoteTracker};

    // Re-export storage types for advanced usage
    pub use crate::storage::{InMemoryStore, KeyedStore, Record, RecordFilter, StorageError};

    // Re-export essential result type
    pub use crate::{RapportError, Result};
}

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error type for Rapport operations
#[derive(Debug, thiserror::Error)]
pub enum RapportError {
    /// Error during storage operations
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Logging error
    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LogError),

    /// Friendship workflow errors
    #[error(transparent)]
    Friendship(#[from] friendship::FriendshipError),

    /// Allocation errors
    #[error(transparent)]
    Allocation(#[from] allocator::AllocationError),

    /// Thread errors
    #[error(transparent)]
    Thread(#[from] threads::ThreadError),

    /// User directory errors
    #[error(transparent)]
    Directory(#[from] directory::DirectoryError),

    /// Other unclassified errors
    #[error("{0}")]
    Other(String),
}

impl From<crate::config::ConfigError> for RapportError {
    fn from(err: crate::config::ConfigError) -> Self {
        RapportError::Configuration(err.to_string())
    }
}

/// Result type for Rapport operations
pub type Result<T> = std::result::Result<T, RapportError>;

/// Initialize Rapport with default configuration
///
/// # Examples
///
/// ```rust,no_run
/// use rapport::prelude::*;
///
/// async fn example() -> Result<()> {
///     let rapport = init_with_defaults().await?;
///     let users = rapport.directory().list_users().await?;
///     println!("{} users registered", users.len());
///     Ok(())
/// }
/// ```
pub async fn init_with_defaults() -> Result<Rapport> {
    let config = config::ConfigBuilder::defaults().build()?;
    init(config).await
}

/// Initialize Rapport with the provided configuration
///
/// Sets up logging, opens the configured storage backend and re-arms release
/// timers for allocations persisted by a previous run.
pub async fn init(config: config::RapportConfig) -> Result<Rapport> {
    // Ignore errors if tracing is already initialized
    let _ = logging::init(&config.logging);

    Rapport::new(config).await
}
