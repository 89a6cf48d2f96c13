//! Time-boxed resource allocation
//!
//! A resource is held by at most one holder at a time. Every allocation
//! carries an expiry and a release timer; when the timer fires the
//! allocation is released automatically.
//!
//! Timers run on a scheduler [`Handle`] passed in by the owner, never on the
//! caller's task. Each allocation is stamped with a fencing token that grows
//! on every fresh acquisition of the resource. A timer only releases the
//! allocation it was armed for, identified by token and expiry, so a timer
//! that fires late can never release a newer allocation. Every mutation
//! stops the resource's timer before it reads the stored allocation.

mod error;

pub use error::AllocationError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AllocatorConfig;
use crate::models::{SubjectId, UserId};
use crate::storage::{KeyLocks, KeyedStore, Record, RecordFilter, StorageError, StoreFactory};

type Result<T> = std::result::Result<T, AllocationError>;

/// Custody of a resource until `expires_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub resource: SubjectId,
    pub holder: UserId,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub fencing_token: u64,
}

impl Allocation {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

impl Record for Allocation {
    const COLLECTION: &'static str = "allocation";
}

/// Last fencing token handed out for a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FenceRecord {
    pub resource: SubjectId,
    pub last_token: u64,
}

impl Record for FenceRecord {
    const COLLECTION: &'static str = "allocation_fence";
}

#[derive(Debug)]
struct ArmedTimer {
    handle: JoinHandle<()>,
    fencing_token: u64,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Inner {
    allocations: Arc<dyn KeyedStore<Allocation>>,
    fences: Arc<dyn KeyedStore<FenceRecord>>,
    locks: KeyLocks,
    timers: Mutex<HashMap<SubjectId, ArmedTimer>>,
    scheduler: Handle,
    max_duration: Duration,
}

/// Grants temporary custody of resources and releases them when their time
/// runs out.
///
/// A live allocation requested again by its holder is extended in place; a
/// request by anyone else fails with [`AllocationError::AlreadyHeld`].
#[derive(Debug, Clone)]
pub struct TimeBoxedAllocator {
    inner: Arc<Inner>,
}

impl TimeBoxedAllocator {
    pub fn new(
        allocations: Arc<dyn KeyedStore<Allocation>>,
        fences: Arc<dyn KeyedStore<FenceRecord>>,
        config: &AllocatorConfig,
        scheduler: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                allocations,
                fences,
                locks: KeyLocks::with_stripes(config.lock_stripes),
                timers: Mutex::new(HashMap::new()),
                scheduler,
                max_duration: config.max_duration,
            }),
        }
    }

    pub fn from_factory(factory: &StoreFactory, config: &AllocatorConfig, scheduler: Handle) -> Self {
        Self::new(factory.store(), factory.store(), config, scheduler)
    }

    /// Grant `holder` custody of `resource` for `duration`
    pub async fn allocate(
        &self,
        resource: &SubjectId,
        holder: UserId,
        duration: Duration,
    ) -> Result<Allocation> {
        let inner = &self.inner;
        if duration.is_zero() {
            return Err(AllocationError::invalid_duration(duration, "must be positive"));
        }
        if duration > inner.max_duration {
            return Err(AllocationError::invalid_duration(
                duration,
                format!("exceeds maximum of {:?}", inner.max_duration),
            ));
        }
        let lifetime = chrono::Duration::from_std(duration)
            .map_err(|e| AllocationError::invalid_duration(duration, e.to_string()))?;

        let _guard = inner.locks.lock(resource).await;
        let previous = inner.take_timer(resource).await;

        let allocation = match inner.grant(resource, holder, lifetime).await {
            Ok(allocation) => allocation,
            Err(e) => {
                Inner::restore_timer(inner, resource, previous).await;
                return Err(e);
            }
        };
        Inner::arm(
            inner,
            resource,
            allocation.fencing_token,
            allocation.expires_at,
            duration,
        )
        .await;

        info!(
            "Allocated {} to {} until {} (token {})",
            resource, holder, allocation.expires_at, allocation.fencing_token
        );
        Ok(allocation)
    }

    /// Release `resource` now. Returns whether it was allocated.
    pub async fn deallocate(&self, resource: &SubjectId) -> Result<bool> {
        let inner = &self.inner;
        let _guard = inner.locks.lock(resource).await;
        let previous = inner.take_timer(resource).await;
        let released = match inner.allocations.remove(resource.as_str()).await {
            Ok(removed) => removed.is_some(),
            Err(e) => {
                Inner::restore_timer(inner, resource, previous).await;
                return Err(e.into());
            }
        };
        if released {
            info!("Released {}", resource);
        }
        Ok(released)
    }

    /// Release `resource` on behalf of `holder`.
    ///
    /// Fails with [`AllocationError::AlreadyHeld`] while someone else holds
    /// it. Returns whether `holder` held it.
    pub async fn deallocate_if_held(&self, resource: &SubjectId, holder: UserId) -> Result<bool> {
        let inner = &self.inner;
        let _guard = inner.locks.lock(resource).await;
        let previous = inner.take_timer(resource).await;

        match inner.release_held(resource, holder).await {
            Ok(released) => {
                if released {
                    info!("Released {} held by {}", resource, holder);
                }
                Ok(released)
            }
            Err(e) => {
                Inner::restore_timer(inner, resource, previous).await;
                Err(e)
            }
        }
    }

    /// The live allocation of `resource`, if any
    pub async fn get(&self, resource: &SubjectId) -> Result<Option<Allocation>> {
        let now = Utc::now();
        Ok(self
            .inner
            .allocations
            .get(resource.as_str())
            .await?
            .filter(|a| a.is_live_at(now)))
    }

    /// Snapshot of every live allocation
    pub async fn list_active(&self) -> Result<Vec<Allocation>> {
        let now = Utc::now();
        let mut active: Vec<Allocation> = self
            .inner
            .allocations
            .list(&RecordFilter::all())
            .await?
            .into_iter()
            .filter(|a| a.is_live_at(now))
            .collect();
        active.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
        Ok(active)
    }

    /// Schedule release timers for allocations persisted by an earlier run
    /// and release the ones whose time already ran out.
    ///
    /// Returns the number of re-armed allocations.
    pub async fn rearm(&self) -> Result<usize> {
        let inner = &self.inner;
        let persisted = inner.allocations.list(&RecordFilter::all()).await?;
        let mut rearmed = 0;

        for allocation in persisted {
            let resource = &allocation.resource;
            let _guard = inner.locks.lock(resource).await;
            inner.take_timer(resource).await;

            let remaining = (allocation.expires_at - Utc::now()).to_std().ok();
            match remaining {
                Some(delay) if !delay.is_zero() => {
                    Inner::arm(
                        inner,
                        resource,
                        allocation.fencing_token,
                        allocation.expires_at,
                        delay,
                    )
                    .await;
                    rearmed += 1;
                }
                _ => {
                    inner.allocations.remove(resource.as_str()).await?;
                    debug!("Released {} which expired while offline", resource);
                }
            }
        }

        if rearmed > 0 {
            info!("Re-armed {} allocation timers", rearmed);
        }
        Ok(rearmed)
    }

    /// Cancel every pending timer. Allocations stay persisted.
    pub async fn shutdown(&self) {
        let mut timers = self.inner.timers.lock().await;
        for (_, timer) in timers.drain() {
            timer.handle.abort();
        }
    }

    /// Number of armed release timers
    pub async fn pending_timers(&self) -> usize {
        self.inner.timers.lock().await.len()
    }
}

impl Inner {
    async fn next_token(&self, resource: &SubjectId) -> std::result::Result<u64, StorageError> {
        let last = self
            .fences
            .get(resource.as_str())
            .await?
            .map_or(0, |fence| fence.last_token);
        let token = last + 1;
        self.fences
            .upsert(
                resource.as_str(),
                FenceRecord {
                    resource: resource.clone(),
                    last_token: token,
                },
            )
            .await?;
        Ok(token)
    }

    /// Work out and persist the allocation `holder` asked for. Caller holds
    /// the resource lock and has taken its timer.
    async fn grant(
        &self,
        resource: &SubjectId,
        holder: UserId,
        lifetime: chrono::Duration,
    ) -> Result<Allocation> {
        let now = Utc::now();
        let allocation = match self.allocations.get(resource.as_str()).await? {
            Some(current) if current.is_live_at(now) && current.holder != holder => {
                return Err(AllocationError::already_held(
                    resource.clone(),
                    current.holder,
                ));
            }
            Some(current) if current.is_live_at(now) => {
                debug!(
                    "Extending allocation of {} for {} (token {})",
                    resource, holder, current.fencing_token
                );
                Allocation {
                    expires_at: now + lifetime,
                    ..current
                }
            }
            _ => Allocation {
                resource: resource.clone(),
                holder,
                acquired_at: now,
                expires_at: now + lifetime,
                fencing_token: self.next_token(resource).await?,
            },
        };

        self.allocations
            .upsert(resource.as_str(), allocation.clone())
            .await?;
        Ok(allocation)
    }

    /// Remove the allocation unless a live one belongs to someone other
    /// than `holder`. Caller holds the resource lock and has taken its timer.
    async fn release_held(&self, resource: &SubjectId, holder: UserId) -> Result<bool> {
        let Some(current) = self.allocations.get(resource.as_str()).await? else {
            return Ok(false);
        };
        let live = current.is_live_at(Utc::now());
        if live && current.holder != holder {
            return Err(AllocationError::already_held(
                resource.clone(),
                current.holder,
            ));
        }

        self.allocations.remove(resource.as_str()).await?;
        Ok(live)
    }

    /// Stop the release timer of `resource`, returning what it was armed for
    async fn take_timer(&self, resource: &SubjectId) -> Option<ArmedTimer> {
        let timer = self.timers.lock().await.remove(resource)?;
        timer.handle.abort();
        Some(timer)
    }

    /// Re-arm a timer taken by [`Inner::take_timer`] after a failed mutation
    async fn restore_timer(this: &Arc<Inner>, resource: &SubjectId, timer: Option<ArmedTimer>) {
        let Some(timer) = timer else {
            return;
        };
        let delay = (timer.expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        Inner::arm(this, resource, timer.fencing_token, timer.expires_at, delay).await;
    }

    /// Spawn the release timer. Caller holds the resource lock.
    async fn arm(
        this: &Arc<Inner>,
        resource: &SubjectId,
        fencing_token: u64,
        expires_at: DateTime<Utc>,
        delay: Duration,
    ) {
        let weak: Weak<Inner> = Arc::downgrade(this);
        let target = resource.clone();

        let handle = this.scheduler.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Err(e) = inner
                .release_if_current(&target, fencing_token, expires_at)
                .await
            {
                warn!("Failed to release {} on expiry: {}", target, e);
            }
        });

        this.timers.lock().await.insert(
            resource.clone(),
            ArmedTimer {
                handle,
                fencing_token,
                expires_at,
            },
        );
    }

    async fn release_if_current(
        &self,
        resource: &SubjectId,
        fencing_token: u64,
        expires_at: DateTime<Utc>,
    ) -> std::result::Result<bool, StorageError> {
        let _guard = self.locks.lock(resource).await;

        {
            let mut timers = self.timers.lock().await;
            let ours = timers.get(resource).is_some_and(|t| {
                t.fencing_token == fencing_token && t.expires_at == expires_at
            });
            if ours {
                // Dropping the handle detaches it; this task is the timer.
                timers.remove(resource);
            }
        }

        match self.allocations.get(resource.as_str()).await? {
            Some(current)
                if current.fencing_token == fencing_token && current.expires_at == expires_at =>
            {
                self.allocations.remove(resource.as_str()).await?;
                info!("Allocation of {} expired (token {})", resource, fencing_token);
                Ok(true)
            }
            _ => {
                debug!("Stale release timer for {} ignored", resource);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    fn allocator() -> TimeBoxedAllocator {
        TimeBoxedAllocator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryStore::new()),
            &AllocatorConfig::default(),
            Handle::current(),
        )
    }

    /// Sleep on the paused clock; timers due earlier run first
    async fn advance(duration: Duration) {
        tokio::time::sleep(duration).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_allocation_expires() {
        let allocator = allocator();
        let room = SubjectId::from("room-1");
        let holder = UserId::new();

        let allocation = allocator
            .allocate(&room, holder, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(allocation.fencing_token, 1);
        assert_eq!(allocator.list_active().await.unwrap().len(), 1);

        advance(Duration::from_millis(1100)).await;

        assert!(allocator.get(&room).await.unwrap().is_none());
        assert!(allocator.list_active().await.unwrap().is_empty());
        assert_eq!(allocator.pending_timers().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_does_not_release_new_allocation() {
        let allocator = allocator();
        let room = SubjectId::from("room-1");
        let holder = UserId::new();

        allocator
            .allocate(&room, holder, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(allocator.deallocate(&room).await.unwrap());

        let second = allocator
            .allocate(&room, holder, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(second.fencing_token, 2);

        advance(Duration::from_secs(2)).await;
        assert_eq!(allocator.get(&room).await.unwrap(), Some(second));

        advance(Duration::from_secs(4)).await;
        assert!(allocator.get(&room).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_is_fenced() {
        let allocator = allocator();
        let room = SubjectId::from("room-1");
        let holder = UserId::new();

        let first = allocator
            .allocate(&room, holder, Duration::from_secs(1))
            .await
            .unwrap();
        allocator.deallocate(&room).await.unwrap();
        let second = allocator
            .allocate(&room, holder, Duration::from_secs(5))
            .await
            .unwrap();

        // A timer armed for the first allocation that fires anyway
        let released = allocator
            .inner
            .release_if_current(&room, first.fencing_token, first.expires_at)
            .await
            .unwrap();
        assert!(!released);
        assert_eq!(allocator.get(&room).await.unwrap(), Some(second));
        assert_eq!(allocator.pending_timers().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_holder_extends_other_holder_rejected() {
        let allocator = allocator();
        let room = SubjectId::from("room-1");
        let (alice, bob) = (UserId::new(), UserId::new());

        let first = allocator
            .allocate(&room, alice, Duration::from_secs(1))
            .await
            .unwrap();
        let err = allocator
            .allocate(&room, bob, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_already_held());

        let extended = allocator
            .allocate(&room, alice, Duration::from_secs(3))
            .await
            .unwrap();
        assert_eq!(extended.fencing_token, first.fencing_token);
        assert_eq!(extended.acquired_at, first.acquired_at);
        assert_eq!(allocator.pending_timers().await, 1);

        // The first timer was cancelled by the extension
        advance(Duration::from_secs(2)).await;
        assert!(allocator.get(&room).await.unwrap().is_some());

        advance(Duration::from_secs(2)).await;
        assert!(allocator.get(&room).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_request_keeps_holders_timer() {
        let allocator = allocator();
        let room = SubjectId::from("room-1");
        let (alice, bob) = (UserId::new(), UserId::new());

        let held = allocator
            .allocate(&room, alice, Duration::from_secs(2))
            .await
            .unwrap();
        assert!(
            allocator
                .allocate(&room, bob, Duration::from_secs(30))
                .await
                .unwrap_err()
                .is_already_held()
        );
        assert!(
            allocator
                .deallocate_if_held(&room, bob)
                .await
                .unwrap_err()
                .is_already_held()
        );

        assert_eq!(allocator.pending_timers().await, 1);
        assert_eq!(allocator.get(&room).await.unwrap(), Some(held));

        advance(Duration::from_millis(2100)).await;
        assert!(allocator.get(&room).await.unwrap().is_none());
        assert_eq!(allocator.pending_timers().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_release_spares_next_holder() {
        let allocator = allocator();
        let room = SubjectId::from("room-1");
        let (alice, bob) = (UserId::new(), UserId::new());

        allocator
            .allocate(&room, alice, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(allocator.get(&room).await.unwrap().unwrap().holder, alice);

        // Alice's allocation runs out and Bob takes the room before she releases
        advance(Duration::from_millis(1100)).await;
        let bobs = allocator
            .allocate(&room, bob, Duration::from_secs(60))
            .await
            .unwrap();

        let err = allocator.deallocate_if_held(&room, alice).await.unwrap_err();
        assert!(err.is_already_held());
        assert_eq!(allocator.get(&room).await.unwrap(), Some(bobs));
        assert_eq!(allocator.pending_timers().await, 1);

        assert!(allocator.deallocate_if_held(&room, bob).await.unwrap());
        assert!(!allocator.deallocate_if_held(&room, bob).await.unwrap());
        assert_eq!(allocator.pending_timers().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_durations() {
        let allocator = allocator();
        let room = SubjectId::from("room-1");

        assert!(
            allocator
                .allocate(&room, UserId::new(), Duration::ZERO)
                .await
                .unwrap_err()
                .is_invalid_duration()
        );
        let too_long = AllocatorConfig::default().max_duration + Duration::from_secs(1);
        assert!(
            allocator
                .allocate(&room, UserId::new(), too_long)
                .await
                .unwrap_err()
                .is_invalid_duration()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_and_shutdown() {
        let allocations: Arc<dyn KeyedStore<Allocation>> = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let holder = UserId::new();
        for (name, offset) in [("live", 60), ("gone", -60)] {
            let resource = SubjectId::from(name);
            allocations
                .insert(
                    name,
                    Allocation {
                        resource,
                        holder,
                        acquired_at: now - chrono::Duration::seconds(120),
                        expires_at: now + chrono::Duration::seconds(offset),
                        fencing_token: 1,
                    },
                )
                .await
                .unwrap();
        }

        let allocator = TimeBoxedAllocator::new(
            allocations.clone(),
            Arc::new(InMemoryStore::new()),
            &AllocatorConfig::default(),
            Handle::current(),
        );

        assert_eq!(allocator.rearm().await.unwrap(), 1);
        assert!(allocations.get("gone").await.unwrap().is_none());
        assert_eq!(allocator.pending_timers().await, 1);

        allocator.shutdown().await;
        assert_eq!(allocator.pending_timers().await, 0);
        assert!(allocations.get("live").await.unwrap().is_some());
    }
}
