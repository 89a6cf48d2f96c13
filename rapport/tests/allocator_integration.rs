//! Integration tests for time-boxed allocations
//!
//! Runs on a paused tokio clock so expiry can be observed without waiting.

use rapport::prelude::*;
use std::time::Duration;

async fn rapport() -> Rapport {
    Rapport::new(ConfigBuilder::testing().build().unwrap())
        .await
        .unwrap()
}

async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_allocation_is_released_after_its_duration() {
    let rapport = rapport().await;
    let holder = rapport.directory().register("alice").await.unwrap().id;
    let room = SubjectId::from("room-42");

    rapport
        .allocator()
        .allocate(&room, holder, Duration::from_secs(1))
        .await
        .unwrap();

    sleep(Duration::from_millis(500)).await;
    assert!(rapport.allocator().get(&room).await.unwrap().is_some());

    sleep(Duration::from_millis(600)).await;
    assert!(rapport.allocator().get(&room).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_reallocation_survives_stale_timer() {
    let rapport = rapport().await;
    let alice = rapport.directory().register("alice").await.unwrap().id;
    let bob = rapport.directory().register("bob").await.unwrap().id;
    let room = SubjectId::from("room-42");
    let allocator = rapport.allocator();

    let first = allocator
        .allocate(&room, alice, Duration::from_secs(1))
        .await
        .unwrap();
    assert!(allocator.deallocate(&room).await.unwrap());
    assert!(!allocator.deallocate(&room).await.unwrap());

    let second = allocator
        .allocate(&room, bob, Duration::from_secs(10))
        .await
        .unwrap();
    assert!(second.fencing_token > first.fencing_token);

    sleep(Duration::from_secs(2)).await;
    let current = allocator.get(&room).await.unwrap().unwrap();
    assert_eq!(current.holder, bob);
    assert_eq!(allocator.list_active().await.unwrap(), vec![second]);
}

#[tokio::test(start_paused = true)]
async fn test_contested_resource() {
    let rapport = rapport().await;
    let alice = rapport.directory().register("alice").await.unwrap().id;
    let bob = rapport.directory().register("bob").await.unwrap().id;
    let room = SubjectId::from("room-42");

    rapport
        .allocator()
        .allocate(&room, alice, Duration::from_secs(5))
        .await
        .unwrap();

    let err = rapport
        .allocator()
        .allocate(&room, bob, Duration::from_secs(5))
        .await
        .unwrap_err();
    match err {
        AllocationError::AlreadyHeld { holder, .. } => assert_eq!(holder, alice),
        other => panic!("unexpected error: {}", other),
    }

    rapport.shutdown().await;
    assert_eq!(rapport.allocator().pending_timers().await, 0);
}
