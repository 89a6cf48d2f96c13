//! Integration tests for the friendship workflow
//!
//! Exercises the engine through the `Rapport` facade, including the
//! concurrent paths where two answers race for the same request.

use rapport::prelude::*;
use std::sync::Arc;

async fn rapport_with(policy: ReverseRequestPolicy) -> Rapport {
    let config = ConfigBuilder::testing()
        .with_reverse_request_policy(policy)
        .build()
        .expect("Failed to build test config");
    Rapport::new(config)
        .await
        .expect("Failed to initialize Rapport")
}

async fn users(rapport: &Rapport, names: &[&str]) -> Vec<UserId> {
    let mut ids = Vec::new();
    for name in names {
        let profile = rapport
            .directory()
            .register(name)
            .await
            .expect("Failed to register user");
        ids.push(profile.id);
    }
    ids
}

#[tokio::test]
async fn test_request_accept_remove_cycle() {
    let rapport = rapport_with(ReverseRequestPolicy::Reject).await;
    let ids = users(&rapport, &["alice", "bob"]).await;
    let (alice, bob) = (ids[0], ids[1]);
    let engine = rapport.friendships();

    engine.send_request(alice, bob).await.unwrap();
    assert_eq!(
        engine.relationship_status(alice, bob).await.unwrap(),
        RelationshipStatus::RequestSent
    );

    let friendship = engine.accept_request(alice, bob).await.unwrap();
    assert!(friendship.user_a < friendship.user_b);
    assert_eq!(
        engine.relationship_status(bob, alice).await.unwrap(),
        RelationshipStatus::Friends
    );

    // Friends can be removed and re-requested
    assert!(engine.remove_friend(alice, bob).await.unwrap());
    assert!(!engine.remove_friend(alice, bob).await.unwrap());
    engine.send_request(bob, alice).await.unwrap();
    assert_eq!(engine.get_requests(alice).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_error_paths_leave_state_unchanged() {
    let rapport = rapport_with(ReverseRequestPolicy::Reject).await;
    let ids = users(&rapport, &["alice", "bob", "carol"]).await;
    let (alice, bob, carol) = (ids[0], ids[1], ids[2]);
    let engine = rapport.friendships();

    assert!(
        engine
            .send_request(alice, alice)
            .await
            .unwrap_err()
            .is_invalid_request()
    );
    assert!(
        engine
            .reject_request(carol, alice)
            .await
            .unwrap_err()
            .is_request_not_found()
    );

    engine.send_request(alice, bob).await.unwrap();
    let before = engine.get_requests(bob).await.unwrap();

    assert!(engine.send_request(alice, bob).await.is_err());
    assert!(engine.send_request(bob, alice).await.is_err());

    assert_eq!(engine.get_requests(bob).await.unwrap(), before);
    assert!(engine.get_requests(alice).await.unwrap().is_empty());
    assert!(engine.get_friends(bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_auto_accept_policy() {
    let rapport = rapport_with(ReverseRequestPolicy::AutoAccept).await;
    let ids = users(&rapport, &["alice", "bob"]).await;
    let (alice, bob) = (ids[0], ids[1]);
    let engine = rapport.friendships();

    engine.send_request(alice, bob).await.unwrap();
    match engine.send_request(bob, alice).await.unwrap() {
        SendOutcome::Accepted(friendship) => assert!(friendship.other(alice) == Some(bob)),
        other => panic!("expected auto-accept, got {:?}", other),
    }
    assert!(engine.get_sent_requests(alice).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accept_and_reject_has_one_winner() {
    for _ in 0..25 {
        let rapport = Arc::new(rapport_with(ReverseRequestPolicy::Reject).await);
        let ids = users(&rapport, &["alice", "bob"]).await;
        let (alice, bob) = (ids[0], ids[1]);
        rapport.friendships().send_request(alice, bob).await.unwrap();

        let accepting = {
            let rapport = rapport.clone();
            tokio::spawn(async move { rapport.friendships().accept_request(alice, bob).await })
        };
        let rejecting = {
            let rapport = rapport.clone();
            tokio::spawn(async move { rapport.friendships().reject_request(alice, bob).await })
        };

        let accepted = accepting.await.unwrap();
        let rejected = rejecting.await.unwrap();

        assert!(
            accepted.is_ok() ^ rejected.is_ok(),
            "exactly one answer must succeed"
        );
        if let Err(e) = &accepted {
            assert!(e.is_request_not_found());
        }
        if let Err(e) = &rejected {
            assert!(e.is_request_not_found());
        }

        let friends = rapport.friendships().are_friends(alice, bob).await.unwrap();
        assert_eq!(friends, accepted.is_ok());
        assert!(rapport.friendships().get_requests(bob).await.unwrap().is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_crossing_requests_never_both_pending() {
    for _ in 0..25 {
        let rapport = Arc::new(rapport_with(ReverseRequestPolicy::Reject).await);
        let ids = users(&rapport, &["alice", "bob"]).await;
        let (alice, bob) = (ids[0], ids[1]);

        let forward = {
            let rapport = rapport.clone();
            tokio::spawn(async move { rapport.friendships().send_request(alice, bob).await })
        };
        let backward = {
            let rapport = rapport.clone();
            tokio::spawn(async move { rapport.friendships().send_request(bob, alice).await })
        };

        let forward = forward.await.unwrap();
        let backward = backward.await.unwrap();
        assert!(forward.is_ok() ^ backward.is_ok());

        let pending = rapport.friendships().get_requests(alice).await.unwrap().len()
            + rapport.friendships().get_requests(bob).await.unwrap().len();
        assert_eq!(pending, 1);
    }
}
