//! End-to-end tests: real router on an ephemeral port, driven by the real
//! polling client.

use std::sync::Arc;

use taskboard::api::{router, AppState};
use taskboard::client::{ApiClient, Session};
use taskboard::config::Config;
use taskboard::lifecycle::TaskAction;
use taskboard::store::{MemoryTaskStore, TaskStore};
use taskboard::task::TaskStatus;

async fn spawn_server(store: Arc<dyn TaskStore>) -> String {
    let state = Arc::new(AppState {
        config: Config::new("127.0.0.1".to_string(), 0),
        store,
    });
    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{}", addr)
}

async fn seeded_server(titles: &[&str]) -> (String, Arc<dyn TaskStore>) {
    let store: Arc<dyn TaskStore> = Arc::new(MemoryTaskStore::new());
    for title in titles {
        store.create_task(title).await.expect("seed task");
    }
    let base_url = spawn_server(Arc::clone(&store)).await;
    (base_url, store)
}

#[tokio::test]
async fn keep_start_stop_converges_through_the_session() {
    let (base_url, _store) = seeded_server(&["Write report", "File expenses"]).await;
    let api = ApiClient::new(&base_url).expect("client");

    let alice = Session::start(api.clone(), "alice");

    // Scenario A: keep -> KEPT, owner alice, no start time.
    let kept = alice.act(TaskAction::Keep, 1).await.expect("keep");
    assert_eq!(kept.status, TaskStatus::Kept);
    assert_eq!(kept.owner.as_deref(), Some("alice"));
    assert!(kept.start_time.is_none());

    // The forced post-action refetch already ran: the snapshot shows the
    // task moved from the queue to "mine".
    let snapshot = alice.snapshots().borrow().clone();
    assert_eq!(snapshot.queue.len(), 1);
    assert_eq!(snapshot.queue[0].id, 2);
    assert_eq!(snapshot.mine.len(), 1);
    assert_eq!(snapshot.mine[0].id, 1);

    // Scenario B: bob cannot start alice's task; alice can.
    let bob = Session::start(api.clone(), "bob");
    let err = bob.act(TaskAction::Start, 1).await.expect_err("not bob's");
    assert!(err.is_not_owner());

    let running = alice.act(TaskAction::Start, 1).await.expect("start");
    assert_eq!(running.status, TaskStatus::Running);
    assert!(running.start_time.is_some());

    // Scenario C: stop completes with ordered timestamps.
    let done = alice.act(TaskAction::Stop, 1).await.expect("stop");
    assert_eq!(done.status, TaskStatus::Completed);
    assert!(done.stop_time.expect("stop time") >= done.start_time.expect("start time"));

    // Bob's failed action still triggered a refetch; his board never
    // pretended the action succeeded.
    let bob_snapshot = bob.snapshots().borrow().clone();
    assert!(bob_snapshot.mine.is_empty());

    alice.shutdown().await;
    bob.shutdown().await;
}

#[tokio::test]
async fn concurrent_claims_over_http_have_one_winner() {
    let (base_url, store) = seeded_server(&["contended"]).await;

    let mut handles = Vec::new();
    for user in ["alice", "bob"] {
        let api = ApiClient::new(&base_url).expect("client");
        handles.push(tokio::spawn(async move {
            api.transition(TaskAction::ClaimAndStart, 1, user)
                .await
                .map(|resp| (user, resp.task))
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.expect("join") {
            Ok((user, task)) => {
                assert_eq!(task.status, TaskStatus::Running);
                winners.push(user);
            }
            Err(e) => assert!(e.is_not_queued(), "loser should see not_queued, got {}", e),
        }
    }
    assert_eq!(winners.len(), 1, "exactly one claim must succeed");

    // Scenario D: the loser's view does not include the task.
    let loser = if winners[0] == "alice" { "bob" } else { "alice" };
    let api = ApiClient::new(&base_url).expect("client");
    assert!(api.fetch_my_tasks(loser).await.expect("my_tasks").is_empty());

    let stored = store.get_task(1).await.expect("get").expect("exists");
    assert_eq!(stored.owner.as_deref(), Some(winners[0]));
}

#[tokio::test]
async fn error_bodies_carry_the_taxonomy() {
    let (base_url, _store) = seeded_server(&["only task"]).await;
    let api = ApiClient::new(&base_url).expect("client");

    // Unknown id.
    let err = api
        .transition(TaskAction::Keep, 999, "alice")
        .await
        .expect_err("unknown id");
    match err {
        taskboard::client::ClientError::Rejected { code, .. } => {
            assert_eq!(code, "task_not_found")
        }
        other => panic!("expected rejection, got {}", other),
    }

    // Blank username.
    let err = api
        .transition(TaskAction::Keep, 1, "   ")
        .await
        .expect_err("blank username");
    match err {
        taskboard::client::ClientError::Rejected { code, .. } => assert_eq!(code, "bad_request"),
        other => panic!("expected rejection, got {}", other),
    }

    // Lost precondition.
    api.transition(TaskAction::Keep, 1, "alice")
        .await
        .expect("first keep");
    let err = api
        .transition(TaskAction::Keep, 1, "bob")
        .await
        .expect_err("already kept");
    assert!(err.is_not_queued());

    // Wrong state for the owner.
    let err = api
        .transition(TaskAction::Stop, 1, "alice")
        .await
        .expect_err("stop before start");
    assert!(err.is_invalid_state());
}

#[tokio::test]
async fn queue_reads_are_idempotent_over_http() {
    let (base_url, _store) = seeded_server(&["a", "b", "c"]).await;
    let api = ApiClient::new(&base_url).expect("client");

    let first = api.fetch_queue().await.expect("first read");
    let second = api.fetch_queue().await.expect("second read");
    assert_eq!(first, second);
    let ids: Vec<i64> = first.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn shutdown_ends_polling() {
    let (base_url, _store) = seeded_server(&["task"]).await;
    let api = ApiClient::new(&base_url).expect("client");

    let session = Session::start(api, "alice");
    let mut snapshots = session.snapshots();

    // Wait for the immediate first fetch so we know the loop ran.
    snapshots.changed().await.expect("initial snapshot");
    assert_eq!(snapshots.borrow().queue.len(), 1);

    // shutdown() awaits the poll task's exit; the snapshot channel closes
    // with it, so no further fetch can ever land.
    session.shutdown().await;
    assert!(snapshots.changed().await.is_err(), "poll loop must be gone");
}

#[tokio::test]
async fn health_reports_store_backend_and_persistence() {
    let (base_url, _store) = seeded_server(&[]).await;
    let api = ApiClient::new(&base_url).expect("client");
    let health = api.health().await.expect("health");
    assert_eq!(health.status, "ok");
    assert_eq!(health.store_backend, "memory");
    assert!(!health.persistent_store);
}
