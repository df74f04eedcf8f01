//! End-to-end client integration tests
//!
//! These tests drive the full client against a mock HTTP server: list
//! pagination, read-state mutations, the notification stream fallback, and
//! the connection lifecycle. Pub/sub is exercised only through its failure
//! path, so no broker is required.

use std::time::Duration;

use serde_json::json;
use tokio::sync::watch;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ara_notification_client::client::NotificationClient;
use ara_notification_client::config::{ApiConfig, PubSubConfig, ReconnectConfig, Settings};
use ara_notification_client::connection::ConnectionPhase;
use ara_notification_client::error::ClientError;

/// Create a client wired to a fresh mock server
async fn create_test_environment(configure: impl FnOnce(&mut Settings)) -> TestEnvironment {
    let server = MockServer::start().await;

    let mut settings = Settings {
        api: ApiConfig {
            url: server.uri(),
            token: None,
            timeout_seconds: 5,
        },
        pubsub: PubSubConfig {
            url: "redis://127.0.0.1:1".to_string(),
            channels: vec![],
            handshake_timeout_seconds: 2,
        },
        reconnect: ReconnectConfig {
            max_attempts: 3,
            window_seconds: 240,
            // Freeze after the first close so mocks see exactly one stream
            retry_delay_seconds: 60,
        },
        ..Settings::default()
    };
    configure(&mut settings);

    let client = NotificationClient::new(settings).expect("failed to build client");
    TestEnvironment { server, client }
}

struct TestEnvironment {
    server: MockServer,
    client: NotificationClient,
}

fn item_json(token: &str, read: bool) -> serde_json::Value {
    json!({
        "token": token,
        "title": "Invitation",
        "message": "You were invited",
        "event": "invite.created",
        "created": "2024-05-01T12:00:00Z",
        "read": read,
        "expired": false
    })
}

fn stream_frame(token: &str) -> String {
    format!(
        "event: notification\ndata: {}\n",
        item_json(token, false)
    )
}

async fn await_phase(rx: &mut watch::Receiver<ConnectionPhase>, wanted: ConnectionPhase) {
    let wait = async {
        loop {
            rx.changed().await.expect("phase channel closed");
            if *rx.borrow_and_update() == wanted {
                return;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {:?}", wanted));
}

async fn await_store_len(client: &NotificationClient, wanted: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if client.snapshot().await.items.len() == wanted {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {} stored notifications",
            wanted
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

// =============================================================================
// Stream Delivery Tests
// =============================================================================

mod stream_delivery_tests {
    use super::*;

    #[tokio::test]
    async fn test_pushes_flow_from_stream_to_store() {
        let env = create_test_environment(|_| {}).await;

        let body = format!(
            "{}{}{}",
            stream_frame("t1"),
            stream_frame("t2"),
            stream_frame("t3")
        );
        Mock::given(method("GET"))
            .and(path("/notifications/stream/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .expect(1)
            .mount(&env.server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/notifications/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .mount(&env.server)
            .await;

        let mut pushes = env.client.subscribe_pushes();
        env.client.connect().await.unwrap();
        await_store_len(&env.client, 3).await;

        // Newest push sits first, and each push bumped both counters
        let snapshot = env.client.snapshot().await;
        assert_eq!(snapshot.items[0].token, "t3");
        assert_eq!(snapshot.extra.unread_count, 3);
        assert_eq!(snapshot.extra.count, 3);

        // Subscribers observe the same pushes in arrival order
        for expected in ["t1", "t2", "t3"] {
            let item = pushes.recv().await.unwrap();
            assert_eq!(item.token, expected);
        }

        // Marking one read retires it; repeating is a no-op
        assert!(env.client.mark_read("t2").await.unwrap());
        assert_eq!(env.client.unread_count().await, 2);
        assert!(!env.client.mark_read("t2").await.unwrap());
        assert_eq!(env.client.unread_count().await, 2);

        // Mark-all zeroes unread but keeps the total
        env.client.mark_all_read().await.unwrap();
        let snapshot = env.client.snapshot().await;
        assert_eq!(snapshot.extra.unread_count, 0);
        assert_eq!(snapshot.extra.count, 3);

        env.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_single_push_after_empty_fetch() {
        let env = create_test_environment(|_| {}).await;

        Mock::given(method("GET"))
            .and(path("/notifications/"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [],
                "unread_count": 0,
                "count": 0
            })))
            .mount(&env.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/notifications/stream/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(stream_frame("t1"), "text/event-stream"),
            )
            .mount(&env.server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/notifications/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .mount(&env.server)
            .await;

        let snapshot = env.client.refresh().await.unwrap();
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.extra.count, 0);

        env.client.connect().await.unwrap();
        await_store_len(&env.client, 1).await;

        let snapshot = env.client.snapshot().await;
        assert_eq!(snapshot.items[0].token, "t1");
        assert_eq!(snapshot.extra.unread_count, 1);
        assert_eq!(snapshot.extra.count, 1);

        // Reading the only item clears unread without shrinking the list
        assert!(env.client.mark_read("t1").await.unwrap());
        let snapshot = env.client.snapshot().await;
        assert_eq!(snapshot.extra.unread_count, 0);
        assert_eq!(snapshot.extra.count, 1);

        env.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_stream_payload_is_skipped() {
        let env = create_test_environment(|_| {}).await;

        let body = format!(
            "event: notification\ndata: {{not json\n{}",
            stream_frame("good")
        );
        Mock::given(method("GET"))
            .and(path("/notifications/stream/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&env.server)
            .await;

        env.client.connect().await.unwrap();
        await_store_len(&env.client, 1).await;

        let snapshot = env.client.snapshot().await;
        assert_eq!(snapshot.items[0].token, "good");

        env.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_non_notification_events_are_not_stored() {
        let env = create_test_environment(|_| {}).await;

        let body = format!(
            "event: heartbeat\ndata: {{\"ts\": 1}}\n{}",
            stream_frame("n1")
        );
        Mock::given(method("GET"))
            .and(path("/notifications/stream/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&env.server)
            .await;

        env.client.connect().await.unwrap();
        await_store_len(&env.client, 1).await;
        assert_eq!(env.client.unread_count().await, 1);

        env.client.shutdown().await;
    }
}

// =============================================================================
// Transport Fallback Tests
// =============================================================================

mod fallback_tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_pubsub_opens_exactly_one_stream() {
        let env = create_test_environment(|settings| {
            settings.pubsub.channels = vec!["notifications".to_string()];
        })
        .await;

        // Hold the response open so the stream stays connected
        Mock::given(method("GET"))
            .and(path("/notifications/stream/"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(60)))
            .expect(1)
            .mount(&env.server)
            .await;

        let mut phases = env.client.watch_phase();
        phases.borrow_and_update();
        env.client.connect().await.unwrap();

        await_phase(&mut phases, ConnectionPhase::ConnectedStream).await;
        assert_eq!(env.client.phase(), ConnectionPhase::ConnectedStream);

        env.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_disabled_pubsub_skips_straight_to_stream() {
        let env = create_test_environment(|settings| {
            settings.pubsub.channels = vec![];
        })
        .await;

        Mock::given(method("GET"))
            .and(path("/notifications/stream/"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(60)))
            .expect(1)
            .mount(&env.server)
            .await;

        let mut phases = env.client.watch_phase();
        phases.borrow_and_update();
        env.client.connect().await.unwrap();

        await_phase(&mut phases, ConnectionPhase::ConnectedStream).await;

        env.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_disconnect_returns_to_idle() {
        let env = create_test_environment(|_| {}).await;

        Mock::given(method("GET"))
            .and(path("/notifications/stream/"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(60)))
            .mount(&env.server)
            .await;

        let mut phases = env.client.watch_phase();
        phases.borrow_and_update();
        env.client.connect().await.unwrap();
        await_phase(&mut phases, ConnectionPhase::ConnectedStream).await;

        env.client.disconnect().await.unwrap();
        await_phase(&mut phases, ConnectionPhase::Idle).await;

        env.client.shutdown().await;
    }
}

// =============================================================================
// REST List Tests
// =============================================================================

mod list_tests {
    use super::*;

    #[tokio::test]
    async fn test_refresh_replaces_and_load_more_appends() {
        let env = create_test_environment(|_| {}).await;

        Mock::given(method("GET"))
            .and(path("/notifications/"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [item_json("t1", false), item_json("t2", true)],
                "unread_count": 1,
                "count": 4
            })))
            .mount(&env.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/notifications/"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [item_json("t3", true), item_json("t4", true)],
                "unread_count": 1,
                "count": 4
            })))
            .mount(&env.server)
            .await;

        let snapshot = env.client.refresh().await.unwrap();
        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.extra.unread_count, 1);
        assert_eq!(snapshot.extra.count, 4);

        let added = env.client.load_more().await.unwrap();
        assert_eq!(added, 2);

        let snapshot = env.client.snapshot().await;
        let tokens: Vec<&str> = snapshot.items.iter().map(|i| i.token.as_str()).collect();
        assert_eq!(tokens, vec!["t1", "t2", "t3", "t4"]);

        // A later refresh resets local state to page one
        let snapshot = env.client.refresh().await.unwrap();
        assert_eq!(snapshot.items.len(), 2);

        env.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_mark_all_read_zeroes_unread_and_keeps_count() {
        let env = create_test_environment(|_| {}).await;

        Mock::given(method("GET"))
            .and(path("/notifications/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [item_json("t1", false), item_json("t2", false), item_json("t3", true)],
                "unread_count": 2,
                "count": 3
            })))
            .mount(&env.server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/notifications/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&env.server)
            .await;

        env.client.refresh().await.unwrap();
        assert_eq!(env.client.unread_count().await, 2);

        env.client.mark_all_read().await.unwrap();

        let snapshot = env.client.snapshot().await;
        assert_eq!(snapshot.extra.unread_count, 0);
        assert_eq!(snapshot.extra.count, 3);
        assert!(snapshot.items.iter().all(|item| item.read));

        env.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_server_error_propagates_from_refresh() {
        let env = create_test_environment(|_| {}).await;

        Mock::given(method("GET"))
            .and(path("/notifications/"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&env.server)
            .await;

        let err = env.client.refresh().await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 503, .. }));
        assert!(env.client.snapshot().await.items.is_empty());

        env.client.shutdown().await;
    }
}
