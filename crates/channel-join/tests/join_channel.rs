//! End-to-end join scenarios against the in-memory network.

use std::sync::Arc;
use std::time::Duration;

use channel_join::{
    ChannelJoinApi, ChannelJoinConfig, InMemoryNetwork, JoinCoordinator, JoinError, ListenerError,
    PeerBehavior, PeerRef, SubmitError,
};
use tokio::time::Instant;

const CHANNEL: &str = "mychannel";
const ORG: &str = "Org1";

fn addr(i: usize) -> String {
    format!("peer{}.org1.example.com:7051", i)
}

fn peers(n: usize) -> Vec<PeerRef> {
    (0..n).map(|i| PeerRef::new(addr(i))).collect()
}

fn network() -> InMemoryNetwork {
    InMemoryNetwork::new().with_member(ORG, "admin")
}

fn coordinator(net: &InMemoryNetwork, timeout_ms: u64) -> JoinCoordinator<InMemoryNetwork> {
    JoinCoordinator::with_timeout(Arc::new(net.clone()), Duration::from_millis(timeout_ms))
}

#[tokio::test(start_paused = true)]
async fn three_peers_confirm() {
    let net = network();
    let outcome = coordinator(&net, 1000)
        .join_channel(&peers(3), CHANNEL, "admin", ORG)
        .await;

    assert!(outcome.success, "{}", outcome.message);
    assert!(outcome.message.contains(ORG));
    assert!(outcome.message.contains(CHANNEL));
    assert!(outcome.error.is_none());
    assert!(outcome.peers.iter().all(|p| p.confirmed()));
    assert_eq!(outcome.cleanup.opened, 3);
    assert_eq!(outcome.cleanup.released, 3);
    assert_eq!(net.subscriptions_released(), 3);
    assert_eq!(net.open_subscriptions(), 0);
}

#[tokio::test(start_paused = true)]
async fn silent_peer_times_out_after_deadline() {
    let net = network().with_peer(&addr(1), PeerBehavior::Silent);
    let start = Instant::now();

    let outcome = coordinator(&net, 1000)
        .join_channel(&peers(3), CHANNEL, "admin", ORG)
        .await;

    let elapsed = start.elapsed();
    assert!(!outcome.success);
    assert!(elapsed >= Duration::from_millis(1000), "returned early: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1100), "returned late: {:?}", elapsed);
    assert_eq!(
        outcome.error,
        Some(JoinError::Listener {
            peer: addr(1),
            source: ListenerError::Timeout { timeout_ms: 1000 },
        })
    );
    assert_eq!(outcome.unconfirmed_peers().len(), 1);
    assert_eq!(net.subscriptions_released(), 3);
    assert_eq!(net.open_subscriptions(), 0);
}

#[tokio::test(start_paused = true)]
async fn submission_failure_still_drains_and_releases() {
    let net = network().failing_submit("connection reset by orderer");

    let outcome = coordinator(&net, 1000)
        .join_channel(&peers(3), CHANNEL, "admin", ORG)
        .await;

    assert!(!outcome.success);
    assert!(matches!(
        outcome.error,
        Some(JoinError::Submit(SubmitError::Transport(_)))
    ));
    assert!(outcome.message.contains("connection reset by orderer"));
    // No peer ever heard of the join, so every listener ran out its deadline.
    assert_eq!(outcome.peers.len(), 3);
    assert!(outcome.peers.iter().all(|p| !p.confirmed()));
    assert_eq!(outcome.cleanup.released, 3);
    assert_eq!(net.open_subscriptions(), 0);
}

#[tokio::test(start_paused = true)]
async fn ignorable_block_then_config_block_confirms() {
    let net = network().with_peer(&addr(0), PeerBehavior::NoiseThenConfirm);

    let outcome = coordinator(&net, 1000)
        .join_channel(&peers(1), CHANNEL, "admin", ORG)
        .await;

    assert!(outcome.success, "{}", outcome.message);
}

#[tokio::test(start_paused = true)]
async fn channel_mismatch_fails_only_that_peer() {
    let net = network().with_peer(&addr(2), PeerBehavior::WrongChannel("otherchannel".to_string()));

    let outcome = coordinator(&net, 1000)
        .join_channel(&peers(3), CHANNEL, "admin", ORG)
        .await;

    assert!(!outcome.success);
    assert!(outcome.peers[0].confirmed());
    assert!(outcome.peers[1].confirmed());
    assert_eq!(
        outcome.peers[2].error,
        Some(ListenerError::ChannelMismatch {
            expected: CHANNEL.to_string(),
            actual: "otherchannel".to_string(),
        })
    );
    assert_eq!(net.subscriptions_released(), 3);
}

#[tokio::test(start_paused = true)]
async fn stream_error_and_closed_stream_fail() {
    let net = network()
        .with_peer(&addr(0), PeerBehavior::StreamError("peer shutting down".to_string()))
        .with_peer(&addr(1), PeerBehavior::CloseStream);

    let outcome = coordinator(&net, 1000)
        .join_channel(&peers(2), CHANNEL, "admin", ORG)
        .await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.peers[0].error,
        Some(ListenerError::StreamError("peer shutting down".to_string()))
    );
    assert!(matches!(
        outcome.peers[1].error,
        Some(ListenerError::StreamError(_))
    ));
    assert_eq!(outcome.cleanup.opened, 2);
    assert!(outcome.cleanup.is_complete());
}

#[tokio::test(start_paused = true)]
async fn rejected_status_fails_join() {
    let net = network().with_status(&addr(1), 500, "ledger already exists");

    let outcome = coordinator(&net, 1000)
        .join_channel(&peers(2), CHANNEL, "admin", ORG)
        .await;

    assert!(!outcome.success);
    assert!(matches!(
        outcome.error,
        Some(JoinError::Submit(SubmitError::Rejected { status: 500, .. }))
    ));
    assert_eq!(net.subscriptions_released(), 2);
}

#[tokio::test(start_paused = true)]
async fn per_peer_deadlines_are_independent() {
    let net = network()
        .with_peer(&addr(0), PeerBehavior::ConfirmAfter(Duration::from_millis(800)))
        .with_peer(&addr(1), PeerBehavior::ConfirmAfter(Duration::from_millis(900)))
        .with_peer(&addr(2), PeerBehavior::Silent);
    let start = Instant::now();

    let outcome = coordinator(&net, 1000)
        .join_channel(&peers(3), CHANNEL, "admin", ORG)
        .await;

    assert!(start.elapsed() < Duration::from_millis(1100));
    assert!(outcome.peers[0].confirmed());
    assert!(outcome.peers[1].confirmed());
    assert!(matches!(
        outcome.peers[2].error,
        Some(ListenerError::Timeout { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn slow_submission_does_not_cost_listeners_their_events() {
    let net = network().with_submit_delay(Duration::from_millis(300));

    let outcome = coordinator(&net, 1000)
        .join_channel(&peers(2), CHANNEL, "admin", ORG)
        .await;

    assert!(outcome.success, "{}", outcome.message);
}

#[tokio::test(start_paused = true)]
async fn release_failure_does_not_mask_success() {
    let net = network().failing_release();

    let outcome = coordinator(&net, 1000)
        .join_channel(&peers(2), CHANNEL, "admin", ORG)
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.cleanup.failed, 2);
    assert_eq!(net.release_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn releases_match_opened_for_every_mix() {
    let behaviors = [
        PeerBehavior::Confirm,
        PeerBehavior::Silent,
        PeerBehavior::WrongChannel("x".to_string()),
        PeerBehavior::StreamError("e".to_string()),
        PeerBehavior::CloseStream,
        PeerBehavior::NoiseThenConfirm,
        PeerBehavior::ConfirmAfter(Duration::from_millis(200)),
    ];

    for n in 1..=behaviors.len() {
        let mut net = network();
        for (i, behavior) in behaviors.iter().take(n).enumerate() {
            net = net.with_peer(&addr(i), behavior.clone());
        }

        let outcome = coordinator(&net, 500)
            .join_channel(&peers(n), CHANNEL, "admin", ORG)
            .await;

        assert_eq!(outcome.success, n == 1);
        assert_eq!(net.subscriptions_opened(), n);
        assert_eq!(net.subscriptions_released(), n);
        assert_eq!(net.release_calls(), n);
        assert_eq!(net.open_subscriptions(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn abandoned_join_releases_subscriptions() {
    let net = network().with_peer(&addr(0), PeerBehavior::Silent);
    let coordinator = coordinator(&net, 10_000);

    let result = tokio::time::timeout(
        Duration::from_millis(200),
        coordinator.join_channel(&peers(2), CHANNEL, "admin", ORG),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(net.subscriptions_opened(), 2);
    assert_eq!(net.subscriptions_released(), 2);
    assert_eq!(net.open_subscriptions(), 0);
}

#[tokio::test(start_paused = true)]
async fn join_from_configuration_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("tls")).unwrap();
    std::fs::write(dir.path().join("tls/ca.crt"), b"-----BEGIN CERTIFICATE-----").unwrap();
    std::fs::write(
        dir.path().join("network.toml"),
        r#"
event_wait_timeout_ms = 750

[organizations.Org1]
admin = "admin"

[organizations.Org1.peers.peer0]
requests = "peer0.org1.example.com:7051"
events = "peer0.org1.example.com:7053"
server-hostname = "peer0.org1.example.com"
tls_cacerts = "tls/ca.crt"

[organizations.Org1.peers.peer1]
requests = "peer1.org1.example.com:7051"
events = "peer1.org1.example.com:7053"
server-hostname = "peer1.org1.example.com"
tls_cacerts = "tls/ca.crt"
"#,
    )
    .unwrap();

    let config = ChannelJoinConfig::load(dir.path().join("network.toml")).unwrap();
    let targets = config.organization_peer_refs(ORG).unwrap();
    let admin = config.organization(ORG).unwrap().admin.clone().unwrap();

    let net = network().with_peer(&addr(1), PeerBehavior::Silent);
    let coordinator = JoinCoordinator::new(Arc::new(net.clone()), &config);
    let start = Instant::now();

    let outcome = coordinator.join_channel(&targets, CHANNEL, &admin, ORG).await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.error,
        Some(JoinError::Listener {
            peer: addr(1),
            source: ListenerError::Timeout { timeout_ms: 750 },
        })
    );
    assert!(start.elapsed() >= Duration::from_millis(750));
    assert_eq!(net.submissions(), vec![vec![addr(0), addr(1)]]);
}
