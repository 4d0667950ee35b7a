mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use countwatch::sync::{
    ConnectionState, Origin, PushChannel, PushConnector, PushFrame, ReconnectPolicy, Update,
};
use countwatch::SyncError;

use common::{frame, sample, ScriptedConnector};

fn start(
    connector: &Arc<ScriptedConnector>,
    policy: ReconnectPolicy,
) -> (
    mpsc::Receiver<Update>,
    CancellationToken,
    tokio::task::JoinHandle<()>,
) {
    let (tx, rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let handle = PushChannel::new(
        Arc::clone(connector) as Arc<dyn PushConnector>,
        policy,
        tx,
        cancel.clone(),
    )
    .spawn();
    (rx, cancel, handle)
}

async fn expect_state(rx: &mut mpsc::Receiver<Update>, state: ConnectionState) {
    assert_eq!(rx.recv().await, Some(Update::Connection(state)));
}

#[tokio::test(start_paused = true)]
async fn test_reconnects_once_after_delay() {
    let connector = Arc::new(ScriptedConnector::new());
    let first = connector.open();
    let second = connector.open();
    let (mut rx, cancel, handle) = start(&connector, ReconnectPolicy::default());

    expect_state(&mut rx, ConnectionState::Connecting).await;
    expect_state(&mut rx, ConnectionState::Open).await;

    first.send(Ok(frame(0, 3))).unwrap();
    assert_eq!(
        rx.recv().await,
        Some(Update::Sample {
            sample: sample(0, 3),
            origin: Origin::Push
        })
    );

    let closed_at = Instant::now();
    drop(first);

    expect_state(&mut rx, ConnectionState::Closed).await;
    expect_state(&mut rx, ConnectionState::Reconnecting).await;
    expect_state(&mut rx, ConnectionState::Connecting).await;
    expect_state(&mut rx, ConnectionState::Open).await;

    let connects = connector.connects();
    assert_eq!(connects.len(), 2);
    assert!(connects[1] - closed_at >= Duration::from_secs(5));

    second.send(Ok(frame(1, 4))).unwrap();
    assert!(matches!(rx.recv().await, Some(Update::Sample { .. })));

    cancel.cancel();
    expect_state(&mut rx, ConnectionState::Disconnected).await;
    handle.await.unwrap();
    assert!(second.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_close_frame_and_error_both_reconnect() {
    let connector = Arc::new(ScriptedConnector::new());
    let first = connector.open();
    let second = connector.open();
    let _third = connector.open();
    let (mut rx, cancel, _handle) = start(&connector, ReconnectPolicy::default());

    expect_state(&mut rx, ConnectionState::Connecting).await;
    expect_state(&mut rx, ConnectionState::Open).await;

    first.send(Ok(PushFrame::Close)).unwrap();
    expect_state(&mut rx, ConnectionState::Closed).await;
    expect_state(&mut rx, ConnectionState::Reconnecting).await;
    expect_state(&mut rx, ConnectionState::Connecting).await;
    expect_state(&mut rx, ConnectionState::Open).await;
    assert!(first.is_closed());

    second
        .send(Err(SyncError::Transport("reset by peer".to_string())))
        .unwrap();
    expect_state(&mut rx, ConnectionState::Closed).await;
    expect_state(&mut rx, ConnectionState::Reconnecting).await;
    expect_state(&mut rx, ConnectionState::Connecting).await;
    expect_state(&mut rx, ConnectionState::Open).await;

    assert_eq!(connector.connects().len(), 3);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_failed_connects_retry_on_fixed_delay() {
    let connector = Arc::new(ScriptedConnector::new());
    connector.fail(SyncError::Transport("refused".to_string()));
    connector.fail(SyncError::AuthRejected(401));
    let _open = connector.open();
    let (mut rx, cancel, _handle) = start(&connector, ReconnectPolicy::default());

    for _ in 0..2 {
        expect_state(&mut rx, ConnectionState::Connecting).await;
        expect_state(&mut rx, ConnectionState::Closed).await;
        expect_state(&mut rx, ConnectionState::Reconnecting).await;
    }
    expect_state(&mut rx, ConnectionState::Connecting).await;
    expect_state(&mut rx, ConnectionState::Open).await;

    let connects = connector.connects();
    assert_eq!(connects.len(), 3);
    for pair in connects.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(5));
    }
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frame_is_discarded() {
    let connector = Arc::new(ScriptedConnector::new());
    let open = connector.open();
    let (mut rx, cancel, _handle) = start(&connector, ReconnectPolicy::default());

    expect_state(&mut rx, ConnectionState::Connecting).await;
    expect_state(&mut rx, ConnectionState::Open).await;

    open.send(Ok(PushFrame::Text("not json".to_string()))).unwrap();
    open.send(Ok(PushFrame::Text(r#"{"count": -1}"#.to_string()))).unwrap();
    open.send(Ok(PushFrame::Other)).unwrap();
    open.send(Ok(frame(2, 8))).unwrap();

    // The channel stays open and the next thing through is the valid sample.
    assert_eq!(
        rx.recv().await,
        Some(Update::Sample {
            sample: sample(2, 8),
            origin: Origin::Push
        })
    );
    assert_eq!(connector.connects().len(), 1);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_attempt_cap() {
    let connector = Arc::new(ScriptedConnector::new());
    connector.fail(SyncError::Transport("refused".to_string()));
    connector.fail(SyncError::Transport("refused".to_string()));
    let policy = ReconnectPolicy {
        delay: Duration::from_secs(1),
        max_attempts: Some(2),
    };
    let (mut rx, _cancel, handle) = start(&connector, policy);

    expect_state(&mut rx, ConnectionState::Connecting).await;
    expect_state(&mut rx, ConnectionState::Closed).await;
    expect_state(&mut rx, ConnectionState::Reconnecting).await;
    expect_state(&mut rx, ConnectionState::Connecting).await;
    expect_state(&mut rx, ConnectionState::Closed).await;

    handle.await.unwrap();
    assert_eq!(connector.connects().len(), 2);
    // The task ended on its own, so the sender is gone.
    assert_eq!(rx.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_reconnect_delay() {
    let connector = Arc::new(ScriptedConnector::new());
    connector.fail(SyncError::Transport("refused".to_string()));
    let (mut rx, cancel, handle) = start(&connector, ReconnectPolicy::default());

    expect_state(&mut rx, ConnectionState::Connecting).await;
    expect_state(&mut rx, ConnectionState::Closed).await;
    expect_state(&mut rx, ConnectionState::Reconnecting).await;

    cancel.cancel();
    expect_state(&mut rx, ConnectionState::Disconnected).await;
    handle.await.unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.connects().len(), 1);
}
