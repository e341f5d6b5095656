#![allow(clippy::unwrap_used)]

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use common::{FakeGateway, Script, Step, page};
use vmevent_core::{CoreError, Forwarder, ForwarderOptions, PushClient, PushMessage};

/// Records every push attempt; the first `failures` attempts are rejected.
#[derive(Default)]
struct RecordingPush {
    attempts: Mutex<Vec<PushMessage>>,
    failures: Mutex<usize>,
}

impl RecordingPush {
    fn failing(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            failures: Mutex::new(failures),
            ..Self::default()
        })
    }

    /// Event keys per attempt, from the `internal_key` metadata.
    fn keys(&self) -> Vec<Vec<i32>> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .map(|msg| {
                msg.streams
                    .iter()
                    .map(|s| s.values[0].metadata[0].1.parse().unwrap())
                    .collect()
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl PushClient for RecordingPush {
    async fn push(&self, message: &PushMessage) -> Result<(), CoreError> {
        self.attempts.lock().unwrap().push(message.clone());
        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(CoreError::Delivery {
                status: 500,
                message: "ingester unavailable".into(),
            });
        }
        Ok(())
    }
}

fn options() -> ForwarderOptions {
    ForwarderOptions {
        service_name: "vmevent-test".into(),
        retry_interval: Duration::from_millis(10),
        start_key: 0,
    }
}

/// Run the forwarder until `push` has seen `attempts` pushes, then cancel.
async fn run_until(
    gateway: Arc<FakeGateway>,
    push: Arc<RecordingPush>,
    attempts: usize,
) -> Forwarder {
    run_with(gateway, push, attempts, options()).await
}

async fn run_with(
    gateway: Arc<FakeGateway>,
    push: Arc<RecordingPush>,
    attempts: usize,
    options: ForwarderOptions,
) -> Forwarder {
    let mut forwarder = Forwarder::new(gateway, push.clone(), options);
    let cancel = CancellationToken::new();
    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            forwarder.run(cancel).await;
            forwarder
        })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while push.len() < attempts {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn restart_resumes_after_last_delivered_key() {
    let gateway = FakeGateway::new(vec![
        Script {
            backlog: vec![page(&[1, 2])],
            steps: vec![Step::Notify(page(&[3, 4])), Step::WaitError],
            ..Script::default()
        },
        Script {
            backlog: vec![page(&[1, 2, 3, 4, 5])],
            steps: vec![Step::Notify(page(&[6]))],
            ..Script::default()
        },
    ]);
    let push = RecordingPush::failing(0);

    let forwarder = run_until(gateway.clone(), push.clone(), 3).await;

    assert_eq!(push.keys(), vec![vec![3, 4], vec![5], vec![6]]);
    assert_eq!(forwarder.last_key(), 6);
    assert_eq!(gateway.count("login"), 2);
    assert_eq!(gateway.count("logout"), 2);
}

#[tokio::test]
async fn start_key_delivers_backlog_after_it() {
    let gateway = FakeGateway::new(vec![Script {
        backlog: vec![page(&[20, 21]), page(&[22, 23])],
        steps: vec![Step::Notify(page(&[24]))],
        ..Script::default()
    }]);
    let push = RecordingPush::failing(0);

    let forwarder = run_with(
        gateway,
        push.clone(),
        2,
        ForwarderOptions {
            start_key: 21,
            ..options()
        },
    )
    .await;

    assert_eq!(push.keys(), vec![vec![22, 23], vec![24]]);
    assert_eq!(forwarder.last_key(), 24);
}

#[tokio::test]
async fn failed_push_is_dropped_and_loop_continues() {
    let gateway = FakeGateway::new(vec![Script {
        steps: vec![Step::Notify(page(&[7])), Step::Notify(page(&[8]))],
        ..Script::default()
    }]);
    let push = RecordingPush::failing(1);

    let forwarder = run_until(gateway.clone(), push.clone(), 2).await;

    assert_eq!(push.keys(), vec![vec![7], vec![8]]);
    assert_eq!(forwarder.last_key(), 8);
    assert_eq!(gateway.count("login"), 1);
}

#[tokio::test]
async fn login_failure_is_retried() {
    let gateway = FakeGateway::new(vec![
        Script {
            fail_login: true,
            ..Script::default()
        },
        Script {
            steps: vec![Step::Notify(page(&[9]))],
            ..Script::default()
        },
    ]);
    let push = RecordingPush::failing(0);

    let forwarder = run_until(gateway.clone(), push.clone(), 1).await;

    assert_eq!(push.keys(), vec![vec![9]]);
    assert_eq!(forwarder.last_key(), 9);
    assert_eq!(gateway.count("login"), 2);
}

#[tokio::test]
async fn pushed_streams_carry_service_label() {
    let gateway = FakeGateway::new(vec![Script {
        steps: vec![Step::Notify(page(&[1]))],
        ..Script::default()
    }]);
    let push = RecordingPush::failing(0);

    run_until(gateway, push.clone(), 1).await;

    let attempts = push.attempts.lock().unwrap();
    let labels = &attempts[0].streams[0].stream;
    assert_eq!(labels["service_name"], "vmevent-test");
    assert_eq!(labels["severity"], "info");
}

#[tokio::test]
async fn cancel_before_start_returns_immediately() {
    let gateway = FakeGateway::new(Vec::new());
    let mut forwarder = Forwarder::new(gateway.clone(), RecordingPush::failing(0), options());
    let cancel = CancellationToken::new();
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(1), forwarder.run(cancel))
        .await
        .unwrap();
    assert_eq!(gateway.count("login"), 0);
    assert_eq!(forwarder.last_key(), 0);
}
