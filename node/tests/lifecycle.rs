// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use hdt_node::{Error, Lifecycle, Node, NodeConfig, State};
use parking_lot::Mutex;

type Journal = Arc<Mutex<Vec<String>>>;

struct Service {
    name: &'static str,
    journal: Journal,
    fail_start: bool,
    fail_stop: bool,
}

impl Service {
    fn new(name: &'static str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name,
            journal: journal.clone(),
            fail_start: false,
            fail_stop: false,
        })
    }

    fn failing_start(name: &'static str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name,
            journal: journal.clone(),
            fail_start: true,
            fail_stop: false,
        })
    }

    fn failing_stop(name: &'static str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name,
            journal: journal.clone(),
            fail_start: false,
            fail_stop: true,
        })
    }
}

#[async_trait]
impl Lifecycle for Service {
    async fn start(&self) -> anyhow::Result<()> {
        if self.fail_start {
            anyhow::bail!("{} refused to start", self.name);
        }
        self.journal.lock().push(format!("start {}", self.name));
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.journal.lock().push(format!("stop {}", self.name));
        if self.fail_stop {
            anyhow::bail!("{} refused to stop", self.name);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

fn node() -> Node {
    Node::new(NodeConfig {
        ipc_path: None,
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn start_and_close() {
    let journal = Journal::default();
    let node = node();
    node.register_lifecycle(Service::new("a", &journal));
    node.register_lifecycle(Service::new("b", &journal));

    assert_eq!(node.state(), State::Initializing);
    node.start().await.unwrap();
    assert_eq!(node.state(), State::Running);

    node.close().await.unwrap();
    assert_eq!(node.state(), State::Closed);

    assert_eq!(
        *journal.lock(),
        vec!["start a", "start b", "stop b", "stop a"]
    );
}

#[tokio::test]
async fn second_start_fails() {
    let node = node();
    node.start().await.unwrap();
    assert_matches!(node.start().await, Err(Error::NodeRunning));
    assert_eq!(node.state(), State::Running);
    node.close().await.unwrap();
    assert_matches!(node.start().await, Err(Error::NodeStopped));
}

#[tokio::test]
async fn close_before_start() {
    let journal = Journal::default();
    let node = node();
    node.register_lifecycle(Service::new("a", &journal));

    node.close().await.unwrap();
    assert_eq!(node.state(), State::Closed);
    assert!(journal.lock().is_empty());

    assert_matches!(node.close().await, Err(Error::NodeStopped));
    assert_matches!(node.start().await, Err(Error::NodeStopped));
}

#[tokio::test]
async fn failed_start_unwinds_in_reverse() {
    let journal = Journal::default();
    let node = node();
    node.register_lifecycle(Service::new("a", &journal));
    node.register_lifecycle(Service::new("b", &journal));
    node.register_lifecycle(Service::failing_start("c", &journal));
    node.register_lifecycle(Service::new("d", &journal));

    let err = node.start().await.unwrap_err();
    assert_matches!(err, Error::Lifecycle { name: "c", .. });
    assert_eq!(node.state(), State::Closed);
    assert_eq!(
        *journal.lock(),
        vec!["start a", "start b", "stop b", "stop a"]
    );

    // The node cannot be restarted after a failed start.
    assert_matches!(node.start().await, Err(Error::NodeStopped));
}

#[tokio::test]
async fn stop_errors_are_aggregated() {
    let journal = Journal::default();
    let node = node();
    node.register_lifecycle(Service::failing_stop("a", &journal));
    node.register_lifecycle(Service::new("b", &journal));
    node.register_lifecycle(Service::failing_stop("c", &journal));

    node.start().await.unwrap();
    let err = node.close().await.unwrap_err();
    let Error::Stop(stop) = err else {
        panic!("expected a stop error, got {err}");
    };
    let names: Vec<_> = stop.services.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, vec!["c", "a"]);
    assert_eq!(node.state(), State::Closed);

    // Every service was asked to stop regardless of the failures.
    assert_eq!(journal.lock().len(), 6);
}

#[tokio::test]
#[should_panic(expected = "can't register lifecycle on running/stopped node")]
async fn register_lifecycle_after_start_panics() {
    let node = node();
    node.start().await.unwrap();
    node.register_lifecycle(Service::new("late", &Journal::default()));
}

#[tokio::test]
#[should_panic(expected = "can't register APIs on running/stopped node")]
async fn register_apis_after_close_panics() {
    let node = node();
    node.close().await.unwrap();
    node.register_apis(vec![]);
}

#[test]
#[should_panic(expected = "more than once")]
fn duplicate_lifecycle_panics() {
    let node = node();
    let service = Service::new("a", &Journal::default());
    node.register_lifecycle(service.clone());
    node.register_lifecycle(service);
}

#[tokio::test]
async fn wait_resolves_on_close() {
    let node = Arc::new(node());
    node.start().await.unwrap();

    let waiter = {
        let node = node.clone();
        tokio::spawn(async move { node.wait().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    node.close().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("wait should resolve")
        .unwrap();
}

#[test]
fn invalid_prefix_is_rejected() {
    let mut config = NodeConfig::default();
    config.ipc_path = None;
    config.http.prefix = "rpc".into();
    let err = Node::new(config).err().expect("prefix should be rejected");
    assert_matches!(
        err,
        Error::InvalidPrefix {
            transport: "HTTP",
            ..
        }
    );
}
