// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Multi-transport JSON-RPC host.
//!
//! A [`Node`] owns a table of registered namespaces ([`Api`]) and
//! [`Lifecycle`] services. Starting it opens every configured transport,
//! mounts a snapshot of the namespace table on each of them and starts the
//! services in registration order. Closing it tears everything down in
//! reverse.

pub mod api;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod jwt;
pub mod middleware;

use std::sync::Arc;

use async_trait::async_trait;
use jsonrpsee::Methods;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub use api::Api;
pub use config::NodeConfig;
pub use endpoint::{Endpoint, InProcClient};
pub use error::{Error, StopError};

use endpoint::{HttpEndpoint, InProcEndpoint, InProcHandler, IpcEndpoint};
use jwt::JwtSecret;

/// A service whose lifetime is bound to the node's.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Called once, after every endpoint is open.
    async fn start(&self) -> anyhow::Result<()>;

    /// Called once when the node closes, or when a later service failed to
    /// start.
    async fn stop(&self) -> anyhow::Result<()>;

    /// Returns service name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Node state. Transitions are monotonic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Initializing,
    Running,
    Closed,
}

#[derive(Default)]
struct Addrs {
    http: Option<String>,
    ws: Option<String>,
    auth: Option<String>,
    ipc: Option<String>,
}

struct Inner {
    state: State,
    lifecycles: Vec<Arc<dyn Lifecycle>>,
    apis: Vec<Api>,
    addrs: Addrs,
}

pub struct Node {
    config: NodeConfig,
    /// Serializes `start` and `close`, and owns the open endpoints.
    endpoints: tokio::sync::Mutex<Vec<Box<dyn Endpoint>>>,
    inner: parking_lot::Mutex<Inner>,
    inproc: InProcHandler,
    stopped: CancellationToken,
}

impl Node {
    pub fn new(config: NodeConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config,
            endpoints: tokio::sync::Mutex::new(vec![]),
            inner: parking_lot::Mutex::new(Inner {
                state: State::Initializing,
                lifecycles: vec![],
                apis: vec![],
                addrs: Addrs::default(),
            }),
            inproc: InProcHandler::default(),
            stopped: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn state(&self) -> State {
        self.inner.lock().state
    }

    /// Registers namespaces to be served once the node starts.
    ///
    /// # Panics
    ///
    /// Panics if the node was already started.
    pub fn register_apis(&self, apis: impl IntoIterator<Item = Api>) {
        let mut inner = self.inner.lock();
        if inner.state != State::Initializing {
            panic!("can't register APIs on running/stopped node");
        }
        inner.apis.extend(apis);
    }

    /// Registers a service started and stopped with the node.
    ///
    /// # Panics
    ///
    /// Panics if the node was already started or if the same instance is
    /// registered twice.
    pub fn register_lifecycle(&self, lifecycle: Arc<dyn Lifecycle>) {
        let mut inner = self.inner.lock();
        if inner.state != State::Initializing {
            panic!("can't register lifecycle on running/stopped node");
        }
        let ptr = Arc::as_ptr(&lifecycle) as *const ();
        if inner
            .lifecycles
            .iter()
            .any(|l| Arc::as_ptr(l) as *const () == ptr)
        {
            panic!(
                "attempt to register lifecycle {} more than once",
                lifecycle.name()
            );
        }
        inner.lifecycles.push(lifecycle);
    }

    /// Opens the configured endpoints and starts every registered service.
    ///
    /// On failure everything opened so far is torn down and the node is
    /// left closed.
    pub async fn start(&self) -> Result<(), Error> {
        let mut endpoints = self.endpoints.lock().await;

        let (lifecycles, apis) = {
            let mut inner = self.inner.lock();
            match inner.state {
                State::Running => return Err(Error::NodeRunning),
                State::Closed => return Err(Error::NodeStopped),
                State::Initializing => {}
            }
            inner.state = State::Running;
            (inner.lifecycles.clone(), inner.apis.clone())
        };

        info!(event = "starting node", config = %self.config);

        if let Err(e) = self.open_endpoints(&mut endpoints, &apis).await {
            error!(event = "failed to open endpoints", error = %e);
            close_endpoints(&mut endpoints).await;
            self.do_close();
            return Err(e);
        }

        let mut started: Vec<Arc<dyn Lifecycle>> = vec![];
        for lifecycle in lifecycles {
            if let Err(source) = lifecycle.start().await {
                let err = Error::Lifecycle {
                    name: lifecycle.name(),
                    source,
                };
                error!(event = "failed to start node", error = %err);
                close_endpoints(&mut endpoints).await;
                let failures = stop_lifecycles(&started).await;
                if !failures.is_empty() {
                    warn!(event = "unwinding services failed", error = %failures);
                }
                self.do_close();
                return Err(err);
            }
            info!(event = "service started", name = lifecycle.name());
            started.push(lifecycle);
        }

        info!(event = "node started");
        Ok(())
    }

    /// Stops every service in reverse registration order, then closes the
    /// endpoints. Closing a node that was never started only releases it.
    pub async fn close(&self) -> Result<(), Error> {
        let mut endpoints = self.endpoints.lock().await;

        let (state, lifecycles) = {
            let inner = self.inner.lock();
            (inner.state, inner.lifecycles.clone())
        };

        match state {
            State::Closed => Err(Error::NodeStopped),
            State::Initializing => {
                self.do_close();
                Ok(())
            }
            State::Running => {
                info!(event = "stopping node");
                let failures = stop_lifecycles(&lifecycles).await;
                close_endpoints(&mut endpoints).await;
                self.do_close();
                if failures.is_empty() {
                    info!(event = "node stopped");
                    Ok(())
                } else {
                    Err(failures.into())
                }
            }
        }
    }

    /// Resolves once the node is closed.
    pub async fn wait(&self) {
        self.stopped.cancelled().await
    }

    /// `http://` address of the HTTP endpoint, if open.
    pub fn http_endpoint(&self) -> Option<String> {
        self.inner.lock().addrs.http.clone()
    }

    /// `ws://` address of the WebSocket endpoint, if open. This is the HTTP
    /// address when both share a port.
    pub fn ws_endpoint(&self) -> Option<String> {
        self.inner.lock().addrs.ws.clone()
    }

    /// `http://` address of the authenticated endpoint, if open.
    pub fn auth_endpoint(&self) -> Option<String> {
        self.inner.lock().addrs.auth.clone()
    }

    /// Path of the local socket, if open.
    pub fn ipc_endpoint(&self) -> Option<String> {
        self.inner.lock().addrs.ipc.clone()
    }

    /// Client for in-process calls.
    pub fn attach(&self) -> Result<InProcClient, Error> {
        if self.state() == State::Closed {
            return Err(Error::NodeStopped);
        }
        Ok(InProcClient::new(self.inproc.clone()))
    }

    /// Method table served in-process.
    pub fn rpc_handler(&self) -> Result<Methods, Error> {
        if self.state() == State::Closed {
            return Err(Error::NodeStopped);
        }
        self.inproc.methods().ok_or(Error::InProcUnavailable)
    }

    async fn open_endpoints(
        &self,
        endpoints: &mut Vec<Box<dyn Endpoint>>,
        apis: &[Api],
    ) -> Result<(), Error> {
        let config = &self.config;
        let limits = config.limits;

        let inproc = InProcEndpoint::new(self.inproc.clone());
        open(endpoints, Box::new(inproc), api::all_methods(apis)?).await?;

        if let Some(path) = config.ipc_endpoint() {
            let ipc = IpcEndpoint::new(path);
            let addr =
                open(endpoints, Box::new(ipc), api::all_methods(apis)?).await?;
            self.inner.lock().addrs.ipc = addr;
        }

        let ws_on_http = config.ws_on_http();
        if let Some(host) = &config.http.host {
            let ws = ws_on_http.then_some(&config.ws);
            let http = HttpEndpoint::http(host, &config.http, ws, limits);
            let methods =
                api::open_methods("HTTP", apis, &config.http.modules)?;
            let addr = open(endpoints, Box::new(http), methods).await?;
            let mut inner = self.inner.lock();
            inner.addrs.http = addr.as_ref().map(|a| format!("http://{a}"));
            if ws_on_http {
                inner.addrs.ws = addr.map(|a| format!("ws://{a}"));
            }
        }

        if let (Some(host), false) = (&config.ws.host, ws_on_http) {
            let ws = HttpEndpoint::ws(host, &config.ws, limits);
            let methods =
                api::open_methods("WebSocket", apis, &config.ws.modules)?;
            let addr = open(endpoints, Box::new(ws), methods).await?;
            self.inner.lock().addrs.ws = addr.map(|a| format!("ws://{a}"));
        }

        if let Some(host) = &config.auth.host {
            let secret = JwtSecret::load_or_create(self.jwt_secret_path())?;
            let auth = HttpEndpoint::auth(host, &config.auth, secret, limits);
            let addr =
                open(endpoints, Box::new(auth), api::all_methods(apis)?)
                    .await?;
            self.inner.lock().addrs.auth =
                addr.map(|a| format!("http://{a}"));
        }

        Ok(())
    }

    fn jwt_secret_path(&self) -> Option<&std::path::Path> {
        self.config.auth.jwt_secret.as_deref()
    }

    fn do_close(&self) {
        {
            let mut inner = self.inner.lock();
            inner.state = State::Closed;
            inner.addrs = Addrs::default();
        }
        self.stopped.cancel();
    }
}

async fn open(
    endpoints: &mut Vec<Box<dyn Endpoint>>,
    mut endpoint: Box<dyn Endpoint>,
    methods: Methods,
) -> Result<Option<String>, Error> {
    endpoint.start(methods).await?;
    let addr = endpoint.listen_addr();
    endpoints.push(endpoint);
    Ok(addr)
}

async fn close_endpoints(endpoints: &mut Vec<Box<dyn Endpoint>>) {
    while let Some(mut endpoint) = endpoints.pop() {
        endpoint.stop().await;
    }
}

async fn stop_lifecycles(lifecycles: &[Arc<dyn Lifecycle>]) -> StopError {
    let mut failures = StopError::default();
    for lifecycle in lifecycles.iter().rev() {
        match lifecycle.stop().await {
            Ok(()) => info!(event = "service stopped", name = lifecycle.name()),
            Err(e) => {
                error!(
                    event = "service failed to stop",
                    name = lifecycle.name(),
                    error = %e,
                );
                failures.push(lifecycle.name(), e);
            }
        }
    }
    failures
}
