// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Transport endpoints the node mounts its method table on.

mod http;
mod inproc;
mod ipc;

pub use http::{HttpEndpoint, Protocols};
pub use inproc::{InProcClient, InProcEndpoint, InProcHandler};
pub use ipc::IpcEndpoint;

use async_trait::async_trait;
use jsonrpsee::Methods;

use crate::error::Error;

/// A listener serving a snapshot of the node's methods.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Short human readable name, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Binds the listener and starts serving `methods`.
    async fn start(&mut self, methods: Methods) -> Result<(), Error>;

    /// Stops serving and waits for the listener to shut down. Stopping an
    /// endpoint that was never started is a no-op.
    async fn stop(&mut self);

    /// Address the endpoint is listening on, once started.
    fn listen_addr(&self) -> Option<String>;
}
