// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::fmt;

use jsonrpsee::core::RegisterMethodError;
use thiserror::Error;

use crate::jwt::JwtError;
use crate::middleware::CorsDomainError;

/// Errors returned by the node host.
#[derive(Error, Debug)]
pub enum Error {
    /// `start` was called on a node that is already running.
    #[error("node already running")]
    NodeRunning,

    /// The node was closed, it cannot be started or closed again.
    #[error("node not started")]
    NodeStopped,

    /// A path prefix is not a valid URL path.
    #[error("invalid {transport} path prefix {prefix:?}: {reason}")]
    InvalidPrefix {
        transport: &'static str,
        prefix: String,
        reason: &'static str,
    },

    /// A listener could not be bound to its address.
    #[error("failed to bind {endpoint} endpoint on {addr}: {source}")]
    Bind {
        endpoint: &'static str,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Two namespaces registered the same method name.
    #[error("method registration failed: {0}")]
    Register(#[from] RegisterMethodError),

    #[error("JWT error: {0}")]
    Jwt(#[from] JwtError),

    #[error("CORS configuration error: {0}")]
    Cors(#[from] CorsDomainError),

    /// The local socket endpoint failed or is unsupported.
    #[error("IPC error: {0}")]
    Ipc(String),

    /// A registered lifecycle failed to start.
    #[error("lifecycle {name} failed to start: {source}")]
    Lifecycle {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Some registered lifecycles failed to stop.
    #[error(transparent)]
    Stop(#[from] StopError),

    /// The in-process handler has no methods mounted.
    #[error("in-process handler is not running")]
    InProcUnavailable,

    /// An in-process call failed.
    #[error("in-process call failed: {0}")]
    InProcCall(String),
}

/// Aggregates the errors returned by lifecycles while the node stops.
#[derive(Debug, Default)]
pub struct StopError {
    pub services: Vec<(&'static str, anyhow::Error)>,
}

impl StopError {
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn push(&mut self, name: &'static str, err: anyhow::Error) {
        self.services.push((name, err));
    }
}

impl fmt::Display for StopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "services failed to stop: ")?;
        for (i, (name, err)) in self.services.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for StopError {}
