// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Transport configuration of the node host.
//!
//! Every transport is enabled by the presence of its host (or, for IPC,
//! its path). IPC is on by default at `hdt.ipc`, an empty `ipc_path`
//! turns it off. All sections deserialize with defaults so a TOML file only
//! needs the keys it changes:
//!
//! ```toml
//! [http]
//! host = "0.0.0.0"
//! port = 8545
//! cors = ["*"]
//! modules = ["eth", "trace"]
//!
//! [ws]
//! host = "0.0.0.0"
//! port = 8545 # same port as HTTP: served by the HTTP server
//! ```

use std::fmt::Formatter;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const DEFAULT_HTTP_PORT: u16 = 8545;
pub const DEFAULT_WS_PORT: u16 = 8546;
pub const DEFAULT_AUTH_PORT: u16 = 8551;
pub const DEFAULT_IPC_PATH: &str = "hdt.ipc";

/// Maximum size of a request body, 5 MiB.
pub const DEFAULT_MAX_REQUEST_BODY_SIZE: u32 = 5 * 1024 * 1024;

/// Maximum size of a response body, 10 MiB.
pub const DEFAULT_MAX_RESPONSE_BODY_SIZE: u32 = 10 * 1024 * 1024;

fn default_modules() -> Vec<String> {
    vec!["eth".to_string(), "trace".to_string()]
}

fn default_vhosts() -> Vec<String> {
    vec!["localhost".to_string()]
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct NodeConfig {
    pub http: HttpConfig,
    pub ws: WsConfig,
    pub auth: AuthConfig,
    /// Local socket path. Relative paths are resolved against `data_dir`.
    pub ipc_path: Option<PathBuf>,
    /// Directory for files the node creates, e.g. the IPC socket.
    pub data_dir: Option<PathBuf>,
    pub limits: LimitsConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            ws: WsConfig::default(),
            auth: AuthConfig::default(),
            ipc_path: Some(DEFAULT_IPC_PATH.into()),
            data_dir: None,
            limits: LimitsConfig::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen host, HTTP is disabled when unset.
    pub host: Option<String>,
    pub port: u16,
    /// Origins allowed by CORS, `*` for any.
    pub cors: Vec<String>,
    /// Accepted `Host` header names, `*` for any.
    pub vhosts: Vec<String>,
    /// Namespaces mounted on this transport, empty for all.
    pub modules: Vec<String>,
    pub prefix: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_HTTP_PORT,
            cors: vec![],
            vhosts: default_vhosts(),
            modules: default_modules(),
            prefix: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WsConfig {
    /// Listen host, WebSocket is disabled when unset.
    pub host: Option<String>,
    pub port: u16,
    /// Origins allowed to open a connection, `*` for any.
    pub origins: Vec<String>,
    pub modules: Vec<String>,
    pub prefix: String,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_WS_PORT,
            origins: vec![],
            modules: default_modules(),
            prefix: String::new(),
        }
    }
}

/// The authenticated endpoint serves HTTP and WebSocket on one port and
/// exposes every registered namespace.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AuthConfig {
    pub host: Option<String>,
    pub port: u16,
    pub vhosts: Vec<String>,
    /// Hex encoded 32-byte secret, created if missing.
    pub jwt_secret: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_AUTH_PORT,
            vhosts: default_vhosts(),
            jwt_secret: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_request_body_size: u32,
    pub max_response_body_size: u32,
    pub max_connections: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_body_size: DEFAULT_MAX_REQUEST_BODY_SIZE,
            max_response_body_size: DEFAULT_MAX_RESPONSE_BODY_SIZE,
            max_connections: 100,
        }
    }
}

impl NodeConfig {
    /// Checks the HTTP and WebSocket path prefixes.
    pub fn validate(&self) -> Result<(), Error> {
        validate_prefix("HTTP", &self.http.prefix)?;
        validate_prefix("WebSocket", &self.ws.prefix)?;
        Ok(())
    }

    /// Resolved IPC socket path, if IPC is enabled.
    pub fn ipc_endpoint(&self) -> Option<PathBuf> {
        let path = self.ipc_path.as_ref()?;
        if path.as_os_str().is_empty() {
            return None;
        }
        match &self.data_dir {
            Some(dir) if path.is_relative() => Some(dir.join(path)),
            _ => Some(path.clone()),
        }
    }

    /// Whether WebSocket shares the HTTP server.
    pub fn ws_on_http(&self) -> bool {
        self.http.host.is_some()
            && self.ws.host.is_some()
            && self.http.port == self.ws.port
    }
}

/// A path prefix is empty or an absolute URL path without query or
/// fragment.
pub fn validate_prefix(
    transport: &'static str,
    prefix: &str,
) -> Result<(), Error> {
    let invalid = |reason| Error::InvalidPrefix {
        transport,
        prefix: prefix.to_string(),
        reason,
    };
    if prefix.is_empty() {
        return Ok(());
    }
    if !prefix.starts_with('/') {
        return Err(invalid("path must start with '/'"));
    }
    if prefix.contains(['?', '#']) {
        return Err(invalid("path cannot contain '?' or '#'"));
    }
    Ok(())
}

impl std::fmt::Display for NodeConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let endpoint = |host: &Option<String>, port: u16| match host {
            Some(host) => format!("{host}:{port}"),
            None => "disabled".to_string(),
        };
        write!(
            f,
            "http: {}, ws: {}, auth: {}, ipc: {}",
            endpoint(&self.http.host, self.http.port),
            endpoint(&self.ws.host, self.ws.port),
            endpoint(&self.auth.host, self.auth.port),
            self.ipc_endpoint()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "disabled".to_string()),
        )
    }
}
