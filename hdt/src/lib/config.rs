// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Service configuration, loaded from a TOML file.
//!
//! Every section is optional and falls back to its defaults:
//!
//! ```toml
//! [log]
//! level = "info"
//! type = "coloured"
//!
//! [node]
//! ipc_path = "hdt.ipc" # empty to disable
//!
//! [node.http]
//! host = "127.0.0.1"
//! port = 8545
//! modules = ["eth", "trace"]
//!
//! [upstream]
//! url = "http://127.0.0.1:8545"
//! request_timeout = "30s"
//!
//! [database]
//! dsn = "postgres://postgres@localhost:5432/tsdb"
//! chain = "ethereum"
//! slow_statement_threshold = "100ms"
//!
//! [cache]
//! headers = 90000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use node::NodeConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::header_cache::DEFAULT_CAPACITY;
use crate::backend::store::{is_valid_chain, DEFAULT_ACQUIRE_TIMEOUT};
use crate::backend::DEFAULT_REQUEST_TIMEOUT;

/// Namespaces served by this service.
pub const KNOWN_MODULES: [&str; 2] = ["eth", "trace"];

/// Accepted values of `log.type`.
pub const LOG_TYPES: [&str; 3] = ["coloured", "plain", "json"];

pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_DSN: &str = "postgres://postgres@localhost:5432/tsdb";
pub const DEFAULT_CHAIN: &str = "ethereum";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_SLOW_STATEMENT_THRESHOLD: Duration =
    Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Node(#[from] node::Error),

    #[error("unknown module {module:?} in {transport} modules")]
    UnknownModule {
        transport: &'static str,
        module: String,
    },

    #[error("invalid chain name {0:?}")]
    InvalidChain(String),

    #[error("invalid log type {0:?}, expected one of {LOG_TYPES:?}")]
    InvalidLogType(String),

    #[error("invalid upstream url {0:?}")]
    InvalidUpstream(String),

    #[error("database pool needs at least one connection")]
    EmptyPool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub node: NodeConfig,
    pub upstream: UpstreamConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub level: Option<String>,
    #[serde(rename = "type")]
    pub log_type: Option<String>,
    pub filter: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct UpstreamConfig {
    pub url: String,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_UPSTREAM_URL.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub dsn: String,
    /// Schema holding the `traces` table.
    pub chain: String,
    pub max_connections: u32,
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Duration,
    /// Statements slower than this are logged at warn level.
    #[serde(rename = "slow_statement_threshold", with = "humantime_serde")]
    pub slow_threshold: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: DEFAULT_DSN.into(),
            chain: DEFAULT_CHAIN.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            slow_threshold: DEFAULT_SLOW_STATEMENT_THRESHOLD,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of block headers kept in memory. Zero disables the cache.
    pub headers: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            headers: DEFAULT_CAPACITY,
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let toml =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml(&toml)
    }

    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(log_type) = &self.log.log_type {
            if !LOG_TYPES.contains(&log_type.as_str()) {
                return Err(ConfigError::InvalidLogType(log_type.clone()));
            }
        }

        self.node.validate()?;

        let modules = [
            ("http", &self.node.http.modules),
            ("ws", &self.node.ws.modules),
        ];
        for (transport, modules) in modules {
            if let Some(module) =
                modules.iter().find(|m| !KNOWN_MODULES.contains(&m.as_str()))
            {
                return Err(ConfigError::UnknownModule {
                    transport,
                    module: module.clone(),
                });
            }
        }

        if !is_valid_chain(&self.database.chain) {
            return Err(ConfigError::InvalidChain(self.database.chain.clone()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::EmptyPool);
        }
        if url::Url::parse(&self.upstream.url).is_err() {
            return Err(ConfigError::InvalidUpstream(self.upstream.url.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.cache.headers, 90_000);
        assert_eq!(config.database.chain, "ethereum");
        assert_eq!(
            config.database.slow_threshold,
            Duration::from_millis(100)
        );
        assert_eq!(config.node.http.modules, vec!["eth", "trace"]);
        assert!(config.node.http.host.is_none());
        assert_eq!(config.node.ipc_endpoint(), Some(PathBuf::from("hdt.ipc")));
        config.validate().unwrap();
    }

    #[test]
    fn ipc_is_on_by_default() {
        assert!(Config::default().node.ipc_endpoint().is_some());

        // A partial node section keeps the default socket.
        let config = Config::from_toml(
            "[node]\ndata_dir = \"/var/lib/hdt\"\n\n[node.http]\nhost = \"127.0.0.1\"\n",
        )
        .unwrap();
        assert_eq!(
            config.node.ipc_endpoint(),
            Some(PathBuf::from("/var/lib/hdt/hdt.ipc"))
        );

        let config = Config::from_toml("[node]\nipc_path = \"\"\n").unwrap();
        assert_eq!(config.node.ipc_endpoint(), None);
    }

    #[test]
    fn parse_sections() {
        let config = Config::from_toml(
            r#"
            [log]
            level = "debug"
            type = "json"

            [node.http]
            host = "0.0.0.0"
            port = 9545
            prefix = "/rpc"

            [upstream]
            url = "http://geth:8545"
            request_timeout = "5s"

            [database]
            chain = "polygon"
            max_connections = 4
            slow_statement_threshold = "250ms"

            [cache]
            headers = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.log.level.as_deref(), Some("debug"));
        assert_eq!(config.log.log_type.as_deref(), Some("json"));
        assert_eq!(config.node.http.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.node.http.port, 9545);
        assert_eq!(config.upstream.request_timeout, Duration::from_secs(5));
        assert_eq!(config.database.chain, "polygon");
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(
            config.database.slow_threshold,
            Duration::from_millis(250)
        );
        assert_eq!(config.database.dsn, DEFAULT_DSN);
        assert_eq!(config.cache.headers, 16);
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects() {
        let mut config = Config::default();
        config.node.http.modules = vec!["eth".into(), "admin".into()];
        assert_matches!(
            config.validate(),
            Err(ConfigError::UnknownModule { transport: "http", module }) if module == "admin"
        );

        let mut config = Config::default();
        config.node.ws.prefix = "no-slash".into();
        assert_matches!(config.validate(), Err(ConfigError::Node(_)));

        let mut config = Config::default();
        config.database.chain = "eth.traces; --".into();
        assert_matches!(config.validate(), Err(ConfigError::InvalidChain(_)));

        let mut config = Config::default();
        config.database.max_connections = 0;
        assert_matches!(config.validate(), Err(ConfigError::EmptyPool));

        let config = Config::from_toml("[log]\ntype = \"colored\"\n").unwrap();
        assert_matches!(
            config.validate(),
            Err(ConfigError::InvalidLogType(t)) if t == "colored"
        );

        let mut config = Config::default();
        config.upstream.url = "not a url".into();
        assert_matches!(
            config.validate(),
            Err(ConfigError::InvalidUpstream(_))
        );
    }

    #[test]
    fn read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hdt.toml");
        std::fs::write(&path, "[cache]\nheaders = 3\n").unwrap();
        assert_eq!(Config::from_file(&path).unwrap().cache.headers, 3);

        assert_matches!(
            Config::from_file(dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        );
    }
}
