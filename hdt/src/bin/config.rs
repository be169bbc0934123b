// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::str::FromStr;

use hdt::config::{Config, ConfigError};

use crate::args::Args;

/// Default log_level.
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log_type.
const DEFAULT_LOG_TYPE: &str = "coloured";

/// Reads the configuration file, if any, and applies the command line
/// overrides on top of it.
pub(crate) fn load(args: &Args) -> Result<Config, ConfigError> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    merge(&mut config, args);
    Ok(config)
}

fn merge(config: &mut Config, args: &Args) {
    fn set<T: Clone>(target: &mut T, value: &Option<T>) {
        if let Some(value) = value {
            *target = value.clone();
        }
    }

    if let Some(level) = args.log_level {
        config.log.level = Some(level.to_string());
    }
    if args.log_type.is_some() {
        config.log.log_type.clone_from(&args.log_type);
    }
    if args.log_filter.is_some() {
        config.log.filter.clone_from(&args.log_filter);
    }

    let node = &mut config.node;
    if args.datadir.is_some() {
        node.data_dir.clone_from(&args.datadir);
    }
    if args.ipcpath.is_some() {
        node.ipc_path.clone_from(&args.ipcpath);
    }
    if args.ipcdisable {
        node.ipc_path = None;
    }

    if args.http_addr.is_some() {
        node.http.host.clone_from(&args.http_addr);
    }
    set(&mut node.http.port, &args.http_port);
    set(&mut node.http.modules, &args.http_api);
    set(&mut node.http.cors, &args.http_corsdomain);
    set(&mut node.http.vhosts, &args.http_vhosts);
    set(&mut node.http.prefix, &args.http_rpcprefix);

    if args.ws_addr.is_some() {
        node.ws.host.clone_from(&args.ws_addr);
    }
    set(&mut node.ws.port, &args.ws_port);
    set(&mut node.ws.modules, &args.ws_api);
    set(&mut node.ws.origins, &args.ws_origins);
    set(&mut node.ws.prefix, &args.ws_rpcprefix);

    if args.authrpc_addr.is_some() {
        node.auth.host.clone_from(&args.authrpc_addr);
    }
    set(&mut node.auth.port, &args.authrpc_port);
    if args.authrpc_jwtsecret.is_some() {
        node.auth.jwt_secret.clone_from(&args.authrpc_jwtsecret);
    }

    set(&mut config.upstream.url, &args.upstream);
    set(&mut config.upstream.request_timeout, &args.request_timeout);

    set(&mut config.database.dsn, &args.dsn);
    set(&mut config.database.chain, &args.chain);
    set(&mut config.database.max_connections, &args.db_max_connections);

    set(&mut config.cache.headers, &args.cache_headers);
}

pub(crate) fn log_type(config: &Config) -> String {
    config
        .log
        .log_type
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_TYPE.into())
}

pub(crate) fn log_level(
    config: &Config,
) -> Result<tracing::Level, anyhow::Error> {
    let log_level = config.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
    tracing::Level::from_str(log_level).map_err(|e| {
        anyhow::anyhow!("Invalid log-level specified '{log_level}' - {e}")
    })
}

pub(crate) fn log_filter(config: &Config) -> String {
    config.log.filter.clone().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn args_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hdt.toml");
        std::fs::write(
            &path,
            "[node.http]\nhost = \"127.0.0.1\"\nport = 1\n\n[database]\nchain = \"bsc\"\n",
        )
        .unwrap();

        let args = Args {
            config: Some(path),
            http_port: Some(9545),
            ws_addr: Some("0.0.0.0".into()),
            ws_api: Some(vec!["trace".into()]),
            dsn: Some("postgres://u@db/traces".into()),
            request_timeout: Some(Duration::from_secs(3)),
            cache_headers: Some(10),
            log_level: Some(tracing::Level::DEBUG),
            ..Default::default()
        };
        let config = load(&args).unwrap();

        assert_eq!(config.node.http.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.node.http.port, 9545);
        assert_eq!(config.node.ws.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.node.ws.modules, vec!["trace"]);
        assert_eq!(config.database.chain, "bsc");
        assert_eq!(config.database.dsn, "postgres://u@db/traces");
        assert_eq!(config.upstream.request_timeout, Duration::from_secs(3));
        assert_eq!(config.cache.headers, 10);
        assert_eq!(log_level(&config).unwrap(), tracing::Level::DEBUG);
    }

    #[test]
    fn ipc_flags() {
        let config = load(&Args::default()).unwrap();
        assert_eq!(config.node.ipc_endpoint(), Some("hdt.ipc".into()));

        let args = Args {
            datadir: Some("/srv/hdt".into()),
            ..Default::default()
        };
        assert_eq!(
            load(&args).unwrap().node.ipc_endpoint(),
            Some("/srv/hdt/hdt.ipc".into())
        );

        let args = Args {
            ipcpath: Some("other.ipc".into()),
            ipcdisable: true,
            ..Default::default()
        };
        assert_eq!(load(&args).unwrap().node.ipc_endpoint(), None);
    }

    #[test]
    fn log_defaults() {
        let config = load(&Args::default()).unwrap();
        assert_eq!(log_type(&config), "coloured");
        assert_eq!(log_level(&config).unwrap(), tracing::Level::INFO);
        assert_eq!(log_filter(&config), "");

        let mut config = config;
        config.log.level = Some("loud".into());
        assert!(log_level(&config).is_err());
    }
}
