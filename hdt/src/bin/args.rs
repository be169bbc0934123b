// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::PossibleValuesParser;
use clap::Parser;
use hdt::config::LOG_TYPES;

#[derive(Parser, Debug, Default)]
#[command(
    version = hdt::VERSION,
    about = "Historical trace JSON-RPC server",
)]
pub struct Args {
    /// Configuration file path
    #[clap(long, short, env = "HDT_CONFIG_TOML", value_parser)]
    pub config: Option<PathBuf>,

    /// Output log level
    #[clap(long)]
    pub log_level: Option<tracing::Level>,

    // Change the log format accordingly
    #[clap(long, value_parser = PossibleValuesParser::new(LOG_TYPES))]
    pub log_type: Option<String>,

    /// Add log filter(s)
    #[clap(long)]
    pub log_filter: Option<String>,

    #[clap(long, value_parser)]
    /// Directory for files created by the server, e.g. the IPC socket
    pub datadir: Option<PathBuf>,

    #[clap(long)]
    /// HTTP-RPC listen host, enables the HTTP endpoint
    pub http_addr: Option<String>,

    #[clap(long)]
    /// HTTP-RPC listen port
    pub http_port: Option<u16>,

    #[clap(long, value_delimiter = ',')]
    /// Namespaces served over HTTP
    pub http_api: Option<Vec<String>>,

    #[clap(long, value_delimiter = ',')]
    /// Origins allowed by CORS
    pub http_corsdomain: Option<Vec<String>>,

    #[clap(long, value_delimiter = ',')]
    /// Accepted virtual host names
    pub http_vhosts: Option<Vec<String>>,

    #[clap(long)]
    /// HTTP path prefix
    pub http_rpcprefix: Option<String>,

    #[clap(long)]
    /// WS-RPC listen host, enables the WebSocket endpoint
    pub ws_addr: Option<String>,

    #[clap(long)]
    /// WS-RPC listen port
    pub ws_port: Option<u16>,

    #[clap(long, value_delimiter = ',')]
    /// Namespaces served over WebSocket
    pub ws_api: Option<Vec<String>>,

    #[clap(long, value_delimiter = ',')]
    /// Origins allowed to open WebSocket connections
    pub ws_origins: Option<Vec<String>>,

    #[clap(long)]
    /// WebSocket path prefix
    pub ws_rpcprefix: Option<String>,

    #[clap(long)]
    /// Authenticated RPC listen host
    pub authrpc_addr: Option<String>,

    #[clap(long)]
    /// Authenticated RPC listen port
    pub authrpc_port: Option<u16>,

    #[clap(long, value_parser)]
    /// Path to the hex encoded JWT secret
    pub authrpc_jwtsecret: Option<PathBuf>,

    #[clap(long, value_parser)]
    /// Local socket path, relative to the data directory
    pub ipcpath: Option<PathBuf>,

    #[clap(long)]
    /// Disable the IPC endpoint
    pub ipcdisable: bool,

    #[clap(long, env = "HDT_UPSTREAM")]
    /// Upstream Ethereum JSON-RPC URL
    pub upstream: Option<String>,

    #[clap(long, value_parser = humantime_serde::re::humantime::parse_duration)]
    /// Bound on a single upstream or database operation, e.g. `30s`
    pub request_timeout: Option<Duration>,

    #[clap(long, env = "HDT_DSN")]
    /// PostgreSQL connection string
    pub dsn: Option<String>,

    #[clap(long, env = "HDT_CHAIN")]
    /// Schema holding the traces table
    pub chain: Option<String>,

    #[clap(long)]
    /// Database pool size
    pub db_max_connections: Option<u32>,

    #[clap(long)]
    /// Number of block headers kept in memory
    pub cache_headers: Option<usize>,
}
