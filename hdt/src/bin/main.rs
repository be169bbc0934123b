// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

mod args;
mod config;
mod log;

use std::sync::Arc;

use clap::Parser;
use hdt::backend::{AlloyChainClient, Backend, PgTraceStore};
use node::Node;
use trace_data::{DiagnosticSink, TracingSink};
use tracing::{error, info};

use crate::args::Args;
use crate::log::Log;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = config::load(&args)?;
    config.validate()?;

    Log::new(config::log_level(&config)?, config::log_filter(&config))
        .with_format(config::log_type(&config))
        .register()?;

    info!(event = "starting hdt", version = hdt::VERSION);

    let sink: Arc<dyn DiagnosticSink> = Arc::new(TracingSink);
    let chain = Arc::new(AlloyChainClient::new(&config.upstream.url)?);
    let store = Arc::new(PgTraceStore::connect_lazy(
        &config.database,
        sink.clone(),
    )?);
    let backend = Arc::new(
        Backend::new(chain, store, sink)
            .with_cache_capacity(config.cache.headers)
            .with_timeout(config.upstream.request_timeout),
    );

    let node = Node::new(config.node.clone())?;
    node.register_apis(hdt::service::apis(backend.clone()));
    node.register_lifecycle(backend);
    node.start().await?;

    for (name, addr) in [
        ("http", node.http_endpoint()),
        ("ws", node.ws_endpoint()),
        ("auth", node.auth_endpoint()),
        ("ipc", node.ipc_endpoint()),
    ] {
        if let Some(addr) = addr {
            info!(event = "endpoint open", name, addr = %addr);
        }
    }

    tokio::select! {
        _ = shutdown_signal() => {
            info!(event = "shutdown signal received");
        }
        _ = node.wait() => {}
    }

    if let Err(e) = node.close().await {
        error!(event = "node shutdown failed", error = %e);
        return Err(e.into());
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(event = "failed to listen for ctrl-c", error = %e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(event = "failed to listen for SIGTERM", error = %e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
