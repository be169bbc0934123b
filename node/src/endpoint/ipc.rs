// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Newline delimited JSON-RPC over a local socket.
//!
//! Requests of a connection run concurrently and each answer is written as
//! soon as it is ready, so answers may come back out of order. A line
//! holding a JSON array is a batch, answered with one array.

use std::path::PathBuf;

use async_trait::async_trait;
use jsonrpsee::Methods;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Endpoint;
use crate::error::Error;

/// Maximum length of a single request line.
const MAX_LINE_LENGTH: usize = 5 * 1024 * 1024;

/// Requests of one connection handled at the same time.
const MAX_IN_FLIGHT: usize = 64;

/// Response sent for lines that are not a valid request object.
const PARSE_ERROR: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse error"}}"#;

/// Response sent for an empty batch and for batch entries that are not
/// request objects.
const INVALID_REQUEST: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32600,"message":"Invalid request"}}"#;

pub struct IpcEndpoint {
    path: PathBuf,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl IpcEndpoint {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl Endpoint for IpcEndpoint {
    fn name(&self) -> &'static str {
        "IPC"
    }

    #[cfg(unix)]
    async fn start(&mut self, methods: Methods) -> Result<(), Error> {
        use tokio::net::UnixListener;

        let bind_error = |source| Error::Bind {
            endpoint: "IPC",
            addr: self.path.display().to_string(),
            source,
        };

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(bind_error)?;
            }
        }
        // A socket left behind by a previous run prevents binding.
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(bind_error)?;
        }

        let listener = UnixListener::bind(&self.path).map_err(bind_error)?;
        let cancel = self.cancel.clone();
        self.task = Some(tokio::spawn(serve(listener, methods, cancel)));

        info!(
            event = "endpoint started",
            endpoint = "IPC",
            path = %self.path.display(),
        );
        Ok(())
    }

    #[cfg(not(unix))]
    async fn start(&mut self, _methods: Methods) -> Result<(), Error> {
        Err(Error::Ipc(format!(
            "local sockets are not supported on this platform: {}",
            self.path.display()
        )))
    }

    async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        self.cancel.cancel();
        if let Err(e) = task.await {
            warn!(event = "IPC accept loop failed", error = %e);
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!(event = "IPC socket not removed", error = %e);
        }
        info!(
            event = "endpoint stopped",
            endpoint = "IPC",
            path = %self.path.display(),
        );
    }

    fn listen_addr(&self) -> Option<String> {
        self.task
            .as_ref()
            .map(|_| self.path.display().to_string())
    }
}

#[cfg(unix)]
async fn serve(
    listener: tokio::net::UnixListener,
    methods: Methods,
    cancel: CancellationToken,
) {
    loop {
        let stream = tokio::select! {
            _ = cancel.cancelled() => return,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!(event = "IPC accept failed", error = %e);
                    continue;
                }
            },
        };
        let methods = methods.clone();
        let cancel = cancel.child_token();
        tokio::spawn(async move {
            if let Err(e) = connection(stream, methods, cancel).await {
                debug!(event = "IPC connection closed", error = %e);
            }
        });
    }
}

#[cfg(unix)]
async fn connection(
    stream: tokio::net::UnixStream,
    methods: Methods,
    cancel: CancellationToken,
) -> Result<(), tokio_util::codec::LinesCodecError> {
    use futures::stream::FuturesUnordered;
    use futures::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

    let (read, write) = stream.into_split();
    let mut requests =
        FramedRead::new(read, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let mut responses = FramedWrite::new(write, LinesCodec::new());
    let mut in_flight = FuturesUnordered::new();
    let mut reading = true;

    loop {
        // Requests still running after the client half-closes are answered.
        if !reading && in_flight.is_empty() {
            return Ok(());
        }
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            Some(response) = in_flight.next(), if !in_flight.is_empty() => {
                responses.send(response).await?;
            }
            line = requests.next(),
                if reading && in_flight.len() < MAX_IN_FLIGHT =>
            {
                match line {
                    Some(line) => {
                        let line = line?;
                        if !line.trim().is_empty() {
                            in_flight.push(dispatch(methods.clone(), line));
                        }
                    }
                    None => reading = false,
                }
            }
        }
    }
}

/// Handles one line: a request object or a batch of them.
#[cfg(unix)]
async fn dispatch(methods: Methods, line: String) -> String {
    let line = line.trim();
    if !line.starts_with('[') {
        return call(&methods, line)
            .await
            .unwrap_or_else(|| PARSE_ERROR.into());
    }

    let batch: Vec<serde_json::Value> = match serde_json::from_str(line) {
        Ok(batch) => batch,
        Err(e) => {
            debug!(event = "invalid IPC batch", error = %e);
            return PARSE_ERROR.into();
        }
    };
    if batch.is_empty() {
        return INVALID_REQUEST.into();
    }

    let calls = batch.iter().map(|request| {
        let methods = &methods;
        async move {
            call(methods, &request.to_string())
                .await
                .unwrap_or_else(|| INVALID_REQUEST.into())
        }
    });
    let answers = futures::future::join_all(calls).await;
    format!("[{}]", answers.join(","))
}

/// Runs a single request object, `None` if it cannot be decoded.
#[cfg(unix)]
async fn call(methods: &Methods, request: &str) -> Option<String> {
    match methods.raw_json_request(request, 1).await {
        Ok((response, _)) => Some(response),
        Err(e) => {
            debug!(event = "invalid IPC request", error = %e);
            None
        }
    }
}
