// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Query interface behind the RPC namespaces.
//!
//! The [`Backend`] resolves blocks and transactions against the upstream
//! node (through the [`HeaderCache`]), loads the matching rows from the
//! [`TraceStore`] and turns them into call frames.

pub mod chain;
pub mod header_cache;
pub mod store;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use alloy::rpc::types::{Block, BlockNumberOrTag};
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use trace_data::{CallFrame, DiagnosticSink, FrameAssembler, Header};

pub use chain::{AlloyChainClient, ChainClient, ChainError, TxInclusion};
pub use header_cache::HeaderCache;
pub use store::{PgTraceStore, StoreError, TraceStore};

/// Default bound on a single backend operation.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("not found")]
    NotFound,

    #[error("transaction is pending")]
    PendingTransaction,

    #[error("block #{0} not found")]
    BlockNotFound(String),

    #[error("genesis is not traceable")]
    Genesis,

    #[error("upstream error: {0}")]
    Chain(#[from] ChainError),

    #[error("trace store error: {0}")]
    Store(#[from] StoreError),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend is shutting down")]
    Cancelled,
}

/// Label used in "block not found" errors: decimal for numbers, the tag
/// name otherwise.
fn block_label(number: BlockNumberOrTag) -> String {
    match number {
        BlockNumberOrTag::Number(n) => n.to_string(),
        tag => tag.to_string(),
    }
}

pub struct Backend {
    chain: Arc<dyn ChainClient>,
    store: Arc<dyn TraceStore>,
    cache: HeaderCache,
    assembler: FrameAssembler,
    timeout: Duration,
    cancel: CancellationToken,
}

impl Backend {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        store: Arc<dyn TraceStore>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            chain,
            store,
            cache: HeaderCache::default(),
            assembler: FrameAssembler::new(sink),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = HeaderCache::new(capacity);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache(&self) -> &HeaderCache {
        &self.cache
    }

    /// Runs `fut` bounded by the request timeout and by backend shutdown.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BackendError::Cancelled),
            res = tokio::time::timeout(self.timeout, fut) => match res {
                Ok(res) => res,
                Err(_) => Err(BackendError::Timeout(self.timeout)),
            },
        }
    }

    async fn resolve_header(
        &self,
        number: BlockNumberOrTag,
    ) -> Result<Header, BackendError> {
        if let BlockNumberOrTag::Number(n) = number {
            if let Some(header) = self.cache.get(n) {
                return Ok(header);
            }
        }

        let header = self
            .chain
            .header(number)
            .await?
            .ok_or_else(|| BackendError::BlockNotFound(block_label(number)))?;

        // Tags move, so only the resolved number is used as key.
        self.cache.insert(header);
        debug!(
            event = "header cached",
            block = header.number,
            requested = %number,
        );
        Ok(header)
    }

    /// Header of block `number`, served from the cache when possible.
    pub async fn header_by_number(
        &self,
        number: BlockNumberOrTag,
    ) -> Result<Header, BackendError> {
        self.bounded(self.resolve_header(number)).await
    }

    pub async fn block_timestamp(
        &self,
        number: BlockNumberOrTag,
    ) -> Result<u64, BackendError> {
        Ok(self.header_by_number(number).await?.timestamp)
    }

    async fn resolve_transaction(
        &self,
        hash: B256,
    ) -> Result<Header, BackendError> {
        match self.chain.transaction(hash).await? {
            None => Err(BackendError::NotFound),
            Some(TxInclusion::Pending) => Err(BackendError::PendingTransaction),
            Some(TxInclusion::Mined { block_number }) => {
                self.resolve_header(BlockNumberOrTag::Number(block_number))
                    .await
            }
        }
    }

    /// Header of the block that includes transaction `hash`.
    pub async fn transaction_by_hash(
        &self,
        hash: B256,
    ) -> Result<Header, BackendError> {
        self.bounded(self.resolve_transaction(hash)).await
    }

    /// Block as returned by the upstream node.
    pub async fn block_by_number(
        &self,
        number: BlockNumberOrTag,
        full_transactions: bool,
    ) -> Result<Block, BackendError> {
        self.bounded(async {
            self.chain
                .block(number, full_transactions)
                .await?
                .ok_or_else(|| BackendError::BlockNotFound(block_label(number)))
        })
        .await
    }

    /// Every call frame of block `number`, in transaction then trace
    /// address order.
    pub async fn trace_block(
        &self,
        number: BlockNumberOrTag,
    ) -> Result<Vec<CallFrame>, BackendError> {
        self.bounded(async {
            let header = self.resolve_header(number).await?;
            if header.is_genesis() {
                return Err(BackendError::Genesis);
            }
            let rows = self.store.traces(&header, None).await?;
            Ok(self.assembler.assemble(&rows, header.hash))
        })
        .await
    }

    /// Call frames of transaction `hash`.
    pub async fn trace_transaction(
        &self,
        hash: B256,
    ) -> Result<Vec<CallFrame>, BackendError> {
        self.bounded(async {
            let header = self.resolve_transaction(hash).await?;
            let rows = self.store.traces(&header, Some(hash)).await?;
            Ok(self.assembler.assemble(&rows, header.hash))
        })
        .await
    }
}

#[async_trait]
impl node::Lifecycle for Backend {
    async fn start(&self) -> anyhow::Result<()> {
        self.store.ping().await?;
        let head = self.chain.block_number().await?;
        info!(
            event = "backend started",
            head,
            cache_capacity = self.cache.capacity(),
            timeout = ?self.timeout,
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.cancel.cancel();
        self.store.close().await;
        info!(event = "backend stopped");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "backend"
    }
}
