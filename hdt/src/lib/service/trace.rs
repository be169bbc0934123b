// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::sync::Arc;

use alloy::primitives::B256;
use alloy::rpc::types::BlockNumberOrTag;
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::ErrorObjectOwned;
use tracing::debug;
use trace_data::CallFrame;

use crate::backend::{Backend, BackendError};
use crate::error::Error;

/// Parity style trace methods.
#[rpc(server, namespace = "trace")]
pub trait TraceApi {
    /// Returns every call frame of a block.
    ///
    /// # Error Codes
    ///
    /// | Code | Message | Description |
    /// |------|---------|-------------|
    /// | -32602 | invalid parameters | `pending` has no indexed traces |
    /// | -32000 | genesis is not traceable | Block 0 or `earliest` |
    /// | -32000 | block #N not found | Unknown block |
    /// | -32002 | upstream error | Header lookup failed |
    /// | -32003 | trace store error | Trace query failed |
    #[method(name = "block")]
    async fn block(
        &self,
        number: BlockNumberOrTag,
    ) -> Result<Vec<CallFrame>, ErrorObjectOwned>;

    /// Returns the call frames of one transaction.
    ///
    /// # Error Codes
    ///
    /// | Code | Message | Description |
    /// |------|---------|-------------|
    /// | -32000 | not found | Unknown transaction |
    /// | -32000 | transaction is pending | Not mined yet |
    #[method(name = "transaction")]
    async fn transaction(
        &self,
        hash: B256,
    ) -> Result<Vec<CallFrame>, ErrorObjectOwned>;
}

#[derive(Clone)]
pub struct TraceRpc {
    backend: Arc<Backend>,
}

impl TraceRpc {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl TraceApiServer for TraceRpc {
    async fn block(
        &self,
        number: BlockNumberOrTag,
    ) -> Result<Vec<CallFrame>, ErrorObjectOwned> {
        if matches!(
            number,
            BlockNumberOrTag::Number(0) | BlockNumberOrTag::Earliest
        ) {
            return Err(Error::from(BackendError::Genesis).into());
        }
        if matches!(number, BlockNumberOrTag::Pending) {
            return Err(Error::InvalidParams(
                "pending block is not traceable".into(),
            )
            .into());
        }
        let frames = self
            .backend
            .trace_block(number)
            .await
            .map_err(Error::from)?;
        debug!(event = "trace_block", block = %number, frames = frames.len());
        Ok(frames)
    }

    async fn transaction(
        &self,
        hash: B256,
    ) -> Result<Vec<CallFrame>, ErrorObjectOwned> {
        let frames = self
            .backend
            .trace_transaction(hash)
            .await
            .map_err(Error::from)?;
        debug!(event = "trace_transaction", tx = %hash, frames = frames.len());
        Ok(frames)
    }
}
