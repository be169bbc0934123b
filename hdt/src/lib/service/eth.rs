// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::sync::Arc;

use alloy::rpc::types::{Block, BlockNumberOrTag};
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::ErrorObjectOwned;

use crate::backend::Backend;
use crate::error::Error;

/// Block lookups forwarded to the upstream node.
#[rpc(server, namespace = "eth")]
pub trait EthApi {
    /// Returns the block at `number`, with full transaction objects when
    /// `full_transactions` is set and hashes otherwise.
    ///
    /// Fails with `block #N not found` (-32000) when the upstream node does
    /// not know the block.
    #[method(name = "getBlockByNumber")]
    async fn get_block_by_number(
        &self,
        number: BlockNumberOrTag,
        full_transactions: bool,
    ) -> Result<Block, ErrorObjectOwned>;
}

#[derive(Clone)]
pub struct EthRpc {
    backend: Arc<Backend>,
}

impl EthRpc {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl EthApiServer for EthRpc {
    async fn get_block_by_number(
        &self,
        number: BlockNumberOrTag,
        full_transactions: bool,
    ) -> Result<Block, ErrorObjectOwned> {
        Ok(self
            .backend
            .block_by_number(number, full_transactions)
            .await
            .map_err(Error::from)?)
    }
}
