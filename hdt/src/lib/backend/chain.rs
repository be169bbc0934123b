// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Upstream Ethereum JSON-RPC access.

use alloy::primitives::B256;
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::{
    Block, BlockId, BlockNumberOrTag, BlockTransactionsKind,
};
use alloy::transports::http::{Client, Http};
use alloy::transports::TransportError;
use async_trait::async_trait;
use thiserror::Error;
use trace_data::Header;
use url::Url;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("invalid upstream url {0}: {1}")]
    Url(String, url::ParseError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Other(String),
}

/// Where a transaction landed, as seen by the upstream node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxInclusion {
    Pending,
    Mined { block_number: u64 },
}

/// The upstream calls the backend relies on.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Block by number or tag, `None` if the upstream does not know it.
    async fn block(
        &self,
        number: BlockNumberOrTag,
        full_transactions: bool,
    ) -> Result<Option<Block>, ChainError>;

    /// Inclusion status of a transaction, `None` if unknown.
    async fn transaction(
        &self,
        hash: B256,
    ) -> Result<Option<TxInclusion>, ChainError>;

    /// Current head number, used as a connectivity check.
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Header of a block, without its transactions.
    async fn header(
        &self,
        number: BlockNumberOrTag,
    ) -> Result<Option<Header>, ChainError> {
        let block = self.block(number, false).await?;
        Ok(block.map(|b| header_of(&b)))
    }
}

pub fn header_of(block: &Block) -> Header {
    Header::new(block.header.number, block.header.hash, block.header.timestamp)
}

/// Rejects a block whose number differs from the one asked for.
fn expect_number(
    number: BlockNumberOrTag,
    block: Option<Block>,
) -> Result<Option<Block>, ChainError> {
    match (number, &block) {
        (BlockNumberOrTag::Number(n), Some(b)) if b.header.number != n => {
            Err(ChainError::Other(format!(
                "upstream returned block #{} for #{n}",
                b.header.number
            )))
        }
        _ => Ok(block),
    }
}

/// [`ChainClient`] over an HTTP alloy provider.
#[derive(Clone)]
pub struct AlloyChainClient {
    provider: RootProvider<Http<Client>>,
}

impl AlloyChainClient {
    pub fn new(url: &str) -> Result<Self, ChainError> {
        let url: Url =
            url.parse().map_err(|e| ChainError::Url(url.to_string(), e))?;
        Ok(Self {
            provider: RootProvider::new_http(url),
        })
    }
}

impl std::fmt::Debug for AlloyChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyChainClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn block(
        &self,
        number: BlockNumberOrTag,
        full_transactions: bool,
    ) -> Result<Option<Block>, ChainError> {
        let kind = if full_transactions {
            BlockTransactionsKind::Full
        } else {
            BlockTransactionsKind::Hashes
        };
        let block = self.provider.get_block(BlockId::Number(number), kind).await?;
        expect_number(number, block)
    }

    async fn transaction(
        &self,
        hash: B256,
    ) -> Result<Option<TxInclusion>, ChainError> {
        let tx = self.provider.get_transaction_by_hash(hash).await?;
        Ok(tx.map(|tx| match tx.block_number {
            Some(block_number) => TxInclusion::Mined { block_number },
            None => TxInclusion::Pending,
        }))
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.provider.get_block_number().await?)
    }
}
