// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use alloy::rpc::types::{Block, BlockNumberOrTag};
use async_trait::async_trait;
use hdt::backend::store::sort_rows;
use hdt::backend::{
    Backend, ChainClient, ChainError, StoreError, TraceStore, TxInclusion,
};
use trace_data::{CollectingSink, Header, TraceRow};

pub const HEAD: u64 = 120;

pub fn block_hash(number: u64) -> B256 {
    let mut hash = [0xbb; 32];
    hash[24..].copy_from_slice(&number.to_be_bytes());
    B256::from(hash)
}

pub fn timestamp(number: u64) -> u64 {
    1_438_269_973 + number * 13
}

pub fn header(number: u64) -> Header {
    Header::new(number, block_hash(number), timestamp(number))
}

pub fn block(number: u64) -> Block {
    let mut block: Block = Block::default();
    block.header.number = number;
    block.header.hash = block_hash(number);
    block.header.timestamp = timestamp(number);
    block
}

pub fn tx_hash(n: u8) -> B256 {
    B256::repeat_byte(n)
}

pub const MINED_TX: u8 = 0x01;
pub const OTHER_TX: u8 = 0x02;
pub const PENDING_TX: u8 = 0x0f;

/// Upstream node knowing blocks `0..=HEAD`, except 7.
#[derive(Debug, Default)]
pub struct MockChain {
    pub blocks: HashMap<u64, Block>,
    pub txs: HashMap<B256, TxInclusion>,
    pub block_calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl MockChain {
    pub fn new() -> Self {
        let blocks = (0..=HEAD).filter(|n| *n != 7).map(|n| (n, block(n)));
        let txs = [
            (tx_hash(MINED_TX), TxInclusion::Mined { block_number: 100 }),
            (tx_hash(OTHER_TX), TxInclusion::Mined { block_number: 100 }),
            (tx_hash(PENDING_TX), TxInclusion::Pending),
        ];
        Self {
            blocks: blocks.collect(),
            txs: txs.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn block_calls(&self) -> usize {
        self.block_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn block(
        &self,
        number: BlockNumberOrTag,
        _full_transactions: bool,
    ) -> Result<Option<Block>, ChainError> {
        self.block_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChainError::Other("connection refused".into()));
        }
        let number = match number {
            BlockNumberOrTag::Number(n) => n,
            BlockNumberOrTag::Earliest => 0,
            _ => HEAD,
        };
        Ok(self.blocks.get(&number).cloned())
    }

    async fn transaction(
        &self,
        hash: B256,
    ) -> Result<Option<TxInclusion>, ChainError> {
        Ok(self.txs.get(&hash).copied())
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(HEAD)
    }
}

/// In-memory trace table.
#[derive(Debug, Default)]
pub struct MockStore {
    pub rows: Vec<TraceRow>,
    pub queries: AtomicUsize,
    pub delay: Option<Duration>,
    pub unreachable: bool,
    pub closed: AtomicBool,
}

impl MockStore {
    pub fn new(rows: Vec<TraceRow>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TraceStore for MockStore {
    async fn traces(
        &self,
        header: &Header,
        tx_hash: Option<B256>,
    ) -> Result<Vec<TraceRow>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let tx_hash = tx_hash.map(|h| h.to_string());
        let mut rows: Vec<TraceRow> = self
            .rows
            .iter()
            .filter(|r| {
                r.block_number == header.number
                    && r.block_timestamp == header.timestamp
                    && (tx_hash.is_none() || r.tx_hash == tx_hash)
            })
            .cloned()
            .collect();
        sort_rows(&mut rows);
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.unreachable {
            return Err(StoreError::Sql(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

fn row(tx: u8, position: u64, address: &str, kind: &str) -> TraceRow {
    TraceRow {
        block_timestamp: timestamp(100),
        block_number: 100,
        tx_hash: Some(tx_hash(tx).to_string()),
        tx_position: position,
        from_address: Some(format!("0x{}", "11".repeat(20))),
        to_address: Some(format!("0x{}", "22".repeat(20))),
        trace_type: kind.into(),
        call_type: if kind == "call" { "call".into() } else { String::new() },
        input: "0x".into(),
        output: "0x".into(),
        gas: Some(50_000),
        gas_used: 21_000,
        trace_address: address.into(),
        ..Default::default()
    }
}

/// Block 100: two frames for the first transaction, one create for the
/// second, stored out of order.
pub fn block_100_rows() -> Vec<TraceRow> {
    vec![
        row(OTHER_TX, 1, "[]", "create"),
        row(MINED_TX, 0, "[0]", "call"),
        row(MINED_TX, 0, "[]", "call"),
    ]
}

pub struct Fixture {
    pub chain: Arc<MockChain>,
    pub store: Arc<MockStore>,
    pub sink: Arc<CollectingSink>,
    pub backend: Arc<Backend>,
}

pub fn fixture_with(store: MockStore) -> Fixture {
    let chain = Arc::new(MockChain::new());
    let store = Arc::new(store);
    let sink = Arc::new(CollectingSink::new());
    let backend = Arc::new(
        Backend::new(chain.clone(), store.clone(), sink.clone())
            .with_cache_capacity(16)
            .with_timeout(Duration::from_secs(5)),
    );
    Fixture {
        chain,
        store,
        sink,
        backend,
    }
}

pub fn fixture() -> Fixture {
    fixture_with(MockStore::new(block_100_rows()))
}
