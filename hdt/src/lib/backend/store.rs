// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Indexed trace rows stored in PostgreSQL.
//!
//! Each chain has its own schema holding a `traces` table with one row per
//! call step. The table is partitioned by `block_timestamp`, so every query
//! pins the timestamp alongside the block number.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{B256, U256};
use async_trait::async_trait;
use log::LevelFilter;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{ConnectOptions, FromRow};
use thiserror::Error;
use tracing::info;
use trace_data::{Diagnostic, DiagnosticSink, Header, TraceRow};

use crate::config::DatabaseConfig;

/// Default wait for a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid chain name {0:?}")]
    InvalidChain(String),

    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

/// Source of trace rows.
#[async_trait]
pub trait TraceStore: Send + Sync {
    /// Rows of the block described by `header`, restricted to one
    /// transaction when `tx_hash` is given, ordered by transaction position
    /// then trace address.
    async fn traces(
        &self,
        header: &Header,
        tx_hash: Option<B256>,
    ) -> Result<Vec<TraceRow>, StoreError>;

    /// Checks the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Releases the underlying connections.
    async fn close(&self);
}

/// Raw row as selected from the traces table.
#[derive(Debug, FromRow)]
struct TraceRecord {
    block_timestamp: i64,
    blknum: i64,
    txhash: Option<String>,
    txpos: i64,
    from_address: Option<String>,
    to_address: Option<String>,
    value: Option<String>,
    input: Option<String>,
    output: Option<String>,
    trace_type: Option<String>,
    call_type: Option<String>,
    reward_type: Option<String>,
    gas: Option<String>,
    gas_used: Option<i64>,
    sub_traces: Option<i64>,
    trace_address: Option<String>,
    error: Option<String>,
}

/// Parses a NUMERIC rendered as text. A fractional part made only of zeros,
/// as printed for columns with a scale, is accepted.
fn parse_numeric(text: &str) -> Option<U256> {
    let text = text.trim();
    let integer = match text.split_once('.') {
        Some((integer, fraction)) if fraction.bytes().all(|b| b == b'0') => {
            integer
        }
        Some(_) => return None,
        None => text,
    };
    if integer.is_empty() {
        return None;
    }
    U256::from_str_radix(integer, 10).ok()
}

impl TraceRecord {
    fn into_row(self, sink: &dyn DiagnosticSink) -> TraceRow {
        let block_number = self.blknum.max(0) as u64;
        let tx_position = self.txpos.max(0) as u64;
        let number = |field: &'static str, text: Option<String>| {
            let text = text?;
            let parsed = parse_numeric(&text);
            if parsed.is_none() {
                sink.report(Diagnostic::InvalidNumber {
                    block_number,
                    tx_position,
                    field,
                    text,
                });
            }
            parsed
        };

        let value = number("value", self.value);
        let gas = number("gas", self.gas).map(|gas| gas.saturating_to::<u64>());

        TraceRow {
            block_timestamp: self.block_timestamp.max(0) as u64,
            block_number,
            tx_hash: self.txhash,
            tx_position,
            from_address: self.from_address,
            to_address: self.to_address,
            value,
            input: self.input.unwrap_or_default(),
            output: self.output.unwrap_or_default(),
            trace_type: self.trace_type.unwrap_or_default(),
            call_type: self.call_type.unwrap_or_default(),
            reward_type: self.reward_type.unwrap_or_default(),
            gas,
            gas_used: self.gas_used.unwrap_or_default().max(0) as u64,
            subtraces: self.sub_traces.unwrap_or_default().max(0) as u64,
            trace_address: self.trace_address.unwrap_or_default(),
            error: self.error.unwrap_or_default(),
        }
    }
}

/// Orders rows by transaction position, then trace address compared
/// numerically, so `[2]` sorts before `[10]`.
pub fn sort_rows(rows: &mut [TraceRow]) {
    rows.sort_by_cached_key(TraceRow::order_key);
}

/// Whether `chain` can be used unquoted as a schema name.
pub fn is_valid_chain(chain: &str) -> bool {
    let mut chars = chain.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
        })
        && chain.len() <= 63
}

/// [`TraceStore`] over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgTraceStore {
    pool: PgPool,
    block_query: Arc<str>,
    tx_query: Arc<str>,
    sink: Arc<dyn DiagnosticSink>,
}

impl PgTraceStore {
    /// Builds a lazily connected pool: no connection is opened until the
    /// first query.
    pub fn connect_lazy(
        config: &DatabaseConfig,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, StoreError> {
        let options = PgConnectOptions::from_str(&config.dsn)?
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, config.slow_threshold);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_lazy_with(options);

        Self::with_pool(pool, &config.chain, sink)
    }

    pub fn with_pool(
        pool: PgPool,
        chain: &str,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, StoreError> {
        if !is_valid_chain(chain) {
            return Err(StoreError::InvalidChain(chain.to_string()));
        }
        let block_query = select_traces(chain, false);
        let tx_query = select_traces(chain, true);
        info!(event = "trace store ready", table = %format!("{chain}.traces"));
        Ok(Self {
            pool,
            block_query: block_query.into(),
            tx_query: tx_query.into(),
            sink,
        })
    }
}

fn select_traces(chain: &str, by_tx: bool) -> String {
    let tx_filter = if by_tx { " AND txhash = $3" } else { "" };
    format!(
        "SELECT EXTRACT(EPOCH FROM block_timestamp)::bigint AS block_timestamp, \
         blknum::bigint AS blknum, txhash, txpos::bigint AS txpos, \
         from_address, to_address, value::text AS value, input, output, \
         trace_type, call_type, reward_type, gas::text AS gas, \
         gas_used::bigint AS gas_used, sub_traces::bigint AS sub_traces, \
         trace_address, error \
         FROM {chain}.traces \
         WHERE block_timestamp = to_timestamp($1) AND blknum = $2{tx_filter} \
         ORDER BY txpos ASC, trace_address ASC"
    )
}

#[async_trait]
impl TraceStore for PgTraceStore {
    async fn traces(
        &self,
        header: &Header,
        tx_hash: Option<B256>,
    ) -> Result<Vec<TraceRow>, StoreError> {
        let timestamp = header.timestamp as f64;
        let number = i64::try_from(header.number).unwrap_or(i64::MAX);

        let records: Vec<TraceRecord> = match tx_hash {
            Some(hash) => {
                sqlx::query_as(&self.tx_query)
                    .bind(timestamp)
                    .bind(number)
                    .bind(hash.to_string())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as(&self.block_query)
                    .bind(timestamp)
                    .bind(number)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut rows: Vec<TraceRow> = records
            .into_iter()
            .map(|r| r.into_row(self.sink.as_ref()))
            .collect();
        sort_rows(&mut rows);
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
