// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U64};

use crate::address::TraceAddress;
use crate::diagnostic::{Diagnostic, DiagnosticSink};
use crate::frame::{
    Action, CallAction, CallFrame, CallResult, CreateAction, CreateResult,
    RewardAction, SelfDestructAction, TraceResult,
};
use crate::trace::{TraceKind, TraceRow};

/// Error message of a plain EVM revert. A reverted frame keeps its result
/// because the output carries the revert reason.
pub const EXECUTION_REVERTED: &str = "execution reverted";

/// Turns flat trace rows into call frames.
///
/// Assembly is pure: one frame per row, in row order. Malformed columns are
/// reported to the diagnostic sink and replaced by empty values.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    sink: Arc<dyn DiagnosticSink>,
}

impl FrameAssembler {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }

    pub fn assemble(
        &self,
        rows: &[TraceRow],
        block_hash: B256,
    ) -> Vec<CallFrame> {
        rows.iter().map(|row| self.frame(row, block_hash)).collect()
    }

    pub fn frame(&self, row: &TraceRow, block_hash: B256) -> CallFrame {
        let trace_address =
            TraceAddress::parse_lossy(&row.trace_address, |error| {
                self.sink.report(Diagnostic::MalformedTraceAddress {
                    block_number: row.block_number,
                    tx_position: row.tx_position,
                    text: row.trace_address.clone(),
                    error,
                })
            });

        let from = self.address(row, "from_address", &row.from_address);
        let to = self.address(row, "to_address", &row.to_address);
        let input = self.bytes(row, "input", &row.input);
        let output = self.bytes(row, "output", &row.output);
        let gas = row.gas.map(U64::from);
        let gas_used = U64::from(row.gas_used);

        let (action, result) = match row.kind() {
            Some(kind) if kind.is_create() => (
                Action::Create(CreateAction {
                    from,
                    gas,
                    value: row.value,
                    init: input,
                }),
                Some(TraceResult::Create(CreateResult {
                    gas_used,
                    code: output,
                    address: to,
                })),
            ),
            Some(kind) if kind.is_call() => (
                Action::Call(CallAction {
                    from,
                    to,
                    gas,
                    value: row.value,
                    input,
                    call_type: row.call_type.clone(),
                }),
                Some(TraceResult::Call(CallResult { gas_used, output })),
            ),
            Some(TraceKind::SelfDestruct) => (
                Action::SelfDestruct(SelfDestructAction {
                    address: from,
                    balance: row.value,
                    refund_address: to,
                }),
                None,
            ),
            Some(TraceKind::Reward) => (
                Action::Reward(RewardAction {
                    author: to,
                    value: row.value,
                    reward_type: row.reward_type.clone(),
                }),
                None,
            ),
            _ => {
                self.sink.report(Diagnostic::UnrecognizedTraceKind {
                    block_number: row.block_number,
                    tx_position: row.tx_position,
                    trace_type: row.trace_type.clone(),
                });
                (Action::Empty {}, None)
            }
        };

        // Only a revert keeps its result, other failures would report
        // misleading output and gas figures.
        let result = match row.error.as_str() {
            "" | EXECUTION_REVERTED => result,
            _ => None,
        };

        let transaction_hash = match &row.tx_hash {
            Some(hash) => self.hash(row, hash),
            None => B256::ZERO,
        };

        CallFrame {
            action,
            block_hash,
            block_number: row.block_number,
            error: row.error.clone(),
            result,
            subtraces: row.subtraces,
            trace_address,
            transaction_hash,
            transaction_position: row.tx_position,
            trace_type: row.trace_type.clone(),
        }
    }

    fn bytes(&self, row: &TraceRow, field: &'static str, text: &str) -> Bytes {
        let text = text.trim();
        if text.is_empty() {
            return Bytes::new();
        }
        let digits = text.strip_prefix("0x").unwrap_or(text);
        match hex::decode(digits) {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                self.invalid(row, field, e.to_string());
                Bytes::new()
            }
        }
    }

    fn address(
        &self,
        row: &TraceRow,
        field: &'static str,
        text: &Option<String>,
    ) -> Address {
        let Some(text) = text.as_deref().map(str::trim) else {
            return Address::ZERO;
        };
        Address::from_str(text).unwrap_or_else(|e| {
            self.invalid(row, field, e.to_string());
            Address::ZERO
        })
    }

    fn hash(&self, row: &TraceRow, text: &str) -> B256 {
        B256::from_str(text.trim()).unwrap_or_else(|e| {
            self.invalid(row, "txhash", e.to_string());
            B256::ZERO
        })
    }

    fn invalid(&self, row: &TraceRow, field: &'static str, reason: String) {
        self.sink.report(Diagnostic::InvalidHex {
            block_number: row.block_number,
            tx_position: row.tx_position,
            field,
            reason,
        });
    }
}
