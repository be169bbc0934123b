// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Parity-style flat call frames.
//!
//! The JSON shape follows what `trace_block` and `trace_transaction` return
//! on parity/erigon style clients: quantities and byte strings are 0x-hex,
//! the block number and transaction position are plain numbers.

use alloy::primitives::{Address, Bytes, B256, U256, U64};
use serde::{Deserialize, Serialize};

use crate::address::TraceAddress;

/// One call, create, self-destruct or reward step of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    pub action: Action,
    pub block_hash: B256,
    pub block_number: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TraceResult>,
    pub subtraces: u64,
    pub trace_address: TraceAddress,
    pub transaction_hash: B256,
    pub transaction_position: u64,
    /// Trace type exactly as indexed, e.g. `call` or `create`.
    #[serde(rename = "type")]
    pub trace_type: String,
}

/// What the frame did.
///
/// Variants are untagged on the wire; their field sets are disjoint enough
/// to be told apart when reading a frame back. `Empty` is the action of a
/// frame whose trace type was not recognized and serializes as `{}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    Call(CallAction),
    Create(CreateAction),
    SelfDestruct(SelfDestructAction),
    Reward(RewardAction),
    Empty {},
}

impl Action {
    pub fn is_empty(&self) -> bool {
        matches!(self, Action::Empty {})
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAction {
    pub from: Address,
    pub to: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<U64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    pub input: Bytes,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub call_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAction {
    pub from: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<U64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    pub init: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfDestructAction {
    /// The self-destructed contract.
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<U256>,
    pub refund_address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardAction {
    pub author: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reward_type: String,
}

/// Outcome of a call or create frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraceResult {
    Create(CreateResult),
    Call(CallResult),
}

impl TraceResult {
    pub fn gas_used(&self) -> U64 {
        match self {
            TraceResult::Create(r) => r.gas_used,
            TraceResult::Call(r) => r.gas_used,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResult {
    pub gas_used: U64,
    pub output: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResult {
    pub gas_used: U64,
    pub code: Bytes,
    pub address: Address,
}
