// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::address::TraceAddress;

/// Kind of an indexed trace step, as stored in the `trace_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceKind {
    Call,
    StaticCall,
    CallCode,
    DelegateCall,
    Create,
    Create2,
    SelfDestruct,
    Reward,
}

impl TraceKind {
    /// Recognizes a trace type regardless of case. `SUICIDE` is the legacy
    /// name of `SELFDESTRUCT`.
    pub fn parse(trace_type: &str) -> Option<Self> {
        let kind = match trace_type.to_ascii_uppercase().as_str() {
            "CALL" => TraceKind::Call,
            "STATICCALL" => TraceKind::StaticCall,
            "CALLCODE" => TraceKind::CallCode,
            "DELEGATECALL" => TraceKind::DelegateCall,
            "CREATE" => TraceKind::Create,
            "CREATE2" => TraceKind::Create2,
            "SELFDESTRUCT" | "SUICIDE" => TraceKind::SelfDestruct,
            "REWARD" => TraceKind::Reward,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_call(&self) -> bool {
        matches!(
            self,
            TraceKind::Call
                | TraceKind::StaticCall
                | TraceKind::CallCode
                | TraceKind::DelegateCall
        )
    }

    pub fn is_create(&self) -> bool {
        matches!(self, TraceKind::Create | TraceKind::Create2)
    }
}

impl FromStr for TraceKind {
    type Err = UnknownTraceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownTraceKind(s.to_string()))
    }
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TraceKind::Call => "CALL",
            TraceKind::StaticCall => "STATICCALL",
            TraceKind::CallCode => "CALLCODE",
            TraceKind::DelegateCall => "DELEGATECALL",
            TraceKind::Create => "CREATE",
            TraceKind::Create2 => "CREATE2",
            TraceKind::SelfDestruct => "SELFDESTRUCT",
            TraceKind::Reward => "REWARD",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized trace type {0:?}")]
pub struct UnknownTraceKind(pub String);

/// One flat record of the trace table, describing a single EVM call step.
///
/// Text columns are kept as stored; they are decoded while assembling the
/// call frame so a malformed value only affects its own row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRow {
    /// Block timestamp, in seconds since the unix epoch.
    pub block_timestamp: u64,
    pub block_number: u64,
    pub tx_hash: Option<String>,
    pub tx_position: u64,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub value: Option<U256>,
    /// Hex encoded call input.
    pub input: String,
    /// Hex encoded call output.
    pub output: String,
    pub trace_type: String,
    pub call_type: String,
    pub reward_type: String,
    pub gas: Option<u64>,
    pub gas_used: u64,
    pub subtraces: u64,
    /// Textual trace address, e.g. `[0,1]`.
    pub trace_address: String,
    pub error: String,
}

impl TraceRow {
    pub fn kind(&self) -> Option<TraceKind> {
        TraceKind::parse(&self.trace_type)
    }

    /// Key the rows of one block are ordered by: transaction position
    /// first, then trace address compared component-wise.
    ///
    /// Malformed address components count as `0`.
    pub fn order_key(&self) -> (u64, TraceAddress) {
        let address = TraceAddress::parse_lossy(&self.trace_address, |_| {});
        (self.tx_position, address)
    }
}
