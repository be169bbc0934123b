// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Row-scoped findings about malformed trace data.
//!
//! Malformed rows never abort frame assembly. Instead every problem is
//! handed to the [`DiagnosticSink`] the assembler was built with.

use std::fmt::Debug;

use parking_lot::Mutex;
use tracing::warn;

use crate::address::AddressParseError;

/// A malformed value found while turning a row into a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A trace address component is not a number.
    MalformedTraceAddress {
        block_number: u64,
        tx_position: u64,
        text: String,
        error: AddressParseError,
    },
    /// The trace type is none of the known kinds.
    UnrecognizedTraceKind {
        block_number: u64,
        tx_position: u64,
        trace_type: String,
    },
    /// A hex column could not be decoded. `field` names the column.
    InvalidHex {
        block_number: u64,
        tx_position: u64,
        field: &'static str,
        reason: String,
    },
    /// A numeric column does not fit the type it decodes to.
    InvalidNumber {
        block_number: u64,
        tx_position: u64,
        field: &'static str,
        text: String,
    },
}

impl Diagnostic {
    pub fn block_number(&self) -> u64 {
        match self {
            Diagnostic::MalformedTraceAddress { block_number, .. }
            | Diagnostic::UnrecognizedTraceKind { block_number, .. }
            | Diagnostic::InvalidHex { block_number, .. }
            | Diagnostic::InvalidNumber { block_number, .. } => *block_number,
        }
    }
}

/// Destination of assembly diagnostics.
pub trait DiagnosticSink: Send + Sync + Debug {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to the `tracing` subscriber at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::MalformedTraceAddress {
                block_number,
                tx_position,
                text,
                error,
            } => warn!(
                event = "failed to parse trace address",
                block_number,
                tx_position,
                %text,
                %error,
            ),
            Diagnostic::UnrecognizedTraceKind {
                block_number,
                tx_position,
                trace_type,
            } => warn!(
                event = "unrecognized call frame",
                block_number,
                tx_position,
                %trace_type,
            ),
            Diagnostic::InvalidHex {
                block_number,
                tx_position,
                field,
                reason,
            } => warn!(
                event = "invalid hex column",
                block_number,
                tx_position,
                field,
                %reason,
            ),
            Diagnostic::InvalidNumber {
                block_number,
                tx_position,
                field,
                text,
            } => warn!(
                event = "invalid numeric column",
                block_number,
                tx_position,
                field,
                %text,
            ),
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the diagnostics collected so far, leaving the sink empty.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock())
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().push(diagnostic);
    }
}
