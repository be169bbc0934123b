// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Data types shared by the HDT trace service.
//!
//! Trace data is indexed offline into a relational table where every EVM
//! call step is one flat [`TraceRow`]. This crate turns those rows back into
//! parity-style [`CallFrame`]s, the unit returned by `trace_block` and
//! `trace_transaction`.

pub mod address;
pub mod assembler;
pub mod diagnostic;
pub mod frame;
pub mod header;
pub mod trace;

pub use address::{AddressParseError, TraceAddress};
pub use assembler::FrameAssembler;
pub use diagnostic::{
    CollectingSink, Diagnostic, DiagnosticSink, TracingSink,
};
pub use frame::{Action, CallFrame, TraceResult};
pub use header::Header;
pub use trace::{TraceKind, TraceRow};
