// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! HDT, the historical data tracer.
//!
//! Serves `trace_block`, `trace_transaction` and `eth_getBlockByNumber`
//! from traces indexed into PostgreSQL, using an upstream Ethereum node for
//! block metadata.

pub mod backend;
pub mod config;
pub mod error;
pub mod service;

pub use backend::Backend;
pub use config::Config;
pub use error::Error;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
