// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! JSON-RPC namespaces served by HDT.

pub mod eth;
pub mod trace;

use std::sync::Arc;

use crate::backend::Backend;

pub use eth::{EthApiServer, EthRpc};
pub use trace::{TraceApiServer, TraceRpc};

/// Namespaces to register on the node, all backed by `backend`.
pub fn apis(backend: Arc<Backend>) -> Vec<node::Api> {
    vec![
        node::Api::new("eth", EthRpc::new(backend.clone()).into_rpc()),
        node::Api::new("trace", TraceRpc::new(backend).into_rpc()),
    ]
}
