// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

/// The subset of a block header the trace service relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Header {
    pub number: u64,
    pub hash: B256,
    /// Seconds since the unix epoch.
    pub timestamp: u64,
}

impl Header {
    pub fn new(number: u64, hash: B256, timestamp: u64) -> Self {
        Self {
            number,
            hash,
            timestamp,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.number == 0
    }
}
