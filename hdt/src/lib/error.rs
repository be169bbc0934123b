// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Errors returned to JSON-RPC clients.
//!
//! Handlers work with [`Error`] and convert it with
//! [`Error::into_error_object`] right before answering:
//!
//! | Code   | Meaning                                          |
//! |--------|--------------------------------------------------|
//! | -32602 | invalid params                                   |
//! | -32000 | block or transaction not found, pending, genesis |
//! | -32002 | upstream node error                              |
//! | -32003 | trace store error                                |
//! | -32004 | timeout or shutdown                              |

use jsonrpsee::types::error::ErrorCode;
use jsonrpsee::types::ErrorObjectOwned;
use thiserror::Error;

use crate::backend::BackendError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl Error {
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidParams(_) => ErrorCode::InvalidParams.code(),
            Error::Backend(e) => match e {
                BackendError::NotFound
                | BackendError::PendingTransaction
                | BackendError::BlockNotFound(_)
                | BackendError::Genesis => -32000,
                BackendError::Chain(_) => -32002,
                BackendError::Store(_) => -32003,
                BackendError::Timeout(_) | BackendError::Cancelled => -32004,
            },
        }
    }

    pub fn into_error_object(&self) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(self.code(), self.to_string(), None::<()>)
    }
}

impl From<Error> for ErrorObjectOwned {
    fn from(e: Error) -> Self {
        e.into_error_object()
    }
}
