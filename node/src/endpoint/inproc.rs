// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::sync::Arc;

use async_trait::async_trait;
use jsonrpsee::core::traits::ToRpcParams;
use jsonrpsee::Methods;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;

use super::Endpoint;
use crate::error::Error;

/// Method table shared between the in-process endpoint and its clients.
#[derive(Clone, Debug, Default)]
pub struct InProcHandler {
    methods: Arc<RwLock<Option<Methods>>>,
}

impl InProcHandler {
    /// Currently mounted methods, if the endpoint is running.
    pub fn methods(&self) -> Option<Methods> {
        self.methods.read().clone()
    }

    fn mount(&self, methods: Option<Methods>) {
        *self.methods.write() = methods;
    }
}

/// Serves the node's methods to callers living in the same process.
#[derive(Debug, Default)]
pub struct InProcEndpoint {
    handler: InProcHandler,
}

impl InProcEndpoint {
    pub fn new(handler: InProcHandler) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl Endpoint for InProcEndpoint {
    fn name(&self) -> &'static str {
        "in-process"
    }

    async fn start(&mut self, methods: Methods) -> Result<(), Error> {
        self.handler.mount(Some(methods));
        Ok(())
    }

    async fn stop(&mut self) {
        self.handler.mount(None);
    }

    fn listen_addr(&self) -> Option<String> {
        None
    }
}

/// Client calling the node's methods directly, without a transport.
#[derive(Clone, Debug)]
pub struct InProcClient {
    handler: InProcHandler,
}

impl InProcClient {
    pub(crate) fn new(handler: InProcHandler) -> Self {
        Self { handler }
    }

    /// Calls `method` and deserializes its result.
    pub async fn request<R, P>(&self, method: &str, params: P) -> Result<R, Error>
    where
        R: DeserializeOwned + Clone,
        P: ToRpcParams + Send,
    {
        let methods = self.handler.methods().ok_or(Error::InProcUnavailable)?;
        methods
            .call(method, params)
            .await
            .map_err(|e| Error::InProcCall(e.to_string()))
    }

    /// Handles a raw JSON-RPC request object and returns the raw response.
    pub async fn raw_request(&self, request: &str) -> Result<String, Error> {
        let methods = self.handler.methods().ok_or(Error::InProcUnavailable)?;
        let (response, _) = methods
            .raw_json_request(request, 1)
            .await
            .map_err(|e| Error::InProcCall(e.to_string()))?;
        Ok(response)
    }
}
