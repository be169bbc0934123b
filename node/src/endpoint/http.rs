// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::net::SocketAddr;

use async_trait::async_trait;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::Methods;
use tower_http::validate_request::ValidateRequestHeaderLayer;
use tracing::{debug, info};

use super::Endpoint;
use crate::config::{AuthConfig, HttpConfig, LimitsConfig, WsConfig};
use crate::error::Error;
use crate::jwt::JwtSecret;
use crate::middleware::{create_cors_layer, RequestFilter, WsRules};

/// Protocols accepted by an [`HttpEndpoint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocols {
    Http,
    Ws,
    Both,
}

/// JSON-RPC over HTTP and/or WebSocket on a TCP port.
pub struct HttpEndpoint {
    name: &'static str,
    addr: String,
    protocols: Protocols,
    cors: Vec<String>,
    filter: RequestFilter,
    limits: LimitsConfig,
    local_addr: Option<SocketAddr>,
    handle: Option<ServerHandle>,
}

impl HttpEndpoint {
    /// Plain HTTP server. When `ws` is given, WebSocket upgrades are
    /// accepted on the same port under the WebSocket rules.
    pub fn http(
        host: &str,
        config: &HttpConfig,
        ws: Option<&WsConfig>,
        limits: LimitsConfig,
    ) -> Self {
        let mut filter =
            RequestFilter::new(config.vhosts.clone()).with_http(&config.prefix);
        let protocols = match ws {
            Some(ws) => {
                filter = filter.with_ws(WsRules {
                    prefix: ws.prefix.clone(),
                    origins: ws.origins.clone(),
                });
                Protocols::Both
            }
            None => Protocols::Http,
        };
        Self::new(
            "HTTP",
            format!("{host}:{}", config.port),
            protocols,
            config.cors.clone(),
            filter,
            limits,
        )
    }

    /// WebSocket only server.
    pub fn ws(host: &str, config: &WsConfig, limits: LimitsConfig) -> Self {
        let filter = RequestFilter::new(vec!["*".to_string()]).with_ws(WsRules {
            prefix: config.prefix.clone(),
            origins: config.origins.clone(),
        });
        Self::new(
            "WebSocket",
            format!("{host}:{}", config.port),
            Protocols::Ws,
            vec![],
            filter,
            limits,
        )
    }

    /// HTTP and WebSocket server requiring a JWT signed with `secret`.
    pub fn auth(
        host: &str,
        config: &AuthConfig,
        secret: JwtSecret,
        limits: LimitsConfig,
    ) -> Self {
        let filter = RequestFilter::new(config.vhosts.clone())
            .with_jwt(secret)
            .with_http("")
            .with_ws(WsRules {
                prefix: String::new(),
                origins: vec!["*".to_string()],
            });
        Self::new(
            "authenticated",
            format!("{host}:{}", config.port),
            Protocols::Both,
            vec![],
            filter,
            limits,
        )
    }

    fn new(
        name: &'static str,
        addr: String,
        protocols: Protocols,
        cors: Vec<String>,
        filter: RequestFilter,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            name,
            addr,
            protocols,
            cors,
            filter,
            limits,
            local_addr: None,
            handle: None,
        }
    }

    pub fn protocols(&self) -> Protocols {
        self.protocols
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    fn bind_error(&self, source: std::io::Error) -> Error {
        Error::Bind {
            endpoint: self.name,
            addr: self.addr.clone(),
            source,
        }
    }
}

#[async_trait]
impl Endpoint for HttpEndpoint {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn start(&mut self, methods: Methods) -> Result<(), Error> {
        let cors = create_cors_layer(&self.cors)?;
        let middleware = tower::ServiceBuilder::new()
            .option_layer(cors)
            .layer(ValidateRequestHeaderLayer::custom(self.filter.clone()));

        let builder = Server::builder()
            .max_request_body_size(self.limits.max_request_body_size)
            .max_response_body_size(self.limits.max_response_body_size)
            .max_connections(self.limits.max_connections)
            .set_http_middleware(middleware);
        let builder = match self.protocols {
            Protocols::Http => builder.http_only(),
            Protocols::Ws => builder.ws_only(),
            Protocols::Both => builder,
        };

        let server = builder
            .build(self.addr.as_str())
            .await
            .map_err(|e| self.bind_error(e))?;
        let local_addr = server.local_addr().map_err(|e| self.bind_error(e))?;

        self.handle = Some(server.start(methods));
        self.local_addr = Some(local_addr);

        info!(
            event = "endpoint started",
            endpoint = self.name,
            addr = %local_addr,
            protocols = ?self.protocols,
        );
        Ok(())
    }

    async fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.stop().is_err() {
            debug!(event = "endpoint already stopped", endpoint = self.name);
        }
        handle.stopped().await;
        info!(
            event = "endpoint stopped",
            endpoint = self.name,
            addr = ?self.local_addr,
        );
        self.local_addr = None;
    }

    fn listen_addr(&self) -> Option<String> {
        self.local_addr.map(|addr| addr.to_string())
    }
}
