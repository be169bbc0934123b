// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! HTTP middleware mounted in front of the JSON-RPC servers.

use std::net::IpAddr;

use http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use jsonrpsee::server::{HttpBody, HttpResponse};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::validate_request::ValidateRequest;
use tracing::warn;

use crate::jwt::{JwtError, JwtSecret};

/// Error thrown when parsing cors domains went wrong
#[derive(Debug, thiserror::Error)]
pub enum CorsDomainError {
    #[error("{domain} is an invalid header value")]
    InvalidHeader { domain: String },
    #[error("Wildcard origin (`*`) cannot be passed as part of a list: {input}")]
    WildCardNotAllowed { input: String },
}

/// Creates a [`CorsLayer`] from the configured domains.
///
/// Returns `None` when no domain is configured, in which case no CORS
/// headers are emitted at all.
pub fn create_cors_layer(
    domains: &[String],
) -> Result<Option<CorsLayer>, CorsDomainError> {
    let domains: Vec<&str> = domains
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .collect();

    let cors = match domains.as_slice() {
        [] => return Ok(None),
        ["*"] => CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_origin(Any)
            .allow_headers(Any),
        _ => {
            if domains.contains(&"*") {
                return Err(CorsDomainError::WildCardNotAllowed {
                    input: domains.join(","),
                });
            }

            let origins = domains
                .iter()
                .map(|domain| {
                    domain.parse::<HeaderValue>().map_err(|_| {
                        CorsDomainError::InvalidHeader {
                            domain: domain.to_string(),
                        }
                    })
                })
                .collect::<Result<Vec<HeaderValue>, _>>()?;

            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_origin(AllowOrigin::list(origins))
                .allow_headers(Any)
        }
    };
    Ok(Some(cors))
}

/// WebSocket specific acceptance rules.
#[derive(Clone, Debug, Default)]
pub struct WsRules {
    pub prefix: String,
    pub origins: Vec<String>,
}

/// Request gate applied before a request reaches the JSON-RPC service.
///
/// In order, it checks the JWT bearer token (authenticated endpoints only),
/// the `Host` header against the virtual hosts, the protocol (plain HTTP or
/// a WebSocket upgrade) against what the endpoint serves, the path prefix
/// and, for WebSocket upgrades, the `Origin` header.
#[derive(Clone, Debug, Default)]
pub struct RequestFilter {
    jwt: Option<JwtSecret>,
    vhosts: Vec<String>,
    http_prefix: Option<String>,
    ws: Option<WsRules>,
}

impl RequestFilter {
    pub fn new(vhosts: Vec<String>) -> Self {
        Self {
            vhosts,
            ..Default::default()
        }
    }

    pub fn with_jwt(mut self, secret: JwtSecret) -> Self {
        self.jwt = Some(secret);
        self
    }

    pub fn with_http(mut self, prefix: impl Into<String>) -> Self {
        self.http_prefix = Some(prefix.into());
        self
    }

    pub fn with_ws(mut self, rules: WsRules) -> Self {
        self.ws = Some(rules);
        self
    }

    fn check(&self, headers: &HeaderMap, path: &str) -> Result<(), Reject> {
        if let Some(secret) = &self.jwt {
            let token = get_bearer(headers)
                .ok_or(JwtError::MissingOrInvalidAuthorizationHeader)
                .and_then(|token| secret.validate(&token).map(|_| token));
            if let Err(e) = token {
                warn!(event = "JWT validation failed", error = %e);
                return Err(Reject::new(StatusCode::UNAUTHORIZED, e));
            }
        }

        if !vhost_allowed(&self.vhosts, headers) {
            return Err(Reject::new(
                StatusCode::FORBIDDEN,
                "invalid host specified",
            ));
        }

        if is_ws_upgrade(headers) {
            let Some(ws) = &self.ws else {
                return Err(Reject::new(
                    StatusCode::BAD_REQUEST,
                    "websocket not enabled on this endpoint",
                ));
            };
            if !prefix_matches(&ws.prefix, path) {
                return Err(Reject::new(StatusCode::NOT_FOUND, "not found"));
            }
            if !origin_allowed(&ws.origins, headers) {
                return Err(Reject::new(
                    StatusCode::FORBIDDEN,
                    "origin not allowed",
                ));
            }
            return Ok(());
        }

        match &self.http_prefix {
            Some(prefix) if prefix_matches(prefix, path) => Ok(()),
            Some(_) => Err(Reject::new(StatusCode::NOT_FOUND, "not found")),
            None => Err(Reject::new(
                StatusCode::BAD_REQUEST,
                "websocket upgrade required",
            )),
        }
    }
}

impl<B> ValidateRequest<B> for RequestFilter {
    type ResponseBody = HttpBody;

    fn validate(
        &mut self,
        request: &mut Request<B>,
    ) -> Result<(), HttpResponse<Self::ResponseBody>> {
        self.check(request.headers(), request.uri().path())
            .map_err(Reject::into_response)
    }
}

#[derive(Debug)]
struct Reject {
    status: StatusCode,
    message: String,
}

impl Reject {
    fn new(status: StatusCode, message: impl ToString) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }

    fn into_response(self) -> HttpResponse {
        let mut response = HttpResponse::new(HttpBody::from(self.message));
        *response.status_mut() = self.status;
        response
    }
}

/// Retrieves the bearer token of an `Authorization` header.
fn get_bearer(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    auth.strip_prefix("Bearer ").map(|token| token.trim().to_owned())
}

/// Whether the request path falls under `prefix`. An empty prefix only
/// accepts the root path.
pub fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix.is_empty() {
        return path == "/";
    }
    path.starts_with(prefix)
}

fn is_ws_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

/// Host name of a `Host` header value, without port.
fn host_name(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

/// Requests addressed by IP, or without a `Host` header, always pass; named
/// hosts must be listed unless the list contains `*`.
fn vhost_allowed(vhosts: &[String], headers: &HeaderMap) -> bool {
    let Some(host) = headers.get(header::HOST).and_then(|v| v.to_str().ok())
    else {
        return true;
    };
    let name = host_name(host);
    if name.parse::<IpAddr>().is_ok() {
        return true;
    }
    vhosts
        .iter()
        .any(|v| v == "*" || v.eq_ignore_ascii_case(name))
}

/// Browsers always send `Origin` on WebSocket upgrades; other clients may
/// omit it and are accepted. Without configured origins only localhost
/// pages may connect.
fn origin_allowed(origins: &[String], headers: &HeaderMap) -> bool {
    let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok())
    else {
        return true;
    };
    if origins.is_empty() {
        return url::Url::parse(origin)
            .ok()
            .and_then(|url| url.host_str().map(str::to_owned))
            .is_some_and(|host| {
                matches!(host.as_str(), "localhost" | "127.0.0.1" | "[::1]")
            });
    }
    origins.iter().any(|allowed| {
        allowed == "*"
            || allowed.eq_ignore_ascii_case(origin)
            || url::Url::parse(origin)
                .ok()
                .and_then(|url| url.host_str().map(str::to_owned))
                .is_some_and(|host| allowed.eq_ignore_ascii_case(&host))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::Claims;
    use assert_matches::assert_matches;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(name.clone(), value.parse().unwrap());
        }
        headers
    }

    fn ws_headers(origin: Option<&str>) -> HeaderMap {
        let mut h = headers(&[(header::UPGRADE, "websocket")]);
        if let Some(origin) = origin {
            h.insert(header::ORIGIN, origin.parse().unwrap());
        }
        h
    }

    #[test]
    fn auth_header_available() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer foo")]);
        assert_eq!(get_bearer(&h).as_deref(), Some("foo"));
    }

    #[test]
    fn auth_header_not_available() {
        assert_eq!(get_bearer(&HeaderMap::new()), None);
    }

    #[test]
    fn auth_header_malformed() {
        let h = headers(&[(header::AUTHORIZATION, "Bea___rer foo")]);
        assert_eq!(get_bearer(&h), None);
    }

    #[test]
    fn cors_layer_from_domains() {
        assert!(create_cors_layer(&[]).unwrap().is_none());
        assert!(create_cors_layer(&["*".into()]).unwrap().is_some());
        assert!(create_cors_layer(&[
            "http://a.example".into(),
            "http://b.example".into()
        ])
        .unwrap()
        .is_some());
        assert_matches!(
            create_cors_layer(&["http://a.example".into(), "*".into()]),
            Err(CorsDomainError::WildCardNotAllowed { .. })
        );
    }

    #[test]
    fn prefix_rules() {
        assert!(prefix_matches("", "/"));
        assert!(!prefix_matches("", "/rpc"));
        assert!(prefix_matches("/rpc", "/rpc"));
        assert!(prefix_matches("/rpc", "/rpc/v1"));
        assert!(!prefix_matches("/rpc", "/"));
    }

    #[test]
    fn virtual_hosts() {
        let vhosts = vec!["localhost".to_string()];
        let host = |h: &str| headers(&[(header::HOST, h)]);

        assert!(vhost_allowed(&vhosts, &host("localhost:8545")));
        assert!(vhost_allowed(&vhosts, &host("LOCALHOST")));
        assert!(vhost_allowed(&vhosts, &host("127.0.0.1:8545")));
        assert!(vhost_allowed(&vhosts, &host("[::1]:8545")));
        assert!(!vhost_allowed(&vhosts, &host("evil.example")));
        assert!(vhost_allowed(&["*".into()], &host("evil.example")));
        assert!(vhost_allowed(&vhosts, &HeaderMap::new()));
    }

    #[test]
    fn websocket_origins() {
        assert!(origin_allowed(&[], &ws_headers(None)));
        assert!(origin_allowed(&[], &ws_headers(Some("http://localhost:3000"))));
        assert!(!origin_allowed(&[], &ws_headers(Some("http://evil.example"))));

        let allowed = vec!["https://app.example".to_string()];
        assert!(origin_allowed(
            &allowed,
            &ws_headers(Some("https://app.example"))
        ));
        assert!(!origin_allowed(
            &allowed,
            &ws_headers(Some("https://other.example"))
        ));
        assert!(origin_allowed(
            &["*".into()],
            &ws_headers(Some("https://other.example"))
        ));
    }

    #[test]
    fn filter_routes_by_protocol() {
        let http_only = RequestFilter::new(vec!["*".into()]).with_http("");
        assert!(http_only.check(&HeaderMap::new(), "/").is_ok());
        assert_matches!(
            http_only.check(&ws_headers(None), "/"),
            Err(Reject { status: StatusCode::BAD_REQUEST, .. })
        );

        let ws_only = RequestFilter::new(vec!["*".into()]).with_ws(WsRules {
            prefix: "/ws".into(),
            origins: vec![],
        });
        assert!(ws_only.check(&ws_headers(None), "/ws").is_ok());
        assert_matches!(
            ws_only.check(&ws_headers(None), "/"),
            Err(Reject { status: StatusCode::NOT_FOUND, .. })
        );
        assert_matches!(
            ws_only.check(&HeaderMap::new(), "/ws"),
            Err(Reject { status: StatusCode::BAD_REQUEST, .. })
        );
    }

    #[test]
    fn filter_requires_jwt() {
        let secret = JwtSecret::random();
        let filter = RequestFilter::new(vec!["*".into()])
            .with_http("")
            .with_jwt(secret.clone());

        assert_matches!(
            filter.check(&HeaderMap::new(), "/"),
            Err(Reject { status: StatusCode::UNAUTHORIZED, .. })
        );

        let token = secret.encode(&Claims::now()).unwrap();
        let bearer = format!("Bearer {token}");
        let h = headers(&[(header::AUTHORIZATION, bearer.as_str())]);
        assert!(filter.check(&h, "/").is_ok());
    }
}
