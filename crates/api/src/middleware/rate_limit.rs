//! Rate limiting for the authentication endpoints, using governor and
//! `tower_governor`.
//!
//! Login and registration are the only unauthenticated writes, so they get a
//! strict per-client limit (~10/min). Contact routes are behind a bearer token
//! and are not limited here.
//!
//! Clients are keyed by socket peer address unless a reverse proxy header is
//! configured (`API_CLIENT_IP_HEADER`); client-supplied forwarding headers are
//! ignored otherwise.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, HeaderName, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::error::AppError;

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Key extractor that reads the client IP from a trusted proxy header when one
/// is configured, and from the socket peer address otherwise.
#[derive(Debug, Clone, Default)]
pub struct ClientIpKeyExtractor {
    trusted_header: Option<HeaderName>,
}

impl ClientIpKeyExtractor {
    /// Extractor trusting `header`, if any.
    #[must_use]
    pub const fn new(trusted_header: Option<HeaderName>) -> Self {
        Self { trusted_header }
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let ip = match &self.trusted_header {
            Some(name) => proxied_ip(req.headers(), name).or(peer),
            None => peer,
        };
        ip.ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Client IP from a proxy header.
///
/// For list-valued headers such as `X-Forwarded-For` the last hop is the one
/// the trusted proxy appended; earlier entries came from the client.
fn proxied_ip(headers: &HeaderMap, name: &HeaderName) -> Option<IpAddr> {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(','))
        .next_back()
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(6)` and `burst_size(5)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter(trusted_header: Option<HeaderName>) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor::new(trusted_header))
        .per_second(6) // Replenish 1 token every 6 seconds (~10/minute)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Re-render governor's plain-text 429 as the API's JSON error, keeping its
/// `retry-after` and `x-ratelimit-*` headers.
pub async fn rate_limited_as_json(response: Response) -> Response {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return response;
    }

    let (parts, _) = response.into_parts();
    let mut json = AppError::RateLimited.into_response();
    for (name, value) in &parts.headers {
        if name == "retry-after" || name.as_str().starts_with("x-ratelimit") {
            json.headers_mut().insert(name.clone(), value.clone());
        }
    }
    json
}
