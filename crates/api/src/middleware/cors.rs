//! CORS layer built from [`AllowedOrigins`].

use axum::http::{HeaderValue, Method, header, request::Parts};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::AllowedOrigins;

/// Browser-facing CORS policy.
///
/// Bearer tokens travel in the `Authorization` header, never in cookies, so
/// credentials are not allowed.
#[must_use]
pub fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let origins = origins.clone();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin.to_str().is_ok_and(|o| origins.allows(o))
            },
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
