use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::Config;

const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

const ALLOWED_HEADERS: [HeaderName; 2] = [header::CONTENT_TYPE, header::AUTHORIZATION];

const ALLOWED_METHODS_VALUE: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS_VALUE: &str = "Content-Type, Authorization";

/// CORS layer wrapped around the whole router.
///
/// Any `OPTIONS` request is answered here with 200 and an empty body, so
/// handlers never see preflights.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(ALLOWED_HEADERS);

    let Some(origins_str) = &config.cors_allowed_origins else {
        // Wildcard; set EVLOG_CORS_ORIGINS to restrict.
        return base.allow_origin(Any);
    };

    let origins: Vec<HeaderValue> = origins_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if origins.is_empty() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(origins)
    }
}

/// `CorsLayer` only sends the allowed methods and headers on preflights;
/// these two layers add them to every other response as well.
pub fn allow_lists_on_every_response() -> [SetResponseHeaderLayer<HeaderValue>; 2] {
    [
        SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS_VALUE),
        ),
        SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS_VALUE),
        ),
    ]
}
