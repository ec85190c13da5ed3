use std::time::Instant;

use axum::{
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use pricebook_core::RequestId;
use pricebook_products::CustomerContext;

use crate::context::RequestContext;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Optional caller-supplied customer reference used for pricing.
pub const CUSTOMER_REF_HEADER: HeaderName = HeaderName::from_static("x-customer-ref");

/// Attach a [`RequestContext`] to every request and tag the response with its id.
///
/// A well-formed incoming `x-request-id` is reused; anything else gets a fresh
/// UUIDv7.
pub async fn request_context_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let request_id = extract_request_id(req.headers()).unwrap_or_default();
    let customer = extract_customer(req.headers());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    req.extensions_mut().insert(RequestContext::new(customer));

    async move {
        let started = Instant::now();
        let mut response = next.run(req).await;

        tracing::info!(
            status = response.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}

fn extract_request_id(headers: &HeaderMap) -> Option<RequestId> {
    headers
        .get(&REQUEST_ID_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn extract_customer(headers: &HeaderMap) -> CustomerContext {
    headers
        .get(&CUSTOMER_REF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(CustomerContext::for_customer)
        .unwrap_or_default()
}
