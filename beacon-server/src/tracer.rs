//! Request spans for the HTTP surface.
//!
//! Each request gets one `http_request` span keyed by its matched route. The principal
//! middleware fills in `principal_id` once the caller is known, so every event logged
//! under a stream connection carries the recipient.

use std::time::Duration;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Request, Response, header::CONTENT_TYPE},
};
use tower_http::classify::{ServerErrorsAsFailures, ServerErrorsFailureClass, SharedClassifier};
use tower_http::trace::{DefaultOnBodyChunk, DefaultOnEos, MakeSpan, TraceLayer};
use tracing::{Span, debug, field, info, warn};

use crate::middleware::request_context::RequestContext;

type OnRequest = fn(&Request<Body>, &Span);
type OnResponse = fn(&Response<Body>, Duration, &Span);
type OnFailure = fn(ServerErrorsFailureClass, Duration, &Span);

pub type HttpTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    RequestSpan,
    OnRequest,
    OnResponse,
    DefaultOnBodyChunk,
    DefaultOnEos,
    OnFailure,
>;

#[derive(Clone, Copy, Debug, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map_or_else(|| request.uri().path(), MatchedPath::as_str);
        let request_id = request
            .extensions()
            .get::<RequestContext>()
            .map_or("-", |context| context.request_id.as_str());

        tracing::info_span!(
            "http_request",
            method = %request.method(),
            route = %route,
            request_id = %request_id,
            principal_id = field::Empty,
            status = field::Empty,
        )
    }
}

fn is_event_stream<B>(response: &Response<B>) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .is_some_and(|value| value.as_bytes().starts_with(b"text/event-stream"))
}

fn on_request(request: &Request<Body>, span: &Span) {
    let _entered = span.enter();
    debug!(query = request.uri().query().unwrap_or_default(), "request received");
}

fn on_response(response: &Response<Body>, latency: Duration, span: &Span) {
    span.record("status", response.status().as_u16());
    let _entered = span.enter();
    let latency_ms = latency.as_millis();
    // Headers of a push channel go out long before its body ends.
    if is_event_stream(response) {
        info!(latency_ms, "push channel opened");
    } else {
        info!(latency_ms, "request completed");
    }
}

fn on_failure(failure: ServerErrorsFailureClass, latency: Duration, span: &Span) {
    let _entered = span.enter();
    warn!(failure = %failure, latency_ms = latency.as_millis(), "request failed");
}

pub fn create_trace_layer() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_request(on_request as OnRequest)
        .on_response(on_response as OnResponse)
        .on_failure(on_failure as OnFailure)
}
