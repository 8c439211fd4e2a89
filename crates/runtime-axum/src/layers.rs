use axum::body::Body;
use axum::extract;
use axum::http::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace as tower_trace;
use std::net::SocketAddr;


/// Request span carrying method, uri, peer address and user agent
pub fn request_span(request: &Request<Body>) -> tracing::Span {
    // Can't use extractors since this isn't async
    let connect_info = request.extensions().get::<extract::ConnectInfo<SocketAddr>>()
        .map(|c| c.0);
    let agent = request.headers().get(axum::http::header::USER_AGENT);

    let span = tracing::debug_span!(
        "request", method = %request.method(), uri = %request.uri(), version = ?request.version(),
        ip = tracing::field::Empty, useragent = tracing::field::Empty,
    );
    if let Some(ip) = connect_info {
        span.record("ip", tracing::field::display(ip));
    }
    if let Some(agent) = agent {
        span.record("useragent", tracing::field::debug(agent));
    }
    span
}

pub fn make_trace_layer() -> tower_trace::TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    fn(&Request<Body>) -> tracing::Span,
    tower_trace::DefaultOnRequest,
    tower_trace::DefaultOnResponse,
> {
    tower_trace::TraceLayer::new(SharedClassifier::new(ServerErrorsAsFailures::default()))
        .make_span_with(request_span as fn(&Request<Body>) -> tracing::Span)
        .on_request(tower_trace::DefaultOnRequest::new())
        .on_response(
            tower_trace::DefaultOnResponse::new()
                .latency_unit(tower_http::LatencyUnit::Micros)
        )
}
