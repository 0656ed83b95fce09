use bytes::Bytes;
use http_body::SizeHint;
use tracing::{debug, trace};

use crate::connection::state::ConnectionState;
use crate::protocol::body::{BodyFeed, body_channel};
use crate::protocol::header::{content_length_or, is_chunked};
use crate::protocol::{InboundRequest, RequestHeader};

/// Turns an inbound request head into the request handed to the application.
///
/// Body-less requests are delivered as [`InboundRequest::Full`] right away.
/// Otherwise a [`StreamBody`](crate::protocol::body::StreamBody) is attached
/// and the returned [`BodyFeed`] receives the payload events that follow.
pub(crate) fn assemble(state: &mut ConnectionState, header: RequestHeader, body_buffer: usize) -> (InboundRequest, Option<BodyFeed>) {
    state.in_flight += 1;
    state.continue_state.on_request_head(header.is_100_continue_expected());

    if let Some(reason) = header.decode_failure() {
        debug!(reason, "request failed to decode, treating it as body-less");
    }

    let has_body = header.has_body();
    trace!(method = %header.method(), uri = %header.uri(), has_body, in_flight = state.in_flight, "request head received");
    state.last_request = Some(header.clone());

    if !has_body {
        return (InboundRequest::Full(header.body(Bytes::new())), None);
    }

    let size_hint = if is_chunked(header.headers()) {
        SizeHint::default()
    } else {
        SizeHint::with_exact(content_length_or(header.headers(), 0))
    };

    let (body, feed) = body_channel(body_buffer, size_hint);
    (InboundRequest::Streamed(header.body(body)), Some(feed))
}
