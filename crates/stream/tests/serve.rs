mod common;

use std::time::Duration;

use common::{Written, init_tracing, settle};
use http::header::CONTENT_LENGTH;
use http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use micro_http_stream::connection::{AdapterConfig, StreamAdapter};
use micro_http_stream::handler::{make_handler, serve};
use micro_http_stream::protocol::{BoxError, InboundRequest, OutboundResponse};

async fn echo(request: InboundRequest) -> Result<OutboundResponse, BoxError> {
    let path = request.uri().path().to_owned();
    let body = match request {
        InboundRequest::Full(request) => request.into_body(),
        InboundRequest::Streamed(request) => request.into_body().collect().await?.to_bytes(),
    };

    // later requests finish first
    if path == "/slow" {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    Ok(OutboundResponse::full(Response::new(body)))
}

async fn fail(_request: InboundRequest) -> Result<OutboundResponse, BoxError> {
    Err("handler failed".into())
}

#[tokio::test]
async fn pipelined_handlers_answer_in_request_order() {
    init_tracing();
    let (transport, peer) = common::transport();
    let (adapter, exchange) = StreamAdapter::with_config(transport, AdapterConfig::new().request_buffer(4));
    let connection = tokio::spawn(adapter.process());

    for (path, body) in [("/slow", &b"first"[..]), ("/fast", &b"second"[..]), ("/fast", &b"third"[..])] {
        peer.send_head(Request::builder().method("POST").uri(path).header(CONTENT_LENGTH, body.len()).body(()).unwrap());
        peer.send_chunk(body);
        peer.send_eof();
    }
    peer.close_read();

    let handler = make_handler(echo);
    serve(exchange, &handler, 4).await.unwrap();
    connection.await.unwrap().unwrap();

    let chunks: Vec<_> = peer
        .written()
        .into_iter()
        .filter_map(|written| match written {
            Written::Chunk(bytes) => Some(bytes),
            _ => None,
        })
        .collect();
    assert_eq!(chunks, [&b"first"[..], b"second", b"third"]);
    assert!(peer.is_closed());
}

#[tokio::test]
async fn failing_handler_is_answered_with_500() {
    init_tracing();
    let (transport, peer) = common::transport();
    let (adapter, exchange) = StreamAdapter::new(transport);
    let connection = tokio::spawn(adapter.process());

    peer.send_head(Request::builder().uri("/").body(()).unwrap());
    let handler = make_handler(fail);
    let serving = tokio::spawn(async move { serve(exchange, &handler, 1).await });
    settle().await;

    assert_eq!(peer.statuses(), [StatusCode::INTERNAL_SERVER_ERROR]);
    assert_eq!(peer.written()[1], Written::Eof);
    assert!(!peer.is_closed());

    peer.close_read();
    serving.await.unwrap().unwrap();
    connection.await.unwrap().unwrap();
    assert_eq!(peer.written().len(), 2);
}
