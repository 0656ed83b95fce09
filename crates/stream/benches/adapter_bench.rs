#[path = "../tests/common/mod.rs"]
mod common;

use std::hint::black_box;

use bytes::Bytes;
use criterion::{Criterion, criterion_group, criterion_main};
use http::header::CONTENT_LENGTH;
use http::{Request, Response};
use http_body_util::BodyExt;
use micro_http_stream::connection::{AdapterConfig, StreamAdapter};
use micro_http_stream::protocol::{InboundRequest, OutboundResponse};
use tokio::runtime::Runtime;

const PIPELINED: usize = 16;

async fn exchange_requests(bodies: bool) {
    let (transport, peer) = common::transport();
    let (adapter, mut exchange) = StreamAdapter::with_config(transport, AdapterConfig::new().request_buffer(PIPELINED));
    let connection = tokio::spawn(adapter.process());

    for _ in 0..PIPELINED {
        if bodies {
            peer.send_head(Request::builder().method("POST").uri("/").header(CONTENT_LENGTH, 11).body(()).unwrap());
            peer.send_chunk(b"hello world");
        } else {
            peer.send_head(Request::builder().uri("/").body(()).unwrap());
        }
        peer.send_eof();
    }
    peer.close_read();

    while let Some(request) = exchange.next_request().await {
        let body = match request {
            InboundRequest::Full(request) => request.into_body(),
            InboundRequest::Streamed(request) => request.into_body().collect().await.unwrap().to_bytes(),
        };
        exchange.submit(OutboundResponse::full(Response::new(body))).await.unwrap();
    }
    drop(exchange);

    connection.await.unwrap().unwrap();
    black_box(peer.written());
}

fn bench_bodyless(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    c.bench_function("pipelined bodyless requests", |b| b.to_async(&runtime).iter(|| exchange_requests(false)));
}

fn bench_streamed(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    c.bench_function("pipelined streamed requests", |b| b.to_async(&runtime).iter(|| exchange_requests(true)));
}

fn bench_framing(c: &mut Criterion) {
    c.bench_function("full response framing", |b| {
        b.iter(|| black_box(OutboundResponse::full(Response::new(Bytes::from_static(b"ok")))).validate())
    });
}

criterion_group!(benches, bench_bodyless, bench_streamed, bench_framing);
criterion_main!(benches);
