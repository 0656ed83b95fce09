//! A backpressure-aware HTTP/1.1 stream adapter
//!
//! This crate sits between a codec that turns connection bytes into HTTP
//! head / body chunk events and an application that wants whole requests,
//! lazily streamed request bodies and in-order responses. It owns the
//! protocol concerns that need to pair a request with its response.
//!
//! # Features
//!
//! - Body-less requests delivered as full messages, the rest as streamed bodies
//! - Request bodies read from the connection only on consumer demand
//! - Pipelining with responses written strictly in submission order
//! - Expect-continue mechanism, sent at most once and only when safe
//! - Keep-alive and response framing decisions
//! - Protocol upgrade (WebSocket) hand-off once the request body drained
//!
//! # Example
//!
//! ```no_run
//! use http::{Response, StatusCode};
//! use http_body_util::BodyExt;
//! use micro_http_stream::connection::StreamAdapter;
//! use micro_http_stream::handler::{make_handler, serve};
//! use micro_http_stream::protocol::{BoxError, InboundRequest, OutboundResponse};
//! use micro_http_stream::transport::Transport;
//! use tracing::{error, info};
//!
//! async fn echo(request: InboundRequest) -> Result<OutboundResponse, BoxError> {
//!     let body = match request {
//!         InboundRequest::Full(request) => request.into_body(),
//!         InboundRequest::Streamed(request) => request.into_body().collect().await?.to_bytes(),
//!     };
//!     info!(size = body.len(), "receiving request body");
//!
//!     let response = Response::builder().status(StatusCode::OK).body(body)?;
//!     Ok(OutboundResponse::full(response))
//! }
//!
//! async fn handle_connection<T: Transport + Send + 'static>(transport: T) {
//!     let (adapter, exchange) = StreamAdapter::new(transport);
//!     let connection = tokio::spawn(adapter.process());
//!
//!     let handler = make_handler(echo);
//!     if let Err(e) = serve(exchange, &handler, 8).await {
//!         error!("serving connection stopped, cause {}", e);
//!     }
//!
//!     match connection.await {
//!         Ok(Ok(())) => info!("finished process, connection shutdown"),
//!         Ok(Err(e)) => error!("service has error, cause {}, connection shutdown", e),
//!         Err(e) => error!("connection task failed, cause {}", e),
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`connection`]: the [`connection::StreamAdapter`] event loop and the
//!   [`connection::Exchange`] the application talks to
//! - [`protocol`]: message events, request/response shapes, body streaming
//!   and error types
//! - [`transport`]: the codec boundary, with a `tokio_util` framed implementation
//! - [`upgrade`]: handshake traits and the frame pump of upgraded connections
//! - [`handler`]: request handler traits and the [`handler::serve`] loop
//!
//! # Connection lifecycle
//!
//! The adapter reads a request head only when the application has room for
//! another request, and body chunks only when the body's consumer polls it.
//! Responses are taken one at a time; the next one is not touched before the
//! current one is fully written. Once every response is written and the peer
//! closed its side, or a response asked for `Connection: close`, the
//! transport is closed.
//!
//! # Error Handling
//!
//! - [`protocol::HttpError`]: Top-level error type of [`connection::StreamAdapter::process`]
//! - [`protocol::ParseError`]: Inbound errors, also surfaced to body consumers
//! - [`protocol::SendError`]: Outbound errors, including rejected responses
//! - [`protocol::UpgradeError`]: Handshake and frame pump errors
//!
//! Malformed input never ends the connection: a request that failed to decode
//! or carries a malformed `Content-Length` is delivered as body-less.
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - Parsing and encoding bytes is left to the transport's codec

pub mod connection;
pub mod handler;
pub mod protocol;
pub mod transport;
pub mod upgrade;

mod utils;
pub(crate) use utils::ensure;
