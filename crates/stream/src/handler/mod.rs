//! Request handlers and the loop serving an [`Exchange`] with one.
//!
//! ```no_run
//! use micro_http_stream::connection::StreamAdapter;
//! use micro_http_stream::handler::{make_handler, serve};
//! use micro_http_stream::protocol::{InboundRequest, OutboundResponse};
//! # use micro_http_stream::transport::Transport;
//!
//! async fn hello(_request: InboundRequest) -> Result<OutboundResponse, std::convert::Infallible> {
//!     Ok(OutboundResponse::full(http::Response::new("hello".into())))
//! }
//!
//! # async fn run<T: Transport + Send + 'static>(transport: T) {
//! let (adapter, exchange) = StreamAdapter::new(transport);
//! let connection = tokio::spawn(adapter.process());
//!
//! let handler = make_handler(hello);
//! let _served = serve(exchange, &handler, 4).await;
//! let _finished = connection.await;
//! # }
//! ```

use std::future::Future;

use async_trait::async_trait;
use futures::StreamExt;
use http::StatusCode;
use tracing::error;

use crate::connection::Exchange;
use crate::protocol::{BoxError, InboundRequest, OutboundResponse, SendError};

#[async_trait]
pub trait Handler: Send + Sync {
    type Error: Into<BoxError>;

    async fn call(&self, request: InboundRequest) -> Result<OutboundResponse, Self::Error>;
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, Err> Handler for HandlerFn<F>
where
    F: Fn(InboundRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<OutboundResponse, Err>> + Send,
    Err: Into<BoxError>,
{
    type Error = Err;

    async fn call(&self, request: InboundRequest) -> Result<OutboundResponse, Self::Error> {
        (self.f)(request).await
    }
}

pub fn make_handler<F, Fut, Err>(f: F) -> HandlerFn<F>
where
    F: Fn(InboundRequest) -> Fut,
    Fut: Future<Output = Result<OutboundResponse, Err>>,
    Err: Into<BoxError>,
{
    HandlerFn { f }
}

/// Answers every request of `exchange` with `handler`.
///
/// Up to `max_pipelined` handler calls run concurrently, their responses are
/// still submitted in request order. A failing handler, or one producing a
/// response the connection can't write, is answered with
/// `500 Internal Server Error`.
pub async fn serve<H>(exchange: Exchange, handler: &H, max_pipelined: usize) -> Result<(), SendError>
where
    H: Handler,
{
    let (requests, mut responder) = exchange.split();
    let mut responses = requests.map(|request| respond(handler, request)).buffered(max_pipelined.max(1));

    while let Some(response) = responses.next().await {
        responder.submit(response).await?;
    }
    Ok(())
}

async fn respond<H: Handler>(handler: &H, request: InboundRequest) -> OutboundResponse {
    let response = match handler.call(request).await {
        Ok(response) => response,
        Err(e) => {
            error!("handle response error, cause: {}", e.into());
            return OutboundResponse::status(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    match response.validate() {
        Ok(()) => response,
        Err(e) => {
            error!("handler produced an invalid response, cause: {}", e);
            OutboundResponse::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Request, Response};

    fn request(path: &str) -> InboundRequest {
        InboundRequest::Full(Request::builder().uri(path).body(Bytes::new()).unwrap())
    }

    #[tokio::test]
    async fn failing_handler_answers_500() {
        let handler = make_handler(|_request: InboundRequest| async { Err::<OutboundResponse, _>("boom") });

        let response = respond(&handler, request("/")).await;
        assert_eq!(status_of(&response), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn interim_status_is_replaced() {
        let handler = make_handler(|_request: InboundRequest| async {
            let response = Response::builder().status(StatusCode::CONTINUE).body(Bytes::new()).unwrap();
            Ok::<_, BoxError>(OutboundResponse::full(response))
        });

        let response = respond(&handler, request("/")).await;
        assert_eq!(status_of(&response), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn handler_fn_passes_request_through() {
        let handler = make_handler(|request: InboundRequest| async move {
            let body = Bytes::copy_from_slice(request.uri().path().as_bytes());
            Ok::<_, BoxError>(OutboundResponse::full(Response::new(body)))
        });

        let OutboundResponse::Full(response) = respond(&handler, request("/echo")).await else {
            panic!("expected a full response");
        };
        assert_eq!(response.body(), &Bytes::from_static(b"/echo"));
    }

    fn status_of(response: &OutboundResponse) -> StatusCode {
        match response {
            OutboundResponse::Full(response) => response.status(),
            OutboundResponse::Streamed(response) => response.status(),
            OutboundResponse::Upgrade(_) => StatusCode::SWITCHING_PROTOCOLS,
        }
    }
}
