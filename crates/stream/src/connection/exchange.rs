use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};

use crate::protocol::{InboundRequest, OutboundResponse, SendError};

/// The application side of one connection.
///
/// Requests arrive in the order the peer sent them. Exactly one response must
/// be submitted per request, in the same order.
#[derive(Debug)]
pub struct Exchange {
    requests: mpsc::Receiver<InboundRequest>,
    responder: Responder,
}

/// Submits responses to the connection; cloneable.
#[derive(Debug, Clone)]
pub struct Responder {
    responses: mpsc::Sender<OutboundResponse>,
}

impl Exchange {
    pub(crate) fn new(requests: mpsc::Receiver<InboundRequest>, responses: mpsc::Sender<OutboundResponse>) -> Self {
        Self { requests, responder: Responder { responses } }
    }

    /// Waits for the next request, `None` once the connection stopped reading requests.
    pub async fn next_request(&mut self) -> Option<InboundRequest> {
        self.requests.next().await
    }

    pub async fn submit(&mut self, response: OutboundResponse) -> Result<(), SendError> {
        self.responder.submit(response).await
    }

    pub fn responder(&self) -> Responder {
        self.responder.clone()
    }

    pub fn split(self) -> (mpsc::Receiver<InboundRequest>, Responder) {
        (self.requests, self.responder)
    }
}

impl Responder {
    /// Queues the response answering the oldest unanswered request.
    ///
    /// A response the connection can't write is refused right away with
    /// [`SendError::InvalidMessage`]. Waits while the response buffer is full.
    pub async fn submit(&mut self, response: OutboundResponse) -> Result<(), SendError> {
        response.validate()?;
        self.responses.send(response).await.map_err(|_closed| SendError::ConnectionClosed)
    }
}
