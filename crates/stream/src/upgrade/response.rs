use std::fmt;
use std::sync::Arc;

use futures::channel::{mpsc, oneshot};
use futures::{SinkExt, StreamExt};
use tracing::trace;

use crate::protocol::{RequestHeader, SendError};
use crate::upgrade::{FrameSink, FrameStream, Handshaker, HandshakerFactory, RawFrame, Upgraded};

/// How an upgrade answer ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// The handshake completed, frames now flow through the session
    Upgraded,
    /// No handshaker could be derived, an `426 Upgrade Required` was sent instead
    Rejected,
    /// The connection went away before the handshake could run
    Abandoned,
}

/// The outbound answer to an upgrade request.
pub struct UpgradeResponse {
    factory: Arc<dyn HandshakerFactory>,
    outgoing: mpsc::Receiver<RawFrame>,
    incoming: mpsc::Sender<RawFrame>,
    completion: Option<oneshot::Sender<UpgradeOutcome>>,
}

impl fmt::Debug for UpgradeResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeResponse").field("completed", &self.completion.is_none()).finish_non_exhaustive()
    }
}

impl UpgradeResponse {
    /// Creates the upgrade answer and the session the application keeps.
    ///
    /// `capacity` bounds the frames buffered in each direction.
    pub fn new(factory: Arc<dyn HandshakerFactory>, capacity: usize) -> (Self, UpgradeSession) {
        let (outgoing_sender, outgoing) = mpsc::channel(capacity);
        let (incoming, incoming_receiver) = mpsc::channel(capacity);
        let (completion, outcome) = oneshot::channel();

        let response = Self { factory, outgoing, incoming, completion: Some(completion) };
        let session = UpgradeSession { sender: outgoing_sender, receiver: incoming_receiver, outcome: Some(outcome) };
        (response, session)
    }

    pub(crate) fn new_handshaker(&self, request: &RequestHeader) -> Option<Box<dyn Handshaker>> {
        self.factory.new_handshaker(request)
    }

    /// Discards the session: outgoing frames are dropped, the incoming side ends.
    pub(crate) fn reject(mut self) {
        self.complete(UpgradeOutcome::Rejected);
        self.outgoing.close();
        while let Ok(Some(_frame)) = self.outgoing.try_next() {}
        self.incoming.close_channel();
    }

    /// Connects the session to the frame codec of the upgraded connection.
    pub(crate) fn into_upgraded(mut self, frame_stream: FrameStream, frame_sink: FrameSink) -> Upgraded {
        self.complete(UpgradeOutcome::Upgraded);
        Upgraded::new(frame_stream, frame_sink, self.outgoing, self.incoming)
    }

    fn complete(&mut self, outcome: UpgradeOutcome) {
        if let Some(completion) = self.completion.take()
            && completion.send(outcome).is_err()
        {
            trace!("upgrade session dropped before completion");
        }
    }
}

/// The application side of an upgraded connection.
#[derive(Debug)]
pub struct UpgradeSession {
    sender: mpsc::Sender<RawFrame>,
    receiver: mpsc::Receiver<RawFrame>,
    outcome: Option<oneshot::Receiver<UpgradeOutcome>>,
}

impl UpgradeSession {
    /// Waits until the connection ran or rejected the handshake.
    ///
    /// Subsequent calls return [`UpgradeOutcome::Abandoned`].
    pub async fn outcome(&mut self) -> UpgradeOutcome {
        match self.outcome.take() {
            Some(outcome) => outcome.await.unwrap_or(UpgradeOutcome::Abandoned),
            None => UpgradeOutcome::Abandoned,
        }
    }

    /// Queues a frame for the peer.
    pub async fn send(&mut self, frame: RawFrame) -> Result<(), SendError> {
        self.sender.send(frame).await.map_err(|_closed| SendError::ConnectionClosed)
    }

    /// Receives the next frame from the peer, `None` once the peer is done.
    pub async fn next(&mut self) -> Option<RawFrame> {
        self.receiver.next().await
    }

    /// Splits the session into its outgoing and incoming frame channels.
    pub fn into_parts(self) -> (mpsc::Sender<RawFrame>, mpsc::Receiver<RawFrame>) {
        (self.sender, self.receiver)
    }
}
