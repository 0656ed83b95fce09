use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::channel::mpsc;
use futures::{Sink, StreamExt};
use http_body::{Body, Frame, SizeHint};
use tracing::{error, trace};

use crate::protocol::{ParseError, PayloadItem};

/// Demand signal sent from a [`StreamBody`] to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySignal {
    /// The consumer is ready for one more payload item
    RequestData,
    /// The consumer no longer wants the body
    Cancel,
}

/// Creates the consumer and producer halves of one streamed request body.
pub(crate) fn body_channel(capacity: usize, size_hint: SizeHint) -> (StreamBody, BodyFeed) {
    let (signal_sender, signal_receiver) = mpsc::channel(0);
    let (data_sender, data_receiver) = mpsc::channel(capacity);

    (StreamBody::new(signal_sender, data_receiver, size_hint), BodyFeed::new(signal_receiver, data_sender, capacity))
}

/// A lazily consumed request body.
///
/// Nothing is read from the transport until the body is polled. The body has a
/// single consumer; it is finished once it yields `None`, an error, or is
/// cancelled.
#[derive(Debug)]
pub struct StreamBody {
    signal_sender: mpsc::Sender<BodySignal>,
    data_receiver: mpsc::Receiver<Result<PayloadItem, ParseError>>,
    size_hint: SizeHint,
    requested: bool,
    finished: bool,
}

impl StreamBody {
    fn new(
        signal_sender: mpsc::Sender<BodySignal>,
        data_receiver: mpsc::Receiver<Result<PayloadItem, ParseError>>,
        size_hint: SizeHint,
    ) -> Self {
        Self { signal_sender, data_receiver, size_hint, requested: false, finished: false }
    }

    /// Gives up the remaining body.
    ///
    /// Chunks already buffered for this body are released and the connection
    /// stops reading on its behalf. Polling a cancelled body yields `None`.
    pub fn cancel(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        // the signal channel may be full of demand, closing it is the fallback
        if self.signal_sender.try_send(BodySignal::Cancel).is_err() {
            trace!("cancel signal not delivered, closing signal channel");
        }
        self.signal_sender.close_channel();

        self.data_receiver.close();
        let mut released = 0;
        while let Ok(Some(item)) = self.data_receiver.try_next() {
            if let Ok(payload_item) = item {
                released += payload_item.size();
            }
        }
        trace!(released, "stream body cancelled");
    }

    /// Returns true once the body yielded its end, an error, or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Body for StreamBody {
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        if this.finished {
            return Poll::Ready(None);
        }

        if !this.requested {
            match Pin::new(&mut this.signal_sender).poll_ready(cx) {
                Poll::Ready(Ok(())) => {
                    if let Err(e) = Pin::new(&mut this.signal_sender).start_send(BodySignal::RequestData) {
                        error!("failed to send request_data through channel, {}", e);
                        this.finished = true;
                        return Poll::Ready(Some(Err(ParseError::invalid_body("failed to request body data"))));
                    }
                    this.requested = true;
                }
                Poll::Ready(Err(e)) => {
                    error!("failed to prepare request_data through channel, {}", e);
                    this.finished = true;
                    return Poll::Ready(Some(Err(ParseError::invalid_body("failed to request body data"))));
                }
                Poll::Pending => return Poll::Pending,
            }
        }

        match this.data_receiver.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(PayloadItem::Chunk(bytes)))) => {
                this.requested = false;
                Poll::Ready(Some(Ok(Frame::data(bytes))))
            }
            Poll::Ready(Some(Ok(PayloadItem::Eof))) => {
                this.requested = false;
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                this.requested = false;
                this.finished = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.requested = false;
                this.finished = true;
                Poll::Ready(Some(Err(ParseError::invalid_body("connection dropped the body before its end"))))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.finished
    }

    fn size_hint(&self) -> SizeHint {
        self.size_hint.clone()
    }
}

/// What a demand signal meant for the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Demand {
    /// The consumer asked for one more item
    More,
    /// The consumer is gone, explicitly or by drop
    Cancelled,
}

/// The connection-side half of a [`StreamBody`].
///
/// Every item the consumer takes is preceded by exactly one demand signal, so
/// `demand` counts requested items not yet delivered and `ahead` counts items
/// delivered before the consumer asked for them.
#[derive(Debug)]
pub(crate) struct BodyFeed {
    signal_receiver: mpsc::Receiver<BodySignal>,
    data_sender: mpsc::Sender<Result<PayloadItem, ParseError>>,
    capacity: usize,
    demand: usize,
    ahead: usize,
    read_ahead: bool,
    cancelled: bool,
}

impl BodyFeed {
    fn new(
        signal_receiver: mpsc::Receiver<BodySignal>,
        data_sender: mpsc::Sender<Result<PayloadItem, ParseError>>,
        capacity: usize,
    ) -> Self {
        Self { signal_receiver, data_sender, capacity, demand: 0, ahead: 0, read_ahead: false, cancelled: false }
    }

    /// Waits for the next signal of the consumer. Cancel safe.
    pub(crate) async fn next_signal(&mut self) -> Option<BodySignal> {
        self.signal_receiver.next().await
    }

    /// Records a signal returned by [`BodyFeed::next_signal`].
    pub(crate) fn on_signal(&mut self, signal: Option<BodySignal>) -> Demand {
        match signal {
            Some(BodySignal::RequestData) if !self.cancelled => {
                if self.ahead > 0 {
                    // the consumer took an item delivered ahead of its demand
                    self.ahead -= 1;
                } else {
                    self.demand += 1;
                }
                Demand::More
            }
            _ => {
                self.cancel();
                Demand::Cancelled
            }
        }
    }

    /// Returns true if the consumer is waiting for an item, or if reading
    /// ahead is enabled and the body buffer still has room.
    pub(crate) fn wants_data(&self) -> bool {
        !self.cancelled && (self.demand > 0 || (self.read_ahead && self.ahead < self.capacity))
    }

    /// Lets the connection read the body without waiting for demand, up to the
    /// body buffer.
    pub(crate) fn read_ahead(&mut self) {
        self.read_ahead = true;
    }

    /// Returns true if reading ahead filled the body buffer and the consumer
    /// has not asked for more.
    pub(crate) fn is_full(&self) -> bool {
        self.demand == 0 && self.ahead >= self.capacity
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Hands one payload item to the consumer.
    ///
    /// Returns false if the item was dropped because the consumer is gone.
    pub(crate) fn deliver(&mut self, payload_item: PayloadItem) -> bool {
        if self.cancelled {
            return false;
        }
        if self.demand > 0 {
            self.demand -= 1;
        } else {
            self.ahead += 1;
        }
        match self.data_sender.try_send(Ok(payload_item)) {
            Ok(()) => true,
            Err(e) if e.is_disconnected() => {
                self.cancel();
                false
            }
            Err(e) => {
                error!("body channel is full, dropping payload item, {}", e);
                false
            }
        }
    }

    /// Ends the body with an error.
    pub(crate) fn fail(&mut self, e: ParseError) {
        if !self.cancelled && self.data_sender.try_send(Err(e)).is_err() {
            trace!("body consumer gone before receiving error");
        }
        self.cancel();
    }

    fn cancel(&mut self) {
        self.cancelled = true;
        self.demand = 0;
        self.signal_receiver.close();
        self.data_sender.close_channel();
    }
}
