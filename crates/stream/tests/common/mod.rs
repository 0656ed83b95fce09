//! An in-memory [`Transport`] whose peer side is scripted by the test.

#![allow(dead_code, reason = "each test binary uses a different part of the mock")]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};

use bytes::Bytes;
use futures::channel::mpsc;
use futures::{Sink, SinkExt, Stream};
use http::{HeaderMap, Request, StatusCode, Version};
use micro_http_stream::protocol::{Message, ParseError, PayloadItem, RequestHeader, ResponseHead, SendError};
use micro_http_stream::transport::Transport;
use micro_http_stream::upgrade::{FrameSink, FrameStream};

/// One item written by the adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum Written {
    Head {
        status: StatusCode,
        version: Version,
        headers: HeaderMap,
        /// Items read from the transport when this head was written
        reads: usize,
    },
    Chunk(Bytes),
    Eof,
}

impl Written {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Written::Head { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Shared {
    inbound: VecDeque<Result<Message<RequestHeader>, ParseError>>,
    read_closed: bool,
    reader: Option<Waker>,
    reads: usize,
    written: Vec<Written>,
    closed: bool,
    broken: bool,
    upgraded: Option<(mpsc::Sender<io::Result<Bytes>>, mpsc::Receiver<Bytes>)>,
}

pub struct MockTransport {
    shared: Arc<Mutex<Shared>>,
}

/// The test's handle on the other end of a [`MockTransport`].
#[derive(Clone)]
pub struct Peer {
    shared: Arc<Mutex<Shared>>,
}

pub fn transport() -> (MockTransport, Peer) {
    let shared = Arc::new(Mutex::new(Shared::default()));
    (MockTransport { shared: Arc::clone(&shared) }, Peer { shared })
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap()
}

impl Peer {
    fn push(&self, item: Result<Message<RequestHeader>, ParseError>) {
        let mut shared = lock(&self.shared);
        shared.inbound.push_back(item);
        if let Some(waker) = shared.reader.take() {
            waker.wake();
        }
    }

    pub fn send_head(&self, request: Request<()>) {
        self.push(Ok(Message::Header(request.into())));
    }

    pub fn send_header(&self, header: RequestHeader) {
        self.push(Ok(Message::Header(header)));
    }

    pub fn send_chunk(&self, chunk: &'static [u8]) {
        self.push(Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(chunk)))));
    }

    pub fn send_eof(&self) {
        self.push(Ok(Message::Payload(PayloadItem::Eof)));
    }

    pub fn send_error(&self, error: ParseError) {
        self.push(Err(error));
    }

    pub fn close_read(&self) {
        let mut shared = lock(&self.shared);
        shared.read_closed = true;
        if let Some(waker) = shared.reader.take() {
            waker.wake();
        }
    }

    /// Items the adapter has taken from the transport so far.
    pub fn reads(&self) -> usize {
        lock(&self.shared).reads
    }

    /// Items still waiting to be read.
    pub fn unread(&self) -> usize {
        lock(&self.shared).inbound.len()
    }

    pub fn written(&self) -> Vec<Written> {
        lock(&self.shared).written.clone()
    }

    pub fn statuses(&self) -> Vec<StatusCode> {
        lock(&self.shared).written.iter().filter_map(Written::status).collect()
    }

    /// Makes every following write fail as if the peer reset the connection.
    pub fn break_writes(&self) {
        lock(&self.shared).broken = true;
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.shared).closed
    }

    /// Frame channels of the peer once the adapter upgraded the connection.
    pub fn take_frames(&self) -> Option<(mpsc::Sender<io::Result<Bytes>>, mpsc::Receiver<Bytes>)> {
        lock(&self.shared).upgraded.take()
    }
}

impl Stream for MockTransport {
    type Item = Result<Message<RequestHeader>, ParseError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut shared = lock(&self.shared);
        if let Some(item) = shared.inbound.pop_front() {
            shared.reads += 1;
            return Poll::Ready(Some(item));
        }
        if shared.read_closed {
            return Poll::Ready(None);
        }
        shared.reader = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Sink<Message<ResponseHead>> for MockTransport {
    type Error = SendError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let shared = lock(&self.shared);
        if shared.closed || shared.broken {
            return Poll::Ready(Err(SendError::ConnectionClosed));
        }
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Message<ResponseHead>) -> Result<(), Self::Error> {
        let mut shared = lock(&self.shared);
        let written = match item {
            Message::Header(head) => Written::Head {
                status: head.status(),
                version: head.version(),
                headers: head.headers().clone(),
                reads: shared.reads,
            },
            Message::Payload(PayloadItem::Chunk(bytes)) => Written::Chunk(bytes),
            Message::Payload(PayloadItem::Eof) => Written::Eof,
        };
        shared.written.push(written);
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        lock(&self.shared).closed = true;
        Poll::Ready(Ok(()))
    }
}

impl Transport for MockTransport {
    fn into_frames(self) -> Result<(FrameStream, FrameSink), SendError> {
        let (inbound_sender, inbound_frames) = mpsc::channel(8);
        let (outbound_frames, outbound_receiver) = mpsc::channel(8);
        lock(&self.shared).upgraded = Some((inbound_sender, outbound_receiver));

        let frame_sink = outbound_frames.sink_map_err(io::Error::other);
        Ok((Box::pin(inbound_frames), Box::pin(frame_sink)))
    }
}

/// Lets the spawned adapter run until it has no more work.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::TRACE).try_init();
}
