use std::fmt;
use std::future::poll_fn;
use std::mem;

use bytes::Bytes;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt, future};
use http::header::CONTENT_LENGTH;
use http::{HeaderValue, Response, StatusCode};
use http_body::Frame;
use http_body_util::BodyExt;
use tokio::select;
use tracing::{debug, error, info, trace, warn};

use crate::connection::assembler::assemble;
use crate::connection::config::AdapterConfig;
use crate::connection::exchange::Exchange;
use crate::connection::keep_alive;
use crate::connection::state::ConnectionState;
use crate::connection::upgrade::{Handshake, handshake};
use crate::protocol::body::{BodyFeed, BodySignal, Demand};
use crate::protocol::header::{is_chunked, is_content_length_set};
use crate::protocol::{
    BoxError, HttpError, InboundRequest, Message, OutboundResponse, ParseError, PayloadItem, RequestHeader, ResponseBody,
    ResponseHead, SendError, can_have_body,
};
use crate::transport::Transport;
use crate::upgrade::{Dependent, UpgradeResponse};

/// A bidirectional adapter between an HTTP/1.1 [`Transport`] and the
/// application's [`Exchange`].
///
/// `StreamAdapter` owns the connection for its whole life:
/// - request heads are assembled into full or streamed requests and read
///   only while the application has room for them
/// - request bodies are read only on demand of their consumer
/// - responses are written one at a time in submission order
/// - `100 Continue`, keep-alive and response framing are decided here
/// - an upgrade response hands the connection over to a frame pump
///
/// All of this happens in [`StreamAdapter::process`], a single future driving
/// one event loop, so the connection state is never shared.
pub struct StreamAdapter<T> {
    transport: T,
    config: AdapterConfig,
    state: ConnectionState,
    inbound: Inbound,
    requests: mpsc::Sender<InboundRequest>,
    responses: mpsc::Receiver<OutboundResponse>,
    /// Body of the streamed response being written
    writing: Option<ResponseBody>,
    dependents: Vec<Box<dyn Dependent>>,
    requests_closed: bool,
    responses_closed: bool,
    transport_closed: bool,
}

/// Where the inbound side of the connection stands.
#[derive(Debug)]
enum Inbound {
    AwaitingHead,
    /// A streamed body is fed by the payload events that follow
    Streaming(BodyFeed),
    /// The rest of a body nobody reads is skipped
    Draining { skipped: usize },
    /// The peer closed its read half
    Closed,
}

enum Event {
    Frame(Option<Result<Frame<Bytes>, BoxError>>),
    Signal(Option<BodySignal>),
    Read(Option<Result<Message<RequestHeader>, ParseError>>),
    RequestsClosed,
    Submitted(Option<OutboundResponse>),
    Idle,
}

enum Step {
    Continue,
    Closed,
    Switch(UpgradeResponse, ResponseHead),
}

impl<T> fmt::Debug for StreamAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamAdapter")
            .field("state", &self.state)
            .field("inbound", &self.inbound)
            .field("writing", &self.writing.is_some())
            .finish_non_exhaustive()
    }
}

impl<T> StreamAdapter<T>
where
    T: Transport,
{
    pub fn new(transport: T) -> (Self, Exchange) {
        Self::with_config(transport, AdapterConfig::default())
    }

    pub fn with_config(transport: T, config: AdapterConfig) -> (Self, Exchange) {
        let (requests, request_receiver) = mpsc::channel(config.request_buffer);
        let (response_sender, responses) = mpsc::channel(config.response_buffer);

        let adapter = Self {
            transport,
            config,
            state: ConnectionState::default(),
            inbound: Inbound::AwaitingHead,
            requests,
            responses,
            writing: None,
            dependents: Vec::new(),
            requests_closed: false,
            responses_closed: false,
            transport_closed: false,
        };
        (adapter, Exchange::new(request_receiver, response_sender))
    }

    /// Registers what must be detached once the adapter leaves the connection.
    pub fn with_dependents(mut self, dependents: Vec<Box<dyn Dependent>>) -> Self {
        self.dependents.extend(dependents);
        self
    }

    /// Drives the connection until it closes or is upgraded.
    ///
    /// After an upgrade the returned future keeps pumping frames until both
    /// directions of the upgraded session end.
    pub async fn process(mut self) -> Result<(), HttpError> {
        match self.run_events().await {
            Ok(Some((upgrade, head))) => self.switch_protocols(upgrade, head).await,
            Ok(None) => {
                self.detach_dependents();
                Ok(())
            }
            Err(e) => {
                self.detach_dependents();
                Err(e)
            }
        }
    }

    async fn run_events(&mut self) -> Result<Option<(UpgradeResponse, ResponseHead)>, HttpError> {
        loop {
            if self.is_finished() {
                info!("connection has nothing left to do, closing");
                self.shutdown().await?;
                return Ok(None);
            }

            let frame_wanted = self.writing.is_some();
            let signal_wanted = matches!(&self.inbound, Inbound::Streaming(feed) if !feed.is_cancelled());
            let read_wanted = self.is_read_wanted();
            let reserve_request = matches!(self.inbound, Inbound::AwaitingHead);
            let submit_wanted = self.writing.is_none() && self.state.pending_upgrade.is_none() && !self.responses_closed;

            let event = select! {
                biased;
                frame = next_frame(&mut self.writing), if frame_wanted => Event::Frame(frame),
                signal = next_signal(&mut self.inbound), if signal_wanted => Event::Signal(signal),
                read = next_read(&mut self.transport, &mut self.requests, reserve_request), if read_wanted => read,
                response = self.responses.next(), if submit_wanted => Event::Submitted(response),
                else => Event::Idle,
            };

            let step = match event {
                Event::Frame(frame) => self.on_frame(frame).await?,
                Event::Signal(signal) => self.on_signal(signal).await?,
                Event::Read(Some(Ok(Message::Header(header)))) => self.on_head(header),
                Event::Read(Some(Ok(Message::Payload(payload_item)))) => self.on_payload(payload_item).await?,
                Event::Read(Some(Err(e))) => return Err(self.on_read_error(e).into()),
                Event::Read(None) => self.on_peer_closed(),
                Event::RequestsClosed => {
                    debug!("application stopped taking requests");
                    self.requests_closed = true;
                    Step::Continue
                }
                Event::Submitted(Some(response)) => self.on_submitted(response).await?,
                Event::Submitted(None) => {
                    debug!("application dropped its responder");
                    self.responses_closed = true;
                    Step::Continue
                }
                Event::Idle => {
                    debug!("no event source left, closing");
                    self.shutdown().await?;
                    Step::Closed
                }
            };

            match step {
                Step::Continue => {}
                Step::Closed => return Ok(None),
                Step::Switch(upgrade, head) => return Ok(Some((upgrade, head))),
            }
        }
    }

    fn is_finished(&self) -> bool {
        if self.writing.is_some() || self.state.pending_upgrade.is_some() {
            return false;
        }
        let idle = self.state.in_flight == 0 && (self.requests_closed || matches!(self.inbound, Inbound::Closed));
        idle || self.responses_closed
    }

    fn is_read_wanted(&self) -> bool {
        match &self.inbound {
            Inbound::AwaitingHead => {
                !self.requests_closed && !self.state.close_after_current && self.state.pending_upgrade.is_none()
            }
            Inbound::Streaming(feed) => feed.wants_data(),
            Inbound::Draining { .. } => true,
            Inbound::Closed => false,
        }
    }

    fn on_head(&mut self, header: RequestHeader) -> Step {
        if let Inbound::Streaming(feed) = &mut self.inbound {
            warn!("request head arrived before the end of the previous body");
            feed.fail(ParseError::invalid_body("request body interrupted by the next request"));
        }

        let (request, feed) = assemble(&mut self.state, header, self.config.body_buffer);
        self.inbound = feed.map_or(Inbound::AwaitingHead, Inbound::Streaming);

        if let Err(e) = self.requests.start_send(request) {
            warn!("can't deliver request, {}", e);
            self.state.in_flight -= 1;
            self.state.close_after_current = true;
            self.requests_closed = true;
            self.inbound = Inbound::Closed;
        }
        Step::Continue
    }

    async fn on_payload(&mut self, payload_item: PayloadItem) -> Result<Step, HttpError> {
        self.state.continue_state.on_payload();
        let is_eof = payload_item.is_eof();

        match &mut self.inbound {
            Inbound::Streaming(feed) => {
                if !feed.deliver(payload_item) {
                    trace!("payload item dropped, body consumer gone");
                }
            }
            Inbound::Draining { skipped } => {
                *skipped += payload_item.size();
                if is_eof {
                    info!(size = *skipped, "skip request body");
                }
            }
            Inbound::AwaitingHead => {
                trace!(size = payload_item.size(), eof = is_eof, "discarding payload without body");
                return Ok(Step::Continue);
            }
            Inbound::Closed => return Ok(Step::Continue),
        }

        if !is_eof {
            if self.state.pending_upgrade.is_some() {
                self.read_through_for_upgrade();
            }
            return Ok(Step::Continue);
        }
        self.inbound = Inbound::AwaitingHead;

        match self.state.pending_upgrade.take() {
            Some(upgrade) => {
                debug!("request body drained, running deferred upgrade");
                self.run_upgrade(upgrade).await
            }
            None => Ok(Step::Continue),
        }
    }

    async fn on_signal(&mut self, signal: Option<BodySignal>) -> Result<Step, HttpError> {
        let Inbound::Streaming(feed) = &mut self.inbound else {
            return Ok(Step::Continue);
        };

        match feed.on_signal(signal) {
            Demand::More => {
                if self.state.continue_state.on_body_requested(self.state.in_flight) {
                    self.send_continue().await?;
                }
            }
            Demand::Cancelled => {
                trace!("request body cancelled by its consumer");
                // nobody else will read the rest of this body
                if self.state.in_flight == 0 || self.state.pending_upgrade.is_some() {
                    self.inbound = Inbound::Draining { skipped: 0 };
                }
            }
        }
        Ok(Step::Continue)
    }

    fn on_read_error(&mut self, e: ParseError) -> ParseError {
        error!("can't read from connection, cause {}", e);
        if let Inbound::Streaming(feed) = &mut self.inbound {
            feed.fail(ParseError::invalid_body(format!("connection read failed: {e}")));
        }
        self.inbound = Inbound::Closed;
        e
    }

    fn on_peer_closed(&mut self) -> Step {
        info!("peer closed the connection, finishing pending responses");
        if let Inbound::Streaming(mut feed) = mem::replace(&mut self.inbound, Inbound::Closed) {
            feed.fail(ParseError::invalid_body("connection closed before the end of the body"));
        }
        self.requests.close_channel();

        if self.state.pending_upgrade.take().is_some() {
            debug!("abandoning upgrade, its request body never ended");
            self.state.in_flight = self.state.in_flight.saturating_sub(1);
        }
        Step::Continue
    }

    async fn on_submitted(&mut self, response: OutboundResponse) -> Result<Step, HttpError> {
        match response {
            OutboundResponse::Full(response) => self.write_full(response).await,
            OutboundResponse::Streamed(response) => self.write_streamed(response).await,
            OutboundResponse::Upgrade(upgrade) => {
                if matches!(self.inbound, Inbound::Streaming(_) | Inbound::Draining { .. }) {
                    debug!("upgrade deferred until request body is drained");
                    self.state.pending_upgrade = Some(upgrade);
                    self.read_through_for_upgrade();
                    return Ok(Step::Continue);
                }
                self.run_upgrade(upgrade).await
            }
        }
    }

    async fn on_frame(&mut self, frame: Option<Result<Frame<Bytes>, BoxError>>) -> Result<Step, HttpError> {
        match frame {
            Some(Ok(frame)) => {
                match frame.into_data() {
                    Ok(data) if !data.is_empty() => self.transport.send(Message::Payload(PayloadItem::Chunk(data))).await?,
                    Ok(_) => {}
                    Err(_trailers) => trace!("response trailers are not supported, ignored"),
                }
                Ok(Step::Continue)
            }
            Some(Err(e)) => {
                error!("resolve response body error, cause {}", e);
                self.writing = None;
                if let Err(close_error) = self.shutdown().await {
                    debug!("can't close connection after body error, {}", close_error);
                }
                Err(SendError::invalid_body(format!("resolve response body error: {e}")).into())
            }
            None => {
                self.writing = None;
                self.transport.send(Message::Payload(PayloadItem::Eof)).await?;
                self.on_response_written().await
            }
        }
    }

    async fn write_full(&mut self, response: Response<Bytes>) -> Result<Step, HttpError> {
        let (mut parts, body) = response.into_parts();
        if can_have_body(parts.status) && !is_content_length_set(&parts.headers) && !is_chunked(&parts.headers) {
            parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        }

        let mut head = ResponseHead::from_parts(parts, ());
        keep_alive::decide(&mut self.state, &mut head);
        let status = head.status();

        self.transport.feed(Message::Header(head)).await?;
        if !body.is_empty() {
            if can_have_body(status) {
                self.transport.feed(Message::Payload(PayloadItem::Chunk(body))).await?;
            } else {
                warn!(status = %status, size = body.len(), "dropping body of a response that can't carry one");
            }
        }
        self.transport.send(Message::Payload(PayloadItem::Eof)).await?;

        self.on_response_written().await
    }

    async fn write_streamed(&mut self, response: Response<ResponseBody>) -> Result<Step, HttpError> {
        let (parts, body) = response.into_parts();
        let mut head = ResponseHead::from_parts(parts, ());
        keep_alive::decide(&mut self.state, &mut head);
        let status = head.status();

        self.transport.feed(Message::Header(head)).await?;
        if can_have_body(status) {
            self.writing = Some(body);
            return Ok(Step::Continue);
        }

        warn!(status = %status, "dropping streamed body of a response that can't carry one");
        self.transport.send(Message::Payload(PayloadItem::Eof)).await?;
        self.on_response_written().await
    }

    /// Completion hook of every final response.
    async fn on_response_written(&mut self) -> Result<Step, HttpError> {
        self.state.in_flight = self.state.in_flight.saturating_sub(1);
        trace!(in_flight = self.state.in_flight, "response written");

        if self.state.close_after_current {
            info!("closing connection after response");
            self.shutdown().await?;
            return Ok(Step::Closed);
        }

        if self.state.continue_state.on_response_written(self.state.in_flight) {
            self.send_continue().await?;
        }

        // keep reading so the connection does not wait on a consumer that may never ask
        if self.state.in_flight == 0
            && let Inbound::Streaming(feed) = &mut self.inbound
        {
            if feed.is_cancelled() {
                debug!("all responses written and body cancelled, draining it");
                self.inbound = Inbound::Draining { skipped: 0 };
            } else {
                debug!("all responses written before the request body ended, reading ahead");
                feed.read_ahead();
            }
        }
        Ok(Step::Continue)
    }

    /// Reads the body in front of a pending upgrade without waiting for
    /// demand. Once the body buffer is full the rest is skipped.
    fn read_through_for_upgrade(&mut self) {
        let Inbound::Streaming(feed) = &mut self.inbound else {
            return;
        };
        feed.read_ahead();
        if feed.is_full() {
            debug!("body buffer full in front of an upgrade, draining the body");
            feed.fail(ParseError::invalid_body("request body skipped for protocol upgrade"));
            self.inbound = Inbound::Draining { skipped: 0 };
        }
    }

    async fn send_continue(&mut self) -> Result<(), HttpError> {
        let mut head = ResponseHead::new(());
        *head.status_mut() = StatusCode::CONTINUE;
        *head.version_mut() = self.state.request_version();

        self.transport.feed(Message::Header(head)).await?;
        self.transport.send(Message::Payload(PayloadItem::Eof)).await?;
        info!("receive expect request header, sent continue response");
        Ok(())
    }

    async fn run_upgrade(&mut self, upgrade: UpgradeResponse) -> Result<Step, HttpError> {
        let Some(request) = self.state.last_request.as_ref() else {
            warn!("upgrade submitted before any request, rejecting it");
            upgrade.reject();
            return Ok(Step::Continue);
        };

        match handshake(&upgrade, request)? {
            Handshake::Reject(response) => {
                upgrade.reject();
                self.write_full(response).await
            }
            Handshake::Switch(head) => Ok(Step::Switch(upgrade, head)),
        }
    }

    async fn switch_protocols(self, upgrade: UpgradeResponse, head: ResponseHead) -> Result<(), HttpError> {
        let StreamAdapter { mut transport, mut dependents, .. } = self;
        detach_all(&mut dependents);

        transport.feed(Message::Header(head)).await?;
        transport.send(Message::Payload(PayloadItem::Eof)).await?;

        let (frame_stream, frame_sink) = transport.into_frames()?;
        info!("connection upgraded");
        upgrade.into_upgraded(frame_stream, frame_sink).run().await?;
        info!("upgraded connection finished");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), SendError> {
        if let Inbound::Streaming(mut feed) = mem::replace(&mut self.inbound, Inbound::Closed) {
            feed.fail(ParseError::invalid_body("connection closed before the end of the body"));
        }
        self.requests.close_channel();

        if self.transport_closed {
            return Ok(());
        }
        self.transport_closed = true;
        self.transport.close().await
    }

    fn detach_dependents(&mut self) {
        detach_all(&mut self.dependents);
    }
}

fn detach_all(dependents: &mut Vec<Box<dyn Dependent>>) {
    for mut dependent in dependents.drain(..) {
        if !dependent.detach() {
            debug!("dependent already detached");
        }
    }
}

async fn next_frame(body: &mut Option<ResponseBody>) -> Option<Result<Frame<Bytes>, BoxError>> {
    match body {
        Some(body) => body.frame().await,
        None => future::pending().await,
    }
}

async fn next_signal(inbound: &mut Inbound) -> Option<BodySignal> {
    match inbound {
        Inbound::Streaming(feed) => feed.next_signal().await,
        _ => future::pending().await,
    }
}

/// Reads the next event, first reserving room for a request if a head may come.
async fn next_read<T: Transport>(transport: &mut T, requests: &mut mpsc::Sender<InboundRequest>, reserve_request: bool) -> Event {
    if reserve_request && poll_fn(|cx| requests.poll_ready(cx)).await.is_err() {
        return Event::RequestsClosed;
    }
    Event::Read(transport.next().await)
}
