use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::BytesMut;
use futures::{Sink, Stream, StreamExt, TryStreamExt};
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, Framed, FramedParts};
use tracing::debug;

use crate::protocol::{Message, ParseError, RequestHeader, ResponseHead, SendError};
use crate::transport::Transport;
use crate::upgrade::{FrameSink, FrameStream, RawFrame};

pin_project! {
    /// A [`Transport`] over any IO, using `C` as the HTTP codec and `F` as
    /// the frame codec once the connection is upgraded.
    pub struct FramedTransport<IO, C, F> {
        #[pin]
        framed: Framed<IO, C>,
        frame_codec: F,
    }
}

impl<IO, C, F> FramedTransport<IO, C, F>
where
    IO: AsyncRead + AsyncWrite,
{
    pub fn new(io: IO, codec: C, frame_codec: F) -> Self {
        Self { framed: Framed::new(io, codec), frame_codec }
    }

    pub fn with_capacity(io: IO, codec: C, frame_codec: F, capacity: usize) -> Self {
        Self { framed: Framed::with_capacity(io, codec, capacity), frame_codec }
    }

    #[inline]
    pub fn get_ref(&self) -> &IO {
        self.framed.get_ref()
    }
}

impl<IO, C, F> Stream for FramedTransport<IO, C, F>
where
    IO: AsyncRead,
    C: Decoder<Item = Message<RequestHeader>, Error = ParseError>,
{
    type Item = Result<Message<RequestHeader>, ParseError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().framed.poll_next(cx)
    }
}

impl<IO, C, F> Sink<Message<ResponseHead>> for FramedTransport<IO, C, F>
where
    IO: AsyncWrite,
    C: Encoder<Message<ResponseHead>, Error = SendError>,
{
    type Error = SendError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().framed.poll_ready(cx)
    }

    fn start_send(self: Pin<&mut Self>, item: Message<ResponseHead>) -> Result<(), Self::Error> {
        self.project().framed.start_send(item)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().framed.poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().framed.poll_close(cx)
    }
}

impl<IO, C, F> Transport for FramedTransport<IO, C, F>
where
    IO: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    C: Decoder<Item = Message<RequestHeader>, Error = ParseError> + Encoder<Message<ResponseHead>, Error = SendError> + Unpin,
    F: Decoder<Item = BytesMut, Error = io::Error> + Encoder<RawFrame, Error = io::Error> + Send + Unpin + 'static,
{
    fn into_frames(self) -> Result<(FrameStream, FrameSink), SendError> {
        let FramedTransport { framed, frame_codec } = self;
        let http_parts = framed.into_parts();

        debug!(buffered = http_parts.read_buf.len(), "switching connection to frame codec");

        let mut frame_parts = FramedParts::new::<RawFrame>(http_parts.io, frame_codec);
        frame_parts.read_buf = http_parts.read_buf;
        frame_parts.write_buf = http_parts.write_buf;

        let (frame_sink, frame_stream) = Framed::from_parts(frame_parts).split();
        let frame_stream = frame_stream.map_ok(BytesMut::freeze);

        Ok((Box::pin(frame_stream), Box::pin(frame_sink)))
    }
}
