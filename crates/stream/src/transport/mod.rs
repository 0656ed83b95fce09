//! The codec boundary of the stream adapter.
//!
//! A [`Transport`] is one HTTP/1.1 connection seen through its codec: a
//! stream of inbound head / chunk / end-of-body events and a sink accepting
//! the same events outbound. Closing the sink closes the connection.
//!
//! [`FramedTransport`] implements it on top of `tokio_util::codec::Framed`.

mod framed;

pub use framed::FramedTransport;

use futures::{Sink, Stream};

use crate::protocol::{Message, ParseError, RequestHeader, ResponseHead, SendError};
use crate::upgrade::{FrameSink, FrameStream};

pub trait Transport:
    Stream<Item = Result<Message<RequestHeader>, ParseError>> + Sink<Message<ResponseHead>, Error = SendError> + Unpin
{
    /// Replaces the HTTP codec with the raw frame codec of the upgraded protocol.
    ///
    /// Bytes the HTTP codec already buffered belong to the upgraded protocol
    /// and must be handed to the frame codec.
    fn into_frames(self) -> Result<(FrameStream, FrameSink), SendError>;
}
