//! Protocol upgrade (WebSocket) support.
//!
//! The application answers an upgrade request with an [`UpgradeResponse`],
//! which carries the capability to derive a [`Handshaker`] for the request
//! and the frame channels of the upgraded session. The connection runs the
//! handshake once the request body is drained, swaps the HTTP codec for a raw
//! frame codec and then pumps frames between the wire and the
//! [`UpgradeSession`] held by the application.
//!
//! Deriving the handshake response and encoding frames are left to the
//! [`HandshakerFactory`] and the transport respectively.

mod dependent;
mod response;
mod upgraded;

pub use dependent::Dependent;
pub use response::{UpgradeOutcome, UpgradeResponse, UpgradeSession};
pub use upgraded::Upgraded;

use std::fmt;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Sink, Stream};

use crate::protocol::{RequestHeader, ResponseHead, UpgradeError};

/// One protocol frame as produced or accepted by the raw frame codec.
pub type RawFrame = Bytes;

/// Frames arriving from the peer once the connection is upgraded.
pub type FrameStream = Pin<Box<dyn Stream<Item = io::Result<RawFrame>> + Send>>;

/// Frames leaving to the peer once the connection is upgraded.
pub type FrameSink = Pin<Box<dyn Sink<RawFrame, Error = io::Error> + Send>>;

/// The WebSocket version advertised when an upgrade is rejected.
pub const SUPPORTED_WEBSOCKET_VERSION: &str = "13";

/// Derives a handshaker for an upgrade request.
pub trait HandshakerFactory: Send + Sync {
    /// Returns `None` if the request asks for a protocol or version that
    /// can't be served.
    fn new_handshaker(&self, request: &RequestHeader) -> Option<Box<dyn Handshaker>>;
}

/// Completes one protocol switch.
pub trait Handshaker: Send {
    /// Builds the `101 Switching Protocols` head for the request.
    ///
    /// The request is always body-less here: any body has been drained
    /// before the handshake runs.
    fn handshake(&self, request: &RequestHeader) -> Result<ResponseHead, UpgradeError>;
}

impl fmt::Debug for dyn HandshakerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HandshakerFactory")
    }
}

impl fmt::Debug for dyn Handshaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handshaker")
    }
}
