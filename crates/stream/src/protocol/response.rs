//! HTTP response head handling and the outbound message shapes.
//!
//! The application answers every request with exactly one
//! [`OutboundResponse`]; the connection writes them in submission order.

use std::error::Error;

use bytes::Bytes;
use http::{Response, StatusCode, Version};
use http_body::Body;
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;

use crate::ensure;
use crate::protocol::SendError;
use crate::upgrade::UpgradeResponse;

/// Type alias for HTTP response headers.
///
/// This type represents the header portion of an HTTP response, using
/// `http::Response<()>` with an empty body placeholder.
pub type ResponseHead = Response<()>;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// The body type of [`OutboundResponse::Streamed`].
pub type ResponseBody = UnsyncBoxBody<Bytes, BoxError>;

/// Returns false for statuses that never carry a message body:
/// all 1xx (Informational), 204 (No Content), and 304 (Not Modified).
#[inline]
pub fn can_have_body(status: StatusCode) -> bool {
    !(status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED)
}

/// A response submitted by the application.
#[derive(Debug)]
pub enum OutboundResponse {
    /// A response whose body is already buffered
    Full(Response<Bytes>),
    /// A response whose body arrives as it is produced
    Streamed(Response<ResponseBody>),
    /// A protocol switch answering the request (WebSocket)
    Upgrade(UpgradeResponse),
}

impl OutboundResponse {
    pub fn full(response: Response<Bytes>) -> Self {
        Self::Full(response)
    }

    /// Boxes the body of `response` into a streamed response.
    pub fn streamed<B>(response: Response<B>) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self::Streamed(response.map(|body| body.map_err(Into::<BoxError>::into).boxed_unsync()))
    }

    pub fn upgrade(upgrade: UpgradeResponse) -> Self {
        Self::Upgrade(upgrade)
    }

    /// A body-less response with the given status.
    pub fn status(status: StatusCode) -> Self {
        let mut response = Response::new(Bytes::new());
        *response.status_mut() = status;
        Self::Full(response)
    }

    /// Checks that this response is one the connection may write.
    ///
    /// Interim responses (1xx) belong to the connection: `100 Continue` is
    /// emitted by the continue protocol and `101 Switching Protocols` by an
    /// [`OutboundResponse::Upgrade`] handshake.
    pub fn validate(&self) -> Result<(), SendError> {
        let (status, version) = match self {
            OutboundResponse::Full(response) => (response.status(), response.version()),
            OutboundResponse::Streamed(response) => (response.status(), response.version()),
            OutboundResponse::Upgrade(_) => return Ok(()),
        };

        ensure!(
            !status.is_informational(),
            SendError::invalid_message(format!("informational status {status} can't be submitted as a response"))
        );
        ensure!(
            matches!(version, Version::HTTP_10 | Version::HTTP_11),
            SendError::invalid_message(format!("unsupported http version {version:?}"))
        );
        Ok(())
    }
}
