//! Request heads as the codec hands them over.
//!
//! [`RequestHeader`] wraps the standard `http::Request` type with the bits the
//! stream adapter needs to know about a request head: whether the codec
//! failed to decode it, whether a body follows, and what the client expects
//! from the server before sending that body.

use bytes::Bytes;
use http::header::EXPECT;
use http::{HeaderMap, Method, Request, Uri, Version};

use crate::protocol::body::StreamBody;
use crate::protocol::header;

/// A decoded request head plus the codec's verdict on it.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
    decode_failure: Option<String>,
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

/// Copies method, uri, version and headers. Extensions are not carried over.
impl Clone for RequestHeader {
    fn clone(&self) -> Self {
        let mut inner = Request::new(());
        *inner.method_mut() = self.inner.method().clone();
        *inner.uri_mut() = self.inner.uri().clone();
        *inner.version_mut() = self.inner.version();
        *inner.headers_mut() = self.inner.headers().clone();
        Self { inner, decode_failure: self.decode_failure.clone() }
    }
}

impl RequestHeader {
    /// Marks this head as one the codec failed to decode (e.g. an invalid header).
    pub fn with_decode_failure<S: ToString>(mut self, reason: S) -> Self {
        self.decode_failure = Some(reason.to_string());
        self
    }

    /// Turns the head into a request carrying `body`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|()| body)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// The reason the codec gave when it failed to decode this head.
    pub fn decode_failure(&self) -> Option<&str> {
        self.decode_failure.as_deref()
    }

    /// Decides whether body events follow this head.
    ///
    /// - a decode failure means no body is expected
    /// - otherwise there is a body if the content length is non-zero or the
    ///   transfer coding is chunked
    /// - an absent or malformed content length counts as zero
    pub fn has_body(&self) -> bool {
        if self.decode_failure.is_some() {
            return false;
        }
        header::content_length_or(self.headers(), 0) != 0 || header::is_chunked(self.headers())
    }

    /// Returns true if the client waits for `100 Continue` before sending the body.
    pub fn is_100_continue_expected(&self) -> bool {
        self.headers().get(EXPECT).is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"100-continue"))
    }

    /// Returns true if the request's protocol version persists connections by default.
    pub fn is_keep_alive_default(&self) -> bool {
        header::is_keep_alive_default(self.version())
    }
}

impl From<Request<()>> for RequestHeader {
    fn from(inner: Request<()>) -> Self {
        Self { inner, decode_failure: None }
    }
}

/// A request as delivered to the application, in arrival order.
#[derive(Debug)]
pub enum InboundRequest {
    /// A request without body; the body is always empty
    Full(Request<Bytes>),
    /// A request whose body is read from the connection on demand
    Streamed(Request<StreamBody>),
}

impl InboundRequest {
    /// Returns true if the body of this request is streamed.
    pub fn is_streamed(&self) -> bool {
        matches!(self, InboundRequest::Streamed(_))
    }

    pub fn method(&self) -> &Method {
        match self {
            InboundRequest::Full(request) => request.method(),
            InboundRequest::Streamed(request) => request.method(),
        }
    }

    pub fn uri(&self) -> &Uri {
        match self {
            InboundRequest::Full(request) => request.uri(),
            InboundRequest::Streamed(request) => request.uri(),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        match self {
            InboundRequest::Full(request) => request.headers(),
            InboundRequest::Streamed(request) => request.headers(),
        }
    }

    /// Unwraps a streamed request, returning `Err(self)` for a full one.
    pub fn into_streamed(self) -> Result<Request<StreamBody>, Self> {
        match self {
            InboundRequest::Streamed(request) => Ok(request),
            full @ InboundRequest::Full(_) => Err(full),
        }
    }

    /// Unwraps a full request, returning `Err(self)` for a streamed one.
    pub fn into_full(self) -> Result<Request<Bytes>, Self> {
        match self {
            InboundRequest::Full(request) => Ok(request),
            streamed @ InboundRequest::Streamed(_) => Err(streamed),
        }
    }
}
