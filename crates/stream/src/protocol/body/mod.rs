//! HTTP request body handling implementation.
//!
//! A streamed request body is split into two halves that talk over channels:
//!
//! - [`StreamBody`]: the consumer side handed to the application, implementing
//!   `http_body::Body`
//! - `BodyFeed`: the producer side kept by the connection, which reads body
//!   events from the transport only when the consumer has signalled demand
//!
//! Each poll of an unfinished [`StreamBody`] sends one [`BodySignal::RequestData`]
//! and the feed answers with at most one payload item. Cancelling or dropping the
//! body sends [`BodySignal::Cancel`] (or closes the signal channel), after which
//! the feed stops reading on behalf of that body.

mod stream_body;

pub use stream_body::BodySignal;
pub use stream_body::StreamBody;

pub(crate) use stream_body::BodyFeed;
pub(crate) use stream_body::Demand;
pub(crate) use stream_body::body_channel;
