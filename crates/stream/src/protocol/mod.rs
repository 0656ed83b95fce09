//! Core HTTP protocol abstractions.
//!
//! - **Message events** ([`message`]): the head / chunk / end-of-body events
//!   exchanged with the codec
//! - **Heads** ([`request`], [`response`]): [`RequestHeader`] and
//!   [`ResponseHead`], plus the shapes exchanged with the application,
//!   [`InboundRequest`] and [`OutboundResponse`]
//! - **Header helpers** ([`header`]): keep-alive and body framing inspection
//! - **Body streaming** ([`body`]): the demand-driven [`body::StreamBody`]
//! - **Error handling** ([`error`]): [`HttpError`], [`ParseError`],
//!   [`SendError`] and [`UpgradeError`]

mod message;
pub use message::Message;
pub use message::PayloadItem;

mod request;
pub use request::InboundRequest;
pub use request::RequestHeader;

mod response;
pub use response::BoxError;
pub use response::OutboundResponse;
pub use response::ResponseBody;
pub use response::ResponseHead;
pub use response::can_have_body;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
pub use error::UpgradeError;

pub mod body;
pub mod header;
