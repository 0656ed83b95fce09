use bytes::Bytes;
use http::header::{CONTENT_LENGTH, SEC_WEBSOCKET_VERSION, TRANSFER_ENCODING};
use http::{HeaderValue, Response, StatusCode, Version};
use tracing::debug;

use crate::protocol::{RequestHeader, ResponseHead, UpgradeError};
use crate::upgrade::{SUPPORTED_WEBSOCKET_VERSION, UpgradeResponse};

/// What an upgrade answer turns into once its request body is drained.
#[derive(Debug)]
pub(crate) enum Handshake {
    /// No handshaker for the request, answer with `426 Upgrade Required`
    Reject(Response<Bytes>),
    /// Switch protocols with this `101` head
    Switch(ResponseHead),
}

/// Runs the handshake of `upgrade` against the head of the request it answers.
///
/// The handshaker sees the request without body framing since its body was
/// drained before.
pub(crate) fn handshake(upgrade: &UpgradeResponse, request: &RequestHeader) -> Result<Handshake, UpgradeError> {
    let request = without_body(request);

    match upgrade.new_handshaker(&request) {
        Some(handshaker) => handshaker.handshake(&request).map(Handshake::Switch),
        None => {
            debug!(uri = %request.uri(), "no handshaker for upgrade request, rejecting");
            Ok(Handshake::Reject(rejection(request.version())))
        }
    }
}

fn without_body(request: &RequestHeader) -> RequestHeader {
    let mut request = request.clone();
    let headers = request.as_mut().headers_mut();
    headers.remove(CONTENT_LENGTH);
    headers.remove(TRANSFER_ENCODING);
    request
}

fn rejection(version: Version) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = StatusCode::UPGRADE_REQUIRED;
    *response.version_mut() = version;
    let headers = response.headers_mut();
    headers.insert(SEC_WEBSOCKET_VERSION, HeaderValue::from_static(SUPPORTED_WEBSOCKET_VERSION));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(0u64));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upgrade::{Handshaker, HandshakerFactory};
    use http::Request;
    use std::sync::Arc;

    struct Refuse;

    impl HandshakerFactory for Refuse {
        fn new_handshaker(&self, _request: &RequestHeader) -> Option<Box<dyn Handshaker>> {
            None
        }
    }

    struct Accept;

    struct AcceptHandshaker;

    impl HandshakerFactory for Accept {
        fn new_handshaker(&self, request: &RequestHeader) -> Option<Box<dyn Handshaker>> {
            assert!(!request.has_body());
            Some(Box::new(AcceptHandshaker))
        }
    }

    impl Handshaker for AcceptHandshaker {
        fn handshake(&self, request: &RequestHeader) -> Result<ResponseHead, UpgradeError> {
            assert!(request.headers().get(CONTENT_LENGTH).is_none());
            Ok(Response::builder().status(StatusCode::SWITCHING_PROTOCOLS).body(()).unwrap())
        }
    }

    fn upgrade_request() -> RequestHeader {
        Request::builder()
            .uri("/ws")
            .header("upgrade", "websocket")
            .header("content-length", "4")
            .body(())
            .unwrap()
            .into()
    }

    #[test]
    fn rejected_without_handshaker() {
        let (upgrade, _session) = UpgradeResponse::new(Arc::new(Refuse), 1);

        let Handshake::Reject(response) = handshake(&upgrade, &upgrade_request()).unwrap() else {
            panic!("expected a rejection");
        };
        assert_eq!(response.status(), StatusCode::UPGRADE_REQUIRED);
        assert_eq!(response.headers().get(SEC_WEBSOCKET_VERSION), Some(&HeaderValue::from_static("13")));
        assert_eq!(response.headers().get(CONTENT_LENGTH), Some(&HeaderValue::from_static("0")));
    }

    #[test]
    fn handshaker_sees_bodyless_request() {
        let (upgrade, _session) = UpgradeResponse::new(Arc::new(Accept), 1);

        let Handshake::Switch(head) = handshake(&upgrade, &upgrade_request()).unwrap() else {
            panic!("expected a switch");
        };
        assert_eq!(head.status(), StatusCode::SWITCHING_PROTOCOLS);
    }
}
