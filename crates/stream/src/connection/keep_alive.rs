//! Decides, per outbound response head, whether the connection survives the
//! response.

use http::header::CONNECTION;
use tracing::debug;

use crate::connection::state::ConnectionState;
use crate::protocol::ResponseHead;
use crate::protocol::header::{contains_token, is_chunked, is_content_length_set, is_keep_alive_default, set_keep_alive};

/// Applies the keep-alive and framing rules to a final response head.
///
/// Any rule demanding a close sets `close_after_current` and rewrites the
/// head so it announces the close. Returns true if the connection stays open.
pub(crate) fn decide(state: &mut ConnectionState, head: &mut ResponseHead) -> bool {
    let version = state.request_version();
    let headers = head.headers();

    let mut close = if is_keep_alive_default(version) {
        contains_token(headers, CONNECTION, "close")
    } else {
        !contains_token(headers, CONNECTION, "keep-alive")
    };

    if state.continue_state.on_final_head(state.in_flight) {
        debug!("continue never delivered, closing after response");
        close = true;
    }

    // without framing the end of the response is only marked by the close
    if !is_content_length_set(headers) && !is_chunked(headers) {
        debug!(status = %head.status(), "response carries no framing, closing after response");
        close = true;
    }

    if close {
        state.close_after_current = true;
        let head_version = head.version();
        set_keep_alive(head.headers_mut(), head_version, false);
    }

    !close
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::continue_expect::ContinueState;
    use crate::protocol::RequestHeader;
    use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
    use http::{HeaderValue, Request, Response, StatusCode, Version};

    fn state_for(version: Version) -> ConnectionState {
        let request = Request::builder().version(version).body(()).unwrap();
        ConnectionState { last_request: Some(RequestHeader::from(request)), in_flight: 1, ..Default::default() }
    }

    fn head(status: u16, headers: &[(&'static str, &'static str)]) -> ResponseHead {
        let mut builder = Response::builder().status(status);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn http11_framed_response_keeps_alive() {
        let mut state = state_for(Version::HTTP_11);
        let mut head = head(200, &[("content-length", "5")]);

        assert!(decide(&mut state, &mut head));
        assert!(!state.close_after_current);
        assert!(head.headers().get(CONNECTION).is_none());
    }

    #[test]
    fn http11_close_token_closes() {
        let mut state = state_for(Version::HTTP_11);
        let mut head = head(200, &[("content-length", "0"), ("connection", "Keep-Alive, Close")]);

        assert!(!decide(&mut state, &mut head));
        assert!(state.close_after_current);
        assert_eq!(head.headers().get(CONNECTION), Some(&HeaderValue::from_static("close")));
    }

    #[test]
    fn http10_needs_explicit_keep_alive() {
        let mut state = state_for(Version::HTTP_10);
        let mut head = head(200, &[("content-length", "0")]);
        assert!(!decide(&mut state, &mut head));

        let mut state = state_for(Version::HTTP_10);
        let mut head = self::head(200, &[("content-length", "0"), ("connection", "keep-alive")]);
        assert!(decide(&mut state, &mut head));
    }

    #[test]
    fn no_content_without_framing_closes() {
        let mut state = state_for(Version::HTTP_11);
        let mut head = head(204, &[]);

        assert!(!decide(&mut state, &mut head));
        assert!(state.close_after_current);
        assert_eq!(head.headers().get(CONNECTION), Some(&HeaderValue::from_static("close")));
    }

    #[test]
    fn chunked_response_keeps_alive() {
        let mut state = state_for(Version::HTTP_11);
        let mut head = head(200, &[("transfer-encoding", "gzip, chunked")]);

        assert!(decide(&mut state, &mut head));
        assert!(head.headers().contains_key(TRANSFER_ENCODING));
        assert!(!head.headers().contains_key(CONTENT_LENGTH));
    }

    #[test]
    fn undelivered_continue_closes_sole_exchange() {
        let mut state = state_for(Version::HTTP_11);
        state.continue_state.on_request_head(true);
        let mut head = head(413, &[("content-length", "0")]);

        assert!(!decide(&mut state, &mut head));
        assert_eq!(state.continue_state, ContinueState::Superseded);
    }

    #[test]
    fn undelivered_continue_of_later_request_is_kept() {
        let mut state = state_for(Version::HTTP_11);
        state.in_flight = 2;
        state.continue_state.on_request_head(true);
        let mut head = head(200, &[("content-length", "0")]);

        assert!(decide(&mut state, &mut head));
        assert_eq!(state.continue_state, ContinueState::Expecting { pending: false });
    }
}
