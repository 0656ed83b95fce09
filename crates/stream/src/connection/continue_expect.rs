use tracing::debug;

/// Bookkeeping of the `100 Continue` interim response owed to the latest request.
///
/// The interim response is sent at most once per request, and only while
/// that request is the sole outstanding exchange (`in_flight == 1`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum ContinueState {
    #[default]
    Idle,
    /// The request asked for `100 Continue`; `pending` latches a body demand
    /// that arrived while earlier exchanges were still outstanding
    Expecting { pending: bool },
    Sent,
    /// The client stopped waiting, a payload event or a final response came first
    Superseded,
}

impl ContinueState {
    /// A new request head replaces whatever the previous request left behind.
    pub(crate) fn on_request_head(&mut self, expects_continue: bool) {
        if matches!(self, ContinueState::Expecting { .. }) {
            debug!("continue expectation superseded by a new request");
        }
        *self = if expects_continue { ContinueState::Expecting { pending: false } } else { ContinueState::Idle };
    }

    /// The body consumer signalled demand. Returns true if the interim
    /// response must be written now.
    pub(crate) fn on_body_requested(&mut self, in_flight: usize) -> bool {
        let ContinueState::Expecting { pending } = *self else {
            return false;
        };

        if in_flight == 1 {
            *self = ContinueState::Sent;
            return true;
        }

        if !pending {
            debug!(in_flight, "continue latched until earlier responses complete");
        }
        *self = ContinueState::Expecting { pending: true };
        false
    }

    /// A response completed. Returns true if a latched interim response must
    /// be written now.
    pub(crate) fn on_response_written(&mut self, in_flight: usize) -> bool {
        if in_flight == 1 && *self == (ContinueState::Expecting { pending: true }) {
            *self = ContinueState::Sent;
            return true;
        }
        false
    }

    /// Body bytes arrive only once the client stopped waiting for the interim response.
    pub(crate) fn on_payload(&mut self) {
        if matches!(self, ContinueState::Expecting { .. }) {
            debug!("client sent payload without waiting for continue");
            *self = ContinueState::Superseded;
        }
    }

    /// A final response head is about to be written. Returns true if it
    /// answers a request whose continue was never delivered.
    pub(crate) fn on_final_head(&mut self, in_flight: usize) -> bool {
        if in_flight == 1 && matches!(self, ContinueState::Expecting { .. }) {
            *self = ContinueState::Superseded;
            return true;
        }
        false
    }
}
