use http::Version;

use crate::connection::continue_expect::ContinueState;
use crate::protocol::RequestHeader;
use crate::upgrade::UpgradeResponse;

/// Per-connection state shared by the assembler, the sequencer, the continue
/// controller, the keep-alive decision and the upgrade coordinator.
///
/// Owned by one [`StreamAdapter`](crate::connection::StreamAdapter) and only
/// touched from its event loop, so no synchronization is involved.
#[derive(Debug, Default)]
pub(crate) struct ConnectionState {
    /// Head of the most recently received request
    pub(crate) last_request: Option<RequestHeader>,
    /// Requests received whose response isn't fully written yet
    pub(crate) in_flight: usize,
    pub(crate) continue_state: ContinueState,
    /// Set once the connection must close after the response being written
    pub(crate) close_after_current: bool,
    /// An upgrade waiting for the request body to drain
    pub(crate) pending_upgrade: Option<UpgradeResponse>,
}

impl ConnectionState {
    /// Protocol version of the last request, HTTP/1.1 before any request arrived.
    pub(crate) fn request_version(&self) -> Version {
        self.last_request.as_ref().map_or(Version::HTTP_11, RequestHeader::version)
    }
}
