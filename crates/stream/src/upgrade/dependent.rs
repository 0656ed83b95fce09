use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

/// Something that lives only as long as the stream adapter sits on the
/// connection's event path, such as a task feeding it requests.
///
/// Dependents are detached when the adapter leaves the event path, on upgrade
/// or when the connection ends.
pub trait Dependent: Send {
    /// Detaches the dependent, returning false if it was already gone.
    fn detach(&mut self) -> bool;
}

impl Dependent for CancellationToken {
    fn detach(&mut self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.cancel();
        true
    }
}

impl Dependent for AbortHandle {
    fn detach(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.abort();
        true
    }
}
