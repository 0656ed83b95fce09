/// Buffer sizes of one [`StreamAdapter`](crate::connection::StreamAdapter).
///
/// All buffers are bounded: a full request buffer stops the adapter from
/// reading further request heads, a full response buffer makes
/// [`Responder::submit`](crate::connection::Responder::submit) wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterConfig {
    pub(crate) request_buffer: usize,
    pub(crate) response_buffer: usize,
    pub(crate) body_buffer: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self { request_buffer: 1, response_buffer: 8, body_buffer: 8 }
    }
}

impl AdapterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests queued for the application before head reads pause.
    pub fn request_buffer(mut self, capacity: usize) -> Self {
        self.request_buffer = capacity;
        self
    }

    /// Responses queued for the connection before submitting waits.
    pub fn response_buffer(mut self, capacity: usize) -> Self {
        self.response_buffer = capacity;
        self
    }

    /// Chunks buffered per streamed request body.
    pub fn body_buffer(mut self, capacity: usize) -> Self {
        self.body_buffer = capacity.max(1);
        self
    }
}
