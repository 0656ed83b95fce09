use std::fmt;
use std::io;

use futures::channel::mpsc;
use futures::{SinkExt, StreamExt, future};
use tracing::{debug, info};

use crate::protocol::UpgradeError;
use crate::upgrade::{FrameSink, FrameStream, RawFrame};

/// An upgraded connection: the frame codec spliced to the application session.
///
/// [`Upgraded::run`] forwards the application's outgoing frames to the peer
/// and the peer's frames to the application until both directions end.
pub struct Upgraded {
    frame_stream: FrameStream,
    frame_sink: FrameSink,
    outgoing: mpsc::Receiver<RawFrame>,
    incoming: mpsc::Sender<RawFrame>,
}

impl fmt::Debug for Upgraded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upgraded").finish_non_exhaustive()
    }
}

impl Upgraded {
    pub(crate) fn new(
        frame_stream: FrameStream,
        frame_sink: FrameSink,
        outgoing: mpsc::Receiver<RawFrame>,
        incoming: mpsc::Sender<RawFrame>,
    ) -> Self {
        Self { frame_stream, frame_sink, outgoing, incoming }
    }

    pub async fn run(self) -> Result<(), UpgradeError> {
        let Upgraded { mut frame_stream, mut frame_sink, outgoing, mut incoming } = self;

        let to_peer = async move {
            let mut outgoing = outgoing.map(Ok::<RawFrame, io::Error>);
            frame_sink.send_all(&mut outgoing).await?;
            frame_sink.close().await
        };

        let from_peer = async move {
            let mut received: usize = 0;
            while let Some(frame) = frame_stream.next().await {
                let frame = frame?;
                received += 1;
                if incoming.send(frame).await.is_err() {
                    debug!(received, "upgrade session stopped receiving frames");
                    break;
                }
            }
            incoming.close_channel();
            Ok::<usize, io::Error>(received)
        };

        let (sent, received) = future::join(to_peer, from_peer).await;
        sent?;
        let received = received?;
        info!(received, "upgraded connection finished");
        Ok(())
    }
}
