//! # Peer Transport
//!
//! TCP transport for the peer protocol. Frames are newline-delimited JSON
//! envelopes produced by [`Message::encode`].
//!
//! Every connection, inbound or outbound, runs the same way:
//!
//! - it is registered in the [`PeerSet`](linkchain_protocol::network::PeerSet),
//!   which hands back the receiving end of the peer's outbox;
//! - a writer task drains that outbox onto the socket;
//! - the reader loop decodes frames and feeds them to the [`Synchronizer`]
//!   one at a time;
//! - either side failing removes the peer. Removal is idempotent, so both
//!   sides may try.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use linkchain_protocol::config;
use linkchain_protocol::network::{Message, PeerId, Synchronizer};

use crate::metrics::SharedMetrics;

/// Handle to the peer transport. Cheap to clone.
#[derive(Clone)]
pub struct P2p {
    sync: Synchronizer,
    metrics: SharedMetrics,
}

impl P2p {
    pub fn new(sync: Synchronizer, metrics: SharedMetrics) -> Self {
        Self { sync, metrics }
    }

    /// Accepts inbound peers until the listener fails to report its address
    /// or the task is dropped. Accept errors are logged and skipped.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        let local = listener.local_addr()?;
        info!(%local, "p2p listener ready");

        loop {
            match listener.accept().await {
                Ok((stream, remote)) => {
                    debug!(%remote, "inbound peer connection");
                    tokio::spawn(self.clone().run_connection(stream, remote.to_string()));
                }
                Err(e) => warn!(error = %e, "failed to accept peer connection"),
            }
        }
    }

    /// Opens an outbound connection to `address` and starts serving it.
    pub async fn connect(self, address: String) -> io::Result<()> {
        let stream = TcpStream::connect(address.as_str()).await?;
        info!(%address, "connected to peer");
        tokio::spawn(self.run_connection(stream, address));
        Ok(())
    }

    /// Like [`P2p::connect`], but in the background. A failure only logs a
    /// warning.
    pub fn spawn_connect(&self, address: String) {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.connect(address.clone()).await {
                warn!(%address, error = %e, "connection failed");
            }
        });
    }

    pub fn connect_all(&self, addresses: &[String]) {
        for address in addresses {
            self.spawn_connect(address.clone());
        }
    }

    async fn run_connection(self, stream: TcpStream, address: String) {
        let (reader, mut writer) = stream.into_split();
        let (peer, mut outbox) = self.sync.peers().register(address);
        self.metrics.observe(&self.sync);

        // The outbox closes once the peer is removed from the set, which
        // ends this task and drops the write half.
        let write_side = self.clone();
        tokio::spawn(async move {
            while let Some(message) = outbox.recv().await {
                let Some(frame) = outbound_frame(peer, &message, config::MAX_FRAME_BYTES) else {
                    continue;
                };
                if let Err(e) = writer.write_all(frame.as_bytes()).await {
                    debug!(peer = %peer, error = %e, "peer write failed");
                    break;
                }
            }
            write_side.disconnect(peer);
        });

        self.sync.on_connect(peer);

        if let Err(e) = self.read_frames(peer, reader).await {
            warn!(peer = %peer, error = %e, "peer connection failed");
        }
        self.disconnect(peer);
    }

    /// Reads frames until EOF. Oversized frames end the connection; frames
    /// that are not UTF-8 are dropped like any other undecodable frame.
    async fn read_frames(&self, peer: PeerId, reader: OwnedReadHalf) -> io::Result<()> {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        while read_frame(&mut reader, &mut buf, config::MAX_FRAME_BYTES).await? {
            let frame = match std::str::from_utf8(&buf) {
                Ok(frame) => frame.trim(),
                Err(e) => {
                    warn!(peer = %peer, error = %e, "dropping non-utf8 frame");
                    self.metrics.rejected_messages_total.inc();
                    continue;
                }
            };
            if frame.is_empty() {
                continue;
            }
            self.handle_frame(peer, frame);
        }
        Ok(())
    }

    fn handle_frame(&self, peer: PeerId, frame: &str) {
        let message = match Message::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(peer = %peer, error = %e, "dropping malformed frame");
                self.metrics.rejected_messages_total.inc();
                return;
            }
        };

        debug!(peer = %peer, kind = message.kind(), "frame received");
        match self.sync.on_message(peer, message) {
            Ok(outcome) => self.metrics.record(outcome),
            Err(e) => error!(peer = %peer, error = %e, "local chain unavailable"),
        }
        self.metrics.observe(&self.sync);
    }

    fn disconnect(&self, peer: PeerId) {
        if self.sync.peers().remove(peer).is_some() {
            self.metrics.observe(&self.sync);
        }
    }
}

/// Reads one newline-terminated frame into `buf`, without the newline.
///
/// Returns `Ok(false)` at EOF. A frame whose content is longer than `max`
/// bytes is an `InvalidData` error.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>, max: usize) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let read = reader.take(max as u64 + 1).read_until(b'\n', buf).await?;
    if read == 0 {
        return Ok(false);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.len() > max {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame exceeds {} bytes", max),
        ));
    }
    Ok(true)
}

/// Encodes `message` as a newline-terminated frame. Frames the remote side
/// would refuse (content over `max` bytes) are logged and skipped.
fn outbound_frame(peer: PeerId, message: &Message, max: usize) -> Option<String> {
    let mut frame = match message.encode() {
        Ok(frame) => frame,
        Err(e) => {
            error!(peer = %peer, error = %e, "failed to encode message");
            return None;
        }
    };
    if frame.len() > max {
        warn!(
            peer = %peer,
            kind = message.kind(),
            bytes = frame.len(),
            max,
            "outbound frame exceeds the frame limit, not sending"
        );
        return None;
    }
    frame.push('\n');
    Some(frame)
}
