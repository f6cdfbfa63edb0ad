use crate::transport::{MediaKind, MediaTrack, PeerLink};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

#[derive(Debug, Default)]
pub struct RelayCounters {
    packets: AtomicU64,
    bytes: AtomicU64,
    send_errors: AtomicU64,
}

impl RelayCounters {
    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn send_errors(&self) -> u64 {
        self.send_errors.load(Ordering::Relaxed)
    }
}

/// Periodic keyframe requests for a relayed video track.
pub struct KeyframeRequests {
    pub link: Arc<dyn PeerLink>,
    pub interval: Duration,
}

/// Copies RTP packets from a remote track to a loopback UDP port where the
/// transcoder listens.
pub struct FrameRelay {
    label: String,
    kind: MediaKind,
    counters: Arc<RelayCounters>,
    tasks: Vec<JoinHandle<()>>,
}

impl FrameRelay {
    pub async fn start(
        label: impl Into<String>,
        track: Arc<dyn MediaTrack>,
        target: SocketAddr,
        keyframes: Option<KeyframeRequests>,
    ) -> io::Result<Self> {
        let label = label.into();
        let kind = track.kind();
        let socket = UdpSocket::bind(("127.0.0.1", 0)).await?;
        socket.connect(target).await?;

        let counters = Arc::new(RelayCounters::default());
        let mut tasks = Vec::with_capacity(2);

        if let Some(KeyframeRequests { link, interval }) = keyframes {
            let ssrc = track.ssrc();
            let label = label.clone();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    ticker.tick().await;
                    if let Err(e) = link.request_keyframe(ssrc).await {
                        debug!("[{}] Keyframe request failed: {}", label, e);
                    }
                }
            }));
        }

        tasks.push(tokio::spawn({
            let label = label.clone();
            let counters = counters.clone();
            async move {
                while let Some(packet) = track.read_packet().await {
                    match socket.send(&packet).await {
                        Ok(sent) => {
                            counters.packets.fetch_add(1, Ordering::Relaxed);
                            counters.bytes.fetch_add(sent as u64, Ordering::Relaxed);
                        }
                        // Refused until the transcoder has bound its port.
                        Err(e) => {
                            counters.send_errors.fetch_add(1, Ordering::Relaxed);
                            trace!("[{}] {} packet dropped: {}", label, kind, e);
                        }
                    }
                }
                debug!("[{}] {} track ended", label, kind);
            }
        }));

        info!("[{}] Relaying {} to {}", label, kind, target);

        Ok(Self {
            label,
            kind,
            counters,
            tasks,
        })
    }

    pub fn counters(&self) -> &RelayCounters {
        &self.counters
    }

    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!(
            "[{}] {} relay stopped: {} packets, {} bytes, {} dropped",
            self.label,
            self.kind,
            self.counters.packets(),
            self.counters.bytes(),
            self.counters.send_errors()
        );
    }
}

impl Drop for FrameRelay {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
