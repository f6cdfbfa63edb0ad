use crate::transport::{MediaKind, TrackCodec};
use std::fmt::Write;
use std::io;
use std::net::UdpSocket;

const LOOPBACK: &str = "127.0.0.1";
const PORT_ATTEMPTS: usize = 16;

/// One media section of the transcoder's input description.
#[derive(Debug, Clone)]
pub struct InputStream {
    pub kind: MediaKind,
    pub codec: TrackCodec,
    /// Loopback port the transcoder listens on for RTP. RTCP uses `port + 1`.
    pub port: u16,
}

/// Builds a plain-RTP session description telling the transcoder where each
/// track arrives and how it is encoded.
pub fn input_sdp(streams: &[InputStream]) -> String {
    let mut sdp = String::new();
    let _ = writeln!(sdp, "v=0");
    let _ = writeln!(sdp, "o=- 0 0 IN IP4 {LOOPBACK}");
    let _ = writeln!(sdp, "s=livebridge");
    let _ = writeln!(sdp, "c=IN IP4 {LOOPBACK}");
    let _ = writeln!(sdp, "t=0 0");

    for stream in streams {
        let pt = stream.codec.payload_type;
        let _ = writeln!(sdp, "m={} {} RTP/AVP {}", stream.kind, stream.port, pt);

        let mut rtpmap = format!("{}/{}", stream.codec.encoding_name(), stream.codec.clock_rate);
        if stream.kind == MediaKind::Audio && stream.codec.channels > 0 {
            let _ = write!(rtpmap, "/{}", stream.codec.channels);
        }
        let _ = writeln!(sdp, "a=rtpmap:{pt} {rtpmap}");

        if !stream.codec.fmtp.is_empty() {
            let _ = writeln!(sdp, "a=fmtp:{pt} {}", stream.codec.fmtp);
        }
    }

    sdp
}

/// Finds a free loopback port whose successor is also free, so the
/// transcoder can bind RTP and RTCP side by side.
pub fn allocate_port_pair() -> io::Result<u16> {
    for _ in 0..PORT_ATTEMPTS {
        let rtp = UdpSocket::bind((LOOPBACK, 0))?;
        let port = rtp.local_addr()?.port();
        let Some(rtcp_port) = port.checked_add(1) else {
            continue;
        };
        if UdpSocket::bind((LOOPBACK, rtcp_port)).is_ok() {
            return Ok(port);
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AddrInUse,
        "no free loopback port pair for the transcoder input",
    ))
}
