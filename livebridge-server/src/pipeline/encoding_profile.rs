/// Fixed ffmpeg encoding settings, tuned for low-latency RTMP ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingProfile {
    pub video_codec: String,
    pub preset: String,
    pub tune: String,
    pub video_bitrate_kbps: u32,
    /// Keyframe interval in frames.
    pub gop_size: u32,
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_bitrate_kbps: u32,
    pub audio_sample_rate: u32,
    pub audio_channels: u8,
    pub container: String,
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_owned(),
            preset: "veryfast".to_owned(),
            tune: "zerolatency".to_owned(),
            video_bitrate_kbps: 2500,
            gop_size: 60,
            pixel_format: "yuv420p".to_owned(),
            audio_codec: "aac".to_owned(),
            audio_bitrate_kbps: 128,
            audio_sample_rate: 44100,
            audio_channels: 2,
            container: "flv".to_owned(),
        }
    }
}

impl EncodingProfile {
    /// ffmpeg arguments reading an RTP session description from stdin and
    /// publishing to `target_url`.
    pub fn ffmpeg_args(&self, target_url: &str) -> Vec<String> {
        let video_rate = format!("{}k", self.video_bitrate_kbps);
        let buffer = format!("{}k", self.video_bitrate_kbps * 2);
        let gop = self.gop_size.to_string();

        [
            "-hide_banner",
            "-loglevel",
            "warning",
            "-protocol_whitelist",
            "pipe,udp,rtp",
            "-fflags",
            "+genpts",
            "-f",
            "sdp",
            "-i",
            "pipe:0",
            "-map",
            "0:v:0",
            "-map",
            "0:a:0",
            "-c:v",
            &self.video_codec,
            "-preset",
            &self.preset,
            "-tune",
            &self.tune,
            "-b:v",
            &video_rate,
            "-maxrate",
            &video_rate,
            "-bufsize",
            &buffer,
            "-pix_fmt",
            &self.pixel_format,
            "-g",
            &gop,
            "-keyint_min",
            &gop,
            "-c:a",
            &self.audio_codec,
            "-b:a",
            &format!("{}k", self.audio_bitrate_kbps),
            "-ar",
            &self.audio_sample_rate.to_string(),
            "-ac",
            &self.audio_channels.to_string(),
            "-f",
            &self.container,
            target_url,
        ]
        .iter()
        .map(|arg| (*arg).to_owned())
        .collect()
    }
}
