use crate::pipeline::EncodingProfile;

pub const DEFAULT_FFMPEG_PATH: &str = "ffmpeg";

/// What a pipeline needs to know to start publishing one stream.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    /// Session description of the loopback RTP input.
    pub sdp: String,
    pub target_url: String,
}

/// A fully resolved process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Written to the child's stdin, which is then closed.
    pub stdin: Option<String>,
}

/// Turns a pipeline input into the command that runs it.
pub trait PipelineLauncher: Send + Sync {
    fn command(&self, input: &PipelineInput) -> PipelineCommand;
}

#[derive(Debug, Clone)]
pub struct FfmpegLauncher {
    pub program: String,
    pub profile: EncodingProfile,
}

impl FfmpegLauncher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            profile: EncodingProfile::default(),
        }
    }
}

impl Default for FfmpegLauncher {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG_PATH)
    }
}

impl PipelineLauncher for FfmpegLauncher {
    fn command(&self, input: &PipelineInput) -> PipelineCommand {
        PipelineCommand {
            program: self.program.clone(),
            args: self.profile.ffmpeg_args(&input.target_url),
            stdin: Some(input.sdp.clone()),
        }
    }
}
