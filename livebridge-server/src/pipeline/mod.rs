mod encoding_profile;
mod frame_relay;
mod input_sdp;
mod pipeline_launcher;
mod transcode_pipeline;

pub use encoding_profile::*;
pub use frame_relay::*;
pub use input_sdp::*;
pub use pipeline_launcher::*;
pub use transcode_pipeline::*;
