//! Stream metadata and signature classification

mod classifier;
mod signature;

pub use classifier::{
    classify, classify_audio, classify_hdr, match_fps, AudioStreamInfo, ClassifierOptions,
    StreamInfo, VideoStreamInfo, FPS_TOLERANCE,
};
pub use signature::{AudioFormat, FpsAxis, FpsBucket, HdrType, Signature};
