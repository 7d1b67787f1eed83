//! Video decoding and temporal window sampling.
//!
//! This crate provides:
//! - A codec-agnostic decoder abstraction (`VideoBackend` / `VideoSource`)
//! - The window sampling policy over that abstraction
//! - An OpenCV backend (feature `opencv`, on by default)
//! - Streaming download of remote source videos

pub mod download;
pub mod error;
#[cfg(feature = "opencv")]
pub mod opencv_backend;
pub mod sampler;
pub mod source;

pub use download::download_video;
pub use error::{MediaError, MediaResult};
#[cfg(feature = "opencv")]
pub use opencv_backend::OpenCvBackend;
pub use sampler::{
    candidate_starts, frame_positions, sample_video, sample_windows, video_duration,
    SamplingParams, Window, FRAMES_PER_WINDOW, MIN_FRAMES_PER_WINDOW,
};
pub use source::{Frame, VideoBackend, VideoSource};
