//! Temporal window sampling.
//!
//! Splits a video into fixed-length windows and grabs a few representative
//! frames from each one.
//!
//! # Policy
//!
//! 1. Duration = frame count / fps (0 when either is unknown)
//! 2. Window starts at `0, stride, 2*stride, ...` while `start + window <= duration`
//! 3. Three frames per window: `start+1s`, the midpoint, `end-1s` (clamped into the window)
//! 4. Windows with fewer than two decodable frames are dropped

use std::path::Path;

use tracing::{debug, info};
use vpat_models::TimeRange;

use crate::error::{MediaError, MediaResult};
use crate::source::{Frame, VideoBackend, VideoSource};

/// Frames sampled per window.
pub const FRAMES_PER_WINDOW: usize = 3;

/// Minimum decodable frames for a window to be kept.
pub const MIN_FRAMES_PER_WINDOW: usize = 2;

/// Distance of the outer sample points from the window edges.
const EDGE_OFFSET_SECS: f64 = 1.0;

/// Window length and stride, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    window_secs: f64,
    stride_secs: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            window_secs: 8.0,
            stride_secs: 20.0,
        }
    }
}

impl SamplingParams {
    /// Both values must be finite and positive.
    pub fn new(window_secs: f64, stride_secs: f64) -> MediaResult<Self> {
        if !window_secs.is_finite() || window_secs <= 0.0 {
            return Err(MediaError::invalid_parameters(format!(
                "window length must be positive, got {}",
                window_secs
            )));
        }
        if !stride_secs.is_finite() || stride_secs <= 0.0 {
            return Err(MediaError::invalid_parameters(format!(
                "stride must be positive, got {}",
                stride_secs
            )));
        }
        Ok(Self {
            window_secs,
            stride_secs,
        })
    }

    pub fn window_secs(&self) -> f64 {
        self.window_secs
    }

    pub fn stride_secs(&self) -> f64 {
        self.stride_secs
    }
}

/// A sampled window with its representative frames, in sample order.
#[derive(Debug, Clone)]
pub struct Window {
    pub start_sec: f64,
    pub end_sec: f64,
    pub frames: Vec<Frame>,
}

impl Window {
    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start_sec, self.end_sec)
    }
}

/// Duration in seconds, or 0 when fps or frame count is missing.
pub fn video_duration(fps: Option<f64>, frame_count: Option<u64>) -> f64 {
    match (fps, frame_count) {
        (Some(fps), Some(frames)) if fps.is_finite() && fps > 0.0 && frames > 0 => {
            frames as f64 / fps
        }
        _ => 0.0,
    }
}

/// Candidate window start times for a video of `duration_secs`.
///
/// Starts are computed as `i * stride` rather than accumulated.
pub fn candidate_starts(duration_secs: f64, params: &SamplingParams) -> Vec<f64> {
    let mut starts = Vec::new();
    if !duration_secs.is_finite() {
        return starts;
    }

    let mut index: u64 = 0;
    loop {
        let start = index as f64 * params.stride_secs;
        if start + params.window_secs > duration_secs {
            break;
        }
        starts.push(start);
        index += 1;
    }
    starts
}

/// The three sample positions of the window starting at `start_sec`.
pub fn frame_positions(start_sec: f64, window_secs: f64) -> [f64; FRAMES_PER_WINDOW] {
    let end_sec = start_sec + window_secs;
    let clamp = |t: f64| t.clamp(start_sec, end_sec);
    [
        clamp(start_sec + EDGE_OFFSET_SECS),
        clamp(start_sec + window_secs / 2.0),
        clamp(end_sec - EDGE_OFFSET_SECS),
    ]
}

/// Sample all windows from an open source, in time order.
///
/// Per-frame decode failures are skipped; a window survives with at least
/// [`MIN_FRAMES_PER_WINDOW`] frames.
pub fn sample_windows(source: &mut dyn VideoSource, params: &SamplingParams) -> Vec<Window> {
    let duration = video_duration(source.fps(), source.frame_count());
    let starts = candidate_starts(duration, params);

    debug!(
        duration_secs = duration,
        candidates = starts.len(),
        "Sampling windows"
    );

    let mut windows = Vec::with_capacity(starts.len());
    for start_sec in starts {
        let mut frames = Vec::with_capacity(FRAMES_PER_WINDOW);
        for position in frame_positions(start_sec, params.window_secs) {
            match source.read_frame_at(position) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => debug!(position, "No frame decoded"),
                Err(e) => debug!(position, "Frame decode failed: {}", e),
            }
        }

        if frames.len() >= MIN_FRAMES_PER_WINDOW {
            windows.push(Window {
                start_sec,
                end_sec: start_sec + params.window_secs,
                frames,
            });
        } else {
            debug!(start_sec, decoded = frames.len(), "Dropping window");
        }
    }

    windows
}

/// Open `path` with `backend` and sample it.
///
/// Fails only when the file cannot be opened; the handle is released before
/// returning.
pub fn sample_video(
    backend: &dyn VideoBackend,
    path: &Path,
    params: &SamplingParams,
) -> MediaResult<Vec<Window>> {
    let mut source = backend.open(path)?;
    let windows = sample_windows(source.as_mut(), params);
    drop(source);

    info!(
        backend = backend.name(),
        windows = windows.len(),
        "Sampled video {}",
        path.display()
    );

    Ok(windows)
}
