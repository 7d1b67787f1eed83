//! Decoder abstraction used by the window sampler.

use std::path::Path;

use crate::error::MediaResult;

/// A decoded RGB frame.
pub type Frame = image::RgbImage;

/// An open, seekable video.
///
/// Dropping the source releases the underlying handle.
pub trait VideoSource {
    /// Frames per second, if the container reports it.
    fn fps(&self) -> Option<f64>;

    /// Total number of frames, if the container reports it.
    fn frame_count(&self) -> Option<u64>;

    /// Seek to `position_sec` and decode one frame.
    ///
    /// `Ok(None)` means nothing decodable at that position.
    fn read_frame_at(&mut self, position_sec: f64) -> MediaResult<Option<Frame>>;
}

/// Opens video files for sampling.
pub trait VideoBackend: Send + Sync {
    /// Open `path`. Fails when the file cannot be opened at all.
    fn open(&self, path: &Path) -> MediaResult<Box<dyn VideoSource>>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}
