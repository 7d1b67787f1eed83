//! OpenCV `VideoCapture` backend.

use std::path::Path;

use opencv::core::Mat;
use opencv::imgproc;
use opencv::prelude::*;
use opencv::videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT, CAP_PROP_POS_MSEC};
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::source::{Frame, VideoBackend, VideoSource};

/// Decodes any container/codec the linked OpenCV build supports.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenCvBackend;

impl OpenCvBackend {
    pub fn new() -> Self {
        Self
    }
}

impl VideoBackend for OpenCvBackend {
    fn open(&self, path: &Path) -> MediaResult<Box<dyn VideoSource>> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| MediaError::open_failed(path, "path is not valid UTF-8"))?;

        let cap = VideoCapture::from_file(path_str, CAP_ANY)
            .map_err(|e| MediaError::open_failed(path, e.to_string()))?;

        if !cap.is_opened().unwrap_or(false) {
            return Err(MediaError::open_failed(path, "no decoder could open the file"));
        }

        debug!("Opened {} with OpenCV", path.display());
        Ok(Box::new(OpenCvSource { cap }))
    }

    fn name(&self) -> &'static str {
        "opencv"
    }
}

struct OpenCvSource {
    cap: VideoCapture,
}

fn positive(value: opencv::Result<f64>) -> Option<f64> {
    value.ok().filter(|v| v.is_finite() && *v > 0.0)
}

impl VideoSource for OpenCvSource {
    fn fps(&self) -> Option<f64> {
        positive(self.cap.get(CAP_PROP_FPS))
    }

    fn frame_count(&self) -> Option<u64> {
        positive(self.cap.get(CAP_PROP_FRAME_COUNT)).map(|n| n as u64)
    }

    fn read_frame_at(&mut self, position_sec: f64) -> MediaResult<Option<Frame>> {
        // The seek flag is unreliable across backends; the read decides.
        self.cap
            .set(CAP_PROP_POS_MSEC, position_sec * 1000.0)
            .map_err(|e| MediaError::decode_failed(format!("seek to {}s: {}", position_sec, e)))?;

        let mut frame = Mat::default();
        let grabbed = self
            .cap
            .read(&mut frame)
            .map_err(|e| MediaError::decode_failed(format!("read at {}s: {}", position_sec, e)))?;
        if !grabbed || frame.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color_def(&frame, &mut rgb, imgproc::COLOR_BGR2RGB)
            .map_err(|e| MediaError::decode_failed(format!("color conversion: {}", e)))?;

        mat_to_frame(&rgb)
    }
}

fn mat_to_frame(rgb: &Mat) -> MediaResult<Option<Frame>> {
    let width = u32::try_from(rgb.cols()).unwrap_or(0);
    let height = u32::try_from(rgb.rows()).unwrap_or(0);
    if width == 0 || height == 0 {
        return Ok(None);
    }

    let data = rgb
        .data_bytes()
        .map_err(|e| MediaError::decode_failed(format!("frame data: {}", e)))?;

    Ok(Frame::from_raw(width, height, data.to_vec()))
}
