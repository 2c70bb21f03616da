//! Frames and the frame capture seam.

use crate::error::{PerceptError, Result};
use image::RgbImage;
use std::collections::VecDeque;
use std::time::Instant;

/// One captured camera frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// Monotonically increasing capture index.
    pub sequence: u64,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self {
            image,
            sequence,
            captured_at: Instant::now(),
        }
    }
}

/// Trait for frame capture.
///
/// This trait allows swapping implementations (a real camera vs scripted
/// frames in tests).
pub trait FrameSource: Send {
    /// Captures the next frame.
    ///
    /// `Ok(None)` means the source is exhausted (a finite source such as a
    /// recorded clip); an error means capture failed and the tick should be
    /// skipped.
    fn capture(&mut self) -> Result<Option<Frame>>;
}

/// Scripted frame source for tests: yields fixed images in order, then
/// reports exhaustion. Failing ticks can be injected anywhere in the script.
#[derive(Debug, Default)]
pub struct ScriptedFrameSource {
    frames: VecDeque<Option<RgbImage>>,
    sequence: u64,
}

impl ScriptedFrameSource {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames: frames.into_iter().map(Some).collect(),
            sequence: 0,
        }
    }

    /// Appends a failing capture tick to the script.
    pub fn then_failure(mut self) -> Self {
        self.frames.push_back(None);
        self
    }

    /// Appends more frames to the script.
    pub fn then_frames(mut self, frames: Vec<RgbImage>) -> Self {
        self.frames.extend(frames.into_iter().map(Some));
        self
    }

    /// A uniform `width` x `height` image filled with one intensity.
    pub fn uniform_image(width: u32, height: u32, intensity: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, image::Rgb([intensity, intensity, intensity]))
    }
}

impl FrameSource for ScriptedFrameSource {
    fn capture(&mut self) -> Result<Option<Frame>> {
        match self.frames.pop_front() {
            Some(Some(image)) => {
                let frame = Frame::new(image, self.sequence);
                self.sequence += 1;
                Ok(Some(frame))
            }
            Some(None) => Err(PerceptError::FrameCapture {
                message: "scripted capture failure".to_string(),
            }),
            None => Ok(None),
        }
    }
}
