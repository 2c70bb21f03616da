//! Cheap frame-to-frame change detection.
//!
//! Both frames are downscaled to a small square, converted to grayscale,
//! and compared with a mean absolute difference over normalized intensity.
//! The result is a change magnitude in [0, 1] and a flag against the
//! configured threshold.

use crate::defaults;
use image::RgbImage;
use image::imageops::FilterType;

/// One change-detection reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeReading {
    /// Mean absolute intensity difference in [0, 1].
    pub magnitude: f32,
    /// Whether the magnitude met or exceeded the threshold.
    pub exceeded: bool,
}

impl ChangeReading {
    /// The reading for a frame with no predecessor.
    pub fn baseline() -> Self {
        Self {
            magnitude: 0.0,
            exceeded: false,
        }
    }
}

/// Detects scene changes by comparing consecutive downscaled frames.
///
/// Holds the previous downscaled frame; the first `update` establishes the
/// baseline and reports no change. The threshold is strict: a magnitude
/// exactly at the threshold does not count as a change.
#[derive(Debug)]
pub struct ChangeDetector {
    size: u32,
    threshold: f32,
    previous: Option<image::GrayImage>,
}

impl ChangeDetector {
    pub fn new(size: u32, threshold: f32) -> Self {
        Self {
            size,
            threshold,
            previous: None,
        }
    }

    /// Returns true once a baseline frame has been recorded.
    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }

    /// Compares `frame` against the previous one and records it as the new
    /// baseline.
    pub fn update(&mut self, frame: &RgbImage) -> ChangeReading {
        let current = self.downscale(frame);
        let reading = match &self.previous {
            Some(previous) => {
                let magnitude = mean_absolute_difference(previous, &current);
                ChangeReading {
                    magnitude,
                    exceeded: magnitude > self.threshold,
                }
            }
            None => ChangeReading::baseline(),
        };
        self.previous = Some(current);
        reading
    }

    /// Discards the baseline; the next `update` reports no change again.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    fn downscale(&self, frame: &RgbImage) -> image::GrayImage {
        let resized = image::imageops::resize(frame, self.size, self.size, FilterType::Triangle);
        image::imageops::grayscale(&resized)
    }
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(defaults::CHANGE_DETECTION_SIZE, defaults::CHANGE_MAD_THRESHOLD)
    }
}

/// Mean absolute difference over normalized [0, 1] intensity.
///
/// Both images must have identical dimensions; the detector guarantees this
/// by always downscaling to the same square.
fn mean_absolute_difference(a: &image::GrayImage, b: &image::GrayImage) -> f32 {
    let total: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| u64::from(x.abs_diff(y)))
        .sum();
    total as f32 / (a.as_raw().len() as f32 * 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::frame::ScriptedFrameSource;

    #[test]
    fn first_frame_is_baseline() {
        let mut detector = ChangeDetector::default();
        assert!(!detector.has_baseline());
        let reading = detector.update(&ScriptedFrameSource::uniform_image(128, 128, 200));
        assert_eq!(reading, ChangeReading::baseline());
        assert!(detector.has_baseline());
    }

    #[test]
    fn identical_frames_report_zero_change() {
        let mut detector = ChangeDetector::default();
        let frame = ScriptedFrameSource::uniform_image(128, 128, 100);
        detector.update(&frame);
        let reading = detector.update(&frame);
        assert_eq!(reading.magnitude, 0.0);
        assert!(!reading.exceeded);
    }

    #[test]
    fn black_to_white_is_full_scale_change() {
        let mut detector = ChangeDetector::default();
        detector.update(&ScriptedFrameSource::uniform_image(128, 128, 0));
        let reading = detector.update(&ScriptedFrameSource::uniform_image(128, 128, 255));
        assert!((reading.magnitude - 1.0).abs() < 0.01);
        assert!(reading.exceeded);
    }

    #[test]
    fn small_intensity_shift_stays_below_threshold() {
        // Default threshold is 25/255; a 10-step shift is under it.
        let mut detector = ChangeDetector::default();
        detector.update(&ScriptedFrameSource::uniform_image(128, 128, 100));
        let reading = detector.update(&ScriptedFrameSource::uniform_image(128, 128, 110));
        assert!(reading.magnitude > 0.0);
        assert!(!reading.exceeded);
    }

    #[test]
    fn large_intensity_shift_exceeds_threshold() {
        let mut detector = ChangeDetector::default();
        detector.update(&ScriptedFrameSource::uniform_image(128, 128, 100));
        let reading = detector.update(&ScriptedFrameSource::uniform_image(128, 128, 180));
        assert!(reading.exceeded);
    }

    #[test]
    fn magnitude_equal_to_threshold_is_not_exceeded() {
        // Strict comparison: equality does not count as a change.
        let mut detector = ChangeDetector::new(8, 10.0 / 255.0);
        detector.update(&ScriptedFrameSource::uniform_image(8, 8, 100));
        let reading = detector.update(&ScriptedFrameSource::uniform_image(8, 8, 110));
        assert!((reading.magnitude - 10.0 / 255.0).abs() < 1e-4);
        assert!(!reading.exceeded);
    }

    #[test]
    fn differing_input_sizes_are_comparable_after_downscale() {
        let mut detector = ChangeDetector::default();
        detector.update(&ScriptedFrameSource::uniform_image(640, 480, 50));
        let reading = detector.update(&ScriptedFrameSource::uniform_image(320, 240, 50));
        assert!(reading.magnitude < 0.01);
    }

    #[test]
    fn reset_clears_baseline() {
        let mut detector = ChangeDetector::default();
        detector.update(&ScriptedFrameSource::uniform_image(64, 64, 0));
        detector.reset();
        let reading = detector.update(&ScriptedFrameSource::uniform_image(64, 64, 255));
        assert_eq!(reading, ChangeReading::baseline());
    }
}
