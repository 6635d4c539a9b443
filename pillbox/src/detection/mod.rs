//! Detection module
//!
//! Contract for the on-device object detector and the policy that turns
//! its raw detections into an identification:
//! - `Detector`: the external model, one call per frame
//! - `catalog`: keyword table and identification results
//! - `worker`: single-slot background analysis loop

pub mod catalog;
pub mod worker;

pub use catalog::{
    demo_entry, identify, CatalogEntry, FallbackReason, Identification, IdentificationOutcome,
};
pub use worker::AnalysisWorker;

use crate::config::{DETECTOR_MAX_RESULTS, DETECTOR_SCORE_THRESHOLD};
use crate::error::{AppError, Result};
use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

/// A decoded still image from the camera
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// Clockwise rotation needed to show the image upright
    pub rotation_degrees: u32,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            rotation_degrees: 0,
        }
    }

    pub fn with_rotation(mut self, degrees: u32) -> Self {
        self.rotation_degrees = degrees % 360;
        self
    }

    /// Decode a PNG or JPEG capture
    pub fn from_encoded(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?.to_rgb8();
        Ok(Self::new(image))
    }

    /// The image with the sensor rotation applied.
    /// Rotations that are not a multiple of 90 are ignored.
    pub fn upright(&self) -> RgbImage {
        match self.rotation_degrees % 360 {
            90 => imageops::rotate90(&self.image),
            180 => imageops::rotate180(&self.image),
            270 => imageops::rotate270(&self.image),
            _ => self.image.clone(),
        }
    }
}

/// One candidate object reported by the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Score in [0, 1]
    pub confidence: f32,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// On-device object detector.
///
/// Implementations wrap a platform inference service. A call may block for
/// as long as inference takes; it is only ever invoked off the async runtime.
pub trait Detector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>>;
}

/// Stand-in used when no detection model is bundled with the build.
/// Every frame fails, so identification falls back to the demo entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableDetector;

impl Detector for UnavailableDetector {
    fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>> {
        Err(AppError::Detection("no detection model bundled".to_string()))
    }
}

/// Post-processing applied to raw detector output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorOptions {
    pub max_results: usize,
    pub score_threshold: f32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            max_results: DETECTOR_MAX_RESULTS,
            score_threshold: DETECTOR_SCORE_THRESHOLD,
        }
    }
}

impl DetectorOptions {
    /// Drop low scores, order best first, cap the count
    pub fn apply(&self, mut detections: Vec<Detection>) -> Vec<Detection> {
        detections.retain(|d| d.confidence >= self.score_threshold);
        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        detections.truncate(self.max_results);
        detections
    }
}

/// Run one frame through the detector and the identification policy.
///
/// Detector failures are absorbed here and reported as a fallback.
pub fn analyze(detector: &dyn Detector, options: &DetectorOptions, frame: &Frame) -> Identification {
    let upright = Frame::new(frame.upright());

    match detector.detect(&upright) {
        Ok(raw) => {
            let detections = options.apply(raw);
            tracing::debug!("Detector returned {} usable detections", detections.len());
            identify(&detections)
        }
        Err(e) => {
            tracing::warn!("Detector failed, showing fallback entry: {}", e);
            Identification::fallback(FallbackReason::DetectorFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    struct FixedDetector(Vec<Detection>);

    impl Detector for FixedDetector {
        fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>> {
            Ok(self.0.clone())
        }
    }

    /// Reports the frame's width so tests can see the rotation was applied
    struct WidthDetector;

    impl Detector for WidthDetector {
        fn detect(&self, frame: &Frame) -> Result<Vec<Detection>> {
            Ok(vec![Detection::new(
                format!("tylenol-{}", frame.image.width()),
                0.9,
            )])
        }
    }

    fn blank(width: u32, height: u32) -> Frame {
        Frame::new(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
    }

    #[test]
    fn test_options_filter_sort_and_cap() {
        let options = DetectorOptions {
            max_results: 2,
            score_threshold: 0.5,
        };
        let out = options.apply(vec![
            Detection::new("a", 0.55),
            Detection::new("b", 0.2),
            Detection::new("c", 0.95),
            Detection::new("d", 0.7),
        ]);

        let labels: Vec<&str> = out.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["c", "d"]);
    }

    #[test]
    fn test_default_options() {
        let options = DetectorOptions::default();
        assert_eq!(options.max_results, 5);
        assert_eq!(options.score_threshold, 0.5);
    }

    #[test]
    fn test_upright_rotates_quarter_turns() {
        let frame = blank(4, 2);
        assert_eq!(frame.upright().dimensions(), (4, 2));
        assert_eq!(frame.clone().with_rotation(90).upright().dimensions(), (2, 4));
        assert_eq!(frame.clone().with_rotation(180).upright().dimensions(), (4, 2));
        assert_eq!(frame.clone().with_rotation(450).upright().dimensions(), (2, 4));
    }

    #[test]
    fn test_analyze_passes_upright_frame() {
        let frame = blank(4, 2).with_rotation(270);
        let result = analyze(&WidthDetector, &DetectorOptions::default(), &frame);

        assert_eq!(result.label.as_deref(), Some("tylenol-2"));
        assert_eq!(result.outcome, IdentificationOutcome::Matched);
    }

    #[test]
    fn test_analyze_below_threshold_falls_back() {
        let detector = FixedDetector(vec![Detection::new("tylenol", 0.3)]);
        let result = analyze(&detector, &DetectorOptions::default(), &blank(1, 1));

        assert_eq!(
            result.outcome,
            IdentificationOutcome::Fallback(FallbackReason::NoDetections)
        );
    }

    #[test]
    fn test_analyze_absorbs_detector_failure() {
        let result = analyze(&UnavailableDetector, &DetectorOptions::default(), &blank(1, 1));

        assert_eq!(
            result.outcome,
            IdentificationOutcome::Fallback(FallbackReason::DetectorFailed)
        );
        assert_eq!(result.entry, demo_entry());
    }

    #[test]
    fn test_frame_from_encoded_png() {
        let image = RgbImage::from_pixel(3, 5, Rgb([10, 20, 30]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();

        let frame = Frame::from_encoded(bytes.get_ref()).unwrap();
        assert_eq!(frame.image.dimensions(), (3, 5));
        assert_eq!(frame.image.get_pixel(0, 0), &Rgb([10, 20, 30]));

        assert!(Frame::from_encoded(b"not an image").is_err());
    }
}
