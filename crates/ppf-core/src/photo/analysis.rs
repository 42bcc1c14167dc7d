//! Live-frame quality scoring.
//!
//! The score is advisory: it only drives whether the capture control is
//! enabled. The photo-count rules enforced on step completion stay
//! authoritative.

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

/// Problem found in a live frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FrameDefect {
    Blurry,
    TooDark,
    Overexposed,
    LowResolution,
}

impl FrameDefect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blurry => "blurry",
            Self::TooDark => "too_dark",
            Self::Overexposed => "overexposed",
            Self::LowResolution => "low_resolution",
        }
    }
}

impl std::fmt::Display for FrameDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one frame check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameAssessment {
    /// 0 to 100
    pub score: f64,
    pub defects: Vec<FrameDefect>,
}

/// Scores a single frame.
pub trait FrameAnalyzer: Send + Sync {
    fn assess(&self, frame: &DynamicImage) -> FrameAssessment;
}

/// Blur, exposure and resolution heuristics.
#[derive(Debug, Clone, PartialEq)]
pub struct SharpnessAnalyzer {
    /// Laplacian variance at and above which a frame counts as sharp
    pub blur_threshold: f64,
    /// Mean luminance below which a frame is too dark
    pub dark_threshold: f64,
    /// Mean luminance above which a frame is overexposed
    pub bright_threshold: f64,
    pub min_width: u32,
    pub min_height: u32,
    /// Frames are downsampled to this edge before analysis
    pub analysis_edge: u32,
}

impl Default for SharpnessAnalyzer {
    fn default() -> Self {
        Self {
            blur_threshold: 100.0,
            dark_threshold: 50.0,
            bright_threshold: 210.0,
            min_width: 640,
            min_height: 480,
            analysis_edge: 512,
        }
    }
}

const SHARPNESS_POINTS: f64 = 60.0;
const EXPOSURE_POINTS: f64 = 40.0;
const LOW_RESOLUTION_PENALTY: f64 = 20.0;

impl SharpnessAnalyzer {
    /// Variance of the 4-neighbour Laplacian over a grayscale frame.
    pub fn laplacian_variance(frame: &DynamicImage) -> f64 {
        let gray = frame.to_luma8();
        let (width, height) = gray.dimensions();
        if width < 3 || height < 3 {
            return 0.0;
        }

        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut count = 0.0;
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let at = |dx: u32, dy: u32| f64::from(gray.get_pixel(dx, dy)[0]);
                let lap = 4.0 * at(x, y) - at(x - 1, y) - at(x + 1, y) - at(x, y - 1) - at(x, y + 1);
                sum += lap;
                sum_sq += lap * lap;
                count += 1.0;
            }
        }
        let mean = sum / count;
        sum_sq / count - mean * mean
    }

    /// Mean luminance, 0 to 255.
    pub fn mean_luminance(frame: &DynamicImage) -> f64 {
        let gray = frame.to_luma8();
        let pixels = gray.as_raw();
        if pixels.is_empty() {
            return 0.0;
        }
        pixels.iter().map(|p| f64::from(*p)).sum::<f64>() / pixels.len() as f64
    }
}

impl FrameAnalyzer for SharpnessAnalyzer {
    fn assess(&self, frame: &DynamicImage) -> FrameAssessment {
        let (width, height) = frame.dimensions();
        let mut defects = Vec::new();

        let sample = if width.max(height) > self.analysis_edge {
            frame.resize(self.analysis_edge, self.analysis_edge, FilterType::Triangle)
        } else {
            frame.clone()
        };

        let variance = Self::laplacian_variance(&sample);
        if variance < self.blur_threshold {
            defects.push(FrameDefect::Blurry);
        }
        let sharpness = (variance / self.blur_threshold).min(1.0) * SHARPNESS_POINTS;

        let luminance = Self::mean_luminance(&sample);
        let exposure = if luminance < self.dark_threshold {
            defects.push(FrameDefect::TooDark);
            luminance / self.dark_threshold * EXPOSURE_POINTS
        } else if luminance > self.bright_threshold {
            defects.push(FrameDefect::Overexposed);
            (255.0 - luminance) / (255.0 - self.bright_threshold) * EXPOSURE_POINTS
        } else {
            EXPOSURE_POINTS
        };

        let mut score = sharpness + exposure;
        if width < self.min_width || height < self.min_height {
            defects.push(FrameDefect::LowResolution);
            score -= LOW_RESOLUTION_PENALTY;
        }

        FrameAssessment {
            score: score.clamp(0.0, 100.0),
            defects,
        }
    }
}
