use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// Which quadrilateral search the edge detector runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// First 4-vertex approximation among the largest contours wins.
    #[default]
    Greedy,
    /// Largest 4-vertex approximation among the largest contours wins.
    LargestArea,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Gaussian kernel side length (odd).
    pub blur_kernel_size: u32,
    /// Square structuring element side length for the closing step (odd).
    pub close_kernel_size: u32,
    pub close_iterations: u32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Elliptical structuring element side length for the final dilation (odd).
    pub dilate_kernel_size: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: 11,
            close_kernel_size: 5,
            close_iterations: 3,
            // Over-detect edges: the lower threshold stays just above zero.
            canny_low: 1.0,
            canny_high: 200.0,
            dilate_kernel_size: 5,
        }
    }
}

impl PreprocessConfig {
    /// Sigma used for a Gaussian kernel of `blur_kernel_size` when no sigma is
    /// given explicitly.
    pub fn blur_sigma(&self) -> f32 {
        0.3 * ((self.blur_kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// How many of the largest contours are examined.
    pub max_candidates: usize,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub epsilon_ratio: f64,
    pub strategy: SelectionStrategy,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            max_candidates: 5,
            epsilon_ratio: 0.02,
            strategy: SelectionStrategy::Greedy,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub preprocess: PreprocessConfig,
    pub detect: DetectConfig,
    /// Fail with `DegenerateGeometry` instead of reordering when two corner
    /// slots pick the same point.
    pub strict_corner_order: bool,
    /// Minimum corner polygon area (px^2) accepted before rectification.
    pub min_document_area: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            preprocess: PreprocessConfig::default(),
            detect: DetectConfig::default(),
            strict_corner_order: false,
            min_document_area: 1.0,
        }
    }
}

impl ScanConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: ScanConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.preprocess;
        for (name, size) in [
            ("blur_kernel_size", p.blur_kernel_size),
            ("close_kernel_size", p.close_kernel_size),
            ("dilate_kernel_size", p.dilate_kernel_size),
        ] {
            if size == 0 || size % 2 == 0 || size > 511 {
                return Err(ScanError::Config(format!(
                    "{name} must be an odd number between 1 and 511, got {size}"
                )));
            }
        }
        if !(p.canny_low >= 0.0 && p.canny_low <= p.canny_high) {
            return Err(ScanError::Config(format!(
                "canny thresholds must satisfy 0 <= low <= high, got ({}, {})",
                p.canny_low, p.canny_high
            )));
        }
        if self.detect.max_candidates == 0 {
            return Err(ScanError::Config("max_candidates must be at least 1".to_string()));
        }
        if !(self.detect.epsilon_ratio > 0.0) {
            return Err(ScanError::Config(format!(
                "epsilon_ratio must be positive, got {}",
                self.detect.epsilon_ratio
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sigma_matches_11x11_kernel() {
        let cfg = PreprocessConfig::default();
        assert!((cfg.blur_sigma() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = ScanConfig::from_json_str(
            r#"{ "detect": { "strategy": "largest_area" }, "strict_corner_order": true }"#,
        )
        .unwrap();
        assert_eq!(cfg.detect.strategy, SelectionStrategy::LargestArea);
        assert_eq!(cfg.detect.max_candidates, 5);
        assert!(cfg.strict_corner_order);
        assert_eq!(cfg.preprocess, PreprocessConfig::default());
    }

    #[test]
    fn test_even_kernel_rejected() {
        let err = ScanConfig::from_json_str(r#"{ "preprocess": { "blur_kernel_size": 10 } }"#)
            .unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
    }

    #[test]
    fn test_oversized_kernel_rejected() {
        let mut cfg = ScanConfig::default();
        cfg.preprocess.dilate_kernel_size = 513;
        assert!(matches!(cfg.validate(), Err(ScanError::Config(_))));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut cfg = ScanConfig::default();
        cfg.preprocess.canny_low = 250.0;
        assert!(matches!(cfg.validate(), Err(ScanError::Config(_))));
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        assert!(matches!(
            ScanConfig::from_json_str("{ not json"),
            Err(ScanError::Config(_))
        ));
    }
}
