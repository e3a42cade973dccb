use std::path::{Path, PathBuf};
use std::time::Instant;

use image::RgbImage;
use tracing::{info, instrument};

use crate::corners::{order_corners, order_corners_strict, validate_corners, CornerSet};
use crate::det::{detect_quadrilateral, selector_for, QuadrilateralSelector};
use crate::error::Result;
use crate::geometry::rectify;
use crate::ocr::{assemble_text, TextExtractor};
use crate::output::{save_document, save_image, OutputPaths};
use crate::preprocess::Preprocessor;
use crate::types::ScanConfig;

#[derive(Debug, Clone)]
pub struct ScanOutput {
    /// Document corners in the source image, canonical order.
    pub corners: CornerSet,
    pub image: RgbImage,
    /// Wall time of the scan in seconds.
    pub elapse: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedDocument {
    pub image_path: PathBuf,
    /// Set only when text extraction ran.
    pub document_path: Option<PathBuf>,
    pub text: Option<String>,
}

/// Preprocess, detect, order and rectify in one call.
pub struct DocumentScanner {
    pub config: ScanConfig,
    preprocessor: Preprocessor,
    selector: Box<dyn QuadrilateralSelector>,
}

impl DocumentScanner {
    pub fn new(config: ScanConfig) -> Result<Self> {
        let selector = selector_for(&config.detect);
        Self::with_selector(config, selector)
    }

    /// Use a custom quadrilateral search instead of the configured strategy.
    pub fn with_selector(
        config: ScanConfig,
        selector: Box<dyn QuadrilateralSelector>,
    ) -> Result<Self> {
        config.validate()?;
        let preprocessor = Preprocessor::new(&config.preprocess);
        Ok(Self {
            config,
            preprocessor,
            selector,
        })
    }

    #[instrument(skip_all, fields(width = img.width(), height = img.height()))]
    pub fn scan(&self, img: &RgbImage) -> Result<ScanOutput> {
        let start = Instant::now();

        let edges = self.preprocessor.run(img);
        let quad = detect_quadrilateral(&edges, self.selector.as_ref())?;
        drop(edges);

        let corners = if self.config.strict_corner_order {
            order_corners_strict(quad)?
        } else {
            order_corners(quad)
        };
        validate_corners(&corners, self.config.min_document_area)?;

        let image = rectify(img, &corners)?;
        let elapse = start.elapsed().as_secs_f64();
        info!(
            out_width = image.width(),
            out_height = image.height(),
            elapse,
            "document rectified"
        );
        Ok(ScanOutput {
            corners,
            image,
            elapse,
        })
    }

    /// Decode an image file and scan it.
    pub fn scan_path<P: AsRef<Path>>(&self, path: P) -> Result<ScanOutput> {
        let img = image::open(path.as_ref())?.to_rgb8();
        self.scan(&img)
    }

    /// Scan `path`, write the rectified image, then (when an extractor is
    /// given) recognise its text and write the document.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn process<P: AsRef<Path>>(
        &self,
        path: P,
        extractor: Option<&dyn TextExtractor>,
        paths: &OutputPaths,
    ) -> Result<ProcessedDocument> {
        let scanned = self.scan_path(path)?;
        save_image(&scanned.image, &paths.image)?;

        let Some(extractor) = extractor else {
            return Ok(ProcessedDocument {
                image_path: paths.image.clone(),
                document_path: None,
                text: None,
            });
        };

        let lines = extractor.extract_text(&scanned.image)?;
        let text = assemble_text(lines);
        save_document(&text, &paths.document, paths.format)?;
        Ok(ProcessedDocument {
            image_path: paths.image.clone(),
            document_path: Some(paths.document.clone()),
            text: Some(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contours::Contour;
    use crate::error::ScanError;
    use crate::image_impl::Point2f;
    use image::Rgb;

    /// Ignores the contours and reports a fixed outline.
    struct FixedOutline([Point2f; 4]);

    impl QuadrilateralSelector for FixedOutline {
        fn select_best_quadrilateral(&self, _contours: &[Contour]) -> Result<[Point2f; 4]> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_custom_selector_drives_rectification() {
        let outline = [
            Point2f::new(50.0, 40.0),
            Point2f::new(10.0, 40.0),
            Point2f::new(10.0, 10.0),
            Point2f::new(50.0, 10.0),
        ];
        let scanner =
            DocumentScanner::with_selector(ScanConfig::default(), Box::new(FixedOutline(outline)))
                .unwrap();
        let img = RgbImage::from_pixel(64, 64, Rgb([90, 120, 150]));
        let out = scanner.scan(&img).unwrap();

        assert_eq!(out.corners.top_left(), Point2f::new(10.0, 10.0));
        assert_eq!(out.corners.bottom_right(), Point2f::new(50.0, 40.0));
        assert_eq!(out.image.dimensions(), (40, 30));
        assert_eq!(*out.image.get_pixel(20, 15), Rgb([90, 120, 150]));
    }

    #[test]
    fn test_tiny_outline_fails_area_check() {
        let outline = [
            Point2f::new(10.0, 10.0),
            Point2f::new(11.0, 10.0),
            Point2f::new(11.0, 10.5),
            Point2f::new(10.0, 10.5),
        ];
        let config = ScanConfig {
            min_document_area: 4.0,
            ..ScanConfig::default()
        };
        let scanner = DocumentScanner::with_selector(config, Box::new(FixedOutline(outline))).unwrap();
        let img = RgbImage::new(32, 32);
        assert!(matches!(
            scanner.scan(&img),
            Err(ScanError::DegenerateGeometry(_))
        ));
    }
}
