//! # docscan - document scanning in pure Rust
//!
//! Finds a paper document in a photograph and warps it into an upright,
//! axis-aligned image, optionally handing the result to an OCR tool.
//!
//! The pipeline is linear: grayscale, blur, morphological closing, Canny edges
//! and dilation produce an edge map; contour tracing and polygon approximation
//! find the document outline; its corners are put in canonical order and the
//! original image is rectified through a projective transform.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docscan::{DocumentScanner, ScanConfig};
//!
//! let scanner = DocumentScanner::new(ScanConfig::default())?;
//! let scanned = scanner.scan_path("receipt.jpg")?;
//!
//! println!("corners: {:?}", scanned.corners.points);
//! scanned.image.save("receipt_flat.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod contours;
mod corners;
mod det;
mod error;
mod geometry;
mod image_impl;
mod ocr;
mod output;
mod preprocess;
mod scanner;
mod types;

pub use crate::contours::{approx_poly_dp, arc_length, contour_area, find_contours, BorderKind, Contour};
pub use crate::corners::{order_corners, order_corners_strict, validate_corners, CornerSet};
pub use crate::det::{
    approximate, detect_quadrilateral, largest_contours, selector_for, GreedySelector,
    LargestAreaSelector, QuadrilateralSelector,
};
pub use crate::error::{Result, ScanError};
pub use crate::geometry::{rectify, target_size};
pub use crate::image_impl::{get_perspective_transform, project, warp_perspective, Point2f};
pub use crate::ocr::{assemble_text, parse_results, SuryaOcr, TextExtractor, TextLine};
pub use crate::output::{default_output_dir, save_document, save_image, DocumentFormat, OutputPaths};
pub use crate::preprocess::{close, ellipse_mask, preprocess, square_mask, EdgeMap, Preprocessor};
pub use crate::scanner::{DocumentScanner, ProcessedDocument, ScanOutput};
pub use crate::types::{DetectConfig, PreprocessConfig, ScanConfig, SelectionStrategy};
