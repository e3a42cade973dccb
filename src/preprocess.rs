use image::{GrayImage, Luma, RgbImage};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};
use tracing::{debug, instrument};

use crate::types::PreprocessConfig;

// Mask anchors are u8, so a side length can reach at most 2 * 255 + 1.
const MAX_KERNEL_SIZE: u32 = 511;

/// Full `size x size` square mask centred on its anchor.
pub fn square_mask(size: u32) -> Mask {
    Mask::square((size.min(MAX_KERNEL_SIZE) / 2) as u8)
}

/// Ellipse inscribed in a `size x size` box. For 5x5 this is the square
/// with its four corner triples trimmed to single tips:
///
/// ```text
/// ..#..
/// #####
/// #####
/// #####
/// ..#..
/// ```
pub fn ellipse_mask(size: u32) -> Mask {
    let size = size.clamp(1, MAX_KERNEL_SIZE);
    let r = (size / 2) as i32;
    if r == 0 {
        return Mask::square(0);
    }
    let mut grid = GrayImage::new(size, size);
    for dy in -r..=r {
        let half = ((r * r - dy * dy) as f64 / (r * r) as f64).sqrt();
        let dx = (r as f64 * half).round() as i32;
        for x in -dx..=dx {
            grid.put_pixel((r + x) as u32, (r + dy) as u32, Luma([255]));
        }
    }
    Mask::from_image(&grid, r as u8, r as u8)
}

/// Morphological closing: `iterations` dilations followed by as many erosions.
pub fn close(img: &GrayImage, mask: &Mask, iterations: u32) -> GrayImage {
    let mut out = img.clone();
    for _ in 0..iterations {
        out = grayscale_dilate(&out, mask);
    }
    for _ in 0..iterations {
        out = grayscale_erode(&out, mask);
    }
    out
}

/// Binary edge map (pixels are 0 or 255) in the coordinate space of the source image.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMap(GrayImage);

impl EdgeMap {
    pub fn new(img: GrayImage) -> Self {
        Self(img)
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    /// Number of edge pixels.
    pub fn count_edges(&self) -> usize {
        self.0.pixels().filter(|p| p[0] > 0).count()
    }
}

/// Turns a colour photograph into an edge map for contour extraction.
///
/// The morphology masks are built once from the configuration and reused for
/// every image.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    pub blur_sigma: f32,
    pub close_mask: Mask,
    pub close_iterations: u32,
    pub canny_low: f32,
    pub canny_high: f32,
    pub dilate_mask: Mask,
}

impl Preprocessor {
    pub fn new(cfg: &PreprocessConfig) -> Self {
        Self {
            blur_sigma: cfg.blur_sigma(),
            close_mask: square_mask(cfg.close_kernel_size),
            close_iterations: cfg.close_iterations,
            canny_low: cfg.canny_low,
            canny_high: cfg.canny_high,
            dilate_mask: ellipse_mask(cfg.dilate_kernel_size),
        }
    }

    #[instrument(skip_all, fields(width = img.width(), height = img.height()))]
    pub fn run(&self, img: &RgbImage) -> EdgeMap {
        let gray = image::imageops::grayscale(img);
        let blurred = self.blur(&gray);
        let closed = close(&blurred, &self.close_mask, self.close_iterations);
        let edges = self.edges(&closed);
        let dilated = grayscale_dilate(&edges, &self.dilate_mask);

        let map = EdgeMap::new(dilated);
        debug!(edge_pixels = map.count_edges(), "edge map ready");
        map
    }

    fn blur(&self, gray: &GrayImage) -> GrayImage {
        if self.blur_sigma > 0.0 {
            gaussian_blur_f32(gray, self.blur_sigma)
        } else {
            gray.clone()
        }
    }

    fn edges(&self, img: &GrayImage) -> GrayImage {
        // Hysteresis compares suppressed (zero) responses against the low
        // threshold, so it must stay strictly positive.
        let low = self.canny_low.max(f32::MIN_POSITIVE);
        let high = self.canny_high.max(low);
        // canny walks a 3x3 neighbourhood and needs at least that much image
        if img.width() < 3 || img.height() < 3 {
            return GrayImage::new(img.width(), img.height());
        }
        canny(img, low, high)
    }
}

/// Convenience wrapper building a one-off [`Preprocessor`].
pub fn preprocess(img: &RgbImage, cfg: &PreprocessConfig) -> EdgeMap {
    Preprocessor::new(cfg).run(img)
}
