use image::RgbImage;
use tracing::{debug, instrument};

use crate::corners::CornerSet;
use crate::error::{Result, ScanError};
use crate::image_impl::{get_perspective_transform, warp_perspective, Point2f};

/// Output size of the rectified document: the longer of each pair of
/// opposite edges, truncated to whole pixels.
pub fn target_size(corners: &CornerSet) -> (u32, u32) {
    let [tl, tr, br, bl] = corners.points;

    let width_top = (tr.x - tl.x).hypot(tr.y - tl.y);
    let width_bottom = (br.x - bl.x).hypot(br.y - bl.y);
    let width = width_top.trunc().max(width_bottom.trunc());

    let height_left = (bl.x - tl.x).hypot(bl.y - tl.y);
    let height_right = (br.x - tr.x).hypot(br.y - tr.y);
    let height = height_left.trunc().max(height_right.trunc());

    (width as u32, height as u32)
}

/// Warp the quadrilateral bounded by `corners` onto an upright rectangle.
///
/// Corner `i` lands on the `i`-th corner of `(0, 0)`, `(W - 1, 0)`,
/// `(W - 1, H - 1)`, `(0, H - 1)` where `(W, H)` is [`target_size`].
///
/// A target with `W < 2` or `H < 2` maps two destination corners onto the
/// same pixel, so no transform exists; it is reported as
/// [`ScanError::DegenerateGeometry`] rather than producing a 1 px strip.
#[instrument(skip_all)]
pub fn rectify(img: &RgbImage, corners: &CornerSet) -> Result<RgbImage> {
    let (width, height) = target_size(corners);
    // A target narrower than two pixels collapses the destination rectangle
    if width < 2 || height < 2 {
        return Err(ScanError::DegenerateGeometry(format!(
            "target size {width}x{height} has no area"
        )));
    }
    let right = (width - 1) as f32;
    let bottom = (height - 1) as f32;
    let dst = [
        Point2f::new(0.0, 0.0),
        Point2f::new(right, 0.0),
        Point2f::new(right, bottom),
        Point2f::new(0.0, bottom),
    ];

    let matrix = get_perspective_transform(&corners.points, &dst)?;
    debug!(width, height, "rectifying document");
    warp_perspective(img, &matrix, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn corners(raw: [(f32, f32); 4]) -> CornerSet {
        CornerSet {
            points: raw.map(|(x, y)| Point2f::new(x, y)),
        }
    }

    #[test]
    fn test_target_size_uses_longer_edges() {
        let c = corners([(0.0, 0.0), (100.7, 0.0), (120.0, 60.0), (10.0, 60.0)]);
        // top 100.7 -> 100, bottom 110 -> 110; left hypot(10, 60) -> 60, right hypot(19.3, 60) -> 63
        assert_eq!(target_size(&c), (110, 63));
    }

    #[test]
    fn test_axis_aligned_rectangle_is_cropped() {
        let mut img = RgbImage::from_pixel(120, 90, Rgb([0, 0, 0]));
        for y in 20..60 {
            for x in 10..90 {
                img.put_pixel(x, y, Rgb([200, 100, 50]));
            }
        }
        let c = corners([(10.0, 20.0), (90.0, 20.0), (90.0, 60.0), (10.0, 60.0)]);
        let out = rectify(&img, &c).unwrap();
        assert_eq!(out.dimensions(), (80, 40));
        assert_eq!(*out.get_pixel(0, 0), Rgb([200, 100, 50]));
        assert_eq!(*out.get_pixel(40, 20), Rgb([200, 100, 50]));
        assert_eq!(*out.get_pixel(78, 38), Rgb([200, 100, 50]));
    }

    #[test]
    fn test_collapsed_corners_are_degenerate() {
        let img = RgbImage::new(10, 10);
        let c = corners([(5.0, 5.0), (5.0, 5.0), (5.0, 5.0), (5.0, 5.0)]);
        assert!(matches!(
            rectify(&img, &c),
            Err(ScanError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_one_pixel_wide_target_is_degenerate() {
        let img = RgbImage::new(10, 10);
        let c = corners([(5.0, 2.0), (6.0, 2.0), (6.0, 8.0), (5.0, 8.0)]);
        assert_eq!(target_size(&c), (1, 6));
        match rectify(&img, &c) {
            Err(ScanError::DegenerateGeometry(msg)) => assert!(msg.contains("1x6"), "{}", msg),
            other => panic!("unexpected result: {:?}", other.map(|i| i.dimensions())),
        }
    }
}
