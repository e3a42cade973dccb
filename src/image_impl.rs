//! Pixel-level primitives: points, projective transforms and bilinear warping.

use image::{Rgb, RgbImage};
use nalgebra::{DMatrix, Matrix3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2f {
    pub x: f32,
    pub y: f32,
}

impl Point2f {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2f) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(i32, i32)> for Point2f {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x as f32, y as f32)
    }
}

/// Solve for the projective transform mapping each `src_pts[i]` onto `dst_pts[i]`.
pub fn get_perspective_transform(
    src_pts: &[Point2f; 4],
    dst_pts: &[Point2f; 4],
) -> Result<Matrix3<f64>> {
    // Try the simple method first: solve for 8 parameters with c22 = 1
    let mut a = DMatrix::<f64>::zeros(8, 8);
    let mut b = DMatrix::<f64>::zeros(8, 1);

    for i in 0..4 {
        let x = src_pts[i].x as f64;
        let y = src_pts[i].y as f64;
        let u = dst_pts[i].x as f64;
        let v = dst_pts[i].y as f64;

        a[(i, 0)] = x;
        a[(i, 1)] = y;
        a[(i, 2)] = 1.0;
        a[(i, 6)] = -u * x;
        a[(i, 7)] = -u * y;
        b[(i, 0)] = u;

        a[(i + 4, 3)] = x;
        a[(i + 4, 4)] = y;
        a[(i + 4, 5)] = 1.0;
        a[(i + 4, 6)] = -v * x;
        a[(i + 4, 7)] = -v * y;
        b[(i + 4, 0)] = v;
    }

    if let Some(h) = a.clone().lu().solve(&b) {
        let residual = (&a * &h - &b).norm();
        if residual < 1e-6 {
            return Ok(Matrix3::new(
                h[(0, 0)], h[(1, 0)], h[(2, 0)],
                h[(3, 0)], h[(4, 0)], h[(5, 0)],
                h[(6, 0)], h[(7, 0)], 1.0,
            ));
        }
    }

    // Fall back to the null space of the full 9-parameter system
    let mut a9 = DMatrix::<f64>::zeros(8, 9);
    for i in 0..4 {
        let x = src_pts[i].x as f64;
        let y = src_pts[i].y as f64;
        let u = dst_pts[i].x as f64;
        let v = dst_pts[i].y as f64;

        a9[(i, 0)] = x;
        a9[(i, 1)] = y;
        a9[(i, 2)] = 1.0;
        a9[(i, 6)] = -u * x;
        a9[(i, 7)] = -u * y;
        a9[(i, 8)] = -u;

        a9[(i + 4, 3)] = x;
        a9[(i + 4, 4)] = y;
        a9[(i + 4, 5)] = 1.0;
        a9[(i + 4, 6)] = -v * x;
        a9[(i + 4, 7)] = -v * y;
        a9[(i + 4, 8)] = -v;
    }

    let ata = a9.transpose() * &a9;
    let svd = ata.svd(true, false);
    let u = svd
        .u
        .ok_or_else(|| ScanError::DegenerateGeometry("SVD of the corner system failed".to_string()))?;
    // Singular values are sorted descending: the last column spans the null space
    let h = u.column(8);

    Ok(Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]))
}

/// Apply a projective transform to a single point.
pub fn project(m: &Matrix3<f64>, p: Point2f) -> Option<Point2f> {
    let x = p.x as f64;
    let y = p.y as f64;
    let w = m[(2, 0)] * x + m[(2, 1)] * y + m[(2, 2)];
    if w.abs() < f64::EPSILON {
        return None;
    }
    Some(Point2f::new(
        ((m[(0, 0)] * x + m[(0, 1)] * y + m[(0, 2)]) / w) as f32,
        ((m[(1, 0)] * x + m[(1, 1)] * y + m[(1, 2)]) / w) as f32,
    ))
}

/// Warp `src` into a `width x height` image. `matrix` maps source coordinates to
/// destination coordinates; every destination pixel is sampled through its inverse.
pub fn warp_perspective(
    src: &RgbImage,
    matrix: &Matrix3<f64>,
    width: u32,
    height: u32,
) -> Result<RgbImage> {
    let mut out_img = RgbImage::new(width, height);

    let m_inv = matrix.try_inverse().ok_or_else(|| {
        ScanError::DegenerateGeometry("perspective transform is not invertible".to_string())
    })?;

    let (m00, m01, m02) = (m_inv[(0, 0)], m_inv[(0, 1)], m_inv[(0, 2)]);
    let (m10, m11, m12) = (m_inv[(1, 0)], m_inv[(1, 1)], m_inv[(1, 2)]);
    let (m20, m21, m22) = (m_inv[(2, 0)], m_inv[(2, 1)], m_inv[(2, 2)]);
    let src_cols = src.width() as i32;
    let src_rows = src.height() as i32;

    for y in 0..height {
        let y_f = y as f64;
        let m01y = m01 * y_f;
        let m11y = m11 * y_f;
        let m21y = m21 * y_f;

        for x in 0..width {
            let x_f = x as f64;
            let w = m20 * x_f + m21y + m22;
            if w.abs() < f64::EPSILON {
                continue;
            }
            let src_x_f = (m00 * x_f + m01y + m02) / w;
            let src_y_f = (m10 * x_f + m11y + m12) / w;
            if !src_x_f.is_finite() || !src_y_f.is_finite() {
                continue;
            }

            let x0 = src_x_f.floor() as i32;
            let y0 = src_y_f.floor() as i32;
            let x1 = x0 + 1;
            let y1 = y0 + 1;

            if x0 >= 0 && x1 < src_cols && y0 >= 0 && y1 < src_rows {
                let fx = src_x_f - x0 as f64;
                let fy = src_y_f - y0 as f64;

                let p00 = src.get_pixel(x0 as u32, y0 as u32);
                let p10 = src.get_pixel(x1 as u32, y0 as u32);
                let p01 = src.get_pixel(x0 as u32, y1 as u32);
                let p11 = src.get_pixel(x1 as u32, y1 as u32);

                let mut px = [0u8; 3];
                for (c, value) in px.iter_mut().enumerate() {
                    let v = (1.0 - fx) * (1.0 - fy) * p00[c] as f64
                        + fx * (1.0 - fy) * p10[c] as f64
                        + (1.0 - fx) * fy * p01[c] as f64
                        + fx * fy * p11[c] as f64;
                    *value = v.round().clamp(0.0, 255.0) as u8;
                }
                out_img.put_pixel(x, y, Rgb(px));
            } else {
                // Nearest neighbour on the last row/column
                let nx = src_x_f.round() as i32;
                let ny = src_y_f.round() as i32;
                if nx >= 0 && nx < src_cols && ny >= 0 && ny < src_rows {
                    out_img.put_pixel(x, y, *src.get_pixel(nx as u32, ny as u32));
                }
            }
        }
    }

    Ok(out_img)
}
