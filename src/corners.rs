use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ScanError};
use crate::image_impl::Point2f;

/// Four document corners in canonical order:
/// `[top-left, top-right, bottom-right, bottom-left]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerSet {
    pub points: [Point2f; 4],
}

impl CornerSet {
    pub fn top_left(&self) -> Point2f {
        self.points[0]
    }

    pub fn top_right(&self) -> Point2f {
        self.points[1]
    }

    pub fn bottom_right(&self) -> Point2f {
        self.points[2]
    }

    pub fn bottom_left(&self) -> Point2f {
        self.points[3]
    }

    /// Shoelace area of the quadrilateral.
    pub fn area(&self) -> f32 {
        let p = &self.points;
        let mut twice = 0.0f32;
        for i in 0..4 {
            let j = (i + 1) % 4;
            twice += p[i].x * p[j].y - p[j].x * p[i].y;
        }
        twice.abs() * 0.5
    }
}

fn sum(p: &Point2f) -> f32 {
    p.x + p.y
}

fn diff(p: &Point2f) -> f32 {
    p.y - p.x
}

/// Compare by `key`, then by position, so ties resolve the same way whatever
/// the input order.
fn cmp_by(key: fn(&Point2f) -> f32, a: &Point2f, b: &Point2f) -> Ordering {
    key(a)
        .partial_cmp(&key(b))
        .unwrap_or(Ordering::Equal)
        .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
        .then(a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal))
}

fn argmin(points: &[Point2f; 4], key: fn(&Point2f) -> f32) -> usize {
    (0..4)
        .min_by(|&i, &j| cmp_by(key, &points[i], &points[j]))
        .unwrap_or(0)
}

fn argmax(points: &[Point2f; 4], key: fn(&Point2f) -> f32) -> usize {
    (0..4)
        .max_by(|&i, &j| cmp_by(key, &points[i], &points[j]))
        .unwrap_or(0)
}

/// Slot indices chosen by the extremal criteria: min sum, min diff, max sum, max diff.
fn extremal_slots(points: &[Point2f; 4]) -> [usize; 4] {
    [
        argmin(points, sum),
        argmin(points, diff),
        argmax(points, sum),
        argmax(points, diff),
    ]
}

fn has_collision(slots: &[usize; 4]) -> bool {
    (0..4).any(|i| (i + 1..4).any(|j| slots[i] == slots[j]))
}

/// Clockwise (in image coordinates) around the centroid, starting at the
/// point with the smallest `x + y`.
fn angular_order(points: &[Point2f; 4]) -> [Point2f; 4] {
    let cx = points.iter().map(|p| p.x).sum::<f32>() / 4.0;
    let cy = points.iter().map(|p| p.y).sum::<f32>() / 4.0;
    let start = points[argmin(points, sum)];
    let start_angle = (start.y - cy).atan2(start.x - cx);

    let mut ordered = *points;
    // y grows downwards, so increasing atan2 angle is clockwise on screen
    ordered.sort_by(|a, b| {
        let ka = (a.y - cy).atan2(a.x - cx) - start_angle;
        let kb = (b.y - cy).atan2(b.x - cx) - start_angle;
        let ka = ka.rem_euclid(std::f32::consts::TAU);
        let kb = kb.rem_euclid(std::f32::consts::TAU);
        ka.partial_cmp(&kb)
            .unwrap_or(Ordering::Equal)
            .then_with(|| cmp_by(sum, a, b))
    });
    // The start point sits at angle zero; guard against rounding putting it last
    if let Some(pos) = ordered.iter().position(|p| *p == start) {
        ordered.rotate_left(pos);
    }
    ordered
}

/// Put four points in `[top-left, top-right, bottom-right, bottom-left]` order.
///
/// Each slot is the extremum of its own criterion: top-left minimises `x + y`,
/// bottom-right maximises it, top-right minimises `y - x`, bottom-left
/// maximises it. When two slots pick the same point the points are ordered
/// by angle around their centroid instead.
pub fn order_corners(points: [Point2f; 4]) -> CornerSet {
    let slots = extremal_slots(&points);
    if has_collision(&slots) {
        warn!(?points, "corner slots collide, ordering by angle");
        return CornerSet {
            points: angular_order(&points),
        };
    }
    CornerSet {
        points: slots.map(|i| points[i]),
    }
}

/// Like [`order_corners`], but a slot collision is an error.
pub fn order_corners_strict(points: [Point2f; 4]) -> Result<CornerSet> {
    let slots = extremal_slots(&points);
    if has_collision(&slots) {
        return Err(ScanError::DegenerateGeometry(format!(
            "corner slots collide: {:?} for {:?}",
            slots, points
        )));
    }
    Ok(CornerSet {
        points: slots.map(|i| points[i]),
    })
}

/// Reject corner sets with repeated points or an area below `min_area`.
pub fn validate_corners(corners: &CornerSet, min_area: f32) -> Result<()> {
    let p = &corners.points;
    for i in 0..4 {
        for j in i + 1..4 {
            if p[i].distance(&p[j]) < f32::EPSILON {
                return Err(ScanError::DegenerateGeometry(format!(
                    "corners {} and {} coincide at ({}, {})",
                    i, j, p[i].x, p[i].y
                )));
            }
        }
    }
    let area = corners.area();
    if area < min_area {
        return Err(ScanError::DegenerateGeometry(format!(
            "quadrilateral area {area} is below {min_area}"
        )));
    }
    Ok(())
}
