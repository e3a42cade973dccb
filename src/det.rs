use std::cmp::Ordering;

use tracing::{debug, instrument};

use crate::contours::{approx_poly_dp, contour_area, find_contours, Contour};
use crate::error::{Result, ScanError};
use crate::image_impl::Point2f;
use crate::preprocess::EdgeMap;
use crate::types::{DetectConfig, SelectionStrategy};

/// Picks the document outline among the contours of an edge map.
pub trait QuadrilateralSelector: Send + Sync {
    fn select_best_quadrilateral(&self, contours: &[Contour]) -> Result<[Point2f; 4]>;
}

/// Contours ranked by enclosed area, largest first, truncated to `limit`.
/// Equal areas keep extraction order.
pub fn largest_contours(contours: &[Contour], limit: usize) -> Vec<(&Contour, f64)> {
    let mut ranked: Vec<(&Contour, f64)> = contours.iter().map(|c| (c, c.area())).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.truncate(limit);
    ranked
}

/// Polygon approximation with tolerance proportional to the contour perimeter.
pub fn approximate(contour: &Contour, epsilon_ratio: f64) -> Vec<(i32, i32)> {
    approx_poly_dp(&contour.points, epsilon_ratio * contour.perimeter())
}

fn to_corners(poly: &[(i32, i32)]) -> [Point2f; 4] {
    [
        Point2f::from(poly[0]),
        Point2f::from(poly[1]),
        Point2f::from(poly[2]),
        Point2f::from(poly[3]),
    ]
}

/// First 4-vertex approximation among the `max_candidates` largest contours.
#[derive(Debug, Clone)]
pub struct GreedySelector {
    pub max_candidates: usize,
    pub epsilon_ratio: f64,
}

impl Default for GreedySelector {
    fn default() -> Self {
        Self {
            max_candidates: 5,
            epsilon_ratio: 0.02,
        }
    }
}

impl QuadrilateralSelector for GreedySelector {
    fn select_best_quadrilateral(&self, contours: &[Contour]) -> Result<[Point2f; 4]> {
        for (rank, (contour, area)) in largest_contours(contours, self.max_candidates)
            .into_iter()
            .enumerate()
        {
            let approx = approximate(contour, self.epsilon_ratio);
            debug!(rank, area, vertices = approx.len(), "candidate contour");
            if approx.len() == 4 {
                return Ok(to_corners(&approx));
            }
        }
        Err(ScanError::NoDocumentFound)
    }
}

/// Largest-area 4-vertex approximation among the `max_candidates` largest contours.
#[derive(Debug, Clone)]
pub struct LargestAreaSelector {
    pub max_candidates: usize,
    pub epsilon_ratio: f64,
}

impl Default for LargestAreaSelector {
    fn default() -> Self {
        Self {
            max_candidates: 5,
            epsilon_ratio: 0.02,
        }
    }
}

impl QuadrilateralSelector for LargestAreaSelector {
    fn select_best_quadrilateral(&self, contours: &[Contour]) -> Result<[Point2f; 4]> {
        let mut best: Option<(Vec<(i32, i32)>, f64)> = None;
        for (contour, _) in largest_contours(contours, self.max_candidates) {
            let approx = approximate(contour, self.epsilon_ratio);
            if approx.len() != 4 {
                continue;
            }
            let area = contour_area(&approx);
            debug!(area, "quadrilateral candidate");
            if best.as_ref().map_or(true, |(_, a)| area > *a) {
                best = Some((approx, area));
            }
        }
        best.map(|(poly, _)| to_corners(&poly))
            .ok_or(ScanError::NoDocumentFound)
    }
}

/// Build the selector named by the configuration.
pub fn selector_for(cfg: &DetectConfig) -> Box<dyn QuadrilateralSelector> {
    match cfg.strategy {
        SelectionStrategy::Greedy => Box::new(GreedySelector {
            max_candidates: cfg.max_candidates,
            epsilon_ratio: cfg.epsilon_ratio,
        }),
        SelectionStrategy::LargestArea => Box::new(LargestAreaSelector {
            max_candidates: cfg.max_candidates,
            epsilon_ratio: cfg.epsilon_ratio,
        }),
    }
}

/// Extract contours from `edges` and let `selector` pick the document outline.
/// The returned corners are in contour order, not canonical order.
#[instrument(skip_all)]
pub fn detect_quadrilateral(
    edges: &EdgeMap,
    selector: &dyn QuadrilateralSelector,
) -> Result<[Point2f; 4]> {
    let contours = find_contours(edges.as_gray());
    debug!(contours = contours.len(), "contours extracted");
    selector.select_best_quadrilateral(&contours)
}
