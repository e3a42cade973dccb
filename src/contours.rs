// Pure Rust contour extraction and polygon approximation
// Border following after Suzuki & Abe (1985), flat list of outer and hole borders

use image::GrayImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderKind {
    /// Outer border of a foreground component.
    Outer,
    /// Border of a background hole enclosed by foreground.
    Hole,
}

#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<(i32, i32)>,
    pub kind: BorderKind,
}

impl Contour {
    pub fn new(points: Vec<(i32, i32)>, kind: BorderKind) -> Self {
        Self { points, kind }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn area(&self) -> f64 {
        contour_area(&self.points)
    }

    pub fn perimeter(&self) -> f64 {
        arc_length(&self.points, true)
    }
}

// 8-neighbourhood as (row, col) offsets, counterclockwise on screen starting East
const DIRS: [(i32, i32); 8] = [
    (0, 1),   // E
    (-1, 1),  // NE
    (-1, 0),  // N
    (-1, -1), // NW
    (0, -1),  // W
    (1, -1),  // SW
    (1, 0),   // S
    (1, 1),   // SE
];

fn direction(from: (i32, i32), to: (i32, i32)) -> usize {
    let d = (to.0 - from.0, to.1 - from.1);
    DIRS.iter().position(|&o| o == d).unwrap_or(0)
}

/// Find every border in a binary image (pixels > 127 are foreground).
///
/// Each returned contour is an ordered, closed chain of border pixels in
/// image coordinates `(x, y)`. Both outer borders and hole borders are
/// returned, in raster order of their starting pixel.
pub fn find_contours(binary_img: &GrayImage) -> Vec<Contour> {
    let (width, height) = binary_img.dimensions();
    let w = width as i32 + 2;
    let h = height as i32 + 2;

    // Label image with a one pixel zero frame so every neighbour lookup is in bounds
    let mut f = vec![0i32; (w * h) as usize];
    for (x, y, p) in binary_img.enumerate_pixels() {
        if p[0] > 127 {
            f[((y as i32 + 1) * w + x as i32 + 1) as usize] = 1;
        }
    }
    let at = |i: i32, j: i32| (i * w + j) as usize;

    let mut contours = Vec::new();
    let mut nbd = 1i32;

    for i in 1..h - 1 {
        for j in 1..w - 1 {
            let fij = f[at(i, j)];
            if fij == 0 {
                continue;
            }

            let start = if fij == 1 && f[at(i, j - 1)] == 0 {
                Some(((i, j - 1), BorderKind::Outer))
            } else if fij >= 1 && f[at(i, j + 1)] == 0 {
                Some(((i, j + 1), BorderKind::Hole))
            } else {
                None
            };

            let Some((from, kind)) = start else {
                continue;
            };
            nbd += 1;

            let points = follow_border(&mut f, w, (i, j), from, nbd);
            contours.push(Contour::new(
                points.into_iter().map(|(r, c)| (c - 1, r - 1)).collect(),
                kind,
            ));
        }
    }

    contours
}

/// Trace one border starting at `start`, entering from the zero pixel `from`.
/// Marks visited border pixels with `nbd` (or `-nbd` where the border touches
/// background on the right) and returns the chain in `(row, col)` padded coordinates.
fn follow_border(f: &mut [i32], w: i32, start: (i32, i32), from: (i32, i32), nbd: i32) -> Vec<(i32, i32)> {
    let at = |p: (i32, i32)| (p.0 * w + p.1) as usize;
    let step = |p: (i32, i32), d: usize| (p.0 + DIRS[d].0, p.1 + DIRS[d].1);

    // Clockwise search around the start pixel for the first non-zero neighbour
    let d0 = direction(start, from);
    let first = (0..8)
        .map(|k| step(start, (d0 + 8 - k) % 8))
        .find(|&p| f[at(p)] != 0);

    let Some(first) = first else {
        // Isolated pixel
        f[at(start)] = -nbd;
        return vec![start];
    };

    let mut border = Vec::new();
    let mut prev = first;
    let mut curr = start;

    loop {
        border.push(curr);

        // Counterclockwise search starting just after `prev`
        let dp = direction(curr, prev);
        let mut east_is_zero = false;
        let mut next = prev;
        for k in 1..=8 {
            let d = (dp + k) % 8;
            let p = step(curr, d);
            if f[at(p)] != 0 {
                next = p;
                break;
            }
            if d == 0 {
                east_is_zero = true;
            }
        }

        let idx = at(curr);
        if east_is_zero {
            f[idx] = -nbd;
        } else if f[idx] == 1 {
            f[idx] = nbd;
        }

        if next == start && curr == first {
            break;
        }
        prev = curr;
        curr = next;
    }

    border
}

/// Signed-area-free polygon area (shoelace formula) of a closed point chain.
pub fn contour_area(points: &[(i32, i32)]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let n = points.len();
    let mut area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        let (x1, y1) = points[i];
        let (x2, y2) = points[j];
        area += x1 as f64 * y2 as f64 - x2 as f64 * y1 as f64;
    }

    (area * 0.5).abs()
}

/// Length of a point chain; `closed` adds the segment from the last point back to the first.
pub fn arc_length(points: &[(i32, i32)], closed: bool) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    let mut length: f64 = points
        .windows(2)
        .map(|s| seg_len(s[0], s[1]))
        .sum();
    if closed {
        length += seg_len(points[points.len() - 1], points[0]);
    }
    length
}

fn seg_len(a: (i32, i32), b: (i32, i32)) -> f64 {
    ((b.0 - a.0) as f64).hypot((b.1 - a.1) as f64)
}

/// Distance from `p` to the line through `a` and `b` (to `a` itself when `a == b`).
fn line_distance(p: (i32, i32), a: (i32, i32), b: (i32, i32)) -> f64 {
    let dx = (b.0 - a.0) as f64;
    let dy = (b.1 - a.1) as f64;
    let len = dx.hypot(dy);
    if len < f64::EPSILON {
        return seg_len(p, a);
    }
    ((p.0 - a.0) as f64 * dy - (p.1 - a.1) as f64 * dx).abs() / len
}

/// Douglas-Peucker approximation of a closed contour.
///
/// The curve is split at two mutually distant points, each half is simplified
/// independently, and a final pass removes vertices lying within `epsilon` of
/// the line through their neighbours.
pub fn approx_poly_dp(points: &[(i32, i32)], epsilon: f64) -> Vec<(i32, i32)> {
    let n = points.len();
    if n <= 2 {
        return points.to_vec();
    }

    // Pick a split pair by repeatedly jumping to the farthest point
    let mut a = 0usize;
    let mut b = 0usize;
    for _ in 0..3 {
        let far = farthest_from(points, a);
        if far == b {
            break;
        }
        b = far;
        std::mem::swap(&mut a, &mut b);
    }
    let (a, b) = (a.min(b), a.max(b));
    if a == b {
        // Every point coincides
        return vec![points[a]];
    }

    let mut keep = vec![false; n];
    keep[a] = true;
    keep[b] = true;
    let first_half: Vec<usize> = (a..=b).collect();
    let second_half: Vec<usize> = (b..n).chain(0..=a).collect();
    simplify_run(points, &first_half, epsilon, &mut keep);
    simplify_run(points, &second_half, epsilon, &mut keep);

    let mut result: Vec<(i32, i32)> = (0..n).filter(|&i| keep[i]).map(|i| points[i]).collect();

    // Drop vertices that became near-collinear with their neighbours
    let mut changed = true;
    while changed && result.len() > 3 {
        changed = false;
        let m = result.len();
        for i in 0..m {
            let prev = result[(i + m - 1) % m];
            let next = result[(i + 1) % m];
            if line_distance(result[i], prev, next) <= epsilon {
                result.remove(i);
                changed = true;
                break;
            }
        }
    }

    result
}

fn farthest_from(points: &[(i32, i32)], from: usize) -> usize {
    let origin = points[from];
    let mut best = from;
    let mut best_d = -1.0f64;
    for (i, &p) in points.iter().enumerate() {
        let d = seg_len(origin, p);
        if d > best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

/// Iterative Douglas-Peucker over the index run `run` (first and last are kept).
fn simplify_run(points: &[(i32, i32)], run: &[usize], epsilon: f64, keep: &mut [bool]) {
    let mut stack = vec![(0usize, run.len() - 1)];
    while let Some((lo, hi)) = stack.pop() {
        if hi <= lo + 1 {
            continue;
        }
        let a = points[run[lo]];
        let b = points[run[hi]];
        let mut best = lo;
        let mut best_d = 0.0f64;
        for k in lo + 1..hi {
            let d = line_distance(points[run[k]], a, b);
            if d > best_d {
                best_d = d;
                best = k;
            }
        }
        if best_d > epsilon {
            keep[run[best]] = true;
            stack.push((lo, best));
            stack.push((best, hi));
        }
    }
}
