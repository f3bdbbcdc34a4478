//! Brush outline extraction
//!
//! Marching squares over the thresholded coverage, with segments joined into
//! closed contours through a quantized endpoint map and then simplified with
//! Ramer-Douglas-Peucker. Coordinates are in brush pixels at scale 1.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::mask::PixelMask;

/// Endpoint hashing precision (1/32 pixel)
const QUANT_SCALE: f64 = 32.0;

/// Simplification tolerance in pixels
const SIMPLIFY_EPSILON: f64 = 0.5;

/// Transparent border added so shapes touching the edge still close
const PADDING: usize = 1;

pub type Point = (f64, f64);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrushOutline {
    width: usize,
    height: usize,
    contours: Vec<Vec<Point>>,
}

impl BrushOutline {
    /// Contours where coverage crosses `threshold`
    pub fn from_mask(mask: &PixelMask, threshold: u8) -> Self {
        let (width, height) = (mask.width(), mask.height());
        if mask.is_empty() {
            return Self::default();
        }

        let w = width + 2 * PADDING;
        let h = height + 2 * PADDING;
        let mut inside = vec![false; w * h];
        for y in 0..height {
            for x in 0..width {
                inside[(y + PADDING) * w + x + PADDING] = mask.alpha_at(x as i32, y as i32) >= threshold;
            }
        }

        let offset = PADDING as f64;
        let contours = trace_contours(&inside, w, h)
            .into_iter()
            .map(|c| simplify(&c, SIMPLIFY_EPSILON))
            .filter(|c| c.len() >= 3)
            .map(|c| c.into_iter().map(|(x, y)| (x - offset, y - offset)).collect())
            .collect();

        Self {
            width,
            height,
            contours,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Closed polylines; the last point repeats the first
    pub fn contours(&self) -> &[Vec<Point>] {
        &self.contours
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    /// SVG path data, one `M ... Z` subpath per contour, centred on the brush
    pub fn to_svg_path(&self) -> String {
        let cx = self.width as f64 / 2.0;
        let cy = self.height as f64 / 2.0;
        let mut path = String::new();
        for contour in &self.contours {
            for (i, (x, y)) in contour.iter().enumerate() {
                let cmd = if i == 0 { "M" } else { "L" };
                if !path.is_empty() {
                    path.push(' ');
                }
                let _ = write!(path, "{} {:.2} {:.2}", cmd, x - cx, y - cy);
            }
            path.push_str(" Z");
        }
        path
    }
}

#[derive(Clone, Copy, Debug)]
struct Segment {
    p0: Point,
    p1: Point,
}

#[inline]
fn quantize(p: Point) -> (i64, i64) {
    (
        (p.0 * QUANT_SCALE).round() as i64,
        (p.1 * QUANT_SCALE).round() as i64,
    )
}

/// Edge pairs per cell case; corners TL=8, TR=4, BR=2, BL=1,
/// edges Top=0, Right=1, Bottom=2, Left=3
const CASE_EDGES: [[i8; 4]; 16] = [
    [-1, -1, -1, -1],
    [2, 3, -1, -1],
    [1, 2, -1, -1],
    [1, 3, -1, -1],
    [0, 1, -1, -1],
    [0, 3, 1, 2],
    [0, 2, -1, -1],
    [0, 3, -1, -1],
    [0, 3, -1, -1],
    [0, 2, -1, -1],
    [0, 1, 2, 3],
    [0, 1, -1, -1],
    [1, 3, -1, -1],
    [1, 2, -1, -1],
    [2, 3, -1, -1],
    [-1, -1, -1, -1],
];

/// Midpoint of a cell edge; cell corners sit on pixel centres
#[inline]
fn edge_midpoint(cx: usize, cy: usize, edge: i8) -> Point {
    let x = cx as f64 + 0.5;
    let y = cy as f64 + 0.5;
    match edge {
        0 => (x + 0.5, y),
        1 => (x + 1.0, y + 0.5),
        2 => (x + 0.5, y + 1.0),
        _ => (x, y + 0.5),
    }
}

fn trace_contours(inside: &[bool], w: usize, h: usize) -> Vec<Vec<Point>> {
    let mut segments = Vec::new();
    for cy in 0..h - 1 {
        for cx in 0..w - 1 {
            let tl = inside[cy * w + cx] as usize;
            let tr = inside[cy * w + cx + 1] as usize;
            let bl = inside[(cy + 1) * w + cx] as usize;
            let br = inside[(cy + 1) * w + cx + 1] as usize;
            let edges = CASE_EDGES[(tl << 3) | (tr << 2) | (br << 1) | bl];

            for pair in edges.chunks_exact(2) {
                if pair[0] >= 0 && pair[1] >= 0 {
                    segments.push(Segment {
                        p0: edge_midpoint(cx, cy, pair[0]),
                        p1: edge_midpoint(cx, cy, pair[1]),
                    });
                }
            }
        }
    }

    let mut endpoints: HashMap<(i64, i64), Vec<(usize, bool)>> = HashMap::new();
    for (i, seg) in segments.iter().enumerate() {
        endpoints.entry(quantize(seg.p0)).or_default().push((i, true));
        endpoints.entry(quantize(seg.p1)).or_default().push((i, false));
    }

    let mut used = vec![false; segments.len()];
    let mut contours = Vec::new();

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }

        let mut contour = vec![segments[start].p0];
        let mut current = start;
        let mut exit_at_p1 = true;

        loop {
            used[current] = true;
            let seg = segments[current];
            let point = if exit_at_p1 { seg.p1 } else { seg.p0 };
            contour.push(point);

            let next = endpoints
                .get(&quantize(point))
                .and_then(|list| list.iter().find(|(i, _)| !used[*i]).copied());
            match next {
                // Entering at p0 means leaving at p1
                Some((i, entered_at_p0)) => {
                    current = i;
                    exit_at_p1 = entered_at_p0;
                }
                None => break,
            }
        }

        if contour.len() >= 3 {
            contours.push(contour);
        }
    }

    contours
}

/// Ramer-Douglas-Peucker, keeping the contour closed
fn simplify(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut result = rdp(points, epsilon);
    if let (Some(&first), Some(&last)) = (result.first(), result.last()) {
        let (dx, dy) = (first.0 - last.0, first.1 - last.1);
        if dx * dx + dy * dy > epsilon * epsilon {
            result.push(first);
        }
    }
    result
}

fn rdp(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let first = points[0];
    let last = points[points.len() - 1];

    let (max_index, max_dist) = points[1..points.len() - 1]
        .iter()
        .enumerate()
        .map(|(i, p)| (i + 1, distance_to_line(*p, first, last)))
        .fold((0, 0.0f64), |best, cur| if cur.1 > best.1 { cur } else { best });

    if max_dist > epsilon {
        let mut left = rdp(&points[..=max_index], epsilon);
        let right = rdp(&points[max_index..], epsilon);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

fn distance_to_line(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    if len_sq < 1e-12 {
        return (p.0 - a.0).hypot(p.1 - a.1);
    }
    ((p.0 - a.0) * dy - (p.1 - a.1) * dx).abs() / len_sq.sqrt()
}
