//! Planar rings and lines in (lon, lat) degrees.
//!
//! Provides the validity checks the renderer relies on and a zero-width
//! buffer repair that turns self-intersecting rings into simple ones.

use glam::DVec2;

/// Tolerance for parallel/collinear tests.
const EPSILON: f64 = 1e-12;
/// Intersection parameters this close to a segment end snap to the vertex.
const SNAP: f64 = 1e-9;
/// Rings with less area than this (square degrees) are treated as empty.
const MIN_RING_AREA: f64 = 1e-10;

/// A closed ring stored open (first vertex not repeated).
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    points: Vec<DVec2>,
}

impl Ring {
    /// Creates a ring, dropping a trailing vertex that repeats the first.
    pub fn new(mut points: Vec<DVec2>) -> Self {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self { points }
    }

    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    /// Shoelace area; positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.points)
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Reverses the vertex order if the ring is clockwise.
    pub fn make_ccw(&mut self) {
        if self.signed_area() < 0.0 {
            self.points.reverse();
        }
    }

    /// True for a finite, non-degenerate, non-self-intersecting ring.
    ///
    /// Repeated consecutive vertices are tolerated.
    pub fn is_valid(&self) -> bool {
        if self.points.iter().any(|p| !p.is_finite()) {
            return false;
        }
        is_simple(&clean_points(&self.points))
    }

    /// Point-in-polygon test using ray casting.
    pub fn contains(&self, point: DVec2) -> bool {
        let ring = &self.points;
        if ring.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = ring.len() - 1;
        for i in 0..ring.len() {
            let pi = ring[i];
            let pj = ring[j];
            if ((pi.y > point.y) != (pj.y > point.y))
                && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Clamps every latitude (y) into `[-limit, limit]`.
    pub fn clip_latitudes(&mut self, limit: f64) {
        for p in &mut self.points {
            p.y = p.y.clamp(-limit, limit);
        }
    }
}

/// An open path.
#[derive(Debug, Clone, PartialEq)]
pub struct LineString {
    points: Vec<DVec2>,
}

impl LineString {
    pub fn new(points: Vec<DVec2>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    /// A line needs finite coordinates and at least two distinct vertices.
    pub fn is_valid(&self) -> bool {
        if self.points.len() < 2 || self.points.iter().any(|p| !p.is_finite()) {
            return false;
        }
        let first = self.points[0];
        self.points.iter().any(|&p| p != first)
    }

    pub fn clip_latitudes(&mut self, limit: f64) {
        for p in &mut self.points {
            p.y = p.y.clamp(-limit, limit);
        }
    }
}

/// All planar pieces produced for one feature.
#[derive(Debug, Clone, PartialEq)]
pub enum MultiGeometry {
    /// Counter-clockwise exterior rings.
    Polygons(Vec<Ring>),
    Lines(Vec<LineString>),
}

impl MultiGeometry {
    /// Number of rings or lines.
    pub fn len(&self) -> usize {
        match self {
            MultiGeometry::Polygons(rings) => rings.len(),
            MultiGeometry::Lines(lines) => lines.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the vertex lists of every piece.
    pub fn parts(&self) -> Box<dyn Iterator<Item = &[DVec2]> + '_> {
        match self {
            MultiGeometry::Polygons(rings) => Box::new(rings.iter().map(|r| r.points())),
            MultiGeometry::Lines(lines) => Box::new(lines.iter().map(|l| l.points())),
        }
    }
}

/// Shoelace formula; positive for counter-clockwise vertex order.
pub fn signed_area(ring: &[DVec2]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += ring[i].x * ring[j].y - ring[j].x * ring[i].y;
    }
    area * 0.5
}

/// Drops non-finite vertices, consecutive duplicates and a closing duplicate.
pub fn clean_points(points: &[DVec2]) -> Vec<DVec2> {
    let mut out: Vec<DVec2> = Vec::with_capacity(points.len());
    for &p in points {
        if !p.is_finite() {
            continue;
        }
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    while out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Intersection {
    None,
    /// Crossing at `p1 + t (p2 - p1)` = `q1 + u (q2 - q1)`.
    Point { t: f64, u: f64 },
    /// Collinear segments sharing more than a point.
    Overlap,
}

fn segment_intersection(p1: DVec2, p2: DVec2, q1: DVec2, q2: DVec2) -> Intersection {
    let r = p2 - p1;
    let s = q2 - q1;
    let qp = q1 - p1;
    let denom = r.perp_dot(s);

    if denom.abs() < EPSILON {
        if qp.perp_dot(r).abs() >= EPSILON {
            return Intersection::None;
        }
        let rr = r.dot(r);
        if rr < EPSILON {
            return Intersection::None;
        }
        // Collinear: project q onto p's parameter line and check overlap length.
        let t0 = qp.dot(r) / rr;
        let t1 = t0 + s.dot(r) / rr;
        let (lo, hi) = (t0.min(t1).max(0.0), t0.max(t1).min(1.0));
        return if hi - lo > SNAP {
            Intersection::Overlap
        } else if hi - lo >= -SNAP {
            // Collinear segments touching end to end.
            Intersection::Point { t: lo.clamp(0.0, 1.0), u: if t0 <= t1 { 0.0 } else { 1.0 } }
        } else {
            Intersection::None
        };
    }

    let t = qp.perp_dot(s) / denom;
    let u = qp.perp_dot(r) / denom;
    if (-SNAP..=1.0 + SNAP).contains(&t) && (-SNAP..=1.0 + SNAP).contains(&u) {
        Intersection::Point { t: t.clamp(0.0, 1.0), u: u.clamp(0.0, 1.0) }
    } else {
        Intersection::None
    }
}

fn adjacent(i: usize, j: usize, n: usize) -> bool {
    j == i + 1 || (i == 0 && j == n - 1)
}

/// True if the (cleaned) ring has at least three vertices, non-zero area,
/// and no two edges touch except neighbours at their shared vertex.
pub fn is_simple(ring: &[DVec2]) -> bool {
    let n = ring.len();
    if n < 3 || signed_area(ring).abs() < MIN_RING_AREA {
        return false;
    }

    for i in 0..n {
        let (p1, p2) = (ring[i], ring[(i + 1) % n]);
        for j in (i + 1)..n {
            let (q1, q2) = (ring[j], ring[(j + 1) % n]);
            let hit = segment_intersection(p1, p2, q1, q2);
            if adjacent(i, j, n) {
                // Neighbours share a vertex; only a fold back over each other is invalid.
                if hit == Intersection::Overlap {
                    return false;
                }
            } else if hit != Intersection::None {
                return false;
            }
        }
    }
    true
}

/// Inserts every self-intersection point into the ring.
///
/// Both crossing edges receive the exact same coordinate so the loop
/// extraction can match them bit for bit.
fn node_ring(ring: &[DVec2]) -> Vec<DVec2> {
    let n = ring.len();
    let mut inserts: Vec<Vec<(f64, DVec2)>> = vec![Vec::new(); n];

    for i in 0..n {
        let (p1, p2) = (ring[i], ring[(i + 1) % n]);
        for j in (i + 1)..n {
            if adjacent(i, j, n) {
                continue;
            }
            let (q1, q2) = (ring[j], ring[(j + 1) % n]);
            if let Intersection::Point { t, u } = segment_intersection(p1, p2, q1, q2) {
                let x = if t <= SNAP {
                    p1
                } else if t >= 1.0 - SNAP {
                    p2
                } else if u <= SNAP {
                    q1
                } else if u >= 1.0 - SNAP {
                    q2
                } else {
                    p1 + (p2 - p1) * t
                };
                inserts[i].push((t, x));
                inserts[j].push((u, x));
            }
        }
    }

    let mut noded = Vec::with_capacity(n * 2);
    for (i, mut extra) in inserts.into_iter().enumerate() {
        noded.push(ring[i]);
        extra.sort_by(|a, b| a.0.total_cmp(&b.0));
        let end = ring[(i + 1) % n];
        for (_, x) in extra {
            if noded.last() != Some(&x) && x != end {
                noded.push(x);
            }
        }
    }
    noded
}

/// Splits a noded ring into loops wherever it revisits a vertex.
fn extract_loops(noded: &[DVec2]) -> Vec<Vec<DVec2>> {
    let mut loops = Vec::new();
    let mut stack: Vec<DVec2> = Vec::with_capacity(noded.len());

    for &p in noded.iter().chain(noded.first()) {
        if let Some(k) = stack.iter().position(|&q| q == p) {
            let lp: Vec<DVec2> = stack.drain(k..).collect();
            stack.push(p);
            if lp.len() >= 3 {
                loops.push(lp);
            }
        } else {
            stack.push(p);
        }
    }
    loops
}

/// Zero-width buffer repair.
///
/// Returns the simple, counter-clockwise rings that make up `points`:
/// a valid ring comes back unchanged (apart from orientation), a
/// self-intersecting ring is split at its crossings, and slivers with no
/// area are discarded. An empty result means nothing renderable remained.
pub fn buffer_zero(points: &[DVec2]) -> Vec<Ring> {
    let cleaned = clean_points(points);
    if cleaned.len() < 3 {
        return Vec::new();
    }

    if is_simple(&cleaned) {
        let mut ring = Ring::new(cleaned);
        ring.make_ccw();
        return vec![ring];
    }

    let noded = node_ring(&cleaned);
    extract_loops(&noded)
        .into_iter()
        .map(|lp| clean_points(&lp))
        .filter(|lp| is_simple(lp))
        .map(|lp| {
            let mut ring = Ring::new(lp);
            ring.make_ccw();
            ring
        })
        .collect()
}
