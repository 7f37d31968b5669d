//! Dateline (antimeridian) wrapping.
//!
//! Spherical edges that pass over the ±180° meridian would be drawn as lines
//! spanning the whole map once flattened. The wrapper cuts such geometries
//! into pieces that each stay inside [-180, 180] longitude. Crossing latitudes
//! are computed on the great circle, not by linear interpolation in lon/lat.

use log::trace;

use super::lonlat::{wrap_longitude, LonLat};

/// Map edge a crossing lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    /// lon = +180
    East,
    /// lon = -180
    West,
}

impl Edge {
    fn lon(self) -> f64 {
        match self {
            Edge::East => 180.0,
            Edge::West => -180.0,
        }
    }

    fn opposite(self) -> Edge {
        match self {
            Edge::East => Edge::West,
            Edge::West => Edge::East,
        }
    }
}

/// An antimeridian crossing on the edge from one vertex to the next.
#[derive(Debug, Clone, Copy)]
struct Crossing {
    lat: f64,
    leave: Edge,
    enter: Edge,
}

/// A run of polygon vertices between two consecutive crossings.
#[derive(Debug)]
struct Arc {
    start_edge: Edge,
    start_lat: f64,
    end_edge: Edge,
    end_lat: f64,
    points: Vec<LonLat>,
}

/// Splits spherical polylines and polygons at the antimeridian.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateLineWrapper;

impl DateLineWrapper {
    pub fn new() -> Self {
        Self
    }

    /// Splits a polyline into pieces that do not cross the antimeridian.
    ///
    /// Every piece that touches the dateline ends (or starts) exactly on
    /// lon = ±180 at the great-circle crossing latitude. A vertex lying on
    /// the antimeridian is placed on the edge of the piece it belongs to and
    /// only starts a new piece when the line leaves it towards the other
    /// hemisphere.
    pub fn wrap_polyline(&self, points: &[LonLat]) -> Vec<Vec<LonLat>> {
        let mut pieces = Vec::new();
        let mut current: Vec<LonLat> = Vec::with_capacity(points.len());

        for (i, &p) in points.iter().enumerate() {
            if i > 0 {
                let prev = points[i - 1];
                if on_antimeridian(prev) || on_antimeridian(p) {
                    if on_antimeridian(prev) && !on_antimeridian(p) {
                        let side = side_of(planar(p).lon);
                        if current.last().is_some_and(|q| q.lon != side.lon()) {
                            if current.len() >= 2 {
                                pieces.push(std::mem::take(&mut current));
                            } else {
                                current.clear();
                            }
                            current.push(LonLat::new(side.lon(), prev.lat));
                        }
                    }
                } else if let Some(c) = crossing(prev, p) {
                    current.push(LonLat::new(c.leave.lon(), c.lat));
                    pieces.push(std::mem::take(&mut current));
                    current.push(LonLat::new(c.enter.lon(), c.lat));
                }
            }

            let vertex = if on_antimeridian(p) {
                let side = match current.last() {
                    Some(q) => side_of(q.lon),
                    None => points[i + 1..]
                        .iter()
                        .find(|q| !on_antimeridian(**q))
                        .map_or(side_of(planar(p).lon), |q| side_of(planar(*q).lon)),
                };
                LonLat::new(side.lon(), p.lat)
            } else {
                planar(p)
            };
            current.push(vertex);
        }

        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }

    /// Splits a polygon exterior ring into one or more rings that do not
    /// cross the antimeridian.
    ///
    /// Pieces are closed along the ±180 meridian. A ring that circles a pole
    /// (odd number of crossings) is closed over that pole.
    pub fn wrap_polygon(&self, ring: &[LonLat]) -> Vec<Vec<LonLat>> {
        let n = ring.len();
        if n == 0 {
            return Vec::new();
        }

        let crossings: Vec<(usize, Crossing)> = (0..n)
            .filter_map(|i| crossing(ring[i], ring[(i + 1) % n]).map(|c| (i, c)))
            .collect();

        if crossings.is_empty() {
            return vec![ring.iter().map(|&p| planar(p)).collect()];
        }

        let arcs = build_arcs(ring, &crossings);
        trace!("polygon split into {} arcs at the dateline", arcs.len());
        stitch_arcs(&arcs)
    }
}

/// Maps a vertex to planar longitude, keeping +180 on the eastern edge.
fn planar(p: LonLat) -> LonLat {
    let lon = wrap_longitude(p.lon);
    if lon == -180.0 && p.lon > 0.0 {
        LonLat::new(180.0, p.lat)
    } else {
        LonLat::new(lon, p.lat)
    }
}

/// True for a vertex exactly on lon = ±180.
fn on_antimeridian(p: LonLat) -> bool {
    wrap_longitude(p.lon) == -180.0
}

/// Map edge on the same side as a planar longitude.
fn side_of(lon: f64) -> Edge {
    if lon >= 0.0 {
        Edge::East
    } else {
        Edge::West
    }
}

/// Finds where the great-circle edge `a -> b` meets the antimeridian.
fn crossing(a: LonLat, b: LonLat) -> Option<Crossing> {
    let pa = a.to_xyz();
    let pb = b.to_xyz();

    // Edge must change hemisphere with respect to the lon=0/180 plane.
    if pa.y * pb.y >= 0.0 {
        return None;
    }

    let t = pa.y / (pa.y - pb.y);
    let on_plane = pa.lerp(pb, t);

    // x >= 0 is the prime meridian side
    if on_plane.x >= 0.0 {
        return None;
    }

    let leave = if pa.y > 0.0 { Edge::East } else { Edge::West };
    Some(Crossing {
        lat: LonLat::from_xyz(on_plane).lat,
        leave,
        enter: leave.opposite(),
    })
}

fn build_arcs(ring: &[LonLat], crossings: &[(usize, Crossing)]) -> Vec<Arc> {
    let n = ring.len();
    let m = crossings.len();
    let mut arcs = Vec::with_capacity(m);

    for k in 0..m {
        let (i, entry) = crossings[k];
        let (j, exit) = crossings[(k + 1) % m];

        let mut points = vec![LonLat::new(entry.enter.lon(), entry.lat)];
        let mut idx = (i + 1) % n;
        loop {
            points.push(planar(ring[idx]));
            if idx == j {
                break;
            }
            idx = (idx + 1) % n;
        }
        points.push(LonLat::new(exit.leave.lon(), exit.lat));

        arcs.push(Arc {
            start_edge: entry.enter,
            start_lat: entry.lat,
            end_edge: exit.leave,
            end_lat: exit.lat,
            points,
        });
    }

    arcs
}

/// Picks the arc whose start is closest along `edge` to latitude `lat`.
///
/// `first` (the arc the current ring started with) is always a candidate so
/// the ring can close.
fn nearest_start(arcs: &[Arc], used: &[bool], first: usize, edge: Edge, lat: f64) -> Option<usize> {
    arcs.iter()
        .enumerate()
        .filter(|(k, arc)| (!used[*k] || *k == first) && arc.start_edge == edge)
        .min_by(|(_, a), (_, b)| {
            (a.start_lat - lat)
                .abs()
                .total_cmp(&(b.start_lat - lat).abs())
        })
        .map(|(k, _)| k)
}

fn stitch_arcs(arcs: &[Arc]) -> Vec<Vec<LonLat>> {
    let mut used = vec![false; arcs.len()];
    let mut rings = Vec::new();

    for first in 0..arcs.len() {
        if used[first] {
            continue;
        }
        used[first] = true;

        let mut points = arcs[first].points.clone();
        let mut edge = arcs[first].end_edge;
        let mut lat = arcs[first].end_lat;

        loop {
            match nearest_start(arcs, &used, first, edge, lat) {
                Some(k) if k == first => break,
                Some(k) => {
                    used[k] = true;
                    points.extend_from_slice(&arcs[k].points);
                    edge = arcs[k].end_edge;
                    lat = arcs[k].end_lat;
                }
                None => {
                    // Nothing continues on this edge: the ring wraps a pole.
                    let pole = if lat >= 0.0 { 90.0 } else { -90.0 };
                    points.push(LonLat::new(edge.lon(), pole));
                    points.push(LonLat::new(edge.opposite().lon(), pole));
                    edge = edge.opposite();
                    lat = pole;
                    if nearest_start(arcs, &used, first, edge, lat).is_none() {
                        break;
                    }
                }
            }
        }

        rings.push(points);
    }

    rings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_lon_jump(piece: &[LonLat]) -> f64 {
        piece
            .windows(2)
            .map(|w| (w[1].lon - w[0].lon).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_line_without_crossing_is_untouched() {
        let line = vec![LonLat::new(-10.0, 0.0), LonLat::new(10.0, 5.0)];
        let pieces = DateLineWrapper::new().wrap_polyline(&line);
        assert_eq!(pieces, vec![line]);
    }

    #[test]
    fn test_line_split_at_dateline() {
        let line = vec![LonLat::new(170.0, 0.0), LonLat::new(-170.0, 0.0)];
        let pieces = DateLineWrapper::new().wrap_polyline(&line);

        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].last().unwrap().lon, 180.0);
        assert_eq!(pieces[1][0].lon, -180.0);
        assert!(pieces[0].last().unwrap().lat.abs() < 1e-9);
        for piece in &pieces {
            assert!(max_lon_jump(piece) <= 180.0);
        }
    }

    #[test]
    fn test_line_vertex_on_antimeridian_stays_on_its_side() {
        let wrapper = DateLineWrapper::new();
        let line = |coords: &[(f64, f64)]| -> Vec<LonLat> {
            coords.iter().map(|&(x, y)| LonLat::new(x, y)).collect()
        };

        let pieces = wrapper.wrap_polyline(&line(&[(-180.0, 0.0), (170.0, 0.0), (160.0, 0.0)]));
        assert_eq!(pieces, vec![line(&[(180.0, 0.0), (170.0, 0.0), (160.0, 0.0)])]);

        let pieces = wrapper.wrap_polyline(&line(&[(-170.0, 0.0), (180.0, 0.0)]));
        assert_eq!(pieces, vec![line(&[(-170.0, 0.0), (-180.0, 0.0)])]);

        let pieces = wrapper.wrap_polyline(&line(&[(180.0, 5.0), (-170.0, 5.0), (-160.0, 5.0)]));
        assert_eq!(pieces, vec![line(&[(-180.0, 5.0), (-170.0, 5.0), (-160.0, 5.0)])]);
    }

    #[test]
    fn test_line_through_antimeridian_vertex_splits_once() {
        let line = vec![
            LonLat::new(170.0, 0.0),
            LonLat::new(180.0, 5.0),
            LonLat::new(-170.0, 10.0),
        ];
        let pieces = DateLineWrapper::new().wrap_polyline(&line);
        assert_eq!(
            pieces,
            vec![
                vec![LonLat::new(170.0, 0.0), LonLat::new(180.0, 5.0)],
                vec![LonLat::new(-180.0, 5.0), LonLat::new(-170.0, 10.0)],
            ]
        );

        // Touching the dateline and turning back is one piece.
        let bounce = vec![
            LonLat::new(170.0, 0.0),
            LonLat::new(180.0, 5.0),
            LonLat::new(170.0, 10.0),
        ];
        assert_eq!(DateLineWrapper::new().wrap_polyline(&bounce).len(), 1);
    }

    #[test]
    fn test_crossing_latitude_follows_great_circle() {
        // Symmetric edge: the great circle bulges poleward at the midpoint.
        let line = vec![LonLat::new(150.0, 40.0), LonLat::new(-150.0, 40.0)];
        let pieces = DateLineWrapper::new().wrap_polyline(&line);
        let lat = pieces[0].last().unwrap().lat;
        assert!(lat > 40.0, "crossing latitude {} should exceed 40", lat);
    }

    #[test]
    fn test_prime_meridian_crossing_not_split() {
        let line = vec![LonLat::new(-5.0, 10.0), LonLat::new(5.0, 10.0)];
        let pieces = DateLineWrapper::new().wrap_polyline(&line);
        assert_eq!(pieces.len(), 1);
    }

    #[test]
    fn test_polygon_across_dateline_becomes_two_rings() {
        let ring = vec![
            LonLat::new(170.0, 0.0),
            LonLat::new(-170.0, 0.0),
            LonLat::new(-170.0, 10.0),
            LonLat::new(170.0, 10.0),
        ];
        let rings = DateLineWrapper::new().wrap_polygon(&ring);
        assert_eq!(rings.len(), 2);

        for r in &rings {
            let east = r.iter().all(|p| p.lon >= 0.0);
            let west = r.iter().all(|p| p.lon <= 0.0);
            assert!(east || west, "ring mixes hemispheres: {:?}", r);
            assert!(max_lon_jump(r) <= 180.0);
        }
    }

    #[test]
    fn test_polar_cap_closed_over_pole() {
        // Ring around the south pole at latitude -70.
        let ring: Vec<LonLat> = (0..12)
            .map(|i| LonLat::new(-180.0 + 15.0 + i as f64 * 30.0, -70.0))
            .collect();
        let rings = DateLineWrapper::new().wrap_polygon(&ring);

        assert_eq!(rings.len(), 1);
        assert!(rings[0].iter().any(|p| p.lat == -90.0));

        // Only the closing edge along the pole may span the map.
        let off_pole: Vec<LonLat> = rings[0].iter().copied().filter(|p| p.lat > -90.0).collect();
        assert!(max_lon_jump(&off_pole) <= 180.0);
    }

    #[test]
    fn test_empty_polygon() {
        assert!(DateLineWrapper::new().wrap_polygon(&[]).is_empty());
    }
}
