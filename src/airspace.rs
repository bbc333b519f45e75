//! Airspace regions built from boundary segments, and containment tests.

use std::cmp::Ordering;

use ::geo::kernels::{Kernel, Orientation, RobustKernel};
use ::geo::Coord;
use log::debug;

use crate::altitude::Altitude;
use crate::cifp::types::{AirspaceKind, AirspaceRecord, BoundarySegment, BoundaryVia};
use crate::error::{Error, Result};
use crate::geo::LatLon;
use crate::geodesy::{great_circle_distance, normalize};
use crate::leg::TurnDirection;

/// Points closer than this to an arc, in nm, are on it.
const ARC_BOUNDARY_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Debug, PartialEq)]
pub enum Edge {
    Line {
        from: LatLon,
        to: LatLon,
    },
    Arc {
        from: LatLon,
        to: LatLon,
        center: LatLon,
        radius: f64,
        direction: TurnDirection,
    },
}

impl Edge {
    fn start(&self) -> LatLon {
        match *self {
            Edge::Line { from, .. } | Edge::Arc { from, .. } => from,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Circle { center: LatLon, radius: f64 },
    Polygon(Vec<LatLon>),
    ArcPolygon(Vec<Edge>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Airspace {
    pub name: String,
    pub designator: String,
    pub kind: AirspaceKind,
    /// `None` is open: the surface, or no stated floor.
    pub lower: Option<Altitude>,
    pub upper: Option<Altitude>,
    pub shape: Shape,
}

type Offset = (f64, f64);

fn xy(p: LatLon) -> Coord {
    Coord {
        x: p.lon(),
        y: p.lat(),
    }
}

fn orient(a: Coord, b: Coord, p: Coord) -> Orientation {
    RobustKernel::orient2d(a, b, p)
}

fn within_box(a: Coord, b: Coord, p: Coord) -> bool {
    a.x.min(b.x) <= p.x && p.x <= a.x.max(b.x) && a.y.min(b.y) <= p.y && p.y <= a.y.max(b.y)
}

fn segment_point(segment: &BoundarySegment) -> Result<LatLon> {
    segment
        .point
        .ok_or_else(|| Error::floating("boundary point"))
}

impl Airspace {
    /// Close one boundary loop. `ground` anchors AGL limits, normally the
    /// elevation of the aerodrome the airspace surrounds.
    pub fn build(records: &[AirspaceRecord], ground: Option<i32>) -> Result<Airspace> {
        let first = records
            .first()
            .ok_or_else(|| Error::structural("airspace without segments"))?;

        let (lower, upper) = (first.segment.lower, first.segment.upper);
        for r in &records[1..] {
            let disagrees = |own: Option<Altitude>, authoritative: Option<Altitude>| {
                own.map_or(false, |own| Some(own) != authoritative)
            };
            if disagrees(r.segment.lower, lower) || disagrees(r.segment.upper, upper) {
                return Err(Error::structural(format!(
                    "{} segment {} disagrees on vertical limits",
                    first.designator, r.sequence
                )));
            }
        }
        let anchor = |a: Altitude| ground.map_or(a, |g| a.anchored(g));
        let lower = lower.filter(|a| !a.is_surface()).map(anchor);
        let upper = upper.map(anchor);

        let segments: Vec<&BoundarySegment> = records.iter().map(|r| &r.segment).collect();
        let shape = if segments[0].via == BoundaryVia::Circle {
            if segments.len() > 1 {
                debug!("{}: circle followed by further segments", first.designator);
            }
            Shape::Circle {
                center: segments[0]
                    .arc_origin
                    .ok_or_else(|| Error::floating("circle center"))?,
                radius: segments[0]
                    .arc_distance
                    .ok_or_else(|| Error::floating("circle radius"))?,
            }
        } else if segments.iter().any(|s| s.via.is_arc()) {
            Shape::ArcPolygon(Self::edges(&segments)?)
        } else {
            let vertices = segments
                .iter()
                .map(|s| segment_point(s))
                .collect::<Result<Vec<_>>>()?;
            if vertices.len() < 3 {
                return Err(Error::structural(format!(
                    "{} boundary has {} vertices",
                    first.designator,
                    vertices.len()
                )));
            }
            Shape::Polygon(vertices)
        };

        Ok(Airspace {
            name: first.name.clone(),
            designator: first.designator.clone(),
            kind: first.kind,
            lower,
            upper,
            shape,
        })
    }

    fn edges(segments: &[&BoundarySegment]) -> Result<Vec<Edge>> {
        let n = segments.len();
        segments
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let from = segment_point(s)?;
                let to = segment_point(segments[(i + 1) % n])?;
                let direction = match s.via {
                    BoundaryVia::ClockwiseArc => TurnDirection::Right,
                    BoundaryVia::CounterClockwiseArc => TurnDirection::Left,
                    _ => return Ok(Edge::Line { from, to }),
                };
                Ok(Edge::Arc {
                    from,
                    to,
                    center: s.arc_origin.ok_or_else(|| Error::floating("arc origin"))?,
                    radius: s.arc_distance.ok_or_else(|| Error::floating("arc distance"))?,
                    direction,
                })
            })
            .collect()
    }

    /// Whether `point` at `altitude` is inside. Both limits are inclusive.
    pub fn contains(&self, point: LatLon, altitude: Altitude) -> Result<bool> {
        if let Some(lower) = &self.lower {
            if altitude.compare(lower)? == Ordering::Less {
                return Ok(false);
            }
        }
        if let Some(upper) = &self.upper {
            if altitude.compare(upper)? == Ordering::Greater {
                return Ok(false);
            }
        }
        Ok(match &self.shape {
            Shape::Circle { center, radius } => great_circle_distance(*center, point) <= *radius,
            Shape::Polygon(vertices) => polygon_contains(vertices, point),
            Shape::ArcPolygon(edges) => arc_polygon_contains(edges, point),
        })
    }
}

/// Crossing count of a ray toward +x. Points on an edge are inside.
fn polygon_contains(vertices: &[LatLon], point: LatLon) -> bool {
    let p = xy(point);
    let mut inside = false;
    for (a, b) in vertices.iter().zip(vertices.iter().cycle().skip(1)) {
        let (a, b) = (xy(*a), xy(*b));
        let o = orient(a, b, p);
        if o == Orientation::Collinear && within_box(a, b, p) {
            return true;
        }
        if (a.y <= p.y) != (b.y <= p.y) {
            let crosses = if b.y > a.y {
                o == Orientation::CounterClockwise
            } else {
                o == Orientation::Clockwise
            };
            if crosses {
                inside = !inside;
            }
        }
    }
    inside
}

// flat in nm around `origin`
fn project(origin: LatLon, p: LatLon) -> Offset {
    let mut dlon = p.lon() - origin.lon();
    if dlon > 180.0 {
        dlon -= 360.0;
    } else if dlon < -180.0 {
        dlon += 360.0;
    }
    (
        dlon * 60.0 * origin.lat().to_radians().cos(),
        (p.lat() - origin.lat()) * 60.0,
    )
}

fn angle(p: Offset) -> f64 {
    normalize(p.0.atan2(p.1).to_degrees())
}

fn in_span(angle: f64, start: f64, end: f64, direction: TurnDirection) -> bool {
    let (offset, width) = match direction {
        TurnDirection::Right => (normalize(angle - start), normalize(end - start)),
        TurnDirection::Left => (normalize(start - angle), normalize(start - end)),
    };
    let width = if width == 0.0 { 360.0 } else { width };
    offset <= width
}

enum Crossings {
    OnBoundary,
    Count(usize),
}

fn arc_crossings(
    from: LatLon,
    to: LatLon,
    center: LatLon,
    radius: f64,
    direction: TurnDirection,
    p: LatLon,
    far: LatLon,
) -> Crossings {
    let start = angle(project(center, from));
    let end = angle(project(center, to));
    let s = project(center, p);
    let e = project(center, far);

    let own = s.0.hypot(s.1);
    if (own - radius).abs() < ARC_BOUNDARY_TOLERANCE && in_span(angle(s), start, end, direction) {
        return Crossings::OnBoundary;
    }

    let d = (e.0 - s.0, e.1 - s.1);
    let qa = d.0 * d.0 + d.1 * d.1;
    let qb = 2.0 * (s.0 * d.0 + s.1 * d.1);
    let qc = s.0 * s.0 + s.1 * s.1 - radius * radius;
    let disc = qb * qb - 4.0 * qa * qc;
    // a tangent touch does not change sides
    if qa == 0.0 || disc <= 0.0 {
        return Crossings::Count(0);
    }
    let root = disc.sqrt();
    let count = [(-qb - root) / (2.0 * qa), (-qb + root) / (2.0 * qa)]
        .iter()
        .filter(|&&t| (0.0..=1.0).contains(&t))
        .filter(|&&t| in_span(angle((s.0 + t * d.0, s.1 + t * d.1)), start, end, direction))
        .count();
    Crossings::Count(count)
}

/// Parity of crossings between the boundary and the segment from `point` to
/// a fixed point outside every edge.
fn arc_polygon_contains(edges: &[Edge], point: LatLon) -> bool {
    let (mut max_lat, mut max_lon) = (point.lat(), point.lon());
    for edge in edges {
        let from = edge.start();
        max_lat = max_lat.max(from.lat());
        max_lon = max_lon.max(from.lon());
        if let Edge::Arc { center, radius, .. } = edge {
            let dlat = radius / 60.0;
            let dlon = dlat / center.lat().to_radians().cos().max(1e-6);
            max_lat = max_lat.max(center.lat() + dlat);
            max_lon = max_lon.max(center.lon() + dlon);
        }
    }
    // odd offsets keep the test segment off published vertices
    let far = LatLon::new((max_lat + 0.37).min(89.9), max_lon + 1.13);
    let (p, q) = (xy(point), xy(far));

    let mut crossings = 0;
    for edge in edges {
        match *edge {
            Edge::Line { from, to } => {
                let (a, b) = (xy(from), xy(to));
                if orient(a, b, p) == Orientation::Collinear && within_box(a, b, p) {
                    return true;
                }
                let side = |x, y, z| orient(x, y, z) != Orientation::Clockwise;
                if side(a, b, p) != side(a, b, q) && side(p, q, a) != side(p, q, b) {
                    crossings += 1;
                }
            }
            Edge::Arc {
                from,
                to,
                center,
                radius,
                direction,
            } => match arc_crossings(from, to, center, radius, direction, point, far) {
                Crossings::OnBoundary => return true,
                Crossings::Count(n) => crossings += n,
            },
        }
    }
    crossings % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::destination;
    use rstest::rstest;

    fn record(sequence: u32, segment: BoundarySegment) -> AirspaceRecord {
        AirspaceRecord {
            region: "K2".to_owned(),
            kind: AirspaceKind::Restrictive('R'),
            designator: "R9999".to_owned(),
            multiple_code: 'A',
            sequence,
            name: "TEST AREA".to_owned(),
            segment,
        }
    }

    fn line(point: LatLon) -> BoundarySegment {
        BoundarySegment {
            via: BoundaryVia::GreatCircle,
            end_of_loop: false,
            point: Some(point),
            arc_origin: None,
            arc_distance: None,
            arc_bearing: None,
            lower: None,
            upper: None,
        }
    }

    fn rectangle(lower: Option<Altitude>, upper: Option<Altitude>) -> Vec<AirspaceRecord> {
        let corners = [(35.0, -100.0), (35.0, -99.0), (36.0, -99.0), (36.0, -100.0)];
        corners
            .iter()
            .enumerate()
            .map(|(i, &(lat, lon))| {
                let mut seg = line(LatLon::new(lat, lon));
                if i == 0 {
                    seg.lower = lower;
                    seg.upper = upper;
                }
                seg.end_of_loop = i == corners.len() - 1;
                record(10 * (i as u32 + 1), seg)
            })
            .collect()
    }

    #[rstest]
    #[case(35.5, -99.5, true)]
    #[case(37.0, -99.5, false)]
    #[case(35.5, -101.0, false)]
    #[case(35.0, -99.5, true)]
    #[case(35.5, -100.0, true)]
    #[case(36.0, -99.0, true)]
    #[case(35.0, -100.0, true)]
    #[case(34.999, -99.5, false)]
    fn test_rectangle(#[case] lat: f64, #[case] lon: f64, #[case] inside: bool) {
        let a = Airspace::build(&rectangle(None, None), None).unwrap();
        assert_eq!(inside, a.contains(LatLon::new(lat, lon), Altitude::msl(3000)).unwrap());
    }

    #[rstest]
    #[case(500, false)]
    #[case(1000, true)]
    #[case(3000, true)]
    #[case(5000, true)]
    #[case(6000, false)]
    fn test_vertical_band(#[case] feet: i32, #[case] inside: bool) {
        let records = rectangle(Some(Altitude::msl(1000)), Some(Altitude::msl(5000)));
        let a = Airspace::build(&records, None).unwrap();
        assert_eq!(inside, a.contains(LatLon::new(35.5, -99.5), Altitude::msl(feet)).unwrap());
    }

    #[test]
    fn test_surface_floor_is_open() {
        let records = rectangle(Some(Altitude::surface()), Some(Altitude::msl(5000)));
        let a = Airspace::build(&records, None).unwrap();
        assert_eq!(None, a.lower);
        assert!(a.contains(LatLon::new(35.5, -99.5), Altitude::msl(-50)).unwrap());
    }

    #[test]
    fn test_agl_anchored_to_ground() {
        let records = rectangle(Some(Altitude::agl(700, None)), Some(Altitude::msl(5000)));
        let anchored = Airspace::build(&records, Some(1200)).unwrap();
        let p = LatLon::new(35.5, -99.5);
        assert!(!anchored.contains(p, Altitude::msl(1500)).unwrap());
        assert!(anchored.contains(p, Altitude::msl(2000)).unwrap());

        let floating = Airspace::build(&records, None).unwrap();
        match floating.contains(p, Altitude::msl(2000)) {
            Err(Error::Unanchored) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_limits() {
        let mut records = rectangle(Some(Altitude::msl(1000)), Some(Altitude::msl(5000)));
        records[2].segment.upper = Some(Altitude::msl(7000));
        match Airspace::build(&records, None) {
            Err(Error::Structural { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }

        // repeating the authoritative limits is fine
        let mut records = rectangle(Some(Altitude::msl(1000)), Some(Altitude::msl(5000)));
        records[2].segment.upper = Some(Altitude::msl(5000));
        assert!(Airspace::build(&records, None).is_ok());
    }

    #[test]
    fn test_circle() {
        let center = LatLon::new(35.0, -100.0);
        let seg = BoundarySegment {
            via: BoundaryVia::Circle,
            end_of_loop: true,
            point: None,
            arc_origin: Some(center),
            arc_distance: Some(5.0),
            arc_bearing: None,
            lower: None,
            upper: Some(Altitude::msl(4000)),
        };
        let a = Airspace::build(&[record(10, seg)], None).unwrap();
        let near = destination(center, 45.0, 4.0).unwrap();
        let far = destination(center, 45.0, 6.0).unwrap();
        assert!(a.contains(near, Altitude::msl(3000)).unwrap());
        assert!(!a.contains(far, Altitude::msl(3000)).unwrap());
        assert!(!a.contains(near, Altitude::msl(4500)).unwrap());
    }

    /// Half disc east of the meridian through `center`.
    fn half_disc(center: LatLon) -> Airspace {
        let north = destination(center, 0.0, 10.0).unwrap();
        let south = destination(center, 180.0, 10.0).unwrap();
        let arc = BoundarySegment {
            via: BoundaryVia::ClockwiseArc,
            end_of_loop: false,
            point: Some(north),
            arc_origin: Some(center),
            arc_distance: Some(10.0),
            arc_bearing: Some(0.0),
            lower: None,
            upper: None,
        };
        let mut back = line(south);
        back.end_of_loop = true;
        Airspace::build(&[record(10, arc), record(20, back)], None).unwrap()
    }

    #[rstest]
    #[case(90.0, 5.0, true)]
    #[case(45.0, 9.0, true)]
    #[case(135.0, 9.0, true)]
    #[case(90.0, 12.0, false)]
    #[case(270.0, 5.0, false)]
    #[case(315.0, 9.0, false)]
    #[case(0.0, 12.0, false)]
    fn test_arc_polygon(#[case] bearing: f64, #[case] nm: f64, #[case] inside: bool) {
        let center = LatLon::new(35.0, -100.0);
        let a = half_disc(center);
        match &a.shape {
            Shape::ArcPolygon(edges) => assert_eq!(2, edges.len()),
            other => panic!("unexpected {:?}", other),
        }
        let p = destination(center, bearing, nm).unwrap();
        assert_eq!(inside, a.contains(p, Altitude::msl(1000)).unwrap());
    }

    #[rstest]
    #[case(0.0, 10.0)]
    #[case(7.0710678118654755, 7.0710678118654755)]
    #[case(10.0, 0.0)]
    fn test_point_on_arc_is_inside(#[case] east: f64, #[case] north: f64) {
        let center = LatLon::new(35.0, -100.0);
        let a = half_disc(center);
        let on_arc = LatLon::new(
            center.lat() + north / 60.0,
            center.lon() + east / (60.0 * center.lat().to_radians().cos()),
        );
        assert!(a.contains(on_arc, Altitude::msl(1000)).unwrap());
    }

    #[test]
    fn test_counter_clockwise_arc_covers_west() {
        let center = LatLon::new(35.0, -100.0);
        let north = destination(center, 0.0, 10.0).unwrap();
        let south = destination(center, 180.0, 10.0).unwrap();
        let arc = BoundarySegment {
            via: BoundaryVia::CounterClockwiseArc,
            end_of_loop: false,
            point: Some(north),
            arc_origin: Some(center),
            arc_distance: Some(10.0),
            arc_bearing: Some(0.0),
            lower: None,
            upper: None,
        };
        let a = Airspace::build(&[record(10, arc), record(20, line(south))], None).unwrap();
        let west = destination(center, 270.0, 5.0).unwrap();
        let east = destination(center, 90.0, 5.0).unwrap();
        assert!(a.contains(west, Altitude::msl(1000)).unwrap());
        assert!(!a.contains(east, Altitude::msl(1000)).unwrap());
    }
}
