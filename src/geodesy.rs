//! Position and course arithmetic on the WGS-84 ellipsoid.
//!
//! [`destination`] and [`bearing_distance`] solve the geodesic problems with
//! `geo`'s [`Geodesic`]. [`great_circle_distance`] is the cheaper spherical
//! haversine used for proximity filtering.

use ::geo::{Bearing, Destination, Distance, Geodesic, Haversine, Point};

use crate::error::{Error, Result};
use crate::geo::LatLon;

const METERS_PER_NM: f64 = 1852.0;

const MAX_ITERATIONS: usize = 200;

pub const RADIAL_TOLERANCE: f64 = 0.5;

pub fn normalize(deg: f64) -> f64 {
    let d = deg % 360.0;
    if d < 0.0 {
        d + 360.0
    } else {
        d
    }
}

/// In `(-180, 180]`, positive clockwise.
pub fn signed_diff(to: f64, from: f64) -> f64 {
    let d = normalize(to - from);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

pub fn reciprocal(deg: f64) -> f64 {
    normalize(deg + 180.0)
}

fn point(p: LatLon) -> Point {
    Point::new(p.lon(), p.lat())
}

/// `bearing` is `None` for coincident points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BearingDistance {
    pub bearing: Option<f64>,
    pub distance: f64,
}

/// Distances are nm and bearings true degrees throughout.
pub fn destination(origin: LatLon, bearing: f64, nm: f64) -> Result<LatLon> {
    let p = Geodesic.destination(point(origin), bearing, nm * METERS_PER_NM);
    if p.x().is_finite() && p.y().is_finite() {
        Ok(LatLon::new(p.y(), p.x()))
    } else {
        Err(Error::NonConvergence)
    }
}

pub fn bearing_distance(a: LatLon, b: LatLon) -> BearingDistance {
    let (pa, pb) = (point(a), point(b));
    let distance = Geodesic.distance(pa, pb) / METERS_PER_NM;
    if !distance.is_finite() {
        return BearingDistance {
            bearing: None,
            distance: great_circle_distance(a, b),
        };
    }
    let bearing = Some(Geodesic.bearing(pa, pb))
        .filter(|b| distance > 0.0 && b.is_finite())
        .map(normalize);
    BearingDistance { bearing, distance }
}

pub fn great_circle_distance(a: LatLon, b: LatLon) -> f64 {
    Haversine.distance(point(a), point(b)) / METERS_PER_NM
}

/// Walk from `origin` along `bearing` until the bearing from `station` agrees
/// with `radial` to within `tolerance` degrees.
pub fn radial_intersect(
    origin: LatLon,
    bearing: f64,
    station: LatLon,
    radial: f64,
    tolerance: f64,
) -> Result<LatLon> {
    const MAX_SEARCH_NM: f64 = 1024.0;

    let error_at = |nm: f64| -> Result<(LatLon, Option<f64>)> {
        let p = destination(origin, bearing, nm)?;
        let err = bearing_distance(station, p)
            .bearing
            .map(|b| signed_diff(radial, b));
        Ok((p, err))
    };

    let (start, start_err) = error_at(0.0)?;
    let start_err = match start_err {
        Some(e) if e.abs() > tolerance => e,
        // already on the radial, or sitting on the station
        _ => return Ok(start),
    };

    // find a bracket where the error changes sign
    let mut lo = 0.0;
    let mut hi = 0.5;
    loop {
        let (p, err) = error_at(hi)?;
        match err {
            Some(e) if e.abs() <= tolerance => return Ok(p),
            Some(e) if e.signum() != start_err.signum() && e.abs() < 90.0 => break,
            None => return Ok(p),
            _ => {}
        }
        lo = hi;
        hi *= 2.0;
        if hi > MAX_SEARCH_NM {
            return Err(Error::NotFound {
                ident: format!("radial {:.1}", radial),
            });
        }
    }

    for _ in 0..MAX_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        let (p, err) = error_at(mid)?;
        match err {
            Some(e) if e.abs() <= tolerance => return Ok(p),
            Some(e) if e.signum() == start_err.signum() => lo = mid,
            Some(_) => hi = mid,
            None => return Ok(p),
        }
    }

    Err(Error::NonConvergence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(370.0, 10.0)]
    #[case(-10.0, 350.0)]
    #[case(360.0, 0.0)]
    fn test_normalize(#[case] input: f64, #[case] out: f64) {
        assert!((normalize(input) - out).abs() < 1e-9);
    }

    #[rstest]
    #[case(10.0, 350.0, 20.0)]
    #[case(350.0, 10.0, -20.0)]
    #[case(180.0, 0.0, 180.0)]
    fn test_signed_diff(#[case] to: f64, #[case] from: f64, #[case] out: f64) {
        assert!((signed_diff(to, from) - out).abs() < 1e-9);
    }

    #[test]
    fn test_inverse_known_distance() {
        // JFK to LAX, about 2144 nm
        let jfk = LatLon::new(40.639751, -73.778925);
        let lax = LatLon::new(33.942536, -118.408075);
        let bd = bearing_distance(jfk, lax);
        assert!((bd.distance - 2145.0).abs() < 5.0);
        let brg = bd.bearing.unwrap();
        assert!((brg - 274.0).abs() < 2.0);
    }

    #[test]
    fn test_coincident_has_no_bearing() {
        let p = LatLon::new(47.0, -122.0);
        let bd = bearing_distance(p, p);
        assert_eq!(None, bd.bearing);
        assert_eq!(0.0, bd.distance);
    }

    #[test]
    fn test_haversine_close_to_geodesic() {
        let a = LatLon::new(37.6188, -122.3754);
        let b = LatLon::new(37.7213, -122.2208);
        let hav = great_circle_distance(a, b);
        let geodesic = bearing_distance(a, b).distance;
        assert!((hav - geodesic).abs() < 0.1);
    }

    #[test]
    fn test_radial_intersect() {
        let station = LatLon::new(40.0, -100.0);
        // start 10 nm west of the station, fly north, stop on the 330 radial
        let origin = destination(station, 270.0, 10.0).unwrap();
        let p = radial_intersect(origin, 0.0, station, 330.0, RADIAL_TOLERANCE).unwrap();
        let brg = bearing_distance(station, p).bearing.unwrap();
        assert!(signed_diff(330.0, brg).abs() <= RADIAL_TOLERANCE);
        assert!(p.lat() > origin.lat());
    }

    #[test]
    fn test_radial_intersect_never_crossing() {
        let station = LatLon::new(40.0, -100.0);
        let origin = destination(station, 90.0, 10.0).unwrap();
        // flying east away from the station never reaches the 270 radial
        assert!(radial_intersect(origin, 90.0, station, 270.0, RADIAL_TOLERANCE).is_err());
    }

    proptest! {
        #[test]
        fn test_direct_inverse_round_trip(
            lat in -80.0f64..80.0,
            lon in -179.0f64..179.0,
            brg in 0.0f64..360.0,
            nm in 1.0f64..500.0,
        ) {
            let origin = LatLon::new(lat, lon);
            let dest = destination(origin, brg, nm).unwrap();
            let bd = bearing_distance(origin, dest);
            prop_assert!((bd.distance - nm).abs() < 1e-6);
            prop_assert!(signed_diff(bd.bearing.unwrap(), brg).abs() < 1e-6);
        }
    }
}
