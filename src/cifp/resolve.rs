//! Cross-reference tables and the rules for binding a named reference to one
//! concrete fix.

use std::collections::HashMap;

use log::{trace, warn};

use super::types::*;
use crate::error::{Error, Result};
use crate::geo::{LatLon, NamedLatLon};
use crate::geodesy::great_circle_distance;

/// Search radii, in nm, for borrowing a magnetic variation from nearby
/// facilities.
pub const VARIATION_RADII: [f64; 4] = [50.0, 100.0, 150.0, 200.0];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixSource {
    Navaid(NavaidClass),
    Waypoint,
    Aerodrome,
    Runway,
}

/// Anything a procedure or airway can name as a point.
#[derive(Clone, Debug, PartialEq)]
pub struct Fix {
    pub ident: String,
    pub region: String,
    pub latlon: LatLon,
    pub variation: Option<f64>,
    pub source: FixSource,
    /// Owning airport for terminal waypoints and runway ends.
    pub airport: Option<String>,
}

impl Fix {
    pub fn named(&self) -> NamedLatLon {
        NamedLatLon::new(self.ident.clone(), self.latlon)
    }
}

/// What is known about where a reference should be.
#[derive(Clone, Copy, Debug)]
pub enum Context<'a> {
    None,
    Point(LatLon),
    /// Near any fix carrying this identifier.
    Ident(&'a str),
}

#[derive(Debug, Default)]
pub struct Tables {
    fixes: HashMap<String, Vec<Fix>>,
    navaids: HashMap<String, Vec<NavaidRecord>>,
    aerodromes: HashMap<String, AirportRecord>,
    runways: HashMap<String, Vec<RunwayRecord>>,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_fix(&mut self, fix: Fix) {
        self.fixes.entry(fix.ident.clone()).or_default().push(fix);
    }

    pub fn add_navaid(&mut self, navaid: NavaidRecord) {
        self.push_fix(Fix {
            ident: navaid.ident.clone(),
            region: navaid.region.clone(),
            latlon: navaid.latlon,
            variation: navaid.variation,
            source: FixSource::Navaid(navaid.class),
            airport: navaid.airport.clone(),
        });
        self.navaids
            .entry(navaid.ident.clone())
            .or_default()
            .push(navaid);
    }

    pub fn add_waypoint(&mut self, waypoint: WaypointRecord) {
        self.push_fix(Fix {
            ident: waypoint.ident,
            region: waypoint.region,
            latlon: waypoint.latlon,
            variation: waypoint.variation,
            source: FixSource::Waypoint,
            airport: waypoint.airport,
        });
    }

    pub fn add_airport(&mut self, airport: AirportRecord) {
        self.push_fix(Fix {
            ident: airport.ident.clone(),
            region: airport.region.clone(),
            latlon: airport.latlon,
            variation: airport.variation,
            source: FixSource::Aerodrome,
            airport: Some(airport.ident.clone()),
        });
        if let Some(old) = self.aerodromes.insert(airport.ident.clone(), airport) {
            warn!("aerodrome {} defined more than once", old.ident);
        }
    }

    /// Runway thresholds double as fixes named `RWxx`.
    pub fn add_runway(&mut self, runway: RunwayRecord) {
        self.push_fix(Fix {
            ident: runway.ident.clone(),
            region: runway.region.clone(),
            latlon: runway.latlon,
            variation: None,
            source: FixSource::Runway,
            airport: Some(runway.airport.clone()),
        });
        self.runways
            .entry(runway.airport.clone())
            .or_default()
            .push(runway);
    }

    pub fn fixes(&self, ident: &str) -> &[Fix] {
        self.fixes.get(ident).map_or(&[][..], Vec::as_slice)
    }

    pub fn navaids(&self, ident: &str) -> &[NavaidRecord] {
        self.navaids.get(ident).map_or(&[][..], Vec::as_slice)
    }

    pub fn aerodrome(&self, ident: &str) -> Option<&AirportRecord> {
        self.aerodromes.get(ident)
    }

    pub fn runways(&self, airport: &str) -> &[RunwayRecord] {
        self.runways.get(airport).map_or(&[][..], Vec::as_slice)
    }

    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.fixes.values().map(Vec::len).sum(),
            self.navaids.values().map(Vec::len).sum(),
            self.aerodromes.len(),
            self.runways.values().map(Vec::len).sum(),
        )
    }

    /// Same-named fixes, narrowed to the stated region when any of them is
    /// in it.
    pub fn candidates(&self, fix: &UnresolvedFix) -> Vec<&Fix> {
        let all = self.fixes(&fix.ident);
        match &fix.region {
            Some(region) if all.iter().any(|f| &f.region == region) => {
                all.iter().filter(|f| &f.region == region).collect()
            }
            _ => all.iter().collect(),
        }
    }

    /// Bind `fix` to one table entry. A single candidate always wins; more
    /// than one needs a context, and the nearest to it is picked. Exact
    /// distance ties go to the earliest-loaded candidate.
    pub fn concretize(&self, fix: &UnresolvedFix, context: Context) -> Result<&Fix> {
        let candidates = self.candidates(fix);
        let ambiguous = || Error::Ambiguous {
            ident: fix.ident.clone(),
        };

        let chosen = match (candidates.len(), context) {
            (0, _) => {
                return Err(Error::NotFound {
                    ident: fix.ident.clone(),
                })
            }
            (1, _) => candidates[0],
            (_, Context::None) => return Err(ambiguous()),
            (_, Context::Point(point)) => {
                nearest(candidates, |c| great_circle_distance(c.latlon, point)).ok_or_else(ambiguous)?
            }
            (_, Context::Ident(other)) => {
                let refs = self.fixes(other);
                if refs.is_empty() {
                    return Err(ambiguous());
                }
                nearest(candidates, |c| {
                    refs.iter()
                        .map(|r| great_circle_distance(c.latlon, r.latlon))
                        .fold(std::f64::INFINITY, f64::min)
                })
                .ok_or_else(ambiguous)?
            }
        };
        trace!("{} resolved to {} ({:?})", fix.ident, chosen.latlon, context);
        Ok(chosen)
    }

    /// Variation of the nearest facility that states one, searching navaids
    /// then aerodromes at each radius in turn.
    pub fn local_variation(&self, point: LatLon, ident: &str) -> Result<f64> {
        for &radius in VARIATION_RADII.iter() {
            let navaids = self
                .navaids
                .values()
                .flatten()
                .map(|n| (n.ident.as_str(), n.latlon, n.variation));
            if let Some(v) = nearest_variation(navaids, point, radius) {
                return Ok(v);
            }
            let aerodromes = self
                .aerodromes
                .values()
                .map(|a| (a.ident.as_str(), a.latlon, a.variation));
            if let Some(v) = nearest_variation(aerodromes, point, radius) {
                return Ok(v);
            }
        }
        Err(Error::NoLocalVariation {
            ident: ident.to_owned(),
        })
    }
}

fn nearest<'a, F>(candidates: Vec<&'a Fix>, distance: F) -> Option<&'a Fix>
where
    F: Fn(&Fix) -> f64,
{
    candidates
        .into_iter()
        .map(|c| (distance(c), c))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c)
}

/// Equidistant facilities are ordered by ident.
fn nearest_variation<'a, I>(facilities: I, point: LatLon, radius: f64) -> Option<f64>
where
    I: Iterator<Item = (&'a str, LatLon, Option<f64>)>,
{
    facilities
        .filter_map(|(ident, p, v)| v.map(|v| (great_circle_distance(p, point), ident, v)))
        .filter(|&(d, _, _)| d <= radius)
        .min_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)))
        .map(|(_, _, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::destination;

    fn waypoint(ident: &str, region: &str, latlon: LatLon) -> WaypointRecord {
        WaypointRecord {
            ident: ident.to_owned(),
            region: region.to_owned(),
            airport: None,
            latlon,
            variation: None,
            name: String::new(),
        }
    }

    fn navaid(ident: &str, latlon: LatLon, variation: Option<f64>) -> NavaidRecord {
        NavaidRecord {
            ident: ident.to_owned(),
            region: "K1".to_owned(),
            airport: None,
            class: NavaidClass::Vortac,
            frequency: None,
            latlon,
            variation,
            elevation: None,
            name: String::new(),
        }
    }

    fn airport(ident: &str, latlon: LatLon, variation: Option<f64>) -> AirportRecord {
        AirportRecord {
            ident: ident.to_owned(),
            region: "K1".to_owned(),
            latlon,
            variation,
            elevation: 100,
            transition_altitude: None,
            name: String::new(),
        }
    }

    fn east() -> LatLon {
        LatLon::new(40.0, -80.0)
    }

    fn west() -> LatLon {
        LatLon::new(40.0, -120.0)
    }

    fn tables() -> Tables {
        let mut t = Tables::new();
        t.add_waypoint(waypoint("ALPHA", "K6", east()));
        t.add_waypoint(waypoint("ALPHA", "K2", west()));
        t.add_waypoint(waypoint("BRAVO", "K2", LatLon::new(40.5, -120.0)));
        t.add_waypoint(waypoint("LONLY", "K2", LatLon::new(10.0, 10.0)));
        t
    }

    #[test]
    fn test_single_candidate_needs_no_context() {
        let t = tables();
        let fix = t.concretize(&UnresolvedFix::new("LONLY", None), Context::None).unwrap();
        assert_eq!(LatLon::new(10.0, 10.0), fix.latlon);
    }

    #[test]
    fn test_ambiguous_without_context() {
        let t = tables();
        match t.concretize(&UnresolvedFix::new("ALPHA", None), Context::None) {
            Err(Error::Ambiguous { ident }) => assert_eq!("ALPHA", ident),
            other => panic!("unexpected {:?}", other),
        }
        match t.concretize(&UnresolvedFix::new("NOPE", None), Context::Point(east())) {
            Err(Error::NotFound { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nearest_to_point() {
        let t = tables();
        let fix = t
            .concretize(&UnresolvedFix::new("ALPHA", None), Context::Point(LatLon::new(41.0, -81.0)))
            .unwrap();
        assert_eq!("K6", fix.region);
    }

    #[test]
    fn test_nearest_to_ident() {
        let t = tables();
        let fix = t
            .concretize(&UnresolvedFix::new("ALPHA", None), Context::Ident("BRAVO"))
            .unwrap();
        assert_eq!("K2", fix.region);
    }

    #[test]
    fn test_region_narrows() {
        let t = tables();
        let fix = t
            .concretize(&UnresolvedFix::new("ALPHA", Some("K6".to_owned())), Context::None)
            .unwrap();
        assert_eq!(east(), fix.latlon);
    }

    #[test]
    fn test_tie_break_is_stable() {
        let mut t = Tables::new();
        let spot = LatLon::new(35.0, -100.0);
        t.add_waypoint(waypoint("TWINS", "K1", spot));
        t.add_waypoint(waypoint("TWINS", "K2", spot));

        let mid = destination(spot, 45.0, 20.0).unwrap();
        for _ in 0..10 {
            let fix = t
                .concretize(&UnresolvedFix::new("TWINS", None), Context::Point(mid))
                .unwrap();
            assert_eq!("K1", fix.region);
        }
    }

    #[test]
    fn test_local_variation_prefers_navaids_per_radius() {
        let center = LatLon::new(35.0, -100.0);
        let mut t = Tables::new();
        t.add_navaid(navaid("FAR", destination(center, 90.0, 80.0).unwrap(), Some(-5.0)));
        t.add_navaid(navaid("NOVAR", destination(center, 90.0, 10.0).unwrap(), None));
        t.add_airport(airport("KNEA", destination(center, 0.0, 30.0).unwrap(), Some(7.0)));
        assert_eq!(7.0, t.local_variation(center, "X").unwrap());

        let mut t = Tables::new();
        t.add_navaid(navaid("NEAR", destination(center, 90.0, 40.0).unwrap(), Some(-5.0)));
        t.add_airport(airport("KNEA", destination(center, 0.0, 30.0).unwrap(), Some(7.0)));
        assert_eq!(-5.0, t.local_variation(center, "X").unwrap());
    }

    #[test]
    fn test_local_variation_equidistant() {
        let center = LatLon::new(35.0, -100.0);
        for _ in 0..20 {
            let mut t = Tables::new();
            t.add_navaid(navaid("ZULU", LatLon::new(35.0, -99.5), Some(3.0)));
            t.add_navaid(navaid("MIKE", LatLon::new(35.0, -100.5), Some(1.0)));
            t.add_navaid(navaid("ALFA", LatLon::new(35.0, -100.5), Some(-3.0)));
            assert_eq!(-3.0, t.local_variation(center, "X").unwrap());
        }
    }

    #[test]
    fn test_local_variation_exhausted() {
        let center = LatLon::new(35.0, -100.0);
        let mut t = Tables::new();
        t.add_navaid(navaid("FAR", destination(center, 90.0, 250.0).unwrap(), Some(-5.0)));
        match t.local_variation(center, "EXMPL1") {
            Err(Error::NoLocalVariation { ident }) => assert_eq!("EXMPL1", ident),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_runways_are_fixes() {
        let mut t = Tables::new();
        t.add_runway(RunwayRecord {
            airport: "KTST".to_owned(),
            region: "K2".to_owned(),
            ident: "RW07".to_owned(),
            latlon: east(),
            length: None,
            bearing: Some(70.0),
            threshold_elevation: None,
        });
        assert_eq!(FixSource::Runway, t.fixes("RW07")[0].source);
        assert_eq!(1, t.runways("KTST").len());
    }
}
