//! Departures, arrivals and approaches assembled from their leg lines.

use std::collections::BTreeMap;

use itertools::Itertools;
use log::{debug, trace};

use super::resolve::{Context, Tables};
use super::types::*;
use crate::error::{Error, Result};
use crate::geo::{LatLon, NamedLatLon};
use crate::geodesy::{bearing_distance, normalize};
use crate::leg::{Arc, Endpoint, HoldLength, Leg, Racetrack, Radial, Via};

/// Transition name that applies when the caller names none.
pub const ALL: &str = "ALL";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Inbound,
    Common,
    Outbound,
    Skip,
}

fn section(kind: ProcedureKind, route_type: char) -> Section {
    match (kind, route_type) {
        (ProcedureKind::Sid, '1') | (ProcedureKind::Sid, '4') | (ProcedureKind::Sid, 'F')
        | (ProcedureKind::Sid, 'T') => Section::Inbound,
        (ProcedureKind::Sid, '2') | (ProcedureKind::Sid, '5') | (ProcedureKind::Sid, 'M') => {
            Section::Common
        }
        (ProcedureKind::Sid, '3') | (ProcedureKind::Sid, '6') | (ProcedureKind::Sid, 'S')
        | (ProcedureKind::Sid, 'V') => Section::Outbound,
        (ProcedureKind::Star, '1') | (ProcedureKind::Star, '4') | (ProcedureKind::Star, '7')
        | (ProcedureKind::Star, 'F') => Section::Inbound,
        (ProcedureKind::Star, '2') | (ProcedureKind::Star, '5') | (ProcedureKind::Star, '8')
        | (ProcedureKind::Star, 'M') => Section::Common,
        (ProcedureKind::Star, '3') | (ProcedureKind::Star, '6') | (ProcedureKind::Star, '9')
        | (ProcedureKind::Star, 'S') => Section::Outbound,
        (ProcedureKind::Approach, 'A') => Section::Inbound,
        (ProcedureKind::Approach, _) => Section::Common,
        _ => Section::Skip,
    }
}

/// One procedure at one airport.
///
/// SIDs run runway transition, common route, enroute transition. STARs run
/// enroute transition, common route, runway transition. Approaches run
/// transition then common route and have no outbound side.
#[derive(Clone, Debug, PartialEq)]
pub struct Procedure {
    pub name: String,
    pub airport: String,
    pub kind: ProcedureKind,
    inbound: BTreeMap<String, Vec<Leg>>,
    common: Vec<Leg>,
    outbound: BTreeMap<String, Vec<Leg>>,
}

impl Procedure {
    pub fn new<S: Into<String>>(name: S, airport: S, kind: ProcedureKind) -> Self {
        Procedure {
            name: name.into(),
            airport: airport.into(),
            kind,
            inbound: BTreeMap::new(),
            common: Vec::new(),
            outbound: BTreeMap::new(),
        }
    }

    pub fn inbound_transitions(&self) -> impl Iterator<Item = &str> {
        self.inbound.keys().map(String::as_str)
    }

    pub fn outbound_transitions(&self) -> impl Iterator<Item = &str> {
        self.outbound.keys().map(String::as_str)
    }

    pub fn common_route(&self) -> &[Leg] {
        &self.common
    }

    fn runway_side_inbound(&self) -> bool {
        self.kind == ProcedureKind::Sid
    }

    fn runway_side_outbound(&self) -> bool {
        self.kind == ProcedureKind::Star
    }

    /// Append one run of legs sharing a route type and transition name.
    pub fn append(&mut self, route_type: char, transition: &str, mut legs: Vec<Leg>) {
        let name = if transition.is_empty() { ALL } else { transition };
        let section = section(self.kind, route_type);
        let runway = self.kind == ProcedureKind::Sid && section == Section::Inbound;
        let table = match section {
            Section::Common => {
                self.common.append(&mut legs);
                return;
            }
            Section::Skip => {
                debug!(
                    "{} {}: skipping route type {:?} ({})",
                    self.airport, self.name, route_type, transition
                );
                return;
            }
            Section::Inbound => &mut self.inbound,
            Section::Outbound => &mut self.outbound,
        };

        let existing = table.entry(name.to_owned()).or_default();
        if runway && existing.is_empty() {
            if let Some(first) = legs.first_mut() {
                first.ground = true;
            }
        }
        existing.append(&mut legs);
    }

    /// Build a procedure from its lines in file order.
    pub fn assemble(tables: &Tables, records: &[LegRecord]) -> Result<Procedure> {
        let first = records
            .first()
            .ok_or_else(|| Error::structural("procedure without legs"))?;
        if records
            .iter()
            .any(|r| r.procedure_key() != first.procedure_key())
        {
            return Err(Error::structural(format!(
                "leg set for {} {} spans several procedures",
                first.airport, first.procedure
            )));
        }

        let mut fixer = LegFixer {
            tables,
            kind: first.kind,
            procedure: &first.procedure,
            airport: &first.airport,
            reference: reference_point(tables, records)?,
            variation: None,
        };

        let mut procedure = Procedure::new(first.procedure.clone(), first.airport.clone(), first.kind);
        let runs = records
            .iter()
            .group_by(|r| (r.route_type, r.transition.as_str()));
        for ((route_type, transition), run) in &runs {
            let legs = run.map(|r| fixer.fix(r)).collect::<Result<Vec<_>>>()?;
            procedure.append(route_type, transition, legs);
        }
        Ok(procedure)
    }

    fn pick<'a>(
        table: &'a BTreeMap<String, Vec<Leg>>,
        name: Option<&str>,
        runway: bool,
    ) -> Result<Option<&'a [Leg]>> {
        let name = match name {
            None => return Ok(table.get(ALL).map(Vec::as_slice)),
            Some(name) => name,
        };
        if let Some(legs) = table.get(name) {
            return Ok(Some(legs.as_slice()));
        }
        if runway {
            if let Some(legs) = both_runways(name).and_then(|both| table.get(&both)) {
                trace!("transition {} served by its parallel-runway form", name);
                return Ok(Some(legs.as_slice()));
            }
        }
        Err(Error::TransitionNotFound {
            name: name.to_owned(),
        })
    }

    /// The legs to fly from `inbound` through the common route to
    /// `outbound`. A repeated named fix where two parts join is only
    /// yielded once.
    pub fn select_route(&self, inbound: Option<&str>, outbound: Option<&str>) -> Result<Vec<&Leg>> {
        if self.kind == ProcedureKind::Approach {
            if let Some(name) = outbound {
                return Err(Error::TransitionNotFound {
                    name: name.to_owned(),
                });
            }
        }

        let first = match Self::pick(&self.inbound, inbound, self.runway_side_inbound())? {
            // any runway, when only one is published
            None if inbound.is_none() && self.kind == ProcedureKind::Sid && self.inbound.len() == 1 => {
                self.inbound.values().next().map(Vec::as_slice)
            }
            legs => legs,
        };
        let last = Self::pick(&self.outbound, outbound, self.runway_side_outbound())?;

        let mut route: Vec<&Leg> = Vec::new();
        for part in [first.unwrap_or(&[]), self.common.as_slice(), last.unwrap_or(&[])].iter() {
            let mut legs = part.iter();
            if let (Some(prev), Some(next)) = (route.last(), part.first()) {
                if prev.endpoint.name().is_some() && prev.endpoint.name() == next.endpoint.name() {
                    legs.next();
                }
            }
            route.extend(legs);
        }
        Ok(route)
    }

    pub fn has_route(&self, inbound: Option<&str>, outbound: Option<&str>) -> bool {
        self.select_route(inbound, outbound).is_ok()
    }

    /// Every (inbound, outbound) pair a caller can ask for. `ALL` shows up as
    /// `None`.
    pub fn enumerate_transitions(&self) -> Vec<(Option<String>, Option<String>)> {
        fn names(table: &BTreeMap<String, Vec<Leg>>) -> Vec<Option<String>> {
            if table.is_empty() {
                return vec![None];
            }
            table
                .keys()
                .map(|k| if k == ALL { None } else { Some(k.clone()) })
                .collect()
        }
        names(&self.inbound)
            .into_iter()
            .cartesian_product(names(&self.outbound))
            .collect()
    }
}

/// `RW07L` falls back to `RW07B`.
fn both_runways(name: &str) -> Option<String> {
    match name.chars().last() {
        Some('L') | Some('C') | Some('R') => Some(format!("{}B", &name[..name.len() - 1])),
        _ => None,
    }
}

/// The point every same-named fix in a procedure is resolved against.
fn reference_point(tables: &Tables, records: &[LegRecord]) -> Result<LatLon> {
    let first = &records[0];
    if let Some(airport) = tables.aerodrome(&first.airport) {
        return Ok(airport.latlon);
    }

    let named: Vec<&UnresolvedFix> = records.iter().filter_map(|r| r.fix.as_ref()).collect();
    if let Some(fix) = named.iter().find(|f| tables.candidates(f).len() == 1) {
        return tables.concretize(fix, Context::None).map(|f| f.latlon);
    }
    match (named.get(0), named.get(1)) {
        (Some(a), Some(b)) => tables
            .concretize(a, Context::Ident(&b.ident))
            .map(|f| f.latlon),
        _ => Err(Error::Ambiguous {
            ident: first.procedure.clone(),
        }),
    }
}

/// Binds one procedure's references and converts its courses to true.
struct LegFixer<'t> {
    tables: &'t Tables,
    kind: ProcedureKind,
    procedure: &'t str,
    airport: &'t str,
    reference: LatLon,
    variation: Option<f64>,
}

impl<'t> LegFixer<'t> {
    fn point(&self, fix: &UnresolvedFix) -> Result<NamedLatLon> {
        self.tables
            .concretize(fix, Context::Point(self.reference))
            .map(|f| f.named())
    }

    fn variation(&mut self, record: &LegRecord) -> Result<f64> {
        if self.kind == ProcedureKind::Approach {
            let navaid = record
                .recommended
                .as_ref()
                .and_then(|n| self.tables.concretize(n, Context::Point(self.reference)).ok())
                .and_then(|n| n.variation);
            if let Some(v) = navaid {
                return Ok(v);
            }
        }
        if let Some(v) = self.variation {
            return Ok(v);
        }
        let v = match self.tables.aerodrome(self.airport).and_then(|a| a.variation) {
            Some(v) => v,
            None => self.tables.local_variation(self.reference, self.procedure)?,
        };
        self.variation = Some(v);
        Ok(v)
    }

    fn course(&mut self, course: Course, record: &LegRecord) -> Result<f64> {
        if !course.magnetic {
            return Ok(normalize(course.degrees));
        }
        let variation = self.variation(record)?;
        Ok(normalize(course.degrees + variation))
    }

    fn radial(&mut self, station: &UnresolvedFix, bearing: Course, record: &LegRecord) -> Result<Radial> {
        Ok(Radial {
            station: self.point(station)?,
            bearing: self.course(bearing, record)?,
        })
    }

    fn fix(&mut self, record: &LegRecord) -> Result<Leg> {
        let endpoint = match &record.endpoint {
            RawEndpoint::None => Endpoint::None,
            RawEndpoint::Fix(fix) => Endpoint::Fix(self.point(fix)?),
            RawEndpoint::Radial { station, bearing } => {
                Endpoint::Radial(self.radial(station, *bearing, record)?)
            }
            RawEndpoint::Distance { point, nm } => Endpoint::Distance {
                point: self.point(point)?,
                nm: *nm,
            },
        };

        let via = match &record.via {
            RawVia::Direct => Via::Direct,
            RawVia::Course(course) => Via::Course(self.course(*course, record)?),
            RawVia::Radial {
                station,
                bearing,
                inbound,
            } => Via::Radial {
                radial: self.radial(station, *bearing, record)?,
                inbound: *inbound,
            },
            RawVia::Arc {
                center,
                radius,
                end_bearing,
                end_fix,
                direction,
            } => {
                let center = self.point(center)?;
                let end_bearing = match (end_bearing, end_fix) {
                    (Some(bearing), _) => self.course(*bearing, record)?,
                    (None, Some(fix)) => {
                        let end = self.point(fix)?;
                        bearing_distance(center.latlon, end.latlon)
                            .bearing
                            .ok_or_else(|| Error::floating(format!("arc ending at {}", fix.ident)))?
                    }
                    (None, None) => return Err(Error::floating("arc without an end")),
                };
                Via::Arc(Arc {
                    center,
                    radius: *radius,
                    end_bearing,
                    direction: *direction,
                })
            }
            RawVia::Racetrack {
                fix,
                inbound,
                turn,
                length,
            } => Via::Racetrack(Racetrack {
                fix: self.point(fix)?,
                inbound_course: self.course(*inbound, record)?,
                turn: *turn,
                length: match *length {
                    LegLength::Distance(nm) => HoldLength::Distance(nm),
                    LegLength::Time(t) => HoldLength::Time(t),
                },
            }),
        };

        Leg::builder()
            .path(record.path)
            .endpoint(endpoint)
            .via(via)
            .termination(record.path.termination())
            .altitude(record.altitude)
            .speed(record.speed)
            .flyover(record.flyover)
            .build()
            .map_err(Error::structural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::altitude::{AltitudeRestriction, SpeedRestriction};
    use crate::leg::{PathTermination, Termination};
    use rstest::rstest;

    fn to(name: &str) -> Leg {
        Leg::builder()
            .path(PathTermination::TrackToFix)
            .endpoint(Endpoint::Fix(NamedLatLon::new(name, LatLon::new(30.0, -90.0))))
            .via(Via::Direct)
            .termination(Termination::UNTIL_CROSSING)
            .build()
            .unwrap()
    }

    fn names(route: &[&Leg]) -> Vec<String> {
        route
            .iter()
            .map(|l| l.endpoint.name().unwrap_or("-").to_owned())
            .collect()
    }

    fn star() -> Procedure {
        let mut p = Procedure::new("ARRVL1", "KTST", ProcedureKind::Star);
        p.append('1', "A", vec![to("A1"), to("JOIN")]);
        p.append('1', "B", vec![to("B1"), to("JOIN")]);
        p.append('2', "", vec![to("JOIN"), to("MID"), to("EXIT")]);
        p.append('3', "X", vec![to("EXIT"), to("X1")]);
        p.append('3', "Y", vec![to("Y1")]);
        p
    }

    #[test]
    fn test_every_enumerated_route_is_complete() {
        let p = star();
        let pairs = p.enumerate_transitions();
        assert_eq!(4, pairs.len());
        for (inbound, outbound) in pairs {
            let route = p
                .select_route(inbound.as_ref().map(String::as_str), outbound.as_ref().map(String::as_str))
                .unwrap();
            let names = names(&route);
            assert_eq!(1, names.iter().filter(|n| *n == "MID").count());
            assert!(names.windows(2).all(|w| w[0] != w[1]), "{:?}", names);
            assert_eq!(1, names.iter().filter(|n| *n == "JOIN").count());
        }
        let route = p.select_route(Some("A"), Some("X")).unwrap();
        assert_eq!(vec!["A1", "JOIN", "MID", "EXIT", "X1"], names(&route));
    }

    #[rstest]
    #[case("RW07L", Some("RW07B"))]
    #[case("RW07B", Some("RW07B"))]
    #[case("RW25", Some("RW25"))]
    #[case("RW09L", None)]
    #[case("RW25R", None)]
    fn test_runway_fallback(#[case] requested: &str, #[case] served: Option<&str>) {
        let mut p = Procedure::new("DEPRT1", "KTST", ProcedureKind::Sid);
        p.append('4', "RW07B", vec![to("RW07B"), to("R07")]);
        p.append('4', "RW25", vec![to("RW25"), to("R25")]);
        p.append('2', "", vec![to("COMMON")]);

        match (p.select_route(Some(requested), None), served) {
            (Ok(route), Some(name)) => assert_eq!(name, route[0].endpoint.name().unwrap()),
            (Err(Error::TransitionNotFound { name }), None) => assert_eq!(requested, name),
            (other, _) => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_runway_fallback_only_on_runway_side() {
        let p = star();
        assert!(p.has_route(Some("A"), None));
        assert!(!p.has_route(Some("AL"), None));
        assert!(!p.has_route(None, Some("XR")));
    }

    #[test]
    fn test_all_and_none() {
        let mut p = Procedure::new("DEPRT2", "KTST", ProcedureKind::Sid);
        p.append('4', "RW07", vec![to("RW07"), to("R07")]);
        p.append('4', "RW25", vec![to("RW25"), to("R25")]);
        p.append('2', "", vec![to("COMMON")]);
        p.append('3', "ALL", vec![to("OUT")]);

        // two runways, no ALL: the inbound side contributes nothing
        let route = p.select_route(None, None).unwrap();
        assert_eq!(vec!["COMMON", "OUT"], names(&route));
        assert!(p.enumerate_transitions().contains(&(Some("RW07".to_owned()), None)));

        let mut single = Procedure::new("DEPRT3", "KTST", ProcedureKind::Sid);
        single.append('4', "RW07", vec![to("RW07"), to("R07")]);
        single.append('2', "", vec![to("COMMON")]);
        let route = single.select_route(None, None).unwrap();
        assert_eq!(vec!["RW07", "R07", "COMMON"], names(&route));
        assert!(route[0].ground);
        assert!(!route[1].ground);
    }

    #[test]
    fn test_approach_has_no_outbound() {
        let mut p = Procedure::new("I07", "KTST", ProcedureKind::Approach);
        p.append('A', "IAF", vec![to("IAF"), to("FAF")]);
        p.append('I', "", vec![to("FAF"), to("RW07")]);
        p.append('Z', "", vec![to("MAHP")]);

        let route = p.select_route(Some("IAF"), None).unwrap();
        assert_eq!(vec!["IAF", "FAF", "RW07", "MAHP"], names(&route));
        match p.select_route(Some("IAF"), Some("X")) {
            Err(Error::TransitionNotFound { name }) => assert_eq!("X", name),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(vec![(Some("IAF".to_owned()), None)], p.enumerate_transitions());
    }

    #[test]
    fn test_engine_out_skipped() {
        let mut p = Procedure::new("DEPRT4", "KTST", ProcedureKind::Sid);
        p.append('0', "RW07", vec![to("EO")]);
        assert_eq!(0, p.inbound_transitions().count());
        assert!(p.common_route().is_empty());
    }

    fn record(route_type: char, transition: &str, sequence: u32, path: PathTermination, via: RawVia, fix: &str) -> LegRecord {
        let fix = UnresolvedFix::new(fix, None);
        LegRecord {
            airport: "KTST".to_owned(),
            region: "K2".to_owned(),
            kind: ProcedureKind::Sid,
            procedure: "EXMPL1".to_owned(),
            route_type,
            transition: transition.to_owned(),
            sequence,
            path,
            fix: Some(fix.clone()),
            recommended: None,
            endpoint: RawEndpoint::Fix(fix),
            via,
            turn: None,
            altitude: AltitudeRestriction::default(),
            speed: SpeedRestriction::default(),
            flyover: false,
        }
    }

    fn tables() -> Tables {
        let mut t = Tables::new();
        t.add_airport(AirportRecord {
            ident: "KTST".to_owned(),
            region: "K2".to_owned(),
            latlon: LatLon::new(35.0, -100.0),
            variation: Some(10.0),
            elevation: 1200,
            transition_altitude: None,
            name: "TEST".to_owned(),
        });
        for (ident, lat) in &[("ALPHA", 35.1), ("BRAVO", 35.2)] {
            t.add_waypoint(WaypointRecord {
                ident: ident.to_string(),
                region: "K2".to_owned(),
                airport: None,
                latlon: LatLon::new(*lat, -100.0),
                variation: None,
                name: String::new(),
            });
        }
        // a far-away namesake the airport position must rule out
        t.add_waypoint(WaypointRecord {
            ident: "BRAVO".to_owned(),
            region: "K7".to_owned(),
            airport: None,
            latlon: LatLon::new(45.0, -70.0),
            variation: None,
            name: String::new(),
        });
        t
    }

    #[test]
    fn test_assemble_resolves_and_converts() {
        let t = tables();
        let records = vec![
            record('4', "RW07", 10, PathTermination::DirectToFix, RawVia::Direct, "ALPHA"),
            record(
                '2',
                "",
                20,
                PathTermination::CourseToFix,
                RawVia::Radial {
                    station: UnresolvedFix::new("BRAVO", None),
                    bearing: Course::magnetic(170.0),
                    inbound: true,
                },
                "BRAVO",
            ),
        ];
        let p = Procedure::assemble(&t, &records).unwrap();
        let route = p.select_route(Some("RW07"), None).unwrap();
        assert_eq!(2, route.len());
        match &route[1].via {
            Via::Radial { radial, inbound } => {
                assert!(inbound);
                assert_eq!(180.0, radial.bearing);
                assert_eq!(LatLon::new(35.2, -100.0), radial.station.latlon);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_assemble_rejects_mixed_procedures() {
        let t = tables();
        let mut other = record('2', "", 20, PathTermination::TrackToFix, RawVia::Direct, "BRAVO");
        other.procedure = "OTHER1".to_owned();
        let records = vec![
            record('2', "", 10, PathTermination::DirectToFix, RawVia::Direct, "ALPHA"),
            other,
        ];
        match Procedure::assemble(&t, &records) {
            Err(Error::Structural { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
