//! Fixed-column decoding, one function per record kind.
//!
//! Column numbers follow the ARINC 424 layout used by the FAA CIFP and are
//! 1-based. Every function validates what it reads; a bad field is a
//! [`Error::Format`] for that line.

use std::time::Duration;

use log::trace;

use super::types::*;
use crate::altitude::{Altitude, AltitudeRestriction, SpeedRestriction};
use crate::error::{Error, Result};
use crate::geo::{parse_variation, LatLon};
use crate::geodesy::normalize;
use crate::leg::{PathTermination, TurnDirection};
use crate::txt_data::{RecordKind, RecordLine};

/// Decode one line. Headers, unsupported kinds and continuation records
/// yield `None`.
pub fn decode(line: &RecordLine) -> Result<Option<Record>> {
    let kind = line.kind()?;
    let record = match kind {
        RecordKind::VhfNavaid => vhf_navaid(line)?.map(Record::Navaid),
        RecordKind::NdbNavaid => ndb_navaid(line)?.map(Record::Navaid),
        RecordKind::EnrouteWaypoint => waypoint(line, false)?.map(Record::Waypoint),
        RecordKind::TerminalWaypoint => waypoint(line, true)?.map(Record::Waypoint),
        RecordKind::Airport => airport(line)?.map(Record::Airport),
        RecordKind::Runway => runway(line)?.map(Record::Runway),
        RecordKind::Sid => procedure_leg(line, ProcedureKind::Sid)?.map(Record::Leg),
        RecordKind::Star => procedure_leg(line, ProcedureKind::Star)?.map(Record::Leg),
        RecordKind::Approach => procedure_leg(line, ProcedureKind::Approach)?.map(Record::Leg),
        RecordKind::AirwayFix => airway_fix(line)?.map(Record::AirwayFix),
        RecordKind::ControlledAirspace | RecordKind::RestrictiveAirspace => {
            airspace(line, kind)?.map(Record::Airspace)
        }
        RecordKind::Msa => msa(line)?.map(Record::Msa),
        RecordKind::Header | RecordKind::Unsupported(..) => {
            trace!("line {}: skipping {:?}", line.number, kind);
            None
        }
    };
    Ok(record)
}

/// The entity a line belongs to, read from its key columns alone so that
/// it is known even when the rest of the line fails to decode.
pub fn entity_key(line: &RecordLine) -> Option<EntityKey> {
    let procedure = |kind| {
        EntityKey::Procedure(
            line.trimmed(7, 4).to_owned(),
            kind,
            line.trimmed(14, 6).to_owned(),
        )
    };
    let key = match line.kind().ok()? {
        RecordKind::Sid => procedure(ProcedureKind::Sid),
        RecordKind::Star => procedure(ProcedureKind::Star),
        RecordKind::Approach => procedure(ProcedureKind::Approach),
        RecordKind::AirwayFix => EntityKey::Airway(line.trimmed(14, 5).to_owned()),
        RecordKind::ControlledAirspace => EntityKey::Airspace(
            line.trimmed(7, 2).to_owned(),
            AirspaceKind::Controlled(line.char_at(17)),
            line.trimmed(10, 5).to_owned(),
            line.char_at(20),
        ),
        RecordKind::RestrictiveAirspace => EntityKey::Airspace(
            line.trimmed(7, 2).to_owned(),
            AirspaceKind::Restrictive(line.char_at(9)),
            line.trimmed(10, 10).to_owned(),
            line.char_at(20),
        ),
        _ => return None,
    };
    Some(key)
}

fn is_primary(line: &RecordLine, col: usize) -> bool {
    match line.char_at(col) {
        '0' | '1' => true,
        _ => false,
    }
}

fn required<'a>(line: &RecordLine<'a>, col: usize, len: usize, what: &str) -> Result<&'a str> {
    line.optional(col, len)
        .ok_or_else(|| line.error(format!("missing {} at column {}", what, col)))
}

fn coords(line: &RecordLine, lat: usize, lon: usize) -> Result<Option<LatLon>> {
    if line.optional(lat, 9).is_none() && line.optional(lon, 10).is_none() {
        return Ok(None);
    }
    LatLon::from_cifp(line.field(lat, 9), line.field(lon, 10))
        .map(Some)
        .ok_or_else(|| {
            line.error(format!(
                "bad coordinates {:?} {:?}",
                line.field(lat, 9),
                line.field(lon, 10)
            ))
        })
}

fn variation(line: &RecordLine, col: usize) -> Result<Option<f64>> {
    match line.optional(col, 5) {
        None => Ok(None),
        Some(raw) => parse_variation(raw)
            .map(Some)
            .ok_or_else(|| line.error(format!("bad magnetic variation {:?}", raw))),
    }
}

fn tenths(line: &RecordLine, col: usize, len: usize) -> Result<Option<f64>> {
    Ok(line.optional_numeric::<u32>(col, len)?.map(|v| v as f64 / 10.0))
}

fn fix_ref(line: &RecordLine, col: usize, len: usize, region_col: usize) -> Option<UnresolvedFix> {
    line.optional(col, len).map(|ident| {
        UnresolvedFix::new(ident, line.optional(region_col, 2).map(str::to_owned))
    })
}

/// `0950` is 95.0° magnetic, `095T` is 95° true.
fn course(line: &RecordLine, col: usize) -> Result<Option<Course>> {
    let raw = match line.optional(col, 4) {
        None => return Ok(None),
        Some(raw) => raw,
    };
    let bad = || line.error(format!("bad course {:?}", raw));
    if raw.ends_with('T') {
        let deg: f64 = raw[..raw.len() - 1].parse().map_err(|_| bad())?;
        Ok(Some(Course::true_north(deg)))
    } else {
        let deg: u32 = raw.parse().map_err(|_| bad())?;
        Ok(Some(Course::magnetic(deg as f64 / 10.0)))
    }
}

/// `T010` is one minute, `0040` is 4.0 nm.
fn leg_length(line: &RecordLine, col: usize) -> Result<Option<LegLength>> {
    let raw = match line.optional(col, 4) {
        None => return Ok(None),
        Some(raw) => raw,
    };
    let bad = || line.error(format!("bad distance or time {:?}", raw));
    if raw.starts_with('T') {
        let tenths: u64 = raw[1..].parse().map_err(|_| bad())?;
        Ok(Some(LegLength::Time(Duration::from_secs(tenths * 6))))
    } else {
        let tenths: u32 = raw.parse().map_err(|_| bad())?;
        Ok(Some(LegLength::Distance(tenths as f64 / 10.0)))
    }
}

fn altitude(line: &RecordLine, col: usize, agl: bool) -> Result<Option<Altitude>> {
    Altitude::from_cifp(line.field(col, 5), agl).map_err(|e| line.error(e))
}

fn navaid_class(line: &RecordLine) -> NavaidClass {
    match (line.char_at(28), line.char_at(29)) {
        ('V', 'D') => NavaidClass::VorDme,
        ('V', 'T') | ('V', 'M') => NavaidClass::Vortac,
        ('V', _) => NavaidClass::Vor,
        (_, 'T') | (_, 'M') => NavaidClass::Tacan,
        (_, 'D') | (_, 'I') | (_, 'N') => NavaidClass::Dme,
        _ => NavaidClass::Other,
    }
}

pub fn vhf_navaid(line: &RecordLine) -> Result<Option<NavaidRecord>> {
    line.literal(5, "D ")?;
    if !is_primary(line, 22) {
        return Ok(None);
    }
    let latlon = match coords(line, 33, 42)? {
        Some(p) => p,
        // DME-only facilities carry just the DME position
        None => coords(line, 56, 65)?.ok_or_else(|| line.error("navaid without a position"))?,
    };
    Ok(Some(NavaidRecord {
        ident: required(line, 14, 4, "navaid ident")?.to_owned(),
        region: line.trimmed(20, 2).to_owned(),
        airport: line.optional(7, 4).map(str::to_owned),
        class: navaid_class(line),
        frequency: line.optional_numeric(23, 5)?,
        latlon,
        variation: variation(line, 75)?,
        elevation: line.optional_numeric(80, 5)?,
        name: line.trimmed(94, 30).to_owned(),
    }))
}

pub fn ndb_navaid(line: &RecordLine) -> Result<Option<NavaidRecord>> {
    line.literal(5, "DB")?;
    if !is_primary(line, 22) {
        return Ok(None);
    }
    Ok(Some(NavaidRecord {
        ident: required(line, 14, 4, "navaid ident")?.to_owned(),
        region: line.trimmed(20, 2).to_owned(),
        airport: line.optional(7, 4).map(str::to_owned),
        class: NavaidClass::Ndb,
        frequency: line.optional_numeric(23, 5)?,
        latlon: coords(line, 33, 42)?.ok_or_else(|| line.error("NDB without a position"))?,
        variation: variation(line, 75)?,
        elevation: None,
        name: line.trimmed(94, 30).to_owned(),
    }))
}

pub fn waypoint(line: &RecordLine, terminal: bool) -> Result<Option<WaypointRecord>> {
    if terminal {
        line.literal(13, "C")?;
    } else {
        line.literal(5, "EA")?;
    }
    if !is_primary(line, 22) {
        return Ok(None);
    }
    Ok(Some(WaypointRecord {
        ident: required(line, 14, 5, "waypoint ident")?.to_owned(),
        region: line.trimmed(20, 2).to_owned(),
        airport: if terminal {
            Some(required(line, 7, 4, "airport")?.to_owned())
        } else {
            None
        },
        latlon: coords(line, 33, 42)?.ok_or_else(|| line.error("waypoint without a position"))?,
        variation: variation(line, 75)?,
        name: line.trimmed(99, 25).to_owned(),
    }))
}

pub fn airport(line: &RecordLine) -> Result<Option<AirportRecord>> {
    line.literal(13, "A")?;
    if !is_primary(line, 22) {
        return Ok(None);
    }
    Ok(Some(AirportRecord {
        ident: required(line, 7, 4, "airport ident")?.to_owned(),
        region: line.trimmed(11, 2).to_owned(),
        latlon: coords(line, 33, 42)?.ok_or_else(|| line.error("airport without a position"))?,
        variation: variation(line, 52)?,
        elevation: line.numeric(57, 5)?,
        transition_altitude: line.optional_numeric(71, 5)?.map(Altitude::msl),
        name: line.trimmed(94, 30).to_owned(),
    }))
}

pub fn runway(line: &RecordLine) -> Result<Option<RunwayRecord>> {
    line.literal(13, "G")?;
    line.literal(14, "RW")?;
    if !is_primary(line, 22) {
        return Ok(None);
    }
    let bearing = match line.optional(28, 4) {
        Some(raw) if !raw.ends_with('T') => Some(line.numeric::<u32>(28, 4)? as f64 / 10.0),
        _ => None,
    };
    Ok(Some(RunwayRecord {
        airport: required(line, 7, 4, "airport")?.to_owned(),
        region: line.trimmed(11, 2).to_owned(),
        ident: line.trimmed(14, 5).to_owned(),
        latlon: coords(line, 33, 42)?.ok_or_else(|| line.error("runway without a position"))?,
        length: line.optional_numeric(23, 5)?,
        bearing,
        threshold_elevation: line.optional_numeric(67, 5)?,
    }))
}

pub fn procedure_leg(line: &RecordLine, kind: ProcedureKind) -> Result<Option<LegRecord>> {
    if !is_primary(line, 39) {
        return Ok(None);
    }

    let code = required(line, 48, 2, "path and termination")?;
    let path = PathTermination::from_code(code)
        .ok_or_else(|| line.error(format!("unknown path and termination {:?}", code)))?;

    let fix = fix_ref(line, 30, 5, 35);
    let recommended = fix_ref(line, 51, 4, 55);
    let center = fix_ref(line, 107, 5, 114);
    let turn = TurnDirection::from_cifp(line.char_at(44));

    let altitude = AltitudeRestriction::from_cifp(
        line.char_at(83),
        altitude(line, 85, false)?,
        altitude(line, 90, false)?,
    )
    .map_err(|e| line.error(e.to_string()))?;
    let speed = SpeedRestriction::from_cifp(line.char_at(118), line.optional_numeric(100, 3)?)
        .map_err(|e| line.error(e.to_string()))?;

    let shape = LegShape {
        line,
        path,
        fix: fix.clone(),
        recommended: recommended.clone(),
        center,
        turn,
        course: course(line, 71)?,
        theta: tenths(line, 63, 4)?,
        rho: tenths(line, 67, 4)?,
        arc_radius: line.optional_numeric::<u32>(57, 6)?.map(|r| r as f64 / 1000.0),
        length: leg_length(line, 75)?,
    };
    let (endpoint, via) = shape.resolve()?;

    Ok(Some(LegRecord {
        airport: required(line, 7, 4, "airport")?.to_owned(),
        region: line.trimmed(11, 2).to_owned(),
        kind,
        procedure: required(line, 14, 6, "procedure ident")?.to_owned(),
        route_type: line.char_at(20),
        transition: line.trimmed(21, 5).to_owned(),
        sequence: line.numeric(27, 3)?,
        path,
        fix,
        recommended,
        endpoint,
        via,
        turn,
        altitude,
        speed,
        flyover: match line.char_at(41) {
            'Y' | 'B' => true,
            _ => false,
        },
    }))
}

/// The fields of a leg line that decide its endpoint and path.
struct LegShape<'l, 'a> {
    line: &'l RecordLine<'a>,
    path: PathTermination,
    fix: Option<UnresolvedFix>,
    recommended: Option<UnresolvedFix>,
    center: Option<UnresolvedFix>,
    turn: Option<TurnDirection>,
    course: Option<Course>,
    theta: Option<f64>,
    rho: Option<f64>,
    arc_radius: Option<f64>,
    length: Option<LegLength>,
}

impl<'l, 'a> LegShape<'l, 'a> {
    fn missing(&self, what: &str) -> Error {
        self.line.error(format!("{} leg without {}", self.path, what))
    }

    fn fix(&self) -> Result<UnresolvedFix> {
        self.fix.clone().ok_or_else(|| self.missing("a fix"))
    }

    fn navaid(&self) -> Result<UnresolvedFix> {
        self.recommended
            .clone()
            .ok_or_else(|| self.missing("a recommended navaid"))
    }

    fn course(&self) -> Result<Course> {
        self.course.ok_or_else(|| self.missing("a course"))
    }

    fn distance(&self) -> Result<f64> {
        match self.length {
            Some(LegLength::Distance(nm)) => Ok(nm),
            Some(LegLength::Time(_)) => Err(self.missing("a distance")),
            None => self.rho.ok_or_else(|| self.missing("a distance")),
        }
    }

    fn outbound(&self) -> Result<RawVia> {
        Ok(RawVia::Radial {
            station: self.fix()?,
            bearing: self.course()?,
            inbound: false,
        })
    }

    fn resolve(&self) -> Result<(RawEndpoint, RawVia)> {
        use PathTermination::*;

        Ok(match self.path {
            InitialFix | TrackToFix | DirectToFix => (RawEndpoint::Fix(self.fix()?), RawVia::Direct),
            CourseToFix => {
                let course = self.course()?;
                let fix = self.fix()?;
                (
                    RawEndpoint::Fix(fix.clone()),
                    RawVia::Radial {
                        station: fix,
                        bearing: Course {
                            degrees: normalize(course.degrees + 180.0),
                            ..course
                        },
                        inbound: true,
                    },
                )
            }
            CourseToAltitude | HeadingToAltitude | CourseToIntercept | HeadingToIntercept
            | HeadingToManual => (RawEndpoint::None, RawVia::Course(self.course()?)),
            CourseToDme | HeadingToDme => (
                RawEndpoint::Distance {
                    point: self.navaid()?,
                    nm: self.distance()?,
                },
                RawVia::Course(self.course()?),
            ),
            CourseToRadial | HeadingToRadial => (
                RawEndpoint::Radial {
                    station: self.navaid()?,
                    bearing: Course::magnetic(self.theta.ok_or_else(|| self.missing("a theta"))?),
                },
                RawVia::Course(self.course()?),
            ),
            FixToAltitude | FixToManual => (RawEndpoint::None, self.outbound()?),
            FixToDistance | ProcedureTurn => (
                RawEndpoint::Distance {
                    point: self.fix()?,
                    nm: self.distance()?,
                },
                self.outbound()?,
            ),
            FixToDme => (
                RawEndpoint::Distance {
                    point: self.navaid()?,
                    nm: self.distance()?,
                },
                self.outbound()?,
            ),
            RadiusToFix => (
                RawEndpoint::Fix(self.fix()?),
                RawVia::Arc {
                    center: self.center.clone().ok_or_else(|| self.missing("an arc center"))?,
                    radius: self.arc_radius.ok_or_else(|| self.missing("an arc radius"))?,
                    end_bearing: None,
                    end_fix: Some(self.fix()?),
                    direction: self.turn,
                },
            ),
            ArcToFix => (
                RawEndpoint::Fix(self.fix()?),
                RawVia::Arc {
                    center: self.navaid()?,
                    radius: self.rho.ok_or_else(|| self.missing("a rho"))?,
                    end_bearing: self.theta.map(Course::magnetic),
                    end_fix: Some(self.fix()?),
                    direction: self.turn,
                },
            ),
            HoldToAltitude | HoldToFix | HoldToManual => {
                let length = self.length.ok_or_else(|| {
                    Error::structural(format!(
                        "line {}: hold without a distance or time",
                        self.line.number
                    ))
                })?;
                (
                    RawEndpoint::Fix(self.fix()?),
                    RawVia::Racetrack {
                        fix: self.fix()?,
                        inbound: self.course()?,
                        turn: self.turn.unwrap_or(TurnDirection::Right),
                        length,
                    },
                )
            }
        })
    }
}

pub fn airway_fix(line: &RecordLine) -> Result<Option<AirwayFixRecord>> {
    line.literal(5, "ER")?;
    if !is_primary(line, 39) {
        return Ok(None);
    }
    Ok(Some(AirwayFixRecord {
        airway: required(line, 14, 5, "airway ident")?.to_owned(),
        sequence: line.numeric(26, 4)?,
        fix: fix_ref(line, 30, 5, 35).ok_or_else(|| line.error("airway record without a fix"))?,
        end: line.char_at(41) == 'E',
        min_altitude: altitude(line, 84, false)?,
        max_altitude: altitude(line, 94, false)?,
    }))
}

pub fn airspace(line: &RecordLine, kind: RecordKind) -> Result<Option<AirspaceRecord>> {
    line.literal(5, "U")?;
    if !is_primary(line, 25) {
        return Ok(None);
    }

    let (kind, designator) = match kind {
        RecordKind::ControlledAirspace => (
            AirspaceKind::Controlled(line.char_at(17)),
            required(line, 10, 5, "airspace center")?,
        ),
        _ => (
            AirspaceKind::Restrictive(line.char_at(9)),
            required(line, 10, 10, "airspace designation")?,
        ),
    };

    let via_code = line.char_at(31);
    let via = BoundaryVia::from_cifp(via_code)
        .ok_or_else(|| line.error(format!("unknown boundary via {:?}", via_code)))?;

    let segment = BoundarySegment {
        via,
        end_of_loop: line.char_at(32) == 'E',
        point: coords(line, 33, 42)?,
        arc_origin: coords(line, 52, 61)?,
        arc_distance: tenths(line, 71, 4)?,
        arc_bearing: tenths(line, 75, 4)?,
        lower: altitude(line, 81, line.char_at(86) == 'A')?,
        upper: altitude(line, 87, line.char_at(92) == 'A')?,
    };

    match (via, &segment) {
        (BoundaryVia::Circle, BoundarySegment { arc_origin: None, .. })
        | (BoundaryVia::Circle, BoundarySegment { arc_distance: None, .. }) => {
            return Err(line.error("circle without origin or radius"))
        }
        (v, BoundarySegment { arc_origin: None, .. }) if v.is_arc() => {
            return Err(line.error("arc without an origin"))
        }
        (v, BoundarySegment { point: None, .. }) if v != BoundaryVia::Circle => {
            return Err(line.error("boundary segment without a position"))
        }
        _ => {}
    }

    Ok(Some(AirspaceRecord {
        region: line.trimmed(7, 2).to_owned(),
        kind,
        designator: designator.to_owned(),
        multiple_code: line.char_at(20),
        sequence: line.numeric(21, 4)?,
        name: line.trimmed(94, 30).to_owned(),
        segment,
    }))
}

pub fn msa(line: &RecordLine) -> Result<Option<MsaRecord>> {
    line.literal(13, "S")?;
    if !is_primary(line, 39) {
        return Ok(None);
    }

    let mut sectors = Vec::new();
    for i in 0..7 {
        let col = 43 + i * 11;
        if line.optional(col, 11).is_none() {
            break;
        }
        sectors.push(MsaSector {
            from_bearing: line.numeric::<u32>(col, 3)? as f64,
            to_bearing: line.numeric::<u32>(col + 3, 3)? as f64,
            altitude: Altitude::msl(line.numeric::<i32>(col + 6, 3)? * 100),
            radius: line.numeric::<u32>(col + 9, 2)? as f64,
        });
    }
    if sectors.is_empty() {
        return Err(line.error("MSA without sectors"));
    }

    Ok(Some(MsaRecord {
        airport: required(line, 7, 4, "airport")?.to_owned(),
        center: fix_ref(line, 14, 5, 19).ok_or_else(|| line.error("MSA without a center"))?,
        multiple_code: line.char_at(23),
        sectors,
        magnetic: line.char_at(120) != 'T',
    }))
}
