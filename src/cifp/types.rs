//! Records as decoded from single lines, before any cross-referencing.

use std::fmt;
use std::time::Duration;

use crate::altitude::{Altitude, AltitudeRestriction, SpeedRestriction};
use crate::geo::LatLon;
use crate::leg::{PathTermination, TurnDirection};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavaidClass {
    Vor,
    VorDme,
    Vortac,
    Tacan,
    Dme,
    Ndb,
    Other,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NavaidRecord {
    pub ident: String,
    pub region: String,
    pub airport: Option<String>,
    pub class: NavaidClass,
    pub frequency: Option<u32>,
    pub latlon: LatLon,
    pub variation: Option<f64>,
    pub elevation: Option<i32>,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WaypointRecord {
    pub ident: String,
    pub region: String,
    /// Owning airport for terminal waypoints.
    pub airport: Option<String>,
    pub latlon: LatLon,
    pub variation: Option<f64>,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AirportRecord {
    pub ident: String,
    pub region: String,
    pub latlon: LatLon,
    pub variation: Option<f64>,
    pub elevation: i32,
    pub transition_altitude: Option<Altitude>,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunwayRecord {
    pub airport: String,
    pub region: String,
    pub ident: String,
    pub latlon: LatLon,
    pub length: Option<u32>,
    /// Magnetic bearing in degrees.
    pub bearing: Option<f64>,
    pub threshold_elevation: Option<i32>,
}

/// A fix named on a record line, not yet bound to a position.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnresolvedFix {
    pub ident: String,
    pub region: Option<String>,
}

impl UnresolvedFix {
    pub fn new<S: Into<String>>(ident: S, region: Option<String>) -> Self {
        UnresolvedFix {
            ident: ident.into(),
            region,
        }
    }
}

/// A course or bearing as published.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Course {
    pub degrees: f64,
    pub magnetic: bool,
}

impl Course {
    pub fn magnetic(degrees: f64) -> Self {
        Course {
            degrees,
            magnetic: true,
        }
    }

    pub fn true_north(degrees: f64) -> Self {
        Course {
            degrees,
            magnetic: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LegLength {
    Distance(f64),
    Time(Duration),
}

/// Leg endpoint as decoded from one line.
#[derive(Clone, Debug, PartialEq)]
pub enum RawEndpoint {
    None,
    Fix(UnresolvedFix),
    Radial { station: UnresolvedFix, bearing: Course },
    Distance { point: UnresolvedFix, nm: f64 },
}

/// Leg path as decoded from one line.
#[derive(Clone, Debug, PartialEq)]
pub enum RawVia {
    Direct,
    Course(Course),
    Radial {
        station: UnresolvedFix,
        bearing: Course,
        inbound: bool,
    },
    Arc {
        center: UnresolvedFix,
        radius: f64,
        end_bearing: Option<Course>,
        end_fix: Option<UnresolvedFix>,
        direction: Option<TurnDirection>,
    },
    Racetrack {
        fix: UnresolvedFix,
        inbound: Course,
        turn: TurnDirection,
        length: LegLength,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProcedureKind {
    Sid,
    Star,
    Approach,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegRecord {
    pub airport: String,
    pub region: String,
    pub kind: ProcedureKind,
    pub procedure: String,
    pub route_type: char,
    pub transition: String,
    pub sequence: u32,
    pub path: PathTermination,
    pub fix: Option<UnresolvedFix>,
    pub recommended: Option<UnresolvedFix>,
    pub endpoint: RawEndpoint,
    pub via: RawVia,
    pub turn: Option<TurnDirection>,
    pub altitude: AltitudeRestriction,
    pub speed: SpeedRestriction,
    pub flyover: bool,
}

impl LegRecord {
    /// Key shared by every line of one procedure.
    pub fn procedure_key(&self) -> (&str, ProcedureKind, &str) {
        (&self.airport, self.kind, &self.procedure)
    }

    pub fn entity_key(&self) -> EntityKey {
        EntityKey::Procedure(self.airport.clone(), self.kind, self.procedure.clone())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AirwayFixRecord {
    pub airway: String,
    pub sequence: u32,
    pub fix: UnresolvedFix,
    /// Last fix of a continuous run of the airway.
    pub end: bool,
    pub min_altitude: Option<Altitude>,
    pub max_altitude: Option<Altitude>,
}

impl AirwayFixRecord {
    pub fn entity_key(&self) -> EntityKey {
        EntityKey::Airway(self.airway.clone())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryVia {
    Circle,
    GreatCircle,
    RhumbLine,
    ClockwiseArc,
    CounterClockwiseArc,
}

impl BoundaryVia {
    pub fn from_cifp(c: char) -> Option<Self> {
        match c {
            'C' => Some(BoundaryVia::Circle),
            'G' => Some(BoundaryVia::GreatCircle),
            'H' => Some(BoundaryVia::RhumbLine),
            'R' => Some(BoundaryVia::ClockwiseArc),
            'L' => Some(BoundaryVia::CounterClockwiseArc),
            _ => None,
        }
    }

    pub fn is_arc(self) -> bool {
        match self {
            BoundaryVia::ClockwiseArc | BoundaryVia::CounterClockwiseArc => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AirspaceKind {
    /// Class B, C or D and similar controlled areas.
    Controlled(char),
    /// Restrictive area type: prohibited, restricted, MOA, warning...
    Restrictive(char),
}

/// One directional piece of an airspace boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundarySegment {
    pub via: BoundaryVia,
    pub end_of_loop: bool,
    pub point: Option<LatLon>,
    pub arc_origin: Option<LatLon>,
    pub arc_distance: Option<f64>,
    /// True bearing from the arc origin to the start of the arc.
    pub arc_bearing: Option<f64>,
    pub lower: Option<Altitude>,
    pub upper: Option<Altitude>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AirspaceRecord {
    pub region: String,
    pub kind: AirspaceKind,
    /// Airport ident for controlled airspace, designation for restrictive.
    pub designator: String,
    pub multiple_code: char,
    pub sequence: u32,
    pub name: String,
    pub segment: BoundarySegment,
}

impl AirspaceRecord {
    pub fn group_key(&self) -> (&str, AirspaceKind, &str, char) {
        (&self.region, self.kind, &self.designator, self.multiple_code)
    }

    pub fn entity_key(&self) -> EntityKey {
        EntityKey::Airspace(
            self.region.clone(),
            self.kind,
            self.designator.clone(),
            self.multiple_code,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MsaSector {
    pub from_bearing: f64,
    pub to_bearing: f64,
    pub altitude: Altitude,
    pub radius: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MsaRecord {
    pub airport: String,
    pub center: UnresolvedFix,
    pub multiple_code: char,
    pub sectors: Vec<MsaSector>,
    pub magnetic: bool,
}

/// The multi-line entity a record belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// Airport, kind, procedure name.
    Procedure(String, ProcedureKind, String),
    Airway(String),
    /// Region, kind, designator, multiple code.
    Airspace(String, AirspaceKind, String, char),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntityKey::Procedure(airport, kind, name) => write!(f, "{:?} {} at {}", kind, name, airport),
            EntityKey::Airway(name) => write!(f, "airway {}", name),
            EntityKey::Airspace(_, _, designator, code) => write!(f, "airspace {} {}", designator, code),
        }
    }
}

/// Anything the decoder understands.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Navaid(NavaidRecord),
    Waypoint(WaypointRecord),
    Airport(AirportRecord),
    Runway(RunwayRecord),
    Leg(LegRecord),
    AirwayFix(AirwayFixRecord),
    Airspace(AirspaceRecord),
    Msa(MsaRecord),
}
