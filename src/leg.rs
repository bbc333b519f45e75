//! Resolved procedure legs.
//!
//! A [`Leg`] is immutable once a procedure is assembled. Everything it
//! references is positioned; the unresolved forms only exist in
//! [`crate::cifp::types`].

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::time::Duration;

use crate::altitude::{AltitudeRestriction, SpeedRestriction};
use crate::geo::{LatLon, NamedLatLon};
use crate::geodesy::{self, RADIAL_TOLERANCE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathTermination {
    InitialFix,
    TrackToFix,
    DirectToFix,
    CourseToFix,
    CourseToAltitude,
    CourseToDme,
    CourseToIntercept,
    CourseToRadial,
    FixToAltitude,
    FixToDistance,
    FixToDme,
    FixToManual,
    HeadingToAltitude,
    HeadingToDme,
    HeadingToIntercept,
    HeadingToManual,
    HeadingToRadial,
    RadiusToFix,
    ArcToFix,
    ProcedureTurn,
    HoldToAltitude,
    HoldToFix,
    HoldToManual,
}

impl PathTermination {
    pub fn from_code(code: &str) -> Option<Self> {
        use PathTermination::*;
        Some(match code {
            "IF" => InitialFix,
            "TF" => TrackToFix,
            "DF" => DirectToFix,
            "CF" => CourseToFix,
            "CA" => CourseToAltitude,
            "CD" => CourseToDme,
            "CI" => CourseToIntercept,
            "CR" => CourseToRadial,
            "FA" => FixToAltitude,
            "FC" => FixToDistance,
            "FD" => FixToDme,
            "FM" => FixToManual,
            "VA" => HeadingToAltitude,
            "VD" => HeadingToDme,
            "VI" => HeadingToIntercept,
            "VM" => HeadingToManual,
            "VR" => HeadingToRadial,
            "RF" => RadiusToFix,
            "AF" => ArcToFix,
            "PI" => ProcedureTurn,
            "HA" => HoldToAltitude,
            "HF" => HoldToFix,
            "HM" => HoldToManual,
            _ => return None,
        })
    }

    pub fn code(self) -> &'static str {
        use PathTermination::*;
        match self {
            InitialFix => "IF",
            TrackToFix => "TF",
            DirectToFix => "DF",
            CourseToFix => "CF",
            CourseToAltitude => "CA",
            CourseToDme => "CD",
            CourseToIntercept => "CI",
            CourseToRadial => "CR",
            FixToAltitude => "FA",
            FixToDistance => "FC",
            FixToDme => "FD",
            FixToManual => "FM",
            HeadingToAltitude => "VA",
            HeadingToDme => "VD",
            HeadingToIntercept => "VI",
            HeadingToManual => "VM",
            HeadingToRadial => "VR",
            RadiusToFix => "RF",
            ArcToFix => "AF",
            ProcedureTurn => "PI",
            HoldToAltitude => "HA",
            HoldToFix => "HF",
            HoldToManual => "HM",
        }
    }

    /// Conditions that end a leg of this kind.
    pub fn termination(self) -> Termination {
        use PathTermination::*;
        match self {
            InitialFix | TrackToFix | DirectToFix | CourseToFix | RadiusToFix | ArcToFix | HoldToFix => {
                Termination::UNTIL_CROSSING
            }
            CourseToAltitude | FixToAltitude | HeadingToAltitude => Termination::UNTIL_ALTITUDE,
            HoldToAltitude => Termination::UNTIL_ALTITUDE | Termination::UNTIL_CROSSING,
            CourseToDme | FixToDme | HeadingToDme => Termination::UNTIL_DISTANCE,
            CourseToIntercept | HeadingToIntercept => Termination::UNTIL_INTERCEPT,
            CourseToRadial | HeadingToRadial => Termination::UNTIL_RADIAL,
            FixToDistance | ProcedureTurn => Termination::FOR_DISTANCE,
            FixToManual | HeadingToManual | HoldToManual => Termination::UNTIL_TERMINATED,
        }
    }
}

impl fmt::Display for PathTermination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Set of leg completion conditions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Termination(u8);

impl Termination {
    pub const UNTIL_CROSSING: Termination = Termination(1);
    pub const UNTIL_ALTITUDE: Termination = Termination(1 << 1);
    pub const UNTIL_DISTANCE: Termination = Termination(1 << 2);
    pub const UNTIL_INTERCEPT: Termination = Termination(1 << 3);
    pub const UNTIL_RADIAL: Termination = Termination(1 << 4);
    pub const FOR_DISTANCE: Termination = Termination(1 << 5);
    pub const UNTIL_TERMINATED: Termination = Termination(1 << 6);

    pub fn contains(self, other: Termination) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Termination {
    type Output = Termination;

    fn bitor(self, rhs: Termination) -> Termination {
        Termination(self.0 | rhs.0)
    }
}

impl BitOrAssign for Termination {
    fn bitor_assign(&mut self, rhs: Termination) {
        self.0 |= rhs.0;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    pub fn from_cifp(c: char) -> Option<Self> {
        match c {
            'L' => Some(TurnDirection::Left),
            'R' => Some(TurnDirection::Right),
            _ => None,
        }
    }

    /// `+1` for clockwise.
    pub fn sign(self) -> f64 {
        match self {
            TurnDirection::Left => -1.0,
            TurnDirection::Right => 1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            TurnDirection::Left => TurnDirection::Right,
            TurnDirection::Right => TurnDirection::Left,
        }
    }
}

/// A true bearing line from a station.
#[derive(Clone, Debug, PartialEq)]
pub struct Radial {
    pub station: NamedLatLon,
    pub bearing: f64,
}

impl Radial {
    /// Signed error between the radial and the aircraft's bearing from the
    /// station, positive when the aircraft is counter-clockwise of it.
    pub fn error(&self, position: LatLon) -> Option<(f64, f64)> {
        let bd = geodesy::bearing_distance(self.station.latlon, position);
        bd.bearing
            .map(|b| (geodesy::signed_diff(self.bearing, b), bd.distance))
    }

    pub fn is_on(&self, position: LatLon) -> bool {
        self.error(position)
            .map_or(true, |(err, _)| err.abs() <= RADIAL_TOLERANCE)
    }
}

impl fmt::Display for Radial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}R{:03.0}", self.station.name, self.bearing)
    }
}

/// Where a leg ends.
#[derive(Clone, Debug, PartialEq)]
pub enum Endpoint {
    None,
    Fix(NamedLatLon),
    Radial(Radial),
    Distance { point: NamedLatLon, nm: f64 },
}

impl Endpoint {
    pub fn fix(&self) -> Option<&NamedLatLon> {
        match self {
            Endpoint::Fix(f) => Some(f),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.fix().map(|f| f.name.as_str())
    }
}

/// A DME arc or radius-to-fix arc around `center`.
#[derive(Clone, Debug, PartialEq)]
pub struct Arc {
    pub center: NamedLatLon,
    pub radius: f64,
    /// True bearing from the center where the arc ends.
    pub end_bearing: f64,
    pub direction: Option<TurnDirection>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HoldLength {
    Distance(f64),
    Time(Duration),
}

/// A holding pattern around `fix`.
#[derive(Clone, Debug, PartialEq)]
pub struct Racetrack {
    pub fix: NamedLatLon,
    pub inbound_course: f64,
    pub turn: TurnDirection,
    pub length: HoldLength,
}

/// How the aircraft gets to the endpoint. Courses are true.
#[derive(Clone, Debug, PartialEq)]
pub enum Via {
    Direct,
    Course(f64),
    Radial { radial: Radial, inbound: bool },
    Arc(Arc),
    Racetrack(Racetrack),
}

#[derive(Clone, Debug, PartialEq, Builder)]
pub struct Leg {
    pub path: PathTermination,
    pub endpoint: Endpoint,
    pub via: Via,
    pub termination: Termination,
    #[builder(default)]
    pub altitude: AltitudeRestriction,
    #[builder(default)]
    pub speed: SpeedRestriction,
    /// The leg starts on the runway.
    #[builder(default)]
    pub ground: bool,
    #[builder(default)]
    pub flyover: bool,
}

impl Leg {
    pub fn builder() -> LegBuilder {
        LegBuilder::default()
    }

    /// Approximate point where the leg ends when flown from `from`, for
    /// drawing and distance estimates.
    pub fn projected_end(&self, from: Option<LatLon>) -> Option<LatLon> {
        match (&self.endpoint, &self.via) {
            (Endpoint::Fix(f), _) => Some(f.latlon),
            (Endpoint::Radial(r), Via::Course(course)) => {
                geodesy::radial_intersect(from?, *course, r.station.latlon, r.bearing, RADIAL_TOLERANCE).ok()
            }
            (Endpoint::Distance { point, nm }, Via::Radial { radial, inbound: false })
                if radial.station.latlon == point.latlon =>
            {
                geodesy::destination(point.latlon, radial.bearing, *nm).ok()
            }
            _ => None,
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.path)?;
        match &self.via {
            Via::Direct => {}
            Via::Course(c) => write!(f, " {:03.0}T", c)?,
            Via::Radial { radial, inbound } => {
                write!(f, " {} {}", if *inbound { "to" } else { "via" }, radial)?
            }
            Via::Arc(arc) => write!(f, " arc {:.1}nm {}", arc.radius, arc.center.name)?,
            Via::Racetrack(hold) => write!(f, " hold {:?} {:03.0}T", hold.turn, hold.inbound_course)?,
        }
        match &self.endpoint {
            Endpoint::None => {}
            Endpoint::Fix(fix) => write!(f, " {}", fix.name)?,
            Endpoint::Radial(r) => write!(f, " until {}", r)?,
            Endpoint::Distance { point, nm } => write!(f, " until {}/{:.1}", point.name, nm)?,
        }
        if !self.altitude.is_unrestricted() {
            write!(f, " {}", self.altitude)?;
        }
        if !self.speed.is_unrestricted() {
            write!(f, " {}", self.speed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("IF", Termination::UNTIL_CROSSING)]
    #[case("CA", Termination::UNTIL_ALTITUDE)]
    #[case("VD", Termination::UNTIL_DISTANCE)]
    #[case("CI", Termination::UNTIL_INTERCEPT)]
    #[case("VR", Termination::UNTIL_RADIAL)]
    #[case("FC", Termination::FOR_DISTANCE)]
    #[case("HM", Termination::UNTIL_TERMINATED)]
    fn test_path_codes(#[case] code: &str, #[case] term: Termination) {
        let path = PathTermination::from_code(code).unwrap();
        assert_eq!(code, path.code());
        assert_eq!(term, path.termination());
    }

    #[test]
    fn test_termination_flags() {
        let t = PathTermination::HoldToAltitude.termination();
        assert!(t.contains(Termination::UNTIL_ALTITUDE));
        assert!(t.contains(Termination::UNTIL_CROSSING));
        assert!(!t.contains(Termination::UNTIL_TERMINATED));
        assert!(Termination::default().is_empty());
        assert!(PathTermination::from_code("XX").is_none());
    }

    #[test]
    fn test_projected_end_on_radial() {
        let station = NamedLatLon::new("ABC", LatLon::new(40.0, -100.0));
        let from = geodesy::destination(station.latlon, 270.0, 10.0).unwrap();
        let leg = Leg::builder()
            .path(PathTermination::CourseToRadial)
            .endpoint(Endpoint::Radial(Radial {
                station: station.clone(),
                bearing: 330.0,
            }))
            .via(Via::Course(0.0))
            .termination(Termination::UNTIL_RADIAL)
            .build()
            .unwrap();
        let end = leg.projected_end(Some(from)).unwrap();
        let (err, _) = Radial {
            station,
            bearing: 330.0,
        }
        .error(end)
        .unwrap();
        assert!(err.abs() <= RADIAL_TOLERANCE);
        assert_eq!(None, leg.projected_end(None));
    }
}
