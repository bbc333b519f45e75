//! Steering and leg completion for a simulated aircraft.
//!
//! Guidance is a pure function of the leg, the aircraft state and an
//! explicit [`Tick`]. The only mutable state is the caller-owned
//! [`Traversal`], which remembers where the leg was started from and how far
//! along a hold the aircraft is.

mod hold;

use std::cmp::Ordering;
use std::time::Duration;

pub use self::hold::{classify, Abeam, HoldEntry, HoldPhase, HoldState};

use crate::altitude::{Altitude, AltitudeRestriction};
use crate::error::{Error, Result};
use crate::geo::LatLon;
use crate::geodesy::{bearing_distance, normalize, reciprocal, signed_diff, RADIAL_TOLERANCE};
use crate::leg::{Arc, Endpoint, Leg, Radial, Termination, Via};

/// A fix is reached inside this distance.
pub const FIX_CAPTURE_NM: f64 = 0.25;
/// A fix behind the aircraft and inside this distance has been passed.
pub const FIX_PASSED_NM: f64 = 1.0;
/// Radial and arc tracking give up steering this close to the station.
pub const STATION_NM: f64 = 0.1;
pub const ARC_TOLERANCE_NM: f64 = 0.1;
pub const INTERCEPT_ANGLE: f64 = 45.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AircraftState {
    pub position: LatLon,
    pub altitude: Altitude,
    /// True course over the ground.
    pub course: f64,
    pub on_ground: bool,
}

/// Simulation clock for one guidance step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tick {
    pub interval: Duration,
    /// Time since the simulation started.
    pub elapsed: Duration,
}

/// Progress through one leg. Start a new one for every leg flown.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Traversal {
    origin: Option<LatLon>,
    hold: HoldState,
}

impl Traversal {
    /// Start a leg at `origin`, normally the aircraft position when the
    /// previous leg completed.
    pub fn new(origin: LatLon) -> Self {
        Traversal {
            origin: Some(origin),
            hold: HoldState::default(),
        }
    }

    pub fn origin(&self) -> Option<LatLon> {
        self.origin
    }

    pub fn hold(&self) -> &HoldState {
        &self.hold
    }

    pub fn reset_hold(&mut self) {
        self.hold = HoldState::default();
    }
}

/// Course that tracks `radial`, toward the station when `inbound`.
///
/// On the radial the track is flown with a correction equal to the error;
/// further off it the aircraft cuts back at [`INTERCEPT_ANGLE`].
pub fn radial_course(radial: &Radial, inbound: bool, position: LatLon) -> f64 {
    let track = if inbound {
        reciprocal(radial.bearing)
    } else {
        radial.bearing
    };
    let err = match radial.error(position) {
        Some((_, distance)) if distance < STATION_NM => return track,
        Some((err, _)) => err,
        None => return track,
    };
    // outbound the correction follows the error, inbound it is mirrored
    let sign = if inbound { -1.0 } else { 1.0 };
    if err.abs() > RADIAL_TOLERANCE {
        normalize(track + sign * INTERCEPT_ANGLE * err.signum())
    } else {
        normalize(track + sign * err)
    }
}

/// Course that flies `arc`, converging back onto it when off by more than
/// [`ARC_TOLERANCE_NM`].
pub fn arc_course(arc: &Arc, position: LatLon) -> f64 {
    let bd = bearing_distance(arc.center.latlon, position);
    let bearing = match bd.bearing {
        Some(b) => b,
        None => return arc.end_bearing,
    };
    if bd.distance < arc.radius - ARC_TOLERANCE_NM {
        return bearing;
    }
    if bd.distance > arc.radius + ARC_TOLERANCE_NM {
        return reciprocal(bearing);
    }
    let sign = match arc.direction {
        Some(direction) => direction.sign(),
        None if signed_diff(arc.end_bearing, bearing) >= 0.0 => 1.0,
        None => -1.0,
    };
    normalize(bearing + 90.0 * sign)
}

/// Within capture distance, or just passed with the fix behind.
pub fn fix_crossed(fix: LatLon, state: &AircraftState) -> bool {
    let bd = bearing_distance(state.position, fix);
    if bd.distance < FIX_CAPTURE_NM {
        return true;
    }
    match bd.bearing {
        Some(b) => signed_diff(b, state.course).abs() > 90.0 && bd.distance < FIX_PASSED_NM,
        None => true,
    }
}

/// Whether `position` has reached `radial`. With a reference point the
/// radial counts as crossed once the error changed sign; without one the
/// aircraft has to be on it.
pub fn radial_crossed(radial: &Radial, reference: Option<LatLon>, position: LatLon) -> bool {
    let now = match radial.error(position) {
        Some((_, distance)) if distance < STATION_NM => return true,
        Some((err, _)) => err,
        None => return true,
    };
    if now.abs() > 90.0 {
        // the reciprocal radial
        return false;
    }
    match reference.and_then(|r| radial.error(r)) {
        Some((before, _)) if before.abs() <= 90.0 => before * now <= 0.0,
        _ => now.abs() <= RADIAL_TOLERANCE,
    }
}

fn altitude_reached(restriction: &AltitudeRestriction, altitude: Altitude) -> Result<bool> {
    match (restriction.min, restriction.max) {
        (Some(min), _) => Ok(altitude.compare(&min)? != Ordering::Less),
        (None, Some(max)) => Ok(altitude.compare(&max)? != Ordering::Greater),
        (None, None) => Ok(true),
    }
}

fn missing(leg: &Leg, what: &str) -> Error {
    Error::floating(format!("{} leg without {}", leg.path, what))
}

impl Leg {
    /// True course to fly this tick.
    pub fn course_to_fly(&self, traversal: &mut Traversal, state: &AircraftState, tick: Tick) -> Result<f64> {
        if state.on_ground {
            return Ok(state.course);
        }
        match &self.via {
            Via::Direct => {
                let fix = self.endpoint.fix().ok_or_else(|| missing(self, "a fix"))?;
                Ok(bearing_distance(state.position, fix.latlon)
                    .bearing
                    .unwrap_or(state.course))
            }
            Via::Course(course) => Ok(*course),
            Via::Radial { radial, inbound } => Ok(radial_course(radial, *inbound, state.position)),
            Via::Arc(arc) => Ok(arc_course(arc, state.position)),
            Via::Racetrack(hold) => Ok(traversal.hold.course(hold, state, tick)),
        }
    }

    /// Whether every completion condition of the leg holds. `next` is the
    /// leg that follows, needed for intercepts.
    pub fn is_complete(&self, traversal: &Traversal, state: &AircraftState, next: Option<&Leg>) -> Result<bool> {
        let termination = self.termination;
        if let Via::Racetrack(_) = self.via {
            let reached = if termination.contains(Termination::UNTIL_ALTITUDE) {
                altitude_reached(&self.altitude, state.altitude)?
            } else {
                true
            };
            return Ok(traversal.hold.is_complete(termination, reached));
        }
        if termination.contains(Termination::UNTIL_TERMINATED) {
            return Ok(false);
        }

        let position = state.position;
        if termination.contains(Termination::UNTIL_CROSSING) {
            let crossed = match &self.endpoint {
                Endpoint::Fix(fix) => fix_crossed(fix.latlon, state),
                Endpoint::Radial(radial) => radial_crossed(radial, traversal.origin, position),
                _ => return Err(missing(self, "a fix to cross")),
            };
            if !crossed {
                return Ok(false);
            }
        }
        if termination.contains(Termination::UNTIL_ALTITUDE) && !altitude_reached(&self.altitude, state.altitude)? {
            return Ok(false);
        }
        if termination.contains(Termination::UNTIL_DISTANCE) {
            let (point, nm) = match &self.endpoint {
                Endpoint::Distance { point, nm } => (point.latlon, *nm),
                _ => return Err(missing(self, "a distance")),
            };
            let offset = |p: LatLon| bearing_distance(point, p).distance - nm;
            let now = offset(position);
            let crossed = match traversal.origin {
                Some(origin) => offset(origin) * now <= 0.0,
                None => now.abs() < FIX_CAPTURE_NM,
            };
            if !crossed {
                return Ok(false);
            }
        }
        if termination.contains(Termination::UNTIL_INTERCEPT) {
            let intercepted = match next.map(|leg| &leg.via) {
                Some(Via::Radial { radial, .. }) => radial_crossed(radial, traversal.origin, position),
                Some(Via::Arc(arc)) => {
                    (bearing_distance(arc.center.latlon, position).distance - arc.radius).abs() <= ARC_TOLERANCE_NM
                }
                _ => return Err(missing(self, "a course to intercept")),
            };
            if !intercepted {
                return Ok(false);
            }
        }
        if termination.contains(Termination::UNTIL_RADIAL) {
            let radial = match &self.endpoint {
                Endpoint::Radial(radial) => radial,
                _ => return Err(missing(self, "a radial")),
            };
            if !radial_crossed(radial, traversal.origin, position) {
                return Ok(false);
            }
        }
        if termination.contains(Termination::FOR_DISTANCE) {
            let done = match &self.endpoint {
                Endpoint::Fix(fix) => fix_crossed(fix.latlon, state),
                Endpoint::Distance { point, nm } => bearing_distance(point.latlon, position).distance >= *nm,
                _ => return Err(missing(self, "a distance")),
            };
            if !done {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
