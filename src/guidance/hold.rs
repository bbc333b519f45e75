//! Racetrack holds: entry classification and the lap state machine.

use std::time::Duration;

use log::debug;

use super::{fix_crossed, radial_course, AircraftState, Tick};
use crate::geo::LatLon;
use crate::geodesy::{bearing_distance, great_circle_distance, normalize, reciprocal, signed_diff};
use crate::leg::{HoldLength, Racetrack, Radial, Termination, TurnDirection};

/// Standard rate, degrees per second.
pub const TURN_RATE: f64 = 3.0;

/// Outbound leg of a parallel or teardrop entry.
pub const ENTRY_LEG: Duration = Duration::from_secs(60);

pub const TEARDROP_OFFSET: f64 = 30.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoldEntry {
    Direct,
    Parallel,
    Teardrop,
}

/// Classify the entry from the course flown toward the fix.
pub fn classify(entry_course: f64, inbound_course: f64, turn: TurnDirection) -> HoldEntry {
    let offset = signed_diff(entry_course, inbound_course) * turn.sign();
    if offset > 70.0 {
        HoldEntry::Parallel
    } else if offset < -110.0 {
        HoldEntry::Teardrop
    } else {
        HoldEntry::Direct
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoldPhase {
    Entry,
    Outbound,
    Inbound,
}

impl Default for HoldPhase {
    fn default() -> Self {
        HoldPhase::Entry
    }
}

/// Where and when the aircraft settled on the outbound heading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Abeam {
    pub position: LatLon,
    pub elapsed: Duration,
}

/// Per-traversal hold state. The default is a fresh, unclassified entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HoldState {
    entry: Option<HoldEntry>,
    phase: HoldPhase,
    stable: bool,
    abeam: Option<Abeam>,
    laps: u32,
    inbound_turn: Option<TurnDirection>,
}

impl HoldState {
    pub fn entry(&self) -> Option<HoldEntry> {
        self.entry
    }

    pub fn phase(&self) -> HoldPhase {
        self.phase
    }

    pub fn is_stable(&self) -> bool {
        self.stable
    }

    pub fn abeam(&self) -> Option<Abeam> {
        self.abeam
    }

    pub fn laps(&self) -> u32 {
        self.laps
    }

    pub fn course(&mut self, hold: &Racetrack, state: &AircraftState, tick: Tick) -> f64 {
        let fix = hold.fix.latlon;
        if self.phase == HoldPhase::Entry && self.entry.is_none() {
            let entry = classify(state.course, hold.inbound_course, hold.turn);
            debug!("hold at {}: {:?} entry", hold.fix.name, entry);
            self.entry = Some(entry);
            self.stable = false;
        }

        match self.phase {
            HoldPhase::Entry if fix_crossed(fix, state) => self.begin(HoldPhase::Outbound),
            HoldPhase::Outbound if self.outbound_done(hold, state, tick) => {
                self.inbound_turn = Some(match self.entry {
                    Some(HoldEntry::Parallel) => hold.turn.opposite(),
                    _ => hold.turn,
                });
                self.entry = None;
                self.begin(HoldPhase::Inbound);
            }
            HoldPhase::Inbound if fix_crossed(fix, state) => {
                self.laps += 1;
                debug!("hold at {}: lap {}", hold.fix.name, self.laps);
                self.begin(HoldPhase::Outbound);
            }
            _ => {}
        }

        match self.phase {
            HoldPhase::Entry => bearing_distance(state.position, fix)
                .bearing
                .unwrap_or(state.course),
            HoldPhase::Outbound => {
                let outbound = reciprocal(hold.inbound_course);
                let (target, turn) = match self.entry {
                    Some(HoldEntry::Direct) | None => (outbound, Some(hold.turn)),
                    Some(HoldEntry::Parallel) => (outbound, None),
                    Some(HoldEntry::Teardrop) => (
                        normalize(outbound - TEARDROP_OFFSET * hold.turn.sign()),
                        None,
                    ),
                };
                self.steer(state, target, turn, tick)
            }
            HoldPhase::Inbound => {
                let radial = Radial {
                    station: hold.fix.clone(),
                    bearing: outbound_radial(hold),
                };
                let target = radial_course(&radial, true, state.position);
                self.steer(state, target, self.inbound_turn, tick)
            }
        }
    }

    fn begin(&mut self, phase: HoldPhase) {
        self.phase = phase;
        self.stable = false;
        self.abeam = None;
    }

    fn outbound_done(&self, hold: &Racetrack, state: &AircraftState, tick: Tick) -> bool {
        let abeam = match self.abeam {
            Some(abeam) => abeam,
            None => return false,
        };
        let since = tick.elapsed.checked_sub(abeam.elapsed).unwrap_or_default();
        match (self.entry, hold.length) {
            (Some(HoldEntry::Parallel), _) | (Some(HoldEntry::Teardrop), _) => since >= ENTRY_LEG,
            (_, HoldLength::Time(t)) => since >= t,
            (_, HoldLength::Distance(nm)) => great_circle_distance(abeam.position, state.position) >= nm,
        }
    }

    /// Turn toward `target` at the standard rate until established, then
    /// hold it.
    fn steer(&mut self, state: &AircraftState, target: f64, turn: Option<TurnDirection>, tick: Tick) -> f64 {
        if self.stable {
            return target;
        }
        let step = TURN_RATE * tick.interval.as_secs_f64();
        let diff = signed_diff(target, state.course);
        if diff.abs() <= step {
            self.stable = true;
            if self.phase == HoldPhase::Outbound && self.abeam.is_none() {
                self.abeam = Some(Abeam {
                    position: state.position,
                    elapsed: tick.elapsed,
                });
            }
            return target;
        }
        let sign = turn.map_or(diff.signum(), TurnDirection::sign);
        normalize(state.course + sign * step)
    }

    pub fn is_complete(&self, termination: Termination, altitude_reached: bool) -> bool {
        if termination.contains(Termination::UNTIL_TERMINATED) {
            return false;
        }
        self.laps >= 1 && (!termination.contains(Termination::UNTIL_ALTITUDE) || altitude_reached)
    }
}

fn outbound_radial(hold: &Racetrack) -> f64 {
    reciprocal(hold.inbound_course)
}
