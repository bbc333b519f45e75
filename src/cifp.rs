//! The whole feed: decoded, cross-referenced and assembled.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::mem;
use std::path::Path;

use log::{debug, info, warn};

pub mod airway;
pub mod decode;
pub mod msa;
pub mod procedure;
pub mod resolve;
pub mod types;

use self::airway::Airway;
use self::msa::Msa;
use self::procedure::Procedure;
use self::resolve::{Fix, Tables};
use self::types::*;
use crate::airspace::Airspace;
use crate::altitude::Altitude;
use crate::error::{Error, Result};
use crate::geo::LatLon;
use crate::geodesy::great_circle_distance;
use crate::txt_data::DataFile;
use crate::zip_util::open_cifp;

/// What to do with a record or entity that fails to decode or build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestPolicy {
    Abort,
    SkipAndLog,
}

impl IngestPolicy {
    fn tolerate(self, error: Error, what: &dyn Display) -> Result<()> {
        match self {
            IngestPolicy::Abort => Err(error),
            IngestPolicy::SkipAndLog => {
                warn!("skipping {}: {}", what, error);
                Ok(())
            }
        }
    }
}

/// Consecutive records that belong to one entity.
struct Runs<T> {
    done: Vec<Vec<T>>,
    current: Vec<T>,
}

impl<T> Runs<T> {
    fn new() -> Self {
        Runs {
            done: Vec::new(),
            current: Vec::new(),
        }
    }

    fn push<F>(&mut self, record: T, continues: F)
    where
        F: Fn(&T, &T) -> bool,
    {
        if let Some(last) = self.current.last() {
            if !continues(last, &record) {
                self.close();
            }
        }
        self.current.push(record);
    }

    fn close(&mut self) {
        if !self.current.is_empty() {
            self.done.push(mem::replace(&mut self.current, Vec::new()));
        }
    }

    fn finish(mut self) -> Vec<Vec<T>> {
        self.close();
        self.done
    }
}

#[derive(Debug, Default)]
pub struct Cifp {
    tables: Tables,
    procedures: HashMap<String, Vec<Procedure>>,
    airways: HashMap<String, Vec<Airway>>,
    airspaces: Vec<Airspace>,
    msas: HashMap<String, Vec<Msa>>,
}

impl Cifp {
    /// Load a CIFP text file or the zip it is distributed in.
    pub fn from_path<P: AsRef<Path>>(path: P, policy: IngestPolicy) -> Result<Cifp> {
        let data = open_cifp(path)?;
        Self::from_data(&data, policy)
    }

    pub fn from_data(data: &DataFile, policy: IngestPolicy) -> Result<Cifp> {
        let mut tables = Tables::new();
        let mut legs = Runs::new();
        let mut airways = Runs::new();
        let mut airspaces = Runs::new();
        let mut msas = Vec::new();
        let mut poisoned = HashSet::new();
        let mut skipped = 0;

        for line in data.lines() {
            let record = match decode::decode(&line) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    policy.tolerate(e, &"record")?;
                    skipped += 1;
                    // the entity the line belonged to goes with it
                    if let Some(key) = decode::entity_key(&line) {
                        poisoned.insert(key);
                    }
                    continue;
                }
            };

            match record {
                Record::Navaid(n) => tables.add_navaid(n),
                Record::Waypoint(w) => tables.add_waypoint(w),
                Record::Airport(a) => tables.add_airport(a),
                Record::Runway(r) => tables.add_runway(r),
                Record::Leg(l) => legs.push(l, |a: &LegRecord, b| a.procedure_key() == b.procedure_key()),
                Record::AirwayFix(f) => {
                    let end = f.end;
                    airways.push(f, |a: &AirwayFixRecord, b| {
                        a.airway == b.airway && a.sequence < b.sequence
                    });
                    if end {
                        airways.close();
                    }
                }
                Record::Airspace(a) => {
                    let end = a.segment.end_of_loop;
                    airspaces.push(a, |a: &AirspaceRecord, b| {
                        a.group_key() == b.group_key() && a.sequence < b.sequence
                    });
                    if end {
                        airspaces.close();
                    }
                }
                Record::Msa(m) => msas.push(m),
            }
        }

        let mut cifp = Cifp {
            tables,
            ..Cifp::default()
        };

        let incomplete = |key: EntityKey| {
            let bad = poisoned.contains(&key);
            if bad {
                warn!("dropping {}: one of its records was skipped", key);
            }
            bad
        };

        for run in legs.finish() {
            if incomplete(run[0].entity_key()) {
                continue;
            }
            match Procedure::assemble(&cifp.tables, &run) {
                Ok(p) => cifp.procedures.entry(p.name.clone()).or_default().push(p),
                Err(e) => {
                    let first = &run[0];
                    policy.tolerate(e, &format!("{:?} {} at {}", first.kind, first.procedure, first.airport))?;
                    skipped += 1;
                }
            }
        }

        for run in airways.finish() {
            if incomplete(run[0].entity_key()) {
                continue;
            }
            match Airway::build(&cifp.tables, &run) {
                Ok(a) => cifp.airways.entry(a.name.clone()).or_default().push(a),
                Err(e) => {
                    policy.tolerate(e, &format!("airway {}", run[0].airway))?;
                    skipped += 1;
                }
            }
        }

        for run in airspaces.finish() {
            if incomplete(run[0].entity_key()) {
                continue;
            }
            let first = &run[0];
            let ground = match first.kind {
                AirspaceKind::Controlled(_) => cifp.tables.aerodrome(&first.designator).map(|a| a.elevation),
                AirspaceKind::Restrictive(_) => None,
            };
            match Airspace::build(&run, ground) {
                Ok(a) => cifp.airspaces.push(a),
                Err(e) => {
                    policy.tolerate(e, &format!("airspace {}", first.designator))?;
                    skipped += 1;
                }
            }
        }

        for record in msas {
            match Msa::build(&cifp.tables, &record) {
                Ok(m) => cifp.msas.entry(m.airport.clone()).or_default().push(m),
                Err(e) => {
                    policy.tolerate(e, &format!("MSA at {}", record.airport))?;
                    skipped += 1;
                }
            }
        }

        let (fixes, navaids, aerodromes, runways) = cifp.tables.counts();
        info!(
            "loaded {} fixes, {} navaids, {} aerodromes, {} runways",
            fixes, navaids, aerodromes, runways
        );
        info!(
            "assembled {} procedures, {} airways, {} airspaces, {} MSAs",
            cifp.procedures.values().map(Vec::len).sum::<usize>(),
            cifp.airways.values().map(Vec::len).sum::<usize>(),
            cifp.airspaces.len(),
            cifp.msas.values().map(Vec::len).sum::<usize>()
        );
        if skipped > 0 {
            warn!("{} records or entities skipped", skipped);
        }

        Ok(cifp)
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn fixes(&self, ident: &str) -> &[Fix] {
        self.tables.fixes(ident)
    }

    pub fn navaids(&self, ident: &str) -> &[NavaidRecord] {
        self.tables.navaids(ident)
    }

    pub fn aerodrome(&self, ident: &str) -> Option<&AirportRecord> {
        self.tables.aerodrome(ident)
    }

    pub fn runways(&self, airport: &str) -> &[RunwayRecord] {
        self.tables.runways(airport)
    }

    /// Every procedure with this name, across airports.
    pub fn procedures(&self, name: &str) -> &[Procedure] {
        self.procedures.get(name).map_or(&[][..], Vec::as_slice)
    }

    pub fn procedures_at<'a>(&'a self, airport: &'a str) -> impl Iterator<Item = &'a Procedure> + 'a {
        self.procedures
            .values()
            .flatten()
            .filter(move |p| p.airport == airport)
    }

    pub fn procedure(&self, name: &str, airport: &str) -> Result<&Procedure> {
        self.procedures(name)
            .iter()
            .find(|p| p.airport == airport)
            .ok_or_else(|| Error::NotFound {
                ident: format!("{} at {}", name, airport),
            })
    }

    /// The procedure called `name` whose airport is closest to `position`.
    pub fn nearest_procedure(&self, name: &str, position: LatLon) -> Result<&Procedure> {
        self.procedures(name)
            .iter()
            .map(|p| {
                let distance = self
                    .aerodrome(&p.airport)
                    .map_or(std::f64::INFINITY, |a| great_circle_distance(a.latlon, position));
                (distance, p)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, p)| p)
            .ok_or_else(|| Error::NotFound {
                ident: name.to_owned(),
            })
    }

    pub fn airways(&self, name: &str) -> &[Airway] {
        self.airways.get(name).map_or(&[][..], Vec::as_slice)
    }

    pub fn msa(&self, airport: &str) -> &[Msa] {
        self.msas.get(airport).map_or(&[][..], Vec::as_slice)
    }

    pub fn airspaces(&self) -> &[Airspace] {
        &self.airspaces
    }

    /// Airspaces around `point` at `altitude`. Airspaces whose limits
    /// cannot be compared with `altitude` are left out.
    pub fn airspaces_containing(&self, point: LatLon, altitude: Altitude) -> Vec<&Airspace> {
        self.airspaces
            .iter()
            .filter(|a| match a.contains(point, altitude) {
                Ok(inside) => inside,
                Err(e) => {
                    debug!("{} {}: {}", a.designator, a.name, e);
                    false
                }
            })
            .collect()
    }
}
