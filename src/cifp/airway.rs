use super::resolve::{Context, Tables};
use super::types::AirwayFixRecord;
use crate::altitude::Altitude;
use crate::error::{Error, Result};
use crate::geo::NamedLatLon;

#[derive(Clone, Debug, PartialEq)]
pub struct AirwayFix {
    pub fix: NamedLatLon,
    pub min_altitude: Option<Altitude>,
    pub max_altitude: Option<Altitude>,
}

/// One continuous run of an airway.
#[derive(Clone, Debug, PartialEq)]
pub struct Airway {
    pub name: String,
    fixes: Vec<AirwayFix>,
}

impl Airway {
    /// Resolve a run of airway lines. The first fix is placed near the
    /// second, every later one near its predecessor.
    pub fn build(tables: &Tables, records: &[AirwayFixRecord]) -> Result<Airway> {
        let first = records
            .first()
            .ok_or_else(|| Error::structural("airway without fixes"))?;

        let mut fixes: Vec<AirwayFix> = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if record.airway != first.airway {
                return Err(Error::structural(format!(
                    "airway {} continues as {}",
                    first.airway, record.airway
                )));
            }
            let context = match fixes.last() {
                Some(prev) => Context::Point(prev.fix.latlon),
                None => records
                    .get(i + 1)
                    .map_or(Context::None, |next| Context::Ident(&next.fix.ident)),
            };
            fixes.push(AirwayFix {
                fix: tables.concretize(&record.fix, context)?.named(),
                min_altitude: record.min_altitude,
                max_altitude: record.max_altitude,
            });
        }

        Ok(Airway {
            name: first.airway.clone(),
            fixes,
        })
    }

    pub fn fixes(&self) -> &[AirwayFix] {
        &self.fixes
    }

    fn position(&self, ident: &str) -> Result<usize> {
        self.fixes
            .iter()
            .position(|f| f.fix.name == ident)
            .ok_or_else(|| Error::NotFound {
                ident: format!("{} on {}", ident, self.name),
            })
    }

    /// Fixes from `from` to `to` inclusive, in flying order.
    pub fn between(&self, from: &str, to: &str) -> Result<Vec<&AirwayFix>> {
        let (a, b) = (self.position(from)?, self.position(to)?);
        if a <= b {
            Ok(self.fixes[a..=b].iter().collect())
        } else {
            Ok(self.fixes[b..=a].iter().rev().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cifp::types::{UnresolvedFix, WaypointRecord};
    use crate::geo::LatLon;

    fn tables() -> Tables {
        let mut t = Tables::new();
        let points = [
            ("ONE", 30.0, -90.0),
            ("TWO", 30.5, -90.0),
            ("THREE", 31.0, -90.0),
            ("FOUR", 31.5, -90.0),
            // namesake on the far side of the country
            ("ONE", 45.0, -120.0),
        ];
        for &(ident, lat, lon) in points.iter() {
            t.add_waypoint(WaypointRecord {
                ident: ident.to_owned(),
                region: "K1".to_owned(),
                airport: None,
                latlon: LatLon::new(lat, lon),
                variation: None,
                name: String::new(),
            });
        }
        t
    }

    fn run(idents: &[&str]) -> Vec<AirwayFixRecord> {
        idents
            .iter()
            .enumerate()
            .map(|(i, ident)| AirwayFixRecord {
                airway: "V1".to_owned(),
                sequence: (i as u32 + 1) * 10,
                fix: UnresolvedFix::new(*ident, None),
                end: i + 1 == idents.len(),
                min_altitude: Some(Altitude::msl(3000)),
                max_altitude: None,
            })
            .collect()
    }

    #[test]
    fn test_build_resolves_first_fix_by_neighbour() {
        let airway = Airway::build(&tables(), &run(&["ONE", "TWO", "THREE", "FOUR"])).unwrap();
        assert_eq!(4, airway.fixes().len());
        assert_eq!(LatLon::new(30.0, -90.0), airway.fixes()[0].fix.latlon);
    }

    #[test]
    fn test_between_both_directions() {
        let airway = Airway::build(&tables(), &run(&["ONE", "TWO", "THREE", "FOUR"])).unwrap();
        let names = |fixes: Vec<&AirwayFix>| fixes.iter().map(|f| f.fix.name.clone()).collect::<Vec<_>>();
        assert_eq!(vec!["TWO", "THREE", "FOUR"], names(airway.between("TWO", "FOUR").unwrap()));
        assert_eq!(vec!["THREE", "TWO", "ONE"], names(airway.between("THREE", "ONE").unwrap()));
        assert_eq!(vec!["TWO"], names(airway.between("TWO", "TWO").unwrap()));
        assert!(airway.between("ONE", "NINE").is_err());
    }

    #[test]
    fn test_single_ambiguous_fix() {
        match Airway::build(&tables(), &run(&["ONE"])) {
            Err(Error::Ambiguous { ident }) => assert_eq!("ONE", ident),
            other => panic!("unexpected {:?}", other),
        }
    }
}
