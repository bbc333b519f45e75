use super::resolve::{Context, Tables};
use super::types::{MsaRecord, MsaSector};
use crate::altitude::Altitude;
use crate::error::Result;
use crate::geo::{LatLon, NamedLatLon};
use crate::geodesy::{bearing_distance, normalize};

/// Minimum sector altitudes around one center fix.
#[derive(Clone, Debug, PartialEq)]
pub struct Msa {
    pub airport: String,
    pub center: NamedLatLon,
    pub sectors: Vec<MsaSector>,
    /// Added to a true bearing to get the published bearing.
    pub variation: f64,
}

impl Msa {
    pub fn build(tables: &Tables, record: &MsaRecord) -> Result<Msa> {
        let near = tables
            .aerodrome(&record.airport)
            .map_or(Context::None, |a| Context::Point(a.latlon));
        let center = tables.concretize(&record.center, near)?;
        let variation = if record.magnetic {
            match center.variation {
                Some(v) => -v,
                None => -tables.local_variation(center.latlon, &record.airport)?,
            }
        } else {
            0.0
        };

        Ok(Msa {
            airport: record.airport.clone(),
            center: center.named(),
            sectors: record.sectors.clone(),
            variation,
        })
    }

    /// The sector covering `position`. Sector bearings are measured toward
    /// the center and run clockwise from `from_bearing` to `to_bearing`.
    pub fn sector(&self, position: LatLon) -> Option<&MsaSector> {
        let bd = bearing_distance(position, self.center.latlon);
        let bearing = normalize(bd.bearing? + self.variation);
        self.sectors.iter().find(|s| {
            let width = match normalize(s.to_bearing - s.from_bearing) {
                w if w == 0.0 => 360.0,
                w => w,
            };
            bd.distance <= s.radius && normalize(bearing - s.from_bearing) < width
        })
    }

    pub fn altitude(&self, position: LatLon) -> Option<Altitude> {
        self.sector(position).map(|s| s.altitude)
    }
}
