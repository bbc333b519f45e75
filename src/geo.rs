use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLon(f64, f64);

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        LatLon(lat, lon)
    }

    pub fn lat(self) -> f64 {
        self.0
    }

    pub fn lon(self) -> f64 {
        self.1
    }

    //Ex: N40382927 W073464729
    pub fn from_cifp(lat: &str, lon: &str) -> Option<Self> {
        fn to_dd(d: f64, m: f64, s: f64) -> f64 {
            d + m / 60.0 + s / 3600.0
        }

        lazy_static! {
            static ref LAT_REGEX: Regex = Regex::new(r"^([NS])(\d{2})(\d{2})(\d{4})$").unwrap();
            static ref LON_REGEX: Regex = Regex::new(r"^([EW])(\d{3})(\d{2})(\d{4})$").unwrap();
        }

        fn convert(re: &Regex, raw: &str) -> Option<f64> {
            let cap = re.captures(raw.trim())?;
            let (dir, d, m, s) = (&cap[1], &cap[2], &cap[3], &cap[4]);
            let (d, m) = (d.parse().ok()?, m.parse().ok()?);
            // seconds carry two implied decimals
            let s = s.parse::<f64>().ok()? / 100.0;
            let mut dd = to_dd(d, m, s);
            if dir == "S" || dir == "W" {
                dd = -dd;
            }
            Some(dd)
        }

        match (convert(&LAT_REGEX, lat), convert(&LON_REGEX, lon)) {
            (Some(lat), Some(lon)) => Some(LatLon(lat, lon)),
            _ => None,
        }
    }

    /// Degrees/minutes/seconds rendering, `N040.38.29.270 W073.46.47.290`.
    pub fn to_dms(self) -> String {
        fn to_dms(dd: f64) -> (i32, i32, f64) {
            let d = dd.trunc() as i32;
            let m = (dd.abs() * 60.0).trunc() as i32 % 60;
            let s = (dd.abs() * 3600.0) % 60.0;
            (d, m, s)
        }

        let mut tmp = String::new();
        tmp += if self.0.is_sign_negative() { "S" } else { "N" };
        let (d, m, s) = to_dms(self.0);
        tmp += &format!("{:03}.{:02}.{:06.03}", d.abs(), m, s);

        tmp += " ";

        tmp += if self.1.is_sign_negative() { "W" } else { "E" };
        let (d, m, s) = to_dms(self.1);
        tmp += &format!("{:03}.{:02}.{:06.03}", d.abs(), m, s);
        tmp
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_dms())
    }
}

/// A position that denotes a specific fix, navaid or runway end.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedLatLon {
    pub name: String,
    pub latlon: LatLon,
}

impl NamedLatLon {
    pub fn new<S: Into<String>>(name: S, latlon: LatLon) -> Self {
        NamedLatLon {
            name: name.into(),
            latlon,
        }
    }
}

impl fmt::Display for NamedLatLon {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.latlon)
    }
}

/// Magnetic variation field, east positive: `E0130` is 13.0°E, `W0045` is 4.5°W.
/// `T` marks a true-north referenced facility.
pub fn parse_variation(raw: &str) -> Option<f64> {
    lazy_static! {
        static ref VAR_REGEX: Regex = Regex::new(r"^([EWT])(\d{4})$").unwrap();
    }

    let cap = VAR_REGEX.captures(raw.trim())?;
    let tenths: f64 = cap[2].parse().ok()?;
    match &cap[1] {
        "E" => Some(tenths / 10.0),
        "W" => Some(-tenths / 10.0),
        _ => Some(0.0),
    }
}
