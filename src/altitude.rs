//! Vertical quantities and the altitude/speed restrictions attached to legs.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};

/// Height above mean sea level, or height above ground optionally anchored
/// to a known ground elevation.
#[derive(Clone, Copy, Debug)]
pub enum Altitude {
    Msl(i32),
    Agl { feet: i32, ground: Option<i32> },
}

impl Altitude {
    pub fn msl(feet: i32) -> Self {
        Altitude::Msl(feet)
    }

    pub fn flight_level(level: u32) -> Self {
        Altitude::Msl(level as i32 * 100)
    }

    pub fn agl(feet: i32, ground: Option<i32>) -> Self {
        Altitude::Agl { feet, ground }
    }

    /// The surface, with no elevation known.
    pub fn surface() -> Self {
        Altitude::Agl {
            feet: 0,
            ground: None,
        }
    }

    pub fn is_surface(&self) -> bool {
        match self {
            Altitude::Agl { feet: 0, .. } => true,
            _ => false,
        }
    }

    /// Feet in the altitude's own frame.
    pub fn feet(&self) -> i32 {
        match *self {
            Altitude::Msl(feet) => feet,
            Altitude::Agl { feet, .. } => feet,
        }
    }

    /// Anchor an AGL altitude to a ground elevation. MSL values are unchanged.
    pub fn anchored(self, elevation: i32) -> Self {
        match self {
            Altitude::Agl { feet, .. } => Altitude::Agl {
                feet,
                ground: Some(elevation),
            },
            msl => msl,
        }
    }

    pub fn msl_feet(&self) -> Result<i32> {
        match *self {
            Altitude::Msl(feet) => Ok(feet),
            Altitude::Agl {
                feet,
                ground: Some(ground),
            } => Ok(feet + ground),
            Altitude::Agl { ground: None, .. } => Err(Error::Unanchored),
        }
    }

    pub fn to_msl(&self) -> Result<Altitude> {
        self.msl_feet().map(Altitude::Msl)
    }

    /// Ordering that reports mixing an unanchored AGL value with anything
    /// else as an error instead of `None`.
    pub fn compare(&self, other: &Altitude) -> Result<Ordering> {
        self.partial_cmp(other).ok_or(Error::Unanchored)
    }

    /// Parse a five-character CIFP altitude field: `05000`, `FL180`, `GND  `.
    /// `UNLTD`, `NOTSP` and blanks are `None`. `agl` selects the frame for
    /// plain numbers.
    pub fn from_cifp(raw: &str, agl: bool) -> std::result::Result<Option<Altitude>, String> {
        let raw = raw.trim();
        match raw {
            "" | "UNLTD" | "NOTSP" => Ok(None),
            "GND" | "SFC" => Ok(Some(Altitude::surface())),
            _ if raw.starts_with("FL") => raw[2..]
                .parse()
                .map(|fl| Some(Altitude::flight_level(fl)))
                .map_err(|_| format!("bad flight level {:?}", raw)),
            _ => {
                let feet = raw
                    .parse()
                    .map_err(|_| format!("bad altitude {:?}", raw))?;
                if agl {
                    Ok(Some(Altitude::agl(feet, None)))
                } else {
                    Ok(Some(Altitude::msl(feet)))
                }
            }
        }
    }
}

impl PartialEq for Altitude {
    fn eq(&self, other: &Altitude) -> bool {
        match (self.msl_feet(), other.msl_feet()) {
            (Ok(a), Ok(b)) => a == b,
            // unanchored AGL values only ever equal each other
            (Err(_), Err(_)) => self.feet() == other.feet(),
            _ => false,
        }
    }
}

impl PartialOrd for Altitude {
    fn partial_cmp(&self, other: &Altitude) -> Option<Ordering> {
        match (self.msl_feet(), other.msl_feet()) {
            (Ok(a), Ok(b)) => Some(a.cmp(&b)),
            (Err(_), Err(_)) => Some(self.feet().cmp(&other.feet())),
            _ => None,
        }
    }
}

impl fmt::Display for Altitude {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Altitude::Msl(feet) if feet >= 18_000 && feet % 100 == 0 => write!(f, "FL{:03}", feet / 100),
            Altitude::Msl(feet) => write!(f, "{}ft", feet),
            Altitude::Agl { feet, ground: None } => write!(f, "SFC+{}", feet),
            Altitude::Agl { feet, .. } => write!(f, "{}ft AGL", feet),
        }
    }
}

/// Effective kind of a canonical altitude restriction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestrictionKind {
    AtOrAbove,
    AtOrBelow,
    At,
    Between,
}

/// Minimum and/or maximum altitude. The default is unrestricted.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AltitudeRestriction {
    pub min: Option<Altitude>,
    pub max: Option<Altitude>,
}

impl AltitudeRestriction {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// `Between` takes exactly two altitudes, every other kind exactly one.
    pub fn new(kind: RestrictionKind, altitudes: &[Altitude]) -> Result<Self> {
        match (kind, altitudes) {
            (RestrictionKind::Between, &[a, b]) => {
                let (lo, hi) = if a.compare(&b)? == Ordering::Greater {
                    (b, a)
                } else {
                    (a, b)
                };
                Ok(AltitudeRestriction {
                    min: Some(lo),
                    max: Some(hi),
                })
            }
            (RestrictionKind::AtOrAbove, &[a]) => Ok(AltitudeRestriction {
                min: Some(a),
                max: None,
            }),
            (RestrictionKind::AtOrBelow, &[a]) => Ok(AltitudeRestriction {
                min: None,
                max: Some(a),
            }),
            (RestrictionKind::At, &[a]) => Ok(AltitudeRestriction {
                min: Some(a),
                max: Some(a),
            }),
            (kind, alts) => Err(Error::structural(format!(
                "{:?} restriction with {} altitudes",
                kind,
                alts.len()
            ))),
        }
    }

    /// Canonicalise a CIFP altitude description code and its two altitude
    /// fields.
    pub fn from_cifp(code: char, first: Option<Altitude>, second: Option<Altitude>) -> Result<Self> {
        let (mut code, mut second) = (code, second);

        match code {
            // glide slope or intercept altitude in the second field, flown "at"
            'G' | 'I' | 'X' => {
                code = '@';
                second = None;
            }
            'H' | 'J' | 'V' => {
                code = '+';
                second = None;
            }
            'Y' => {
                code = '-';
                second = None;
            }
            // "at or above the second altitude", a typo for '+' when that is blank
            'C' => {
                code = '+';
                if second.is_some() {
                    return Self::from_cifp(code, second, None);
                }
            }
            _ => {}
        }

        let first = match first {
            Some(a) => a,
            None if second.is_none() => return Ok(Self::unrestricted()),
            None => return Err(Error::structural("second altitude without a first")),
        };

        if code != 'B' && second == Some(first) {
            second = None;
        }

        match (code, second) {
            (' ', None) | ('@', None) => Self::new(RestrictionKind::At, &[first]),
            ('+', None) => Self::new(RestrictionKind::AtOrAbove, &[first]),
            ('+', Some(b)) => {
                if first.compare(&b)? == Ordering::Less {
                    Self::new(RestrictionKind::Between, &[first, b])
                } else {
                    Self::new(RestrictionKind::AtOrAbove, &[first])
                }
            }
            ('-', None) => Self::new(RestrictionKind::AtOrBelow, &[first]),
            ('-', Some(b)) => {
                if b.compare(&first)? == Ordering::Greater {
                    Self::new(RestrictionKind::Between, &[first, b])
                } else {
                    Self::new(RestrictionKind::AtOrBelow, &[first])
                }
            }
            ('B', Some(b)) => Self::new(RestrictionKind::Between, &[first, b]),
            ('B', None) => Err(Error::structural("between restriction needs two altitudes")),
            (code, Some(_)) if code == ' ' || code == '@' => {
                Err(Error::structural("\"at\" restriction with two altitudes"))
            }
            (code, _) => Err(Error::structural(format!("unknown altitude description {:?}", code))),
        }
    }

    /// The description code and altitude fields that reproduce this
    /// restriction through [`AltitudeRestriction::from_cifp`].
    pub fn to_cifp(&self) -> (char, Option<Altitude>, Option<Altitude>) {
        match self.kind() {
            None => (' ', None, None),
            Some(RestrictionKind::AtOrAbove) => ('+', self.min, None),
            Some(RestrictionKind::AtOrBelow) => ('-', self.max, None),
            Some(RestrictionKind::At) => ('@', self.min, None),
            Some(RestrictionKind::Between) => ('B', self.max, self.min),
        }
    }

    pub fn kind(&self) -> Option<RestrictionKind> {
        match (self.min, self.max) {
            (None, None) => None,
            (Some(_), None) => Some(RestrictionKind::AtOrAbove),
            (None, Some(_)) => Some(RestrictionKind::AtOrBelow),
            (Some(lo), Some(hi)) if lo == hi => Some(RestrictionKind::At),
            (Some(_), Some(_)) => Some(RestrictionKind::Between),
        }
    }

    pub fn altitudes(&self) -> Vec<Altitude> {
        match self.kind() {
            None => vec![],
            Some(RestrictionKind::At) | Some(RestrictionKind::AtOrAbove) => self.min.into_iter().collect(),
            Some(RestrictionKind::AtOrBelow) => self.max.into_iter().collect(),
            Some(RestrictionKind::Between) => self.min.into_iter().chain(self.max).collect(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn is_in_range(&self, altitude: Altitude) -> Result<bool> {
        if let Some(min) = self.min {
            if altitude.compare(&min)? == Ordering::Less {
                return Ok(false);
            }
        }
        if let Some(max) = self.max {
            if altitude.compare(&max)? == Ordering::Greater {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Display for AltitudeRestriction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.kind(), self.min, self.max) {
            (Some(RestrictionKind::At), Some(a), _) => write!(f, "@{}", a),
            (Some(RestrictionKind::AtOrAbove), Some(a), _) => write!(f, "+{}", a),
            (Some(RestrictionKind::AtOrBelow), _, Some(a)) => write!(f, "-{}", a),
            (Some(RestrictionKind::Between), Some(lo), Some(hi)) => write!(f, "{}..{}", lo, hi),
            _ => Ok(()),
        }
    }
}

/// Speed restriction in knots. The default is unrestricted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpeedRestriction {
    pub min: Option<u16>,
    pub max: Option<u16>,
}

impl SpeedRestriction {
    /// Speed limit description: `+` at or above, `@` at, `-` or blank at or below.
    pub fn from_cifp(code: char, knots: Option<u16>) -> Result<Self> {
        let knots = match knots {
            Some(k) => k,
            None => return Ok(Self::default()),
        };
        match code {
            '+' => Ok(SpeedRestriction {
                min: Some(knots),
                max: None,
            }),
            '@' => Ok(SpeedRestriction {
                min: Some(knots),
                max: Some(knots),
            }),
            '-' | ' ' => Ok(SpeedRestriction {
                min: None,
                max: Some(knots),
            }),
            _ => Err(Error::structural(format!("unknown speed description {:?}", code))),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn is_in_range(&self, knots: u16) -> bool {
        self.min.map_or(true, |min| knots >= min) && self.max.map_or(true, |max| knots <= max)
    }
}

impl fmt::Display for SpeedRestriction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) if lo == hi => write!(f, "@{}kt", lo),
            (Some(lo), Some(hi)) => write!(f, "{}..{}kt", lo, hi),
            (Some(lo), None) => write!(f, "+{}kt", lo),
            (None, Some(hi)) => write!(f, "-{}kt", hi),
            (None, None) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn ft(feet: i32) -> Option<Altitude> {
        Some(Altitude::msl(feet))
    }

    #[rstest]
    #[case("05000", false, ft(5000))]
    #[case("FL180", false, ft(18000))]
    #[case("UNLTD", false, None)]
    #[case("NOTSP", false, None)]
    #[case("     ", false, None)]
    #[case("GND  ", false, Some(Altitude::surface()))]
    #[case("01200", true, Some(Altitude::agl(1200, None)))]
    fn test_from_cifp(#[case] raw: &str, #[case] agl: bool, #[case] out: Option<Altitude>) {
        assert_eq!(out, Altitude::from_cifp(raw, agl).unwrap());
    }

    #[test]
    fn test_from_cifp_bad() {
        assert!(Altitude::from_cifp("FLXXX", false).is_err());
        assert!(Altitude::from_cifp("5O00", false).is_err());
    }

    #[test]
    fn test_unanchored_agl() {
        let agl = Altitude::agl(700, None);
        assert!(agl.to_msl().is_err());
        assert!(agl.partial_cmp(&Altitude::msl(700)).is_none());
        assert_ne!(agl, Altitude::msl(700));
        assert_eq!(agl, Altitude::agl(700, None));
        assert_ne!(agl, Altitude::agl(800, None));
        assert_eq!("SFC+700", agl.to_string());
    }

    #[test]
    fn test_anchored_agl() {
        let agl = Altitude::agl(1200, None).anchored(500);
        assert_eq!(Altitude::msl(1700), agl.to_msl().unwrap());
        assert_eq!(agl, Altitude::msl(1700));
        assert!(agl < Altitude::msl(2000));
    }

    #[test]
    fn test_display() {
        assert_eq!("FL180", Altitude::flight_level(180).to_string());
        assert_eq!("3000ft", Altitude::msl(3000).to_string());
    }

    #[rstest]
    #[case('+', ft(3000), None, ft(3000), None)]
    #[case('-', ft(5000), None, None, ft(5000))]
    #[case('@', ft(4000), None, ft(4000), ft(4000))]
    #[case(' ', ft(4000), None, ft(4000), ft(4000))]
    #[case('@', ft(4000), ft(4000), ft(4000), ft(4000))]
    #[case('B', ft(9000), ft(7000), ft(7000), ft(9000))]
    #[case('+', ft(7000), ft(9000), ft(7000), ft(9000))]
    #[case('+', ft(9000), ft(7000), ft(9000), None)]
    #[case('-', ft(7000), ft(9000), ft(7000), ft(9000))]
    #[case('-', ft(9000), ft(7000), None, ft(9000))]
    #[case('G', ft(1800), ft(1800), ft(1800), ft(1800))]
    #[case('I', ft(2000), ft(1600), ft(2000), ft(2000))]
    #[case('J', ft(2000), ft(1600), ft(2000), None)]
    #[case('H', ft(2000), ft(1600), ft(2000), None)]
    #[case('C', ft(6000), None, ft(6000), None)]
    #[case('C', ft(6000), ft(8000), ft(8000), None)]
    #[case(' ', None, None, None, None)]
    fn test_restriction_canonical(
        #[case] code: char,
        #[case] first: Option<Altitude>,
        #[case] second: Option<Altitude>,
        #[case] min: Option<Altitude>,
        #[case] max: Option<Altitude>,
    ) {
        let r = AltitudeRestriction::from_cifp(code, first, second).unwrap();
        assert_eq!(AltitudeRestriction { min, max }, r);
    }

    #[rstest]
    #[case('B', ft(9000), None)]
    #[case('@', ft(4000), ft(5000))]
    #[case('Q', ft(4000), None)]
    fn test_restriction_bad(#[case] code: char, #[case] first: Option<Altitude>, #[case] second: Option<Altitude>) {
        assert!(AltitudeRestriction::from_cifp(code, first, second).is_err());
    }

    #[test]
    fn test_restriction_new_arity() {
        let a = Altitude::msl(3000);
        assert!(AltitudeRestriction::new(RestrictionKind::Between, &[a]).is_err());
        assert!(AltitudeRestriction::new(RestrictionKind::At, &[a, a]).is_err());
        assert!(AltitudeRestriction::new(RestrictionKind::AtOrAbove, &[]).is_err());
    }

    #[test]
    fn test_restriction_in_range() {
        let r = AltitudeRestriction::from_cifp('+', ft(3000), None).unwrap();
        assert!(r.is_in_range(Altitude::msl(3500)).unwrap());
        assert!(!r.is_in_range(Altitude::msl(2000)).unwrap());
        assert!(r.is_in_range(Altitude::agl(100, None)).is_err());
        assert!(AltitudeRestriction::unrestricted()
            .is_in_range(Altitude::agl(100, None))
            .unwrap());
    }

    #[rstest]
    #[case('+', Some(210), Some(210), None)]
    #[case('-', Some(250), None, Some(250))]
    #[case(' ', Some(250), None, Some(250))]
    #[case('@', Some(230), Some(230), Some(230))]
    #[case(' ', None, None, None)]
    fn test_speed(#[case] code: char, #[case] knots: Option<u16>, #[case] min: Option<u16>, #[case] max: Option<u16>) {
        assert_eq!(SpeedRestriction { min, max }, SpeedRestriction::from_cifp(code, knots).unwrap());
    }

    fn code() -> impl Strategy<Value = char> {
        prop::sample::select(vec![' ', '@', '+', '-', 'B', 'C', 'G', 'H', 'I', 'J', 'V', 'X', 'Y'])
    }

    proptest! {
        #[test]
        fn test_msl_ordering(a in -1000i32..60000, b in -1000i32..60000) {
            let (x, y) = (Altitude::msl(a), Altitude::msl(b));
            prop_assert_eq!(x < y, a < b);
            prop_assert_eq!(x == y, a == b);
        }

        #[test]
        fn test_agl_anchor(feet in 0i32..20000, ground in -200i32..14000) {
            let alt = Altitude::agl(feet, Some(ground));
            prop_assert_eq!(alt.to_msl().unwrap().feet(), feet + ground);
            prop_assert!(Altitude::agl(feet, None).to_msl().is_err());
        }

        #[test]
        fn test_canonical_idempotent(c in code(), a in 0i32..300, b in proptest::option::of(0i32..300)) {
            let first = Some(Altitude::msl(a * 100));
            let second = b.map(|b| Altitude::msl(b * 100));
            if let Ok(r) = AltitudeRestriction::from_cifp(c, first, second) {
                let (code, first, second) = r.to_cifp();
                prop_assert_eq!(r, AltitudeRestriction::from_cifp(code, first, second).unwrap());
                prop_assert_eq!(r, AltitudeRestriction::new(r.kind().unwrap(), &r.altitudes()).unwrap());
            }
        }
    }
}
