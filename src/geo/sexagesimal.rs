/// Sexagesimal coordinate codec
///
/// Survey records store latitude and longitude as strings such as
/// `40° 30' 15.12345" N`. The map works in signed decimal degrees,
/// so everything that places a marker goes through `decode`, and
/// everything that shows a clicked point goes through `encode`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Number of fractional digits kept in the seconds field
const SECONDS_DECIMALS: usize = 5;

/// 1e-5 arc-seconds per arc-second
const SECONDS_SCALE: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("expected 4 whitespace separated fields, got {0}")]
    FieldCount(usize),

    #[error("field {0:?} does not start with a number")]
    Number(String),

    #[error("expected hemisphere N, S, E or W, got {0:?}")]
    Hemisphere(String),

    #[error("{0:?} is not a finite angle")]
    NotFinite(String),

    #[error("unknown axis {0:?}, expected \"lat\" or \"lng\"")]
    Axis(String),
}

/// Which coordinate a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Lat,
    Lng,
}

impl Axis {
    /// Hemisphere letters for (non-negative, negative) values
    fn hemispheres(self) -> (char, char) {
        match self {
            Axis::Lat => ('N', 'S'),
            Axis::Lng => ('E', 'W'),
        }
    }
}

impl FromStr for Axis {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lat" => Ok(Axis::Lat),
            "lng" => Ok(Axis::Lng),
            other => Err(CoordError::Axis(other.to_string())),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Lat => f.write_str("lat"),
            Axis::Lng => f.write_str("lng"),
        }
    }
}

/// Convert a sexagesimal string into signed decimal degrees.
///
/// The four fields are read by their leading numeric prefix, so the
/// `°`, `'` and `"` suffixes are ignored. The strict pattern is not
/// applied here; see [`is_valid`] for that.
pub fn decode(coordinate: &str) -> Result<f64, CoordError> {
    let fields: Vec<&str> = coordinate.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(CoordError::FieldCount(fields.len()));
    }

    let degrees = leading_number(fields[0])?;
    let minutes = leading_number(fields[1])?;
    let seconds = leading_number(fields[2])?;

    let decimal = degrees + minutes / 60.0 + seconds / 3600.0;
    if !decimal.is_finite() {
        return Err(CoordError::NotFinite(coordinate.to_string()));
    }

    match fields[3] {
        "N" | "E" => Ok(decimal),
        "S" | "W" => Ok(-decimal),
        other => Err(CoordError::Hemisphere(other.to_string())),
    }
}

/// Convert signed decimal degrees into `D° M' S.SSSSS" H`.
///
/// Works on the total number of 1e-5 arc-seconds so the seconds field
/// never rounds up to 60.
pub fn encode(decimal: f64, axis: Axis) -> String {
    let (positive, negative) = axis.hemispheres();
    let hemisphere = if decimal < 0.0 { negative } else { positive };

    let total = (decimal.abs() * 3600.0 * SECONDS_SCALE).round() as u64;
    let scale = SECONDS_SCALE as u64;

    let degrees = total / (3600 * scale);
    let minutes = (total / (60 * scale)) % 60;
    let seconds = (total % (60 * scale)) as f64 / SECONDS_SCALE;

    format!(
        "{degrees}° {minutes}' {seconds:.prec$}\" {hemisphere}",
        prec = SECONDS_DECIMALS
    )
}

/// Strict check against `^-?\d{1,3}°\s\d{1,2}'\s\d{1,2}\.\d{1,5}"\s[NSWE]$`
pub fn is_valid(coordinate: &str) -> bool {
    let mut scan = Scanner::new(coordinate);
    scan.eat('-');
    scan.digits(1, 3)
        && scan.eat('°')
        && scan.space()
        && scan.digits(1, 2)
        && scan.eat('\'')
        && scan.space()
        && scan.digits(1, 2)
        && scan.eat('.')
        && scan.digits(1, 5)
        && scan.eat('"')
        && scan.space()
        && scan.one_of(&['N', 'S', 'W', 'E'])
        && scan.at_end()
}

/// Form check applied before an edit is submitted.
///
/// Both fields are checked against the same pattern, so a latitude
/// ending in `E` or `W` passes.
pub fn validate(latitude: &str, longitude: &str) -> bool {
    is_valid(latitude) && is_valid(longitude)
}

/// Whether the hemisphere letter belongs to `axis`. Not used by the form.
pub fn hemisphere_matches(coordinate: &str, axis: Axis) -> bool {
    let (positive, negative) = axis.hemispheres();
    coordinate
        .trim_end()
        .chars()
        .last()
        .is_some_and(|c| c == positive || c == negative)
}

/// Parse the longest numeric prefix of `field`, like `parseFloat`
fn leading_number(field: &str) -> Result<f64, CoordError> {
    let bytes = field.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start || has_digits {
            has_digits |= frac_end > frac_start;
            end = frac_end;
        }
    }

    if !has_digits {
        return Err(CoordError::Number(field.to_string()));
    }

    field[..end]
        .parse::<f64>()
        .map_err(|_| CoordError::Number(field.to_string()))
}

/// Tiny cursor used by `is_valid`
struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            chars: s.chars().peekable(),
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.chars.next_if_eq(&c).is_some()
    }

    fn space(&mut self) -> bool {
        self.chars.next_if(|c| c.is_whitespace()).is_some()
    }

    fn one_of(&mut self, set: &[char]) -> bool {
        self.chars.next_if(|c| set.contains(c)).is_some()
    }

    fn digits(&mut self, min: usize, max: usize) -> bool {
        let mut count = 0;
        while count < max && self.chars.next_if(char::is_ascii_digit).is_some() {
            count += 1;
        }
        count >= min
    }

    fn at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn decodes_hemisphere_sign() {
        assert_eq!(decode("40° 0' 0.00000\" S").unwrap(), -40.0);
        assert_eq!(decode("40° 0' 0.00000\" N").unwrap(), 40.0);
        assert_eq!(decode("3° 30' 0.00000\" W").unwrap(), -3.5);
    }

    #[test]
    fn decodes_minutes_and_seconds() {
        let value = decode("40° 30' 15.12345\" N").unwrap();
        let expected = 40.0 + 30.0 / 60.0 + 15.12345 / 3600.0;
        assert!(close(value, expected, 1e-12));
    }

    #[test]
    fn decode_rejects_malformed_input() {
        assert_eq!(decode("bad input"), Err(CoordError::FieldCount(2)));
        assert!(matches!(decode("a° b' c\" N"), Err(CoordError::Number(_))));
        assert!(matches!(
            decode("40° 0' 0.00000\" X"),
            Err(CoordError::Hemisphere(_))
        ));
    }

    #[test]
    fn decode_rejects_overflowing_degrees() {
        let huge = format!("{}° 0' 0.00000\" E", "9".repeat(400));
        assert!(matches!(decode(&huge), Err(CoordError::NotFinite(_))));
    }

    #[test]
    fn decode_ignores_unit_suffixes() {
        assert_eq!(leading_number("40°").unwrap(), 40.0);
        assert_eq!(leading_number("15.5\"").unwrap(), 15.5);
        assert_eq!(leading_number("-3°").unwrap(), -3.0);
        assert!(leading_number("°").is_err());
    }

    #[test]
    fn encodes_negative_longitude_as_west() {
        let encoded = encode(-3.5, Axis::Lng);
        assert_eq!(encoded, "3° 30' 0.00000\" W");
        assert!(encoded.ends_with('W'));
        assert!(close(decode(&encoded).unwrap(), -3.5, 1e-9));
    }

    #[test]
    fn encodes_latitude_hemispheres() {
        assert!(encode(12.25, Axis::Lat).ends_with('N'));
        assert!(encode(-12.25, Axis::Lat).ends_with('S'));
        assert!(encode(0.0, Axis::Lng).ends_with('E'));
    }

    #[test]
    fn encode_never_produces_sixty_seconds() {
        // 1° 1' is not representable exactly in binary
        let value = 1.0 + 1.0 / 60.0;
        assert_eq!(encode(value, Axis::Lat), "1° 1' 0.00000\" N");
    }

    #[test]
    fn decimal_round_trip_stays_within_tolerance() {
        for axis in [Axis::Lat, Axis::Lng] {
            let limit = match axis {
                Axis::Lat => 90.0,
                Axis::Lng => 180.0,
            };
            let steps = 2000;
            for i in 0..=steps {
                let x = -limit + 2.0 * limit * (i as f64) / steps as f64 + 0.000_123;
                let x = x.clamp(-limit, limit);
                let back = decode(&encode(x, axis)).unwrap();
                assert!(close(back, x, 1e-5), "{axis}: {x} -> {back}");
            }
        }
    }

    #[test]
    fn string_round_trip_is_exact() {
        let samples = [
            ("40° 30' 15.12345\" N", Axis::Lat),
            ("0° 0' 0.00001\" S", Axis::Lat),
            ("89° 59' 59.99999\" N", Axis::Lat),
            ("3° 20' 10.00000\" W", Axis::Lng),
            ("179° 1' 7.50000\" E", Axis::Lng),
            ("1° 1' 1.11111\" W", Axis::Lng),
        ];
        for (s, axis) in samples {
            assert_eq!(encode(decode(s).unwrap(), axis), s);
        }
    }

    #[test]
    fn validates_form_input() {
        assert!(validate("40° 30' 15.12345\" N", "3° 20' 10.00000\" W"));
        assert!(!validate("bad input", "3° 20' 10.00000\" W"));
        assert!(!validate("40° 30' 15.12345\" N", "3° 20' 10\" W"));
        assert!(!validate("1234° 30' 15.1\" N", "3° 20' 10.0\" W"));
        assert!(!validate("40° 30' 15.123456\" N", "3° 20' 10.0\" W"));
        assert!(!validate("40° 30' 15.1\" N ", "3° 20' 10.0\" W"));
        assert!(validate("-40° 3' 5.1\" S", "3° 20' 10.0\" E"));
    }

    #[test]
    fn pattern_does_not_check_axis() {
        // Latitude with a longitude hemisphere still passes the form check
        assert!(validate("40° 30' 15.12345\" E", "3° 20' 10.00000\" N"));
        assert!(!hemisphere_matches("40° 30' 15.12345\" E", Axis::Lat));
        assert!(hemisphere_matches("3° 20' 10.00000\" W", Axis::Lng));
    }

    #[test]
    fn parses_axis_names() {
        assert_eq!("lat".parse::<Axis>().unwrap(), Axis::Lat);
        assert_eq!("lng".parse::<Axis>().unwrap(), Axis::Lng);
        assert!("lon".parse::<Axis>().is_err());
    }
}
