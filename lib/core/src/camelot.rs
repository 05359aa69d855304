//! Camelot wheel notation
//!
//! Maps detected musical keys (`"C_major"`, `"A_minor"`, ...) onto the
//! 24-position Camelot wheel used by DJs for harmonic mixing. Minor keys
//! carry the letter `A`, major keys the letter `B`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Key mode on the wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Minor keys, letter `A`
    Minor,
    /// Major keys, letter `B`
    Major,
}

impl Mode {
    #[inline]
    pub fn letter(self) -> char {
        match self {
            Mode::Minor => 'A',
            Mode::Major => 'B',
        }
    }
}

/// A position on the Camelot wheel, or `Unknown` when the key could not be mapped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CamelotCode {
    Key { number: u8, mode: Mode },
    Unknown,
}

impl CamelotCode {
    /// Build a code, rejecting wheel positions outside 1..=12
    pub fn new(number: u8, mode: Mode) -> Option<Self> {
        (1..=12)
            .contains(&number)
            .then_some(CamelotCode::Key { number, mode })
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, CamelotCode::Unknown)
    }
}

impl fmt::Display for CamelotCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CamelotCode::Key { number, mode } => write!(f, "{}{}", number, mode.letter()),
            CamelotCode::Unknown => write!(f, "Unknown"),
        }
    }
}

impl FromStr for CamelotCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "Unknown" {
            return Ok(CamelotCode::Unknown);
        }

        let split = s.len().saturating_sub(1);
        let (digits, letter) = (s.get(..split), s.get(split..));
        let mode = match letter {
            Some("A") => Mode::Minor,
            Some("B") => Mode::Major,
            _ => return Err(format!("invalid Camelot code: {}", s)),
        };
        digits
            .and_then(|d| d.parse::<u8>().ok())
            .and_then(|n| CamelotCode::new(n, mode))
            .ok_or_else(|| format!("invalid Camelot code: {}", s))
    }
}

impl TryFrom<String> for CamelotCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CamelotCode> for String {
    fn from(code: CamelotCode) -> Self {
        code.to_string()
    }
}

/// Wheel positions indexed by pitch class (C = 0 .. B = 11): (major, minor)
const WHEEL: [(&str, u8, u8); 12] = [
    ("C", 8, 5),
    ("C#", 3, 12),
    ("D", 10, 7),
    ("D#", 5, 2),
    ("E", 12, 9),
    ("F", 7, 4),
    ("F#", 2, 11),
    ("G", 9, 6),
    ("G#", 4, 1),
    ("A", 11, 8),
    ("A#", 6, 3),
    ("B", 1, 10),
];

/// Convert a detected key such as `"C_major"` or `"A_minor"` to Camelot notation.
///
/// Tonics use sharps only. Flats, a missing or unknown mode suffix, and any
/// other malformed label map to [`CamelotCode::Unknown`].
pub fn to_camelot(key_label: &str) -> CamelotCode {
    let Some((tonic, scale)) = key_label.rsplit_once('_') else {
        return CamelotCode::Unknown;
    };

    let Some(&(_, major, minor)) = WHEEL.iter().find(|(name, _, _)| *name == tonic) else {
        return CamelotCode::Unknown;
    };

    match scale {
        "major" => CamelotCode::Key { number: major, mode: Mode::Major },
        "minor" => CamelotCode::Key { number: minor, mode: Mode::Minor },
        _ => CamelotCode::Unknown,
    }
}
