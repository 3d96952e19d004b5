//! Grade Axis Module
//! Canonical grade labels and the fixed, ordered axis a report displays.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A canonical grade label. Source files spell grades as `"01"`, `"1"`,
/// `"KN"` or `" 3 "`; all of those collapse to one label here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GradeLabel {
    TransitionalKindergarten,
    Kindergarten,
    Grade(u8),
}

impl GradeLabel {
    /// Normalize a literal grade code. Returns `None` for codes that are not
    /// a single grade (blank, suppressed, `"0"`, text labels).
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim().to_ascii_uppercase();
        match code.as_str() {
            "TK" => Some(GradeLabel::TransitionalKindergarten),
            "K" | "KN" | "KG" => Some(GradeLabel::Kindergarten),
            digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                match digits.trim_start_matches('0').parse::<u8>() {
                    Ok(n) if n > 0 => Some(GradeLabel::Grade(n)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for GradeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeLabel::TransitionalKindergarten => f.write_str("TK"),
            GradeLabel::Kindergarten => f.write_str("K"),
            GradeLabel::Grade(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for GradeLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GradeLabel::parse(s).ok_or_else(|| format!("not a grade label: '{s}'"))
    }
}

impl Serialize for GradeLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GradeLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a list of literal grade codes, skipping anything that is not a grade.
pub fn grades(codes: &[&str]) -> Vec<GradeLabel> {
    codes.iter().filter_map(|c| GradeLabel::parse(c)).collect()
}

/// The fixed, ordered list of grade labels a report displays. Order is the
/// order given at construction and is never re-sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeAxis {
    labels: Vec<GradeLabel>,
}

impl Default for GradeAxis {
    fn default() -> Self {
        Self::new(grades(&["1", "2", "3", "4", "5"]))
    }
}

impl GradeAxis {
    /// Build an axis; repeated labels keep their first position only.
    pub fn new(labels: Vec<GradeLabel>) -> Self {
        let mut unique = Vec::with_capacity(labels.len());
        for label in labels {
            if !unique.contains(&label) {
                unique.push(label);
            }
        }
        Self { labels: unique }
    }

    pub fn labels(&self) -> &[GradeLabel] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, grade: GradeLabel) -> bool {
        self.labels.contains(&grade)
    }

    pub fn position(&self, grade: GradeLabel) -> Option<usize> {
        self.labels.iter().position(|g| *g == grade)
    }
}
