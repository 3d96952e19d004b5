//! Typed record boundary.
//!
//! Raw string rows are converted into typed records right after reading, so
//! all number parsing happens in one place.

use crate::data::DatasetKind;
use crate::series::GradeLabel;

/// Typed rows of one dataset, in file order.
#[derive(Debug, Clone)]
pub struct Dataset<R> {
    pub kind: DatasetKind,
    pub records: Vec<R>,
    /// Whether the file carried a school-name column at all.
    pub has_school_names: bool,
    /// Header row as read, for error messages.
    pub headers: Vec<String>,
}

impl<R> Dataset<R> {
    pub fn new(kind: DatasetKind, records: Vec<R>, has_school_names: bool) -> Self {
        Self {
            kind,
            records,
            has_school_names,
            headers: Vec::new(),
        }
    }

    pub fn with_headers(mut self, headers: &[String]) -> Self {
        self.headers = headers.to_vec();
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A row that can be matched against a district or school name.
pub trait EntityRecord {
    fn district_name(&self) -> &str;
    fn school_name(&self) -> Option<&str>;
}

/// A per-grade assessment row.
pub trait AssessmentRecord: EntityRecord {
    /// District summary row, identified by the dataset's sentinel code.
    fn is_district_level(&self) -> bool;

    /// School row; the complement of the district condition by default.
    fn is_school_level(&self) -> bool {
        !self.is_district_level()
    }

    /// Demographic subgroup id, when the dataset carries one.
    fn student_group(&self) -> Option<&str>;

    fn grade(&self) -> Option<GradeLabel>;

    /// Count used to pick the authoritative row among duplicates and to
    /// weight averages.
    fn tested(&self) -> u64;
}

/// True for the codes the research files use on district summary rows.
pub fn is_district_sentinel(school_code: &str) -> bool {
    matches!(school_code.trim(), "0" | "0000000")
}

/// Parse a decimal value; suppressed (`*`), blank and non-finite read as `None`.
pub fn parse_number(raw: Option<&str>) -> Option<f64> {
    let cleaned = raw?.trim().replace(',', "");
    let cleaned = cleaned.trim_end_matches('%');
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a non-negative count. Fractional input is truncated.
pub fn parse_count(raw: Option<&str>) -> Option<u64> {
    let value = parse_number(raw)?;
    (value >= 0.0).then(|| value.trunc() as u64)
}

/// Count with unparseable values read as zero.
pub fn count_or_zero(raw: Option<&str>) -> u64 {
    parse_count(raw).unwrap_or(0)
}

/// Sum of counts that sticks at `u64::MAX` instead of overflowing.
pub fn saturating_total<I: IntoIterator<Item = u64>>(counts: I) -> u64 {
    counts.into_iter().fold(0, u64::saturating_add)
}

/// Trimmed text, `None` when blank.
pub fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Borrowed trimmed text, `None` when blank.
pub fn non_blank_ref(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number(Some(" 2455.3 ")), Some(2455.3));
        assert_eq!(parse_number(Some("1,204")), Some(1204.0));
        assert_eq!(parse_number(Some("45.00%")), Some(45.0));
        assert_eq!(parse_number(Some("*")), None);
        assert_eq!(parse_number(Some("")), None);
        assert_eq!(parse_number(Some("NaN")), None);
        assert_eq!(parse_number(None), None);
    }

    #[test]
    fn test_parse_count_rejects_negative() {
        assert_eq!(parse_count(Some("340")), Some(340));
        assert_eq!(parse_count(Some("12.9")), Some(12));
        assert_eq!(parse_count(Some("-1")), None);
        assert_eq!(count_or_zero(Some("*")), 0);
        assert_eq!(parse_count(Some("1e30")), Some(u64::MAX));
    }

    #[test]
    fn test_saturating_total_does_not_wrap() {
        assert_eq!(saturating_total([3, 4, 5]), 12);
        assert_eq!(saturating_total([u64::MAX, 1, 2]), u64::MAX);
        assert_eq!(saturating_total(std::iter::empty()), 0);
    }

    #[test]
    fn test_district_sentinel() {
        assert!(is_district_sentinel("0000000"));
        assert!(is_district_sentinel(" 0 "));
        assert!(!is_district_sentinel("0112607"));
        assert!(!is_district_sentinel(""));
    }
}
