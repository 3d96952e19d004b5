//! Census-day enrollment rows.
//!
//! Two vintages exist. The wide file has a header row and one grade per
//! `GR_xx` column. The narrow file is headerless fixed-width text with one
//! row per school and grade; it is pivoted here so both vintages produce the
//! same record shape.

use crate::data::columns::{enrollment as cols, ColumnMap};
use crate::data::records::{count_or_zero, parse_count, saturating_total, Dataset, EntityRecord};
use crate::data::{DataLoader, DatasetKind, RawRecord, RawTable};
use crate::error::DataError;
use crate::series::GradeLabel;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Aggregation level values that mark a school row in the wide file.
const SCHOOL_LEVEL_MARKERS: [&str; 3] = ["school", "s", "schl"];

/// Reporting category of the all-students total.
const ALL_STUDENTS_CATEGORY: &str = "TA";

/// Subgroup id of the all-students total in the 12-field narrow layout.
const ALL_STUDENTS_SUBGROUP: u64 = 0;

/// One school's (or aggregate's) enrollment, grade by grade.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentRecord {
    pub district_name: String,
    pub school_name: String,
    pub aggregate_level: Option<String>,
    /// `Some(true)` for a school marker, `None` when the file has no level column.
    pub school_marker: Option<bool>,
    pub charter: bool,
    /// `Some(true)` for the all-students total, `None` when the file
    /// carries neither a reporting category nor a subgroup id.
    pub all_students: Option<bool>,
    pub total_enrollment: u64,
    pub grades: BTreeMap<GradeLabel, u64>,
}

impl EnrollmentRecord {
    /// Count for one grade; a grade the file does not report is zero.
    pub fn grade_count(&self, grade: GradeLabel) -> u64 {
        self.grades.get(&grade).copied().unwrap_or(0)
    }

    /// Read and convert an enrollment extract of either vintage.
    pub fn load(path: &Path) -> Result<Dataset<Self>, DataError> {
        let table = DataLoader::load(DatasetKind::Enrollment, path)?;
        Self::from_table(&table)
    }

    pub fn from_table(table: &RawTable) -> Result<Dataset<Self>, DataError> {
        let map = table.column_map();
        if map.has(&cols::DISTRICT_NAME) {
            return Self::from_wide(table, &map);
        }

        let layout: Option<&[&str]> = match table.width() {
            14 => Some(&cols::NARROW_LAYOUT_14),
            12 => Some(&cols::NARROW_LAYOUT_12),
            _ => None,
        };
        match layout {
            Some(headers) if table.is_positional() => {
                let narrow = ColumnMap::new(DatasetKind::Enrollment, headers);
                Self::from_narrow(table, &narrow)
            }
            // No known layout fits; report the missing district column.
            _ => Err(DataError::Schema {
                dataset: DatasetKind::Enrollment,
                column: cols::DISTRICT_NAME.name,
                aliases: cols::DISTRICT_NAME.aliases,
                available: map.headers().to_vec(),
            }),
        }
    }

    fn from_wide(table: &RawTable, map: &ColumnMap) -> Result<Dataset<Self>, DataError> {
        let district = map.require(&cols::DISTRICT_NAME)?;
        let school = map.require(&cols::SCHOOL_NAME)?;
        let total = map.require(&cols::TOTAL_ENROLLMENT)?;
        let level = map.find(&cols::AGGREGATE_LEVEL);
        let charter = map.find(&cols::CHARTER);
        let category = map.find(&cols::REPORTING_CATEGORY);

        let mut grade_columns = vec![(GradeLabel::Kindergarten, map.require(&cols::GR_KN)?)];
        if let Some(idx) = map.find(&cols::GR_TK) {
            grade_columns.push((GradeLabel::TransitionalKindergarten, idx));
        }
        for (n, spec) in (1u8..).zip(cols::GR_NUMBERED.iter()) {
            // Grades 1-5 are on every report; the rest are read when present.
            let idx = if n <= 5 {
                Some(map.require(spec)?)
            } else {
                map.find(spec)
            };
            if let Some(idx) = idx {
                grade_columns.push((GradeLabel::Grade(n), idx));
            }
        }

        let records: Vec<Self> = table
            .records()?
            .iter()
            .map(|row| {
                let aggregate_level = level.map(|i| row.text(i).to_string());
                EnrollmentRecord {
                    district_name: row.text(district).to_string(),
                    school_name: row.text(school).to_string(),
                    school_marker: aggregate_level.as_deref().map(is_wide_school_marker),
                    aggregate_level,
                    charter: is_charter(row, charter),
                    all_students: category
                        .map(|i| row.text(i).eq_ignore_ascii_case(ALL_STUDENTS_CATEGORY)),
                    total_enrollment: count_or_zero(row.at(total)),
                    grades: grade_columns
                        .iter()
                        .map(|&(grade, idx)| (grade, count_or_zero(row.at(idx))))
                        .collect(),
                }
            })
            .collect();

        debug!(rows = records.len(), "Read wide enrollment file");
        Ok(Dataset::new(DatasetKind::Enrollment, records, true).with_headers(map.headers()))
    }

    /// Pivot long-format rows into one record per school and category.
    /// A repeated grade keeps the larger count.
    fn from_narrow(table: &RawTable, map: &ColumnMap) -> Result<Dataset<Self>, DataError> {
        let district = map.require(&cols::DISTRICT_NAME)?;
        let school = map.require(&cols::SCHOOL_NAME)?;
        let grade = map.require(&cols::GRADE)?;
        let enroll = map.require(&cols::ENROLL)?;
        let level = map.find(&cols::AGGREGATE_LEVEL);
        let charter = map.find(&cols::CHARTER);
        let category = map.find(&cols::REPORTING_CATEGORY);
        let subgroup = map.find(&cols::SUBGROUP_ID);

        let mut order: Vec<NarrowKey> = Vec::new();
        let mut pivot: BTreeMap<NarrowKey, BTreeMap<GradeLabel, u64>> = BTreeMap::new();

        for row in table.records()?.iter() {
            let Some(label) = row.at(grade).and_then(GradeLabel::parse) else {
                continue;
            };
            let all_students = match (category, subgroup) {
                (Some(i), _) => Some(row.text(i).eq_ignore_ascii_case(ALL_STUDENTS_CATEGORY)),
                (None, Some(i)) => Some(parse_count(row.at(i)) == Some(ALL_STUDENTS_SUBGROUP)),
                (None, None) => None,
            };
            let key = NarrowKey {
                district_name: row.text(district).to_string(),
                school_name: row.text(school).to_string(),
                aggregate_level: level.map(|i| row.text(i).to_string()),
                charter: is_charter(row, charter),
                all_students,
            };

            let count = count_or_zero(row.at(enroll));
            let grades = pivot.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                BTreeMap::new()
            });
            let slot = grades.entry(label).or_insert(0);
            *slot = (*slot).max(count);
        }

        let records: Vec<Self> = order
            .into_iter()
            .filter_map(|key| {
                let grades = pivot.remove(&key)?;
                Some(EnrollmentRecord {
                    school_marker: key.aggregate_level.as_deref().map(is_narrow_school_marker),
                    total_enrollment: saturating_total(grades.values().copied()),
                    district_name: key.district_name,
                    school_name: key.school_name,
                    aggregate_level: key.aggregate_level,
                    charter: key.charter,
                    all_students: key.all_students,
                    grades,
                })
            })
            .collect();

        info!(
            rows = table.height(),
            schools = records.len(),
            "Pivoted narrow enrollment file"
        );
        Ok(Dataset::new(DatasetKind::Enrollment, records, true).with_headers(map.headers()))
    }
}

impl EntityRecord for EnrollmentRecord {
    fn district_name(&self) -> &str {
        &self.district_name
    }

    fn school_name(&self) -> Option<&str> {
        crate::data::records::non_blank_ref(&self.school_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct NarrowKey {
    district_name: String,
    school_name: String,
    aggregate_level: Option<String>,
    charter: bool,
    all_students: Option<bool>,
}

fn is_wide_school_marker(level: &str) -> bool {
    SCHOOL_LEVEL_MARKERS.contains(&level.trim().to_ascii_lowercase().as_str())
}

/// The narrow vintages abbreviate levels, so any `S...` code is a school.
fn is_narrow_school_marker(level: &str) -> bool {
    level.trim().to_ascii_uppercase().starts_with('S')
}

fn is_charter(row: &RawRecord<'_>, column: Option<usize>) -> bool {
    column.is_some_and(|i| row.text(i).eq_ignore_ascii_case("Y"))
}

/// One row of the per-school table: K through grade 5 and their total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchoolEnrollment {
    pub school: String,
    pub kindergarten: u64,
    pub grades: [u64; 5],
    pub total: u64,
}

impl SchoolEnrollment {
    pub fn from_record(record: &EnrollmentRecord) -> Self {
        let kindergarten = record.grade_count(GradeLabel::Kindergarten);
        let grades: [u64; 5] =
            std::array::from_fn(|i| record.grade_count(GradeLabel::Grade(i as u8 + 1)));
        Self {
            school: record.school_name.clone(),
            kindergarten,
            total: saturating_total(std::iter::once(kindergarten).chain(grades)),
            grades,
        }
    }

    /// Per-school rows sorted by school name.
    pub fn table(records: &[EnrollmentRecord]) -> Vec<Self> {
        let mut rows: Vec<Self> = records.iter().map(Self::from_record).collect();
        rows.sort_by(|a, b| a.school.cmp(&b.school));
        rows
    }
}
