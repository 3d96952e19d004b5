//! Row Filter Module
//! Narrows resolved rows to the entity's level, the all-students subgroup
//! and the tested grades, then keeps one authoritative row per grade or school.

use crate::data::records::AssessmentRecord;
use crate::data::{DatasetKind, EnrollmentRecord, EntityQuery, EntityType};
use crate::error::DataError;
use crate::series::GradeLabel;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

/// Filter settings shared by every dataset of one report build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    all_students_id: String,
    include_charters: bool,
}

impl Default for RowFilter {
    fn default() -> Self {
        Self::new("1", true)
    }
}

impl RowFilter {
    pub fn new(all_students_id: impl Into<String>, include_charters: bool) -> Self {
        Self {
            all_students_id: all_students_id.into(),
            include_charters,
        }
    }

    /// Level, then subgroup, then grade-domain filtering of assessment rows.
    pub fn assessment_rows<R: AssessmentRecord>(
        &self,
        query: &EntityQuery,
        dataset: DatasetKind,
        rows: Vec<R>,
        valid_grades: &[GradeLabel],
    ) -> Result<Vec<R>, DataError> {
        let matched = rows.len();
        let level_rows: Vec<R> = rows
            .into_iter()
            .filter(|row| match query.entity_type {
                EntityType::District => row.is_district_level(),
                EntityType::School => row.is_school_level(),
            })
            .collect();

        if level_rows.is_empty() {
            return Err(DataError::NoAggregateLevelRows {
                dataset,
                entity: query.to_string(),
                level: query.entity_type.as_str(),
            });
        }
        let at_level = level_rows.len();

        let rows: Vec<R> = level_rows
            .into_iter()
            .filter(|row| {
                row.student_group()
                    .is_none_or(|group| group.trim() == self.all_students_id)
            })
            .filter(|row| row.grade().is_some_and(|g| valid_grades.contains(&g)))
            .collect();

        debug!(
            %dataset,
            matched,
            at_level,
            kept = rows.len(),
            "Filtered assessment rows"
        );
        Ok(rows)
    }

    /// School-level enrollment rows with optional charter exclusion,
    /// preferring the all-students total when the file labels it.
    pub fn enrollment_rows(
        &self,
        query: &EntityQuery,
        rows: Vec<EnrollmentRecord>,
    ) -> Result<Vec<EnrollmentRecord>, DataError> {
        let matched = rows.len();
        // Files without a usable level column fall back to named rows.
        let has_marker = rows.iter().any(|row| row.school_marker == Some(true));

        let rows: Vec<EnrollmentRecord> = rows
            .into_iter()
            .filter(|row| {
                if has_marker {
                    row.school_marker == Some(true)
                } else {
                    !row.school_name.trim().is_empty()
                }
            })
            .filter(|row| self.include_charters || !row.charter)
            .collect();

        if rows.is_empty() {
            return Err(DataError::NoAggregateLevelRows {
                dataset: DatasetKind::Enrollment,
                entity: query.to_string(),
                level: EntityType::School.as_str(),
            });
        }
        let at_level = rows.len();

        let rows = if rows.iter().any(|row| row.all_students == Some(true)) {
            rows.into_iter()
                .filter(|row| row.all_students == Some(true))
                .collect()
        } else {
            rows
        };

        debug!(matched, at_level, kept = rows.len(), "Filtered enrollment rows");
        Ok(rows)
    }

    /// One row per grade: the one with the largest tested count, the first
    /// encountered on ties. Output is in grade order.
    pub fn dedup_by_grade<R: AssessmentRecord>(rows: Vec<R>) -> Vec<R> {
        let mut best: BTreeMap<GradeLabel, R> = BTreeMap::new();
        for row in rows {
            let Some(grade) = row.grade() else {
                continue;
            };
            keep_larger(best.entry(grade), row, |r| r.tested());
        }
        best.into_values().collect()
    }

    /// One row per (district, school): the one with the largest total.
    pub fn dedup_by_school(rows: Vec<EnrollmentRecord>) -> Vec<EnrollmentRecord> {
        let mut best: BTreeMap<(String, String), EnrollmentRecord> = BTreeMap::new();
        for row in rows {
            let key = (row.district_name.clone(), row.school_name.clone());
            keep_larger(best.entry(key), row, |r| r.total_enrollment);
        }
        best.into_values().collect()
    }
}

fn keep_larger<K: Ord, R>(entry: Entry<'_, K, R>, row: R, weight: impl Fn(&R) -> u64) {
    match entry {
        Entry::Vacant(slot) => {
            slot.insert(row);
        }
        Entry::Occupied(mut slot) => {
            if weight(&row) > weight(slot.get()) {
                slot.insert(row);
            }
        }
    }
}
