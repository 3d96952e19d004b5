//! CAASPP ELA research file rows.

use crate::data::columns::caaspp as cols;
use crate::data::records::{
    count_or_zero, is_district_sentinel, non_blank_ref, parse_count, parse_number,
    AssessmentRecord, Dataset, EntityRecord,
};
use crate::data::{DataLoader, DatasetKind, RawTable};
use crate::error::DataError;
use crate::series::GradeLabel;
use std::path::Path;
use tracing::debug;

/// One CAASPP ELA row: an entity, subgroup and grade.
#[derive(Debug, Clone, PartialEq)]
pub struct CaasppRecord {
    pub district_name: String,
    pub school_name: String,
    pub school_code: String,
    pub student_group: String,
    pub grade: Option<GradeLabel>,
    pub tested: u64,
    pub mean_scale_score: Option<f64>,
    pub pct_not_met: Option<f64>,
    pub pct_nearly_met: Option<f64>,
    pub count_not_met: Option<u64>,
    pub count_nearly_met: Option<u64>,
}

impl CaasppRecord {
    /// Read and convert a CAASPP research file.
    pub fn load(path: &Path) -> Result<Dataset<Self>, DataError> {
        let table = DataLoader::load(DatasetKind::Caaspp, path)?;
        Self::from_table(&table)
    }

    pub fn from_table(table: &RawTable) -> Result<Dataset<Self>, DataError> {
        let map = table.column_map();

        let district = map.require(&cols::DISTRICT_NAME)?;
        let school = map.require(&cols::SCHOOL_NAME)?;
        let code = map.require(&cols::SCHOOL_CODE)?;
        let group = map.require(&cols::STUDENT_GROUP)?;
        let grade = map.require(&cols::GRADE)?;
        let tested = map.require(&cols::TESTED)?;
        let mean = map.require(&cols::MEAN_SCALE_SCORE)?;

        let pct_not_met = map.find(&cols::PCT_NOT_MET);
        let pct_nearly_met = map.find(&cols::PCT_NEARLY_MET);
        let count_not_met = map.find(&cols::COUNT_NOT_MET);
        let count_nearly_met = map.find(&cols::COUNT_NEARLY_MET);

        let has_pct = pct_not_met.is_some() && pct_nearly_met.is_some();
        let has_counts = count_not_met.is_some() && count_nearly_met.is_some();
        if !has_pct && !has_counts {
            // Neither band pair is usable; report the percentage pair.
            map.require(&cols::PCT_NOT_MET)?;
            map.require(&cols::PCT_NEARLY_MET)?;
        }
        debug!(has_pct, has_counts, "Resolved CAASPP band columns");

        let records = table
            .records()?
            .iter()
            .map(|row| CaasppRecord {
                district_name: row.text(district).to_string(),
                school_name: row.text(school).to_string(),
                school_code: row.text(code).to_string(),
                student_group: row.text(group).to_string(),
                grade: row.at(grade).and_then(GradeLabel::parse),
                tested: count_or_zero(row.at(tested)),
                mean_scale_score: parse_number(row.at(mean)),
                pct_not_met: parse_number(row.opt(pct_not_met)),
                pct_nearly_met: parse_number(row.opt(pct_nearly_met)),
                count_not_met: parse_count(row.opt(count_not_met)),
                count_nearly_met: parse_count(row.opt(count_nearly_met)),
            })
            .collect();

        Ok(Dataset::new(DatasetKind::Caaspp, records, true).with_headers(map.headers()))
    }
}

impl EntityRecord for CaasppRecord {
    fn district_name(&self) -> &str {
        &self.district_name
    }

    fn school_name(&self) -> Option<&str> {
        non_blank_ref(&self.school_name)
    }
}

impl AssessmentRecord for CaasppRecord {
    fn is_district_level(&self) -> bool {
        is_district_sentinel(&self.school_code)
    }

    fn student_group(&self) -> Option<&str> {
        Some(&self.student_group)
    }

    fn grade(&self) -> Option<GradeLabel> {
        self.grade
    }

    fn tested(&self) -> u64 {
        self.tested
    }
}
