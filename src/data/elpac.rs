//! Summative ELPAC research file rows (speaking domain).

use crate::data::columns::elpac as cols;
use crate::data::records::{
    count_or_zero, is_district_sentinel, non_blank, parse_number, AssessmentRecord, Dataset,
    EntityRecord,
};
use crate::data::{DataLoader, DatasetKind, RawTable};
use crate::error::DataError;
use crate::series::GradeLabel;
use std::path::Path;

/// `TypeID` codes that mark a district summary row across file vintages,
/// after [`normalize_type_id`].
const DISTRICT_TYPE_IDS: [&str; 3] = ["2", "D", "DISTRICT"];

/// Upper-case a type code and drop zero padding, so `"02"` and `"2"` agree.
fn normalize_type_id(raw: &str) -> String {
    let code = raw.trim().to_ascii_uppercase();
    if !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit()) {
        let trimmed = code.trim_start_matches('0');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        code
    }
}

/// One ELPAC row with the speaking-domain level counts.
#[derive(Debug, Clone, PartialEq)]
pub struct ElpacRecord {
    pub district_name: String,
    pub school_name: Option<String>,
    pub school_code: String,
    pub type_id: Option<String>,
    pub student_group: Option<String>,
    pub grade: Option<GradeLabel>,
    pub speaking_total: u64,
    pub begin_count: u64,
    pub moderate_count: u64,
    pub developed_count: u64,
    pub begin_pct: Option<f64>,
    pub moderate_pct: Option<f64>,
}

impl ElpacRecord {
    /// Read and convert an ELPAC research file.
    pub fn load(path: &Path) -> Result<Dataset<Self>, DataError> {
        let table = DataLoader::load(DatasetKind::Elpac, path)?;
        Self::from_table(&table)
    }

    pub fn from_table(table: &RawTable) -> Result<Dataset<Self>, DataError> {
        let map = table.column_map();

        let district = map.require(&cols::DISTRICT_NAME)?;
        let code = map.require(&cols::SCHOOL_CODE)?;
        let grade = map.require(&cols::GRADE)?;
        let total = map.require(&cols::SPEAKING_TOTAL)?;
        let begin = map.require(&cols::SPEAKING_BEGIN_COUNT)?;
        let moderate = map.require(&cols::SPEAKING_MODERATE_COUNT)?;
        let developed = map.require(&cols::SPEAKING_DEVELOPED_COUNT)?;

        let school = map.find(&cols::SCHOOL_NAME);
        let type_id = map.find(&cols::TYPE_ID);
        let group = map.find(&cols::STUDENT_GROUP);
        let begin_pct = map.find(&cols::SPEAKING_BEGIN_PCT);
        let moderate_pct = map.find(&cols::SPEAKING_MODERATE_PCT);

        let records = table
            .records()?
            .iter()
            .map(|row| ElpacRecord {
                district_name: row.text(district).to_string(),
                school_name: non_blank(row.opt(school)),
                school_code: row.text(code).to_string(),
                type_id: non_blank(row.opt(type_id)).map(|t| t.to_ascii_uppercase()),
                student_group: non_blank(row.opt(group)),
                grade: row.at(grade).and_then(GradeLabel::parse),
                speaking_total: count_or_zero(row.at(total)),
                begin_count: count_or_zero(row.at(begin)),
                moderate_count: count_or_zero(row.at(moderate)),
                developed_count: count_or_zero(row.at(developed)),
                begin_pct: parse_number(row.opt(begin_pct)),
                moderate_pct: parse_number(row.opt(moderate_pct)),
            })
            .collect();

        Ok(Dataset::new(DatasetKind::Elpac, records, school.is_some()).with_headers(map.headers()))
    }

    fn is_district_type(&self) -> Option<bool> {
        self.type_id
            .as_deref()
            .map(|t| DISTRICT_TYPE_IDS.contains(&normalize_type_id(t).as_str()))
    }
}

impl EntityRecord for ElpacRecord {
    fn district_name(&self) -> &str {
        &self.district_name
    }

    fn school_name(&self) -> Option<&str> {
        self.school_name.as_deref()
    }
}

impl AssessmentRecord for ElpacRecord {
    fn is_district_level(&self) -> bool {
        self.is_district_type()
            .unwrap_or_else(|| is_district_sentinel(&self.school_code))
    }

    fn is_school_level(&self) -> bool {
        !is_district_sentinel(&self.school_code) && self.is_district_type() != Some(true)
    }

    fn student_group(&self) -> Option<&str> {
        self.student_group.as_deref()
    }

    fn grade(&self) -> Option<GradeLabel> {
        self.grade
    }

    fn tested(&self) -> u64 {
        self.speaking_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Delimiter;

    fn parse(text: &str) -> Dataset<ElpacRecord> {
        let table = DataLoader::parse_delimited(DatasetKind::Elpac, text, Delimiter::Caret).unwrap();
        ElpacRecord::from_table(&table).unwrap()
    }

    #[test]
    fn test_type_id_decides_district_level() {
        let dataset = parse(
            "DistrictName^SchoolCode^TypeID^Grade^SpeakingDomainTotal^SpeakingDomainBeginCount^SpeakingDomainModerateCount^SpeakingDomainDevelopedCount\n\
             Alameda Unified^0000000^02^01^120^30^50^40\n\
             Alameda County^0000000^05^01^900^200^300^400\n",
        );

        assert!(dataset.records[0].is_district_level());
        // County rows share the district sentinel code but not the type id
        assert!(!dataset.records[1].is_district_level());
        assert!(!dataset.records[1].is_school_level());
        assert!(!dataset.has_school_names);
    }

    #[test]
    fn test_unpadded_type_id() {
        let dataset = parse(
            "DistrictName^SchoolCode^TypeID^Grade^SpeakingDomainTotal^SpeakingDomainBeginCount^SpeakingDomainModerateCount^SpeakingDomainDevelopedCount\n\
             Alameda Unified^0^2^01^120^30^50^40\n\
             Alameda County^0^5^01^900^200^300^400\n\
             Alameda Unified^0^district^02^80^20^20^40\n",
        );

        assert!(dataset.records[0].is_district_level());
        assert!(!dataset.records[1].is_district_level());
        assert!(dataset.records[2].is_district_level());
        assert_eq!(normalize_type_id(" 002 "), "2");
        assert_eq!(normalize_type_id("00"), "0");
    }

    #[test]
    fn test_school_code_used_without_type_id() {
        let dataset = parse(
            "District Name^School Name^School Code^Grade^SpeakingDomainTotal^SpeakingDomainBeginCount^SpeakingDomainModerateCount^SpeakingDomainDevelopedCount^SpeakingDomainBeginPcnt^SpeakingDomainModeratePcnt\n\
             Alameda Unified^^0^02^100^10^20^70^10.0^20.0\n\
             Alameda Unified^Lincoln Elementary^0130419^02^40^5^5^30^*^*\n",
        );
        let district = &dataset.records[0];
        let school = &dataset.records[1];

        assert!(district.is_district_level());
        assert_eq!(district.grade, Some(GradeLabel::Grade(2)));
        assert_eq!(district.begin_pct, Some(10.0));
        assert!(school.is_school_level());
        assert_eq!(school.school_name(), Some("Lincoln Elementary"));
        assert_eq!(school.begin_pct, None);
        assert!(dataset.has_school_names);
    }

    #[test]
    fn test_missing_level_counts_is_schema_error() {
        let table = DataLoader::parse_delimited(
            DatasetKind::Elpac,
            "DistrictName^SchoolCode^Grade^SpeakingDomainTotal\nAlameda Unified^0^1^10\n",
            Delimiter::Caret,
        )
        .unwrap();
        assert!(matches!(
            ElpacRecord::from_table(&table),
            Err(DataError::Schema { .. })
        ));
    }
}
