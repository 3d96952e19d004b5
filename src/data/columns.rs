//! Column Alias Module
//! Maps each logical column to the literal header variants it has appeared
//! under across file vintages. Lookup tries the aliases in order and uses
//! the first one present.

use crate::data::DatasetKind;
use crate::error::DataError;

/// A logical column and its known header spellings, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

impl ColumnSpec {
    pub const fn new(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { name, aliases }
    }
}

/// Header positions of one table, resolved once per file read.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    dataset: DatasetKind,
    headers: Vec<String>,
}

impl ColumnMap {
    pub fn new<S: AsRef<str>>(dataset: DatasetKind, headers: &[S]) -> Self {
        Self {
            dataset,
            headers: headers.iter().map(|h| h.as_ref().trim().to_string()).collect(),
        }
    }

    /// Index of the first alias present in the header row.
    pub fn find(&self, spec: &ColumnSpec) -> Option<usize> {
        spec.aliases
            .iter()
            .find_map(|alias| self.headers.iter().position(|h| h == alias))
    }

    /// Like [`ColumnMap::find`], but a missing column is a schema error.
    pub fn require(&self, spec: &ColumnSpec) -> Result<usize, DataError> {
        self.find(spec).ok_or_else(|| DataError::Schema {
            dataset: self.dataset,
            column: spec.name,
            aliases: spec.aliases,
            available: self.headers.clone(),
        })
    }

    pub fn has(&self, spec: &ColumnSpec) -> bool {
        self.find(spec).is_some()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn dataset(&self) -> DatasetKind {
        self.dataset
    }
}

pub mod enrollment {
    use super::ColumnSpec;

    pub const DISTRICT_NAME: ColumnSpec =
        ColumnSpec::new("district name", &["DistrictName", "District Name"]);
    pub const SCHOOL_NAME: ColumnSpec =
        ColumnSpec::new("school name", &["SchoolName", "School Name"]);
    pub const AGGREGATE_LEVEL: ColumnSpec = ColumnSpec::new(
        "aggregation level",
        &["AggregateLevel", "Aggregate Level", "AggLevel", "Type"],
    );
    pub const CHARTER: ColumnSpec = ColumnSpec::new("charter flag", &["Charter", "CharterYN"]);
    pub const REPORTING_CATEGORY: ColumnSpec =
        ColumnSpec::new("reporting category", &["ReportingCategory", "Reporting Category"]);
    pub const TOTAL_ENROLLMENT: ColumnSpec =
        ColumnSpec::new("total enrollment", &["TOTAL_ENR", "Total Enrollment"]);

    // Narrow (long-format) vintages only.
    pub const SUBGROUP_ID: ColumnSpec = ColumnSpec::new("subgroup id", &["SubgroupID"]);
    pub const GRADE: ColumnSpec = ColumnSpec::new("grade", &["Grade"]);
    pub const ENROLL: ColumnSpec = ColumnSpec::new("enrollment count", &["Enroll"]);

    pub const GR_TK: ColumnSpec = ColumnSpec::new("transitional kindergarten", &["GR_TK"]);
    pub const GR_KN: ColumnSpec = ColumnSpec::new("kindergarten", &["GR_KN"]);
    pub const GR_NUMBERED: [ColumnSpec; 12] = [
        ColumnSpec::new("grade 1", &["GR_01"]),
        ColumnSpec::new("grade 2", &["GR_02"]),
        ColumnSpec::new("grade 3", &["GR_03"]),
        ColumnSpec::new("grade 4", &["GR_04"]),
        ColumnSpec::new("grade 5", &["GR_05"]),
        ColumnSpec::new("grade 6", &["GR_06"]),
        ColumnSpec::new("grade 7", &["GR_07"]),
        ColumnSpec::new("grade 8", &["GR_08"]),
        ColumnSpec::new("grade 9", &["GR_09"]),
        ColumnSpec::new("grade 10", &["GR_10"]),
        ColumnSpec::new("grade 11", &["GR_11"]),
        ColumnSpec::new("grade 12", &["GR_12"]),
    ];

    /// Headerless fixed-width layout with 14 fields.
    pub const NARROW_LAYOUT_14: [&str; 14] = [
        "Year",
        "AggLevel",
        "CountyCode",
        "DistrictCode",
        "SchoolCode",
        "CharterYN",
        "ReportingCategory",
        "Grade",
        "Enroll",
        "CountyName",
        "DistrictName",
        "SchoolName",
        "Extra1",
        "Extra2",
    ];

    /// Headerless fixed-width layout with 12 fields.
    pub const NARROW_LAYOUT_12: [&str; 12] = [
        "Year",
        "Type",
        "CountyCode",
        "DistrictCode",
        "SchoolCode",
        "CountyName",
        "DistrictName",
        "SchoolName",
        "CharterYN",
        "SubgroupID",
        "Grade",
        "Enroll",
    ];
}

pub mod caaspp {
    use super::ColumnSpec;

    pub const DISTRICT_NAME: ColumnSpec =
        ColumnSpec::new("district name", &["District Name", "DistrictName"]);
    pub const SCHOOL_NAME: ColumnSpec =
        ColumnSpec::new("school name", &["School Name", "SchoolName"]);
    pub const SCHOOL_CODE: ColumnSpec =
        ColumnSpec::new("school code", &["School Code", "SchoolCode"]);
    pub const STUDENT_GROUP: ColumnSpec =
        ColumnSpec::new("student group id", &["Student Group ID", "StudentGroupID"]);
    pub const GRADE: ColumnSpec = ColumnSpec::new("grade", &["Grade"]);
    pub const TESTED: ColumnSpec = ColumnSpec::new(
        "tested count",
        &[
            "Total Students Tested with Scores",
            "Total Students Tested",
            "TotalTested",
        ],
    );
    pub const MEAN_SCALE_SCORE: ColumnSpec =
        ColumnSpec::new("mean scale score", &["Mean Scale Score", "MeanScaleScore"]);
    pub const PCT_NOT_MET: ColumnSpec = ColumnSpec::new(
        "percentage standard not met",
        &["Percentage Standard Not Met", "PercentageStandardNotMet"],
    );
    pub const PCT_NEARLY_MET: ColumnSpec = ColumnSpec::new(
        "percentage standard nearly met",
        &["Percentage Standard Nearly Met", "PercentageStandardNearlyMet"],
    );
    pub const COUNT_NOT_MET: ColumnSpec = ColumnSpec::new(
        "count standard not met",
        &["Count Standard Not Met", "CountStandardNotMet"],
    );
    pub const COUNT_NEARLY_MET: ColumnSpec = ColumnSpec::new(
        "count standard nearly met",
        &["Count Standard Nearly Met", "CountStandardNearlyMet"],
    );
}

pub mod elpac {
    use super::ColumnSpec;

    pub const DISTRICT_NAME: ColumnSpec =
        ColumnSpec::new("district name", &["DistrictName", "District Name"]);
    pub const SCHOOL_NAME: ColumnSpec =
        ColumnSpec::new("school name", &["SchoolName", "School Name"]);
    pub const SCHOOL_CODE: ColumnSpec =
        ColumnSpec::new("school code", &["SchoolCode", "School Code"]);
    pub const TYPE_ID: ColumnSpec = ColumnSpec::new("type id", &["TypeID", "Type ID"]);
    pub const STUDENT_GROUP: ColumnSpec =
        ColumnSpec::new("student group id", &["StudentGroupID", "Student Group ID"]);
    pub const GRADE: ColumnSpec = ColumnSpec::new("grade", &["Grade"]);
    pub const SPEAKING_TOTAL: ColumnSpec =
        ColumnSpec::new("speaking domain total", &["SpeakingDomainTotal"]);
    pub const SPEAKING_BEGIN_COUNT: ColumnSpec =
        ColumnSpec::new("speaking begin count", &["SpeakingDomainBeginCount"]);
    pub const SPEAKING_MODERATE_COUNT: ColumnSpec =
        ColumnSpec::new("speaking moderate count", &["SpeakingDomainModerateCount"]);
    pub const SPEAKING_DEVELOPED_COUNT: ColumnSpec =
        ColumnSpec::new("speaking developed count", &["SpeakingDomainDevelopedCount"]);
    pub const SPEAKING_BEGIN_PCT: ColumnSpec =
        ColumnSpec::new("speaking begin percent", &["SpeakingDomainBeginPcnt"]);
    pub const SPEAKING_MODERATE_PCT: ColumnSpec =
        ColumnSpec::new("speaking moderate percent", &["SpeakingDomainModeratePcnt"]);
}
