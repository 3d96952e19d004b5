//! Entity Resolver Module
//! Matches a user-supplied district or school name against a dataset.

use crate::data::records::{Dataset, EntityRecord};
use crate::error::DataError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::{debug, warn};

static SCHOOL_DISTRICT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+school\s+district$").expect("valid suffix pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    District,
    School,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::District => "district",
            EntityType::School => "school",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "district" => Ok(EntityType::District),
            "school" => Ok(EntityType::School),
            _ => Err(DataError::UnknownEntityType(s.to_string())),
        }
    }
}

/// The district or school a report is built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityQuery {
    pub entity_type: EntityType,
    pub entity_name: String,
}

impl EntityQuery {
    pub fn new(entity_type: EntityType, entity_name: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_name: entity_name.into(),
        }
    }

    pub fn district(name: impl Into<String>) -> Self {
        Self::new(EntityType::District, name)
    }

    pub fn school(name: impl Into<String>) -> Self {
        Self::new(EntityType::School, name)
    }
}

impl fmt::Display for EntityQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} containing '{}'", self.entity_type, self.entity_name)
    }
}

pub struct EntityResolver;

impl EntityResolver {
    /// Trim, drop a trailing "school district" and case-fold.
    pub fn normalize_query(name: &str) -> String {
        SCHOOL_DISTRICT_SUFFIX
            .replace(name.trim(), "")
            .trim()
            .to_lowercase()
    }

    pub fn normalize_field(value: &str) -> String {
        value.trim().to_lowercase()
    }

    /// Rows whose name column matches the query.
    ///
    /// Exact matches on the normalized name win; without any, every row
    /// whose name contains the query is returned. A query that is blank
    /// after normalization matches nothing.
    pub fn resolve<R>(query: &EntityQuery, dataset: Dataset<R>) -> Result<Vec<R>, DataError>
    where
        R: EntityRecord,
    {
        let kind = dataset.kind;
        if query.entity_type == EntityType::School && !dataset.has_school_names {
            return Err(DataError::Schema {
                dataset: kind,
                column: "school name",
                aliases: &["SchoolName", "School Name"],
                available: dataset.headers,
            });
        }

        let target = Self::normalize_query(&query.entity_name);
        // An empty needle would match every row in the state.
        if target.is_empty() {
            return Err(DataError::EntityNotFound {
                dataset: kind,
                entity: query.to_string(),
            });
        }
        let name_of = |record: &R| -> String {
            let field = match query.entity_type {
                EntityType::District => Some(record.district_name()),
                EntityType::School => record.school_name(),
            };
            field.map(Self::normalize_field).unwrap_or_default()
        };

        let (exact, partial): (Vec<R>, Vec<R>) = dataset
            .records
            .into_iter()
            .filter(|record| name_of(record).contains(&target))
            .partition(|record| name_of(record) == target);

        let matched = if exact.is_empty() { partial } else { exact };
        if matched.is_empty() {
            return Err(DataError::EntityNotFound {
                dataset: kind,
                entity: query.to_string(),
            });
        }

        let candidates: BTreeSet<String> = matched.iter().map(name_of).collect();
        if candidates.len() > 1 {
            warn!(
                dataset = %kind,
                query = %query,
                ?candidates,
                "Query matches more than one name; all are included"
            );
        }
        debug!(dataset = %kind, query = %query, rows = matched.len(), "Resolved entity");
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DatasetKind;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        district: &'static str,
        school: Option<&'static str>,
    }

    impl EntityRecord for Row {
        fn district_name(&self) -> &str {
            self.district
        }

        fn school_name(&self) -> Option<&str> {
            self.school
        }
    }

    fn dataset(rows: &[(&'static str, Option<&'static str>)]) -> Dataset<Row> {
        let records = rows
            .iter()
            .map(|&(district, school)| Row { district, school })
            .collect();
        Dataset::new(DatasetKind::Caaspp, records, true)
    }

    #[test]
    fn test_normalize_query_strips_suffix() {
        assert_eq!(
            EntityResolver::normalize_query("  Alameda Unified School   District "),
            "alameda unified"
        );
        assert_eq!(EntityResolver::normalize_query("Oakland"), "oakland");
        // Only a trailing suffix is dropped
        assert_eq!(
            EntityResolver::normalize_query("School District of Oakland"),
            "school district of oakland"
        );
    }

    #[test]
    fn test_suffix_query_matches_district() {
        let data = dataset(&[("Alameda Unified", None), ("Oakland Unified", None)]);
        let rows =
            EntityResolver::resolve(&EntityQuery::district("Alameda Unified School District"), data)
                .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].district, "Alameda Unified");
    }

    #[test]
    fn test_exact_match_preferred_over_substring() {
        let data = dataset(&[
            ("Oakland Unified", None),
            ("Oakland Unified Charter Consortium", None),
        ]);
        let rows =
            EntityResolver::resolve(&EntityQuery::district("oakland unified"), data).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].district, "Oakland Unified");
    }

    #[test]
    fn test_substring_fallback_keeps_all_candidates() {
        let data = dataset(&[
            ("San Jose Unified", None),
            ("East Side Union High (San Jose)", None),
            ("Fresno Unified", None),
        ]);
        let rows = EntityResolver::resolve(&EntityQuery::district("San Jose"), data).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_absent_name_is_not_found() {
        let data = dataset(&[("Alameda Unified", None)]);
        let err = EntityResolver::resolve(&EntityQuery::district("Berkeley"), data).unwrap_err();
        assert!(matches!(err, DataError::EntityNotFound { .. }));
        assert!(err.to_string().contains("district containing 'Berkeley'"));
    }

    #[test]
    fn test_school_query_matches_school_column() {
        let data = dataset(&[
            ("Alameda Unified", Some("Lincoln Middle")),
            ("Alameda Unified", Some("Encinal Junior/Senior High")),
            ("Alameda Unified", None),
        ]);
        let rows = EntityResolver::resolve(&EntityQuery::school("lincoln"), data).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].school, Some("Lincoln Middle"));
    }

    #[test]
    fn test_school_query_without_school_column() {
        let mut data = dataset(&[("Alameda Unified", None)]);
        data.has_school_names = false;
        data.headers = vec!["DistrictName".to_string(), "SchoolCode".to_string()];
        let err = EntityResolver::resolve(&EntityQuery::school("Lincoln"), data).unwrap_err();
        match err {
            DataError::Schema { available, .. } => {
                assert_eq!(available, vec!["DistrictName", "SchoolCode"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_query_matches_nothing() {
        for name in ["", "   ", "\t"] {
            let data = dataset(&[("Alameda Unified", Some("Lincoln")), ("Oakland Unified", None)]);
            let err = EntityResolver::resolve(&EntityQuery::district(name), data).unwrap_err();
            assert!(matches!(err, DataError::EntityNotFound { .. }));
        }
    }

    #[test]
    fn test_entity_type_parse() {
        assert_eq!("District".parse::<EntityType>().unwrap(), EntityType::District);
        assert_eq!(" SCHOOL ".parse::<EntityType>().unwrap(), EntityType::School);
        assert!(matches!(
            "county".parse::<EntityType>(),
            Err(DataError::UnknownEntityType(_))
        ));
    }
}
