//! Data module - dataset reading, typed records, entity matching and row filtering

mod caaspp;
mod columns;
mod elpac;
mod enrollment;
mod filter;
mod fixed_width;
mod loader;
mod records;
mod resolver;

use serde::Serialize;
use std::fmt;

pub use caaspp::CaasppRecord;
pub use columns::{ColumnMap, ColumnSpec};
pub use elpac::ElpacRecord;
pub use enrollment::{EnrollmentRecord, SchoolEnrollment};
pub use filter::RowFilter;
pub use loader::{DataLoader, Delimiter, RawRecord, RawTable};
pub use records::{saturating_total, AssessmentRecord, Dataset, EntityRecord};
pub use resolver::{EntityQuery, EntityResolver, EntityType};

/// The three statewide extracts a report is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DatasetKind {
    Enrollment,
    Caaspp,
    Elpac,
}

impl DatasetKind {
    /// Delimiter convention the published files use.
    pub fn delimiter(self) -> Delimiter {
        match self {
            DatasetKind::Enrollment => Delimiter::Tab,
            DatasetKind::Caaspp | DatasetKind::Elpac => Delimiter::Caret,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatasetKind::Enrollment => "Enrollment",
            DatasetKind::Caaspp => "CAASPP",
            DatasetKind::Elpac => "ELPAC",
        };
        f.write_str(name)
    }
}
