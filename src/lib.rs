//! California school report library.
//!
//! Turns the statewide enrollment, CAASPP ELA and ELPAC research files into
//! grade-indexed series and a scale-score summary for one district or school.

pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod series;
pub mod stats;

pub use config::ReportConfig;
pub use data::{EntityQuery, EntityType};
pub use error::{DataError, ReportError};
pub use report::{ReportBuilder, ReportData, ReportOutput};
