//! Report module - build orchestration, chart rendering and bundle output

mod charts;
mod pipeline;
mod writer;

pub use charts::{ChartError, ChartSpec, StaticChartRenderer, ValueScale};
pub use pipeline::{Headline, ReportBuilder, ReportData, ReportOutput};
pub use writer::{ReportWriter, SUMMARY_FILE};
