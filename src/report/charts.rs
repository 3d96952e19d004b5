//! Static Chart Renderer
//! Draws one grade series as a PNG bar chart.
//!
//! Layout:
//! 1. Caption centered above the plot
//! 2. One bar per axis grade, labelled with its value
//! 3. Grades without a value get no bar and an "N/A" marker at the baseline

use crate::config::ChartSize;
use crate::series::{GradeSeries, GradeValue};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const BAR_COLOR: RGBColor = RGBColor(31, 119, 180);
const FONT: &str = "sans-serif";

/// Floor and ceiling of the percent axis.
const PERCENT_AXIS_MIN_TOP: f64 = 30.0;
const PERCENT_AXIS_MAX_TOP: f64 = 100.0;

/// The speaking level scale runs 1 to 3; the axis starts just below level 1.
const LEVEL_AXIS_BOTTOM: f64 = 0.8;
const LEVEL_AXIS_MAX_TOP: f64 = 3.2;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("failed to draw chart {path}: {message}")]
    Drawing { path: String, message: String },
}

/// How a series' values are scaled and labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueScale {
    Count,
    Percent,
    Level,
}

impl ValueScale {
    pub fn label(self, value: GradeValue) -> String {
        match (self, value) {
            (_, GradeValue::NotApplicable | GradeValue::Unavailable) => "N/A".to_string(),
            (ValueScale::Count, GradeValue::Value(v)) => format_count(v),
            (ValueScale::Percent, GradeValue::Value(v)) => format!("{v:.0}%"),
            (ValueScale::Level, GradeValue::Value(v)) => format!("{v:.1}"),
        }
    }
}

/// Title and axis text for one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: &'static str,
    pub y_label: &'static str,
    pub scale: ValueScale,
}

impl ChartSpec {
    pub const ENROLLMENT: ChartSpec = ChartSpec {
        title: "Enrollment by Grade",
        y_label: "Students",
        scale: ValueScale::Count,
    };
    pub const READING_GAP: ChartSpec = ChartSpec {
        title: "Reading Gap by Grade",
        y_label: "% Below Standard (L1 + L2)",
        scale: ValueScale::Percent,
    };
    pub const SPEAKING_GAP: ChartSpec = ChartSpec {
        title: "Speaking Gap by Grade",
        y_label: "% in Levels 1 + 2 (Speaking)",
        scale: ValueScale::Percent,
    };
    pub const SPEAKING_LEVEL: ChartSpec = ChartSpec {
        title: "ELPAC Speaking: Average Performance Level by Grade",
        y_label: "Avg Speaking Performance Level (1-3)",
        scale: ValueScale::Level,
    };
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render a bar chart of `series` to a PNG at `out_path`.
    pub fn render_bar_chart(
        series: &GradeSeries,
        spec: &ChartSpec,
        size: ChartSize,
        out_path: &Path,
    ) -> Result<(), ChartError> {
        let to_error = |e: &dyn std::fmt::Display| ChartError::Drawing {
            path: out_path.display().to_string(),
            message: e.to_string(),
        };

        let (y_min, y_max) = Self::y_range(series, spec.scale);
        let labels: Vec<String> = series.grades().iter().map(|g| g.to_string()).collect();
        let n = series.len() as i32;

        let root = BitMapBackend::new(out_path, (size.width, size.height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| to_error(&e))?;

        let mut chart = ChartBuilder::on(&root)
            .caption(spec.title, (FONT, 30))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d((0..n).into_segmented(), y_min..y_max)
            .map_err(|e| to_error(&e))?;

        let x_formatter = |x: &SegmentValue<i32>| match x {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("Grade")
            .y_desc(spec.y_label)
            .x_label_formatter(&x_formatter)
            .axis_desc_style((FONT, 18))
            .draw()
            .map_err(|e| to_error(&e))?;

        let bars: Vec<(i32, f64)> = series
            .values()
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.value().map(|v| (i as i32, v.clamp(y_min, y_max))))
            .collect();
        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(BAR_COLOR.filled())
                    .margin(30)
                    .baseline(y_min)
                    .data(bars),
            )
            .map_err(|e| to_error(&e))?;

        let pad = (y_max - y_min) * 0.02;
        let label_style =
            TextStyle::from((FONT, 16).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
        let annotations: Vec<(i32, f64, String)> = series
            .values()
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let y = v.value().map_or(y_min, |v| v.clamp(y_min, y_max)) + pad;
                (i as i32, y, spec.scale.label(v))
            })
            .collect();
        chart
            .draw_series(annotations.into_iter().map(|(i, y, text)| {
                Text::new(text, (SegmentValue::CenterOf(i), y), label_style.clone())
            }))
            .map_err(|e| to_error(&e))?;

        root.present().map_err(|e| to_error(&e))?;
        debug!(path = %out_path.display(), title = spec.title, "Rendered chart");
        Ok(())
    }

    /// Vertical axis range for a series.
    pub fn y_range(series: &GradeSeries, scale: ValueScale) -> (f64, f64) {
        let max = series.max_value();
        match scale {
            ValueScale::Count => (0.0, Self::count_axis_top(max)),
            ValueScale::Percent => (0.0, Self::percent_axis_top(max)),
            ValueScale::Level => (LEVEL_AXIS_BOTTOM, Self::level_axis_top(max)),
        }
    }

    /// Next multiple of five above the maximum plus headroom, kept within 30 to 100.
    pub fn percent_axis_top(max: Option<f64>) -> f64 {
        let max = max.unwrap_or(0.0);
        let top = ((max / 5.0).ceil() * 5.0 + 5.0).min(PERCENT_AXIS_MAX_TOP);
        top.max(PERCENT_AXIS_MIN_TOP)
    }

    pub fn level_axis_top(max: Option<f64>) -> f64 {
        let top = (max.unwrap_or(0.0) + 0.15).max(2.0);
        ((top * 100.0).round() / 100.0).min(LEVEL_AXIS_MAX_TOP)
    }

    pub fn count_axis_top(max: Option<f64>) -> f64 {
        match max {
            Some(max) if max > 0.0 => (max * 1.15).ceil(),
            _ => 10.0,
        }
    }
}

/// Integer with thousands separators.
fn format_count(value: f64) -> String {
    let digits = (value.round() as i64).to_string();
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits.as_str()),
    };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("{sign}{out}")
}
