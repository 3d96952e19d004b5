//! Series module - grade axis and grade-indexed value series

mod axis;
mod builder;

use serde::Serialize;

pub use axis::{grades, GradeAxis, GradeLabel};
pub use builder::SeriesBuilder;

/// Value of one grade slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum GradeValue {
    Value(f64),
    /// The dataset does not cover this grade.
    NotApplicable,
    /// A row exists but its value is suppressed or unparseable.
    Unavailable,
}

impl GradeValue {
    pub fn value(self) -> Option<f64> {
        match self {
            GradeValue::Value(v) => Some(v),
            GradeValue::NotApplicable | GradeValue::Unavailable => None,
        }
    }

    pub fn is_value(self) -> bool {
        matches!(self, GradeValue::Value(_))
    }
}

/// One value per axis grade, in axis order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSeries {
    name: String,
    grades: Vec<GradeLabel>,
    values: Vec<GradeValue>,
}

impl GradeSeries {
    /// Build a series by evaluating every axis slot.
    pub fn from_axis<F>(name: impl Into<String>, axis: &GradeAxis, mut slot: F) -> Self
    where
        F: FnMut(GradeLabel) -> GradeValue,
    {
        let grades = axis.labels().to_vec();
        let values = grades.iter().map(|&g| slot(g)).collect();
        Self {
            name: name.into(),
            grades,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grades(&self) -> &[GradeLabel] {
        &self.grades
    }

    pub fn values(&self) -> &[GradeValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, grade: GradeLabel) -> Option<GradeValue> {
        let idx = self.grades.iter().position(|g| *g == grade)?;
        self.values.get(idx).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GradeLabel, GradeValue)> + '_ {
        self.grades.iter().copied().zip(self.values.iter().copied())
    }

    /// Numeric slots only, in axis order.
    pub fn defined_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(|v| v.value())
    }

    pub fn max_value(&self) -> Option<f64> {
        self.defined_values().reduce(f64::max)
    }
}
