//! Grade-Series Builder Module
//! Projects filtered, deduplicated rows onto the report's grade axis.

use super::{GradeAxis, GradeLabel, GradeSeries, GradeValue};
use crate::data::{saturating_total, AssessmentRecord, CaasppRecord, ElpacRecord, EnrollmentRecord};

/// Builds every chart series over one injected axis.
#[derive(Debug, Clone, Default)]
pub struct SeriesBuilder {
    axis: GradeAxis,
}

impl SeriesBuilder {
    pub fn new(axis: GradeAxis) -> Self {
        Self { axis }
    }

    pub fn axis(&self) -> &GradeAxis {
        &self.axis
    }

    /// Students per grade summed across school rows. A grade no school
    /// reports counts as zero students.
    pub fn enrollment_by_grade(&self, rows: &[EnrollmentRecord]) -> GradeSeries {
        GradeSeries::from_axis("Enrollment", &self.axis, |grade| {
            let total = saturating_total(rows.iter().map(|r| r.grade_count(grade)));
            GradeValue::Value(total as f64)
        })
    }

    /// Percent of CAASPP ELA students below standard (not met plus nearly met).
    pub fn pct_below_standard(&self, rows: &[CaasppRecord]) -> GradeSeries {
        self.assessment_series("CAASPP ELA % below standard", rows, caaspp_pct_below)
    }

    pub fn mean_scale_score(&self, rows: &[CaasppRecord]) -> GradeSeries {
        self.assessment_series("CAASPP ELA mean scale score", rows, |row| {
            row.mean_scale_score
                .map_or(GradeValue::Unavailable, GradeValue::Value)
        })
    }

    /// Tested count per grade; zero where the dataset has no row.
    pub fn tested_counts<R: AssessmentRecord>(&self, name: &str, rows: &[R]) -> GradeSeries {
        GradeSeries::from_axis(name, &self.axis, |grade| {
            let tested = find_grade(rows, grade).map_or(0, |row| row.tested());
            GradeValue::Value(tested as f64)
        })
    }

    /// Percent of ELPAC speaking-domain students below target (beginning plus moderate).
    pub fn pct_below_target(&self, rows: &[ElpacRecord]) -> GradeSeries {
        self.assessment_series("ELPAC speaking % below target", rows, elpac_pct_below)
    }

    /// Average ELPAC speaking level on the 1 to 3 scale.
    pub fn avg_speaking_level(&self, rows: &[ElpacRecord]) -> GradeSeries {
        self.assessment_series("ELPAC speaking average level", rows, |row| {
            if row.speaking_total == 0 {
                return GradeValue::NotApplicable;
            }
            // Level sums in f64; counts can sit at u64::MAX after parsing.
            let weighted = row.begin_count as f64
                + 2.0 * row.moderate_count as f64
                + 3.0 * row.developed_count as f64;
            GradeValue::Value(weighted / row.speaking_total as f64)
        })
    }

    fn assessment_series<R, F>(&self, name: &str, rows: &[R], value: F) -> GradeSeries
    where
        R: AssessmentRecord,
        F: Fn(&R) -> GradeValue,
    {
        GradeSeries::from_axis(name, &self.axis, |grade| {
            find_grade(rows, grade).map_or(GradeValue::NotApplicable, &value)
        })
    }
}

fn find_grade<R: AssessmentRecord>(rows: &[R], grade: GradeLabel) -> Option<&R> {
    rows.iter().find(|row| row.grade() == Some(grade))
}

fn caaspp_pct_below(row: &CaasppRecord) -> GradeValue {
    if let (Some(not_met), Some(nearly_met)) = (row.pct_not_met, row.pct_nearly_met) {
        return GradeValue::Value(not_met + nearly_met);
    }
    match (row.count_not_met, row.count_nearly_met) {
        (Some(_), Some(_)) if row.tested == 0 => GradeValue::NotApplicable,
        (Some(not_met), Some(nearly_met)) => {
            GradeValue::Value(100.0 * (not_met as f64 + nearly_met as f64) / row.tested as f64)
        }
        _ => GradeValue::Unavailable,
    }
}

fn elpac_pct_below(row: &ElpacRecord) -> GradeValue {
    if let (Some(begin), Some(moderate)) = (row.begin_pct, row.moderate_pct) {
        return GradeValue::Value(begin + moderate);
    }
    if row.speaking_total == 0 {
        return GradeValue::NotApplicable;
    }
    let below = row.begin_count as f64 + row.moderate_count as f64;
    GradeValue::Value(100.0 * below / row.speaking_total as f64)
}
