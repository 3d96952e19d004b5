//! Report Pipeline Module
//! Reads, resolves, filters, projects and summarizes the three datasets for
//! one entity, then writes the report bundle.
//!
//! Every build re-reads its source files and keeps no state between calls,
//! so builds for different entities can run in parallel.

use crate::config::ReportConfig;
use crate::data::{
    saturating_total, AssessmentRecord, CaasppRecord, Dataset, ElpacRecord, EnrollmentRecord,
    EntityQuery, EntityResolver, EntityType, RowFilter, SchoolEnrollment,
};
use crate::error::{DataError, ReportError};
use crate::report::charts::{ChartSpec, StaticChartRenderer};
use crate::report::writer::{ReportWriter, SUMMARY_FILE};
use crate::series::{GradeLabel, GradeSeries, SeriesBuilder};
use crate::stats::{round1, Aggregator, SummaryResult};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use tracing::{info, info_span, warn};

/// Headline figures shown above the charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Headline {
    pub total_k5_enrollment: u64,
    /// Mean percent below standard over the axis grades CAASPP tests.
    pub avg_reading_gap_pct: Option<f64>,
    /// Mean percent below target over the axis grades ELPAC tests.
    pub avg_speaking_gap_pct: Option<f64>,
}

/// Everything a report shows for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    pub query: EntityQuery,
    pub summary: SummaryResult,
    pub headline: Headline,
    pub enrollment: GradeSeries,
    pub caaspp_pct_below: GradeSeries,
    pub caaspp_mean_scale_score: GradeSeries,
    pub caaspp_tested: GradeSeries,
    pub elpac_pct_below: GradeSeries,
    pub elpac_avg_level: GradeSeries,
    pub elpac_tested: GradeSeries,
    pub schools: Vec<SchoolEnrollment>,
}

impl ReportData {
    /// Chart file name, layout and series for each image in the bundle.
    pub fn charts(&self) -> [(&'static str, &'static ChartSpec, &GradeSeries); 4] {
        [
            ("enrollment_g1_5.png", &ChartSpec::ENROLLMENT, &self.enrollment),
            (
                "caaspp_ela_pct_below_g1_5.png",
                &ChartSpec::READING_GAP,
                &self.caaspp_pct_below,
            ),
            (
                "elpac_speaking_pct_below_g1_5.png",
                &ChartSpec::SPEAKING_GAP,
                &self.elpac_pct_below,
            ),
            (
                "elpac_speaking_level_g1_5.png",
                &ChartSpec::SPEAKING_LEVEL,
                &self.elpac_avg_level,
            ),
        ]
    }
}

/// Files produced by one report build.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutput {
    pub dir: PathBuf,
    pub summary_path: PathBuf,
    pub charts: Vec<PathBuf>,
}

pub struct ReportBuilder {
    config: ReportConfig,
}

impl ReportBuilder {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Derive all series and the summary for one entity. Any fatal data
    /// condition aborts the build before anything is written.
    pub fn build(&self, query: &EntityQuery) -> Result<ReportData, DataError> {
        let _span = info_span!("report", entity = %query).entered();
        info!("Building report data");

        let filter = RowFilter::new(
            self.config.all_students_id.clone(),
            self.config.include_charters,
        );
        let series = SeriesBuilder::new(self.config.axis());
        let aggregator = Aggregator::new(self.config.benchmark);

        let enrollment = self.enrollment_rows(query, &filter)?;
        let caaspp = self.caaspp_rows(query, &filter)?;
        let elpac = self.elpac_rows(query, &filter, &caaspp)?;

        let schools = SchoolEnrollment::table(&enrollment);
        let caaspp_pct_below = series.pct_below_standard(&caaspp);
        let elpac_pct_below = series.pct_below_target(&elpac);
        let headline = Headline {
            total_k5_enrollment: saturating_total(schools.iter().map(|s| s.total)),
            avg_reading_gap_pct: Aggregator::series_mean(&caaspp_pct_below).map(round1),
            avg_speaking_gap_pct: Aggregator::series_mean(&elpac_pct_below).map(round1),
        };
        let summary = aggregator.summarize(query, &caaspp);

        info!(
            schools = schools.len(),
            total_tested = summary.total_tested,
            weighted_average = ?summary.weighted_average,
            gap = ?summary.gap_vs_benchmark,
            "Report data ready"
        );

        Ok(ReportData {
            query: query.clone(),
            summary,
            headline,
            enrollment: series.enrollment_by_grade(&enrollment),
            caaspp_mean_scale_score: series.mean_scale_score(&caaspp),
            caaspp_tested: series.tested_counts("CAASPP ELA students tested", &caaspp),
            caaspp_pct_below,
            elpac_avg_level: series.avg_speaking_level(&elpac),
            elpac_tested: series.tested_counts("ELPAC speaking students tested", &elpac),
            elpac_pct_below,
            schools,
        })
    }

    /// Build one report and write its bundle directory. The bundle is
    /// replaced as a whole, so an error never leaves a partial one behind.
    pub fn generate(&self, query: &EntityQuery) -> Result<ReportOutput, ReportError> {
        let data = self.build(query)?;

        let dir = ReportWriter::bundle_dir(&self.config.reports_dir, &query.entity_name);
        let staged = ReportWriter::stage(&self.config.reports_dir, &query.entity_name)?;
        ReportWriter::write_summary(staged.path(), &data)?;

        let mut files = Vec::new();
        if self.config.render_charts {
            for (file, spec, series) in data.charts() {
                let path = staged.path().join(file);
                StaticChartRenderer::render_bar_chart(series, spec, self.config.chart, &path)?;
                files.push(file);
            }
        }
        ReportWriter::publish(staged, &dir)?;

        let charts: Vec<PathBuf> = files.into_iter().map(|file| dir.join(file)).collect();
        info!(dir = %dir.display(), charts = charts.len(), "Report written");
        Ok(ReportOutput {
            summary_path: dir.join(SUMMARY_FILE),
            dir,
            charts,
        })
    }

    /// Generate independent reports in parallel. A failing build does not
    /// affect the others; repeated queries are built once. A query whose
    /// bundle directory is already claimed by an earlier query fails with
    /// [`ReportError::BundleConflict`] instead of racing it.
    pub fn build_many(
        &self,
        queries: &[EntityQuery],
    ) -> Vec<(EntityQuery, Result<ReportOutput, ReportError>)> {
        let mut seen = HashSet::new();
        let unique: Vec<&EntityQuery> = queries.iter().filter(|q| seen.insert(*q)).collect();
        if unique.len() < queries.len() {
            warn!(
                requested = queries.len(),
                unique = unique.len(),
                "Skipping repeated report queries"
            );
        }

        let mut claimed: HashMap<PathBuf, String> = HashMap::new();
        let jobs: Vec<(&EntityQuery, Option<ReportError>)> = unique
            .into_iter()
            .map(|query| {
                let dir = ReportWriter::bundle_dir(&self.config.reports_dir, &query.entity_name);
                match claimed.entry(dir) {
                    Entry::Vacant(slot) => {
                        slot.insert(query.to_string());
                        (query, None)
                    }
                    Entry::Occupied(slot) => {
                        warn!(
                            entity = %query,
                            claimed_by = %slot.get(),
                            "Report bundle directory already claimed"
                        );
                        let conflict = ReportError::BundleConflict {
                            dir: slot.key().clone(),
                            claimed_by: slot.get().clone(),
                        };
                        (query, Some(conflict))
                    }
                }
            })
            .collect();

        jobs.into_par_iter()
            .map(|(query, conflict)| {
                let result = match conflict {
                    Some(err) => Err(err),
                    None => self.generate(query),
                };
                (query.clone(), result)
            })
            .collect()
    }

    fn enrollment_rows(
        &self,
        query: &EntityQuery,
        filter: &RowFilter,
    ) -> Result<Vec<EnrollmentRecord>, DataError> {
        let dataset = EnrollmentRecord::load(&self.config.enrollment_path())?;
        let matched = EntityResolver::resolve(query, dataset)?;
        let rows = filter.enrollment_rows(query, matched)?;
        Ok(RowFilter::dedup_by_school(rows))
    }

    fn caaspp_rows(
        &self,
        query: &EntityQuery,
        filter: &RowFilter,
    ) -> Result<Vec<CaasppRecord>, DataError> {
        let dataset = CaasppRecord::load(&self.config.caaspp_path())?;
        Self::assessment_rows(query, filter, dataset, &self.config.caaspp_grades)
    }

    /// ELPAC rows for the entity. Files without school names are matched
    /// on the school codes of the CAASPP rows in school mode; when none
    /// match, the speaking series stay empty rather than failing the build.
    fn elpac_rows(
        &self,
        query: &EntityQuery,
        filter: &RowFilter,
        caaspp: &[CaasppRecord],
    ) -> Result<Vec<ElpacRecord>, DataError> {
        let dataset = ElpacRecord::load(&self.config.elpac_path())?;
        if query.entity_type == EntityType::District || dataset.has_school_names {
            return Self::assessment_rows(query, filter, dataset, &self.config.elpac_grades);
        }

        let codes: BTreeSet<&str> = caaspp.iter().map(|row| row.school_code.trim()).collect();
        let kind = dataset.kind;
        let matched: Vec<ElpacRecord> = dataset
            .records
            .into_iter()
            .filter(|row| codes.contains(row.school_code.trim()))
            .collect();

        if matched.is_empty() {
            warn!(
                entity = %query,
                codes = codes.len(),
                "ELPAC file has no school names and no school code matched; speaking series left empty"
            );
            return Ok(Vec::new());
        }
        info!(rows = matched.len(), ?codes, "Matched ELPAC rows by school code");
        let rows = filter.assessment_rows(query, kind, matched, &self.config.elpac_grades)?;
        Ok(RowFilter::dedup_by_grade(rows))
    }

    fn assessment_rows<R: AssessmentRecord>(
        query: &EntityQuery,
        filter: &RowFilter,
        dataset: Dataset<R>,
        valid_grades: &[GradeLabel],
    ) -> Result<Vec<R>, DataError> {
        let kind = dataset.kind;
        let matched = EntityResolver::resolve(query, dataset)?;
        let rows = filter.assessment_rows(query, kind, matched, valid_grades)?;
        Ok(RowFilter::dedup_by_grade(rows))
    }
}
