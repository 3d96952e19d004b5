//! Report Configuration Module
//! File locations, grade domains and chart settings for a report build.
//!
//! Defaults reproduce the published 2024-25 research file names. A JSON file
//! may override any subset of fields; environment variables and command-line
//! flags are layered on top of that with [`ReportConfig::apply_overrides`].

use crate::series::{grades, GradeAxis, GradeLabel};
use crate::stats::DEFAULT_BENCHMARK;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DATA_DIR_ENV: &str = "CA_REPORT_DATA_DIR";
pub const REPORTS_DIR_ENV: &str = "CA_REPORT_REPORTS_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("grade axis is empty")]
    EmptyAxis,

    #[error("chart size must be non-zero, got {width}x{height}")]
    ChartSize { width: u32, height: u32 },
}

/// Pixel size of each rendered chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChartSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartSize {
    fn default() -> Self {
        Self {
            width: 1300,
            height: 640,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub data_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub enrollment_file: PathBuf,
    pub caaspp_file: PathBuf,
    pub elpac_file: PathBuf,
    pub benchmark: f64,
    pub grade_axis: Vec<GradeLabel>,
    pub caaspp_grades: Vec<GradeLabel>,
    pub elpac_grades: Vec<GradeLabel>,
    pub all_students_id: String,
    pub include_charters: bool,
    pub render_charts: bool,
    pub chart: ChartSize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data_raw"),
            reports_dir: PathBuf::from("reports"),
            enrollment_file: PathBuf::from("cdenroll2425.txt"),
            caaspp_file: PathBuf::from("caaspp_2024_ela.txt"),
            elpac_file: PathBuf::from("elpac_2024_summative.txt"),
            benchmark: DEFAULT_BENCHMARK,
            grade_axis: grades(&["1", "2", "3", "4", "5"]),
            caaspp_grades: grades(&["3", "4", "5", "6", "7", "8", "11"]),
            elpac_grades: grades(&["1", "2", "3", "4", "5"]),
            all_students_id: "1".to_string(),
            include_charters: true,
            render_charts: true,
            chart: ChartSize::default(),
        }
    }
}

/// Directory and flag overrides from the environment or command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub reports_dir: Option<PathBuf>,
    pub exclude_charters: bool,
    pub no_charts: bool,
}

impl Overrides {
    /// Directory overrides read from `CA_REPORT_DATA_DIR` and `CA_REPORT_REPORTS_DIR`.
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var_os(DATA_DIR_ENV).map(PathBuf::from),
            reports_dir: std::env::var_os(REPORTS_DIR_ENV).map(PathBuf::from),
            ..Self::default()
        }
    }
}

impl ReportConfig {
    /// Load a JSON config; fields it omits keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides in order; later layers win.
    pub fn apply_overrides(mut self, layers: &[Overrides]) -> Self {
        for layer in layers {
            if let Some(dir) = &layer.data_dir {
                self.data_dir = dir.clone();
            }
            if let Some(dir) = &layer.reports_dir {
                self.reports_dir = dir.clone();
            }
            if layer.exclude_charters {
                self.include_charters = false;
            }
            if layer.no_charts {
                self.render_charts = false;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grade_axis.is_empty() {
            return Err(ConfigError::EmptyAxis);
        }
        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(ConfigError::ChartSize {
                width: self.chart.width,
                height: self.chart.height,
            });
        }
        Ok(())
    }

    pub fn axis(&self) -> GradeAxis {
        GradeAxis::new(self.grade_axis.clone())
    }

    pub fn enrollment_path(&self) -> PathBuf {
        self.resolve(&self.enrollment_file)
    }

    pub fn caaspp_path(&self) -> PathBuf {
        self.resolve(&self.caaspp_file)
    }

    pub fn elpac_path(&self) -> PathBuf {
        self.resolve(&self.elpac_file)
    }

    /// Relative data paths are taken from `data_dir`.
    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }
}
