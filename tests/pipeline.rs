use ca_school_report::data::DatasetKind;
use ca_school_report::report::{ReportWriter, SUMMARY_FILE};
use ca_school_report::series::{GradeLabel, GradeValue};
use ca_school_report::{DataError, EntityQuery, ReportBuilder, ReportConfig, ReportError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ENROLLMENT: &str = "\
AggregateLevel\tDistrictName\tSchoolName\tCharter\tReportingCategory\tTOTAL_ENR\tGR_TK\tGR_KN\tGR_01\tGR_02\tGR_03\tGR_04\tGR_05
D\tAlameda Unified\t\tN\tTA\t1000\t10\t120\t110\t110\t110\t110\t130
S\tAlameda Unified\tLincoln Elementary\tN\tTA\t500\t10\t80\t80\t80\t80\t80\t90
S\tAlameda Unified\tLincoln Elementary\tN\tGF\t250\t0\t40\t40\t40\t40\t40\t50
S\tAlameda Unified\tBay Charter\tY\tTA\t200\t0\t40\t30\t30\t30\t30\t40
S\tOakland Unified\tPeralta Elementary\tN\tTA\t300\t0\t50\t50\t50\t50\t50\t50
";

const CAASPP: &str = "\
County Code^District Code^School Code^District Name^School Name^Test Year^Student Group ID^Grade^Total Students Tested^Total Students Tested with Scores^Mean Scale Score^Percentage Standard Not Met^Percentage Standard Nearly Met
01^61119^0000000^Alameda Unified^^2024^1^03^100^100^2450.0^20.00^25.00
01^61119^0000000^Alameda Unified^^2024^1^04^300^300^2500.0^15.00^20.00
01^61119^0000000^Alameda Unified^^2024^1^05^100^100^2600.0^10.00^15.00
01^61119^0000000^Alameda Unified^^2024^1^05^50^50^2000.0^60.00^20.00
01^61119^0000000^Alameda Unified^^2024^128^03^30^30^2300.0^50.00^30.00
01^61119^0000000^Alameda Unified^^2024^1^13^500^500^2520.0^15.00^20.00
01^61119^0112607^Alameda Unified^Lincoln Elementary^2024^1^03^40^40^2400.0^30.00^30.00
01^61259^0000000^Oakland Unified^^2024^1^03^900^900^2380.0^40.00^25.00
";

const ELPAC: &str = "\
DistrictName^SchoolName^SchoolCode^TypeID^StudentGroupID^Grade^SpeakingDomainTotal^SpeakingDomainBeginCount^SpeakingDomainModerateCount^SpeakingDomainDevelopedCount
Alameda Unified^^0000000^02^1^01^100^20^30^50
Alameda Unified^^0000000^02^1^02^200^40^60^100
Alameda Unified^^0000000^02^1^03^50^5^10^35
Alameda Unified^^0000000^05^1^01^900^300^300^300
Alameda Unified^Lincoln Elementary^0112607^07^1^01^40^10^10^20
Oakland Unified^^0000000^02^1^01^300^100^100^100
";

const ELPAC_WITHOUT_SCHOOL_NAMES: &str = "\
DistrictName^SchoolCode^TypeID^StudentGroupID^Grade^SpeakingDomainTotal^SpeakingDomainBeginCount^SpeakingDomainModerateCount^SpeakingDomainDevelopedCount
Alameda Unified^0000000^02^1^01^100^20^30^50
Alameda Unified^0112607^07^1^01^40^10^10^20
Alameda Unified^0112607^07^1^02^20^2^3^15
Alameda Unified^0130419^07^1^01^60^30^20^10
";

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("cdenroll2425.txt"), ENROLLMENT).unwrap();
    fs::write(data.join("caaspp_2024_ela.txt"), CAASPP).unwrap();
    fs::write(data.join("elpac_2024_summative.txt"), ELPAC).unwrap();
    dir
}

fn config(root: &Path) -> ReportConfig {
    ReportConfig {
        data_dir: root.join("data"),
        reports_dir: root.join("reports"),
        render_charts: false,
        ..ReportConfig::default()
    }
}

fn values(series: &ca_school_report::series::GradeSeries) -> Vec<GradeValue> {
    series.values().to_vec()
}

#[test]
fn test_district_report_series_and_summary() {
    let dir = workspace();
    let builder = ReportBuilder::new(config(dir.path()));

    let data = builder.build(&EntityQuery::district("Alameda Unified")).unwrap();

    // School rows only, all-students category, charters included
    assert_eq!(
        values(&data.enrollment),
        vec![
            GradeValue::Value(110.0),
            GradeValue::Value(110.0),
            GradeValue::Value(110.0),
            GradeValue::Value(110.0),
            GradeValue::Value(130.0),
        ]
    );
    assert_eq!(data.headline.total_k5_enrollment, 690);
    assert_eq!(data.schools.len(), 2);
    assert_eq!(data.schools[0].school, "Bay Charter");

    // Grades 1 and 2 are not tested; the duplicate grade 5 row loses
    assert_eq!(
        values(&data.caaspp_pct_below),
        vec![
            GradeValue::NotApplicable,
            GradeValue::NotApplicable,
            GradeValue::Value(45.0),
            GradeValue::Value(35.0),
            GradeValue::Value(25.0),
        ]
    );
    assert_eq!(
        data.caaspp_tested.get(GradeLabel::Grade(4)),
        Some(GradeValue::Value(300.0))
    );
    assert_eq!(
        data.caaspp_tested.get(GradeLabel::Grade(1)),
        Some(GradeValue::Value(0.0))
    );
    assert_eq!(data.headline.avg_reading_gap_pct, Some(35.0));

    assert_eq!(data.summary.total_tested, 500);
    assert_eq!(data.summary.weighted_average, Some(2510.0));
    assert_eq!(data.summary.gap_vs_benchmark, Some(10.0));
}

#[test]
fn test_district_elpac_ignores_county_rows() {
    let dir = workspace();
    let builder = ReportBuilder::new(config(dir.path()));

    let data = builder.build(&EntityQuery::district("Alameda Unified")).unwrap();

    assert_eq!(
        values(&data.elpac_pct_below),
        vec![
            GradeValue::Value(50.0),
            GradeValue::Value(50.0),
            GradeValue::Value(30.0),
            GradeValue::NotApplicable,
            GradeValue::NotApplicable,
        ]
    );
    assert_eq!(
        data.elpac_avg_level.get(GradeLabel::Grade(1)),
        Some(GradeValue::Value(2.3))
    );
    assert_eq!(
        data.elpac_tested.get(GradeLabel::Grade(1)),
        Some(GradeValue::Value(100.0))
    );
    assert_eq!(data.headline.avg_speaking_gap_pct, Some(43.3));
}

#[test]
fn test_school_report() {
    let dir = workspace();
    let builder = ReportBuilder::new(config(dir.path()));

    let data = builder.build(&EntityQuery::school("Lincoln Elementary")).unwrap();

    assert_eq!(
        data.enrollment.get(GradeLabel::Grade(1)),
        Some(GradeValue::Value(80.0))
    );
    assert_eq!(data.schools.len(), 1);
    assert_eq!(
        data.caaspp_pct_below.get(GradeLabel::Grade(3)),
        Some(GradeValue::Value(60.0))
    );
    assert_eq!(
        data.elpac_pct_below.get(GradeLabel::Grade(1)),
        Some(GradeValue::Value(50.0))
    );
    assert_eq!(data.summary.weighted_average, Some(2400.0));
    assert_eq!(data.summary.gap_vs_benchmark, Some(-100.0));
    assert_eq!(data.summary.total_tested, 40);
}

#[test]
fn test_query_suffix_and_partial_names() {
    let dir = workspace();
    let builder = ReportBuilder::new(config(dir.path()));

    let full = builder
        .build(&EntityQuery::district("Alameda Unified School District"))
        .unwrap();
    let partial = builder.build(&EntityQuery::district("alameda")).unwrap();

    assert_eq!(full.summary.weighted_average, Some(2510.0));
    assert_eq!(partial.enrollment, full.enrollment);
    assert_eq!(partial.summary.total_tested, full.summary.total_tested);
}

#[test]
fn test_excluding_charters() {
    let dir = workspace();
    let config = ReportConfig {
        include_charters: false,
        ..config(dir.path())
    };

    let data = ReportBuilder::new(config)
        .build(&EntityQuery::district("Alameda Unified"))
        .unwrap();

    assert_eq!(
        data.enrollment.get(GradeLabel::Grade(1)),
        Some(GradeValue::Value(80.0))
    );
    assert_eq!(data.headline.total_k5_enrollment, 490);
}

#[test]
fn test_generate_writes_summary_bundle() {
    let dir = workspace();
    let builder = ReportBuilder::new(config(dir.path()));

    let output = builder
        .generate(&EntityQuery::district("Alameda Unified"))
        .unwrap();

    assert_eq!(
        output.dir,
        dir.path().join("reports").join("Alameda_Unified_Report")
    );
    assert_eq!(output.summary_path, output.dir.join(SUMMARY_FILE));
    assert!(output.charts.is_empty());

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output.summary_path).unwrap()).unwrap();
    assert_eq!(json["summary"]["weighted_average"], 2510.0);
    assert_eq!(json["summary"]["entity_type"], "district");
    assert_eq!(json["enrollment"]["grades"][0], "1");
    assert_eq!(json["enrollment"]["values"][0]["value"], 110.0);
    assert_eq!(
        json["caaspp_pct_below"]["values"][0]["status"],
        "not_applicable"
    );
}

#[test]
fn test_unknown_entity_writes_nothing() {
    let dir = workspace();
    let builder = ReportBuilder::new(config(dir.path()));

    let err = builder
        .generate(&EntityQuery::district("Nowhere Unified"))
        .unwrap_err();

    assert!(matches!(
        err,
        ReportError::Data(DataError::EntityNotFound {
            dataset: DatasetKind::Enrollment,
            ..
        })
    ));
    assert!(!dir.path().join("reports").join("Nowhere_Unified_Report").exists());
}

#[test]
fn test_missing_source_file() {
    let dir = workspace();
    fs::remove_file(dir.path().join("data").join("elpac_2024_summative.txt")).unwrap();
    let builder = ReportBuilder::new(config(dir.path()));

    let err = builder
        .build(&EntityQuery::district("Alameda Unified"))
        .unwrap_err();
    assert!(matches!(
        err,
        DataError::MissingFile {
            dataset: DatasetKind::Elpac,
            ..
        }
    ));
}

#[test]
fn test_build_many_isolates_failures() {
    let dir = workspace();
    let builder = ReportBuilder::new(config(dir.path()));

    let queries = vec![
        EntityQuery::district("Alameda Unified"),
        EntityQuery::district("Nowhere Unified"),
        EntityQuery::district("Alameda Unified"),
        EntityQuery::school("Lincoln Elementary"),
    ];
    let results = builder.build_many(&queries);

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, queries[0]);
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_err());
    assert!(results[2].1.is_ok());
    assert!(dir
        .path()
        .join("reports")
        .join("Lincoln_Elementary_Report")
        .join(SUMMARY_FILE)
        .exists());
}

#[test]
fn test_school_report_matches_elpac_by_code() {
    let dir = workspace();
    fs::write(
        dir.path().join("data").join("elpac_2024_summative.txt"),
        ELPAC_WITHOUT_SCHOOL_NAMES,
    )
    .unwrap();
    let builder = ReportBuilder::new(config(dir.path()));

    let data = builder.build(&EntityQuery::school("Lincoln Elementary")).unwrap();

    assert_eq!(
        values(&data.elpac_pct_below),
        vec![
            GradeValue::Value(50.0),
            GradeValue::Value(25.0),
            GradeValue::NotApplicable,
            GradeValue::NotApplicable,
            GradeValue::NotApplicable,
        ]
    );
    assert_eq!(data.summary.weighted_average, Some(2400.0));

    // District reports still read the district rows
    let district = builder.build(&EntityQuery::district("Alameda Unified")).unwrap();
    assert_eq!(
        district.elpac_tested.get(GradeLabel::Grade(1)),
        Some(GradeValue::Value(100.0))
    );
}

#[test]
fn test_school_report_without_elpac_match_keeps_other_data() {
    let dir = workspace();
    let unmatched = ELPAC_WITHOUT_SCHOOL_NAMES.replace("0112607", "0999999");
    fs::write(dir.path().join("data").join("elpac_2024_summative.txt"), unmatched).unwrap();
    let builder = ReportBuilder::new(config(dir.path()));

    let data = builder.build(&EntityQuery::school("Lincoln Elementary")).unwrap();

    assert!(data
        .elpac_pct_below
        .values()
        .iter()
        .all(|v| *v == GradeValue::NotApplicable));
    assert_eq!(data.headline.avg_speaking_gap_pct, None);
    assert_eq!(
        data.enrollment.get(GradeLabel::Grade(1)),
        Some(GradeValue::Value(80.0))
    );
    assert_eq!(data.summary.total_tested, 40);
}

#[test]
fn test_blank_query_is_not_found() {
    let dir = workspace();
    let builder = ReportBuilder::new(config(dir.path()));

    let err = builder.build(&EntityQuery::district("   ")).unwrap_err();
    assert!(matches!(err, DataError::EntityNotFound { .. }));
}

#[test]
fn test_rerun_replaces_bundle_contents() {
    let dir = workspace();
    let builder = ReportBuilder::new(config(dir.path()));
    let bundle = dir.path().join("reports").join("Alameda_Unified_Report");
    fs::create_dir_all(&bundle).unwrap();
    fs::write(bundle.join("enrollment_g1_5.png"), b"stale").unwrap();

    let output = builder
        .generate(&EntityQuery::district("Alameda Unified"))
        .unwrap();

    assert_eq!(output.dir, bundle);
    assert!(bundle.join(SUMMARY_FILE).exists());
    assert!(!bundle.join("enrollment_g1_5.png").exists());
    assert_eq!(fs::read_dir(dir.path().join("reports")).unwrap().count(), 1);
}

#[test]
fn test_failed_write_leaves_no_partial_bundle() {
    let dir = workspace();
    let builder = ReportBuilder::new(config(dir.path()));
    let reports = dir.path().join("reports");
    fs::create_dir_all(&reports).unwrap();
    // A plain file where the bundle directory should go
    fs::write(reports.join("Alameda_Unified_Report"), b"not a directory").unwrap();

    let err = builder
        .generate(&EntityQuery::district("Alameda Unified"))
        .unwrap_err();

    assert!(matches!(err, ReportError::Write { .. }));
    let entries: Vec<String> = fs::read_dir(&reports)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries, vec!["Alameda_Unified_Report"]);
}

#[test]
fn test_chart_bundle_is_complete_or_absent() {
    let dir = workspace();
    let config = ReportConfig {
        render_charts: true,
        ..config(dir.path())
    };
    let builder = ReportBuilder::new(config);
    let bundle = ReportWriter::bundle_dir(&dir.path().join("reports"), "Alameda Unified");

    // Drawing text needs a system font, so either outcome is possible here
    match builder.generate(&EntityQuery::district("Alameda Unified")) {
        Ok(output) => {
            assert_eq!(output.charts.len(), 4);
            assert!(output.charts.iter().all(|path| path.exists()));
            assert!(output.summary_path.exists());
        }
        Err(err) => {
            assert!(matches!(err, ReportError::Chart(_)));
            assert!(!bundle.exists());
            assert_eq!(fs::read_dir(dir.path().join("reports")).unwrap().count(), 0);
        }
    }
}

#[test]
fn test_build_many_rejects_shared_bundle_dir() {
    let dir = workspace();
    let builder = ReportBuilder::new(config(dir.path()));

    let queries = vec![
        EntityQuery::school("Lincoln Elementary"),
        EntityQuery::district("Lincoln Elementary"),
    ];
    let results = builder.build_many(&queries);

    assert_eq!(results.len(), 2);
    assert!(results[0].1.is_ok());
    assert!(matches!(
        results[1].1,
        Err(ReportError::BundleConflict { .. })
    ));
    let output = results[0].1.as_ref().unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output.summary_path).unwrap()).unwrap();
    assert_eq!(json["summary"]["entity_type"], "school");
}
