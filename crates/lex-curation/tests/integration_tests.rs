//! End-to-end tests over a synthetic AI4I-shaped dataset.

use lex_curation::export::sha256_file;
use lex_curation::transform::{POWER_ESTIMATE, TEMP_DIFFERENCE, TOOL_WEAR_CATEGORY, power_estimate};
use lex_curation::utils::float_values;
use lex_curation::{
    CheckStatus, CurationConfig, CurationPipeline, CuratorInfo, FeatureTransformer,
    NormalizationMethod, OutlierMethod, Schema, SchemaValidator, SeverityPolicy, load_dataset,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HEADER: &str = "UDI,Product ID,Type,Air temperature [K],Process temperature [K],\
Rotational speed [rpm],Torque [Nm],Tool wear [min],Machine failure,TWF,HDF,PWF,OSF,RNF";

/// Write `rows` rows of seeded AI4I-like data to `dir/ai4i2020.csv`.
fn write_dataset(dir: &Path, rows: usize) -> PathBuf {
    let mut rng = StdRng::seed_from_u64(2020);
    let mut csv = String::from(HEADER);
    csv.push('\n');

    for udi in 1..=rows {
        let kind = match rng.gen_range(0..10) {
            0..=5 => 'L',
            6..=8 => 'M',
            _ => 'H',
        };
        let air: f64 = rng.gen_range(295.3..304.5);
        let process = air + rng.gen_range(8.5..11.5);
        let rpm: i64 = rng.gen_range(1168..2886);
        let torque: f64 = rng.gen_range(3.8..76.6);
        let wear: i64 = rng.gen_range(0..254);

        let twf = u8::from(wear > 200 && rng.gen_bool(0.05));
        let hdf = u8::from(process - air < 8.6 && rpm < 1380);
        let pwf = u8::from(!(3500.0..=9000.0).contains(&power_estimate(torque, rpm as f64)));
        let osf = u8::from(rng.gen_bool(0.005));
        let rnf = u8::from(rng.gen_bool(0.001));
        let failure = u8::from(twf + hdf + pwf + osf > 0);

        writeln!(
            csv,
            "{udi},{kind}{:05},{kind},{air:.1},{process:.1},{rpm},{torque:.1},{wear},{failure},{twf},{hdf},{pwf},{osf},{rnf}",
            10_000 + udi
        )
        .unwrap();
    }

    let path = dir.join("ai4i2020.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

fn config_for(output_dir: &Path) -> CurationConfig {
    CurationConfig::builder()
        .output_dir(output_dir)
        .curator(CuratorInfo::new("Test Curator", "Test Lab").with_contact("curator@example.org"))
        .build()
        .unwrap()
}

fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_well_formed_dataset_passes_validation() {
    let dir = TempDir::new().unwrap();
    let df = load_dataset(write_dataset(dir.path(), 10_000)).unwrap();

    let report = SchemaValidator::new(Schema::ai4i_2020())
        .validate(&df)
        .unwrap();

    assert_eq!(report.overall_status(), CheckStatus::Pass);
    assert_eq!(report.passed_count(), 5);
    assert!(report.columns.missing.is_empty());
    assert!(report.data_types.mismatches.is_empty());
    assert_eq!(report.duplicates.duplicate_rows, 0);
}

#[test]
fn test_missing_column_fails_but_reports_every_check() {
    let dir = TempDir::new().unwrap();
    let df = load_dataset(write_dataset(dir.path(), 10_000))
        .unwrap()
        .drop("Torque [Nm]")
        .unwrap();

    let report = SchemaValidator::new(Schema::ai4i_2020())
        .validate(&df)
        .unwrap();

    assert!(report.is_fatal());
    assert_eq!(report.columns.status, CheckStatus::Fail);
    assert_eq!(report.columns.missing, vec!["Torque [Nm]".to_string()]);
    assert_eq!(report.row_count.status, CheckStatus::Pass);
    assert_eq!(report.missing_values.status, CheckStatus::Pass);
    assert_eq!(report.duplicates.status, CheckStatus::Pass);
}

#[test]
fn test_full_pipeline_writes_every_output() {
    let dir = TempDir::new().unwrap();
    let input = write_dataset(dir.path(), 10_000);
    let output_dir = dir.path().join("output");

    let outcome = CurationPipeline::builder()
        .config(config_for(&output_dir))
        .build()
        .unwrap()
        .run(&input)
        .unwrap();

    assert_eq!(outcome.rows, 10_000);
    assert_eq!(outcome.columns, 17);
    assert_eq!(outcome.validation.overall_status(), CheckStatus::Pass);
    for column in [TEMP_DIFFERENCE, POWER_ESTIMATE, TOOL_WEAR_CATEGORY] {
        assert!(outcome.dataset.column(column).is_ok(), "missing {column}");
    }

    for file in [
        "AI4I_2020_curated.csv",
        "AI4I_2020_curated.json",
        "data_dictionary.json",
        "summary_statistics.csv",
        "export_log.json",
        "transformation_log.json",
        "provenance_record.json",
        "provenance.txt",
    ] {
        assert!(output_dir.join(file).is_file(), "missing {file}");
    }
    #[cfg(feature = "parquet")]
    assert!(output_dir.join("AI4I_2020_curated.parquet").is_file());

    for artifact in &outcome.artifacts {
        assert_eq!(sha256_file(&artifact.path).unwrap(), artifact.checksum_sha256);
        assert_eq!(artifact.checksum_sha256.len(), 64);
    }
}

#[test]
fn test_exported_csv_reloads_with_same_shape() {
    let dir = TempDir::new().unwrap();
    let input = write_dataset(dir.path(), 10_000);
    let output_dir = dir.path().join("output");

    let outcome = CurationPipeline::builder()
        .config(config_for(&output_dir))
        .build()
        .unwrap()
        .run(&input)
        .unwrap();

    let reloaded = load_dataset(output_dir.join("AI4I_2020_curated.csv")).unwrap();
    assert_eq!(reloaded.shape(), outcome.dataset.shape());
    assert_eq!(
        reloaded.get_column_names(),
        outcome.dataset.get_column_names()
    );
    assert_eq!(
        float_values(&reloaded, "UDI").unwrap(),
        float_values(&outcome.dataset, "UDI").unwrap()
    );
}

#[cfg(feature = "parquet")]
#[test]
fn test_parquet_round_trip_is_exact() {
    let dir = TempDir::new().unwrap();
    let input = write_dataset(dir.path(), 10_000);
    let output_dir = dir.path().join("output");

    let outcome = CurationPipeline::builder()
        .config(config_for(&output_dir))
        .build()
        .unwrap()
        .run(&input)
        .unwrap();

    let file = std::fs::File::open(output_dir.join("AI4I_2020_curated.parquet")).unwrap();
    let reloaded = ParquetReader::new(file).finish().unwrap();
    assert!(reloaded.equals_missing(&outcome.dataset));
}

#[test]
fn test_provenance_mirrors_logs_in_order() {
    let dir = TempDir::new().unwrap();
    let input = write_dataset(dir.path(), 10_000);
    let output_dir = dir.path().join("output");

    let outcome = CurationPipeline::builder()
        .config(config_for(&output_dir))
        .build()
        .unwrap()
        .run(&input)
        .unwrap();

    let record: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&outcome.provenance_record).unwrap())
            .unwrap();

    let exported: Vec<&str> = record["exports"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["filename"].as_str().unwrap())
        .collect();
    let artifacts: Vec<&str> = outcome
        .artifacts
        .iter()
        .map(|a| a.filename.as_str())
        .collect();
    assert_eq!(exported, artifacts);

    let operations: Vec<&str> = record["transformations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["operation"].as_str().unwrap())
        .collect();
    assert_eq!(
        operations,
        vec!["outlier_detection", "normalization", "feature_derivation"]
    );

    let steps: Vec<&str> = record["workflow_steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        steps,
        vec![
            "data_loading",
            "structural_validation",
            "outlier_detection",
            "normalization",
            "feature_derivation",
            "export",
        ]
    );
    assert_eq!(record["curator"]["name"], "Test Curator");
    assert!(record["environment"]["packages"]["lex-curation"].is_string());

    let summary = std::fs::read_to_string(&outcome.provenance_summary).unwrap();
    assert!(summary.contains("PROVENANCE SUMMARY"));
    assert!(summary.contains("Test Curator"));
}

#[test]
fn test_strict_row_count_aborts_before_writing() {
    let dir = TempDir::new().unwrap();
    let input = write_dataset(dir.path(), 9_990);
    let output_dir = dir.path().join("output");

    let config = CurationConfig::builder()
        .output_dir(&output_dir)
        .severity(SeverityPolicy::strict())
        .build()
        .unwrap();
    let err = CurationPipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(&input)
        .unwrap_err();

    assert_eq!(err.error_code(), "STRUCTURAL_VALIDATION_FAILURE");
    assert!(!output_dir.exists());
}

#[test]
fn test_row_count_mismatch_is_a_warning_by_default() {
    let dir = TempDir::new().unwrap();
    let input = write_dataset(dir.path(), 9_990);
    let output_dir = dir.path().join("output");

    let outcome = CurationPipeline::builder()
        .config(config_for(&output_dir))
        .build()
        .unwrap()
        .run(&input)
        .unwrap();

    assert_eq!(outcome.validation.row_count.status, CheckStatus::Warn);
    assert_eq!(outcome.rows, 9_990);
    assert!(outcome.warnings.iter().any(|w| w.contains("9990")));
}

#[test]
fn test_iqr_flags_fewer_rows_as_threshold_grows() {
    let dir = TempDir::new().unwrap();
    let df = load_dataset(write_dataset(dir.path(), 10_000)).unwrap();
    let mut transformer = FeatureTransformer::default();

    let reports: Vec<_> = [1.5, 2.0, 3.0]
        .into_iter()
        .map(|k| transformer.detect_outliers(&df, OutlierMethod::Iqr, k).unwrap())
        .collect();

    for pair in reports.windows(2) {
        for (loose, tight) in pair[0].features.iter().zip(&pair[1].features) {
            assert_eq!(loose.feature, tight.feature);
            assert!(tight.count <= loose.count);
        }
    }
    assert_eq!(transformer.records().len(), 3);
}

#[test]
fn test_min_max_scales_to_unit_interval() {
    let df = df!["x" => [10.0f64, 20.0, 30.0]].unwrap();
    let mut transformer = FeatureTransformer::new(vec!["x".to_string()]);

    let (scaled, params) = transformer
        .normalize(&df, NormalizationMethod::MinMax)
        .unwrap();

    assert_eq!(float_values(&scaled, "x").unwrap(), vec![0.0, 0.5, 1.0]);
    let fitted = params.get("x").unwrap();
    assert_eq!(fitted.center(), 10.0);
    assert_eq!(fitted.spread(), 20.0);
}

#[test]
fn test_standard_scaling_centers_and_unit_variance() {
    let dir = TempDir::new().unwrap();
    let df = load_dataset(write_dataset(dir.path(), 10_000)).unwrap();
    let mut transformer = FeatureTransformer::default();

    let (scaled, _) = transformer
        .normalize(&df, NormalizationMethod::Standard)
        .unwrap();

    for feature in transformer.scale_set() {
        let values = float_values(&scaled, feature).unwrap();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        assert_close(mean, 0.0, 1e-9);
        assert_close(variance, 1.0, 1e-9);
    }
}

#[test]
fn test_scaling_is_invertible_for_every_method() {
    let dir = TempDir::new().unwrap();
    let df = load_dataset(write_dataset(dir.path(), 10_000)).unwrap();

    for method in [
        NormalizationMethod::Standard,
        NormalizationMethod::MinMax,
        NormalizationMethod::Robust,
    ] {
        let mut transformer = FeatureTransformer::default();
        let (scaled, params) = transformer.normalize(&df, method).unwrap();
        let restored = transformer.inverse_scaling(&scaled, &params).unwrap();

        for feature in transformer.scale_set() {
            let original = float_values(&df, feature).unwrap();
            let roundtrip = float_values(&restored, feature).unwrap();
            for (a, b) in original.iter().zip(&roundtrip) {
                assert_close(*b, *a, 1e-6);
            }
        }
    }
}

#[test]
fn test_power_estimate_formula() {
    assert_close(power_estimate(40.0, 1575.0), 6597.34, 0.01);
    assert_eq!(power_estimate(0.0, 1500.0), 0.0);
}

#[test]
fn test_zscore_robust_pipeline_records_methods() {
    let dir = TempDir::new().unwrap();
    let input = write_dataset(dir.path(), 10_000);
    let output_dir = dir.path().join("output");

    let config = CurationConfig::builder()
        .output_dir(&output_dir)
        .outlier_method(OutlierMethod::Zscore)
        .outlier_threshold(3.0)
        .normalization(NormalizationMethod::Robust)
        .build()
        .unwrap();
    let outcome = CurationPipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(&input)
        .unwrap();

    assert_eq!(outcome.outliers.method, OutlierMethod::Zscore);
    assert_eq!(outcome.scaling.method, NormalizationMethod::Robust);

    let log: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(&outcome.transformation_log).unwrap(),
    )
    .unwrap();
    assert_eq!(log[0]["method"], "zscore");
    assert_eq!(log[1]["method"], "robust");
}
