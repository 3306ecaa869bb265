//! Integration test: load → clean → split → train → evaluate → persist

mod common;

use kolosal_churn::config::PipelineConfig;
use kolosal_churn::dataset::{DatasetPreparer, FeatureKind};
use kolosal_churn::error::ChurnError;
use kolosal_churn::export::{ArtifactStore, MANIFEST_FILE};
use kolosal_churn::pipeline::TrainingPipeline;
use polars::prelude::*;

fn pipeline_in(dir: &std::path::Path) -> TrainingPipeline {
    let config = PipelineConfig::default().with_artifact_dir(dir.join("ml_models"));
    TrainingPipeline::new(config).unwrap()
}

#[test]
fn test_full_training_run_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("clientes.csv");
    let data = common::customers(400, 11);
    data.write_csv(&csv);

    let pipeline = pipeline_in(dir.path());
    let outcome = pipeline.run(&csv).unwrap();
    let report = &outcome.report;

    assert_eq!(report.dataset.rows_loaded, 400);
    assert_eq!(report.dataset.rows_dropped, 0);
    assert_eq!(report.dataset.train_size + report.dataset.test_size + report.dataset.holdout_excluded, 400);
    assert_eq!(report.confusion_matrix.counts.total(), report.dataset.test_size);
    assert_eq!(report.dataset.label_source, "fuga");

    let m = report.metrics;
    for v in [m.accuracy, m.precision, m.recall, m.f1_score] {
        assert!((0.0..=1.0).contains(&v));
    }
    assert!(m.accuracy > 0.7, "accuracy {} too low", m.accuracy);
    assert!(m.roc_auc.is_some());
    assert!(report.advanced_metrics.specificity + report.advanced_metrics.sensitivity <= 2.0);

    let total: f64 = report.feature_importance.iter().map(|f| f.importance).sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert_eq!(report.feature_importance.len(), 9);

    let store = pipeline.store();
    assert!(store.exists());
    assert!(store.root().join(MANIFEST_FILE).is_file());
}

#[test]
fn test_configured_delimiter_matches_comma_run() {
    let dir = tempfile::tempdir().unwrap();
    let data = common::customers(300, 21);
    let csv = dir.path().join("clientes.csv");
    let semi = dir.path().join("clientes_pe.csv");
    data.write_csv(&csv);
    data.write_delimited(&semi, b';');

    let comma = pipeline_in(dir.path()).run(&csv).unwrap();

    let config = PipelineConfig::default()
        .with_artifact_dir(dir.path().join("semicolon"))
        .with_delimiter(';');
    let semicolon = TrainingPipeline::new(config).unwrap().run(&semi).unwrap();
    assert_eq!(semicolon.artifact.classifier(), comma.artifact.classifier());
    assert_eq!(semicolon.report.metrics, comma.report.metrics);

    // without the setting the whole header is one column
    let err = pipeline_in(dir.path()).run(&semi).unwrap_err();
    assert!(matches!(err, ChurnError::Schema { .. }), "{:?}", err);
}

#[test]
fn test_missing_occupation_column_is_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let data = common::customers(100, 3);
    let df = data.frame_without("ocupacion");

    let pipeline = pipeline_in(dir.path());
    let err = pipeline.run_frame(&df).unwrap_err();
    match &err {
        ChurnError::Schema { missing } => {
            assert_eq!(missing.len(), 1);
            assert!(missing[0].contains("occupation"));
        }
        other => panic!("expected schema error, got {:?}", other),
    }
    assert!(err.to_string().contains("ocupacion (occupation)"));
    assert!(!pipeline.store().exists());
}

#[test]
fn test_missing_label_column_names_candidates() {
    let data = common::customers(50, 3);
    let df = data.frame_without("fuga");
    let err = DatasetPreparer::default().prepare_frame(&df).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("fuga") && msg.contains("cliente_activo"), "{}", msg);
}

#[test]
fn test_active_flag_gives_same_labels_as_churn_flag() {
    let data = common::customers(200, 5);
    let preparer = DatasetPreparer::default();

    let direct = preparer.prepare_frame(&data.frame()).unwrap();
    let inverted = preparer.prepare_frame(&data.frame_with_label("cliente_activo")).unwrap();

    assert!(!direct.summary.label_inverted);
    assert!(inverted.summary.label_inverted);
    assert_eq!(inverted.summary.label_source, "cliente_activo");
    assert_eq!(direct.y_train, inverted.y_train);
    assert_eq!(direct.y_test, inverted.y_test);
    assert!((direct.summary.churn_rate - data.churn_count() as f64 / 200.0).abs() < 1e-12);
}

#[test]
fn test_same_seed_reproduces_run() {
    let dir = tempfile::tempdir().unwrap();
    let df = common::customers(300, 21).frame();
    let pipeline = pipeline_in(dir.path());

    let a = pipeline.fit_frame(&df).unwrap();
    let b = pipeline.fit_frame(&df).unwrap();

    assert_eq!(a.artifact.codec(), b.artifact.codec());
    assert_eq!(a.artifact.classifier(), b.artifact.classifier());
    assert_eq!(a.report.metrics, b.report.metrics);
    assert_eq!(a.report.confusion_matrix.counts, b.report.confusion_matrix.counts);
    // nothing persisted by fit_frame
    assert!(!pipeline.store().exists());
}

#[test]
fn test_codec_sees_training_rows_only() {
    let data = common::customers(200, 8);
    let preparer = DatasetPreparer::default();
    let prepared = preparer.prepare_frame(&data.frame()).unwrap();

    let edad = prepared.codec.scaler().get("edad").unwrap();
    let n_train = prepared.x_train.nrows() as f64;
    // standardized training column has zero mean and unit population variance
    let col = prepared.x_train.column(0);
    assert!((col.sum() / n_train).abs() < 1e-9);
    assert!((col.mapv(|v| v * v).sum() / n_train - 1.0).abs() < 1e-9);
    assert!(edad.std > 0.0);

    let kinds: Vec<FeatureKind> = prepared.codec.spec().features().iter().map(|f| f.kind).collect();
    assert_eq!(kinds[0], FeatureKind::Numeric);
    assert_eq!(kinds[1], FeatureKind::Categorical);
}

#[test]
fn test_unseen_holdout_categories_are_excluded() {
    let mut data = common::customers(200, 13);
    for i in 0..10 {
        data.ocupacion[i * 17] = format!("Rara{}", i);
    }
    let df = data.frame();
    let preparer = DatasetPreparer::default();

    // where each rare row lands under the default seed
    let clean = preparer.clean(preparer.derive_label(&df).unwrap());
    let split = preparer.split(&clean.rows, 0.2, 42).unwrap();
    let rare_in_holdout = split
        .holdout
        .iter()
        .filter(|r| r.values[6].to_string().starts_with("Rara"))
        .count();

    let prepared = preparer.prepare_frame(&df).unwrap();
    assert_eq!(prepared.summary.holdout_excluded, rare_in_holdout);
    assert_eq!(prepared.summary.test_size, split.holdout.len() - rare_in_holdout);
    assert_eq!(prepared.x_test.nrows(), prepared.summary.test_size);
}

#[test]
fn test_incomplete_rows_are_dropped_before_split() {
    let data = common::customers(120, 4);
    let mut df = data.frame();
    let ingresos: Vec<Option<f64>> = data
        .ingresos_mensuales
        .iter()
        .enumerate()
        .map(|(i, v)| if i % 10 == 0 { None } else { Some(*v) })
        .collect();
    df.with_column(Series::new("ingresos_mensuales".into(), ingresos)).unwrap();

    let prepared = DatasetPreparer::default().prepare_frame(&df).unwrap();
    assert_eq!(prepared.summary.rows_dropped, 12);
    assert_eq!(prepared.summary.usable_rows, 108);
}
