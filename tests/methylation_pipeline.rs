//! Integration tests for the methylation analysis.

use brca_methylation::prelude::*;
use std::collections::HashSet;
use std::fs;
use tempfile::TempDir;

fn small_cohort() -> SyntheticData {
    generate_synthetic(&SyntheticConfig::small()).unwrap()
}

#[test]
fn test_elastic_net_finds_planted_probes() {
    let data = small_cohort();
    let labels = data.cohort.labels().unwrap();
    let config = ElasticNetConfig::default().with_folds(5);

    let fit = cv_elastic_net(&data.cohort.betas, &labels, &config).unwrap();
    let selected: Vec<&str> = fit.nonzero().into_iter().map(|(probe, _)| probe).collect();

    assert!(!selected.is_empty(), "Model should keep at least one probe");
    assert!(
        selected.iter().any(|p| data.ground_truth.is_planted(p)),
        "Selected probes {:?} should include a planted probe",
        selected
    );
    assert!(fit.lambda <= fit.lambda_1se);
}

#[test]
fn test_classifiers_beat_majority_baseline() {
    let data = generate_synthetic(
        &SyntheticConfig::new("balanced")
            .with_dimensions(30, 30, 100)
            .with_planted(8, 0.35)
            .with_incomplete(0),
    )
    .unwrap();
    let labels = data.cohort.labels().unwrap();
    let partition = stratified_split(&labels, 0.75, 42).unwrap();
    let train = data.cohort.betas.subset_samples(&partition.train).unwrap();
    let test = data.cohort.betas.subset_samples(&partition.test).unwrap();
    let train_labels = Partition::select(&partition.train, &labels);
    let test_labels = Partition::select(&partition.test, &labels);

    let n_tumor = test_labels.iter().filter(|l| l.is_positive()).count();
    let baseline = n_tumor.max(test_labels.len() - n_tumor) as f64 / test_labels.len() as f64;

    let fit = cv_elastic_net(&train, &train_labels, &ElasticNetConfig::default()).unwrap();
    let en = ConfusionMatrix::from_predictions(&fit.predict(&test).unwrap(), &test_labels).unwrap();
    assert!(en.accuracy() > baseline, "Elastic Net: {}", en);

    let predicted = knn(&train, &test, &train_labels, 9).unwrap();
    let nn = ConfusionMatrix::from_predictions(&predicted, &test_labels).unwrap();
    assert!(nn.accuracy() > baseline, "k-NN: {}", nn);
}

#[test]
fn test_small_cohort_beats_majority_baseline() {
    let data = small_cohort();
    let labels = data.cohort.labels().unwrap();
    let partition = stratified_split(&labels, 0.75, 42).unwrap();
    let train = data.cohort.betas.subset_samples(&partition.train).unwrap();
    let test = data.cohort.betas.subset_samples(&partition.test).unwrap();
    let train_labels = Partition::select(&partition.train, &labels);
    let test_labels = Partition::select(&partition.test, &labels);

    let n_tumor = test_labels.iter().filter(|l| l.is_positive()).count();
    let baseline = n_tumor.max(test_labels.len() - n_tumor) as f64 / test_labels.len() as f64;

    let config = ElasticNetConfig::default().with_folds(5);
    let fit = cv_elastic_net(&train, &train_labels, &config).unwrap();
    let en = ConfusionMatrix::from_predictions(&fit.predict(&test).unwrap(), &test_labels).unwrap();
    assert!(en.accuracy() > baseline, "Elastic Net: {} (baseline {:.2})", en, baseline);

    let predicted = knn(&train, &test, &train_labels, 9).unwrap();
    let nn = ConfusionMatrix::from_predictions(&predicted, &test_labels).unwrap();
    assert!(nn.accuracy() > baseline, "k-NN: {} (baseline {:.2})", nn, baseline);
}

#[test]
fn test_default_cohort_with_separated_classes() {
    // Planted effect far exceeds the noise, so tumor and normal are linearly separable.
    let dir = TempDir::new().unwrap();
    let data = generate_synthetic(&SyntheticConfig::default()).unwrap();
    let (complete, _) = drop_incomplete_rows(&data.cohort.betas).unwrap();
    let complete_labels = data.cohort.samples.labels_for(complete.sample_ids()).unwrap();

    let fit = cv_elastic_net(&complete, &complete_labels, &ElasticNetConfig::default()).unwrap();
    assert!(fit.nonzero().iter().any(|(p, _)| data.ground_truth.is_planted(p)));

    let config = AnalysisConfig::default().with_output_dir(dir.path());
    let report = Analysis::new(config).run(&data.cohort, &data.annotation).unwrap();
    assert!(report.elastic_net_all.n_nonzero > 0);
    assert!(dir.path().join("report.json").exists());
}

#[test]
fn test_full_analysis_writes_outputs() {
    let dir = TempDir::new().unwrap();
    let data = small_cohort();
    let config = AnalysisConfig::default()
        .with_name("integration")
        .with_folds(5)
        .with_output_dir(dir.path());

    let report = Analysis::new(config).run(&data.cohort, &data.annotation).unwrap();

    assert_eq!(report.n_train + report.n_test, 20);
    // 5% of 50 probes, rounded up.
    assert_eq!(report.n_filtered_probes, 3);
    assert!(dir.path().join("report.json").exists());

    let genes = report.relevant_genes();
    match (&report.heatmap, &report.survival) {
        (Some(heatmap), Some(survival)) => {
            assert!(heatmap.exists());
            assert_eq!(survival.genes.len(), genes.len());
            for gene in survival.genes.values() {
                assert!(dir.path().join("survival").join(&gene.plot_file).exists());
                assert!((0.0..=1.0).contains(&gene.p_value));
                assert!(gene.n_hyper >= gene.n_hypo);
            }
            let files: HashSet<&str> = survival.genes.values().map(|g| g.plot_file.as_str()).collect();
            assert_eq!(files.len(), survival.genes.len(), "Plot files must be distinct");
        }
        (None, None) => assert!(genes.is_empty()),
        _ => panic!("Heatmap and survival should be produced together"),
    }
}

#[test]
fn test_incomplete_samples_dropped_before_split() {
    let dir = TempDir::new().unwrap();
    let data = generate_synthetic(&SyntheticConfig::small().with_incomplete(2)).unwrap();
    let config = AnalysisConfig::default()
        .with_folds(5)
        .with_output_dir(dir.path());

    let report = Analysis::new(config).run(&data.cohort, &data.annotation).unwrap();

    assert_eq!(report.dropped_samples.len(), 2);
    assert_eq!(report.n_complete_samples, 18);
    assert_eq!(report.n_train + report.n_test, 18);
}

#[test]
fn test_cohort_tsv_roundtrip() {
    let dir = TempDir::new().unwrap();
    let data = small_cohort();
    data.write_to_dir(dir.path()).unwrap();

    let loaded = Cohort::from_tsv(
        dir.path().join("betas.tsv"),
        dir.path().join("samples.tsv"),
        dir.path().join("clinical.tsv"),
    )
    .unwrap();
    assert_eq!(loaded.betas.sample_ids(), data.cohort.betas.sample_ids());
    assert_eq!(loaded.betas.probe_ids(), data.cohort.betas.probe_ids());
    assert_eq!(loaded.labels().unwrap(), data.cohort.labels().unwrap());
    assert_eq!(loaded.clinical.len(), data.cohort.clinical.len());

    let annotation = ProbeAnnotation::from_tsv(dir.path().join("annotation.tsv")).unwrap();
    assert_eq!(annotation.len(), data.annotation.len());
}

#[test]
fn test_in_memory_acquisition_then_analysis() {
    let dir = TempDir::new().unwrap();
    let data = small_cohort();
    let source = InMemorySource::from_cohort(data.cohort.clone()).unwrap();

    let cohort = acquire_cohort(&source, &CohortConfig::default()).unwrap();
    assert_eq!(cohort.betas.n_samples(), data.cohort.betas.n_samples());

    let config = AnalysisConfig::default()
        .with_folds(5)
        .with_output_dir(dir.path());
    let report = Analysis::new(config).run(&cohort, &data.annotation).unwrap();
    let json = fs::read_to_string(dir.path().join("report.json")).unwrap();
    assert!(json.contains("elastic_net_filtered"));
    assert_eq!(report.knn.k, 9);
}
