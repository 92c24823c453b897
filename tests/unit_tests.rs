// Unit tests for Skillsync

use chrono::Utc;
use proptest::prelude::*;
use sha2::Sha256;
use skillsync::core::{
    allocation::{select_allocation, traffic_bucket},
    degradation::{detect_performance_degradation, DegradationSettings},
    matcher::{low_confidence_matches, match_percentage, SkillMatcher},
    metrics::{calculate_confusion_matrix, calculate_metrics, Average, MetricsError},
    similarity::{fuzzy_similarity, normalize},
    taxonomy::{SynonymTaxonomy, TaxonomyDocument},
};
use skillsync::models::{
    AllocationType, DatasetType, ExperimentConfig, MatchType, ModelMetadata, ModelVersion,
    PerformanceRecord,
};
use std::sync::Arc;
use uuid::Uuid;

fn create_matcher() -> SkillMatcher {
    let document: TaxonomyDocument = serde_json::from_str(
        r#"{
            "web_framework": {
                "react": ["reactjs", "react.js"],
                "angular": ["angularjs"]
            },
            "database": {
                "postgresql": ["postgres", "psql"]
            }
        }"#,
    )
    .unwrap();
    SkillMatcher::with_default_options(Arc::new(SynonymTaxonomy::from_document(&document)))
}

fn create_version(version: &str, active: bool, traffic: Option<f64>) -> ModelVersion {
    let now = Utc::now();
    ModelVersion {
        id: Uuid::new_v4(),
        model_name: "skill_ranker".to_string(),
        version: version.to_string(),
        file_path: String::new(),
        performance_score: None,
        is_active: active,
        is_experiment: traffic.is_some(),
        experiment_config: traffic.map(ExperimentConfig::with_traffic),
        accuracy_metrics: None,
        model_metadata: ModelMetadata::default(),
        created_at: now,
        updated_at: now,
    }
}

fn create_record(f1: Option<f64>, sample_size: u64) -> PerformanceRecord {
    PerformanceRecord {
        id: Uuid::new_v4(),
        model_version_id: Uuid::nil(),
        dataset_type: DatasetType::Production,
        accuracy: f1.unwrap_or_default(),
        precision: f1.unwrap_or_default(),
        recall: f1.unwrap_or_default(),
        f1_score: f1,
        auc_score: None,
        sample_size,
        confusion_matrix: None,
        performance_delta: None,
        created_at: Utc::now(),
    }
}

#[test]
fn test_normalize_collapses_case_and_whitespace() {
    assert_eq!(normalize("  Node.JS \t Developer "), "node.js developer");
    assert_eq!(normalize("C#"), "c#");
    assert_eq!(normalize("C++!"), "c++");
}

#[test]
fn test_fuzzy_similarity_bounds() {
    assert_eq!(fuzzy_similarity("kubernetes", "kubernetes"), 1.0);
    assert_eq!(fuzzy_similarity("", "rust"), 0.0);

    let score = fuzzy_similarity("postgre", "postgresql");
    assert!(score > 0.8 && score < 0.85);
}

#[test]
fn test_context_match() {
    let matcher = create_matcher();
    let result = matcher.match_one(&["ReactJS", "TypeScript"], "React", Some("web_framework"));

    assert!(result.matched);
    assert_eq!(result.match_type, MatchType::Context);
    assert_eq!(result.confidence, 0.95);
    assert_eq!(result.matched_as.as_deref(), Some("ReactJS"));
}

#[test]
fn test_context_requires_same_entry() {
    let matcher = create_matcher();
    let result = matcher.match_one(&["Angular"], "React", Some("web_framework"));

    assert!(!result.matched);
    assert_eq!(result.match_type, MatchType::None);
}

#[test]
fn test_fuzzy_match() {
    let matcher = create_matcher();
    let result = matcher.match_one(&["PostgreSQL"], "Postgre", None);

    assert_eq!(result.match_type, MatchType::Fuzzy);
    assert!(result.confidence > 0.7);
    assert_eq!(result.matched_as.as_deref(), Some("PostgreSQL"));
}

#[test]
fn test_direct_beats_synonym() {
    let matcher = create_matcher();

    let exact = matcher.match_one(&["psql", "PostgreSQL"], "PostgreSQL", None);
    assert_eq!(exact.match_type, MatchType::Direct);
    assert_eq!(exact.confidence, 1.0);

    let synonym = matcher.match_one(&["psql"], "PostgreSQL", None);
    assert_eq!(synonym.match_type, MatchType::Synonym);
    assert_eq!(synonym.confidence, 0.85);
}

#[test]
fn test_fuzzy_can_be_disabled() {
    let matcher = create_matcher();
    let result = matcher.match_one_with(&["PostgreSQL"], "Postgre", None, false, 0.7);
    assert!(!result.matched);
}

#[test]
fn test_empty_inputs_never_match() {
    let matcher = create_matcher();
    let empty: [&str; 0] = [];

    assert!(!matcher.match_one(&empty, "React", None).matched);
    assert!(!matcher.match_one(&["React"], "   ", None).matched);
}

#[test]
fn test_match_many_summary() {
    let matcher = create_matcher();
    let results = matcher.match_many(&["ReactJS", "Postgr"], &["React", "PostgreSQL", "Rust"], None);

    assert_eq!(match_percentage(&results), 66.67);
    assert_eq!(low_confidence_matches(&results, 0.8), vec!["PostgreSQL".to_string()]);

    let summary = matcher.summarize(&results);
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.unmatched, vec!["Rust".to_string()]);
}

#[test]
fn test_binary_metrics_with_auc() {
    let y_true = [1, 0, 1, 1, 0];
    let y_pred = [1, 0, 0, 1, 1];
    let scores = [0.9, 0.1, 0.4, 0.8, 0.6];

    let metrics = calculate_metrics(&y_true, &y_pred, Some(&scores[..]), Average::Binary).unwrap();

    assert!((metrics.accuracy - 0.6).abs() < 1e-9);
    assert!((metrics.precision - 2.0 / 3.0).abs() < 1e-9);
    assert!((metrics.recall - 2.0 / 3.0).abs() < 1e-9);
    assert!((metrics.auc_score.unwrap() - 5.0 / 6.0).abs() < 1e-9);
}

#[test]
fn test_metrics_zero_division_and_errors() {
    let metrics = calculate_metrics(&[0, 0], &[0, 0], None, Average::Binary).unwrap();
    assert_eq!(metrics.precision, 0.0);
    assert_eq!(metrics.recall, 0.0);
    assert_eq!(metrics.auc_score, None);

    assert_eq!(
        calculate_metrics(&[], &[], None, Average::Binary),
        Err(MetricsError::Empty)
    );
}

#[test]
fn test_confusion_matrix_binary_fields() {
    let matrix = calculate_confusion_matrix(&[1, 0, 1, 1, 0], &[1, 0, 0, 1, 1]).unwrap();

    assert_eq!(matrix.labels, vec![0, 1]);
    assert_eq!(matrix.matrix, vec![vec![1, 1], vec![1, 2]]);
    assert_eq!(matrix.true_positives, Some(2));

    let multiclass = calculate_confusion_matrix(&[0, 1, 2], &[0, 2, 2]).unwrap();
    assert_eq!(multiclass.shape, (3, 3));
    assert_eq!(multiclass.true_positives, None);
}

#[test]
fn test_degradation_detection() {
    let settings = DegradationSettings::default();
    let history = vec![
        create_record(Some(0.80), 200),
        create_record(Some(0.90), 200),
        create_record(Some(0.88), 200),
        create_record(Some(0.92), 200),
    ];

    let report = detect_performance_degradation(&history, &settings);

    assert!(report.is_degraded);
    assert!((report.baseline_f1.unwrap() - 0.90).abs() < 1e-9);
    assert!((report.drop_amount.unwrap() - 0.10).abs() < 1e-9);
}

#[test]
fn test_degradation_guards() {
    let settings = DegradationSettings::default();

    let single = detect_performance_degradation(&[create_record(Some(0.5), 500)], &settings);
    assert_eq!(single.reason, "insufficient history");

    let missing = detect_performance_degradation(
        &[create_record(None, 500), create_record(Some(0.9), 500)],
        &settings,
    );
    assert_eq!(missing.reason, "missing data");

    let small = detect_performance_degradation(
        &[create_record(Some(0.5), 10), create_record(Some(0.9), 500)],
        &settings,
    );
    assert!(!small.is_degraded);
    assert_eq!(small.reason, "insufficient sample size");
}

#[test]
fn test_known_traffic_buckets() {
    assert_eq!(traffic_bucket::<Sha256>("alice"), 20);
    assert_eq!(traffic_bucket::<Sha256>("bob"), 25);
    assert_eq!(traffic_bucket::<Sha256>("user-1"), 79);
}

#[test]
fn test_allocation_ranges() {
    let active = create_version("v1", true, None);
    let experiment = create_version("v2", false, Some(50.0));

    let alice = select_allocation::<Sha256>(Some(&active), &[experiment.clone()], "alice", "baseline");
    assert_eq!(alice.allocation_type, AllocationType::Experiment);
    assert_eq!(alice.version, "v2");

    let user = select_allocation::<Sha256>(Some(&active), &[experiment], "user-1", "baseline");
    assert_eq!(user.allocation_type, AllocationType::Control);
    assert_eq!(user.bucket, Some(79));

    let fallback = select_allocation::<Sha256>(None, &[], "alice", "baseline");
    assert!(fallback.is_fallback);
    assert_eq!(fallback.version, "baseline");
}

proptest! {
    #[test]
    fn normalize_is_idempotent(skill in "[a-zA-Z0-9 +#._/-]{0,24}") {
        let once = normalize(&skill);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn fuzzy_similarity_is_symmetric_and_bounded(a in "[a-z]{0,12}", b in "[a-z]{0,12}") {
        let ab = fuzzy_similarity(&a, &b);
        prop_assert!((0.0..=1.0).contains(&ab));
        prop_assert_eq!(ab, fuzzy_similarity(&b, &a));
    }

    #[test]
    fn match_confidence_is_bounded(
        candidates in proptest::collection::vec("[a-zA-Z .#+]{0,12}", 0..6),
        required in "[a-zA-Z .#+]{0,12}",
    ) {
        let matcher = create_matcher();
        let result = matcher.match_one(candidates.as_slice(), &required, Some("web_framework"));

        prop_assert!((0.0..=1.0).contains(&result.confidence));
        prop_assert_eq!(result.matched, result.match_type != MatchType::None);
    }

    #[test]
    fn allocation_is_deterministic(user_id in "[a-z0-9-]{1,16}", traffic in 0.0f64..=100.0) {
        let active = create_version("v1", true, None);
        let experiment = create_version("v2", false, Some(traffic));

        let first = select_allocation::<Sha256>(Some(&active), &[experiment.clone()], &user_id, "baseline");
        let second = select_allocation::<Sha256>(Some(&active), &[experiment], &user_id, "baseline");

        prop_assert_eq!(&first, &second);
        prop_assert!(traffic_bucket::<Sha256>(&user_id) < 100);
    }
}
