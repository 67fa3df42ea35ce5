//! Integration tests for the bench crate.
//!
//! Full pipeline over the bundled sample dataset: load, score, write,
//! read back. Offline only.

use bench::{
    domain_breakdown, BenchmarkConfig, BenchmarkEvaluator, Dataset, ReportReader, ReportWriter,
};
use tempfile::TempDir;

const SAMPLE: &str = include_str!("../../../data/sample_dataset.json");

fn evaluator() -> BenchmarkEvaluator {
    BenchmarkEvaluator::new(BenchmarkConfig::default()).unwrap()
}

#[test]
fn test_sample_dataset_scores() {
    let dataset = Dataset::from_json(SAMPLE).unwrap();
    assert_eq!(dataset.len(), 6);
    assert_eq!(dataset.malformed, 0);

    let report = evaluator().evaluate(&dataset.items);
    let hybrid: Vec<(&str, f64, bool)> = report
        .items
        .iter()
        .map(|s| (s.id.as_str(), s.hybrid_score, s.passed))
        .collect();
    assert_eq!(
        hybrid,
        vec![
            ("alg-001", 89.5, true),
            ("alg-002", 92.4, true),
            ("nt-001", 83.8, true),
            ("geo-001", 78.1, false),
            ("logic-001", 68.5, false),
            ("alg-003", 58.1, false),
        ]
    );

    let meta = &report.meta;
    assert_eq!((meta.n, meta.passed, meta.failed), (6, 3, 3));
    assert_eq!(meta.accuracy, 0.5);
    assert_eq!(meta.accuracy_ci95_low, 0.1876);
    assert_eq!(meta.avg_symbolic, 76.0);
    assert_eq!(meta.avg_semantic, 84.0);
    assert_eq!(meta.avg_hybrid, 78.4);
}

#[test]
fn test_every_item_inside_its_band() {
    let dataset = Dataset::from_json(SAMPLE).unwrap();
    let report = evaluator().evaluate(&dataset.items);
    for item in &report.items {
        assert!(item.confidence_low <= item.hybrid_score, "{}", item.id);
        assert!(item.hybrid_score <= item.confidence_high, "{}", item.id);
        assert!((0.0..=100.0).contains(&item.symbolic_score));
        assert!((0.0..=100.0).contains(&item.semantic_score));
    }
    assert!(report.meta.accuracy_ci95_low <= report.meta.accuracy);
}

#[test]
fn test_report_roundtrip_through_files() {
    let tmp = TempDir::new().unwrap();
    let dataset = Dataset::from_json(SAMPLE).unwrap();
    let report = evaluator().evaluate(&dataset.items);

    let writer = ReportWriter::new(tmp.path().join("reports"), "bench_v0_1");
    let paths = writer.write(&report).unwrap();
    assert!(paths.json.ends_with("reports/bench_v0_1.json"));
    assert!(paths.csv.ends_with("reports/bench_v0_1.csv"));

    let json = ReportReader::read_json(&paths.json).unwrap();
    assert_eq!(json, report);

    let rows = ReportReader::read_csv(&paths.csv).unwrap();
    assert_eq!(rows, report.items);
}

#[test]
fn test_json_layout() {
    let report = evaluator().evaluate(&Dataset::from_json(SAMPLE).unwrap().items);
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["meta"]["n"], 6);
    assert_eq!(value["meta"]["offline"], true);
    assert!(value["meta"]["timestamp"].is_string());
    assert_eq!(value["items"][0]["id"], "alg-001");
    assert_eq!(value["items"][0]["passed"], true);
}

#[test]
fn test_malformed_items_still_reported() {
    let text = r#"[
        {"id": "good", "domain": "algebra", "correct_proof": "x = x. QED", "problem": "x"},
        {"id": "broken", "domain": "algebra"},
        "not an object"
    ]"#;
    let dataset = Dataset::from_json(text).unwrap();
    let report = evaluator().evaluate(&dataset.items);
    assert_eq!(report.meta.n, 3);
    let ids: Vec<&str> = report.items.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["good", "broken", "item-2"]);
    for placeholder in &report.items[1..] {
        assert!(!placeholder.passed);
        assert_eq!(placeholder.domain, "unknown");
        assert_eq!(placeholder.symbolic_score, 40.0);
    }
}

#[test]
fn test_domain_breakdown_over_sample() {
    let report = evaluator().evaluate(&Dataset::from_json(SAMPLE).unwrap().items);
    let breakdown = domain_breakdown(&report.items);
    assert_eq!(breakdown["algebra"].n, 3);
    assert_eq!(breakdown["algebra"].passed, 2);
    assert_eq!(breakdown["number_theory"].pass_rate, 1.0);
    assert_eq!(breakdown["logic"].pass_rate, 0.0);
}

#[test]
fn test_config_from_toml() {
    let config: BenchmarkConfig = toml::from_str("pass_bar = 60.0").unwrap();
    assert_eq!(config.pass_bar, 60.0);
    assert_eq!(config.symbolic_weight, 0.7);
    let evaluator = BenchmarkEvaluator::new(config).unwrap();
    let report = evaluator.evaluate(&Dataset::from_json(SAMPLE).unwrap().items);
    assert_eq!(report.meta.passed, 5);
}
