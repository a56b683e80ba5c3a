//! Benchmarks for configuration validation and workflow execution.

use cdrflow::config::{validate, RawConfig};
use cdrflow::core::StageKind;
use cdrflow::stages::PollingStage;
use cdrflow::testing::{RecordingNotifier, ScriptedAction};
use cdrflow::workflow::WorkflowBuilder;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::time::Duration;

fn raw_config() -> RawConfig {
    RawConfig::from_lookup(|key| match key {
        "AWS_REGION" => Some("us-east-1".to_string()),
        "RAW_CDRS_BUCKET" => Some("existing-cdrs".to_string()),
        "EMAIL" => Some("ops@example.com".to_string()),
        _ => None,
    })
}

fn validator_benchmark(c: &mut Criterion) {
    let config = raw_config();
    c.bench_function("validate_config", |b| {
        b.iter(|| validate(black_box(&config), 2024))
    });
}

fn workflow_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();

    let workflow = WorkflowBuilder::new("bench-etl")
        .stage(PollingStage::new(
            "Crawl",
            StageKind::Crawl,
            Arc::new(ScriptedAction::always_complete()),
            Duration::from_secs(120),
        ))
        .stage(PollingStage::new(
            "ETL",
            StageKind::Transform,
            Arc::new(ScriptedAction::always_complete()),
            Duration::from_secs(10),
        ))
        .stage(PollingStage::new(
            "ProcessedCrawl",
            StageKind::Crawl,
            Arc::new(ScriptedAction::always_complete()),
            Duration::from_secs(10),
        ))
        .notifier(Arc::new(RecordingNotifier::new()))
        .build()
        .unwrap();

    c.bench_function("three_stage_run", |b| {
        b.iter(|| runtime.block_on(workflow.run(black_box(serde_json::json!({})))))
    });
}

criterion_group!(benches, validator_benchmark, workflow_benchmark);
criterion_main!(benches);
