//! End-to-end tests for polling workflows and the pipelines built on them.

#[cfg(test)]
mod tests {
    use crate::actions::{CrawlOutcome, CrawlerSnapshot, JobRunState, QueryState};
    use crate::config::{Config, RawConfig};
    use crate::core::{StageKind, StageResult};
    use crate::errors::CollaboratorError;
    use crate::events::CollectingEventSink;
    use crate::pipelines::{
        custom_query_report, daily_etl, full_etl, monthly_report, run_concurrently,
        EtlCollaborators, ReportCollaborators,
    };
    use crate::stages::PollingStage;
    use crate::testing::{
        assert_run_failed_at, assert_run_succeeded, assert_stages_started, InMemoryCatalog,
        InMemoryJobs, InMemoryQueries, RecordingChannel, RecordingNotifier, ScriptedAction,
        StaticObjectStore,
    };
    use crate::workflow::{PollingWorkflow, WorkflowBuilder, WorkflowOutcome, WorkflowState};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const KEYS: [&str; 3] = ["Crawl", "ETL", "Processed"];

    fn config() -> Config {
        RawConfig {
            namespace: Some("abc12345".to_string()),
            ..RawConfig::default()
        }
        .into_config(2024)
        .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 6).unwrap()
    }

    struct EtlHarness {
        catalog: Arc<InMemoryCatalog>,
        jobs: Arc<InMemoryJobs>,
        channel: Arc<RecordingChannel>,
        events: Arc<CollectingEventSink>,
    }

    impl EtlHarness {
        fn new(catalog: InMemoryCatalog, jobs: InMemoryJobs) -> Self {
            Self {
                catalog: Arc::new(catalog),
                jobs: Arc::new(jobs),
                channel: Arc::new(RecordingChannel::new()),
                events: Arc::new(CollectingEventSink::new()),
            }
        }

        fn services(&self) -> EtlCollaborators {
            EtlCollaborators::new(self.catalog.clone(), self.jobs.clone(), self.channel.clone())
                .with_event_sink(self.events.clone())
                .with_today(today())
        }
    }

    fn scripted_workflow(
        actions: &[Arc<ScriptedAction>],
        notifier: Arc<RecordingNotifier>,
    ) -> PollingWorkflow {
        let mut builder = WorkflowBuilder::new("scripted");
        for (key, action) in KEYS.iter().zip(actions) {
            builder = builder.stage(PollingStage::new(
                *key,
                StageKind::Crawl,
                action.clone(),
                Duration::from_secs(10),
            ));
        }
        builder.notifier(notifier).build().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_daily_etl_all_stages_complete_first_check() {
        let harness = EtlHarness::new(InMemoryCatalog::new(), InMemoryJobs::new());
        let pipeline = daily_etl(&config(), &harness.services()).unwrap();

        let run = pipeline.trigger().await;

        assert_run_succeeded(&run);
        assert_stages_started(&run, &KEYS);
        for key in KEYS {
            assert_eq!(run.checks(key), 1, "checks for {key}");
            assert_eq!(run.retries(key), 0, "retries for {key}");
        }
        assert_eq!(
            harness.catalog.started(),
            vec![
                "dailyRawCdr_abc12345".to_string(),
                "dailyProcessedCdr_abc12345".to_string()
            ]
        );
        assert_eq!(
            harness.channel.published(),
            vec![(
                "Processing CDRs Complete".to_string(),
                "CDR Processing Complete:  2024-3-5".to_string()
            )]
        );
        assert_eq!(run.instance.state, WorkflowState::Done);
        assert!(run.duration >= Duration::from_secs(140));
    }

    #[tokio::test(start_paused = true)]
    async fn test_daily_etl_transform_retries_twice() {
        let config = config();
        let jobs = InMemoryJobs::new().with_script(
            &format!("cdrDailyETL{}", config.namespace),
            vec![JobRunState::Running, JobRunState::Running, JobRunState::Succeeded],
        );
        let harness = EtlHarness::new(InMemoryCatalog::new(), jobs);
        let pipeline = daily_etl(&config, &harness.services()).unwrap();

        let run = pipeline.trigger().await;

        assert_run_succeeded(&run);
        assert_eq!(run.retries("ETL"), 2);
        assert_eq!(run.checks("ETL"), 3);
        assert_eq!(run.instance.visits(WorkflowState::Wait(1)), 3);
        assert_eq!(run.instance.visits(WorkflowState::Start(2)), 1);
        assert_eq!(harness.events.events_of_type("stage.retry").len(), 2);

        let runs = harness.jobs.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].1.get("--DATE").map(String::as_str), Some("05"));
        assert_eq!(
            run.instance.payload.result("ETL").unwrap().metadata_str("runId"),
            Some("jr_1")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_etl_raw_crawl_failure_short_circuits() {
        let catalog = InMemoryCatalog::new().with_script(
            "fullRawCdr_abc12345",
            vec![CrawlerSnapshot::ready(CrawlOutcome::Failed)],
        );
        let harness = EtlHarness::new(catalog, InMemoryJobs::new());
        let pipeline = full_etl(&config(), &harness.services()).unwrap();
        assert!(pipeline.schedule.is_none());

        let run = pipeline.trigger().await;

        assert_run_failed_at(&run, "Crawl");
        assert_stages_started(&run, &["Crawl"]);
        let results = &run.instance.payload.results;
        assert!(results.contains_key("Crawl"));
        assert!(!results.contains_key("ETL"));
        assert!(!results.contains_key("Processed"));
        assert!(harness.jobs.runs().is_empty());
        assert_eq!(
            harness.channel.published(),
            vec![(
                "Error Processing CDRs".to_string(),
                "Error Processing:  Error in Crawler. Crawler status: FAILED".to_string()
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_at_stage_k_starts_only_stages_up_to_k() {
        for k in 0..KEYS.len() {
            let actions: Vec<Arc<ScriptedAction>> = (0..KEYS.len())
                .map(|i| {
                    Arc::new(if i == k {
                        ScriptedAction::failing(format!("stage {i} broke"))
                    } else {
                        ScriptedAction::complete_after(1)
                    })
                })
                .collect();
            let notifier = Arc::new(RecordingNotifier::new());
            let workflow = scripted_workflow(&actions, notifier.clone());

            let run = workflow.run(json!({})).await;

            assert_run_failed_at(&run, KEYS[k]);
            assert_stages_started(&run, &KEYS[..=k]);
            for (i, action) in actions.iter().enumerate() {
                assert_eq!(action.start_calls(), usize::from(i <= k), "stage {i}, k={k}");
            }
            assert_eq!(notifier.call_count(), 1);
            assert_eq!(
                notifier.payloads()[0].error_message(),
                Some(format!("stage {k} broke"))
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_n_incomplete_checks_mean_n_retry_cycles() {
        for n in [0_usize, 1, 5] {
            let actions = vec![Arc::new(ScriptedAction::complete_after(n))];
            let workflow = scripted_workflow(&actions, Arc::new(RecordingNotifier::new()));

            let run = workflow.run(json!({})).await;

            assert_run_succeeded(&run);
            assert_eq!(run.retries("Crawl") as usize, n);
            assert_eq!(run.checks("Crawl") as usize, n + 1);
            assert_eq!(run.instance.visits(WorkflowState::Wait(0)), n + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_wins_over_complete() {
        let both = StageResult {
            complete: true,
            ..StageResult::failed("contradictory")
        };
        let actions = vec![
            Arc::new(ScriptedAction::new(vec![Ok(both)])),
            Arc::new(ScriptedAction::always_complete()),
        ];
        let workflow = scripted_workflow(&actions, Arc::new(RecordingNotifier::new()));

        let run = workflow.run(json!({})).await;

        assert_run_failed_at(&run, "Crawl");
        assert_eq!(actions[1].start_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_error_becomes_stage_failure() {
        let actions = vec![Arc::new(ScriptedAction::new(vec![Err(
            CollaboratorError::unavailable("catalog", "throttled"),
        )]))];
        let notifier = Arc::new(RecordingNotifier::new());
        let workflow = scripted_workflow(&actions, notifier.clone());

        let run = workflow.run(json!({})).await;

        assert_run_failed_at(&run, "Crawl");
        assert_eq!(
            run.instance.payload.error_message().as_deref(),
            Some("Service unavailable: catalog - throttled")
        );
        assert_eq!(notifier.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_error_skips_polling() {
        let action = ScriptedAction::always_complete()
            .with_start(Err(CollaboratorError::invalid_input("bad Date")));
        let actions = vec![Arc::new(action)];
        let workflow = scripted_workflow(&actions, Arc::new(RecordingNotifier::new()));

        let run = workflow.run(json!({})).await;

        assert_run_failed_at(&run, "Crawl");
        assert_eq!(actions[0].check_calls(), 0);
        assert_eq!(
            run.instance.history,
            vec![
                WorkflowState::Start(0),
                WorkflowState::Wait(0),
                WorkflowState::Check(0),
                WorkflowState::Branch(0),
                WorkflowState::Notify,
                WorkflowState::Done,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_sees_and_inherits_start_metadata() {
        let action = ScriptedAction::complete_after(1)
            .with_start(Ok(StageResult::started().with_metadata("runId", json!("jr_7"))));
        let actions = vec![Arc::new(action)];
        let workflow = scripted_workflow(&actions, Arc::new(RecordingNotifier::new()));

        let run = workflow.run(json!({"Date": "2024-01-02"})).await;

        assert_run_succeeded(&run);
        for seen in actions[0].seen_payloads() {
            assert_eq!(
                seen.result("Crawl").and_then(|r| r.metadata_str("runId")),
                Some("jr_7")
            );
            assert_eq!(seen.input_str("Date"), Some("2024-01-02"));
        }
        assert_eq!(
            run.instance.payload.result("Crawl").unwrap().metadata_str("runId"),
            Some("jr_7")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_ends_run_without_notification() {
        let notifier = Arc::new(RecordingNotifier::new());
        let events = Arc::new(CollectingEventSink::new());
        let workflow = WorkflowBuilder::new("stuck")
            .stage(PollingStage::new(
                "Crawl",
                StageKind::Crawl,
                Arc::new(ScriptedAction::never_complete()),
                Duration::from_secs(10),
            ))
            .notifier(notifier.clone())
            .timeout(Duration::from_secs(60))
            .event_sink(events.clone())
            .build()
            .unwrap();

        let run = workflow.run(json!({})).await;

        assert_eq!(run.outcome, WorkflowOutcome::TimedOut);
        assert!(!run.notified());
        assert_eq!(notifier.call_count(), 0);
        assert!(run.retries("Crawl") >= 5);
        assert_eq!(events.events_of_type("workflow.timed_out").len(), 1);
        assert!(events.events_of_type("workflow.notified").is_empty());
        assert!(events.events_of_type("workflow.completed").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifier_error_is_reported_not_raised() {
        let actions = vec![Arc::new(ScriptedAction::always_complete())];
        let notifier = Arc::new(RecordingNotifier::failing(CollaboratorError::unavailable(
            "sns", "down",
        )));
        let workflow = scripted_workflow(&actions, notifier);

        let run = workflow.run(json!({})).await;

        assert_run_succeeded(&run);
        assert!(run.notification.is_none());
        assert_eq!(
            run.notification_error.as_deref(),
            Some("Service unavailable: sns - down")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_sequence_for_single_stage() {
        let events = Arc::new(CollectingEventSink::new());
        let workflow = WorkflowBuilder::new("single")
            .stage(PollingStage::new(
                "Query",
                StageKind::Query,
                Arc::new(ScriptedAction::complete_after(1)),
                Duration::from_secs(5),
            ))
            .notifier(Arc::new(RecordingNotifier::new()))
            .event_sink(events.clone())
            .build()
            .unwrap();

        let run = workflow.run(json!({})).await;

        assert_eq!(
            events.event_types(),
            vec![
                "workflow.started",
                "stage.started",
                "stage.polled",
                "stage.retry",
                "stage.polled",
                "stage.completed",
                "workflow.notified",
                "workflow.completed",
                "workflow.wide",
            ]
        );
        let (_, data) = &events.events()[1];
        let data = data.as_ref().unwrap();
        assert_eq!(data["stage"], json!("Query"));
        assert_eq!(data["workflow"], json!("single"));
        assert_eq!(data["run_id"], json!(run.instance.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_monthly_report_sends_download_link() {
        let queries = Arc::new(
            InMemoryQueries::new().with_script(vec![QueryState::Running, QueryState::Succeeded]),
        );
        let channel = Arc::new(RecordingChannel::new());
        let services =
            ReportCollaborators::new(queries.clone(), Arc::new(StaticObjectStore), channel.clone())
                .with_today(today());
        let pipeline = monthly_report(&config(), &services).unwrap();
        assert_eq!(
            pipeline.schedule.as_ref().map(|s| s.as_str()),
            Some("cron(0 12 2 * ? *)")
        );

        let run = pipeline.trigger().await;

        assert_run_succeeded(&run);
        assert_eq!(run.retries("Query"), 1);
        let requests = queries.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .query
            .contains("FROM cdrs_abc12345.processed_cdrs WHERE month='2'"));
        assert_eq!(
            channel.published()[0].1,
            "CDR Processing Complete:  https://cdr-results-abc12345.storage.example.test/results/q-1.csv?expires=3600"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_monthly_report_rejects_bad_month() {
        let queries = Arc::new(InMemoryQueries::new());
        let channel = Arc::new(RecordingChannel::new());
        let services =
            ReportCollaborators::new(queries.clone(), Arc::new(StaticObjectStore), channel.clone());
        let pipeline = monthly_report(&config(), &services).unwrap();

        let run = pipeline.run_with_input(json!({"Month": "13"})).await;

        assert_run_failed_at(&run, "Query");
        assert!(queries.requests().is_empty());
        assert!(channel.published()[0].1.starts_with("Error Processing:  Invalid input: Invalid Month"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_query_report_polls_and_sends_day_long_link() {
        let queries = Arc::new(InMemoryQueries::new().with_script(vec![
            QueryState::Queued,
            QueryState::Running,
            QueryState::Succeeded,
        ]));
        let channel = Arc::new(RecordingChannel::new());
        let services =
            ReportCollaborators::new(queries.clone(), Arc::new(StaticObjectStore), channel.clone());
        let pipeline = custom_query_report(&config(), &services).unwrap();
        assert_eq!(
            pipeline.schedule.as_ref().map(|s| s.as_str()),
            Some("cron(0 0 1 * ? *)")
        );

        let run = pipeline.trigger().await;

        assert_run_succeeded(&run);
        assert_eq!(run.checks("Query"), 3);
        assert_eq!(run.retries("Query"), 2);
        assert!(run.duration >= Duration::from_secs(15));

        let requests = queries.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].query.contains("FROM cdrs_abc12345.processed_cdrs WHERE year"));
        assert!(!requests[0].query.contains("{database}"));
        assert_eq!(requests[0].output_location, "s3://cdr-results-abc12345/custom/");
        assert_eq!(
            channel.published()[0].1,
            "Please open the following link to view the generated CDR report. \
             https://cdr-results-abc12345.storage.example.test/custom/q-1.csv?expires=86400"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_query_report_failure_is_notified() {
        let queries = Arc::new(InMemoryQueries::new().with_script(vec![QueryState::Cancelled]));
        let channel = Arc::new(RecordingChannel::new());
        let services =
            ReportCollaborators::new(queries, Arc::new(StaticObjectStore), channel.clone());
        let pipeline = custom_query_report(&config(), &services).unwrap();

        let run = pipeline.trigger().await;

        assert_run_failed_at(&run, "Query");
        assert_eq!(
            channel.published()[0].1,
            "Error Processing:  Athena Error.  Status: CANCELLED"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_runs_are_isolated() {
        let config = config();
        let daily_jobs = InMemoryJobs::new().with_script(
            &format!("cdrDailyETL{}", config.namespace),
            vec![JobRunState::Running, JobRunState::Failed],
        );
        let harness = EtlHarness::new(InMemoryCatalog::new(), daily_jobs);
        let daily = daily_etl(&config, &harness.services()).unwrap();
        let full = full_etl(&config, &harness.services()).unwrap();

        let runs = run_concurrently(vec![
            (&daily, json!({})),
            (&full, json!({"Date": "2024-01-31"})),
            (&daily, json!({"Date": "2024-02-01"})),
        ])
        .await;

        assert_eq!(runs.len(), 3);
        assert_ne!(runs[0].instance.id, runs[2].instance.id);
        assert_run_succeeded(&runs[1]);
        assert_run_failed_at(&runs[0], "ETL");
        assert_run_failed_at(&runs[2], "ETL");
        assert_eq!(runs[2].instance.payload.input_str("Date"), Some("2024-02-01"));
        assert_eq!(runs[1].instance.payload.input_str("Date"), Some("2024-01-31"));
        assert_eq!(harness.jobs.runs().len(), 3);
        assert_eq!(harness.channel.len(), 3);
    }
}
