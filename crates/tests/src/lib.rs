//! # Integration Tests
//!
//! Cross-crate end-to-end tests.
//!
//! Covers:
//! - Contract snapshot tests
//! - Config -> dispatcher -> backend flows with deterministic backends
//! - Stats aggregation over real dispatch results

#[cfg(test)]
mod contract_tests {
    use contracts::{DeliveryReceipt, DispatchBlueprint, ReceiptStatus};

    #[test]
    fn test_default_blueprint_round_trips_through_loader() {
        let blueprint = DispatchBlueprint::default();
        let toml = config_loader::ConfigLoader::to_toml(&blueprint).unwrap();
        let loaded = config_loader::ConfigLoader::load_from_str(
            &toml,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(loaded.dispatcher, blueprint.dispatcher);
        assert_eq!(loaded.backends.len(), 2);
        assert_eq!(loaded.backends[1].name, "Provider2");
    }

    #[test]
    fn test_receipt_texts() {
        let delivered = DeliveryReceipt::delivered("id-1", "Provider1");
        assert_eq!(delivered.to_string(), "Email sent by Provider1");
        assert_eq!(delivered.status, ReceiptStatus::Delivered);

        let skipped = DeliveryReceipt::already_sent("id-1");
        assert_eq!(skipped.to_string(), "Email already sent");
        assert!(skipped.backend.is_none());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::Email;
    use dispatcher::{
        create_dispatcher, AnyBackend, DispatchError, Dispatcher, FailureKind,
    };
    use observability::DispatchStatsAggregator;

    fn dispatcher_from_toml(toml: &str) -> Dispatcher {
        let blueprint = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        create_dispatcher(&blueprint).unwrap()
    }

    fn scripted_calls(dispatcher: &Dispatcher, index: usize) -> u32 {
        match dispatcher.pool().get(index) {
            AnyBackend::Scripted(b) => b.calls(),
            _ => panic!("backend {} is not scripted", index),
        }
    }

    const FAILOVER_CONFIG: &str = r#"
version = "V1"

[dispatcher]
max_retries = 2
rate_limit = 100
base_delay_ms = 100

[[backends]]
name = "Primary"
backend_type = "scripted"
[backends.params]
mode = "fail"

[[backends]]
name = "Secondary"
backend_type = "scripted"
[backends.params]
mode = "succeed"
"#;

    /// Config -> dispatcher -> failover to the second backend
    #[tokio::test(start_paused = true)]
    async fn test_failover_from_config() {
        let dispatcher = dispatcher_from_toml(FAILOVER_CONFIG);
        let email = Email::new("e2e-1", "alice@example.com", "Hello", "World");

        let started = tokio::time::Instant::now();
        let receipt = dispatcher.send(&email).await.unwrap();

        assert_eq!(receipt.backend.as_deref(), Some("Secondary"));
        assert_eq!(receipt.attempts, 3);
        assert_eq!(receipt.to_string(), "Email sent by Secondary");
        // 100 ms after the first failure, 200 ms after the second
        assert_eq!(started.elapsed(), Duration::from_millis(300));

        assert_eq!(scripted_calls(&dispatcher, 0), 2);
        assert_eq!(scripted_calls(&dispatcher, 1), 1);

        let snapshot = dispatcher.snapshot();
        assert_eq!(snapshot.rotations, 1);
        assert_eq!(snapshot.backend_failures, 2);
        assert_eq!(snapshot.delivered, 1);
    }

    /// A delivered id is never handed to a backend again
    #[tokio::test(start_paused = true)]
    async fn test_idempotent_resend_from_config() {
        let dispatcher = dispatcher_from_toml(FAILOVER_CONFIG);
        let email = Email::new("e2e-2", "bob@example.com", "Hi", "Again");

        dispatcher.send(&email).await.unwrap();
        let calls_before = scripted_calls(&dispatcher, 0) + scripted_calls(&dispatcher, 1);

        let second = dispatcher.send(&email).await.unwrap();
        assert!(second.is_already_sent());
        assert_eq!(second.to_string(), "Email already sent");
        assert_eq!(
            scripted_calls(&dispatcher, 0) + scripted_calls(&dispatcher, 1),
            calls_before
        );
        assert!(dispatcher.has_sent("e2e-2"));
    }

    /// An inline failure count passes validation and reaches the backend factory
    #[tokio::test(start_paused = true)]
    async fn test_inline_failure_count_mode() {
        let dispatcher = dispatcher_from_toml(
            r#"
[dispatcher]
max_retries = 5
rate_limit = 100

[[backends]]
name = "Flaky"
backend_type = "scripted"
[backends.params]
mode = "fail_then_succeed:3"
"#,
        );

        let receipt = dispatcher
            .send(&Email::new("e2e-flaky", "eve@example.com", "Hi", ""))
            .await
            .unwrap();
        assert_eq!(receipt.attempts, 4);
        assert_eq!(scripted_calls(&dispatcher, 0), 4);
    }

    /// Every backend failing exhausts the whole budget
    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_from_json_config() {
        let json = r#"{
            "version": "V1",
            "dispatcher": { "max_retries": 2, "rate_limit": 100 },
            "backends": [
                { "name": "A", "backend_type": "scripted", "params": { "mode": "fail" } },
                { "name": "B", "backend_type": "scripted", "params": { "mode": "fail" } }
            ]
        }"#;
        let blueprint = ConfigLoader::load_from_str(json, ConfigFormat::Json).unwrap();
        let dispatcher = create_dispatcher(&blueprint).unwrap();

        let err = dispatcher
            .send(&Email::new("e2e-3", "carol@example.com", "s", "b"))
            .await
            .unwrap_err();

        match &err {
            DispatchError::Exhausted {
                attempts,
                last_failure,
                ..
            } => {
                assert_eq!(*attempts, 4);
                assert_eq!(*last_failure, FailureKind::BackendFailure);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.to_string().starts_with("All providers failed after 4 attempts"));
        assert_eq!(scripted_calls(&dispatcher, 0), 2);
        assert_eq!(scripted_calls(&dispatcher, 1), 2);
        assert!(!dispatcher.has_sent("e2e-3"));
    }

    /// Denied attempts consume the budget until the window slides
    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_across_sends() {
        let dispatcher = dispatcher_from_toml(
            r#"
version = "V1"

[dispatcher]
max_retries = 3
rate_limit = 2
rate_window_ms = 1000

[[backends]]
name = "Only"
backend_type = "scripted"
"#,
        );

        for i in 0..2 {
            let email = Email::new(format!("rl-{}", i), "dave@example.com", "s", "b");
            dispatcher.send(&email).await.unwrap();
        }

        let err = dispatcher
            .send(&Email::new("rl-2", "dave@example.com", "s", "b"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Exhausted {
                last_failure: FailureKind::RateLimited,
                ..
            }
        ));
        assert_eq!(scripted_calls(&dispatcher, 0), 2);
        assert_eq!(dispatcher.snapshot().rate_limited, 3);

        tokio::time::advance(Duration::from_millis(1000)).await;

        let receipt = dispatcher
            .send(&Email::new("rl-2", "dave@example.com", "s", "b"))
            .await
            .unwrap();
        assert_eq!(receipt.attempts, 1);
        assert_eq!(scripted_calls(&dispatcher, 0), 3);
    }

    /// Concurrent sends of one id: one delivery, one in-flight rejection
    #[tokio::test(start_paused = true)]
    async fn test_concurrent_same_id() {
        let dispatcher = Arc::new(dispatcher_from_toml(
            r#"
version = "V1"

[dispatcher]
rate_limit = 100

[[backends]]
name = "Slow"
backend_type = "scripted"
[backends.params]
latency_ms = "50"
"#,
        ));
        let email = Email::new("dup-1", "erin@example.com", "s", "b");

        let first = {
            let dispatcher = Arc::clone(&dispatcher);
            let email = email.clone();
            tokio::spawn(async move { dispatcher.send(&email).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = dispatcher.send(&email).await;

        assert!(matches!(second, Err(DispatchError::InFlight { .. })));
        let receipt = first.await.unwrap().unwrap();
        assert!(!receipt.is_already_sent());
        assert_eq!(scripted_calls(&dispatcher, 0), 1);

        let third = dispatcher.send(&email).await.unwrap();
        assert!(third.is_already_sent());
    }

    /// Aggregated statistics over a mixed run
    #[tokio::test(start_paused = true)]
    async fn test_stats_aggregation() {
        let dispatcher = dispatcher_from_toml(FAILOVER_CONFIG);
        let mut stats = DispatchStatsAggregator::new();

        for id in ["s-1", "s-2", "s-1"] {
            let email = Email::new(id, "frank@example.com", "s", "b");
            match dispatcher.send(&email).await {
                Ok(receipt) => stats.record_receipt(&receipt, 1.0),
                Err(e) => stats.record_failure(e.kind().as_str(), 1.0),
            }
        }

        let summary = stats.summary();
        assert_eq!(summary.total_sends, 3);
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.already_sent, 1);
        assert_eq!(summary.backend_counts.get("Secondary"), Some(&2));

        let text = summary.to_string();
        assert!(text.contains("=== Dispatch Summary ==="));
        assert!(text.contains("Total sends: 3"));
    }
}
