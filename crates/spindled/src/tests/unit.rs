//! Unit tests for the worker bootstrap.

use std::sync::Arc;

use mockall::mock;
use rstest::rstest;

use spindle_config::{Config, RelayEndpoint, WorkerParams};
use spindle_core::ExitReason;

use crate::bootstrap::{BootstrapError, StaticConfigLoader};
use crate::health::HealthReporter;
use crate::{EchoApplication, HEALTH_PATH, bootstrap_with, exit_status};

use super::support::{
    FailingConfigLoader, HealthEvent, MemoryConnector, RecordingHealthReporter, request_line,
    test_config,
};

#[rstest]
fn bootstrapped_worker_serves_the_relay() {
    let loader = StaticConfigLoader::new(test_config());
    let reporter = Arc::new(RecordingHealthReporter::default());
    let connector = MemoryConnector::new();
    connector.push_line(&request_line("GET", HEALTH_PATH));
    connector.push_line(&request_line("DELETE", "/carts/4"));
    connector.push_line(r#"{"kind":"stop"}"#);

    let mut worker = bootstrap_with(&loader, reporter.clone(), &connector, EchoApplication::new())
        .expect("bootstrap should succeed");
    let reason = worker.run();

    assert_eq!(exit_status(&reason), 0);
    let responses = connector.responses();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["body"], "ok");
    let summary: serde_json::Value = serde_json::from_str(
        responses[1]["body"].as_str().expect("summary body is a string"),
    )
    .expect("summary is JSON");
    assert_eq!(summary["method"], "DELETE");
    assert_eq!(summary["uri"], "/carts/4");
    assert_eq!(
        reporter.events(),
        vec![
            HealthEvent::BootstrapStarting,
            HealthEvent::BootstrapSucceeded,
            HealthEvent::WorkerTerminated
        ]
    );
}

#[rstest]
#[case(true)]
#[case(false)]
fn interception_flag_is_forwarded_to_the_connector(#[case] intercept: bool) {
    let config = Config {
        intercept_side_effects: intercept,
        ..test_config()
    };
    let connector = MemoryConnector::new();

    let worker = bootstrap_with(
        &StaticConfigLoader::new(config),
        Arc::new(RecordingHealthReporter::default()),
        &connector,
        EchoApplication::new(),
    )
    .expect("bootstrap should succeed");

    assert_eq!(
        connector.connections(),
        vec![(
            RelayEndpoint::tcp("127.0.0.1", 7070),
            WorkerParams::new(intercept)
        )]
    );
    assert_eq!(worker.config().intercept_side_effects, intercept);
}

#[rstest]
fn configuration_failure_stops_before_connecting() {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let connector = MemoryConnector::new();

    let Err(error) = bootstrap_with(
        &FailingConfigLoader,
        reporter.clone(),
        &connector,
        EchoApplication::new(),
    ) else {
        panic!("bootstrap should fail");
    };

    assert!(matches!(error, BootstrapError::Configuration { .. }), "got {error:?}");
    assert!(connector.connections().is_empty());
    assert!(matches!(
        reporter.events().as_slice(),
        [HealthEvent::BootstrapStarting, HealthEvent::BootstrapFailed(_)]
    ));
}

#[rstest]
fn relay_failure_is_reported() {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let connector = MemoryConnector::new().refusing();

    let Err(error) = bootstrap_with(
        &StaticConfigLoader::new(test_config()),
        reporter.clone(),
        &connector,
        EchoApplication::new(),
    ) else {
        panic!("bootstrap should fail");
    };

    assert!(matches!(error, BootstrapError::Relay { .. }), "got {error:?}");
    let events = reporter.events();
    let Some(HealthEvent::BootstrapFailed(message)) = events.last() else {
        panic!("expected a failure event, got {events:?}");
    };
    assert!(message.contains("tcp://127.0.0.1:7070"), "message was {message}");
}

#[rstest]
fn undeliverable_fallback_exits_with_failure() {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let connector = MemoryConnector::new().hung_up();
    connector.push_line("garbage");

    let mut worker = bootstrap_with(
        &StaticConfigLoader::new(test_config()),
        reporter.clone(),
        &connector,
        EchoApplication::new(),
    )
    .expect("bootstrap should succeed");

    assert_eq!(exit_status(&worker.run()), 1);
    assert_eq!(reporter.events().last(), Some(&HealthEvent::WorkerFailed));
}

mock! {
    Reporter {}

    impl HealthReporter for Reporter {
        fn bootstrap_starting(&self);
        fn bootstrap_succeeded(&self, config: &Config);
        fn bootstrap_failed(&self, error: &BootstrapError);
        fn worker_stopped(&self, reason: &ExitReason);
    }
}

#[rstest]
fn refused_connection_reports_exactly_one_failure() {
    let mut reporter = MockReporter::new();
    reporter.expect_bootstrap_starting().times(1).return_const(());
    reporter
        .expect_bootstrap_failed()
        .withf(|error| matches!(error, BootstrapError::Relay { .. }))
        .times(1)
        .return_const(());
    reporter.expect_bootstrap_succeeded().never();
    reporter.expect_worker_stopped().never();

    let result = bootstrap_with(
        &StaticConfigLoader::new(test_config()),
        Arc::new(reporter),
        &MemoryConnector::new().refusing(),
        EchoApplication::new(),
    );

    assert!(result.is_err());
}
