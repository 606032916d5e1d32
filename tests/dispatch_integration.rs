use async_trait::async_trait;
use log_dispatch::infrastructure::mocks::{FailingSink, MockCaptureLayer, RecordingSink};
use log_dispatch::{
    EntryDefaults, Level, LogEntry, LogError, Logger, LoggerSettings, Sink, SinkBinding,
    SinkError, TemplateFormatter,
};
use std::sync::Arc;
use tokio::sync::Barrier;
use tracing_subscriber::layer::SubscriberExt;

fn bind(name: &str, sink: impl Sink + 'static, template: &str) -> SinkBinding {
    SinkBinding::new(name, Arc::new(sink), Arc::new(TemplateFormatter::new(template)))
}

#[tokio::test]
async fn test_audit_entry_goes_only_to_audit_sink() {
    let audit = RecordingSink::new();
    let console = RecordingSink::new();
    let file = RecordingSink::new();

    let logger = Logger::new("security");
    logger
        .init(
            LoggerSettings::builder()
                .audit_sink(bind("audit", audit.clone(), "AUDIT {message}"))
                .sink(bind("console", console.clone(), "{message}"))
                .sink(bind("file", file.clone(), "{message}"))
                .build(),
        )
        .unwrap();

    logger.log_message(Level::Audit, "user alice granted admin").await.unwrap();

    assert_eq!(audit.records(), vec!["AUDIT user alice granted admin".to_string()]);
    assert!(console.is_empty());
    assert!(file.is_empty());
}

#[tokio::test]
async fn test_audit_without_audit_sink_fans_out() {
    let console = RecordingSink::new();
    let file = RecordingSink::new();

    let logger = Logger::new("security");
    logger
        .init(
            LoggerSettings::builder()
                .sink(bind("console", console.clone(), "{level}"))
                .sink(bind("file", file.clone(), "{level}"))
                .build(),
        )
        .unwrap();

    logger.log_message(Level::Audit, "login").await.unwrap();

    assert_eq!(console.records(), vec!["Audit".to_string()]);
    assert_eq!(file.records(), vec!["Audit".to_string()]);
}

#[tokio::test]
async fn test_below_minimum_level_writes_nothing() {
    let audit = RecordingSink::new();
    let console = RecordingSink::new();

    let logger = Logger::new("app");
    logger
        .init(
            LoggerSettings::builder()
                .minimum_level(Level::Error)
                .audit_sink(bind("audit", audit.clone(), "{message}"))
                .sink(bind("console", console.clone(), "{message}"))
                .build(),
        )
        .unwrap();

    for level in [Level::Trace, Level::Debug, Level::Information, Level::Warning] {
        logger.log_message(level, "quiet").await.unwrap();
    }
    logger.log(LogEntry::new(Level::None, "never")).await.unwrap();

    assert!(audit.is_empty());
    assert!(console.is_empty());
    assert_eq!(logger.metrics().entries_filtered(), 5);
}

#[tokio::test]
async fn test_one_failing_sink_does_not_block_others() {
    let sinks: Vec<RecordingSink> = (0..4).map(|_| RecordingSink::new()).collect();
    let broken = FailingSink::new("connection reset");

    let mut builder = LoggerSettings::builder();
    for (i, sink) in sinks.iter().enumerate() {
        builder = builder.sink(bind(&format!("sink-{i}"), sink.clone(), "{message}"));
        if i == 1 {
            builder = builder.sink(bind("broken", broken.clone(), "{message}"));
        }
    }
    let logger = Logger::new("app");
    logger.init(builder.build()).unwrap();

    let result = logger.log_message(Level::Error, "payload").await;

    match result {
        Err(LogError::Delivery(error)) => {
            assert_eq!(error.len(), 1);
            assert_eq!(error.failures()[0].sink, "broken");
            assert_eq!(error.failures()[0].error.message(), "connection reset");
        }
        other => panic!("expected delivery error, got {:?}", other.is_ok()),
    }
    assert_eq!(broken.attempts(), 1);
    for sink in &sinks {
        assert_eq!(sink.records(), vec!["payload".to_string()]);
    }
}

#[tokio::test]
async fn test_every_failure_is_reported() {
    let first = FailingSink::new("first down");
    let second = FailingSink::new("second down");
    let healthy = RecordingSink::new();

    let logger = Logger::new("app");
    logger
        .init(
            LoggerSettings::builder()
                .sink(bind("first", first.clone(), "{message}"))
                .sink(bind("healthy", healthy.clone(), "{message}"))
                .sink(bind("second", second.clone(), "{message}"))
                .build(),
        )
        .unwrap();

    let Err(LogError::Delivery(error)) = logger.log_message(Level::Critical, "x").await else {
        panic!("expected delivery error");
    };

    assert_eq!(error.failed_sinks().collect::<Vec<_>>(), vec!["first", "second"]);
    assert_eq!(healthy.len(), 1);
    assert_eq!(logger.metrics().delivery_failures(), 2);
}

#[tokio::test]
async fn test_failed_delivery_is_logged_through_tracing() {
    let capture = MockCaptureLayer::new();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let logger = Logger::new("app");
    logger
        .init(
            LoggerSettings::builder()
                .sink(bind("smtp", FailingSink::new("relay refused"), "{message}"))
                .build(),
        )
        .unwrap();

    assert!(logger.log_message(Level::Error, "x").await.is_err());

    let warnings = capture.with_message("sink delivery failed");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].level, tracing::Level::WARN);
    assert_eq!(warnings[0].field("sink"), Some("smtp"));
    assert_eq!(warnings[0].field("error"), Some("relay refused"));
}

/// Sink that only completes once every sink sharing the barrier is delivering.
#[derive(Debug, Clone)]
struct RendezvousSink {
    barrier: Arc<Barrier>,
    inner: RecordingSink,
}

#[async_trait]
impl Sink for RendezvousSink {
    async fn deliver(&self, text: &str) -> Result<(), SinkError> {
        self.barrier.wait().await;
        self.inner.deliver(text).await
    }
}

#[tokio::test]
async fn test_deliveries_run_concurrently() {
    let barrier = Arc::new(Barrier::new(3));
    let records = RecordingSink::new();

    let mut builder = LoggerSettings::builder();
    for i in 0..3 {
        let sink = RendezvousSink {
            barrier: Arc::clone(&barrier),
            inner: records.clone(),
        };
        builder = builder.sink(bind(&format!("sink-{i}"), sink, "{message}"));
    }
    let logger = Logger::new("app");
    logger.init(builder.build()).unwrap();

    // Sequential delivery would wait on the barrier forever.
    tokio::time::timeout(
        std::time::Duration::from_secs(5),
        logger.log_message(Level::Error, "together"),
    )
    .await
    .expect("deliveries did not run concurrently")
    .unwrap();

    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn test_each_sink_uses_its_own_formatter() {
    let short = RecordingSink::new();
    let long = RecordingSink::new();

    let logger = Logger::new("orders");
    logger
        .init(
            LoggerSettings::builder()
                .defaults(EntryDefaults {
                    application_id: "shop".into(),
                    environment: "prod".into(),
                    machine_name: "web-01".into(),
                })
                .sink(bind("short", short.clone(), "{message}"))
                .sink(bind(
                    "long",
                    long.clone(),
                    "{applicationId}@{machineName} [{level}] {message} {extendedProperties({key}={value};)}",
                ))
                .build(),
        )
        .unwrap();

    let entry = LogEntry::new(Level::Warning, "stock low")
        .with_property("sku", "A-1")
        .with_property("left", "2");
    logger.log(entry).await.unwrap();

    assert_eq!(short.records(), vec!["stock low".to_string()]);
    assert_eq!(
        long.records(),
        vec!["shop@web-01 [Warning] stock low sku=A-1;left=2;".to_string()]
    );
}

#[tokio::test]
async fn test_enrichers_see_earlier_mutations() {
    let sink = RecordingSink::new();
    let logger = Logger::new("app");
    logger
        .init(
            LoggerSettings::builder()
                .enricher(|entry: &mut LogEntry| {
                    entry.application_user_id = "u-42".into();
                })
                .enricher(|entry: &mut LogEntry| {
                    let user = entry.application_user_id.clone();
                    entry.extended_properties.insert("actor", user);
                })
                .sink(bind(
                    "memory",
                    sink.clone(),
                    "{applicationUserId} {extendedProperties({actor}={value})}",
                ))
                .build(),
        )
        .unwrap();

    logger.log_message(Level::Information, "x").await.unwrap();

    assert_eq!(sink.records(), vec!["u-42 actor=u-42".to_string()]);
}

#[tokio::test]
async fn test_uninitialized_logger_is_a_usage_error() {
    let logger = Logger::new("app");

    let error = logger.log_message(Level::Critical, "x").await.unwrap_err();
    assert!(error.is_usage_error());
    assert!(!logger.is_initialized());
}

#[tokio::test]
async fn test_shared_logger_across_tasks() {
    let sink = RecordingSink::new();
    let logger = Arc::new(Logger::new("app"));
    logger
        .init(
            LoggerSettings::builder()
                .sink(bind("memory", sink.clone(), "{message}"))
                .build(),
        )
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..10 {
        let logger = Arc::clone(&logger);
        handles.push(tokio::spawn(async move {
            logger.log_message(Level::Error, format!("task {i}")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(sink.len(), 10);
    assert_eq!(logger.metrics().entries_dispatched(), 10);
}
