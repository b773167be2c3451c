//! Startup sequence tests
use assert_matches::assert_matches;
use firehose_app::{
    test_utils::{TestHybridSource, TestTailManager, TestTracker, TestTransportServer},
    App, AppError, Config, Modules,
};
use std::{sync::Arc, time::Duration};

fn config(live: bool) -> Config {
    Config {
        block_store_urls: vec!["file:///var/firehose/merged-blocks".into()],
        block_stream_addr: live.then(|| "localhost:10014".to_string()),
        start_block_retry_interval: Duration::ZERO,
        grpc_shutdown_grace_period: Duration::from_millis(200),
        ..Default::default()
    }
}

fn live_app(tracker: TestTracker, source: &Arc<TestHybridSource>) -> Arc<App> {
    Arc::new(App::new(
        config(true),
        Modules::new(Arc::new(tracker), Arc::new(TestTransportServer::default()))
            .with_hybrid_source(source.clone()),
    ))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ready_without_live() {
    let server = Arc::new(TestTransportServer::default());
    let app = App::new(config(false), Modules::new(Arc::new(TestTracker::default()), server));
    app.run().await.unwrap();
    assert!(app.is_ready());
    app.terminator().shutdown().await;
    assert!(!app.is_ready());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_head_unknown_launches_previous_bundle() {
    let source = Arc::new(TestHybridSource::default());
    source.reach_real_time();
    let app = live_app(TestTracker::default().with_lib(250), &source);

    app.run().await.unwrap();
    assert!(app.is_ready());
    source.wait_for_launch().await;
    assert_eq!(source.launched_at(), Some(100));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_head_in_same_bundle_launches_previous_bundle() {
    let source = Arc::new(TestHybridSource::default());
    source.reach_real_time();
    let app = live_app(TestTracker::default().with_lib(250).with_head(251), &source);

    app.run().await.unwrap();
    source.wait_for_launch().await;
    assert_eq!(source.launched_at(), Some(100));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_head_in_later_bundle_launches_at_lib() {
    let source = Arc::new(TestHybridSource::default());
    source.reach_real_time();
    let app = live_app(TestTracker::default().with_lib(250).with_head(900), &source);

    app.run().await.unwrap();
    source.wait_for_launch().await;
    assert_eq!(source.launched_at(), Some(250));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_not_ready_until_real_time() {
    let source = Arc::new(TestHybridSource::default());
    let app = live_app(TestTracker::default().with_lib(5_000).with_head(6_000), &source);

    let run = tokio::spawn({
        let app = Arc::clone(&app);
        async move { app.run().await }
    });

    source.wait_for_launch().await;
    for _ in 0..20 {
        assert!(!app.is_ready());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(!run.is_finished());

    source.reach_real_time();
    run.await.unwrap().unwrap();
    assert!(app.is_ready());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tracker_failures_are_retried() {
    firehose_tracing::init_test_tracing();
    let source = Arc::new(TestHybridSource::default());
    source.reach_real_time();
    let tracker = TestTracker::default().with_lib(1_337).with_head(2_000);
    tracker.fail_lib_times(11);
    let app = live_app(tracker, &source);

    app.run().await.unwrap();
    assert!(app.is_ready());
    source.wait_for_launch().await;
    assert_eq!(source.launched_at(), Some(1_337));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_launch_failure_is_fatal() {
    firehose_tracing::init_test_tracing();
    let source = Arc::new(TestHybridSource::default());
    source.fail_launch("unable to open block store");
    let app = live_app(TestTracker::default().with_lib(250).with_head(900), &source);

    assert_matches!(app.run().await, Err(AppError::Hub(_)));
    app.terminator().terminated().await;
    assert!(!app.is_ready());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tail_manager_runs_with_live_only() {
    let source = Arc::new(TestHybridSource::default());
    source.reach_real_time();
    let tail_manager = Arc::new(TestTailManager::default());

    let app = App::new(
        config(false),
        Modules::new(
            Arc::new(TestTracker::default()),
            Arc::new(TestTransportServer::default()),
        )
        .with_tail_manager(tail_manager.clone()),
    );
    app.run().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!tail_manager.is_running());

    let app = App::new(
        config(true),
        Modules::new(
            Arc::new(TestTracker::default().with_lib(100).with_head(500)),
            Arc::new(TestTransportServer::default()),
        )
        .with_hybrid_source(source)
        .with_tail_manager(tail_manager.clone()),
    );
    app.run().await.unwrap();
    app.terminator().shutdown().await;
    assert!(tail_manager.is_stopped());
}
