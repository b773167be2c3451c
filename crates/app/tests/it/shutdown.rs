//! Termination tests
use assert_matches::assert_matches;
use firehose_app::{
    run_until_ctrl_c,
    test_utils::{TestHybridSource, TestTracker, TestTransportServer},
    App, AppError, Config, Modules,
};
use std::{sync::Arc, time::Duration};

fn config() -> Config {
    Config {
        block_store_urls: vec!["file:///var/firehose/merged-blocks".into()],
        block_stream_addr: Some("localhost:10014".into()),
        start_block_retry_interval: Duration::from_millis(10),
        grpc_shutdown_grace_period: Duration::from_millis(200),
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_during_first_tracker_poll() {
    let tracker = Arc::new(TestTracker::default().with_lib(250).with_head(900));
    tracker.block_forever();
    let source = Arc::new(TestHybridSource::default());
    let app = Arc::new(App::new(
        config(),
        Modules::new(tracker.clone(), Arc::new(TestTransportServer::default()))
            .with_hybrid_source(source.clone()),
    ));

    let run = tokio::spawn({
        let app = Arc::clone(&app);
        async move { app.run().await }
    });
    tracker.wait_for_lib_call().await;
    app.terminator().shutdown().await;

    tokio::time::timeout(Duration::from_secs(5), run).await.unwrap().unwrap().unwrap();
    assert!(!app.is_ready());
    assert_eq!(source.launched_at(), None);
    assert_eq!(tracker.head_calls(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_while_tracker_unavailable() {
    let tracker = Arc::new(TestTracker::default());
    let source = Arc::new(TestHybridSource::default());
    let app = Arc::new(App::new(
        config(),
        Modules::new(tracker.clone(), Arc::new(TestTransportServer::default()))
            .with_hybrid_source(source.clone()),
    ));

    let run = tokio::spawn({
        let app = Arc::clone(&app);
        async move { app.run().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(tracker.lib_calls() > 1);
    app.terminator().shutdown().await;

    run.await.unwrap().unwrap();
    assert!(!app.is_ready());
    assert_eq!(source.launched_at(), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_while_waiting_for_real_time() {
    let source = Arc::new(TestHybridSource::default());
    let server = Arc::new(TestTransportServer::default());
    let app = Arc::new(App::new(
        config(),
        Modules::new(Arc::new(TestTracker::default().with_lib(250).with_head(900)), server.clone())
            .with_hybrid_source(source.clone()),
    ));

    let run = tokio::spawn({
        let app = Arc::clone(&app);
        async move { app.run().await }
    });
    source.wait_for_launch().await;
    app.terminator().shutdown().await;
    // catching up after termination must not make the app ready
    source.reach_real_time();

    run.await.unwrap().unwrap();
    assert!(!app.is_ready());
    assert_eq!(server.shutdown_calls(), 1);
    assert_eq!(server.last_grace_period(), Some(Duration::from_millis(200)));
    assert_eq!(app.terminator().error(), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_termination_supersedes_readiness() {
    let source = Arc::new(TestHybridSource::default());
    source.reach_real_time();
    let app = App::new(
        config(),
        Modules::new(
            Arc::new(TestTracker::default().with_lib(250).with_head(900)),
            Arc::new(TestTransportServer::default()),
        )
        .with_hybrid_source(source),
    );

    app.run().await.unwrap();
    assert!(app.is_ready());

    app.terminator().terminate(None);
    assert!(!app.is_ready());
    app.terminator().terminated().await;
    assert!(!app.is_ready());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_hub_failure_after_ready_terminates() {
    firehose_tracing::init_test_tracing();
    let source = Arc::new(TestHybridSource::default());
    source.reach_real_time();
    let app = App::new(
        config(),
        Modules::new(
            Arc::new(TestTracker::default().with_lib(250).with_head(900)),
            Arc::new(TestTransportServer::default()),
        )
        .with_hybrid_source(source.clone()),
    );

    app.run().await.unwrap();
    source.wait_for_launch().await;
    source.fail_launch("live stream closed");

    tokio::time::timeout(Duration::from_secs(5), app.terminator().terminated()).await.unwrap();
    assert!(!app.is_ready());
    assert!(app.terminator().error().unwrap().contains("live stream closed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_crash_ends_runner_with_error() {
    firehose_tracing::init_test_tracing();
    let server = Arc::new(TestTransportServer::default());
    let config = Config { block_stream_addr: None, ..config() };
    let app = App::new(config, Modules::new(Arc::new(TestTracker::default()), server.clone()));
    let readiness = app.readiness();

    let runner = tokio::spawn(run_until_ctrl_c(app));
    while !readiness.is_ready() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    server.crash();

    let res = tokio::time::timeout(Duration::from_secs(5), runner).await.unwrap().unwrap();
    assert_matches!(res, Err(AppError::Terminated(err)) if err.contains("listener closed"));
    assert!(!readiness.is_ready());
}
