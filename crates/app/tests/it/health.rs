//! Readiness probe served by the app
use firehose_app::{
    test_utils::{TestHybridSource, TestTracker},
    App, Config, HealthServer, Modules, ReadinessState,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

async fn probe(addr: SocketAddr) -> u16 {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response.split_whitespace().nth(1).unwrap().parse().unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_probe_follows_startup() {
    let source = Arc::new(TestHybridSource::default());
    let config = Config {
        block_store_urls: vec!["file:///var/firehose/merged-blocks".into()],
        block_stream_addr: Some("localhost:10014".into()),
        grpc_listen_addr: "127.0.0.1:0".parse().unwrap(),
        grpc_shutdown_grace_period: Duration::from_millis(500),
        start_block_retry_interval: Duration::ZERO,
        ..Default::default()
    };

    let readiness = Arc::new(ReadinessState::new());
    let server =
        Arc::new(HealthServer::bind(config.grpc_listen_addr, Arc::clone(&readiness)).await.unwrap());
    let addr = server.local_addr();
    let app = Arc::new(App::with_readiness(
        config,
        Modules::new(Arc::new(TestTracker::default().with_lib(250).with_head(900)), server)
            .with_hybrid_source(source.clone()),
        readiness,
    ));

    let run = tokio::spawn({
        let app = Arc::clone(&app);
        async move { app.run().await }
    });
    source.wait_for_launch().await;
    assert_eq!(probe(addr).await, 503);

    source.reach_real_time();
    run.await.unwrap().unwrap();
    assert!(app.is_ready());
    assert_eq!(probe(addr).await, 200);

    app.terminator().shutdown().await;
    assert!(TcpStream::connect(addr).await.is_err());
}
