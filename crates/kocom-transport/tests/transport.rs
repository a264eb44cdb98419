//! Transport lifecycle against in-memory pipes.

use kocom_transport::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn transport(connector: MemoryConnector) -> Transport<MemoryConnector> {
    Transport::new(connector, Backoff::new(Duration::from_secs(1), Duration::from_secs(30)))
}

#[tokio::test]
async fn test_send_and_receive() {
    let (connector, mut bus) = MemoryConnector::new();
    let transport = transport(connector);
    transport.open().await.unwrap();
    let mut peer = bus.accept().await.unwrap();

    assert_eq!(transport.send(&[1, 2, 3]).await.unwrap(), 3);
    let mut buf = [0u8; 3];
    peer.read_exact(&mut buf).await.unwrap();
    assert_eq!(buf, [1, 2, 3]);

    peer.write_all(&[9, 8]).await.unwrap();
    let got = transport.receive(512, Duration::from_millis(200)).await.unwrap();
    assert_eq!(got, vec![9, 8]);
    assert!(transport.idle_since() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_receive_timeout_is_empty() {
    let (connector, mut bus) = MemoryConnector::new();
    let transport = transport(connector);
    transport.open().await.unwrap();
    let _peer = bus.accept().await.unwrap();

    let got = transport.receive(512, Duration::from_millis(20)).await.unwrap();
    assert!(got.is_empty());
    assert!(transport.is_connected());
}

#[tokio::test]
async fn test_not_connected_errors() {
    let (connector, _bus) = MemoryConnector::new();
    let transport = transport(connector);
    assert!(matches!(transport.send(&[0]).await, Err(TransportError::NotConnected)));
    assert!(matches!(
        transport.receive(16, Duration::from_millis(10)).await,
        Err(TransportError::NotConnected)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_eof_marks_down_and_reconnects() {
    let (connector, mut bus) = MemoryConnector::new();
    let transport = transport(connector);
    transport.open().await.unwrap();
    let peer = bus.accept().await.unwrap();
    drop(peer);

    assert!(matches!(
        transport.receive(512, Duration::from_millis(50)).await,
        Err(TransportError::Closed)
    ));
    assert!(!transport.is_connected());

    transport.reconnect().await.unwrap();
    assert!(transport.is_connected());
    assert_eq!(transport.reconnect_count(), 1);
    assert_eq!(transport.generation(), 2);
    assert!(bus.try_accept().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_reconnects_collapse() {
    let (connector, mut bus) = MemoryConnector::new();
    let transport = Arc::new(transport(connector.clone()));
    transport.open().await.unwrap();
    let _first = bus.accept().await.unwrap();

    let (a, b) = tokio::join!(transport.reconnect(), transport.reconnect());
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(connector.attempts(), 2);
    assert_eq!(transport.reconnect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_grows_while_refused() {
    let (connector, _bus) = MemoryConnector::new();
    let transport = transport(connector.clone());
    connector.set_refuse(true);

    let start = tokio::time::Instant::now();
    assert!(transport.reconnect().await.is_err());
    assert_eq!(start.elapsed(), Duration::from_secs(1));
    assert!(transport.reconnect().await.is_err());
    assert_eq!(start.elapsed(), Duration::from_secs(3));
    assert!(transport.reconnect().await.is_err());
    assert_eq!(start.elapsed(), Duration::from_secs(7));

    connector.set_refuse(false);
    transport.reconnect().await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(15));

    // Reset after success: the next delay is the minimum again.
    transport.reconnect().await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(16));
}

#[tokio::test]
async fn test_close() {
    let (connector, mut bus) = MemoryConnector::new();
    let transport = transport(connector);
    transport.open().await.unwrap();
    let mut peer = bus.accept().await.unwrap();

    transport.close().await;
    assert!(!transport.is_connected());
    let mut buf = [0u8; 1];
    assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_write_times_out() {
    let (connector, mut bus) = MemoryConnector::new();
    let transport = transport(connector).with_write_timeout(Duration::from_millis(100));
    transport.open().await.unwrap();
    // Never read, so the pipe fills up.
    let _peer = bus.accept().await.unwrap();

    let block = vec![0u8; 64 * 1024];
    let started = tokio::time::Instant::now();
    let result = transport.send(&block).await;
    assert!(matches!(result, Err(TransportError::WriteTimeout(_))));
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(!transport.is_connected());
    assert!(matches!(transport.send(&[1]).await, Err(TransportError::NotConnected)));
}
