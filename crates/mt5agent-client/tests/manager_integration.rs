#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use mt5agent_client::{mock, ConnectionManager, MockConnector, MockMt5, Mt5Config};
use mt5agent_core::Mt5AgentError;

fn demo_config() -> Mt5Config {
    Mt5Config::new(123_456, "secret", "Demo-Server")
}

// ---------------------------------------------------------------------------
// 1. Lifecycle ordering: configure before connect, connect before client
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_requires_configuration() {
    let manager = ConnectionManager::new(Arc::new(MockConnector::new(Arc::new(MockMt5::new()))));

    let err = manager.connect().await.unwrap_err();
    assert!(matches!(err, Mt5AgentError::Configuration(_)));
    assert!(!manager.is_connected().await);
}

#[tokio::test]
async fn active_client_requires_connect() {
    let manager = ConnectionManager::new(Arc::new(MockConnector::new(Arc::new(MockMt5::new()))));
    manager.configure(demo_config()).await;

    let err = manager.active_client().await.unwrap_err();
    assert!(matches!(err, Mt5AgentError::NotConnected(_)));

    manager.connect().await.unwrap();
    assert!(manager.active_client().await.is_ok());
}

#[tokio::test]
async fn configure_overwrites_previous_config() {
    let manager = ConnectionManager::new(Arc::new(MockConnector::new(Arc::new(MockMt5::new()))));
    manager.configure(demo_config()).await;
    manager
        .configure(Mt5Config::new(777, "other", "Live-Server"))
        .await;

    assert!(manager.is_configured().await);
    manager.connect().await.unwrap();
    assert!(manager.is_connected().await);
}

// ---------------------------------------------------------------------------
// 2. Connect is a no-op while connected; the handle is not replaced
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_twice_keeps_existing_handle() {
    let connector = Arc::new(MockConnector::new(Arc::new(MockMt5::new())));
    let manager = ConnectionManager::new(connector.clone());
    manager.configure(demo_config()).await;

    manager.connect().await.unwrap();
    let first = manager.active_client().await.unwrap();

    manager.connect().await.unwrap();
    let second = manager.active_client().await.unwrap();

    assert_eq!(connector.open_count(), 1);
    assert!(Arc::ptr_eq(&first, &second));
}

// ---------------------------------------------------------------------------
// 3. Connector failure propagates and leaves the manager disconnected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_connect_resets_state() {
    let manager = ConnectionManager::new(Arc::new(MockConnector::failing("terminal not running")));
    manager.configure(demo_config()).await;

    let err = manager.connect().await.unwrap_err();
    assert!(err.to_string().contains("terminal not running"));
    assert!(!manager.is_connected().await);
    assert!(matches!(
        manager.active_client().await.unwrap_err(),
        Mt5AgentError::NotConnected(_)
    ));
}

// ---------------------------------------------------------------------------
// 4. Disconnect always lands in the disconnected state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disconnect_swallows_shutdown_failure() {
    let api = Arc::new(MockMt5::new().with_failing_shutdown());
    let manager = ConnectionManager::new(Arc::new(MockConnector::new(api.clone())));
    manager.configure(demo_config()).await;
    manager.connect().await.unwrap();

    manager.disconnect().await;

    assert_eq!(api.shutdown_count(), 1);
    assert!(!manager.is_connected().await);
}

#[tokio::test]
async fn disconnect_without_connection_is_harmless() {
    let manager = ConnectionManager::new(Arc::new(MockConnector::new(Arc::new(MockMt5::new()))));
    manager.disconnect().await;
    assert!(!manager.is_connected().await);
}

#[tokio::test]
async fn reconnect_after_disconnect_opens_fresh_client() {
    let connector = Arc::new(MockConnector::new(Arc::new(MockMt5::new())));
    let manager = ConnectionManager::new(connector.clone());
    manager.configure(demo_config()).await;

    manager.connect().await.unwrap();
    manager.disconnect().await;
    manager.connect().await.unwrap();

    assert_eq!(connector.open_count(), 2);
    assert!(manager.is_connected().await);
}

// ---------------------------------------------------------------------------
// 5. Concurrent connects race onto one session
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_connects_open_once() {
    let connector = Arc::new(MockConnector::new(Arc::new(MockMt5::new())));
    let manager = Arc::new(ConnectionManager::new(connector.clone()));
    manager.configure(demo_config()).await;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.connect().await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(connector.open_count(), 1);
}

// ---------------------------------------------------------------------------
// 6. The mock client honors scripted records through the shared handle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scripted_records_flow_through_manager() {
    let api = Arc::new(
        MockMt5::new()
            .with_symbols(&["EURUSD", "GBPUSD", "USDJPY"])
            .with_tick("EURUSD", mock::tick(1.1000, 1.1002)),
    );
    let manager = ConnectionManager::new(Arc::new(MockConnector::new(api)));
    manager.configure(demo_config()).await;
    manager.connect().await.unwrap();

    let client = manager.active_client().await.unwrap();
    let usd = client.symbols(Some("*USD*")).await.unwrap();
    assert_eq!(usd.len(), 3);

    let tick = client.symbol_tick("EURUSD").await.unwrap().unwrap();
    assert_eq!(tick.bid, 1.1000);
    assert!(client.symbol_tick("XAUUSD").await.unwrap().is_none());
}
