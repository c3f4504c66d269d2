use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use mt5agent_core::{Mt5AgentError, Mt5AgentResult};

use crate::api::{Mt5Api, Mt5Connector};
use crate::config::Mt5Config;

#[derive(Default)]
struct ManagerState {
    config: Option<Mt5Config>,
    client: Option<Arc<dyn Mt5Api>>,
}

/// Guarded lifecycle of the single active terminal session.
///
/// Owned and injected rather than process-global: construct one, share it
/// via `Arc` with the registry and skills. State transitions
/// (configure/connect/disconnect) run under one mutex; the client handle
/// itself is handed out shared, with no call-level serialization.
pub struct ConnectionManager {
    connector: Arc<dyn Mt5Connector>,
    state: Mutex<ManagerState>,
}

impl ConnectionManager {
    /// Creates a manager that opens clients through `connector`.
    pub fn new(connector: Arc<dyn Mt5Connector>) -> Self {
        Self {
            connector,
            state: Mutex::new(ManagerState::default()),
        }
    }

    /// Records the connection configuration, overwriting any prior one.
    pub async fn configure(&self, config: Mt5Config) {
        let mut state = self.state.lock().await;
        state.config = Some(config);
    }

    /// Opens the session.
    ///
    /// Fails with `Configuration` when no config was recorded. A second
    /// call while connected is a no-op that keeps the existing handle. On
    /// connector failure the manager stays disconnected and the error
    /// propagates; no retries.
    pub async fn connect(&self) -> Mt5AgentResult<()> {
        let mut state = self.state.lock().await;
        let config = state.config.clone().ok_or_else(|| {
            Mt5AgentError::Configuration(
                "connection manager not configured; call configure() first".to_string(),
            )
        })?;

        if state.client.is_some() {
            return Ok(());
        }

        match self.connector.open(&config).await {
            Ok(client) => {
                state.client = Some(client);
                info!(login = config.login, server = %config.server, "connected to MT5");
                Ok(())
            }
            Err(e) => {
                state.client = None;
                Err(e)
            }
        }
    }

    /// Releases the session. Shutdown failures are logged and swallowed;
    /// the manager always ends disconnected.
    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        if let Some(client) = state.client.take() {
            if let Err(e) = client.shutdown().await {
                warn!(error = %e, "ignoring MT5 shutdown failure");
            }
            info!("disconnected from MT5");
        }
    }

    /// Returns the shared client handle, or `NotConnected` when no
    /// successful connect has happened since the last disconnect.
    pub async fn active_client(&self) -> Mt5AgentResult<Arc<dyn Mt5Api>> {
        self.state.lock().await.client.clone().ok_or_else(|| {
            Mt5AgentError::NotConnected("no active MT5 session; call connect() first".to_string())
        })
    }

    /// Whether a configuration has been recorded.
    pub async fn is_configured(&self) -> bool {
        self.state.lock().await.config.is_some()
    }

    /// Whether a connected client handle exists.
    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.client.is_some()
    }
}
