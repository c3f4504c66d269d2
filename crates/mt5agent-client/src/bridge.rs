//! Transport to the MT5 terminal bridge.
//!
//! The bridge speaks 4-byte big-endian length-prefixed JSON frames: one
//! tagged request per frame, one generic `{id, ok, data, error}` envelope
//! back. All platform semantics live on the terminal side; this client
//! only frames, correlates, and deserializes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use mt5agent_core::{
    AccountInfo, Bar, Deal, HistoryOrder, Mt5AgentError, Mt5AgentResult, OrderRequest, OrderSide,
    PendingOrder, Position, SymbolInfo, TerminalInfo, Tick, Timeframe, TradeResult,
};

use crate::api::{Mt5Api, Mt5Connector};
use crate::config::Mt5Config;

/// Requests understood by the terminal bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum BridgeRequest {
    Login {
        login: i64,
        password: String,
        server: String,
        timeout_ms: u64,
        terminal_path: Option<String>,
    },
    AccountInfo,
    TerminalInfo,
    Symbols {
        group: Option<String>,
    },
    SymbolInfo {
        symbol: String,
    },
    SymbolTick {
        symbol: String,
    },
    RatesLatest {
        symbol: String,
        timeframe: Timeframe,
        count: u32,
    },
    RatesRange {
        symbol: String,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    TicksLatest {
        symbol: String,
        seconds: u32,
    },
    Orders {
        symbol: Option<String>,
    },
    Positions {
        symbol: Option<String>,
    },
    OrderSend {
        request: OrderRequest,
    },
    OrderCheck {
        request: OrderRequest,
    },
    PositionClose {
        ticket: i64,
        deviation: u32,
        comment: String,
    },
    PositionModify {
        ticket: i64,
        sl: Option<f64>,
        tp: Option<f64>,
    },
    HistoryOrders {
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        symbol: Option<String>,
    },
    HistoryDeals {
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        symbol: Option<String>,
    },
    CalcMargin {
        side: OrderSide,
        symbol: String,
        volume: f64,
        price: f64,
    },
    CalcProfit {
        side: OrderSide,
        symbol: String,
        volume: f64,
        price_open: f64,
        price_close: f64,
    },
    CalcVolumeByMargin {
        side: OrderSide,
        symbol: String,
        margin: f64,
    },
    Shutdown,
}

#[derive(Debug, Serialize)]
struct RequestEnvelope {
    id: String,
    #[serde(flatten)]
    request: BridgeRequest,
}

#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    id: String,
    ok: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Writes one length-prefixed frame.
async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, body: &[u8]) -> Mt5AgentResult<()> {
    let len = body.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame.
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Mt5AgentResult<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

/// A connected session with the terminal bridge.
///
/// Request/response pairs are serialized behind an internal mutex; callers
/// share the client freely without further coordination.
pub struct BridgeClient {
    stream: Mutex<TcpStream>,
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient").finish_non_exhaustive()
    }
}

impl BridgeClient {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream: Mutex::new(stream),
        }
    }

    async fn call(&self, request: BridgeRequest) -> Mt5AgentResult<Value> {
        let envelope = RequestEnvelope {
            id: Uuid::new_v4().to_string(),
            request,
        };
        let body = serde_json::to_vec(&envelope)?;

        let mut stream = self.stream.lock().await;
        write_frame(&mut *stream, &body).await?;
        let reply = read_frame(&mut *stream).await?;
        drop(stream);

        let response: ResponseEnvelope = serde_json::from_slice(&reply)?;
        if response.id != envelope.id {
            return Err(Mt5AgentError::External(format!(
                "bridge response id mismatch: sent {}, got {}",
                envelope.id, response.id
            )));
        }
        if response.ok {
            Ok(response.data.unwrap_or(Value::Null))
        } else {
            Err(Mt5AgentError::External(
                response
                    .error
                    .unwrap_or_else(|| "unspecified bridge error".to_string()),
            ))
        }
    }

    fn record<T: serde::de::DeserializeOwned>(data: Value) -> Mt5AgentResult<Option<T>> {
        if data.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(data)?))
    }

    fn table<T: serde::de::DeserializeOwned>(data: Value) -> Mt5AgentResult<Vec<T>> {
        if data.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(data)?)
    }
}

#[async_trait]
impl Mt5Api for BridgeClient {
    async fn account_info(&self) -> Mt5AgentResult<Option<AccountInfo>> {
        Self::record(self.call(BridgeRequest::AccountInfo).await?)
    }

    async fn terminal_info(&self) -> Mt5AgentResult<Option<TerminalInfo>> {
        Self::record(self.call(BridgeRequest::TerminalInfo).await?)
    }

    async fn symbols(&self, group: Option<&str>) -> Mt5AgentResult<Vec<String>> {
        let data = self
            .call(BridgeRequest::Symbols {
                group: group.map(str::to_string),
            })
            .await?;
        Self::table(data)
    }

    async fn symbol_info(&self, symbol: &str) -> Mt5AgentResult<Option<SymbolInfo>> {
        let data = self
            .call(BridgeRequest::SymbolInfo {
                symbol: symbol.to_string(),
            })
            .await?;
        Self::record(data)
    }

    async fn symbol_tick(&self, symbol: &str) -> Mt5AgentResult<Option<Tick>> {
        let data = self
            .call(BridgeRequest::SymbolTick {
                symbol: symbol.to_string(),
            })
            .await?;
        Self::record(data)
    }

    async fn latest_rates(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: u32,
    ) -> Mt5AgentResult<Vec<Bar>> {
        let data = self
            .call(BridgeRequest::RatesLatest {
                symbol: symbol.to_string(),
                timeframe,
                count,
            })
            .await?;
        Self::table(data)
    }

    async fn rates_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Mt5AgentResult<Vec<Bar>> {
        let data = self
            .call(BridgeRequest::RatesRange {
                symbol: symbol.to_string(),
                timeframe,
                from,
                to,
            })
            .await?;
        Self::table(data)
    }

    async fn latest_ticks(&self, symbol: &str, seconds: u32) -> Mt5AgentResult<Vec<Tick>> {
        let data = self
            .call(BridgeRequest::TicksLatest {
                symbol: symbol.to_string(),
                seconds,
            })
            .await?;
        Self::table(data)
    }

    async fn orders(&self, symbol: Option<&str>) -> Mt5AgentResult<Vec<PendingOrder>> {
        let data = self
            .call(BridgeRequest::Orders {
                symbol: symbol.map(str::to_string),
            })
            .await?;
        Self::table(data)
    }

    async fn positions(&self, symbol: Option<&str>) -> Mt5AgentResult<Vec<Position>> {
        let data = self
            .call(BridgeRequest::Positions {
                symbol: symbol.map(str::to_string),
            })
            .await?;
        Self::table(data)
    }

    async fn order_send(&self, request: &OrderRequest) -> Mt5AgentResult<TradeResult> {
        let data = self
            .call(BridgeRequest::OrderSend {
                request: request.clone(),
            })
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    async fn order_check(&self, request: &OrderRequest) -> Mt5AgentResult<TradeResult> {
        let data = self
            .call(BridgeRequest::OrderCheck {
                request: request.clone(),
            })
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    async fn close_position(
        &self,
        ticket: i64,
        deviation: u32,
        comment: &str,
    ) -> Mt5AgentResult<TradeResult> {
        let data = self
            .call(BridgeRequest::PositionClose {
                ticket,
                deviation,
                comment: comment.to_string(),
            })
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    async fn modify_position(
        &self,
        ticket: i64,
        sl: Option<f64>,
        tp: Option<f64>,
    ) -> Mt5AgentResult<TradeResult> {
        let data = self
            .call(BridgeRequest::PositionModify { ticket, sl, tp })
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    async fn history_orders(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        symbol: Option<&str>,
    ) -> Mt5AgentResult<Vec<HistoryOrder>> {
        let data = self
            .call(BridgeRequest::HistoryOrders {
                from,
                to,
                symbol: symbol.map(str::to_string),
            })
            .await?;
        Self::table(data)
    }

    async fn history_deals(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        symbol: Option<&str>,
    ) -> Mt5AgentResult<Vec<Deal>> {
        let data = self
            .call(BridgeRequest::HistoryDeals {
                from,
                to,
                symbol: symbol.map(str::to_string),
            })
            .await?;
        Self::table(data)
    }

    async fn calc_margin(
        &self,
        side: OrderSide,
        symbol: &str,
        volume: f64,
        price: f64,
    ) -> Mt5AgentResult<Option<f64>> {
        let data = self
            .call(BridgeRequest::CalcMargin {
                side,
                symbol: symbol.to_string(),
                volume,
                price,
            })
            .await?;
        Ok(data.as_f64())
    }

    async fn calc_profit(
        &self,
        side: OrderSide,
        symbol: &str,
        volume: f64,
        price_open: f64,
        price_close: f64,
    ) -> Mt5AgentResult<Option<f64>> {
        let data = self
            .call(BridgeRequest::CalcProfit {
                side,
                symbol: symbol.to_string(),
                volume,
                price_open,
                price_close,
            })
            .await?;
        Ok(data.as_f64())
    }

    async fn calc_volume_by_margin(
        &self,
        side: OrderSide,
        symbol: &str,
        margin: f64,
    ) -> Mt5AgentResult<Option<f64>> {
        let data = self
            .call(BridgeRequest::CalcVolumeByMargin {
                side,
                symbol: symbol.to_string(),
                margin,
            })
            .await?;
        Ok(data.as_f64())
    }

    async fn shutdown(&self) -> Mt5AgentResult<()> {
        self.call(BridgeRequest::Shutdown).await?;
        Ok(())
    }
}

/// Default [`Mt5Connector`]: dials the terminal bridge and logs in.
#[derive(Debug, Clone)]
pub struct BridgeConnector {
    host: String,
    port: u16,
}

impl BridgeConnector {
    /// Creates a connector for the given bridge endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

#[async_trait]
impl Mt5Connector for BridgeConnector {
    async fn open(&self, config: &Mt5Config) -> Mt5AgentResult<Arc<dyn Mt5Api>> {
        let addr = format!("{}:{}", self.host, self.port);
        info!(%addr, "connecting to MT5 bridge");

        let stream = tokio::time::timeout(
            Duration::from_millis(config.timeout_ms),
            TcpStream::connect(&addr),
        )
        .await
        .map_err(|_| {
            Mt5AgentError::External(format!(
                "bridge connect to {addr} timed out after {}ms",
                config.timeout_ms
            ))
        })??;

        let client = BridgeClient::new(stream);
        client
            .call(BridgeRequest::Login {
                login: config.login,
                password: config.password.clone(),
                server: config.server.clone(),
                timeout_ms: config.timeout_ms,
                terminal_path: config.terminal_path.clone(),
            })
            .await?;
        info!(login = config.login, server = %config.server, "MT5 login accepted");

        Ok(Arc::new(client))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_roundtrip() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        write_frame(&mut a, br#"{"ok":true}"#).await.unwrap();
        let body = read_frame(&mut b).await.unwrap();
        assert_eq!(body, br#"{"ok":true}"#);
    }

    #[test]
    fn request_envelope_is_flat_and_tagged() {
        let envelope = RequestEnvelope {
            id: "req-1".to_string(),
            request: BridgeRequest::SymbolTick {
                symbol: "EURUSD".to_string(),
            },
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["id"], "req-1");
        assert_eq!(json["type"], "symbol_tick");
        assert_eq!(json["symbol"], "EURUSD");
    }

    #[test]
    fn response_envelope_defaults() {
        let response: ResponseEnvelope =
            serde_json::from_str(r#"{"id": "req-1", "ok": true}"#).unwrap();
        assert!(response.ok);
        assert!(response.data.is_none());
        assert!(response.error.is_none());
    }
}
