//! Market data skills: symbols, ticks, and OHLCV rates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use mt5agent_client::ConnectionManager;
use mt5agent_core::{Mt5AgentError, Mt5AgentResult, SkillCategory, SkillResult, Timeframe};

use crate::skill::{parse_request, result_schema, Skill, SkillDescriptor, SkillRequest};

fn default_timeframe() -> Timeframe {
    Timeframe::H1
}

fn default_count() -> u32 {
    100
}

fn default_seconds() -> u32 {
    60
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetSymbolsRequest {
    #[serde(default)]
    group: Option<String>,
}

impl SkillRequest for GetSymbolsRequest {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SymbolRequest {
    symbol: String,
}

impl SkillRequest for SymbolRequest {
    fn constraints(&self) -> Vec<String> {
        if self.symbol.is_empty() {
            vec!["'symbol' must not be empty".to_string()]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetLatestRatesRequest {
    symbol: String,
    #[serde(default = "default_timeframe")]
    timeframe: Timeframe,
    #[serde(default = "default_count")]
    count: u32,
}

impl SkillRequest for GetLatestRatesRequest {
    fn constraints(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.symbol.is_empty() {
            violations.push("'symbol' must not be empty".to_string());
        }
        if !(1..=10_000).contains(&self.count) {
            violations.push("'count' must be between 1 and 10000".to_string());
        }
        violations
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetRatesRangeRequest {
    symbol: String,
    #[serde(default = "default_timeframe")]
    timeframe: Timeframe,
    date_from: DateTime<Utc>,
    date_to: DateTime<Utc>,
}

impl SkillRequest for GetRatesRangeRequest {
    fn constraints(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.symbol.is_empty() {
            violations.push("'symbol' must not be empty".to_string());
        }
        if self.date_from > self.date_to {
            violations.push("'date_from' must not be after 'date_to'".to_string());
        }
        violations
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetLatestTicksRequest {
    symbol: String,
    #[serde(default = "default_seconds")]
    seconds: u32,
}

impl SkillRequest for GetLatestTicksRequest {
    fn constraints(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.symbol.is_empty() {
            violations.push("'symbol' must not be empty".to_string());
        }
        if !(1..=86_400).contains(&self.seconds) {
            violations.push("'seconds' must be between 1 and 86400".to_string());
        }
        violations
    }
}

fn symbol_property() -> Value {
    json!({"type": "string", "description": "Symbol name (e.g., 'EURUSD')"})
}

fn timeframe_property() -> Value {
    json!({
        "type": "string",
        "enum": Timeframe::names(),
        "default": "H1",
        "description": "Timeframe for the rates (e.g., 'M1', 'H1', 'D1')"
    })
}

/// Lists available symbols, optionally filtered by a group pattern.
pub struct GetSymbolsSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl GetSymbolsSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "get_symbols".to_string(),
                description: "Retrieve a list of available trading symbols from MT5, optionally \
                              filtered by a group pattern (e.g., '*USD*' for USD pairs)."
                    .to_string(),
                category: SkillCategory::MarketData,
                parameters_schema: json!({
                    "type": "object",
                    "properties": {
                        "group": {
                            "type": "string",
                            "description": "Filter symbols by group pattern (e.g., '*USD*', 'Forex*')"
                        }
                    },
                    "additionalProperties": false
                }),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: GetSymbolsRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let symbols = client.symbols(request.group.as_deref()).await?;
        Ok(json!({"count": symbols.len(), "symbols": symbols}))
    }
}

#[async_trait]
impl Skill for GetSymbolsSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<GetSymbolsRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<GetSymbolsRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}

/// Retrieves prices, spread, and trade specifications for one symbol.
pub struct GetSymbolInfoSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl GetSymbolInfoSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "get_symbol_info".to_string(),
                description: "Retrieve detailed information about a trading symbol, including \
                              current prices, spread, lot specifications, and trading conditions."
                    .to_string(),
                category: SkillCategory::MarketData,
                parameters_schema: json!({
                    "type": "object",
                    "properties": {"symbol": symbol_property()},
                    "required": ["symbol"],
                    "additionalProperties": false
                }),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: SymbolRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let info = client.symbol_info(&request.symbol).await?.ok_or_else(|| {
            Mt5AgentError::External(format!(
                "Symbol '{}' not found or not available",
                request.symbol
            ))
        })?;
        Ok(serde_json::to_value(info)?)
    }
}

#[async_trait]
impl Skill for GetSymbolInfoSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<SymbolRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<SymbolRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}

/// Retrieves the current tick for one symbol.
pub struct GetTickSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl GetTickSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "get_tick".to_string(),
                description: "Retrieve the current tick (bid/ask prices, last price, volume) for \
                              a trading symbol."
                    .to_string(),
                category: SkillCategory::MarketData,
                parameters_schema: json!({
                    "type": "object",
                    "properties": {"symbol": symbol_property()},
                    "required": ["symbol"],
                    "additionalProperties": false
                }),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: SymbolRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let tick = client.symbol_tick(&request.symbol).await?.ok_or_else(|| {
            Mt5AgentError::External(format!("Could not get tick for symbol '{}'", request.symbol))
        })?;
        Ok(serde_json::to_value(tick)?)
    }
}

#[async_trait]
impl Skill for GetTickSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<SymbolRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<SymbolRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}

/// Retrieves the most recent OHLCV bars for a symbol.
pub struct GetLatestRatesSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl GetLatestRatesSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "get_latest_rates".to_string(),
                description: "Retrieve the latest OHLCV (Open, High, Low, Close, Volume) price \
                              bars for a symbol with a specified timeframe and count."
                    .to_string(),
                category: SkillCategory::MarketData,
                parameters_schema: json!({
                    "type": "object",
                    "properties": {
                        "symbol": symbol_property(),
                        "timeframe": timeframe_property(),
                        "count": {
                            "type": "integer",
                            "minimum": 1,
                            "maximum": 10000,
                            "default": 100,
                            "description": "Number of bars to retrieve"
                        }
                    },
                    "required": ["symbol"],
                    "additionalProperties": false
                }),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: GetLatestRatesRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let bars = client
            .latest_rates(&request.symbol, request.timeframe, request.count)
            .await?;
        if bars.is_empty() {
            return Err(Mt5AgentError::External(format!(
                "No rates found for symbol '{}'",
                request.symbol
            )));
        }
        Ok(json!({
            "symbol": request.symbol,
            "timeframe": request.timeframe,
            "count": bars.len(),
            "rates": bars,
        }))
    }
}

#[async_trait]
impl Skill for GetLatestRatesSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<GetLatestRatesRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<GetLatestRatesRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}

/// Retrieves OHLCV bars for a symbol between two instants.
pub struct GetRatesRangeSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl GetRatesRangeSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "get_rates_range".to_string(),
                description: "Retrieve OHLCV price bars for a symbol within a specific date/time \
                              range. Useful for historical analysis of specific periods."
                    .to_string(),
                category: SkillCategory::MarketData,
                parameters_schema: json!({
                    "type": "object",
                    "properties": {
                        "symbol": symbol_property(),
                        "timeframe": timeframe_property(),
                        "date_from": {
                            "type": "string",
                            "format": "date-time",
                            "description": "Start date/time for the range"
                        },
                        "date_to": {
                            "type": "string",
                            "format": "date-time",
                            "description": "End date/time for the range"
                        }
                    },
                    "required": ["symbol", "date_from", "date_to"],
                    "additionalProperties": false
                }),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: GetRatesRangeRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let bars = client
            .rates_range(
                &request.symbol,
                request.timeframe,
                request.date_from,
                request.date_to,
            )
            .await?;
        if bars.is_empty() {
            return Err(Mt5AgentError::External(format!(
                "No rates found for symbol '{}' in the specified range",
                request.symbol
            )));
        }
        Ok(json!({
            "symbol": request.symbol,
            "timeframe": request.timeframe,
            "date_from": request.date_from,
            "date_to": request.date_to,
            "count": bars.len(),
            "rates": bars,
        }))
    }
}

#[async_trait]
impl Skill for GetRatesRangeSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<GetRatesRangeRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<GetRatesRangeRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}

/// Retrieves tick-by-tick data for the trailing window.
pub struct GetLatestTicksSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl GetLatestTicksSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "get_latest_ticks".to_string(),
                description: "Retrieve tick-by-tick price data for a symbol for the last N \
                              seconds. Useful for high-frequency analysis and market \
                              microstructure study."
                    .to_string(),
                category: SkillCategory::MarketData,
                parameters_schema: json!({
                    "type": "object",
                    "properties": {
                        "symbol": symbol_property(),
                        "seconds": {
                            "type": "integer",
                            "minimum": 1,
                            "maximum": 86400,
                            "default": 60,
                            "description": "Number of seconds of tick data"
                        }
                    },
                    "required": ["symbol"],
                    "additionalProperties": false
                }),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: GetLatestTicksRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let ticks = client
            .latest_ticks(&request.symbol, request.seconds)
            .await?;
        if ticks.is_empty() {
            return Err(Mt5AgentError::External(format!(
                "No ticks found for symbol '{}'",
                request.symbol
            )));
        }
        Ok(json!({
            "symbol": request.symbol,
            "seconds": request.seconds,
            "count": ticks.len(),
            "ticks": ticks,
        }))
    }
}

#[async_trait]
impl Skill for GetLatestTicksSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<GetLatestTicksRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<GetLatestTicksRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}
