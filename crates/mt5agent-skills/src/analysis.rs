//! Analysis skills: margin, profit, volume, and spread calculations.
//!
//! Margin, profit, and volume figures are delegated to the platform's own
//! calculation calls; only spread composes fields already returned by the
//! tick and symbol lookups.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use mt5agent_client::ConnectionManager;
use mt5agent_core::{Mt5AgentError, Mt5AgentResult, OrderSide, SkillCategory, SkillResult};

use crate::skill::{parse_request, result_schema, Skill, SkillDescriptor, SkillRequest};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CalculateMarginRequest {
    symbol: String,
    volume: f64,
    order_side: OrderSide,
    #[serde(default)]
    price: Option<f64>,
}

impl SkillRequest for CalculateMarginRequest {
    fn constraints(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.symbol.is_empty() {
            violations.push("'symbol' must not be empty".to_string());
        }
        if self.volume <= 0.0 {
            violations.push("'volume' must be greater than 0".to_string());
        }
        violations
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CalculateProfitRequest {
    symbol: String,
    volume: f64,
    order_side: OrderSide,
    price_open: f64,
    price_close: f64,
}

impl SkillRequest for CalculateProfitRequest {
    fn constraints(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.symbol.is_empty() {
            violations.push("'symbol' must not be empty".to_string());
        }
        if self.volume <= 0.0 {
            violations.push("'volume' must be greater than 0".to_string());
        }
        violations
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CalculateMaxVolumeRequest {
    symbol: String,
    margin: f64,
    order_side: OrderSide,
}

impl SkillRequest for CalculateMaxVolumeRequest {
    fn constraints(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.symbol.is_empty() {
            violations.push("'symbol' must not be empty".to_string());
        }
        if self.margin <= 0.0 {
            violations.push("'margin' must be greater than 0".to_string());
        }
        violations
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CalculateSpreadRequest {
    symbol: String,
}

impl SkillRequest for CalculateSpreadRequest {
    fn constraints(&self) -> Vec<String> {
        if self.symbol.is_empty() {
            vec!["'symbol' must not be empty".to_string()]
        } else {
            Vec::new()
        }
    }
}

fn side_property() -> Value {
    json!({"type": "string", "enum": ["BUY", "SELL"], "description": "Order side"})
}

/// Calculates the margin required to open a position.
pub struct CalculateMarginSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl CalculateMarginSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "calculate_margin".to_string(),
                description: "Calculate the margin requirement for opening a position with \
                              specified symbol, volume, and order side. Useful for risk \
                              management."
                    .to_string(),
                category: SkillCategory::Analysis,
                parameters_schema: json!({
                    "type": "object",
                    "properties": {
                        "symbol": {"type": "string", "description": "Symbol to calculate margin for (e.g., 'EURUSD')"},
                        "volume": {"type": "number", "exclusiveMinimum": 0, "description": "Trade volume in lots"},
                        "order_side": side_property(),
                        "price": {"type": "number", "description": "Price to calculate at. Omit to use the current market price."}
                    },
                    "required": ["symbol", "volume", "order_side"],
                    "additionalProperties": false
                }),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: CalculateMarginRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;

        // An omitted price means the side's current market price.
        let price = match request.price {
            Some(price) => price,
            None => {
                let tick = client.symbol_tick(&request.symbol).await?.ok_or_else(|| {
                    Mt5AgentError::External(format!(
                        "Could not get tick data for {}",
                        request.symbol
                    ))
                })?;
                match request.order_side {
                    OrderSide::Buy => tick.ask,
                    OrderSide::Sell => tick.bid,
                }
            }
        };

        let margin = client
            .calc_margin(request.order_side, &request.symbol, request.volume, price)
            .await?
            .ok_or_else(|| {
                Mt5AgentError::External(format!("Could not calculate margin for {}", request.symbol))
            })?;

        Ok(json!({
            "symbol": request.symbol,
            "volume": request.volume,
            "order_side": request.order_side,
            "price": price,
            "required_margin": margin,
        }))
    }
}

#[async_trait]
impl Skill for CalculateMarginSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<CalculateMarginRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<CalculateMarginRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}

/// Calculates profit/loss for a hypothetical trade.
pub struct CalculateProfitSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl CalculateProfitSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "calculate_profit".to_string(),
                description: "Calculate the potential profit or loss for a trade given the \
                              symbol, volume, order side, and entry/exit prices."
                    .to_string(),
                category: SkillCategory::Analysis,
                parameters_schema: json!({
                    "type": "object",
                    "properties": {
                        "symbol": {"type": "string", "description": "Symbol to calculate profit for (e.g., 'EURUSD')"},
                        "volume": {"type": "number", "exclusiveMinimum": 0, "description": "Trade volume in lots"},
                        "order_side": side_property(),
                        "price_open": {"type": "number", "description": "Opening price"},
                        "price_close": {"type": "number", "description": "Closing price"}
                    },
                    "required": ["symbol", "volume", "order_side", "price_open", "price_close"],
                    "additionalProperties": false
                }),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: CalculateProfitRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let profit = client
            .calc_profit(
                request.order_side,
                &request.symbol,
                request.volume,
                request.price_open,
                request.price_close,
            )
            .await?
            .ok_or_else(|| {
                Mt5AgentError::External(format!("Could not calculate profit for {}", request.symbol))
            })?;

        Ok(json!({
            "symbol": request.symbol,
            "volume": request.volume,
            "order_side": request.order_side,
            "price_open": request.price_open,
            "price_close": request.price_close,
            "profit": profit,
        }))
    }
}

#[async_trait]
impl Skill for CalculateProfitSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<CalculateProfitRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<CalculateProfitRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}

/// Calculates the maximum volume openable with a given margin.
pub struct CalculateMaxVolumeSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl CalculateMaxVolumeSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "calculate_max_volume".to_string(),
                description: "Calculate the maximum trade volume (lot size) that can be opened \
                              with a given margin amount for a specified symbol and order side."
                    .to_string(),
                category: SkillCategory::Analysis,
                parameters_schema: json!({
                    "type": "object",
                    "properties": {
                        "symbol": {"type": "string", "description": "Symbol to calculate volume for (e.g., 'EURUSD')"},
                        "margin": {"type": "number", "exclusiveMinimum": 0, "description": "Available margin amount"},
                        "order_side": side_property()
                    },
                    "required": ["symbol", "margin", "order_side"],
                    "additionalProperties": false
                }),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: CalculateMaxVolumeRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let max_volume = client
            .calc_volume_by_margin(request.order_side, &request.symbol, request.margin)
            .await?
            .ok_or_else(|| {
                Mt5AgentError::External(format!(
                    "Could not calculate max volume for {}",
                    request.symbol
                ))
            })?;

        Ok(json!({
            "symbol": request.symbol,
            "available_margin": request.margin,
            "order_side": request.order_side,
            "max_volume": max_volume,
        }))
    }
}

#[async_trait]
impl Skill for CalculateMaxVolumeSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<CalculateMaxVolumeRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<CalculateMaxVolumeRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}

/// Calculates the current spread and spread ratio for a symbol.
pub struct CalculateSpreadSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl CalculateSpreadSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "calculate_spread".to_string(),
                description: "Calculate the current spread (difference between bid and ask \
                              prices) and spread ratio for a symbol. Useful for evaluating \
                              trading costs."
                    .to_string(),
                category: SkillCategory::Analysis,
                parameters_schema: json!({
                    "type": "object",
                    "properties": {
                        "symbol": {"type": "string", "description": "Symbol to calculate spread for (e.g., 'EURUSD')"}
                    },
                    "required": ["symbol"],
                    "additionalProperties": false
                }),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: CalculateSpreadRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let tick = client.symbol_tick(&request.symbol).await?.ok_or_else(|| {
            Mt5AgentError::External(format!("Could not get tick data for {}", request.symbol))
        })?;
        let info = client.symbol_info(&request.symbol).await?.ok_or_else(|| {
            Mt5AgentError::External(format!("Could not get symbol info for {}", request.symbol))
        })?;

        let spread_points = tick.ask - tick.bid;
        let spread_pips = spread_points / info.point;
        let mid = (tick.bid + tick.ask) / 2.0;
        let spread_ratio = spread_points / mid;

        Ok(json!({
            "symbol": request.symbol,
            "bid": tick.bid,
            "ask": tick.ask,
            "spread_points": spread_points,
            "spread_pips": spread_pips,
            "spread_ratio": spread_ratio,
        }))
    }
}

#[async_trait]
impl Skill for CalculateSpreadSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<CalculateSpreadRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<CalculateSpreadRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}
