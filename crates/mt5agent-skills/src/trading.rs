//! Trading skills: orders, positions, execution, and history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use mt5agent_client::ConnectionManager;
use mt5agent_core::{
    Mt5AgentError, Mt5AgentResult, OrderRequest, OrderSide, Position, SkillCategory, SkillResult,
};

use crate::skill::{parse_request, result_schema, Skill, SkillDescriptor, SkillRequest};

fn default_deviation() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SymbolFilterRequest {
    #[serde(default)]
    symbol: Option<String>,
}

impl SkillRequest for SymbolFilterRequest {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlaceMarketOrderRequest {
    symbol: String,
    volume: f64,
    order_side: OrderSide,
    #[serde(default)]
    sl: Option<f64>,
    #[serde(default)]
    tp: Option<f64>,
    #[serde(default = "default_deviation")]
    deviation: u32,
    #[serde(default)]
    comment: String,
    #[serde(default)]
    magic: i64,
    #[serde(default)]
    dry_run: bool,
}

impl SkillRequest for PlaceMarketOrderRequest {
    fn constraints(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.symbol.is_empty() {
            violations.push("'symbol' must not be empty".to_string());
        }
        if self.volume <= 0.0 {
            violations.push("'volume' must be greater than 0".to_string());
        }
        if self.magic < 0 {
            violations.push("'magic' must not be negative".to_string());
        }
        violations
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClosePositionsRequest {
    #[serde(default)]
    symbols: Option<Vec<String>>,
    #[serde(default)]
    comment: String,
    #[serde(default = "default_deviation")]
    deviation: u32,
    #[serde(default)]
    magic: Option<i64>,
}

impl SkillRequest for ClosePositionsRequest {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateSltpRequest {
    symbol: String,
    #[serde(default)]
    sl: Option<f64>,
    #[serde(default)]
    tp: Option<f64>,
}

impl SkillRequest for UpdateSltpRequest {
    fn constraints(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.symbol.is_empty() {
            violations.push("'symbol' must not be empty".to_string());
        }
        if self.sl.is_none() && self.tp.is_none() {
            violations.push("At least one of 'sl' or 'tp' must be provided".to_string());
        }
        violations
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HistoryRequest {
    #[serde(default)]
    date_from: Option<DateTime<Utc>>,
    #[serde(default)]
    date_to: Option<DateTime<Utc>>,
    #[serde(default)]
    symbol: Option<String>,
}

impl SkillRequest for HistoryRequest {
    fn constraints(&self) -> Vec<String> {
        match (self.date_from, self.date_to) {
            (Some(from), Some(to)) if from > to => {
                vec!["'date_from' must not be after 'date_to'".to_string()]
            }
            _ => Vec::new(),
        }
    }
}

fn symbol_filter_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "symbol": {
                "type": "string",
                "description": "Symbol name to filter by (e.g., 'EURUSD'). Omit for all."
            }
        },
        "additionalProperties": false
    })
}

fn history_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "date_from": {"type": "string", "format": "date-time", "description": "Start date for history"},
            "date_to": {"type": "string", "format": "date-time", "description": "End date for history"},
            "symbol": {"type": "string", "description": "Filter by symbol"}
        },
        "additionalProperties": false
    })
}

/// Fetches the positions a close/update request targets, applying the
/// optional symbol and magic filters.
async fn targeted_positions(
    manager: &ConnectionManager,
    symbols: Option<&[String]>,
    magic: Option<i64>,
) -> Mt5AgentResult<Vec<Position>> {
    let client = manager.active_client().await?;
    let mut positions = match symbols {
        Some(symbols) => {
            let mut all = Vec::new();
            for symbol in symbols {
                all.extend(client.positions(Some(symbol)).await?);
            }
            all
        }
        None => client.positions(None).await?,
    };
    if let Some(magic) = magic {
        positions.retain(|p| p.magic == magic);
    }
    Ok(positions)
}

/// Lists pending orders, optionally filtered by symbol.
pub struct GetOrdersSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl GetOrdersSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "get_orders".to_string(),
                description: "Retrieve all pending orders in the MT5 account. Can be filtered by \
                              symbol."
                    .to_string(),
                category: SkillCategory::Trading,
                parameters_schema: symbol_filter_schema(),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: SymbolFilterRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let orders = client.orders(request.symbol.as_deref()).await?;
        Ok(json!({"count": orders.len(), "orders": orders}))
    }
}

#[async_trait]
impl Skill for GetOrdersSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<SymbolFilterRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<SymbolFilterRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}

/// Lists open positions with their unrealized metrics.
pub struct GetPositionsSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl GetPositionsSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "get_positions".to_string(),
                description: "Retrieve all open positions in the MT5 account with calculated \
                              metrics including unrealized profit/loss. Can be filtered by symbol."
                    .to_string(),
                category: SkillCategory::Trading,
                parameters_schema: symbol_filter_schema(),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: SymbolFilterRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let positions = client.positions(request.symbol.as_deref()).await?;
        Ok(json!({"count": positions.len(), "positions": positions}))
    }
}

#[async_trait]
impl Skill for GetPositionsSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<SymbolFilterRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<SymbolFilterRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}

/// Places a market order, optionally as a dry run.
pub struct PlaceMarketOrderSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl PlaceMarketOrderSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "place_market_order".to_string(),
                description: "Place a market order (buy or sell) for a specified symbol and \
                              volume. Supports optional stop loss, take profit, and dry run mode \
                              for validation."
                    .to_string(),
                category: SkillCategory::Trading,
                parameters_schema: json!({
                    "type": "object",
                    "properties": {
                        "symbol": {"type": "string", "description": "Symbol to trade (e.g., 'EURUSD')"},
                        "volume": {"type": "number", "exclusiveMinimum": 0, "description": "Trade volume in lots"},
                        "order_side": {"type": "string", "enum": ["BUY", "SELL"], "description": "Order side"},
                        "sl": {"type": "number", "description": "Stop loss price"},
                        "tp": {"type": "number", "description": "Take profit price"},
                        "deviation": {"type": "integer", "minimum": 0, "default": 20, "description": "Maximum price deviation in points"},
                        "comment": {"type": "string", "default": "", "description": "Order comment"},
                        "magic": {"type": "integer", "minimum": 0, "default": 0, "description": "Magic number for order identification"},
                        "dry_run": {"type": "boolean", "default": false, "description": "If true, only check the order without executing"}
                    },
                    "required": ["symbol", "volume", "order_side"],
                    "additionalProperties": false
                }),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: PlaceMarketOrderRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let order = OrderRequest {
            symbol: request.symbol.clone(),
            volume: request.volume,
            side: request.order_side,
            price: None,
            sl: request.sl,
            tp: request.tp,
            deviation: request.deviation,
            comment: request.comment.clone(),
            magic: request.magic,
        };

        let result = if request.dry_run {
            client.order_check(&order).await?
        } else {
            info!(symbol = %order.symbol, side = %order.side, volume = order.volume, "sending market order");
            client.order_send(&order).await?
        };

        // Success is decided by the retcode alone: 0 for a passing check,
        // TRADE_RETCODE_DONE for a live fill.
        let accepted = if request.dry_run {
            result.check_passed()
        } else {
            result.is_done()
        };
        if !accepted {
            return Err(Mt5AgentError::External(format!(
                "Order failed with retcode {}",
                result.retcode
            )));
        }

        Ok(json!({
            "retcode": result.retcode,
            "deal": result.deal,
            "order": result.order,
            "volume": result.volume,
            "price": result.price,
            "bid": result.bid,
            "ask": result.ask,
            "comment": result.comment,
            "request_id": result.request_id,
            "dry_run": request.dry_run,
        }))
    }
}

#[async_trait]
impl Skill for PlaceMarketOrderSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<PlaceMarketOrderRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<PlaceMarketOrderRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}

/// Closes open positions, optionally restricted by symbols or magic.
pub struct ClosePositionsSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl ClosePositionsSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "close_positions".to_string(),
                description: "Close open positions for specified symbols. If no symbols \
                              provided, closes all open positions. Can filter by magic number."
                    .to_string(),
                category: SkillCategory::Trading,
                parameters_schema: json!({
                    "type": "object",
                    "properties": {
                        "symbols": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "List of symbols to close positions for. Omit to close all."
                        },
                        "comment": {"type": "string", "default": "", "description": "Comment for close orders"},
                        "deviation": {"type": "integer", "minimum": 0, "default": 20, "description": "Maximum price deviation in points"},
                        "magic": {"type": "integer", "description": "Only close positions with this magic number"}
                    },
                    "additionalProperties": false
                }),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: ClosePositionsRequest) -> Mt5AgentResult<Value> {
        let positions =
            targeted_positions(&self.manager, request.symbols.as_deref(), request.magic).await?;
        let client = self.manager.active_client().await?;

        let mut results = Vec::with_capacity(positions.len());
        for position in &positions {
            let result = client
                .close_position(position.ticket, request.deviation, &request.comment)
                .await?;
            info!(ticket = position.ticket, symbol = %position.symbol, retcode = result.retcode, "closed position");
            results.push(json!({
                "ticket": position.ticket,
                "symbol": position.symbol,
                "retcode": result.retcode,
                "deal": result.deal,
                "order": result.order,
                "volume": result.volume,
                "price": result.price,
                "comment": result.comment,
            }));
        }

        Ok(json!({"closed_count": results.len(), "results": results}))
    }
}

#[async_trait]
impl Skill for ClosePositionsSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<ClosePositionsRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<ClosePositionsRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}

/// Updates stop loss and/or take profit on a symbol's open positions.
pub struct UpdateSltpSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl UpdateSltpSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "update_sltp".to_string(),
                description: "Update stop loss and/or take profit levels for open positions of a \
                              specified symbol."
                    .to_string(),
                category: SkillCategory::Trading,
                parameters_schema: json!({
                    "type": "object",
                    "properties": {
                        "symbol": {"type": "string", "description": "Symbol to update SLTP for"},
                        "sl": {"type": "number", "description": "New stop loss price"},
                        "tp": {"type": "number", "description": "New take profit price"}
                    },
                    "required": ["symbol"],
                    "additionalProperties": false
                }),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: UpdateSltpRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let positions = client.positions(Some(&request.symbol)).await?;

        let mut results = Vec::with_capacity(positions.len());
        for position in &positions {
            let result = client
                .modify_position(position.ticket, request.sl, request.tp)
                .await?;
            results.push(json!({
                "ticket": position.ticket,
                "retcode": result.retcode,
                "deal": result.deal,
                "order": result.order,
                "comment": result.comment,
            }));
        }

        Ok(json!({"updated_count": results.len(), "results": results}))
    }
}

#[async_trait]
impl Skill for UpdateSltpSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<UpdateSltpRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<UpdateSltpRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}

/// Retrieves completed and cancelled orders from history.
pub struct GetHistoryOrdersSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl GetHistoryOrdersSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "get_history_orders".to_string(),
                description: "Retrieve historical orders (completed and cancelled) from the \
                              account. Can be filtered by date range and symbol."
                    .to_string(),
                category: SkillCategory::Trading,
                parameters_schema: history_schema(),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: HistoryRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let orders = client
            .history_orders(request.date_from, request.date_to, request.symbol.as_deref())
            .await?;
        Ok(json!({"count": orders.len(), "orders": orders}))
    }
}

#[async_trait]
impl Skill for GetHistoryOrdersSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<HistoryRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<HistoryRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}

/// Retrieves executed deals from history.
pub struct GetHistoryDealsSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl GetHistoryDealsSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "get_history_deals".to_string(),
                description: "Retrieve historical deals (executed trades) from the account. Can \
                              be filtered by date range and symbol."
                    .to_string(),
                category: SkillCategory::Trading,
                parameters_schema: history_schema(),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self, request: HistoryRequest) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let deals = client
            .history_deals(request.date_from, request.date_to, request.symbol.as_deref())
            .await?;
        Ok(json!({"count": deals.len(), "deals": deals}))
    }
}

#[async_trait]
impl Skill for GetHistoryDealsSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<HistoryRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<HistoryRequest>(params) {
            Ok(request) => self.run(request).await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}
