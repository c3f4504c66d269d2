//! Core types for the MT5 agent skills workspace.
//!
//! This crate provides the foundational types shared across all workspace
//! crates: the error enum, the uniform skill result, the agent-facing tool
//! definition shape, and the typed records returned by the MetaTrader 5
//! platform.
//!
//! # Main types
//!
//! - [`Mt5AgentError`] — Unified error enum for all subsystems.
//! - [`Mt5AgentResult`] — Convenience alias for `Result<T, Mt5AgentError>`.
//! - [`SkillResult`] — Tagged success/data/error outcome of a skill call.
//! - [`ToolDefinition`] — Tool export shape for agent frameworks.
//! - [`Timeframe`] / [`OrderSide`] / [`SkillCategory`] — Domain enums.
//! - [`models`] — Plain records for account, symbol, tick, bar, order,
//!   position, and deal data.

/// Error enum and result alias.
pub mod error;
/// Typed records for MT5 platform data.
pub mod models;
/// Skill result and tool definition types.
pub mod result;
/// Domain enums shared by requests and records.
pub mod types;

pub use error::{Mt5AgentError, Mt5AgentResult};
pub use models::{
    AccountInfo, Bar, Deal, HistoryOrder, OrderRequest, PendingOrder, Position, SymbolInfo,
    TerminalInfo, Tick, TradeResult, RETCODE_CHECK_OK, TRADE_RETCODE_DONE,
};
pub use result::{SkillResult, ToolDefinition, ToolFunction};
pub use types::{OrderSide, SkillCategory, Timeframe};
