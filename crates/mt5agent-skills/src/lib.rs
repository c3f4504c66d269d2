//! Skill contract, registry, and the built-in MT5 skill catalog.
//!
//! Skills are individual capabilities an AI agent can call to interact
//! with MetaTrader 5. Each one declares a unique name, a category, and a
//! JSON schema for its parameters, validates its input fail-closed, and
//! reports every foreseeable failure as a failure result rather than an
//! error.
//!
//! # Main entry points
//!
//! - [`SkillRegistry::with_builtins()`] — Registry pre-populated with the
//!   full catalog, wired to an injected connection manager.
//! - [`register_builtins()`] — Register the catalog into an existing
//!   registry.
//! - [`Skill`] — Trait implemented by every skill.

/// Account and terminal information skills.
pub mod account;
/// Margin, profit, volume, and spread calculation skills.
pub mod analysis;
/// Symbol, tick, and rate skills.
pub mod market_data;
/// The skill registry.
pub mod registry;
/// The skill trait, descriptor, and typed request plumbing.
pub mod skill;
/// Order, position, and history skills.
pub mod trading;

pub use registry::SkillRegistry;
pub use skill::{parse_request, EmptyRequest, Skill, SkillDescriptor, SkillRequest};

pub use account::{GetAccountInfoSkill, GetTerminalInfoSkill};
pub use analysis::{
    CalculateMarginSkill, CalculateMaxVolumeSkill, CalculateProfitSkill, CalculateSpreadSkill,
};
pub use market_data::{
    GetLatestRatesSkill, GetLatestTicksSkill, GetRatesRangeSkill, GetSymbolInfoSkill,
    GetSymbolsSkill, GetTickSkill,
};
pub use trading::{
    ClosePositionsSkill, GetHistoryDealsSkill, GetHistoryOrdersSkill, GetOrdersSkill,
    GetPositionsSkill, PlaceMarketOrderSkill, UpdateSltpSkill,
};

use mt5agent_client::ConnectionManager;
use mt5agent_core::Mt5AgentResult;
use std::sync::Arc;

/// Registers the full built-in skill set into `registry`, every skill
/// borrowing the given connection manager.
pub fn register_builtins(
    registry: &mut SkillRegistry,
    manager: &Arc<ConnectionManager>,
) -> Mt5AgentResult<()> {
    // Account
    registry.register(Arc::new(GetAccountInfoSkill::new(manager.clone())))?;
    registry.register(Arc::new(GetTerminalInfoSkill::new(manager.clone())))?;
    // Market data
    registry.register(Arc::new(GetSymbolsSkill::new(manager.clone())))?;
    registry.register(Arc::new(GetSymbolInfoSkill::new(manager.clone())))?;
    registry.register(Arc::new(GetTickSkill::new(manager.clone())))?;
    registry.register(Arc::new(GetLatestRatesSkill::new(manager.clone())))?;
    registry.register(Arc::new(GetRatesRangeSkill::new(manager.clone())))?;
    registry.register(Arc::new(GetLatestTicksSkill::new(manager.clone())))?;
    // Trading
    registry.register(Arc::new(GetOrdersSkill::new(manager.clone())))?;
    registry.register(Arc::new(GetPositionsSkill::new(manager.clone())))?;
    registry.register(Arc::new(PlaceMarketOrderSkill::new(manager.clone())))?;
    registry.register(Arc::new(ClosePositionsSkill::new(manager.clone())))?;
    registry.register(Arc::new(UpdateSltpSkill::new(manager.clone())))?;
    registry.register(Arc::new(GetHistoryOrdersSkill::new(manager.clone())))?;
    registry.register(Arc::new(GetHistoryDealsSkill::new(manager.clone())))?;
    // Analysis
    registry.register(Arc::new(CalculateMarginSkill::new(manager.clone())))?;
    registry.register(Arc::new(CalculateProfitSkill::new(manager.clone())))?;
    registry.register(Arc::new(CalculateMaxVolumeSkill::new(manager.clone())))?;
    registry.register(Arc::new(CalculateSpreadSkill::new(manager.clone())))?;
    Ok(())
}
