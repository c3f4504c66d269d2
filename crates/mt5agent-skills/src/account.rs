//! Account and terminal information skills.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use mt5agent_client::ConnectionManager;
use mt5agent_core::{Mt5AgentError, Mt5AgentResult, SkillCategory, SkillResult};

use crate::skill::{empty_schema, parse_request, result_schema, EmptyRequest, Skill, SkillDescriptor};

/// Retrieves balance, equity, margin, leverage, and account type.
pub struct GetAccountInfoSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl GetAccountInfoSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "get_account_info".to_string(),
                description: "Retrieve detailed information about the connected MT5 trading \
                              account, including balance, equity, margin, leverage, and account \
                              type."
                    .to_string(),
                category: SkillCategory::Account,
                parameters_schema: empty_schema(),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let account = client.account_info().await?.ok_or_else(|| {
            Mt5AgentError::External("Failed to retrieve account information".to_string())
        })?;
        Ok(serde_json::to_value(account)?)
    }
}

#[async_trait]
impl Skill for GetAccountInfoSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<EmptyRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<EmptyRequest>(params) {
            Ok(_) => self.run().await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}

/// Retrieves terminal build, connection status, and trade permissions.
pub struct GetTerminalInfoSkill {
    manager: Arc<ConnectionManager>,
    descriptor: SkillDescriptor,
}

impl GetTerminalInfoSkill {
    /// Creates the skill over the given connection manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            descriptor: SkillDescriptor {
                name: "get_terminal_info".to_string(),
                description: "Retrieve information about the MT5 terminal, including version, \
                              build number, connection status, and trade permissions."
                    .to_string(),
                category: SkillCategory::Account,
                parameters_schema: empty_schema(),
                returns_schema: result_schema(),
            },
        }
    }

    async fn run(&self) -> Mt5AgentResult<Value> {
        let client = self.manager.active_client().await?;
        let terminal = client.terminal_info().await?.ok_or_else(|| {
            Mt5AgentError::External("Failed to retrieve terminal information".to_string())
        })?;
        Ok(serde_json::to_value(terminal)?)
    }
}

#[async_trait]
impl Skill for GetTerminalInfoSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn validate(&self, params: &Value) -> Mt5AgentResult<()> {
        parse_request::<EmptyRequest>(params.clone()).map(|_| ())
    }

    async fn execute(&self, params: Value) -> SkillResult {
        match parse_request::<EmptyRequest>(params) {
            Ok(_) => self.run().await.into(),
            Err(e) => SkillResult::failure(e.to_string()),
        }
    }
}
