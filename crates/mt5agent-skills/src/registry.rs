use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use mt5agent_client::ConnectionManager;
use mt5agent_core::{Mt5AgentError, Mt5AgentResult, SkillCategory, SkillResult, ToolDefinition};

use crate::skill::{Skill, SkillDescriptor};

/// Central catalog of skills: lookup, listing, and execution by name.
///
/// Listing follows registration order. Execution never raises for an
/// unknown name; it reports a failure result so an agent loop can run
/// without exception handling.
pub struct SkillRegistry {
    skills: HashMap<String, Arc<dyn Skill>>,
    order: Vec<String>,
}

impl SkillRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            skills: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Creates a registry pre-populated with the built-in MT5 catalog,
    /// every skill borrowing the given connection manager.
    pub fn with_builtins(manager: Arc<ConnectionManager>) -> Mt5AgentResult<Self> {
        let mut registry = Self::new();
        crate::register_builtins(&mut registry, &manager)?;
        Ok(registry)
    }

    /// Registers a skill. Fails when the name is already taken; the
    /// original registration is unaffected.
    pub fn register(&mut self, skill: Arc<dyn Skill>) -> Mt5AgentResult<()> {
        let name = skill.descriptor().name.clone();
        if self.skills.contains_key(&name) {
            return Err(Mt5AgentError::DuplicateSkill(name));
        }
        info!(skill = %name, "registered skill");
        self.order.push(name.clone());
        self.skills.insert(name, skill);
        Ok(())
    }

    /// Removes a skill by name.
    pub fn unregister(&mut self, name: &str) -> Mt5AgentResult<()> {
        if self.skills.remove(name).is_none() {
            return Err(Mt5AgentError::SkillNotFound(name.to_string()));
        }
        self.order.retain(|n| n != name);
        Ok(())
    }

    /// Looks up a skill by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Skill>> {
        self.skills.get(name)
    }

    /// Descriptors of all registered skills, in registration order.
    pub fn list_skills(&self) -> Vec<&SkillDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.skills.get(name))
            .map(|skill| skill.descriptor())
            .collect()
    }

    /// Descriptors of the skills in one category.
    pub fn list_skills_by_category(&self, category: SkillCategory) -> Vec<&SkillDescriptor> {
        self.list_skills()
            .into_iter()
            .filter(|d| d.category == category)
            .collect()
    }

    /// The distinct categories present, in first-seen order.
    pub fn categories(&self) -> Vec<SkillCategory> {
        let mut categories = Vec::new();
        for descriptor in self.list_skills() {
            if !categories.contains(&descriptor.category) {
                categories.push(descriptor.category);
            }
        }
        categories
    }

    /// Names of all registered skills, in registration order.
    pub fn skill_names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Number of registered skills.
    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }

    /// Executes a skill by name with the given parameters.
    ///
    /// An unknown name is reported as a failure result naming the skill,
    /// never as an error.
    pub async fn execute(&self, name: &str, params: Value) -> SkillResult {
        match self.skills.get(name) {
            Some(skill) => skill.validate_and_execute(params).await,
            None => {
                warn!(skill = %name, "skill not found");
                SkillResult::failure(format!("Skill '{name}' not found in registry"))
            }
        }
    }

    /// Projects every registered skill into the agent-framework tool shape.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.list_skills()
            .into_iter()
            .map(|d| {
                ToolDefinition::function(
                    d.name.clone(),
                    d.description.clone(),
                    d.parameters_schema.clone(),
                )
            })
            .collect()
    }
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new()
    }
}
