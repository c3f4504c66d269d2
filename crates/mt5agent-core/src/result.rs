use crate::error::Mt5AgentResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform outcome of a skill invocation.
///
/// Exactly one of `data` and `error` is set: `ok` carries a payload and no
/// error, `failure` carries an error message and no payload. Skills return
/// this for every foreseeable failure instead of propagating errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillResult {
    /// Whether the skill execution succeeded.
    pub success: bool,
    /// Result payload when successful.
    pub data: Option<Value>,
    /// Error message when failed.
    pub error: Option<String>,
    /// UTC timestamp of when the result was produced.
    pub timestamp: DateTime<Utc>,
}

impl SkillResult {
    /// Creates a successful result carrying `data`.
    pub fn ok(data: impl Into<Value>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates a failure result carrying an error message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    /// Renders the result as a string suitable for agent consumption:
    /// pretty-printed JSON on success, `Error: …` on failure.
    pub fn to_agent_response(&self) -> String {
        if self.success {
            match &self.data {
                Some(data) => {
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
                }
                None => String::new(),
            }
        } else {
            format!("Error: {}", self.error.as_deref().unwrap_or("unknown"))
        }
    }
}

impl From<Mt5AgentResult<Value>> for SkillResult {
    fn from(outcome: Mt5AgentResult<Value>) -> Self {
        match outcome {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

/// Tool export shape consumed by agent-orchestration frameworks:
/// `{type: "function", function: {name, description, parameters}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Always `"function"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The function name, description, and parameter schema.
    pub function: ToolFunction,
}

/// The function block of a [`ToolDefinition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFunction {
    /// Unique tool name (the skill name).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema for the tool parameters.
    pub parameters: Value,
}

impl ToolDefinition {
    /// Creates a function tool definition.
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            kind: "function".to_string(),
            function: ToolFunction {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Mt5AgentError;

    #[test]
    fn ok_sets_data_and_clears_error() {
        let result = SkillResult::ok(serde_json::json!({"balance": 10_000.0}));
        assert!(result.success);
        assert!(result.data.is_some());
        assert!(result.error.is_none());
    }

    #[test]
    fn failure_sets_error_and_clears_data() {
        let result = SkillResult::failure("no data");
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.error.as_deref(), Some("no data"));
    }

    #[test]
    fn agent_response_renders_both_arms() {
        let ok = SkillResult::ok(serde_json::json!({"count": 2}));
        assert!(ok.to_agent_response().contains("\"count\": 2"));

        let failed = SkillResult::failure("boom");
        assert_eq!(failed.to_agent_response(), "Error: boom");
    }

    #[test]
    fn from_outcome_maps_err_to_failure() {
        let outcome: Mt5AgentResult<Value> = Err(Mt5AgentError::External("timeout".to_string()));
        let result: SkillResult = outcome.into();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("MT5 error: timeout"));
    }

    #[test]
    fn tool_definition_shape() {
        let tool = ToolDefinition::function(
            "get_tick",
            "Get the current tick",
            serde_json::json!({"type": "object", "properties": {}}),
        );
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "get_tick");
        assert!(json["function"]["parameters"].is_object());
    }
}
