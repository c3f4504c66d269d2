use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mt5agent_core::{Mt5AgentError, Mt5AgentResult, SkillCategory, SkillResult};

/// Metadata describing a skill's interface. Immutable once registered.
#[derive(Debug, Clone, Serialize)]
pub struct SkillDescriptor {
    /// Unique skill name, the registry key.
    pub name: String,
    /// Human-readable description shown to agents.
    pub description: String,
    /// Category the skill is grouped under.
    pub category: SkillCategory,
    /// JSON schema of the accepted parameters.
    pub parameters_schema: Value,
    /// JSON schema of the result envelope.
    pub returns_schema: Value,
}

/// Trait that all MT5 skills implement.
///
/// `execute` converts every foreseeable failure (bad input, missing data,
/// platform error, no connection) into a failure [`SkillResult`]; callers
/// never need exception-style handling around an invocation.
#[async_trait]
pub trait Skill: Send + Sync {
    /// The skill's descriptor.
    fn descriptor(&self) -> &SkillDescriptor;

    /// Checks `params` against the skill's typed request without running it.
    fn validate(&self, params: &Value) -> Mt5AgentResult<()>;

    /// Runs the skill against the active connection.
    async fn execute(&self, params: Value) -> SkillResult;

    /// Validates first, reporting a validation problem as a failure result,
    /// then delegates to [`Skill::execute`].
    async fn validate_and_execute(&self, params: Value) -> SkillResult {
        if let Err(e) = self.validate(&params) {
            return SkillResult::failure(e.to_string());
        }
        self.execute(params).await
    }
}

/// Typed request accepted by one skill.
///
/// Deserialization is the schema check: request structs derive
/// `Deserialize` with `deny_unknown_fields`, so unknown keys and missing
/// required fields fail closed. [`SkillRequest::constraints`] adds the
/// range and cross-field checks serde cannot express.
pub trait SkillRequest: DeserializeOwned {
    /// Constraint violations in this request, empty when valid.
    fn constraints(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Parses and validates `params` into a typed request.
///
/// `null` is treated as an empty parameter object so that agents may omit
/// arguments entirely for parameterless skills.
pub fn parse_request<T: SkillRequest>(params: Value) -> Mt5AgentResult<T> {
    let params = if params.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        params
    };
    let request: T =
        serde_json::from_value(params).map_err(|e| Mt5AgentError::Validation(e.to_string()))?;
    let violations = request.constraints();
    if violations.is_empty() {
        Ok(request)
    } else {
        Err(Mt5AgentError::Validation(violations.join("; ")))
    }
}

/// Request type for skills that take no parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmptyRequest {}

impl SkillRequest for EmptyRequest {}

/// JSON schema of the [`SkillResult`] envelope every skill returns.
pub fn result_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "success": {"type": "boolean", "description": "Whether the skill execution succeeded"},
            "data": {"description": "Result data if successful"},
            "error": {"type": ["string", "null"], "description": "Error message if failed"},
            "timestamp": {"type": "string", "format": "date-time"}
        },
        "required": ["success", "timestamp"]
    })
}

/// Schema of a parameterless skill.
pub fn empty_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "additionalProperties": false
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct CountedRequest {
        count: u32,
    }

    impl SkillRequest for CountedRequest {
        fn constraints(&self) -> Vec<String> {
            let mut violations = Vec::new();
            if self.count == 0 {
                violations.push("'count' must be at least 1".to_string());
            }
            violations
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = parse_request::<CountedRequest>(serde_json::json!({"count": 5, "extra": true}))
            .unwrap_err();
        assert!(matches!(err, Mt5AgentError::Validation(_)));
        assert!(err.to_string().contains("extra"));
    }

    #[test]
    fn constraints_are_reported() {
        let err = parse_request::<CountedRequest>(serde_json::json!({"count": 0})).unwrap_err();
        assert!(err.to_string().contains("'count' must be at least 1"));
    }

    #[test]
    fn null_params_mean_empty_object() {
        assert!(parse_request::<EmptyRequest>(Value::Null).is_ok());
        assert!(parse_request::<EmptyRequest>(serde_json::json!({})).is_ok());
        assert!(parse_request::<EmptyRequest>(serde_json::json!({"stray": 1})).is_err());
    }
}
