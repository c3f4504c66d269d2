use thiserror::Error;

/// Top-level error type for the MT5 agent skills workspace.
///
/// Manager and registry misuse surfaces as an `Err`; anything a skill can
/// foresee is converted into a failure [`crate::SkillResult`] at the skill
/// boundary instead.
#[derive(Debug, Error)]
pub enum Mt5AgentError {
    /// The connection manager was used before `configure()`.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A client handle was requested while disconnected.
    #[error("Not connected to MT5: {0}")]
    NotConnected(String),

    /// A skill name was registered twice.
    #[error("Skill '{0}' is already registered")]
    DuplicateSkill(String),

    /// A skill name was not found in the registry.
    #[error("Skill '{0}' not found in registry")]
    SkillNotFound(String),

    /// Input parameters failed schema constraints.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An opaque failure surfaced by the platform or its client.
    #[error("MT5 error: {0}")]
    External(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Mt5AgentError`].
pub type Mt5AgentResult<T> = Result<T, Mt5AgentError>;
