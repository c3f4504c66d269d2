//! `mt5agent` — inspect the MT5 skill catalog and execute skills from the
//! command line.

use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mt5agent_client::{BridgeConnector, ConnectionManager, Mt5Config};
use mt5agent_core::SkillCategory;
use mt5agent_skills::SkillRegistry;

#[derive(Parser)]
#[command(name = "mt5agent", about = "MT5 agent skills — skill registry and execution CLI")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "mt5agent.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the skill catalog
    Skills {
        #[command(subcommand)]
        action: SkillsAction,
    },
    /// Execute one skill and print its result
    Exec {
        /// Skill name, e.g. get_account_info
        name: String,
        /// Skill parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
        /// Run without connecting to the terminal
        #[arg(long)]
        no_connect: bool,
    },
}

#[derive(Subcommand)]
enum SkillsAction {
    /// List registered skills
    List {
        /// Restrict the listing to one category
        #[arg(long)]
        category: Option<String>,
    },
    /// Print agent tool definitions as JSON
    Tools,
}

#[derive(Deserialize)]
struct AppConfig {
    connection: Mt5Config,
    #[serde(default)]
    bridge: BridgeSettings,
}

#[derive(Deserialize)]
struct BridgeSettings {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5556
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Load config
    let config_str = tokio::fs::read_to_string(&cli.config).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to read config file '{}': {}",
            cli.config.display(),
            e
        )
    })?;
    let config: AppConfig = toml::from_str(&config_str)?;

    let connector = Arc::new(BridgeConnector::new(
        config.bridge.host.clone(),
        config.bridge.port,
    ));
    let manager = Arc::new(ConnectionManager::new(connector));
    manager.configure(config.connection).await;
    let registry = SkillRegistry::with_builtins(manager.clone())?;

    match cli.command {
        Commands::Skills { action } => match action {
            SkillsAction::List { category } => {
                let skills = match category {
                    Some(name) => {
                        let category: SkillCategory = name.parse()?;
                        registry.list_skills_by_category(category)
                    }
                    None => registry.list_skills(),
                };
                if skills.is_empty() {
                    println!("No skills registered.");
                } else {
                    println!("Registered skills:");
                    for skill in &skills {
                        println!("  {} [{}] — {}", skill.name, skill.category, skill.description);
                    }
                    println!("\nTotal: {} skill(s)", skills.len());
                }
            }
            SkillsAction::Tools => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&registry.tool_definitions())?
                );
            }
        },
        Commands::Exec {
            name,
            params,
            no_connect,
        } => {
            let params: serde_json::Value = serde_json::from_str(&params)
                .map_err(|e| anyhow::anyhow!("--params is not valid JSON: {e}"))?;

            if !no_connect {
                manager.connect().await?;
                info!(skill = %name, "executing skill");
            }

            let result = registry.execute(&name, params).await;

            // Cleanup runs regardless of the skill outcome.
            manager.disconnect().await;

            println!("{}", result.to_agent_response());
            if !result.success {
                return Ok(ExitCode::from(1));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn config_parses_with_bridge_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [connection]
            login = 123456
            password = "secret"
            server = "MetaQuotes-Demo"
            "#,
        )
        .unwrap();
        assert_eq!(config.connection.login, 123_456);
        assert_eq!(config.connection.timeout_ms, 60_000);
        assert_eq!(config.bridge.host, "127.0.0.1");
        assert_eq!(config.bridge.port, 5556);
    }

    #[test]
    fn config_overrides_apply() {
        let config: AppConfig = toml::from_str(
            r#"
            [connection]
            login = 777
            password = "pw"
            server = "Live-Server"
            timeout_ms = 5000
            terminal_path = "C:/mt5/terminal64.exe"

            [bridge]
            host = "10.0.0.5"
            port = 9100
            "#,
        )
        .unwrap();
        assert_eq!(config.connection.timeout_ms, 5_000);
        assert_eq!(
            config.connection.terminal_path.as_deref(),
            Some("C:/mt5/terminal64.exe")
        );
        assert_eq!(config.bridge.host, "10.0.0.5");
        assert_eq!(config.bridge.port, 9100);
    }

    #[test]
    fn config_loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[connection]\nlogin = 42\npassword = \"pw\"\nserver = \"Demo\""
        )
        .unwrap();

        let raw = std::fs::read_to_string(file.path()).unwrap();
        let config: AppConfig = toml::from_str(&raw).unwrap();
        assert_eq!(config.connection.login, 42);
    }
}
