//! Configuration view and validation commands: `course-forge config`.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use course_forge::config::{
    CONFIG_DIR, CONFIG_FILE, CliOverrides, CourseForgeConfig, Environment,
};

use super::super::ConfigCommands;

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn set_or_missing(value: bool) -> &'static str {
    if value { "set" } else { "not set" }
}

pub fn cmd_config(config_path: Option<&Path>, command: Option<ConfigCommands>) -> Result<()> {
    let file_path: PathBuf = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Path::new(CONFIG_DIR).join(CONFIG_FILE));
    // An explicit --config must exist; the default location is optional.
    let source = (config_path.is_some() || file_path.exists()).then_some(file_path.as_path());

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("course-forge Configuration");
            println!("==========================");
            println!();

            if file_path.exists() {
                println!("Config file: {}", file_path.display());
            } else {
                println!("No config.toml found at {}", file_path.display());
                println!("Using defaults.");
            }
            println!();

            // Effective values include environment overrides.
            let config = CourseForgeConfig::resolve(
                source,
                &CliOverrides::default(),
            )?;

            println!("environment = \"{}\"", config.environment);
            println!();
            println!("[server]");
            println!("  port = {}", config.server.port);
            println!("  host = \"{}\"", config.server.host);
            println!("  dev = {}", config.server.dev);
            println!();
            println!("[database]");
            println!("  path = \"{}\"", config.database.path.display());
            println!();
            println!("[generator]");
            println!("  model = \"{}\"", config.generator.model);
            println!("  base_url = \"{}\"", config.generator.base_url);
            println!(
                "  api_key_env = \"{}\" ({})",
                config.generator.api_key_env,
                set_or_missing(config.generator_api_key(env_lookup).is_some())
            );
            println!("  timeout_secs = {}", config.generator.timeout_secs);
            println!(
                "  prompts_dir = \"{}\"",
                config.generator.prompts_dir.display()
            );
            println!();
            println!("[auth]");
            println!(
                "  api_key_env = \"{}\" ({})",
                config.auth.api_key_env,
                set_or_missing(env_lookup(&config.auth.api_key_env).is_some())
            );
            println!();
            println!("[logging]");
            println!("  level = \"{}\"", config.logging.level);
            println!("  json = {}", config.logging.json);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let config = CourseForgeConfig::resolve(
                source,
                &CliOverrides::default(),
            )?;

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in &warnings {
                    println!("  - {}", warning);
                }
            }
            println!();

            let status = config.status(env_lookup);
            println!("Services:");
            println!("  database: {}", status.database);
            println!("  ai: {}", status.ai);
            if !status.missing.is_empty() {
                println!("  missing: {}", status.missing.join(", "));
            }
            println!();

            if config.environment == Environment::Production {
                config.boundary_api_key(env_lookup)?;
                if !warnings.is_empty() {
                    bail!("Production configuration has {} warning(s)", warnings.len());
                }
            }
        }
        Some(ConfigCommands::Init) => {
            if file_path.exists() {
                println!("config.toml already exists at {}", file_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }

            CourseForgeConfig::default().save(&file_path)?;

            println!("Created config.toml at {}", file_path.display());
            println!();
            println!("Secrets are read from the environment:");
            println!("  - ANTHROPIC_API_KEY for the content generator");
            println!("  - API_KEY_SECRET for the X-API-Key header");
            println!();
        }
    }

    Ok(())
}
