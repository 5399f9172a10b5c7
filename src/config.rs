//! Configuration for the course-forge service.
//!
//! Settings are read from `.course-forge/config.toml` and then layered:
//! file → environment → CLI flags. Every field has a default, so a missing
//! file is a valid configuration.
//!
//! ```toml
//! environment = "development"
//!
//! [server]
//! port = 10000
//! host = "127.0.0.1"
//! dev = false
//!
//! [database]
//! path = ".course-forge/courses.db"
//!
//! [generator]
//! model = "claude-sonnet-4-20250514"
//! base_url = "https://api.anthropic.com/v1/messages"
//! api_key_env = "ANTHROPIC_API_KEY"
//! timeout_secs = 300
//! prompts_dir = "prompts"
//!
//! [auth]
//! api_key_env = "API_KEY_SECRET"
//!
//! [logging]
//! level = "info"
//! json = false
//! ```
//!
//! Secrets never live in the file. The generator key and the boundary API
//! key are read from the environment variables the file names.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the config file and the default database.
pub const CONFIG_DIR: &str = ".course-forge";

pub const CONFIG_FILE: &str = "config.toml";

/// Boundary API key used outside production when none is configured.
pub const DEV_API_KEY: &str = "dev-secret-change-in-production";

/// Deployment environment. Only `Production` changes behavior: it refuses
/// to start without a boundary API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
            Environment::Test => write!(f, "test"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            _ => bail!(
                "Invalid environment '{}'. Valid values: development, production, test",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Permissive CORS and bind on all interfaces.
    #[serde(default)]
    pub dev: bool,
}

fn default_port() -> u16 {
    10000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            dev: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("courses.db")
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Settings for the hosted content generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the generator API key.
    #[serde(default = "default_generator_key_env")]
    pub api_key_env: String,
    /// Per-request timeout. The only timeout in the pipeline.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Directory searched for `researcher.md` / `designer.md` overrides.
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: PathBuf,
}

fn default_model() -> String {
    crate::generation::generator::DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_generator_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_prompts_dir() -> PathBuf {
    PathBuf::from("prompts")
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_generator_key_env(),
            timeout_secs: default_timeout_secs(),
            prompts_dir: default_prompts_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSection {
    /// Name of the environment variable holding the boundary API key.
    #[serde(default = "default_auth_key_env")]
    pub api_key_env: String,
}

fn default_auth_key_env() -> String {
    "API_KEY_SECRET".to_string()
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            api_key_env: default_auth_key_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Fallback filter when `COURSE_FORGE_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Flag values from the command line. `None` leaves the lower layer alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    pub dev: bool,
}

/// Which external services are configured, reported by `/health` and
/// `config validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigStatus {
    pub database: bool,
    pub ai: bool,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseForgeConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl CourseForgeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config.toml")
    }

    /// Load `config.toml` from `config_dir`, or defaults if it doesn't exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Full resolution used by the binary: file (explicit path or the
    /// default location), then process environment, then CLI flags.
    pub fn resolve(config_path: Option<&Path>, cli: &CliOverrides) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::load(path)?,
            None => Self::load_or_default(Path::new(CONFIG_DIR))?,
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_cli(cli);
        Ok(config)
    }

    /// Apply `PORT`, `DATABASE_PATH`, `LOG_LEVEL` and `COURSE_FORGE_ENV`.
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT '{}'", port))?;
        }
        if let Some(path) = get("DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(env) = get("COURSE_FORGE_ENV") {
            self.environment = env.parse()?;
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(path) = &cli.db_path {
            self.database.path = path.clone();
        }
        if cli.dev {
            self.server.dev = true;
        }
    }

    /// Address the HTTP server binds to.
    pub fn bind_host(&self) -> &str {
        if self.server.dev {
            "0.0.0.0"
        } else {
            &self.server.host
        }
    }

    /// The key clients must send in `X-API-Key`.
    ///
    /// Falls back to [`DEV_API_KEY`] outside production. Production without
    /// a key is an error.
    pub fn boundary_api_key<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(&self.auth.api_key_env).filter(|k| !k.is_empty()) {
            Some(key) => Ok(key),
            None if self.environment == Environment::Production => bail!(
                "{} must be set when running in production",
                self.auth.api_key_env
            ),
            None => Ok(DEV_API_KEY.to_string()),
        }
    }

    pub fn generator_api_key<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(&self.generator.api_key_env).filter(|k| !k.is_empty())
    }

    pub fn status<F>(&self, lookup: F) -> ConfigStatus
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = !self.database.path.as_os_str().is_empty();
        let ai = self.generator_api_key(&lookup).is_some();

        let mut missing = Vec::new();
        if !database {
            missing.push("DATABASE_PATH".to_string());
        }
        if !ai {
            missing.push(self.generator.api_key_env.clone());
        }
        if self.environment == Environment::Production
            && lookup(&self.auth.api_key_env).filter(|k| !k.is_empty()).is_none()
        {
            missing.push(self.auth.api_key_env.clone());
        }

        ConfigStatus {
            database,
            ai,
            missing,
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port must be non-zero".to_string());
        }
        if self.generator.timeout_secs == 0 {
            warnings.push("generator.timeout_secs must be greater than zero".to_string());
        }
        if self.generator.model.trim().is_empty() {
            warnings.push("generator.model is empty".to_string());
        }
        if !self.generator.base_url.starts_with("http://")
            && !self.generator.base_url.starts_with("https://")
        {
            warnings.push(format!(
                "generator.base_url '{}' is not an http(s) URL",
                self.generator.base_url
            ));
        }
        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            warnings.push(format!(
                "Invalid logging.level '{}'. Valid values: {}",
                self.logging.level,
                VALID_LOG_LEVELS.join(", ")
            ));
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CourseForgeConfig::default();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.server.port, 10000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(!config.server.dev);
        assert_eq!(config.database.path, PathBuf::from(".course-forge/courses.db"));
        assert_eq!(config.generator.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.generator.timeout_secs, 300);
        assert_eq!(config.auth.api_key_env, "API_KEY_SECRET");
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let config = CourseForgeConfig::parse(
            r#"
environment = "test"

[server]
port = 8080

[generator]
model = "claude-test"
"#,
        )
        .unwrap();
        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.generator.model, "claude-test");
        assert_eq!(config.generator.timeout_secs, 300);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_invalid_toml() {
        let err = CourseForgeConfig::parse("[server\nport = ").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config.toml"));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = CourseForgeConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.server.port, 10000);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut config = CourseForgeConfig::default();
        config.server.port = 4242;
        config.logging.json = true;
        config.save(&path).unwrap();

        let loaded = CourseForgeConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(loaded.server.port, 4242);
        assert!(loaded.logging.json);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = CourseForgeConfig::parse("[server]\nport = 8080\n").unwrap();
        config
            .apply_env(env(&[
                ("PORT", "9000"),
                ("DATABASE_PATH", "/tmp/c.db"),
                ("LOG_LEVEL", "debug"),
                ("COURSE_FORGE_ENV", "production"),
            ]))
            .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.path, PathBuf::from("/tmp/c.db"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn test_env_empty_values_are_ignored() {
        let mut config = CourseForgeConfig::default();
        config.apply_env(env(&[("PORT", ""), ("LOG_LEVEL", "  ")])).unwrap();
        assert_eq!(config.server.port, 10000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_invalid_values_are_errors() {
        let mut config = CourseForgeConfig::default();
        let err = config.apply_env(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("Invalid PORT"));

        let err = config
            .apply_env(env(&[("COURSE_FORGE_ENV", "staging")]))
            .unwrap_err();
        assert!(err.to_string().contains("Invalid environment"));
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = CourseForgeConfig::default();
        config.apply_env(env(&[("PORT", "9000")])).unwrap();
        config.apply_cli(&CliOverrides {
            port: Some(7000),
            db_path: Some(PathBuf::from("cli.db")),
            dev: true,
        });
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.database.path, PathBuf::from("cli.db"));
        assert!(config.server.dev);
        assert_eq!(config.bind_host(), "0.0.0.0");
    }

    #[test]
    fn test_cli_without_flags_changes_nothing() {
        let mut config = CourseForgeConfig::default();
        config.apply_cli(&CliOverrides::default());
        assert_eq!(config.server.port, 10000);
        assert_eq!(config.bind_host(), "127.0.0.1");
    }

    #[test]
    fn test_boundary_key_defaults_outside_production() {
        let config = CourseForgeConfig::default();
        assert_eq!(config.boundary_api_key(env(&[])).unwrap(), DEV_API_KEY);
        assert_eq!(
            config
                .boundary_api_key(env(&[("API_KEY_SECRET", "s3cret")]))
                .unwrap(),
            "s3cret"
        );
    }

    #[test]
    fn test_boundary_key_required_in_production() {
        let config = CourseForgeConfig {
            environment: Environment::Production,
            ..Default::default()
        };
        let err = config.boundary_api_key(env(&[])).unwrap_err();
        assert!(err.to_string().contains("API_KEY_SECRET must be set"));
        assert!(config
            .boundary_api_key(env(&[("API_KEY_SECRET", "k")]))
            .is_ok());
    }

    #[test]
    fn test_status_reports_missing_generator_key() {
        let config = CourseForgeConfig::default();
        let status = config.status(env(&[]));
        assert!(status.database);
        assert!(!status.ai);
        assert_eq!(status.missing, vec!["ANTHROPIC_API_KEY".to_string()]);

        let status = config.status(env(&[("ANTHROPIC_API_KEY", "sk-test")]));
        assert!(status.ai);
        assert!(status.missing.is_empty());
    }

    #[test]
    fn test_status_in_production_requires_boundary_key() {
        let config = CourseForgeConfig {
            environment: Environment::Production,
            ..Default::default()
        };
        let status = config.status(env(&[("ANTHROPIC_API_KEY", "sk-test")]));
        assert_eq!(status.missing, vec!["API_KEY_SECRET".to_string()]);
    }

    #[test]
    fn test_validate_warnings() {
        let mut config = CourseForgeConfig::default();
        config.generator.timeout_secs = 0;
        config.generator.base_url = "api.anthropic.com".to_string();
        config.logging.level = "loud".to_string();
        let warnings = config.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.contains("timeout_secs")));
        assert!(warnings.iter().any(|w| w.contains("base_url")));
        assert!(warnings.iter().any(|w| w.contains("Invalid logging.level 'loud'")));
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!(
            "PRODUCTION".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert_eq!(Environment::Test.to_string(), "test");
    }
}
