use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::DEFAULT_ROWS_PER_MESSAGE;

pub const TOKEN_ENV: &str = "THREADLOOM_DISCORD_TOKEN";
pub const LEGACY_TOKEN_ENV: &str = "DISCORD_TOKEN";

const AUTO_ARCHIVE_CHOICES: [u16; 4] = [60, 1440, 4320, 10080];
// Discord rejects message content over 2000 characters and a rendered row
// runs 200 to 400, so chunks past ten rows are refused at send time.
const MAX_ROWS_PER_MESSAGE: usize = 10;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub ingest: IngestConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub token: SecretString,
    pub research_category: String,
    pub thread_auto_archive_minutes: u16,
    pub rows_per_message: usize,
}

#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub fetch_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub discord_token: Option<String>,
    pub research_category: Option<String>,
    pub rows_per_message: Option<usize>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    /// Reads this file instead of searching for `.env` from the working directory.
    pub dotenv_path: Option<PathBuf>,
    pub skip_dotenv: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not set; export it or put it in a .env file")]
    MissingRequired { name: &'static str },
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig {
                token: String::new().into(),
                research_category: "research".to_string(),
                thread_auto_archive_minutes: 1440,
                rows_per_message: DEFAULT_ROWS_PER_MESSAGE,
            },
            ingest: IngestConfig { fetch_timeout_secs: 30 },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), health_check_port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Builds the effective configuration: defaults, then the TOML file, then
    /// environment (including `.env`), then explicit overrides. Fails on the
    /// first missing required value without returning a partial config.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        if !options.skip_dotenv {
            // Variables already present in the environment take precedence.
            // A missing file is not an error; the environment alone may be enough.
            let _ = match options.dotenv_path.as_deref() {
                Some(path) => dotenvy::from_path(path),
                None => dotenvy::dotenv().map(|_| ()),
            };
        }

        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(discord) = patch.discord {
            if let Some(discord_token_value) = discord.token {
                self.discord.token = discord_token_value.into();
            }
            if let Some(research_category) = discord.research_category {
                self.discord.research_category = research_category;
            }
            if let Some(minutes) = discord.thread_auto_archive_minutes {
                self.discord.thread_auto_archive_minutes = minutes;
            }
            if let Some(rows_per_message) = discord.rows_per_message {
                self.discord.rows_per_message = rows_per_message;
            }
        }

        if let Some(ingest) = patch.ingest {
            if let Some(fetch_timeout_secs) = ingest.fetch_timeout_secs {
                self.ingest.fetch_timeout_secs = fetch_timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env(TOKEN_ENV).or_else(|| read_env(LEGACY_TOKEN_ENV)) {
            self.discord.token = value.into();
        }
        if let Some(value) = read_env("THREADLOOM_DISCORD_RESEARCH_CATEGORY") {
            self.discord.research_category = value;
        }
        if let Some(value) = read_env("THREADLOOM_DISCORD_THREAD_AUTO_ARCHIVE_MINUTES") {
            self.discord.thread_auto_archive_minutes =
                parse_env("THREADLOOM_DISCORD_THREAD_AUTO_ARCHIVE_MINUTES", &value)?;
        }
        if let Some(value) = read_env("THREADLOOM_DISCORD_ROWS_PER_MESSAGE") {
            self.discord.rows_per_message =
                parse_env("THREADLOOM_DISCORD_ROWS_PER_MESSAGE", &value)?;
        }

        if let Some(value) = read_env("THREADLOOM_INGEST_FETCH_TIMEOUT_SECS") {
            self.ingest.fetch_timeout_secs =
                parse_env("THREADLOOM_INGEST_FETCH_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("THREADLOOM_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("THREADLOOM_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_env("THREADLOOM_SERVER_HEALTH_CHECK_PORT", &value)?;
        }

        let log_level =
            read_env("THREADLOOM_LOGGING_LEVEL").or_else(|| read_env("THREADLOOM_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("THREADLOOM_LOGGING_FORMAT").or_else(|| read_env("THREADLOOM_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(discord_token) = overrides.discord_token {
            self.discord.token = discord_token.into();
        }
        if let Some(research_category) = overrides.research_category {
            self.discord.research_category = research_category;
        }
        if let Some(rows_per_message) = overrides.rows_per_message {
            self.discord.rows_per_message = rows_per_message;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_discord(&self.discord)?;
        validate_ingest(&self.ingest)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("threadloom.toml"), PathBuf::from("config/threadloom.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    let token = discord.token.expose_secret();
    if token.trim().is_empty() {
        return Err(ConfigError::MissingRequired { name: LEGACY_TOKEN_ENV });
    }
    if token.chars().any(char::is_whitespace) {
        let hint = if token.starts_with("Bot ") {
            " (hint: drop the `Bot ` prefix, it is added automatically)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "discord.token must not contain whitespace{hint}"
        )));
    }

    if discord.research_category.trim().is_empty() {
        return Err(ConfigError::Validation(
            "discord.research_category must not be empty".to_string(),
        ));
    }

    if !AUTO_ARCHIVE_CHOICES.contains(&discord.thread_auto_archive_minutes) {
        return Err(ConfigError::Validation(format!(
            "discord.thread_auto_archive_minutes must be one of {AUTO_ARCHIVE_CHOICES:?}"
        )));
    }

    if discord.rows_per_message == 0 || discord.rows_per_message > MAX_ROWS_PER_MESSAGE {
        return Err(ConfigError::Validation(format!(
            "discord.rows_per_message must be in range 1..={MAX_ROWS_PER_MESSAGE}"
        )));
    }

    Ok(())
}

fn validate_ingest(ingest: &IngestConfig) -> Result<(), ConfigError> {
    if ingest.fetch_timeout_secs == 0 || ingest.fetch_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "ingest.fetch_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    ingest: Option<IngestPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    token: Option<String>,
    research_category: Option<String>,
    thread_auto_archive_minutes: Option<u16>,
    rows_per_message: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct IngestPatch {
    fetch_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const TOKEN_VARS: [&str; 2] = ["THREADLOOM_DISCORD_TOKEN", "DISCORD_TOKEN"];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn options() -> LoadOptions {
        LoadOptions { skip_dotenv: true, ..LoadOptions::default() }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn missing_token_fails_fast_and_names_the_variable() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOKEN_VARS);

        let error = match AppConfig::load(options()) {
            Ok(_) => return Err("expected missing token failure".to_string()),
            Err(error) => error,
        };

        ensure(
            matches!(error, ConfigError::MissingRequired { name: "DISCORD_TOKEN" }),
            "missing token should surface as MissingRequired",
        )?;
        ensure(error.to_string().contains("DISCORD_TOKEN"), "message should name the variable")
    }

    #[test]
    fn whitespace_only_token_counts_as_missing() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOKEN_VARS);
        env::set_var("DISCORD_TOKEN", "   ");

        let result = AppConfig::load(options());

        clear_vars(&TOKEN_VARS);
        ensure(
            matches!(result, Err(ConfigError::MissingRequired { .. })),
            "blank token should be rejected",
        )
    }

    #[test]
    fn legacy_token_variable_is_accepted_and_prefixed_variable_wins() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOKEN_VARS);

        env::set_var("DISCORD_TOKEN", "legacy-token");
        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(options())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                config.discord.token.expose_secret() == "legacy-token",
                "legacy variable should be read",
            )?;

            env::set_var("THREADLOOM_DISCORD_TOKEN", "prefixed-token");
            let config = AppConfig::load(options())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                config.discord.token.expose_secret() == "prefixed-token",
                "prefixed variable should take precedence",
            )
        })();

        clear_vars(&TOKEN_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOKEN_VARS);

        env::set_var("THREADLOOM_DISCORD_RESEARCH_CATEGORY", "Research-From-Env");
        env::set_var("TEST_THREADLOOM_TOKEN", "token-from-interpolation");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("threadloom.toml");
            fs::write(
                &path,
                r#"
[discord]
token = "${TEST_THREADLOOM_TOKEN}"
research_category = "from-file"
rows_per_message = 5

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..options()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.discord.token.expose_secret() == "token-from-interpolation",
                "file token should be interpolated from the environment",
            )?;
            ensure(
                config.discord.research_category == "Research-From-Env",
                "env category should win over file",
            )?;
            ensure(config.discord.rows_per_message == 5, "file rows_per_message should apply")?;
            ensure(config.logging.level == "debug", "override log level should win")?;
            ensure(
                config.discord.thread_auto_archive_minutes == 1440,
                "auto archive should default to one day",
            )
        })();

        clear_vars(&["THREADLOOM_DISCORD_RESEARCH_CATEGORY", "TEST_THREADLOOM_TOKEN"]);
        result
    }

    #[test]
    fn invalid_numeric_override_is_reported_with_its_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        env::set_var("DISCORD_TOKEN", "token");
        env::set_var("THREADLOOM_DISCORD_ROWS_PER_MESSAGE", "many");

        let result = AppConfig::load(options());

        clear_vars(&["DISCORD_TOKEN", "THREADLOOM_DISCORD_ROWS_PER_MESSAGE"]);
        ensure(
            matches!(
                result,
                Err(ConfigError::InvalidEnvOverride { ref key, .. })
                    if key == "THREADLOOM_DISCORD_ROWS_PER_MESSAGE"
            ),
            "bad rows override should be rejected",
        )
    }

    #[test]
    fn unsupported_auto_archive_duration_is_rejected() -> Result<(), String> {
        let mut config = AppConfig::default();
        config.discord.token = "token".to_string().into();
        config.discord.thread_auto_archive_minutes = 90;

        ensure(
            matches!(
                config.validate(),
                Err(ConfigError::Validation(ref message))
                    if message.contains("thread_auto_archive_minutes")
            ),
            "90 minutes is not a platform archive duration",
        )
    }

    #[test]
    fn dotenv_file_fills_gaps_but_exported_values_win() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        let dotenv_vars = [
            "THREADLOOM_DISCORD_TOKEN",
            "DISCORD_TOKEN",
            "THREADLOOM_DISCORD_RESEARCH_CATEGORY",
        ];
        clear_vars(&dotenv_vars);
        env::set_var("DISCORD_TOKEN", "exported-token");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join(".env");
            fs::write(
                &path,
                "DISCORD_TOKEN=dotenv-token\nTHREADLOOM_DISCORD_RESEARCH_CATEGORY=from-dotenv\n",
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                dotenv_path: Some(path),
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.discord.token.expose_secret() == "exported-token",
                "exported variable should beat the .env value",
            )?;
            ensure(
                config.discord.research_category == "from-dotenv",
                ".env should supply values the environment lacks",
            )
        })();

        clear_vars(&dotenv_vars);
        result
    }

    #[test]
    fn rows_per_message_is_capped_to_fit_message_length() -> Result<(), String> {
        let mut config = AppConfig::default();
        config.discord.token = "token".to_string().into();

        config.discord.rows_per_message = 10;
        ensure(config.validate().is_ok(), "ten rows per message should be accepted")?;

        config.discord.rows_per_message = 11;
        ensure(
            matches!(
                config.validate(),
                Err(ConfigError::Validation(ref message)) if message.contains("rows_per_message")
            ),
            "eleven rows per message should be rejected",
        )?;

        config.discord.rows_per_message = 0;
        ensure(config.validate().is_err(), "zero rows per message should be rejected")
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOKEN_VARS);
        env::set_var("DISCORD_TOKEN", "super-secret-token-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(options())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("super-secret-token-value"), "debug output should redact token")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )
        })();

        clear_vars(&TOKEN_VARS);
        result
    }
}
