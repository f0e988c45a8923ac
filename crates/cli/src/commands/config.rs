use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use threadloom_core::config::{AppConfig, LoadOptions, LEGACY_TOKEN_ENV, TOKEN_ENV};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let fields = [
        (
            "discord.token",
            redact_token(config.discord.token.expose_secret()),
            source("discord.token", &[TOKEN_ENV, LEGACY_TOKEN_ENV]),
        ),
        (
            "discord.research_category",
            config.discord.research_category.clone(),
            source("discord.research_category", &["THREADLOOM_DISCORD_RESEARCH_CATEGORY"]),
        ),
        (
            "discord.thread_auto_archive_minutes",
            config.discord.thread_auto_archive_minutes.to_string(),
            source(
                "discord.thread_auto_archive_minutes",
                &["THREADLOOM_DISCORD_THREAD_AUTO_ARCHIVE_MINUTES"],
            ),
        ),
        (
            "discord.rows_per_message",
            config.discord.rows_per_message.to_string(),
            source("discord.rows_per_message", &["THREADLOOM_DISCORD_ROWS_PER_MESSAGE"]),
        ),
        (
            "ingest.fetch_timeout_secs",
            config.ingest.fetch_timeout_secs.to_string(),
            source("ingest.fetch_timeout_secs", &["THREADLOOM_INGEST_FETCH_TIMEOUT_SECS"]),
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            source("server.bind_address", &["THREADLOOM_SERVER_BIND_ADDRESS"]),
        ),
        (
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            source("server.health_check_port", &["THREADLOOM_SERVER_HEALTH_CHECK_PORT"]),
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            source("logging.level", &["THREADLOOM_LOGGING_LEVEL", "THREADLOOM_LOG_LEVEL"]),
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            source("logging.format", &["THREADLOOM_LOGGING_FORMAT", "THREADLOOM_LOG_FORMAT"]),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.iter().map(|(key, value, source)| render_line(key, value, source)));

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("threadloom.toml"), PathBuf::from("config/threadloom.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: &str) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the first token segment, which only encodes the bot's user id.
pub fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.split_once('.') {
        Some((user_segment, _)) if !user_segment.is_empty() => format!("{user_segment}.***"),
        _ => "<redacted>".to_string(),
    }
}
