//! Builds [`PodiumSettings`] from defaults, an optional JSON file and the
//! process environment.
//!
//! The file is overlaid on the serialized defaults before deserializing, so a
//! file only needs the keys it changes. Nested objects merge key by key;
//! arrays and scalars replace; `null` leaves the default in place.
//! Environment overrides are applied last and a value that fails to parse
//! or falls outside its range is logged and ignored.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{
    HEARTBEAT_INTERVAL_MS, LOOKUP_TIMEOUT_MS, LogFormat, MAX_CONNECTIONS, PodiumSettings,
};

/// `~/.podium/settings.json`, falling back to `/tmp` when `HOME` is unset.
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".podium").join("settings.json")
}

/// [`load_settings_from_path`] on [`settings_path`].
pub fn load_settings() -> Result<PodiumSettings> {
    load_settings_from_path(&settings_path())
}

/// Load `path` with overrides from the process environment.
///
/// A missing file yields defaults; a malformed one is an error.
pub fn load_settings_from_path(path: &Path) -> Result<PodiumSettings> {
    load_settings_with_env(path, |name| std::env::var(name).ok())
}

/// Load `path`, reading overrides through `env` instead of the process table.
pub fn load_settings_with_env<F>(path: &Path, env: F) -> Result<PodiumSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut doc = serde_json::to_value(PodiumSettings::default())?;

    if path.exists() {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: Value = serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "settings file applied");
        doc = deep_merge(doc, file);
    } else {
        debug!(path = %path.display(), "no settings file; compiled defaults");
    }

    let mut settings: PodiumSettings = serde_json::from_value(doc)?;
    apply_env_overrides(&mut settings, &Env(env));
    Ok(settings)
}

/// Overlay `over` onto `base`, recursing into objects and skipping nulls.
pub fn deep_merge(base: Value, over: Value) -> Value {
    let (mut base, over) = match (base, over) {
        (Value::Object(base), Value::Object(over)) => (base, over),
        (_, over) => return over,
    };
    for (key, value) in over {
        if value.is_null() {
            continue;
        }
        let next = match base.remove(&key) {
            Some(prev) => deep_merge(prev, value),
            None => value,
        };
        let _ = base.insert(key, next);
    }
    Value::Object(base)
}

fn apply_env_overrides<F>(settings: &mut PodiumSettings, env: &Env<F>)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = env.text("PODIUM_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.bounded("PODIUM_PORT", (0u16, u16::MAX)) {
        settings.server.port = v;
    }
    if let Some(v) = env.bounded("PODIUM_MAX_CONNECTIONS", MAX_CONNECTIONS) {
        settings.server.max_connections = v;
    }
    if let Some(v) = env.bounded("PODIUM_HEARTBEAT_INTERVAL_MS", HEARTBEAT_INTERVAL_MS) {
        settings.server.heartbeat_interval_ms = v;
        // Keep the timeout at three missed pings unless it is already looser.
        settings.server.heartbeat_timeout_ms = settings.server.heartbeat_timeout_ms.max(v * 3);
    }

    if let Some(v) = env
        .text("PODIUM_JWT_SECRET")
        .or_else(|| env.text("JWT_SECRET"))
    {
        settings.auth.jwt_secret = Some(v);
    }

    if let Some(v) = env.text("PODIUM_CATALOG_DB") {
        settings.catalog.db_path = Some(v);
    }
    if let Some(v) = env.bounded("PODIUM_LOOKUP_TIMEOUT_MS", LOOKUP_TIMEOUT_MS) {
        settings.catalog.lookup_timeout_ms = v;
    }

    if let Some(v) = env.text("PODIUM_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.text("PODIUM_LOG_FORMAT") {
        match parse_log_format(&v) {
            Some(f) => settings.logging.format = f,
            None => warn!(key = "PODIUM_LOG_FORMAT", value = %v, "unknown log format ignored"),
        }
    }
}

/// `pretty`, `text`, `compact` or `json`, case-insensitive.
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.to_ascii_lowercase().as_str() {
        "pretty" | "text" | "compact" => Some(LogFormat::Pretty),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

/// Parse `val` and accept it only inside `min..=max`.
pub fn parse_in_range<T>(val: &str, min: T, max: T) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    val.trim()
        .parse::<T>()
        .ok()
        .filter(|n| (min..=max).contains(n))
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty value of `name`.
    fn text(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.is_empty())
    }

    fn bounded<T>(&self, name: &str, (min, max): (T, T)) -> Option<T>
    where
        T: FromStr + PartialOrd + Copy + std::fmt::Display,
    {
        let raw = (self.0)(name)?;
        let parsed = parse_in_range(&raw, min, max);
        if parsed.is_none() {
            warn!(key = name, value = %raw, %min, %max, "out-of-range env override ignored");
        }
        parsed
    }
}
