use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Gemini REST endpoint.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Fixed candidate list, fast models first.
pub const DEFAULT_FALLBACK_MODELS: [&str; 4] = [
    "gemini-1.5-flash",
    "gemini-2.5-flash",
    "gemini-1.5-pro",
    "gemini-2.5-pro",
];

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_FAST_TIER_MARKER: &str = "flash";

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
    pub models: ModelSettings,
    pub static_files: StaticSettings,
    pub telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// `None` when `GEMINI_API_KEY` is unset or empty. The service still
    /// starts; `/chat` reports the missing key.
    pub api_key: Option<Secret<String>>,
    pub api_base: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Ask the provider which models exist instead of using `fallback_models` directly.
    pub discovery: bool,
    /// Ordered list used when discovery is off or fails.
    pub fallback_models: Vec<String>,
    /// Upper bound on discovered candidates tried per request; `None` tries
    /// every discovered model.
    pub max_candidates: Option<usize>,
    /// Substring marking a model as fast tier (case-insensitive).
    pub fast_tier_marker: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            discovery: true,
            fallback_models: DEFAULT_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect(),
            max_candidates: None,
            fast_tier_marker: DEFAULT_FAST_TIER_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StaticSettings {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct TelemetrySettings {
    pub otlp_endpoint: Option<String>,
}

impl ChatConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        Ok(ChatConfig {
            common: common_config,
            gemini: GeminiSettings {
                api_key: env::var("GEMINI_API_KEY")
                    .ok()
                    .filter(|key| !key.trim().is_empty())
                    .map(Secret::new),
                api_base: get_env("GEMINI_API_BASE", Some(DEFAULT_GEMINI_API_BASE))?,
                request_timeout_secs: parse_env(
                    "GEMINI_REQUEST_TIMEOUT_SECS",
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                ),
            },
            models: ModelSettings {
                discovery: env_flag("CHAT_MODEL_DISCOVERY", true),
                fallback_models: parse_model_list(&get_env("CHAT_FALLBACK_MODELS", Some(""))?),
                max_candidates: env::var("CHAT_MAX_CANDIDATES")
                    .ok()
                    .and_then(|raw| parse_or_warn::<usize>("CHAT_MAX_CANDIDATES", &raw))
                    .filter(|max| *max > 0),
                fast_tier_marker: get_env(
                    "CHAT_FAST_TIER_MARKER",
                    Some(DEFAULT_FAST_TIER_MARKER),
                )?,
            },
            static_files: StaticSettings {
                dir: env::var("CHAT_STATIC_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| default_static_dir()),
            },
            telemetry: TelemetrySettings {
                otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|e| !e.is_empty()),
            },
        })
    }
}

/// Split a comma-separated model list. An empty list means the built-in defaults.
pub fn parse_model_list(raw: &str) -> Vec<String> {
    let models: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(|m| m.trim_start_matches("models/").to_string())
        .collect();

    if models.is_empty() {
        DEFAULT_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect()
    } else {
        models
    }
}

// Works from the workspace root and from inside the crate directory.
fn default_static_dir() -> PathBuf {
    let workspace_relative = PathBuf::from("chat-service").join("static");
    if workspace_relative.is_dir() {
        workspace_relative
    } else {
        PathBuf::from("static")
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| parse_or_warn(key, &raw))
        .unwrap_or(default)
}

fn parse_or_warn<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(key = %key, value = %raw, "Ignoring unparseable setting, using default");
    }
    parsed
}

/// Accepts `true/false`, `1/0`, `yes/no` and `on/off`, case-insensitively.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    let Ok(raw) = env::var(key) else {
        return default;
    };

    parse_flag(&raw).unwrap_or_else(|| {
        tracing::warn!(key = %key, value = %raw, default, "Ignoring unparseable flag, using default");
        default
    })
}

fn get_env(key: &str, default: Option<&str>) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => match default {
            Some(def) => Ok(def.to_string()),
            None => Err(AppError::ConfigError(anyhow::anyhow!(
                "{} is required but not set",
                key
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_list_keeps_order() {
        let models = parse_model_list("gemini-2.0-flash, models/gemini-1.5-pro ,,");
        assert_eq!(models, vec!["gemini-2.0-flash", "gemini-1.5-pro"]);
    }

    #[test]
    fn test_parse_model_list_empty_uses_defaults() {
        assert_eq!(parse_model_list("  "), DEFAULT_FALLBACK_MODELS.to_vec());
    }

    #[test]
    fn test_get_env_missing_without_default_is_config_error() {
        let err = get_env("CHAT_SERVICE_TEST_UNSET_VARIABLE", None).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_model_settings_default() {
        let settings = ModelSettings::default();
        assert!(settings.discovery);
        assert_eq!(settings.fallback_models[0], "gemini-1.5-flash");
        assert_eq!(settings.max_candidates, None);
    }

    #[test]
    fn test_parse_flag_accepts_common_spellings() {
        for raw in ["true", "1", "YES", " on "] {
            assert_eq!(parse_flag(raw), Some(true), "{raw}");
        }
        for raw in ["false", "0", "No", "OFF"] {
            assert_eq!(parse_flag(raw), Some(false), "{raw}");
        }
        assert_eq!(parse_flag("maybe"), None);
        assert_eq!(parse_flag(""), None);
    }
}
