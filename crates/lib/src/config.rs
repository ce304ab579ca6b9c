//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.maxibot/config.json`) and environment.
//! Environment variables (optionally seeded from a `.env` file) override file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::persona::{Persona, PersonaProfile};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings (webhook + health).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Generation service settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Messaging platform settings.
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Persona profile and overrides.
    #[serde(default)]
    pub persona: PersonaConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 3008). Overridden by PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"; the platform must reach the webhook).
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    3008
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Gemini generateContent settings. Temperature and token limit fall back to the persona profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiConfig {
    /// API key. Overridden by GEMINI_API_KEY env.
    pub api_key: Option<String>,
    /// Model id (default "gemini-1.5-flash").
    pub model: Option<String>,
    /// API base (default https://generativelanguage.googleapis.com/v1beta).
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// Request timeout in seconds. Unset means the HTTP client default (no timeout).
    pub timeout_secs: Option<u64>,
}

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Per-channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub meta: MetaChannelConfig,
}

/// WhatsApp Cloud API (Meta provider) config. Each field is overridden by its META_* env var.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaChannelConfig {
    /// Permanent access token (META_JWT_TOKEN).
    pub jwt_token: Option<String>,
    /// Phone number id used as the sender (META_NUMBER_ID).
    pub number_id: Option<String>,
    /// Token echoed by Meta in the webhook verification handshake (META_VERIFY_TOKEN).
    pub verify_token: Option<String>,
    /// Graph API version (META_VERSION, default "v18.0").
    pub version: Option<String>,
    /// Graph API base (default https://graph.facebook.com).
    pub graph_base_url: Option<String>,
}

pub const DEFAULT_META_VERSION: &str = "v18.0";
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com";

/// Persona selection. `promptFile` replaces the profile's instruction block without touching code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaConfig {
    #[serde(default)]
    pub profile: PersonaProfile,
    /// Relative paths are resolved against the config file's parent.
    pub prompt_file: Option<PathBuf>,
    /// Override of the validator's minimum response length.
    pub min_response_chars: Option<usize>,
}

/// Environment lookup. The process environment in production; tests pass a fixed map.
type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Non-empty trimmed env var, if set.
fn env_nonempty(env: EnvLookup, key: &str) -> Option<String> {
    env(key).and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Env var `key` wins over the file value; blank values on either side are ignored.
fn env_or(env: EnvLookup, key: &str, file_value: Option<&String>) -> Option<String> {
    env_nonempty(env, key).or_else(|| {
        file_value
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Resolve the Gemini API key: env GEMINI_API_KEY overrides config.
pub fn resolve_gemini_api_key(config: &Config) -> Option<String> {
    gemini_api_key_from(config, &process_env)
}

fn gemini_api_key_from(config: &Config, env: EnvLookup) -> Option<String> {
    env_or(env, "GEMINI_API_KEY", config.gemini.api_key.as_ref())
}

pub fn resolve_gemini_model(config: &Config) -> String {
    config
        .gemini
        .model
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_GEMINI_MODEL)
        .to_string()
}

pub fn resolve_gemini_base_url(config: &Config) -> String {
    config
        .gemini
        .base_url
        .as_deref()
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_GEMINI_BASE_URL)
        .to_string()
}

/// Effective Meta channel settings after env overrides and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaCredentials {
    pub jwt_token: Option<String>,
    pub number_id: Option<String>,
    pub verify_token: Option<String>,
    pub version: String,
    pub graph_base_url: String,
}

/// Resolve Meta credentials: META_JWT_TOKEN, META_NUMBER_ID, META_VERIFY_TOKEN, META_VERSION override config.
pub fn resolve_meta_credentials(config: &Config) -> MetaCredentials {
    meta_credentials_from(config, &process_env)
}

fn meta_credentials_from(config: &Config, env: EnvLookup) -> MetaCredentials {
    let meta = &config.channels.meta;
    MetaCredentials {
        jwt_token: env_or(env, "META_JWT_TOKEN", meta.jwt_token.as_ref()),
        number_id: env_or(env, "META_NUMBER_ID", meta.number_id.as_ref()),
        verify_token: env_or(env, "META_VERIFY_TOKEN", meta.verify_token.as_ref()),
        version: env_or(env, "META_VERSION", meta.version.as_ref())
            .unwrap_or_else(|| DEFAULT_META_VERSION.to_string()),
        graph_base_url: meta
            .graph_base_url
            .as_deref()
            .map(|s| s.trim().trim_end_matches('/'))
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_GRAPH_BASE_URL)
            .to_string(),
    }
}

/// Resolve the listening port: env PORT overrides config. Unparseable values are ignored.
pub fn resolve_port(config: &Config) -> u16 {
    port_from(config, &process_env)
}

fn port_from(config: &Config, env: EnvLookup) -> u16 {
    match env_nonempty(env, "PORT") {
        Some(p) => p.parse().unwrap_or_else(|_| {
            log::warn!("ignoring invalid PORT value {:?}", p);
            config.gateway.port
        }),
        None => config.gateway.port,
    }
}

/// Build the persona from the configured profile, prompt file and overrides.
/// Generation parameters set under `gemini` take precedence over the profile's.
pub fn resolve_persona(config: &Config, config_path: &Path) -> Result<Persona> {
    let mut persona = Persona::from_profile(config.persona.profile);
    if let Some(file) = config.persona.prompt_file.as_ref().filter(|p| !p.as_os_str().is_empty()) {
        let path = resolve_relative(file, config_path);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading persona prompt from {}", path.display()))?;
        if text.trim().is_empty() {
            anyhow::bail!("persona prompt file {} is empty", path.display());
        }
        persona.instructions = text;
    }
    if let Some(min) = config.persona.min_response_chars {
        persona.min_response_chars = min;
    }
    if let Some(t) = config.gemini.temperature {
        persona.temperature = t;
    }
    if let Some(n) = config.gemini.max_output_tokens {
        persona.max_output_tokens = n;
    }
    Ok(persona)
}

fn resolve_relative(path: &Path, config_path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(path)
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("MAXIBOT_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".maxibot").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load `.env` from the working directory (if any) into the process environment.
/// Variables already set in the environment are kept. Returns the file that was loaded,
/// or None when there is no `.env`; the caller logs the outcome once logging is up.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    dotenv_outcome(dotenvy::dotenv())
}

/// Like [`load_dotenv`] for an explicit file.
pub fn load_dotenv_from(path: &Path) -> Result<Option<PathBuf>, dotenvy::Error> {
    dotenv_outcome(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

fn dotenv_outcome(res: Result<PathBuf, dotenvy::Error>) -> Result<Option<PathBuf>, dotenvy::Error> {
    match res {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Load config from the default path (or MAXIBOT_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the persona prompt file).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Create the config directory and a default `config.json` if missing. Existing files are left untouched.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if config_path.exists() {
        log::debug!("config already exists at {}, skipping", config_path.display());
    } else {
        let default_config = serde_json::to_string_pretty(&Config::default())
            .context("serializing default config")?;
        std::fs::write(config_path, default_config)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 3008);
        assert_eq!(g.bind, "0.0.0.0");
    }

    #[test]
    fn parses_camel_case_file() {
        let config: Config = serde_json::from_str(
            r#"{
                "gateway": { "port": 4000 },
                "gemini": { "model": "gemini-2.0-flash", "maxOutputTokens": 256 },
                "channels": { "meta": { "numberId": "12345", "version": "v19.0" } },
                "persona": { "profile": "general", "minResponseChars": 3 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.gateway.port, 4000);
        assert_eq!(config.gateway.bind, "0.0.0.0");
        assert_eq!(resolve_gemini_model(&config), "gemini-2.0-flash");
        assert_eq!(config.gemini.max_output_tokens, Some(256));
        assert_eq!(config.channels.meta.number_id.as_deref(), Some("12345"));
        assert_eq!(config.persona.profile, PersonaProfile::General);
        assert_eq!(config.persona.min_response_chars, Some(3));
    }

    #[test]
    fn gemini_defaults() {
        let mut config = Config::default();
        assert_eq!(resolve_gemini_model(&config), DEFAULT_GEMINI_MODEL);
        assert_eq!(resolve_gemini_base_url(&config), DEFAULT_GEMINI_BASE_URL);
        config.gemini.base_url = Some("http://127.0.0.1:9999/".to_string());
        config.gemini.model = Some("  ".to_string());
        assert_eq!(resolve_gemini_base_url(&config), "http://127.0.0.1:9999");
        assert_eq!(resolve_gemini_model(&config), DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn persona_overrides_from_config() {
        let mut config = Config::default();
        config.persona.min_response_chars = Some(2);
        config.gemini.temperature = Some(0.2);
        config.gemini.max_output_tokens = Some(64);
        let persona = resolve_persona(&config, Path::new("/nonexistent/config.json")).unwrap();
        assert_eq!(persona.min_response_chars, 2);
        assert_eq!(persona.temperature, 0.2);
        assert_eq!(persona.max_output_tokens, 64);
        assert!(persona.instructions.contains("Maxibot"));
    }

    #[test]
    fn persona_prompt_file_relative_to_config() {
        let dir = std::env::temp_dir().join(format!("maxibot-config-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("persona.txt"), "Eres un asistente de prueba.").unwrap();
        let mut config = Config::default();
        config.persona.prompt_file = Some(PathBuf::from("persona.txt"));
        let persona = resolve_persona(&config, &dir.join("config.json")).unwrap();
        assert_eq!(persona.instructions, "Eres un asistente de prueba.");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_persona_prompt_file_is_an_error() {
        let mut config = Config::default();
        config.persona.prompt_file = Some(PathBuf::from("/nonexistent/persona.txt"));
        assert!(resolve_persona(&config, Path::new("config.json")).is_err());
    }

    fn env_map(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn meta_credentials_defaults() {
        let mut config = Config::default();
        config.channels.meta.graph_base_url = Some("http://localhost:1234/".to_string());
        let creds = meta_credentials_from(&config, &env_map(&[]));
        assert_eq!(creds.graph_base_url, "http://localhost:1234");
        assert_eq!(creds.version, DEFAULT_META_VERSION);
        assert_eq!(creds.jwt_token, None);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::default();
        config.gemini.api_key = Some("file-key".to_string());
        config.channels.meta.jwt_token = Some("file-jwt".to_string());
        config.channels.meta.number_id = Some("111".to_string());
        config.channels.meta.version = Some("v17.0".to_string());
        let env = env_map(&[
            ("GEMINI_API_KEY", " env-key "),
            ("META_JWT_TOKEN", "env-jwt"),
            ("META_VERIFY_TOKEN", "env-verify"),
            ("META_VERSION", "v19.0"),
        ]);

        assert_eq!(gemini_api_key_from(&config, &env).as_deref(), Some("env-key"));
        let creds = meta_credentials_from(&config, &env);
        assert_eq!(creds.jwt_token.as_deref(), Some("env-jwt"));
        assert_eq!(creds.number_id.as_deref(), Some("111"));
        assert_eq!(creds.verify_token.as_deref(), Some("env-verify"));
        assert_eq!(creds.version, "v19.0");
    }

    #[test]
    fn blank_env_falls_back_to_file() {
        let mut config = Config::default();
        config.gemini.api_key = Some("file-key".to_string());
        config.channels.meta.number_id = Some("111".to_string());
        let env = env_map(&[("GEMINI_API_KEY", "   "), ("META_NUMBER_ID", ""), ("META_VERSION", " ")]);

        assert_eq!(gemini_api_key_from(&config, &env).as_deref(), Some("file-key"));
        let creds = meta_credentials_from(&config, &env);
        assert_eq!(creds.number_id.as_deref(), Some("111"));
        assert_eq!(creds.version, DEFAULT_META_VERSION);

        config.gemini.api_key = Some(" ".to_string());
        assert_eq!(gemini_api_key_from(&config, &env), None);
    }

    #[test]
    fn port_from_env_or_config() {
        let mut config = Config::default();
        config.gateway.port = 4000;
        assert_eq!(port_from(&config, &env_map(&[])), 4000);
        assert_eq!(port_from(&config, &env_map(&[("PORT", "8080")])), 8080);
        assert_eq!(port_from(&config, &env_map(&[("PORT", " 8081 ")])), 8081);
        assert_eq!(port_from(&config, &env_map(&[("PORT", "abc")])), 4000);
        assert_eq!(port_from(&config, &env_map(&[("PORT", "70000")])), 4000);
        assert_eq!(port_from(&config, &env_map(&[("PORT", "")])), 4000);
    }

    #[test]
    fn dotenv_file_seeds_environment() {
        let dir = std::env::temp_dir().join(format!("maxibot-dotenv-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let key = format!("MAXIBOT_DOTENV_TEST_{}", uuid::Uuid::new_v4().simple());
        let path = dir.join(".env");
        std::fs::write(&path, format!("{}=from-dotenv\n", key)).unwrap();

        assert_eq!(load_dotenv_from(&path).unwrap(), Some(path.clone()));
        assert_eq!(std::env::var(&key).as_deref(), Ok("from-dotenv"));
        assert_eq!(load_dotenv_from(&dir.join("missing.env")).unwrap(), None);

        std::fs::write(&path, "not a valid line\n").unwrap();
        assert!(load_dotenv_from(&path).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_missing_config_uses_defaults() {
        let path = std::env::temp_dir()
            .join(format!("maxibot-missing-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.gateway.port, 3008);
    }

    #[test]
    fn init_writes_default_config_once() {
        let dir = std::env::temp_dir().join(format!("maxibot-init-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.json");
        init_config_dir(&path).unwrap();
        let (config, _) = load_config(Some(path.clone())).unwrap();
        assert_eq!(config.gateway.port, 3008);

        std::fs::write(&path, r#"{"gateway":{"port":5000}}"#).unwrap();
        init_config_dir(&path).unwrap();
        let (config, _) = load_config(Some(path)).unwrap();
        assert_eq!(config.gateway.port, 5000);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
