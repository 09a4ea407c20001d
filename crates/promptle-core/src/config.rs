use crate::errors::ConfigError;
use crate::model::ScoringMode;
use crate::providers::imagegen::fal::DEFAULT_MODEL;
use crate::timeouts::Timeouts;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_db")]
    pub db: PathBuf,
    #[serde(default)]
    pub scoring_mode: ScoringMode,
    #[serde(default)]
    pub embedder: EmbedderConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            db: default_db(),
            scoring_mode: ScoringMode::default(),
            embedder: EmbedderConfig::default(),
            generator: GeneratorConfig::default(),
            timeouts: Timeouts::default(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderProvider {
    #[default]
    Http,
    Fake,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedderConfig {
    #[serde(default)]
    pub provider: EmbedderProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Expected vector length; any length is accepted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dims: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorProvider {
    Fal,
    Fake,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub provider: GeneratorProvider,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: GeneratorProvider::default(),
            api_key: None,
            model: default_model(),
        }
    }
}

fn default_version() -> u32 {
    SUPPORTED_CONFIG_VERSION
}

fn default_db() -> PathBuf {
    PathBuf::from(".promptle/promptle.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

pub fn load_config(path: &Path, strict: bool) -> Result<GameConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    parse_config(&raw, strict)
        .map_err(|e| ConfigError(format!("{} (file: {})", e.0, path.display())))
}

pub fn parse_config(raw: &str, strict: bool) -> Result<GameConfig, ConfigError> {
    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);
    let cfg: GameConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    let meaningful: Vec<_> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .collect();
    if !meaningful.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "unknown fields detected in strict mode: {:?}",
                meaningful
            )));
        }
        // Runs before the CLI installs its subscriber.
        eprintln!("WARN: ignored unknown config fields: {:?}", meaningful);
    }

    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }
    Ok(cfg)
}

impl GameConfig {
    /// Applies `PROMPTLE_*` (and `FAL_API_KEY`) environment overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|k| std::env::var(k).ok())
    }

    pub fn apply_overrides<F>(&mut self, get: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("PROMPTLE_DB") {
            self.db = PathBuf::from(v);
        }
        if let Some(v) = get("PROMPTLE_SCORING_MODE") {
            self.scoring_mode = ScoringMode::parse(&v)
                .ok_or_else(|| ConfigError(format!("unknown scoring mode {:?}", v)))?;
        }
        if let Some(v) = get("PROMPTLE_EMBEDDER") {
            self.embedder.provider = match v.trim() {
                "http" => EmbedderProvider::Http,
                "fake" => EmbedderProvider::Fake,
                other => return Err(ConfigError(format!("unknown embedder {:?}", other))),
            };
        }
        if let Some(v) = get("PROMPTLE_EMBEDDER_URL") {
            self.embedder.base_url = Some(v);
        }
        if let Some(v) = get("PROMPTLE_GENERATOR") {
            self.generator.provider = match v.trim() {
                "fal" => GeneratorProvider::Fal,
                "fake" => GeneratorProvider::Fake,
                "none" => GeneratorProvider::None,
                other => return Err(ConfigError(format!("unknown generator {:?}", other))),
            };
        }
        if let Some(v) = get("FAL_API_KEY") {
            self.generator.api_key = Some(v);
        }
        if let Some(v) = get("PROMPTLE_STORAGE_TIMEOUT_MS") {
            self.timeouts.storage_ms = parse_ms("PROMPTLE_STORAGE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("PROMPTLE_GENERATION_TIMEOUT_MS") {
            self.timeouts.generation_ms = parse_ms("PROMPTLE_GENERATION_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("PROMPTLE_EMBEDDING_TIMEOUT_MS") {
            self.timeouts.embedding_ms = parse_ms("PROMPTLE_EMBEDDING_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("PROMPTLE_LOG") {
            self.log_level = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scoring_mode.needs_generator() && self.generator.provider == GeneratorProvider::None
        {
            return Err(ConfigError(
                "scoring_mode generated_image_embedding requires generator.provider fal or fake"
                    .into(),
            ));
        }
        if self.embedder.provider == EmbedderProvider::Http
            && self
                .embedder
                .base_url
                .as_deref()
                .map_or(true, |u| u.trim().is_empty())
        {
            return Err(ConfigError(
                "embedder.base_url (or PROMPTLE_EMBEDDER_URL) is required for the http embedder"
                    .into(),
            ));
        }
        if self.generator.provider == GeneratorProvider::Fal
            && self.generator.api_key.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError(
                "generator.api_key (or FAL_API_KEY) is required for the fal generator".into(),
            ));
        }
        if self.embedder.dims == Some(0) {
            return Err(ConfigError("embedder.dims must be positive".into()));
        }
        for (name, ms) in [
            ("storage_ms", self.timeouts.storage_ms),
            ("generation_ms", self.timeouts.generation_ms),
            ("embedding_ms", self.timeouts.embedding_ms),
        ] {
            if ms == 0 {
                return Err(ConfigError(format!("timeouts.{} must be positive", name)));
            }
        }
        Ok(())
    }
}

fn parse_ms(var: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| {
        ConfigError(format!(
            "{} must be a whole number of milliseconds, got {:?}",
            var, raw
        ))
    })
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(
        path,
        r#"version: 1
db: .promptle/promptle.db
scoring_mode: direct_prompt_embedding
embedder:
  provider: http
  base_url: "http://localhost:7860"
generator:
  provider: none
timeouts:
  storage_ms: 5000
  generation_ms: 60000
  embedding_ms: 30000
"#,
    )
    .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn minimal_yaml_uses_defaults() {
        let cfg = parse_config("version: 1\n", true).unwrap();
        assert_eq!(cfg, GameConfig::default());
        assert_eq!(cfg.timeouts.storage_ms, 5000);
    }

    #[test]
    fn full_yaml_parses() {
        let cfg = parse_config(
            r#"
version: 1
db: /tmp/p.db
scoring_mode: generated_image_embedding
embedder:
  provider: fake
  dims: 16
generator:
  provider: fake
timeouts:
  embedding_ms: 1000
"#,
            true,
        )
        .unwrap();
        assert_eq!(cfg.scoring_mode, ScoringMode::GeneratedImageEmbedding);
        assert_eq!(cfg.embedder.provider, EmbedderProvider::Fake);
        assert_eq!(cfg.embedder.dims, Some(16));
        assert_eq!(cfg.timeouts.embedding_ms, 1000);
        assert_eq!(cfg.timeouts.generation_ms, 60_000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unknown_fields_fail_only_in_strict_mode() {
        let raw = "version: 1\nscoring: fast\n_anchor: 1\n";
        let err = parse_config(raw, true).unwrap_err();
        assert!(err.0.contains("scoring"), "{}", err);
        assert!(parse_config(raw, false).is_ok());
    }

    #[test]
    fn unsupported_version_is_rejected() {
        assert!(parse_config("version: 2\n", false).is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("PROMPTLE_DB", "/data/game.db"),
            ("PROMPTLE_SCORING_MODE", "generated"),
            ("PROMPTLE_GENERATOR", "fal"),
            ("FAL_API_KEY", "k"),
            ("PROMPTLE_EMBEDDER_URL", "http://clip:7860"),
            ("PROMPTLE_STORAGE_TIMEOUT_MS", "250"),
        ]
        .into_iter()
        .collect();
        let mut cfg = GameConfig::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.db, PathBuf::from("/data/game.db"));
        assert_eq!(cfg.scoring_mode, ScoringMode::GeneratedImageEmbedding);
        assert_eq!(cfg.generator.provider, GeneratorProvider::Fal);
        assert_eq!(cfg.timeouts.storage_ms, 250);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validation_catches_missing_collaborators() {
        let mut cfg = GameConfig::default();
        // http embedder without a url
        assert!(cfg.validate().is_err());
        cfg.embedder.provider = EmbedderProvider::Fake;
        assert!(cfg.validate().is_ok());

        cfg.scoring_mode = ScoringMode::GeneratedImageEmbedding;
        assert!(cfg.validate().is_err());
        cfg.generator.provider = GeneratorProvider::Fal;
        assert!(cfg.validate().is_err());
        cfg.generator.api_key = Some("key".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bad_timeout_env_is_an_error() {
        let mut cfg = GameConfig::default();
        let err = cfg
            .apply_overrides(|k| (k == "PROMPTLE_EMBEDDING_TIMEOUT_MS").then(|| "30s".to_string()))
            .unwrap_err();
        assert!(err.0.contains("PROMPTLE_EMBEDDING_TIMEOUT_MS"), "{}", err);
        assert_eq!(cfg.timeouts.embedding_ms, 30_000);
    }

    #[test]
    fn bad_scoring_mode_env_is_an_error() {
        let mut cfg = GameConfig::default();
        let err = cfg
            .apply_overrides(|k| (k == "PROMPTLE_SCORING_MODE").then(|| "magic".to_string()))
            .unwrap_err();
        assert!(err.0.contains("magic"));
    }
}
