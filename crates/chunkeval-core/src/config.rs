//! Layered configuration and path helpers.
//!
//! Uses Figment to merge compiled defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates sections, e.g. `APP_GRID__N_SAMPLES=20`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::{DEFAULT_CHUNK_SOURCE, DEFAULT_CHUNK_TITLE};
use crate::error::{Error, Result};
use crate::loader::{DEFAULT_QUESTION_FIELD, DEFAULT_SOURCE_FIELD};
use crate::types::SearchField;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Defaults overlaid with an explicit provider chain (tests, embedding callers).
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingSettings,
    pub search: SearchSettings,
    pub embedding: EmbeddingSettings,
    pub tokenizer: TokenizerSettings,
    pub scoring: ScoringSettings,
    pub grid: GridSettings,
    pub ground_truth: GroundTruthSettings,
    pub output: OutputSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;
        if !(s.alpha > 0.0 && s.beta > 0.0 && s.token_normalization > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "scoring.alpha, scoring.beta and scoring.token_normalization must be positive (got {}, {}, {})",
                s.alpha, s.beta, s.token_normalization
            )));
        }
        let e = &self.embedding;
        if e.max_len == 0 || e.batch_size == 0 || e.hashing_dim == 0 {
            return Err(Error::InvalidConfig("embedding.max_len, batch_size and hashing_dim must be non-zero".into()));
        }
        if self.grid.top_ks.contains(&0) || self.search.num_results == 0 {
            return Err(Error::InvalidConfig("top_k values must be non-zero".into()));
        }
        if self.search.text_fields.is_empty() {
            return Err(Error::InvalidConfig("search.text_fields must name at least one field".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub overlap: usize,
    pub default_title: String,
    pub default_source: String,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 0,
            default_title: DEFAULT_CHUNK_TITLE.to_string(),
            default_source: DEFAULT_CHUNK_SOURCE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// `lexical` or `embedding`.
    pub search_type: String,
    pub num_results: usize,
    pub text_fields: Vec<SearchField>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { search_type: "lexical".to_string(), num_results: 1, text_fields: SearchField::ALL.to_vec() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    /// Sentence encoder loaded from `model_dir`.
    Model,
    /// Deterministic token hashing; no weights needed.
    Hashing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub hashing_dim: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { provider: EmbeddingProvider::Model, model_dir: None, max_len: 256, hashing_dim: 384, batch_size: 32 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerSettings {
    pub model: String,
    pub fallback_encoding: String,
    /// Optional directory of `<encoding>.json` tokenizer files that override
    /// the built-in BPE ranks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for TokenizerSettings {
    fn default() -> Self {
        Self { model: "gpt-4o-mini".to_string(), fallback_encoding: "cl100k_base".to_string(), dir: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub alpha: f64,
    pub beta: f64,
    pub token_normalization: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self { alpha: 2.0, beta: 0.5, token_normalization: 1000.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub chunk_sizes: Vec<usize>,
    pub overlaps: Vec<usize>,
    pub top_ks: Vec<usize>,
    pub n_samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub best_results: usize,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            chunk_sizes: vec![200, 300, 500, 1000],
            overlaps: vec![0, 15, 50, 100],
            top_ks: vec![5, 10],
            n_samples: 10,
            seed: None,
            best_results: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundTruthSettings {
    pub question_field: String,
    pub source_field: String,
}

impl Default for GroundTruthSettings {
    fn default() -> Self {
        Self { question_field: DEFAULT_QUESTION_FIELD.to_string(), source_field: DEFAULT_SOURCE_FIELD.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub results_path: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self { results_path: "evals/results/grid_search_results.csv".to_string() }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Config::from_figment(Figment::new()).settings().expect("settings");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.search.text_fields.len(), 4);
    }

    #[test]
    fn toml_overrides_single_keys() {
        let toml = r#"
            [grid]
            n_samples = 3
            seed = 42
            chunk_sizes = [100, 200]

            [search]
            search_type = "embedding"
        "#;
        let config = Config::from_figment(Figment::from(Toml::string(toml)));
        let settings = config.settings().expect("settings");
        assert_eq!(settings.grid.n_samples, 3);
        assert_eq!(settings.grid.seed, Some(42));
        assert_eq!(settings.grid.chunk_sizes, vec![100, 200]);
        assert_eq!(settings.grid.top_ks, vec![5, 10]);
        assert_eq!(settings.search.search_type, "embedding");
        assert_eq!(config.get::<usize>("grid.n_samples").expect("key"), 3);
    }

    #[test]
    fn rejects_non_positive_scoring() {
        let config = Config::from_figment(Figment::from(Toml::string("[scoring]\nbeta = 0.0\n")));
        assert!(config.settings().is_err());
    }

    #[test]
    fn resolves_relative_paths_against_base() {
        let base = Path::new("/srv/eval");
        assert_eq!(resolve_with_base(base, "models/minilm"), PathBuf::from("/srv/eval/models/minilm"));
        assert_eq!(resolve_with_base(base, "/abs/dir"), PathBuf::from("/abs/dir"));
    }
}
