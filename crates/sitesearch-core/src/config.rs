//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `SITESEARCH_*`
//! env vars. Index descriptors live under `[[indexes]]`, engine-wide knobs
//! under `[engine]`.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};

use crate::types::IndexDescriptor;

/// Smallest writer heap tantivy accepts for a single indexing thread.
pub const MIN_WRITER_MEMORY_BYTES: usize = 15_000_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineSettings {
    /// Directory holding one sub-directory per index.
    pub index_root: String,
    pub writer_memory_bytes: usize,
    /// Maximum characters of hit content kept as a result excerpt.
    pub excerpt_length: usize,
    /// Row column holding a preview image reference, if any.
    pub preview_image_column: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            index_root: "~/.sitesearch/indexes".to_string(),
            writer_memory_bytes: 50_000_000,
            excerpt_length: 200,
            preview_image_column: None,
        }
    }
}

impl EngineSettings {
    /// Directory of one index, resolved against `base` when `index_root` is relative.
    pub fn index_dir(&self, base: &Path, index_name: &str) -> PathBuf {
        resolve_with_base(base, &self.index_root).join(index_name.to_ascii_lowercase())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigDocument {
    engine: EngineSettings,
    indexes: Vec<IndexDescriptor>,
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("SITESEARCH_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        tracing::debug!(env = %env_name, "configuration loaded");
        Ok(config)
    }

    /// Wrap an already assembled figment, validating it for `env_name`.
    pub fn from_figment(figment: Figment, env_name: &str) -> anyhow::Result<Self> {
        let config = Self { figment };
        config.validate_for_env(env_name)?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    fn document(&self) -> anyhow::Result<ConfigDocument> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read configuration: {}", e))
    }

    pub fn engine_settings(&self) -> anyhow::Result<EngineSettings> {
        Ok(self.document()?.engine)
    }

    pub fn index_descriptors(&self) -> anyhow::Result<Vec<IndexDescriptor>> {
        Ok(self.document()?.indexes)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let doc = self.document()?;
        if doc.engine.writer_memory_bytes < MIN_WRITER_MEMORY_BYTES {
            anyhow::bail!(
                "engine.writer_memory_bytes is {}; tantivy needs at least {}",
                doc.engine.writer_memory_bytes,
                MIN_WRITER_MEMORY_BYTES
            );
        }
        let mut seen = HashSet::new();
        for index in &doc.indexes {
            if index.name.trim().is_empty() {
                anyhow::bail!("an index has an empty name");
            }
            if !seen.insert(index.name.to_ascii_lowercase()) {
                anyhow::bail!("index '{}' is declared twice", index.name);
            }
        }
        match env {
            "prod" | "production" => {
                if !expand_path(&doc.engine.index_root).is_absolute() {
                    anyhow::bail!("Prod config needs an absolute engine.index_root, got '{}'", doc.engine.index_root);
                }
            }
            "dev" | "development" => {}
            "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
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
