//! Load config from layered JSON files: `default.json`, then host, then profile.

use crate::config::types::AppConfig;
use crate::error::ConfigError;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Which optional layers to apply on top of `default.json`.
#[derive(Clone, Debug, Default)]
pub struct ConfigLayers {
    pub host: Option<String>,
    pub profile: Option<String>,
}

impl ConfigLayers {
    /// Layers from `HOSTNAME` and `APP_PROFILE`.
    pub fn from_env() -> Self {
        ConfigLayers {
            host: std::env::var("HOSTNAME").ok().filter(|s| !s.is_empty()),
            profile: std::env::var("APP_PROFILE").ok().filter(|s| !s.is_empty()),
        }
    }

    fn files(&self, dir: &Path) -> Vec<(PathBuf, bool)> {
        let mut out = vec![(dir.join("default.json"), true)];
        if let Some(host) = &self.host {
            out.push((dir.join(format!("{}.json", host)), false));
        }
        if let Some(profile) = &self.profile {
            out.push((dir.join(format!("{}.json", profile)), false));
        }
        out
    }
}

/// Read and merge the layers in `dir`, then apply `DATABASE_URL` if set.
pub fn load_from_dir(dir: &Path, layers: &ConfigLayers) -> Result<AppConfig, ConfigError> {
    let mut merged = Value::Object(Default::default());
    for (path, mandatory) in layers.files(dir) {
        if !path.exists() {
            if mandatory {
                return Err(ConfigError::Load(format!("missing config file {}", path.display())));
            }
            continue;
        }
        tracing::debug!(path = %path.display(), "loading config layer");
        let text = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        let layer: Value = serde_json::from_str(&text)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        merge_values(&mut merged, layer);
    }
    let mut config: AppConfig =
        serde_json::from_value(merged).map_err(|e| ConfigError::Load(e.to_string()))?;
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = Some(url);
    }
    Ok(config)
}

/// Read `.env`, then load from `APP_CONFIG_DIR` (default `config`) with layers from the environment.
pub fn load_from_env() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    let dir = std::env::var("APP_CONFIG_DIR").unwrap_or_else(|_| "config".into());
    load_from_dir(Path::new(&dir), &ConfigLayers::from_env())
}

/// Parse a single JSON document (no layering).
pub fn load_from_str(text: &str) -> Result<AppConfig, ConfigError> {
    serde_json::from_str(text).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Deep-merge objects; anything else in `overlay` replaces `base`.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (k, v) in overlay_map {
                match base_map.get_mut(&k) {
                    Some(existing) => merge_values(existing, v),
                    None => {
                        base_map.insert(k, v);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
