use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use claudix_core::write_text_atomic;

const SELECTED_MODEL_KEY: &str = "selectedModel";

/// Host configuration values that survive restarts. The concrete settings
/// surface (editor settings, files on disk) lives behind this trait.
pub trait ConfigStore: Send + Sync {
    fn selected_model(&self) -> Option<String>;
    fn set_selected_model(&self, model: &str) -> Result<()>;
}

/// File-backed config store: one flat JSON object, written atomically so a
/// crash mid-update never leaves a torn file.
#[derive(Debug)]
pub struct JsonFileConfigStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonFileConfigStore {
    /// Loads the store; a missing file is an empty configuration.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str::<Value>(&raw)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
                .as_object()
                .cloned()
                .with_context(|| {
                    format!("config file {} must contain a JSON object", path.display())
                })?
        } else {
            Map::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &Map<String, Value>) -> Result<()> {
        let rendered = serde_json::to_string_pretty(&Value::Object(values.clone()))
            .context("failed to encode config values")?;
        write_text_atomic(&self.path, &rendered)
    }
}

impl ConfigStore for JsonFileConfigStore {
    fn selected_model(&self) -> Option<String> {
        self.values
            .lock()
            .expect("config store lock poisoned")
            .get(SELECTED_MODEL_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn set_selected_model(&self, model: &str) -> Result<()> {
        let mut values = self.values.lock().expect("config store lock poisoned");
        values.insert(SELECTED_MODEL_KEY.to_string(), Value::String(model.into()));
        self.persist(&values)
    }
}
