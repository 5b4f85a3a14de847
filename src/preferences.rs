// src/preferences.rs
//! The one persisted preference: the dark-mode flag.
//!
//! Stored in a small JSON object file under [`DARK_MODE_KEY`]; other keys in
//! the file are left alone.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const DARK_MODE_KEY: &str = "darkMode";

#[derive(Debug, Clone)]
pub struct Preferences {
    path: PathBuf,
    dark_mode: bool,
}

impl Preferences {
    /// Read the flag from `path`. A missing or unreadable file means `false`.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let dark_mode = match read_object(&path) {
            Ok(obj) => obj.get(DARK_MODE_KEY).is_some_and(flag_value),
            Err(e) => {
                if path.exists() {
                    tracing::warn!(error = ?e, path = %path.display(), "ignoring unreadable preferences");
                }
                false
            }
        };
        Self { path, dark_mode }
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set and persist the flag.
    pub fn set_dark_mode(&mut self, on: bool) -> Result<()> {
        let mut obj = read_object(&self.path).unwrap_or_default();
        obj.insert(DARK_MODE_KEY.to_string(), Value::Bool(on));
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating preferences dir {}", dir.display()))?;
        }
        let body = serde_json::to_string_pretty(&Value::Object(obj))?;
        fs::write(&self.path, body)
            .with_context(|| format!("writing preferences to {}", self.path.display()))?;
        self.dark_mode = on;
        Ok(())
    }

    /// Flip and persist; returns the new value.
    pub fn toggle_dark_mode(&mut self) -> Result<bool> {
        let next = !self.dark_mode;
        self.set_dark_mode(next)?;
        Ok(next)
    }
}

fn read_object(path: &Path) -> Result<Map<String, Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading preferences from {}", path.display()))?;
    match serde_json::from_str::<Value>(&content)? {
        Value::Object(obj) => Ok(obj),
        _ => anyhow::bail!("preferences file is not a JSON object"),
    }
}

// Browser storage kept the flag as the string "true"; accept both shapes.
fn flag_value(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        _ => false,
    }
}
