use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Knobs for a single transpile run
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranspileOptions {
    /// Name used in the emitted `package` clause
    pub package_name: String,
    /// Drop top-level declarations that come from system headers or builtins
    pub skip_system_headers: bool,
    /// Path prefixes treated as system header locations
    pub system_header_prefixes: Vec<String>,
}

impl TranspileOptions {
    pub fn new() -> Self {
        Self {
            package_name: "main".to_string(),
            skip_system_headers: true,
            system_header_prefixes: [
                "/usr/include",
                "/usr/lib",
                "/usr/local/include",
                "/Library/Developer",
                "/Applications/Xcode",
                "/opt/homebrew/include",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
        }
    }

    pub fn with_package(mut self, name: impl Into<String>) -> Self {
        self.package_name = name.into();
        self
    }

    pub fn keep_system_headers(mut self) -> Self {
        self.skip_system_headers = false;
        self
    }

    /// Load options from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn is_system_path(&self, file: &str) -> bool {
        self.system_header_prefixes
            .iter()
            .any(|prefix| file.starts_with(prefix.as_str()))
    }
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self::new()
    }
}
