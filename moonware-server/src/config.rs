//! Server configuration
//!
//! Loaded from `moonware.toml` when present. Every field has a default, so an
//! empty file (or no file) gives a working single-slot server on port 3000.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default config file name looked up by the CLI
pub const CONFIG_FILE_NAME: &str = "moonware.toml";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Number of scripts that may be stored at once
    pub max_scripts: usize,
    /// Maximum request body size in bytes
    pub body_limit: usize,
    /// Directory served for unmatched paths (the web front-end)
    pub static_dir: PathBuf,
    /// Base URL used in generated loadstrings instead of the request's Host
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_scripts: 1,
            body_limit: 50 * 1024 * 1024,
            static_dir: PathBuf::from("public"),
            public_url: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_config_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Apply the `PORT` environment variable, if set and valid
    pub fn with_env_overrides(self) -> Self {
        self.with_port_override(std::env::var("PORT").ok().as_deref())
    }

    fn with_port_override(mut self, port: Option<&str>) -> Self {
        if let Some(raw) = port {
            match raw.trim().parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", raw),
            }
        }
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL for loadstrings: `public_url`, else the request Host, else
    /// the bind address.
    pub fn base_url(&self, host_header: Option<&str>) -> String {
        if let Some(url) = &self.public_url {
            return url.trim_end_matches('/').to_string();
        }
        match host_header {
            Some(host) => format!("http://{}", host),
            None => format!("http://{}", self.addr()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_scripts, 1);
        assert_eq!(config.body_limit, 52_428_800);
        assert_eq!(config.addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 8080\nmax_scripts = 5").unwrap();
        let config = ServerConfig::from_config_file(file.path()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_scripts, 5);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.static_dir, PathBuf::from("public"));
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        let err = ServerConfig::from_config_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_port_override() {
        let config = ServerConfig::default().with_port_override(Some("4321"));
        assert_eq!(config.port, 4321);
        let config = ServerConfig::default().with_port_override(Some("nope"));
        assert_eq!(config.port, 3000);
        let config = ServerConfig::default().with_port_override(None);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_base_url() {
        let mut config = ServerConfig::default();
        assert_eq!(config.base_url(Some("example.com:3000")), "http://example.com:3000");
        assert_eq!(config.base_url(None), "http://0.0.0.0:3000");

        config.public_url = Some("https://scripts.example.com/".to_string());
        assert_eq!(config.base_url(Some("ignored")), "https://scripts.example.com");
    }
}
