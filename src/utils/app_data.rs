use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "doxfind";
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `docs_path`
pub const DOCS_ENV_VAR: &str = "DOXFIND_DOCS";

/// Application configuration stored in the app config directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default location of the documentation (docs root, html dir or search dir)
    #[serde(default)]
    pub docs_path: Option<PathBuf>,

    /// Maximum results for one-shot lookups (0 = unlimited)
    #[serde(default)]
    pub limit: usize,

    /// Treat plain terms as key prefixes, as Doxygen's own search box does
    #[serde(default)]
    pub prefix_match: bool,

    /// Aggregate records that share a key across shards
    #[serde(default)]
    pub merge_duplicates: bool,

    /// Fail on unreadable shards instead of skipping them
    #[serde(default)]
    pub strict: bool,

    /// Sections to load (empty = all)
    #[serde(default)]
    pub sections: Vec<String>,

    /// Command used to open documentation pages
    /// If None, uses $BROWSER or the platform opener
    #[serde(default)]
    pub browser: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            docs_path: None,
            limit: 0,
            prefix_match: false,
            merge_duplicates: false,
            strict: false,
            sections: Vec::new(),
            browser: None,
        }
    }
}

impl AppConfig {
    /// Load config from the app config directory, or return default if not found
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load config from a specific file, or return default if it does not exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)
                .context("Failed to read config file")?;
            let config: AppConfig = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the app config directory
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(config_path, content)
            .context("Failed to write config file")?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Some(path) = std::env::var_os(DOCS_ENV_VAR).filter(|v| !v.is_empty()) {
            self.docs_path = Some(PathBuf::from(path));
        }
    }

    /// The documentation path to use when none is given on the command line
    pub fn effective_docs_path(&self) -> PathBuf {
        self.docs_path.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Browser command: config, then $BROWSER, then the platform opener
    pub fn effective_browser(&self) -> String {
        if let Some(ref browser) = self.browser {
            return browser.clone();
        }
        if let Ok(browser) = std::env::var("BROWSER")
            && !browser.is_empty()
        {
            return browser;
        }
        default_opener().to_string()
    }
}

fn default_opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_config_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application config directory
pub fn get_app_config_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support"))
    } else {
        // Linux/Unix: XDG_CONFIG_HOME or ~/.config; Windows: %APPDATA%
        dirs::config_dir()
    };

    let base = base.context("Could not determine app config directory")?;
    Ok(base.join(APP_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.limit, 0);
        assert!(!config.prefix_match);
        assert!(!config.strict);
        assert!(config.sections.is_empty());
        assert_eq!(config.effective_docs_path(), PathBuf::from("."));
    }

    #[test]
    fn test_app_config_serialization() {
        let config = AppConfig {
            docs_path: Some(PathBuf::from("/docs")),
            limit: 20,
            prefix_match: true,
            merge_duplicates: true,
            strict: false,
            sections: vec!["functions".to_string()],
            browser: Some("firefox".to_string()),
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_app_config_partial_json() {
        // Should use defaults for missing fields
        let json = r#"{"limit": 5}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.limit, 5);
        assert!(!config.merge_duplicates);
        assert!(config.docs_path.is_none());
    }

    #[test]
    fn test_app_config_empty_json() {
        // Empty object should use all defaults
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig::load_from(&temp.path().join("config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_and_load_roundtrip_on_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.json");
        let config = AppConfig {
            limit: 3,
            ..AppConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_invalid_json_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_configured_browser_wins() {
        let config = AppConfig {
            browser: Some("lynx".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.effective_browser(), "lynx");
    }
}
