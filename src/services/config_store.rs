// Configuration Storage Service
// Handles config file read/write and version backup

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::providers::{DEFAULT_PROVIDER, DEFAULT_TIMEOUT_SECS};

pub const HUMAN_SCORE_FALLBACK: u8 = 99;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    /// Provider spec in `name[:model]` form.
    #[serde(default = "default_provider")]
    pub provider: String,
    pub proxy: Option<ProxyConfig>,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub composer: ComposerConfig,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            provider: default_provider(),
            proxy: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            composer: ComposerConfig::default(),
            providers: HashMap::new(),
            api_keys: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub enabled: bool,
    pub http: Option<String>,
    pub https: Option<String>,
}

impl ProxyConfig {
    /// Proxy URL to route all requests through, if enabled.
    pub fn active_url(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        self.https
            .clone()
            .or_else(|| self.http.clone())
            .filter(|u| !u.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposerConfig {
    /// Score shown when the service omits or garbles `humanScore`.
    #[serde(default = "default_human_score_fallback")]
    pub human_score_fallback: u8,
    /// Alternate writing policy JSON; the built-in one is used when unset.
    pub policy_path: Option<String>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            human_score_fallback: HUMAN_SCORE_FALLBACK,
            policy_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub base_url: Option<String>,
}

fn default_version() -> String { env!("CARGO_PKG_VERSION").to_string() }
fn default_provider() -> String { DEFAULT_PROVIDER.to_string() }
fn default_timeout() -> u64 { DEFAULT_TIMEOUT_SECS }
fn default_human_score_fallback() -> u8 { HUMAN_SCORE_FALLBACK }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        match std::env::var("SKRIVPARTNER_CONFIG_DIR") {
            Ok(p) if !p.trim().is_empty() => Some(PathBuf::from(p)),
            _ => dirs::config_dir().map(|p| p.join("skrivpartner")),
        }
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<(), String> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)
            .map_err(|e| format!("Failed to create backup dir: {}", e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%.3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| format!("Failed to create backup: {}", e))?;

        self.cleanup_old_backups(&backup_dir, 10)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), String> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| format!("Failed to read backup dir: {}", e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Oldest first; file names carry the timestamp
        entries.sort_by_key(|e| e.file_name());

        let remove_count = entries.len() - keep;
        for entry in entries.iter().take(remove_count) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    /// Get provider API key from config file
    pub fn get_api_key(&self, provider: &str) -> Result<Option<String>, String> {
        let config = self.load()?;
        Ok(config.api_keys.get(provider).cloned())
    }

    /// Store provider API key in config file
    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.trim().to_string());
        self.save(&config)
    }

    /// Delete provider API key from config file
    pub fn delete_api_key(&self, provider: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.api_keys.remove(provider);
        self.save(&config)
    }

    /// Get provider base URL from config file
    pub fn get_provider_url(&self, provider: &str) -> Result<Option<String>, String> {
        let config = self.load()?;
        Ok(config.providers.get(provider).and_then(|p| p.base_url.clone()))
    }

    /// Set provider base URL in config file
    pub fn set_provider_url(&self, provider: &str, url: &str) -> Result<(), String> {
        let mut config = self.load()?;
        let provider_config = config.providers.entry(provider.to_string()).or_default();
        provider_config.base_url = Some(url.to_string());
        self.save(&config)
    }

    /// Set the default provider spec (`name[:model]`)
    pub fn set_provider(&self, spec: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.provider = spec.trim().to_string();
        self.save(&config)
    }
}

/// Show only the last four characters of a secret.
pub fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}
