//! Configuration loading, root folder resolution, and inference endpoint URLs

use crate::{Error, Result};
use std::path::PathBuf;

/// Default listen port for the triage service
pub const DEFAULT_PORT: u16 = 5740;

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = load_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(root_folder));
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(get_default_root_folder())
}

/// Database file location inside the root folder
pub fn database_path(root_folder: &std::path::Path) -> PathBuf {
    root_folder.join("bta.db")
}

/// Get default configuration file path for the platform
fn load_config_file() -> Result<PathBuf> {
    let config_dir = if cfg!(target_os = "linux") {
        // Try ~/.config/bta/config.toml first, then /etc/bta/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("bta").join("config.toml"));
        let system_config = PathBuf::from("/etc/bta/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    } else {
        dirs::config_dir()
            .map(|d| d.join("bta").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?
    };

    if config_dir.exists() {
        Ok(config_dir)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", config_dir)))
    }
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("bta"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/bta"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("bta"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/bta"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("bta"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\bta"))
    } else {
        PathBuf::from("./bta_data")
    }
}

/// Inference endpoint addressing
///
/// The tumor-prediction function is deployed as a cloud function addressed by
/// project, region, and function name. Development runs against a local
/// emulator; production against the deployed hostname. An explicit URL in
/// `BTA_ANALYSIS_URL` overrides both.
#[derive(Debug, Clone)]
pub struct AnalysisEndpoint {
    pub project_id: String,
    pub region: String,
    pub function_name: String,
}

impl Default for AnalysisEndpoint {
    fn default() -> Self {
        Self {
            project_id: "brain-tumor-system-d402a".to_string(),
            region: "us-central1".to_string(),
            function_name: "predict_tumor".to_string(),
        }
    }
}

impl AnalysisEndpoint {
    /// Local emulator URL for development
    pub fn emulator_url(&self) -> String {
        format!(
            "http://127.0.0.1:5001/{}/{}/{}",
            self.project_id, self.region, self.function_name
        )
    }

    /// Deployed production URL
    pub fn production_url(&self) -> String {
        format!(
            "https://{}-{}.cloudfunctions.net/{}",
            self.region, self.project_id, self.function_name
        )
    }

    /// Resolve the URL for a given deployment mode
    pub fn url(&self, use_emulator: bool) -> String {
        if use_emulator {
            self.emulator_url()
        } else {
            self.production_url()
        }
    }

    /// Resolve the URL from the process environment
    ///
    /// `BTA_ANALYSIS_URL` wins outright; `BTA_USE_EMULATOR=true` forces the
    /// emulator; debug builds default to the emulator.
    pub fn resolve_from_env(&self) -> String {
        if let Ok(url) = std::env::var("BTA_ANALYSIS_URL") {
            if !url.is_empty() {
                return url;
            }
        }
        let use_emulator = match std::env::var("BTA_USE_EMULATOR") {
            Ok(v) => v == "true" || v == "1",
            Err(_) => cfg!(debug_assertions),
        };
        self.url(use_emulator)
    }
}
