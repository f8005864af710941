//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/lintmend/config.toml)
//! 3. Project config (.lintmend/config.toml)
//! 4. Environment variables (LINTMEND_* prefix, `__` between sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use super::types::Config;
use crate::constants::paths;
use crate::types::{MendError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the current directory:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_for(Path::new("."))
    }

    /// Load configuration for the workspace at `root`
    pub fn load_for(root: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path_in(root);
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // e.g. LINTMEND_EXECUTION__BATCH_SIZE -> execution.batch_size
        figment = figment.merge(Env::prefixed(paths::ENV_PREFIX).split("__"));

        let config: Config = figment
            .extract()
            .map_err(|e| MendError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| MendError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/lintmend/)
    pub fn global_dir() -> Option<PathBuf> {
        if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg).join("lintmend"));
        }
        directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("lintmend"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join(paths::CONFIG_FILE))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_config_path_in(Path::new("."))
    }

    pub fn project_config_path_in(root: &Path) -> PathBuf {
        Self::project_dir_in(root).join(paths::CONFIG_FILE)
    }

    /// Get project data directory
    pub fn project_dir_in(root: &Path) -> PathBuf {
        root.join(paths::PROJECT_DIR)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());

        let db = Self::project_dir_in(Path::new(".")).join(paths::DATABASE_FILE);
        let exists = if db.exists() { "✓" } else { "✗" };
        println!("  Data:    {} {}", exists, db.display());
    }

    /// Show current effective configuration as `json`, `yaml` or TOML
    pub fn show_config(format: &str) -> Result<()> {
        let config = Self::load()?;
        println!("{}", Self::render(&config, format)?);
        Ok(())
    }

    /// Serialize a configuration in the requested format (TOML by default)
    pub fn render(config: &Config, format: &str) -> Result<String> {
        Ok(match format {
            "json" => serde_json::to_string_pretty(config)?,
            "yaml" => serde_yaml::to_string(config)?,
            _ => toml::to_string_pretty(config).map_err(|e| MendError::Config(e.to_string()))?,
        })
    }

    /// Edit config file with default editor
    pub fn edit_config(global: bool) -> Result<()> {
        let path = if global {
            Self::global_config_path().ok_or_else(|| {
                MendError::Config("Cannot determine global config path".to_string())
            })?
        } else {
            Self::project_config_path()
        };

        if !path.exists() {
            println!("Config file does not exist: {}", path.display());
            println!(
                "Run: lintmend config init {}",
                if global { "--global" } else { "" }
            );
            return Ok(());
        }

        let editor = env::var("EDITOR").unwrap_or_else(|_| {
            if cfg!(target_os = "windows") {
                "notepad".to_string()
            } else {
                "vi".to_string()
            }
        });

        let status = Command::new(&editor).arg(&path).status().map_err(|e| {
            MendError::Config(format!("Failed to launch editor {}: {}", editor, e))
        })?;

        if !status.success() {
            return Err(MendError::Config("Editor exited with error".to_string()));
        }

        println!("Config saved: {}", path.display());
        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            MendError::Config("Cannot determine global config directory".to_string())
        })?;

        fs::create_dir_all(&global_dir)?;

        let config_path = global_dir.join(paths::CONFIG_FILE);
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_global_config())?;
            info!("Created global config: {}", config_path.display());
        } else {
            info!("Global config exists: {}", config_path.display());
        }

        Ok(global_dir)
    }

    /// Initialize project data directory and configuration under `root`
    pub fn init_project(root: &Path, name: Option<&str>) -> Result<PathBuf> {
        let project_dir = Self::project_dir_in(root);

        fs::create_dir_all(&project_dir)?;
        fs::create_dir_all(project_dir.join(paths::SNAPSHOT_DIR))?;
        fs::create_dir_all(project_dir.join(paths::REPORT_DIR))?;

        let config_path = project_dir.join(paths::CONFIG_FILE);
        if !config_path.exists() {
            fs::write(&config_path, Self::default_project_config(name))?;
            info!("Created project config: {}", config_path.display());
        }

        Ok(project_dir)
    }

    /// Check if project is initialized
    pub fn is_project_initialized(root: &Path) -> bool {
        Self::project_dir_in(root).exists()
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Generate default global config content (TOML)
    fn default_global_config() -> String {
        r#"# lintmend global configuration
# User-wide defaults. Project settings in .lintmend/config.toml override these.

version = "1.0"

[alerting]
cooldown_minutes = 15

[metrics]
history_capacity = 200
"#
        .to_string()
    }

    /// Generate default project config content (TOML)
    fn default_project_config(name: Option<&str>) -> String {
        let project_name = name.unwrap_or("project");
        format!(
            r#"# lintmend project configuration
# Project-specific settings that override global defaults.

version = "1.0"

[project]
name = "{}"
exclude = ["node_modules/**", "dist/**", ".next/**", "build/**"]

[commands]
build = "yarn build"
type_check = "yarn tsc --noEmit"
analyze = "yarn lint --format json"
analyze_format = "eslint-json"

[execution]
batch_size = 10
validate_after_each_batch = true
create_backups = true

[safety]
rollback_enabled = true
max_failures_before_stop = 3
require_manual_approval = false
preserve_paths = ["**/*.d.ts", "**/generated/**"]
"#,
            project_name
        )
    }
}
