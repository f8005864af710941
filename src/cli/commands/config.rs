//! Config Command
//!
//! Manage lintmend configuration.
//!
//! Usage:
//!   lintmend config show [-g] [-f json|yaml|toml]
//!   lintmend config path
//!   lintmend config edit [-g]
//!   lintmend config init [-g] [--force]

use crate::config::ConfigLoader;
use crate::types::Result;

/// Show configuration
pub fn show(global: bool, format: &str) -> Result<()> {
    if !global {
        // Merged effective config
        return ConfigLoader::show_config(format);
    }

    let Some(global_path) = ConfigLoader::global_config_path() else {
        println!("Cannot determine global config directory.");
        return Ok(());
    };
    if global_path.exists() {
        let content = std::fs::read_to_string(&global_path)?;
        if format == "toml" {
            println!("{}", content);
        } else {
            println!("# Global Config: {}\n", global_path.display());
            println!("{}", content);
        }
    } else {
        println!("No global config found.");
        println!("Run 'lintmend config init --global' to create one.");
    }
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Edit configuration file
pub fn edit(global: bool) -> Result<()> {
    ConfigLoader::edit_config(global)
}

/// Initialize global configuration
pub fn init_global(force: bool) -> Result<()> {
    let dir = ConfigLoader::init_global(force)?;
    println!("✓ Initialized global configuration");
    println!("  Directory: {}", dir.display());
    if let Some(config_path) = ConfigLoader::global_config_path() {
        println!("  Config:    {}", config_path.display());
    }
    Ok(())
}

/// Initialize project configuration
pub fn init_project() -> Result<()> {
    let root = std::env::current_dir()?;
    let project_name = root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("project");

    let dir = ConfigLoader::init_project(&root, Some(project_name))?;
    println!("✓ Initialized project configuration");
    println!("  Directory: {}", dir.display());
    println!(
        "  Config:    {}",
        ConfigLoader::project_config_path_in(&root).display()
    );
    Ok(())
}
