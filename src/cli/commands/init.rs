//! Init Command
//!
//! Initialize lintmend in the current directory.

use std::path::Path;

use crate::config::ConfigLoader;
use crate::constants::paths;
use crate::storage::Database;
use crate::types::{MendError, Result};

pub fn run(force: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let project_name = init_in(&root, force)?;

    // Initialize global config if not exists (don't force overwrite)
    if let Err(e) = ConfigLoader::init_global(false) {
        tracing::debug!("Global config init skipped: {}", e);
    }

    println!("✓ Initialized lintmend in {}/", paths::PROJECT_DIR);
    println!("  Project: {}", project_name);
    println!();
    println!("Next steps:");
    println!(
        "  1. Review the commands in {}/{}",
        paths::PROJECT_DIR,
        paths::CONFIG_FILE
    );
    println!("  2. Run 'lintmend analyze' to record a baseline");
    println!("  3. Run 'lintmend fix --dry-run' to preview fixes");

    Ok(())
}

/// Create the project directory, config and database under `root`.
/// Returns the project name.
pub fn init_in(root: &Path, force: bool) -> Result<String> {
    if ConfigLoader::is_project_initialized(root) && !force {
        return Err(MendError::Config(
            "Already initialized. Use --force to overwrite.".to_string(),
        ));
    }

    // Get project name from directory
    let project_name = root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("project")
        .to_string();

    let project_dir = ConfigLoader::init_project(root, Some(&project_name))?;

    Database::open_project(&project_dir)?;
    Ok(project_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_twice_requires_force() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("astro-app");
        std::fs::create_dir_all(&root).unwrap();

        assert_eq!(init_in(&root, false).unwrap(), "astro-app");
        assert!(root.join(".lintmend/lintmend.db").exists());
        assert!(matches!(init_in(&root, false), Err(MendError::Config(_))));
        assert!(init_in(&root, true).is_ok());
    }
}
