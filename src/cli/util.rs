//! CLI Common Utilities
//!
//! Shared initialization and context management for CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, ConfigLoader};
use crate::context::{CancelToken, RunContext};
use crate::events::{EventBus, EventSink, SharedSink, TracingSink};
use crate::executor::ProcessRunner;
use crate::pipeline::Pipeline;
use crate::storage::{Database, SharedDatabase};
use crate::types::{MendError, Result};

use super::progress::ConsoleRenderer;

/// Command execution context
///
/// Created via `CommandContext::load()` once the project is initialized.
#[derive(Clone)]
pub struct CommandContext {
    /// Project root directory
    pub project_root: PathBuf,
    /// Project data directory (.lintmend)
    pub project_dir: PathBuf,
    /// Loaded configuration
    pub config: Config,
    /// Shared database handle
    pub db: SharedDatabase,
}

impl CommandContext {
    /// Validate initialization, load config and open the database
    pub fn load() -> Result<Self> {
        let project_root = std::env::current_dir()?;
        Self::load_in(&project_root)
    }

    pub fn load_in(project_root: &Path) -> Result<Self> {
        let project_dir = require_initialized(project_root)?;
        let config = ConfigLoader::load_for(project_root)?;
        let db = Database::open_project(&project_dir)?;

        Ok(Self {
            project_root: project_root.to_path_buf(),
            project_dir,
            config,
            db: Arc::new(db),
        })
    }

    /// Build a pipeline whose events go to the console (unless `quiet`)
    /// and to tracing. Ctrl-C cancels the run.
    pub fn pipeline(&self, quiet: bool) -> Result<EngineSession> {
        let bus = EventBus::new();
        let renderer = (!quiet).then(|| ConsoleRenderer::new().spawn(bus.subscribe()));

        let events: SharedSink = Arc::new(Fanout {
            bus,
            tracing: TracingSink,
        });
        let cancel = CancelToken::new();
        watch_ctrl_c(cancel.clone());

        let ctx = RunContext::new(&self.project_root, self.config.clone())
            .with_events(events)
            .with_cancel(cancel);
        let pipeline = Pipeline::new(ctx, Arc::new(ProcessRunner), self.db.clone())?;
        Ok(EngineSession { pipeline, renderer })
    }
}

/// A pipeline plus the task rendering its events
pub struct EngineSession {
    pub pipeline: Pipeline,
    renderer: Option<tokio::task::JoinHandle<()>>,
}

impl EngineSession {
    /// Stop rendering. The bus closes with the pipeline, which ends the
    /// renderer once it has drained what was already sent.
    pub async fn finish(self) {
        drop(self.pipeline);
        if let Some(handle) = self.renderer {
            let _ = handle.await;
        }
    }
}

/// Sends every event to the console bus and to tracing
struct Fanout {
    bus: EventBus,
    tracing: TracingSink,
}

impl EventSink for Fanout {
    fn emit(&self, event: crate::events::EngineEvent) {
        self.tracing.emit(event.clone());
        self.bus.emit(event);
    }
}

fn watch_ctrl_c(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling run");
            cancel.cancel();
        }
    });
}

/// Require lintmend to be initialized under `root`
///
/// Returns the .lintmend directory path if initialized,
/// or `MendError::NotInitialized` if not.
pub fn require_initialized(root: &Path) -> Result<PathBuf> {
    if !ConfigLoader::is_project_initialized(root) {
        return Err(MendError::NotInitialized);
    }
    Ok(ConfigLoader::project_dir_in(root))
}

/// Check if lintmend is initialized in the current directory
pub fn is_initialized() -> bool {
    ConfigLoader::is_project_initialized(Path::new("."))
}
