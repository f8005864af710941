//! Run-scoped context
//!
//! Everything a run shares (configuration, workspace paths, event sink,
//! cancellation, runtime adjustments made by auto-response) travels in one
//! explicit object instead of process-wide state.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tokio::sync::watch;

use crate::config::Config;
use crate::constants::{alerting, paths};
use crate::events::{NullSink, SharedSink};

/// Cooperative cancellation shared by every clone
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.receiver.clone();
        // The sender lives as long as any token clone, so this only ends on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Settings changed at runtime by auto-response actions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeAdjustments {
    pub caching_enabled: bool,
    pub batch_size_override: Option<usize>,
    pub skip_non_critical: bool,
    pub emergency_stop: Option<String>,
}

#[derive(Clone)]
pub struct RunContext {
    root: PathBuf,
    config: Arc<Config>,
    events: SharedSink,
    cancel: CancelToken,
    adjustments: Arc<RwLock<RuntimeAdjustments>>,
}

impl RunContext {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            root: root.into(),
            config: Arc::new(config),
            events: Arc::new(NullSink),
            cancel: CancelToken::new(),
            adjustments: Arc::new(RwLock::new(RuntimeAdjustments::default())),
        }
    }

    pub fn with_events(mut self, events: SharedSink) -> Self {
        self.events = events;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn events(&self) -> &SharedSink {
        &self.events
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn project_dir(&self) -> PathBuf {
        self.root.join(paths::PROJECT_DIR)
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.project_dir().join(paths::SNAPSHOT_DIR)
    }

    pub fn report_dir(&self) -> PathBuf {
        self.project_dir().join(paths::REPORT_DIR)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.project_dir().join(paths::RUN_LOCK)
    }

    pub fn adjustments(&self) -> RuntimeAdjustments {
        self.adjustments
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Apply a change to the runtime adjustments; returns whether anything changed
    pub fn adjust<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut RuntimeAdjustments),
    {
        let mut guard = self
            .adjustments
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = guard.clone();
        f(&mut guard);
        *guard != before
    }

    /// Batch size after any auto-response reduction
    pub fn effective_batch_size(&self) -> usize {
        let configured = self.config.execution.batch_size;
        self.adjustments()
            .batch_size_override
            .map(|b| b.min(configured))
            .unwrap_or(configured)
            .max(alerting::MIN_BATCH_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_token() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        let waiter = tokio::spawn(async move { clone.cancelled().await });
        tokio::time::sleep(Duration::from_millis(5)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_adjust_reports_change() {
        let ctx = RunContext::new("/tmp/ws", Config::default());
        assert!(ctx.adjust(|a| a.caching_enabled = true));
        assert!(!ctx.adjust(|a| a.caching_enabled = true));
        assert!(ctx.adjustments().caching_enabled);
    }

    #[test]
    fn test_effective_batch_size() {
        let ctx = RunContext::new("/tmp/ws", Config::default());
        assert_eq!(ctx.effective_batch_size(), 10);
        ctx.adjust(|a| a.batch_size_override = Some(5));
        assert_eq!(ctx.effective_batch_size(), 5);
        ctx.adjust(|a| a.batch_size_override = Some(0));
        assert_eq!(ctx.effective_batch_size(), 1);
    }

    #[test]
    fn test_paths() {
        let ctx = RunContext::new("/tmp/ws", Config::default());
        assert_eq!(ctx.snapshot_dir(), PathBuf::from("/tmp/ws/.lintmend/snapshots"));
        assert_eq!(ctx.lock_path(), PathBuf::from("/tmp/ws/.lintmend/run.lock"));
    }
}
