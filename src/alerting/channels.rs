//! Alert delivery channels
//!
//! Each channel filters by its own severity allow-list. Delivery failures
//! are reported to the controller, which logs them and moves on.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use console::style;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::config::{AlertingConfig, ChannelConfig, ChannelKind};
use crate::constants::{network, paths};
use crate::events::{EngineEvent, MessageLevel, SharedSink};
use crate::types::{Alert, AlertSeverity, MendError, Result};

#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &str;

    fn accepts(&self, severity: AlertSeverity) -> bool;

    async fn send(&self, alert: &Alert) -> Result<()>;
}

pub type BoxedChannel = Box<dyn AlertChannel>;

/// Build the enabled channels from configuration
pub fn build_channels(
    config: &AlertingConfig,
    project_dir: PathBuf,
    events: SharedSink,
) -> Result<Vec<BoxedChannel>> {
    let mut channels: Vec<BoxedChannel> = Vec::new();
    for channel in config.channels.iter().filter(|c| c.enabled) {
        let built: BoxedChannel = match channel.kind {
            ChannelKind::Console => Box::new(ConsoleChannel::new(channel.severities.clone())),
            ChannelKind::File => Box::new(FileChannel::new(
                channel
                    .path
                    .clone()
                    .unwrap_or_else(|| project_dir.join(paths::ALERT_LOG)),
                channel.severities.clone(),
            )),
            ChannelKind::Notification => Box::new(NotificationChannel::new(
                events.clone(),
                channel.severities.clone(),
            )),
            ChannelKind::Webhook => Box::new(WebhookChannel::from_config(channel)?),
        };
        channels.push(built);
    }
    Ok(channels)
}

// =============================================================================
// Console
// =============================================================================

pub struct ConsoleChannel {
    severities: Vec<AlertSeverity>,
}

impl ConsoleChannel {
    pub fn new(severities: Vec<AlertSeverity>) -> Self {
        Self { severities }
    }
}

#[async_trait]
impl AlertChannel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    fn accepts(&self, severity: AlertSeverity) -> bool {
        self.severities.contains(&severity)
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        let tag = match alert.severity {
            AlertSeverity::Critical => style("CRITICAL").red().bold(),
            AlertSeverity::Error => style("ERROR").red(),
            AlertSeverity::Warning => style("WARNING").yellow(),
            AlertSeverity::Info => style("INFO").blue(),
        };
        eprintln!(
            "{} {}: {} ({:.1} vs {:.1})",
            tag, alert.metric, alert.message, alert.current_value, alert.threshold
        );
        Ok(())
    }
}

// =============================================================================
// File (JSON lines)
// =============================================================================

pub struct FileChannel {
    path: PathBuf,
    severities: Vec<AlertSeverity>,
}

impl FileChannel {
    pub fn new(path: PathBuf, severities: Vec<AlertSeverity>) -> Self {
        Self { path, severities }
    }
}

#[async_trait]
impl AlertChannel for FileChannel {
    fn name(&self) -> &str {
        "file"
    }

    fn accepts(&self, severity: AlertSeverity) -> bool {
        self.severities.contains(&severity)
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        let line = serde_json::to_string(alert)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

// =============================================================================
// Structured notification (event stream)
// =============================================================================

pub struct NotificationChannel {
    events: SharedSink,
    severities: Vec<AlertSeverity>,
}

impl NotificationChannel {
    pub fn new(events: SharedSink, severities: Vec<AlertSeverity>) -> Self {
        Self { events, severities }
    }
}

#[async_trait]
impl AlertChannel for NotificationChannel {
    fn name(&self) -> &str {
        "notification"
    }

    fn accepts(&self, severity: AlertSeverity) -> bool {
        self.severities.contains(&severity)
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        let level = match alert.severity {
            AlertSeverity::Critical | AlertSeverity::Error => MessageLevel::Error,
            AlertSeverity::Warning => MessageLevel::Warning,
            AlertSeverity::Info => MessageLevel::Info,
        };
        self.events.emit(EngineEvent::Message {
            level,
            message: alert.to_string(),
        });
        Ok(())
    }
}

// =============================================================================
// Webhook
// =============================================================================

pub struct WebhookChannel {
    url: String,
    token: Option<SecretString>,
    severities: Vec<AlertSeverity>,
    client: reqwest::Client,
}

impl std::fmt::Debug for WebhookChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookChannel")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl WebhookChannel {
    pub fn from_config(config: &ChannelConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| MendError::config("Webhook channel requires a url"))?;

        let token = match &config.token_env {
            Some(var) => match std::env::var(var) {
                Ok(value) => Some(SecretString::from(value)),
                Err(_) => {
                    warn!("Webhook token variable {} is not set, sending without auth", var);
                    None
                }
            },
            None => None,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network::WEBHOOK_TIMEOUT_SECS))
            .build()
            .map_err(|e| MendError::Channel {
                channel: "webhook".to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            url,
            token,
            severities: config.severities.clone(),
            client,
        })
    }

    async fn post(&self, alert: &Alert) -> Result<()> {
        let mut request = self.client.post(&self.url).json(alert);
        if let Some(token) = &self.token {
            request = request.header(
                "Authorization",
                format!("Bearer {}", token.expose_secret()),
            );
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(MendError::Channel {
            channel: "webhook".to_string(),
            message: format!("{} responded {}: {}", self.url, status, body),
        })
    }
}

/// Network errors and 5xx responses are worth another attempt
fn is_retryable(err: &MendError) -> bool {
    match err {
        MendError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        MendError::Channel { message, .. } => message.contains(" responded 5"),
        _ => false,
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    fn accepts(&self, severity: AlertSeverity) -> bool {
        self.severities.contains(&severity)
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(network::RETRY_BASE_DELAY_MS))
            .with_max_times(network::MAX_WEBHOOK_RETRIES);

        (|| self.post(alert))
            .retry(backoff)
            .when(is_retryable)
            .notify(|err, delay| debug!("Retrying webhook in {:?}: {}", delay, err))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::types::AlertRule;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn alert(severity: AlertSeverity) -> Alert {
        Alert::from_rule(
            &AlertRule {
                metric: "errors".into(),
                threshold: 10.0,
                direction: Default::default(),
                severity,
                message: "too many errors".into(),
            },
            12.0,
        )
    }

    #[tokio::test]
    async fn test_file_channel_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("alerts.log");
        let channel = FileChannel::new(path.clone(), vec![AlertSeverity::Warning]);

        channel.send(&alert(AlertSeverity::Warning)).await.unwrap();
        channel.send(&alert(AlertSeverity::Warning)).await.unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: Alert = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.metric, "errors");
    }

    #[tokio::test]
    async fn test_notification_emits_event() {
        let sink = Arc::new(RecordingSink::new());
        let channel = NotificationChannel::new(sink.clone(), vec![AlertSeverity::Error]);
        assert!(channel.accepts(AlertSeverity::Error));
        assert!(!channel.accepts(AlertSeverity::Info));

        channel.send(&alert(AlertSeverity::Error)).await.unwrap();
        assert_eq!(
            sink.count_where(|e| matches!(
                e,
                EngineEvent::Message {
                    level: MessageLevel::Error,
                    ..
                }
            )),
            1
        );
    }

    #[test]
    fn test_build_channels_skips_disabled() {
        let dir = TempDir::new().unwrap();
        let mut config = AlertingConfig::default();
        config.channels[0].enabled = false;
        let channels =
            build_channels(&config, dir.path().to_path_buf(), Arc::new(crate::events::NullSink))
                .unwrap();
        let names: Vec<_> = channels.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["file", "notification"]);
    }

    #[test]
    fn test_webhook_requires_url() {
        let config = ChannelConfig::new(ChannelKind::Webhook);
        assert!(matches!(
            WebhookChannel::from_config(&config),
            Err(MendError::Config(_))
        ));
    }

    #[test]
    fn test_retryable_errors() {
        let server_error = MendError::Channel {
            channel: "webhook".into(),
            message: "http://x responded 503 Service Unavailable: busy".into(),
        };
        let client_error = MendError::Channel {
            channel: "webhook".into(),
            message: "http://x responded 400 Bad Request: nope".into(),
        };
        assert!(is_retryable(&server_error));
        assert!(!is_retryable(&client_error));
    }
}
