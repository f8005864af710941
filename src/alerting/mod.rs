//! Alerting & Auto-Response Controller
//!
//! - [`controller`]: threshold rules, suppression, cooldown, dispatch
//! - [`channels`]: console, JSON-lines file, event notification, webhook
//! - [`auto_response`]: triggers mapped to runtime adjustments

pub mod auto_response;
pub mod channels;
pub mod controller;

pub use auto_response::{AutoResponder, Trigger};
pub use channels::{AlertChannel, BoxedChannel, build_channels};
pub use controller::{AlertController, Dispatch, REGRESSION_METRIC};
