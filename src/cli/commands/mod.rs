pub mod alerts;
pub mod analyze;
pub mod config;
pub mod fix;
pub mod gate;
pub mod init;
pub mod report;
pub mod status;
