//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty stderr output
//! - Optional daily-rolling JSON log files

pub mod config;
pub mod logger;

pub use config::{LogConfig, LogFormat};
pub use logger::LoggerImpl;
