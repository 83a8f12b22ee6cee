//! Command-line interface
//!
//! - `types`: clap command structures
//! - `commands`: one module per subcommand
//! - `output`: human and JSON rendering
//! - `signals`: process termination signals

pub mod commands;
pub mod output;
pub mod signals;
pub mod types;

pub use types::{Cli, Commands};

use crate::domain::LeaseError;
use crate::infrastructure::config::ConfigError;

/// Exit status for a clean stop
pub const EXIT_OK: i32 = 0;
/// Exit status for a fetch or renewal failure
pub const EXIT_FAILURE: i32 = 1;
/// Exit status for invalid configuration or arguments
pub const EXIT_CONFIG: i32 = 2;
/// Exit status when the lease reached the end of its validity window
pub const EXIT_EXHAUSTED: i32 = 3;
/// Exit status when a termination signal arrived before the lease was issued
pub const EXIT_INTERRUPTED: i32 = 130;

/// Map an error to the process exit status
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() || err.downcast_ref::<figment::Error>().is_some()
    {
        return EXIT_CONFIG;
    }

    match err.downcast_ref::<LeaseError>() {
        Some(LeaseError::Configuration(_)) => EXIT_CONFIG,
        Some(LeaseError::LeaseExhausted(_)) => EXIT_EXHAUSTED,
        Some(LeaseError::CancellationRequested) => EXIT_INTERRUPTED,
        _ => EXIT_FAILURE,
    }
}

/// Report a command error and exit with its status
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    let code = exit_code(&err);

    if json {
        let body = serde_json::json!({
            "error": err.to_string(),
            "details": format!("{err:#}"),
            "exit_code": code,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }

    std::process::exit(code);
}
