//! Application layer
//!
//! - `CredentialSession`: fetch a secret and start watching its lease
//! - `ControlLoop`: react to renewal events and termination until the session ends

pub mod control_loop;
pub mod session;

pub use control_loop::{ControlLoop, ControlOutcome};
pub use session::{CredentialSession, WatchedCredential};
