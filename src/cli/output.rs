//! Output formatting utilities for the CLI.

use chrono::{DateTime, Utc};
use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::domain::models::{Lease, RenewalEvent, SecretPayload};

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Print a renewal event as a single JSON line
pub fn event_line(event: &RenewalEvent) {
    println!("{}", serde_json::to_string(event).unwrap_or_default());
}

/// Issued credentials together with their lease metadata
#[derive(Debug, Serialize)]
pub struct CredentialsOutput {
    pub lease_id: String,
    pub ttl_secs: u64,
    pub renewable: bool,
    pub issued_at: DateTime<Utc>,
    pub credentials: SecretPayload,
}

impl From<&Lease> for CredentialsOutput {
    fn from(lease: &Lease) -> Self {
        Self {
            lease_id: lease.lease_id.clone(),
            ttl_secs: lease.ttl.as_secs(),
            renewable: lease.renewable,
            issued_at: lease.issued_at,
            credentials: lease.payload.clone(),
        }
    }
}

impl CommandOutput for CredentialsOutput {
    fn to_human(&self) -> String {
        let renewable = if self.renewable { "renewable" } else { "not renewable" };
        let header = format!(
            "Lease {} ({}s, {renewable}), issued {}",
            self.lease_id,
            self.ttl_secs,
            self.issued_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );

        if self.credentials.is_empty() {
            return format!("{header}
No credential data returned.");
        }

        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(
                ["KEY", "VALUE"]
                    .iter()
                    .map(|h| Cell::new(h).set_alignment(CellAlignment::Left)),
            );

        for (key, value) in self.credentials.iter() {
            table.add_row(vec![key.clone(), display_value(value)]);
        }

        format!("{header}\n{table}")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
