//! JSONL log of cookie decisions — append-only.

use crate::config::CookieAccept;
use crate::engine::FilterRequest;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// A single recorded decision.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRecord {
    pub timestamp: String,
    pub first_party: Option<String>,
    pub origin: Option<String>,
    pub third_party: bool,
    pub setting: String,
    pub accepted: bool,
}

/// Append-only JSONL decision log.
pub struct DecisionLog {
    file: File,
}

impl DecisionLog {
    /// Open or create the log file.
    pub fn open(path: &PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open decision log: {}", path.display()))?;

        Ok(Self { file })
    }

    /// Open the default log at ~/.prism/cookie-decisions.jsonl.
    pub fn default_log() -> Result<Self> {
        let path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".prism")
            .join("cookie-decisions.jsonl");
        Self::open(&path)
    }

    /// Record one decision.
    pub fn record(
        &mut self,
        request: &FilterRequest,
        setting: CookieAccept,
        accepted: bool,
    ) -> Result<()> {
        let record = DecisionRecord {
            timestamp: Utc::now().to_rfc3339(),
            first_party: request.first_party_url.as_ref().map(|u| u.to_string()),
            origin: request.origin.as_ref().map(|u| u.to_string()),
            third_party: request.third_party,
            setting: setting.to_string(),
            accepted,
        };
        let json = serde_json::to_string(&record)?;
        writeln!(self.file, "{json}")?;
        Ok(())
    }
}
