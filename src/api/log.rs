use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;

use crate::paths;

/// One API request as recorded in the debug log. Bodies are never recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCallLog {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status: Option<u16>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiCallLogger {
    log_dir: Option<PathBuf>,
}

impl ApiCallLogger {
    /// Logger that writes only when debug mode is on
    pub fn new() -> Result<Self> {
        if !crate::ui::is_debug_enabled() {
            return Ok(Self::disabled());
        }
        Self::reader()
    }

    /// Logger on the default location regardless of debug mode
    pub fn reader() -> Result<Self> {
        Self::with_dir(paths::api_logs_dir()?)
    }

    pub fn disabled() -> Self {
        Self { log_dir: None }
    }

    pub fn with_dir(log_dir: PathBuf) -> Result<Self> {
        create_dir_all(&log_dir).context("Failed to create api log directory")?;
        Ok(Self {
            log_dir: Some(log_dir),
        })
    }

    pub fn log_call(
        &self,
        method: &str,
        path: &str,
        status: Option<u16>,
        error: Option<&str>,
    ) -> Result<()> {
        let Some(log_file) = self.get_log_file_path() else {
            return Ok(());
        };

        let log_entry = ApiCallLog {
            timestamp: Utc::now(),
            method: method.to_string(),
            path: path.to_string(),
            status,
            success: error.is_none() && status.is_some_and(|s| (200..300).contains(&s)),
            error: error.map(str::to_string),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open api log file")?;

        let json_line =
            serde_json::to_string(&log_entry).context("Failed to serialize api call log")?;

        writeln!(file, "{json_line}").context("Failed to write to api log file")?;

        Ok(())
    }

    fn get_log_file_path(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|dir| dir.join("api_calls.jsonl"))
    }

    /// Logged calls, newest first
    pub fn get_logs(&self) -> Result<Vec<ApiCallLog>> {
        let Some(log_file) = self.get_log_file_path() else {
            return Ok(Vec::new());
        };
        if !log_file.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&log_file).context("Failed to read api log file")?;

        let mut logs = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let log: ApiCallLog =
                serde_json::from_str(line).context("Failed to parse api log entry")?;
            logs.push(log);
        }

        logs.reverse();
        Ok(logs)
    }

    pub fn clear_logs(&self) -> Result<()> {
        if let Some(log_file) = self.get_log_file_path()
            && log_file.exists()
        {
            std::fs::remove_file(&log_file).context("Failed to remove api log file")?;
        }
        Ok(())
    }

    pub fn print_recent_logs(&self, limit: Option<usize>) -> Result<()> {
        use crate::ui::prelude::*;

        let logs = self.get_logs()?;
        let limit = limit.unwrap_or(10);

        if logs.is_empty() {
            emit(Level::Info, "api.logs.empty", "No API call logs found.", None);
            return Ok(());
        }

        for log in logs.iter().take(limit) {
            let time_str = log.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string();
            let status = log
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let mut line = format!("{time_str}  {:<6} {} -> {status}", log.method, log.path);
            if let Some(error) = &log.error {
                line.push_str(&format!("  ({error})"));
            }

            let level = if log.success { Level::Info } else { Level::Warn };
            let data = serde_json::to_value(log).ok();
            emit(level, "api.logs.entry", &line, data);
        }

        Ok(())
    }
}
