// ==============================================================================
// audit.rs - Audit Logging for Triplet Repeat Runs
// ==============================================================================
// Description: Append-only JSON-lines audit trail for each run
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    RunStarted,
    InputValidated,
    InputRejected,
    ControlsValidated,
    ControlsOutOfTolerance,
    ReportWritten,
    RunCompleted,
    RunFailed,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub run_id: Uuid,
    pub worksheet: String,
    pub gene: String,
    pub resource: Option<String>,
    pub details: serde_json::Value,
    pub severity: LogSeverity,
}

impl AuditEvent {
    pub fn new(
        event_type: AuditEventType,
        run_id: Uuid,
        worksheet: &str,
        gene: &str,
        resource: Option<String>,
        details: serde_json::Value,
    ) -> Self {
        let severity = match event_type {
            AuditEventType::ControlsOutOfTolerance => LogSeverity::Warning,
            AuditEventType::RunFailed | AuditEventType::InputRejected => LogSeverity::Error,
            _ => LogSeverity::Info,
        };

        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            run_id,
            worksheet: worksheet.to_string(),
            gene: gene.to_string(),
            resource,
            details,
            severity,
        }
    }
}

/// Audit trail for one run, appended to `path` as JSON lines
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    run_id: Uuid,
    worksheet: String,
    gene: String,
}

impl AuditLog {
    pub fn new(path: PathBuf, run_id: Uuid, worksheet: &str, gene: &str) -> Self {
        Self {
            path,
            run_id,
            worksheet: worksheet.to_string(),
            gene: gene.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Append an event to the audit trail
    pub fn log_event(
        &self,
        event_type: AuditEventType,
        resource: Option<String>,
        details: serde_json::Value,
    ) -> Result<()> {
        let event = AuditEvent::new(
            event_type,
            self.run_id,
            &self.worksheet,
            &self.gene,
            resource,
            details,
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open audit log {:?}", self.path))?;

        let line = serde_json::to_string(&event).context("Failed to serialize audit event")?;
        writeln!(file, "{}", line).context("Failed to write audit event")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_audit_event_creation() {
        let run_id = Uuid::new_v4();
        let event = AuditEvent::new(
            AuditEventType::InputValidated,
            run_id,
            "W123",
            "HD",
            Some("W123_HD.txt".to_string()),
            serde_json::json!({ "size": 4096, "hash": "abc123" }),
        );

        assert_eq!(event.run_id, run_id);
        assert_eq!(event.resource, Some("W123_HD.txt".to_string()));
        assert!(matches!(event.severity, LogSeverity::Info));
    }

    #[test]
    fn test_event_severity() {
        let event = AuditEvent::new(
            AuditEventType::ControlsOutOfTolerance,
            Uuid::new_v4(),
            "W123",
            "HD",
            None,
            serde_json::json!({}),
        );
        assert!(matches!(event.severity, LogSeverity::Warning));

        let event = AuditEvent::new(
            AuditEventType::RunFailed,
            Uuid::new_v4(),
            "W123",
            "HD",
            None,
            serde_json::json!({}),
        );
        assert!(matches!(event.severity, LogSeverity::Error));
    }

    #[test]
    fn test_log_event_appends_json_lines() {
        let dir = tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("audit.jsonl"), Uuid::new_v4(), "W123", "HD");

        log.log_event(AuditEventType::RunStarted, None, serde_json::json!({})).unwrap();
        log.log_event(AuditEventType::RunCompleted, None, serde_json::json!({ "rows": 7 }))
            .unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let events: Vec<AuditEvent> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::RunStarted);
        assert_eq!(events[1].details["rows"], 7);
        assert_eq!(events[0].run_id, log.run_id());
    }

    #[test]
    fn test_event_type_serde() {
        let json = serde_json::to_string(&AuditEventType::ControlsOutOfTolerance).unwrap();
        assert_eq!(json, "\"controls_out_of_tolerance\"");
    }
}
