// ==============================================================================
// processor.rs - Triplet Repeat Run Pipeline
// ==============================================================================
// Description: Validates inputs, calibrates controls, calls samples, writes reports
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditEventType, AuditLog};
use crate::calibration::{calibrate, CalibrationOutcome, ControlValidation};
use crate::config::RunConfig;
use crate::models::MatchedSampleRow;
use crate::output::{OutputFormat, OutputGenerator, ReportMetadata, ResultRowOutput, TripletReport};
use crate::parsers::GeneMapperParser;
use crate::reference_controls::load_reference_controls;
use crate::validator::{FileValidator, InputKind, ValidatedFile};

/// Written to the results file when the GeneMapper export is missing
pub const MISSING_EXPORT_MESSAGE: &str = "Genemapper file could not be found- check file name";

/// Written to the results file when the gene is not on the allowlist
pub const UNKNOWN_GENE_MESSAGE: &str = "Gene entered incorrectly";

/// Written to the results file when controls fail the tolerance check
pub fn out_of_tolerance_message(tolerance: f64) -> String {
    format!(
        "The controls are not within +/- {} of the reference controls",
        tolerance
    )
}

/// Terminal state of a run
#[derive(Debug)]
pub enum RunOutcome {
    Completed {
        rows: Vec<MatchedSampleRow>,
        reports: HashMap<OutputFormat, PathBuf>,
    },
    ControlsOutOfTolerance {
        out_of_tolerance: Vec<String>,
        message_path: PathBuf,
    },
}

pub struct TripletProcessor {
    config: RunConfig,
    run_id: Uuid,
    audit: AuditLog,
    output: OutputGenerator,
}

impl TripletProcessor {
    pub fn new(config: RunConfig) -> Self {
        let run_id = Uuid::new_v4();
        let gene = config.gene.to_string();
        let audit = AuditLog::new(
            config.output_path("audit.jsonl"),
            run_id,
            &config.worksheet,
            &gene,
        );
        let output = OutputGenerator::new(
            config.run_prefix(),
            config.worksheet.clone(),
            config.output_dir.clone(),
        );

        Self {
            config,
            run_id,
            audit,
            output,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Main processing pipeline
    pub fn process(&self) -> Result<RunOutcome> {
        info!(
            "Starting triplet repeat run {} (worksheet {}, gene {})",
            self.run_id, self.config.worksheet, self.config.gene
        );

        std::fs::create_dir_all(&self.config.output_dir)
            .context("Failed to create output directory")?;

        self.audit.log_event(
            AuditEventType::RunStarted,
            None,
            serde_json::json!({
                "data_dir": self.config.data_dir,
                "tolerance": self.config.policy.tolerance,
                "formats": self.config.formats,
            }),
        )?;

        match self.run() {
            Ok(outcome) => {
                let details = match &outcome {
                    RunOutcome::Completed { rows, reports } => serde_json::json!({
                        "success": true,
                        "samples": rows.len(),
                        "reports": reports.values().collect::<Vec<_>>(),
                    }),
                    RunOutcome::ControlsOutOfTolerance { out_of_tolerance, .. } => serde_json::json!({
                        "success": false,
                        "out_of_tolerance": out_of_tolerance,
                    }),
                };
                self.audit
                    .log_event(AuditEventType::RunCompleted, None, details)?;
                Ok(outcome)
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    /// Audit a failed run; the run error is returned even if the audit write fails
    fn record_failure(&self, e: anyhow::Error) -> anyhow::Error {
        warn!("Run failed: {:#}", e);
        if let Err(audit_err) = self.audit.log_event(
            AuditEventType::RunFailed,
            None,
            serde_json::json!({ "error": format!("{:#}", e) }),
        ) {
            warn!("Failed to record run failure in audit log: {:#}", audit_err);
        }
        e
    }

    fn run(&self) -> Result<RunOutcome> {
        // 1. Locate and validate inputs
        let genemapper_path = self.config.genemapper_path();
        if !genemapper_path.exists() {
            self.output.write_message(MISSING_EXPORT_MESSAGE)?;
            anyhow::bail!("GeneMapper export not found: {:?}", genemapper_path);
        }
        let controls_path = self.config.resolve_controls_path();

        let genemapper_file = self.validate_input(&genemapper_path, InputKind::GeneMapperExport)?;
        let controls_file = self.validate_input(&controls_path, InputKind::ReferenceControls)?;

        // 2. Parse GeneMapper export
        info!("Parsing GeneMapper export");
        let run = GeneMapperParser::new()
            .parse(&genemapper_path)
            .context("Failed to parse GeneMapper export")?;

        // 3. Load reference controls for this gene
        info!("Loading reference controls from {:?}", controls_path);
        let references = load_reference_controls(&controls_path, self.config.gene.as_str())?;

        // 4. Calibrate and call samples
        let outcome = calibrate(&run.samples, &run.controls, &references, &self.config.policy);
        self.log_validation(outcome.validation())?;

        match outcome {
            CalibrationOutcome::OutOfTolerance(validation) => {
                let message = out_of_tolerance_message(self.config.policy.tolerance);
                warn!("{}: {:?}", message, validation.out_of_tolerance);
                let message_path = self.output.write_message(&message)?;

                Ok(RunOutcome::ControlsOutOfTolerance {
                    out_of_tolerance: validation.out_of_tolerance,
                    message_path,
                })
            }
            CalibrationOutcome::Called { validation, rows, .. } => {
                // 5. Generate reports
                let report = self.build_report(&rows, validation, &genemapper_file, &controls_file);
                let reports = self
                    .output
                    .generate(&self.config.formats, &report)
                    .context("Failed to generate reports")?;

                for (format, path) in &reports {
                    self.audit.log_event(
                        AuditEventType::ReportWritten,
                        Some(path.display().to_string()),
                        serde_json::json!({ "format": format }),
                    )?;
                }

                info!("Run complete: {} samples called", rows.len());
                Ok(RunOutcome::Completed { rows, reports })
            }
        }
    }

    fn validate_input(&self, path: &std::path::Path, kind: InputKind) -> Result<ValidatedFile> {
        match FileValidator::new().validate_input(path, kind) {
            Ok(validated) => {
                self.audit.log_event(
                    AuditEventType::InputValidated,
                    Some(path.display().to_string()),
                    serde_json::json!({
                        "kind": kind,
                        "size": validated.size,
                        "sha256": validated.hash_sha256,
                    }),
                )?;
                Ok(validated)
            }
            Err(e) => {
                self.audit.log_event(
                    AuditEventType::InputRejected,
                    Some(path.display().to_string()),
                    serde_json::json!({ "kind": kind, "error": e.to_string() }),
                )?;
                Err(e.context(format!("{:?} input rejected", kind)))
            }
        }
    }

    fn log_validation(&self, validation: &ControlValidation) -> Result<()> {
        let event_type = if validation.proceed {
            AuditEventType::ControlsValidated
        } else {
            AuditEventType::ControlsOutOfTolerance
        };

        let diffs: Vec<_> = validation
            .validated
            .iter()
            .map(|c| {
                serde_json::json!({
                    "reference_sample": c.reference_sample_id,
                    "diff1": c.diff1(),
                    "diff2": c.diff2(),
                })
            })
            .collect();

        self.audit.log_event(
            event_type,
            None,
            serde_json::json!({
                "validated": diffs,
                "unmatched": validation.unmatched,
                "out_of_tolerance": validation.out_of_tolerance,
            }),
        )
    }

    fn build_report(
        &self,
        rows: &[MatchedSampleRow],
        validation: ControlValidation,
        genemapper_file: &ValidatedFile,
        controls_file: &ValidatedFile,
    ) -> TripletReport {
        TripletReport {
            metadata: ReportMetadata {
                run_id: self.run_id.to_string(),
                worksheet: self.config.worksheet.clone(),
                gene: self.config.gene.to_string(),
                processing_date: chrono::Utc::now().to_rfc3339(),
                tolerance: self.config.policy.tolerance,
                repeat_unit: self.config.policy.repeat_unit,
                genemapper_sha256: genemapper_file.hash_sha256.clone(),
                controls_sha256: controls_file.hash_sha256.clone(),
                sample_count: rows.len(),
                control_count: validation.validated.len(),
                unmatched_controls: validation.unmatched,
            },
            rows: rows.iter().map(ResultRowOutput::from).collect(),
            controls: validation.validated,
        }
    }
}
