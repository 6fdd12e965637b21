// ==============================================================================
// reference_controls.rs - Reference Controls Database Reader
// ==============================================================================
// Description: Reads expected control peaks from SQLite or delimited tables
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use tracing::info;

use crate::models::ReferencePeak;
use crate::parsers::controls::reference_peak;
use crate::parsers::ControlsParser;

/// Reference controls database reader
///
/// Expected schema:
/// `reference_controls(gene TEXT, reference_sample TEXT, exp_peaks TEXT, exp_repeats TEXT)`
/// with `exp_peaks` / `exp_repeats` stored as "a/b" pairs.
pub struct ReferenceControlsReader {
    conn: Connection,
}

impl ReferenceControlsReader {
    /// Open reference controls database (read-only)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(path.as_ref(), OpenFlags::SQLITE_OPEN_READ_ONLY)
            .context("Failed to open reference controls database")?;

        Ok(Self { conn })
    }

    /// Get the expected control peaks for a gene
    pub fn get_gene_controls(&self, gene: &str) -> Result<Vec<ReferencePeak>> {
        let mut stmt = self.conn.prepare(
            "SELECT reference_sample, exp_peaks, exp_repeats
             FROM reference_controls
             WHERE gene = ?1
             ORDER BY rowid",
        )?;

        let rows = stmt.query_map(params![gene], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut controls = Vec::new();
        for (idx, row) in rows.enumerate() {
            let (reference_sample, exp_peaks, exp_repeats) = row?;
            let peak = reference_peak(idx + 1, reference_sample.trim().to_string(), &exp_peaks, &exp_repeats)
                .with_context(|| format!("Invalid reference control for gene {}", gene))?;
            controls.push(peak);
        }

        info!("Loaded {} reference controls for {} from database", controls.len(), gene);

        Ok(controls)
    }

    /// Get the genes that have reference controls
    pub fn get_genes(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT gene FROM reference_controls ORDER BY gene")?;
        let genes = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(genes)
    }

    /// Check if database is properly formatted
    pub fn validate(&self) -> Result<()> {
        let mut stmt = self.conn.prepare("SELECT COUNT(*) FROM reference_controls")?;
        let count: usize = stmt.query_row([], |row| row.get(0))?;

        info!("Reference controls database validated: {} controls", count);

        Ok(())
    }
}

/// Load reference controls for a gene, choosing the reader by file extension
///
/// `.db` / `.sqlite` files are read as SQLite databases, anything else as a
/// delimited table.
pub fn load_reference_controls(path: &Path, gene: &str) -> Result<Vec<ReferencePeak>> {
    let is_database = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("db") || e.eq_ignore_ascii_case("sqlite"))
        .unwrap_or(false);

    let controls = if is_database {
        let reader = ReferenceControlsReader::open(path)?;
        reader
            .validate()
            .context("Reference controls database validation failed")?;
        let controls = reader.get_gene_controls(gene)?;
        if controls.is_empty() {
            anyhow::bail!(
                "No reference controls found for gene {} (database has: {})",
                gene,
                reader.get_genes()?.join(", ")
            );
        }
        controls
    } else {
        ControlsParser::parse(path, gene)
            .with_context(|| format!("Failed to parse reference controls {:?}", path))?
    };

    if controls.is_empty() {
        anyhow::bail!("No reference controls found for gene {}", gene);
    }

    Ok(controls)
}
