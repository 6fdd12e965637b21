// ==============================================================================
// validator.rs - Input File Validation
// ==============================================================================
// Description: Validates run input files (presence, size, type, format, hash)
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// Security: Allowlist-only file types, magic number verification
// ==============================================================================

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::parsers::genemapper::SAMPLE_FILE_COLUMN;

const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024; // 50 MB

const SQLITE_MAGIC: &[u8] = b"SQLite format 3\0";

/// Role of an input file in the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputKind {
    GeneMapperExport,
    ReferenceControls,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidatedFile {
    pub path: PathBuf,
    pub kind: InputKind,
    pub extension: String,
    pub size: u64,
    pub hash_sha256: String,
    pub validated_at: chrono::DateTime<chrono::Utc>,
}

pub struct FileValidator {
    max_file_size: u64,
    allowed_types: HashMap<String, Vec<u8>>,
}

impl FileValidator {
    pub fn new() -> Self {
        let mut allowed_types = HashMap::new();

        // Delimited text (GeneMapper exports, control tables)
        allowed_types.insert("txt".to_string(), vec![]);
        allowed_types.insert("tsv".to_string(), vec![]);
        allowed_types.insert("csv".to_string(), vec![]);

        // SQLite control tables
        allowed_types.insert("db".to_string(), SQLITE_MAGIC.to_vec());
        allowed_types.insert("sqlite".to_string(), SQLITE_MAGIC.to_vec());

        Self {
            max_file_size: MAX_FILE_SIZE,
            allowed_types,
        }
    }

    pub fn validate_input(&self, file_path: &Path, kind: InputKind) -> Result<ValidatedFile> {
        info!("Validating {:?} input: {:?}", kind, file_path);

        // 1. Presence and size check
        let metadata = std::fs::metadata(file_path)
            .with_context(|| format!("Input file not found: {:?}", file_path))?;
        let size = metadata.len();

        if size == 0 {
            anyhow::bail!("Input file is empty: {:?}", file_path);
        }
        if size > self.max_file_size {
            anyhow::bail!(
                "File too large: {} bytes (max: {} bytes)",
                size,
                self.max_file_size
            );
        }
        debug!("Size check passed: {} bytes", size);

        // 2. Extension check (allowlist)
        let ext = self.get_extension(file_path)?;
        let expected_magic = self
            .allowed_types
            .get(&ext)
            .ok_or_else(|| anyhow::anyhow!("Invalid file type: {}", ext))?;
        debug!("Extension check passed: {}", ext);

        // 3. Magic number verification
        if !expected_magic.is_empty() {
            let actual_magic = self.read_magic_number(file_path, expected_magic.len())?;
            if actual_magic != *expected_magic {
                anyhow::bail!("Magic number mismatch for .{} file", ext);
            }
            debug!("Magic number check passed");
        }

        // 4. Content validation (header check for delimited text)
        if expected_magic.is_empty() {
            self.validate_header(file_path, kind)?;
            debug!("Content validation passed");
        }

        // 5. Compute SHA-256 hash
        let hash = self.compute_sha256(file_path)?;
        debug!("SHA-256: {}", hash);

        Ok(ValidatedFile {
            path: file_path.to_path_buf(),
            kind,
            extension: ext,
            size,
            hash_sha256: hash,
            validated_at: chrono::Utc::now(),
        })
    }

    fn get_extension(&self, path: &Path) -> Result<String> {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .ok_or_else(|| anyhow::anyhow!("No file extension found"))
    }

    fn read_magic_number(&self, path: &Path, len: usize) -> Result<Vec<u8>> {
        let mut file = File::open(path)?;
        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)
            .context("File shorter than its type signature")?;
        Ok(buffer)
    }

    fn validate_header(&self, path: &Path, kind: InputKind) -> Result<()> {
        let file = File::open(path)?;
        let mut first_line = String::new();
        BufReader::new(file).read_line(&mut first_line)?;

        let required = match kind {
            InputKind::GeneMapperExport => SAMPLE_FILE_COLUMN,
            InputKind::ReferenceControls => "reference_sample",
        };

        if !first_line.contains(required) {
            anyhow::bail!(
                "Invalid {:?} header: missing '{}' column",
                kind,
                required
            );
        }

        Ok(())
    }

    fn compute_sha256(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 8192];

        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new()
    }
}
