// ==============================================================================
// config.rs - Run Configuration
// ==============================================================================
// Description: Gene allowlist and per-run configuration for the processor
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::models::CalibrationPolicy;
use crate::output::OutputFormat;

/// Genes with reference controls on file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gene {
    #[serde(rename = "FRAX")]
    Frax,
    #[serde(rename = "FA")]
    Fa,
    #[serde(rename = "C9ORF72")]
    C9orf72,
    #[serde(rename = "HD")]
    Hd,
    #[serde(rename = "MDMYo(DM1)")]
    Dm1,
    #[serde(rename = "SCA1")]
    Sca1,
    #[serde(rename = "SCA2")]
    Sca2,
    #[serde(rename = "SCA3")]
    Sca3,
    #[serde(rename = "SCA6")]
    Sca6,
    /// Validation gene used by the regression fixtures
    #[serde(rename = "gene1")]
    Gene1,
}

#[derive(Error, Debug, PartialEq)]
#[error("Gene entered incorrectly: {0}")]
pub struct UnknownGene(pub String);

impl Gene {
    pub const ALL: [Gene; 10] = [
        Gene::Frax,
        Gene::Fa,
        Gene::C9orf72,
        Gene::Hd,
        Gene::Dm1,
        Gene::Sca1,
        Gene::Sca2,
        Gene::Sca3,
        Gene::Sca6,
        Gene::Gene1,
    ];

    /// Name as used in file names and control table sheets
    pub fn as_str(&self) -> &'static str {
        match self {
            Gene::Frax => "FRAX",
            Gene::Fa => "FA",
            Gene::C9orf72 => "C9ORF72",
            Gene::Hd => "HD",
            Gene::Dm1 => "MDMYo(DM1)",
            Gene::Sca1 => "SCA1",
            Gene::Sca2 => "SCA2",
            Gene::Sca3 => "SCA3",
            Gene::Sca6 => "SCA6",
            Gene::Gene1 => "gene1",
        }
    }

    /// Stem of the default reference controls file (FRAX keeps its own table)
    pub fn controls_file_stem(&self) -> &'static str {
        match self {
            Gene::Frax => "Triplet_controls_FRAX",
            _ => "Triplet_controls",
        }
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gene {
    type Err = UnknownGene;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Gene::ALL
            .into_iter()
            .find(|g| g.as_str() == name)
            .ok_or_else(|| UnknownGene(name.to_string()))
    }
}

/// Everything one run needs, passed explicitly into the processor
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub gene: Gene,
    pub worksheet: String,
    /// Directory holding `{worksheet}_{gene}.txt`
    pub data_dir: PathBuf,
    /// Reference controls file; defaults to the gene's table in `data_dir`
    pub controls_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub formats: Vec<OutputFormat>,
    pub policy: CalibrationPolicy,
}

impl RunConfig {
    pub fn new(gene: Gene, worksheet: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            gene,
            worksheet: worksheet.into(),
            output_dir: data_dir.clone(),
            data_dir,
            controls_path: None,
            formats: OutputFormat::DEFAULT.to_vec(),
            policy: CalibrationPolicy::default(),
        }
    }

    /// Prefix shared by every file of this run: `{worksheet}_{gene}`
    pub fn run_prefix(&self) -> String {
        format!("{}_{}", self.worksheet, self.gene)
    }

    /// GeneMapper export location
    pub fn genemapper_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.txt", self.run_prefix()))
    }

    /// Reference controls location
    ///
    /// Without an explicit path, the first of `{stem}.db`, `{stem}.sqlite`,
    /// `{stem}.csv`, `{stem}.tsv` that exists in `data_dir` is used.
    pub fn resolve_controls_path(&self) -> PathBuf {
        if let Some(path) = &self.controls_path {
            return path.clone();
        }

        let stem = self.gene.controls_file_stem();
        let candidates: Vec<PathBuf> = ["db", "sqlite", "csv", "tsv"]
            .iter()
            .map(|ext| self.data_dir.join(format!("{}.{}", stem, ext)))
            .collect();

        candidates
            .iter()
            .find(|p| p.exists())
            .cloned()
            .unwrap_or_else(|| candidates[0].clone())
    }

    pub fn output_path(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}_{}", self.run_prefix(), suffix))
    }

    pub fn with_output_dir(mut self, dir: &Path) -> Self {
        self.output_dir = dir.to_path_buf();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_gene_from_str() {
        assert_eq!("FRAX".parse::<Gene>().unwrap(), Gene::Frax);
        assert_eq!(" HD ".parse::<Gene>().unwrap(), Gene::Hd);
        assert_eq!("MDMYo(DM1)".parse::<Gene>().unwrap(), Gene::Dm1);
        assert_eq!(
            "hd".parse::<Gene>().unwrap_err(),
            UnknownGene("hd".to_string())
        );
    }

    #[test]
    fn test_gene_round_trips_names() {
        for gene in Gene::ALL {
            assert_eq!(gene.as_str().parse::<Gene>().unwrap(), gene);
        }
    }

    #[test]
    fn test_gene_serde() {
        let json = serde_json::to_string(&Gene::Dm1).unwrap();
        assert_eq!(json, "\"MDMYo(DM1)\"");
    }

    #[test]
    fn test_controls_file_stem() {
        assert_eq!(Gene::Frax.controls_file_stem(), "Triplet_controls_FRAX");
        assert_eq!(Gene::Sca3.controls_file_stem(), "Triplet_controls");
    }

    #[test]
    fn test_run_paths() {
        let config = RunConfig::new(Gene::Gene1, "tester1", "/data/run");
        assert_eq!(config.genemapper_path(), PathBuf::from("/data/run/tester1_gene1.txt"));
        assert_eq!(
            config.output_path("triplets_output.txt"),
            PathBuf::from("/data/run/tester1_gene1_triplets_output.txt")
        );
    }

    #[test]
    fn test_resolve_controls_path() {
        let dir = tempdir().unwrap();
        let config = RunConfig::new(Gene::Hd, "W1", dir.path());

        // Nothing on disk: first candidate
        assert_eq!(config.resolve_controls_path(), dir.path().join("Triplet_controls.db"));

        std::fs::write(dir.path().join("Triplet_controls.csv"), "x").unwrap();
        assert_eq!(config.resolve_controls_path(), dir.path().join("Triplet_controls.csv"));

        let mut explicit = config.clone();
        explicit.controls_path = Some(PathBuf::from("/tmp/other.tsv"));
        assert_eq!(explicit.resolve_controls_path(), PathBuf::from("/tmp/other.tsv"));
    }
}
