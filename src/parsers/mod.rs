// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for GeneMapper exports and reference control tables
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

pub mod genemapper;
pub mod controls;

pub use genemapper::{GeneMapperParser, GeneMapperRun, GeneMapperParseError};
pub use controls::{ControlsParser, ControlsParseError};
