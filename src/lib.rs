// ==============================================================================
// lib.rs - Triplet Repeat Processor Library
// ==============================================================================
// Description: Library interface for triplet repeat sizing modules
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

pub mod parsers;
pub mod audit;
pub mod validator;
pub mod models;
pub mod config;
pub mod calibration;
pub mod reference_controls;
pub mod processor;
pub mod output;
