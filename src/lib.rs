// ==============================================================================
// lib.rs - Variant Comparison Library
// ==============================================================================
// Description: Library interface for variant comparison modules
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

pub mod parsers;
pub mod allele_encoder;
pub mod risk_panel;
pub mod models;
pub mod matrix;
pub mod difference;
pub mod cooccurrence;
pub mod risk_table;
pub mod tables;
pub mod output;
pub mod validator;
pub mod manifest;
pub mod processor;
