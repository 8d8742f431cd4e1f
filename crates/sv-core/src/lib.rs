//! Core data structures for StatSolver
//!
//! This crate provides the validated tabular dataset shared by the analysis
//! engines, plus the descriptive statistics primitives they build on.

pub mod data;
pub mod describe;
