//! Core engine: the fetch → merge → calculate pipeline.

pub mod analyzer;

pub use analyzer::{Analysis, AnalysisRequest, Analyzer};
