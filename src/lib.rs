//! DEALSCOPE: property data fusion and investment calculation engine
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod money;
pub mod fusion;
pub mod finance;
pub mod sources;
pub mod engine;
