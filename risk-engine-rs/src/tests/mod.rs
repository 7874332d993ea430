//! Cross-module tests for the risk engine

pub mod engine_tests;
pub mod http_source_tests;
pub mod rules_tests;
