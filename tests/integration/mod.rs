//! Integration tests for the markgen regeneration pipeline

mod cache_reuse;
mod cancellation;
mod cli_generate;
mod collision;
mod config_integration;
mod determinism;
mod regeneration;
mod registry_loading;
mod test_utils;
