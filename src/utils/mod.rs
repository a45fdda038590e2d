//! Configuration and shared helpers.

/// Best-effort recovery of JSON embedded in free-form model output.
pub mod json_recovery;
/// TOML configuration with environment overrides.
pub mod toml_config;
