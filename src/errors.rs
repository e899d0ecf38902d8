use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum BenchError {
    #[error("Failed to compile template '{template}': {detail}")]
    Compile { template: String, detail: String },

    #[error("Render failed: {detail}")]
    Render { detail: String },

    #[error("Template engine '{engine}' is not available in this build")]
    EngineUnavailable { engine: String },

    #[error("Variant '{name}' is already registered in group '{group}'")]
    DuplicateVariant { group: String, name: String },

    #[error("Iteration count must be at least 1 (got {value})")]
    InvalidIterations { value: u64 },

    #[error("Failed to read settings file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path}: {detail}")]
    ConfigParse { path: PathBuf, detail: String },

    #[error("Failed to write profile data to {path}: {source}")]
    ProfileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to load profile data from {path}: {detail} (the file was left in place for inspection)")]
    ProfileLoad { path: PathBuf, detail: String },

    #[error("Failed to write report output: {0}")]
    Output(#[from] std::io::Error),
}
