// Error types shared by every module
pub mod error;
// Unified path management
pub mod paths;
// lra-data.toml
pub mod config;
// Unified download management
pub mod downloads;
// Fetch procedure and progress reporting
pub mod setup;
// LRA tokenizers
pub mod tokenizer;
// LRA tasks and TSV readers
pub mod lra;

pub use error::{DataError, Result};
