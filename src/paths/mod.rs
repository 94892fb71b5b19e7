/**
 * Paths Module
 *
 * Unified path management for the data tool.
 * All paths to the project root and the LRA data directory go through this module.
 */
mod project_dirs;

pub use project_dirs::*;
