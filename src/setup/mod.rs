/**
 * Setup Module
 *
 * Runs the LRA fetch procedure and reports its progress.
 */

mod pipeline;
mod progress;
mod reporter;

pub use pipeline::*;
pub use progress::*;
pub use reporter::*;
