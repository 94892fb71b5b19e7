/**
 * Downloads Module
 *
 * Unified download management for the LRA release and auxiliary files:
 * streaming downloads, checksums, archive extraction and resource bookkeeping.
 */

mod checksum;
mod downloader;
mod extract;
mod resource;

pub use checksum::*;
pub use downloader::*;
pub use extract::*;
pub use resource::*;
