//! Data ingestion and output
//!
//! CSV loading of fight records and atomic writing of the derived tables.

pub mod loader;
pub mod writer;

pub use loader::{load_matches, read_matches};
pub use writer::{write_outputs, OutputPaths};
