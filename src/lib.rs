pub mod accession;
pub mod args;
pub mod batch;
pub mod database;
pub mod errors;
pub mod gi_index;
pub mod lineage;
pub mod taxonomy;
pub mod utils;

pub use errors::{Error, Result};

/// Taxon id of the NCBI root node.
pub const ROOT_TAXID: u64 = 1;
