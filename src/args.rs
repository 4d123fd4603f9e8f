use crate::accession::{Convergence, DEFAULT_THRESHOLD, MIN_THRESHOLD};
use crate::database::SeqKind;
use crate::gi_index::DEFAULT_MAX_GI;
use crate::lineage::DEFAULT_MAX_DEPTH;
use crate::taxonomy::DEFAULT_MAX_TAXID;
use clap::Parser;
use std::path::PathBuf;

/// Kind of identifier on each input line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QueryKind {
    Accession,
    Gi,
}

/// Command line arguments for acc2tax.
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about = "Provide batch taxonomy information for Genbank IDs or Accessions.",
    long_about = "Provide batch taxonomy information for Genbank IDs or Accessions.
Each input line holds one GI number or accession. Each resolved ID is written as
'<id>\\t<comma-separated lineage>' from the root down to the ID's own taxon."
)]
pub struct Args {
    /// Query is accession IDs [default].
    #[arg(short = 'a', long, overrides_with = "gi")]
    pub accession: bool,

    /// Query is Genbank IDs.
    #[arg(short = 'g', long, overrides_with = "accession")]
    pub gi: bool,

    /// Directory containing NCBI taxonomy files.
    #[arg(short = 'd', long, required = true)]
    pub database: PathBuf,

    /// Max GI entries.
    #[arg(short = 'e', long = "entries", default_value_t = DEFAULT_MAX_GI)]
    pub max_gi: u64,

    /// File of IDs (GI or Accession), one per line.
    #[arg(short = 'i', long, required = true)]
    pub input: PathBuf,

    /// Query IDs are nucleotide [default].
    #[arg(short = 'n', long, overrides_with = "protein")]
    pub nucleotide: bool,

    /// Filename of output file.
    #[arg(short = 'o', long, required = true)]
    pub output: PathBuf,

    /// Query IDs are protein.
    #[arg(short = 'p', long, overrides_with = "nucleotide")]
    pub protein: bool,

    /// Accession search gives up once the byte range is narrower than this.
    #[arg(
        long,
        default_value_t = DEFAULT_THRESHOLD,
        value_parser = clap::value_parser!(u64).range(MIN_THRESHOLD..)
    )]
    pub threshold: u64,

    /// Narrow the accession search to line boundaries until the range is empty,
    /// instead of stopping at --threshold bytes.
    #[arg(long, conflicts_with = "threshold")]
    pub exact: bool,

    /// Taxon ids in nodes/names rows must be below this.
    #[arg(long, default_value_t = DEFAULT_MAX_TAXID)]
    pub max_taxid: u64,

    /// Maximum parent hops in a lineage before it is reported as cyclic.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Memory-map the accession file instead of seeking through it.
    #[arg(long)]
    pub mmap: bool,

    /// Number of query workers (1 = sequential, 0 = one per CPU).
    #[arg(short = 't', long, default_value_t = 1)]
    pub threads: usize,

    /// Write a JSON run summary to this file.
    #[arg(long)]
    pub stats: Option<PathBuf>,

    /// Only log warnings and errors.
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log per-record detail.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Args {
    pub fn query_kind(&self) -> QueryKind {
        if self.gi {
            QueryKind::Gi
        } else {
            QueryKind::Accession
        }
    }

    pub fn seq_kind(&self) -> SeqKind {
        if self.protein {
            SeqKind::Protein
        } else {
            SeqKind::Nucleotide
        }
    }

    pub fn convergence(&self) -> Convergence {
        if self.exact {
            Convergence::Exact
        } else {
            Convergence::Threshold(self.threshold)
        }
    }

    /// Worker count; 0 means one per CPU.
    pub fn worker_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            log::LevelFilter::Warn
        } else if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}
