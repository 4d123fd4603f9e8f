use acc2tax::accession::AccessionFile;
use acc2tax::args::{Args, QueryKind};
use acc2tax::batch::{BatchDriver, BatchStats, Lookup};
use acc2tax::database::Database;
use acc2tax::gi_index::GiIndex;
use acc2tax::taxonomy::{TaxonomyStore, DEFAULT_TAXON_CAPACITY};
use anyhow::{Context, Result};
use clap::Parser;
use std::time::Instant;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

/// The identifier map chosen by the query kind.
enum Reference {
    Gi(GiIndex),
    Accession(AccessionFile),
}

fn run(args: Args) -> Result<BatchStats> {
    let start = Instant::now();
    let database = Database::new(&args.database, args.seq_kind());
    log::info!(
        "acc2tax {}: {:?} queries against {} database {:?}",
        env!("CARGO_PKG_VERSION"),
        args.query_kind(),
        database.kind(),
        database.dir()
    );

    // the accession file stays open until the batch is done, whatever the outcome
    let reference = match args.query_kind() {
        QueryKind::Gi => {
            log::info!("GI domain bound: {} entries", args.max_gi);
            let index = GiIndex::load(database.gi_taxid_path(), args.max_gi)
                .with_context(|| format!("loading {:?}", database.gi_taxid_path()))?;
            Reference::Gi(index)
        }
        QueryKind::Accession => {
            let file = AccessionFile::open(database.accession_path(), args.convergence(), args.mmap)
                .with_context(|| format!("opening {:?}", database.accession_path()))?;
            log::info!("Accession search convergence: {:?}", file.convergence());
            Reference::Accession(file)
        }
    };

    let taxonomy = TaxonomyStore::from_ncbi(
        database.nodes_path(),
        database.names_path(),
        DEFAULT_TAXON_CAPACITY,
        args.max_taxid,
    )
    .context("loading taxonomy")?;

    let lookup = match &reference {
        Reference::Gi(index) => Lookup::Gi(index),
        Reference::Accession(file) => Lookup::Accession(file),
    };

    let threads = args.worker_threads();
    let driver = BatchDriver::new(&taxonomy, lookup, args.max_depth).with_threads(threads);
    log::info!("Processing {:?} with {} worker(s)", args.input, threads);
    let stats = driver
        .run_files(&args.input, &args.output)
        .with_context(|| format!("processing {:?}", args.input))?;

    log::info!(
        "{} written ({} Unknown), {} invalid, {} unresolved, {} lineage errors",
        stats.written,
        stats.unknown,
        stats.invalid,
        stats.unresolved,
        stats.integrity_errors
    );
    if let Some(path) = &args.stats {
        stats
            .write_json(path)
            .with_context(|| format!("writing {:?}", path))?;
    }
    log::info!("acc2tax took: {:?}", start.elapsed());
    Ok(stats)
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    run(args)?;
    Ok(())
}
