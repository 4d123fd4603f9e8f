use crate::accession::{AccessionFile, AccessionResolver, LineSource};
use crate::errors::{Error, Result};
use crate::gi_index::GiIndex;
use crate::lineage::{LineageBuilder, UNKNOWN};
use crate::taxonomy::TaxonomyStore;
use crate::utils::{open_file, trim_line_end};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// An `info!` progress line is logged every this many input lines.
pub const PROGRESS_INTERVAL: usize = 100_000;

/// Input lines handed to the worker pool at a time.
const CHUNK_LINES: usize = 64 * 1024;

/// Where query identifiers are resolved to taxon ids.
#[derive(Clone, Copy)]
pub enum Lookup<'a> {
    /// Numeric GI queries against the dense GI table.
    Gi(&'a GiIndex),
    /// Accession queries against the sorted accession file.
    Accession(&'a AccessionFile),
}

/// Per-run counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    /// Input lines read.
    pub processed: usize,
    /// Output rows written, `Unknown` lineages included.
    pub written: usize,
    /// Accessions found with taxon id 0, written as `Unknown`.
    pub unknown: usize,
    /// Empty lines, non-numeric or out-of-range GIs.
    pub invalid: usize,
    /// Identifiers with no mapping: absent accessions and unmapped GIs.
    pub unresolved: usize,
    /// Lineage walks that hit the depth guard.
    pub integrity_errors: usize,
}

impl BatchStats {
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| Error::Io(e.into()))?;
        Ok(())
    }
}

/// What happened to one input line.
#[derive(Debug)]
enum Outcome {
    Lineage(String),
    /// Accession present but mapped to taxon 0: written with an `Unknown` lineage.
    UnknownTaxon,
    /// Skipped, not written.
    Invalid(String),
    /// Skipped, not written.
    Unresolved(String),
    /// Skipped, not written.
    Integrity(Error),
}

enum Searcher<'a> {
    Gi(&'a GiIndex),
    Accession(AccessionResolver<Box<dyn LineSource + Send + 'a>>),
}

/// Reads one identifier per line and writes `identifier\tlineage` rows in
/// input order.
pub struct BatchDriver<'a> {
    lineage: LineageBuilder<'a>,
    lookup: Lookup<'a>,
    threads: usize,
}

impl<'a> BatchDriver<'a> {
    pub fn new(taxonomy: &'a TaxonomyStore, lookup: Lookup<'a>, max_depth: usize) -> Self {
        Self {
            lineage: LineageBuilder::new(taxonomy, max_depth),
            lookup,
            threads: 1,
        }
    }

    /// Number of query workers; 1 keeps the run strictly sequential.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn run_files<P: AsRef<Path>>(&self, input: P, output: P) -> Result<BatchStats> {
        let reader = BufReader::new(open_file(&input)?);
        let writer = BufWriter::new(File::create(&output).map_err(|e| {
            io::Error::new(e.kind(), format!("can't open {:?}: {}", output.as_ref(), e))
        })?);
        self.run(reader, writer)
    }

    pub fn run<R: BufRead, W: Write>(&self, input: R, mut output: W) -> Result<BatchStats> {
        let mut stats = BatchStats::default();

        if self.threads == 1 {
            let mut searcher = self.searcher(false)?;
            for line in input.split(b'\n') {
                let line = String::from_utf8_lossy(&line?).into_owned();
                let query = trim_line_end(&line);
                let outcome = self.resolve(&mut searcher, query)?;
                self.record(query, outcome, &mut output, &mut stats)?;
            }
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.threads)
                .build()
                .map_err(|e| Error::Config(format!("failed to build thread pool: {}", e)))?;

            let mut lines = input.split(b'\n');
            loop {
                let mut chunk = Vec::with_capacity(CHUNK_LINES);
                for line in lines.by_ref().take(CHUNK_LINES) {
                    chunk.push(String::from_utf8_lossy(&line?).into_owned());
                }
                if chunk.is_empty() {
                    break;
                }

                let outcomes = pool.install(|| self.resolve_chunk(&chunk))?;
                for (line, outcome) in chunk.iter().zip(outcomes) {
                    self.record(trim_line_end(line), outcome, &mut output, &mut stats)?;
                }
            }
        }

        output.flush()?;
        log::info!("Done. Processed {} IDs.", stats.processed);
        Ok(stats)
    }

    /// Splits a chunk into one contiguous slice per worker, each with its own
    /// searcher, and returns outcomes in input order.
    fn resolve_chunk(&self, chunk: &[String]) -> Result<Vec<Outcome>> {
        let per_worker = (chunk.len() + self.threads - 1) / self.threads;
        let parts = chunk
            .par_chunks(per_worker.max(1))
            .map(|lines| -> Result<Vec<Outcome>> {
                let mut searcher = self.searcher(true)?;
                lines
                    .iter()
                    .map(|line| self.resolve(&mut searcher, trim_line_end(line)))
                    .collect()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.into_iter().flatten().collect())
    }

    fn searcher(&self, worker: bool) -> Result<Searcher<'a>> {
        Ok(match self.lookup {
            Lookup::Gi(index) => Searcher::Gi(index),
            Lookup::Accession(file) if worker => Searcher::Accession(file.worker_resolver()?),
            Lookup::Accession(file) => Searcher::Accession(file.resolver()?),
        })
    }

    /// Resolve one trimmed identifier. Only I/O failures on the reference
    /// file are errors; everything else is an [`Outcome`].
    fn resolve(&self, searcher: &mut Searcher<'_>, query: &str) -> Result<Outcome> {
        if query.is_empty() {
            return Ok(Outcome::Invalid("empty ID in request file".to_string()));
        }

        let taxid = match searcher {
            Searcher::Gi(index) => {
                let gi = match query.trim().parse::<i64>() {
                    Ok(gi) if gi >= 1 => gi as u64,
                    _ => {
                        return Ok(Outcome::Invalid(format!(
                            "bad GI ({}) in request file",
                            query
                        )))
                    }
                };
                match index.lookup(gi) {
                    Ok(Some(taxid)) => taxid,
                    Ok(None) => {
                        return Ok(Outcome::Unresolved(format!("GI ({}) node (0) invalid", gi)))
                    }
                    Err(e) => return Ok(Outcome::Invalid(format!("bad GI ({}): {}", gi, e))),
                }
            }
            Searcher::Accession(resolver) => match resolver.find(query)? {
                Some(record) if record.taxid == 0 => return Ok(Outcome::UnknownTaxon),
                Some(record) => {
                    log::debug!(
                        "Found {}: {}, {}, {}, {}",
                        query,
                        record.accession,
                        record.version,
                        record.taxid,
                        record.gi
                    );
                    record.taxid
                }
                None => return Ok(Outcome::Unresolved(format!("Couldn't find: [{}]", query))),
            },
        };

        Ok(match self.lineage.render(taxid) {
            Ok(lineage) => Outcome::Lineage(lineage),
            Err(e) => Outcome::Integrity(e),
        })
    }

    fn record<W: Write>(
        &self,
        query: &str,
        outcome: Outcome,
        output: &mut W,
        stats: &mut BatchStats,
    ) -> Result<()> {
        stats.processed += 1;
        if stats.processed % PROGRESS_INTERVAL == 0 {
            log::info!("Processed {} IDs", stats.processed);
        }

        match outcome {
            Outcome::Lineage(lineage) => {
                writeln!(output, "{}\t{}", query, lineage)?;
                stats.written += 1;
            }
            Outcome::UnknownTaxon => {
                writeln!(output, "{}\t{}", query, UNKNOWN)?;
                stats.written += 1;
                stats.unknown += 1;
            }
            Outcome::Invalid(message) => {
                log::warn!("{}", message);
                stats.invalid += 1;
            }
            Outcome::Unresolved(message) => {
                log::warn!("{}", message);
                stats.unresolved += 1;
            }
            Outcome::Integrity(e) => {
                log::error!("{}: {}", query, e);
                stats.integrity_errors += 1;
            }
        }
        Ok(())
    }
}
