//! String accession -> taxon id resolution by binary search directly over the
//! byte offsets of a sorted `acc2tax_{nucl,prot}_all.txt` file.
//!
//! Nothing is indexed up front. Every probe lands on an arbitrary byte, backs
//! up to the start of the line containing it, and compares that line's
//! accession with the query. Records are `accession\tversion\ttaxid\tgi`,
//! newline terminated, sorted byte-wise on the accession column.
use crate::errors::Result;
use crate::utils::{format_bytes, open_file, parse_u64_or_zero};
use memmap2::Mmap;
use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Default convergence threshold in bytes for [`Convergence::Threshold`].
pub const DEFAULT_THRESHOLD: u64 = 20;

/// Below two bytes a threshold search can stall on `low = mid`.
pub const MIN_THRESHOLD: u64 = 2;

const BACKSCAN_CHUNK: usize = 64;
const LINE_BUF_SIZE: usize = 256;

/// One row of the accession file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessionRecord {
    pub accession: String,
    pub version: String,
    pub taxid: u64,
    pub gi: u64,
}

impl AccessionRecord {
    /// Split a raw line on tabs. Missing trailing columns default to empty / 0.
    pub fn parse(line: &[u8]) -> Self {
        let line = String::from_utf8_lossy(trim_newline(line));
        let mut fields = line.split('\t');
        let accession = fields.next().unwrap_or_default().to_string();
        let version = fields.next().unwrap_or_default().to_string();
        let taxid = fields.next().map(parse_u64_or_zero).unwrap_or(0);
        let gi = fields.next().map(parse_u64_or_zero).unwrap_or(0);
        Self {
            accession,
            version,
            taxid,
            gi,
        }
    }
}

fn trim_newline(mut line: &[u8]) -> &[u8] {
    while let Some((&last, rest)) = line.split_last() {
        if last == b'\n' || last == b'\r' {
            line = rest;
        } else {
            break;
        }
    }
    line
}

/// The leading accession column of a raw line.
fn accession_field(line: &[u8]) -> &[u8] {
    let line = trim_newline(line);
    match line.iter().position(|&b| b == b'\t') {
        Some(tab) => &line[..tab],
        None => line,
    }
}

/// A line found by [`LineSource::line_at`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Offset of the first byte of the line.
    pub start: u64,
    /// Offset one past the terminating newline (or the end of the source).
    pub end: u64,
    /// Line content without the newline.
    pub bytes: Vec<u8>,
}

/// Byte-addressable text whose line boundaries are unknown in advance.
pub trait LineSource {
    /// Total length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The line containing byte `pos`.
    ///
    /// The line starts one past the last newline strictly before `pos` (or at
    /// 0) and runs through the next newline at or after `pos`. A newline byte
    /// belongs to the line it terminates. `pos` is clamped to `len()`.
    fn line_at(&mut self, pos: u64) -> io::Result<Line>;

    /// The record a search probe at `pos` lands in.
    ///
    /// Same as [`line_at`](Self::line_at) except for a newline exactly at
    /// `pos`: the probe then counts as past the end of that line and the
    /// record after it is returned.
    fn record_at(&mut self, pos: u64) -> io::Result<Line> {
        let next = pos.saturating_add(1).min(self.len());
        self.line_at(next)
    }
}

impl<'a> LineSource for Box<dyn LineSource + Send + 'a> {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn line_at(&mut self, pos: u64) -> io::Result<Line> {
        (**self).line_at(pos)
    }
}

/// A [`LineSource`] over any seekable reader: backs up from the probe offset
/// with small positioned reads, then reads the line forward.
pub struct SeekLines<R> {
    inner: R,
    len: u64,
}

impl<R: Read + Seek> SeekLines<R> {
    pub fn new(mut inner: R) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(Self { inner, len })
    }

    fn line_start(&mut self, pos: u64) -> io::Result<u64> {
        let mut buf = [0u8; BACKSCAN_CHUNK];
        let mut cursor = pos;
        while cursor > 0 {
            let window = cursor.min(BACKSCAN_CHUNK as u64) as usize;
            let from = cursor - window as u64;
            self.inner.seek(SeekFrom::Start(from))?;
            self.inner.read_exact(&mut buf[..window])?;
            if let Some(nl) = buf[..window].iter().rposition(|&b| b == b'\n') {
                return Ok(from + nl as u64 + 1);
            }
            cursor = from;
        }
        Ok(0)
    }
}

impl<R: Read + Seek> LineSource for SeekLines<R> {
    fn len(&self) -> u64 {
        self.len
    }

    fn line_at(&mut self, pos: u64) -> io::Result<Line> {
        let pos = pos.min(self.len);
        let start = self.line_start(pos)?;
        self.inner.seek(SeekFrom::Start(start))?;

        let mut bytes = Vec::new();
        let read = BufReader::with_capacity(LINE_BUF_SIZE, &mut self.inner)
            .read_until(b'\n', &mut bytes)?;
        let content = trim_newline(&bytes).len();
        bytes.truncate(content);
        Ok(Line {
            start,
            end: start + read as u64,
            bytes,
        })
    }
}

/// A [`LineSource`] over an in-memory or memory-mapped buffer. Reads are
/// positioned, so any number of these may share one mapping.
#[derive(Debug, Clone, Copy)]
pub struct SliceLines<'a> {
    data: &'a [u8],
}

impl<'a> SliceLines<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> LineSource for SliceLines<'a> {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn line_at(&mut self, pos: u64) -> io::Result<Line> {
        let pos = (pos as usize).min(self.data.len());
        let start = self.data[..pos]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |nl| nl + 1);
        let end = self.data[start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.data.len(), |nl| start + nl + 1);
        Ok(Line {
            start: start as u64,
            end: end as u64,
            bytes: trim_newline(&self.data[start..end]).to_vec(),
        })
    }
}

/// When the byte-range binary search gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// Stop once the probed range is narrower than this many bytes.
    ///
    /// Probes move `low`/`high` to raw midpoints, not line boundaries, so a
    /// record can be left unprobed inside the final window when lines are
    /// short relative to the threshold.
    Threshold(u64),
    /// Snap the range to line boundaries after every probe and stop only when
    /// it is empty. Finds every present record in a sorted file.
    Exact,
}

impl Default for Convergence {
    fn default() -> Self {
        Convergence::Threshold(DEFAULT_THRESHOLD)
    }
}

/// Binary search over a sorted accession file.
pub struct AccessionResolver<S> {
    source: S,
    convergence: Convergence,
}

impl<S: LineSource> AccessionResolver<S> {
    pub fn new(source: S, convergence: Convergence) -> Self {
        let convergence = match convergence {
            Convergence::Threshold(bytes) => Convergence::Threshold(bytes.max(MIN_THRESHOLD)),
            exact => exact,
        };
        Self {
            source,
            convergence,
        }
    }

    pub fn convergence(&self) -> Convergence {
        self.convergence
    }

    /// Look up `query` by byte-wise comparison with the accession column.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the search converges without an exact match; I/O
    /// errors on the underlying source are passed through.
    pub fn find(&mut self, query: &str) -> io::Result<Option<AccessionRecord>> {
        match self.convergence {
            Convergence::Threshold(bytes) => self.find_with_threshold(query.as_bytes(), bytes),
            Convergence::Exact => self.find_exact(query.as_bytes()),
        }
    }

    fn find_with_threshold(
        &mut self,
        query: &[u8],
        threshold: u64,
    ) -> io::Result<Option<AccessionRecord>> {
        let mut low = 0;
        let mut high = self.source.len();

        loop {
            let mid = low + (high - low) / 2;
            let line = self.source.record_at(mid)?;
            log::trace!("probe [{}, {}) mid {} line @{}", low, high, mid, line.start);

            match accession_field(&line.bytes).cmp(query) {
                Ordering::Equal => return Ok(Some(AccessionRecord::parse(&line.bytes))),
                Ordering::Greater => high = mid,
                Ordering::Less => low = mid,
            }

            if high - low < threshold {
                return Ok(None);
            }
        }
    }

    fn find_exact(&mut self, query: &[u8]) -> io::Result<Option<AccessionRecord>> {
        // low and high always sit on line boundaries
        let mut low = 0;
        let mut high = self.source.len();

        while low < high {
            let mid = low + (high - low) / 2;
            let line = self.source.line_at(mid)?;
            log::trace!("probe [{}, {}) mid {} line @{}", low, high, mid, line.start);

            match accession_field(&line.bytes).cmp(query) {
                Ordering::Equal => return Ok(Some(AccessionRecord::parse(&line.bytes))),
                Ordering::Greater => high = line.start,
                Ordering::Less => low = line.end,
            }
        }
        Ok(None)
    }
}

/// The accession reference file, held open for the whole batch.
///
/// With `mmap` the file is mapped once and every resolver reads the shared
/// mapping; otherwise resolvers seek and read through a file handle.
pub struct AccessionFile {
    path: PathBuf,
    file: File,
    size: u64,
    mmap: Option<Mmap>,
    convergence: Convergence,
}

impl AccessionFile {
    pub fn open<P: AsRef<Path>>(path: P, convergence: Convergence, mmap: bool) -> Result<Self> {
        log::info!("Opening database file {:?}", path.as_ref());
        let file = open_file(&path)?;
        let size = file.metadata()?.len();
        log::info!("File size: {} ({})", size, format_bytes(size as f64));

        let mmap = if mmap && size > 0 {
            Some(unsafe { Mmap::map(&file)? })
        } else {
            None
        };

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            file,
            size,
            mmap,
            convergence,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn convergence(&self) -> Convergence {
        self.convergence
    }

    /// Resolver reading through the handle opened at startup. Only one of
    /// these should be active at a time since they share the file cursor.
    pub fn resolver(&self) -> Result<AccessionResolver<Box<dyn LineSource + Send + '_>>> {
        let source: Box<dyn LineSource + Send + '_> = match &self.mmap {
            Some(mmap) => Box::new(SliceLines::new(mmap)),
            None => Box::new(SeekLines::new(&self.file)?),
        };
        Ok(AccessionResolver::new(source, self.convergence))
    }

    /// Resolver for a parallel worker: its own file handle, or the shared
    /// mapping, so workers never contend on a seek position.
    pub fn worker_resolver(&self) -> Result<AccessionResolver<Box<dyn LineSource + Send + '_>>> {
        let source: Box<dyn LineSource + Send + '_> = match &self.mmap {
            Some(mmap) => Box::new(SliceLines::new(mmap)),
            None => Box::new(SeekLines::new(open_file(&self.path)?)?),
        };
        Ok(AccessionResolver::new(source, self.convergence))
    }
}
