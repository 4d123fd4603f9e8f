use crate::errors::{Error, Result};
use crate::utils::dump_reader;
use std::io::BufRead;
use std::path::Path;

/// Default GI domain bound, one past the largest GI ever issued by GenBank.
pub const DEFAULT_MAX_GI: u64 = 1_050_000_000;

/// Dense GI -> taxon id table over the domain `[0, max_gi)`.
///
/// The table only grows as far as the largest GI loaded; `max_gi` is the
/// contract on the domain, not an allocation size.
#[derive(Debug)]
pub struct GiIndex {
    max_gi: u64,
    // 0 = unmapped
    taxids: Vec<u32>,
    entries: usize,
}

impl GiIndex {
    pub fn new(max_gi: u64) -> Self {
        Self {
            max_gi,
            taxids: Vec::new(),
            entries: 0,
        }
    }

    /// Load a `gi_taxid_{nucl,prot}.dmp` file.
    ///
    /// A GI at or beyond `max_gi` aborts the load: the bound is too low for
    /// this database and every later lookup would be suspect.
    pub fn load<P: AsRef<Path>>(path: P, max_gi: u64) -> Result<Self> {
        log::info!("Opening database file {:?}", path.as_ref());
        let index = Self::from_reader(dump_reader(&path)?, max_gi)?;
        log::info!(
            "Loaded {} GI entries (table size {})",
            index.entries,
            index.taxids.len()
        );
        Ok(index)
    }

    pub fn from_reader<R: BufRead>(reader: R, max_gi: u64) -> Result<Self> {
        let mut index = Self::new(max_gi);
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let mut fields = line.split('\t');
            let gi = fields.next().and_then(|f| f.trim().parse::<u64>().ok());
            let taxid = fields.next().and_then(|f| f.trim().parse::<u32>().ok());
            match (gi, taxid) {
                (Some(gi), Some(taxid)) => index.insert(gi, taxid)?,
                _ => log::warn!("bad line {} in GI file: {:?}", line_no + 1, line),
            }
        }
        Ok(index)
    }

    pub fn insert(&mut self, gi: u64, taxid: u32) -> Result<()> {
        if gi >= self.max_gi {
            return Err(Error::GiOutOfRange {
                gi,
                max_gi: self.max_gi,
            });
        }
        let slot = gi as usize;
        if slot >= self.taxids.len() {
            self.taxids.resize(slot + 1, 0);
        }
        if self.taxids[slot] == 0 && taxid != 0 {
            self.entries += 1;
        }
        self.taxids[slot] = taxid;
        Ok(())
    }

    /// Taxon id mapped to `gi`. `None` covers both an out-of-domain GI and
    /// an unmapped one; use [`GiIndex::lookup`] to tell them apart.
    pub fn taxon_of(&self, gi: u64) -> Option<u64> {
        self.lookup(gi).ok().flatten()
    }

    /// Checked lookup: a GI outside `[0, max_gi)` is a domain error.
    pub fn lookup(&self, gi: u64) -> Result<Option<u64>> {
        if gi >= self.max_gi {
            return Err(Error::GiOutOfRange {
                gi,
                max_gi: self.max_gi,
            });
        }
        Ok(match self.taxids.get(gi as usize) {
            Some(&taxid) if taxid != 0 => Some(taxid as u64),
            _ => None,
        })
    }

    pub fn max_gi(&self) -> u64 {
        self.max_gi
    }

    /// Number of GIs with a non-zero taxon id.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn fixture() -> GiIndex {
        GiIndex::from_reader(Cursor::new("5\t100\n9\t200\n"), 10).unwrap()
    }

    #[test]
    fn test_lookup() {
        let index = fixture();
        assert_eq!(index.taxon_of(5), Some(100));
        assert_eq!(index.taxon_of(9), Some(200));
        assert_eq!(index.taxon_of(7), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_domain_error_is_distinct_from_absent() {
        let index = fixture();
        assert!(matches!(index.lookup(7), Ok(None)));
        assert!(matches!(
            index.lookup(10),
            Err(Error::GiOutOfRange { gi: 10, max_gi: 10 })
        ));
        // the unchecked form folds both into None
        assert_eq!(index.taxon_of(10), None);
    }

    #[test]
    fn test_gi_beyond_bound_aborts_load() {
        let result = GiIndex::from_reader(Cursor::new("5\t100\n10\t200\n"), 10);
        assert!(matches!(result, Err(Error::GiOutOfRange { gi: 10, .. })));
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let index = GiIndex::from_reader(Cursor::new("5\n\nabc\t1\n3\t30\r\n"), 10).unwrap();
        assert_eq!(index.taxon_of(3), Some(30));
        assert_eq!(index.taxon_of(5), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            GiIndex::load(dir.path().join("gi_taxid_nucl.dmp"), 10),
            Err(Error::Io(_))
        ));
    }
}
