use crate::errors::Result;
use crate::utils::{dump_reader, split_dump_fields, tab_tokens};
use std::io::BufRead;
use std::path::Path;

/// Name class retained from `names.dmp`; synonyms, common names etc. are dropped.
pub const SCIENTIFIC_NAME: &str = "scientific name";

/// Initial slot count for the node and name tables; enough for the current
/// NCBI taxonomy without reallocation. Tables grow past it on demand.
pub const DEFAULT_TAXON_CAPACITY: usize = 4_000_000;

/// Default exclusive bound on taxon ids; rows at or above it are skipped.
pub const DEFAULT_MAX_TAXID: u64 = 100_000_000;

/// Parent links and scientific names, indexed directly by taxon id.
///
/// Both tables are dense vectors so lookups stay O(1); they are sized from a
/// capacity hint and grow when a larger taxon id shows up, up to `max_taxid`.
#[derive(Debug)]
pub struct TaxonomyStore {
    // 0 = no parent on record
    parents: Vec<u64>,
    names: Vec<Option<Box<str>>>,
    max_taxid: u64,
    node_count: usize,
    name_count: usize,
}

impl TaxonomyStore {
    pub fn new(capacity: usize, max_taxid: u64) -> Self {
        Self {
            parents: Vec::with_capacity(capacity),
            names: Vec::with_capacity(capacity),
            max_taxid,
            node_count: 0,
            name_count: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(capacity, DEFAULT_MAX_TAXID)
    }

    /// Create a new TaxonomyStore from NCBI taxonomy files
    ///
    /// # Arguments
    ///
    /// * `nodes_filename` - Path to the nodes file
    /// * `names_filename` - Path to the names file
    /// * `capacity` - Initial table size
    /// * `max_taxid` - Taxon ids must be below this
    ///
    /// # Returns
    ///
    /// The loaded store; failing to open or read either file is an error.
    pub fn from_ncbi<P: AsRef<Path>>(
        nodes_filename: P,
        names_filename: P,
        capacity: usize,
        max_taxid: u64,
    ) -> Result<Self> {
        let mut store = Self::new(capacity, max_taxid);

        log::info!("Opening database file {:?}", nodes_filename.as_ref());
        let nodes = store.load_nodes(dump_reader(&nodes_filename)?)?;
        log::info!("Loaded {} nodes", nodes);

        log::info!("Opening database file {:?}", names_filename.as_ref());
        let names = store.load_names(dump_reader(&names_filename)?)?;
        log::info!("Loaded {} scientific names", names);

        Ok(store)
    }

    /// Parse NCBI `nodes.dmp` rows into parent links.
    ///
    /// The taxon id and parent id are the 1st and 3rd non-empty tab tokens,
    /// which covers both `562\t|\t561\t|...` and plain `562\tspecies\t561`
    /// rows. Rows without both, or with a taxon id at or above the bound, are
    /// reported and skipped.
    ///
    /// # Returns
    ///
    /// The number of rows accepted.
    pub fn load_nodes<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let mut loaded = 0;
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = tab_tokens(&line);
            let child = tokens.next().and_then(|f| f.trim().parse::<u64>().ok());
            let parent = tokens.nth(1).and_then(|f| f.trim().parse::<u64>().ok());
            match (child, parent) {
                (Some(child), Some(parent)) => {
                    if self.insert_node(child, parent) {
                        loaded += 1;
                    } else {
                        log::warn!(
                            "taxon {} on line {} of nodes file is not below {}",
                            child,
                            index + 1,
                            self.max_taxid
                        );
                    }
                }
                _ => log::warn!("bad line {} in nodes file: {:?}", index + 1, line),
            }
        }
        Ok(loaded)
    }

    /// Parse NCBI `names.dmp` rows, keeping scientific names only.
    ///
    /// When a taxon carries more than one scientific name the last row wins.
    /// A missing name class counts as "not scientific" rather than an error.
    /// Plain tab-delimited rows use the same column order.
    pub fn load_names<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let mut loaded = 0;
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields = split_dump_fields(&line);
            let taxid = fields.first().and_then(|f| f.trim().parse::<u64>().ok());
            let (taxid, name) = match (taxid, fields.get(1)) {
                (Some(taxid), Some(name)) => (taxid, *name),
                _ => {
                    log::warn!("bad line {} in names file: {:?}", index + 1, line);
                    continue;
                }
            };

            if fields.get(3).copied().unwrap_or_default() != SCIENTIFIC_NAME {
                continue;
            }
            if self.insert_name(taxid, name) {
                loaded += 1;
            } else {
                log::warn!(
                    "taxon {} on line {} of names file is not below {}",
                    taxid,
                    index + 1,
                    self.max_taxid
                );
            }
        }
        Ok(loaded)
    }

    fn slot(&self, taxid: u64) -> Option<usize> {
        if taxid < self.max_taxid {
            usize::try_from(taxid).ok()
        } else {
            None
        }
    }

    /// Record the parent link; `false` when `taxid` is out of bounds.
    pub fn insert_node(&mut self, taxid: u64, parent_id: u64) -> bool {
        let slot = match self.slot(taxid) {
            Some(slot) => slot,
            None => return false,
        };
        if slot >= self.parents.len() {
            self.parents.resize(slot + 1, 0);
        }
        if self.parents[slot] == 0 {
            self.node_count += 1;
        }
        self.parents[slot] = parent_id;
        true
    }

    pub fn insert_name(&mut self, taxid: u64, name: &str) -> bool {
        let slot = match self.slot(taxid) {
            Some(slot) => slot,
            None => return false,
        };
        if slot >= self.names.len() {
            self.names.resize(slot + 1, None);
        }
        if self.names[slot].is_none() {
            self.name_count += 1;
        }
        self.names[slot] = Some(name.into());
        true
    }

    pub fn max_taxid(&self) -> u64 {
        self.max_taxid
    }

    /// Parent of `taxid`, or `None` when the taxon has no nodes record.
    /// The root links to itself.
    pub fn parent_of(&self, taxid: u64) -> Option<u64> {
        match self.parents.get(taxid as usize) {
            Some(&parent) if parent != 0 => Some(parent),
            _ => None,
        }
    }

    pub fn name_of(&self, taxid: u64) -> Option<&str> {
        self.names.get(taxid as usize).and_then(|name| name.as_deref())
    }

    /// Number of taxa with a parent link.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of taxa with a scientific name.
    pub fn name_count(&self) -> usize {
        self.name_count
    }
}
