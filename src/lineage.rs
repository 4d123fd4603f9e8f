use crate::errors::{Error, Result};
use crate::taxonomy::TaxonomyStore;
use crate::ROOT_TAXID;

/// Placeholder for a taxon without a scientific name, and the whole lineage
/// of an accession mapped to taxon 0.
pub const UNKNOWN: &str = "Unknown";

/// Default bound on parent hops before a walk is declared cyclic.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Walks parent links from a taxon up to the root.
pub struct LineageBuilder<'a> {
    taxonomy: &'a TaxonomyStore,
    max_depth: usize,
}

impl<'a> LineageBuilder<'a> {
    pub fn new(taxonomy: &'a TaxonomyStore, max_depth: usize) -> Self {
        Self {
            taxonomy,
            max_depth,
        }
    }

    /// Taxon ids from just below the root down to `taxid`.
    ///
    /// The root itself is never included, so the root's lineage is empty.
    /// The walk also ends at a taxon with no nodes record. Needing more than
    /// `max_depth` hops is reported as [`Error::LineageTooDeep`].
    pub fn lineage_ids(&self, taxid: u64) -> Result<Vec<u64>> {
        let mut path = Vec::new();
        let mut current = taxid;

        while current > ROOT_TAXID {
            if path.len() >= self.max_depth {
                return Err(Error::LineageTooDeep {
                    taxid,
                    max_depth: self.max_depth,
                });
            }
            path.push(current);
            match self.taxonomy.parent_of(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }

        path.reverse();
        Ok(path)
    }

    /// Scientific names root-first, `Unknown` standing in for missing ones.
    pub fn lineage_of(&self, taxid: u64) -> Result<Vec<&'a str>> {
        let taxonomy = self.taxonomy;
        let names = self
            .lineage_ids(taxid)?
            .into_iter()
            .map(|id| {
                taxonomy.name_of(id).unwrap_or_else(|| {
                    log::warn!("no name for node {}", id);
                    UNKNOWN
                })
            })
            .collect();
        Ok(names)
    }

    /// Comma-joined lineage; taxon 0 renders as `Unknown` without a walk.
    pub fn render(&self, taxid: u64) -> Result<String> {
        if taxid == 0 {
            return Ok(UNKNOWN.to_string());
        }
        Ok(self.lineage_of(taxid)?.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::tests::fixture_store;

    #[test]
    fn test_lineage_ids() {
        let store = fixture_store();
        let builder = LineageBuilder::new(&store, DEFAULT_MAX_DEPTH);
        assert_eq!(
            builder.lineage_ids(562).unwrap(),
            [131567, 2, 1224, 1236, 91347, 543, 561, 562]
        );
        assert_eq!(builder.lineage_ids(2).unwrap(), [131567, 2]);
    }

    #[test]
    fn test_root_has_empty_lineage() {
        let store = fixture_store();
        let builder = LineageBuilder::new(&store, DEFAULT_MAX_DEPTH);
        assert!(builder.lineage_ids(ROOT_TAXID).unwrap().is_empty());
        assert_eq!(builder.render(ROOT_TAXID).unwrap(), "");
    }

    #[test]
    fn test_lineage_ends_with_queried_name() {
        let store = fixture_store();
        let builder = LineageBuilder::new(&store, DEFAULT_MAX_DEPTH);
        for taxid in [2, 131567, 1224, 1236, 91347, 543, 561, 562] {
            let names = builder.lineage_of(taxid).unwrap();
            assert_eq!(names.last().copied(), store.name_of(taxid), "taxid {}", taxid);
        }
    }

    #[test]
    fn test_render() {
        let store = fixture_store();
        let builder = LineageBuilder::new(&store, DEFAULT_MAX_DEPTH);
        assert_eq!(
            builder.render(562).unwrap(),
            "cellular organisms,Bacteria,Pseudomonadota,Gammaproteobacteria,Enterobacterales,Enterobacteriaceae,Escherichia,Escherichia coli"
        );
        assert_eq!(builder.render(0).unwrap(), UNKNOWN);
    }

    #[test]
    fn test_missing_name_becomes_unknown() {
        let mut store = fixture_store();
        store.insert_node(999, 561);
        let builder = LineageBuilder::new(&store, DEFAULT_MAX_DEPTH);
        let names = builder.lineage_of(999).unwrap();
        assert_eq!(names.len(), 8);
        assert_eq!(names[6], "Escherichia");
        assert_eq!(names[7], UNKNOWN);
    }

    #[test]
    fn test_unlinked_taxon_stops_walk() {
        let store = fixture_store();
        let builder = LineageBuilder::new(&store, DEFAULT_MAX_DEPTH);
        // no nodes record: the taxon itself is all there is
        assert_eq!(builder.lineage_ids(777).unwrap(), [777]);
        assert_eq!(builder.render(777).unwrap(), UNKNOWN);
    }

    #[test]
    fn test_cycle_is_an_integrity_error() {
        let mut store = TaxonomyStore::with_capacity(0);
        store.insert_node(10, 11);
        store.insert_node(11, 10);
        let builder = LineageBuilder::new(&store, 16);
        assert!(matches!(
            builder.lineage_ids(10),
            Err(Error::LineageTooDeep { taxid: 10, max_depth: 16 })
        ));
    }

    #[test]
    fn test_depth_guard_is_exact() {
        let mut store = TaxonomyStore::with_capacity(0);
        // chain 2 -> 3 -> ... -> 6 -> root: five hops below the root
        store.insert_node(2, 1);
        for taxid in 3..=6 {
            store.insert_node(taxid, taxid - 1);
        }
        assert_eq!(LineageBuilder::new(&store, 5).lineage_ids(6).unwrap().len(), 5);
        assert!(LineageBuilder::new(&store, 4).lineage_ids(6).is_err());
    }
}
