use std::fmt;
use std::path::{Path, PathBuf};

/// Which half of the reference database a run queries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SeqKind {
    #[default]
    Nucleotide,
    Protein,
}

impl SeqKind {
    fn short(&self) -> &'static str {
        match self {
            SeqKind::Nucleotide => "nucl",
            SeqKind::Protein => "prot",
        }
    }
}

impl fmt::Display for SeqKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SeqKind::Nucleotide => "nucleotide",
                SeqKind::Protein => "protein",
            }
        )
    }
}

/// A directory of NCBI taxonomy dumps and identifier maps.
#[derive(Debug, Clone)]
pub struct Database {
    dir: PathBuf,
    kind: SeqKind,
}

impl Database {
    pub fn new<P: AsRef<Path>>(dir: P, kind: SeqKind) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            kind,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn kind(&self) -> SeqKind {
        self.kind
    }

    pub fn nodes_path(&self) -> PathBuf {
        self.dir.join("nodes.dmp")
    }

    pub fn names_path(&self) -> PathBuf {
        self.dir.join("names.dmp")
    }

    /// `gi_taxid_nucl.dmp` or `gi_taxid_prot.dmp`
    pub fn gi_taxid_path(&self) -> PathBuf {
        self.dir.join(format!("gi_taxid_{}.dmp", self.kind.short()))
    }

    /// `acc2tax_nucl_all.txt` or `acc2tax_prot_all.txt`
    pub fn accession_path(&self) -> PathBuf {
        self.dir.join(format!("acc2tax_{}_all.txt", self.kind.short()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_naming() {
        let nucl = Database::new("/db", SeqKind::Nucleotide);
        assert_eq!(nucl.gi_taxid_path(), PathBuf::from("/db/gi_taxid_nucl.dmp"));
        assert_eq!(nucl.accession_path(), PathBuf::from("/db/acc2tax_nucl_all.txt"));
        assert_eq!(nucl.nodes_path(), PathBuf::from("/db/nodes.dmp"));

        let prot = Database::new("/db", SeqKind::Protein);
        assert_eq!(prot.gi_taxid_path(), PathBuf::from("/db/gi_taxid_prot.dmp"));
        assert_eq!(prot.accession_path(), PathBuf::from("/db/acc2tax_prot_all.txt"));
        assert_eq!(prot.names_path(), PathBuf::from("/db/names.dmp"));
    }
}
