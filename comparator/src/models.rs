use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the interface comparison pipeline.
#[derive(Error, Debug)]
pub enum ComparatorError {
    /// A required structural marker is missing (header line, consensus row,
    /// filename protein prefix).
    #[error("format error in {path}: {message}")]
    Format { path: String, message: String },

    /// A data line does not decompose into the expected field shape.
    #[error("parse error in {path} at line {line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    /// Invalid option or configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// The edit-distance search exhausted its budget before finding any
    /// complete node mapping.
    #[error("no complete node mapping found within {budget:?}")]
    Timeout { budget: Duration },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("plot error: {0}")]
    Plot(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ComparatorError {
    pub fn format(path: impl Into<String>, message: impl Into<String>) -> Self {
        ComparatorError::Format {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn parse(path: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        ComparatorError::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ComparatorError::Config(message.into())
    }

    pub fn timeout(budget: Duration) -> Self {
        ComparatorError::Timeout { budget }
    }

    pub fn plot(message: impl Into<String>) -> Self {
        ComparatorError::Plot(message.into())
    }

    /// Per-file failures the batch loop logs and skips. Everything else
    /// aborts the whole run.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            ComparatorError::Format { .. }
                | ComparatorError::Parse { .. }
                | ComparatorError::Timeout { .. }
        )
    }
}

/// Result type alias for comparator operations.
pub type Result<T> = std::result::Result<T, ComparatorError>;

/// One reported contact between an atom on the query chain and an atom on an
/// interacting chain.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRecord {
    pub query_aa: String,
    pub query_res_num: i32,
    pub query_chain: String,
    pub query_atom: String,
    pub interacting_aa: String,
    pub interacting_res_num: i32,
    pub interacting_chain: String,
    pub interacting_atom: String,
    /// Inter-atomic distance in angstroms.
    pub distance: f64,
    /// Interaction class label, taken verbatim from the report.
    pub atom_classes: String,
    /// Consensus-numbered replacement for `interacting_res_num`. Populated
    /// only when the table was parsed with a lookup table and the lookup hit.
    pub mapped_res_num: Option<u32>,
}

impl InteractionRecord {
    /// Mapped residue number rendered for node identifiers. A lookup miss
    /// renders as the empty string rather than failing.
    pub fn mapped_res_string(&self) -> String {
        match self.mapped_res_num {
            Some(n) => n.to_string(),
            None => String::new(),
        }
    }
}

/// Normalized contents of one contact report file.
#[derive(Debug, Clone)]
pub struct InteractionTable {
    /// File the table was parsed from.
    pub source: PathBuf,
    /// Protein identifier recovered from the filename prefix.
    pub protein: String,
    /// Whether `mapped_res_num` was populated from a lookup table.
    pub mapped: bool,
    pub records: Vec<InteractionRecord>,
}

impl InteractionTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Abstraction level at which an interface graph is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Full atom identity per node, distance and class carried on each edge.
    AtomDetailed,
    /// Chain, amino acid and residue number; atoms and distances dropped.
    ResidueOnly,
    /// Chain and consensus-mapped residue number, distance-filtered.
    ResidueMapped,
    /// Chain and amino acid identity only.
    AminoAcidOnly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::AtomDetailed => "atom-detailed",
            Granularity::ResidueOnly => "residue-only",
            Granularity::ResidueMapped => "residue-mapped",
            Granularity::AminoAcidOnly => "amino-acid-only",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ComparatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "atom-detailed" => Ok(Granularity::AtomDetailed),
            "residue-only" => Ok(Granularity::ResidueOnly),
            "residue-mapped" => Ok(Granularity::ResidueMapped),
            "amino-acid-only" => Ok(Granularity::AminoAcidOnly),
            other => Err(ComparatorError::config(format!(
                "unknown granularity '{}', expected atom-detailed, residue-only, residue-mapped or amino-acid-only",
                other
            ))),
        }
    }
}

/// Options controlling interface graph construction.
#[derive(Debug, Clone, Copy)]
pub struct GraphOptions {
    pub granularity: Granularity,
    /// Strict upper bound on contact distance. Only applied at
    /// `residue-mapped` granularity.
    pub distance_cutoff: f64,
}

impl Default for GraphOptions {
    fn default() -> Self {
        GraphOptions {
            granularity: Granularity::AminoAcidOnly,
            distance_cutoff: 3.0,
        }
    }
}

/// Offset between reported interacting-chain residue numbers and the
/// alignment's own numbering, per protein.
///
/// These are dataset constants supplied by whoever prepared the structures;
/// they cannot be derived from the inputs themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingOptions {
    pub default_offset: i32,
    #[serde(default)]
    pub per_protein: HashMap<String, i32>,
}

impl MappingOptions {
    pub fn with_default_offset(offset: i32) -> Self {
        MappingOptions {
            default_offset: offset,
            per_protein: HashMap::new(),
        }
    }

    pub fn offset_for(&self, protein: &str) -> i32 {
        self.per_protein
            .get(protein)
            .copied()
            .unwrap_or(self.default_offset)
    }

    pub fn from_json(path: &str) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

/// One scored file-vs-reference comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    pub protein: String,
    pub ged: f64,
    /// Number of query-chain nodes in the candidate's interface graph.
    pub num_ir: u32,
}
