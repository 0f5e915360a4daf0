//! Consensus lookup table built from a multiple-sequence alignment.
//!
//! Row 0 of the alignment is the consensus sequence; every later row is a
//! variant aligned against it, one character per column. Letters and the
//! identity marker `.` advance a variant's own residue counter, the gap
//! marker `-` does not. The resulting table maps each variant's own residue
//! number onto the shared consensus numbering.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info};

use crate::models::{ComparatorError, Result};

/// Mapping from each variant's own residue numbering to the shared
/// consensus numbering. Built once per analysis session, read-only after.
#[derive(Debug, Clone)]
pub struct LookupTable {
    consensus: Vec<u32>,
    variants: Vec<String>,
    columns: HashMap<String, Vec<Option<u32>>>,
    reverse: HashMap<String, HashMap<u32, u32>>,
}

impl LookupTable {
    /// Number of consensus positions. Always equals the character length of
    /// the alignment's consensus row.
    pub fn consensus_len(&self) -> usize {
        self.consensus.len()
    }

    /// Variant names in alignment order.
    pub fn variant_names(&self) -> &[String] {
        &self.variants
    }

    pub fn has_variant(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Per-consensus-position residue numbers for one variant, `None` where
    /// the variant has a gap.
    pub fn residue_numbers(&self, variant: &str) -> Option<&[Option<u32>]> {
        self.columns.get(variant).map(|c| c.as_slice())
    }

    /// Consensus position for a variant's own 1-based residue number.
    pub fn consensus_for(&self, variant: &str, own_res: u32) -> Option<u32> {
        self.reverse.get(variant)?.get(&own_res).copied()
    }

    /// Consensus position for a residue number as reported by the contact
    /// tool, whose numbering is shifted from the alignment's own numbering
    /// by a per-protein offset.
    pub fn map_reported(&self, variant: &str, reported: i32, offset: i32) -> Option<u32> {
        let own = reported.checked_sub(offset)?;
        if own < 1 {
            return None;
        }
        self.consensus_for(variant, own as u32)
    }

    /// Exports the table as CSV, one row per consensus position, empty cells
    /// where a variant has a gap.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;

        let mut header = vec!["consensus".to_string()];
        header.extend(self.variants.iter().cloned());
        wtr.write_record(&header)?;

        for row in 0..self.consensus.len() {
            let mut record = vec![self.consensus[row].to_string()];
            for name in &self.variants {
                let cell = match self.columns[name][row] {
                    Some(v) => v.to_string(),
                    None => String::new(),
                };
                record.push(cell);
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Builds the consensus lookup table from an alignment file.
///
/// Each alignment row is `<name> <sequence>`; trailing columns (Geneious
/// appends a residue count) are ignored.
pub fn build_lookup_table(path: &Path) -> Result<LookupTable> {
    let source = path.display().to_string();
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut rows: Vec<(String, String)> = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some(name), Some(sequence)) => rows.push((name.to_string(), sequence.to_string())),
            _ => {
                return Err(ComparatorError::parse(
                    source,
                    idx + 1,
                    "expected <name> <sequence>",
                ))
            }
        }
    }

    if rows.len() < 2 {
        return Err(ComparatorError::format(
            source,
            "alignment needs a consensus row and at least one variant",
        ));
    }

    let (consensus_name, consensus_seq) = &rows[0];
    if !consensus_seq.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ComparatorError::format(
            source,
            format!("consensus row '{}' must be gap-free letters", consensus_name),
        ));
    }
    let len = consensus_seq.chars().count();
    let consensus: Vec<u32> = (1..=len as u32).collect();

    let mut variants = Vec::new();
    let mut columns: HashMap<String, Vec<Option<u32>>> = HashMap::new();
    let mut reverse: HashMap<String, HashMap<u32, u32>> = HashMap::new();

    for (name, seq) in rows.iter().skip(1) {
        if columns.contains_key(name) {
            return Err(ComparatorError::format(
                source,
                format!("variant '{}' appears twice in the alignment", name),
            ));
        }
        if seq.chars().count() > len {
            return Err(ComparatorError::format(
                source,
                format!("variant '{}' is longer than the consensus", name),
            ));
        }
        debug!("Making LUT column for {}", name);

        let mut column = vec![None; len];
        let mut own: HashMap<u32, u32> = HashMap::new();
        let mut count: u32 = 0;
        for (m, ch) in seq.chars().enumerate() {
            if ch.is_ascii_alphabetic() || ch == '.' {
                count += 1;
                column[m] = Some(count);
                own.insert(count, m as u32 + 1);
            } else if ch == '-' {
                continue;
            } else {
                return Err(ComparatorError::format(
                    source,
                    format!("variant '{}' contains unrecognized character '{}'", name, ch),
                ));
            }
        }

        variants.push(name.clone());
        columns.insert(name.clone(), column);
        reverse.insert(name.clone(), own);
    }

    info!(
        "Built lookup table from {}: {} consensus positions, {} variants",
        source,
        len,
        variants.len()
    );

    Ok(LookupTable {
        consensus,
        variants,
        columns,
        reverse,
    })
}
