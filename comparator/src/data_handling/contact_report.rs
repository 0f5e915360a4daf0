//! Parser for contact report files.
//!
//! A report starts with a variable-length preamble (the query residue
//! listing), then a header line, then one line per observed contact:
//!
//! ```text
//! <aa> <res> <chain> <atom>|<distance>|<aa> <res> <chain> <atom>|<classes>
//! ```
//!
//! The first and third segments describe the query-side and
//! interacting-side atoms.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info};

use crate::data_handling::msa::LookupTable;
use crate::helper_functions::protein_from_filename;
use crate::models::{ComparatorError, InteractionRecord, InteractionTable, MappingOptions, Result};

/// Line separating the preamble from the interaction data.
pub const REPORT_HEADER: &str = "Query Chain    |Interacting Chains|";

/// Parses a contact report without consensus mapping. The interacting-side
/// residue numbers stay in the structure's own numbering.
pub fn parse_contact_report(path: &Path) -> Result<InteractionTable> {
    let protein = protein_from_filename(path)?;
    let records = read_records(path)?;
    info!(
        "Parsed {} interactions for {} from {}",
        records.len(),
        protein,
        path.display()
    );

    Ok(InteractionTable {
        source: path.to_path_buf(),
        protein,
        mapped: false,
        records,
    })
}

/// Parses a contact report and attaches consensus-mapped interacting-side
/// residue numbers.
///
/// The protein named by the filename prefix selects both the lookup column
/// and the numbering offset. Records whose lookup misses keep `None`; the
/// parse itself only fails when the alignment has no column for the protein
/// at all.
pub fn parse_contact_report_mapped(
    path: &Path,
    lut: &LookupTable,
    mapping: &MappingOptions,
) -> Result<InteractionTable> {
    let protein = protein_from_filename(path)?;
    if !lut.has_variant(&protein) {
        return Err(ComparatorError::format(
            path.display().to_string(),
            format!("alignment has no column for protein '{}'", protein),
        ));
    }
    let offset = mapping.offset_for(&protein);

    let mut records = read_records(path)?;
    let mut hits = 0usize;
    for record in &mut records {
        record.mapped_res_num = lut.map_reported(&protein, record.interacting_res_num, offset);
        if record.mapped_res_num.is_some() {
            hits += 1;
        }
    }
    debug!(
        "Consensus-mapped {}/{} interacting residues for {} (offset {})",
        hits,
        records.len(),
        protein,
        offset
    );

    Ok(InteractionTable {
        source: path.to_path_buf(),
        protein,
        mapped: true,
        records,
    })
}

fn read_records(path: &Path) -> Result<Vec<InteractionRecord>> {
    let display = path.display().to_string();
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    let mut in_data = false;
    for (idx, line) in reader.lines().enumerate() {
        // Undecodable bytes are a defect of this file's content, not a
        // read failure, and must only skip this file in a batch run.
        let line = match line {
            Ok(line) => line,
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                return Err(ComparatorError::parse(
                    display,
                    idx + 1,
                    "line is not valid UTF-8",
                ))
            }
            Err(err) => return Err(err.into()),
        };
        if !in_data {
            if line.trim_end() == REPORT_HEADER {
                in_data = true;
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_data_line(&display, idx + 1, &line)?);
    }

    if !in_data {
        return Err(ComparatorError::format(
            display,
            "report header marker not found",
        ));
    }
    Ok(records)
}

fn parse_data_line(path: &str, line_no: usize, line: &str) -> Result<InteractionRecord> {
    let segments: Vec<&str> = line.split('|').collect();
    if segments.len() != 4 {
        return Err(ComparatorError::parse(
            path,
            line_no,
            format!(
                "expected 4 pipe-delimited segments, found {}",
                segments.len()
            ),
        ));
    }

    let (query_aa, query_res_num, query_chain, query_atom) =
        split_atom_fields(path, line_no, segments[0], "query")?;
    let (interacting_aa, interacting_res_num, interacting_chain, interacting_atom) =
        split_atom_fields(path, line_no, segments[2], "interacting")?;

    let distance: f64 = segments[1].trim().parse().map_err(|_| {
        ComparatorError::parse(
            path,
            line_no,
            format!("distance '{}' is not a number", segments[1].trim()),
        )
    })?;
    if !distance.is_finite() || distance < 0.0 {
        return Err(ComparatorError::parse(
            path,
            line_no,
            format!("distance {} is not a non-negative number", distance),
        ));
    }

    Ok(InteractionRecord {
        query_aa,
        query_res_num,
        query_chain,
        query_atom,
        interacting_aa,
        interacting_res_num,
        interacting_chain,
        interacting_atom,
        distance,
        atom_classes: segments[3].trim().to_string(),
        mapped_res_num: None,
    })
}

fn split_atom_fields(
    path: &str,
    line_no: usize,
    segment: &str,
    side: &str,
) -> Result<(String, i32, String, String)> {
    let fields: Vec<&str> = segment.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(ComparatorError::parse(
            path,
            line_no,
            format!(
                "{} segment '{}' should hold 4 fields, found {}",
                side,
                segment.trim(),
                fields.len()
            ),
        ));
    }
    let res_num: i32 = fields[1].parse().map_err(|_| {
        ComparatorError::parse(
            path,
            line_no,
            format!("{} residue number '{}' is not an integer", side, fields[1]),
        )
    })?;
    Ok((
        fields[0].to_string(),
        res_num,
        fields[2].to_string(),
        fields[3].to_string(),
    ))
}
