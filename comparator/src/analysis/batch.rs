//! Batch comparison of many contact reports against one reference graph.

use std::path::{Path, PathBuf};
use std::time::Duration;

use polars::prelude::*;
use tracing::{debug, error, info};

use crate::data_handling::contact_report::parse_contact_report_mapped;
use crate::data_handling::msa::LookupTable;
use crate::ged::{graph_edit_distance, label_substitution_cost};
use crate::graph::{build_graph, InterfaceGraph};
use crate::models::{
    Granularity, GraphOptions, MappingOptions, Result, SimilarityResult,
};

/// Settings shared by every comparison in a batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub granularity: Granularity,
    pub distance_cutoff: f64,
    /// Wall-clock budget for each edit-distance search.
    pub ged_budget: Duration,
    /// Identifier prefix marking query-chain nodes, used for the
    /// interface-size metric.
    pub query_chain_prefix: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            granularity: Granularity::ResidueMapped,
            distance_cutoff: 3.0,
            ged_budget: Duration::from_secs(4),
            query_chain_prefix: "A".to_string(),
        }
    }
}

impl BatchConfig {
    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            granularity: self.granularity,
            distance_cutoff: self.distance_cutoff,
        }
    }
}

/// Scores every candidate report against the reference graph.
///
/// A candidate that fails to parse, map or finish its edit-distance search
/// is logged and omitted from the results; it never aborts the batch. Only
/// an unreadable path stops the run.
pub fn compare_against_reference(
    reference: &InterfaceGraph,
    candidates: &[PathBuf],
    lut: &LookupTable,
    mapping: &MappingOptions,
    config: &BatchConfig,
) -> Result<Vec<SimilarityResult>> {
    let options = config.graph_options();
    info!(
        "Comparing {} reports against the reference at {} granularity",
        candidates.len(),
        config.granularity
    );

    let mut results = Vec::new();
    for path in candidates {
        debug!("Comparing {}", path.display());
        match compare_one(reference, path, lut, mapping, &options, config) {
            Ok(result) => {
                info!(
                    "{}: ged {} with {} interface residues",
                    result.protein, result.ged, result.num_ir
                );
                results.push(result);
            }
            Err(e) if e.is_skippable() => {
                error!("Skipping {}: {}", path.display(), e);
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "Scored {}/{} reports successfully",
        results.len(),
        candidates.len()
    );
    Ok(results)
}

fn compare_one(
    reference: &InterfaceGraph,
    path: &Path,
    lut: &LookupTable,
    mapping: &MappingOptions,
    options: &GraphOptions,
    config: &BatchConfig,
) -> Result<SimilarityResult> {
    let table = parse_contact_report_mapped(path, lut, mapping)?;
    let candidate = build_graph(&table, options);
    let ged = graph_edit_distance(
        reference,
        &candidate,
        label_substitution_cost,
        config.ged_budget,
    )?;
    let num_ir = candidate.chain_node_count(&config.query_chain_prefix) as u32;

    Ok(SimilarityResult {
        protein: table.protein,
        ged,
        num_ir,
    })
}

/// Collects batch results into a table keyed by protein, sorted for export.
pub fn results_to_df(results: &[SimilarityResult]) -> PolarsResult<DataFrame> {
    let proteins: Vec<&str> = results.iter().map(|r| r.protein.as_str()).collect();
    let geds: Vec<f64> = results.iter().map(|r| r.ged).collect();
    let num_irs: Vec<u32> = results.iter().map(|r| r.num_ir).collect();

    let df = df!(
        "protein" => proteins,
        "ged" => geds,
        "num_ir" => num_irs,
    )?
    .sort(["protein"], SortMultipleOptions::default())?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::msa::build_lookup_table;
    use crate::models::ComparatorError;
    use std::fs;

    const REPORT: &str = "Query Chain    |Interacting Chains|\n\
                          ALA 10 A CA|2.5|GLY 112 B CB|hbond\n";

    #[test]
    fn batch_skips_bad_files_and_keeps_going() {
        let dir = tempfile::tempdir().unwrap();
        let alignment = dir.path().join("alignment.txt");
        fs::write(&alignment, "Consensus MKTAY\nEPI111 .....\nEPI222 .....\n").unwrap();
        let lut = build_lookup_table(&alignment).unwrap();
        let mapping = MappingOptions::with_default_offset(110);
        let config = BatchConfig::default();

        let good1 = dir.path().join("EPI111_model.txt");
        fs::write(&good1, REPORT).unwrap();
        let good2 = dir.path().join("EPI222_model.txt");
        fs::write(&good2, REPORT).unwrap();
        // no column in the alignment for this one
        let bad = dir.path().join("EPI333_model.txt");
        fs::write(&bad, REPORT).unwrap();

        let ref_table = parse_contact_report_mapped(&good1, &lut, &mapping).unwrap();
        let reference = build_graph(&ref_table, &config.graph_options());

        let candidates = vec![good2, bad, good1];
        let results =
            compare_against_reference(&reference, &candidates, &lut, &mapping, &config).unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.ged == 0.0));
        assert!(results.iter().all(|r| r.num_ir == 1));
        assert!(results.iter().any(|r| r.protein == "EPI111"));
        assert!(results.iter().any(|r| r.protein == "EPI222"));
    }

    #[test]
    fn corrupt_candidate_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let alignment = dir.path().join("alignment.txt");
        fs::write(&alignment, "Consensus MKTAY\nEPI111 .....\nEPI222 .....\n").unwrap();
        let lut = build_lookup_table(&alignment).unwrap();
        let mapping = MappingOptions::with_default_offset(110);
        let config = BatchConfig::default();

        let good = dir.path().join("EPI111_model.txt");
        fs::write(&good, REPORT).unwrap();
        let corrupt = dir.path().join("EPI222_model.txt");
        let mut contents = b"Query Chain    |Interacting Chains|\n".to_vec();
        contents.extend_from_slice(b"\xff\xfeALA 10 A CA|2.5|GLY 112 B CB|hbond\n");
        fs::write(&corrupt, contents).unwrap();

        let ref_table = parse_contact_report_mapped(&good, &lut, &mapping).unwrap();
        let reference = build_graph(&ref_table, &config.graph_options());

        let results = compare_against_reference(
            &reference,
            &[corrupt, good],
            &lut,
            &mapping,
            &config,
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].protein, "EPI111");
    }

    #[test]
    fn unreadable_path_aborts_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let alignment = dir.path().join("alignment.txt");
        fs::write(&alignment, "Consensus MKTAY\nEPI111 .....\n").unwrap();
        let lut = build_lookup_table(&alignment).unwrap();

        let missing = dir.path().join("EPI111_not_there.txt");
        let err = compare_against_reference(
            &InterfaceGraph::new(),
            &[missing],
            &lut,
            &MappingOptions::default(),
            &BatchConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ComparatorError::Io(_)));
    }

    #[test]
    fn results_table_is_sorted_by_protein() {
        let results = vec![
            SimilarityResult {
                protein: "EPI999".to_string(),
                ged: 7.0,
                num_ir: 12,
            },
            SimilarityResult {
                protein: "EPI100".to_string(),
                ged: 3.0,
                num_ir: 9,
            },
        ];

        let df = results_to_df(&results).unwrap();
        assert_eq!(df.shape(), (2, 3));

        let proteins = df.column("protein").unwrap().str().unwrap();
        assert_eq!(proteins.get(0), Some("EPI100"));
        assert_eq!(proteins.get(1), Some("EPI999"));
        let geds = df.column("ged").unwrap().f64().unwrap();
        assert_eq!(geds.get(0), Some(3.0));
        let sizes = df.column("num_ir").unwrap().u32().unwrap();
        assert_eq!(sizes.get(0), Some(9));
    }
}
