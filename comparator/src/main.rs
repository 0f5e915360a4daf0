#![allow(unused)]

use std::env;
use std::fs::create_dir_all;
use std::path::Path;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::analysis::batch::{compare_against_reference, results_to_df, BatchConfig};
use crate::analysis::figures::{plot_bipartite_interface, plot_ged_overview};
use crate::data_handling::contact_report::parse_contact_report_mapped;
use crate::data_handling::msa::build_lookup_table;
use crate::graph::build_graph;
use crate::helper_functions::{dataframe_to_tsv, find_reports, protein_from_filename};
use crate::models::MappingOptions;

mod analysis;
mod data_handling;
mod ged;
mod graph;
mod helper_functions;
mod models;

/// Shift between residue numbers in the contact reports and the alignment's
/// own numbering. A dataset constant for the structures prepared here.
const INTERACTING_CHAIN_OFFSET: i32 = 110;

const DEFAULT_ALIGNMENT: &str = "./data/alignment/HApro97_HA1_filtered_164_alignment.txt";
const DEFAULT_REPORT_DIR: &str = "./data/contacts";
const DEFAULT_REFERENCE: &str = "./data/contacts/EPI242227__H5.3.pdb_contacts.txt";
const DEFAULT_PATTERN: &str = "H5.3";
const OUTPUT_DIR: &str = "./results";

fn main() -> anyhow::Result<()> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting interface comparison run");

    let args: Vec<String> = env::args().collect();
    let alignment_path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_ALIGNMENT);
    let report_dir = args.get(2).map(String::as_str).unwrap_or(DEFAULT_REPORT_DIR);
    let reference_path = args.get(3).map(String::as_str).unwrap_or(DEFAULT_REFERENCE);
    let pattern = args.get(4).map(String::as_str).unwrap_or(DEFAULT_PATTERN);

    create_dir_all(OUTPUT_DIR)?;

    let mut config = BatchConfig::default();
    if let Some(granularity) = args.get(5) {
        config.granularity = granularity.parse()?;
    }
    let mapping = match args.get(6) {
        Some(path) => MappingOptions::from_json(path)
            .with_context(|| format!("loading mapping options from {}", path))?,
        None => MappingOptions::with_default_offset(INTERACTING_CHAIN_OFFSET),
    };

    // Consensus lookup table, built once and reused for every report
    let lut = build_lookup_table(Path::new(alignment_path))
        .with_context(|| format!("building lookup table from {}", alignment_path))?;
    lut.write_csv(&Path::new(OUTPUT_DIR).join("consensus_lut.csv"))?;

    // Reference interface
    let reference_path = Path::new(reference_path);
    let reference_table = parse_contact_report_mapped(reference_path, &lut, &mapping)
        .with_context(|| format!("parsing reference report {}", reference_path.display()))?;
    let reference_protein = reference_table.protein.clone();
    let reference = build_graph(&reference_table, &config.graph_options());
    info!(
        "Reference {} has {} interface positions and {} contacts",
        reference_protein,
        reference.node_count(),
        reference.edge_count()
    );

    // Score everything matching the pattern against the reference
    let candidates = find_reports(Path::new(report_dir), pattern)?;
    let results = compare_against_reference(&reference, &candidates, &lut, &mapping, &config)?;

    let mut df = results_to_df(&results)?;
    let table_path = Path::new(OUTPUT_DIR).join(format!("{}__{}.tsv", pattern, reference_protein));
    dataframe_to_tsv(&mut df, &table_path)?;
    info!("Similarity table written to {}", table_path.display());

    plot_ged_overview(
        &results,
        &reference_protein,
        config.distance_cutoff,
        &Path::new(OUTPUT_DIR).join("ged_overview.png"),
    )?;
    plot_bipartite_interface(
        &reference,
        &reference_protein,
        &config.query_chain_prefix,
        &Path::new(OUTPUT_DIR).join("interface_bipartite.png"),
    )?;

    // Closest candidate gets its own bipartite view for side-by-side reading
    if let Some(best) = results.iter().min_by(|a, b| a.ged.total_cmp(&b.ged)) {
        let best_path = candidates.iter().find(|p| {
            protein_from_filename(p)
                .map(|name| name == best.protein)
                .unwrap_or(false)
        });
        if let Some(best_path) = best_path {
            let best_table = parse_contact_report_mapped(best_path, &lut, &mapping)?;
            let best_graph = build_graph(&best_table, &config.graph_options());
            plot_bipartite_interface(
                &best_graph,
                &best.protein,
                &config.query_chain_prefix,
                &Path::new(OUTPUT_DIR).join("interface_bipartite_best.png"),
            )?;
        }
    }

    info!("Run complete, outputs in {}", OUTPUT_DIR);
    Ok(())
}
