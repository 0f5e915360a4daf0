//! Figure rendering for batch results and single interfaces.
//!
//! Presentation only. The bar panels mirror the manuscript layout: GED per
//! candidate on the left, interface size on the right. The bipartite view
//! draws one interface graph with the query chain on the top row.

use std::collections::HashMap;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use crate::graph::InterfaceGraph;
use crate::models::{ComparatorError, Result, SimilarityResult};

fn plot_err<E: std::fmt::Display>(e: E) -> ComparatorError {
    ComparatorError::plot(e.to_string())
}

/// Two-panel overview of a batch run: horizontal GED bars and interface-size
/// bars, each panel sorted by its own value.
pub fn plot_ged_overview(
    results: &[SimilarityResult],
    reference_protein: &str,
    distance_cutoff: f64,
    output_path: &Path,
) -> Result<()> {
    if results.is_empty() {
        info!("No results to plot, skipping {}", output_path.display());
        return Ok(());
    }

    let path_str = output_path.display().to_string();
    let root = BitMapBackend::new(&path_str, (1600, 900)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let panels = root.split_evenly((1, 2));

    let mut by_ged: Vec<(String, f64)> = results
        .iter()
        .map(|r| (r.protein.clone(), r.ged))
        .collect();
    by_ged.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    draw_bar_panel(
        &panels[0],
        "A",
        &format!("GED from {}", reference_protein),
        &by_ged,
        BLUE.mix(0.6),
    )?;

    let mut by_size: Vec<(String, f64)> = results
        .iter()
        .map(|r| (r.protein.clone(), r.num_ir as f64))
        .collect();
    by_size.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    draw_bar_panel(
        &panels[1],
        "B",
        &format!("# of interface residues under {} Å", distance_cutoff),
        &by_size,
        RED.mix(0.5),
    )?;

    info!("Similarity overview saved to: {}", output_path.display());
    Ok(())
}

fn draw_bar_panel(
    area: &DrawingArea<BitMapBackend, Shift>,
    caption: &str,
    x_desc: &str,
    entries: &[(String, f64)],
    color: RGBAColor,
) -> Result<()> {
    let max = entries
        .iter()
        .map(|(_, v)| *v)
        .fold(0.0, f64::max)
        .max(1.0);
    let n = entries.len() as i32;

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif bold", 26))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(140)
        .build_cartesian_2d(0.0..max * 1.05, 0..n)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc(x_desc)
        .y_labels(entries.len())
        .y_label_formatter(&|idx| match entries.get(*idx as usize) {
            Some((name, _)) => name.clone(),
            None => String::new(),
        })
        .axis_desc_style(("sans-serif", 22))
        .label_style(("sans-serif", 14))
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(entries.iter().enumerate().map(|(i, (_, value))| {
            Rectangle::new([(0.0, i as i32), (*value, i as i32 + 1)], color.filled())
        }))
        .map_err(plot_err)?;

    Ok(())
}

/// Draws one interface graph with query-chain nodes along the top row and
/// interacting-chain nodes along the bottom, contacts as connecting lines.
pub fn plot_bipartite_interface(
    interface: &InterfaceGraph,
    title: &str,
    query_prefix: &str,
    output_path: &Path,
) -> Result<()> {
    let query = interface.chain_nodes(query_prefix);
    let partner: Vec<&str> = interface
        .labels()
        .into_iter()
        .filter(|id| !id.starts_with(query_prefix))
        .collect();

    let mut positions: HashMap<&str, (f64, f64)> = HashMap::new();
    for (i, id) in query.iter().copied().enumerate() {
        positions.insert(id, ((i + 1) as f64 / (query.len() + 1) as f64, 0.72));
    }
    for (i, id) in partner.iter().copied().enumerate() {
        positions.insert(id, ((i + 1) as f64 / (partner.len() + 1) as f64, 0.28));
    }

    let path_str = output_path.display().to_string();
    let root = BitMapBackend::new(&path_str, (1400, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif bold", 24))
        .margin(20)
        .build_cartesian_2d(0.0..1.0, 0.0..1.0)
        .map_err(plot_err)?;

    // contacts first so the nodes sit on top of them
    for edge in interface.graph.edge_indices() {
        if let Some((a, b)) = interface.graph.edge_endpoints(edge) {
            let from = positions[interface.graph[a].as_str()];
            let to = positions[interface.graph[b].as_str()];
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![from, to],
                    BLACK.mix(0.4).stroke_width(2),
                )))
                .map_err(plot_err)?;
        }
    }

    for (id, &(x, y)) in &positions {
        chart
            .draw_series(std::iter::once(Circle::new(
                (x, y),
                26,
                BLUE.mix(0.8).filled(),
            )))
            .map_err(plot_err)?;
        chart
            .draw_series(std::iter::once(Text::new(
                id.to_string(),
                (x, y + 0.09),
                ("sans-serif", 14),
            )))
            .map_err(plot_err)?;
    }

    info!("Bipartite interface saved to: {}", output_path.display());
    Ok(())
}
