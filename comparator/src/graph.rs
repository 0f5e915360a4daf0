//! Interface graph construction.
//!
//! Nodes are interface positions at the selected granularity, edges mark an
//! observed contact between the query side and the interacting side. Node
//! identifiers double as the labels the similarity cost function compares.

use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use tracing::warn;

use crate::models::{Granularity, GraphOptions, InteractionTable};

/// Attributes carried on an interface edge. Populated only at
/// `atom-detailed` granularity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactEdge {
    pub distance: Option<f64>,
    pub classes: Option<String>,
}

/// Undirected graph over interface positions, with an identifier index for
/// duplicate-free insertion.
#[derive(Debug, Clone)]
pub struct InterfaceGraph {
    pub graph: UnGraph<String, ContactEdge>,
    pub node_index_map: HashMap<String, NodeIndex>,
}

impl InterfaceGraph {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::new_undirected(),
            node_index_map: HashMap::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index_map.contains_key(id)
    }

    /// Node identifiers in insertion order.
    pub fn labels(&self) -> Vec<&str> {
        self.graph.node_weights().map(|s| s.as_str()).collect()
    }

    /// Identifiers of nodes belonging to one chain, in insertion order.
    pub fn chain_nodes(&self, prefix: &str) -> Vec<&str> {
        self.graph
            .node_weights()
            .filter(|id| id.starts_with(prefix))
            .map(|s| s.as_str())
            .collect()
    }

    /// Number of nodes whose identifier starts with `prefix`. With the query
    /// chain's prefix this is the interface-size metric reported next to
    /// each similarity score.
    pub fn chain_node_count(&self, prefix: &str) -> usize {
        self.graph
            .node_weights()
            .filter(|id| id.starts_with(prefix))
            .count()
    }

    /// Edge data for the contact between two node identifiers, if present.
    pub fn edge_between(&self, a: &str, b: &str) -> Option<&ContactEdge> {
        let a = *self.node_index_map.get(a)?;
        let b = *self.node_index_map.get(b)?;
        let edge = self.graph.find_edge(a, b)?;
        self.graph.edge_weight(edge)
    }

    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.node_index_map.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.node_index_map.insert(id.to_string(), idx);
        idx
    }

    /// Adds both endpoints and the edge between them. A repeated pair
    /// updates the existing edge instead of duplicating it; identical
    /// endpoints keep their node but never produce a self-loop.
    pub fn add_contact(&mut self, query: &str, interacting: &str, edge: ContactEdge) {
        let a = self.ensure_node(query);
        let b = self.ensure_node(interacting);
        if a == b {
            return;
        }
        self.graph.update_edge(a, b, edge);
    }
}

impl Default for InterfaceGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the interface graph for one parsed report.
///
/// Node identifier shapes per granularity:
///
/// | granularity      | query side          | interacting side      |
/// |------------------|---------------------|-----------------------|
/// | `atom-detailed`  | `AALA10CA`          | `BGLY20CB`            |
/// | `residue-only`   | `A,ALA10`           | `B,GLY20`             |
/// | `residue-mapped` | `A,10`              | `B,<consensus #>`     |
/// | `amino-acid-only`| `A,ALA`             | `B,GLY`               |
///
/// `residue-mapped` keeps only records strictly below the distance cutoff
/// and substitutes the consensus-mapped number on the interacting side (the
/// raw number when the table carries no mapping; a lookup miss renders as an
/// empty string).
pub fn build_graph(table: &InteractionTable, options: &GraphOptions) -> InterfaceGraph {
    let mut interface = InterfaceGraph::new();

    match options.granularity {
        Granularity::AtomDetailed => {
            for record in &table.records {
                let query = format!(
                    "{}{}{}{}",
                    record.query_chain, record.query_aa, record.query_res_num, record.query_atom
                );
                let interacting = format!(
                    "{}{}{}{}",
                    record.interacting_chain,
                    record.interacting_aa,
                    record.interacting_res_num,
                    record.interacting_atom
                );
                interface.add_contact(
                    &query,
                    &interacting,
                    ContactEdge {
                        distance: Some(record.distance),
                        classes: Some(record.atom_classes.clone()),
                    },
                );
            }
        }
        Granularity::ResidueOnly => {
            for record in &table.records {
                let query = format!("{},{}{}", record.query_chain, record.query_aa, record.query_res_num);
                let interacting = format!(
                    "{},{}{}",
                    record.interacting_chain, record.interacting_aa, record.interacting_res_num
                );
                interface.add_contact(&query, &interacting, ContactEdge::default());
            }
        }
        Granularity::ResidueMapped => {
            if !table.mapped {
                warn!(
                    "Table for {} carries no consensus mapping, falling back to raw residue numbers",
                    table.protein
                );
            }
            for record in &table.records {
                if record.distance >= options.distance_cutoff {
                    continue;
                }
                let interacting_res = if table.mapped {
                    record.mapped_res_string()
                } else {
                    record.interacting_res_num.to_string()
                };
                let query = format!("{},{}", record.query_chain, record.query_res_num);
                let interacting = format!("{},{}", record.interacting_chain, interacting_res);
                interface.add_contact(&query, &interacting, ContactEdge::default());
            }
        }
        Granularity::AminoAcidOnly => {
            for record in &table.records {
                let query = format!("{},{}", record.query_chain, record.query_aa);
                let interacting =
                    format!("{},{}", record.interacting_chain, record.interacting_aa);
                interface.add_contact(&query, &interacting, ContactEdge::default());
            }
        }
    }

    interface
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::contact_report::parse_contact_report;
    use crate::models::InteractionRecord;
    use std::fs;
    use std::path::PathBuf;

    fn base_record() -> InteractionRecord {
        InteractionRecord {
            query_aa: "ALA".to_string(),
            query_res_num: 10,
            query_chain: "A".to_string(),
            query_atom: "CA".to_string(),
            interacting_aa: "GLY".to_string(),
            interacting_res_num: 20,
            interacting_chain: "B".to_string(),
            interacting_atom: "CB".to_string(),
            distance: 2.5,
            atom_classes: "hbond".to_string(),
            mapped_res_num: None,
        }
    }

    fn test_table(records: Vec<InteractionRecord>, mapped: bool) -> InteractionTable {
        InteractionTable {
            source: PathBuf::from("EPI1_test.txt"),
            protein: "EPI1".to_string(),
            mapped,
            records,
        }
    }

    #[test]
    fn amino_acid_granularity_collapses_residue_numbers() {
        let mut second = base_record();
        second.query_res_num = 44;
        second.interacting_res_num = 71;
        let table = test_table(vec![base_record(), second], false);

        let options = GraphOptions {
            granularity: Granularity::AminoAcidOnly,
            ..GraphOptions::default()
        };
        let interface = build_graph(&table, &options);

        assert_eq!(interface.node_count(), 2);
        assert_eq!(interface.edge_count(), 1);
        assert!(interface.contains_node("A,ALA"));
        assert!(interface.contains_node("B,GLY"));
    }

    #[test]
    fn mapped_granularity_applies_strict_cutoff() {
        let mut at_cutoff = base_record();
        at_cutoff.distance = 3.0;
        at_cutoff.mapped_res_num = Some(31);
        let mut below_cutoff = base_record();
        below_cutoff.distance = 2.99;
        below_cutoff.mapped_res_num = Some(32);
        let table = test_table(vec![at_cutoff, below_cutoff], true);

        let options = GraphOptions {
            granularity: Granularity::ResidueMapped,
            distance_cutoff: 3.0,
        };
        let interface = build_graph(&table, &options);

        assert!(!interface.contains_node("B,31"));
        assert!(interface.contains_node("B,32"));
        assert_eq!(interface.edge_count(), 1);
    }

    #[test]
    fn mapped_granularity_renders_lookup_misses_as_empty() {
        let mut miss = base_record();
        miss.mapped_res_num = None;
        let table = test_table(vec![miss], true);

        let options = GraphOptions {
            granularity: Granularity::ResidueMapped,
            distance_cutoff: 3.0,
        };
        let interface = build_graph(&table, &options);
        assert!(interface.contains_node("B,"));
    }

    #[test]
    fn unmapped_table_falls_back_to_raw_numbers() {
        let table = test_table(vec![base_record()], false);
        let options = GraphOptions {
            granularity: Granularity::ResidueMapped,
            distance_cutoff: 3.0,
        };
        let interface = build_graph(&table, &options);
        assert!(interface.contains_node("A,10"));
        assert!(interface.contains_node("B,20"));
    }

    #[test]
    fn atom_granularity_stores_each_contacts_own_distance() {
        let mut second = base_record();
        second.interacting_atom = "N".to_string();
        second.distance = 3.4;
        second.atom_classes = "vdw".to_string();
        let table = test_table(vec![base_record(), second], false);

        let options = GraphOptions {
            granularity: Granularity::AtomDetailed,
            ..GraphOptions::default()
        };
        let interface = build_graph(&table, &options);

        assert_eq!(interface.node_count(), 3);
        assert_eq!(interface.edge_count(), 2);

        let first = interface.edge_between("AALA10CA", "BGLY20CB").unwrap();
        let second = interface.edge_between("AALA10CA", "BGLY20N").unwrap();
        assert_eq!(first.distance, Some(2.5));
        assert_eq!(second.distance, Some(3.4));
        assert_eq!(second.classes.as_deref(), Some("vdw"));
        assert!(interface.edge_between("BGLY20CB", "BGLY20N").is_none());
    }

    #[test]
    fn identical_endpoints_never_loop() {
        let mut looped = base_record();
        looped.interacting_chain = "A".to_string();
        looped.interacting_aa = "ALA".to_string();
        let table = test_table(vec![looped], false);

        let options = GraphOptions::default();
        let interface = build_graph(&table, &options);
        assert_eq!(interface.node_count(), 1);
        assert_eq!(interface.edge_count(), 0);
    }

    #[test]
    fn residue_only_graph_from_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("EPI9_model.txt");
        fs::write(
            &path,
            "Query Chain    |Interacting Chains|\n\
             ALA 10 A CA|2.5|GLY 20 B CB|hbond\n\
             ALA 10 A CA|3.5|SER 21 B OG|hbond\n",
        )
        .unwrap();

        let table = parse_contact_report(&path).unwrap();
        let options = GraphOptions {
            granularity: Granularity::ResidueOnly,
            ..GraphOptions::default()
        };
        let interface = build_graph(&table, &options);

        assert_eq!(interface.node_count(), 3);
        assert_eq!(interface.edge_count(), 2);
        for id in ["A,ALA10", "B,GLY20", "B,SER21"] {
            assert!(interface.contains_node(id), "missing node {}", id);
        }
        assert_eq!(interface.chain_node_count("A"), 1);
        assert_eq!(interface.chain_node_count("B"), 2);
    }
}
