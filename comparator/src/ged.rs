//! Approximate graph edit distance under a wall-clock budget.
//!
//! Depth-first search over injective node assignments from the first graph
//! into the second, with a deletion branch at every level. Costs are the
//! uniform unit scheme: node insertion/deletion 1, edge insertion/deletion
//! 1, node substitution priced by the caller's cost function. The search
//! expands cheapest candidates first and keeps the best complete mapping
//! found, so cutting it off at the deadline still yields a valid upper
//! bound on the true distance.

use std::time::{Duration, Instant};

use log::debug;

use crate::graph::InterfaceGraph;
use crate::models::{ComparatorError, Result};

/// Node substitution cost used throughout the pipeline: free when the two
/// labels agree, unit cost otherwise.
pub fn label_substitution_cost(a: &str, b: &str) -> f64 {
    if a == b {
        0.0
    } else {
        1.0
    }
}

/// Computes an approximate edit distance between two interface graphs.
///
/// Returns the cost of the best complete node mapping discovered before the
/// budget expires. When the deadline is hit first the best-so-far value is
/// returned; if not even one complete mapping was reached in time the
/// comparison fails with a timeout error the caller is expected to log and
/// skip.
pub fn graph_edit_distance<F>(
    g1: &InterfaceGraph,
    g2: &InterfaceGraph,
    node_subst_cost: F,
    budget: Duration,
) -> Result<f64>
where
    F: Fn(&str, &str) -> f64,
{
    let mut search = EditSearch::new(g1, g2, &node_subst_cost, Instant::now() + budget);
    search.dfs(0, 0.0);

    if search.best.is_finite() {
        if search.timed_out {
            debug!(
                "Edit-distance budget of {:?} expired, keeping best mapping found ({})",
                budget, search.best
            );
        }
        Ok(search.best)
    } else {
        Err(ComparatorError::timeout(budget))
    }
}

struct EditSearch<'a, F> {
    labels1: Vec<&'a str>,
    labels2: Vec<&'a str>,
    adj1: Vec<Vec<bool>>,
    adj2: Vec<Vec<bool>>,
    /// First-graph nodes in processing order, highest degree first.
    order: Vec<usize>,
    cost: &'a F,
    deadline: Instant,
    /// Assignment per processing position, `None` marking deletion.
    assignment: Vec<Option<usize>>,
    used2: Vec<bool>,
    used2_count: usize,
    /// Second-graph edges already priced against the partial mapping.
    e2_accounted: usize,
    m2: usize,
    best: f64,
    timed_out: bool,
}

impl<'a, F> EditSearch<'a, F>
where
    F: Fn(&str, &str) -> f64,
{
    fn new(g1: &'a InterfaceGraph, g2: &'a InterfaceGraph, cost: &'a F, deadline: Instant) -> Self {
        let labels1 = g1.labels();
        let labels2 = g2.labels();
        let adj1 = adjacency(g1);
        let adj2 = adjacency(g2);

        let degrees: Vec<usize> = adj1
            .iter()
            .map(|row| row.iter().filter(|&&e| e).count())
            .collect();
        let mut order: Vec<usize> = (0..labels1.len()).collect();
        order.sort_by(|&a, &b| degrees[b].cmp(&degrees[a]).then_with(|| a.cmp(&b)));

        let n1 = labels1.len();
        let n2 = labels2.len();
        EditSearch {
            labels1,
            labels2,
            adj1,
            adj2,
            order,
            cost,
            deadline,
            assignment: vec![None; n1],
            used2: vec![false; n2],
            used2_count: 0,
            e2_accounted: 0,
            m2: g2.edge_count(),
            best: f64::INFINITY,
            timed_out: false,
        }
    }

    /// Cost of giving position `k` (first-graph node `u`) the assignment
    /// `v`, relative to the positions already assigned, plus the number of
    /// second-graph edges that assignment settles.
    fn assign_delta(&self, k: usize, u: usize, v: Option<usize>) -> (f64, usize) {
        let mut delta = match v {
            Some(v) => (self.cost)(self.labels1[u], self.labels2[v]),
            None => 1.0,
        };
        let mut accounted = 0;

        for j in 0..k {
            let e1 = self.adj1[u][self.order[j]];
            match (v, self.assignment[j]) {
                (Some(v), Some(vj)) => {
                    let e2 = self.adj2[v][vj];
                    if e1 && e2 {
                        accounted += 1;
                    } else if e1 != e2 {
                        delta += 1.0;
                        if e2 {
                            accounted += 1;
                        }
                    }
                }
                // an edge whose endpoint is deleted goes with it
                _ => {
                    if e1 {
                        delta += 1.0;
                    }
                }
            }
        }
        (delta, accounted)
    }

    fn dfs(&mut self, k: usize, current: f64) {
        if self.best == 0.0 {
            return;
        }
        if Instant::now() >= self.deadline {
            self.timed_out = true;
            return;
        }

        let n1 = self.labels1.len();
        let n2 = self.labels2.len();

        if k == n1 {
            // every unassigned second-graph node and unsettled edge is an insertion
            let total = current
                + (n2 - self.used2_count) as f64
                + (self.m2 - self.e2_accounted) as f64;
            if total < self.best {
                self.best = total;
            }
            return;
        }

        let u = self.order[k];
        let mut candidates: Vec<(f64, usize, Option<usize>)> = Vec::with_capacity(n2 + 1);
        for v in 0..n2 {
            if self.used2[v] {
                continue;
            }
            let (delta, accounted) = self.assign_delta(k, u, Some(v));
            candidates.push((delta, accounted, Some(v)));
        }
        let (delta, accounted) = self.assign_delta(k, u, None);
        candidates.push((delta, accounted, None));

        candidates.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| a.2.is_none().cmp(&b.2.is_none()))
                .then_with(|| a.2.unwrap_or(usize::MAX).cmp(&b.2.unwrap_or(usize::MAX)))
        });

        for (delta, accounted, v) in candidates {
            if self.timed_out || self.best == 0.0 {
                return;
            }

            let next = current + delta;
            let remaining1 = (n1 - k - 1) as i64;
            let remaining2 = (n2 - self.used2_count - usize::from(v.is_some())) as i64;
            // surplus on either side can only be resolved by unit insertions
            // or deletions, a lower bound on everything still to pay
            if next + (remaining1 - remaining2).abs() as f64 >= self.best {
                continue;
            }

            self.assignment[k] = v;
            if let Some(v) = v {
                self.used2[v] = true;
                self.used2_count += 1;
            }
            self.e2_accounted += accounted;

            self.dfs(k + 1, next);

            self.e2_accounted -= accounted;
            if let Some(v) = v {
                self.used2[v] = false;
                self.used2_count -= 1;
            }
            self.assignment[k] = None;
        }
    }
}

fn adjacency(g: &InterfaceGraph) -> Vec<Vec<bool>> {
    let n = g.node_count();
    let mut adj = vec![vec![false; n]; n];
    for edge in g.graph.edge_indices() {
        if let Some((a, b)) = g.graph.edge_endpoints(edge) {
            adj[a.index()][b.index()] = true;
            adj[b.index()][a.index()] = true;
        }
    }
    adj
}
