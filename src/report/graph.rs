//! Flow graph construction, filtering, and aggregation
//!
//! Each report record expands into a fixed 8-edge chain:
//!
//! ```text
//! platform → {platform}合作数量 → 总数量 → {platform}clicks → 总clicks
//!          → {platform}orders → 总orders → {platform}sales → 总sales
//! ```
//!
//! The chain *structure* routes through the shared total nodes; the values
//! do not. The edge leaving 总数量 toward a platform's clicks node carries
//! that record's click count, not its coop count. This funnel convention
//! comes straight from the report format and must not be "fixed".
//!
//! Baseline totals (per-target sums over the unfiltered universe) are
//! computed once at build time and serve as the stable denominator for all
//! percentage displays, so filtering never shifts percentages.

use crate::types::{Record, Stage};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// One stage-transition link. `group` is the owning platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowEdge {
    pub source: String,
    pub target: String,
    pub value: f64,
    pub group: String,
}

impl FlowEdge {
    fn new(source: impl Into<String>, target: impl Into<String>, value: f64, group: &str) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            value,
            group: group.to_string(),
        }
    }
}

/// The complete edge universe for one loaded report, plus baseline totals.
///
/// Rebuilt wholesale on every file load; immutable in between. Filtering
/// and composition never mutate it.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    pub edges: Vec<FlowEdge>,
    baseline: HashMap<String, f64>,
}

/// Headline metrics over the unfiltered universe, independent of any
/// search or scale state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    pub edge_count: usize,
    pub platform_count: usize,
    pub total_coop: f64,
    pub total_sales: f64,
}

/// Per-platform rollup for the data tables.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformStats {
    pub platform: String,
    pub total_value: f64,
    pub edge_count: usize,
}

impl FlowGraph {
    /// Build the edge universe and baseline totals from validated records.
    pub fn build(records: &[Record]) -> Self {
        let mut edges = Vec::with_capacity(records.len() * 8);

        for record in records {
            let platform = record.platform.as_str();
            let coop_node = format!("{}{}", platform, Stage::Coop.suffix());
            let click_node = format!("{}{}", platform, Stage::Clicks.suffix());
            let order_node = format!("{}{}", platform, Stage::Orders.suffix());
            let sales_node = format!("{}{}", platform, Stage::Sales.suffix());

            edges.push(FlowEdge::new(platform, coop_node.clone(), record.coop_count, platform));
            edges.push(FlowEdge::new(coop_node, Stage::Coop.total_name(), record.coop_count, platform));
            edges.push(FlowEdge::new(Stage::Coop.total_name(), click_node.clone(), record.click_count, platform));
            edges.push(FlowEdge::new(click_node, Stage::Clicks.total_name(), record.click_count, platform));
            edges.push(FlowEdge::new(Stage::Clicks.total_name(), order_node.clone(), record.order_count, platform));
            edges.push(FlowEdge::new(order_node, Stage::Orders.total_name(), record.order_count, platform));
            edges.push(FlowEdge::new(Stage::Orders.total_name(), sales_node.clone(), record.sales, platform));
            edges.push(FlowEdge::new(sales_node, Stage::Sales.total_name(), record.sales, platform));
        }

        let mut baseline: HashMap<String, f64> = HashMap::new();
        for edge in &edges {
            *baseline.entry(edge.target.clone()).or_insert(0.0) += edge.value;
        }

        Self { edges, baseline }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Unfiltered inflow total for a node (0.0 when the node has none).
    pub fn baseline(&self, node: &str) -> f64 {
        self.baseline.get(node).copied().unwrap_or(0.0)
    }

    /// Baseline total for a stage's aggregate node.
    pub fn stage_baseline(&self, stage: Stage) -> f64 {
        self.baseline(stage.total_name())
    }

    /// Distinct node ids across the unfiltered universe.
    pub fn node_count(&self) -> usize {
        let mut nodes: HashSet<&str> = HashSet::new();
        for edge in &self.edges {
            nodes.insert(&edge.source);
            nodes.insert(&edge.target);
        }
        nodes.len()
    }

    /// Headline metrics, always computed from the full universe.
    pub fn summary(&self) -> Summary {
        let mut platforms: HashSet<&str> = HashSet::new();
        let mut total_coop = 0.0;
        let mut total_sales = 0.0;
        for edge in &self.edges {
            platforms.insert(&edge.group);
            if edge.source.contains(Stage::Coop.suffix()) {
                total_coop += edge.value;
            }
            if edge.target == Stage::Sales.total_name() {
                total_sales += edge.value;
            }
        }
        Summary {
            edge_count: self.edges.len(),
            platform_count: platforms.len(),
            total_coop,
            total_sales,
        }
    }

    /// Summed value and link count per platform, sorted by platform name.
    pub fn platform_rollup(&self) -> Vec<PlatformStats> {
        let mut rollup: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for edge in &self.edges {
            let entry = rollup.entry(&edge.group).or_insert((0.0, 0));
            entry.0 += edge.value;
            entry.1 += 1;
        }
        rollup
            .into_iter()
            .map(|(platform, (total_value, edge_count))| PlatformStats {
                platform: platform.to_string(),
                total_value,
                edge_count,
            })
            .collect()
    }
}

/// Apply the keyword predicate, then re-aggregate duplicate
/// (source, target, group) edges and prune non-positive sums.
///
/// Pure function of its inputs; output order is deterministic
/// (sorted by source, then target, then group).
pub fn filter_edges(edges: &[FlowEdge], keyword: &str) -> Vec<FlowEdge> {
    let needle = keyword.trim().to_lowercase();

    let mut groups: BTreeMap<(String, String, String), f64> = BTreeMap::new();
    for edge in edges {
        if !needle.is_empty() {
            let hit = edge.source.to_lowercase().contains(&needle)
                || edge.target.to_lowercase().contains(&needle)
                || edge.group.to_lowercase().contains(&needle);
            if !hit {
                continue;
            }
        }
        *groups
            .entry((edge.source.clone(), edge.target.clone(), edge.group.clone()))
            .or_insert(0.0) += edge.value;
    }

    groups
        .into_iter()
        .filter(|(_, value)| *value > 0.0)
        .map(|((source, target, group), value)| FlowEdge {
            source,
            target,
            value,
            group,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(platform: &str, coop: f64, clicks: f64, orders: f64, sales: f64) -> Record {
        Record {
            platform: platform.to_string(),
            coop_count: coop,
            click_count: clicks,
            order_count: orders,
            sales,
        }
    }

    fn sample_graph() -> FlowGraph {
        FlowGraph::build(&[
            record("联盟客", 10.0, 100.0, 5.0, 200.0),
            record("红人", 3.0, 50.0, 2.0, 80.0),
        ])
    }

    #[test]
    fn eight_edges_per_record() {
        let graph = sample_graph();
        assert_eq!(graph.edges.len(), 16);
        // 9 distinct nodes per platform, 4 totals shared
        assert_eq!(graph.node_count(), 14);
        assert!(graph.node_count() <= 9 * 2);
    }

    #[test]
    fn single_row_chain() {
        let graph = FlowGraph::build(&[record("联盟客", 10.0, 100.0, 5.0, 200.0)]);
        let expect = [
            ("联盟客", "联盟客合作数量", 10.0),
            ("联盟客合作数量", "总数量", 10.0),
            ("总数量", "联盟客clicks", 100.0),
            ("联盟客clicks", "总clicks", 100.0),
            ("总clicks", "联盟客orders", 5.0),
            ("联盟客orders", "总orders", 5.0),
            ("总orders", "联盟客sales", 200.0),
            ("联盟客sales", "总sales", 200.0),
        ];
        assert_eq!(graph.edges.len(), expect.len());
        for (edge, (source, target, value)) in graph.edges.iter().zip(expect.iter()) {
            assert_eq!(edge.source, *source);
            assert_eq!(edge.target, *target);
            assert_eq!(edge.value, *value);
            assert_eq!(edge.group, "联盟客");
        }

        assert_eq!(graph.baseline("总数量"), 10.0);
        assert_eq!(graph.baseline("总clicks"), 100.0);
        assert_eq!(graph.baseline("总orders"), 5.0);
        assert_eq!(graph.baseline("总sales"), 200.0);
    }

    #[test]
    fn baseline_ignores_filtering() {
        let graph = sample_graph();
        let before: Vec<f64> = Stage::all().iter().map(|s| graph.stage_baseline(*s)).collect();

        // Filtering derives a new edge set but must not touch the graph
        let _ = filter_edges(&graph.edges, "联盟客");
        let _ = filter_edges(&graph.edges, "总clicks");

        let after: Vec<f64> = Stage::all().iter().map(|s| graph.stage_baseline(*s)).collect();
        assert_eq!(before, after);
        assert_eq!(graph.stage_baseline(Stage::Coop), 13.0);
        assert_eq!(graph.stage_baseline(Stage::Sales), 280.0);
    }

    #[test]
    fn filter_matches_source_target_and_group() {
        let graph = sample_graph();

        // Keyword matching a total node id keeps edges from every platform
        let filtered = filter_edges(&graph.edges, "总clicks");
        assert_eq!(filtered.len(), 4);
        assert!(filtered.iter().all(|e| e.source.contains("总clicks") || e.target.contains("总clicks")));

        // Keyword matching a platform keeps its whole chain (group match)
        let filtered = filter_edges(&graph.edges, "红人");
        assert_eq!(filtered.len(), 8);
        assert!(filtered.iter().all(|e| e.group == "红人"));

        // Case-insensitive on latin script
        let graph = FlowGraph::build(&[record("Deals网站", 4.0, 40.0, 1.0, 9.0)]);
        let filtered = filter_edges(&graph.edges, "deals");
        assert_eq!(filtered.len(), 8);
    }

    #[test]
    fn filter_is_idempotent() {
        let graph = sample_graph();
        let once = filter_edges(&graph.edges, "联盟客");
        let twice = filter_edges(&once, "联盟客");
        assert_eq!(once, twice);
    }

    #[test]
    fn zero_value_edges_pruned() {
        // Orders are zero: both order-stage edges must disappear
        let graph = FlowGraph::build(&[record("联盟客", 10.0, 100.0, 0.0, 200.0)]);
        let filtered = filter_edges(&graph.edges, "");
        assert_eq!(filtered.len(), 6);
        assert!(filtered.iter().all(|e| e.value > 0.0));
        assert!(!filtered.iter().any(|e| e.target == "联盟客orders"));
    }

    #[test]
    fn duplicate_rows_aggregate() {
        // Same platform twice: chains collapse into one with summed values
        let graph = FlowGraph::build(&[
            record("联盟客", 10.0, 100.0, 5.0, 200.0),
            record("联盟客", 5.0, 20.0, 1.0, 50.0),
        ]);
        let filtered = filter_edges(&graph.edges, "");
        assert_eq!(filtered.len(), 8);
        let coop = filtered
            .iter()
            .find(|e| e.source == "联盟客" && e.target == "联盟客合作数量")
            .unwrap();
        assert_eq!(coop.value, 15.0);
        // Baseline sums both rows too
        assert_eq!(graph.baseline("总sales"), 250.0);
    }

    #[test]
    fn summary_from_unfiltered_universe() {
        let graph = sample_graph();
        let summary = graph.summary();
        assert_eq!(summary.edge_count, 16);
        assert_eq!(summary.platform_count, 2);
        assert_eq!(summary.total_coop, 13.0);
        assert_eq!(summary.total_sales, 280.0);
    }

    #[test]
    fn platform_rollup_sorted() {
        let graph = sample_graph();
        let rollup = graph.platform_rollup();
        assert_eq!(rollup.len(), 2);
        assert_eq!(rollup[0].platform, "红人");
        assert_eq!(rollup[0].edge_count, 8);
        assert_eq!(rollup[0].total_value, 2.0 * (3.0 + 50.0 + 2.0 + 80.0));
        assert_eq!(rollup[1].platform, "联盟客");
    }

    #[test]
    fn empty_graph() {
        let graph = FlowGraph::build(&[]);
        assert!(graph.is_empty());
        assert_eq!(graph.summary(), Summary::default());
        assert!(filter_edges(&graph.edges, "x").is_empty());
    }
}
