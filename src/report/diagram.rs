//! Diagram composition
//!
//! Turns the filtered edge set into a renderer-ready [`DiagramSpec`]:
//! a deterministically ordered node list (grouped by stage, platforms
//! sorted) with colours and hover summaries, and index-based links with
//! scaled draw values and highlight treatment.
//!
//! This is a pure function of (graph, view options). Percentages always
//! use the graph's baseline totals as denominator, never the filtered or
//! scaled sums, so they stay stable reference points across interactions.

use crate::report::graph::{filter_edges, FlowGraph};
use crate::report::palette::{self, DEFAULT_COLOR};
use crate::types::{Stage, ViewOptions};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Draw-value multiplier for edges outside the matched set while a search
/// is active: shrink, don't hide.
pub const DIM_FACTOR: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramNode {
    pub id: String,
    pub color: String,
    /// Summed filtered inflow
    pub incoming: f64,
    /// Summed filtered outflow
    pub outgoing: f64,
    /// Baseline value (totals) or share-of-baseline percentage (stage
    /// nodes); empty when the baseline is zero or the node is a platform.
    pub ratio_label: String,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramLink {
    pub source: usize,
    pub target: usize,
    pub source_id: String,
    pub target_id: String,
    pub group: String,
    /// Final draw value: original × stage scale, × 0.05 when dimmed
    pub value: f64,
    pub original_value: f64,
    /// Share of the target's baseline inflow, in percent
    pub baseline_pct: f64,
    pub color: String,
    pub matched: bool,
}

/// Renderer-ready diagram: ordered nodes, index-based links.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiagramSpec {
    pub nodes: Vec<DiagramNode>,
    pub links: Vec<DiagramLink>,
    pub platforms: Vec<String>,
    pub matched_platforms: Vec<String>,
}

impl DiagramSpec {
    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }
}

/// Which stage an edge belongs to for scaling, by substring presence in
/// target or source, coop checked first. Edges touching no stage marker
/// (none in practice) keep a factor of 1.0.
pub fn classify_stage(source: &str, target: &str) -> Option<Stage> {
    for stage in Stage::all() {
        if target.contains(stage.suffix()) || source.contains(stage.suffix()) {
            return Some(*stage);
        }
    }
    None
}

/// A node id is a raw platform iff it carries no stage suffix and is not
/// one of the four total names.
fn is_platform_node(id: &str) -> bool {
    !id.is_empty()
        && !Stage::all().iter().any(|s| id.ends_with(s.suffix()))
        && !Stage::all().iter().any(|s| id == s.total_name())
}

/// Compose the final diagram from the graph and the current controls.
pub fn compose(graph: &FlowGraph, opts: &ViewOptions) -> DiagramSpec {
    let filtered = filter_edges(&graph.edges, &opts.keyword);

    let mut present: HashSet<&str> = HashSet::new();
    for edge in &filtered {
        present.insert(&edge.source);
        present.insert(&edge.target);
    }

    let mut platforms: Vec<String> = present
        .iter()
        .filter(|id| is_platform_node(id))
        .map(|id| id.to_string())
        .collect();
    platforms.sort();

    // Draw order: platforms, then each stage's platform nodes (platform
    // order) followed by that stage's total. First occurrence wins.
    let mut ordered: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut push = |id: String, ordered: &mut Vec<String>, seen: &mut HashSet<String>| {
        let id = id.trim().to_string();
        if !id.is_empty() && seen.insert(id.clone()) {
            ordered.push(id);
        }
    };
    for platform in &platforms {
        push(platform.clone(), &mut ordered, &mut seen);
    }
    for stage in Stage::all() {
        for platform in &platforms {
            let node = format!("{}{}", platform, stage.suffix());
            if present.contains(node.as_str()) {
                push(node, &mut ordered, &mut seen);
            }
        }
        if present.contains(stage.total_name()) {
            push(stage.total_name().to_string(), &mut ordered, &mut seen);
        }
    }

    let index: HashMap<&str, usize> = ordered
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    // Search highlighting
    let keyword = opts.active_keyword().map(str::to_lowercase);
    let matched_platforms: Vec<String> = match &keyword {
        Some(kw) => platforms
            .iter()
            .filter(|p| p.to_lowercase().contains(kw))
            .cloned()
            .collect(),
        None => Vec::new(),
    };
    let mut matched_nodes: HashSet<String> = HashSet::new();
    for platform in &matched_platforms {
        matched_nodes.insert(platform.clone());
        for stage in Stage::all() {
            matched_nodes.insert(format!("{}{}", platform, stage.suffix()));
        }
    }
    let matched_groups: HashSet<&str> = matched_platforms.iter().map(String::as_str).collect();

    // Filtered in/out sums per node
    let mut incoming: HashMap<&str, f64> = HashMap::new();
    let mut outgoing: HashMap<&str, f64> = HashMap::new();
    for edge in &filtered {
        *incoming.entry(&edge.target).or_insert(0.0) += edge.value;
        *outgoing.entry(&edge.source).or_insert(0.0) += edge.value;
    }

    let nodes: Vec<DiagramNode> = ordered
        .iter()
        .map(|id| {
            let node_in = incoming.get(id.as_str()).copied().unwrap_or(0.0);
            let node_out = outgoing.get(id.as_str()).copied().unwrap_or(0.0);
            let matched = keyword.is_none() || matched_nodes.contains(id);
            let color = if matched {
                palette::node_color(id).to_string()
            } else {
                DEFAULT_COLOR.to_string()
            };
            DiagramNode {
                ratio_label: ratio_label(graph, id, node_out),
                id: id.clone(),
                color,
                incoming: node_in,
                outgoing: node_out,
                matched,
            }
        })
        .collect();

    let links: Vec<DiagramLink> = filtered
        .iter()
        .filter_map(|edge| {
            // Both endpoints are in the ordering by construction; skip
            // anything that is not rather than panic.
            let source = *index.get(edge.source.as_str())?;
            let target = *index.get(edge.target.as_str())?;

            let scale = classify_stage(&edge.source, &edge.target)
                .map(|s| opts.scales.get(s))
                .unwrap_or(1.0);
            let matched = matched_groups.contains(edge.group.as_str());
            let mut value = edge.value * scale;
            let color = if matched || keyword.is_none() {
                palette::link_color(&edge.group, &edge.source).to_string()
            } else {
                value *= DIM_FACTOR;
                DEFAULT_COLOR.to_string()
            };

            let target_baseline = graph.baseline(&edge.target);
            let baseline_pct = if target_baseline > 0.0 {
                edge.value / target_baseline * 100.0
            } else {
                0.0
            };

            Some(DiagramLink {
                source,
                target,
                source_id: edge.source.clone(),
                target_id: edge.target.clone(),
                group: edge.group.clone(),
                value,
                original_value: edge.value,
                baseline_pct,
                color,
                matched: matched || keyword.is_none(),
            })
        })
        .collect();

    DiagramSpec {
        nodes,
        links,
        platforms,
        matched_platforms,
    }
}

/// Hover annotation: totals report their baseline inflow, stage nodes
/// report their outflow as a share of the stage baseline. Omitted when
/// the baseline is zero.
fn ratio_label(graph: &FlowGraph, id: &str, node_out: f64) -> String {
    for stage in Stage::all() {
        if id == stage.total_name() {
            let baseline = graph.stage_baseline(*stage);
            if baseline > 0.0 {
                return format!("{}：{:.0}", stage.total_label(), baseline);
            }
            return String::new();
        }
    }
    for stage in Stage::all() {
        if id.contains(stage.suffix()) {
            let baseline = graph.stage_baseline(*stage);
            if baseline > 0.0 {
                return format!(
                    "占{}：{:.2}%",
                    stage.total_name(),
                    node_out / baseline * 100.0
                );
            }
            return String::new();
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Record, StageScales};

    fn record(platform: &str, coop: f64, clicks: f64, orders: f64, sales: f64) -> Record {
        Record {
            platform: platform.to_string(),
            coop_count: coop,
            click_count: clicks,
            order_count: orders,
            sales,
        }
    }

    fn single_graph() -> FlowGraph {
        FlowGraph::build(&[record("联盟客", 10.0, 100.0, 5.0, 200.0)])
    }

    fn dual_graph() -> FlowGraph {
        FlowGraph::build(&[
            record("联盟客", 10.0, 100.0, 5.0, 200.0),
            record("红人", 3.0, 50.0, 2.0, 80.0),
        ])
    }

    /// Link lookup by endpoints. Link order follows the aggregation's
    /// sorted (source, target, group) keys, not the chain order, so
    /// positional indexing is meaningless.
    fn link<'a>(spec: &'a DiagramSpec, source: &str, target: &str) -> &'a DiagramLink {
        spec.links
            .iter()
            .find(|l| l.source_id == source && l.target_id == target)
            .unwrap()
    }

    #[test]
    fn single_row_diagram() {
        let spec = compose(&single_graph(), &ViewOptions::default());

        let ids: Vec<&str> = spec.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "联盟客",
                "联盟客合作数量",
                "总数量",
                "联盟客clicks",
                "总clicks",
                "联盟客orders",
                "总orders",
                "联盟客sales",
                "总sales",
            ]
        );

        assert_eq!(spec.links.len(), 8);
        // Every link's indices resolve to its own endpoints
        for l in &spec.links {
            assert_eq!(spec.nodes[l.source].id, l.source_id);
            assert_eq!(spec.nodes[l.target].id, l.target_id);
        }
        let coop = link(&spec, "联盟客", "联盟客合作数量");
        assert_eq!(coop.source, 0);
        assert_eq!(coop.target, 1);
        assert_eq!(coop.value, 10.0);
        assert_eq!(coop.original_value, 10.0);

        // No keyword: everything matched, palette colours intact
        assert!(spec.links.iter().all(|l| l.matched));
        assert_eq!(spec.nodes[0].color, "#45B7D1");
        assert_eq!(spec.nodes[2].color, "#1C363F");

        // Hover payloads
        let total = &spec.nodes[2];
        assert_eq!(total.ratio_label, "总合作数量：10");
        assert_eq!(total.incoming, 10.0);
        assert_eq!(total.outgoing, 100.0);
        let coop = &spec.nodes[1];
        assert_eq!(coop.ratio_label, "占总数量：100.00%");

        // Every link carries 100% of its target's baseline here
        assert!(spec.links.iter().all(|l| (l.baseline_pct - 100.0).abs() < 1e-9));
    }

    #[test]
    fn coop_scale_doubles_coop_edges() {
        let mut opts = ViewOptions::default();
        opts.scales.set(Stage::Coop, 2.0);
        let spec = compose(&single_graph(), &opts);

        assert_eq!(link(&spec, "联盟客", "联盟客合作数量").value, 20.0);
        assert_eq!(link(&spec, "联盟客合作数量", "总数量").value, 20.0);
        // Originals untouched, later stages untouched
        assert_eq!(link(&spec, "联盟客", "联盟客合作数量").original_value, 10.0);
        assert_eq!(link(&spec, "总数量", "联盟客clicks").value, 100.0);
        assert_eq!(link(&spec, "联盟客sales", "总sales").value, 200.0);
    }

    #[test]
    fn search_highlights_matched_platform() {
        let mut opts = ViewOptions {
            keyword: "联盟客".into(),
            scales: StageScales::default(),
        };
        opts.scales.set(Stage::Sales, 2.0);
        let spec = compose(&dual_graph(), &opts);

        assert_eq!(spec.matched_platforms, ["联盟客"]);

        // 红人's edges match neither ids nor group, so the filter removes
        // them outright; what remains is the matched chain at full value
        // and palette colour.
        assert_eq!(spec.links.len(), 8);
        for link in &spec.links {
            assert_eq!(link.group, "联盟客");
            assert!(link.matched);
            assert_ne!(link.color, DEFAULT_COLOR);
        }
        let sales_link = spec
            .links
            .iter()
            .find(|l| l.source_id == "联盟客sales")
            .unwrap();
        assert_eq!(sales_link.value, 400.0);
        assert!(spec.node_index("红人").is_none());
    }

    #[test]
    fn unmatched_edges_dimmed() {
        // A stage-suffix keyword keeps every platform's coop edges while
        // matching no platform name, so the dimming path is exercised.
        let mut opts = ViewOptions {
            keyword: "合作数量".into(),
            scales: StageScales::default(),
        };
        opts.scales.set(Stage::Coop, 2.0);
        let spec = compose(&dual_graph(), &opts);

        assert!(spec.matched_platforms.is_empty());
        assert_eq!(spec.links.len(), 4);
        for link in &spec.links {
            assert!(!link.matched);
            assert_eq!(link.color, DEFAULT_COLOR);
            assert_eq!(link.value, link.original_value * 2.0 * DIM_FACTOR);
        }
        // Non-matched nodes forced to the neutral default
        assert!(spec.nodes.iter().all(|n| n.color == DEFAULT_COLOR));
    }

    #[test]
    fn total_keyword_keeps_only_total_nodes() {
        // Matching a shared total keeps only its incident edges and
        // discovers no platforms, so the ordering holds just that total
        // and every link to an undiscovered platform-stage node is
        // skipped.
        let opts = ViewOptions {
            keyword: "总clicks".into(),
            scales: StageScales::default(),
        };
        let spec = compose(&dual_graph(), &opts);

        let ids: Vec<&str> = spec.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["总clicks"]);
        assert!(spec.links.is_empty());
        assert!(spec.matched_platforms.is_empty());
    }

    #[test]
    fn baseline_unchanged_by_compose() {
        let graph = dual_graph();
        let plain = compose(&graph, &ViewOptions::default());
        let searched = compose(
            &graph,
            &ViewOptions {
                keyword: "联盟客".into(),
                scales: StageScales::default(),
            },
        );

        // Percentages stay anchored to the unfiltered baseline: the
        // 联盟客sales → 总sales link is 200 of 280 in both runs.
        let pct = |spec: &DiagramSpec| {
            spec.links
                .iter()
                .find(|l| l.source_id == "联盟客sales")
                .map(|l| l.baseline_pct)
                .unwrap()
        };
        assert!((pct(&plain) - pct(&searched)).abs() < 1e-9);
        assert!((pct(&plain) - 200.0 / 280.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_value_stages_drop_their_nodes() {
        // Zero orders: both order-stage edges are pruned, so the
        // platform's orders node disappears. 总orders survives because
        // the chain still routes 总orders → sales.
        let graph = FlowGraph::build(&[record("联盟客", 10.0, 100.0, 0.0, 200.0)]);
        let spec = compose(&graph, &ViewOptions::default());
        assert!(spec.node_index("联盟客orders").is_none());
        assert!(spec.node_index("总orders").is_some());
        assert!(spec.node_index("总sales").is_some());

        // Zero sales: the final stage has no surviving edge at all, so
        // its total drops out of the ordering too.
        let graph = FlowGraph::build(&[record("联盟客", 10.0, 100.0, 5.0, 0.0)]);
        let spec = compose(&graph, &ViewOptions::default());
        assert!(spec.node_index("联盟客sales").is_none());
        assert!(spec.node_index("总sales").is_none());
        assert!(spec.node_index("总orders").is_some());
    }

    #[test]
    fn zero_baseline_omits_ratio() {
        // Coop counts are zero: 总数量 is still reachable (it feeds the
        // clicks stage) but its baseline is zero, so no label.
        let graph = FlowGraph::build(&[record("联盟客", 0.0, 100.0, 5.0, 200.0)]);
        let spec = compose(&graph, &ViewOptions::default());
        let total = &spec.nodes[spec.node_index("总数量").unwrap()];
        assert_eq!(total.ratio_label, "");
    }

    #[test]
    fn stage_classification_priority() {
        assert_eq!(classify_stage("联盟客", "联盟客合作数量"), Some(Stage::Coop));
        assert_eq!(classify_stage("总数量", "联盟客clicks"), Some(Stage::Clicks));
        // Endpoints in adjacent stages: the coop → clicks → orders →
        // sales scan order decides, so this link scales with the orders
        // factor, not the sales factor.
        assert_eq!(classify_stage("总orders", "联盟客sales"), Some(Stage::Orders));
        assert_eq!(classify_stage("联盟客sales", "总sales"), Some(Stage::Sales));
        assert_eq!(classify_stage("a", "b"), None);
    }

    #[test]
    fn empty_graph_composes_empty_spec() {
        let spec = compose(&FlowGraph::build(&[]), &ViewOptions::default());
        assert_eq!(spec, DiagramSpec::default());
    }
}
