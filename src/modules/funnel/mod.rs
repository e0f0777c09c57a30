//! Funnel module — conversion flow dashboard
//!
//! Sub-tabs: Diagram, Links, Data, Platforms.
//! Owns the loaded flow graph and the current view options (search
//! keyword, per-stage scale factors). Every control interaction triggers
//! one full recomposition of the diagram from the unchanged graph; a file
//! load replaces the graph wholesale.

mod view;

use crate::report::diagram::{compose, DiagramSpec};
use crate::report::graph::FlowGraph;
use crate::report::ingest;
use crate::types::{FlashMessage, Stage, ViewOptions, SCALE_STEP};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};
use std::path::PathBuf;

pub use view::render;

// ── Sub-tabs ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunSubTab {
    #[default]
    Diagram,
    Links,
    Data,
    Platforms,
}

impl FunSubTab {
    pub fn all() -> &'static [FunSubTab] {
        &[
            FunSubTab::Diagram,
            FunSubTab::Links,
            FunSubTab::Data,
            FunSubTab::Platforms,
        ]
    }

    pub fn index(&self) -> usize {
        match self {
            FunSubTab::Diagram => 0,
            FunSubTab::Links => 1,
            FunSubTab::Data => 2,
            FunSubTab::Platforms => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FunSubTab::Diagram => "Diagram",
            FunSubTab::Links => "Links",
            FunSubTab::Data => "Data",
            FunSubTab::Platforms => "Platforms",
        }
    }
}

// ── Report source ──

/// Where the currently loaded table came from. Reload re-reads a path;
/// piped input can only be re-parsed from the captured text.
#[derive(Debug, Clone, Default)]
pub enum ReportSource {
    #[default]
    None,
    Path(PathBuf),
    Piped(String),
}

impl ReportSource {
    pub fn describe(&self) -> String {
        match self {
            ReportSource::None => "no report".into(),
            ReportSource::Path(path) => path.display().to_string(),
            ReportSource::Piped(_) => "stdin".into(),
        }
    }
}

// ── Module state ──

pub struct FunnelState {
    pub active_sub_tab: FunSubTab,

    // Data
    pub source: ReportSource,
    pub graph: FlowGraph,
    pub spec: DiagramSpec,
    pub opts: ViewOptions,
    pub load_error: Option<String>,
    pub loaded_at: Option<DateTime<Local>>,

    // Search input
    pub search_active: bool,

    // File path input
    pub path_active: bool,
    pub path_buffer: String,

    // Scale controls
    pub selected_stage: Stage,

    // Navigation
    pub selected_node: usize,
    pub table_scroll: usize,

    pub flash_message: Option<FlashMessage>,
}

impl FunnelState {
    pub fn new(source: ReportSource) -> Self {
        let mut state = Self {
            active_sub_tab: FunSubTab::Diagram,
            source,
            graph: FlowGraph::default(),
            spec: DiagramSpec::default(),
            opts: ViewOptions::default(),
            load_error: None,
            loaded_at: None,
            search_active: false,
            path_active: false,
            path_buffer: String::new(),
            selected_stage: Stage::Coop,
            selected_node: 0,
            table_scroll: 0,
            flash_message: None,
        };
        if !matches!(state.source, ReportSource::None) {
            state.load();
        }
        state
    }

    /// Load (or re-load) the report and rebuild the graph wholesale.
    /// On failure the graph is left empty and the error kept visible
    /// until the next successful load.
    pub fn load(&mut self) {
        let records = match &self.source {
            ReportSource::None => Ok(Vec::new()),
            ReportSource::Path(path) => ingest::read_records(path),
            ReportSource::Piped(text) => ingest::read_records_from_str(text),
        };

        match records {
            Ok(records) => {
                self.graph = FlowGraph::build(&records);
                self.load_error = None;
                self.loaded_at = Some(Local::now());
            }
            Err(e) => {
                self.graph = FlowGraph::default();
                self.load_error = Some(format!("{:#}", e));
                self.loaded_at = None;
            }
        }
        self.selected_node = 0;
        self.table_scroll = 0;
        self.recompute();
    }

    /// Recompose the diagram from the current graph and view options.
    /// Called after every search or scale interaction.
    pub fn recompute(&mut self) {
        self.spec = compose(&self.graph, &self.opts);
        if self.selected_node >= self.spec.nodes.len() {
            self.selected_node = self.spec.nodes.len().saturating_sub(1);
        }
    }

    fn show_flash(&mut self, msg: &str, is_error: bool) {
        self.flash_message = Some(FlashMessage::new(msg.to_string(), is_error));
    }

    fn reload(&mut self) {
        if matches!(self.source, ReportSource::None) {
            self.show_flash("No report to reload — press o to open one", true);
            return;
        }
        self.load();
        match &self.load_error {
            Some(err) => {
                let msg = err.clone();
                self.show_flash(&msg, true);
            }
            None => {
                let msg = format!("Reloaded {} ({} links)", self.source.describe(), self.graph.edges.len());
                self.show_flash(&msg, false);
            }
        }
    }

    fn replace_report(&mut self, path: &str) {
        let path = path.trim();
        if path.is_empty() {
            return;
        }
        self.source = ReportSource::Path(PathBuf::from(path));
        self.load();
        match &self.load_error {
            Some(err) => {
                let msg = err.clone();
                self.show_flash(&msg, true);
            }
            None => {
                let msg = format!("Loaded {} ({} links)", path, self.graph.edges.len());
                self.show_flash(&msg, false);
            }
        }
    }

    /// Write the composed diagram (nodes + index-based links) as JSON,
    /// the shape web sankey renderers consume.
    fn export_diagram(&self) -> Result<String> {
        let filename = format!(
            "flowmate_diagram_{}.json",
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let json = serde_json::to_string_pretty(&self.spec)
            .context("Failed to serialize diagram")?;
        std::fs::write(&filename, json)
            .with_context(|| format!("Failed to write {}", filename))?;
        Ok(filename)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Search input captures everything; the diagram recomposes on
        // every keystroke (live search).
        if self.search_active {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => {
                    self.search_active = false;
                }
                KeyCode::Backspace => {
                    self.opts.keyword.pop();
                    self.recompute();
                }
                KeyCode::Char(c) => {
                    self.opts.keyword.push(c);
                    self.recompute();
                }
                _ => {}
            }
            return Ok(());
        }

        // File path input captures everything
        if self.path_active {
            match key.code {
                KeyCode::Esc => {
                    self.path_active = false;
                    self.path_buffer.clear();
                }
                KeyCode::Enter => {
                    let path = self.path_buffer.clone();
                    self.path_active = false;
                    self.path_buffer.clear();
                    self.replace_report(&path);
                }
                KeyCode::Backspace => {
                    self.path_buffer.pop();
                }
                KeyCode::Char(c) => {
                    self.path_buffer.push(c);
                }
                _ => {}
            }
            return Ok(());
        }

        match key.code {
            // Sub-tabs
            KeyCode::F(n @ 1..=4) => {
                self.active_sub_tab = FunSubTab::all()[(n - 1) as usize];
            }

            // Search
            KeyCode::Char('/') => {
                self.search_active = true;
            }
            KeyCode::Char('c') => {
                if !self.opts.keyword.is_empty() {
                    self.opts.keyword.clear();
                    self.recompute();
                    self.show_flash("Search cleared", false);
                }
            }

            // File actions
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('o') => {
                self.path_active = true;
                self.path_buffer = match &self.source {
                    ReportSource::Path(path) => path.display().to_string(),
                    _ => String::new(),
                };
            }
            KeyCode::Char('e') => match self.export_diagram() {
                Ok(filename) => {
                    let msg = format!("Exported {}", filename);
                    self.show_flash(&msg, false);
                }
                Err(e) => {
                    let msg = format!("{:#}", e);
                    self.show_flash(&msg, true);
                }
            },

            // Scale controls
            KeyCode::Char('h') | KeyCode::Left => {
                self.selected_stage = self.selected_stage.prev();
            }
            KeyCode::Char('l') | KeyCode::Right => {
                self.selected_stage = self.selected_stage.next();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.opts.scales.adjust(self.selected_stage, SCALE_STEP);
                self.recompute();
            }
            KeyCode::Char('-') => {
                self.opts.scales.adjust(self.selected_stage, -SCALE_STEP);
                self.recompute();
            }
            KeyCode::Char('x') => {
                self.opts.scales.reset();
                self.recompute();
                self.show_flash("Scales reset", false);
            }

            // Navigation
            KeyCode::Char('j') | KeyCode::Down => {
                if self.active_sub_tab == FunSubTab::Diagram {
                    if self.selected_node + 1 < self.spec.nodes.len() {
                        self.selected_node += 1;
                    }
                } else {
                    self.table_scroll = self.table_scroll.saturating_add(1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if self.active_sub_tab == FunSubTab::Diagram {
                    self.selected_node = self.selected_node.saturating_sub(1);
                } else {
                    self.table_scroll = self.table_scroll.saturating_sub(1);
                }
            }
            KeyCode::Char('g') => {
                self.selected_node = 0;
                self.table_scroll = 0;
            }

            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn piped_state() -> FunnelState {
        let csv = "\
联盟营销平台类型,合作数量,求和项:Clicks,求和项:Orders,求和项:Sales
联盟客,10,100,5,200.0
红人,3,50,2,80.0
";
        FunnelState::new(ReportSource::Piped(csv.to_string()))
    }

    #[test]
    fn test_load_builds_graph_and_spec() {
        let state = piped_state();
        assert!(state.load_error.is_none());
        assert_eq!(state.graph.edges.len(), 16);
        assert_eq!(state.spec.links.len(), 16);
        assert!(state.loaded_at.is_some());
    }

    #[test]
    fn test_search_keystrokes_recompose() {
        let mut state = piped_state();
        state.handle_key(key(KeyCode::Char('/'))).unwrap();
        assert!(state.search_active);
        for c in "红人".chars() {
            state.handle_key(key(KeyCode::Char(c))).unwrap();
        }
        assert_eq!(state.opts.keyword, "红人");
        assert_eq!(state.spec.matched_platforms, ["红人"]);
        state.handle_key(key(KeyCode::Enter)).unwrap();
        assert!(!state.search_active);

        // Clearing restores the full diagram
        state.handle_key(key(KeyCode::Char('c'))).unwrap();
        assert!(state.opts.keyword.is_empty());
        assert_eq!(state.spec.links.len(), 16);
    }

    #[test]
    fn test_scale_keys_adjust_selected_stage() {
        let mut state = piped_state();
        assert_eq!(state.selected_stage, Stage::Coop);
        state.handle_key(key(KeyCode::Char('+'))).unwrap();
        assert!((state.opts.scales.coop - 1.1).abs() < 1e-9);

        state.handle_key(key(KeyCode::Char('l'))).unwrap();
        assert_eq!(state.selected_stage, Stage::Clicks);
        state.handle_key(key(KeyCode::Char('-'))).unwrap();
        assert!((state.opts.scales.clicks - 0.9).abs() < 1e-9);

        state.handle_key(key(KeyCode::Char('x'))).unwrap();
        assert_eq!(state.opts.scales, Default::default());
    }

    #[test]
    fn test_ingest_failure_keeps_empty_graph() {
        let state = FunnelState::new(ReportSource::Path(PathBuf::from(
            "/nonexistent/report.csv",
        )));
        assert!(state.load_error.is_some());
        assert!(state.graph.is_empty());
        assert!(state.spec.nodes.is_empty());
    }

    #[test]
    fn test_node_navigation_clamps() {
        let mut state = piped_state();
        let node_count = state.spec.nodes.len();
        for _ in 0..100 {
            state.handle_key(key(KeyCode::Char('j'))).unwrap();
        }
        assert_eq!(state.selected_node, node_count - 1);
        state.handle_key(key(KeyCode::Char('g'))).unwrap();
        assert_eq!(state.selected_node, 0);
    }
}
