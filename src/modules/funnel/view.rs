//! Funnel module rendering
//!
//! Draws the staged flow diagram as five node columns plus a detail
//! panel, and the Links / Data / Platforms tables. All colours for nodes
//! and links come from the report palette; the theme only styles chrome.

use super::{FunSubTab, FunnelState, ReportSource};
use crate::report::diagram::{DiagramLink, DiagramNode};
use crate::report::palette;
use crate::types::{format_amount, format_count, Stage};
use crate::ui::theme::Theme;
use crate::ui::widgets;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Frame,
};
use std::collections::HashMap;

pub fn render(frame: &mut Frame, state: &FunnelState, theme: &Theme, area: Rect) {
    let layout = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(3),
        Constraint::Min(8),
    ])
    .split(area);

    render_sub_tabs(frame, state, theme, layout[0]);
    render_controls(frame, state, theme, layout[1]);

    if let Some(err) = &state.load_error {
        render_load_error(frame, err, theme, layout[2]);
    } else if state.graph.is_empty() {
        render_empty_hint(frame, state, theme, layout[2]);
    } else {
        match state.active_sub_tab {
            FunSubTab::Diagram => render_diagram(frame, state, theme, layout[2]),
            FunSubTab::Links => render_links(frame, state, theme, layout[2]),
            FunSubTab::Data => render_data(frame, state, theme, layout[2]),
            FunSubTab::Platforms => render_platforms(frame, state, theme, layout[2]),
        }
    }

    if let Some(msg) = &state.flash_message {
        widgets::render_flash_message(frame, &msg.text, msg.is_error, theme, area);
    }
}

fn render_sub_tabs(frame: &mut Frame, state: &FunnelState, theme: &Theme, area: Rect) {
    let tab_titles: Vec<Line> = FunSubTab::all()
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let style = if state.active_sub_tab == *tab {
                theme.tab_active()
            } else {
                theme.tab_inactive()
            };
            Line::styled(format!("[F{}] {}", i + 1, tab.label()), style)
        })
        .collect();

    let tabs = Tabs::new(tab_titles)
        .select(state.active_sub_tab.index())
        .divider(" │ ")
        .style(theme.text());

    let tabs_area = Rect {
        x: area.x + 2,
        y: area.y,
        width: area.width.saturating_sub(4),
        height: 1,
    };
    frame.render_widget(tabs, tabs_area);
}

// ── Controls strip ──

fn render_controls(frame: &mut Frame, state: &FunnelState, theme: &Theme, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    if state.path_active {
        lines.push(Line::from(vec![
            Span::styled("  Open report: ", theme.text()),
            Span::styled(
                format!("{}▌", state.path_buffer),
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
            ),
            Span::styled("   Enter load · Esc cancel", theme.text_dim()),
        ]));
    } else if state.search_active {
        lines.push(Line::from(vec![
            Span::styled("  Search: ", theme.text()),
            Span::styled(
                format!("{}▌", state.opts.keyword),
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
            ),
            Span::styled("   Enter/Esc done", theme.text_dim()),
        ]));
    } else {
        let summary = state.graph.summary();
        let mut spans = vec![Span::styled(
            format!(
                "  {} platforms · {} links · coop {} · sales {}",
                summary.platform_count,
                summary.edge_count,
                format_count(summary.total_coop),
                format_amount(summary.total_sales),
            ),
            theme.text_dim(),
        )];
        match state.opts.active_keyword() {
            Some(kw) => {
                spans.push(Span::styled("   search: ", theme.text_dim()));
                spans.push(Span::styled(
                    kw.to_string(),
                    Style::default().fg(theme.warning).add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::styled(
                    format!(" ({} matched)", state.spec.matched_platforms.len()),
                    theme.text_dim(),
                ));
            }
            None => {
                spans.push(Span::styled("   / search", theme.text_dim()));
            }
        }
        if let Some(t) = &state.loaded_at {
            spans.push(Span::styled(
                format!("   {} · {}", state.source.describe(), t.format("%H:%M:%S")),
                theme.text_dim(),
            ));
        }
        lines.push(Line::from(spans));
    }

    // Scale factors, selected stage highlighted
    let mut scale_spans: Vec<Span> = vec![Span::styled("  Width ", theme.text_dim())];
    for stage in Stage::all() {
        let factor = state.opts.scales.get(*stage);
        let text = format!(" {} ×{:.2} ", stage.label(), factor);
        let style = if *stage == state.selected_stage {
            theme.tab_active()
        } else if (factor - 1.0).abs() > 1e-9 {
            theme.warning()
        } else {
            theme.tab_inactive()
        };
        scale_spans.push(Span::styled(text, style));
    }
    scale_spans.push(Span::styled("  h/l pick · +/- adjust · x reset", theme.text_dim()));
    lines.push(Line::from(scale_spans));

    let widget = Paragraph::new(lines).style(theme.block_style());
    frame.render_widget(widget, area);
}

// ── Empty / error states ──

fn render_load_error(frame: &mut Frame, err: &str, theme: &Theme, area: Rect) {
    let block = bordered_block(" Report ", theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        Line::raw(""),
        Line::styled("  ✗ Failed to load report", theme.error()),
        Line::raw(""),
        Line::styled(format!("  {}", err), theme.text()),
        Line::raw(""),
        Line::styled("  Press o to open another file, r to retry", theme.text_dim()),
    ];
    frame.render_widget(
        Paragraph::new(lines).style(theme.block_style()).wrap(Wrap { trim: false }),
        inner,
    );
}

fn render_empty_hint(frame: &mut Frame, state: &FunnelState, theme: &Theme, area: Rect) {
    let block = bordered_block(" Report ", theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let hint = match &state.source {
        ReportSource::None => "  No report loaded. Press o and enter a CSV path.",
        _ => "  The report contains no usable rows.",
    };
    let lines = vec![
        Line::raw(""),
        Line::styled(hint, theme.text()),
        Line::raw(""),
        Line::styled(
            "  Expected columns: 联盟营销平台类型, 合作数量, Clicks, Orders, Sales",
            theme.text_dim(),
        ),
    ];
    frame.render_widget(Paragraph::new(lines).style(theme.block_style()), inner);
}

// ── Diagram ──

/// Column index for a node id: platforms first, then one column per stage.
/// Stage totals share the column of their stage.
fn column_of(id: &str) -> usize {
    for (i, stage) in Stage::all().iter().enumerate() {
        if id.ends_with(stage.suffix()) || id == stage.total_name() {
            return i + 1;
        }
    }
    0
}

fn render_diagram(frame: &mut Frame, state: &FunnelState, theme: &Theme, area: Rect) {
    let spec = &state.spec;

    let show_detail = area.width >= 100;
    let (columns_area, detail_area) = if show_detail {
        let split = Layout::horizontal([Constraint::Min(60), Constraint::Length(38)]).split(area);
        (split[0], Some(split[1]))
    } else {
        (area, None)
    };

    // Scaled flow per node, for bar widths: a platform's weight is its
    // outflow, everything else weighs its inflow.
    let mut inflow: HashMap<&str, f64> = HashMap::new();
    let mut outflow: HashMap<&str, f64> = HashMap::new();
    for link in &spec.links {
        *inflow.entry(link.target_id.as_str()).or_insert(0.0) += link.value;
        *outflow.entry(link.source_id.as_str()).or_insert(0.0) += link.value;
    }
    let weight = |node: &DiagramNode| {
        if column_of(&node.id) == 0 {
            outflow.get(node.id.as_str()).copied().unwrap_or(0.0)
        } else {
            inflow.get(node.id.as_str()).copied().unwrap_or(0.0)
        }
    };

    let mut col_max = [0.0f64; 5];
    for node in &spec.nodes {
        let col = column_of(&node.id);
        col_max[col] = col_max[col].max(weight(node));
    }

    let col_areas = Layout::horizontal([Constraint::Ratio(1, 5); 5]).split(columns_area);
    let titles = ["Platforms", "合作数量", "Clicks", "Orders", "Sales"];

    for (col, col_area) in col_areas.iter().enumerate() {
        let block = bordered_block(&format!(" {} ", titles[col]), theme);
        let inner = block.inner(*col_area);
        frame.render_widget(block, *col_area);
        if inner.width < 6 {
            continue;
        }

        let bar_width = (inner.width as usize).saturating_sub(4).min(16);
        let mut lines: Vec<Line> = Vec::new();

        for (i, node) in spec.nodes.iter().enumerate() {
            if column_of(&node.id) != col {
                continue;
            }
            let selected = i == state.selected_node;
            let marker = if selected { "▶" } else { " " };
            let color = palette::terminal_color(&node.color);

            let name = truncate(&node.id, (inner.width as usize).saturating_sub(3));
            let name_style = if selected {
                theme.selected()
            } else if node.matched {
                Style::default().fg(color).add_modifier(Modifier::BOLD)
            } else {
                theme.text_dim()
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{} ", marker), theme.text()),
                Span::styled(name, name_style),
            ]));

            let fraction = if col_max[col] > 0.0 {
                weight(node) / col_max[col]
            } else {
                0.0
            };
            let bar_style = if node.matched {
                Style::default().fg(color)
            } else {
                theme.text_dim()
            };
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(widgets::value_bar(bar_width, fraction), bar_style),
            ]));
        }

        frame.render_widget(Paragraph::new(lines).style(theme.block_style()), inner);
    }

    if let Some(detail_area) = detail_area {
        render_node_detail(frame, state, theme, detail_area);
    }
}

fn render_node_detail(frame: &mut Frame, state: &FunnelState, theme: &Theme, area: Rect) {
    let block = bordered_block(" Node ", theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(node) = state.spec.nodes.get(state.selected_node) else {
        frame.render_widget(
            Paragraph::new(Line::styled("  no nodes", theme.text_dim())).style(theme.block_style()),
            inner,
        );
        return;
    };

    let color = palette::terminal_color(&node.color);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("  ■ ", Style::default().fg(color)),
            Span::styled(node.id.clone(), theme.title()),
        ]),
        Line::raw(""),
        Line::from(vec![
            Span::styled("  incoming  ", theme.text_dim()),
            Span::styled(format_count(node.incoming), theme.text()),
        ]),
        Line::from(vec![
            Span::styled("  outgoing  ", theme.text_dim()),
            Span::styled(format_count(node.outgoing), theme.text()),
        ]),
    ];
    if !node.ratio_label.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("  ", theme.text_dim()),
            Span::styled(node.ratio_label.clone(), theme.warning()),
        ]));
    }

    // Incident links
    let incident: Vec<&DiagramLink> = state
        .spec
        .links
        .iter()
        .filter(|l| l.source_id == node.id || l.target_id == node.id)
        .collect();
    if !incident.is_empty() {
        lines.push(Line::raw(""));
        lines.push(Line::styled("  links", theme.text_dim()));
        let name_width = (inner.width as usize).saturating_sub(14).max(8);
        for link in incident.iter().take(8) {
            let (arrow, other) = if link.source_id == node.id {
                ("→", link.target_id.as_str())
            } else {
                ("←", link.source_id.as_str())
            };
            lines.push(Line::from(vec![
                Span::styled(format!("  {} ", arrow), theme.text_dim()),
                Span::styled(
                    truncate(other, name_width),
                    Style::default().fg(palette::terminal_color(&link.color)),
                ),
                Span::styled(format!("  {}", format_count(link.value)), theme.text()),
            ]));
        }
        if incident.len() > 8 {
            lines.push(Line::styled(
                format!("  … {} more → [F2]", incident.len() - 8),
                theme.text_dim(),
            ));
        }
    }

    frame.render_widget(Paragraph::new(lines).style(theme.block_style()), inner);
}

// ── Links table ──

fn render_links(frame: &mut Frame, state: &FunnelState, theme: &Theme, area: Rect) {
    let spec = &state.spec;
    let block = bordered_block(&format!(" Links ({}) ", spec.links.len()), theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height < 2 {
        return;
    }

    let name_width = ((inner.width as usize).saturating_sub(40) / 2).clamp(8, 24);
    let mut lines = vec![Line::styled(
        format!(
            "    {:<nw$} {:<nw$} {:>10} {:>10} {:>8}",
            "source",
            "target",
            "width",
            "value",
            "of total",
            nw = name_width,
        ),
        theme.text_dim(),
    )];

    let visible = (inner.height as usize).saturating_sub(1);
    let scroll = state.table_scroll.min(spec.links.len().saturating_sub(1));
    for link in spec.links.iter().skip(scroll).take(visible) {
        let style = if link.matched { theme.text() } else { theme.text_dim() };
        lines.push(Line::from(vec![
            Span::styled("  ■ ", Style::default().fg(palette::terminal_color(&link.color))),
            Span::styled(
                format!(
                    "{:<nw$} {:<nw$} ",
                    truncate(&link.source_id, name_width),
                    truncate(&link.target_id, name_width),
                    nw = name_width,
                ),
                style,
            ),
            Span::styled(format!("{:>10} ", format_amount(link.value)), style),
            Span::styled(
                format!("{:>10} ", format_count(link.original_value)),
                style,
            ),
            Span::styled(format!("{:>7.1}%", link.baseline_pct), theme.warning()),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).style(theme.block_style()), inner);
}

// ── Data table (raw edge universe) ──

fn render_data(frame: &mut Frame, state: &FunnelState, theme: &Theme, area: Rect) {
    let edges = &state.graph.edges;
    let block = bordered_block(&format!(" Data ({} rows) ", edges.len()), theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height < 2 {
        return;
    }

    let name_width = ((inner.width as usize).saturating_sub(30) / 3).clamp(8, 22);
    let mut lines = vec![Line::styled(
        format!(
            "  {:<nw$} {:<nw$} {:<nw$} {:>12}",
            "source",
            "target",
            "platform",
            "value",
            nw = name_width,
        ),
        theme.text_dim(),
    )];

    let visible = (inner.height as usize).saturating_sub(1);
    let scroll = state.table_scroll.min(edges.len().saturating_sub(1));
    for edge in edges.iter().skip(scroll).take(visible) {
        lines.push(Line::from(vec![
            Span::styled(
                format!(
                    "  {:<nw$} {:<nw$} ",
                    truncate(&edge.source, name_width),
                    truncate(&edge.target, name_width),
                    nw = name_width,
                ),
                theme.text(),
            ),
            Span::styled(
                format!("{:<nw$} ", truncate(&edge.group, name_width), nw = name_width),
                Style::default().fg(palette::terminal_color(palette::node_color(&edge.group))),
            ),
            Span::styled(format!("{:>12}", format_amount(edge.value)), theme.text()),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).style(theme.block_style()), inner);
}

// ── Platforms table ──

fn render_platforms(frame: &mut Frame, state: &FunnelState, theme: &Theme, area: Rect) {
    let rollup = state.graph.platform_rollup();
    let block = bordered_block(&format!(" Platforms ({}) ", rollup.len()), theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height < 2 {
        return;
    }

    let max_value = rollup
        .iter()
        .map(|p| p.total_value)
        .fold(0.0f64, f64::max)
        .max(1.0);
    let name_width = ((inner.width as usize).saturating_sub(44)).clamp(10, 28);
    let bar_width = 20;

    let mut lines = vec![Line::styled(
        format!(
            "    {:<nw$} {:>12} {:>6}  share",
            "platform",
            "total",
            "links",
            nw = name_width,
        ),
        theme.text_dim(),
    )];

    let visible = (inner.height as usize).saturating_sub(1);
    let scroll = state.table_scroll.min(rollup.len().saturating_sub(1));
    for stats in rollup.iter().skip(scroll).take(visible) {
        let matched = state
            .spec
            .matched_platforms
            .iter()
            .any(|p| p == &stats.platform);
        let marker = if matched { "★ " } else { "  " };
        let color = palette::terminal_color(palette::node_color(&stats.platform));
        lines.push(Line::from(vec![
            Span::styled(marker, theme.warning()),
            Span::styled(
                format!("{:<nw$} ", truncate(&stats.platform, name_width), nw = name_width),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{:>12} {:>6}  ", format_amount(stats.total_value), stats.edge_count),
                theme.text(),
            ),
            Span::styled(
                widgets::value_bar(bar_width, stats.total_value / max_value),
                Style::default().fg(color),
            ),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).style(theme.block_style()), inner);
}

// ── Helpers ──

fn bordered_block<'a>(title: &str, theme: &Theme) -> Block<'a> {
    Block::default()
        .style(theme.block_style())
        .title(title.to_string())
        .title_style(theme.title())
        .borders(Borders::ALL)
        .border_style(theme.border())
}

/// Char-boundary-safe truncation with ellipsis.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_of() {
        assert_eq!(column_of("联盟客"), 0);
        assert_eq!(column_of("联盟客合作数量"), 1);
        assert_eq!(column_of("总数量"), 1);
        assert_eq!(column_of("联盟客clicks"), 2);
        assert_eq!(column_of("总clicks"), 2);
        assert_eq!(column_of("红人orders"), 3);
        assert_eq!(column_of("联盟客sales"), 4);
        assert_eq!(column_of("总sales"), 4);
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("联盟客", 8), "联盟客");
        assert_eq!(truncate("联盟客合作数量", 4), "联盟客…");
        assert_eq!(truncate("short", 5), "short");
    }
}
