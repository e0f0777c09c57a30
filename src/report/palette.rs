//! Fixed display palette for diagram nodes and links
//!
//! Each known platform owns a colour; the four stage totals own theirs.
//! Anything unrecognised falls back to a neutral translucent grey so it
//! recedes visually. Colours are kept as CSS-style strings because the
//! exported diagram JSON feeds web renderers; the TUI converts them with
//! [`terminal_color`].
//!
//! Resolution order matters and is relied upon by the compositor:
//! exact id first, then the stage-suffix fallback, then the default.

use once_cell::sync::Lazy;
use ratatui::style::Color;
use std::collections::HashMap;

use crate::types::Stage;

/// Neutral translucent grey for unmatched/dimmed elements.
pub const DEFAULT_COLOR: &str = "rgba(200, 200, 200, 0.2)";

static GROUP_COLORS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("红人", "#9290E6"),
        ("红人合作数量", "#9290E6"),
        ("测评类网站", "#4ECDC4"),
        ("测评类网站合作数量", "#4ECDC4"),
        ("联盟客", "#45B7D1"),
        ("联盟客合作数量", "#45B7D1"),
        ("折扣网站", "#96CEB4"),
        ("折扣网站合作数量", "#96CEB4"),
        ("Deals 网站", "#FFA726"),
        ("Deals 网站合作数量", "#FFA726"),
        ("Deals网站", "#FFA726"),
        ("Deals网站合作数量", "#FFA726"),
        ("总数量", "#1C363F"),
        ("总clicks", "#87CEEB"),
        ("总orders", "#FF6B6B"),
        ("总sales", "#DDA0DD"),
    ])
});

fn lookup(id: &str) -> Option<&'static str> {
    GROUP_COLORS.get(id).copied()
}

/// Resolve a node's colour: exact palette entry, then stage-suffix
/// fallback (coop nodes resolve via their bare platform name, the other
/// stages via their total's entry), then the neutral default.
pub fn node_color(node: &str) -> &'static str {
    if let Some(color) = lookup(node) {
        return color;
    }
    if node.contains(Stage::Coop.suffix()) {
        let platform = node.replace(Stage::Coop.suffix(), "");
        return lookup(&platform).unwrap_or(DEFAULT_COLOR);
    }
    for stage in [Stage::Clicks, Stage::Orders, Stage::Sales] {
        if node.contains(stage.suffix()) {
            return lookup(stage.total_name()).unwrap_or(DEFAULT_COLOR);
        }
    }
    DEFAULT_COLOR
}

/// Resolve a link's colour from its owning platform, falling back to the
/// source node's entry, then the default.
pub fn link_color(group: &str, source: &str) -> &'static str {
    lookup(group).or_else(|| lookup(source)).unwrap_or(DEFAULT_COLOR)
}

/// Convert a palette string to a terminal colour. Hex entries map to RGB;
/// the translucent default (and anything unparseable) maps to dark grey.
pub fn terminal_color(spec: &str) -> Color {
    if let Some(hex) = spec.strip_prefix('#') {
        if hex.len() == 6 {
            if let (Ok(r), Ok(g), Ok(b)) = (
                u8::from_str_radix(&hex[0..2], 16),
                u8::from_str_radix(&hex[2..4], 16),
                u8::from_str_radix(&hex[4..6], 16),
            ) {
                return Color::Rgb(r, g, b);
            }
        }
    }
    Color::DarkGray
}
