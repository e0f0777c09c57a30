//! Core data types shared across all modules
//!
//! Types used by the report backend and the funnel module.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// A temporary UI message shown to the user (e.g. success/error notifications)
#[derive(Clone)]
pub struct FlashMessage {
    pub text: String,
    pub is_error: bool,
    pub created: Instant,
}

impl FlashMessage {
    pub fn new(text: String, is_error: bool) -> Self {
        Self {
            text,
            is_error,
            created: Instant::now(),
        }
    }

    pub fn is_expired(&self, seconds: u64) -> bool {
        self.created.elapsed().as_secs() >= seconds
    }
}

/// One validated row of the conversion report.
///
/// Numeric fields default to 0.0 when the source cell is missing or
/// unparseable; a record only exists if its platform name is non-blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub platform: String,
    pub coop_count: f64,
    pub click_count: f64,
    pub order_count: f64,
    pub sales: f64,
}

/// The four funnel stages, in chain order.
///
/// Stage membership of a node or edge is decided by substring presence of
/// the stage suffix, checked in this order (coop first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Coop,
    Clicks,
    Orders,
    Sales,
}

impl Stage {
    pub fn all() -> &'static [Stage] {
        &[Stage::Coop, Stage::Clicks, Stage::Orders, Stage::Sales]
    }

    /// Node-id suffix appended to a platform name for this stage.
    pub fn suffix(&self) -> &'static str {
        match self {
            Stage::Coop => "合作数量",
            Stage::Clicks => "clicks",
            Stage::Orders => "orders",
            Stage::Sales => "sales",
        }
    }

    /// Id of the shared aggregate node for this stage.
    pub fn total_name(&self) -> &'static str {
        match self {
            Stage::Coop => "总数量",
            Stage::Clicks => "总clicks",
            Stage::Orders => "总orders",
            Stage::Sales => "总sales",
        }
    }

    /// Hover label for the aggregate node.
    pub fn total_label(&self) -> &'static str {
        match self {
            Stage::Coop => "总合作数量",
            Stage::Clicks => "总Clicks",
            Stage::Orders => "总Orders",
            Stage::Sales => "总Sales",
        }
    }

    /// Short English label for the scale controls.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Coop => "Coop",
            Stage::Clicks => "Clicks",
            Stage::Orders => "Orders",
            Stage::Sales => "Sales",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Stage::Coop => Stage::Clicks,
            Stage::Clicks => Stage::Orders,
            Stage::Orders => Stage::Sales,
            Stage::Sales => Stage::Coop,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Stage::Coop => Stage::Sales,
            Stage::Clicks => Stage::Coop,
            Stage::Orders => Stage::Clicks,
            Stage::Sales => Stage::Orders,
        }
    }
}

pub const SCALE_MIN: f64 = 0.01;
pub const SCALE_MAX: f64 = 10.0;
pub const SCALE_STEP: f64 = 0.1;

/// Per-stage link width multipliers, each clamped to [0.01, 10.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageScales {
    pub coop: f64,
    pub clicks: f64,
    pub orders: f64,
    pub sales: f64,
}

impl Default for StageScales {
    fn default() -> Self {
        Self {
            coop: 1.0,
            clicks: 1.0,
            orders: 1.0,
            sales: 1.0,
        }
    }
}

impl StageScales {
    pub fn get(&self, stage: Stage) -> f64 {
        match stage {
            Stage::Coop => self.coop,
            Stage::Clicks => self.clicks,
            Stage::Orders => self.orders,
            Stage::Sales => self.sales,
        }
    }

    pub fn set(&mut self, stage: Stage, value: f64) {
        let clamped = value.clamp(SCALE_MIN, SCALE_MAX);
        match stage {
            Stage::Coop => self.coop = clamped,
            Stage::Clicks => self.clicks = clamped,
            Stage::Orders => self.orders = clamped,
            Stage::Sales => self.sales = clamped,
        }
    }

    pub fn adjust(&mut self, stage: Stage, delta: f64) {
        self.set(stage, self.get(stage) + delta);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Current interaction state threaded through the pipeline.
///
/// An explicit value, not ambient globals: the composed diagram is a pure
/// function of (graph, view options).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewOptions {
    pub keyword: String,
    pub scales: StageScales,
}

impl ViewOptions {
    /// The trimmed search keyword, or None when search is inactive.
    pub fn active_keyword(&self) -> Option<&str> {
        let kw = self.keyword.trim();
        if kw.is_empty() {
            None
        } else {
            Some(kw)
        }
    }
}

/// Format a count with thousands separators, no decimals (e.g. 12,340)
pub fn format_count(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.abs().to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if rounded < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

/// Format a monetary amount with thousands separators and two decimals
pub fn format_amount(value: f64) -> String {
    let whole = format_count(value.trunc());
    let frac = (value.abs().fract() * 100.0).round() as u64;
    // 0.999... rounds up into the integer part
    if frac >= 100 {
        format!("{}.00", format_count(value.round()))
    } else {
        format!("{}.{:02}", whole, frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_suffixes_and_totals() {
        assert_eq!(Stage::Coop.suffix(), "合作数量");
        assert_eq!(Stage::Coop.total_name(), "总数量");
        assert_eq!(Stage::Sales.suffix(), "sales");
        assert_eq!(Stage::Sales.total_name(), "总sales");
    }

    #[test]
    fn test_stage_cycle() {
        let mut s = Stage::Coop;
        for _ in 0..4 {
            s = s.next();
        }
        assert_eq!(s, Stage::Coop);
        assert_eq!(Stage::Coop.prev(), Stage::Sales);
    }

    #[test]
    fn test_scales_clamp() {
        let mut scales = StageScales::default();
        scales.set(Stage::Coop, 25.0);
        assert_eq!(scales.coop, SCALE_MAX);
        scales.set(Stage::Coop, -3.0);
        assert_eq!(scales.coop, SCALE_MIN);
        scales.adjust(Stage::Sales, -0.5);
        assert_eq!(scales.sales, 0.5);
        scales.reset();
        assert_eq!(scales, StageScales::default());
    }

    #[test]
    fn test_active_keyword_trims() {
        let mut opts = ViewOptions::default();
        assert_eq!(opts.active_keyword(), None);
        opts.keyword = "   ".into();
        assert_eq!(opts.active_keyword(), None);
        opts.keyword = " 红人 ".into();
        assert_eq!(opts.active_keyword(), Some("红人"));
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0.0), "0");
        assert_eq!(format_count(999.4), "999");
        assert_eq!(format_count(12340.0), "12,340");
        assert_eq!(format_count(1_234_567.0), "1,234,567");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(200.0), "200.00");
        assert_eq!(format_amount(1234.5), "1,234.50");
        assert_eq!(format_amount(0.999), "1.00");
    }

    #[test]
    fn test_flash_message_expiry() {
        let msg = FlashMessage::new("test".into(), false);
        assert!(!msg.is_expired(3));
        assert_eq!(msg.text, "test");
        assert!(!msg.is_error);
    }
}
