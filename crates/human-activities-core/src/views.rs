use crate::config::{Target, Unit};
use crate::format::{self, PENDING_TEXT, UNKNOWN_TEXT};
use crate::named_dirs::{HIGHLIGHT_COLORS, NEUTRAL_COLOR};
use crate::storage::Directory;
use tracing::debug;

pub const NOTHING_CONFIGURED_TEXT: &str = "Nothing configured";

/// What the UI shows for one directory. Updates produce a new record so that
/// snapshots handed to a consumer never change underneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryView {
    pub label: String,
    pub unit: Unit,
    pub value: Option<u64>,
    pub pending: bool,
    pub fraction: f64,
    pub color: &'static str,
}

impl DirectoryView {
    pub fn new(label: impl Into<String>, unit: Unit, color: &'static str) -> Self {
        Self {
            label: label.into(),
            unit,
            value: None,
            pending: true,
            fraction: 0.0,
            color,
        }
    }

    pub fn with_value(&self, value: Option<u64>, pending: bool) -> Self {
        Self {
            value,
            pending,
            ..self.clone()
        }
    }

    pub fn with_fraction(&self, fraction: f64) -> Self {
        Self {
            fraction,
            ..self.clone()
        }
    }

    /// The value counted towards the total: pending entries keep their stale
    /// value for display but count as zero.
    pub fn known_value(&self) -> u64 {
        if self.pending {
            0
        } else {
            self.value.unwrap_or(0)
        }
    }

    pub fn text(&self) -> String {
        if self.pending {
            return PENDING_TEXT.to_string();
        }
        match self.value {
            Some(value) => format::format_value(value, self.unit),
            None => UNKNOWN_TEXT.to_string(),
        }
    }

    /// One tooltip/menu line, with the share only when the value is current.
    pub fn line(&self) -> String {
        match (self.pending, self.value) {
            (false, Some(_)) => format!(
                "{}: {} ({})",
                self.label,
                self.text(),
                format::format_percent(self.fraction)
            ),
            _ => format!("{}: {}", self.label, self.text()),
        }
    }
}

/// Ordered path → view mapping; the single state a front-end renders.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryViews {
    unit: Unit,
    threshold_days_ago: u32,
    entries: Vec<(String, DirectoryView)>,
}

impl DirectoryViews {
    pub fn new(unit: Unit, threshold_days_ago: u32) -> Self {
        Self {
            unit,
            threshold_days_ago,
            entries: Vec::new(),
        }
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn threshold_days_ago(&self) -> u32 {
        self.threshold_days_ago
    }

    /// Replaces the entries with one pending view per target, in order, and
    /// switches to the given value selector.
    pub fn reset(&mut self, targets: &[Target], unit: Unit, threshold_days_ago: u32) {
        self.unit = unit;
        self.threshold_days_ago = threshold_days_ago;
        self.entries = targets
            .iter()
            .enumerate()
            .map(|(i, target)| {
                let color = HIGHLIGHT_COLORS.get(i).copied().unwrap_or(NEUTRAL_COLOR);
                (
                    target.path.clone(),
                    DirectoryView::new(target.label.clone(), unit, color),
                )
            })
            .collect();
    }

    /// Refreshes the views of `directories` from their stored stats and
    /// recomputes every fraction.
    pub fn load<'a, I>(&mut self, directories: I, pending: bool)
    where
        I: IntoIterator<Item = &'a Directory>,
    {
        for directory in directories {
            let value = directory.value(self.unit, self.threshold_days_ago);
            match self.position(&directory.path) {
                Some(i) => {
                    let view = self.entries[i].1.with_value(value, pending);
                    self.entries[i].1 = view;
                }
                None => debug!("No view for directory {}", directory.path),
            }
        }
        self.recompute_fractions();
    }

    /// Marks a directory whose scan did not finish as unknown.
    pub fn mark_failed(&mut self, path: &str) {
        if let Some(i) = self.position(path) {
            let view = self.entries[i].1.with_value(None, false);
            self.entries[i].1 = view;
            self.recompute_fractions();
        }
    }

    fn position(&self, path: &str) -> Option<usize> {
        self.entries.iter().position(|(p, _)| p == path)
    }

    fn recompute_fractions(&mut self) {
        let total = self.total();
        for (_, view) in self.entries.iter_mut() {
            let fraction = fraction_of(view.known_value(), total);
            *view = view.with_fraction(fraction);
        }
    }

    /// Independent copy safe to hand to another thread.
    pub fn snapshot(&self) -> DirectoryViews {
        self.clone()
    }

    pub fn total(&self) -> u64 {
        self.entries
            .iter()
            .map(|(_, view)| view.known_value())
            .sum()
    }

    pub fn fractions(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, view)| view.fraction).collect()
    }

    pub fn get(&self, path: &str) -> Option<&DirectoryView> {
        self.position(path).map(|i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DirectoryView)> {
        self.entries.iter().map(|(path, view)| (path.as_str(), view))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        self.entries.iter().any(|(_, view)| view.pending)
    }

    pub fn tooltip(&self) -> String {
        if self.entries.is_empty() {
            return NOTHING_CONFIGURED_TEXT.to_string();
        }
        self.entries
            .iter()
            .map(|(_, view)| view.line())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn fraction_of(value: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(value as f64 / total as f64)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
