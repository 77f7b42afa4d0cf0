//! Scoped filtering of decoder diagnostics.
//!
//! Decoding a SEVIRI scene produces a steady stream of harmless numeric
//! warnings (fill values, NaN arithmetic, time rounding). A [`WarningScope`]
//! swallows those for the duration of one decode call and logs everything
//! else. Nothing is filtered outside a scope.

use tracing::{debug, trace, warn};

/// Substrings of diagnostics known to be harmless, matched case-insensitively.
const BENIGN_PATTERNS: &[&str] = &[
    "invalid value encountered",
    "divide by zero encountered",
    "all-nan slice",
    "mean of empty slice",
    "missing value",
    "fill value",
    "_fillvalue",
    "rounding",
];

/// Markers that always pass through, even when a benign pattern matches.
const ERROR_MARKERS: &[&str] = &["error", "traceback", "exception"];

/// Set of diagnostics to drop while decoding.
#[derive(Debug, Clone)]
pub struct WarningFilter {
    patterns: Vec<String>,
}

impl Default for WarningFilter {
    fn default() -> Self {
        Self::new(BENIGN_PATTERNS.iter().copied())
    }
}

impl WarningFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Filter that lets everything through.
    pub fn none() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn is_benign(&self, line: &str) -> bool {
        let line = line.to_lowercase();
        if ERROR_MARKERS.iter().any(|m| line.contains(m)) {
            return false;
        }
        self.patterns.iter().any(|p| line.contains(p.as_str()))
    }

    /// Open a scope for one decode call.
    pub fn scope(&self, context: impl Into<String>) -> WarningScope<'_> {
        WarningScope {
            filter: self,
            context: context.into(),
            suppressed: 0,
            reported: 0,
        }
    }
}

/// Active filter for one decode call; reports what it dropped when closed.
#[derive(Debug)]
pub struct WarningScope<'a> {
    filter: &'a WarningFilter,
    context: String,
    suppressed: usize,
    reported: usize,
}

impl WarningScope<'_> {
    /// Feed one diagnostic line from the decoder.
    pub fn observe(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if self.filter.is_benign(line) {
            self.suppressed += 1;
            trace!(context = %self.context, "Suppressed: {}", line);
        } else {
            self.reported += 1;
            warn!(context = %self.context, "{}", line);
        }
    }

    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    pub fn reported(&self) -> usize {
        self.reported
    }
}

impl Drop for WarningScope<'_> {
    fn drop(&mut self) {
        if self.suppressed > 0 {
            debug!(
                context = %self.context,
                suppressed = self.suppressed,
                "Suppressed benign decoder warnings"
            );
        }
    }
}
