//! Consecutive identical failure tracking

/// Counts consecutive ticks that ended with the same failure kind
///
/// A misconfigured target fails the same way forever; the streak lets the
/// loop report that once, distinctly, instead of as one more routine failure.
#[derive(Debug, Clone)]
pub struct FailureStreak {
    threshold: u32,
    kind: Option<&'static str>,
    count: u32,
}

impl FailureStreak {
    /// `threshold` of zero disables escalation
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            kind: None,
            count: 0,
        }
    }

    /// Record one failure; true exactly when the streak reaches the threshold
    pub fn record(&mut self, kind: &'static str) -> bool {
        if self.kind == Some(kind) {
            self.count = self.count.saturating_add(1);
        } else {
            self.kind = Some(kind);
            self.count = 1;
        }
        self.threshold > 0 && self.count == self.threshold
    }

    pub fn reset(&mut self) {
        self.kind = None;
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Whether the current streak has reached the threshold
    pub fn is_escalated(&self) -> bool {
        self.threshold > 0 && self.count >= self.threshold
    }
}
