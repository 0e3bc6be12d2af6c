//! Per-group expand/collapse state.
//!
//! Purely local view state: toggled by the operator, never derived from the
//! data, and reset to collapsed for every group on each reload.

/// Expanded flags for the groups of one timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandState {
    expanded: Vec<bool>,
}

impl ExpandState {
    /// All `group_count` groups collapsed.
    #[must_use]
    pub fn new(group_count: usize) -> Self {
        Self {
            expanded: vec![false; group_count],
        }
    }

    /// Reset after the underlying event list was replaced.
    pub fn reload(&mut self, group_count: usize) {
        self.expanded.clear();
        self.expanded.resize(group_count, false);
    }

    /// Flip group `idx`. Out-of-range indices are ignored.
    ///
    /// Returns the new state, or `None` when `idx` is out of range.
    pub fn toggle(&mut self, idx: usize) -> Option<bool> {
        let flag = self.expanded.get_mut(idx)?;
        *flag = !*flag;
        Some(*flag)
    }

    /// Whether group `idx` is expanded.
    #[must_use]
    pub fn is_expanded(&self, idx: usize) -> bool {
        self.expanded.get(idx).copied().unwrap_or(false)
    }

    /// Expand every group.
    pub fn expand_all(&mut self) {
        self.expanded.fill(true);
    }

    /// Number of tracked groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    /// Returns `true` when no groups are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}
