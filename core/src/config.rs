//! Display flags for diff rendering.
//!
//! `CompareFlags` collects the knobs that shape a hilite table: header and
//! unchanged-row visibility, context window size, and whether reorder
//! annotations are emitted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareFlags {
    /// Treat row order as meaningful and report moves.
    pub ordered: bool,
    /// Emit every row, not just changed rows plus context.
    pub show_unchanged: bool,
    /// Unchanged rows kept on each side of a change when
    /// `show_unchanged` is off.
    pub unchanged_context: usize,
    /// Always emit the reorder annotation row/column, even without moves.
    pub always_show_order: bool,
    /// Never emit the reorder annotation row/column, even with moves.
    pub never_show_order: bool,
    /// Emit the `@@` header row.
    pub always_show_header: bool,
}

impl Default for CompareFlags {
    fn default() -> Self {
        CompareFlags {
            ordered: true,
            show_unchanged: false,
            unchanged_context: 1,
            always_show_order: false,
            never_show_order: true,
            always_show_header: true,
        }
    }
}

impl CompareFlags {
    /// Full listing: every row appears, unchanged ones included.
    pub fn show_all() -> Self {
        CompareFlags {
            show_unchanged: true,
            ..Default::default()
        }
    }

    /// Default flags plus `[p|l:r]` reorder annotations when rows or
    /// columns moved.
    pub fn with_order_annotations() -> Self {
        CompareFlags {
            never_show_order: false,
            ..Default::default()
        }
    }
}
