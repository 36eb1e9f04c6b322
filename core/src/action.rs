//! Wire action codes used in the leading column of a diff table.

/// Closed set of row action codes. Update separators are dynamic
/// (`->`, `-->`, ...) so [`ActionKind::classify`] folds them all into
/// [`ActionKind::Update`]; the caller keeps the literal string when the
/// exact separator matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Untouched row carried for context.
    Plain,
    /// `@@` column-name header row.
    Header,
    /// `!` schema-change row of per-column modifiers.
    Schema,
    /// `+++` inserted row.
    Insert,
    /// `---` deleted row.
    Delete,
    /// `+` row with cell-level additions only.
    CellAddition,
    /// `:` moved row.
    Move,
    /// Row with `v0->v1` style cell updates.
    Update,
    /// `...` elision between context windows.
    Skip,
}

impl ActionKind {
    pub fn classify(act: &str) -> ActionKind {
        match act {
            "@@" => ActionKind::Header,
            "!" => ActionKind::Schema,
            "+++" => ActionKind::Insert,
            "---" => ActionKind::Delete,
            "+" => ActionKind::CellAddition,
            ":" => ActionKind::Move,
            "..." => ActionKind::Skip,
            _ if act.contains("->") => ActionKind::Update,
            _ => ActionKind::Plain,
        }
    }

    /// Canonical wire string. Updates report the root separator; the
    /// diff builder may emit a longer one.
    pub fn as_wire(&self) -> &'static str {
        match self {
            ActionKind::Plain => "",
            ActionKind::Header => "@@",
            ActionKind::Schema => "!",
            ActionKind::Insert => "+++",
            ActionKind::Delete => "---",
            ActionKind::CellAddition => "+",
            ActionKind::Move => ":",
            ActionKind::Update => "->",
            ActionKind::Skip => "...",
        }
    }
}
