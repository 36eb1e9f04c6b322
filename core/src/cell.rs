//! Cell semantics shared by every component.
//!
//! A cell is `Option<&str>`: `None` is the null cell. `CellView` is the
//! one place that defines how cells compare and convert, so the aligner,
//! the diff renderer, and the patcher all agree on what "blank" means.

/// Equality and conversion rules for cell values.
///
/// Null compares equal to null and to the empty string; everything else
/// is plain string comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellView;

impl CellView {
    pub fn new() -> Self {
        CellView
    }

    pub fn equals(&self, d1: Option<&str>, d2: Option<&str>) -> bool {
        match (d1, d2) {
            (None, None) => true,
            (None, Some(s)) | (Some(s), None) => s.is_empty(),
            (Some(a), Some(b)) => a == b,
        }
    }

    /// Canonical text form; the null cell reads as empty.
    pub fn to_text<'a>(&self, d: Option<&'a str>) -> &'a str {
        d.unwrap_or("")
    }

    pub fn to_datum(&self, text: &str) -> Option<String> {
        Some(text.to_owned())
    }

    /// Blank cells are trimmed from table edges and skipped in index keys.
    pub fn is_blank(&self, d: Option<&str>) -> bool {
        self.equals(d, None)
    }
}
