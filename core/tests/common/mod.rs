//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use table_diff::{
    compare_tables, compare_tables3, CompareFlags, Csv, HighlightPatch, Table, TableDiff,
};

/// Build a table from a CSV literal.
pub fn table_from_csv(text: &str) -> Table {
    let mut csv = Csv::new();
    let data = csv.parse_table(text);
    let h = data.len();
    let w = data.first().map_or(0, Vec::len);
    let mut table = Table::new(w, h);
    for (y, row) in data.into_iter().enumerate() {
        for (x, cell) in row.into_iter().enumerate().take(w) {
            table.set_cell(x, y, cell);
        }
    }
    table
}

/// Build a table from string rows, every cell present.
pub fn grid(rows: &[&[&str]]) -> Table {
    let h = rows.len();
    let w = rows.first().map_or(0, |row| row.len());
    let mut table = Table::new(w, h);
    for (y, row) in rows.iter().enumerate() {
        for (x, value) in row.iter().enumerate() {
            table.set_cell(x, y, Some((*value).to_string()));
        }
    }
    table
}

pub fn csv_text(table: &Table) -> String {
    Csv::new().render_table(table)
}

/// Two-way diff table with the given flags.
pub fn hilite_with(local: &Table, remote: &Table, flags: CompareFlags) -> Table {
    let mut comparison = compare_tables(local, remote);
    let alignment = comparison.align().expect("alignment should succeed");
    let mut diff = TableDiff::new(alignment, flags);
    let mut out = Table::new(0, 0);
    diff.hilite(&mut out).expect("hilite should succeed");
    out
}

pub fn hilite(local: &Table, remote: &Table) -> Table {
    hilite_with(local, remote, CompareFlags::default())
}

/// Three-way diff table against a common parent.
pub fn hilite3(parent: &Table, local: &Table, remote: &Table) -> Table {
    let mut comparison = compare_tables3(Some(parent), local, remote);
    let alignment = comparison.align().expect("alignment should succeed");
    let mut diff = TableDiff::new(alignment, CompareFlags::default());
    let mut out = Table::new(0, 0);
    diff.hilite(&mut out).expect("hilite should succeed");
    out
}

pub fn apply_patch(source: &mut Table, patch: &Table) {
    let mut patcher = HighlightPatch::new(source, patch);
    patcher.apply().expect("patch should apply");
}

/// Diff `local` against `remote`, apply the result back onto a copy of
/// `local`, and return the reconstruction.
pub fn round_trip(local: &Table, remote: &Table) -> Table {
    let patch = hilite(local, remote);
    let mut source = local.clone();
    apply_patch(&mut source, &patch);
    source
}
