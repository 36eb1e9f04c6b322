//! HTML rendering of diff tables.
//!
//! [`DiffRender`] walks a diff table (the output of
//! [`TableDiff::hilite`](crate::TableDiff::hilite)), re-derives the
//! state of every cell through [`examine_cell`], and emits an HTML
//! table with css classes per change category plus a matching sample
//! stylesheet.

use std::fmt;

use crate::table::Table;

/// Change category of a rendered cell, doubling as its css class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CellCategory {
    #[default]
    None,
    Add,
    Remove,
    Modify,
    Conflict,
    Spec,
    Move,
    Header,
}

impl CellCategory {
    pub fn css_class(&self) -> &'static str {
        match self {
            CellCategory::None => "",
            CellCategory::Add => "add",
            CellCategory::Remove => "remove",
            CellCategory::Modify => "modify",
            CellCategory::Conflict => "conflict",
            CellCategory::Spec => "spec",
            CellCategory::Move => "move",
            CellCategory::Header => "header",
        }
    }
}

/// Everything knowable about one diff-table cell: its category, and
/// for updated cells the parent/local/remote fragments split out of
/// the `old->new` (or `p!->l!->r`) encoding.
#[derive(Debug, Clone, Default)]
pub struct CellInfo {
    pub value: String,
    pub pretty_value: String,
    pub category: CellCategory,
    pub category_given_tr: CellCategory,
    pub separator: String,
    pub conflicted: bool,
    pub updated: bool,
    pub pvalue: Option<String>,
    pub lvalue: Option<String>,
    pub rvalue: Option<String>,
}

impl fmt::Display for CellInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.updated {
            return write!(f, "{}", self.value);
        }
        let lvalue = self.lvalue.as_deref().unwrap_or("");
        let rvalue = self.rvalue.as_deref().unwrap_or("");
        if !self.conflicted {
            return write!(f, "{lvalue}::{rvalue}");
        }
        let pvalue = self.pvalue.as_deref().unwrap_or("");
        write!(f, "{pvalue}||{lvalue}::{rvalue}")
    }
}

/// Classify one cell given its row action `vrow` and the modifier for
/// its column from the schema row, `vcol`.
pub(crate) fn examine_cell(value: &str, vcol: &str, vrow: &str) -> CellInfo {
    let mut cell = CellInfo {
        value: value.to_string(),
        pretty_value: value.to_string(),
        ..CellInfo::default()
    };
    let mut removed_column = false;
    if vrow == ":" {
        cell.category = CellCategory::Move;
    }
    if vcol.contains("+++") {
        cell.category = CellCategory::Add;
        cell.category_given_tr = CellCategory::Add;
    } else if vcol.contains("---") {
        cell.category = CellCategory::Remove;
        cell.category_given_tr = CellCategory::Remove;
        removed_column = true;
    }
    if vrow == "!" {
        cell.category = CellCategory::Spec;
    } else if vrow == "@@" {
        cell.category = CellCategory::Header;
    } else if vrow == "+++" {
        if !removed_column {
            cell.category = CellCategory::Add;
        }
    } else if vrow == "---" {
        cell.category = CellCategory::Remove;
    } else if vrow.contains("->") {
        if !removed_column {
            // `name!sep` scopes the separator; the bare part matches
            // plain updates, the full form marks a conflict.
            let full = vrow;
            let part = vrow.split('!').nth(1).unwrap_or(full);
            if cell.value.contains(part) {
                let mut cat = CellCategory::Modify;
                let mut div = part;
                if part != full && cell.value.contains(full) {
                    div = full;
                    cat = CellCategory::Conflict;
                    cell.conflicted = true;
                }
                cell.updated = true;
                cell.separator = div.to_string();
                let parts: Vec<String> = cell.value.split(div).map(String::from).collect();
                cell.pretty_value = parts.join("\u{2192}");
                cell.category = cat;
                cell.category_given_tr = cat;
                let offset = if cell.conflicted { 1 } else { 0 };
                cell.lvalue = parts.get(offset).cloned();
                cell.rvalue = parts.get(offset + 1).cloned();
                if cell.conflicted {
                    cell.pvalue = parts.first().cloned();
                }
            }
        }
    }
    cell
}

/// Classify a single cell of a diff table, honoring the `@:@` corner
/// offset.
pub fn render_cell(rows: &Table, x: usize, y: usize) -> CellInfo {
    let corner = rows.cell_text(0, 0);
    let off = if corner == "@:@" { 1 } else { 0 };
    examine_cell(
        rows.cell_text(x, y),
        rows.cell_text(x, off),
        rows.cell_text(off, y),
    )
}

const SAMPLE_CSS: &str = ".highlighter .add { \n  background-color: #7fff7f;\n}\n\n\
.highlighter .remove { \n  background-color: #ff7f7f;\n}\n\n\
.highlighter td.modify { \n  background-color: #7f7fff;\n}\n\n\
.highlighter td.conflict { \n  background-color: #f00;\n}\n\n\
.highlighter .spec { \n  background-color: #aaa;\n}\n\n\
.highlighter .move { \n  background-color: #ffa;\n}\n\n\
.highlighter .null { \n  color: #888;\n}\n\n\
.highlighter table { \n  border-collapse:collapse;\n}\n\n\
.highlighter td, .highlighter th {\n  border: 1px solid #2D4068;\n  padding: 3px 7px 2px;\n}\n\n\
.highlighter th, .highlighter .header { \n  background-color: #aaf;\n  font-weight: bold;\n  \
padding-bottom: 4px;\n  padding-top: 5px;\n  text-align:left;\n}\n\n\
.highlighter tr:first-child td {\n  border-top: 1px solid #2D4068;\n}\n\n\
.highlighter td:first-child { \n  border-left: 1px solid #2D4068;\n}\n\n\
.highlighter td {\n  empty-cells: show;\n}\n";

pub struct DiffRender {
    text_to_insert: Vec<String>,
    td_open: &'static str,
    td_close: &'static str,
    pretty_arrows: bool,
}

impl Default for DiffRender {
    fn default() -> Self {
        DiffRender::new()
    }
}

impl DiffRender {
    pub fn new() -> Self {
        DiffRender {
            text_to_insert: Vec::new(),
            td_open: "<td",
            td_close: "</td>",
            pretty_arrows: true,
        }
    }

    /// Replace `->` separators with a real arrow in rendered cells.
    /// On by default.
    pub fn use_pretty_arrows(&mut self, flag: bool) {
        self.pretty_arrows = flag;
    }

    pub fn render(&mut self, rows: &Table) {
        if rows.width() == 0 || rows.height() == 0 {
            return;
        }
        self.begin_table();
        let mut change_row: Option<usize> = None;
        let corner = rows.cell_text(0, 0).to_string();
        let off = if corner == "@:@" { 1 } else { 0 };
        if off > 0 && (rows.width() <= 1 || rows.height() <= 1) {
            return;
        }
        for row in 0..rows.height() {
            let txt = rows.cell_text(off, row).to_string();
            let row_mode = examine_cell(&txt, "", &txt).category;
            if row_mode == CellCategory::Spec {
                change_row = Some(row);
            }
            self.begin_row(row_mode);
            for c in 0..rows.width() {
                let vcol = match change_row {
                    Some(cr) => rows.cell_text(c, cr),
                    None => "",
                };
                let cell = examine_cell(rows.cell_text(c, row), vcol, &txt);
                let shown = if self.pretty_arrows {
                    &cell.pretty_value
                } else {
                    &cell.value
                };
                self.insert_cell(shown, cell.category_given_tr);
            }
            self.end_row();
        }
        self.end_table();
    }

    /// Wrap what has been rendered so far into a standalone page with
    /// the sample stylesheet inlined.
    pub fn complete_html(&mut self) {
        self.text_to_insert.insert(
            0,
            "<html>\n<meta charset='utf-8'>\n<head>\n<style TYPE='text/css'>\n".to_string(),
        );
        self.text_to_insert.insert(1, self.sample_css().to_string());
        self.text_to_insert.insert(
            2,
            "</style>\n</head>\n<body>\n<div class='highlighter'>\n".to_string(),
        );
        self.text_to_insert
            .push("</div>\n</body>\n</html>\n".to_string());
    }

    pub fn sample_css(&self) -> &'static str {
        SAMPLE_CSS
    }

    pub fn html(&self) -> String {
        self.text_to_insert.concat()
    }

    fn begin_table(&mut self) {
        self.insert("<table>\n");
    }

    fn end_table(&mut self) {
        self.insert("</table>\n");
    }

    fn begin_row(&mut self, mode: CellCategory) {
        self.td_open = "<td";
        self.td_close = "</td>";
        let mut row_class = "";
        if mode == CellCategory::Header {
            self.td_open = "<th";
            self.td_close = "</th>";
        } else {
            row_class = mode.css_class();
        }
        if row_class.is_empty() {
            self.insert("<tr>");
        } else {
            self.insert(format!("<tr class=\"{row_class}\">"));
        }
    }

    fn end_row(&mut self) {
        self.insert("</tr>\n");
    }

    fn insert_cell(&mut self, txt: &str, mode: CellCategory) {
        let open = self.td_open;
        let close = self.td_close;
        if mode == CellCategory::None {
            self.insert(format!("{open}>"));
        } else {
            self.insert(format!("{open} class=\"{}\">", mode.css_class()));
        }
        self.insert(txt.to_string());
        self.insert(close);
    }

    fn insert(&mut self, s: impl Into<String>) {
        self.text_to_insert.push(s.into());
    }
}
