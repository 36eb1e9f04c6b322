//! CSV dialect used for table IO.
//!
//! Not a general-purpose CSV reader. The dialect is fixed: comma
//! delimiter, CRLF row terminators on output (any of CR, LF, CRLF on
//! input), a quote character sniffed per cell (`"` or `'`) with
//! doubling inside quoted cells, and a `NULL` sentinel for null cells.
//! A literal cell that would read back as the sentinel is escaped with
//! a leading underscore, and one underscore is stripped on the way in.

use crate::cell::CellView;
use crate::table::Table;

#[derive(Debug, Default)]
pub struct Csv {
    cursor: usize,
    row_ended: bool,
    has_structure: bool,
}

impl Csv {
    pub fn new() -> Self {
        Csv {
            cursor: 0,
            row_ended: false,
            has_structure: false,
        }
    }

    /// Parse one cell with structure disabled: commas, quotes and
    /// newlines are all literal, only the `NULL` sentinel and its
    /// underscore escape apply.
    pub fn parse_single_cell(&mut self, txt: &str) -> Option<String> {
        self.cursor = 0;
        self.row_ended = false;
        self.has_structure = false;
        let chars: Vec<char> = txt.chars().collect();
        self.parse_cell(&chars)
    }

    /// Parse a full table. Rows split on CR, LF or CRLF; a final row
    /// without a terminator is kept.
    pub fn parse_table(&mut self, txt: &str) -> Vec<Vec<Option<String>>> {
        self.cursor = 0;
        self.row_ended = false;
        self.has_structure = true;
        let chars: Vec<char> = txt.chars().collect();
        let mut result: Vec<Vec<Option<String>>> = Vec::new();
        let mut row: Vec<Option<String>> = Vec::new();
        while self.cursor < chars.len() {
            let cell = self.parse_cell(&chars);
            row.push(cell);
            if self.row_ended {
                result.push(std::mem::take(&mut row));
            }
            self.cursor += 1;
        }
        if !row.is_empty() {
            result.push(row);
        }
        result
    }

    fn parse_cell(&mut self, chars: &[char]) -> Option<String> {
        self.row_ended = false;
        let start = self.cursor;
        let mut first_non_underscore: Option<usize> = None;
        let mut last_processed = start;
        let mut quoting = false;
        let mut quote: Option<char> = None;
        let mut result = String::new();
        let mut i = start;
        while i < chars.len() {
            let ch = chars[i];
            last_processed = i;
            if ch != '_' && first_non_underscore.is_none() {
                first_non_underscore = Some(i);
            }
            if self.has_structure {
                if !quoting {
                    if ch == ',' {
                        break;
                    }
                    if ch == '\r' || ch == '\n' {
                        // A two-character terminator (CRLF or LFCR)
                        // consumes both characters.
                        if let Some(&ch2) = chars.get(i + 1) {
                            if ch2 != ch && (ch2 == '\r' || ch2 == '\n') {
                                last_processed += 1;
                            }
                        }
                        self.row_ended = true;
                        break;
                    }
                    if i == start && (ch == '"' || ch == '\'') {
                        quoting = true;
                        quote = Some(ch);
                        i += 1;
                        continue;
                    }
                } else if Some(ch) == quote {
                    if chars.get(i + 1).copied() == quote {
                        // Doubled quote: one literal quote character.
                        result.push(ch);
                        last_processed = i + 1;
                        i += 2;
                        continue;
                    }
                    quoting = false;
                    i += 1;
                    continue;
                }
            }
            result.push(ch);
            i += 1;
        }
        self.cursor = last_processed;

        // The sentinel only applies to unquoted cells.
        if quote.is_none() {
            if result == "NULL" {
                return None;
            }
            let stripped = result.trim_start_matches('_');
            if stripped.len() < result.len() && stripped == "NULL" {
                return Some(result[1..].to_string());
            }
        }
        Some(result)
    }

    /// Render one cell. Null and blank cells become the `NULL`
    /// sentinel; a value that would read back as the sentinel gains a
    /// protective underscore.
    pub fn render_cell(&self, d: Option<&str>) -> String {
        let view = CellView::new();
        if view.is_blank(d) {
            return "NULL".to_string();
        }
        let mut text = d.unwrap_or("").to_string();
        if text.trim_start_matches('_') == "NULL" {
            text.insert(0, '_');
        }
        let need_quote = text
            .chars()
            .any(|ch| matches!(ch, '"' | '\'' | ',' | '\r' | '\n' | '\t' | ' '));
        let mut result = String::new();
        if need_quote {
            result.push('"');
        }
        // Newline runs are buffered so that a trailing run is dropped.
        let mut line_buf = String::new();
        for ch in text.chars() {
            if ch != '\r' && ch != '\n' {
                if !line_buf.is_empty() {
                    result.push_str(&line_buf);
                    line_buf.clear();
                }
                if ch == '"' {
                    result.push('"');
                }
                result.push(ch);
            } else {
                line_buf.push(ch);
            }
        }
        if need_quote {
            result.push('"');
        }
        result
    }

    /// Render a full table with CRLF row terminators, including after
    /// the last row.
    pub fn render_table(&self, t: &Table) -> String {
        let mut txt = String::new();
        for y in 0..t.height() {
            for x in 0..t.width() {
                if x > 0 {
                    txt.push(',');
                }
                txt.push_str(&self.render_cell(t.cell(x, y)));
            }
            txt.push_str("\r\n");
        }
        txt
    }
}
