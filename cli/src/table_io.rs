//! File loading and saving for the CLI commands.
//!
//! Input files are sniffed: anything that parses as a JSON workbook or
//! array-of-rows loads through [`table_diff::json_to_table`], everything
//! else is read as CSV. The sniffed format is remembered so tables loaded
//! from JSON are written back as JSON.

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use table_diff::{json_to_table, table_to_json, Csv, Table};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatPreference {
    Csv,
    Json,
}

pub fn load_table(path: &str) -> Result<(Table, FormatPreference)> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read table: {}", path))?;

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
        if let Ok(table) = json_to_table(&value) {
            log::debug!("loaded {} as JSON ({}x{})", path, table.width(), table.height());
            return Ok((table, FormatPreference::Json));
        }
    }

    let mut csv = Csv::new();
    let data = csv.parse_table(&text);
    let h = data.len();
    let w = data.first().map_or(0, Vec::len);
    let mut table = Table::new(w, h);
    for (y, row) in data.into_iter().enumerate() {
        for (x, cell) in row.into_iter().enumerate().take(w) {
            table.set_cell(x, y, cell);
        }
    }
    table.trim_blank();
    log::debug!("loaded {} as CSV ({}x{})", path, table.width(), table.height());
    Ok((table, FormatPreference::Csv))
}

pub fn save_table(dest: &str, table: &Table, format: FormatPreference) -> Result<()> {
    let text = match format {
        FormatPreference::Json => {
            let mut rendered = serde_json::to_string(&table_to_json(table))
                .context("Failed to serialize table as JSON")?;
            rendered.push('\n');
            rendered
        }
        FormatPreference::Csv => Csv::new().render_table(table),
    };
    save_text(dest, &text)
}

pub fn save_text(dest: &str, text: &str) -> Result<()> {
    if dest == "-" {
        io::stdout()
            .lock()
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
    } else {
        fs::write(dest, text).with_context(|| format!("Failed to write: {}", dest))?;
    }
    Ok(())
}
