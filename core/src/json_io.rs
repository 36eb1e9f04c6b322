//! JSON workbook conversion.
//!
//! A workbook is an object of named sheets. A sheet is either an
//! object with `"columns"` and `"rows"` fields, or a bare array of
//! row arrays. The first sheet that parses wins; cell values are
//! stringified on the way in and nulls survive both directions.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::error_codes;
use crate::table::Table;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JsonTableError {
    #[error(
        "[TBLDIFF_JSON_001] Input JSON is not tabular: expected an object of sheets or an \
         array of rows, found {found}. Suggestion: wrap the data as \
         {{\"sheet\": {{\"columns\": [...], \"rows\": [...]}}}}."
    )]
    NotTabular { found: &'static str },
    #[error(
        "[TBLDIFF_JSON_002] No sheet with \"columns\" and \"rows\" fields (or an array of \
         rows) was found. Suggestion: give at least one sheet both fields."
    )]
    SheetMissing,
    #[error(
        "[TBLDIFF_JSON_003] Row {row} of sheet \"{sheet}\" is neither an array of cells nor \
         a column-keyed object. Suggestion: encode every row the same way as the first."
    )]
    BadRow { sheet: String, row: usize },
}

impl JsonTableError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            JsonTableError::NotTabular { .. } => error_codes::JSON_NOT_TABULAR,
            JsonTableError::SheetMissing => error_codes::JSON_SHEET_MISSING,
            JsonTableError::BadRow { .. } => error_codes::JSON_BAD_ROW,
        }
    }
}

/// Convert a parsed JSON workbook into a table, trimming trailing
/// blank rows and columns.
pub fn json_to_table(json: &Value) -> Result<Table, JsonTableError> {
    let mut output = match json {
        Value::Array(rows) => rows_to_table("", rows)?,
        Value::Object(sheets) => {
            let mut found = None;
            for (name, sheet) in sheets {
                match sheet {
                    Value::Object(fields) => {
                        let Some(columns) = fields.get("columns").and_then(Value::as_array)
                        else {
                            continue;
                        };
                        let Some(rows) = fields.get("rows").and_then(Value::as_array) else {
                            continue;
                        };
                        found = Some(sheet_to_table(name, columns, rows)?);
                    }
                    Value::Array(rows) => {
                        found = Some(rows_to_table(name, rows)?);
                    }
                    _ => continue,
                }
                break;
            }
            found.ok_or(JsonTableError::SheetMissing)?
        }
        other => {
            return Err(JsonTableError::NotTabular {
                found: json_kind(other),
            })
        }
    };
    output.trim_blank();
    Ok(output)
}

/// Serialize a table as a single-sheet workbook, `{"sheet": [[...]]}`.
pub fn table_to_json(t: &Table) -> Value {
    let mut sheet = Vec::with_capacity(t.height());
    for y in 0..t.height() {
        let mut row = Vec::with_capacity(t.width());
        for x in 0..t.width() {
            row.push(match t.cell(x, y) {
                Some(v) => Value::String(v.to_string()),
                None => Value::Null,
            });
        }
        sheet.push(Value::Array(row));
    }
    let mut workbook = Map::new();
    workbook.insert("sheet".to_string(), Value::Array(sheet));
    Value::Object(workbook)
}

/// Column-labeled sheet. Rows are positional arrays unless the first
/// row is an object with one field per column, in which case every
/// row is keyed by column name.
fn sheet_to_table(name: &str, columns: &[Value], rows: &[Value]) -> Result<Table, JsonTableError> {
    let column_names: Vec<String> = columns.iter().map(value_to_text).collect();
    let mut output = Table::new(column_names.len(), rows.len());
    let mut keyed: Option<bool> = None;
    for (i, row) in rows.iter().enumerate() {
        let is_keyed = *keyed.get_or_insert_with(|| match row {
            Value::Object(fields) => fields.len() == column_names.len(),
            _ => false,
        });
        match row {
            Value::Array(cells) if !is_keyed => {
                for j in 0..column_names.len() {
                    output.set_cell(j, i, cells.get(j).and_then(value_to_datum));
                }
            }
            Value::Object(fields) if is_keyed => {
                for (j, key) in column_names.iter().enumerate() {
                    output.set_cell(j, i, fields.get(key).and_then(value_to_datum));
                }
            }
            _ => {
                return Err(JsonTableError::BadRow {
                    sheet: name.to_string(),
                    row: i,
                })
            }
        }
    }
    Ok(output)
}

fn rows_to_table(name: &str, rows: &[Value]) -> Result<Table, JsonTableError> {
    let w = rows.first().and_then(Value::as_array).map_or(0, Vec::len);
    let mut output = Table::new(w, rows.len());
    for (i, row) in rows.iter().enumerate() {
        let Some(cells) = row.as_array() else {
            return Err(JsonTableError::BadRow {
                sheet: name.to_string(),
                row: i,
            });
        };
        for j in 0..w {
            output.set_cell(j, i, cells.get(j).and_then(value_to_datum));
        }
    }
    Ok(output)
}

fn value_to_datum(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn value_to_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn array_rows_fill_positionally() {
        let json = json!({
            "people": {
                "columns": ["id", "name"],
                "rows": [["1", "ann"], ["2", "bob"]]
            }
        });
        let t = json_to_table(&json).expect("tabular json");
        assert_eq!(t.width(), 2);
        assert_eq!(t.height(), 2);
        assert_eq!(t.cell_text(1, 0), "ann");
        assert_eq!(t.cell_text(0, 1), "2");
    }

    #[test]
    fn keyed_rows_follow_column_order() {
        let json = json!({
            "people": {
                "columns": ["id", "name"],
                "rows": [{"name": "ann", "id": "1"}, {"name": "bob", "id": "2"}]
            }
        });
        let t = json_to_table(&json).expect("tabular json");
        assert_eq!(t.cell_text(0, 0), "1");
        assert_eq!(t.cell_text(1, 1), "bob");
    }

    #[test]
    fn numbers_and_bools_are_stringified_nulls_survive() {
        let json = json!({
            "s": {
                "columns": ["a", "b", "c"],
                "rows": [[1, true, null], [2.5, false, "x"]]
            }
        });
        let t = json_to_table(&json).expect("tabular json");
        assert_eq!(t.cell_text(0, 0), "1");
        assert_eq!(t.cell_text(1, 0), "true");
        assert_eq!(t.cell(2, 0), None);
        assert_eq!(t.cell_text(0, 1), "2.5");
    }

    #[test]
    fn first_parsable_sheet_wins() {
        let json = json!({
            "a_sheet": {"columns": ["x"], "rows": [["first"]]},
            "b_sheet": {"columns": ["x"], "rows": [["second"]]}
        });
        let t = json_to_table(&json).expect("tabular json");
        assert_eq!(t.cell_text(0, 0), "first");
    }

    #[test]
    fn bare_row_arrays_are_accepted() {
        let json = json!([["id", "name"], ["1", "ann"]]);
        let t = json_to_table(&json).expect("bare rows");
        assert_eq!(t.height(), 2);
        assert_eq!(t.cell_text(1, 1), "ann");
    }

    #[test]
    fn scalar_input_is_rejected_with_a_code() {
        let err = json_to_table(&json!(42)).expect_err("not tabular");
        assert_eq!(err.code(), "TBLDIFF_JSON_001");
        let err = json_to_table(&json!({"sheet": {"rows": []}})).expect_err("no columns");
        assert_eq!(err.code(), "TBLDIFF_JSON_002");
    }

    #[test]
    fn mixed_row_shapes_are_rejected() {
        let json = json!({
            "s": {"columns": ["x"], "rows": [["ok"], "not a row"]}
        });
        let err = json_to_table(&json).expect_err("bad row");
        assert_eq!(err.code(), "TBLDIFF_JSON_003");
    }

    #[test]
    fn saved_workbooks_reload() {
        let mut t = Table::new(2, 2);
        t.set_cell(0, 0, Some("id".to_string()));
        t.set_cell(1, 0, Some("name".to_string()));
        t.set_cell(0, 1, Some("1".to_string()));
        let json = table_to_json(&t);
        let back = json_to_table(&json).expect("round trip");
        assert_eq!(back.width(), 2);
        assert_eq!(back.height(), 2);
        assert_eq!(back.cell_text(0, 1), "1");
        assert_eq!(back.cell(1, 1), None);
    }

    #[test]
    fn trailing_blank_rows_are_trimmed() {
        let json = json!({
            "s": {"columns": ["x"], "rows": [["a"], [null], [null]]}
        });
        let t = json_to_table(&json).expect("tabular json");
        assert_eq!(t.height(), 1);
    }
}
