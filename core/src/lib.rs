//! Table Diff: alignment, diffing, and patching for tabular data.
//!
//! This crate provides functionality for:
//! - Aligning rows and columns of two (or three) tables that share no
//!   primary key
//! - Computing structural diffs annotated with insert, delete, update,
//!   conflict, and move markers
//! - Applying a diff table back onto a source table (patching)
//! - Reading and writing tables as CSV text or JSON workbooks, and
//!   rendering diff tables as highlighted HTML
//!
//! # Quick Start
//!
//! ```ignore
//! use table_diff::{compare_tables, CompareFlags, Csv, Table, TableDiff};
//!
//! let a: Table = load("a.csv")?;
//! let b: Table = load("b.csv")?;
//!
//! let align = compare_tables(&a, &b).align()?;
//! let mut diff = Table::new(0, 0);
//! TableDiff::new(align, CompareFlags::default()).hilite(&mut diff)?;
//!
//! print!("{}", Csv::new().render_table(&diff));
//! ```

mod action;
mod alignment;
mod cell;
mod compare;
mod config;
mod csv;
mod diff;
pub mod error_codes;
pub(crate) mod index;
mod json_io;
pub(crate) mod mover;
mod ordering;
mod patch;
mod render;
mod table;

pub use action::ActionKind;
pub use alignment::Alignment;
pub use cell::CellView;
pub use compare::{
    CompareTable, TableComparisonState, compare_tables, compare_tables3, tables_equal,
};
pub use config::CompareFlags;
pub use csv::Csv;
pub use diff::{DiffError, TableDiff};
pub use json_io::{JsonTableError, json_to_table, table_to_json};
pub use ordering::{Ordering, Unit};
pub use patch::{HighlightPatch, PatchError};
pub use render::{CellCategory, CellInfo, DiffRender, render_cell};
pub use table::Table;
