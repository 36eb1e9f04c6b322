use crate::table_io;
use anyhow::{Context, Result};
use std::process::ExitCode;
use table_diff::{compare_tables3, CompareFlags, Table, TableDiff};

pub fn run(first: &str, second: &str, third: Option<&str>, output: &str) -> Result<ExitCode> {
    // Three positional tables mean the first is the common parent.
    let (parent_path, local_path, remote_path) = match third {
        Some(remote) => (Some(first), second, remote),
        None => (None, first, second),
    };

    let parent = match parent_path {
        Some(path) => Some(table_io::load_table(path)?.0),
        None => None,
    };
    let (local, _) = table_io::load_table(local_path)?;
    let (remote, format) = table_io::load_table(remote_path)?;

    log::debug!(
        "diff: {} vs {} (parent: {})",
        local_path,
        remote_path,
        parent_path.unwrap_or("none")
    );

    let mut comparison = compare_tables3(parent.as_ref(), &local, &remote);
    let alignment = comparison
        .align()
        .context("Failed to align the input tables")?;

    let mut diff = TableDiff::new(alignment, CompareFlags::default());
    let mut hilite = Table::new(0, 0);
    diff.hilite(&mut hilite)
        .context("Failed to build the diff table")?;

    table_io::save_table(output, &hilite, format)?;
    Ok(ExitCode::from(0))
}
