use crate::table_io;
use anyhow::Result;
use std::process::ExitCode;

pub fn run(source: &str, output: &str) -> Result<ExitCode> {
    // Loading already trims trailing blank rows and columns.
    let (table, format) = table_io::load_table(source)?;
    table_io::save_table(output, &table, format)?;
    Ok(ExitCode::from(0))
}
