use crate::table_io;
use anyhow::{Context, Result};
use std::process::ExitCode;
use table_diff::HighlightPatch;

pub fn run(source: &str, patch: &str, output: &str) -> Result<ExitCode> {
    let (mut source_table, format) = table_io::load_table(source)?;
    let (patch_table, _) = table_io::load_table(patch)?;

    log::debug!("patch: applying {} to {}", patch, source);

    let mut patcher = HighlightPatch::new(&mut source_table, &patch_table);
    patcher
        .apply()
        .with_context(|| format!("Failed to apply patch: {}", patch))?;

    table_io::save_table(output, &source_table, format)?;
    Ok(ExitCode::from(0))
}
