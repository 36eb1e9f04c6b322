use crate::table_io;
use anyhow::Result;
use std::process::ExitCode;
use table_diff::DiffRender;

pub fn run(
    diff: &str,
    output: &str,
    css: Option<&str>,
    fragment: bool,
    plain: bool,
) -> Result<ExitCode> {
    let (table, _) = table_io::load_table(diff)?;

    // A separate stylesheet only makes sense for a fragment.
    let fragment = fragment || css.is_some();

    let mut renderer = DiffRender::new();
    renderer.use_pretty_arrows(!plain);
    renderer.render(&table);
    if !fragment {
        renderer.complete_html();
    }

    table_io::save_text(output, &renderer.html())?;
    if let Some(css_path) = css {
        table_io::save_text(css_path, renderer.sample_css())?;
    }
    Ok(ExitCode::from(0))
}
