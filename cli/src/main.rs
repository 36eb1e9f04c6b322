mod commands;
mod table_io;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "table-diff")]
#[command(about = "Align, diff, and patch tabular data (CSV or JSON workbooks)")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Compare two tables, or three when a common parent is given")]
    Diff {
        #[arg(help = "Local table, or the common parent in the three-table form")]
        first: String,
        #[arg(help = "Remote table, or the local table in the three-table form")]
        second: String,
        #[arg(help = "Remote table (three-table form only)")]
        third: Option<String>,
        #[arg(long, short, default_value = "-", help = "Destination file, - for stdout")]
        output: String,
    },
    #[command(about = "Apply a diff-shaped patch table to a source table")]
    Patch {
        #[arg(help = "Table to rewrite")]
        source: String,
        #[arg(help = "Patch table produced by diff")]
        patch: String,
        #[arg(long, short, default_value = "-", help = "Destination file, - for stdout")]
        output: String,
    },
    #[command(about = "Strip trailing blank rows and columns from a table")]
    Trim {
        #[arg(help = "Table to trim")]
        source: String,
        #[arg(long, short, default_value = "-", help = "Destination file, - for stdout")]
        output: String,
    },
    #[command(about = "Render a diff table as HTML")]
    Render {
        #[arg(help = "Diff table produced by diff")]
        diff: String,
        #[arg(long, short, default_value = "-", help = "Destination file, - for stdout")]
        output: String,
        #[arg(long, help = "Write the sample stylesheet here (implies --fragment)")]
        css: Option<String>,
        #[arg(long, help = "Emit the bare <table> without the page wrapper")]
        fragment: bool,
        #[arg(long, help = "Keep wire-format arrows instead of pretty ones")]
        plain: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    // Usage problems exit with 1; clap's default of 2 is reserved for
    // nothing here. Help and version output keep exit status 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let failed = e.use_stderr();
            let _ = e.print();
            return ExitCode::from(u8::from(failed));
        }
    };

    let result = match cli.command {
        Commands::Diff {
            first,
            second,
            third,
            output,
        } => commands::diff::run(&first, &second, third.as_deref(), &output),
        Commands::Patch {
            source,
            patch,
            output,
        } => commands::patch::run(&source, &patch, &output),
        Commands::Trim { source, output } => commands::trim::run(&source, &output),
        Commands::Render {
            diff,
            output,
            css,
            fragment,
            plain,
        } => commands::render::run(&diff, &output, css.as_deref(), fragment, plain),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
