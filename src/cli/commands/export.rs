//! `pq export` command - Render an option as a quote document

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::commands::utils::Workspace;
use crate::cli::GlobalOpts;
use crate::core::identity::EntityPrefix;
use crate::export::{DocumentSettings, ExportFormat, Exporter, QuoteDocument};

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Option ID or short ID (@N)
    pub option: String,

    /// Document format
    #[arg(long, short = 't', value_enum, default_value = "html")]
    pub to: ExportFormat,

    /// Output file (defaults to a name built from deal, recipient and option)
    #[arg(long, short = 'o', conflicts_with = "stdout")]
    pub output: Option<PathBuf>,

    /// Write the document to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}

pub fn run(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let option_id = ws.resolve(&args.option, EntityPrefix::Opt)?;
    let deal = ws.deal_of(&option_id)?;

    let settings = DocumentSettings {
        prepared_by: ws.config.author(),
        currency: ws.config.currency(),
        gst_rate: ws.config.gst_rate(),
        date: chrono::Local::now().date_naive(),
    };
    let document = QuoteDocument::build(&deal, &option_id, &settings).into_diagnostic()?;
    let rendered = Exporter::new()
        .and_then(|exporter| exporter.render(args.to, &document))
        .into_diagnostic()?;

    if args.stdout {
        print!("{}", rendered);
        return Ok(());
    }

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(document.file_name(args.to)));
    std::fs::write(&path, rendered).into_diagnostic()?;
    tracing::info!(option = %option_id, path = %path.display(), "quote exported");

    if !global.quiet {
        println!(
            "{} Exported {} to {}",
            style("✓").green(),
            style(&document.option_name).yellow(),
            style(path.display()).cyan()
        );
    }
    Ok(())
}
