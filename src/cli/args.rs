//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    accessory::AccessoryCommands, catalog::CatalogCommands, completions::CompletionsArgs,
    deal::DealCommands, export::ExportArgs, init::InitArgs, item::ItemCommands,
    option::OptionCommands, product::ProductCommands, pump::PumpCommands, rev::RevCommands,
    size::SizeCommands,
};

#[derive(Parser)]
#[command(name = "pq")]
#[command(author, version, about = "Pump Quote")]
#[command(long_about = "Track pump deals through the sales pipeline, price quote revisions and size mounting accessories, all as plain-text YAML files.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .pq/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new Pump Quote project
    Init(InitArgs),

    /// Deal management (pipeline, board, parties)
    #[command(subcommand)]
    Deal(DealCommands),

    /// Quote revision management
    #[command(subcommand)]
    Rev(RevCommands),

    /// Priced options within a revision
    #[command(name = "option", subcommand)]
    Opt(OptionCommands),

    /// Line items within an option
    #[command(subcommand)]
    Item(ItemCommands),

    /// Accessory selection for pump rows
    #[command(subcommand)]
    Accessory(AccessoryCommands),

    /// Size an inertia base, seismic springs or rubber mounts
    #[command(subcommand)]
    Size(SizeCommands),

    /// Reference catalog administration
    #[command(subcommand)]
    Catalog(CatalogCommands),

    /// Pump catalog search
    #[command(subcommand)]
    Pump(PumpCommands),

    /// Product catalog search
    #[command(subcommand)]
    Product(ProductCommands),

    /// Export an option as a quote document
    Export(ExportArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}

impl OutputFormat {
    /// Resolve `auto` to a concrete format
    pub fn or(self, default: OutputFormat) -> OutputFormat {
        match self {
            OutputFormat::Auto => default,
            f => f,
        }
    }
}
