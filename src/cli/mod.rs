//! CLI module - argument parsing and command dispatch

pub mod args;
pub mod commands;
pub mod helpers;

pub use args::{Cli, Commands, GlobalOpts, OutputFormat};

/// Run a parsed command line
pub fn dispatch(cli: Cli) -> miette::Result<()> {
    let global = cli.global;

    match cli.command {
        Commands::Init(args) => commands::init::run(args, &global),
        Commands::Deal(cmd) => commands::deal::run(cmd, &global),
        Commands::Rev(cmd) => commands::rev::run(cmd, &global),
        Commands::Opt(cmd) => commands::option::run(cmd, &global),
        Commands::Item(cmd) => commands::item::run(cmd, &global),
        Commands::Accessory(cmd) => commands::accessory::run(cmd, &global),
        Commands::Size(cmd) => commands::size::run(cmd, &global),
        Commands::Catalog(cmd) => commands::catalog::run(cmd, &global),
        Commands::Pump(cmd) => commands::pump::run(cmd, &global),
        Commands::Product(cmd) => commands::product::run(cmd, &global),
        Commands::Export(args) => commands::export::run(args, &global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
