//! `pq product` command - General product lookup

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::Workspace;
use crate::cli::helpers::{print_structured, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::catalog::PRODUCT_SEARCH_MIN_CHARS;
use crate::pricing::totals::money;

#[derive(Subcommand, Debug)]
pub enum ProductCommands {
    /// Search products by SKU or name
    Search(SearchArgs),
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// At least two characters of a SKU or name
    pub query: String,
}

pub fn run(cmd: ProductCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ProductCommands::Search(args) => run_search(args, global),
    }
}

fn run_search(args: SearchArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let catalog = ws.catalog()?;
    let hits = catalog.search_products(&args.query);

    let format = global.format.or(OutputFormat::Tsv);
    if print_structured(&hits, format)? {
        return Ok(());
    }

    match format {
        OutputFormat::Id => {
            for product in &hits {
                println!("{}", product.sku);
            }
        }
        _ => {
            if args.query.trim().chars().count() < PRODUCT_SEARCH_MIN_CHARS {
                println!(
                    "Type at least {} characters to search.",
                    PRODUCT_SEARCH_MIN_CHARS
                );
                return Ok(());
            }
            if hits.is_empty() {
                println!("No products found.");
                return Ok(());
            }
            for p in &hits {
                println!(
                    "{:<16} {:<40} {:>12}",
                    style(truncate_str(&p.sku, 16)).cyan(),
                    truncate_str(&p.name, 40),
                    money(p.unit_price)
                );
            }
        }
    }
    Ok(())
}
