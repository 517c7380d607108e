//! `pq pump` command - Pump selection from the catalog

use clap::Subcommand;
use console::style;
use miette::Result;
use rust_decimal::Decimal;

use crate::cli::commands::utils::Workspace;
use crate::cli::helpers::{escape_csv, print_structured, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::catalog::DutyPoint;
use crate::pricing::totals::money;

#[derive(Subcommand, Debug)]
pub enum PumpCommands {
    /// Search pumps by text and duty point
    Search(SearchArgs),
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Text matched against SKU, name and series
    #[arg(default_value = "")]
    pub query: String,

    /// Required flow (L/s)
    #[arg(long, requires = "head")]
    pub flow: Option<Decimal>,

    /// Required head (m)
    #[arg(long, requires = "flow")]
    pub head: Option<Decimal>,

    /// Maximum results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

pub fn run(cmd: PumpCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PumpCommands::Search(args) => run_search(args, global),
    }
}

fn run_search(args: SearchArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let catalog = ws.catalog()?;

    let duty = match (args.flow, args.head) {
        (Some(flow), Some(head)) => Some(DutyPoint { flow, head }),
        _ => None,
    };
    let mut hits = catalog.search_pumps(&args.query, duty);
    if let Some(limit) = args.limit {
        hits.truncate(limit);
    }
    tracing::debug!(query = %args.query, hits = hits.len(), "pump search");

    let format = global.format.or(OutputFormat::Tsv);
    if print_structured(&hits, format)? {
        return Ok(());
    }

    match format {
        OutputFormat::Id => {
            for pump in &hits {
                println!("{}", pump.sku);
            }
        }
        OutputFormat::Csv => {
            println!("sku,name,series,flow_rate,head,power_kw,weight_kg,unit_price");
            for p in &hits {
                println!(
                    "{},{},{},{},{},{},{},{}",
                    escape_csv(&p.sku),
                    escape_csv(&p.name),
                    escape_csv(&p.series),
                    p.flow_rate,
                    p.head,
                    p.power_kw,
                    p.weight_kg,
                    money(p.unit_price)
                );
            }
        }
        _ => {
            if hits.is_empty() {
                println!("No pumps found.");
                return Ok(());
            }
            println!(
                "{:<16} {:<32} {:>8} {:>8} {:>7} {:>12}",
                style("SKU").bold(),
                style("NAME").bold(),
                style("FLOW").bold(),
                style("HEAD").bold(),
                style("KW").bold(),
                style("PRICE").bold()
            );
            println!("{}", "-".repeat(88));
            for p in &hits {
                println!(
                    "{:<16} {:<32} {:>8} {:>8} {:>7} {:>12}",
                    style(truncate_str(&p.sku, 16)).cyan(),
                    truncate_str(&p.name, 32),
                    p.flow_rate,
                    p.head,
                    p.power_kw,
                    money(p.unit_price)
                );
            }
            println!();
            println!("{} pump(s) found", style(hits.len()).cyan());
        }
    }
    Ok(())
}
