//! `pq option` command - Priced options within a revision

use clap::Subcommand;
use console::style;
use miette::Result;
use rust_decimal::Decimal;

use crate::cli::commands::utils::{commit_edit, confirm, print_option, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityPrefix;
use crate::core::store::QuoteStore;
use crate::entities::quote::{OptionField, QuoteOption};
use crate::pricing::editor::EditTarget;

#[derive(Subcommand, Debug)]
pub enum OptionCommands {
    /// Add an option to a revision
    Add(AddArgs),

    /// Change an option's name or freight charge
    Set(SetArgs),

    /// Delete an option
    Delete(DeleteArgs),

    /// Show an option's rows and totals
    Totals(TotalsArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Revision ID or short ID (@N)
    pub rev: String,

    /// Option name
    pub name: String,

    /// Freight charge
    #[arg(long)]
    pub freight: Option<Decimal>,

    /// Start from a copy of another option (ID or @N)
    #[arg(long)]
    pub copy_from: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Option ID or short ID (@N)
    pub option: String,

    /// Field to change
    #[arg(value_enum)]
    pub field: OptionField,

    /// New value
    pub value: String,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Option ID or short ID (@N)
    pub option: String,

    /// Skip confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct TotalsArgs {
    /// Option ID or short ID (@N)
    pub option: String,
}

pub fn run(cmd: OptionCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        OptionCommands::Add(args) => run_add(args, global),
        OptionCommands::Set(args) => run_set(args, global),
        OptionCommands::Delete(args) => run_delete(args, global),
        OptionCommands::Totals(args) => run_totals(args, global),
    }
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let rev_id = ws.resolve(&args.rev, EntityPrefix::Rev)?;
    let mut deal = ws.deal_of(&rev_id)?;

    let name = args.name.trim();
    if name.is_empty() {
        return Err(miette::miette!("Option name cannot be empty"));
    }

    let mut option = match &args.copy_from {
        Some(reference) => {
            let source = ws.resolve(reference, EntityPrefix::Opt)?;
            let mut copy = ws.store.option(&source)?.deep_clone();
            copy.name = name.to_string();
            copy
        }
        None => QuoteOption::new(name),
    };
    if let Some(freight) = args.freight {
        if freight < Decimal::ZERO {
            return Err(miette::miette!("Freight charge cannot be negative"));
        }
        option.freight_charge = freight;
    }

    let option_id = deal.add_option(&rev_id, option)?;
    ws.store.save_deal(&deal)?;
    ws.remember([option_id.to_string()]);

    if global.format == OutputFormat::Id {
        println!("{}", option_id);
    } else if !global.quiet {
        println!(
            "{} Added option {} {}",
            style("✓").green(),
            style(ws.short(&option_id)).cyan(),
            style(name).yellow()
        );
    }
    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let option_id = ws.resolve(&args.option, EntityPrefix::Opt)?;
    let current = ws.store.option(&option_id)?.field_value(args.field);

    let target = EditTarget::Option {
        option: option_id.clone(),
        field: args.field,
    };
    match commit_edit(&mut ws, target, current, &args.value)? {
        Some(ack) => {
            if !global.quiet {
                println!(
                    "{} Set {} to {}",
                    style("✓").green(),
                    style(args.field).cyan(),
                    style(ack.value).yellow()
                );
                let option = ws.store.option(&option_id)?;
                print_option(&mut ws, &option, global.format)?;
            }
        }
        None => {
            if !global.quiet {
                println!("{} {} unchanged", style("-").dim(), args.field);
            }
        }
    }
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let option_id = ws.resolve(&args.option, EntityPrefix::Opt)?;
    let mut deal = ws.deal_of(&option_id)?;

    let name = deal
        .option(&option_id)
        .map(|o| o.name.clone())
        .unwrap_or_else(|| option_id.to_string());
    if !confirm(&format!("Delete option '{}'?", name), args.yes)? {
        println!("Aborted.");
        return Ok(());
    }

    deal.delete_option(&option_id)?;
    ws.store.save_deal(&deal)?;
    if !global.quiet {
        println!(
            "{} Deleted option {}",
            style("✓").green(),
            style(name).yellow()
        );
    }
    Ok(())
}

fn run_totals(args: TotalsArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let option_id = ws.resolve(&args.option, EntityPrefix::Opt)?;
    let option = ws.store.option(&option_id)?;
    print_option(&mut ws, &option, global.format)
}
