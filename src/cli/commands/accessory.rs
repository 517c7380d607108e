//! `pq accessory` command - Accessory selection for pump rows

use clap::Subcommand;
use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::commands::utils::{print_option, Workspace};
use crate::cli::helpers::print_structured;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityPrefix;
use crate::core::store::MemoryStore;
use crate::entities::quote::AccessoryKind;
use crate::pricing::accessories::{accessories, apply_accessories, save_accessories};
use crate::pricing::totals::money;

#[derive(Subcommand, Debug)]
pub enum AccessoryCommands {
    /// Show the accessories selected for a pump row
    Show(ShowArgs),

    /// Select accessories without changing any rows
    Set(SetArgs),

    /// Size the selected accessories and insert them below the pump
    Apply(ApplyArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Pump item ID or short ID (@N)
    pub item: String,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Pump item ID or short ID (@N)
    pub item: String,

    /// Accessory kinds (none clears the selection)
    #[arg(value_enum)]
    pub kinds: Vec<AccessoryKind>,
}

#[derive(clap::Args, Debug)]
pub struct ApplyArgs {
    /// Pump item ID or short ID (@N)
    pub item: String,

    /// Override the saved selection
    #[arg(long, short = 'k', value_enum, value_delimiter = ',')]
    pub kinds: Option<Vec<AccessoryKind>>,

    /// Size and price without saving anything
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(cmd: AccessoryCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        AccessoryCommands::Show(args) => run_show(args, global),
        AccessoryCommands::Set(args) => run_set(args, global),
        AccessoryCommands::Apply(args) => run_apply(args, global),
    }
}

#[derive(Serialize)]
struct Selection {
    item: String,
    accessories: Vec<AccessoryKind>,
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let item_id = ws.resolve(&args.item, EntityPrefix::Item)?;
    let kinds = accessories(&ws.store, &item_id)?;

    let format = global.format.or(OutputFormat::Tsv);
    let selection = Selection {
        item: item_id.to_string(),
        accessories: kinds,
    };
    if print_structured(&selection, format)? {
        return Ok(());
    }

    if selection.accessories.is_empty() {
        println!("No accessories selected.");
    }
    for kind in &selection.accessories {
        println!("{}", kind.as_str());
    }
    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let item_id = ws.resolve(&args.item, EntityPrefix::Item)?;
    save_accessories(&mut ws.store, &item_id, &args.kinds)?;

    if !global.quiet {
        let saved = AccessoryKind::normalize(&args.kinds);
        let names: Vec<&str> = saved.iter().map(|k| k.as_str()).collect();
        println!(
            "{} Selected {} for {}",
            style("✓").green(),
            style(if names.is_empty() {
                "nothing".to_string()
            } else {
                names.join(", ")
            })
            .yellow(),
            style(ws.label(&item_id)).cyan()
        );
    }
    Ok(())
}

fn run_apply(args: ApplyArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let item_id = ws.resolve(&args.item, EntityPrefix::Item)?;
    let kinds = match args.kinds {
        Some(kinds) => kinds,
        None => accessories(&ws.store, &item_id)?,
    };

    let source = ws.catalog_source();
    let sizing = ws.sizing(&source);

    let applied = if args.dry_run {
        let mut scratch = MemoryStore::new(vec![ws.deal_of(&item_id)?]);
        apply_accessories(&mut scratch, &sizing, &item_id, &kinds)?
    } else {
        apply_accessories(&mut ws.store, &sizing, &item_id, &kinds)?
    };

    let format = global.format.or(OutputFormat::Tsv);
    if print_structured(&applied, format)? {
        return Ok(());
    }

    if args.dry_run {
        for row in &applied.rows {
            println!(
                "{:<16} {:<14} {:<34} {:>11}{}",
                row.kind.as_str(),
                row.sku,
                row.name,
                money(row.unit_price),
                if row.fallback { "  generic" } else { "" }
            );
        }
        if !global.quiet {
            println!("{} Dry run, nothing saved", style("-").dim());
        }
        return Ok(());
    }

    let generic = applied.rows.iter().filter(|r| r.fallback).count();
    if generic > 0 {
        eprintln!(
            "{} {} accessory row(s) use generic parts; nothing in the catalog qualified",
            style("!").yellow(),
            generic
        );
    }
    if !global.quiet {
        println!(
            "{} Applied {} accessory row(s)",
            style("✓").green(),
            applied.rows.len()
        );
        print_option(&mut ws, &applied.option, global.format)?;
    }
    Ok(())
}
