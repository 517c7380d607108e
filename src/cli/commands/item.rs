//! `pq item` command - Line items within an option

use clap::Subcommand;
use console::style;
use miette::Result;
use rust_decimal::Decimal;

use crate::cli::commands::utils::{commit_edit, print_option, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::store::QuoteStore;
use crate::entities::catalog::{Product, Pump};
use crate::entities::quote::{AccessoryKind, ItemField, LineItem, PumpDimensions};
use crate::pricing::accessories::apply_accessories;
use crate::pricing::editor::EditTarget;
use crate::pricing::reorder::{reorder, ReorderOutcome};

#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Add a catalog product or a custom row
    Add(AddArgs),

    /// Add a catalog pump, optionally with accessories
    AddPump(AddPumpArgs),

    /// Change a field of a row
    Set(SetArgs),

    /// Remove a row (and the accessory rows of a pump)
    Remove(RemoveArgs),

    /// Move a row within its option
    Move(MoveArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Option ID or short ID (@N)
    pub option: String,

    /// Catalog product SKU
    #[arg(long, conflicts_with = "custom", required_unless_present = "custom")]
    pub sku: Option<String>,

    /// Name of a custom row not in the catalog
    #[arg(long)]
    pub custom: Option<String>,

    #[arg(long, short = 'n', default_value_t = 1)]
    pub qty: u32,

    /// Unit price (defaults to the catalog price; required for custom rows)
    #[arg(long, short = 'p')]
    pub price: Option<Decimal>,

    /// Discount percentage
    #[arg(long, short = 'd')]
    pub discount: Option<Decimal>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct AddPumpArgs {
    /// Option ID or short ID (@N)
    pub option: String,

    /// Catalog pump SKU
    pub sku: String,

    #[arg(long, short = 'n', default_value_t = 1)]
    pub qty: u32,

    /// Unit price (defaults to the catalog price)
    #[arg(long, short = 'p')]
    pub price: Option<Decimal>,

    /// Accessories to size and add below the pump
    #[arg(long, short = 'a', value_enum, value_delimiter = ',')]
    pub accessories: Vec<AccessoryKind>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Item ID or short ID (@N)
    pub item: String,

    /// Field to change
    #[arg(value_enum)]
    pub field: ItemField,

    /// New value
    pub value: String,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Item ID or short ID (@N)
    pub item: String,
}

#[derive(clap::Args, Debug)]
pub struct MoveArgs {
    /// Item ID or short ID (@N)
    pub item: String,

    /// Place the row before this one
    #[arg(long, conflicts_with = "end", required_unless_present = "end")]
    pub before: Option<String>,

    /// Place the row last
    #[arg(long)]
    pub end: bool,
}

pub fn run(cmd: ItemCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ItemCommands::Add(args) => run_add(args, global),
        ItemCommands::AddPump(args) => run_add_pump(args, global),
        ItemCommands::Set(args) => run_set(args, global),
        ItemCommands::Remove(args) => run_remove(args, global),
        ItemCommands::Move(args) => run_move(args, global),
    }
}

/// Append a row to an option through the store
fn append_item(ws: &mut Workspace, option_id: &EntityId, item: LineItem) -> Result<EntityId> {
    let mut option = ws.store.option(option_id)?;
    let item_id = option.push_item(item);
    ws.store.save_option_items(option_id, option.items)?;
    ws.remember([item_id.to_string()]);
    tracing::info!(option = %option_id, item = %item_id, "item added");
    Ok(item_id)
}

fn report_added(ws: &Workspace, item_id: &EntityId, name: &str, global: &GlobalOpts) {
    if global.format == OutputFormat::Id {
        println!("{}", item_id);
    } else if !global.quiet {
        println!(
            "{} Added {} {}",
            style("✓").green(),
            style(ws.short(item_id)).cyan(),
            style(name).yellow()
        );
    }
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let option_id = ws.resolve(&args.option, EntityPrefix::Opt)?;

    let mut item = match (&args.sku, &args.custom) {
        (Some(sku), _) => {
            let catalog = ws.catalog()?;
            let product = catalog
                .get::<Product>(sku)
                .ok_or_else(|| miette::miette!("No product with SKU '{}' in the catalog", sku))?;
            LineItem::product(
                &product.sku,
                &product.name,
                args.qty,
                args.price.unwrap_or(product.unit_price),
            )
        }
        (None, Some(name)) => {
            let price = args
                .price
                .ok_or_else(|| miette::miette!("Custom rows need a --price"))?;
            LineItem::custom(name.trim(), args.qty, price)
        }
        (None, None) => return Err(miette::miette!("Use --sku or --custom")),
    };
    if let Some(discount) = args.discount {
        item.discount = discount;
    }
    item.notes = args.notes;

    let name = item.name.clone();
    let item_id = append_item(&mut ws, &option_id, item)?;
    report_added(&ws, &item_id, &name, global);
    Ok(())
}

fn run_add_pump(args: AddPumpArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let option_id = ws.resolve(&args.option, EntityPrefix::Opt)?;

    let catalog = ws.catalog()?;
    let pump = catalog
        .get::<Pump>(&args.sku)
        .ok_or_else(|| miette::miette!("No pump with SKU '{}' in the catalog", args.sku))?;
    let dims = PumpDimensions {
        weight_kg: pump.weight_kg,
        length_mm: pump.length_mm,
        width_mm: pump.width_mm,
    };
    let mut item = LineItem::pump(
        &pump.sku,
        &pump.name,
        args.price.unwrap_or(pump.unit_price),
        dims,
    );
    item.quantity = args.qty;

    let name = item.name.clone();
    let item_id = append_item(&mut ws, &option_id, item)?;
    report_added(&ws, &item_id, &name, global);

    if !args.accessories.is_empty() {
        let source = ws.catalog_source();
        let sizing = ws.sizing(&source);
        let applied = apply_accessories(&mut ws.store, &sizing, &item_id, &args.accessories)?;
        if !global.quiet && global.format != OutputFormat::Id {
            for row in &applied.rows {
                println!(
                    "   {} {} {}{}",
                    style("+").green(),
                    style(&row.sku).cyan(),
                    row.name,
                    if row.fallback {
                        style(" (generic)").yellow().to_string()
                    } else {
                        String::new()
                    }
                );
            }
        }
    }
    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let item_id = ws.resolve(&args.item, EntityPrefix::Item)?;
    let option_id = ws.store.option_of_item(&item_id)?;
    let current = ws
        .store
        .option(&option_id)?
        .item(&item_id)
        .map(|i| i.field_value(args.field))
        .unwrap_or_default();

    let target = EditTarget::Item {
        item: item_id.clone(),
        field: args.field,
    };
    match commit_edit(&mut ws, target, current, &args.value)? {
        Some(ack) => {
            tracing::debug!(item = %item_id, field = %args.field, value = %ack.value, "item updated");
            if !global.quiet {
                println!(
                    "{} Set {} to {}",
                    style("✓").green(),
                    style(args.field).cyan(),
                    style(&ack.value).yellow()
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

fn run_remove(args: RemoveArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let item_id = ws.resolve(&args.item, EntityPrefix::Item)?;
    let option_id = ws.store.option_of_item(&item_id)?;
    let mut option = ws.store.option(&option_id)?;

    let removed = option
        .remove_item(&item_id)
        .ok_or_else(|| miette::miette!("Item {} not found", item_id))?;
    ws.store.save_option_items(&option_id, option.items)?;

    // An accessory row removed by hand is no longer selected on its pump
    if let (Some(pump), Some(kind)) = (&removed.accessory_of, removed.accessory_kind) {
        let kinds: Vec<AccessoryKind> = ws
            .store
            .accessories(pump)?
            .into_iter()
            .filter(|k| *k != kind)
            .collect();
        ws.store.save_accessories(pump, &kinds)?;
    }

    if !global.quiet {
        println!(
            "{} Removed {}",
            style("✓").green(),
            style(&removed.name).yellow()
        );
    }
    Ok(())
}

fn run_move(args: MoveArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let item_id = ws.resolve(&args.item, EntityPrefix::Item)?;
    let before = match &args.before {
        Some(reference) if !args.end => Some(ws.resolve(reference, EntityPrefix::Item)?),
        _ => None,
    };
    let option_id = ws.store.option_of_item(&item_id)?;

    let outcome = reorder(&mut ws.store, &option_id, &item_id, before.as_ref())?;
    match outcome {
        ReorderOutcome::Persisted(_) => {
            if !global.quiet {
                println!("{} Moved row", style("✓").green());
            }
        }
        ReorderOutcome::Unchanged(_) => {
            if !global.quiet {
                println!("{} Row already in place", style("-").dim());
            }
        }
        ReorderOutcome::Reconciled { reason, .. } => {
            eprintln!(
                "{} Move was not saved; showing the stored order",
                style("!").yellow()
            );
            let option = ws.store.option(&option_id)?;
            print_option(&mut ws, &option, global.format)?;
            return Err(reason.into());
        }
    }

    if !global.quiet {
        let option = ws.store.option(&option_id)?;
        print_option(&mut ws, &option, global.format)?;
    }
    Ok(())
}
