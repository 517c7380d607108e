//! `pq deal` command - Deal pipeline management

use clap::Subcommand;
use console::style;
use miette::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::commands::utils::{confirm, Workspace};
use crate::cli::helpers::{escape_csv, format_short_id, print_structured, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::deal::{board, AustralianState, Contact, Deal, DealStage, DealType, RevisionSource};
use crate::pricing::totals::money;

#[derive(Subcommand, Debug)]
pub enum DealCommands {
    /// Start tracking a new deal
    New(NewArgs),

    /// List deals with filtering
    List(ListArgs),

    /// Show a deal's details
    Show(ShowArgs),

    /// Deals grouped by pipeline stage
    Board,

    /// Move a deal to another stage
    Move(MoveArgs),

    /// Change a deal's details
    Edit(EditArgs),

    /// Add companies or contacts to a deal
    Party(PartyArgs),

    /// Delete a deal and all its quotes
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Project name (unique across deals)
    pub name: String,

    /// Market segment (HVAC, Hydraulic, Hydronic, "Data Centres", Merchant, Wholesaler, OEM)
    #[arg(long = "type", short = 't', default_value = "HVAC")]
    pub deal_type: DealType,

    /// State or territory of the site
    #[arg(long, short = 's', default_value = "NSW")]
    pub state: AustralianState,

    /// Sales owner
    #[arg(long)]
    pub owner: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Also start a blank revision for this company
    #[arg(long, short = 'r')]
    pub recipient: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only deals in this stage
    #[arg(long, short = 's')]
    pub stage: Option<DealStage>,

    /// Hide won, lost and abandoned deals
    #[arg(long)]
    pub open: bool,

    /// Search in project name and companies
    #[arg(long)]
    pub search: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Deal ID or short ID (@N)
    pub deal: String,
}

#[derive(clap::Args, Debug)]
pub struct MoveArgs {
    /// Deal ID or short ID (@N)
    pub deal: String,

    /// Target stage
    pub stage: DealStage,

    /// Skip the pipeline transition check
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Deal ID or short ID (@N)
    pub deal: String,

    /// New project name
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long = "type", short = 't')]
    pub deal_type: Option<DealType>,

    #[arg(long, short = 's')]
    pub state: Option<AustralianState>,

    #[arg(long)]
    pub owner: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct PartyArgs {
    /// Deal ID or short ID (@N)
    pub deal: String,

    /// Company quoted on this deal (repeatable)
    #[arg(long, short = 'c')]
    pub company: Vec<String>,

    /// Contact person name
    #[arg(long)]
    pub contact: Option<String>,

    /// Company the contact works for
    #[arg(long = "of", requires = "contact")]
    pub contact_company: Option<String>,

    #[arg(long, requires = "contact")]
    pub email: Option<String>,

    #[arg(long, requires = "contact")]
    pub phone: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Deal ID or short ID (@N)
    pub deal: String,

    /// Skip confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(cmd: DealCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        DealCommands::New(args) => run_new(args, global),
        DealCommands::List(args) => run_list(args, global),
        DealCommands::Show(args) => run_show(args, global),
        DealCommands::Board => run_board(global),
        DealCommands::Move(args) => run_move(args, global),
        DealCommands::Edit(args) => run_edit(args, global),
        DealCommands::Party(args) => run_party(args, global),
        DealCommands::Delete(args) => run_delete(args, global),
    }
}

/// Project names are unique ignoring case
fn ensure_unique_name(ws: &Workspace, name: &str, except: Option<&EntityId>) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(miette::miette!("Project name cannot be empty"));
    }
    if let Some(existing) = ws
        .deals()
        .into_iter()
        .find(|d| d.project_name.eq_ignore_ascii_case(name) && Some(&d.id) != except)
    {
        return Err(miette::miette!(
            "A deal named '{}' already exists ({})",
            existing.project_name,
            existing.id
        ));
    }
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    ensure_unique_name(&ws, &args.name, None)?;

    let mut deal = Deal::new(args.name.trim(), args.deal_type, args.state, ws.config.author());
    deal.owner = args.owner;
    deal.notes = args.notes;
    if let Some(recipient) = &args.recipient {
        deal.new_revision(recipient, RevisionSource::Blank)?;
    }

    ws.store.save_deal(&deal)?;
    ws.remember([deal.id.to_string()]);
    tracing::info!(deal = %deal.id, name = %deal.project_name, "deal created");

    if global.format == OutputFormat::Id {
        println!("{}", deal.id);
    } else if !global.quiet {
        println!(
            "{} Created deal {} {}",
            style("✓").green(),
            style(ws.short(&deal.id)).cyan(),
            style(&deal.project_name).yellow()
        );
        println!("   {}", style(ws.project.deal_path(&deal.id).display()).dim());
        if let Some(revision) = deal.revisions.first() {
            println!(
                "   Revision {} with option {}",
                style(revision.label()).yellow(),
                style(&revision.options[0].name).white()
            );
        }
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let needle = args.search.as_ref().map(|s| s.to_lowercase());

    let mut deals: Vec<Deal> = ws
        .deals()
        .into_iter()
        .filter(|d| args.stage.map_or(true, |s| s == d.stage))
        .filter(|d| !args.open || !d.stage.is_closed())
        .filter(|d| {
            needle.as_ref().map_or(true, |n| {
                d.project_name.to_lowercase().contains(n)
                    || d.companies.iter().any(|c| c.to_lowercase().contains(n))
            })
        })
        .collect();
    if let Some(limit) = args.limit {
        deals.truncate(limit);
    }

    if args.count {
        println!("{}", deals.len());
        return Ok(());
    }

    ws.remember(deals.iter().map(|d| d.id.to_string()));

    let format = global.format.or(OutputFormat::Tsv);
    if print_structured(&deals, format)? {
        return Ok(());
    }

    match format {
        OutputFormat::Id => {
            for deal in &deals {
                println!("{}", deal.id);
            }
        }
        OutputFormat::Csv => {
            println!("short_id,id,project,type,state,stage,value,owner");
            for deal in &deals {
                println!(
                    "{},{},{},{},{},{},{},{}",
                    ws.short(&deal.id),
                    deal.id,
                    escape_csv(&deal.project_name),
                    escape_csv(&deal.deal_type.to_string()),
                    deal.state,
                    deal.stage,
                    money(deal.value()),
                    escape_csv(deal.owner.as_deref().unwrap_or(""))
                );
            }
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["Short", "Project", "Type", "State", "Stage", "Value"]);
            for deal in &deals {
                builder.push_record([
                    ws.short(&deal.id),
                    deal.project_name.clone(),
                    deal.deal_type.to_string(),
                    deal.state.to_string(),
                    deal.stage.label().to_string(),
                    money(deal.value()),
                ]);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        _ => {
            println!(
                "{:<8} {:<17} {:<26} {:<13} {:<6} {:<12} {:>12}",
                style("SHORT").bold().dim(),
                style("ID").bold(),
                style("PROJECT").bold(),
                style("TYPE").bold(),
                style("STATE").bold(),
                style("STAGE").bold(),
                style("VALUE").bold()
            );
            println!("{}", "-".repeat(100));
            for deal in &deals {
                println!(
                    "{:<8} {:<17} {:<26} {:<13} {:<6} {:<12} {:>12}",
                    style(ws.short(&deal.id)).cyan(),
                    format_short_id(&deal.id),
                    truncate_str(&deal.project_name, 24),
                    deal.deal_type.to_string(),
                    deal.state.to_string(),
                    deal.stage.label(),
                    money(deal.value())
                );
            }
            if !global.quiet {
                println!();
                println!(
                    "{} deal(s) found. Use {} to reference by short ID.",
                    style(deals.len()).cyan(),
                    style("@N").cyan()
                );
            }
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let id = ws.resolve(&args.deal, EntityPrefix::Deal)?;
    let deal = ws.deal_of(&id)?;

    ws.remember(
        std::iter::once(deal.id.to_string())
            .chain(deal.revisions.iter().map(|r| r.id.to_string()))
            .chain(deal.options().map(|o| o.id.to_string())),
    );

    let format = global.format.or(OutputFormat::Yaml);
    if print_structured(&deal, format)? {
        return Ok(());
    }
    if format == OutputFormat::Id {
        println!("{}", deal.id);
        return Ok(());
    }

    let gst_rate = ws.config.gst_rate();
    println!(
        "{} {}  {}",
        style(ws.short(&deal.id)).cyan(),
        style(&deal.project_name).bold(),
        style(deal.stage.label()).yellow()
    );
    println!(
        "  {} / {} / value {}",
        deal.deal_type,
        deal.state,
        style(money(deal.value())).green()
    );
    if let Some(owner) = &deal.owner {
        println!("  Owner: {}", owner);
    }
    if !deal.companies.is_empty() {
        println!("  Companies: {}", deal.companies.join(", "));
    }
    for contact in &deal.contacts {
        println!(
            "  Contact: {}{}",
            contact.name,
            contact
                .company
                .as_ref()
                .map(|c| format!(" ({})", c))
                .unwrap_or_default()
        );
    }
    for revision in &deal.revisions {
        println!();
        println!(
            "  {} {}  {}",
            style(ws.short(&revision.id)).cyan(),
            style(revision.label()).bold(),
            style(revision.created.format("%Y-%m-%d")).dim()
        );
        for option in &revision.options {
            let totals = option.totals(gst_rate);
            println!(
                "    {:<6} {:<30} {:>3} item(s) {:>12} ex GST",
                style(ws.short(&option.id)).cyan(),
                truncate_str(&option.name, 30),
                option.items.len(),
                money(totals.grand_total)
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct BoardCard {
    id: String,
    project_name: String,
    value: Decimal,
}

#[derive(Serialize)]
struct BoardSummary {
    stage: DealStage,
    count: usize,
    total: Decimal,
    average: Decimal,
    deals: Vec<BoardCard>,
}

fn run_board(global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let deals = ws.deals();
    let columns = board(&deals);
    ws.remember(deals.iter().map(|d| d.id.to_string()));

    let format = global.format.or(OutputFormat::Tsv);
    let summary: Vec<BoardSummary> = columns
        .iter()
        .map(|c| BoardSummary {
            stage: c.stage,
            count: c.count(),
            total: c.total,
            average: c.average,
            deals: c
                .deals
                .iter()
                .map(|d| BoardCard {
                    id: d.id.to_string(),
                    project_name: d.project_name.clone(),
                    value: d.value(),
                })
                .collect(),
        })
        .collect();
    if print_structured(&summary, format)? {
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(
        columns
            .iter()
            .map(|c| format!("{} ({})", c.stage.label(), c.count())),
    );
    let depth = columns.iter().map(|c| c.count()).max().unwrap_or(0);
    for row in 0..depth {
        builder.push_record(columns.iter().map(|c| {
            c.deals
                .get(row)
                .map(|d| {
                    format!(
                        "{} {}\n{}",
                        ws.short(&d.id),
                        truncate_str(&d.project_name, 18),
                        money(d.value())
                    )
                })
                .unwrap_or_default()
        }));
    }
    builder.push_record(columns.iter().map(|c| format!("Total {}", money(c.total))));
    builder.push_record(columns.iter().map(|c| format!("Avg {}", money(c.average))));

    let mut table = builder.build();
    if format == OutputFormat::Md {
        table.with(Style::markdown());
    } else {
        table.with(Style::rounded());
    }
    println!("{}", table);
    Ok(())
}

fn run_move(args: MoveArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let id = ws.resolve(&args.deal, EntityPrefix::Deal)?;
    let mut deal = ws.deal_of(&id)?;

    let previous = deal.move_to(args.stage, args.force)?;
    ws.store.save_deal(&deal)?;
    tracing::info!(deal = %deal.id, from = %previous, to = %deal.stage, forced = args.force, "deal moved");

    if !global.quiet {
        println!(
            "{} Moved {} from {} to {}",
            style("✓").green(),
            style(&deal.project_name).yellow(),
            style(previous.label()).dim(),
            style(deal.stage.label()).cyan()
        );
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let id = ws.resolve(&args.deal, EntityPrefix::Deal)?;
    let mut deal = ws.deal_of(&id)?;

    if let Some(name) = &args.name {
        ensure_unique_name(&ws, name, Some(&deal.id))?;
        deal.project_name = name.trim().to_string();
    }
    if let Some(deal_type) = args.deal_type {
        deal.deal_type = deal_type;
    }
    if let Some(state) = args.state {
        deal.state = state;
    }
    if let Some(owner) = args.owner {
        deal.owner = (!owner.trim().is_empty()).then_some(owner);
    }
    if let Some(notes) = args.notes {
        deal.notes = (!notes.trim().is_empty()).then_some(notes);
    }

    ws.store.save_deal(&deal)?;
    if !global.quiet {
        println!(
            "{} Updated deal {}",
            style("✓").green(),
            style(&deal.project_name).yellow()
        );
    }
    Ok(())
}

fn run_party(args: PartyArgs, global: &GlobalOpts) -> Result<()> {
    if args.company.is_empty() && args.contact.is_none() {
        return Err(miette::miette!("Nothing to add. Use --company or --contact."));
    }

    let ws = Workspace::open(global)?;
    let id = ws.resolve(&args.deal, EntityPrefix::Deal)?;
    let mut deal = ws.deal_of(&id)?;

    for company in &args.company {
        deal.add_company(company.trim());
    }
    if let Some(name) = args.contact {
        if let Some(company) = &args.contact_company {
            deal.add_company(company.trim());
        }
        deal.contacts.push(Contact {
            name,
            company: args.contact_company,
            email: args.email,
            phone: args.phone,
        });
    }

    ws.store.save_deal(&deal)?;
    if !global.quiet {
        println!(
            "{} {} now has {} company(ies) and {} contact(s)",
            style("✓").green(),
            style(&deal.project_name).yellow(),
            deal.companies.len(),
            deal.contacts.len()
        );
    }
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let id = ws.resolve(&args.deal, EntityPrefix::Deal)?;
    let deal = ws.deal_of(&id)?;

    let prompt = format!(
        "Delete deal '{}' with {} revision(s)?",
        deal.project_name,
        deal.revisions.len()
    );
    if !confirm(&prompt, args.yes)? {
        println!("Aborted.");
        return Ok(());
    }

    ws.store.delete_deal(&deal.id)?;
    tracing::info!(deal = %deal.id, "deal deleted");
    if !global.quiet {
        println!(
            "{} Deleted deal {}",
            style("✓").green(),
            style(&deal.project_name).yellow()
        );
    }
    Ok(())
}
