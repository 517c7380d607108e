//! `pq rev` command - Quote revisions of a deal

use clap::Subcommand;
use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::commands::utils::{confirm, Workspace};
use crate::cli::helpers::{escape_csv, print_structured, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityPrefix;
use crate::entities::deal::RevisionSource;
use crate::pricing::totals::money;

#[derive(Subcommand, Debug)]
pub enum RevCommands {
    /// Start a new revision for a recipient
    New(NewArgs),

    /// List revisions and options of a deal
    List(ListArgs),

    /// Delete a revision
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Deal ID or short ID (@N)
    pub deal: String,

    /// Company the revision is addressed to
    #[arg(long, short = 'r')]
    pub recipient: String,

    /// Copy the recipient's latest revision
    #[arg(long, conflicts_with = "clone")]
    pub copy_last: bool,

    /// Copy any revision of the deal (ID or @N)
    #[arg(long)]
    pub clone: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Deal ID or short ID (@N)
    pub deal: String,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Revision ID or short ID (@N)
    pub rev: String,

    /// Skip confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(cmd: RevCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        RevCommands::New(args) => run_new(args, global),
        RevCommands::List(args) => run_list(args, global),
        RevCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let deal_id = ws.resolve(&args.deal, EntityPrefix::Deal)?;
    let mut deal = ws.deal_of(&deal_id)?;

    let source = match (&args.clone, args.copy_last) {
        (Some(reference), _) => RevisionSource::Clone(ws.resolve(reference, EntityPrefix::Rev)?),
        (None, true) => RevisionSource::CopyLast,
        (None, false) => RevisionSource::Blank,
    };
    let revision = deal.new_revision(args.recipient.trim(), source)?.clone();
    ws.store.save_deal(&deal)?;

    ws.remember(
        std::iter::once(revision.id.to_string())
            .chain(revision.options.iter().map(|o| o.id.to_string())),
    );
    tracing::info!(deal = %deal.id, revision = %revision.id, "revision created");

    if global.format == OutputFormat::Id {
        println!("{}", revision.id);
    } else if !global.quiet {
        println!(
            "{} Created revision {} {} on {}",
            style("✓").green(),
            style(ws.short(&revision.id)).cyan(),
            style(revision.label()).yellow(),
            style(&deal.project_name).white()
        );
        for option in &revision.options {
            println!(
                "   {} {} ({} item(s))",
                style(ws.short(&option.id)).cyan(),
                option.name,
                option.items.len()
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct OptionRow {
    revision_id: String,
    revision: String,
    option_id: String,
    option: String,
    items: usize,
    grand_total: String,
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let deal_id = ws.resolve(&args.deal, EntityPrefix::Deal)?;
    let deal = ws.deal_of(&deal_id)?;

    ws.remember(
        deal.revisions
            .iter()
            .map(|r| r.id.to_string())
            .chain(deal.options().map(|o| o.id.to_string())),
    );

    let gst_rate = ws.config.gst_rate();
    let rows: Vec<OptionRow> = deal
        .revisions
        .iter()
        .flat_map(|r| {
            r.options.iter().map(move |o| OptionRow {
                revision_id: r.id.to_string(),
                revision: r.label(),
                option_id: o.id.to_string(),
                option: o.name.clone(),
                items: o.items.len(),
                grand_total: money(o.totals(gst_rate).grand_total),
            })
        })
        .collect();

    let format = global.format.or(OutputFormat::Tsv);
    if print_structured(&rows, format)? {
        return Ok(());
    }

    match format {
        OutputFormat::Id => {
            for revision in &deal.revisions {
                println!("{}", revision.id);
            }
        }
        OutputFormat::Csv => {
            println!("revision_id,revision,option_id,option,items,grand_total");
            for row in &rows {
                println!(
                    "{},{},{},{},{},{}",
                    row.revision_id,
                    escape_csv(&row.revision),
                    row.option_id,
                    escape_csv(&row.option),
                    row.items,
                    row.grand_total
                );
            }
        }
        _ => {
            println!(
                "{:<8} {:<26} {:<8} {:<28} {:>6} {:>12}",
                style("REV").bold().dim(),
                style("RECIPIENT").bold(),
                style("OPTION").bold().dim(),
                style("NAME").bold(),
                style("ITEMS").bold(),
                style("EX GST").bold()
            );
            println!("{}", "-".repeat(94));
            for revision in &deal.revisions {
                for (index, option) in revision.options.iter().enumerate() {
                    let (rev_short, rev_label) = if index == 0 {
                        (ws.short(&revision.id), truncate_str(&revision.label(), 26))
                    } else {
                        (String::new(), String::new())
                    };
                    println!(
                        "{:<8} {:<26} {:<8} {:<28} {:>6} {:>12}",
                        style(rev_short).cyan(),
                        rev_label,
                        style(ws.short(&option.id)).cyan(),
                        truncate_str(&option.name, 28),
                        option.items.len(),
                        money(option.totals(gst_rate).grand_total)
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let rev_id = ws.resolve(&args.rev, EntityPrefix::Rev)?;
    let mut deal = ws.deal_of(&rev_id)?;

    let label = deal
        .revision(&rev_id)
        .map(|r| r.label())
        .unwrap_or_else(|| rev_id.to_string());
    if !confirm(&format!("Delete revision {}?", label), args.yes)? {
        println!("Aborted.");
        return Ok(());
    }

    deal.delete_revision(&rev_id)?;
    ws.store.save_deal(&deal)?;
    if !global.quiet {
        println!(
            "{} Deleted revision {} from {}",
            style("✓").green(),
            style(label).yellow(),
            style(&deal.project_name).white()
        );
    }
    Ok(())
}
