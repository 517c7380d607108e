//! Shared utilities for CLI commands

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_csv, print_structured, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::project::Project;
use crate::core::shortid::ShortIdIndex;
use crate::core::store::{FieldAck, ProjectStore};
use crate::core::Config;
use crate::entities::catalog::{Catalog, CatalogSource, ProjectCatalog};
use crate::entities::deal::Deal;
use crate::entities::quote::{LineItem, LineSource, QuoteOption};
use crate::pricing::editor::{CellEditor, CommitOutcome, EditTarget, Key};
use crate::pricing::sizing::SizingService;
use crate::pricing::totals::{money, OptionTotals};

/// Everything a command needs from the current project
pub struct Workspace {
    pub project: Project,
    pub config: Config,
    pub store: ProjectStore,
    pub short_ids: ShortIdIndex,
}

impl Workspace {
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project =
            Project::open(global.project.as_deref()).map_err(|e| miette::miette!("{}", e))?;
        let config = Config::load(Some(project.root()));
        let short_ids = ShortIdIndex::load(&project);
        let store = ProjectStore::new(project.clone());
        Ok(Self {
            project,
            config,
            store,
            short_ids,
        })
    }

    pub fn deals(&self) -> Vec<Deal> {
        self.store.deals().into_iter().map(|(_, deal)| deal).collect()
    }

    /// Resolve `@N`, a full ID or a unique ID prefix to an entity of one kind
    pub fn resolve(&self, reference: &str, prefix: EntityPrefix) -> Result<EntityId> {
        let raw = self.short_ids.resolve(reference).ok_or_else(|| {
            miette::miette!(
                "Unknown short ID '{}'. List entities first to refresh aliases.",
                reference
            )
        })?;

        if let Ok(id) = EntityId::parse(&raw) {
            if id.prefix() != prefix {
                return Err(miette::miette!(
                    "'{}' is a {} ID, expected a {} ID",
                    reference,
                    id.prefix(),
                    prefix
                ));
            }
            return Ok(id);
        }

        let needle = raw.to_uppercase();
        let mut matches: Vec<EntityId> = self
            .deals()
            .iter()
            .flat_map(|deal| ids_of(deal, prefix))
            .filter(|id| id.to_string().starts_with(&needle))
            .collect();
        matches.sort();
        matches.dedup();

        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(miette::miette!(
                "No {} found matching '{}'",
                kind_name(prefix),
                reference
            )),
            n => Err(miette::miette!(
                "'{}' matches {} {}s; use a longer prefix",
                reference,
                n,
                kind_name(prefix)
            )),
        }
    }

    /// Deal holding any entity
    pub fn deal_of(&self, id: &EntityId) -> Result<Deal> {
        Ok(self.store.deal_containing(id)?)
    }

    /// Hand out `@N` aliases and persist the index
    pub fn remember(&mut self, ids: impl IntoIterator<Item = String>) {
        self.short_ids.ensure_all(ids);
        if let Err(e) = self.short_ids.save(&self.project) {
            tracing::warn!(error = %e, "could not save short IDs");
        }
    }

    /// `@N` alias of an entity, or an empty string
    pub fn short(&self, id: &EntityId) -> String {
        self.short_ids
            .get_short_id(&id.to_string())
            .unwrap_or_default()
    }

    /// Alias if known, otherwise the full ID
    pub fn label(&self, id: &EntityId) -> String {
        self.short_ids.display(&id.to_string())
    }

    /// Whole catalog, for administration and search
    pub fn catalog(&self) -> Result<Catalog> {
        Catalog::load(&self.project.catalog_dir()).into_diagnostic()
    }

    /// Catalog read on demand, for sizing lookups
    pub fn catalog_source(&self) -> ProjectCatalog {
        ProjectCatalog::new(self.project.catalog_dir())
    }

    pub fn sizing<'a>(&self, catalog: &'a dyn CatalogSource) -> SizingService<'a> {
        SizingService::new(catalog, self.config.fallback_parts())
            .with_default_spring_count(self.config.default_spring_count())
    }
}

/// All IDs of one kind held by a deal
fn ids_of(deal: &Deal, prefix: EntityPrefix) -> Vec<EntityId> {
    match prefix {
        EntityPrefix::Deal => vec![deal.id.clone()],
        EntityPrefix::Rev => deal.revisions.iter().map(|r| r.id.clone()).collect(),
        EntityPrefix::Opt => deal.options().map(|o| o.id.clone()).collect(),
        EntityPrefix::Item => deal
            .options()
            .flat_map(|o| o.items.iter().map(|i| i.id.clone()))
            .collect(),
    }
}

fn kind_name(prefix: EntityPrefix) -> &'static str {
    match prefix {
        EntityPrefix::Deal => "deal",
        EntityPrefix::Rev => "revision",
        EntityPrefix::Opt => "option",
        EntityPrefix::Item => "item",
    }
}

/// Ask before a destructive action unless `--yes` was given
pub fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .into_diagnostic()
}

#[derive(Serialize)]
struct OptionReport<'a> {
    option: &'a QuoteOption,
    totals: &'a OptionTotals,
}

fn row_name(item: &LineItem) -> String {
    if item.source == LineSource::SyntheticAccessory {
        format!("  ↳ {}", item.name)
    } else {
        item.name.clone()
    }
}

/// Print an option's rows and totals, handing out aliases for its items
pub fn print_option(ws: &mut Workspace, option: &QuoteOption, format: OutputFormat) -> Result<()> {
    let totals = option.totals(ws.config.gst_rate());
    ws.remember(option.items.iter().map(|i| i.id.to_string()));

    let format = format.or(OutputFormat::Tsv);
    let report = OptionReport {
        option,
        totals: &totals,
    };
    if print_structured(&report, format)? {
        return Ok(());
    }

    let summary = [
        ("Subtotal", totals.subtotal),
        ("Freight", totals.freight),
        ("Total ex GST", totals.grand_total),
        ("GST", totals.gst),
        ("Total inc GST", totals.total_inc_gst),
    ];

    match format {
        OutputFormat::Id => {
            for item in &option.items {
                println!("{}", item.id);
            }
        }
        OutputFormat::Csv => {
            println!("short_id,id,sku,name,quantity,unit_price,discount,line_total");
            for (item, total) in option.items.iter().zip(&totals.line_totals) {
                println!(
                    "{},{},{},{},{},{},{},{}",
                    ws.short(&item.id),
                    item.id,
                    escape_csv(&item.sku),
                    escape_csv(&item.name),
                    item.quantity,
                    money(item.unit_price),
                    item.discount.normalize(),
                    money(*total)
                );
            }
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["#", "SKU", "Description", "Qty", "Unit", "Disc %", "Total"]);
            for (index, (item, total)) in option.items.iter().zip(&totals.line_totals).enumerate() {
                builder.push_record([
                    (index + 1).to_string(),
                    item.sku.clone(),
                    item.name.clone(),
                    item.quantity.to_string(),
                    money(item.unit_price),
                    item.discount.normalize().to_string(),
                    money(*total),
                ]);
            }
            for (label, amount) in summary {
                builder.push_record([
                    String::new(),
                    String::new(),
                    label.to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    money(amount),
                ]);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        _ => {
            println!(
                "{} {}",
                style(&option.name).bold(),
                style(format!("({})", ws.label(&option.id))).dim()
            );
            println!(
                "{:<8} {:<14} {:<34} {:>5} {:>11} {:>6} {:>12}",
                style("SHORT").bold().dim(),
                style("SKU").bold(),
                style("NAME").bold(),
                style("QTY").bold(),
                style("UNIT").bold(),
                style("DISC%").bold(),
                style("TOTAL").bold()
            );
            println!("{}", "-".repeat(98));
            for (item, total) in option.items.iter().zip(&totals.line_totals) {
                println!(
                    "{:<8} {:<14} {:<34} {:>5} {:>11} {:>6} {:>12}",
                    style(ws.short(&item.id)).cyan(),
                    truncate_str(&item.sku, 14),
                    truncate_str(&row_name(item), 34),
                    item.quantity,
                    money(item.unit_price),
                    item.discount.normalize(),
                    money(*total)
                );
            }
            println!("{}", "-".repeat(98));
            for (label, amount) in summary {
                println!("{:>84} {:>13}", label, money(amount));
            }
        }
    }
    Ok(())
}

/// Drive an in-place edit through the cell editor and the store
///
/// Returns None when the value was unchanged and nothing was written.
pub fn commit_edit(ws: &mut Workspace, target: EditTarget, current: String, value: &str) -> Result<Option<FieldAck>> {
    let mut cell = CellEditor::new(target, current);
    cell.begin_edit();
    cell.input(value);
    match cell.on_key(Key::Enter, &mut ws.store) {
        Some(CommitOutcome::Saved(ack)) => Ok(Some(ack)),
        Some(CommitOutcome::Failed(error)) => Err(error.into()),
        Some(CommitOutcome::Unchanged) | None => Ok(None),
    }
}
