//! `pq catalog` command - Reference catalog administration

use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use tabled::{builder::Builder, settings::Style};

use crate::cli::commands::utils::{confirm, Workspace};
use crate::cli::helpers::print_structured;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::catalog::{
    Catalog, CatalogRecord, InertiaBase, PriceAdders, Product, Pump, RubberMount, SeismicSpring,
};
use crate::pricing::totals::money;

/// Catalog tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CatalogTable {
    InertiaBases,
    SeismicSprings,
    RubberMounts,
    PriceAdders,
    Pumps,
    Products,
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// List one catalog table
    List(ListArgs),

    /// Add an inertia base
    AddBase(AddBaseArgs),

    /// Add a seismic spring
    AddSpring(AddSpringArgs),

    /// Add a rubber mount
    AddMount(AddMountArgs),

    /// Add a pump model
    AddPump(AddPumpArgs),

    /// Add a general product
    AddProduct(AddProductArgs),

    /// Remove an entry by part number or SKU
    Remove(RemoveArgs),

    /// Set the IP upgrade and drip tray prices
    SetAdders(SetAddersArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[arg(value_enum)]
    pub table: CatalogTable,
}

#[derive(clap::Args, Debug)]
pub struct AddBaseArgs {
    pub part_number: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub length: Decimal,
    #[arg(long)]
    pub width: Decimal,
    #[arg(long)]
    pub height: Decimal,
    /// Weight of the base itself (kg)
    #[arg(long)]
    pub weight: Decimal,
    #[arg(long)]
    pub max_load: Decimal,
    /// Springs the base sits on
    #[arg(long, default_value_t = 4)]
    pub springs: u32,
    #[arg(long)]
    pub cost: Decimal,
}

#[derive(clap::Args, Debug)]
pub struct AddSpringArgs {
    pub part_number: String,
    #[arg(long)]
    pub name: String,
    /// Rated load per spring (kg)
    #[arg(long)]
    pub max_load: Decimal,
    #[arg(long, default_value = "25")]
    pub deflection: Decimal,
    #[arg(long)]
    pub stripe1: Option<String>,
    #[arg(long)]
    pub stripe2: Option<String>,
    #[arg(long)]
    pub cost: Decimal,
}

#[derive(clap::Args, Debug)]
pub struct AddMountArgs {
    pub part_number: String,
    #[arg(long)]
    pub name: String,
    /// Rated load per mount (kg)
    #[arg(long)]
    pub max_load: Decimal,
    #[arg(long)]
    pub cost: Decimal,
}

#[derive(clap::Args, Debug)]
pub struct AddPumpArgs {
    pub sku: String,
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "")]
    pub series: String,
    #[arg(long, default_value = "")]
    pub manufacturer: String,
    /// Rated flow (L/s)
    #[arg(long)]
    pub flow: Decimal,
    /// Rated head (m)
    #[arg(long)]
    pub head: Decimal,
    #[arg(long, default_value = "0")]
    pub power: Decimal,
    #[arg(long)]
    pub weight: Decimal,
    #[arg(long)]
    pub length: Decimal,
    #[arg(long)]
    pub width: Decimal,
    #[arg(long)]
    pub price: Decimal,
}

#[derive(clap::Args, Debug)]
pub struct AddProductArgs {
    pub sku: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub price: Decimal,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    #[arg(value_enum)]
    pub table: CatalogTable,

    /// Part number or SKU
    pub key: String,

    /// Skip confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct SetAddersArgs {
    /// IP rating upgrade price
    #[arg(long)]
    pub ip: Option<Decimal>,

    /// Drip tray price
    #[arg(long)]
    pub drip_tray: Option<Decimal>,
}

pub fn run(cmd: CatalogCommands, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let mut catalog = ws.catalog()?;

    let message = match cmd {
        CatalogCommands::List(args) => return print_table(&catalog, args.table, global.format),
        CatalogCommands::AddBase(args) => add(
            &mut catalog,
            InertiaBase {
                part_number: args.part_number.trim().to_string(),
                name: args.name,
                length_mm: args.length,
                width_mm: args.width,
                height_mm: args.height,
                weight_kg: args.weight,
                max_load_kg: args.max_load,
                spring_amount: args.springs,
                cost: args.cost,
            },
        )?,
        CatalogCommands::AddSpring(args) => add(
            &mut catalog,
            SeismicSpring {
                part_number: args.part_number.trim().to_string(),
                name: args.name,
                max_load_kg: args.max_load,
                static_deflection_mm: args.deflection,
                stripe1: args.stripe1,
                stripe2: args.stripe2,
                cost: args.cost,
            },
        )?,
        CatalogCommands::AddMount(args) => add(
            &mut catalog,
            RubberMount {
                part_number: args.part_number.trim().to_string(),
                name: args.name,
                max_load_kg: args.max_load,
                cost: args.cost,
            },
        )?,
        CatalogCommands::AddPump(args) => add(
            &mut catalog,
            Pump {
                sku: args.sku.trim().to_string(),
                name: args.name,
                series: args.series,
                manufacturer: args.manufacturer,
                flow_rate: args.flow,
                head: args.head,
                power_kw: args.power,
                weight_kg: args.weight,
                length_mm: args.length,
                width_mm: args.width,
                unit_price: args.price,
            },
        )?,
        CatalogCommands::AddProduct(args) => add(
            &mut catalog,
            Product {
                sku: args.sku.trim().to_string(),
                name: args.name,
                description: args.description,
                unit_price: args.price,
            },
        )?,
        CatalogCommands::Remove(args) => {
            if !confirm(&format!("Remove '{}'?", args.key), args.yes)? {
                println!("Aborted.");
                return Ok(());
            }
            remove(&mut catalog, args.table, &args.key)?
        }
        CatalogCommands::SetAdders(args) => {
            let current = catalog.price_adders.clone();
            catalog
                .set_price_adders(PriceAdders {
                    ip_adder: args.ip.unwrap_or(current.ip_adder),
                    drip_tray_adder: args.drip_tray.unwrap_or(current.drip_tray_adder),
                })
                .into_diagnostic()?;
            format!(
                "Price adders: IP {} / drip tray {}",
                money(catalog.price_adders.ip_adder),
                money(catalog.price_adders.drip_tray_adder)
            )
        }
    };

    catalog.save(&ws.project.catalog_dir()).into_diagnostic()?;
    tracing::info!("{}", message);
    if !global.quiet {
        println!("{} {}", style("✓").green(), message);
    }
    Ok(())
}

fn add<T: CatalogRecord>(catalog: &mut Catalog, record: T) -> Result<String> {
    let key = record.key().to_string();
    catalog.add(record).into_diagnostic()?;
    Ok(format!("Added {} to {}", key, T::TABLE))
}

fn remove(catalog: &mut Catalog, table: CatalogTable, key: &str) -> Result<String> {
    let removed = match table {
        CatalogTable::InertiaBases => catalog.remove::<InertiaBase>(key).map(|_| ()),
        CatalogTable::SeismicSprings => catalog.remove::<SeismicSpring>(key).map(|_| ()),
        CatalogTable::RubberMounts => catalog.remove::<RubberMount>(key).map(|_| ()),
        CatalogTable::Pumps => catalog.remove::<Pump>(key).map(|_| ()),
        CatalogTable::Products => catalog.remove::<Product>(key).map(|_| ()),
        CatalogTable::PriceAdders => {
            return Err(miette::miette!(
                "Price adders cannot be removed; use 'pq catalog set-adders'"
            ))
        }
    };
    removed.into_diagnostic()?;
    Ok(format!("Removed {}", key))
}

fn print_table(catalog: &Catalog, table: CatalogTable, format: OutputFormat) -> Result<()> {
    let format = format.or(OutputFormat::Tsv);
    let structured = match table {
        CatalogTable::InertiaBases => print_structured(&catalog.inertia_bases, format)?,
        CatalogTable::SeismicSprings => print_structured(&catalog.seismic_springs, format)?,
        CatalogTable::RubberMounts => print_structured(&catalog.rubber_mounts, format)?,
        CatalogTable::PriceAdders => print_structured(&catalog.price_adders, format)?,
        CatalogTable::Pumps => print_structured(&catalog.pumps, format)?,
        CatalogTable::Products => print_structured(&catalog.products, format)?,
    };
    if structured {
        return Ok(());
    }

    let mut builder = Builder::default();
    let count = match table {
        CatalogTable::InertiaBases => {
            builder.push_record(["PART", "NAME", "L x W x H", "WEIGHT", "MAX LOAD", "SPRINGS", "COST"]);
            for b in &catalog.inertia_bases {
                builder.push_record([
                    b.part_number.clone(),
                    b.name.clone(),
                    format!("{} x {} x {}", b.length_mm, b.width_mm, b.height_mm),
                    b.weight_kg.to_string(),
                    b.max_load_kg.to_string(),
                    b.spring_amount.to_string(),
                    money(b.cost),
                ]);
            }
            catalog.inertia_bases.len()
        }
        CatalogTable::SeismicSprings => {
            builder.push_record(["PART", "NAME", "MAX LOAD", "DEFLECTION", "STRIPES", "COST"]);
            for s in &catalog.seismic_springs {
                let stripes: Vec<&str> = [&s.stripe1, &s.stripe2]
                    .into_iter()
                    .flatten()
                    .map(String::as_str)
                    .collect();
                builder.push_record([
                    s.part_number.clone(),
                    s.name.clone(),
                    s.max_load_kg.to_string(),
                    s.static_deflection_mm.to_string(),
                    stripes.join("/"),
                    money(s.cost),
                ]);
            }
            catalog.seismic_springs.len()
        }
        CatalogTable::RubberMounts => {
            builder.push_record(["PART", "NAME", "MAX LOAD", "COST"]);
            for m in &catalog.rubber_mounts {
                builder.push_record([
                    m.part_number.clone(),
                    m.name.clone(),
                    m.max_load_kg.to_string(),
                    money(m.cost),
                ]);
            }
            catalog.rubber_mounts.len()
        }
        CatalogTable::PriceAdders => {
            builder.push_record(["ADDER", "PRICE"]);
            builder.push_record(["ip_upgrade".to_string(), money(catalog.price_adders.ip_adder)]);
            builder.push_record([
                "drip_tray".to_string(),
                money(catalog.price_adders.drip_tray_adder),
            ]);
            2
        }
        CatalogTable::Pumps => {
            builder.push_record(["SKU", "NAME", "SERIES", "FLOW", "HEAD", "KW", "WEIGHT", "PRICE"]);
            for p in &catalog.pumps {
                builder.push_record([
                    p.sku.clone(),
                    p.name.clone(),
                    p.series.clone(),
                    p.flow_rate.to_string(),
                    p.head.to_string(),
                    p.power_kw.to_string(),
                    p.weight_kg.to_string(),
                    money(p.unit_price),
                ]);
            }
            catalog.pumps.len()
        }
        CatalogTable::Products => {
            builder.push_record(["SKU", "NAME", "PRICE"]);
            for p in &catalog.products {
                builder.push_record([p.sku.clone(), p.name.clone(), money(p.unit_price)]);
            }
            catalog.products.len()
        }
    };

    let mut table_view = builder.build();
    if format == OutputFormat::Md {
        println!("{}", table_view.with(Style::markdown()));
    } else {
        println!("{}", table_view.with(Style::rounded()));
        println!("{} {} entries", style("→").dim(), count);
    }
    Ok(())
}
