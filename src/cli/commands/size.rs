//! `pq size` command - Accessory sizing lookups

use clap::Subcommand;
use console::style;
use miette::Result;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::cli::commands::utils::Workspace;
use crate::cli::helpers::print_structured;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::pricing::sizing::{
    BaseRequest, MountRequest, SizingResult, SpringRequest, MOUNTS_PER_PUMP,
};
use crate::pricing::totals::money;

#[derive(Subcommand, Debug)]
pub enum SizeCommands {
    /// Smallest inertia base for a pump
    Base(BaseArgs),

    /// Seismic springs for a pump (and base)
    Springs(SpringArgs),

    /// Rubber mounts for a pump
    Mounts(MountArgs),
}

#[derive(clap::Args, Debug)]
pub struct BaseArgs {
    /// Pump weight (kg)
    #[arg(long, allow_hyphen_values = true)]
    pub weight: String,

    /// Pump length (mm)
    #[arg(long, allow_hyphen_values = true)]
    pub length: String,

    /// Pump width (mm)
    #[arg(long, allow_hyphen_values = true)]
    pub width: String,
}

#[derive(clap::Args, Debug)]
pub struct SpringArgs {
    /// Pump weight (kg)
    #[arg(long, allow_hyphen_values = true)]
    pub pump_weight: String,

    /// Inertia base weight (kg)
    #[arg(long, allow_hyphen_values = true)]
    pub base_weight: Option<String>,

    /// Springs in the set
    #[arg(long, allow_hyphen_values = true)]
    pub count: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct MountArgs {
    /// Pump weight (kg)
    #[arg(long, allow_hyphen_values = true)]
    pub weight: String,
}

#[derive(Serialize)]
struct SizeReport {
    result: SizingResult,
    /// Load on each spring or mount
    #[serde(skip_serializing_if = "Option::is_none")]
    load_per_unit: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u32>,
}

pub fn run(cmd: SizeCommands, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let source = ws.catalog_source();
    let sizing = ws.sizing(&source);

    let report = match cmd {
        SizeCommands::Base(args) => {
            let request = BaseRequest::parse(&args.weight, &args.length, &args.width)?;
            SizeReport {
                result: sizing.inertia_base(&request)?,
                load_per_unit: None,
                count: None,
            }
        }
        SizeCommands::Springs(args) => {
            let request = SpringRequest::parse(
                &args.pump_weight,
                args.base_weight.as_deref(),
                args.count.as_deref(),
            )?;
            let default_count = sizing.default_spring_count();
            SizeReport {
                result: sizing.seismic_springs(&request)?,
                load_per_unit: Some(request.load_per_spring(default_count).round_dp(2)),
                count: Some(request.resolved_count(default_count)),
            }
        }
        SizeCommands::Mounts(args) => {
            let request = MountRequest::parse(&args.weight)?;
            SizeReport {
                result: sizing.rubber_mounts(&request)?,
                load_per_unit: Some(request.load_per_mount().round_dp(2)),
                count: Some(MOUNTS_PER_PUMP),
            }
        }
    };

    print_report(&report, global.format.or(OutputFormat::Tsv))
}

fn print_report(report: &SizeReport, format: OutputFormat) -> Result<()> {
    if print_structured(report, format)? {
        return Ok(());
    }

    let result = &report.result;
    match format {
        OutputFormat::Id => println!("{}", result.part_number()),
        _ => {
            let tag = if result.is_fallback() {
                style(result.tag()).yellow()
            } else {
                style(result.tag()).green()
            };
            println!(
                "{} {} {} {}",
                tag,
                style(result.part_number()).cyan(),
                result.name(),
                money(result.cost())
            );
            if let (Some(load), Some(count)) = (report.load_per_unit, report.count) {
                println!("   {} x {} kg each", count, load.normalize());
            }
        }
    }
    Ok(())
}
