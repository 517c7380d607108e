//! Reference catalog - accessory parts, price adders, pumps and products
//!
//! The catalog is read-only to the quoting workflow. Admin commands edit it
//! through [`Catalog::add`], [`Catalog::remove`] and
//! [`Catalog::set_price_adders`], which validate every record first.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::error::QuoteError;
use crate::core::loader::{self, LoadError};
use crate::pricing::totals::MAX_AMOUNT;

pub const INERTIA_BASES_FILE: &str = "inertia_bases.yaml";
pub const SEISMIC_SPRINGS_FILE: &str = "seismic_springs.yaml";
pub const RUBBER_MOUNTS_FILE: &str = "rubber_mounts.yaml";
pub const PRICE_ADDERS_FILE: &str = "price_adders.yaml";
pub const PUMPS_FILE: &str = "pumps.yaml";
pub const PRODUCTS_FILE: &str = "products.yaml";

/// Maximum number of product search results
pub const PRODUCT_SEARCH_LIMIT: usize = 10;

/// Minimum product search query length
pub const PRODUCT_SEARCH_MIN_CHARS: usize = 2;

/// Concrete plinth a pump is mounted on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InertiaBase {
    pub part_number: String,
    pub name: String,
    pub length_mm: Decimal,
    pub width_mm: Decimal,
    pub height_mm: Decimal,
    /// Weight of the base itself
    pub weight_kg: Decimal,
    pub max_load_kg: Decimal,
    /// Springs the base sits on
    pub spring_amount: u32,
    pub cost: Decimal,
}

/// Seismic spring isolator, rated per spring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeismicSpring {
    pub part_number: String,
    pub name: String,
    pub max_load_kg: Decimal,
    pub static_deflection_mm: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe2: Option<String>,
    pub cost: Decimal,
}

/// Rubber isolation mount, rated per mount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubberMount {
    pub part_number: String,
    pub name: String,
    pub max_load_kg: Decimal,
    pub cost: Decimal,
}

/// Flat prices added for optional pump upgrades
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAdders {
    #[serde(default)]
    pub ip_adder: Decimal,
    #[serde(default)]
    pub drip_tray_adder: Decimal,
}

/// Pump model with rated duty point and physical properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pump {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub series: String,
    #[serde(default)]
    pub manufacturer: String,
    /// Rated flow (L/s)
    pub flow_rate: Decimal,
    /// Rated head (m)
    pub head: Decimal,
    #[serde(default)]
    pub power_kw: Decimal,
    pub weight_kg: Decimal,
    pub length_mm: Decimal,
    pub width_mm: Decimal,
    pub unit_price: Decimal,
}

/// General catalog product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub unit_price: Decimal,
}

/// A catalog part chosen by accessory sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogPart {
    InertiaBase(InertiaBase),
    SeismicSpring(SeismicSpring),
    RubberMount(RubberMount),
}

impl CatalogPart {
    pub fn part_number(&self) -> &str {
        match self {
            CatalogPart::InertiaBase(p) => &p.part_number,
            CatalogPart::SeismicSpring(p) => &p.part_number,
            CatalogPart::RubberMount(p) => &p.part_number,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CatalogPart::InertiaBase(p) => &p.name,
            CatalogPart::SeismicSpring(p) => &p.name,
            CatalogPart::RubberMount(p) => &p.name,
        }
    }

    pub fn max_load_kg(&self) -> Decimal {
        match self {
            CatalogPart::InertiaBase(p) => p.max_load_kg,
            CatalogPart::SeismicSpring(p) => p.max_load_kg,
            CatalogPart::RubberMount(p) => p.max_load_kg,
        }
    }

    pub fn cost(&self) -> Decimal {
        match self {
            CatalogPart::InertiaBase(p) => p.cost,
            CatalogPart::SeismicSpring(p) => p.cost,
            CatalogPart::RubberMount(p) => p.cost,
        }
    }
}

/// Errors from catalog administration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("{0} cannot be negative")]
    Negative(&'static str),

    #[error("{0} cannot exceed {max}", max = MAX_AMOUNT)]
    TooLarge(&'static str),

    #[error("{table} already contains '{key}'")]
    Duplicate { table: &'static str, key: String },

    #[error("{table} has no entry '{key}'")]
    NotFound { table: &'static str, key: String },
}

fn require(field: &'static str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::MissingField(field));
    }
    Ok(())
}

fn positive(field: &'static str, value: Decimal) -> Result<(), CatalogError> {
    if value <= Decimal::ZERO {
        return Err(CatalogError::NotPositive(field));
    }
    at_most_cap(field, value)
}

fn non_negative(field: &'static str, value: Decimal) -> Result<(), CatalogError> {
    if value < Decimal::ZERO {
        return Err(CatalogError::Negative(field));
    }
    at_most_cap(field, value)
}

fn at_most_cap(field: &'static str, value: Decimal) -> Result<(), CatalogError> {
    if value > MAX_AMOUNT {
        return Err(CatalogError::TooLarge(field));
    }
    Ok(())
}

/// A row of one catalog table
pub trait CatalogRecord: Clone {
    /// Table name used in messages
    const TABLE: &'static str;

    /// Unique key (part number or SKU)
    fn key(&self) -> &str;

    fn validate(&self) -> Result<(), CatalogError>;

    fn table(catalog: &Catalog) -> &Vec<Self>;

    fn table_mut(catalog: &mut Catalog) -> &mut Vec<Self>;
}

impl CatalogRecord for InertiaBase {
    const TABLE: &'static str = "inertia_bases";

    fn key(&self) -> &str {
        &self.part_number
    }

    fn validate(&self) -> Result<(), CatalogError> {
        require("part_number", &self.part_number)?;
        require("name", &self.name)?;
        positive("length_mm", self.length_mm)?;
        positive("width_mm", self.width_mm)?;
        positive("height_mm", self.height_mm)?;
        positive("weight_kg", self.weight_kg)?;
        positive("max_load_kg", self.max_load_kg)?;
        if self.spring_amount == 0 {
            return Err(CatalogError::NotPositive("spring_amount"));
        }
        positive("cost", self.cost)
    }

    fn table(catalog: &Catalog) -> &Vec<Self> {
        &catalog.inertia_bases
    }

    fn table_mut(catalog: &mut Catalog) -> &mut Vec<Self> {
        &mut catalog.inertia_bases
    }
}

impl CatalogRecord for SeismicSpring {
    const TABLE: &'static str = "seismic_springs";

    fn key(&self) -> &str {
        &self.part_number
    }

    fn validate(&self) -> Result<(), CatalogError> {
        require("part_number", &self.part_number)?;
        require("name", &self.name)?;
        positive("max_load_kg", self.max_load_kg)?;
        positive("static_deflection_mm", self.static_deflection_mm)?;
        positive("cost", self.cost)
    }

    fn table(catalog: &Catalog) -> &Vec<Self> {
        &catalog.seismic_springs
    }

    fn table_mut(catalog: &mut Catalog) -> &mut Vec<Self> {
        &mut catalog.seismic_springs
    }
}

impl CatalogRecord for RubberMount {
    const TABLE: &'static str = "rubber_mounts";

    fn key(&self) -> &str {
        &self.part_number
    }

    fn validate(&self) -> Result<(), CatalogError> {
        require("part_number", &self.part_number)?;
        require("name", &self.name)?;
        positive("max_load_kg", self.max_load_kg)?;
        positive("cost", self.cost)
    }

    fn table(catalog: &Catalog) -> &Vec<Self> {
        &catalog.rubber_mounts
    }

    fn table_mut(catalog: &mut Catalog) -> &mut Vec<Self> {
        &mut catalog.rubber_mounts
    }
}

impl CatalogRecord for Pump {
    const TABLE: &'static str = "pumps";

    fn key(&self) -> &str {
        &self.sku
    }

    fn validate(&self) -> Result<(), CatalogError> {
        require("sku", &self.sku)?;
        require("name", &self.name)?;
        positive("flow_rate", self.flow_rate)?;
        positive("head", self.head)?;
        non_negative("power_kw", self.power_kw)?;
        positive("weight_kg", self.weight_kg)?;
        positive("length_mm", self.length_mm)?;
        positive("width_mm", self.width_mm)?;
        non_negative("unit_price", self.unit_price)
    }

    fn table(catalog: &Catalog) -> &Vec<Self> {
        &catalog.pumps
    }

    fn table_mut(catalog: &mut Catalog) -> &mut Vec<Self> {
        &mut catalog.pumps
    }
}

impl CatalogRecord for Product {
    const TABLE: &'static str = "products";

    fn key(&self) -> &str {
        &self.sku
    }

    fn validate(&self) -> Result<(), CatalogError> {
        require("sku", &self.sku)?;
        require("name", &self.name)?;
        non_negative("unit_price", self.unit_price)
    }

    fn table(catalog: &Catalog) -> &Vec<Self> {
        &catalog.products
    }

    fn table_mut(catalog: &mut Catalog) -> &mut Vec<Self> {
        &mut catalog.products
    }
}

/// Read access to the accessory reference tables
///
/// Implementations fail with [`QuoteError::CatalogUnavailable`] when the
/// tables cannot be read. An empty table is not a failure.
pub trait CatalogSource {
    fn inertia_bases(&self) -> Result<Vec<InertiaBase>, QuoteError>;

    fn seismic_springs(&self) -> Result<Vec<SeismicSpring>, QuoteError>;

    fn rubber_mounts(&self) -> Result<Vec<RubberMount>, QuoteError>;

    fn price_adders(&self) -> Result<PriceAdders, QuoteError>;
}

/// In-memory snapshot of the whole catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub inertia_bases: Vec<InertiaBase>,
    pub seismic_springs: Vec<SeismicSpring>,
    pub rubber_mounts: Vec<RubberMount>,
    pub price_adders: PriceAdders,
    pub pumps: Vec<Pump>,
    pub products: Vec<Product>,
}

impl Catalog {
    /// Load every table from a catalog directory
    pub fn load(dir: &Path) -> Result<Self, LoadError> {
        Ok(Self {
            inertia_bases: loader::read_document(&dir.join(INERTIA_BASES_FILE))?,
            seismic_springs: loader::read_document(&dir.join(SEISMIC_SPRINGS_FILE))?,
            rubber_mounts: loader::read_document(&dir.join(RUBBER_MOUNTS_FILE))?,
            price_adders: loader::read_document(&dir.join(PRICE_ADDERS_FILE))?,
            pumps: loader::read_document(&dir.join(PUMPS_FILE))?,
            products: loader::read_document(&dir.join(PRODUCTS_FILE))?,
        })
    }

    /// Write every table back to a catalog directory
    pub fn save(&self, dir: &Path) -> Result<(), LoadError> {
        loader::write_document(&dir.join(INERTIA_BASES_FILE), &self.inertia_bases)?;
        loader::write_document(&dir.join(SEISMIC_SPRINGS_FILE), &self.seismic_springs)?;
        loader::write_document(&dir.join(RUBBER_MOUNTS_FILE), &self.rubber_mounts)?;
        loader::write_document(&dir.join(PRICE_ADDERS_FILE), &self.price_adders)?;
        loader::write_document(&dir.join(PUMPS_FILE), &self.pumps)?;
        loader::write_document(&dir.join(PRODUCTS_FILE), &self.products)
    }

    /// Validate and add a record; keys are unique ignoring case
    pub fn add<T: CatalogRecord>(&mut self, record: T) -> Result<(), CatalogError> {
        record.validate()?;
        if T::table(self)
            .iter()
            .any(|existing| existing.key().eq_ignore_ascii_case(record.key()))
        {
            return Err(CatalogError::Duplicate {
                table: T::TABLE,
                key: record.key().to_string(),
            });
        }
        T::table_mut(self).push(record);
        Ok(())
    }

    pub fn remove<T: CatalogRecord>(&mut self, key: &str) -> Result<T, CatalogError> {
        let table = T::table_mut(self);
        let index = table
            .iter()
            .position(|r| r.key().eq_ignore_ascii_case(key))
            .ok_or_else(|| CatalogError::NotFound {
                table: T::TABLE,
                key: key.to_string(),
            })?;
        Ok(table.remove(index))
    }

    pub fn get<T: CatalogRecord>(&self, key: &str) -> Option<&T> {
        T::table(self)
            .iter()
            .find(|r| r.key().eq_ignore_ascii_case(key))
    }

    pub fn set_price_adders(&mut self, adders: PriceAdders) -> Result<(), CatalogError> {
        non_negative("ip_adder", adders.ip_adder)?;
        non_negative("drip_tray_adder", adders.drip_tray_adder)?;
        self.price_adders = adders;
        Ok(())
    }

    /// Case-insensitive pump search with an optional duty point filter
    ///
    /// With a duty point, only pumps meeting both flow and head are kept and
    /// the closest fit comes first.
    pub fn search_pumps(&self, query: &str, duty: Option<DutyPoint>) -> Vec<&Pump> {
        let needle = query.trim().to_lowercase();
        let mut hits: Vec<&Pump> = self
            .pumps
            .iter()
            .filter(|p| {
                needle.is_empty()
                    || p.sku.to_lowercase().contains(&needle)
                    || p.name.to_lowercase().contains(&needle)
                    || p.series.to_lowercase().contains(&needle)
            })
            .filter(|p| duty.map_or(true, |d| d.is_met_by(p)))
            .collect();

        if let Some(duty) = duty {
            hits.sort_by(|a, b| {
                duty.margin(a)
                    .cmp(&duty.margin(b))
                    .then_with(|| a.sku.cmp(&b.sku))
            });
        }
        hits
    }

    /// Case-insensitive SKU/name search, at most ten results
    pub fn search_products(&self, query: &str) -> Vec<&Product> {
        let needle = query.trim().to_lowercase();
        if needle.chars().count() < PRODUCT_SEARCH_MIN_CHARS {
            return Vec::new();
        }
        self.products
            .iter()
            .filter(|p| {
                p.sku.to_lowercase().contains(&needle) || p.name.to_lowercase().contains(&needle)
            })
            .take(PRODUCT_SEARCH_LIMIT)
            .collect()
    }
}

impl CatalogSource for Catalog {
    fn inertia_bases(&self) -> Result<Vec<InertiaBase>, QuoteError> {
        Ok(self.inertia_bases.clone())
    }

    fn seismic_springs(&self) -> Result<Vec<SeismicSpring>, QuoteError> {
        Ok(self.seismic_springs.clone())
    }

    fn rubber_mounts(&self) -> Result<Vec<RubberMount>, QuoteError> {
        Ok(self.rubber_mounts.clone())
    }

    fn price_adders(&self) -> Result<PriceAdders, QuoteError> {
        Ok(self.price_adders.clone())
    }
}

/// Catalog read from disk on every lookup
#[derive(Debug, Clone)]
pub struct ProjectCatalog {
    dir: PathBuf,
}

impl ProjectCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<T, QuoteError> {
        loader::read_document(&self.dir.join(file)).map_err(|e| {
            tracing::warn!(error = %e, "catalog lookup failed");
            QuoteError::CatalogUnavailable(e.to_string())
        })
    }
}

impl CatalogSource for ProjectCatalog {
    fn inertia_bases(&self) -> Result<Vec<InertiaBase>, QuoteError> {
        self.read(INERTIA_BASES_FILE)
    }

    fn seismic_springs(&self) -> Result<Vec<SeismicSpring>, QuoteError> {
        self.read(SEISMIC_SPRINGS_FILE)
    }

    fn rubber_mounts(&self) -> Result<Vec<RubberMount>, QuoteError> {
        self.read(RUBBER_MOUNTS_FILE)
    }

    fn price_adders(&self) -> Result<PriceAdders, QuoteError> {
        self.read(PRICE_ADDERS_FILE)
    }
}

/// Required flow and head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyPoint {
    pub flow: Decimal,
    pub head: Decimal,
}

impl DutyPoint {
    pub fn is_met_by(&self, pump: &Pump) -> bool {
        pump.flow_rate >= self.flow && pump.head >= self.head
    }

    /// Relative oversize of a pump against this duty point
    fn margin(&self, pump: &Pump) -> Decimal {
        let relative = |rated: Decimal, required: Decimal| {
            if required.is_zero() {
                rated
            } else {
                (rated - required) / required
            }
        };
        relative(pump.flow_rate, self.flow) + relative(pump.head, self.head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn base(part: &str, load: Decimal) -> InertiaBase {
        InertiaBase {
            part_number: part.to_string(),
            name: format!("Base {}", part),
            length_mm: dec!(1200),
            width_mm: dec!(700),
            height_mm: dec!(150),
            weight_kg: dec!(250),
            max_load_kg: load,
            spring_amount: 4,
            cost: dec!(850),
        }
    }

    fn pump(sku: &str, flow: Decimal, head: Decimal) -> Pump {
        Pump {
            sku: sku.to_string(),
            name: format!("{} end suction", sku),
            series: "NBG".to_string(),
            manufacturer: "Grundfos".to_string(),
            flow_rate: flow,
            head,
            power_kw: dec!(5.5),
            weight_kg: dec!(180),
            length_mm: dec!(900),
            width_mm: dec!(450),
            unit_price: dec!(4200),
        }
    }

    #[test]
    fn test_add_validates_and_rejects_duplicates() {
        let mut catalog = Catalog::default();
        catalog.add(base("IB-100", dec!(500))).unwrap();

        let err = catalog.add(base("ib-100", dec!(800))).unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate { .. }));

        let mut bad = base("IB-200", dec!(0));
        assert_eq!(catalog.add(bad.clone()), Err(CatalogError::NotPositive("max_load_kg")));
        bad.max_load_kg = dec!(100);
        bad.part_number = " ".to_string();
        assert_eq!(catalog.add(bad), Err(CatalogError::MissingField("part_number")));

        let mut pricey = base("IB-300", dec!(500));
        pricey.cost = Decimal::MAX;
        assert_eq!(catalog.add(pricey), Err(CatalogError::TooLarge("cost")));
    }

    #[test]
    fn test_remove() {
        let mut catalog = Catalog::default();
        catalog.add(base("IB-100", dec!(500))).unwrap();
        let removed: InertiaBase = catalog.remove("IB-100").unwrap();
        assert_eq!(removed.part_number, "IB-100");
        assert!(catalog.remove::<InertiaBase>("IB-100").is_err());
    }

    #[test]
    fn test_price_adders_non_negative() {
        let mut catalog = Catalog::default();
        let err = catalog
            .set_price_adders(PriceAdders {
                ip_adder: dec!(-1),
                drip_tray_adder: dec!(0),
            })
            .unwrap_err();
        assert_eq!(err, CatalogError::Negative("ip_adder"));
    }

    #[test]
    fn test_pump_search_duty_point_ranking() {
        let mut catalog = Catalog::default();
        catalog.pumps = vec![
            pump("NBG-65", dec!(30), dec!(40)),
            pump("NBG-50", dec!(12), dec!(25)),
            pump("NBG-80", dec!(22), dec!(32)),
            pump("TP-40", dec!(25), dec!(35)),
        ];

        let all = catalog.search_pumps("nbg", None);
        assert_eq!(all.len(), 4);

        let duty = DutyPoint { flow: dec!(20), head: dec!(30) };
        let hits: Vec<&str> = catalog
            .search_pumps("", Some(duty))
            .iter()
            .map(|p| p.sku.as_str())
            .collect();
        assert_eq!(hits, vec!["NBG-80", "TP-40", "NBG-65"]);
    }

    #[test]
    fn test_product_search_limits() {
        let mut catalog = Catalog::default();
        for n in 0..15 {
            catalog.products.push(Product {
                sku: format!("VAL-{:02}", n),
                name: "Butterfly valve".to_string(),
                description: None,
                unit_price: dec!(120),
            });
        }
        assert!(catalog.search_products("v").is_empty());
        assert_eq!(catalog.search_products("VALVE").len(), PRODUCT_SEARCH_LIMIT);
        assert_eq!(catalog.search_products("val-03").len(), 1);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let tmp = tempdir().unwrap();
        let mut catalog = Catalog::default();
        catalog.add(base("IB-100", dec!(500))).unwrap();
        catalog.save(tmp.path()).unwrap();

        let loaded = Catalog::load(tmp.path()).unwrap();
        assert_eq!(loaded, catalog);
    }

    #[test]
    fn test_project_catalog_unavailable() {
        let tmp = tempdir().unwrap();
        let source = ProjectCatalog::new(tmp.path().join("missing"));
        let err = source.inertia_bases().unwrap_err();
        assert!(matches!(err, QuoteError::CatalogUnavailable(_)));
        assert!(err.is_retryable());
    }
}
