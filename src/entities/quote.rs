//! Quote revisions, options and line items

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::error::QuoteError;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::pricing::totals::{self, OptionTotals};

/// SKU recorded on rows detached from the catalog
pub const CUSTOM_SKU: &str = "CUSTOM";

/// Name given to the option of a blank revision
pub const MAIN_OPTION: &str = "Main Option";

/// Where a line item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineSource {
    #[default]
    CatalogProduct,
    Custom,
    SyntheticAccessory,
}

impl std::fmt::Display for LineSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineSource::CatalogProduct => write!(f, "catalog_product"),
            LineSource::Custom => write!(f, "custom"),
            LineSource::SyntheticAccessory => write!(f, "synthetic_accessory"),
        }
    }
}

/// Accessory tags a pump row can carry
///
/// Variant order is the order accessories are sized and inserted in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum AccessoryKind {
    InertiaBase,
    SeismicSprings,
    RubberMounts,
    IpUpgrade,
    DripTray,
}

impl AccessoryKind {
    pub fn all() -> &'static [AccessoryKind] {
        &[
            AccessoryKind::InertiaBase,
            AccessoryKind::SeismicSprings,
            AccessoryKind::RubberMounts,
            AccessoryKind::IpUpgrade,
            AccessoryKind::DripTray,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessoryKind::InertiaBase => "inertia_base",
            AccessoryKind::SeismicSprings => "seismic_springs",
            AccessoryKind::RubberMounts => "rubber_mounts",
            AccessoryKind::IpUpgrade => "ip_upgrade",
            AccessoryKind::DripTray => "drip_tray",
        }
    }

    /// Sort, then drop duplicates
    pub fn normalize(kinds: &[AccessoryKind]) -> Vec<AccessoryKind> {
        let mut kinds = kinds.to_vec();
        kinds.sort();
        kinds.dedup();
        kinds
    }
}

impl std::fmt::Display for AccessoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AccessoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "inertia_base" => Ok(AccessoryKind::InertiaBase),
            "seismic_springs" | "seismic_spring" => Ok(AccessoryKind::SeismicSprings),
            "rubber_mounts" | "rubber_mount" => Ok(AccessoryKind::RubberMounts),
            "ip_upgrade" => Ok(AccessoryKind::IpUpgrade),
            "drip_tray" => Ok(AccessoryKind::DripTray),
            _ => Err(format!("Unknown accessory: {}", s)),
        }
    }
}

/// Physical properties captured when a pump is added to an option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpDimensions {
    pub weight_kg: Decimal,
    pub length_mm: Decimal,
    pub width_mm: Decimal,
}

/// Line item fields that can be edited in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ItemField {
    Notes,
    Quantity,
    UnitPrice,
    Discount,
    CustomName,
}

impl ItemField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemField::Notes => "notes",
            ItemField::Quantity => "quantity",
            ItemField::UnitPrice => "unit_price",
            ItemField::Discount => "discount",
            ItemField::CustomName => "custom_name",
        }
    }

    /// Fields whose values compare numerically
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ItemField::Quantity | ItemField::UnitPrice | ItemField::Discount
        )
    }
}

impl std::fmt::Display for ItemField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ItemField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notes" => Ok(ItemField::Notes),
            "quantity" => Ok(ItemField::Quantity),
            "unit_price" => Ok(ItemField::UnitPrice),
            "discount" => Ok(ItemField::Discount),
            "custom_name" => Ok(ItemField::CustomName),
            _ => Err(format!("Invalid field: {}", s)),
        }
    }
}

/// Option fields that can be edited in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OptionField {
    Name,
    FreightCharge,
}

impl OptionField {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionField::Name => "name",
            OptionField::FreightCharge => "freight_charge",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, OptionField::FreightCharge)
    }
}

impl std::fmt::Display for OptionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn reject(message: String) -> QuoteError {
    QuoteError::PersistenceRejected(message)
}

/// Parse a non-negative money or percentage value for storage
fn parse_non_negative(field: &str, value: &str) -> Result<Decimal, QuoteError> {
    let parsed = value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| reject(format!("{} must be a number, got '{}'", field, value)))?;
    if parsed.is_sign_negative() && !parsed.is_zero() {
        return Err(reject(format!("{} cannot be negative", field)));
    }
    if parsed > totals::MAX_AMOUNT {
        return Err(reject(format!("{} cannot exceed {}", field, totals::MAX_AMOUNT)));
    }
    Ok(parsed)
}

/// One priced row of an option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Unique identifier (ITEM-xxx)
    pub id: EntityId,

    #[serde(default)]
    pub source: LineSource,

    pub name: String,

    /// Catalog SKU or part number, `CUSTOM` for custom rows
    pub sku: String,

    pub quantity: u32,

    pub unit_price: Decimal,

    /// Percentage discount, 0 to 100
    #[serde(default)]
    pub discount: Decimal,

    /// Position within the option, unique and contiguous from 0
    #[serde(default)]
    pub display_order: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Pump row this accessory row was synthesized for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessory_of: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessory_kind: Option<AccessoryKind>,

    /// Accessories selected for a pump row
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessories: Vec<AccessoryKind>,

    /// Physical properties of a pump row, used for accessory sizing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pump: Option<PumpDimensions>,
}

impl LineItem {
    /// Create a catalog product row
    pub fn product(sku: impl Into<String>, name: impl Into<String>, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Item),
            source: LineSource::CatalogProduct,
            name: name.into(),
            sku: sku.into(),
            quantity,
            unit_price,
            discount: Decimal::ZERO,
            display_order: 0,
            notes: None,
            accessory_of: None,
            accessory_kind: None,
            accessories: Vec::new(),
            pump: None,
        }
    }

    /// Create a custom row not tied to the catalog
    pub fn custom(name: impl Into<String>, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            source: LineSource::Custom,
            ..Self::product(CUSTOM_SKU, name, quantity, unit_price)
        }
    }

    /// Create a catalog pump row carrying its physical properties
    pub fn pump(sku: impl Into<String>, name: impl Into<String>, unit_price: Decimal, dims: PumpDimensions) -> Self {
        Self {
            pump: Some(dims),
            ..Self::product(sku, name, 1, unit_price)
        }
    }

    /// Create an accessory row synthesized for a pump row
    pub fn synthetic(
        pump_item: &EntityId,
        kind: AccessoryKind,
        sku: impl Into<String>,
        name: impl Into<String>,
        unit_price: Decimal,
    ) -> Self {
        Self {
            source: LineSource::SyntheticAccessory,
            accessory_of: Some(pump_item.clone()),
            accessory_kind: Some(kind),
            ..Self::product(sku, name, 1, unit_price)
        }
    }

    pub fn line_total(&self) -> Decimal {
        totals::line_total(Decimal::from(self.quantity), self.unit_price, self.discount)
    }

    pub fn is_pump(&self) -> bool {
        self.pump.is_some()
    }

    /// Current value of an editable field, as shown in a table cell
    pub fn field_value(&self, field: ItemField) -> String {
        match field {
            ItemField::Notes => self.notes.clone().unwrap_or_default(),
            ItemField::Quantity => self.quantity.to_string(),
            ItemField::UnitPrice => self.unit_price.to_string(),
            ItemField::Discount => self.discount.to_string(),
            ItemField::CustomName => self.name.clone(),
        }
    }

    /// Validate and apply an edit, returning the confirmed value
    pub fn apply_field(&mut self, field: ItemField, value: &str) -> Result<String, QuoteError> {
        match field {
            ItemField::Notes => {
                let notes = value.trim();
                self.notes = (!notes.is_empty()).then(|| notes.to_string());
            }
            ItemField::Quantity => {
                self.quantity = value.trim().parse::<u32>().map_err(|_| {
                    reject(format!("quantity must be a whole number of at least 0, got '{}'", value))
                })?;
            }
            ItemField::UnitPrice => {
                self.unit_price = parse_non_negative("unit_price", value)?;
            }
            ItemField::Discount => {
                let discount = parse_non_negative("discount", value)?;
                if discount > dec!(100) {
                    return Err(reject("discount must be between 0 and 100".to_string()));
                }
                self.discount = discount;
            }
            ItemField::CustomName => {
                let name = value.trim();
                if name.is_empty() {
                    return Err(reject("custom_name cannot be empty".to_string()));
                }
                self.name = name.to_string();
                self.sku = CUSTOM_SKU.to_string();
                self.source = LineSource::Custom;
                self.pump = None;
                self.accessories.clear();
            }
        }
        Ok(self.field_value(field))
    }
}

/// One priced configuration within a revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteOption {
    /// Unique identifier (OPT-xxx)
    pub id: EntityId,

    pub name: String,

    #[serde(default)]
    pub freight_charge: Decimal,

    /// Items in display order
    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl QuoteOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Opt),
            name: name.into(),
            freight_charge: Decimal::ZERO,
            items: Vec::new(),
        }
    }

    pub fn item(&self, id: &EntityId) -> Option<&LineItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    pub fn item_mut(&mut self, id: &EntityId) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|i| &i.id == id)
    }

    pub fn position(&self, id: &EntityId) -> Option<usize> {
        self.items.iter().position(|i| &i.id == id)
    }

    pub fn item_ids(&self) -> Vec<EntityId> {
        self.items.iter().map(|i| i.id.clone()).collect()
    }

    /// Reassign display order from position
    pub fn renumber(&mut self) {
        for (index, item) in self.items.iter_mut().enumerate() {
            item.display_order = index as u32;
        }
    }

    /// Append an item at the end of the option
    pub fn push_item(&mut self, item: LineItem) -> EntityId {
        let id = item.id.clone();
        self.items.push(item);
        self.renumber();
        id
    }

    /// Remove an item and any accessory rows synthesized for it
    pub fn remove_item(&mut self, id: &EntityId) -> Option<LineItem> {
        let index = self.position(id)?;
        let removed = self.items.remove(index);
        self.items
            .retain(|item| item.accessory_of.as_ref() != Some(id));
        self.renumber();
        Some(removed)
    }

    pub fn totals(&self, gst_rate: Decimal) -> OptionTotals {
        OptionTotals::compute(
            self.items
                .iter()
                .map(|i| (Decimal::from(i.quantity), i.unit_price, i.discount)),
            self.freight_charge,
            gst_rate,
        )
    }

    pub fn field_value(&self, field: OptionField) -> String {
        match field {
            OptionField::Name => self.name.clone(),
            OptionField::FreightCharge => self.freight_charge.to_string(),
        }
    }

    /// Validate and apply an edit, returning the confirmed value
    pub fn apply_field(&mut self, field: OptionField, value: &str) -> Result<String, QuoteError> {
        match field {
            OptionField::Name => {
                let name = value.trim();
                if name.is_empty() {
                    return Err(reject("option name cannot be empty".to_string()));
                }
                self.name = name.to_string();
            }
            OptionField::FreightCharge => {
                self.freight_charge = parse_non_negative("freight_charge", value)?;
            }
        }
        Ok(self.field_value(field))
    }

    /// Deep copy with fresh ids; accessory links follow their pumps
    pub fn deep_clone(&self) -> Self {
        let mut remap: HashMap<EntityId, EntityId> = HashMap::new();
        let mut items: Vec<LineItem> = self
            .items
            .iter()
            .map(|item| {
                let mut copy = item.clone();
                copy.id = EntityId::new(EntityPrefix::Item);
                remap.insert(item.id.clone(), copy.id.clone());
                copy
            })
            .collect();

        for item in &mut items {
            if let Some(pump) = &item.accessory_of {
                item.accessory_of = remap.get(pump).cloned();
            }
        }

        Self {
            id: EntityId::new(EntityPrefix::Opt),
            name: self.name.clone(),
            freight_charge: self.freight_charge,
            items,
        }
    }
}

/// Versioned pricing offered to one recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRevision {
    /// Unique identifier (REV-xxx)
    pub id: EntityId,

    /// Company the revision is addressed to
    pub recipient: String,

    /// Revision number, 1-based and counted per recipient
    pub revision: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created: DateTime<Utc>,

    #[serde(default)]
    pub options: Vec<QuoteOption>,
}

impl QuoteRevision {
    /// A revision with a single empty "Main Option"
    pub fn blank(recipient: impl Into<String>, revision: u32) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Rev),
            recipient: recipient.into(),
            revision,
            notes: None,
            created: Utc::now(),
            options: vec![QuoteOption::new(MAIN_OPTION)],
        }
    }

    /// Deep copy of another revision's options under a new number
    pub fn cloned_from(source: &QuoteRevision, recipient: impl Into<String>, revision: u32) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Rev),
            recipient: recipient.into(),
            revision,
            notes: source.notes.clone(),
            created: Utc::now(),
            options: source.options.iter().map(QuoteOption::deep_clone).collect(),
        }
    }

    pub fn option(&self, id: &EntityId) -> Option<&QuoteOption> {
        self.options.iter().find(|o| &o.id == id)
    }

    /// Highest option grand total, zero when there are no options
    pub fn best_grand_total(&self) -> Decimal {
        self.options
            .iter()
            .map(|o| o.totals(Decimal::ZERO).grand_total)
            .max()
            .unwrap_or(Decimal::ZERO)
    }

    /// Label like "Acme Mechanical R2"
    pub fn label(&self) -> String {
        format!("{} R{}", self.recipient, self.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> PumpDimensions {
        PumpDimensions {
            weight_kg: dec!(200),
            length_mm: dec!(1000),
            width_mm: dec!(500),
        }
    }

    #[test]
    fn test_line_item_total() {
        let mut item = LineItem::product("CR-10", "CR 10 pump", 2, dec!(100));
        item.discount = dec!(10);
        assert_eq!(item.line_total(), dec!(180));
    }

    #[test]
    fn test_apply_quantity_validation() {
        let mut item = LineItem::product("CR-10", "CR 10 pump", 2, dec!(100));
        assert_eq!(item.apply_field(ItemField::Quantity, "5").unwrap(), "5");
        assert_eq!(item.quantity, 5);

        for bad in ["-1", "2.5", "lots"] {
            let err = item.apply_field(ItemField::Quantity, bad).unwrap_err();
            assert!(matches!(err, QuoteError::PersistenceRejected(_)));
        }
        assert_eq!(item.quantity, 5);
    }

    #[test]
    fn test_apply_discount_bounds() {
        let mut item = LineItem::product("CR-10", "CR 10 pump", 1, dec!(100));
        item.apply_field(ItemField::Discount, "100").unwrap();
        assert_eq!(item.discount, dec!(100));
        assert!(item.apply_field(ItemField::Discount, "100.5").is_err());
        assert!(item.apply_field(ItemField::Discount, "-2").is_err());
        assert!(item.apply_field(ItemField::UnitPrice, "-0.01").is_err());
        item.apply_field(ItemField::UnitPrice, "0").unwrap();
        assert_eq!(item.unit_price, Decimal::ZERO);
    }

    #[test]
    fn test_apply_rejects_amounts_beyond_cap() {
        let mut item = LineItem::product("CR-10", "CR 10 pump", 1000, dec!(100));
        let err = item
            .apply_field(ItemField::UnitPrice, "79228162514264337593543950335")
            .unwrap_err();
        assert!(matches!(err, QuoteError::PersistenceRejected(_)));
        assert_eq!(item.unit_price, dec!(100));

        item.apply_field(ItemField::UnitPrice, "1000000000000").unwrap();
        assert_eq!(item.line_total(), dec!(1000000000000000));
    }

    #[test]
    fn test_custom_name_detaches_product() {
        let mut item = LineItem::pump("CR-10", "CR 10 pump", dec!(100), dims());
        item.accessories = vec![AccessoryKind::InertiaBase];

        item.apply_field(ItemField::CustomName, "Special pump").unwrap();
        assert_eq!(item.name, "Special pump");
        assert_eq!(item.sku, CUSTOM_SKU);
        assert_eq!(item.source, LineSource::Custom);
        assert!(item.pump.is_none());
        assert!(item.accessories.is_empty());
    }

    #[test]
    fn test_empty_notes_clear() {
        let mut item = LineItem::custom("Labour", 1, dec!(80));
        item.apply_field(ItemField::Notes, "after hours").unwrap();
        assert_eq!(item.notes.as_deref(), Some("after hours"));
        item.apply_field(ItemField::Notes, "  ").unwrap();
        assert!(item.notes.is_none());
    }

    #[test]
    fn test_remove_pump_drops_its_accessories() {
        let mut option = QuoteOption::new("Main Option");
        let pump = option.push_item(LineItem::pump("CR-10", "CR 10", dec!(100), dims()));
        option.push_item(LineItem::synthetic(&pump, AccessoryKind::InertiaBase, "IB-1", "Base", dec!(500)));
        let other = option.push_item(LineItem::custom("Labour", 1, dec!(80)));

        option.remove_item(&pump).unwrap();
        assert_eq!(option.item_ids(), vec![other]);
        assert_eq!(option.items[0].display_order, 0);
    }

    #[test]
    fn test_deep_clone_remaps_ids() {
        let mut option = QuoteOption::new("Main Option");
        let pump = option.push_item(LineItem::pump("CR-10", "CR 10", dec!(100), dims()));
        option.push_item(LineItem::synthetic(&pump, AccessoryKind::InertiaBase, "IB-1", "Base", dec!(500)));

        let copy = option.deep_clone();
        assert_ne!(copy.id, option.id);
        assert_ne!(copy.items[0].id, pump);
        assert_eq!(copy.items[1].accessory_of.as_ref(), Some(&copy.items[0].id));
        assert_eq!(copy.totals(dec!(0)), option.totals(dec!(0)));
    }

    #[test]
    fn test_option_freight_validation() {
        let mut option = QuoteOption::new("Main Option");
        option.apply_field(OptionField::FreightCharge, "45.50").unwrap();
        assert_eq!(option.freight_charge, dec!(45.50));
        assert!(option.apply_field(OptionField::FreightCharge, "-1").is_err());
        assert!(option.apply_field(OptionField::Name, "").is_err());
    }

    #[test]
    fn test_accessory_kind_normalize() {
        let kinds = AccessoryKind::normalize(&[
            AccessoryKind::SeismicSprings,
            AccessoryKind::InertiaBase,
            AccessoryKind::SeismicSprings,
        ]);
        assert_eq!(kinds, vec![AccessoryKind::InertiaBase, AccessoryKind::SeismicSprings]);
        assert_eq!("seismic-springs".parse::<AccessoryKind>().unwrap(), AccessoryKind::SeismicSprings);
    }

    #[test]
    fn test_blank_revision_has_main_option() {
        let rev = QuoteRevision::blank("Acme Mechanical", 1);
        assert_eq!(rev.options.len(), 1);
        assert_eq!(rev.options[0].name, MAIN_OPTION);
        assert_eq!(rev.label(), "Acme Mechanical R1");
        assert_eq!(rev.best_grand_total(), Decimal::ZERO);
    }
}
