//! Turns sizing results into accessory rows on an option
//!
//! Accessory rows are inserted directly below the pump they belong to.
//! Re-running selection for a pump replaces its previous accessory rows.

use rust_decimal::Decimal;

use crate::core::error::QuoteError;
use crate::core::identity::EntityId;
use crate::entities::quote::{AccessoryKind, LineItem, QuoteOption};
use crate::pricing::sizing::SizingResult;

/// A priced accessory row ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AccessoryRow {
    pub kind: AccessoryKind,
    pub sku: String,
    pub name: String,
    pub unit_price: Decimal,
    /// True when a generic placeholder stood in for a catalog part
    pub fallback: bool,
}

impl AccessoryRow {
    /// Row for a single sized part at its unit cost
    pub fn from_sizing(kind: AccessoryKind, result: &SizingResult) -> Self {
        Self {
            kind,
            sku: result.part_number().to_string(),
            name: result.name().to_string(),
            unit_price: result.cost(),
            fallback: result.is_fallback(),
        }
    }

    /// Row pricing a whole set of `count` parts as one line
    pub fn set_of(kind: AccessoryKind, result: &SizingResult, count: u32) -> Result<Self, QuoteError> {
        let unit_price = result
            .cost()
            .checked_mul(Decimal::from(count))
            .ok_or_else(|| {
                QuoteError::InvalidSizingInput(format!(
                    "price of {} x {} is too large",
                    count,
                    result.part_number()
                ))
            })?;
        Ok(Self {
            kind,
            sku: result.part_number().to_string(),
            name: format!("{} x {}", count, result.name()),
            unit_price,
            fallback: result.is_fallback(),
        })
    }

    /// Row priced from a flat adder rather than a sized part
    pub fn adder(kind: AccessoryKind, sku: &str, name: &str, price: Decimal) -> Self {
        Self {
            kind,
            sku: sku.to_string(),
            name: name.to_string(),
            unit_price: price,
            fallback: false,
        }
    }
}

/// Replace the accessory rows of a pump with `rows`
///
/// New rows get quantity 1, discount 0 and the synthetic accessory source,
/// and sit immediately after the pump row in the given order. Returns the
/// ids of the inserted rows.
pub fn synthesize(
    option: &mut QuoteOption,
    pump_item: &EntityId,
    rows: &[AccessoryRow],
) -> Result<Vec<EntityId>, QuoteError> {
    if option.item(pump_item).is_none() {
        return Err(QuoteError::not_found("item", pump_item.to_string()));
    }

    let replaced = option.items.len();
    option
        .items
        .retain(|item| item.accessory_of.as_ref() != Some(pump_item));
    let replaced = replaced - option.items.len();

    let anchor = option
        .position(pump_item)
        .ok_or_else(|| QuoteError::not_found("item", pump_item.to_string()))?;

    let new_items: Vec<LineItem> = rows
        .iter()
        .map(|row| LineItem::synthetic(pump_item, row.kind, &row.sku, &row.name, row.unit_price))
        .collect();
    let ids = new_items.iter().map(|i| i.id.clone()).collect();

    let tail = option.items.split_off(anchor + 1);
    option.items.extend(new_items);
    option.items.extend(tail);
    option.renumber();

    tracing::debug!(
        pump = %pump_item,
        replaced,
        inserted = rows.len(),
        "synthesized accessory rows"
    );
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FallbackParts;
    use crate::entities::catalog::{CatalogPart, RubberMount};
    use crate::entities::quote::{LineSource, PumpDimensions};
    use rust_decimal_macros::dec;

    fn option_with_pump() -> (QuoteOption, EntityId, EntityId) {
        let mut option = QuoteOption::new("Main Option");
        let pump = option.push_item(LineItem::pump(
            "NBG-65",
            "NBG 65-40-200",
            dec!(4200),
            PumpDimensions {
                weight_kg: dec!(200),
                length_mm: dec!(1000),
                width_mm: dec!(500),
            },
        ));
        let valve = option.push_item(LineItem::custom("Isolation valves", 2, dec!(150)));
        (option, pump, valve)
    }

    fn base_row() -> AccessoryRow {
        let fallback = FallbackParts::default();
        AccessoryRow::from_sizing(
            AccessoryKind::InertiaBase,
            &SizingResult::Fallback(fallback.inertia_base),
        )
    }

    #[test]
    fn test_inserts_after_pump() {
        let (mut option, pump, valve) = option_with_pump();
        let ids = synthesize(&mut option, &pump, &[base_row()]).unwrap();

        assert_eq!(option.item_ids(), vec![pump.clone(), ids[0].clone(), valve]);
        let row = &option.items[1];
        assert_eq!(row.source, LineSource::SyntheticAccessory);
        assert_eq!(row.accessory_of.as_ref(), Some(&pump));
        assert_eq!(row.quantity, 1);
        assert_eq!(row.discount, Decimal::ZERO);
        assert_eq!(row.unit_price, dec!(1500.00));
        let orders: Vec<u32> = option.items.iter().map(|i| i.display_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_rerun_replaces_previous_rows() {
        let (mut option, pump, _) = option_with_pump();
        synthesize(&mut option, &pump, &[base_row()]).unwrap();
        synthesize(&mut option, &pump, &[base_row()]).unwrap();
        assert_eq!(option.items.len(), 3);

        synthesize(&mut option, &pump, &[]).unwrap();
        assert_eq!(option.items.len(), 2);
        assert!(option.items.iter().all(|i| i.accessory_of.is_none()));
    }

    #[test]
    fn test_set_row_prices_whole_set() {
        let mount = SizingResult::Matched(CatalogPart::RubberMount(RubberMount {
            part_number: "RM-60".to_string(),
            name: "Rubber mount".to_string(),
            max_load_kg: dec!(60),
            cost: dec!(30),
        }));
        let row = AccessoryRow::set_of(AccessoryKind::RubberMounts, &mount, 4).unwrap();
        assert_eq!(row.name, "4 x Rubber mount");
        assert_eq!(row.unit_price, dec!(120));
        assert!(!row.fallback);
    }

    #[test]
    fn test_set_row_price_overflow_is_an_error() {
        let mount = SizingResult::Matched(CatalogPart::RubberMount(RubberMount {
            part_number: "RM-X".to_string(),
            name: "Rubber mount".to_string(),
            max_load_kg: dec!(60),
            cost: Decimal::MAX,
        }));
        let err = AccessoryRow::set_of(AccessoryKind::RubberMounts, &mount, 4).unwrap_err();
        assert!(matches!(err, QuoteError::InvalidSizingInput(_)));
    }

    #[test]
    fn test_unknown_pump() {
        let (mut option, _, _) = option_with_pump();
        let stranger = EntityId::new(crate::core::identity::EntityPrefix::Item);
        assert!(synthesize(&mut option, &stranger, &[base_row()]).is_err());
    }
}
