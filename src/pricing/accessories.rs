//! Accessory selection for pump rows
//!
//! The workflow threads everything it needs as explicit values: the pump
//! row, the selected kinds and a sizing service. Sizing runs base first,
//! because spring sizing depends on the chosen base's weight and spring
//! count. Nothing is persisted until every selected kind has been sized,
//! so a catalog failure leaves the option untouched.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::core::error::QuoteError;
use crate::core::identity::EntityId;
use crate::core::store::QuoteStore;
use crate::entities::catalog::PriceAdders;
use crate::entities::quote::{AccessoryKind, LineItem, QuoteOption};
use crate::pricing::sizing::{
    BaseRequest, MountRequest, SizingResult, SizingService, SpringRequest, MOUNTS_PER_PUMP,
};
use crate::pricing::synthesizer::{self, AccessoryRow};

/// Part number used for IP upgrade rows
pub const IP_UPGRADE_SKU: &str = "IP-UPGRADE";

/// Part number used for drip tray rows
pub const DRIP_TRAY_SKU: &str = "DRIP-TRAY";

/// Outcome of applying accessories to one pump row
#[derive(Debug, Clone, Serialize)]
pub struct AppliedAccessories {
    pub pump_item: EntityId,
    pub kinds: Vec<AccessoryKind>,
    pub rows: Vec<AccessoryRow>,
    /// Option as saved, accessory rows included
    #[serde(skip)]
    pub option: QuoteOption,
}

/// Tags currently selected for a pump row
pub fn accessories(store: &dyn QuoteStore, pump_item: &EntityId) -> Result<Vec<AccessoryKind>, QuoteError> {
    store.accessories(pump_item)
}

/// Store the tag selection without changing any rows
pub fn save_accessories(store: &mut dyn QuoteStore, pump_item: &EntityId, kinds: &[AccessoryKind]) -> Result<(), QuoteError> {
    store.save_accessories(pump_item, &AccessoryKind::normalize(kinds))
}

/// Size and price every selected accessory for a pump row
pub fn plan_accessories(
    pump: &LineItem,
    kinds: &[AccessoryKind],
    sizing: &SizingService<'_>,
) -> Result<Vec<AccessoryRow>, QuoteError> {
    let dims = pump.pump.as_ref().ok_or_else(|| {
        QuoteError::InvalidSizingInput(format!("item {} has no pump weight or dimensions", pump.id))
    })?;
    let kinds = AccessoryKind::normalize(kinds);

    let mut rows = Vec::with_capacity(kinds.len());
    let mut base: Option<SizingResult> = None;
    let mut adders: Option<PriceAdders> = None;

    for kind in kinds {
        let row = match kind {
            AccessoryKind::InertiaBase => {
                let result = sizing.inertia_base(&BaseRequest::from_pump(dims))?;
                let row = AccessoryRow::from_sizing(kind, &result);
                base = Some(result);
                row
            }
            AccessoryKind::SeismicSprings => {
                let chosen_base = base.as_ref().and_then(SizingResult::inertia_base);
                if let Some(generic) = base.as_ref().filter(|b| b.is_fallback()) {
                    tracing::warn!(
                        pump = %pump.id,
                        base = %generic.part_number(),
                        "generic inertia base has no weight; springs sized on pump weight alone"
                    );
                }
                let request = SpringRequest {
                    pump_weight: dims.weight_kg,
                    inertia_base_weight: chosen_base.map(|b| b.weight_kg).unwrap_or(Decimal::ZERO),
                    spring_count: chosen_base.map(|b| b.spring_amount).filter(|n| *n > 0),
                };
                let result = sizing.seismic_springs(&request)?;
                let count = request.resolved_count(sizing.default_spring_count());
                AccessoryRow::set_of(kind, &result, count)?
            }
            AccessoryKind::RubberMounts => {
                let result = sizing.rubber_mounts(&MountRequest {
                    pump_weight: dims.weight_kg,
                })?;
                AccessoryRow::set_of(kind, &result, MOUNTS_PER_PUMP)?
            }
            AccessoryKind::IpUpgrade | AccessoryKind::DripTray => {
                if adders.is_none() {
                    adders = Some(sizing.catalog().price_adders()?);
                }
                let prices = adders.as_ref().cloned().unwrap_or_default();
                if kind == AccessoryKind::IpUpgrade {
                    AccessoryRow::adder(kind, IP_UPGRADE_SKU, "IP rating upgrade", prices.ip_adder)
                } else {
                    AccessoryRow::adder(kind, DRIP_TRAY_SKU, "Drip tray", prices.drip_tray_adder)
                }
            }
        };
        rows.push(row);
    }
    Ok(rows)
}

/// Size, insert and persist the selected accessories for a pump row
///
/// Replaces any accessory rows previously synthesized for the same pump.
/// An empty selection removes them.
pub fn apply_accessories(
    store: &mut dyn QuoteStore,
    sizing: &SizingService<'_>,
    pump_item: &EntityId,
    kinds: &[AccessoryKind],
) -> Result<AppliedAccessories, QuoteError> {
    let option_id = store.option_of_item(pump_item)?;
    let mut option = store.option(&option_id)?;
    let pump = option
        .item(pump_item)
        .cloned()
        .ok_or_else(|| QuoteError::not_found("item", pump_item.to_string()))?;

    let kinds = AccessoryKind::normalize(kinds);
    let rows = plan_accessories(&pump, &kinds, sizing)?;
    synthesizer::synthesize(&mut option, pump_item, &rows)?;
    if let Some(row) = option.item_mut(pump_item) {
        row.accessories = kinds.clone();
    }

    // One write carries both the rows and the tag selection
    store.save_option_items(&option_id, option.items.clone())?;

    tracing::info!(
        pump = %pump_item,
        accessories = kinds.len(),
        fallbacks = rows.iter().filter(|r| r.fallback).count(),
        "accessories applied"
    );

    Ok(AppliedAccessories {
        pump_item: pump_item.clone(),
        kinds,
        rows,
        option,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FallbackParts;
    use crate::core::store::MemoryStore;
    use crate::entities::catalog::{Catalog, CatalogSource, InertiaBase, RubberMount, SeismicSpring};
    use crate::entities::deal::{AustralianState, Deal, DealType, RevisionSource};
    use crate::entities::quote::{LineSource, PumpDimensions};
    use rust_decimal_macros::dec;

    fn catalog() -> Catalog {
        Catalog {
            inertia_bases: vec![InertiaBase {
                part_number: "IB-1200".to_string(),
                name: "Inertia base 1200x700".to_string(),
                length_mm: dec!(1200),
                width_mm: dec!(700),
                height_mm: dec!(150),
                weight_kg: dec!(400),
                max_load_kg: dec!(600),
                spring_amount: 6,
                cost: dec!(1350),
            }],
            seismic_springs: vec![SeismicSpring {
                part_number: "SS-150".to_string(),
                name: "Seismic spring 150kg".to_string(),
                max_load_kg: dec!(150),
                static_deflection_mm: dec!(25),
                stripe1: None,
                stripe2: None,
                cost: dec!(85),
            }],
            rubber_mounts: vec![RubberMount {
                part_number: "RM-60".to_string(),
                name: "Rubber mount 60kg".to_string(),
                max_load_kg: dec!(60),
                cost: dec!(30),
            }],
            price_adders: PriceAdders {
                ip_adder: dec!(220),
                drip_tray_adder: dec!(95),
            },
            pumps: Vec::new(),
            products: Vec::new(),
        }
    }

    fn store() -> (MemoryStore, EntityId, EntityId) {
        let mut deal = Deal::new("Water treatment", DealType::Hydraulic, AustralianState::Wa, "sam");
        let option = deal
            .new_revision("Acme", RevisionSource::Blank)
            .unwrap()
            .options[0]
            .id
            .clone();
        let target = deal.option_mut(&option).unwrap();
        let pump = target.push_item(LineItem::pump(
            "NBG-65",
            "NBG 65-40-200",
            dec!(4200),
            PumpDimensions {
                weight_kg: dec!(200),
                length_mm: dec!(1000),
                width_mm: dec!(500),
            },
        ));
        target.push_item(LineItem::custom("Commissioning", 1, dec!(600)));
        (MemoryStore::new(vec![deal]), option, pump)
    }

    #[test]
    fn test_apply_base_and_springs() {
        let catalog = catalog();
        let sizing = SizingService::new(&catalog, FallbackParts::default());
        let (mut store, option, pump) = store();

        let applied = apply_accessories(
            &mut store,
            &sizing,
            &pump,
            &[AccessoryKind::SeismicSprings, AccessoryKind::InertiaBase],
        )
        .unwrap();

        assert_eq!(applied.kinds, vec![AccessoryKind::InertiaBase, AccessoryKind::SeismicSprings]);
        // (200 + 400) / 6 springs = 100kg per spring
        assert_eq!(applied.rows[1].name, "6 x Seismic spring 150kg");
        assert_eq!(applied.rows[1].unit_price, dec!(510));

        let saved = store.option(&option).unwrap();
        let skus: Vec<&str> = saved.items.iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, vec!["NBG-65", "IB-1200", "SS-150", "CUSTOM"]);
        assert_eq!(saved.items[1].source, LineSource::SyntheticAccessory);
        assert_eq!(store.accessories(&pump).unwrap(), applied.kinds);
        assert_eq!(saved.totals(dec!(0)).subtotal, dec!(4200) + dec!(1350) + dec!(510) + dec!(600));
    }

    #[test]
    fn test_reapply_replaces_rows() {
        let catalog = catalog();
        let sizing = SizingService::new(&catalog, FallbackParts::default());
        let (mut store, option, pump) = store();

        apply_accessories(&mut store, &sizing, &pump, &[AccessoryKind::InertiaBase, AccessoryKind::DripTray]).unwrap();
        apply_accessories(&mut store, &sizing, &pump, &[AccessoryKind::RubberMounts]).unwrap();

        let saved = store.option(&option).unwrap();
        assert_eq!(saved.items.len(), 3);
        assert_eq!(saved.items[1].name, "4 x Rubber mount 60kg");
        assert_eq!(saved.items[1].unit_price, dec!(120));

        apply_accessories(&mut store, &sizing, &pump, &[]).unwrap();
        assert_eq!(store.option(&option).unwrap().items.len(), 2);
        assert!(store.accessories(&pump).unwrap().is_empty());
    }

    #[test]
    fn test_springs_without_base_use_default_count() {
        let catalog = catalog();
        let sizing = SizingService::new(&catalog, FallbackParts::default());
        let (store, _, pump) = store();
        let row = store.deals()[0].item(&pump).unwrap().clone();

        let rows = plan_accessories(&row, &[AccessoryKind::SeismicSprings], &sizing).unwrap();
        // 200kg over 4 springs = 50kg each
        assert_eq!(rows[0].name, "4 x Seismic spring 150kg");
        assert_eq!(rows[0].unit_price, dec!(340));
    }

    #[test]
    fn test_apply_is_a_single_write() {
        let catalog = catalog();
        let sizing = SizingService::new(&catalog, FallbackParts::default());
        let (mut store, option, pump) = store();

        apply_accessories(&mut store, &sizing, &pump, &[AccessoryKind::InertiaBase, AccessoryKind::DripTray]).unwrap();
        assert_eq!(store.write_count(), 1);
        assert_eq!(
            store.accessories(&pump).unwrap(),
            vec![AccessoryKind::InertiaBase, AccessoryKind::DripTray]
        );

        store.fail_next_write(QuoteError::NetworkFailure("timeout".into()));
        let before = store.option(&option).unwrap();
        assert!(apply_accessories(&mut store, &sizing, &pump, &[AccessoryKind::RubberMounts]).is_err());
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.option(&option).unwrap(), before);
        assert_eq!(
            store.accessories(&pump).unwrap(),
            vec![AccessoryKind::InertiaBase, AccessoryKind::DripTray]
        );
    }

    #[test]
    fn test_springs_after_generic_base_use_pump_weight() {
        let catalog = catalog();
        let sizing = SizingService::new(&catalog, FallbackParts::default());
        // 500kg needs 750kg of base capacity, more than IB-1200 carries
        let row = LineItem::pump(
            "NBG-80",
            "NBG 80-50-250",
            dec!(6100),
            PumpDimensions {
                weight_kg: dec!(500),
                length_mm: dec!(1000),
                width_mm: dec!(500),
            },
        );

        let rows = plan_accessories(&row, &[AccessoryKind::InertiaBase, AccessoryKind::SeismicSprings], &sizing).unwrap();
        assert!(rows[0].fallback);
        assert_eq!(rows[0].sku, "GENERIC-IB");
        // 500kg over 4 springs = 125kg each
        assert!(!rows[1].fallback);
        assert_eq!(rows[1].name, "4 x Seismic spring 150kg");
        assert_eq!(rows[1].unit_price, dec!(340));
    }

    #[test]
    fn test_price_adders() {
        let catalog = catalog();
        let sizing = SizingService::new(&catalog, FallbackParts::default());
        let (store, _, pump) = store();
        let row = store.deals()[0].item(&pump).unwrap().clone();

        let rows = plan_accessories(&row, &[AccessoryKind::DripTray, AccessoryKind::IpUpgrade], &sizing).unwrap();
        assert_eq!(rows[0].sku, IP_UPGRADE_SKU);
        assert_eq!(rows[0].unit_price, dec!(220));
        assert_eq!(rows[1].sku, DRIP_TRAY_SKU);
        assert_eq!(rows[1].unit_price, dec!(95));
    }

    struct BrokenSprings(Catalog);

    impl CatalogSource for BrokenSprings {
        fn inertia_bases(&self) -> Result<Vec<InertiaBase>, QuoteError> {
            self.0.inertia_bases()
        }
        fn seismic_springs(&self) -> Result<Vec<SeismicSpring>, QuoteError> {
            Err(QuoteError::CatalogUnavailable("springs table unreadable".into()))
        }
        fn rubber_mounts(&self) -> Result<Vec<RubberMount>, QuoteError> {
            self.0.rubber_mounts()
        }
        fn price_adders(&self) -> Result<PriceAdders, QuoteError> {
            self.0.price_adders()
        }
    }

    #[test]
    fn test_catalog_failure_persists_nothing() {
        let catalog = BrokenSprings(catalog());
        let sizing = SizingService::new(&catalog, FallbackParts::default());
        let (mut store, option, pump) = store();
        let before = store.option(&option).unwrap();

        let err = apply_accessories(
            &mut store,
            &sizing,
            &pump,
            &[AccessoryKind::InertiaBase, AccessoryKind::SeismicSprings],
        )
        .unwrap_err();

        assert!(matches!(err, QuoteError::CatalogUnavailable(_)));
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.option(&option).unwrap(), before);
    }

    #[test]
    fn test_non_pump_row_rejected() {
        let catalog = catalog();
        let sizing = SizingService::new(&catalog, FallbackParts::default());
        let row = LineItem::custom("Commissioning", 1, dec!(600));
        let err = plan_accessories(&row, &[AccessoryKind::InertiaBase], &sizing).unwrap_err();
        assert!(matches!(err, QuoteError::InvalidSizingInput(_)));
    }
}
