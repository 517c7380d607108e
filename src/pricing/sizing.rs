//! Accessory sizing
//!
//! Picks the smallest catalog part that meets a load (and for inertia bases,
//! a footprint) requirement derived from the pump's physical properties.
//! When nothing in the catalog qualifies the configured generic part is
//! returned instead, tagged so callers can tell it apart from a true match.
//! A catalog that cannot be read is an error, never a fallback.
//!
//! Selection is a pure function of the request and the catalog snapshot:
//! ties on capacity are broken by footprint, then cost, then part number.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::core::config::{FallbackPart, FallbackParts};
use crate::core::error::QuoteError;
use crate::entities::catalog::{CatalogPart, CatalogSource, InertiaBase};
use crate::entities::quote::PumpDimensions;
use crate::pricing::totals::MAX_AMOUNT;

/// Safety factor applied to pump weight for inertia base capacity
pub const BASE_LOAD_FACTOR: Decimal = dec!(1.5);

/// Clearance added to pump length and width for the base footprint
pub const BASE_CLEARANCE_MM: Decimal = dec!(100);

/// Springs per set when neither request nor base names a count
pub const DEFAULT_SPRING_COUNT: u32 = 4;

/// Rubber mounts under one pump
pub const MOUNTS_PER_PUMP: u32 = 4;

/// Parse one physical input; non-numeric, negative and oversized values are rejected
pub fn parse_measure(field: &str, raw: &str) -> Result<Decimal, QuoteError> {
    let value = raw.trim().parse::<Decimal>().map_err(|_| {
        QuoteError::InvalidSizingInput(format!("{} must be a number, got '{}'", field, raw))
    })?;
    ensure_measure(field, value)?;
    Ok(value)
}

fn ensure_measure(field: &str, value: Decimal) -> Result<(), QuoteError> {
    if value < Decimal::ZERO {
        return Err(QuoteError::InvalidSizingInput(format!(
            "{} cannot be negative ({})",
            field, value
        )));
    }
    if value > MAX_AMOUNT {
        return Err(QuoteError::InvalidSizingInput(format!(
            "{} cannot exceed {} ({})",
            field, MAX_AMOUNT, value
        )));
    }
    Ok(())
}

fn too_large(what: &str) -> QuoteError {
    QuoteError::InvalidSizingInput(format!("{} is too large to size", what))
}

/// Pump properties for inertia base sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseRequest {
    pub pump_weight: Decimal,
    pub pump_length: Decimal,
    pub pump_width: Decimal,
}

/// Thresholds an inertia base has to meet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BaseRequirement {
    pub weight_capacity: Decimal,
    pub length: Decimal,
    pub width: Decimal,
}

impl BaseRequest {
    /// Parse from raw form values
    pub fn parse(weight: &str, length: &str, width: &str) -> Result<Self, QuoteError> {
        Ok(Self {
            pump_weight: parse_measure("pump_weight", weight)?,
            pump_length: parse_measure("pump_length", length)?,
            pump_width: parse_measure("pump_width", width)?,
        })
    }

    pub fn from_pump(dims: &PumpDimensions) -> Self {
        Self {
            pump_weight: dims.weight_kg,
            pump_length: dims.length_mm,
            pump_width: dims.width_mm,
        }
    }

    pub fn validate(&self) -> Result<(), QuoteError> {
        ensure_measure("pump_weight", self.pump_weight)?;
        ensure_measure("pump_length", self.pump_length)?;
        ensure_measure("pump_width", self.pump_width)
    }

    pub fn requirement(&self) -> Result<BaseRequirement, QuoteError> {
        Ok(BaseRequirement {
            weight_capacity: self
                .pump_weight
                .checked_mul(BASE_LOAD_FACTOR)
                .ok_or_else(|| too_large("pump_weight"))?,
            length: self
                .pump_length
                .checked_add(BASE_CLEARANCE_MM)
                .ok_or_else(|| too_large("pump_length"))?,
            width: self
                .pump_width
                .checked_add(BASE_CLEARANCE_MM)
                .ok_or_else(|| too_large("pump_width"))?,
        })
    }
}

impl BaseRequirement {
    pub fn is_met_by(&self, base: &InertiaBase) -> bool {
        base.max_load_kg >= self.weight_capacity
            && base.length_mm >= self.length
            && base.width_mm >= self.width
    }
}

/// Load carried by a spring set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpringRequest {
    pub pump_weight: Decimal,
    /// Zero when no base was chosen
    pub inertia_base_weight: Decimal,
    /// Springs in the set; the service default applies when absent
    pub spring_count: Option<u32>,
}

impl SpringRequest {
    pub fn parse(pump_weight: &str, base_weight: Option<&str>, spring_count: Option<&str>) -> Result<Self, QuoteError> {
        let spring_count = spring_count
            .map(|raw| {
                raw.trim().parse::<u32>().map_err(|_| {
                    QuoteError::InvalidSizingInput(format!(
                        "spring_amount must be a whole number, got '{}'",
                        raw
                    ))
                })
            })
            .transpose()?;
        Ok(Self {
            pump_weight: parse_measure("pump_weight", pump_weight)?,
            inertia_base_weight: base_weight
                .map(|raw| parse_measure("inertia_base_weight", raw))
                .transpose()?
                .unwrap_or(Decimal::ZERO),
            spring_count,
        })
    }

    pub fn validate(&self) -> Result<(), QuoteError> {
        ensure_measure("pump_weight", self.pump_weight)?;
        ensure_measure("inertia_base_weight", self.inertia_base_weight)?;
        if self.spring_count == Some(0) {
            return Err(QuoteError::InvalidSizingInput(
                "spring_amount must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn resolved_count(&self, default_count: u32) -> u32 {
        self.spring_count.unwrap_or(default_count)
    }

    /// Load each spring carries
    pub fn load_per_spring(&self, default_count: u32) -> Decimal {
        self.pump_weight.saturating_add(self.inertia_base_weight)
            / Decimal::from(self.resolved_count(default_count).max(1))
    }
}

/// Load carried by rubber mounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountRequest {
    pub pump_weight: Decimal,
}

impl MountRequest {
    pub fn parse(pump_weight: &str) -> Result<Self, QuoteError> {
        Ok(Self {
            pump_weight: parse_measure("pump_weight", pump_weight)?,
        })
    }

    pub fn load_per_mount(&self) -> Decimal {
        self.pump_weight / Decimal::from(MOUNTS_PER_PUMP)
    }
}

/// Outcome of a sizing lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "match", content = "part", rename_all = "snake_case")]
pub enum SizingResult {
    /// Smallest catalog part meeting the requirement
    Matched(CatalogPart),
    /// Nothing qualified; generic placeholder at its nominal cost
    #[serde(rename = "generic")]
    Fallback(FallbackPart),
}

impl SizingResult {
    pub fn is_fallback(&self) -> bool {
        matches!(self, SizingResult::Fallback(_))
    }

    pub fn part_number(&self) -> &str {
        match self {
            SizingResult::Matched(part) => part.part_number(),
            SizingResult::Fallback(part) => &part.part_number,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SizingResult::Matched(part) => part.name(),
            SizingResult::Fallback(part) => &part.name,
        }
    }

    /// Unit cost (per spring or per mount for sets)
    pub fn cost(&self) -> Decimal {
        match self {
            SizingResult::Matched(part) => part.cost(),
            SizingResult::Fallback(part) => part.cost,
        }
    }

    /// The matched inertia base, if any
    pub fn inertia_base(&self) -> Option<&InertiaBase> {
        match self {
            SizingResult::Matched(CatalogPart::InertiaBase(base)) => Some(base),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        if self.is_fallback() {
            "generic"
        } else {
            "matched"
        }
    }
}

/// Sizing lookups against a catalog snapshot
pub struct SizingService<'a> {
    catalog: &'a dyn CatalogSource,
    fallback: FallbackParts,
    default_spring_count: u32,
}

impl<'a> SizingService<'a> {
    pub fn new(catalog: &'a dyn CatalogSource, fallback: FallbackParts) -> Self {
        Self {
            catalog,
            fallback,
            default_spring_count: DEFAULT_SPRING_COUNT,
        }
    }

    pub fn with_default_spring_count(mut self, count: u32) -> Self {
        if count > 0 {
            self.default_spring_count = count;
        }
        self
    }

    pub fn default_spring_count(&self) -> u32 {
        self.default_spring_count
    }

    pub fn catalog(&self) -> &'a dyn CatalogSource {
        self.catalog
    }

    pub fn inertia_base(&self, request: &BaseRequest) -> Result<SizingResult, QuoteError> {
        request.validate()?;
        let required = request.requirement()?;
        let bases = self.catalog.inertia_bases()?;

        let chosen = bases
            .into_iter()
            .filter(|b| required.is_met_by(b))
            .min_by(|a, b| {
                a.max_load_kg
                    .cmp(&b.max_load_kg)
                    .then_with(|| {
                        let area_a = a.length_mm.saturating_mul(a.width_mm);
                        area_a.cmp(&b.length_mm.saturating_mul(b.width_mm))
                    })
                    .then_with(|| a.cost.cmp(&b.cost))
                    .then_with(|| a.part_number.cmp(&b.part_number))
            });

        Ok(match chosen {
            Some(base) => {
                tracing::debug!(
                    required_load = %required.weight_capacity,
                    required_length = %required.length,
                    required_width = %required.width,
                    part = %base.part_number,
                    "inertia base matched"
                );
                SizingResult::Matched(CatalogPart::InertiaBase(base))
            }
            None => {
                tracing::info!(
                    required_load = %required.weight_capacity,
                    required_length = %required.length,
                    required_width = %required.width,
                    fallback = %self.fallback.inertia_base.part_number,
                    "no inertia base meets requirement"
                );
                SizingResult::Fallback(self.fallback.inertia_base.clone())
            }
        })
    }

    pub fn seismic_springs(&self, request: &SpringRequest) -> Result<SizingResult, QuoteError> {
        request.validate()?;
        let load = request.load_per_spring(self.default_spring_count);
        let springs = self.catalog.seismic_springs()?;

        let chosen = springs
            .into_iter()
            .filter(|s| s.max_load_kg >= load)
            .min_by(|a, b| {
                a.max_load_kg
                    .cmp(&b.max_load_kg)
                    .then_with(|| a.cost.cmp(&b.cost))
                    .then_with(|| a.part_number.cmp(&b.part_number))
            });

        Ok(match chosen {
            Some(spring) => {
                tracing::debug!(load_per_spring = %load, part = %spring.part_number, "seismic spring matched");
                SizingResult::Matched(CatalogPart::SeismicSpring(spring))
            }
            None => {
                tracing::info!(
                    load_per_spring = %load,
                    fallback = %self.fallback.seismic_spring.part_number,
                    "no seismic spring meets requirement"
                );
                SizingResult::Fallback(self.fallback.seismic_spring.clone())
            }
        })
    }

    pub fn rubber_mounts(&self, request: &MountRequest) -> Result<SizingResult, QuoteError> {
        ensure_measure("pump_weight", request.pump_weight)?;
        let load = request.load_per_mount();
        let mounts = self.catalog.rubber_mounts()?;

        let chosen = mounts
            .into_iter()
            .filter(|m| m.max_load_kg >= load)
            .min_by(|a, b| {
                a.max_load_kg
                    .cmp(&b.max_load_kg)
                    .then_with(|| a.cost.cmp(&b.cost))
                    .then_with(|| a.part_number.cmp(&b.part_number))
            });

        Ok(match chosen {
            Some(mount) => {
                tracing::debug!(load_per_mount = %load, part = %mount.part_number, "rubber mount matched");
                SizingResult::Matched(CatalogPart::RubberMount(mount))
            }
            None => {
                tracing::info!(
                    load_per_mount = %load,
                    fallback = %self.fallback.rubber_mount.part_number,
                    "no rubber mount meets requirement"
                );
                SizingResult::Fallback(self.fallback.rubber_mount.clone())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::catalog::{Catalog, PriceAdders, RubberMount, SeismicSpring};

    fn base(part: &str, load: Decimal, length: Decimal, width: Decimal, cost: Decimal) -> InertiaBase {
        InertiaBase {
            part_number: part.to_string(),
            name: format!("Inertia base {}", part),
            length_mm: length,
            width_mm: width,
            height_mm: dec!(150),
            weight_kg: dec!(300),
            max_load_kg: load,
            spring_amount: 4,
            cost,
        }
    }

    fn spring(part: &str, load: Decimal, cost: Decimal) -> SeismicSpring {
        SeismicSpring {
            part_number: part.to_string(),
            name: format!("Spring {}", part),
            max_load_kg: load,
            static_deflection_mm: dec!(25),
            stripe1: Some("red".to_string()),
            stripe2: None,
            cost,
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            inertia_bases: vec![
                base("IB-L", dec!(1200), dec!(1600), dec!(900), dec!(2100)),
                base("IB-S", dec!(400), dec!(1200), dec!(700), dec!(1100)),
                base("IB-M", dec!(800), dec!(1400), dec!(800), dec!(1500)),
            ],
            seismic_springs: vec![
                spring("SS-A", dec!(500), dec!(10)),
                spring("SS-B", dec!(800), dec!(8)),
            ],
            rubber_mounts: vec![RubberMount {
                part_number: "RM-60".to_string(),
                name: "Rubber mount 60kg".to_string(),
                max_load_kg: dec!(60),
                cost: dec!(30),
            }],
            price_adders: PriceAdders::default(),
            pumps: Vec::new(),
            products: Vec::new(),
        }
    }

    struct UnavailableCatalog;

    impl CatalogSource for UnavailableCatalog {
        fn inertia_bases(&self) -> Result<Vec<InertiaBase>, QuoteError> {
            Err(QuoteError::CatalogUnavailable("connection refused".into()))
        }
        fn seismic_springs(&self) -> Result<Vec<SeismicSpring>, QuoteError> {
            Err(QuoteError::CatalogUnavailable("connection refused".into()))
        }
        fn rubber_mounts(&self) -> Result<Vec<RubberMount>, QuoteError> {
            Err(QuoteError::CatalogUnavailable("connection refused".into()))
        }
        fn price_adders(&self) -> Result<PriceAdders, QuoteError> {
            Err(QuoteError::CatalogUnavailable("connection refused".into()))
        }
    }

    #[test]
    fn test_base_requirement_thresholds() {
        let request = BaseRequest::parse("200", "1000", "500").unwrap();
        let required = request.requirement().unwrap();
        assert_eq!(required.weight_capacity, dec!(300));
        assert_eq!(required.length, dec!(1100));
        assert_eq!(required.width, dec!(600));
    }

    #[test]
    fn test_base_selects_smallest_qualifying() {
        let catalog = catalog();
        let service = SizingService::new(&catalog, FallbackParts::default());

        let result = service
            .inertia_base(&BaseRequest::parse("200", "1000", "500").unwrap())
            .unwrap();
        assert_eq!(result.part_number(), "IB-S");
        assert!(!result.is_fallback());

        // 300kg needs 450kg capacity, which rules out IB-S
        let result = service
            .inertia_base(&BaseRequest::parse("300", "1000", "500").unwrap())
            .unwrap();
        assert_eq!(result.part_number(), "IB-M");

        // Footprint also has to fit
        let result = service
            .inertia_base(&BaseRequest::parse("100", "1450", "500").unwrap())
            .unwrap();
        assert_eq!(result.part_number(), "IB-L");
    }

    #[test]
    fn test_base_fallback_when_nothing_qualifies() {
        let catalog = catalog();
        let service = SizingService::new(&catalog, FallbackParts::default());

        let result = service
            .inertia_base(&BaseRequest::parse("10000", "1000", "500").unwrap())
            .unwrap();
        assert!(result.is_fallback());
        assert_eq!(result.part_number(), "GENERIC-IB");
        assert_eq!(result.cost(), dec!(1500.00));
        assert_eq!(result.tag(), "generic");
    }

    #[test]
    fn test_spring_never_below_threshold_regardless_of_cost() {
        let catalog = catalog();
        let service = SizingService::new(&catalog, FallbackParts::default());

        // 2400kg over 4 springs = 600kg each; SS-A (500) is insufficient
        let request = SpringRequest {
            pump_weight: dec!(2000),
            inertia_base_weight: dec!(400),
            spring_count: None,
        };
        assert_eq!(service.seismic_springs(&request).unwrap().part_number(), "SS-B");

        // 1600kg over 4 = 400kg; both qualify, the smaller capacity wins even though it costs more
        let request = SpringRequest {
            pump_weight: dec!(1600),
            inertia_base_weight: Decimal::ZERO,
            spring_count: None,
        };
        assert_eq!(service.seismic_springs(&request).unwrap().part_number(), "SS-A");
    }

    #[test]
    fn test_spring_count_and_fallback() {
        let catalog = catalog();
        let service = SizingService::new(&catalog, FallbackParts::default());

        let request = SpringRequest::parse("2000", Some("400"), Some("6")).unwrap();
        assert_eq!(request.load_per_spring(4), dec!(400));
        assert_eq!(service.seismic_springs(&request).unwrap().part_number(), "SS-A");

        let request = SpringRequest::parse("20000", None, None).unwrap();
        let result = service.seismic_springs(&request).unwrap();
        assert!(result.is_fallback());
        assert_eq!(result.part_number(), "GENERIC-SS");

        let zero = SpringRequest::parse("100", None, Some("0")).unwrap();
        assert!(matches!(
            service.seismic_springs(&zero),
            Err(QuoteError::InvalidSizingInput(_))
        ));
    }

    #[test]
    fn test_rubber_mounts_per_mount_load() {
        let catalog = catalog();
        let service = SizingService::new(&catalog, FallbackParts::default());

        let result = service.rubber_mounts(&MountRequest::parse("200").unwrap()).unwrap();
        assert_eq!(result.part_number(), "RM-60");

        let result = service.rubber_mounts(&MountRequest::parse("400").unwrap()).unwrap();
        assert_eq!(result.part_number(), "GENERIC-RM");
    }

    #[test]
    fn test_invalid_inputs() {
        for (w, l, d) in [("-1", "1000", "500"), ("200", "abc", "500"), ("200", "1000", "")] {
            let err = BaseRequest::parse(w, l, d).unwrap_err();
            assert!(matches!(err, QuoteError::InvalidSizingInput(_)));
            assert!(!err.is_retryable());
        }
        assert!(SpringRequest::parse("200", Some("-5"), None).is_err());
        assert!(SpringRequest::parse("200", None, Some("four")).is_err());
    }

    #[test]
    fn test_oversized_inputs_are_rejected() {
        let err = BaseRequest::parse("79228162514264337593543950335", "1000", "500").unwrap_err();
        assert!(matches!(err, QuoteError::InvalidSizingInput(_)));
        assert!(MountRequest::parse("1000000000001").is_err());
        assert!(SpringRequest::parse("200", Some("79228162514264337593543950335"), None).is_err());

        let catalog = catalog();
        let service = SizingService::new(&catalog, FallbackParts::default());
        let from_file = BaseRequest {
            pump_weight: Decimal::MAX,
            pump_length: dec!(1000),
            pump_width: dec!(500),
        };
        assert!(from_file.requirement().is_err());
        let err = service.inertia_base(&from_file).unwrap_err();
        assert!(matches!(err, QuoteError::InvalidSizingInput(_)));
    }

    #[test]
    fn test_catalog_unavailable_is_not_a_fallback() {
        let service = SizingService::new(&UnavailableCatalog, FallbackParts::default());
        let err = service
            .inertia_base(&BaseRequest::parse("200", "1000", "500").unwrap())
            .unwrap_err();
        assert!(matches!(err, QuoteError::CatalogUnavailable(_)));
    }

    #[test]
    fn test_sizing_is_deterministic() {
        let catalog = catalog();
        let service = SizingService::new(&catalog, FallbackParts::default());
        let request = BaseRequest::parse("250", "1100", "550").unwrap();
        let first = service.inertia_base(&request).unwrap();
        for _ in 0..5 {
            assert_eq!(service.inertia_base(&request).unwrap(), first);
        }
    }
}
