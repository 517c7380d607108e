//! Line and option totals
//!
//! Totals are never stored. They are derived from the current line items and
//! freight every time something changes, so recomputing with unchanged inputs
//! always produces the same figures.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;

/// Largest price, weight or dimension accepted from user input
pub const MAX_AMOUNT: Decimal = dec!(1000000000000);

/// `quantity * unit_price * (1 - discount / 100)`
///
/// Saturates at the `Decimal` bounds instead of overflowing. Edited values are
/// capped at [`MAX_AMOUNT`], so only hand-edited files or pasted table
/// contents can get there.
pub fn line_total(quantity: Decimal, unit_price: Decimal, discount: Decimal) -> Decimal {
    quantity
        .saturating_mul(unit_price)
        .saturating_mul(Decimal::ONE.saturating_sub(discount / dec!(100)))
}

/// `quantity * unit_price * (1 - discount / 100)`, or `None` on overflow
pub fn checked_line_total(quantity: Decimal, unit_price: Decimal, discount: Decimal) -> Option<Decimal> {
    quantity
        .checked_mul(unit_price)?
        .checked_mul(Decimal::ONE.checked_sub(discount / dec!(100))?)
}

/// Parse a displayed amount, treating anything non-numeric as zero
///
/// Accepts the decorations a rendered table carries: currency symbols,
/// thousands separators, a trailing percent sign and surrounding whitespace.
pub fn parse_amount(raw: &str) -> Decimal {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%' | ' '))
        .collect();
    cleaned.parse::<Decimal>().unwrap_or(Decimal::ZERO)
}

/// Parse a displayed discount, clamped to 0..=100
pub fn parse_discount(raw: &str) -> Decimal {
    parse_amount(raw).clamp(Decimal::ZERO, dec!(100))
}

/// One row as it appears in a rendered pricing table
#[derive(Debug, Clone, Copy)]
pub struct DisplayedRow<'a> {
    pub quantity: &'a str,
    pub unit_price: &'a str,
    pub discount: &'a str,
}

impl DisplayedRow<'_> {
    pub fn line_total(&self) -> Decimal {
        line_total(
            parse_amount(self.quantity),
            parse_amount(self.unit_price),
            parse_discount(self.discount),
        )
    }
}

/// Derived totals for one option
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionTotals {
    pub line_totals: Vec<Decimal>,
    pub subtotal: Decimal,
    pub freight: Decimal,
    pub grand_total: Decimal,
    pub gst: Decimal,
    pub total_inc_gst: Decimal,
}

impl OptionTotals {
    /// Compute totals from `(quantity, unit_price, discount)` triples
    pub fn compute(
        lines: impl IntoIterator<Item = (Decimal, Decimal, Decimal)>,
        freight: Decimal,
        gst_rate: Decimal,
    ) -> Self {
        let line_totals: Vec<Decimal> = lines
            .into_iter()
            .map(|(q, p, d)| line_total(q, p, d))
            .collect();
        let subtotal = line_totals
            .iter()
            .fold(Decimal::ZERO, |acc, total| acc.saturating_add(*total));
        let grand_total = subtotal.saturating_add(freight);
        let gst = grand_total.saturating_mul(gst_rate);

        Self {
            line_totals,
            subtotal,
            freight,
            grand_total,
            gst,
            total_inc_gst: grand_total.saturating_add(gst),
        }
    }

    /// Recompute from the values currently shown in a table
    pub fn from_displayed(rows: &[DisplayedRow<'_>], freight: &str, gst_rate: Decimal) -> Self {
        Self::compute(
            rows.iter().map(|row| {
                (
                    parse_amount(row.quantity),
                    parse_amount(row.unit_price),
                    parse_discount(row.discount),
                )
            }),
            parse_amount(freight),
            gst_rate,
        )
    }
}

/// Format a money amount to two decimal places, half-cents rounding up
pub fn money(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total_formula() {
        assert_eq!(line_total(dec!(2), dec!(100), dec!(10)), dec!(180));
        assert_eq!(line_total(dec!(5), dec!(100), dec!(10)), dec!(450));
        assert_eq!(line_total(dec!(3), dec!(19.99), dec!(0)), dec!(59.97));
        assert_eq!(line_total(dec!(4), dec!(250), dec!(100)), dec!(0));
    }

    #[test]
    fn test_line_total_monotonic() {
        let base = line_total(dec!(3), dec!(40), dec!(15));
        assert!(line_total(dec!(4), dec!(40), dec!(15)) >= base);
        assert!(line_total(dec!(3), dec!(41), dec!(15)) >= base);
        assert!(line_total(dec!(3), dec!(40), dec!(16)) <= base);
        assert!(line_total(dec!(0), dec!(40), dec!(15)) <= base);
    }

    #[test]
    fn test_totals_include_freight_and_gst() {
        let totals = OptionTotals::compute(
            [
                (dec!(2), dec!(100), dec!(10)),
                (dec!(1), dec!(50), dec!(0)),
            ],
            dec!(20),
            dec!(0.10),
        );
        assert_eq!(totals.line_totals, vec![dec!(180), dec!(50)]);
        assert_eq!(totals.subtotal, dec!(230));
        assert_eq!(totals.grand_total, dec!(250));
        assert_eq!(totals.gst, dec!(25));
        assert_eq!(totals.total_inc_gst, dec!(275));
    }

    #[test]
    fn test_recompute_is_idempotent_and_order_independent() {
        let a = (dec!(2), dec!(10.5), dec!(5));
        let b = (dec!(7), dec!(3), dec!(0));
        let c = (dec!(1), dec!(999), dec!(50));

        let first = OptionTotals::compute([a, b, c], dec!(12), dec!(0.10));
        let again = OptionTotals::compute([a, b, c], dec!(12), dec!(0.10));
        let shuffled = OptionTotals::compute([c, a, b], dec!(12), dec!(0.10));

        assert_eq!(first, again);
        assert_eq!(first.subtotal, shuffled.subtotal);
        assert_eq!(first.grand_total, shuffled.grand_total);
    }

    #[test]
    fn test_non_numeric_fields_are_zero() {
        assert_eq!(parse_amount("abc"), Decimal::ZERO);
        assert_eq!(parse_amount(""), Decimal::ZERO);
        assert_eq!(parse_amount("$1,250.50"), dec!(1250.50));
        assert_eq!(parse_discount("15%"), dec!(15));
        assert_eq!(parse_discount("250"), dec!(100));

        let rows = [
            DisplayedRow { quantity: "2", unit_price: "$100.00", discount: "10" },
            DisplayedRow { quantity: "n/a", unit_price: "40", discount: "" },
        ];
        let totals = OptionTotals::from_displayed(&rows, "", dec!(0));
        assert_eq!(totals.subtotal, dec!(180));
        assert_eq!(totals.grand_total, dec!(180));
        assert_eq!(rows[0].line_total(), dec!(180));
    }

    #[test]
    fn test_money_format() {
        assert_eq!(money(dec!(450)), "450.00");
        assert_eq!(money(dec!(12.345)), "12.35");
        assert_eq!(money(dec!(0.005)), "0.01");
        assert_eq!(money(dec!(12.344)), "12.34");
    }

    #[test]
    fn test_line_total_saturates_on_huge_values() {
        assert_eq!(line_total(dec!(1000), Decimal::MAX, dec!(0)), Decimal::MAX);
        assert_eq!(checked_line_total(dec!(1000), Decimal::MAX, dec!(0)), None);
        assert_eq!(checked_line_total(dec!(2), dec!(100), dec!(10)), Some(dec!(180)));
    }

    #[test]
    fn test_displayed_totals_with_huge_price() {
        let rows = [DisplayedRow {
            quantity: "1000",
            unit_price: "79228162514264337593543950335",
            discount: "0",
        }];
        let totals = OptionTotals::from_displayed(&rows, "250", dec!(0.10));
        assert_eq!(totals.line_totals, vec![Decimal::MAX]);
        assert_eq!(totals.subtotal, Decimal::MAX);
        assert_eq!(totals.total_inc_gst, Decimal::MAX);
    }

    #[test]
    fn test_totals_at_input_cap_stay_exact() {
        let totals = OptionTotals::compute(
            vec![
                (Decimal::from(u32::MAX), MAX_AMOUNT, dec!(0)),
                (Decimal::from(u32::MAX), MAX_AMOUNT, dec!(0)),
            ],
            MAX_AMOUNT,
            dec!(0.10),
        );
        let line = Decimal::from(u32::MAX) * MAX_AMOUNT;
        assert_eq!(totals.subtotal, line * dec!(2));
        assert_eq!(totals.grand_total, line * dec!(2) + MAX_AMOUNT);
    }
}
