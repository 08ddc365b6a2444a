//! Order totals.

use rust_decimal::Decimal;

use avenue_core::Price;

/// Breakdown shown next to the order button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub delivery: Decimal,
    pub total: Decimal,
}

impl Totals {
    /// `subtotal - discount + delivery`, never below zero.
    #[must_use]
    pub fn compute(subtotal: Decimal, discount: Decimal, delivery: Decimal) -> Self {
        let total = (subtotal - discount + delivery).max(Decimal::ZERO);
        Self {
            subtotal,
            discount,
            delivery,
            total,
        }
    }

    #[must_use]
    pub fn total_price(&self) -> Price {
        Price::cop(self.total)
    }

    /// Display lines as `(label, amount)`, omitting zero discount and delivery.
    #[must_use]
    pub fn lines(&self) -> Vec<(&'static str, String)> {
        let mut lines = vec![("Subtotal", Price::cop(self.subtotal).display())];
        if !self.discount.is_zero() {
            lines.push(("Descuento", format!("-{}", Price::cop(self.discount).display())));
        }
        if !self.delivery.is_zero() {
            lines.push(("Envío", Price::cop(self.delivery).display()));
        }
        lines.push(("Total", self.total_price().display()));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_applies_discount_and_delivery() {
        let totals = Totals::compute(
            Decimal::from(100_000),
            Decimal::from(10_000),
            Decimal::from(8_500),
        );
        assert_eq!(totals.total, Decimal::from(98_500));
        assert_eq!(totals.total_price().display(), "$98.500");
    }

    #[test]
    fn test_total_never_negative() {
        let totals = Totals::compute(Decimal::from(20_000), Decimal::from(50_000), Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_lines_skip_zero_amounts() {
        let totals = Totals::compute(Decimal::from(50_000), Decimal::ZERO, Decimal::ZERO);
        let labels: Vec<_> = totals.lines().into_iter().map(|(label, _)| label).collect();
        assert_eq!(labels, ["Subtotal", "Total"]);
    }
}
