//! Type-safe price representation using decimal arithmetic.
//!
//! The studio and shop bill in Colombian pesos. Amounts travel as whole
//! units (e.g. `450000`), never cents, and are displayed with a dot as the
//! thousands separator (`$450.000`).

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price in Colombian pesos.
    #[must_use]
    pub const fn cop(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::COP)
    }

    /// Format for display (e.g., `$450.000` or `$19.99`).
    #[must_use]
    pub fn display(&self) -> String {
        match self.currency_code {
            CurrencyCode::COP => {
                format!("${}", group_thousands(&self.amount.round().to_string(), '.'))
            }
            CurrencyCode::USD | CurrencyCode::EUR => {
                let rounded = self.amount.round_dp(2);
                format!("{}{rounded:.2}", self.currency_code.symbol())
            }
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes accepted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    COP,
    USD,
    EUR,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::COP | Self::USD => "$",
            Self::EUR => "€",
        }
    }
}

/// Insert `sep` between groups of three digits of an integer string.
fn group_thousands(digits: &str, sep: char) -> String {
    let (sign, digits) = digits
        .strip_prefix('-')
        .map_or(("", digits), |rest| ("-", rest));

    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    format!("{sign}{out}")
}
