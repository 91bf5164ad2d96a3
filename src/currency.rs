use std::fmt;

use rust_decimal::Decimal;

use crate::Settings;

/// The currency amounts are recorded in.
pub const BASE_CURRENCY: &str = "RWF";

/// Conversion rates from the base currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rates {
    pub usd: Decimal,
    pub eur: Decimal,
}

impl Rates {
    /// Rates from the settings, using the defaults for any that are unset or unusable.
    pub fn from_settings(settings: &Settings) -> Self {
        Rates {
            usd: settings.rate_usd(),
            eur: settings.rate_eur(),
        }
    }
}

/// An amount shown in the base currency alongside its converted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub amount: Decimal,
    pub usd: Decimal,
    pub eur: Decimal,
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{BASE_CURRENCY}{:.2} = ${:.4} USD | €{:.4} EUR",
            self.amount, self.usd, self.eur
        )
    }
}

/// Convert a positive amount. Nothing is shown for other amounts, or when a
/// converted value does not fit in a `Decimal`.
pub fn convert(amount: Decimal, rates: &Rates) -> Option<Conversion> {
    if amount <= Decimal::ZERO {
        return None;
    }
    Some(Conversion {
        amount,
        usd: amount.checked_mul(rates.usd)?,
        eur: amount.checked_mul(rates.eur)?,
    })
}
