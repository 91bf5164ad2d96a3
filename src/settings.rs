use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::parse_positive_amount;

/// Fallback conversion rate from the base currency to USD.
pub const DEFAULT_RATE_USD: Decimal = dec!(0.00073);
/// Fallback conversion rate from the base currency to EUR.
pub const DEFAULT_RATE_EUR: Decimal = dec!(0.00067);

/// User preferences, persisted as a single JSON object.
///
/// Values are kept as the text the user entered; absent fields are
/// omitted from the stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_cap: Option<String>,
    #[serde(rename = "rateUSD", default, skip_serializing_if = "Option::is_none")]
    pub rate_usd: Option<String>,
    #[serde(rename = "rateEUR", default, skip_serializing_if = "Option::is_none")]
    pub rate_eur: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_categories: Option<Vec<String>>,
}

impl Settings {
    /// Shallow merge: fields present in `update` replace ours, the rest are kept.
    pub fn merge(&mut self, update: Settings) {
        if update.budget_cap.is_some() {
            self.budget_cap = update.budget_cap;
        }
        if update.rate_usd.is_some() {
            self.rate_usd = update.rate_usd;
        }
        if update.rate_eur.is_some() {
            self.rate_eur = update.rate_eur;
        }
        if update.custom_categories.is_some() {
            self.custom_categories = update.custom_categories;
        }
    }

    /// The budget cap, if one is set to a positive number.
    pub fn budget_cap(&self) -> Option<Decimal> {
        self.budget_cap.as_deref().and_then(parse_positive_amount)
    }

    pub fn rate_usd(&self) -> Decimal {
        self.rate_usd
            .as_deref()
            .and_then(parse_positive_amount)
            .unwrap_or(DEFAULT_RATE_USD)
    }

    pub fn rate_eur(&self) -> Decimal {
        self.rate_eur
            .as_deref()
            .and_then(parse_positive_amount)
            .unwrap_or(DEFAULT_RATE_EUR)
    }

    /// The user's custom categories in the order they were added.
    pub fn custom_categories(&self) -> &[String] {
        self.custom_categories.as_deref().unwrap_or_default()
    }
}
