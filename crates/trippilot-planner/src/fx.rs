//! Currency conversion seen from the planner: a pure, infallible function.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use trippilot_core::money::quantize_money;
use trippilot_core::PricingBaselines;

/// Converts amounts between ISO-4217 currencies.
///
/// Implementations never fail: an unknown pair converts 1:1.
pub trait CurrencyConverter {
    fn convert(&self, amount: Decimal, from: &str, to: &str) -> Decimal;
}

/// Static rate table keyed by "units of currency per one USD".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    usd_rates: BTreeMap<String, Decimal>,
}

impl RateTable {
    /// Build a table from `(currency, units per USD)` pairs.
    ///
    /// Codes are upper-cased; non-positive rates are dropped.
    #[must_use]
    pub fn new<I, S>(rates: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: AsRef<str>,
    {
        let usd_rates = rates
            .into_iter()
            .filter(|(_, rate)| *rate > Decimal::ZERO)
            .map(|(code, rate)| (code.as_ref().trim().to_ascii_uppercase(), rate))
            .collect();
        Self { usd_rates }
    }

    #[must_use]
    pub fn from_baselines(baselines: &PricingBaselines) -> Self {
        Self::new(baselines.fx_rates.iter().map(|(code, rate)| (code, *rate)))
    }

    fn usd_rate(&self, currency: &str) -> Option<Decimal> {
        if currency == "USD" {
            return Some(Decimal::ONE);
        }
        self.usd_rates.get(currency).copied()
    }

    /// Multiplier from `from` to `to`, if both sides are known.
    #[must_use]
    pub fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        let from = from.trim().to_ascii_uppercase();
        let to = to.trim().to_ascii_uppercase();
        if from == to {
            return Some(Decimal::ONE);
        }
        let from_rate = self.usd_rate(&from)?;
        let to_rate = self.usd_rate(&to)?;
        to_rate.checked_div(from_rate)
    }
}

impl CurrencyConverter for RateTable {
    fn convert(&self, amount: Decimal, from: &str, to: &str) -> Decimal {
        if from.trim().is_empty() || to.trim().is_empty() {
            return quantize_money(amount);
        }
        match self.rate(from, to) {
            Some(rate) => quantize_money(amount.checked_mul(rate).unwrap_or(amount)),
            None => {
                tracing::debug!(from, to, "no fx rate; converting 1:1");
                quantize_money(amount)
            }
        }
    }
}
