use crate::domain::model::Currency;
use crate::domain::ports::RateProvider;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Convert an amount to CZK using the rate valid on the purchase date.
///
/// When no rate is available the amount is returned unconverted so that a
/// purchase is never recorded as zero.
pub async fn convert_to_czk(
    rates: &dyn RateProvider,
    date: NaiveDate,
    amount: f64,
    currency: Currency,
) -> f64 {
    if currency == Currency::Czk {
        return amount;
    }

    match rates.rate_to_czk(date, currency).await {
        Some(rate) if rate > 0.0 => amount * rate,
        _ => {
            tracing::warn!(
                "⚠️ No {} rate for {}, keeping amount unconverted",
                currency,
                date
            );
            amount
        }
    }
}

/// Rates from configuration, independent of the date.
#[derive(Debug, Clone, Default)]
pub struct FixedRates {
    rates: HashMap<Currency, f64>,
}

impl FixedRates {
    pub fn new(rates: HashMap<Currency, f64>) -> Self {
        Self { rates }
    }

    pub fn get(&self, currency: Currency) -> Option<f64> {
        if currency == Currency::Czk {
            return Some(1.0);
        }
        self.rates.get(&currency).copied()
    }
}

#[async_trait]
impl RateProvider for FixedRates {
    async fn rate_to_czk(&self, _date: NaiveDate, currency: Currency) -> Option<f64> {
        self.get(currency)
    }
}
