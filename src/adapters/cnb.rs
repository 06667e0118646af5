use crate::core::currency::FixedRates;
use crate::domain::model::Currency;
use crate::domain::ports::RateProvider;
use crate::utils::error::{Result, TrackerError};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_CNB_URL: &str = "https://www.cnb.cz/en/financial-markets/foreign-exchange-market/central-bank-exchange-rate-fixing/central-bank-exchange-rate-fixing/daily.txt";

/// Daily fixing of the Czech National Bank, cached per date, with the
/// configured fixed rates as fallback.
pub struct CnbRates {
    client: Client,
    url: String,
    fallback: FixedRates,
    cache: Mutex<HashMap<NaiveDate, HashMap<String, f64>>>,
}

impl CnbRates {
    pub fn new(url: impl Into<String>, fallback: FixedRates) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            fallback,
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn fixing(&self, date: NaiveDate) -> Result<HashMap<String, f64>> {
        if let Some(rates) = self.cache.lock().await.get(&date) {
            return Ok(rates.clone());
        }

        let query_date = date.format("%d.%m.%Y").to_string();
        tracing::debug!("Fetching CNB fixing for {}", query_date);

        let response = self
            .client
            .get(&self.url)
            .query(&[("date", query_date.as_str())])
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;

        let rates = parse_cnb_daily(&body)?;
        self.cache.lock().await.insert(date, rates.clone());
        Ok(rates)
    }
}

#[async_trait]
impl RateProvider for CnbRates {
    async fn rate_to_czk(&self, date: NaiveDate, currency: Currency) -> Option<f64> {
        if currency == Currency::Czk {
            return Some(1.0);
        }

        match self.fixing(date).await {
            Ok(rates) => match rates.get(currency.code()) {
                Some(rate) => Some(*rate),
                None => {
                    tracing::warn!("CNB fixing for {} has no {}", date, currency);
                    self.fallback.get(currency)
                }
            },
            Err(e) => {
                tracing::warn!("CNB rates unavailable ({}), using fixed rates", e);
                self.fallback.get(currency)
            }
        }
    }
}

/// Parse the CNB `daily.txt` format into CZK per single unit:
///
/// ```text
/// 24.10.2025 #207
/// Country|Currency|Amount|Code|Rate
/// EMU|euro|1|EUR|24.330
/// Poland|zloty|1|PLN|5.731
/// Hungary|forint|100|HUF|6.262
/// ```
pub fn parse_cnb_daily(body: &str) -> Result<HashMap<String, f64>> {
    let mut rates = HashMap::new();

    for line in body.lines().skip(2) {
        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        if fields.len() != 5 {
            continue;
        }
        let amount: f64 = match fields[2].replace(',', ".").parse() {
            Ok(a) if a > 0.0 => a,
            _ => continue,
        };
        let Ok(rate) = fields[4].replace(',', ".").parse::<f64>() else {
            continue;
        };
        rates.insert(fields[3].to_ascii_uppercase(), rate / amount);
    }

    if rates.is_empty() {
        return Err(TrackerError::processing("CNB fixing contained no rates"));
    }
    Ok(rates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const FIXING: &str = "24.10.2025 #207\n\
        Country|Currency|Amount|Code|Rate\n\
        EMU|euro|1|EUR|24,330\n\
        Hungary|forint|100|HUF|6.262\n\
        Poland|zloty|1|PLN|5.731\n";

    #[test]
    fn test_parse_fixing() {
        let rates = parse_cnb_daily(FIXING).unwrap();
        assert!((rates["EUR"] - 24.33).abs() < 1e-9);
        assert!((rates["HUF"] - 0.06262).abs() < 1e-9);
        assert!((rates["PLN"] - 5.731).abs() < 1e-9);
        assert!(parse_cnb_daily("garbage").is_err());
    }

    #[tokio::test]
    async fn test_fetches_once_per_date() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/daily.txt")
                .query_param("date", "24.10.2025");
            then.status(200).body(FIXING);
        });

        let rates = CnbRates::new(server.url("/daily.txt"), FixedRates::default());
        let date = NaiveDate::from_ymd_opt(2025, 10, 24).unwrap();

        assert_eq!(rates.rate_to_czk(date, Currency::Pln).await, Some(5.731));
        assert_eq!(rates.rate_to_czk(date, Currency::Eur).await, Some(24.33));
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn test_falls_back_to_fixed_rates() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/daily.txt");
            then.status(503);
        });

        let fallback = FixedRates::new(HashMap::from([(Currency::Eur, 25.0)]));
        let rates = CnbRates::new(server.url("/daily.txt"), fallback);
        let date = NaiveDate::from_ymd_opt(2025, 10, 24).unwrap();

        assert_eq!(rates.rate_to_czk(date, Currency::Eur).await, Some(25.0));
        assert_eq!(rates.rate_to_czk(date, Currency::Pln).await, None);
        assert_eq!(rates.rate_to_czk(date, Currency::Czk).await, Some(1.0));
    }
}
