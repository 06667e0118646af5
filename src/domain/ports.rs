use crate::domain::model::{Currency, FlyerHit};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Named-file persistence rooted somewhere the tracker owns.
pub trait Storage: Send + Sync {
    /// `Ok(None)` when the file does not exist yet.
    fn read_file(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// CZK per one unit of `currency` on `date`.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn rate_to_czk(&self, date: NaiveDate, currency: Currency) -> Option<f64>;
}

pub trait FlyerLookup: Send + Sync {
    fn lookup(&self, item: &str, stores: &[String], today: NaiveDate) -> Option<FlyerHit>;
}
