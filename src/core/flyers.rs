use crate::domain::model::{FlyerHit, DEFAULT_UNIT};
use crate::domain::ports::FlyerLookup;
use chrono::NaiveDate;

/// Stand-in for a kupi.cz flyer scraper: every item is on promo at Albert.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoFlyers;

impl FlyerLookup for DemoFlyers {
    fn lookup(&self, _item: &str, _stores: &[String], today: NaiveDate) -> Option<FlyerHit> {
        Some(FlyerHit {
            store: "ALBERT".to_string(),
            price: 24.90,
            unit: DEFAULT_UNIT.to_string(),
            promo: true,
            valid_to: today,
            source: "kupi.cz/demo".to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoFlyers;

impl FlyerLookup for NoFlyers {
    fn lookup(&self, _item: &str, _stores: &[String], _today: NaiveDate) -> Option<FlyerHit> {
        None
    }
}

pub fn format_hit(hit: Option<&FlyerHit>) -> String {
    match hit {
        Some(hit) => format!(
            "{}: {:.2} {}{}",
            hit.store,
            hit.price,
            hit.unit,
            if hit.promo { " 🔥" } else { "" }
        ),
        None => "—".to_string(),
    }
}
