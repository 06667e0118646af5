use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::TrackerError;

pub const DEFAULT_STORES: [&str; 6] = ["ALBERT", "LIDL", "PENNY", "TESCO", "DM", "ROSSMANN"];
pub const DEFAULT_CATEGORY: &str = "Potraviny";
pub const DEFAULT_UNIT: &str = "ks";
pub const UNCATEGORIZED: &str = "(nezaradené)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Country {
    #[default]
    Cz,
    Sk,
    Pl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Czk,
    Eur,
    Pln,
}

impl Country {
    pub const ALL: [Country; 3] = [Country::Cz, Country::Sk, Country::Pl];

    pub fn currency(self) -> Currency {
        match self {
            Country::Cz => Currency::Czk,
            Country::Sk => Currency::Eur,
            Country::Pl => Currency::Pln,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Country::Cz => "CZ",
            Country::Sk => "SK",
            Country::Pl => "PL",
        }
    }
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Currency::Czk => "CZK",
            Currency::Eur => "EUR",
            Currency::Pln => "PLN",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Country {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CZ" => Ok(Country::Cz),
            "SK" => Ok(Country::Sk),
            "PL" => Ok(Country::Pl),
            other => Err(TrackerError::validation(format!(
                "unknown country '{}', expected CZ, SK or PL",
                other
            ))),
        }
    }
}

impl FromStr for Currency {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CZK" => Ok(Currency::Czk),
            "EUR" => Ok(Currency::Eur),
            "PLN" => Ok(Currency::Pln),
            other => Err(TrackerError::validation(format!(
                "unknown currency '{}', expected CZK, EUR or PLN",
                other
            ))),
        }
    }
}

/// Result of the receipt text heuristics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedReceipt {
    pub store: String,
    pub country: Country,
    pub currency: Currency,
    pub date: NaiveDate,
    pub total: f64,
    pub raw_preview: String,
}

/// An item picked from the catalogue with a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub item: String,
    pub qty: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlyerHit {
    pub store: String,
    pub price: f64,
    pub unit: String,
    pub promo: bool,
    pub valid_to: NaiveDate,
    pub source: String,
}

/// Item as returned by the n8n OCR workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrItem {
    #[serde(default)]
    pub item: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub qty: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_total: f64,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OcrResult {
    #[serde(default)]
    pub items: Vec<OcrItem>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub store: Option<String>,
}

// ---- table rows ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    #[serde(default)]
    pub item: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxRow {
    pub ts: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub store: String,
    #[serde(default)]
    pub country: Country,
    #[serde(default)]
    pub currency: Currency,
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: f64,
    #[serde(default)]
    pub raw_preview: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub ts: String,
    #[serde(default)]
    pub store: String,
    #[serde(default)]
    pub country: Country,
    #[serde(default)]
    pub currency: Currency,
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_src: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount_czk: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub items_json: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseLogRow {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub store: String,
    #[serde(default)]
    pub item: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub qty: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_total: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRow {
    #[serde(default)]
    pub item: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub qty: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub last_update: String,
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

/// Numbers in hand-edited CSVs and workflow replies are unreliable;
/// empty or garbled cells count as zero.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Missing(Option<()>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s.trim().replace(',', ".").parse().unwrap_or(0.0),
        Raw::Missing(_) => 0.0,
    })
}
