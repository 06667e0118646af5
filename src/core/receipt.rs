//! Heuristics that turn raw receipt text (OCR output, a pasted receipt or a
//! voice transcription) into store, country, currency, date and total.

use crate::domain::model::{Country, Currency, ParsedReceipt};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

pub const PREVIEW_CHARS: usize = 1200;

static RE_TOTAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:TOTAL|CELKEM|SUMA|SPOLU)\D*([0-9]+[.,]?[0-9]*)").expect("valid regex")
});
static RE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})([./-])(\d{1,2})([./-])(\d{2,4})\b").expect("valid regex")
});
static RE_CURR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(CZK|K[čc]|EUR|PLN|zł)\b|€").expect("valid regex")
});
static RE_STORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(ALBERT|LIDL|PENNY|TESCO|ROSSMANN|DM)\b").expect("valid regex")
});

/// Parse receipt text. `today` is used when no usable date is printed.
pub fn parse_receipt_text(text: &str, today: NaiveDate) -> ParsedReceipt {
    let store = detect_store(text);
    let (currency, country) = detect_currency(text);

    ParsedReceipt {
        store,
        country,
        currency,
        date: detect_date(text).unwrap_or(today),
        total: detect_total(text),
        raw_preview: text.chars().take(PREVIEW_CHARS).collect(),
    }
}

pub fn detect_store(text: &str) -> String {
    RE_STORE
        .captures(text)
        .map(|caps| caps[1].to_uppercase())
        .unwrap_or_default()
}

/// Currency symbol decides the country; EUR is assumed to be Slovakia.
/// Without any symbol the receipt is taken as Czech.
pub fn detect_currency(text: &str) -> (Currency, Country) {
    let raw = RE_CURR
        .captures(text)
        .map(|caps| {
            caps.get(1)
                .map(|m| m.as_str().to_uppercase())
                .unwrap_or_else(|| "€".to_string())
        })
        .unwrap_or_default();

    match raw.as_str() {
        "EUR" | "€" => (Currency::Eur, Country::Sk),
        "PLN" | "ZŁ" => (Currency::Pln, Country::Pl),
        _ => (Currency::Czk, Country::Cz),
    }
}

/// First `d.m.y` style date on the receipt. Both separators must match
/// and the year has two or four digits.
pub fn detect_date(text: &str) -> Option<NaiveDate> {
    let caps = RE_DATE.captures(text)?;
    if caps[2] != caps[4] {
        return None;
    }

    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[3].parse().ok()?;
    let raw_year = &caps[5];
    let year: i32 = match raw_year.len() {
        4 => raw_year.parse().ok()?,
        2 => {
            let short: i32 = raw_year.parse().ok()?;
            if short < 69 {
                2000 + short
            } else {
                1900 + short
            }
        }
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn detect_total(text: &str) -> f64 {
    RE_TOTAL
        .captures(text)
        .and_then(|caps| caps[1].replace(',', ".").parse().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 25).unwrap()
    }

    #[test]
    fn test_parse_czech_receipt() {
        let text = "ALBERT Česká republika\nMlieko 1,5%   2x 19,90\nCELKEM 123,50 Kč\nDatum: 12.10.2025 14:03";
        let parsed = parse_receipt_text(text, today());

        assert_eq!(parsed.store, "ALBERT");
        assert_eq!(parsed.currency, Currency::Czk);
        assert_eq!(parsed.country, Country::Cz);
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2025, 10, 12).unwrap());
        assert!((parsed.total - 123.5).abs() < 1e-9);
    }

    #[test]
    fn test_euro_sign_means_slovakia() {
        let text = "Lidl Slovenská republika\nSPOLU: 18.40 €\n03/09/24";
        let parsed = parse_receipt_text(text, today());

        assert_eq!(parsed.store, "LIDL");
        assert_eq!(parsed.currency, Currency::Eur);
        assert_eq!(parsed.country, Country::Sk);
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 9, 3).unwrap());
        assert!((parsed.total - 18.4).abs() < 1e-9);
    }

    #[test]
    fn test_zloty_means_poland() {
        let (currency, country) = detect_currency("Suma PLN 45,99");
        assert_eq!(currency, Currency::Pln);
        assert_eq!(country, Country::Pl);

        let (currency, _) = detect_currency("razem 10 zł");
        assert_eq!(currency, Currency::Pln);
    }

    #[test]
    fn test_defaults_when_nothing_detected() {
        let parsed = parse_receipt_text("", today());
        assert_eq!(parsed.store, "");
        assert_eq!(parsed.currency, Currency::Czk);
        assert_eq!(parsed.country, Country::Cz);
        assert_eq!(parsed.date, today());
        assert_eq!(parsed.total, 0.0);
        assert_eq!(parsed.raw_preview, "");
    }

    #[test]
    fn test_store_needs_whole_word() {
        assert_eq!(detect_store("ADMINISTRATIVA s.r.o."), "");
        assert_eq!(detect_store("dm drogerie markt"), "DM");
        assert_eq!(detect_store("Tesco Stores ČR a.s. / Penny"), "TESCO");
    }

    #[test]
    fn test_two_digit_year_pivot() {
        assert_eq!(
            detect_date("1-2-68"),
            Some(NaiveDate::from_ymd_opt(2068, 2, 1).unwrap())
        );
        assert_eq!(
            detect_date("1-2-69"),
            Some(NaiveDate::from_ymd_opt(1969, 2, 1).unwrap())
        );
    }

    #[test]
    fn test_invalid_dates_fall_back() {
        assert_eq!(detect_date("31.02.2025"), None);
        assert_eq!(detect_date("12.10/2025"), None);
        assert_eq!(detect_date("12.10.202"), None);
        assert_eq!(detect_date("2025-10-12"), None);

        let parsed = parse_receipt_text("TOTAL 10\n31.02.2025", today());
        assert_eq!(parsed.date, today());
    }

    #[test]
    fn test_total_parsing() {
        assert_eq!(detect_total("Total: 99"), 99.0);
        assert_eq!(detect_total("celkem k úhradě 1234,5"), 1234.5);
        assert_eq!(detect_total("no sum here"), 0.0);
    }

    #[test]
    fn test_preview_is_truncated_on_chars() {
        let text = "č".repeat(PREVIEW_CHARS + 50);
        let parsed = parse_receipt_text(&text, today());
        assert_eq!(parsed.raw_preview.chars().count(), PREVIEW_CHARS);
    }
}
