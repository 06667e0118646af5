use crate::adapters::n8n::{N8nClient, Upload};
use crate::config::{AppConfig, LocationConfig, PlanConfig};
use crate::core::catalog::Catalog;
use crate::core::currency::convert_to_czk;
use crate::core::ledger::LedgerBook;
use crate::core::message::issuecoin_message;
use crate::core::receipt::{detect_date, parse_receipt_text};
use crate::core::report::{monthly_report, parse_month, MonthlyReport};
use crate::domain::model::{
    Country, FlyerHit, InboxRow, LedgerRow, OcrResult, ParsedReceipt, PurchaseItem,
    PurchaseLogRow, StockRow,
};
use crate::domain::ports::{FlyerLookup, RateProvider, Storage};
use crate::utils::error::{Result, TrackerError};
use crate::utils::validation::validate_file_extensions;
use chrono::{Datelike, Local, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Value};

pub const MANUAL_PURCHASE_NOTE: &str = "manuálny nákup (bez účtenky)";
pub const OCR_NOTE: &str = "OCR";
pub const UNKNOWN_STORE: &str = "Neznámy";

const RECEIPT_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "pdf"];
const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "m4a", "wav", "ogg", "oga", "webm"];

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptOutcome {
    pub detected_store: String,
    pub detected_country: Country,
    pub detected_currency: crate::domain::model::Currency,
    pub purchase_date: NaiveDate,
    pub total: f64,
    pub amount_czk: f64,
    #[serde(skip)]
    pub parsed: ParsedReceipt,
}

#[derive(Debug, Clone)]
pub struct ManualPurchase {
    pub store: String,
    pub country: Country,
    pub date: NaiveDate,
    pub category: String,
    pub items: Vec<PurchaseItem>,
    pub total_src: f64,
}

#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    pub row: LedgerRow,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct OcrOutcome {
    pub raw: Value,
    pub result: OcrResult,
}

/// The expense tracker's use cases over local tables and n8n workflows.
pub struct Tracker<S: Storage> {
    book: LedgerBook<S>,
    n8n: N8nClient,
    rates: Box<dyn RateProvider>,
    flyers: Box<dyn FlyerLookup>,
    location: LocationConfig,
    plan: PlanConfig,
}

impl<S: Storage> Tracker<S> {
    pub fn new(storage: S, config: &AppConfig) -> Self {
        Self::with_parts(
            storage,
            N8nClient::new(config.n8n.clone()),
            config.rate_provider(),
            config.flyer_lookup(),
            config.location.clone(),
            config.plan.clone(),
        )
    }

    pub fn with_parts(
        storage: S,
        n8n: N8nClient,
        rates: Box<dyn RateProvider>,
        flyers: Box<dyn FlyerLookup>,
        location: LocationConfig,
        plan: PlanConfig,
    ) -> Self {
        Self {
            book: LedgerBook::new(storage),
            n8n,
            rates,
            flyers,
            location,
            plan,
        }
    }

    pub async fn init(&self) -> Result<()> {
        self.book.init().await
    }

    pub fn book(&self) -> &LedgerBook<S> {
        &self.book
    }

    pub fn n8n(&self) -> &N8nClient {
        &self.n8n
    }

    pub fn location(&self) -> &LocationConfig {
        &self.location
    }

    pub async fn catalog(&self) -> Result<Catalog> {
        Catalog::load(self.book.storage()).await
    }

    /// Parse receipt text, convert its total to CZK, file it in the inbox
    /// and tell n8n about it.
    pub async fn process_receipt_text(
        &self,
        filename: &str,
        mime: &str,
        text: &str,
        note: &str,
        today: NaiveDate,
    ) -> Result<ReceiptOutcome> {
        let parsed = parse_receipt_text(text, today);
        let amount_czk =
            convert_to_czk(self.rates.as_ref(), parsed.date, parsed.total, parsed.currency).await;

        tracing::info!(
            "🧾 Receipt {}: store='{}' {} {} on {} (~{:.2} CZK)",
            filename,
            parsed.store,
            parsed.total,
            parsed.currency,
            parsed.date,
            amount_czk
        );

        self.book
            .record_inbox(InboxRow {
                ts: Utc::now().to_rfc3339(),
                filename: filename.to_string(),
                mime: mime.to_string(),
                store: parsed.store.clone(),
                country: parsed.country,
                currency: parsed.currency,
                date: parsed.date,
                total: parsed.total,
                raw_preview: parsed.raw_preview.clone(),
                note: note.to_string(),
            })
            .await?;

        self.n8n
            .notify(&json!({
                "type": "receipt",
                "store": parsed.store,
                "country": parsed.country,
                "currency": parsed.currency,
                "date": parsed.date,
                "total": parsed.total,
                "note": note,
            }))
            .await;

        Ok(ReceiptOutcome {
            detected_store: parsed.store.clone(),
            detected_country: parsed.country,
            detected_currency: parsed.currency,
            purchase_date: parsed.date,
            total: parsed.total,
            amount_czk,
            parsed,
        })
    }

    /// Transcribe a voice note and run it through the receipt flow.
    pub async fn process_voice_note(
        &self,
        upload: Upload,
        note: &str,
        today: NaiveDate,
    ) -> Result<ReceiptOutcome> {
        check_upload(&upload, &AUDIO_EXTENSIONS)?;
        let filename = upload.filename.clone();
        let mime = crate::adapters::n8n::guess_mime(&filename);
        let text = self.n8n.transcribe(upload).await?;
        tracing::debug!("Transcription: {}", text);
        self.process_receipt_text(&filename, mime, &text, note, today)
            .await
    }

    /// Match `(name, qty)` picks against the catalogue. Picks without a
    /// positive quantity are dropped.
    pub async fn resolve_picks(&self, picks: &[(String, f64)]) -> Result<Vec<PurchaseItem>> {
        let catalog = self.catalog().await?;
        let mut items = Vec::new();
        for (name, qty) in picks {
            if *qty <= 0.0 {
                continue;
            }
            let product = catalog.find(name).ok_or_else(|| {
                TrackerError::validation(format!("'{}' is not in the product catalogue", name))
            })?;
            items.push(PurchaseItem {
                item: product.item.clone(),
                qty: *qty,
                unit: product.unit.clone(),
                category: product.category.clone(),
            });
        }
        Ok(items)
    }

    pub async fn record_manual_purchase(&self, purchase: ManualPurchase) -> Result<PurchaseOutcome> {
        let currency = purchase.country.currency();
        let items: Vec<PurchaseItem> = purchase
            .items
            .into_iter()
            .filter(|item| item.qty > 0.0)
            .collect();
        let amount_czk =
            convert_to_czk(self.rates.as_ref(), purchase.date, purchase.total_src, currency).await;

        let row = LedgerRow {
            ts: Utc::now().to_rfc3339(),
            store: purchase.store,
            country: purchase.country,
            currency,
            date: purchase.date,
            total_src: purchase.total_src,
            amount_czk,
            category: purchase.category,
            items_json: serde_json::to_string(&items)?,
            note: MANUAL_PURCHASE_NOTE.to_string(),
        };
        self.book.record_ledger(row.clone()).await?;

        self.n8n
            .notify(&json!({
                "type": "manual_purchase",
                "store": row.store,
                "country": row.country,
                "currency": row.currency,
                "date": row.date,
                "total_src": row.total_src,
                "amount_czk": row.amount_czk,
                "category": row.category,
                "items": items,
                "note": row.note,
            }))
            .await;

        let message = issuecoin_message(&row.category, amount_czk);
        Ok(PurchaseOutcome { row, message })
    }

    pub async fn ocr_receipt(&self, upload: Upload, store_hint: &str) -> Result<OcrOutcome> {
        check_upload(&upload, &RECEIPT_EXTENSIONS)?;
        let raw = self.n8n.send_receipt_to_ocr(upload, store_hint).await?;
        let result = match &raw {
            Value::Object(_) => serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
                tracing::warn!("OCR reply not in the expected shape: {}", e);
                OcrResult::default()
            }),
            _ => OcrResult::default(),
        };
        Ok(OcrOutcome { raw, result })
    }

    /// Write OCR items to the purchase log and add them to stock.
    pub async fn commit_ocr(
        &self,
        result: &OcrResult,
        store_hint: &str,
        today: NaiveDate,
    ) -> Result<usize> {
        if result.items.is_empty() {
            return Err(TrackerError::validation(
                "OCR returned no items; try another photo with better contrast",
            ));
        }

        let store = first_non_empty(&[result.store.as_deref().unwrap_or(""), store_hint])
            .unwrap_or(UNKNOWN_STORE)
            .to_string();
        let date = ocr_purchase_date(result.date.as_deref(), today).to_string();

        let rows: Vec<PurchaseLogRow> = result
            .items
            .iter()
            .map(|it| PurchaseLogRow {
                date: date.clone(),
                store: store.clone(),
                item: it.item.clone(),
                qty: it.qty,
                unit: it.unit.clone(),
                price_total: it.price_total,
                category: it.category.clone(),
                note: OCR_NOTE.to_string(),
            })
            .collect();
        self.book.log_purchases(rows).await?;

        let now = Local::now().naive_local();
        for it in &result.items {
            self.book
                .upsert_stock(&it.item, &it.category, it.qty, &it.unit, now)
                .await?;
        }

        tracing::info!("✅ {} OCR items written to log and stock", result.items.len());
        Ok(result.items.len())
    }

    pub async fn adjust_stock(
        &self,
        item: &str,
        category: &str,
        qty: f64,
        unit: &str,
    ) -> Result<StockRow> {
        let item = item.trim();
        if item.is_empty() {
            return Err(TrackerError::validation("item name is required"));
        }
        self.book
            .upsert_stock(
                item,
                category.trim(),
                qty,
                unit.trim(),
                Local::now().naive_local(),
            )
            .await
    }

    pub fn flyer_for(&self, item: &str, today: NaiveDate) -> Option<FlyerHit> {
        self.flyers
            .lookup(item, &self.location.preferred_stores, today)
    }

    pub async fn find_deals(&self, items: &[PurchaseItem]) -> Result<Value> {
        if items.is_empty() {
            return Err(TrackerError::validation(
                "pick at least one item with a quantity first",
            ));
        }
        self.n8n
            .ask_deals(&self.location.address, &self.location.preferred_stores, items)
            .await
    }

    pub async fn plan_context(
        &self,
        budget_month: u32,
        budget_daily: u32,
        today: NaiveDate,
    ) -> Result<Value> {
        let stocks = self.book.stock().await?;
        Ok(json!({
            "budget_month": budget_month,
            "budget_daily": budget_daily,
            "stocks": stocks,
            "preferred_stores": self.location.preferred_stores,
            "address": self.location.address,
            "season": { "month": today.month() },
            "restrictions": self.plan.restrictions,
        }))
    }

    pub async fn request_plan(
        &self,
        budget_month: u32,
        budget_daily: u32,
        today: NaiveDate,
    ) -> Result<Value> {
        let context = self.plan_context(budget_month, budget_daily, today).await?;
        tracing::info!("🧠 Asking the MCP agent for a plan");
        self.n8n.ask_mcp_plan(&context).await
    }

    pub async fn month_report(
        &self,
        month: Option<&str>,
        budget_czk: f64,
    ) -> Result<Option<MonthlyReport>> {
        let month = month.map(parse_month).transpose()?;
        let rows = self.book.purchases().await?;
        Ok(monthly_report(&rows, month.as_deref(), budget_czk))
    }
}

fn check_upload(upload: &Upload, allowed: &[&str]) -> Result<()> {
    validate_file_extensions("file", std::slice::from_ref(&upload.filename), allowed)
        .map_err(|e| match e {
            TrackerError::InvalidConfigValueError { reason, .. } => {
                TrackerError::validation(format!("{}: {}", upload.filename, reason))
            }
            other => other,
        })
}

/// OCR replies carry ISO or `d.m.Y` dates; the purchase log stores ISO.
fn ocr_purchase_date(raw: Option<&str>, today: NaiveDate) -> NaiveDate {
    let Some(raw) = raw.map(str::trim).filter(|d| !d.is_empty()) else {
        return today;
    };
    NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d")
        .ok()
        .or_else(|| detect_date(raw))
        .unwrap_or_else(|| {
            tracing::warn!("OCR date '{}' not understood, using {}", raw, today);
            today
        })
}

fn first_non_empty<'a>(candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| c.trim())
        .find(|c| !c.is_empty())
}
