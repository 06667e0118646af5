use anyhow::Result;
use chrono::NaiveDate;
use httpmock::prelude::*;
use issuecoin::app::ManualPurchase;
use issuecoin::config::RateSource;
use issuecoin::core::export::archive_tables;
use issuecoin::domain::model::{Country, Currency, OcrResult};
use issuecoin::{AppConfig, LocalStorage, Tracker};
use serde_json::json;
use std::io::Read;
use tempfile::TempDir;

fn config_for(server: &MockServer, data_dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.data_dir = data_dir.path().to_string_lossy().into_owned();
    config.n8n.webhook_url = server.url("/webhook/events");
    config.n8n.ocr_url = server.url("/webhook/ocr");
    config.rates.source = RateSource::Fixed;
    config.rates.fixed.insert("EUR".to_string(), 25.0);
    config.rates.fixed.insert("PLN".to_string(), 5.5);
    config
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 25).unwrap()
}

#[tokio::test]
async fn test_receipt_and_manual_purchase_end_to_end() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();

    let receipt_event = server.mock(|when, then| {
        when.method(POST)
            .path("/webhook/events")
            .json_body_partial(r#"{"type": "receipt", "store": "ALBERT", "currency": "PLN"}"#);
        then.status(200);
    });
    let purchase_event = server.mock(|when, then| {
        when.method(POST)
            .path("/webhook/events")
            .json_body_partial(r#"{"type": "manual_purchase", "currency": "EUR", "amount_czk": 100.0}"#);
        then.status(200);
    });

    let config = config_for(&server, &temp_dir);
    let tracker = Tracker::new(LocalStorage::new(&config.storage.data_dir), &config);
    tracker.init().await?;

    let outcome = tracker
        .process_receipt_text(
            "albert.txt",
            "text/plain",
            "ALBERT Krakow\n12/10/2025\nSUMA 20,00 zł",
            "",
            today(),
        )
        .await?;
    assert_eq!(outcome.detected_country, Country::Pl);
    assert_eq!(outcome.purchase_date, NaiveDate::from_ymd_opt(2025, 10, 12).unwrap());
    assert!((outcome.amount_czk - 110.0).abs() < 1e-9);

    let picks = tracker
        .resolve_picks(&[("Chlieb".to_string(), 2.0), ("Mrkva".to_string(), 0.0)])
        .await?;
    let purchase = tracker
        .record_manual_purchase(ManualPurchase {
            store: "Lidl".to_string(),
            country: Country::Sk,
            date: today(),
            category: "Pečivo".to_string(),
            items: picks,
            total_src: 4.0,
        })
        .await?;
    assert_eq!(purchase.row.currency, Currency::Eur);
    assert!(purchase.message.contains("100.00 CZK"));

    receipt_event.assert();
    purchase_event.assert();

    // Tables land on disk with their headers.
    let inbox = std::fs::read_to_string(temp_dir.path().join("inbox_priv.csv"))?;
    assert!(inbox.starts_with("ts,filename,mime,store,country,currency,date,total,raw_preview,note"));
    assert!(inbox.contains("albert.txt"));

    let ledger = tracker.book().ledger().await?;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].store, "Lidl");
    assert!(ledger[0].items_json.contains("Chlieb"));
    assert!(!ledger[0].items_json.contains("Mrkva"));
    Ok(())
}

#[tokio::test]
async fn test_notify_failure_does_not_lose_the_record() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/webhook/events");
        then.status(500);
    });

    let config = config_for(&server, &temp_dir);
    let tracker = Tracker::new(LocalStorage::new(&config.storage.data_dir), &config);
    tracker.init().await?;

    tracker
        .process_receipt_text("x.txt", "text/plain", "PENNY CELKEM 99", "", today())
        .await?;
    assert_eq!(tracker.book().inbox().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_ocr_commit_updates_log_stock_and_report() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();

    let ocr = server.mock(|when, then| {
        when.method(POST)
            .path("/webhook/ocr")
            .body_contains("name=\"store_hint\"");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({
                "date": "2025-10-20",
                "items": [
                    {"item": "Mlieko 1,5%", "qty": "2", "unit": "ks", "price_total": "39,80", "category": "Mlieko"},
                    {"item": "Mleté mäso", "qty": 0.5, "unit": "kg", "price_total": 89.9, "category": "Mäso"}
                ]
            }));
    });

    let config = config_for(&server, &temp_dir);
    let tracker = Tracker::new(LocalStorage::new(&config.storage.data_dir), &config);
    tracker.init().await?;

    let outcome = tracker
        .ocr_receipt(
            issuecoin::adapters::n8n::Upload::new("scan.jpg", b"fake-jpeg".to_vec()),
            "Tesco",
        )
        .await?;
    ocr.assert();
    assert_eq!(outcome.result.items.len(), 2);
    assert_eq!(outcome.result.items[0].price_total, 39.8);

    let written = tracker.commit_ocr(&outcome.result, "Tesco", today()).await?;
    assert_eq!(written, 2);

    let log = tracker.book().purchases().await?;
    assert!(log.iter().all(|r| r.store == "Tesco" && r.date == "2025-10-20"));

    let stock = tracker.book().stock().await?;
    assert_eq!(stock.len(), 2);

    tracker.adjust_stock("mlieko 1,5%", "", -1.0, "").await?;
    let stock = tracker.book().stock().await?;
    let milk = stock.iter().find(|r| r.item == "Mlieko 1,5%").unwrap();
    assert_eq!(milk.qty, 1.0);

    let report = tracker.month_report(None, 7000.0).await?.unwrap();
    assert_eq!(report.month, "2025-10");
    assert!((report.total_czk - 129.7).abs() < 1e-9);
    assert_eq!(report.by_category[0].category, "Mäso");
    assert!(!report.over_budget());
    Ok(())
}

#[tokio::test]
async fn test_empty_ocr_result_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();
    let config = config_for(&server, &temp_dir);
    let tracker = Tracker::new(LocalStorage::new(&config.storage.data_dir), &config);

    let err = tracker
        .commit_ocr(&OcrResult::default(), "", today())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no items"));
    assert!(tracker.book().purchases().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_archive_contains_tables_and_manifest() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();
    let config = config_for(&server, &temp_dir);
    let tracker = Tracker::new(LocalStorage::new(&config.storage.data_dir), &config);
    tracker.init().await?;
    tracker.catalog().await?;

    let bytes = archive_tables(tracker.book().storage()).await?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;

    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).map(|f| f.name().to_string()))
        .collect::<std::result::Result<_, _>>()?;
    assert!(names.contains(&"inventory.csv".to_string()));
    assert!(names.contains(&"stock.csv".to_string()));
    assert!(names.contains(&"manifest.json".to_string()));

    let mut manifest = String::new();
    archive.by_name("manifest.json")?.read_to_string(&mut manifest)?;
    let manifest: serde_json::Value = serde_json::from_str(&manifest)?;
    assert_eq!(manifest["files"].as_array().map(Vec::len), Some(5));
    Ok(())
}
