use crate::core::table::{to_csv_bytes, TableRow};
use crate::domain::model::{
    InboxRow, LedgerRow, ProductRow, PurchaseItem, PurchaseLogRow, StockRow,
};
use crate::domain::ports::Storage;
use crate::utils::error::{Result, TrackerError};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

const ARCHIVED_TABLES: [&str; 5] = [
    ProductRow::FILE,
    InboxRow::FILE,
    LedgerRow::FILE,
    PurchaseLogRow::FILE,
    StockRow::FILE,
];

pub fn shopping_list_filename(date: chrono::NaiveDate) -> String {
    format!("nakupny_zoznam_{}.csv", date)
}

pub fn month_export_filename(month: &str) -> String {
    format!("dennik_{}.csv", month)
}

pub fn shopping_list_csv(items: &[PurchaseItem]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["item", "qty", "unit", "category"])?;
    for item in items {
        writer.write_record([
            item.item.as_str(),
            &item.qty.to_string(),
            item.unit.as_str(),
            item.category.as_str(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| TrackerError::IoError(e.into_error()))
}

pub fn purchase_log_csv(rows: &[PurchaseLogRow]) -> Result<Vec<u8>> {
    to_csv_bytes(rows)
}

pub fn ledger_csv(rows: &[LedgerRow]) -> Result<Vec<u8>> {
    to_csv_bytes(rows)
}

/// Pack every existing table plus a small manifest into one ZIP.
pub async fn archive_tables<S: Storage>(storage: &S) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let mut included = Vec::new();

    for name in ARCHIVED_TABLES {
        let Some(data) = storage.read_file(name).await? else {
            tracing::debug!("Skipping {} (not created yet)", name);
            continue;
        };
        zip.start_file::<_, ()>(name, FileOptions::default())?;
        zip.write_all(&data)?;
        included.push(name);
    }

    let manifest = serde_json::json!({
        "created": chrono::Utc::now().to_rfc3339(),
        "files": included,
    });
    zip.start_file::<_, ()>("manifest.json", FileOptions::default())?;
    zip.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::tests::MockStorage;
    use std::io::Read;

    #[test]
    fn test_shopping_list_csv() {
        let items = vec![PurchaseItem {
            item: "Mlieko 1,5%".to_string(),
            qty: 2.0,
            unit: "ks".to_string(),
            category: "Mlieko".to_string(),
        }];
        let csv = String::from_utf8(shopping_list_csv(&items).unwrap()).unwrap();
        assert_eq!(csv, "item,qty,unit,category\n\"Mlieko 1,5%\",2,ks,Mlieko\n");
    }

    #[test]
    fn test_filenames() {
        let date = chrono::NaiveDate::from_ymd_opt(2025, 10, 25).unwrap();
        assert_eq!(shopping_list_filename(date), "nakupny_zoznam_2025-10-25.csv");
        assert_eq!(month_export_filename("2025-10"), "dennik_2025-10.csv");
    }

    #[tokio::test]
    async fn test_archive_contains_existing_tables() {
        let storage = MockStorage::new();
        storage
            .put("stock.csv", "item,category,qty,unit,last_update\n")
            .await;

        let bytes = archive_tables(&storage).await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["stock.csv", "manifest.json"]);

        let mut manifest = String::new();
        archive
            .by_name("manifest.json")
            .unwrap()
            .read_to_string(&mut manifest)
            .unwrap();
        let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();
        assert_eq!(manifest["files"], serde_json::json!(["stock.csv"]));
    }
}
