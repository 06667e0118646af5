use crate::domain::model::{InboxRow, LedgerRow, ProductRow, PurchaseLogRow, StockRow};
use crate::domain::ports::Storage;
use crate::utils::error::{Result, TrackerError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A row type persisted as one CSV file with a fixed column order.
/// Field order of the struct must match `COLUMNS`.
pub trait TableRow: Serialize + DeserializeOwned {
    const FILE: &'static str;
    const COLUMNS: &'static [&'static str];
}

impl TableRow for ProductRow {
    const FILE: &'static str = "inventory.csv";
    const COLUMNS: &'static [&'static str] = &["item", "category", "unit"];
}

impl TableRow for InboxRow {
    const FILE: &'static str = "inbox_priv.csv";
    const COLUMNS: &'static [&'static str] = &[
        "ts",
        "filename",
        "mime",
        "store",
        "country",
        "currency",
        "date",
        "total",
        "raw_preview",
        "note",
    ];
}

impl TableRow for LedgerRow {
    const FILE: &'static str = "ledger_priv.csv";
    const COLUMNS: &'static [&'static str] = &[
        "ts",
        "store",
        "country",
        "currency",
        "date",
        "total_src",
        "amount_czk",
        "category",
        "items_json",
        "note",
    ];
}

impl TableRow for PurchaseLogRow {
    const FILE: &'static str = "purchases_log.csv";
    const COLUMNS: &'static [&'static str] = &[
        "date",
        "store",
        "item",
        "qty",
        "unit",
        "price_total",
        "category",
        "note",
    ];
}

impl TableRow for StockRow {
    const FILE: &'static str = "stock.csv";
    const COLUMNS: &'static [&'static str] = &["item", "category", "qty", "unit", "last_update"];
}

/// Load a table. A missing file is an empty table; rows that do not
/// deserialize are skipped so one bad line never hides the rest.
pub async fn load_table<S: Storage, T: TableRow>(storage: &S) -> Result<Vec<T>> {
    let Some(bytes) = storage.read_file(T::FILE).await? else {
        return Ok(Vec::new());
    };
    Ok(rows_from_csv(&bytes, T::FILE))
}

pub fn rows_from_csv<T: DeserializeOwned>(bytes: &[u8], source: &str) -> Vec<T> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<T>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => tracing::warn!("Skipping row {} of {}: {}", index + 1, source, e),
        }
    }
    rows
}

pub fn to_csv_bytes<T: TableRow>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(T::COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| TrackerError::IoError(e.into_error()))
}

pub async fn save_table<S: Storage, T: TableRow>(storage: &S, rows: &[T]) -> Result<()> {
    let bytes = to_csv_bytes(rows)?;
    tracing::debug!("Writing {} rows to {}", rows.len(), T::FILE);
    storage.write_file(T::FILE, &bytes).await
}

pub async fn append_rows<S: Storage, T: TableRow>(storage: &S, new_rows: Vec<T>) -> Result<()> {
    let mut rows: Vec<T> = load_table(storage).await?;
    rows.extend(new_rows);
    save_table(storage, &rows).await
}

/// Create the file with just the header row when it does not exist.
pub async fn ensure_table<S: Storage, T: TableRow>(storage: &S) -> Result<()> {
    if storage.read_file(T::FILE).await?.is_none() {
        save_table::<S, T>(storage, &[]).await?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    pub(crate) struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) async fn put(&self, path: &str, data: &str) {
            self.files
                .lock()
                .await
                .insert(path.to_string(), data.as_bytes().to_vec());
        }

        pub(crate) async fn get_string(&self, path: &str) -> Option<String> {
            let files = self.files.lock().await;
            files
                .get(path)
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.files.lock().await.get(path).cloned())
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files
                .lock()
                .await
                .insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_table() {
        let storage = MockStorage::new();
        let rows: Vec<StockRow> = load_table(&storage).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_ensure_table_writes_header_once() {
        let storage = MockStorage::new();
        ensure_table::<_, StockRow>(&storage).await.unwrap();
        assert_eq!(
            storage.get_string("stock.csv").await.unwrap(),
            "item,category,qty,unit,last_update\n"
        );

        storage
            .put("stock.csv", "item,category,qty,unit,last_update\nChlieb,Pečivo,1,ks,\n")
            .await;
        ensure_table::<_, StockRow>(&storage).await.unwrap();
        let rows: Vec<StockRow> = load_table(&storage).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_columns_and_bad_numbers_are_tolerated() {
        let storage = MockStorage::new();
        storage
            .put(
                "stock.csv",
                "item,qty\nMrkva,abc\nPór,\"2,5\"\nVajcia L,6\n",
            )
            .await;

        let rows: Vec<StockRow> = load_table(&storage).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].qty, 0.0);
        assert_eq!(rows[1].qty, 2.5);
        assert_eq!(rows[2].qty, 6.0);
        assert_eq!(rows[2].category, "");
    }

    #[tokio::test]
    async fn test_unparseable_rows_are_skipped() {
        let storage = MockStorage::new();
        storage
            .put(
                "ledger_priv.csv",
                "ts,store,country,currency,date,total_src,amount_czk,category,items_json,note\n\
                 2025-10-01T10:00:00,ALBERT,CZ,CZK,2025-10-01,100,100,Potraviny,[],\n\
                 2025-10-02T10:00:00,LIDL,XX,CZK,2025-10-02,50,50,Potraviny,[],\n",
            )
            .await;

        let rows: Vec<LedgerRow> = load_table(&storage).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].store, "ALBERT");
    }

    #[tokio::test]
    async fn test_append_keeps_column_order() {
        let storage = MockStorage::new();
        append_rows(
            &storage,
            vec![PurchaseLogRow {
                date: "2025-10-25".to_string(),
                store: "Albert".to_string(),
                item: "Mlieko".to_string(),
                qty: 2.0,
                unit: "ks".to_string(),
                price_total: 39.8,
                category: "Mlieko".to_string(),
                note: "OCR".to_string(),
            }],
        )
        .await
        .unwrap();

        let content = storage.get_string("purchases_log.csv").await.unwrap();
        assert_eq!(
            content,
            "date,store,item,qty,unit,price_total,category,note\n\
             2025-10-25,Albert,Mlieko,2.0,ks,39.8,Mlieko,OCR\n"
        );
    }
}
