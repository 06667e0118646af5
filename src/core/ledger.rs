use crate::core::table::{append_rows, ensure_table, load_table, save_table};
use crate::domain::model::{InboxRow, LedgerRow, PurchaseLogRow, StockRow};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::NaiveDateTime;

/// The tracker's local tables: inbox, ledger, purchase log and stock.
#[derive(Debug, Clone)]
pub struct LedgerBook<S: Storage> {
    storage: S,
}

impl<S: Storage> LedgerBook<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Make sure every table exists with its header row.
    pub async fn init(&self) -> Result<()> {
        ensure_table::<S, InboxRow>(&self.storage).await?;
        ensure_table::<S, LedgerRow>(&self.storage).await?;
        ensure_table::<S, PurchaseLogRow>(&self.storage).await?;
        ensure_table::<S, StockRow>(&self.storage).await
    }

    pub async fn record_inbox(&self, row: InboxRow) -> Result<()> {
        append_rows(&self.storage, vec![row]).await
    }

    pub async fn inbox(&self) -> Result<Vec<InboxRow>> {
        load_table(&self.storage).await
    }

    pub async fn record_ledger(&self, row: LedgerRow) -> Result<()> {
        append_rows(&self.storage, vec![row]).await
    }

    pub async fn ledger(&self) -> Result<Vec<LedgerRow>> {
        load_table(&self.storage).await
    }

    pub async fn log_purchases(&self, rows: Vec<PurchaseLogRow>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        append_rows(&self.storage, rows).await
    }

    pub async fn purchases(&self) -> Result<Vec<PurchaseLogRow>> {
        load_table(&self.storage).await
    }

    pub async fn stock(&self) -> Result<Vec<StockRow>> {
        load_table(&self.storage).await
    }

    /// Add `qty` (possibly negative) to an item's stock. Items match
    /// case-insensitively; an existing row keeps its category and unit.
    pub async fn upsert_stock(
        &self,
        item: &str,
        category: &str,
        qty: f64,
        unit: &str,
        now: NaiveDateTime,
    ) -> Result<StockRow> {
        let mut rows = self.stock().await?;
        let stamp = now.format("%Y-%m-%dT%H:%M:%S").to_string();
        let needle = item.to_lowercase();

        let updated = match rows.iter_mut().find(|r| r.item.to_lowercase() == needle) {
            Some(row) => {
                row.qty += qty;
                row.last_update = stamp;
                row.clone()
            }
            None => {
                let row = StockRow {
                    item: item.to_string(),
                    category: category.to_string(),
                    qty,
                    unit: unit.to_string(),
                    last_update: stamp,
                };
                rows.push(row.clone());
                row
            }
        };

        save_table(&self.storage, &rows).await?;
        tracing::debug!("Stock of '{}' is now {} {}", updated.item, updated.qty, updated.unit);
        Ok(updated)
    }
}
