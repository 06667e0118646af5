use crate::core::table::{load_table, save_table, TableRow};
use crate::domain::model::{ProductRow, DEFAULT_CATEGORY, DEFAULT_UNIT};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::collections::BTreeSet;

const DEMO_PRODUCTS: [(&str, &str, &str); 10] = [
    ("Mlieko 1,5%", "Mlieko", "ks"),
    ("Vajcia L", "Vajcia", "ks"),
    ("Mrkva", "Zelenina", "ks"),
    ("Pór", "Zelenina", "ks"),
    ("Tvaroh jemný", "Mliečne", "ks"),
    ("Cestoviny", "Suché", "ks"),
    ("Mleté mäso", "Mäso", "kg"),
    ("Chlieb", "Pečivo", "ks"),
    ("Toaletný papier", "Drogéria", "bal"),
    ("Prací gél", "Drogéria", "ks"),
];

/// The product catalogue the shopping list and manual purchases pick from.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<ProductRow>,
}

impl Catalog {
    /// Load `inventory.csv`, seeding it with the demo catalogue when absent.
    pub async fn load<S: Storage>(storage: &S) -> Result<Self> {
        if storage.read_file(ProductRow::FILE).await?.is_none() {
            tracing::info!("📦 No product catalogue found, writing demo inventory");
            save_table(storage, &demo_products()).await?;
        }
        let rows: Vec<ProductRow> = load_table(storage).await?;
        Ok(Self::from_rows(rows))
    }

    pub fn from_rows(rows: Vec<ProductRow>) -> Self {
        let products = rows.into_iter().filter_map(clean_product).collect();
        Self { products }
    }

    pub fn products(&self) -> &[ProductRow] {
        &self.products
    }

    pub fn categories(&self) -> Vec<String> {
        self.products
            .iter()
            .map(|p| p.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a ProductRow> {
        self.products.iter().filter(move |p| p.category == category)
    }

    pub fn find(&self, item: &str) -> Option<&ProductRow> {
        let needle = item.trim().to_lowercase();
        self.products.iter().find(|p| p.item.to_lowercase() == needle)
    }
}

fn clean_product(row: ProductRow) -> Option<ProductRow> {
    let item = row.item.trim().to_string();
    if item.is_empty() {
        return None;
    }
    let category = match row.category.trim() {
        "" => DEFAULT_CATEGORY.to_string(),
        c => c.to_string(),
    };
    let unit = match row.unit.trim() {
        "" => DEFAULT_UNIT.to_string(),
        u => u.to_string(),
    };
    Some(ProductRow {
        item,
        category,
        unit,
    })
}

fn demo_products() -> Vec<ProductRow> {
    DEMO_PRODUCTS
        .iter()
        .map(|(item, category, unit)| ProductRow {
            item: item.to_string(),
            category: category.to_string(),
            unit: unit.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::tests::MockStorage;

    #[tokio::test]
    async fn test_seeds_demo_catalogue() {
        let storage = MockStorage::new();
        let catalog = Catalog::load(&storage).await.unwrap();

        assert_eq!(catalog.products().len(), 10);
        assert!(storage.get_string("inventory.csv").await.is_some());
        assert_eq!(
            catalog.categories(),
            vec!["Drogéria", "Mlieko", "Mliečne", "Mäso", "Pečivo", "Suché", "Vajcia", "Zelenina"]
        );
        assert_eq!(catalog.in_category("Zelenina").count(), 2);
    }

    #[tokio::test]
    async fn test_cleans_rows() {
        let storage = MockStorage::new();
        storage
            .put(
                "inventory.csv",
                "item,category,unit\n  Banány ,,\n,Ovocie,kg\nJablká,Ovocie,kg\n",
            )
            .await;

        let catalog = Catalog::load(&storage).await.unwrap();
        assert_eq!(catalog.products().len(), 2);
        let banana = catalog.find("banány").unwrap();
        assert_eq!(banana.item, "Banány");
        assert_eq!(banana.category, "Potraviny");
        assert_eq!(banana.unit, "ks");
        assert_eq!(catalog.find("JABLKÁ").unwrap().unit, "kg");
        assert!(catalog.find("Hrušky").is_none());
    }
}
