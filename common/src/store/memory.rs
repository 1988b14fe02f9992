use super::{StoredTable, TableStore, validate_table_name};
use crate::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;

/// Store kept entirely in memory. Used by tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: DashMap<String, StoredTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn read_table(&self, name: &str) -> Result<StoredTable> {
        self.tables
            .get(name)
            .map(|table| table.clone())
            .ok_or_else(|| Error::NotFound(format!("table {} in memory store", name)))
    }

    async fn replace_table(&self, name: &str, table: StoredTable) -> Result<()> {
        validate_table_name(name)?;
        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    async fn drop_table(&self, name: &str) -> Result<bool> {
        Ok(self.tables.remove(name).is_some())
    }

    async fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.tables.contains_key(name))
    }

    fn location(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::sample_table;

    #[tokio::test]
    async fn missing_table_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.read_table("nope").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn replace_and_drop() {
        let store = MemoryStore::new();
        store.replace_table("a", sample_table()).await.unwrap();
        store.replace_table("b", sample_table()).await.unwrap();
        assert!(store.table_exists("a").await.unwrap());
        assert!(store.table_exists("b").await.unwrap());

        assert!(store.drop_table("a").await.unwrap());
        assert!(!store.drop_table("a").await.unwrap());
        assert!(!store.table_exists("a").await.unwrap());
        assert_eq!(store.read_table("b").await.unwrap().num_rows(), 2);
    }
}
