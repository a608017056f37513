//! LanceDB connection wrapper.

use std::path::PathBuf;
use std::sync::Arc;

use arrow_schema::Schema;

/// A LanceDB database rooted at a directory.
pub struct LanceVectorStore {
    db: lancedb::Connection,
}

impl LanceVectorStore {
    /// Open or create a database at `base_path`, creating the directory.
    ///
    /// Used by ingestion, which writes the index.
    pub async fn new(base_path: PathBuf) -> Result<Self, lancedb::Error> {
        std::fs::create_dir_all(&base_path).map_err(|e| lancedb::Error::CreateDir {
            path: base_path.display().to_string(),
            source: e,
        })?;
        Self::connect(base_path).await
    }

    /// Open an existing database without creating anything on disk.
    ///
    /// Used by the chatbot, which only reads the index.
    pub async fn open_existing(base_path: PathBuf) -> Result<Self, lancedb::Error> {
        if !base_path.is_dir() {
            return Err(lancedb::Error::InvalidInput {
                message: format!(
                    "no vector index at {}; run `docchat ingest <dir>` first",
                    base_path.display()
                ),
            });
        }
        Self::connect(base_path).await
    }

    async fn connect(base_path: PathBuf) -> Result<Self, lancedb::Error> {
        let uri = base_path
            .to_str()
            .ok_or_else(|| lancedb::Error::InvalidInput {
                message: format!("Path contains invalid UTF-8: {}", base_path.display()),
            })?;

        let db = lancedb::connect(uri).execute().await?;
        Ok(Self { db })
    }

    /// Open the table, creating it empty with `schema` if absent.
    pub async fn ensure_table(
        &self,
        table_name: &str,
        schema: Arc<Schema>,
    ) -> Result<lancedb::Table, lancedb::Error> {
        match self.db.open_table(table_name).execute().await {
            Ok(table) => Ok(table),
            Err(lancedb::Error::TableNotFound { .. }) => {
                self.db
                    .create_empty_table(table_name, schema)
                    .execute()
                    .await
            }
            Err(e) => Err(e),
        }
    }

    /// Open an existing table.
    pub async fn open_table(&self, table_name: &str) -> Result<lancedb::Table, lancedb::Error> {
        self.db.open_table(table_name).execute().await
    }

    /// Drop a table. Missing tables are not an error.
    pub async fn drop_table(&self, table_name: &str) -> Result<(), lancedb::Error> {
        match self.db.drop_table(table_name, &[]).await {
            Ok(()) => Ok(()),
            Err(lancedb::Error::TableNotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::schema::documents_schema;

    #[tokio::test]
    async fn test_new_creates_directory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join("lancedb");
        let store = LanceVectorStore::new(path.clone())
            .await
            .expect("Failed to create vector store");

        assert!(path.is_dir());
        assert!(store.open_table("documents").await.is_err());
    }

    #[tokio::test]
    async fn test_open_existing_rejects_missing_directory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = LanceVectorStore::open_existing(temp_dir.path().join("absent")).await;
        assert!(result.is_err());
        assert!(!temp_dir.path().join("absent").exists());
    }

    #[tokio::test]
    async fn test_ensure_table_creates_and_reopens() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = LanceVectorStore::new(temp_dir.path().to_path_buf())
            .await
            .expect("Failed to create vector store");

        let schema = Arc::new(documents_schema());
        let table = store
            .ensure_table("documents", schema.clone())
            .await
            .expect("Failed to create table");
        assert_eq!(table.count_rows(None).await.unwrap(), 0);

        store
            .ensure_table("documents", schema)
            .await
            .expect("Failed to reopen table");
        assert!(store.open_table("documents").await.is_ok());
    }

    #[tokio::test]
    async fn test_drop_table_idempotent() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = LanceVectorStore::new(temp_dir.path().to_path_buf())
            .await
            .expect("Failed to create vector store");

        store
            .ensure_table("documents", Arc::new(documents_schema()))
            .await
            .expect("Failed to create table");
        store.drop_table("documents").await.expect("first drop");
        assert!(store.open_table("documents").await.is_err());
        store.drop_table("documents").await.expect("second drop");
    }
}
