use super::{StoredTable, TableStore, validate_table_name};
use crate::{Error, Result};
use ::parquet::arrow::ArrowWriter;
use ::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use ::parquet::file::properties::WriterProperties;
use ::parquet::format::KeyValue;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::Utc;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One parquet file per table under a root directory.
///
/// Replacements are written to a hidden temporary file and renamed over the
/// previous file, so readers never observe a half-written table.
pub struct ParquetStore {
    root: PathBuf,
    location: String,
}

impl ParquetStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            Error::Storage(format!("Cannot open store at {}: {}", root.display(), e))
        })?;

        let location = root.display().to_string();
        info!(location = %location, "Opened table store");

        Ok(Self { root, location })
    }

    fn table_path(&self, name: &str) -> Result<PathBuf> {
        validate_table_name(name)?;
        Ok(self.root.join(format!("{}.parquet", name)))
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        self.root
            .join(format!(".{}.parquet.{}.tmp", name, std::process::id()))
    }

    fn write_file(path: &Path, name: &str, table: &StoredTable) -> Result<()> {
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_key_value_metadata(Some(vec![
                KeyValue {
                    key: "table_name".to_string(),
                    value: Some(name.to_string()),
                },
                KeyValue {
                    key: "written_at".to_string(),
                    value: Some(Utc::now().to_rfc3339()),
                },
            ]))
            .build();

        let mut writer = ArrowWriter::try_new(file, table.schema.clone(), Some(props))?;
        for batch in &table.batches {
            writer.write(batch)?;
        }
        writer.close()?;
        Ok(())
    }
}

#[async_trait]
impl TableStore for ParquetStore {
    async fn read_table(&self, name: &str) -> Result<StoredTable> {
        let path = self.table_path(name)?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(format!(
                    "table {} in store {}",
                    name, self.location
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let schema = builder.schema().clone();
        let reader = builder.build()?;
        let batches = reader.collect::<std::result::Result<Vec<RecordBatch>, ArrowError>>()?;

        debug!(table = name, batches = batches.len(), "Read table");
        Ok(StoredTable::new(schema, batches))
    }

    async fn replace_table(&self, name: &str, table: StoredTable) -> Result<()> {
        let path = self.table_path(name)?;
        let temp = self.temp_path(name);

        if let Err(e) = Self::write_file(&temp, name, &table) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        fs::rename(&temp, &path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            Error::Storage(format!("Failed to replace table {}: {}", name, e))
        })?;

        info!(table = name, rows = table.num_rows(), "Replaced table");
        Ok(())
    }

    async fn drop_table(&self, name: &str) -> Result<bool> {
        let path = self.table_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(table = name, "Dropped table");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.table_path(name)?.is_file())
    }

    fn location(&self) -> &str {
        &self.location
    }
}

impl Drop for ParquetStore {
    fn drop(&mut self) {
        info!(location = %self.location, "Closed table store");
    }
}
