// src/write/mod.rs

use clap::ValueEnum;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

use crate::error::WriteError;
use crate::process::{rows_to_record_batch, FlatTable};
use crate::schema::flat_row_schema;

/// What to do when the destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
pub enum WriteMode {
    /// Replace it.
    #[default]
    Overwrite,
    /// Fail with `WriteError::AlreadyExists`.
    ErrorIfExists,
    /// Leave it untouched and write nothing.
    Ignore,
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteStats {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
    /// False when `WriteMode::Ignore` found an existing file.
    pub written: bool,
}

/// Persist `table` as a single Snappy-compressed Parquet file, rows in
/// `FlatTable::sorted` order. Written to a tmp sibling and renamed into place.
#[instrument(level = "info", skip(table), fields(rows = table.len()))]
pub fn write_table(table: &FlatTable, path: &Path, mode: WriteMode) -> Result<WriteStats, WriteError> {
    let io_err = |source: std::io::Error| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    if path.exists() {
        match mode {
            WriteMode::Overwrite => {}
            WriteMode::ErrorIfExists => return Err(WriteError::AlreadyExists(path.to_path_buf())),
            WriteMode::Ignore => {
                info!(path = %path.display(), "destination exists, skipping write");
                return Ok(WriteStats {
                    path: path.to_path_buf(),
                    rows: 0,
                    bytes: 0,
                    written: false,
                });
            }
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let rows = table.sorted();
    let batch = rows_to_record_batch(&rows).map_err(|source| WriteError::Arrow {
        path: path.to_path_buf(),
        source,
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "table.parquet".to_string());
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let parquet_err = |source: parquet::errors::ParquetError| WriteError::Parquet {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(&tmp_path).map_err(io_err)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer =
        ArrowWriter::try_new(file, flat_row_schema(), Some(props)).map_err(parquet_err)?;
    writer.write(&batch).map_err(parquet_err)?;
    writer.close().map_err(parquet_err)?;

    if path.is_dir() {
        // a directory left behind by a previous engine-style write
        fs::remove_dir_all(path).map_err(io_err)?;
    }
    fs::rename(&tmp_path, path).map_err(io_err)?;

    let bytes = fs::metadata(path).map_err(io_err)?.len();
    info!(path = %path.display(), rows = rows.len(), bytes, "wrote parquet table");
    Ok(WriteStats {
        path: path.to_path_buf(),
        rows: rows.len(),
        bytes,
        written: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{dedupe, flatten};
    use arrow::array::{Array, Float64Array, StringArray};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use serde_json::json;
    use tempfile::tempdir;

    fn table() -> FlatTable {
        let records = vec![
            json!({"name": {"common": "Zedland"}, "languages": {"a": "Zed", "b": "Alpha"}, "area": 2.5}),
            json!({"name": {"common": "Aland"}, "population": 7}),
        ];
        dedupe(flatten(&records).rows)
    }

    fn read_back(path: &Path) -> Vec<arrow::record_batch::RecordBatch> {
        let file = File::open(path).unwrap();
        ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_write_and_read_back() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("out").join("countries.parquet");
        let stats = write_table(&table(), &path, WriteMode::Overwrite).unwrap();
        assert!(stats.written);
        assert_eq!(stats.rows, 3);
        assert!(stats.bytes > 0);

        let batches = read_back(&path);
        let total: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(total, 3);
        let batch = &batches[0];
        assert_eq!(batch.num_columns(), 10);
        assert_eq!(batch.schema().field(0).name(), "name_common");

        // sorted by name_common first
        let names = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(names.value(0), "Aland");
        let langs = batch
            .column(9)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(langs.value(1), "Alpha");
        assert_eq!(langs.value(2), "Zed");
        let area = batch
            .column(6)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(area.value(1), 2.5);
        assert_eq!(area.null_count(), 0);
    }

    #[test]
    fn test_overwrite_replaces_existing() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("countries.parquet");
        fs::write(&path, b"stale").unwrap();
        write_table(&table(), &path, WriteMode::Overwrite).unwrap();
        assert_eq!(read_back(&path)[0].num_rows(), 3);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_error_if_exists_and_ignore() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("countries.parquet");
        fs::write(&path, b"keep me").unwrap();

        let err = write_table(&table(), &path, WriteMode::ErrorIfExists).unwrap_err();
        assert!(matches!(err, WriteError::AlreadyExists(_)));

        let stats = write_table(&table(), &path, WriteMode::Ignore).unwrap();
        assert!(!stats.written);
        assert_eq!(fs::read(&path).unwrap(), b"keep me");
    }

    #[test]
    fn test_unwritable_destination_names_path() {
        let tmp = tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let path = blocker.join("countries.parquet");
        let err = write_table(&table(), &path, WriteMode::Overwrite).unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
        assert!(err.to_string().contains("countries.parquet"));
    }
}
