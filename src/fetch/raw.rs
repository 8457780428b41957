use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use std::{
    fs,
    io::{self, Write},
    path::Path,
};
use tracing::info;

use super::parse_records;
use crate::error::FetchError;

/// Persist the raw document as pretty-printed JSON (4-space indent, UTF-8
/// kept as is). Written to a tmp file, then renamed over `path`.
pub fn save_raw(path: &Path, records: &[Value]) -> Result<(), FetchError> {
    let snapshot_err = |source: io::Error| FetchError::RawSnapshot {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(snapshot_err)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "raw.json".to_string());
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    records
        .serialize(&mut ser)
        .map_err(|e| snapshot_err(io::Error::new(io::ErrorKind::Other, e)))?;
    buf.push(b'\n');

    let mut tmp = fs::File::create(&tmp_path).map_err(snapshot_err)?;
    tmp.write_all(&buf).map_err(snapshot_err)?;
    tmp.sync_all().map_err(snapshot_err)?;
    fs::rename(&tmp_path, path).map_err(snapshot_err)?;

    info!(path = %path.display(), records = records.len(), "saved raw snapshot");
    Ok(())
}

/// Read a snapshot written by `save_raw` (or any JSON array document).
pub fn load_raw(path: &Path) -> Result<Vec<Value>, FetchError> {
    let bytes = fs::read(path).map_err(|source| FetchError::RawSnapshot {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_records(&path.display().to_string(), &bytes)?;
    info!(path = %path.display(), records = records.len(), "loaded raw snapshot");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("raw").join("countries.json");
        let records = vec![json!({"name": {"common": "Côte d'Ivoire"}, "population": 1})];

        save_raw(&path, &records).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("Côte d'Ivoire"));
        assert!(text.contains("\n    {"));

        assert_eq!(load_raw(&path).unwrap(), records);
        // no tmp file left behind
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_load_missing_snapshot() {
        let tmp = tempdir().unwrap();
        let err = load_raw(&tmp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, FetchError::RawSnapshot { .. }));
    }
}
