// src/pipeline.rs

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::{path::PathBuf, time::Instant};
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::PipelineError;
use crate::fetch::{fetch_records, load_raw, save_raw};
use crate::process::{transform, FlatTable, TransformOutput};
use crate::schema::{flat_row_schema, required_fields};
use crate::session::Session;
use crate::write::{write_table, WriteStats};

/// What a successful run reports.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u128,
    pub source_records: usize,
    pub rows_before_dedupe: usize,
    pub total_rows: usize,
    /// Records with an invalid population whose rows reached the output.
    pub invalid_population_records: usize,
    pub malformed_records: usize,
    pub shape_warnings: usize,
    pub coercion_defaults: usize,
    pub output_path: PathBuf,
    pub bytes_written: u64,
}

/// fetch → validate → flatten → dedupe → write.
///
/// Stops at the first fatal error and returns it tagged with its stage. The
/// session is shut down on every path once it has started.
#[instrument(level = "info", skip_all, fields(source = %cfg.source_url, offline = cfg.offline))]
pub async fn run(cfg: &Config) -> Result<RunSummary, PipelineError> {
    let started_at = Utc::now();
    let start = Instant::now();
    info!("pipeline starting");

    // ─── 1) fetch (or reuse the raw snapshot) ────────────────────────
    let records = if cfg.offline {
        load_raw(&cfg.raw_path)?
    } else {
        let client = Client::new();
        let records = fetch_records(&client, &cfg.source_url, cfg.fetch_timeout()).await?;
        save_raw(&cfg.raw_path, &records)?;
        records
    };
    let source_records = records.len();

    // ─── 2) session, only once there is something to process ─────────
    let session = Session::start(&cfg.session())?;

    // ─── 3) transform + write on the blocking pool ──────────────────
    let job_cfg = cfg.clone();
    let (session, result) = tokio::task::spawn_blocking(move || {
        let result = process_and_write(&session, records, &job_cfg);
        (session, result)
    })
    .await
    .map_err(|e| PipelineError::Transform(format!("worker task failed: {}", e)))?;
    session.shutdown();
    let (output, written) = result?;

    let stats = &output.stats;
    if output.invalid_population_records > 0 {
        warn!(
            records = output.invalid_population_records,
            "records with invalid source population coerced to 0"
        );
    }

    Ok(RunSummary {
        started_at,
        elapsed_ms: start.elapsed().as_millis(),
        source_records,
        rows_before_dedupe: stats.rows_emitted,
        total_rows: output.table.len(),
        invalid_population_records: output.invalid_population_records,
        malformed_records: stats.malformed_records,
        shape_warnings: output.report.warnings.len(),
        coercion_defaults: stats.coercion_defaults.len(),
        output_path: written.path,
        bytes_written: written.bytes,
    })
}

fn process_and_write(
    session: &Session,
    records: Vec<Value>,
    cfg: &Config,
) -> Result<(TransformOutput, WriteStats), PipelineError> {
    let specs = required_fields();
    let output = session.run(|| transform(&records, &specs))?;
    drop(records);

    log_preview(&output.table, cfg.preview_rows);
    let written = write_table(&output.table, &cfg.output_path, cfg.write_mode)?;
    Ok((output, written))
}

fn log_preview(table: &FlatTable, n: usize) {
    for field in flat_row_schema().fields() {
        info!(column = %field.name(), data_type = %field.data_type(), "output schema");
    }
    for row in table.rows().iter().take(n) {
        info!(?row, "preview");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use clap::Parser;
    use serde_json::json;
    use std::{fs, path::Path};
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn testland() -> Value {
        json!({
            "name": {"common": "Testland", "official": "Republic of Testland"},
            "currencies": {"TST": {"name": "Test Dollar", "symbol": "$"}},
            "languages": {"tst": "Testish"},
            "capital": ["TestCity"],
            "population": 1000,
            "area": 50.5,
            "region": "TestRegion",
            "subregion": "TestSub"
        })
    }

    fn config(dir: &Path, extra: &[&str]) -> Config {
        let raw = dir.join("raw.json");
        let out = dir.join("out.parquet");
        let mut args = vec![
            "countryflat".to_string(),
            "--raw-path".to_string(),
            raw.display().to_string(),
            "--output-path".to_string(),
            out.display().to_string(),
            "--concurrency".to_string(),
            "2".to_string(),
            "--memory-hint".to_string(),
            "64m".to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        Config::try_parse_from(args).unwrap()
    }

    async fn serve_once(status: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await;
            let resp = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = sock.write_all(resp.as_bytes()).await;
            let _ = sock.shutdown().await;
        });
        format!("http://{}/all", addr)
    }

    #[tokio::test]
    async fn test_online_run_saves_snapshot_and_table() {
        let tmp = tempdir().unwrap();
        let mut negative = testland();
        negative["name"]["common"] = json!("Minusland");
        negative["population"] = json!(-10);
        let body = serde_json::to_string(&vec![testland(), negative, json!("junk")]).unwrap();
        let url = serve_once("200 OK", body).await;

        let cfg = config(tmp.path(), &["--source-url", url.as_str()]);
        let summary = run(&cfg).await.unwrap();

        assert_eq!(summary.source_records, 3);
        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.invalid_population_records, 1);
        assert_eq!(summary.malformed_records, 1);
        assert!(summary.bytes_written > 0);
        assert!(cfg.output_path.exists());
        assert_eq!(load_raw(&cfg.raw_path).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_offline_run_reads_snapshot() {
        let tmp = tempdir().unwrap();
        let cfg = config(tmp.path(), &["--offline"]);
        save_raw(&cfg.raw_path, &[testland(), testland()]).unwrap();

        let summary = run(&cfg).await.unwrap();
        assert_eq!(summary.rows_before_dedupe, 2);
        assert_eq!(summary.total_rows, 1);
        assert_eq!(summary.shape_warnings, 0);
        assert_eq!(summary.output_path, cfg.output_path);
    }

    #[tokio::test]
    async fn test_duplicate_invalid_population_reported_once() {
        let tmp = tempdir().unwrap();
        let cfg = config(tmp.path(), &["--offline"]);
        let mut record = testland();
        record["population"] = json!(-10);
        record["languages"] = json!({"a": "A", "b": "B", "c": "C"});
        save_raw(&cfg.raw_path, &[record.clone(), record]).unwrap();

        let summary = run(&cfg).await.unwrap();
        assert_eq!(summary.rows_before_dedupe, 6);
        assert_eq!(summary.total_rows, 3);
        assert_eq!(summary.invalid_population_records, 1);
    }

    #[tokio::test]
    async fn test_http_error_aborts_at_fetch() {
        let tmp = tempdir().unwrap();
        let url = serve_once("500 Internal Server Error", "boom".to_string()).await;
        let cfg = config(tmp.path(), &["--source-url", url.as_str()]);

        let err = run(&cfg).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Fetch);
        assert!(err.to_string().contains("500"), "{err}");
        assert!(!cfg.raw_path.exists());
        assert!(!cfg.output_path.exists());
    }

    #[tokio::test]
    async fn test_missing_field_aborts_at_validate() {
        let tmp = tempdir().unwrap();
        let cfg = config(tmp.path(), &["--offline"]);
        let mut record = testland();
        record.as_object_mut().unwrap().remove("region");
        save_raw(&cfg.raw_path, &[record]).unwrap();

        let err = run(&cfg).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Validate);
        assert!(err.to_string().contains("'region'"));
        assert!(!cfg.output_path.exists());
    }

    #[tokio::test]
    async fn test_bad_session_aborts_before_transform() {
        let tmp = tempdir().unwrap();
        let mut cfg = config(tmp.path(), &["--offline"]);
        cfg.memory_hint = "plenty".to_string();
        save_raw(&cfg.raw_path, &[testland()]).unwrap();

        let err = run(&cfg).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Session);
    }

    #[tokio::test]
    async fn test_existing_output_aborts_at_write() {
        let tmp = tempdir().unwrap();
        let cfg = config(tmp.path(), &["--offline", "--write-mode", "error-if-exists"]);
        save_raw(&cfg.raw_path, &[testland()]).unwrap();
        fs::write(&cfg.output_path, b"old").unwrap();

        let err = run(&cfg).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Write);
        assert_eq!(fs::read(&cfg.output_path).unwrap(), b"old");
    }
}
