// src/config.rs

use clap::Parser;
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::session::SessionConfig;
use crate::write::WriteMode;

pub const DEFAULT_SOURCE_URL: &str = "https://restcountries.com/v3.1/all";

/// Static run configuration. Flags win over `COUNTRYFLAT_*` environment
/// variables, which win over the defaults.
#[derive(Parser, Debug, Clone)]
#[command(name = "countryflat")]
#[command(about = "Fetch the country catalogue, flatten it and write Parquet")]
#[command(version)]
pub struct Config {
    /// Source document URL
    #[arg(long, env = "COUNTRYFLAT_SOURCE_URL", default_value = DEFAULT_SOURCE_URL)]
    pub source_url: Url,

    /// Where the raw JSON snapshot is written (and read in offline mode)
    #[arg(long, env = "COUNTRYFLAT_RAW_PATH", default_value = "raw_countries.json")]
    pub raw_path: PathBuf,

    /// Where the processed Parquet table is written
    #[arg(
        long,
        env = "COUNTRYFLAT_OUTPUT_PATH",
        default_value = "processed_countries.parquet"
    )]
    pub output_path: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "COUNTRYFLAT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Compute session name (also the worker thread prefix)
    #[arg(long, env = "COUNTRYFLAT_SESSION_NAME", default_value = "countryflat")]
    pub session_name: String,

    /// Worker threads for the transform; 0 uses every core
    #[arg(long, env = "COUNTRYFLAT_CONCURRENCY", default_value_t = 0)]
    pub concurrency: usize,

    /// Memory budget hint for the session, e.g. 512m or 2g
    #[arg(long, env = "COUNTRYFLAT_MEMORY_HINT", default_value = "2g")]
    pub memory_hint: String,

    /// HTTP timeout for the fetch, in seconds
    #[arg(long, env = "COUNTRYFLAT_FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Behaviour when the output file already exists
    #[arg(long, env = "COUNTRYFLAT_WRITE_MODE", value_enum, default_value_t = WriteMode::Overwrite)]
    pub write_mode: WriteMode,

    /// Rows of the final table to log as a preview
    #[arg(long, env = "COUNTRYFLAT_PREVIEW_ROWS", default_value_t = 10)]
    pub preview_rows: usize,

    /// Skip the HTTP fetch and read the existing raw snapshot instead
    #[arg(long, env = "COUNTRYFLAT_OFFLINE")]
    pub offline: bool,
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            name: self.session_name.clone(),
            concurrency: self.concurrency,
            memory_hint: self.memory_hint.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::try_parse_from(["countryflat"]).unwrap();
        assert_eq!(cfg.source_url.as_str(), DEFAULT_SOURCE_URL);
        assert_eq!(cfg.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.write_mode, WriteMode::Overwrite);
        assert_eq!(cfg.session().memory_hint, "2g");
        assert!(!cfg.offline);
    }

    #[test]
    fn test_flags() {
        let cfg = Config::try_parse_from([
            "countryflat",
            "--source-url",
            "http://localhost:8080/all",
            "--output-path",
            "/tmp/out.parquet",
            "--concurrency",
            "4",
            "--write-mode",
            "error-if-exists",
            "--offline",
        ])
        .unwrap();
        assert_eq!(cfg.source_url.port(), Some(8080));
        assert_eq!(cfg.output_path, PathBuf::from("/tmp/out.parquet"));
        assert_eq!(cfg.session().concurrency, 4);
        assert_eq!(cfg.write_mode, WriteMode::ErrorIfExists);
        assert!(cfg.offline);
    }

    #[test]
    fn test_rejects_bad_url() {
        assert!(Config::try_parse_from(["countryflat", "--source-url", "not a url"]).is_err());
    }
}
