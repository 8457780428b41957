use anyhow::{anyhow, Context, Result};
use clap::Parser;
use countryflat::{config::Config, pipeline};
use tracing::{error, info, warn};
use tracing_subscriber::{filter::ParseError, fmt, EnvFilter};

const FALLBACK_FILTER: &str = "info,hyper=warn,reqwest=warn";

/// Filter for the configured level, or the fallback when it does not parse.
fn log_filter(level: &str) -> (EnvFilter, Option<ParseError>) {
    match EnvFilter::try_new(format!("{},hyper=warn,reqwest=warn", level)) {
        Ok(env) => (env, None),
        Err(e) => (EnvFilter::new(FALLBACK_FILTER), Some(e)),
    }
}

/// `RUST_LOG` wins, then the configured level. A bad level never stops the
/// run; it is reported once the subscriber is up.
fn init_logging(cfg: &Config) -> Result<()> {
    let (env, rejected) = match EnvFilter::try_from_default_env() {
        Ok(env) => (env, None),
        Err(_) => log_filter(&cfg.log_level),
    };
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .try_init()
        .map_err(|e| anyhow!(e))
        .context("installing the tracing subscriber")?;
    if let Some(e) = rejected {
        warn!(log_level = %cfg.log_level, error = %e, "invalid log level, using info");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cfg = Config::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    if let Err(e) = init_logging(&cfg) {
        eprintln!("logging setup failed, continuing: {:#}", e);
    }
    info!(
        source = %cfg.source_url,
        raw = %cfg.raw_path.display(),
        output = %cfg.output_path.display(),
        "startup"
    );

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) run, then exactly one terminal status line ───────────────
    match pipeline::run(&cfg).await {
        Ok(summary) => {
            info!(
                status = "success",
                rows = summary.total_rows,
                rows_before_dedupe = summary.rows_before_dedupe,
                invalid_population_records = summary.invalid_population_records,
                malformed_records = summary.malformed_records,
                shape_warnings = summary.shape_warnings,
                coercion_defaults = summary.coercion_defaults,
                output = %summary.output_path.display(),
                elapsed_ms = summary.elapsed_ms as u64,
                "pipeline completed"
            );
        }
        Err(err) => {
            error!(
                status = "failure",
                stage = %err.stage(),
                cause = %err,
                "pipeline failed"
            );
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_log_level_falls_back() {
        let (filter, rejected) = log_filter("app=verbose");
        assert!(rejected.is_some());
        assert_eq!(filter.to_string(), EnvFilter::new(FALLBACK_FILTER).to_string());
    }

    #[test]
    fn test_valid_log_level_is_used() {
        let (filter, rejected) = log_filter("debug");
        assert!(rejected.is_none());
        assert!(filter.to_string().contains("debug"));
    }
}
