//! swcache smoke harness
//!
//! Runs the site worker against a live origin: install (pre-cache),
//! activate (reap), then replays each `--fetch` path twice so the second
//! pass exercises cache hits. Prints the interception stats as JSON.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use swcache_common::{init_logging, LogConfig, LogFormat};
use swcache_core::{CacheConfig, FetchOutcome, LocalPlatform, OfflineWorker, Request, WorkerRuntime};
use swcache_net::{HttpNetwork, LoaderConfig};
use tracing::{error, info, warn};
use url::Url;

struct Args {
    origin: Option<String>,
    fetch: Vec<String>,
    json_logs: bool,
    stats_output: Option<String>,
    /// Problems found while parsing; reported once logging is up.
    warnings: Vec<String>,
}

impl Args {
    fn parse() -> Self {
        Self::from_args(std::env::args().skip(1))
    }

    fn from_args(args: impl IntoIterator<Item = String>) -> Self {
        let mut args = args.into_iter();
        let mut origin = None;
        let mut fetch = Vec::new();
        let mut json_logs = false;
        let mut stats_output = None;
        let mut warnings = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--origin" | "--fetch" | "--stats-output" => {
                    let Some(val) = args.next() else {
                        warnings.push(format!("{arg} expects a value"));
                        continue;
                    };
                    match arg.as_str() {
                        "--origin" => origin = Some(val),
                        "--fetch" => fetch.push(val),
                        _ => stats_output = Some(val),
                    }
                }
                "--json-logs" => {
                    json_logs = true;
                }
                other => {
                    warnings.push(format!("unknown argument '{other}'"));
                }
            }
        }

        Self {
            origin,
            fetch,
            json_logs,
            stats_output,
            warnings,
        }
    }
}

fn describe(outcome: &FetchOutcome) -> serde_json::Value {
    match outcome {
        FetchOutcome::PassThrough => json!({ "outcome": "pass_through" }),
        FetchOutcome::Empty => json!({ "outcome": "empty" }),
        FetchOutcome::Respond(response, source) => json!({
            "outcome": "respond",
            "source": source,
            "status": response.status.as_u16(),
            "bytes": response.body.len(),
        }),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_config = if args.json_logs {
        LogConfig::production()
    } else {
        LogConfig::default().with_format(LogFormat::Compact)
    };
    if let Err(e) = init_logging(log_config) {
        eprintln!("logging: {e}");
    }
    for warning in &args.warnings {
        warn!("Ignoring {warning}");
    }

    let Some(origin) = args.origin.as_deref() else {
        error!("--origin <url> is required");
        return ExitCode::FAILURE;
    };
    let scope = match Url::parse(origin) {
        Ok(url) => url,
        Err(e) => {
            error!(origin, error = %e, "Invalid origin");
            return ExitCode::FAILURE;
        }
    };

    let network = match HttpNetwork::new(LoaderConfig::default()) {
        Ok(network) => network,
        Err(e) => {
            error!(error = %e, "Failed to build network");
            return ExitCode::FAILURE;
        }
    };

    let config = CacheConfig::site(scope.clone());
    info!(version = %config.version, scope = %scope, "Starting worker");
    let worker = Arc::new(OfflineWorker::new(config));
    let (runtime, _events) = WorkerRuntime::new(Arc::clone(&worker), Arc::new(LocalPlatform::new(network)));

    let started = Instant::now();
    if let Err(e) = runtime.install().await {
        error!(error = %e, "Install failed");
        return ExitCode::FAILURE;
    }
    let install_ms = started.elapsed().as_millis() as u64;

    let mut fetches = Vec::new();
    for pass in 1..=2 {
        for p in &args.fetch {
            let request = match scope.join(p) {
                Ok(url) => Request::get(url),
                Err(e) => {
                    warn!(path = %p, error = %e, "Skipping unparseable path");
                    continue;
                }
            };
            let outcome = runtime.handle_fetch(request).await;
            let mut entry = describe(&outcome);
            entry["path"] = json!(p);
            entry["pass"] = json!(pass);
            fetches.push(entry);
        }
    }

    let summary = json!({
        "version": worker.config().version,
        "state": format!("{:?}", runtime.state().await),
        "install_ms": install_ms,
        "reap": worker.last_reap().await,
        "fetches": fetches,
        "stats": worker.stats(),
    });

    let rendered = match serde_json::to_string_pretty(&summary) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to render summary");
            return ExitCode::FAILURE;
        }
    };
    println!("{rendered}");

    if let Some(path) = args.stats_output {
        if let Err(e) = std::fs::write(&path, &rendered) {
            error!(path = %path, error = %e, "Failed to write stats");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Args {
        Args::from_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parses_known_flags() {
        let parsed = args(&[
            "--origin",
            "https://example.org/",
            "--fetch",
            "/about/",
            "--fetch",
            "/codeart/",
            "--json-logs",
        ]);
        assert_eq!(parsed.origin.as_deref(), Some("https://example.org/"));
        assert_eq!(parsed.fetch, vec!["/about/", "/codeart/"]);
        assert!(parsed.json_logs);
        assert!(parsed.stats_output.is_none());
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_reports_unknown_and_dangling_flags() {
        let parsed = args(&["--verbose", "--fetch", "/about/", "--origin"]);
        assert!(parsed.origin.is_none());
        assert_eq!(parsed.fetch, vec!["/about/"]);
        assert_eq!(
            parsed.warnings,
            vec![
                "unknown argument '--verbose'".to_string(),
                "--origin expects a value".to_string(),
            ]
        );
    }
}
