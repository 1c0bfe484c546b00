//! Supply ledger host binary
//!
//! Reads one JSON request per line on stdin and writes one JSON response per
//! line on stdout:
//!
//! ```text
//! {"caller":"payment","function":"mint","args":["buyer","1000"]}
//! {"ok":true,"requestId":"...","payload":null,"event":{...}}
//! ```
//!
//! An optional first argument names a TOML config file; environment
//! variables are applied either way. Prometheus metrics are served over
//! HTTP on `metrics_listen_addr`.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use supply_ledger_core::{KvStore, MemoryStore, Metrics, RocksStore};
use supply_settlement::{
    spawn_host, telemetry, Backend, Config, Executor, HostHandle, Receipt, TelemetryState,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Deserialize)]
struct Request {
    caller: String,
    function: String,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Response {
    Ok {
        ok: bool,
        #[serde(flatten)]
        receipt: Receipt,
    },
    Err {
        ok: bool,
        code: &'static str,
        message: String,
    },
}

impl Response {
    fn error(code: &'static str, message: impl Into<String>) -> Self {
        Response::Err {
            ok: false,
            code,
            message: message.into(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; stdout carries responses, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let mut config = Config::from_file(&path)
                .with_context(|| format!("loading config from {}", path))?;
            config.apply_env()?;
            config.validate()?;
            config
        }
        None => Config::from_env()?,
    };

    tracing::info!(
        service = %config.service_name,
        version = %config.ledger.service_version,
        backend = ?config.backend,
        "Starting supply ledger host"
    );

    let store: Arc<dyn KvStore> = match config.backend {
        Backend::Memory => Arc::new(MemoryStore::new()),
        Backend::RocksDb => Arc::new(
            RocksStore::open(&config.ledger)
                .with_context(|| format!("opening {}", config.ledger.data_dir.display()))?,
        ),
    };
    let metrics = Metrics::new()?;
    let telemetry_state = TelemetryState::new(
        metrics.clone(),
        config.service_name.clone(),
        config.ledger.service_version.clone(),
    );
    let executor = Executor::new(store, config.ledger.authority.clone(), metrics);
    let host = spawn_host(executor, config.host.mailbox_capacity);

    let metrics_addr = config.ledger.metrics_listen_addr.clone();
    let scrape = tokio::spawn(async move {
        if let Err(err) = telemetry::serve(&metrics_addr, telemetry_state).await {
            tracing::error!(addr = %metrics_addr, error = %err, "Metrics endpoint stopped");
        }
    });

    tokio::select! {
        result = serve_lines(&host) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }

    scrape.abort();

    host.shutdown().await?;
    tracing::info!("Shutting down supply ledger host");
    Ok(())
}

/// Serve stdin until EOF
async fn serve_lines(host: &HostHandle) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                match host.invoke(request.caller, request.function, request.args).await {
                    Ok(receipt) => Response::Ok { ok: true, receipt },
                    Err(err) => Response::error(err.code(), err.to_string()),
                }
            }
            Err(err) => Response::error("InvalidArguments", format!("malformed request: {}", err)),
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    Ok(())
}
