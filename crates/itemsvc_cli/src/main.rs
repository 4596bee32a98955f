//! `itemsvc` server binary.
//!
//! # Responsibility
//! - Read configuration from flags and environment.
//! - Initialize logging, open the database and start the batch pools once.
//! - Serve HTTP until shutdown, then stop the batch pools.

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use itemsvc_core::{
    default_log_level, init_logging, init_stderr_logging, BatchConfig, ItemService,
    SqliteItemStore, DEFAULT_ITEM_DELAY, DEFAULT_WORKERS,
};
use itemsvc_http::{configure_routes, AppService};
use log::{error, info};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_DB_PATH: &str = "items.sqlite3";
const DEFAULT_ITEM_DELAY_MS: u64 = DEFAULT_ITEM_DELAY.as_millis() as u64;

/// Item service with concurrent batch processing
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the HTTP server to
    #[arg(short, long, env = "ITEMSVC_ADDR", default_value = DEFAULT_ADDR)]
    addr: String,

    /// SQLite database file, created and migrated on start
    #[arg(long, env = "ITEMSVC_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db_path: String,

    /// Worker threads used by batch processing
    #[arg(long, env = "ITEMSVC_WORKERS", default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Simulated latency per item during batch processing, in milliseconds
    #[arg(long, env = "ITEMSVC_ITEM_DELAY_MS", default_value_t = DEFAULT_ITEM_DELAY_MS)]
    item_delay_ms: u64,

    /// Log level: trace, debug, info, warn or error (default depends on build mode)
    #[arg(long, env = "ITEMSVC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logs go to stderr when unset
    #[arg(long, env = "ITEMSVC_LOG_DIR")]
    log_dir: Option<String>,
}

impl Args {
    fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            workers: self.workers,
            item_delay: Duration::from_millis(self.item_delay_ms),
        }
    }

    fn start_logging(&self) -> Result<(), String> {
        let level = self.log_level.as_deref().unwrap_or_else(|| default_log_level());
        match self.log_dir.as_deref() {
            Some(dir) => init_logging(level, dir),
            None => init_stderr_logging(level),
        }
    }
}

#[actix_web::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(err) = args.start_logging() {
        eprintln!("itemsvc: failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=server_run module=cli status=error error={err}");
            eprintln!("itemsvc: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), String> {
    let config = args.batch_config();
    let store = SqliteItemStore::open(&args.db_path)
        .map_err(|err| format!("failed to open database `{}`: {err}", args.db_path))?;
    let service = ItemService::new(Arc::new(store), config)
        .map_err(|err| format!("failed to start batch workers: {err}"))?;
    let service = web::Data::new(service);

    info!(
        "event=server_run module=cli status=start addr={} db_path={} workers={} item_delay_ms={}",
        args.addr, args.db_path, config.workers, args.item_delay_ms
    );
    let started_at = Instant::now();
    let served = serve(&args.addr, service.clone()).await;

    service.shutdown();
    info!(
        "event=server_run module=cli status=stopped duration_ms={}",
        started_at.elapsed().as_millis()
    );
    served
}

async fn serve(addr: &str, service: web::Data<AppService>) -> Result<(), String> {
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(service.clone())
            .configure(configure_routes)
    })
    .bind(addr)
    .map_err(|err| format!("failed to bind `{addr}`: {err}"))?
    .run()
    .await
    .map_err(|err| format!("server error: {err}"))
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;
    use itemsvc_core::{ItemService, SqliteItemStore};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn defaults_match_documented_values() {
        let args = Args::try_parse_from(["itemsvc"]).unwrap();
        assert_eq!(args.addr, "127.0.0.1:8080");
        assert_eq!(args.db_path, "items.sqlite3");
        assert_eq!(args.workers, 10);
        assert_eq!(args.batch_config().item_delay, Duration::from_millis(100));
        assert!(args.log_dir.is_none());
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "itemsvc",
            "--addr",
            "0.0.0.0:9000",
            "--workers",
            "3",
            "--item-delay-ms",
            "0",
        ])
        .unwrap();
        let config = args.batch_config();
        assert_eq!(args.addr, "0.0.0.0:9000");
        assert_eq!(config.workers, 3);
        assert!(config.item_delay.is_zero());
    }

    #[test]
    fn zero_workers_is_rejected_at_service_start() {
        let args = Args::try_parse_from(["itemsvc", "--workers", "0"]).unwrap();
        let store = Arc::new(SqliteItemStore::open_in_memory().unwrap());

        assert!(ItemService::new(store, args.batch_config()).is_err());
    }
}
