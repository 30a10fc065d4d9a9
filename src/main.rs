//! Demo server for the request logging middleware.
//!
//! # Usage
//!
//! ```bash
//! httplog-demo --listen 127.0.0.1:8080 --log-format json
//! curl -H 'x-request-id: abc' localhost:8080/users/7
//! curl -d 'ping' localhost:8080/echo
//! curl localhost:8080/panic
//! ```

use anyhow::Result;
use clap::Parser;

use httplog::{config, server, telemetry};

/// Serves a few demo routes behind the request logging middleware.
///
/// Flags override the matching environment variables.
#[derive(Parser)]
#[command(name = "httplog-demo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on (env: LISTEN)
    #[arg(short, long)]
    listen: Option<String>,

    /// Log output format: text or json (env: LOG_FORMAT)
    #[arg(long)]
    log_format: Option<String>,

    /// Body bytes attached to a log event (env: HTTPLOG_MAX_BODY_LOG)
    #[arg(long)]
    max_body_log: Option<usize>,

    /// Header carrying the request id (env: HTTPLOG_REQUEST_ID_HEADER)
    #[arg(long)]
    request_id_header: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = config::Config::from_env()?;
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(max) = cli.max_body_log {
        config.max_body_log = max;
    }
    if let Some(header) = cli.request_id_header {
        config.request_id_header = header;
    }
    config.validate()?;

    telemetry::init(&config)?;
    config.print_summary();

    server::run(config).await
}
