mod backend;
mod convert;
mod diagnostics_sink;
mod heuristic_parser;
mod status_bridge;

use std::io;

use clap::Parser;
use tower_lsp_server::{LspService, Server};
use tracing_subscriber::{fmt, EnvFilter};

use backend::Backend;

#[derive(Parser, Debug)]
#[command(name = "groovy-ls", version, about = "Language Server for Groovy", long_about = None)]
struct Args {
    /// Serve over stdio. This is currently the only supported transport.
    #[arg(long, default_value_t = true)]
    stdio: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
    Ok(())
}
