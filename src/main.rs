//! Command line entry point: runs one contract operation against a sled db.

use anyhow::Context;
use clap::Parser;
use repo_contract::config::{DatePolicy, DuplicatePolicy};
use repo_contract::{ContractService, Response, ServiceConfig};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "repo-contract")]
#[command(about = "Repo contract lifecycle on an append-only ledger", long_about = None)]
struct Cli {
    /// Database directory
    #[arg(long, env = "REPO_DB", default_value = "./repo-data")]
    db: PathBuf,

    /// Log filter directive, e.g. `info` or `repo_contract=debug`
    #[arg(long, env = "REPO_LOG", default_value = "info")]
    log: String,

    /// Fail contract creation when the deal number is already stored
    #[arg(long)]
    reject_duplicates: bool,

    /// Fail contract closing on unparsable dates instead of using 01.01.0001
    #[arg(long)]
    strict_dates: bool,

    /// Write payloads as raw CBOR instead of hex
    #[arg(long)]
    raw: bool,

    /// Operation name, e.g. addContract, getContract, closeContract
    function: String,

    /// Positional operation arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Cli {
    fn service_config(&self) -> ServiceConfig {
        let duplicate_policy = if self.reject_duplicates {
            DuplicatePolicy::Reject
        } else {
            DuplicatePolicy::Overwrite
        };
        let date_policy = if self.strict_dates {
            DatePolicy::Strict
        } else {
            DatePolicy::ZeroFallback
        };

        ServiceConfig::default()
            .with_duplicate_policy(duplicate_policy)
            .with_date_policy(date_policy)
            .with_log_filter(self.log.clone())
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.service_config();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_filter)?)
        .with_writer(std::io::stderr)
        .init();

    let db = sled::open(&cli.db)
        .with_context(|| format!("failed to open database at {}", cli.db.display()))?;
    let service = ContractService::new(Arc::new(db), config)?;

    let response = service
        .invoke_function(&cli.function, cli.args.as_slice())
        .with_context(|| format!("{} failed", cli.function))?;

    let mut stdout = std::io::stdout().lock();
    match response {
        Response::Message(message) => writeln!(stdout, "{message}")?,
        Response::Payload(bytes) if cli.raw => stdout.write_all(&bytes)?,
        Response::Payload(bytes) => writeln!(stdout, "{}", hex::encode(bytes))?,
    }

    Ok(())
}
