//! odsql: SQL-like shell for the Explore API v2
//!
//! # Usage
//!
//! ```bash
//! # Interactive session
//! odsql -h data.example.com
//!
//! # One statement, then exit
//! odsql -h data.example.com -e "select * from catalog limit 5"
//!
//! # Show where a query would go, without a network call
//! odsql explain "select city, count(*) from sales group by city"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use odsql::client::DEFAULT_TIMEOUT_SECS;
use odsql::config::Config;
use odsql::render::table_width;
use odsql::prelude::*;
use odsql::repl::{ReplSettings, echo_request, print_output, run_repl};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "odsql")]
#[command(version)]
#[command(about = "SQL-like shell for the Opendatasoft Explore API v2", long_about = None)]
#[command(disable_help_flag = true)]
#[command(after_help = "EXAMPLES:
    odsql -h data.example.com
    odsql -h data.example.com -u alice -e 'describe sales'
    odsql explain 'select count(*) from catalog group by theme' --json")]
struct Cli {
    /// Domain to query, e.g. data.example.com
    #[arg(short = 'h', long, env = "ODSQL_HOST")]
    host: Option<String>,

    /// User for HTTP basic auth
    #[arg(short, long)]
    user: Option<String>,

    /// Password for HTTP basic auth (prompted if a user is given without one)
    #[arg(short, long, env = "ODSQL_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Run one statement and exit
    #[arg(short, long)]
    execute: Option<String>,

    /// Configuration file (default: <config dir>/odsql/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Truncate table lines to this width (default: terminal width)
    #[arg(long, env = "COLUMNS")]
    max_width: Option<usize>,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a statement and show the endpoint it resolves to
    Explain {
        /// The statement to explain
        query: String,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("ODSQL_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::discover(cli.config.as_deref())?;
    let mut options = OptionStore::new();
    config.apply_options(&mut options)?;

    if let Some(Commands::Explain { query, json }) = &cli.command {
        return explain_query(query, &options, *json);
    }

    let host = cli
        .host
        .or(config.host.clone())
        .context("no host given; use --host, ODSQL_HOST or the config file")?;

    let credentials = match cli.user.or(config.user.clone()) {
        Some(user) => {
            let password = match cli.password {
                Some(p) => p,
                None => rpassword::prompt_password(format!("Password for user {}: ", user))
                    .context("failed to read password")?,
            };
            Some(Credentials { user, password })
        }
        None => None,
    };

    let timeout = cli
        .timeout
        .or(config.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let transport = HttpTransport::new(&host, credentials, Duration::from_secs(timeout))?;
    tracing::debug!(base = %transport.base(), timeout, "connected");

    let mut session = Session::new(transport, options);

    if let Some(statement) = &cli.execute {
        let statement = statement.trim().trim_end_matches(';');
        if session.options().debug() {
            echo_request(statement, session.options());
        }
        let output = session.execute(statement).await?;
        print_output(&output, table_width(cli.max_width));
        return Ok(());
    }

    let settings = ReplSettings {
        history_file: config.history_path(),
        max_width: cli.max_width,
    };
    run_repl(&mut session, &settings).await?;
    Ok(())
}

fn explain_query(query: &str, options: &OptionStore, json: bool) -> anyhow::Result<()> {
    let plan = odsql::explain(query, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("{}", "Statement:".cyan().bold());
    match &plan.statement {
        Statement::Data(q) => {
            println!("  {:<10} {}", "select".dimmed(), q.select);
            println!("  {:<10} {}", "from".dimmed(), q.from.yellow());
            if let Some(w) = &q.where_clause {
                println!("  {:<10} {}", "where".dimmed(), w);
            }
            if let Some(g) = &q.group_by {
                println!("  {:<10} {}", "group by".dimmed(), g);
            }
            if let Some(o) = &q.order_by {
                println!("  {:<10} {}", "order by".dimmed(), o);
            }
            if let Some(l) = q.limit {
                println!("  {:<10} {}", "limit".dimmed(), l);
            }
            if let Some(o) = q.offset {
                println!("  {:<10} {}", "offset".dimmed(), o);
            }
            if q.has_aggregate {
                println!("  {}", "(aggregate in select list)".dimmed());
            }
        }
        Statement::Meta(cmd) => println!("  {:?}", cmd),
    }

    if let Some(decision) = &plan.decision {
        println!();
        println!("{} {}", "Endpoint:".green().bold(), decision.endpoint);
        println!("  {:<10} {}", "path".dimmed(), decision.path());
        for (name, value) in &decision.parameters {
            println!("  {:<10} {}", name.dimmed(), value);
        }
    }
    Ok(())
}
