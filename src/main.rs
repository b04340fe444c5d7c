//! mysql-resilient - Main entry point.
//!
//! Runs SQL statements through a resilient session and prints each result as
//! one JSON line on stdout. Logs go to stderr.

use mysql_resilient::config::Config;
use mysql_resilient::{DbResult, MySqlDriver, Placeholders, QueryResult, Session};
use std::io::Write;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Run every statement, either one by one or inside a single transaction.
///
/// In transaction mode the statements may run more than once; only the
/// results of the committed attempt are returned.
fn run(
    session: &mut Session<MySqlDriver>,
    config: &Config,
    placeholders: &Placeholders,
) -> DbResult<Vec<QueryResult>> {
    if config.transaction {
        session.transaction(|s| {
            config
                .statements
                .iter()
                .map(|sql| s.execute(sql, placeholders))
                .collect()
        })
    } else {
        config
            .statements
            .iter()
            .map(|sql| session.execute(sql, placeholders))
            .collect()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    // Initialize logging
    init_tracing(&config);

    if config.statements.is_empty() {
        eprintln!("Error: At least one statement must be given.");
        eprintln!();
        eprintln!("Usage: mysql-resilient [--url <URL>] -e <SQL> [-e <SQL> ...]");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  mysql-resilient --url mysql://root@localhost/test -e 'SELECT 1'");
        eprintln!(
            "  mysql-resilient -d shop -e 'SELECT * FROM orders WHERE id IN (:ids)' --params '{{\"ids\": [1, 2]}}'"
        );
        eprintln!(
            "  mysql-resilient --transaction -e 'UPDATE stock SET qty = qty - 1 WHERE id = 7' -e 'INSERT INTO sales (item) VALUES (7)'"
        );
        eprintln!("  mysql-resilient --config db.json -e 'SHOW TABLES'");
        std::process::exit(1);
    }

    let settings = config.connection_settings()?;
    let placeholders = config.placeholders()?;

    info!(
        url = %settings.masked_url(),
        statements = config.statements.len(),
        transaction = config.transaction,
        "Starting mysql-resilient v{}",
        env!("CARGO_PKG_VERSION")
    );

    let driver = MySqlDriver::new()?.decode_binary(config.decode_binary);
    let mut session = Session::new(driver, settings);
    session.connect()?;

    let outcome = run(&mut session, &config, &placeholders);

    if let Err(e) = session.close() {
        warn!(error = %e, "Failed to close connection");
    }

    let results = match outcome {
        Ok(results) => results,
        Err(e) => {
            error!(error = %e, "Execution failed");
            return Err(e.into());
        }
    };

    let mut stdout = std::io::stdout().lock();
    for result in &results {
        writeln!(stdout, "{}", serde_json::to_string(result)?)?;
    }

    info!(count = results.len(), "Done");
    Ok(())
}
