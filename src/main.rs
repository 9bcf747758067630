//! sqlwright - a text-to-SQL assistant.
//!
//! Reads natural-language questions, generates SQL with an LLM, executes it,
//! repairs it on failure, and explains the final query.

use std::io::Write as _;

use tokio::io::AsyncBufReadExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sqlwright::cli::Cli;
use sqlwright::config::{Config, ConnectionConfig};
use sqlwright::db::{self, DatabaseClient, MockDatabaseClient};
use sqlwright::error::{Result, SqlwrightError};
use sqlwright::llm::{create_client, LlmProvider};
use sqlwright::workflow::{WorkItem, Workflow, WorkflowOptions};

#[tokio::main]
async fn main() {
    // Credentials and keys may live in a .env next to the binary
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let options = WorkflowOptions {
        max_repairs: cli.max_repairs.unwrap_or(config.workflow.max_repairs),
        allow_writes: cli.allow_writes || config.workflow.allow_writes,
    };

    let mut llm_config = config.llm.clone();
    if let Some(model) = &cli.model {
        llm_config.model = model.clone();
    }
    let provider: LlmProvider = cli
        .llm
        .as_deref()
        .unwrap_or(&llm_config.provider)
        .parse()
        .map_err(SqlwrightError::config)?;
    let llm = create_client(provider, &llm_config)?;
    info!("LLM provider: {} ({})", provider, llm_config.model);

    let database: Box<dyn DatabaseClient> = if cli.mock_db {
        info!("Using in-memory mock database");
        Box::new(MockDatabaseClient::new())
    } else {
        let connection = resolve_connection(&cli, &config)?.ok_or_else(|| {
            SqlwrightError::config(
                "No database connection configured. \
                 Pass a connection string, configure one, or use --mock-db.",
            )
        })?;
        info!("Connecting to {}", connection.display_string());
        db::connect(&connection).await?
    };

    let workflow = Workflow::new(llm.as_ref(), database.as_ref()).with_options(options);

    let outcome = match &cli.question {
        Some(question) => answer(&workflow, database.as_ref(), question).await,
        None => interactive_loop(&workflow, database.as_ref()).await,
    };

    database.close().await?;
    outcome
}

/// Resolves the final connection configuration from CLI args, config file, and environment.
fn resolve_connection(cli: &Cli, config: &Config) -> Result<Option<ConnectionConfig>> {
    // Start with CLI connection config if provided
    let mut connection = cli.to_connection_config()?;

    // If no CLI connection, try named connection from config
    if connection.is_none() {
        if let Some(name) = cli.connection_name() {
            connection = config.get_connection(Some(name)).cloned();
            if connection.is_none() {
                return Err(SqlwrightError::config(format!(
                    "Connection '{}' not found in config file",
                    name
                )));
            }
        }
    }

    // If still no connection, try default from config
    if connection.is_none() {
        connection = config.get_connection(None).cloned();
    }

    // Apply environment variable defaults
    if let Some(ref mut conn) = connection {
        conn.apply_env_defaults();
    }

    Ok(connection)
}

/// Answers a single question: fetch the schema, run the workflow, print.
async fn answer(workflow: &Workflow<'_>, database: &dyn DatabaseClient, question: &str) -> Result<()> {
    // Schema is fetched once per question and reused for every prompt
    let schema = database.introspect_schema().await?;
    let item = workflow.run(question, &schema.format_for_llm()).await?;
    print_item(&item);
    Ok(())
}

/// Reads questions from stdin until EOF or an exit sentinel.
async fn interactive_loop(workflow: &Workflow<'_>, database: &dyn DatabaseClient) -> Result<()> {
    println!("sqlwright - ask questions about your database.");
    println!("Type 'exit' to quit.");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\n? ");
        std::io::stdout()
            .flush()
            .map_err(|e| SqlwrightError::internal(format!("Failed to flush stdout: {e}")))?;

        let line = lines
            .next_line()
            .await
            .map_err(|e| SqlwrightError::internal(format!("Failed to read stdin: {e}")))?;

        let Some(line) = line else {
            break; // EOF
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        // A failed question should not end the session
        if let Err(e) = answer(workflow, database, question).await {
            eprintln!("{}: {}", e.category(), e);
        }
    }

    Ok(())
}

/// Prints the terminal WorkItem the way the interactive surface renders it.
fn print_item(item: &WorkItem) {
    if let Some(sql) = &item.sql {
        println!("\nGenerated SQL:\n{}", sql);
    }
    if let Some(explanation) = &item.explanation {
        println!("\nExplanation:\n{}", explanation);
    }
    if let Some(result) = &item.result {
        println!("\nResult:\n{}", result);
    }
    if let Some(error) = &item.error {
        println!("\nError: {}", error);
    }
}
