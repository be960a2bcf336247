//! HealthQL CLI
//!
//! One-shot command-line interface:
//! - Run a query against an Apple Health export
//! - Show the compiled IR of a query
//! - List tables and their fields
//! - Generate a default config file

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use healthql::config::{generate_default_config, Config, OutputFormat};
use healthql::executor::{ExecutorOptions, HealthQueryExecutor, QueryResult};
use healthql::ir::schema;
use healthql::store::{ExportStore, HealthStore, MemoryStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "healthql")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "SQL-like queries over personal health records")]
#[command(long_about = "HealthQL compiles SQL-like query text to a typed query plan\nand runs it against an Apple Health export.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/healthql/config.toml, then ./healthql.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a query and print its rows
    Query {
        /// Query text, e.g. "SELECT avg(value) FROM heart_rate GROUP BY day"
        text: String,
        /// Output format (overrides config)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
        /// Apple Health export.xml or export.zip (overrides config)
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Print the compiled query plan as JSON
    Parse {
        /// Query text
        text: String,
    },

    /// List queryable tables
    Tables,

    /// Show the fields of one table
    Schema {
        /// Table name
        table: String,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config);

    match cli.command {
        Commands::Query {
            text,
            format,
            export,
        } => {
            let store = open_store(&config, export)?;
            let executor = HealthQueryExecutor::with_options(
                store,
                ExecutorOptions {
                    lookback_days: config.executor.default_lookback_days,
                    ..Default::default()
                },
            );

            let result = healthql::run_query(&executor, &text).await?;
            match format.unwrap_or(config.output.format) {
                OutputFormat::Table => print_table(&result),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Csv => print_csv(&result)?,
            }
        }

        Commands::Parse { text } => {
            let query = healthql::parse_to_ir(&text)?;
            println!("{}", serde_json::to_string_pretty(&query)?);
        }

        Commands::Tables => {
            println!("{:<32} {:<10} {}", "TABLE", "KIND", "UNIT");
            for table in schema::all_tables() {
                println!(
                    "{:<32} {:<10} {}",
                    table.name,
                    table.kind,
                    table.unit.unwrap_or("-")
                );
            }
        }

        Commands::Schema { table } => {
            let Some(table) = schema::describe(&table) else {
                bail!("Unknown table: {}", table);
            };
            println!("{} ({})", table.name, table.kind);
            if let Some(unit) = table.unit {
                println!("Unit: {}", unit);
            }
            println!();
            for field in table.fields {
                println!("  {}", field);
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("healthql={}", config.logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn open_store(config: &Config, export: Option<PathBuf>) -> anyhow::Result<Arc<dyn HealthStore>> {
    if !config.store.available {
        return Ok(Arc::new(MemoryStore::new().unavailable()));
    }

    match export.or_else(|| config.store.export_path.clone()) {
        Some(path) => {
            let store = ExportStore::open(&path)
                .with_context(|| format!("Failed to open export {:?}", path))?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("No export configured, querying an empty store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn print_table(result: &QueryResult) {
    if result.is_empty() {
        println!("No rows.");
        return;
    }

    let columns = result.columns();
    let cells: Vec<Vec<String>> = result
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(c).map(|v| v.to_string()).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|row| row[i].len())
                .chain(std::iter::once(c.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: &[String]| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = w))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(&columns));
    println!(
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  ")
    );
    for row in &cells {
        println!("{}", line(row));
    }
    println!();
    println!(
        "{} row(s) in {:.3}s",
        result.len(),
        result.execution_time.as_secs_f64()
    );
}

fn print_csv(result: &QueryResult) -> anyhow::Result<()> {
    let columns = result.columns();
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    writer.write_record(&columns)?;
    for row in result {
        writer.write_record(
            columns
                .iter()
                .map(|c| match row.get(c) {
                    Some(healthql::ResultValue::Null) | None => String::new(),
                    Some(healthql::ResultValue::Date(d)) => d.to_rfc3339(),
                    Some(value) => value.to_string(),
                }),
        )?;
    }
    writer.flush()?;
    Ok(())
}
