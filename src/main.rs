use clap::{Parser, Subcommand};
use formula_bridge::api::{run_api_server, server::ApiConfig};
use formula_bridge::cli;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fbridge")]
#[command(about = "Rewrite, validate and store display-syntax formulas")]
#[command(long_about = "Formula Bridge - display-syntax formulas over a table schema

Formulas are written against table and field display names:
  [交接单].@金额        a field of a table
  @金额.SUM()           a method call on a field of the current table
  [交接单].COUNTIF(\">1\")  a method call on a whole table

COMMANDS:
  normalize  - Rewrite to canonical spreadsheet ranges
  validate   - Check function names and argument counts
  keys       - Show the stored [tableCode.fieldCode] form
  check      - Normalize, validate, parse and preview
  functions  - List known functions
  lookup     - Build an INDEX/MATCH lookup formula
  batch      - Check every formula in a YAML file
  watch      - Re-run batch whenever the file or schema changes
  serve      - Run the HTTP API

EXAMPLES:
  fbridge --schema schema.yaml --table 交接单 normalize '@金额.SUM()'
  fbridge keys '[交接单].@金额 * 2'
  fbridge batch formulas.yaml

Without --schema a built-in sample schema is used.")]
#[command(version)]
struct Cli {
    /// Schema document (YAML or JSON)
    #[arg(short, long, global = true, env = "FBRIDGE_SCHEMA")]
    schema: Option<PathBuf>,

    /// Table context for @Field references
    #[arg(short, long, global = true, env = "FBRIDGE_TABLE")]
    table: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite a formula to canonical ranges
    Normalize {
        /// Display formula
        formula: String,
    },

    /// Check function names and argument counts
    Validate {
        /// Display formula
        formula: String,

        /// Report every error instead of the first
        #[arg(short, long)]
        all: bool,
    },

    /// Show the stored form of a formula
    Keys {
        /// Display formula
        formula: String,
    },

    /// Normalize, validate, parse and compute a preview
    Check {
        /// Display formula
        formula: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List known functions
    Functions {
        /// Only this category (basic, logic, lookup, data, date, text, statistics, custom)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Build an INDEX/MATCH lookup formula
    Lookup {
        /// Table to search
        #[arg(value_name = "TABLE")]
        search_table: String,

        /// Field matched against the key
        #[arg(short, long)]
        key: String,

        /// Key expression, e.g. A2 or '"C-01"'
        #[arg(short, long)]
        equals: String,

        /// Field to return
        #[arg(short, long)]
        value: String,
    },

    #[command(long_about = "Check every formula in a YAML file.

The file is a list of entries:

  - name: total
    table: 交接单
    formula: \"@金额.SUM()\"
  - formula: \"=IF([交接单].@金额 > 100, 1, 0)\"

Exits non-zero when any formula has a signature or parse error.")]
    /// Check every formula in a YAML file
    Batch {
        /// YAML list of { name?, table?, formula }
        file: PathBuf,
    },

    /// Re-run batch whenever the file or the schema changes
    Watch {
        /// YAML list of { name?, table?, formula }
        file: PathBuf,
    },

    /// Run the HTTP API
    Serve {
        /// Host address to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1", env = "FBRIDGE_HOST")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8080", env = "FBRIDGE_PORT")]
        port: u16,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fbridge=warn,formula_bridge=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let Cli {
        schema,
        table,
        command,
    } = Cli::parse();

    let session = || cli::load_session(schema.as_deref(), table.clone());

    match command {
        Commands::Normalize { formula } => cli::normalize(&session()?, &formula)?,

        Commands::Validate { formula, all } => cli::validate(&session()?, &formula, all)?,

        Commands::Keys { formula } => cli::keys(&session()?, &formula)?,

        Commands::Check { formula, json } => cli::check(&session()?, &formula, json)?,

        Commands::Functions { category } => cli::functions(&session()?, category)?,

        Commands::Lookup {
            search_table,
            key,
            equals,
            value,
        } => cli::lookup(&session()?, &search_table, &key, &equals, &value)?,

        Commands::Batch { file } => cli::batch(&session()?, file)?,

        // Watch reloads the schema itself on every change
        Commands::Watch { file } => cli::watch(schema.clone(), table.clone(), file)?,

        Commands::Serve { host, port } => {
            let session = Arc::new(session()?);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_api_server(ApiConfig { host, port }, session))?;
        }
    }

    Ok(())
}
