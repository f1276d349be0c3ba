//! Formula Bridge API Server binary
//!
//! HTTP REST API for normalizing, validating and storing formulas.

use clap::Parser;
use formula_bridge::api::{run_api_server, server::ApiConfig};
use formula_bridge::cli::load_session;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "fbridge-server")]
#[command(version)]
#[command(about = "Formula Bridge API Server - HTTP REST API for display-syntax formulas")]
#[command(long_about = r#"
Formula Bridge API Server - HTTP REST API

Provides RESTful endpoints over one schema:
  - POST /api/v1/normalize  - Rewrite to canonical ranges
  - POST /api/v1/validate   - Check function names and argument counts
  - POST /api/v1/keys       - Stored [tableCode.fieldCode] form
  - POST /api/v1/check      - Normalize, validate, parse and preview
  - POST /api/v1/lookup     - Build an INDEX/MATCH formula
  - GET  /api/v1/functions  - List known functions

Additional endpoints:
  - GET  /health            - Health check
  - GET  /version           - Server version info
  - GET  /                  - API documentation

Features:
  - CORS enabled for cross-origin requests
  - Graceful shutdown on SIGINT/SIGTERM
  - JSON response format with request IDs
  - Tracing and structured logging

Example usage:
  fbridge-server --schema schema.yaml
  fbridge-server --host 0.0.0.0 --port 3000

  curl -X POST http://localhost:8080/api/v1/normalize \
    -H "Content-Type: application/json" \
    -d '{"formula": "@金额.SUM()", "table": "交接单"}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "FBRIDGE_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "FBRIDGE_PORT")]
    port: u16,

    /// Schema document (YAML or JSON); the sample schema when omitted
    #[arg(short, long, env = "FBRIDGE_SCHEMA")]
    schema: Option<PathBuf>,

    /// Default table context
    #[arg(short, long, env = "FBRIDGE_TABLE")]
    table: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let session = load_session(args.schema.as_deref(), args.table)?;

    let config = ApiConfig {
        host: args.host,
        port: args.port,
    };

    run_api_server(config, Arc::new(session)).await
}
