//! Formula Bridge - display-syntax formulas over a tabular schema
//!
//! Users write formulas against human-readable table and field names
//! (`[交接单].@金额`, `@金额.SUM()`). This library rewrites them to canonical
//! spreadsheet ranges for an evaluation engine, checks call signatures
//! against a function registry, and produces the code-keyed form
//! (`[handOver.amount]`) that is stored.
//!
//! # Features
//!
//! - Reference normalization to `'Sheet'!C:C` ranges
//! - Call extraction and arity validation (fail-fast or collect-all)
//! - Field-key transformation for persistence
//! - YAML/JSON schema documents validated with JSON Schema
//! - Preview evaluation through `xlformula_engine`
//!
//! # Example
//!
//! ```no_run
//! use formula_bridge::FormulaSession;
//! use std::path::Path;
//!
//! let session = FormulaSession::from_path(Path::new("schema.yaml"))?;
//!
//! let report = session.check("@金额.SUM()", Some("交接单"));
//! println!("Canonical: {}", report.canonical);
//! println!("Stored:    {}", session.commit("@金额.SUM()", Some("交接单")));
//! # Ok::<(), formula_bridge::error::BridgeError>(())
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod functions;
pub mod schema;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use config::Options;
pub use error::{BridgeError, BridgeResult};
pub use functions::{FunctionRegistry, FunctionSpec};
pub use schema::{SchemaDocument, SchemaIndex};
pub use session::{CheckReport, FormulaSession};
pub use types::{ExtractedCall, Field, FormulaError, FormulaErrorKind, Schema, Table};
