//! CLI command handlers

pub mod commands;

pub use commands::{
    batch, check, functions, keys, load_session, lookup, normalize, run_batch, validate, watch,
};
