use crate::engine::EngineValue;
use crate::error::{BridgeError, BridgeResult};
use crate::functions::Category;
use crate::schema::load_document;
use crate::session::{CheckReport, FormulaSession};
use crate::SchemaDocument;
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;
use tracing::{debug, warn};

/// Format a number for display, removing unnecessary decimal places
fn format_number(n: f64) -> String {
    // Round to 6 decimal places; also hides f32 artifacts from the engine
    let rounded = (n * 1e6).round() / 1e6;
    format!("{:.6}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn format_value(value: &EngineValue) -> String {
    match value {
        EngineValue::Number(n) => format_number(*n),
        other => other.to_string(),
    }
}

/// Build a session from an optional schema file, applying a table override.
/// Without a file the built-in sample schema is used.
pub fn load_session(schema: Option<&Path>, table: Option<String>) -> BridgeResult<FormulaSession> {
    let document = match schema {
        Some(path) => load_document(path)?,
        None => {
            debug!("no schema given, using the sample schema");
            SchemaDocument::sample()
        }
    };
    let options = document.options.clone().with_default_table(table);
    Ok(FormulaSession::new(&document)?.with_options(options))
}

/// Execute the normalize command
pub fn normalize(session: &FormulaSession, formula: &str) -> BridgeResult<()> {
    println!("{}", "🔁 Normalizing formula".bold().green());
    println!("   Input:     {}", formula);
    println!(
        "   Canonical: {}",
        session.canonical(formula, None).bright_blue().bold()
    );
    Ok(())
}

/// Execute the validate command
pub fn validate(session: &FormulaSession, formula: &str, all: bool) -> BridgeResult<()> {
    println!("{}", "✅ Validating formula".bold().green());
    println!("   Input: {}\n", formula);

    let errors = if all {
        session.validate_all(formula, None)
    } else {
        session.validate(formula, None).into_iter().collect()
    };

    if errors.is_empty() {
        println!("{}", "✅ All function calls are valid!".bold().green());
        return Ok(());
    }

    for error in &errors {
        println!("   {} {}", "❌".red(), error.message.red());
    }
    Err(BridgeError::Validation(errors[0].message.clone()))
}

/// Execute the keys command
pub fn keys(session: &FormulaSession, formula: &str) -> BridgeResult<()> {
    println!("{}", "🔑 Stored form".bold().green());
    println!("   Input:  {}", formula);
    println!(
        "   Stored: {}",
        session.commit(formula, None).bright_blue().bold()
    );
    Ok(())
}

/// Execute the check command
pub fn check(session: &FormulaSession, formula: &str, json: bool) -> BridgeResult<()> {
    let report = session.check(formula, None);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", "🔍 Checking formula".bold().green());
        println!("   Input:     {}", formula);
        print_report(&report);
    }

    if has_blocking_errors(&report) {
        return Err(BridgeError::Validation(first_error(&report)));
    }
    Ok(())
}

/// Signature and parse errors block; a missing preview does not
fn has_blocking_errors(report: &CheckReport) -> bool {
    !report.validation.is_empty() || !report.parse_errors.is_empty()
}

fn first_error(report: &CheckReport) -> String {
    report
        .validation
        .iter()
        .chain(report.parse_errors.iter())
        .map(|e| e.message.clone())
        .next()
        .unwrap_or_default()
}

fn print_report(report: &CheckReport) {
    if report.canonical.is_empty() {
        println!("{}", "⚠️  Empty formula".yellow());
        return;
    }
    println!("   Canonical: {}", report.canonical.bright_blue());

    if report.validation.is_empty() {
        println!("   {}", "✅ Signatures OK".green());
    }
    for error in &report.validation {
        println!("   {} {}", "❌".red(), error.message.red());
    }

    for (error, marker) in report.parse_errors.iter().zip(report.markers.iter()) {
        println!(
            "   {} {} (chars {}..{})",
            "❌ Parse:".red(),
            error.message.red(),
            marker.start,
            marker.end
        );
    }

    if let Some(value) = &report.preview {
        println!("   Preview:   {}", format_value(value).bold());
    }
    if let Some(error) = &report.compute_error {
        println!(
            "   {} {}",
            "⚠️  Preview unavailable:".yellow(),
            error.message
        );
    }
}

/// Execute the functions command
pub fn functions(session: &FormulaSession, category: Option<String>) -> BridgeResult<()> {
    let filter = match category {
        Some(name) => Some(Category::parse(&name).ok_or_else(|| {
            BridgeError::Config(format!("Unknown function category '{}'", name))
        })?),
        None => None,
    };

    println!("{}", "📚 Available functions".bold().green());

    for (category, specs) in session.registry().by_category() {
        if filter.is_some_and(|f| f != category) {
            continue;
        }
        println!("\n   {}", category.as_str().to_uppercase().bright_blue().bold());
        for spec in specs {
            println!("      {}({})", spec.name.cyan(), spec.params);
        }
    }
    println!();
    Ok(())
}

/// Execute the lookup command
pub fn lookup(
    session: &FormulaSession,
    table: &str,
    key_field: &str,
    key_expr: &str,
    value_field: &str,
) -> BridgeResult<()> {
    match session.lookup(table, key_field, key_expr, value_field) {
        Some(formula) => {
            println!("{}", "🔎 Lookup formula".bold().green());
            println!("   {}", formula.bright_blue().bold());
            Ok(())
        }
        None => Err(BridgeError::Validation(format!(
            "Cannot build lookup: unknown table or field in '{}' ({} → {})",
            table, key_field, value_field
        ))),
    }
}

/// One formula of a batch file
#[derive(Debug, Clone, Deserialize)]
pub struct BatchEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    pub formula: String,
}

/// Outcome of checking a batch file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub checked: usize,
    pub failed: usize,
}

/// Read a YAML list of batch entries
pub fn read_batch(file: &Path) -> BridgeResult<Vec<BatchEntry>> {
    let content = fs::read_to_string(file)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Check every entry of a batch file and print a line per formula
pub fn run_batch(session: &FormulaSession, file: &Path) -> BridgeResult<BatchSummary> {
    let entries = read_batch(file)?;
    let mut summary = BatchSummary::default();

    for (i, entry) in entries.iter().enumerate() {
        let label = entry.name.clone().unwrap_or_else(|| format!("#{}", i + 1));
        let report = session.check(&entry.formula, entry.table.as_deref());
        summary.checked += 1;

        if has_blocking_errors(&report) {
            summary.failed += 1;
            println!(
                "   {} {}: {}",
                "❌".red(),
                label.bright_blue(),
                first_error(&report).red()
            );
        } else {
            let preview = report
                .preview
                .as_ref()
                .map(format_value)
                .unwrap_or_else(|| "-".to_string());
            println!(
                "   {} {}: {} = {}",
                "✅".green(),
                label.bright_blue(),
                report.canonical,
                preview.bold()
            );
        }
    }

    Ok(summary)
}

/// Execute the batch command
pub fn batch(session: &FormulaSession, file: PathBuf) -> BridgeResult<()> {
    println!("{}", "📋 Checking formulas".bold().green());
    println!("   File: {}\n", file.display());

    let summary = run_batch(session, &file)?;
    println!();

    if summary.failed == 0 {
        println!(
            "{}",
            format!("✅ All {} formulas are valid!", summary.checked)
                .bold()
                .green()
        );
        Ok(())
    } else {
        println!(
            "{}",
            format!("❌ {} of {} formulas failed", summary.failed, summary.checked)
                .bold()
                .red()
        );
        Err(BridgeError::Validation(format!(
            "{} formulas failed validation",
            summary.failed
        )))
    }
}

/// Execute the watch command: re-run the batch whenever the batch file or
/// the schema file changes. The schema is reloaded on every run.
pub fn watch(schema: Option<PathBuf>, table: Option<String>, file: PathBuf) -> BridgeResult<()> {
    println!("{}", "👁️  Formula Bridge - Watch Mode".bold().green());
    println!("   Watching: {}", file.display());
    if let Some(ref path) = schema {
        println!("   Schema:   {}", path.display());
    }
    println!("   Press {} to stop\n", "Ctrl+C".bold().yellow());

    if !file.exists() {
        return Err(BridgeError::Watch(format!(
            "File not found: {}",
            file.display()
        )));
    }

    let mut watched = vec![file.canonicalize()?];
    if let Some(ref path) = schema {
        watched.push(path.canonicalize()?);
    }

    let (tx, rx) = channel();

    // Debounce to avoid rapid-fire events during file saves
    let mut debouncer = new_debouncer(Duration::from_millis(200), tx)
        .map_err(|e| BridgeError::Watch(format!("Failed to create file watcher: {}", e)))?;

    let mut dirs: Vec<&Path> = watched.iter().filter_map(|p| p.parent()).collect();
    dirs.dedup();
    for dir in dirs {
        debouncer
            .watcher()
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| BridgeError::Watch(format!("Failed to watch directory: {}", e)))?;
    }

    println!("{}", "🔄 Initial run...".cyan());
    run_watch_action(schema.as_deref(), table.clone(), &file);
    println!();

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant = events.iter().any(|event| {
                    event.kind == DebouncedEventKind::Any
                        && event
                            .path
                            .canonicalize()
                            .map(|p| watched.contains(&p))
                            .unwrap_or(false)
                });

                if relevant {
                    println!(
                        "\n{} {}",
                        "🔄 Change detected at".cyan(),
                        timestamp().cyan()
                    );
                    run_watch_action(schema.as_deref(), table.clone(), &file);
                    println!();
                }
            }
            Ok(Err(error)) => {
                warn!(%error, "watch error");
                eprintln!("{} Watch error: {}", "❌".red(), error);
            }
            Err(e) => {
                eprintln!("{} Channel error: {}", "❌".red(), e);
                break;
            }
        }
    }

    Ok(())
}

/// Wall-clock time of day, UTC
fn timestamp() -> String {
    use std::time::SystemTime;
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!(
        "{:02}:{:02}:{:02} UTC",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60
    )
}

fn run_watch_action(schema: Option<&Path>, table: Option<String>, file: &Path) {
    let result = load_session(schema, table).and_then(|session| run_batch(&session, file));
    match result {
        Ok(summary) if summary.failed == 0 => println!(
            "{}",
            format!("✅ {} formulas valid", summary.checked).bold().green()
        ),
        Ok(summary) => println!(
            "{}",
            format!("❌ {} of {} formulas failed", summary.failed, summary.checked)
                .bold()
                .red()
        ),
        Err(e) => println!("{} {}", "❌ Check failed:".bold().red(), e),
    }
}
