//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one record per line.

use std::io::{self, Write};

use chrono::SecondsFormat;
use tabled::{Table, Tabled, settings::Style};

use vmevent_core::Event;

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable items in the chosen format.
///
/// - `table`: maps each item through `to_row` and builds a rounded table
/// - `json` / `json-compact` / `yaml`: serializes the original data
/// - `plain`: calls `line_fn` on each item, one line per item
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(line_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Print rendered output to stdout. Empty output prints nothing.
pub fn print_output(output: &str) -> Result<(), CliError> {
    if output.is_empty() {
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(())
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub(crate) fn render_json<T: serde::Serialize + ?Sized>(
    data: &T,
    compact: bool,
) -> Result<String, CliError> {
    let text = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(text)
}

pub(crate) fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}

// ── Events ───────────────────────────────────────────────────────────

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Key")]
    key: i32,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Message")]
    message: String,
}

fn event_row(e: &Event) -> EventRow {
    EventRow {
        key: e.key,
        created: created(e),
        severity: e.severity.clone(),
        user: e.user_name.clone(),
        target: e.target(),
        message: e.full_formatted_message.clone(),
    }
}

fn created(event: &Event) -> String {
    event
        .created_time
        .to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// `<created>\tuser=<u>\tseverity=<s>\ttarget=<t>\tmessage=<m>`
pub fn event_line(event: &Event) -> String {
    format!(
        "{}\tuser={}\tseverity={}\ttarget={}\tmessage={}",
        created(event),
        event.user_name,
        event.severity,
        event.target(),
        event.full_formatted_message,
    )
}

pub fn render_events(format: OutputFormat, events: &[Event]) -> Result<String, CliError> {
    render_list(format, events, event_row, event_line)
}

/// Render one streamed batch so consecutive batches concatenate cleanly:
/// tab-separated lines for table/plain, one JSON object per line for the
/// JSON formats, a YAML document per batch.
pub fn render_event_batch(format: OutputFormat, events: &[Event]) -> Result<String, CliError> {
    match format {
        OutputFormat::Table | OutputFormat::Plain => {
            Ok(events.iter().map(event_line).collect::<Vec<_>>().join("\n"))
        }
        OutputFormat::Json | OutputFormat::JsonCompact => Ok(events
            .iter()
            .map(|e| render_json(e, true))
            .collect::<Result<Vec<_>, _>>()?
            .join("\n")),
        OutputFormat::Yaml => Ok(format!("---\n{}", render_yaml(events)?.trim_end())),
    }
}
