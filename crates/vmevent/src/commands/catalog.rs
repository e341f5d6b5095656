//! Event catalog commands: `category`, `enumerated`, `info`.

use tabled::Tabled;

use vmevent_core::schema;
use vmevent_core::{EnumeratedType, EventInfo, LocalizationCache};

use crate::cli::GlobalOpts;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::{connect, disconnect};

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    label: String,
}

#[derive(Tabled)]
struct EnumeratedRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Labels")]
    labels: String,
}

#[derive(Tabled)]
struct InfoRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Causes")]
    causes: usize,
}

// ── Handlers ─────────────────────────────────────────────────────────

pub async fn categories(settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let session = connect(settings).await?;
    let result = schema::categories(session.as_ref()).await;
    let labels = disconnect(session.as_ref(), result).await?;

    let out = output::render_list(
        global.output,
        &labels,
        |l| CategoryRow { label: l.clone() },
        Clone::clone,
    )?;
    output::print_output(&out)
}

pub async fn enumerated(settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let session = connect(settings).await?;
    let result = schema::enumerated_types(session.as_ref()).await;
    let types = disconnect(session.as_ref(), result).await?;

    let out = output::render_list(
        global.output,
        &types,
        |t| EnumeratedRow {
            key: t.key.clone(),
            labels: t.labels.join(", "),
        },
        enumerated_line,
    )?;
    output::print_output(&out)
}

pub async fn info(settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let session = connect(settings).await?;
    let cache = LocalizationCache::new();
    let result = schema::event_info(session.as_ref(), &cache).await;
    let infos = disconnect(session.as_ref(), result).await?;
    tracing::debug!(
        count = infos.len(),
        catalogs = cache.document_count(),
        "event info loaded"
    );

    let out = output::render_list(
        global.output,
        &infos,
        |i| InfoRow {
            key: i.key.clone(),
            category: i.category.clone(),
            description: i.description.clone(),
            causes: i.long_description.causes.len(),
        },
        info_lines,
    )?;
    output::print_output(&out)
}

// ── Plain renderers ──────────────────────────────────────────────────

/// `key ( label, label )`
fn enumerated_line(t: &EnumeratedType) -> String {
    format!("{} ( {} )", t.key, t.labels.join(", "))
}

/// `key category description`, then the long description and its causes
/// indented underneath when present.
fn info_lines(i: &EventInfo) -> String {
    let mut lines = vec![format!("{} {} {}", i.key, i.category, i.description)];
    let long = &i.long_description;
    if !long.description.is_empty() {
        lines.push(format!("  Long Description: {}", long.description));
        lines.extend(
            long.causes
                .iter()
                .map(|c| format!("  Cause: {}", c.description)),
        );
    }
    lines.join("\n")
}
