// ── Localization catalog cache ──
//
// Two tiers: resolved `key → value` entries, and fetched documents by URI.
// A document is fetched at most once per cache; there is no invalidation.
// Both maps are `DashMap` so one cache can serve concurrent lookups. Two
// callers racing on the same uncached document may both fetch it; the
// second merge overwrites identical values.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use vmevent_api::LocalizationCatalog;

use crate::endpoint::CatalogSource;
use crate::error::CoreError;

/// Cache of localized strings backed by remote `.vmsg` catalog documents.
#[derive(Debug, Default)]
pub struct LocalizationCache {
    values: DashMap<String, String>,
    documents: DashMap<String, Arc<HashMap<String, String>>>,
}

impl LocalizationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `key` from the catalog for (`locale`, `module`).
    ///
    /// Returns `Ok(None)` when no catalog matches or the key is absent from
    /// the matching document. Fetch errors propagate.
    pub async fn lookup(
        &self,
        catalogs: &[LocalizationCatalog],
        source: &dyn CatalogSource,
        locale: &str,
        module: &str,
        key: &str,
    ) -> Result<Option<String>, CoreError> {
        if let Some(value) = self.cached_value(key) {
            return Ok(Some(value));
        }

        let Some(uri) = catalog_uri(catalogs, locale, module) else {
            debug!(locale, module, "no localization catalog");
            return Ok(None);
        };

        let fetched = self.documents.get(uri).map(|doc| Arc::clone(doc.value()));
        if let Some(doc) = fetched {
            return Ok(non_empty(doc.get(key)));
        }

        debug!(uri, "fetching localization catalog");
        let text = source.fetch(uri).await?;
        let doc = Arc::new(parse_catalog(&text));
        for (k, v) in doc.iter() {
            self.values.insert(k.clone(), v.clone());
        }
        self.documents.insert(uri.to_owned(), Arc::clone(&doc));

        Ok(non_empty(doc.get(key)))
    }

    /// Number of distinct documents fetched so far.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    fn cached_value(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .map(|v| v.value().clone())
            .filter(|v| !v.is_empty())
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

/// URI of the catalog document for (`locale`, `module`).
///
/// Falls back to the primary language subtag (`ja_JP` → `ja`).
pub fn catalog_uri<'a>(
    catalogs: &'a [LocalizationCatalog],
    locale: &str,
    module: &str,
) -> Option<&'a str> {
    let find = |locale: &str| {
        catalogs
            .iter()
            .find(|c| c.locale == locale && c.module_name == module)
            .map(|c| c.catalog_uri.as_str())
    };

    find(locale).or_else(|| {
        let primary = locale.split_once('_').map_or(locale, |(lang, _)| lang);
        find(primary)
    })
}

/// Parse a `.vmsg` catalog document.
///
/// `key = value` per logical line. `#` starts a comment line. A line ending
/// in an odd number of backslashes continues onto the next one (the final
/// backslash is dropped, lines are joined as-is). Values lose surrounding
/// whitespace and double quotes. Lines without `=` are ignored.
pub fn parse_catalog(text: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    let mut pending = String::new();

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if pending.is_empty() && line.trim_start().starts_with('#') {
            continue;
        }

        let trailing = line.chars().rev().take_while(|&c| c == '\\').count();
        if trailing % 2 == 1 {
            pending.push_str(&line[..line.len() - 1]);
            continue;
        }

        if pending.is_empty() {
            insert_entry(&mut values, line);
        } else {
            pending.push_str(line);
            insert_entry(&mut values, &pending);
            pending.clear();
        }
    }

    if !pending.is_empty() {
        insert_entry(&mut values, &pending);
    }

    values
}

fn insert_entry(values: &mut HashMap<String, String>, line: &str) {
    let Some((key, value)) = line.split_once('=') else {
        return;
    };
    let key = key.trim();
    if key.is_empty() {
        return;
    }
    values.insert(key.to_owned(), value.trim().trim_matches('"').to_owned());
}
