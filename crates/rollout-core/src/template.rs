//! The substitution engine: `%{name}` placeholder expansion over a manifest
//! template.
//!
//! Expansion is pure byte-for-byte string substitution. The template is never
//! parsed as YAML here; structure is the author's business.

use crate::error::{Result, RolloutError};
use crate::stamp::StampTable;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%\{([A-Za-z_][A-Za-z0-9_.-]*)\}").unwrap())
}

// ---------------------------------------------------------------------------
// Substitutions
// ---------------------------------------------------------------------------

/// Mapping from placeholder name to replacement value.
///
/// Values are fully computed before expansion: any `{KEY}` stamp references
/// inside a value are resolved eagerly at insertion, in a single pass. There
/// is no recursive expansion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Substitutions(BTreeMap<String, String>);

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a literal value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Insert a value after resolving its `{KEY}` stamp references.
    pub fn insert_stamped(
        &mut self,
        name: impl Into<String>,
        value: &str,
        stamps: &StampTable,
    ) -> Result<()> {
        self.0.insert(name.into(), stamps.resolve_if_needed(value)?);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// ---------------------------------------------------------------------------
// ManifestTemplate
// ---------------------------------------------------------------------------

/// A raw manifest template and the placeholders scanned from it.
#[derive(Debug, Clone)]
pub struct ManifestTemplate {
    raw: String,
}

impl ManifestTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RolloutError::TemplateNotFound(path.display().to_string()));
        }
        Ok(Self::new(std::fs::read_to_string(path)?))
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The set of distinct `%{name}` placeholders referenced by the template.
    pub fn placeholders(&self) -> BTreeSet<String> {
        placeholder_regex()
            .captures_iter(&self.raw)
            .map(|c| c[1].to_string())
            .collect()
    }

    /// Expand every placeholder against `substitutions`.
    ///
    /// All missing placeholders are collected and reported in one failure;
    /// on failure no partial output is produced.
    pub fn expand(&self, substitutions: &Substitutions) -> Result<String> {
        let missing: Vec<String> = self
            .placeholders()
            .into_iter()
            .filter(|name| substitutions.get(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(RolloutError::UnresolvedPlaceholder(missing.join(", ")));
        }

        let mut out = String::with_capacity(self.raw.len());
        let mut last = 0;
        for caps in placeholder_regex().captures_iter(&self.raw) {
            let m = caps.get(0).unwrap();
            // Presence was checked above; the map cannot have lost the key.
            let value = substitutions.get(&caps[1]).unwrap_or_default();
            out.push_str(&self.raw[last..m.start()]);
            out.push_str(value);
            last = m.end();
        }
        out.push_str(&self.raw[last..]);
        Ok(out)
    }
}
