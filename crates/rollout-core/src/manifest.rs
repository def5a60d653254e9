//! Resolved-manifest output and manifest projections.

use crate::error::Result;
use crate::io::atomic_write;
use crate::paths;
use crate::template::Substitutions;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Resolved output + audit side-file
// ---------------------------------------------------------------------------

/// Record of the substitution set actually applied to a template, written
/// next to the resolved manifest for auditability.
#[derive(Debug, Serialize)]
pub struct AuditRecord<'a> {
    pub template: &'a Path,
    pub output: &'a Path,
    pub generated_at: String,
    pub substitutions: &'a Substitutions,
}

impl<'a> AuditRecord<'a> {
    pub fn new(template: &'a Path, output: &'a Path, substitutions: &'a Substitutions) -> Self {
        Self {
            template,
            output,
            generated_at: Utc::now().to_rfc3339(),
            substitutions,
        }
    }
}

/// Atomically write the resolved manifest and its audit side-file.
/// Returns the audit path.
pub fn write_resolved(output: &Path, content: &str, audit: &AuditRecord) -> Result<PathBuf> {
    atomic_write(output, content.as_bytes())?;
    let audit_path = paths::audit_path(output);
    let json = serde_json::to_string_pretty(audit)?;
    atomic_write(&audit_path, json.as_bytes())?;
    Ok(audit_path)
}

// ---------------------------------------------------------------------------
// Reversed manifest (identity-only projection)
// ---------------------------------------------------------------------------

/// Project a resolved manifest down to the identity of each object:
/// apiVersion, kind, and metadata name/namespace/labels. Deletion consumes
/// this form so it never depends on the full spec body.
///
/// Documents without a kind or a metadata name are passed over with a
/// warning.
pub fn reversed(resolved: &str) -> Result<String> {
    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(resolved) {
        let value = Value::deserialize(document)?;
        match project_identity(&value) {
            Some(identity) => docs.push(serde_yaml::to_string(&identity)?),
            None => {
                if !matches!(value, Value::Null) {
                    tracing::warn!("skipping document without kind/metadata.name in reversal");
                }
            }
        }
    }
    Ok(docs.join("---\n"))
}

fn project_identity(doc: &Value) -> Option<Value> {
    let kind = doc.get("kind")?.as_str()?;
    let metadata = doc.get("metadata")?;
    let name = metadata.get("name")?.as_str()?;

    let mut meta = serde_yaml::Mapping::new();
    meta.insert("name".into(), name.into());
    if let Some(namespace) = metadata.get("namespace").and_then(Value::as_str) {
        meta.insert("namespace".into(), namespace.into());
    }
    if let Some(labels) = metadata.get("labels") {
        if labels.is_mapping() {
            meta.insert("labels".into(), labels.clone());
        }
    }

    let mut out = serde_yaml::Mapping::new();
    if let Some(api_version) = doc.get("apiVersion").and_then(Value::as_str) {
        out.insert("apiVersion".into(), api_version.into());
    }
    out.insert("kind".into(), kind.into());
    out.insert("metadata".into(), Value::Mapping(meta));
    Some(Value::Mapping(out))
}

/// Extract `metadata.name` from the first document of a (possibly
/// unresolved) template, if it is present and fully literal.
pub fn first_object_name(raw: &str) -> Option<String> {
    let document = serde_yaml::Deserializer::from_str(raw).next()?;
    let value = Value::deserialize(document).ok()?;
    let name = value.get("metadata")?.get("name")?.as_str()?;
    if name.contains("%{") {
        return None;
    }
    Some(name.to_string())
}
