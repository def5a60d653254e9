//! Stamping: late-bound substitution of build/version metadata into strings.
//!
//! Stamp values come from workspace-status files of newline-delimited
//! `KEY VALUE` pairs. A string containing `{KEY}` references is resolved by
//! lookup against the combined table; a string with no `{` bypasses the
//! service entirely.

use crate::error::{Result, RolloutError};
use crate::paths;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn stamp_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap())
}

/// True if `expression` requests stamping at all. Callers use this to skip
/// table construction for plain literal values.
pub fn needs_stamping(expression: &str) -> bool {
    expression.contains('{')
}

/// Combined key-value table from one or more workspace-status files.
/// Later files override earlier ones on key collision.
#[derive(Debug, Clone, Default)]
pub struct StampTable {
    values: HashMap<String, String>,
}

impl StampTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from explicitly supplied files. Every file must exist.
    pub fn from_files(files: &[PathBuf]) -> Result<Self> {
        let mut values = HashMap::new();
        for file in files {
            if !file.exists() {
                return Err(RolloutError::StampFileNotFound(
                    file.display().to_string(),
                ));
            }
            let content = std::fs::read_to_string(file)?;
            merge_status_lines(&mut values, &content);
        }
        Ok(Self { values })
    }

    /// Build a table from `files`, falling back to the canonical
    /// stable/volatile status pair under `root` when `files` is empty.
    /// Fallback files that do not exist are skipped; explicit files must
    /// exist.
    pub fn load(files: &[PathBuf], root: &Path) -> Result<Self> {
        if !files.is_empty() {
            return Self::from_files(files);
        }
        let mut values = HashMap::new();
        for file in paths::default_stamp_files(root) {
            if !file.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&file)?;
            merge_status_lines(&mut values, &content);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace every `{KEY}` occurrence in `expression` with its table value.
    /// A referenced key absent from the table is a hard failure.
    pub fn resolve(&self, expression: &str) -> Result<String> {
        let mut out = String::with_capacity(expression.len());
        let mut last = 0;
        for caps in stamp_ref_regex().captures_iter(expression) {
            let m = caps.get(0).unwrap();
            let key = &caps[1];
            let value = self.values.get(key).ok_or_else(|| {
                RolloutError::UndefinedStampKey {
                    key: key.to_string(),
                    expression: expression.to_string(),
                }
            })?;
            out.push_str(&expression[last..m.start()]);
            out.push_str(value);
            last = m.end();
        }
        out.push_str(&expression[last..]);
        Ok(out)
    }

    /// Stamp `expression` only when it requests stamping, otherwise pass it
    /// through untouched.
    pub fn resolve_if_needed(&self, expression: &str) -> Result<String> {
        if needs_stamping(expression) {
            self.resolve(expression)
        } else {
            Ok(expression.to_string())
        }
    }
}

/// Parse `KEY VALUE` lines into `values`. The separator is the first space;
/// the value may itself contain spaces. Blank and malformed lines are
/// skipped.
fn merge_status_lines(values: &mut HashMap<String, String>, content: &str) {
    for line in content.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        match line.split_once(' ') {
            Some((key, value)) if !key.is_empty() => {
                values.insert(key.to_string(), value.to_string());
            }
            _ => continue,
        }
    }
}
