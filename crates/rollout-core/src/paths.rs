use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// File name constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "rollout.yaml";

/// Work directory for operation-time resolved manifests.
pub const WORK_DIR: &str = ".rollout";

/// Canonical workspace-status files, in merge order (volatile overrides
/// stable on key collision). Used when no stamp files are supplied.
pub const DEFAULT_STABLE_STATUS: &str = "bazel-out/stable-status.txt";
pub const DEFAULT_VOLATILE_STATUS: &str = "bazel-out/volatile-status.txt";

/// Suffix appended to a resolved manifest path for its audit side-file.
pub const AUDIT_SUFFIX: &str = ".substitutions.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn default_stamp_files(root: &Path) -> Vec<PathBuf> {
    vec![
        root.join(DEFAULT_STABLE_STATUS),
        root.join(DEFAULT_VOLATILE_STATUS),
    ]
}

/// Audit side-file path for a resolved manifest: `<output>.substitutions.json`.
pub fn audit_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(AUDIT_SUFFIX);
    output.with_file_name(name)
}

/// Default output path for a resolved template: `<stem>.resolved.yaml`
/// next to the template.
pub fn default_output_path(template: &Path) -> PathBuf {
    let stem = template
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "manifest".to_string());
    template.with_file_name(format!("{stem}.resolved.yaml"))
}

fn template_stem(template: &Path) -> String {
    template
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "manifest".to_string())
}

/// Operation-time resolved manifest path under the work directory.
pub fn work_resolved_path(root: &Path, template: &Path) -> PathBuf {
    root.join(WORK_DIR)
        .join(format!("{}.resolved.yaml", template_stem(template)))
}

/// Operation-time reversed (identity-only) manifest path.
pub fn work_reversed_path(root: &Path, template: &Path) -> PathBuf {
    root.join(WORK_DIR)
        .join(format!("{}.reversed.yaml", template_stem(template)))
}
