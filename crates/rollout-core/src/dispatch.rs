//! Operation dispatch: one structured cluster-CLI invocation per operation.
//!
//! Every operation is a fresh external-process execution with an explicit
//! argument vector; no shell is ever involved, and the CLI's exit status is
//! surfaced verbatim. Ordering between operations on the same object is the
//! caller's responsibility.

use crate::error::{Result, RolloutError};
use crate::target::DeploymentTarget;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Environment variable naming a cluster CLI executable, consulted between
/// the explicit configuration and the PATH lookup.
pub const KUBECTL_ENV: &str = "ROLLOUT_KUBECTL";

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// The six terminal operation kinds. Each variant carries exactly the inputs
/// it needs; dispatch is by exhaustive match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Submit a resolved manifest; fails if the object already exists.
    Create { manifest: PathBuf },
    /// Idempotent upsert; the operation for repeated/automated runs.
    Apply { manifest: PathBuf },
    /// Requires the object to already exist.
    Replace { manifest: PathBuf },
    /// Consumes the reversed (identity-only) manifest. A missing object is
    /// not locally distinguished; the CLI's exit code is forwarded as-is.
    Delete { reversed: PathBuf },
    /// Read-only drift display between manifest and live state.
    Diff { manifest: PathBuf },
    /// Read-only live-state display for an object kind; works from the
    /// unresolved template, so `name` is only present when it was literal.
    Describe { kind: String, name: Option<String> },
}

impl Operation {
    pub fn verb(&self) -> &'static str {
        match self {
            Operation::Create { .. } => "create",
            Operation::Apply { .. } => "apply",
            Operation::Replace { .. } => "replace",
            Operation::Delete { .. } => "delete",
            Operation::Diff { .. } => "diff",
            Operation::Describe { .. } => "describe",
        }
    }

    /// True for operations that never mutate cluster state.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Operation::Diff { .. } | Operation::Describe { .. })
    }

    fn args(&self) -> Vec<String> {
        match self {
            Operation::Create { manifest }
            | Operation::Apply { manifest }
            | Operation::Replace { manifest }
            | Operation::Diff { manifest } => {
                vec![
                    self.verb().to_string(),
                    "-f".to_string(),
                    manifest.display().to_string(),
                ]
            }
            Operation::Delete { reversed } => vec![
                "delete".to_string(),
                "-f".to_string(),
                reversed.display().to_string(),
            ],
            Operation::Describe { kind, name } => {
                let mut args = vec!["describe".to_string(), kind.clone()];
                if let Some(name) = name {
                    args.push(name.clone());
                }
                args
            }
        }
    }
}

// ---------------------------------------------------------------------------
// KubeCli
// ---------------------------------------------------------------------------

/// A located cluster CLI executable.
#[derive(Debug, Clone)]
pub struct KubeCli {
    program: PathBuf,
}

impl KubeCli {
    /// Locate the cluster CLI: explicit path first, then the
    /// `ROLLOUT_KUBECTL` environment variable, then `kubectl` on PATH.
    /// No candidate at all fails fast with `ToolNotConfigured` — nothing is
    /// ever executed speculatively.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(RolloutError::ToolNotConfigured);
            }
            return Ok(Self {
                program: path.to_path_buf(),
            });
        }
        if let Some(env_path) = std::env::var_os(KUBECTL_ENV) {
            let path = PathBuf::from(env_path);
            if !path.exists() {
                return Err(RolloutError::ToolNotConfigured);
            }
            return Ok(Self { program: path });
        }
        match which::which("kubectl") {
            Ok(found) => Ok(Self { program: found }),
            Err(_) => Err(RolloutError::ToolNotConfigured),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The full argument vector for `operation` against `target`, excluding
    /// the program itself.
    pub fn argv(&self, operation: &Operation, target: &DeploymentTarget) -> Vec<String> {
        let mut argv = operation.args();
        argv.extend(target.cli_args());
        argv
    }

    /// Execute `operation` against `target`. The child inherits stdout and
    /// stderr; a nonzero exit becomes `ClusterOperationFailed` with the code
    /// unfiltered.
    pub fn execute(&self, operation: &Operation, target: &DeploymentTarget) -> Result<()> {
        let argv = self.argv(operation, target);
        tracing::info!(
            program = %self.program.display(),
            args = %argv.join(" "),
            read_only = operation.is_read_only(),
            "invoking cluster CLI"
        );

        let status = Command::new(&self.program)
            .args(&argv)
            .stdin(Stdio::null())
            .status()?;

        if status.success() {
            return Ok(());
        }
        match status.code() {
            Some(code) => Err(RolloutError::ClusterOperationFailed {
                operation: operation.verb().to_string(),
                code,
            }),
            None => Err(RolloutError::ClusterOperationKilled {
                operation: operation.verb().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stamp::StampTable;
    use crate::target::TargetSpec;
    use tempfile::TempDir;

    fn target(namespace: &str, context: &str) -> DeploymentTarget {
        let spec = TargetSpec {
            namespace: Some(namespace.to_string()),
            context: Some(context.to_string()),
            ..Default::default()
        };
        DeploymentTarget::resolve(&spec, &StampTable::empty()).unwrap()
    }

    #[cfg(unix)]
    fn fake_kubectl(dir: &TempDir, exit_code: i32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join("kubectl");
        std::fs::write(&path, format!("#!/bin/sh\nexit {exit_code}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn verbs_are_stable() {
        assert_eq!(
            Operation::Create {
                manifest: PathBuf::from("m")
            }
            .verb(),
            "create"
        );
        assert_eq!(
            Operation::Describe {
                kind: "deployment".to_string(),
                name: None
            }
            .verb(),
            "describe"
        );
    }

    #[test]
    fn read_only_classification() {
        let diff = Operation::Diff {
            manifest: PathBuf::from("m"),
        };
        let apply = Operation::Apply {
            manifest: PathBuf::from("m"),
        };
        assert!(diff.is_read_only());
        assert!(!apply.is_read_only());
    }

    #[test]
    fn argv_is_verb_then_file_then_target_flags() {
        let dir = TempDir::new().unwrap();
        let kubectl_path = dir.path().join("kubectl");
        std::fs::write(&kubectl_path, "").unwrap();
        let cli = KubeCli::locate(Some(&kubectl_path)).unwrap();

        let op = Operation::Apply {
            manifest: PathBuf::from("out/app.yaml"),
        };
        let argv = cli.argv(&op, &target("staging", "minikube"));
        assert_eq!(
            argv,
            vec![
                "apply".to_string(),
                "-f".to_string(),
                "out/app.yaml".to_string(),
                "--context=minikube".to_string(),
                "--namespace=staging".to_string(),
            ]
        );
    }

    #[test]
    fn describe_argv_with_and_without_name() {
        let dir = TempDir::new().unwrap();
        let kubectl_path = dir.path().join("kubectl");
        std::fs::write(&kubectl_path, "").unwrap();
        let cli = KubeCli::locate(Some(&kubectl_path)).unwrap();

        let anon = Operation::Describe {
            kind: "service".to_string(),
            name: None,
        };
        assert_eq!(
            cli.argv(&anon, &target("default", "c")),
            vec!["describe", "service", "--context=c", "--namespace=default"]
        );

        let named = Operation::Describe {
            kind: "service".to_string(),
            name: Some("frontend".to_string()),
        };
        assert!(cli
            .argv(&named, &target("default", "c"))
            .contains(&"frontend".to_string()));
    }

    #[test]
    fn explicit_missing_path_is_tool_not_configured() {
        let err = KubeCli::locate(Some(Path::new("/no/such/kubectl"))).unwrap_err();
        assert!(matches!(err, RolloutError::ToolNotConfigured));
    }

    #[cfg(unix)]
    #[test]
    fn execute_succeeds_on_zero_exit() {
        let dir = TempDir::new().unwrap();
        let cli = KubeCli::locate(Some(&fake_kubectl(&dir, 0))).unwrap();
        let op = Operation::Diff {
            manifest: PathBuf::from("m.yaml"),
        };
        cli.execute(&op, &target("default", "c")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn execute_forwards_exit_code_unfiltered() {
        let dir = TempDir::new().unwrap();
        let cli = KubeCli::locate(Some(&fake_kubectl(&dir, 7))).unwrap();
        let op = Operation::Delete {
            reversed: PathBuf::from("m.reversed.yaml"),
        };
        let err = cli.execute(&op, &target("default", "c")).unwrap_err();
        assert!(matches!(
            err,
            RolloutError::ClusterOperationFailed {
                ref operation,
                code: 7
            } if operation == "delete"
        ));
    }
}
