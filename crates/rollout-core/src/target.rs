//! Deployment target: where an operation lands on the cluster side.

use crate::error::{Result, RolloutError};
use crate::stamp::StampTable;
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::OnceLock;

fn namespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // RFC 1123 label shape, the namespace charset kubectl itself enforces.
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").unwrap())
}

/// Raw target fields as supplied by flags or config, before stamping.
/// Any field may contain `{KEY}` stamp references.
#[derive(Debug, Clone, Default)]
pub struct TargetSpec {
    pub cluster: Option<String>,
    pub context: Option<String>,
    pub namespace: Option<String>,
    pub user: Option<String>,
    pub kubeconfig: Option<PathBuf>,
}

/// A fully stamped, validated deployment target. Constructed once per
/// operation invocation; read-only during the operation.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentTarget {
    pub cluster: Option<String>,
    pub context: Option<String>,
    pub namespace: Option<String>,
    pub user: Option<String>,
    pub kubeconfig: Option<PathBuf>,
}

impl DeploymentTarget {
    /// Stamp every field of `spec` and validate the result. Stamping only
    /// runs for fields that request it.
    pub fn resolve(spec: &TargetSpec, stamps: &StampTable) -> Result<Self> {
        let stamp_field = |field: &Option<String>| -> Result<Option<String>> {
            field
                .as_deref()
                .map(|v| stamps.resolve_if_needed(v))
                .transpose()
        };

        let target = Self {
            cluster: stamp_field(&spec.cluster)?,
            context: stamp_field(&spec.context)?,
            namespace: stamp_field(&spec.namespace)?,
            user: stamp_field(&spec.user)?,
            kubeconfig: spec.kubeconfig.clone(),
        };
        target.validate()?;
        Ok(target)
    }

    fn validate(&self) -> Result<()> {
        if let Some(ns) = &self.namespace {
            if !namespace_regex().is_match(ns) {
                return Err(RolloutError::InvalidTarget(format!(
                    "namespace '{ns}' is not a valid RFC 1123 label"
                )));
            }
        }
        for (name, value) in [
            ("cluster", &self.cluster),
            ("context", &self.context),
            ("user", &self.user),
        ] {
            if let Some(v) = value {
                if v.is_empty() {
                    return Err(RolloutError::InvalidTarget(format!("{name} is empty")));
                }
            }
        }
        Ok(())
    }

    /// The cluster-CLI selection flags for this target, in `--flag=value`
    /// form. Unset fields contribute nothing.
    pub fn cli_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(cluster) = &self.cluster {
            args.push(format!("--cluster={cluster}"));
        }
        if let Some(context) = &self.context {
            args.push(format!("--context={context}"));
        }
        if let Some(user) = &self.user {
            args.push(format!("--user={user}"));
        }
        if let Some(namespace) = &self.namespace {
            args.push(format!("--namespace={namespace}"));
        }
        if let Some(kubeconfig) = &self.kubeconfig {
            args.push(format!("--kubeconfig={}", kubeconfig.display()));
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn stamps(pairs: &str) -> StampTable {
        let dir = TempDir::new().unwrap();
        let f = dir.path().join("status.txt");
        std::fs::write(&f, pairs).unwrap();
        StampTable::from_files(&[f]).unwrap()
    }

    #[test]
    fn literal_fields_pass_through() {
        let spec = TargetSpec {
            cluster: Some("prod-cluster".to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        };
        let target = DeploymentTarget::resolve(&spec, &StampTable::empty()).unwrap();
        assert_eq!(target.cluster.as_deref(), Some("prod-cluster"));
        assert_eq!(target.namespace.as_deref(), Some("default"));
    }

    #[test]
    fn stamped_namespace_resolves_before_validation() {
        let spec = TargetSpec {
            namespace: Some("team-{BUILD_USER}".to_string()),
            ..Default::default()
        };
        let table = stamps("BUILD_USER alice\n");
        let target = DeploymentTarget::resolve(&spec, &table).unwrap();
        assert_eq!(target.namespace.as_deref(), Some("team-alice"));
    }

    #[test]
    fn undefined_stamp_key_fails_before_dispatch() {
        let spec = TargetSpec {
            cluster: Some("gke_{PROJECT}_main".to_string()),
            ..Default::default()
        };
        let err = DeploymentTarget::resolve(&spec, &StampTable::empty()).unwrap_err();
        assert!(matches!(err, RolloutError::UndefinedStampKey { .. }));
    }

    #[test]
    fn invalid_namespace_rejected_at_construction() {
        let spec = TargetSpec {
            namespace: Some("Not_A_Namespace".to_string()),
            ..Default::default()
        };
        let err = DeploymentTarget::resolve(&spec, &StampTable::empty()).unwrap_err();
        assert!(matches!(err, RolloutError::InvalidTarget(_)));
    }

    #[test]
    fn cli_args_only_for_set_fields() {
        let spec = TargetSpec {
            context: Some("minikube".to_string()),
            namespace: Some("staging".to_string()),
            kubeconfig: Some(PathBuf::from("/tmp/kubeconfig")),
            ..Default::default()
        };
        let target = DeploymentTarget::resolve(&spec, &StampTable::empty()).unwrap();
        assert_eq!(
            target.cli_args(),
            vec![
                "--context=minikube".to_string(),
                "--namespace=staging".to_string(),
                "--kubeconfig=/tmp/kubeconfig".to_string(),
            ]
        );
    }

    #[test]
    fn empty_target_has_no_args() {
        let target =
            DeploymentTarget::resolve(&TargetSpec::default(), &StampTable::empty()).unwrap();
        assert!(target.cli_args().is_empty());
    }
}
