//! The six cluster operations: resolve (where needed), then one structured
//! cluster-CLI invocation.

use crate::cmd::args::{self, ResolveFlags, StampFlags, TargetFlags};
use crate::output::print_json;
use anyhow::Context;
use rollout_core::config::Config;
use rollout_core::dispatch::{KubeCli, Operation};
use rollout_core::template::ManifestTemplate;
use rollout_core::{io, manifest, paths, pipeline};
use std::path::Path;

/// Mutating / diffing operations that consume a resolved manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAction {
    Create,
    Apply,
    Replace,
    Delete,
    Diff,
}

impl ObjectAction {
    fn into_operation(
        self,
        root: &Path,
        template: &Path,
        resolved: &Path,
    ) -> anyhow::Result<Operation> {
        let manifest_path = resolved.to_path_buf();
        Ok(match self {
            ObjectAction::Create => Operation::Create {
                manifest: manifest_path,
            },
            ObjectAction::Apply => Operation::Apply {
                manifest: manifest_path,
            },
            ObjectAction::Replace => Operation::Replace {
                manifest: manifest_path,
            },
            ObjectAction::Diff => Operation::Diff {
                manifest: manifest_path,
            },
            ObjectAction::Delete => {
                // Deletion consumes the identity-only projection so it never
                // depends on the full spec body.
                let content = std::fs::read_to_string(resolved)?;
                let reversed = manifest::reversed(&content)?;
                let reversed_path = paths::work_reversed_path(root, template);
                io::atomic_write(&reversed_path, reversed.as_bytes())?;
                Operation::Delete {
                    reversed: reversed_path,
                }
            }
        })
    }
}

pub fn run(
    root: &Path,
    action: ObjectAction,
    resolve: ResolveFlags,
    target: TargetFlags,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load rollout.yaml")?;
    let stamps = args::build_stamps(root, &config, &resolve.stamp)?;

    // Resolution failures abort here: the cluster is never contacted with a
    // partial manifest.
    let output = paths::work_resolved_path(root, &resolve.template);
    let request = args::build_request(&config, &resolve, output)?;
    let resolved = pipeline::resolve(&request, &stamps)
        .with_context(|| format!("failed to resolve {}", request.template.display()))?;
    for finding in &resolved.findings {
        eprintln!("warning: {finding}");
    }

    let kubectl = args::kubectl_override(&config, &target);
    let cli = KubeCli::locate(kubectl.as_deref())?;
    let deployment_target = args::build_target(&config, &target, &stamps)?;

    let operation = action.into_operation(root, &resolve.template, &resolved.output)?;
    cli.execute(&operation, &deployment_target)?;

    if json {
        print_json(&serde_json::json!({
            "operation": operation.verb(),
            "manifest": resolved.output,
            "status": "ok",
        }))?;
    }
    Ok(())
}

pub fn describe(
    root: &Path,
    template: &Path,
    kind: &str,
    stamp: StampFlags,
    target: TargetFlags,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load rollout.yaml")?;
    let stamps = args::build_stamps(root, &config, &stamp)?;

    // Describe works from the unresolved template: the object name is used
    // only when it is fully literal, otherwise the kind is described
    // collectively.
    let raw = ManifestTemplate::load(template)?;
    let name = manifest::first_object_name(raw.raw());

    let kubectl = args::kubectl_override(&config, &target);
    let cli = KubeCli::locate(kubectl.as_deref())?;
    let deployment_target = args::build_target(&config, &target, &stamps)?;

    let operation = Operation::Describe {
        kind: kind.to_string(),
        name,
    };
    cli.execute(&operation, &deployment_target)?;

    if json {
        print_json(&serde_json::json!({
            "operation": "describe",
            "kind": kind,
            "status": "ok",
        }))?;
    }
    Ok(())
}
