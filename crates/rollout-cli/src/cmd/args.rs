//! Shared flag groups and the flag/config merge helpers.
//!
//! CLI flags always override `rollout.yaml` values; the config supplies
//! defaults only where the matching flag is absent.

use anyhow::{bail, Context};
use clap::Args;
use rollout_core::config::Config;
use rollout_core::image::{self, ImageMap};
use rollout_core::pipeline::ResolveRequest;
use rollout_core::stamp::StampTable;
use rollout_core::target::{DeploymentTarget, TargetSpec};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Flag groups
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct StampFlags {
    /// Workspace-status file; repeatable. Later files override earlier ones.
    #[arg(long = "stamp-file", value_name = "FILE")]
    pub stamp_files: Vec<PathBuf>,

    /// Disable stamping; {KEY} references then fail resolution
    #[arg(long)]
    pub no_stamp: bool,
}

#[derive(Args, Debug)]
pub struct ResolveFlags {
    /// Manifest template (.yaml or .json)
    #[arg(long)]
    pub template: PathBuf,

    /// YAML file mapping logical image tag to build artifact paths
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// Substitution value, name=value; repeatable. Values may contain {KEY}
    /// stamp references, resolved before expansion.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    #[command(flatten)]
    pub stamp: StampFlags,

    /// Registry prefix applied to every resolved image name
    #[arg(long = "image-chroot", value_name = "PREFIX")]
    pub image_chroot: Option<String>,
}

#[derive(Args, Debug)]
pub struct TargetFlags {
    /// Cluster name (may contain {KEY} stamp references)
    #[arg(long)]
    pub cluster: Option<String>,

    /// kubeconfig context (may contain {KEY} stamp references)
    #[arg(long)]
    pub context: Option<String>,

    /// Namespace (may contain {KEY} stamp references)
    #[arg(long)]
    pub namespace: Option<String>,

    /// Cluster user (may contain {KEY} stamp references)
    #[arg(long)]
    pub user: Option<String>,

    /// kubeconfig file passed through to the cluster CLI
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Cluster CLI executable (overrides rollout.yaml and ROLLOUT_KUBECTL)
    #[arg(long)]
    pub kubectl: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Merge helpers
// ---------------------------------------------------------------------------

pub fn parse_set(pairs: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                Ok((name.to_string(), value.to_string()))
            }
            _ => bail!("invalid --set '{pair}': expected name=value"),
        })
        .collect()
}

/// Build the stamp table from flags and config. `--no-stamp` or a disabled
/// config section yields an empty table, so any `{KEY}` reference becomes a
/// hard failure rather than a silent literal.
pub fn build_stamps(root: &Path, config: &Config, flags: &StampFlags) -> anyhow::Result<StampTable> {
    if flags.no_stamp || !config.stamp.enabled {
        return Ok(StampTable::empty());
    }
    let files: Vec<PathBuf> = if !flags.stamp_files.is_empty() {
        flags.stamp_files.clone()
    } else {
        config
            .stamp
            .files
            .iter()
            .map(|f| if f.is_absolute() { f.clone() } else { root.join(f) })
            .collect()
    };
    StampTable::load(&files, root).context("failed to load stamp files")
}

/// Assemble a `ResolveRequest` from flags and config defaults.
pub fn build_request(
    config: &Config,
    flags: &ResolveFlags,
    output: PathBuf,
) -> anyhow::Result<ResolveRequest> {
    let images: ImageMap = match &flags.images {
        Some(path) => image::load_image_map(path)
            .with_context(|| format!("failed to load image map {}", path.display()))?,
        None => Vec::new(),
    };

    // Config substitutions first, CLI pairs after: last insert wins.
    let mut substitutions: Vec<(String, String)> = config
        .substitutions
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    substitutions.extend(parse_set(&flags.set)?);

    Ok(ResolveRequest {
        template: flags.template.clone(),
        output,
        images,
        substitutions,
        image_chroot: flags.image_chroot.clone().or(config.image_chroot.clone()),
    })
}

/// Merge target flags over config defaults and stamp the result.
pub fn build_target(
    config: &Config,
    flags: &TargetFlags,
    stamps: &StampTable,
) -> anyhow::Result<DeploymentTarget> {
    let spec = TargetSpec {
        cluster: flags.cluster.clone().or(config.target.cluster.clone()),
        context: flags.context.clone().or(config.target.context.clone()),
        namespace: flags.namespace.clone().or(config.target.namespace.clone()),
        user: flags.user.clone().or(config.target.user.clone()),
        kubeconfig: flags.kubeconfig.clone().or(config.target.kubeconfig.clone()),
    };
    DeploymentTarget::resolve(&spec, stamps).context("failed to resolve deployment target")
}

/// Explicit kubectl path: flag wins over config.
pub fn kubectl_override(config: &Config, flags: &TargetFlags) -> Option<PathBuf> {
    flags.kubectl.clone().or(config.kubectl.clone())
}
