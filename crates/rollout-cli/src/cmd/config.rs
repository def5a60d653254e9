use crate::output::{print_json, print_kv};
use anyhow::Context;
use clap::Subcommand;
use rollout_core::config::{Config, WarnLevel};
use rollout_core::dispatch::KubeCli;
use rollout_core::paths;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Validate rollout.yaml and report tool availability
    Check,

    /// Show the effective configuration
    Show,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Check => check(root, json),
        ConfigSubcommand::Show => show(root, json),
    }
}

fn check(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load rollout.yaml")?;
    let warnings = config.validate(root);

    let kubectl = match KubeCli::locate(config.kubectl.as_deref()) {
        Ok(cli) => cli.program().display().to_string(),
        Err(e) => format!("not found ({e})"),
    };
    let default_kubeconfig = home::home_dir()
        .map(|h| h.join(".kube/config"))
        .filter(|p| p.exists());
    let stamp_defaults_present = paths::default_stamp_files(root)
        .iter()
        .any(|f| f.exists());

    if json {
        print_json(&serde_json::json!({
            "config": paths::config_path(root).exists(),
            "kubectl": kubectl,
            "default_kubeconfig": default_kubeconfig,
            "default_stamp_files": stamp_defaults_present,
            "warnings": warnings,
        }))?;
    } else {
        print_kv(&[
            (
                "config",
                if paths::config_path(root).exists() {
                    paths::config_path(root).display().to_string()
                } else {
                    "absent (defaults in effect)".to_string()
                },
            ),
            ("kubectl", kubectl),
            (
                "kubeconfig",
                default_kubeconfig
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "no ~/.kube/config".to_string()),
            ),
            (
                "stamp files",
                if stamp_defaults_present {
                    "default status files present".to_string()
                } else {
                    "no default status files".to_string()
                },
            ),
        ]);
        for warning in &warnings {
            let prefix = match warning.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            eprintln!("{prefix}: {}", warning.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("configuration has errors");
    }
    Ok(())
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load rollout.yaml")?;
    if json {
        print_json(&config)?;
    } else {
        print!("{}", serde_yaml::to_string(&config)?);
    }
    Ok(())
}
