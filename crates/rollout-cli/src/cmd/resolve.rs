use crate::cmd::args::{self, ResolveFlags};
use crate::output::print_json;
use anyhow::Context;
use rollout_core::config::Config;
use rollout_core::{paths, pipeline};
use std::path::{Path, PathBuf};

pub fn run(
    root: &Path,
    flags: ResolveFlags,
    output: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load rollout.yaml")?;
    let stamps = args::build_stamps(root, &config, &flags.stamp)?;

    let output = output.unwrap_or_else(|| paths::default_output_path(&flags.template));
    let request = args::build_request(&config, &flags, output)?;
    let resolved = pipeline::resolve(&request, &stamps)
        .with_context(|| format!("failed to resolve {}", request.template.display()))?;

    if json {
        print_json(&serde_json::json!({
            "output": resolved.output,
            "audit": resolved.audit,
            "findings": resolved.findings,
        }))?;
    } else {
        println!("Resolved: {}", resolved.output.display());
        for finding in &resolved.findings {
            eprintln!("warning: {finding}");
        }
    }
    Ok(())
}
