//! The resolve step: template + image map + stamps + substitutions →
//! resolved manifest file plus audit side-file.
//!
//! All failures here are fail-fast and local: nothing is written unless the
//! whole expansion succeeds, and no cluster contact ever happens from this
//! module.

use crate::error::Result;
use crate::image::{self, ImageMap};
use crate::manifest::{self, AuditRecord};
use crate::stamp::StampTable;
use crate::template::{ManifestTemplate, Substitutions};
use std::path::PathBuf;

/// Substitution key under which the flattened image specs are injected.
const IMAGES_KEY: &str = "images";

/// Inputs for one resolution. Raw values; stamping is applied inside.
#[derive(Debug, Default)]
pub struct ResolveRequest {
    pub template: PathBuf,
    pub output: PathBuf,
    pub images: ImageMap,
    /// Raw `name=value` substitutions; values may contain `{KEY}` stamp
    /// references, resolved eagerly before expansion.
    pub substitutions: Vec<(String, String)>,
    /// Registry prefix for every image name; may contain `{KEY}` references.
    pub image_chroot: Option<String>,
}

#[derive(Debug)]
pub struct Resolved {
    pub output: PathBuf,
    pub audit: PathBuf,
    /// Consistency findings from image resolution (never fatal).
    pub findings: Vec<String>,
}

/// Run the full resolution: images → substitutions → expansion → output.
pub fn resolve(request: &ResolveRequest, stamps: &StampTable) -> Result<Resolved> {
    let template = ManifestTemplate::load(&request.template)?;

    let chroot = request
        .image_chroot
        .as_deref()
        .map(|c| stamps.resolve_if_needed(c))
        .transpose()?;
    let references = image::resolve_images(&request.images, chroot.as_deref())?;

    let mut findings = Vec::new();
    for reference in &references {
        for finding in reference.validate() {
            tracing::warn!("{finding}");
            findings.push(finding);
        }
    }

    let mut substitutions = Substitutions::new();
    if !references.is_empty() {
        let specs: Vec<String> = references.iter().map(|r| r.spec_arg()).collect();
        substitutions.insert(IMAGES_KEY, specs.join(" "));
    }
    for (name, value) in &request.substitutions {
        substitutions.insert_stamped(name.clone(), value, stamps)?;
    }

    let content = template.expand(&substitutions)?;

    tracing::debug!(
        template = %request.template.display(),
        output = %request.output.display(),
        images = references.len(),
        "resolved manifest"
    );

    let audit = AuditRecord::new(&request.template, &request.output, &substitutions);
    let audit_path = manifest::write_resolved(&request.output, &content, &audit)?;

    Ok(Resolved {
        output: request.output.clone(),
        audit: audit_path,
        findings,
    })
}
