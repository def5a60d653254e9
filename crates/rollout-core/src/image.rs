//! Image reference resolution: logical tag → content-addressed descriptor.
//!
//! Each image build output is flattened into a single `--image_spec=` argument
//! consumable by a downstream resolver. Fields join with `;`, multi-value
//! fields join with `,`; both are reserved delimiters, chosen to avoid
//! ambiguity with argument termination.

use crate::error::{Result, RolloutError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Joins values within one multi-value field.
const VALUE_DELIMITER: &str = ",";
/// Joins `key=value` fields within one image spec.
const FIELD_DELIMITER: &str = ";";

// ---------------------------------------------------------------------------
// ImageArtifact (collaborator contract)
// ---------------------------------------------------------------------------

/// Build outputs for one image, as supplied by the image layer provider:
/// an optional legacy tarball, zero-or-more digest files, diff-id files,
/// compressed layer blobs, uncompressed layer blobs, and exactly one config
/// blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tarball: Option<PathBuf>,
    #[serde(default)]
    pub digests: Vec<PathBuf>,
    #[serde(default)]
    pub diff_ids: Vec<PathBuf>,
    #[serde(default)]
    pub compressed_layers: Vec<PathBuf>,
    #[serde(default)]
    pub uncompressed_layers: Vec<PathBuf>,
    pub config: PathBuf,
}

/// Ordered image map: logical tag → build artifact. YAML mapping order is
/// preserved so output order is the caller's input order.
pub type ImageMap = Vec<(String, ImageArtifact)>;

/// Load an image map from a YAML file of `tag: artifact` entries.
pub fn load_image_map(path: &Path) -> Result<ImageMap> {
    let text = std::fs::read_to_string(path)?;
    parse_image_map(&text)
}

pub fn parse_image_map(text: &str) -> Result<ImageMap> {
    let value: serde_yaml::Value = serde_yaml::from_str(text)?;
    let mapping = match value {
        serde_yaml::Value::Mapping(m) => m,
        serde_yaml::Value::Null => return Ok(Vec::new()),
        _ => {
            return Err(RolloutError::InvalidImageArtifact {
                tag: "<root>".to_string(),
                reason: "image map must be a YAML mapping of tag to artifact".to_string(),
            })
        }
    };
    let mut entries = Vec::with_capacity(mapping.len());
    for (key, val) in mapping {
        let tag = key
            .as_str()
            .ok_or_else(|| RolloutError::InvalidImageArtifact {
                tag: "<root>".to_string(),
                reason: "image tag keys must be strings".to_string(),
            })?
            .to_string();
        let artifact: ImageArtifact =
            serde_yaml::from_value(val).map_err(|e| RolloutError::InvalidImageArtifact {
                tag: tag.clone(),
                reason: e.to_string(),
            })?;
        entries.push((tag, artifact));
    }
    Ok(entries)
}

// ---------------------------------------------------------------------------
// ImageReference
// ---------------------------------------------------------------------------

/// A resolved, content-addressed image descriptor. Immutable after
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReference {
    pub logical_tag: String,
    pub legacy_tarball: Option<PathBuf>,
    pub digests: Vec<String>,
    pub diff_ids: Vec<String>,
    pub compressed_layers: Vec<PathBuf>,
    pub uncompressed_layers: Vec<PathBuf>,
    pub config_blob: PathBuf,
}

impl ImageReference {
    /// Flatten the reference into a single spec string. `tarball` is omitted
    /// entirely when absent; empty multi-value fields are omitted rather than
    /// emitted as empty values.
    pub fn flat_spec(&self) -> String {
        let mut fields: Vec<String> = Vec::with_capacity(7);
        fields.push(format!("name={}", self.logical_tag));
        if let Some(tarball) = &self.legacy_tarball {
            fields.push(format!("tarball={}", tarball.display()));
        }
        if !self.digests.is_empty() {
            fields.push(format!("digest={}", self.digests.join(VALUE_DELIMITER)));
        }
        if !self.diff_ids.is_empty() {
            fields.push(format!("diff_id={}", self.diff_ids.join(VALUE_DELIMITER)));
        }
        if !self.compressed_layers.is_empty() {
            fields.push(format!(
                "compressed_layer={}",
                join_paths(&self.compressed_layers)
            ));
        }
        if !self.uncompressed_layers.is_empty() {
            fields.push(format!(
                "uncompressed_layer={}",
                join_paths(&self.uncompressed_layers)
            ));
        }
        fields.push(format!("config={}", self.config_blob.display()));
        fields.join(FIELD_DELIMITER)
    }

    /// The flat spec in argument form for the downstream resolver.
    pub fn spec_arg(&self) -> String {
        format!("--image_spec={}", self.flat_spec())
    }

    /// Consistency findings on the resolved reference. Resolution itself
    /// never fails on these; consumers decide what to do with them.
    pub fn validate(&self) -> Vec<String> {
        let mut findings = Vec::new();
        if !self.compressed_layers.is_empty()
            && !self.uncompressed_layers.is_empty()
            && self.compressed_layers.len() != self.uncompressed_layers.len()
        {
            findings.push(format!(
                "image '{}': compressed layer count ({}) != uncompressed layer count ({})",
                self.logical_tag,
                self.compressed_layers.len(),
                self.uncompressed_layers.len()
            ));
        }
        if !self.diff_ids.is_empty()
            && !self.uncompressed_layers.is_empty()
            && self.diff_ids.len() != self.uncompressed_layers.len()
        {
            findings.push(format!(
                "image '{}': diff-id count ({}) != uncompressed layer count ({})",
                self.logical_tag,
                self.diff_ids.len(),
                self.uncompressed_layers.len()
            ));
        }
        findings
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(VALUE_DELIMITER)
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve every image map entry into an `ImageReference`, preserving input
/// order. Each tag resolves independently, even when two tags share an
/// underlying artifact. An optional `chroot` prefixes every logical tag.
pub fn resolve_images(images: &ImageMap, chroot: Option<&str>) -> Result<Vec<ImageReference>> {
    images
        .iter()
        .map(|(tag, artifact)| resolve_image(tag, artifact, chroot))
        .collect()
}

fn resolve_image(
    tag: &str,
    artifact: &ImageArtifact,
    chroot: Option<&str>,
) -> Result<ImageReference> {
    let logical_tag = match chroot {
        Some(chroot) if !chroot.is_empty() => format!("{chroot}/{tag}"),
        _ => tag.to_string(),
    };

    let digests = if artifact.digests.is_empty() {
        // No digest file from the provider: content-address the config blob.
        vec![sha256_digest(tag, &artifact.config)?]
    } else {
        read_hash_files(tag, &artifact.digests)?
    };
    let diff_ids = read_hash_files(tag, &artifact.diff_ids)?;

    Ok(ImageReference {
        logical_tag,
        legacy_tarball: artifact.tarball.clone(),
        digests,
        diff_ids,
        compressed_layers: artifact.compressed_layers.clone(),
        uncompressed_layers: artifact.uncompressed_layers.clone(),
        config_blob: artifact.config.clone(),
    })
}

/// Read each hash file's trimmed contents (e.g. `sha256:abc…`).
fn read_hash_files(tag: &str, files: &[PathBuf]) -> Result<Vec<String>> {
    files
        .iter()
        .map(|file| {
            let content =
                std::fs::read_to_string(file).map_err(|e| RolloutError::InvalidImageArtifact {
                    tag: tag.to_string(),
                    reason: format!("unreadable hash file {}: {e}", file.display()),
                })?;
            let hash = content.trim().to_string();
            if hash.is_empty() {
                return Err(RolloutError::InvalidImageArtifact {
                    tag: tag.to_string(),
                    reason: format!("empty hash file {}", file.display()),
                });
            }
            Ok(hash)
        })
        .collect()
}

fn sha256_digest(tag: &str, blob: &Path) -> Result<String> {
    let data = std::fs::read(blob).map_err(|e| RolloutError::InvalidImageArtifact {
        tag: tag.to_string(),
        reason: format!("unreadable config blob {}: {e}", blob.display()),
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}
