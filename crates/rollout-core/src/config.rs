use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// StampConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampConfig {
    #[serde(default = "default_stamp_enabled")]
    pub enabled: bool,
    /// Workspace-status files, in merge order. Empty means the canonical
    /// stable/volatile pair under the project root.
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

fn default_stamp_enabled() -> bool {
    true
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            enabled: default_stamp_enabled(),
            files: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// TargetConfig
// ---------------------------------------------------------------------------

/// Default target fields applied when the matching CLI flag is absent.
/// Values may contain `{KEY}` stamp references.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Explicit cluster CLI path. When unset, ROLLOUT_KUBECTL and then PATH
    /// are consulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubectl: Option<PathBuf>,
    #[serde(default)]
    pub stamp: StampConfig,
    #[serde(default)]
    pub target: TargetConfig,
    /// Registry prefix applied to every resolved image name. May contain
    /// `{KEY}` stamp references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_chroot: Option<String>,
    /// Default substitutions merged under CLI-supplied ones.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub substitutions: BTreeMap<String, String>,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            kubectl: None,
            stamp: StampConfig::default(),
            target: TargetConfig::default(),
            image_chroot: None,
            substitutions: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load `rollout.yaml` from `root`. A missing file yields defaults; this
    /// tool has no mandatory init step.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, root: &Path) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if let Some(kubectl) = &self.kubectl {
            if !kubectl.exists() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "configured kubectl '{}' does not exist",
                        kubectl.display()
                    ),
                });
            }
        }

        for file in &self.stamp.files {
            if file.as_os_str().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: "empty entry in stamp.files".to_string(),
                });
            } else if !root.join(file).exists() && !file.exists() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("stamp file '{}' does not exist", file.display()),
                });
            }
        }

        if !self.stamp.enabled {
            let stamped_fields = [
                &self.target.cluster,
                &self.target.context,
                &self.target.namespace,
                &self.target.user,
                &self.image_chroot,
            ];
            if stamped_fields
                .iter()
                .any(|f| f.as_deref().is_some_and(crate::stamp::needs_stamping))
            {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: "stamping is disabled but a target field contains '{...}'"
                        .to_string(),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
