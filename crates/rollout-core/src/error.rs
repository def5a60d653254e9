use thiserror::Error;

#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("unresolved placeholder(s) in template: {0}")]
    UnresolvedPlaceholder(String),

    #[error("undefined stamp key '{{{key}}}' in '{expression}'")]
    UndefinedStampKey { key: String, expression: String },

    #[error(
        "no cluster CLI configured: not given via --kubectl or rollout.yaml, \
         ROLLOUT_KUBECTL is unset, and 'kubectl' was not found on PATH"
    )]
    ToolNotConfigured,

    #[error("cluster operation '{operation}' failed with exit code {code}")]
    ClusterOperationFailed { operation: String, code: i32 },

    #[error("cluster operation '{operation}' terminated by signal")]
    ClusterOperationKilled { operation: String },

    #[error("invalid image artifact for '{tag}': {reason}")]
    InvalidImageArtifact { tag: String, reason: String },

    #[error("invalid deployment target: {0}")]
    InvalidTarget(String),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("stamp file not found: {0}")]
    StampFileNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RolloutError>;
