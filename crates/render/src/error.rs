/// Errors from dispatch planning and kernel setup.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("kernel `{name}` not found in compute program")]
    KernelNotFound { name: String },
    #[error("entry point `{name}` is not a compute kernel")]
    NotCompute { name: String },
    #[error("shader parse error:\n{0}")]
    ShaderParse(String),
    #[error("shader validation error: {0}")]
    ShaderValidation(String),
    #[error("binding {binding} does not match the dispatch layout: {reason}")]
    BindingMismatch { binding: u32, reason: String },
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
