use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("module length {0} is not a multiple of 4")]
    Truncated(usize),
    #[error("invalid SPIR-V: {0}")]
    InvalidBinary(String),
    #[error("SPIR-V validation failed: {0}")]
    Validation(String),
    #[error("specialization constants could not be frozen: {0}")]
    SpecConstants(String),
    #[error("GLSL generation failed: {0}")]
    Glsl(String),
    #[error("the {0} stage has no GLSL translation")]
    UnsupportedStage(&'static str),
    #[error("module has no {0} entry point")]
    MissingEntryPoint(&'static str),
    #[error("unknown GLSL version `{0}`")]
    UnknownVersion(String),
}

/// A pass rejected its input; `log` is the tool's message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{pass} failed: {log}")]
pub struct PassError {
    pub pass: &'static str,
    pub log: String,
}

impl PassError {
    pub fn new(pass: &'static str, log: impl Into<String>) -> Self {
        Self { pass, log: log.into() }
    }
}
