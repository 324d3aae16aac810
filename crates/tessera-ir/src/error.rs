use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("library '{0}' is translated and can no longer be modified")]
    LibraryLocked(String),

    #[error("dependency library '{0}' must be translated before it is used")]
    DependencyNotTranslated(String),

    #[error("type '{0}' is already defined in library '{1}'")]
    DuplicateType(String, String),

    #[error("{0} belongs to another library")]
    ForeignHandle(String),
}
