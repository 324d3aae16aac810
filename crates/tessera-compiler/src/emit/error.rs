#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("nothing to emit: no entry points were given")]
    NoEntryPoints,

    #[error("type `{0}` has no entry point")]
    NoEntryPoint(String),

    #[error("type `{0}` has no SPIR-V representation")]
    UnemittableType(String),

    #[error("entry points disagree on the replacement for late-bound `{0}`")]
    ConflictingLateBound(String),
}
