use tessera_core::Span;

/// Everything the compiler can complain about, grouped by the pass that
/// reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticKind {
    // Attribute validation
    InvalidAttribute,
    ConflictingAttributes,
    AttributeOutOfRange,
    UnknownHardwareBuiltIn,
    InvalidSpecConstant,
    IgnoredAttribute,

    // Front end
    MissingMain,
    UnresolvedSymbol,
    NotAnLValue,
    Unsupported,

    // Whole-program analyses
    RecursionDetected,
    StageMismatch,

    // Compositor
    UnsupportedStage,
    MissingStage,
    MissingFragmentMain,
    DuplicateGeometryFragment,
    UnresolvedFieldInput,
    DuplicateHardwareBuiltIn,
    MissingRequiredOutput,
}

impl DiagnosticKind {
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::IgnoredAttribute => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Default hint for this kind, automatically included in diagnostics.
    pub fn default_hint(&self) -> Option<&'static str> {
        match self {
            Self::RecursionDetected => Some("shader stages cannot recurse; unroll the call chain"),
            Self::StageMismatch => {
                Some(
                    "move the call into a fragment of the required stage, \
                     or drop the stage attribute",
                )
            }
            Self::MissingRequiredOutput => {
                Some(
                    "write the hardware position from a vertex fragment, \
                     or inject it with a composite callback",
                )
            }
            Self::InvalidSpecConstant => {
                Some("e.g., `[Static][SpecConstant] var Scale : Real = 1.0;`")
            }
            _ => None,
        }
    }

    /// Base message for this diagnostic kind, used when no custom message is provided.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Self::InvalidAttribute => "invalid attribute",
            Self::ConflictingAttributes => "conflicting attributes",
            Self::AttributeOutOfRange => "attribute parameter out of range",
            Self::UnknownHardwareBuiltIn => "unknown hardware built-in",
            Self::InvalidSpecConstant => "invalid specialization constant",
            Self::IgnoredAttribute => "attribute has no effect here",

            Self::MissingMain => "missing `Main` function",
            Self::UnresolvedSymbol => "unresolved symbol",
            Self::NotAnLValue => "expression cannot be assigned to",
            Self::Unsupported => "unsupported construct",

            Self::RecursionDetected => "recursion detected",
            Self::StageMismatch => "shader stage mismatch",

            Self::UnsupportedStage => "shader stage not supported",
            Self::MissingStage => "missing shader stage",
            Self::MissingFragmentMain => "fragment has no `Main` function",
            Self::DuplicateGeometryFragment => {
                "geometry shader stage only supports one fragment at a time"
            }
            Self::UnresolvedFieldInput => "field input has no source",
            Self::DuplicateHardwareBuiltIn => "hardware built-in declared incompatibly",
            Self::MissingRequiredOutput => "required stage output is never written",
        }
    }

    /// Template for custom messages. Contains `{}` placeholder for caller-provided detail.
    pub fn custom_message(&self) -> String {
        match self {
            Self::UnresolvedSymbol => "`{}` could not be resolved".to_string(),
            Self::UnknownHardwareBuiltIn => {
                "`{}` is not a hardware built-in of any stage".to_string()
            }
            Self::MissingMain => "`{}` has no `Main` function".to_string(),
            Self::RecursionDetected => "recursion detected through `{}`".to_string(),

            // The full sentence is built by the caller
            Self::StageMismatch | Self::MissingFragmentMain => "{}".to_string(),

            _ => format!("{}: {{}}", self.fallback_message()),
        }
    }

    /// Render the final message.
    ///
    /// - `None` → returns `fallback_message()`
    /// - `Some(detail)` → returns `custom_message()` with `{}` replaced by detail
    pub fn message(&self, msg: Option<&str>) -> String {
        match msg {
            None => self.fallback_message().to_string(),
            Some(detail) => self.custom_message().replace("{}", detail),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fix {
    pub(crate) replacement: String,
    pub(crate) description: String,
}

impl Fix {
    pub fn new(replacement: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            replacement: replacement.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    pub(crate) span: Span,
    pub(crate) message: String,
}

impl RelatedInfo {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub(crate) kind: DiagnosticKind,
    /// Source entry plus byte range shown to the user.
    pub(crate) span: Span,
    pub(crate) message: String,
    pub(crate) fix: Option<Fix>,
    pub(crate) related: Vec<RelatedInfo>,
    pub(crate) hints: Vec<String>,
}

impl DiagnosticMessage {
    pub(crate) fn new(kind: DiagnosticKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
            fix: None,
            related: Vec::new(),
            hints: kind.default_hint().map(String::from).into_iter().collect(),
        }
    }

    pub(crate) fn with_default_message(kind: DiagnosticKind, span: Span) -> Self {
        Self::new(kind, span, kind.fallback_message())
    }

    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn related(&self) -> impl Iterator<Item = (&str, Span)> {
        self.related.iter().map(|r| (r.message.as_str(), r.span))
    }

    pub fn severity(&self) -> Severity {
        self.kind.default_severity()
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }
}

impl std::fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}: {}",
            self.severity(),
            self.span.start,
            self.span.end,
            self.message
        )?;
        if let Some(fix) = &self.fix {
            write!(f, " (fix: {})", fix.description)?;
        }
        for related in &self.related {
            write!(
                f,
                " (related: {} at {}..{})",
                related.message, related.span.start, related.span.end
            )?;
        }
        for hint in &self.hints {
            write!(f, " (hint: {})", hint)?;
        }
        Ok(())
    }
}
