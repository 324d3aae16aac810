use tessera_core::{SourceEntry, SourceId, Span};

use super::*;

fn span(start: u32, end: u32) -> Span {
    Span::new(SourceId(0), start, end)
}

#[test]
fn severity_display() {
    insta::assert_snapshot!(format!("{}", Severity::Error), @"error");
    insta::assert_snapshot!(format!("{}", Severity::Warning), @"warning");
}

#[test]
fn report_with_default_message() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.report(DiagnosticKind::NotAnLValue, span(0, 5)).emit();

    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics.has_errors());
    assert!(diagnostics.contains(DiagnosticKind::NotAnLValue));
    insta::assert_snapshot!(
        diagnostics.render(),
        @"error at 0..5: expression cannot be assigned to"
    );
}

#[test]
fn report_with_custom_message() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::UnresolvedSymbol, span(3, 9))
        .message("Math.Wobble(Real)")
        .emit();

    insta::assert_snapshot!(
        diagnostics.render(),
        @"error at 3..9: `Math.Wobble(Real)` could not be resolved"
    );
}

#[test]
fn warnings_are_not_errors() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::IgnoredAttribute, span(0, 1))
        .message("`Static` on a constructor")
        .emit();

    assert!(!diagnostics.has_errors());
    assert!(diagnostics.has_warnings());
    assert_eq!(diagnostics.warning_count(), 1);
    assert_eq!(diagnostics.error_count(), 0);
}

#[test]
fn builder_with_related() {
    let sources = vec![SourceEntry::new("demo.tess", "hello world!")];
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::UnresolvedFieldInput, span(0, 5))
        .message("primary")
        .related_to("related info", span(6, 10))
        .emit();

    let result = diagnostics.printer().sources(&sources).render();
    insta::assert_snapshot!(result, @r"
    error: field input has no source: primary
     --> demo.tess:1:1
      |
    1 | hello world!
      | ^^^^^ ---- related info
      | |
      | field input has no source: primary
    ");
}

#[test]
fn plain_fallback_for_generated_code() {
    let sources = vec![SourceEntry::new("generated", "")];
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::RecursionDetected, span(2, 4))
        .message("Walker.Step")
        .related_to("`Walker.Step` calls `Walker.Step` (completing cycle)", span(2, 4))
        .emit();

    let result = diagnostics.printer().sources(&sources).render();
    insta::assert_snapshot!(
        result,
        @"error at 2..4: recursion detected through `Walker.Step` (related: `Walker.Step` calls `Walker.Step` (completing cycle) at 2..4) (hint: shader stages cannot recurse; unroll the call chain)"
    );
}

#[test]
fn extend_merges_in_order() {
    let mut a = Diagnostics::new();
    a.report(DiagnosticKind::MissingStage, span(0, 0)).emit();
    let mut b = Diagnostics::new();
    b.report(DiagnosticKind::StageMismatch, span(1, 2))
        .message("custom")
        .emit();

    a.extend(b);
    let kinds: Vec<_> = a.iter().map(|d| d.kind()).collect();
    assert_eq!(kinds, vec![DiagnosticKind::MissingStage, DiagnosticKind::StageMismatch]);
}
