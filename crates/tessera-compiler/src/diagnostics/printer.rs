//! Builder-pattern printer for rendering diagnostics.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Patch, Renderer, Snippet};
use tessera_core::{SourceEntry, Span};

use super::Diagnostics;
use super::message::{DiagnosticMessage, Severity};

/// Builder for rendering diagnostics with various options.
///
/// Each diagnostic is rendered against the source entry its span points
/// into. Without sources (or for generated code with no text) the printer
/// falls back to one plain line per diagnostic.
pub struct DiagnosticsPrinter<'d, 's> {
    diagnostics: &'d Diagnostics,
    sources: Option<&'s [SourceEntry]>,
    colored: bool,
}

impl<'d, 's> DiagnosticsPrinter<'d, 's> {
    pub fn new(diagnostics: &'d Diagnostics) -> Self {
        Self {
            diagnostics,
            sources: None,
            colored: false,
        }
    }

    pub fn sources(mut self, sources: &'s [SourceEntry]) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.format(&mut out);
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        for (i, diag) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                w.write_char('\n')?;
            }
            match self.entry_for(diag.span) {
                Some(entry) => self.format_snippet(&renderer, diag, entry, w)?,
                None => write!(w, "{}", diag)?,
            }
        }

        Ok(())
    }

    fn entry_for(&self, span: Span) -> Option<&'s SourceEntry> {
        let entry = self.sources?.get(span.source.index())?;
        if entry.code.is_empty() || span.end as usize > entry.code.len() {
            return None;
        }
        Some(entry)
    }

    fn format_snippet(
        &self,
        renderer: &Renderer,
        diag: &DiagnosticMessage,
        entry: &SourceEntry,
        w: &mut impl Write,
    ) -> std::fmt::Result {
        let source = entry.code.as_str();
        let range = adjust_range(diag.span, source.len());

        let mut snippet = Snippet::source(source)
            .line_start(1)
            .path(entry.origin.as_str())
            .annotation(AnnotationKind::Primary.span(range.clone()).label(&diag.message));

        for related in &diag.related {
            if related.span.source != diag.span.source || related.span.end as usize > source.len() {
                continue;
            }
            snippet = snippet.annotation(
                AnnotationKind::Context
                    .span(adjust_range(related.span, source.len()))
                    .label(&related.message),
            );
        }

        let level = severity_to_level(diag.severity());
        let title_group = level.primary_title(&diag.message).element(snippet);

        let mut report: Vec<Group> = vec![title_group];

        if let Some(fix) = &diag.fix {
            report.push(
                Level::HELP.secondary_title(&fix.description).element(
                    Snippet::source(source)
                        .line_start(1)
                        .path(entry.origin.as_str())
                        .patch(Patch::new(range, &fix.replacement)),
                ),
            );
        }

        write!(w, "{}", renderer.render(&report))
    }
}

fn severity_to_level(severity: Severity) -> Level<'static> {
    match severity {
        Severity::Error => Level::ERROR,
        Severity::Warning => Level::WARNING,
    }
}

fn adjust_range(span: Span, limit: usize) -> std::ops::Range<usize> {
    let range = span.range();
    if range.start == range.end {
        return range.start..(range.start + 1).min(limit);
    }
    range
}

impl Diagnostics {
    pub fn printer(&self) -> DiagnosticsPrinter<'_, '_> {
        DiagnosticsPrinter::new(self)
    }
}
