//! Recursion detection over the call graph.
//!
//! Shader stages have no call stack, so any cycle is an error. Each cycle is
//! reported once, at the symbol where the walk re-entered it, with one note
//! per call in the chain.

use indexmap::IndexSet;
use tessera_ir::StageSymbol;

use super::call_graph::CallGraph;
use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// Reports every cycle reachable in `graph`. Returns whether any was found.
pub fn detect_recursion(graph: &CallGraph, diag: &mut Diagnostics) -> bool {
    let mut detector = CycleDetector {
        graph,
        processed: IndexSet::new(),
        stack: IndexSet::new(),
        found: false,
    };
    for symbol in graph.symbols() {
        detector.visit(symbol, diag);
    }
    detector.found
}

struct CycleDetector<'a> {
    graph: &'a CallGraph,
    processed: IndexSet<&'a StageSymbol>,
    /// Current DFS path, in call order.
    stack: IndexSet<&'a StageSymbol>,
    found: bool,
}

impl<'a> CycleDetector<'a> {
    fn visit(&mut self, symbol: &'a StageSymbol, diag: &mut Diagnostics) {
        if self.processed.contains(symbol) {
            return;
        }
        self.stack.insert(symbol);

        for edge in self.graph.internal_edges(symbol) {
            if let Some(start) = self.stack.get_index_of(&edge.callee) {
                self.report(start, diag);
                continue;
            }
            self.visit(&edge.callee, diag);
        }

        self.stack.pop();
        self.processed.insert(symbol);
    }

    /// Reports the cycle formed by `stack[start..]` plus the closing edge back to `stack[start]`.
    fn report(&mut self, start: usize, diag: &mut Diagnostics) {
        self.found = true;
        let chain: Vec<&StageSymbol> = self.stack.iter().skip(start).copied().collect();
        let head = chain[0];
        let Some(head_node) = self.graph.node(head) else {
            return;
        };

        let mut builder = diag
            .report(DiagnosticKind::RecursionDetected, head_node.span)
            .message(head.to_string());
        for (i, caller) in chain.iter().enumerate() {
            let callee = chain.get(i + 1).copied().unwrap_or(head);
            let span = self
                .graph
                .internal_edges(caller)
                .find(|e| &e.callee == callee)
                .map(|e| e.span)
                .unwrap_or(head_node.span);
            let note = if i + 1 == chain.len() {
                format!("`{caller}` calls `{callee}` (completing cycle)")
            } else {
                format!("`{caller}` calls `{callee}`")
            };
            builder = builder.related_to(note, span);
        }
        builder.emit();
    }
}
