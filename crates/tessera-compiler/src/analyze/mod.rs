//! Whole-program checks over the syntax tree.
//!
//! Runs before translation:
//! - **Call graph**: symbol → referenced symbols, in source order
//! - **Cycles**: recursion is rejected since shader stages have no call stack
//! - **Stages**: stage requirements propagate through references; crossing
//!   from one hardware stage into another is reported

mod call_graph;
mod cycles;
mod stages;

#[cfg(test)]
mod call_graph_tests;
#[cfg(test)]
mod stages_tests;

pub use call_graph::{CallEdge, CallGraph, SymbolNode};
pub use cycles::detect_recursion;
pub use stages::{StageRequirements, gather_stage_requirements};

use tessera_core::Project;
use tessera_ir::Module;

use crate::diagnostics::Diagnostics;
use crate::settings::NameSettings;

#[derive(Debug, Clone)]
pub struct Analysis {
    pub call_graph: CallGraph,
    pub stages: StageRequirements,
    pub has_recursion: bool,
}

/// Builds the call graph and runs both checks, reporting into `diag`.
pub fn analyze(
    project: &Project,
    names: &NameSettings,
    deps: &Module,
    diag: &mut Diagnostics,
) -> Analysis {
    let call_graph = CallGraph::build(project);
    let has_recursion = detect_recursion(&call_graph, diag);
    let stages = gather_stage_requirements(project, &call_graph, names, deps, diag);
    Analysis {
        call_graph,
        stages,
        has_recursion,
    }
}
