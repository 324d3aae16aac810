//! Stage-requirement propagation.
//!
//! A symbol's own requirement comes from its class's fragment type and from
//! stage attributes on the symbol itself. Requirements of everything it
//! references are merged in, first cause wins. A symbol that ends up needing
//! two different stages is reported once, where the conflict first appears.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use tessera_core::{Attribute, Project, Span, TypeRef};
use tessera_ir::{Library, Module, ShaderStages, StageRequirementsData, StageSymbol};

use super::call_graph::CallGraph;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::settings::NameSettings;
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct StageRequirements {
    symbols: IndexMap<StageSymbol, StageRequirementsData>,
}

impl StageRequirements {
    pub fn get(&self, symbol: &StageSymbol) -> Option<&StageRequirementsData> {
        self.symbols.get(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StageSymbol, &StageRequirementsData)> {
        self.symbols.iter()
    }

    /// Records every non-empty requirement in `library`.
    pub fn store(&self, library: &mut Library) -> Result<()> {
        for (symbol, data) in &self.symbols {
            if data.is_empty() {
                continue;
            }
            library
                .set_stage_requirements(symbol.clone(), data.clone())
                .map_err(Error::Ir)?;
        }
        Ok(())
    }
}

pub fn gather_stage_requirements(
    project: &Project,
    graph: &CallGraph,
    names: &NameSettings,
    deps: &Module,
    diag: &mut Diagnostics,
) -> StageRequirements {
    let class_stages = project
        .classes()
        .map(|class| {
            let stages = attribute_stages(&class.attributes, names);
            (class.type_ref(), stages)
        })
        .collect();

    let mut gatherer = Gatherer {
        graph,
        names,
        deps,
        class_stages,
        result: StageRequirements::default(),
        in_progress: IndexSet::new(),
    };
    for symbol in graph.symbols() {
        gatherer.compute(symbol, diag);
    }
    gatherer.result
}

fn attribute_stages(attributes: &[Attribute], names: &NameSettings) -> ShaderStages {
    attributes.iter().fold(ShaderStages::empty(), |acc, attr| {
        if attr.name == names.requires_pixel {
            return acc | ShaderStages::PIXEL;
        }
        match names.stage_of(&attr.name) {
            Some(stage) => acc | stage.stage(),
            None => acc,
        }
    })
}

struct Gatherer<'a> {
    graph: &'a CallGraph,
    names: &'a NameSettings,
    deps: &'a Module,
    class_stages: HashMap<TypeRef, ShaderStages>,
    result: StageRequirements,
    in_progress: IndexSet<StageSymbol>,
}

impl Gatherer<'_> {
    fn requirement(&mut self, symbol: &StageSymbol, diag: &mut Diagnostics) -> ShaderStages {
        if self.graph.contains(symbol) {
            return self.compute(symbol, diag);
        }
        self.external(symbol).map(|d| d.required).unwrap_or_default()
    }

    fn external(&self, symbol: &StageSymbol) -> Option<&StageRequirementsData> {
        self.deps.iter().find_map(|lib| lib.stage_requirements(symbol))
    }

    fn lookup(&self, symbol: &StageSymbol) -> Option<&StageRequirementsData> {
        self.result.get(symbol).or_else(|| self.external(symbol))
    }

    fn compute(&mut self, symbol: &StageSymbol, diag: &mut Diagnostics) -> ShaderStages {
        if let Some(done) = self.result.get(symbol) {
            return done.required;
        }
        let graph = self.graph;
        let Some(node) = graph.node(symbol) else {
            return ShaderStages::empty();
        };
        // Cycles are reported separately; a re-entered symbol contributes nothing.
        if !self.in_progress.insert(symbol.clone()) {
            return ShaderStages::empty();
        }

        let own = self.class_stages.get(symbol.owner()).copied().unwrap_or_default()
            | attribute_stages(&node.attributes, self.names);
        let mut data = StageRequirementsData::with_stages(own);

        for edge in &node.edges {
            let stages = self.requirement(&edge.callee, diag);
            if stages.is_empty() {
                continue;
            }
            let current = data.required;
            let merged = current | stages;
            // A dependency that already conflicts was reported where it happened.
            if stages.bits().count_ones() == 1 && !current.is_empty() && merged != current {
                self.report(symbol, current, &edge.callee, stages, edge.span, diag);
            }
            data.combine(&edge.callee, edge.span, stages);
        }

        self.in_progress.shift_remove(symbol);
        let required = data.required;
        self.result.symbols.insert(symbol.clone(), data);
        required
    }

    fn report(
        &self,
        symbol: &StageSymbol,
        required: ShaderStages,
        dependency: &StageSymbol,
        dependency_stages: ShaderStages,
        span: Span,
        diag: &mut Diagnostics,
    ) {
        let message = format!(
            "'{symbol}' requires shader stage {} but references '{dependency}' \
             which requires stage {}",
            required.first_name(),
            dependency_stages.first_name(),
        );
        let mut builder = diag.report(DiagnosticKind::StageMismatch, span).message(message);

        let mut seen = IndexSet::new();
        let mut current = dependency.clone();
        while let Some(data) = self.lookup(&current) {
            let Some(next) = data.dependency.clone() else {
                break;
            };
            if !seen.insert(next.clone()) {
                break;
            }
            let stage = data.required.first_name();
            builder = builder.related_to(
                format!("'{current}' requires stage {stage} through '{next}'"),
                data.call_span,
            );
            current = next;
        }
        builder.emit();
    }
}
