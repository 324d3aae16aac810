//! Compositor: links independently written fragments into one class per
//! pipeline stage.
//!
//! Stages run in pipeline order (cpu, vertex, geometry, pixel, gpu); the cpu
//! stage "outputs" the vertex definitions and the gpu stage "inputs" the
//! render targets. Every fragment field is resolved against, in order:
//! an earlier fragment's output, the previous stage's outputs, hardware
//! built-ins, app built-ins, material properties and specialization constants.
//! The result is a generated class per stage whose `[EntryPoint] Main`
//! instantiates every fragment, copies its inputs, calls its `Main` and
//! copies the stage outputs back out.
//!
//! Compute fragments composite on their own into a single compute stage.

mod callback;
mod generate;
mod linking;

#[cfg(test)]
mod compositor_tests;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tessera_core::{
    Attribute, AttributeList, ClassDecl, FieldKey, Project, SourceEntry, SourcePrinter, Span,
    TypeRef,
};
use tessera_ir::{FragmentType, Library, TemplateResolver, TypeMeta};

pub use callback::CompositorCallbackData;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::settings::Settings;
use linking::{AttachmentKind, CompositeInfo, StageLinking};

/// How a fragment field receives its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LinkedFieldType {
    /// Nothing provides the field; it keeps its default value.
    None,
    /// Output of an earlier fragment in the same stage.
    Fragment,
    /// Output of a previous stage.
    Stage,
    HardwareBuiltIn,
    AppBuiltIn,
    /// Material data, mangled per owning fragment.
    Property,
    SpecConstant,
}

/// Fragments to link and how.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShaderDefinition {
    pub name: String,
    /// Fragment class names, in execution order.
    pub fragments: Vec<String>,
    /// Appended to every generated stage class.
    pub extra_attributes: Vec<Attribute>,
    /// Overrides the compute fragment's local size.
    pub compute: Option<ComputeProperties>,
}

impl ShaderDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragments.push(fragment.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ComputeProperties {
    pub local_size_x: u32,
    pub local_size_y: u32,
    pub local_size_z: u32,
}

impl Default for ComputeProperties {
    fn default() -> Self {
        Self {
            local_size_x: 1,
            local_size_y: 1,
            local_size_z: 1,
        }
    }
}

/// How one fragment field was linked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescription {
    pub field: String,
    pub ty: String,
    pub linked: LinkedFieldType,
    /// Field the value comes from: `Owner.Field` for fragment and stage
    /// outputs, the built-in or uniform name otherwise.
    pub dependency: Option<String>,
    /// Mangled name of property and spec constant inputs.
    pub property_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentDescription {
    pub fragment: String,
    pub fields: Vec<FieldDescription>,
}

/// One generated stage of a composite.
#[derive(Debug, Clone, Serialize)]
pub struct ShaderStageDescription {
    pub stage: FragmentType,
    pub class_name: String,
    pub source_text: String,
    #[serde(skip)]
    pub declarations: Vec<ClassDecl>,
    pub fragment_descriptions: Vec<FragmentDescription>,
}

impl ShaderStageDescription {
    pub fn fragment(&self, name: &str) -> Option<&FragmentDescription> {
        self.fragment_descriptions.iter().find(|f| f.fragment == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompositeShader {
    pub name: String,
    pub stages: Vec<ShaderStageDescription>,
}

impl CompositeShader {
    pub fn stage(&self, stage: FragmentType) -> Option<&ShaderStageDescription> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// All generated classes as one project, ready for translation against
    /// the fragments' library.
    pub fn project(&self) -> Project {
        let mut project = Project::new(self.name.clone());
        for stage in &self.stages {
            let mut source = SourceEntry::new(stage.class_name.clone(), stage.source_text.clone());
            for decl in &stage.declarations {
                source = source.with_type(decl.clone());
            }
            project = project.with_source(source);
        }
        project
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositorError {
    #[error("fragment `{0}` is not a class of the library")]
    UnknownFragment(String),
    #[error("composite `{0}` has no fragments")]
    NoFragments(String),
    #[error("the {0} stage is not supported by the configured capabilities")]
    UnsupportedStage(&'static str),
    #[error("composite has no {0} fragment")]
    MissingStage(&'static str),
    #[error("fragment `{0}` has no `Main` function")]
    MissingMain(String),
    #[error("geometry shader stage only supports one fragment at a time")]
    DuplicateGeometryFragment,
    #[error("`{fragment}.{field}` declares a hardware built-in with the wrong type")]
    IncompatibleBuiltIn { fragment: String, field: String },
    #[error("`{fragment}.{field}` has no source in the {stage} stage")]
    UnresolvedInput {
        fragment: String,
        field: String,
        stage: &'static str,
    },
    #[error("the {stage} stage never writes `{field}`")]
    MissingRequiredOutput { stage: &'static str, field: String },
}

/// A fragment class as the compositor sees it.
#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    pub meta: TypeMeta,
    pub has_main: bool,
    /// Fields of opaque types (images, samplers) that can only be bound,
    /// never copied.
    pub non_copyable: Vec<String>,
    pub geometry: Option<GeometryFragment>,
}

impl Fragment {
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn type_ref(&self) -> TypeRef {
        TypeRef::named(self.meta.name.clone())
    }
}

/// Stream types of a geometry fragment's `Main(input, output)`.
#[derive(Debug, Clone)]
pub(crate) struct GeometryFragment {
    pub input_stream: TypeRef,
    pub output_stream: TypeRef,
    pub input_vertex: Box<Fragment>,
    pub output_vertex: Box<Fragment>,
    pub input_size: u32,
    pub max_vertices: i64,
}

pub struct Compositor<'a> {
    settings: &'a Settings,
    lib: &'a Library,
}

impl<'a> Compositor<'a> {
    /// `lib` holds the translated fragment classes (its dependencies are
    /// searched too).
    pub fn new(settings: &'a Settings, lib: &'a Library) -> Self {
        Self { settings, lib }
    }

    pub fn composite(
        &self,
        def: &ShaderDefinition,
        diag: &mut Diagnostics,
    ) -> Result<CompositeShader, CompositorError> {
        let fragments = self.load_fragments(def, diag)?;
        let result = if fragments.iter().any(|f| f.meta.fragment_type == FragmentType::Compute) {
            self.composite_compute(def, fragments, diag)
        } else {
            self.composite_pipeline(def, fragments, diag)
        };
        match &result {
            Ok(shader) => log::debug!(
                "composited '{}': {}",
                shader.name,
                shader.stages.iter().map(|s| s.class_name.as_str()).collect::<Vec<_>>().join(", ")
            ),
            Err(err) => log::debug!("compositing '{}' failed: {err}", def.name),
        }
        result
    }

    fn composite_pipeline(
        &self,
        def: &ShaderDefinition,
        fragments: Vec<Fragment>,
        diag: &mut Diagnostics,
    ) -> Result<CompositeShader, CompositorError> {
        let mut info = CompositeInfo::pipeline(fragments);
        self.validate_stages(&info, diag)?;

        info.collect_expected_outputs(self.settings);
        for index in 1..info.stages.len() - 1 {
            self.resolve_inputs(&mut info, index, diag)?;
        }
        info.resolve_gpu_stage(self.settings);
        info.resolve_stage_link_order(self.settings);

        let mut stages = Vec::new();
        for index in 1..info.stages.len() - 1 {
            self.run_callback(&mut info.stages[index]);
            if info.stages[index].stage == FragmentType::Vertex {
                self.require_position(&info.stages[index], diag)?;
            }
            stages.push(self.generate(def, &info.stages[index]));
        }
        Ok(CompositeShader {
            name: def.name.clone(),
            stages,
        })
    }

    fn composite_compute(
        &self,
        def: &ShaderDefinition,
        fragments: Vec<Fragment>,
        diag: &mut Diagnostics,
    ) -> Result<CompositeShader, CompositorError> {
        let other = fragments.iter().find(|f| f.meta.fragment_type != FragmentType::Compute);
        if let Some(other) = other {
            let stage = other.meta.fragment_type.name();
            diag.report(DiagnosticKind::UnsupportedStage, other.meta.span)
                .message(format!("`{}` is a {stage} fragment in a compute composite", other.name()))
                .emit();
            return Err(CompositorError::UnsupportedStage(stage));
        }
        let mut info = CompositeInfo::compute(fragments);
        self.validate_stages(&info, diag)?;
        self.resolve_inputs(&mut info, 1, diag)?;
        self.run_callback(&mut info.stages[1]);
        let stage = self.generate(def, &info.stages[1]);
        Ok(CompositeShader {
            name: def.name.clone(),
            stages: vec![stage],
        })
    }

    // ========================================================================
    // Fragments
    // ========================================================================

    fn load_fragments(
        &self,
        def: &ShaderDefinition,
        diag: &mut Diagnostics,
    ) -> Result<Vec<Fragment>, CompositorError> {
        let mut fragments = Vec::new();
        for name in &def.fragments {
            let Some(fragment) = self.load_class(name) else {
                diag.report(DiagnosticKind::UnresolvedSymbol, Span::default())
                    .message(name.clone())
                    .emit();
                return Err(CompositorError::UnknownFragment(name.clone()));
            };
            if fragment.meta.fragment_type == FragmentType::None {
                log::warn!("`{name}` has no stage attribute and is skipped");
                continue;
            }
            let fragment = if fragment.meta.fragment_type == FragmentType::Geometry {
                self.load_geometry(fragment)
            } else {
                fragment
            };
            fragments.push(fragment);
        }
        if fragments.is_empty() {
            diag.report(DiagnosticKind::MissingStage, Span::default())
                .message(format!("composite `{}` has no fragments", def.name))
                .emit();
            return Err(CompositorError::NoFragments(def.name.clone()));
        }
        Ok(fragments)
    }

    fn load_class(&self, name: &str) -> Option<Fragment> {
        let ty = self.lib.find_type(name, true)?;
        let meta = self.lib.type_meta(ty)?.clone();
        let non_copyable = meta
            .fields
            .iter()
            .filter(|f| {
                self.lib
                    .find_type(&f.ty.to_string(), true)
                    .is_some_and(|t| self.lib.ty(t).non_copyable)
            })
            .map(|f| f.name.clone())
            .collect();
        Some(Fragment {
            meta,
            has_main: self.lib.ty(ty).has_main,
            non_copyable,
            geometry: None,
        })
    }

    /// Resolves `Main(input : XInput[In], output : XOutput[Out])`. A
    /// malformed signature leaves the fragment without `Main`.
    fn load_geometry(&self, mut fragment: Fragment) -> Fragment {
        let names = &self.settings.names;
        let main = fragment.meta.functions.iter().find(|f| f.key.name == names.main_function);
        let geometry = main.and_then(|main| {
            let [input, output] = &main.key.params[..] else {
                return None;
            };
            let input_size = match self.lib.find_template_resolver(&input.name)? {
                TemplateResolver::InputStream(primitive) => primitive.size(),
                _ => return None,
            };
            let output_primitive = match self.lib.find_template_resolver(&output.name)? {
                TemplateResolver::OutputStream(primitive) => primitive,
                _ => return None,
            };
            let input_vertex = self.load_class(&input.type_arg(0)?.to_string())?;
            let output_vertex = self.load_class(&output.type_arg(0)?.to_string())?;
            let max_vertices = fragment
                .meta
                .attributes
                .find_attribute(&names.geometry)
                .and_then(|a| a.int_param(&names.max_vertices_param, 0))
                .unwrap_or_else(|| i64::from(output_primitive.size()));
            Some(GeometryFragment {
                input_stream: input.clone(),
                output_stream: output.clone(),
                input_vertex: Box::new(input_vertex),
                output_vertex: Box::new(output_vertex),
                input_size,
                max_vertices,
            })
        });
        if geometry.is_none() {
            fragment.has_main = false;
        }
        fragment.geometry = geometry;
        fragment
    }

    // ========================================================================
    // Validation
    // ========================================================================

    fn validate_stages(
        &self,
        info: &CompositeInfo,
        diag: &mut Diagnostics,
    ) -> Result<(), CompositorError> {
        for stage in &info.stages {
            let Some(first) = stage.fragments.first() else {
                continue;
            };
            if !self.settings.capabilities.contains(stage.stage.stage()) {
                diag.report(DiagnosticKind::UnsupportedStage, first.meta.span)
                    .message(format!(
                        "the {} stage is disabled in the settings",
                        stage.stage.name()
                    ))
                    .emit();
                return Err(CompositorError::UnsupportedStage(stage.stage.name()));
            }
            for fragment in &stage.fragments {
                if fragment.has_main {
                    continue;
                }
                let message = if stage.stage == FragmentType::Geometry {
                    format!(
                        "geometry fragment `{}` must have a `Main` of signature \
                         (InputStream, OutputStream)",
                        fragment.name()
                    )
                } else {
                    format!(
                        "fragment `{}` must have a function of signature `Main()`",
                        fragment.name()
                    )
                };
                diag.report(DiagnosticKind::MissingFragmentMain, fragment.meta.span)
                    .message(message)
                    .emit();
                return Err(CompositorError::MissingMain(fragment.name().to_string()));
            }
            if stage.stage == FragmentType::Geometry && stage.fragments.len() > 1 {
                let second = stage.fragments[1].meta.span;
                diag.report(DiagnosticKind::DuplicateGeometryFragment, second)
                    .related_to(
                        format!("`{}` is the first geometry fragment", first.name()),
                        first.meta.span,
                    )
                    .emit();
                return Err(CompositorError::DuplicateGeometryFragment);
            }
        }
        if info.is_pipeline() {
            let vertex = info.stages.iter().find(|s| s.stage == FragmentType::Vertex);
            if vertex.is_none_or(|s| s.fragments.is_empty()) {
                diag.report(DiagnosticKind::MissingStage, Span::default())
                    .message("a composite needs at least one vertex fragment")
                    .emit();
                return Err(CompositorError::MissingStage("Vertex"));
            }
        }
        Ok(())
    }

    /// The vertex stage has to write the hardware position, either from a
    /// fragment or through the composite callback.
    fn require_position(
        &self,
        stage: &StageLinking,
        diag: &mut Diagnostics,
    ) -> Result<(), CompositorError> {
        let Some(built_ins) = self.settings.built_ins.stage(FragmentType::Vertex) else {
            return Ok(());
        };
        let Some(position) = built_ins
            .output_block
            .iter()
            .chain(&built_ins.output_globals)
            .find(|f| f.built_in == crate::settings::HardwareBuiltIn::Position)
        else {
            return Ok(());
        };
        let key = position.key();
        if stage.vertex.hardware_outputs.contains(&key) {
            return Ok(());
        }
        let span = stage.fragments.first().map(|f| f.meta.span).unwrap_or_default();
        diag.report(DiagnosticKind::MissingRequiredOutput, span)
            .message(format!("no vertex fragment writes `{key}`"))
            .emit();
        Err(CompositorError::MissingRequiredOutput {
            stage: FragmentType::Vertex.name(),
            field: key.to_string(),
        })
    }

    fn run_callback(&self, stage: &mut StageLinking) {
        let Some(callback) = self.settings.callbacks.composite.clone() else {
            return;
        };
        let mut data = CompositorCallbackData::new(self.settings, stage);
        callback(&mut data);
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    fn resolve_inputs(
        &self,
        info: &mut CompositeInfo,
        index: usize,
        diag: &mut Diagnostics,
    ) -> Result<(), CompositorError> {
        for kind in [AttachmentKind::Vertex, AttachmentKind::Primitive] {
            if let Err((fragment_span, err)) = info.link(self.settings, index, kind) {
                diag.report(error_kind(&err), fragment_span).message(err.to_string()).emit();
                return Err(err);
            }
        }
        Ok(())
    }

    fn generate(&self, def: &ShaderDefinition, stage: &StageLinking) -> ShaderStageDescription {
        let declarations = generate::generate_stage(self.settings, def, stage);
        let source_text = SourcePrinter::new().classes(&declarations).dump();
        let class_name = format!("{}_{}", def.name, stage.stage.name());
        log::trace!("generated {class_name}:\n{source_text}");
        ShaderStageDescription {
            stage: stage.stage,
            class_name,
            source_text,
            declarations,
            fragment_descriptions: stage.fragment_descriptions(),
        }
    }
}

fn error_kind(err: &CompositorError) -> DiagnosticKind {
    match err {
        CompositorError::IncompatibleBuiltIn { .. } => DiagnosticKind::DuplicateHardwareBuiltIn,
        CompositorError::UnresolvedInput { .. } => DiagnosticKind::UnresolvedFieldInput,
        CompositorError::MissingRequiredOutput { .. } => DiagnosticKind::MissingRequiredOutput,
        CompositorError::MissingMain(_) => DiagnosticKind::MissingFragmentMain,
        CompositorError::DuplicateGeometryFragment => DiagnosticKind::DuplicateGeometryFragment,
        CompositorError::UnsupportedStage(_) => DiagnosticKind::UnsupportedStage,
        CompositorError::UnknownFragment(_) => DiagnosticKind::UnresolvedSymbol,
        CompositorError::NoFragments(_) | CompositorError::MissingStage(_) => {
            DiagnosticKind::MissingStage
        }
    }
}

/// `{Owner}_{Field}`: the mangled name of a property or spec constant input.
pub fn property_name(field: &str, owner: &str) -> String {
    format!("{owner}_{field}")
}

/// `Stage_{Name}_{Type}`: the composite field carrying a stage in/out.
pub(crate) fn stage_field_name(in_out_name: &str, ty: &TypeRef) -> String {
    let ty: String = ty.to_string().chars().filter(char::is_ascii_alphanumeric).collect();
    format!("Stage_{in_out_name}_{ty}")
}

/// Local variable holding a fragment instance: the type name with a
/// lowercased first letter.
pub(crate) fn fragment_var_name(type_name: &str) -> String {
    let mut chars = type_name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn field_key(name: &str, ty: &TypeRef) -> FieldKey {
    FieldKey::new(name, ty.to_string())
}

pub(crate) type FieldMap<V> = IndexMap<FieldKey, V>;
