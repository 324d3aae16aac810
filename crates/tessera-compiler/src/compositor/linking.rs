//! Field resolution across the fragments of one stage and across stages.

use indexmap::{IndexMap, IndexSet};
use tessera_core::{
    Attribute, AttributeList, AttributeParam, AttributeValue, Expr, FieldKey, Span, TypeRef,
};
use tessera_ir::{FieldMeta, FragmentType};

use super::{
    CompositorError, FieldDescription, FieldMap, Fragment, FragmentDescription, LinkedFieldType,
    field_key, property_name, stage_field_name,
};
use crate::settings::{NameSettings, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttachmentKind {
    /// Per-vertex data: every field of vertex and pixel stages, the stream
    /// vertex types of a geometry stage.
    Vertex,
    /// Per-primitive data: the geometry fragment's own fields.
    Primitive,
}

/// Field a linked value is read from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldSource {
    /// Declaring fragment; `None` for vertex definitions.
    pub owner: Option<String>,
    pub name: String,
    pub ty: TypeRef,
}

impl FieldSource {
    fn of(fragment: &str, field: &FieldMeta) -> Self {
        Self {
            owner: Some(fragment.to_string()),
            name: field.name.clone(),
            ty: field.ty.clone(),
        }
    }

    fn describe(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A value a stage hands to the next one, and the stage producing it.
#[derive(Debug, Clone)]
pub(crate) struct ExpectedOutput {
    pub source: FieldSource,
    pub stage: usize,
}

/// A field of a generated stage class.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedField {
    pub name: String,
    pub ty: TypeRef,
    pub attributes: Vec<Attribute>,
    pub is_static: bool,
    pub initializer: Option<Expr>,
}

impl ResolvedField {
    fn add_attribute(&mut self, attribute: Attribute) {
        if !self.attributes.has_attribute(&attribute.name) {
            self.attributes.push(attribute);
        }
    }
}

/// A fragment field copied into a stage class field after every fragment ran.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedOutput {
    pub field_name: String,
    pub source: FieldSource,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Attachment {
    pub expected_outputs: FieldMap<ExpectedOutput>,
    pub fields: IndexMap<String, ResolvedField>,
    /// Stage input fields, in location order.
    pub inputs: IndexSet<String>,
    /// Stage output fields, in location order.
    pub outputs: IndexSet<String>,
    pub hardware_inputs: IndexSet<FieldKey>,
    pub hardware_outputs: IndexSet<FieldKey>,
    pub resolved_outputs: FieldMap<ResolvedOutput>,
}

impl Attachment {
    pub fn add_field(&mut self, name: &str, ty: &TypeRef) -> &mut ResolvedField {
        self.fields.entry(name.to_string()).or_insert_with(|| ResolvedField {
            name: name.to_string(),
            ty: ty.clone(),
            attributes: Vec::new(),
            is_static: false,
            initializer: None,
        })
    }

    /// A field carrying `attribute(name: link_name)`.
    pub fn add_linked_field(
        &mut self,
        name: &str,
        ty: &TypeRef,
        attribute: &str,
        link_name: &str,
        names: &NameSettings,
    ) -> &mut ResolvedField {
        let attr = Attribute::new(attribute).with_param(
            names.name_param.clone(),
            AttributeValue::String(link_name.to_string()),
        );
        let field = self.add_field(name, ty);
        field.add_attribute(attr);
        field
    }

    fn add_stage_field(
        &mut self,
        name: &str,
        ty: &TypeRef,
        attribute: &str,
        link_name: &str,
        names: &NameSettings,
    ) {
        self.add_linked_field(name, ty, attribute, link_name, names);
        if attribute == names.stage_input {
            self.inputs.insert(name.to_string());
        } else {
            self.outputs.insert(name.to_string());
        }
    }

    pub fn add_hardware_input(&mut self, key: &FieldKey, ty: &TypeRef, names: &NameSettings) {
        self.add_linked_field(&key.name, ty, &names.hardware_built_in_input, &key.name, names);
        self.hardware_inputs.insert(key.clone());
    }

    pub fn add_hardware_output(&mut self, key: &FieldKey, ty: &TypeRef, names: &NameSettings) {
        self.add_linked_field(&key.name, ty, &names.hardware_built_in_output, &key.name, names);
        self.hardware_outputs.insert(key.clone());
    }

    pub fn add_app_built_in(&mut self, key: &FieldKey, ty: &TypeRef, names: &NameSettings) {
        self.add_linked_field(&key.name, ty, &names.app_built_in_input, &key.name, names);
    }

    fn set_location(
        &mut self,
        field: &str,
        attribute: &str,
        location: usize,
        names: &NameSettings,
    ) {
        let Some(field) = self.fields.get_mut(field) else {
            return;
        };
        let Some(attr) = field.attributes.iter_mut().find(|a| a.name == attribute) else {
            return;
        };
        attr.params.retain(|p| p.name.as_deref() != Some(names.location_param.as_str()));
        attr.params.push(AttributeParam {
            name: Some(names.location_param.clone()),
            value: AttributeValue::Int(location as i64),
        });
    }
}

/// How one fragment field receives its value.
#[derive(Debug, Clone)]
pub(crate) struct FieldLink {
    pub field: FieldMeta,
    pub linked: LinkedFieldType,
    pub dependency: Option<FieldSource>,
    /// Stage class field the value is read from.
    pub field_name: Option<String>,
    pub property_name: Option<String>,
}

impl FieldLink {
    fn new(field: &FieldMeta) -> Self {
        Self {
            field: field.clone(),
            linked: LinkedFieldType::None,
            dependency: None,
            field_name: None,
            property_name: None,
        }
    }

    fn through(mut self, linked: LinkedFieldType, field_name: impl Into<String>) -> Self {
        self.linked = linked;
        self.field_name = Some(field_name.into());
        self
    }

    fn describe(&self) -> FieldDescription {
        let dependency = match self.linked {
            LinkedFieldType::Fragment | LinkedFieldType::Stage => {
                self.dependency.as_ref().map(FieldSource::describe)
            }
            LinkedFieldType::HardwareBuiltIn | LinkedFieldType::AppBuiltIn => {
                self.field_name.clone()
            }
            _ => None,
        };
        FieldDescription {
            field: self.field.name.clone(),
            ty: self.field.ty.to_string(),
            linked: self.linked,
            dependency,
            property_name: self.property_name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FragmentLink {
    pub fragment: String,
    pub fields: Vec<FieldLink>,
}

#[derive(Debug, Clone)]
pub(crate) struct StageLinking {
    /// `None` for the cpu and gpu ends of the pipeline.
    pub stage: FragmentType,
    pub fragments: Vec<Fragment>,
    pub input_vertex_types: Vec<Fragment>,
    pub output_vertex_types: Vec<Fragment>,
    pub primitive_types: Vec<Fragment>,
    pub vertex: Attachment,
    pub primitive: Attachment,
    pub fragment_links: IndexMap<String, FragmentLink>,
    fragment_outputs: FieldMap<FieldSource>,
}

impl StageLinking {
    fn new(stage: FragmentType, fragments: Vec<Fragment>) -> Self {
        let (input_vertex_types, output_vertex_types, primitive_types) = match stage {
            FragmentType::Geometry => {
                let geometry = fragments.iter().filter_map(|f| f.geometry.as_ref());
                let inputs = geometry.clone().map(|g| (*g.input_vertex).clone()).collect();
                let outputs = geometry.map(|g| (*g.output_vertex).clone()).collect();
                (inputs, outputs, fragments.clone())
            }
            _ => (fragments.clone(), fragments.clone(), Vec::new()),
        };
        Self {
            stage,
            fragments,
            input_vertex_types,
            output_vertex_types,
            primitive_types,
            vertex: Attachment::default(),
            primitive: Attachment::default(),
            fragment_links: IndexMap::new(),
            fragment_outputs: FieldMap::new(),
        }
    }

    pub fn attachment_mut(&mut self, kind: AttachmentKind) -> &mut Attachment {
        match kind {
            AttachmentKind::Vertex => &mut self.vertex,
            AttachmentKind::Primitive => &mut self.primitive,
        }
    }

    pub fn fragment_descriptions(&self) -> Vec<FragmentDescription> {
        self.fragment_links
            .values()
            .map(|link| FragmentDescription {
                fragment: link.fragment.clone(),
                fields: link.fields.iter().map(FieldLink::describe).collect(),
            })
            .collect()
    }
}

/// Every stage of one composite, cpu and gpu ends included.
#[derive(Debug, Clone)]
pub(crate) struct CompositeInfo {
    pub stages: Vec<StageLinking>,
}

impl CompositeInfo {
    pub fn pipeline(fragments: Vec<Fragment>) -> Self {
        let of = |stage: FragmentType| -> Vec<Fragment> {
            fragments.iter().filter(|f| f.meta.fragment_type == stage).cloned().collect()
        };
        let mut stages = vec![
            StageLinking::new(FragmentType::None, Vec::new()),
            StageLinking::new(FragmentType::Vertex, of(FragmentType::Vertex)),
        ];
        let geometry = of(FragmentType::Geometry);
        if !geometry.is_empty() {
            stages.push(StageLinking::new(FragmentType::Geometry, geometry));
        }
        stages.push(StageLinking::new(FragmentType::Pixel, of(FragmentType::Pixel)));
        stages.push(StageLinking::new(FragmentType::None, Vec::new()));
        Self { stages }
    }

    pub fn compute(fragments: Vec<Fragment>) -> Self {
        Self {
            stages: vec![
                StageLinking::new(FragmentType::None, Vec::new()),
                StageLinking::new(FragmentType::Compute, fragments),
                StageLinking::new(FragmentType::None, Vec::new()),
            ],
        }
    }

    pub fn is_pipeline(&self) -> bool {
        self.stages.iter().all(|s| s.stage != FragmentType::Compute)
    }

    // ========================================================================
    // Expected outputs
    // ========================================================================

    /// What each stage hands down: the cpu stage provides the vertex
    /// definitions, every other stage its stage outputs plus whatever it
    /// passes through. Geometry stages only emit what their output vertex
    /// declares.
    pub fn collect_expected_outputs(&mut self, settings: &Settings) {
        let names = &settings.names;
        for definition in &settings.vertex_definitions {
            let source = FieldSource {
                owner: None,
                name: definition.name.clone(),
                ty: definition.ty.clone(),
            };
            self.stages[0]
                .vertex
                .expected_outputs
                .insert(definition.key(), ExpectedOutput { source, stage: 0 });
        }

        for index in 1..self.stages.len() - 1 {
            let mut expected = if self.stages[index].stage == FragmentType::Geometry {
                FieldMap::new()
            } else {
                self.stages[index - 1].vertex.expected_outputs.clone()
            };
            for fragment in &self.stages[index].output_vertex_types {
                for field in fragment.meta.fields.iter().filter(|f| !f.is_static) {
                    let Some(key) = stage_output_key(field, names) else {
                        continue;
                    };
                    let source = FieldSource::of(fragment.name(), field);
                    expected.insert(key, ExpectedOutput { source, stage: index });
                }
            }
            self.stages[index].vertex.expected_outputs = expected;
        }
    }

    // ========================================================================
    // Linking
    // ========================================================================

    pub fn link(
        &mut self,
        settings: &Settings,
        index: usize,
        kind: AttachmentKind,
    ) -> Result<(), (Span, CompositorError)> {
        let fragments = match kind {
            AttachmentKind::Vertex => self.stages[index].input_vertex_types.clone(),
            AttachmentKind::Primitive => self.stages[index].primitive_types.clone(),
        };
        for fragment in &fragments {
            self.link_fragment(settings, index, kind, fragment)
                .map_err(|err| (fragment.meta.span, err))?;
        }
        if kind == AttachmentKind::Vertex && self.stages[index].stage == FragmentType::Geometry {
            let outputs = self.stages[index].output_vertex_types.clone();
            for fragment in &outputs {
                self.link_outputs(settings, index, kind, fragment)
                    .map_err(|err| (fragment.meta.span, err))?;
            }
        }
        Ok(())
    }

    fn link_fragment(
        &mut self,
        settings: &Settings,
        index: usize,
        kind: AttachmentKind,
        fragment: &Fragment,
    ) -> Result<(), CompositorError> {
        let names = &settings.names;
        let mut links = Vec::new();
        for field in fragment.meta.fields.iter().filter(|f| !f.is_static) {
            let inputs = self.input_attributes(field, names, index, kind);
            let material = material_link_name(&inputs, names, field)
                .filter(|_| fragment.non_copyable.contains(&field.name));
            let link = if let Some(name) = material {
                FieldLink {
                    linked: LinkedFieldType::Property,
                    property_name: Some(property_name(name, fragment.name())),
                    ..FieldLink::new(field)
                }
            } else if inputs.is_empty() {
                continue;
            } else {
                self.resolve_input(settings, index, kind, fragment, field, &inputs)?
            };
            log::trace!(
                "{}: {}.{} linked as {:?}",
                self.stages[index].stage.name(),
                fragment.name(),
                field.name,
                link.linked
            );
            links.push(link);
        }
        self.stages[index].fragment_links.insert(
            fragment.name().to_string(),
            FragmentLink {
                fragment: fragment.name().to_string(),
                fields: links,
            },
        );
        self.link_outputs(settings, index, kind, fragment)
    }

    /// Specific input attributes of a field in resolution order, with a
    /// generic `[Input]` expanded in place. Geometry vertex types only link
    /// stage and hardware inputs.
    fn input_attributes(
        &self,
        field: &FieldMeta,
        names: &NameSettings,
        index: usize,
        kind: AttachmentKind,
    ) -> Vec<Attribute> {
        let mut expanded: Vec<Attribute> = Vec::new();
        for attr in &field.attributes {
            if attr.name == names.input {
                for name in names.input_sub_attributes() {
                    expanded.push(Attribute {
                        name: name.to_string(),
                        ..attr.clone()
                    });
                }
            } else if names.input_sub_attributes().contains(&attr.name.as_str()) {
                expanded.push(attr.clone());
            }
        }
        let per_vertex_geometry =
            kind == AttachmentKind::Vertex && self.stages[index].stage == FragmentType::Geometry;
        if per_vertex_geometry {
            expanded
                .retain(|a| a.name == names.stage_input || a.name == names.hardware_built_in_input);
        }
        // Several specific attributes on one field are tried in the fixed
        // resolution order, not in declaration order.
        let order = names.input_sub_attributes();
        expanded.sort_by_key(|a| order.iter().position(|n| *n == a.name).unwrap_or(order.len()));
        expanded
    }

    fn resolve_input(
        &mut self,
        settings: &Settings,
        index: usize,
        kind: AttachmentKind,
        fragment: &Fragment,
        field: &FieldMeta,
        inputs: &[Attribute],
    ) -> Result<FieldLink, CompositorError> {
        let names = &settings.names;
        let stage = self.stages[index].stage;
        let link = FieldLink::new(field);

        for attr in inputs {
            let name = attr.string_param(&names.name_param).unwrap_or(&field.name);
            let key = FieldKey::new(name, field.ty.to_string());

            if attr.name == names.fragment_input {
                if let Some(source) = self.stages[index].fragment_outputs.get(&key) {
                    return Ok(FieldLink {
                        linked: LinkedFieldType::Fragment,
                        dependency: Some(source.clone()),
                        ..link
                    });
                }
            } else if attr.name == names.stage_input {
                if kind == AttachmentKind::Primitive {
                    continue;
                }
                let expected = self.stages[index - 1].vertex.expected_outputs.get(&key).cloned();
                if let Some(expected) = expected {
                    let source = expected.source.clone();
                    let var = self.add_stage_input(names, index, &key, expected);
                    return Ok(FieldLink {
                        dependency: Some(source),
                        ..link.through(LinkedFieldType::Stage, var)
                    });
                }
            } else if attr.name == names.app_built_in_input {
                if let Some((buffer, member)) = settings.find_app_built_in(&key, stage) {
                    let member = &buffer.fields[member];
                    let attachment = self.stages[index].attachment_mut(kind);
                    attachment.add_app_built_in(&member.key(), &member.ty, names);
                    return Ok(link.through(LinkedFieldType::AppBuiltIn, member.name.clone()));
                }
            } else if attr.name == names.hardware_built_in_input {
                let Some(built_ins) = settings.built_ins.stage(stage) else {
                    continue;
                };
                if let Some(found) = built_ins.find_input(&key) {
                    let built_in = found.field.key();
                    let attachment = self.stages[index].attachment_mut(kind);
                    attachment.add_hardware_input(&built_in, &field.ty, names);
                    return Ok(link.through(LinkedFieldType::HardwareBuiltIn, built_in.name));
                }
                let same_name = built_ins
                    .input_block
                    .iter()
                    .chain(&built_ins.input_globals)
                    .any(|b| b.name == key.name);
                if same_name {
                    return Err(CompositorError::IncompatibleBuiltIn {
                        fragment: fragment.name().to_string(),
                        field: field.name.clone(),
                    });
                }
            } else if attr.name == names.property_input {
                let property = property_name(&key.name, fragment.name());
                let attachment = self.stages[index].attachment_mut(kind);
                let composite = attachment.add_field(&property, &field.ty);
                composite.add_attribute(Attribute::new(names.property_input.clone()));
                composite.initializer = field.initializer.clone();
                return Ok(FieldLink {
                    property_name: Some(property.clone()),
                    ..link.through(LinkedFieldType::Property, property)
                });
            } else if attr.name == names.spec_constant_input {
                let property = property_name(&key.name, fragment.name());
                let attachment = self.stages[index].attachment_mut(kind);
                let composite = attachment.add_field(&property, &field.ty);
                composite.add_attribute(Attribute::new(names.spec_constant.clone()).with_param(
                    names.name_param.clone(),
                    AttributeValue::String(property.clone()),
                ));
                composite.is_static = true;
                composite.initializer = field.initializer.clone();
                return Ok(FieldLink {
                    property_name: Some(property.clone()),
                    ..link.through(LinkedFieldType::SpecConstant, property)
                });
            }
        }

        // Only app and hardware built-ins can be missing for good: fragment
        // and stage inputs fall back to the field's default.
        let required = inputs
            .iter()
            .all(|a| a.name == names.app_built_in_input || a.name == names.hardware_built_in_input);
        if required {
            return Err(CompositorError::UnresolvedInput {
                fragment: fragment.name().to_string(),
                field: field.name.clone(),
                stage: stage.name(),
            });
        }
        Ok(link)
    }

    /// Records a fragment's fragment outputs and hardware outputs.
    fn link_outputs(
        &mut self,
        settings: &Settings,
        index: usize,
        kind: AttachmentKind,
        fragment: &Fragment,
    ) -> Result<(), CompositorError> {
        let names = &settings.names;
        let stage = self.stages[index].stage;
        for field in fragment.meta.fields.iter().filter(|f| !f.is_static) {
            let generic = field.has_attribute(&names.output);
            if generic || field.has_attribute(&names.fragment_output) {
                let attr = if field.has_attribute(&names.fragment_output) {
                    &names.fragment_output
                } else {
                    &names.output
                };
                let key = field.key_for(attr);
                self.stages[index]
                    .fragment_outputs
                    .insert(key, FieldSource::of(fragment.name(), field));
            }

            if !field.has_attribute(&names.hardware_built_in_output) {
                continue;
            }
            let key = field.key_for(&names.hardware_built_in_output);
            let Some(built_ins) = settings.built_ins.stage(stage) else {
                continue;
            };
            let Some(found) = built_ins.find_output(&key) else {
                let same_name = built_ins
                    .output_block
                    .iter()
                    .chain(&built_ins.output_globals)
                    .any(|b| b.name == key.name);
                if same_name {
                    return Err(CompositorError::IncompatibleBuiltIn {
                        fragment: fragment.name().to_string(),
                        field: field.name.clone(),
                    });
                }
                continue;
            };
            let built_in = found.field.key();
            let attachment = self.stages[index].attachment_mut(kind);
            attachment.add_hardware_output(&built_in, &field.ty, names);
            attachment.resolved_outputs.insert(
                built_in.clone(),
                ResolvedOutput {
                    field_name: built_in.name.clone(),
                    source: FieldSource::of(fragment.name(), field),
                },
            );
        }
        Ok(())
    }

    /// Threads a stage input back to the stage producing it, adding a
    /// pass-through field to every stage in between. Returns the name of
    /// the stage class field.
    fn add_stage_input(
        &mut self,
        names: &NameSettings,
        index: usize,
        key: &FieldKey,
        expected: ExpectedOutput,
    ) -> String {
        let ty = expected.source.ty.clone();
        let var = stage_field_name(&key.name, &ty);
        let mut current = index;
        while current > 0 {
            let prev = current - 1;
            self.stages[current]
                .vertex
                .add_stage_field(&var, &ty, &names.stage_input, &key.name, names);
            self.stages[prev]
                .vertex
                .add_stage_field(&var, &ty, &names.stage_output, &key.name, names);
            if prev == expected.stage || prev == 0 {
                self.stages[prev]
                    .vertex
                    .resolved_outputs
                    .entry(key.clone())
                    .or_insert_with(|| ResolvedOutput {
                        field_name: var.clone(),
                        source: expected.source.clone(),
                    });
                break;
            }
            current = prev;
        }
        var
    }

    /// The gpu end reads every render target the last stage can produce.
    pub fn resolve_gpu_stage(&mut self, settings: &Settings) {
        let gpu = self.stages.len() - 1;
        for target in &settings.render_targets {
            let key = field_key(target, &settings.render_target_type);
            let expected = self.stages[gpu - 1].vertex.expected_outputs.get(&key).cloned();
            if let Some(expected) = expected {
                self.add_stage_input(&settings.names, gpu, &key, expected);
            }
        }
    }

    /// Gives both sides of every interior stage boundary the same explicit
    /// locations, in the order the consuming stage asked for its inputs.
    pub fn resolve_stage_link_order(&mut self, settings: &Settings) {
        let names = &settings.names;
        for index in 1..self.stages.len().saturating_sub(2) {
            let inputs = self.stages[index + 1].vertex.inputs.clone();
            let outputs = &self.stages[index].vertex.outputs;
            if outputs.len() != inputs.len() || outputs.iter().any(|o| !inputs.contains(o)) {
                log::warn!(
                    "{} outputs do not match {} inputs",
                    self.stages[index].stage.name(),
                    self.stages[index + 1].stage.name()
                );
            }
            for (location, name) in inputs.iter().enumerate() {
                self.stages[index + 1]
                    .vertex
                    .set_location(name, &names.stage_input, location, names);
                self.stages[index]
                    .vertex
                    .set_location(name, &names.stage_output, location, names);
            }
            self.stages[index].vertex.outputs = inputs;
        }
    }
}

/// Linking key of a field another stage can read.
fn stage_output_key(field: &FieldMeta, names: &NameSettings) -> Option<FieldKey> {
    [&names.stage_output, &names.output]
        .into_iter()
        .find(|attr| field.has_attribute(attr))
        .map(|attr| field.key_for(attr))
}

/// Link name of a field taking a `[PropertyInput]`, if it takes one.
fn material_link_name<'a>(
    inputs: &'a [Attribute],
    names: &NameSettings,
    field: &'a FieldMeta,
) -> Option<&'a str> {
    let attr = inputs.iter().find(|a| a.name == names.property_input)?;
    Some(attr.string_param(&names.name_param).unwrap_or(&field.name))
}
