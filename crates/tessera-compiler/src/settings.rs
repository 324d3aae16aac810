//! Compiler configuration.
//!
//! Everything here has a default and round-trips through JSON, so the CLI
//! can load a partial settings file. Callbacks are the one exception: they
//! are installed in code and never serialized.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tessera_core::{FieldKey, TypeRef};
use tessera_ir::spirv::BuiltIn;
use tessera_ir::{FragmentType, ShaderStages};

use crate::compositor::CompositorCallbackData;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error(
        "uniform block '{block}' shares descriptor set {set} and binding {binding} \
         with block '{other}'"
    )]
    DuplicateBinding {
        block: String,
        other: String,
        set: u32,
        binding: u32,
    },

    #[error(
        "field '{field}' of uniform block '{block}' is registered for the same stage \
         more than once"
    )]
    DuplicateUniformField { field: String, block: String },

    #[error("app built-in '{0}' matches a hardware built-in")]
    AppBuiltInShadowsHardware(String),

    #[error("built-in '{0}' is declared as more than one hardware built-in")]
    ConflictingBuiltInName(String),

    #[error("{count} render targets exceed the limit of {max}")]
    TooManyRenderTargets { count: usize, max: usize },

    #[error("render target '{0}' is declared twice")]
    DuplicateRenderTarget(String),
}

// ============================================================================
// Names
// ============================================================================

/// Attribute and parameter names recognized by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameSettings {
    pub input: String,
    pub fragment_input: String,
    pub stage_input: String,
    pub hardware_built_in_input: String,
    pub app_built_in_input: String,
    pub property_input: String,
    pub spec_constant_input: String,
    pub output: String,
    pub fragment_output: String,
    pub stage_output: String,
    pub hardware_built_in_output: String,
    pub static_attribute: String,
    pub extension: String,
    pub vertex: String,
    pub geometry: String,
    pub pixel: String,
    pub compute: String,
    pub entry_point: String,
    pub spec_constant: String,
    pub fragment_shared: String,
    pub non_copyable: String,
    pub requires_pixel: String,
    pub storage_class: String,

    pub name_param: String,
    pub location_param: String,
    pub max_vertices_param: String,
    pub local_size_x_param: String,
    pub local_size_y_param: String,
    pub local_size_z_param: String,

    pub main_function: String,
    pub api_perspective_position: String,
    pub perspective_to_api_perspective: String,
}

impl Default for NameSettings {
    fn default() -> Self {
        Self {
            input: "Input".into(),
            fragment_input: "FragmentInput".into(),
            stage_input: "StageInput".into(),
            hardware_built_in_input: "HardwareBuiltInInput".into(),
            app_built_in_input: "AppBuiltInInput".into(),
            property_input: "PropertyInput".into(),
            spec_constant_input: "SpecConstantInput".into(),
            output: "Output".into(),
            fragment_output: "FragmentOutput".into(),
            stage_output: "StageOutput".into(),
            hardware_built_in_output: "HardwareBuiltInOutput".into(),
            static_attribute: "Static".into(),
            extension: "Extension".into(),
            vertex: "Vertex".into(),
            geometry: "Geometry".into(),
            pixel: "Pixel".into(),
            compute: "Compute".into(),
            entry_point: "EntryPoint".into(),
            spec_constant: "SpecConstant".into(),
            fragment_shared: "FragmentShared".into(),
            non_copyable: "NonCopyable".into(),
            requires_pixel: "RequiresPixel".into(),
            storage_class: "StorageClass".into(),
            name_param: "name".into(),
            location_param: "location".into(),
            max_vertices_param: "maxVertices".into(),
            local_size_x_param: "localSizeX".into(),
            local_size_y_param: "localSizeY".into(),
            local_size_z_param: "localSizeZ".into(),
            main_function: "Main".into(),
            api_perspective_position: "ApiPerspectivePosition".into(),
            perspective_to_api_perspective: "PerspectiveToApiPerspective".into(),
        }
    }
}

impl NameSettings {
    /// Specific input attributes a generic `[Input]` expands to, in
    /// resolution order.
    pub fn input_sub_attributes(&self) -> [&str; 6] {
        [
            &self.fragment_input,
            &self.stage_input,
            &self.hardware_built_in_input,
            &self.app_built_in_input,
            &self.property_input,
            &self.spec_constant_input,
        ]
    }

    pub fn output_sub_attributes(&self) -> [&str; 2] {
        [&self.fragment_output, &self.stage_output]
    }

    pub fn is_input(&self, name: &str) -> bool {
        name == self.input || self.input_sub_attributes().contains(&name)
    }

    pub fn is_output(&self, name: &str) -> bool {
        name == self.output
            || name == self.hardware_built_in_output
            || self.output_sub_attributes().contains(&name)
    }

    /// Attribute name of a stage, e.g. `Pixel`.
    pub fn stage_attribute(&self, stage: FragmentType) -> Option<&str> {
        match stage {
            FragmentType::Vertex => Some(&self.vertex),
            FragmentType::Geometry => Some(&self.geometry),
            FragmentType::Pixel => Some(&self.pixel),
            FragmentType::Compute => Some(&self.compute),
            FragmentType::None => None,
        }
    }

    /// Stage declared by a stage attribute name.
    pub fn stage_of(&self, attribute: &str) -> Option<FragmentType> {
        FragmentType::STAGES
            .into_iter()
            .find(|s| self.stage_attribute(*s) == Some(attribute))
    }
}

// ============================================================================
// Uniform buffers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescription {
    pub name: String,
    pub ty: TypeRef,
}

impl FieldDescription {
    pub fn new(name: impl Into<String>, ty: &str) -> Self {
        Self {
            name: name.into(),
            ty: TypeRef::named(ty),
        }
    }

    pub fn key(&self) -> FieldKey {
        FieldKey::new(self.name.clone(), self.ty.to_string())
    }
}

/// A host-provided uniform block whose fields are app built-ins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniformBufferDescription {
    pub binding: u32,
    pub descriptor_set: u32,
    pub debug_name: String,
    pub allowed_stages: ShaderStages,
    pub fields: Vec<FieldDescription>,
}

impl Default for UniformBufferDescription {
    fn default() -> Self {
        Self {
            binding: 0,
            descriptor_set: 0,
            debug_name: "Material".into(),
            allowed_stages: ShaderStages::all(),
            fields: Vec::new(),
        }
    }
}

impl UniformBufferDescription {
    pub fn new(binding: u32, debug_name: impl Into<String>, fields: Vec<FieldDescription>) -> Self {
        Self {
            binding,
            debug_name: debug_name.into(),
            fields,
            ..Self::default()
        }
    }

    pub fn find_field(&self, key: &FieldKey) -> Option<usize> {
        self.fields.iter().position(|f| &f.key() == key)
    }
}

// ============================================================================
// Hardware built-ins
// ============================================================================

/// Built-in variables the compiler knows how to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HardwareBuiltIn {
    Position,
    PointSize,
    ClipDistance,
    CullDistance,
    VertexIndex,
    InstanceIndex,
    PrimitiveId,
    InvocationId,
    FragCoord,
    PointCoord,
    FrontFacing,
    FragDepth,
    GlobalInvocationId,
    LocalInvocationId,
    NumWorkgroups,
    WorkgroupId,
    LocalInvocationIndex,
}

impl HardwareBuiltIn {
    pub fn to_spirv(self) -> BuiltIn {
        match self {
            Self::Position => BuiltIn::Position,
            Self::PointSize => BuiltIn::PointSize,
            Self::ClipDistance => BuiltIn::ClipDistance,
            Self::CullDistance => BuiltIn::CullDistance,
            Self::VertexIndex => BuiltIn::VertexIndex,
            Self::InstanceIndex => BuiltIn::InstanceIndex,
            Self::PrimitiveId => BuiltIn::PrimitiveId,
            Self::InvocationId => BuiltIn::InvocationId,
            Self::FragCoord => BuiltIn::FragCoord,
            Self::PointCoord => BuiltIn::PointCoord,
            Self::FrontFacing => BuiltIn::FrontFacing,
            Self::FragDepth => BuiltIn::FragDepth,
            Self::GlobalInvocationId => BuiltIn::GlobalInvocationId,
            Self::LocalInvocationId => BuiltIn::LocalInvocationId,
            Self::NumWorkgroups => BuiltIn::NumWorkgroups,
            Self::WorkgroupId => BuiltIn::WorkgroupId,
            Self::LocalInvocationIndex => BuiltIn::LocalInvocationIndex,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltInField {
    pub name: String,
    pub ty: TypeRef,
    pub built_in: HardwareBuiltIn,
}

impl BuiltInField {
    pub fn new(name: &str, ty: &str, built_in: HardwareBuiltIn) -> Self {
        Self {
            name: name.into(),
            ty: TypeRef::named(ty),
            built_in,
        }
    }

    pub fn key(&self) -> FieldKey {
        FieldKey::new(self.name.clone(), self.ty.to_string())
    }
}

/// Where a built-in lives in a stage's interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltInMatch<'a> {
    pub field: &'a BuiltInField,
    /// Member of the stage's `Block`-decorated interface struct.
    pub in_block: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageBuiltIns {
    pub input_block: Vec<BuiltInField>,
    pub input_globals: Vec<BuiltInField>,
    pub output_block: Vec<BuiltInField>,
    pub output_globals: Vec<BuiltInField>,
}

impl StageBuiltIns {
    pub fn find_input(&self, key: &FieldKey) -> Option<BuiltInMatch<'_>> {
        find_built_in(&self.input_block, &self.input_globals, key)
    }

    pub fn find_output(&self, key: &FieldKey) -> Option<BuiltInMatch<'_>> {
        find_built_in(&self.output_block, &self.output_globals, key)
    }

    fn all_mut(&mut self) -> impl Iterator<Item = &mut BuiltInField> {
        self.input_block
            .iter_mut()
            .chain(self.input_globals.iter_mut())
            .chain(self.output_block.iter_mut())
            .chain(self.output_globals.iter_mut())
    }

    fn all(&self) -> impl Iterator<Item = &BuiltInField> {
        self.input_block
            .iter()
            .chain(self.input_globals.iter())
            .chain(self.output_block.iter())
            .chain(self.output_globals.iter())
    }
}

fn find_built_in<'a>(
    block: &'a [BuiltInField],
    globals: &'a [BuiltInField],
    key: &FieldKey,
) -> Option<BuiltInMatch<'a>> {
    if let Some(field) = block.iter().find(|f| &f.key() == key) {
        return Some(BuiltInMatch {
            field,
            in_block: true,
        });
    }
    globals.iter().find(|f| &f.key() == key).map(|field| BuiltInMatch {
        field,
        in_block: false,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuiltInSettings {
    pub vertex: StageBuiltIns,
    pub geometry: StageBuiltIns,
    pub pixel: StageBuiltIns,
    pub compute: StageBuiltIns,
}

impl Default for BuiltInSettings {
    fn default() -> Self {
        use HardwareBuiltIn as B;
        Self {
            vertex: StageBuiltIns {
                input_globals: vec![
                    BuiltInField::new("VertexId", "Integer", B::VertexIndex),
                    BuiltInField::new("InstanceId", "Integer", B::InstanceIndex),
                ],
                output_block: vec![
                    BuiltInField::new("Position", "Real4", B::Position),
                    BuiltInField::new("PointSize", "Real", B::PointSize),
                ],
                ..StageBuiltIns::default()
            },
            geometry: StageBuiltIns {
                input_block: vec![BuiltInField::new("Position", "Real4", B::Position)],
                input_globals: vec![BuiltInField::new("PrimitiveId", "Integer", B::PrimitiveId)],
                output_block: vec![BuiltInField::new("Position", "Real4", B::Position)],
                output_globals: vec![BuiltInField::new("PrimitiveId", "Integer", B::PrimitiveId)],
            },
            pixel: StageBuiltIns {
                input_globals: vec![
                    BuiltInField::new("FragCoord", "Real4", B::FragCoord),
                    BuiltInField::new("PointCoord", "Real2", B::PointCoord),
                    BuiltInField::new("FrontFacing", "Boolean", B::FrontFacing),
                    BuiltInField::new("PrimitiveId", "Integer", B::PrimitiveId),
                ],
                output_globals: vec![BuiltInField::new("FragDepth", "Real", B::FragDepth)],
                ..StageBuiltIns::default()
            },
            compute: StageBuiltIns {
                input_globals: vec![
                    BuiltInField::new("GlobalInvocationId", "Integer3", B::GlobalInvocationId),
                    BuiltInField::new("LocalInvocationId", "Integer3", B::LocalInvocationId),
                    BuiltInField::new("NumWorkgroups", "Integer3", B::NumWorkgroups),
                    BuiltInField::new("WorkgroupId", "Integer3", B::WorkgroupId),
                    BuiltInField::new("LocalInvocationIndex", "Integer", B::LocalInvocationIndex),
                ],
                ..StageBuiltIns::default()
            },
        }
    }
}

impl BuiltInSettings {
    pub fn stage(&self, stage: FragmentType) -> Option<&StageBuiltIns> {
        match stage {
            FragmentType::Vertex => Some(&self.vertex),
            FragmentType::Geometry => Some(&self.geometry),
            FragmentType::Pixel => Some(&self.pixel),
            FragmentType::Compute => Some(&self.compute),
            FragmentType::None => None,
        }
    }

    fn stages(&self) -> [&StageBuiltIns; 4] {
        [&self.vertex, &self.geometry, &self.pixel, &self.compute]
    }

    /// Whether a field key names a built-in of any stage.
    pub fn is_any_built_in(&self, key: &FieldKey) -> bool {
        self.stages().iter().any(|s| s.all().any(|f| &f.key() == key))
    }

    /// Whether a field name names a built-in of any stage, whatever its type.
    pub fn is_any_built_in_name(&self, name: &str) -> bool {
        self.stages().iter().any(|s| s.all().any(|f| f.name == name))
    }
}

// ============================================================================
// Callbacks, errors, settings
// ============================================================================

pub type CompositeCallback = Arc<dyn Fn(&mut CompositorCallbackData<'_>) + Send + Sync>;

#[derive(Clone, Default)]
pub struct CallbackSettings {
    /// Runs right before each stage of a composite is generated.
    pub composite: Option<CompositeCallback>,
}

impl fmt::Debug for CallbackSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSettings")
            .field("composite", &self.composite.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorSettings {
    pub front_end_error_on_no_main: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub names: NameSettings,
    pub uniform_buffers: Vec<UniformBufferDescription>,
    pub default_uniform_buffer: UniformBufferDescription,
    pub allow_uniform_material_buffer_overlap: bool,
    pub built_ins: BuiltInSettings,
    pub vertex_definitions: Vec<FieldDescription>,
    pub render_targets: Vec<String>,
    pub render_target_type: TypeRef,
    pub max_render_targets: usize,
    /// Stages the target hardware supports.
    pub capabilities: ShaderStages,
    pub errors: ErrorSettings,
    #[serde(skip)]
    pub callbacks: CallbackSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let names = NameSettings::default();
        let uniform_buffers = vec![
            UniformBufferDescription::new(
                1,
                "FrameData",
                vec![
                    FieldDescription::new("LogicTime", "Real"),
                    FieldDescription::new("FrameTime", "Real"),
                ],
            ),
            UniformBufferDescription::new(
                2,
                "CameraData",
                vec![
                    FieldDescription::new("NearPlane", "Real"),
                    FieldDescription::new("FarPlane", "Real"),
                    FieldDescription::new("ViewportSize", "Real2"),
                ],
            ),
            UniformBufferDescription::new(
                3,
                "TransformData",
                vec![
                    FieldDescription::new("LocalToWorld", "Real4x4"),
                    FieldDescription::new(names.perspective_to_api_perspective.clone(), "Real4x4"),
                ],
            ),
        ];
        Self {
            names,
            uniform_buffers,
            default_uniform_buffer: UniformBufferDescription::default(),
            allow_uniform_material_buffer_overlap: true,
            built_ins: BuiltInSettings::default(),
            vertex_definitions: vec![
                FieldDescription::new("LocalPosition", "Real3"),
                FieldDescription::new("LocalNormal", "Real3"),
                FieldDescription::new("Uv", "Real2"),
                FieldDescription::new("Color", "Real4"),
                FieldDescription::new("Aux0", "Real4"),
                FieldDescription::new("BoneIndices", "Integer4"),
            ],
            render_targets: (0..8).map(|i| format!("Target{i}")).collect(),
            render_target_type: TypeRef::named("Real4"),
            max_render_targets: 8,
            capabilities: ShaderStages::all(),
            errors: ErrorSettings::default(),
            callbacks: CallbackSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Renames a hardware built-in in every stage.
    pub fn set_hardware_built_in_name(&mut self, built_in: HardwareBuiltIn, name: &str) {
        let stages = [
            &mut self.built_ins.vertex,
            &mut self.built_ins.geometry,
            &mut self.built_ins.pixel,
            &mut self.built_ins.compute,
        ];
        for stage in stages {
            for field in stage.all_mut().filter(|f| f.built_in == built_in) {
                field.name = name.to_string();
            }
        }
    }

    /// Installs the bundled callback that threads the api-perspective
    /// position through the geometry stage.
    pub fn with_api_perspective_position_callback(mut self) -> Self {
        self.callbacks.composite = Some(Arc::new(api_perspective_position_callback));
        self
    }

    /// The uniform buffer an app built-in belongs to, for a stage.
    pub fn find_app_built_in(
        &self,
        key: &FieldKey,
        stage: FragmentType,
    ) -> Option<(&UniformBufferDescription, usize)> {
        self.uniform_buffers
            .iter()
            .filter(|b| b.allowed_stages.intersects(stage.stage()))
            .find_map(|b| b.find_field(key).map(|i| (b, i)))
    }

    pub fn render_target_index(&self, name: &str) -> Option<usize> {
        self.render_targets.iter().position(|t| t == name)
    }

    pub fn vertex_definition_index(&self, key: &FieldKey) -> Option<usize> {
        self.vertex_definitions.iter().position(|d| &d.key() == key)
    }

    /// Binding of the material block for a stage.
    pub fn material_binding(&self, stage: FragmentType) -> u32 {
        let base = self.default_uniform_buffer.binding;
        if self.allow_uniform_material_buffer_overlap {
            return base;
        }
        base + match stage {
            FragmentType::Geometry => 1,
            FragmentType::Pixel => 2,
            _ => 0,
        }
    }

    /// Validates the settings as a whole.
    pub fn finalize(&self) -> Result<(), SettingsError> {
        self.validate_uniform_buffers()?;
        self.validate_built_in_names()?;
        self.validate_app_built_ins()?;
        self.validate_render_targets()
    }

    fn validate_uniform_buffers(&self) -> Result<(), SettingsError> {
        let mut bindings: HashMap<(u32, u32), &str> = HashMap::new();
        let material = &self.default_uniform_buffer;
        let material_span = if self.allow_uniform_material_buffer_overlap { 1 } else { 3 };
        for offset in 0..material_span {
            bindings.insert(
                (material.descriptor_set, material.binding + offset),
                material.debug_name.as_str(),
            );
        }

        let mut registered: HashMap<FieldKey, ShaderStages> = HashMap::new();
        for buffer in &self.uniform_buffers {
            let slot = (buffer.descriptor_set, buffer.binding);
            if let Some(other) = bindings.insert(slot, buffer.debug_name.as_str()) {
                return Err(SettingsError::DuplicateBinding {
                    block: buffer.debug_name.clone(),
                    other: other.to_string(),
                    set: slot.0,
                    binding: slot.1,
                });
            }
            for field in &buffer.fields {
                let used = registered.entry(field.key()).or_default();
                if used.intersects(buffer.allowed_stages) {
                    return Err(SettingsError::DuplicateUniformField {
                        field: field.name.clone(),
                        block: buffer.debug_name.clone(),
                    });
                }
                *used |= buffer.allowed_stages;
            }
        }
        Ok(())
    }

    fn validate_built_in_names(&self) -> Result<(), SettingsError> {
        let mut seen: HashMap<FieldKey, HardwareBuiltIn> = HashMap::new();
        for stage in self.built_ins.stages() {
            for field in stage.all() {
                if let Some(previous) = seen.insert(field.key(), field.built_in) {
                    if previous != field.built_in {
                        return Err(SettingsError::ConflictingBuiltInName(field.name.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_app_built_ins(&self) -> Result<(), SettingsError> {
        for buffer in &self.uniform_buffers {
            for field in &buffer.fields {
                if self.built_ins.is_any_built_in(&field.key()) {
                    return Err(SettingsError::AppBuiltInShadowsHardware(field.name.clone()));
                }
            }
        }
        Ok(())
    }

    fn validate_render_targets(&self) -> Result<(), SettingsError> {
        if self.render_targets.len() > self.max_render_targets {
            return Err(SettingsError::TooManyRenderTargets {
                count: self.render_targets.len(),
                max: self.max_render_targets,
            });
        }
        for (i, name) in self.render_targets.iter().enumerate() {
            if self.render_targets[..i].contains(name) {
                return Err(SettingsError::DuplicateRenderTarget(name.clone()));
            }
        }
        Ok(())
    }
}

/// Forces the api-perspective position through the geometry stage.
///
/// Geometry fragments work in engine perspective space; the composite reads
/// the api-perspective position from the previous stage, writes it back out,
/// and exposes the perspective-to-api transform to the primitive fragment.
pub fn api_perspective_position_callback(data: &mut CompositorCallbackData<'_>) {
    if data.stage() != FragmentType::Geometry {
        return;
    }
    let names = &data.settings().names;
    let position = FieldKey::new(names.api_perspective_position.clone(), "Real4");
    let transform = FieldKey::new(names.perspective_to_api_perspective.clone(), "Real4x4");
    data.add_hardware_input(position.clone());
    data.add_hardware_output(position);
    data.add_app_built_in_input(transform);
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod settings_tests;
