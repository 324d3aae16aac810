//! GLSL through naga: SPIR-V in, validated, GLSL out.
//!
//! naga writes one stage per call. Uniform block names must not collide
//! once stages are linked into one program, so every block declared in the
//! output carries the stage suffix.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use naga::back::glsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use serde::{Deserialize, Serialize};
use tessera_ir::FragmentType;

use super::BackendError;

/// Name of the entry point every emitted stage exposes.
const ENTRY_POINT: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlslVersion {
    Desktop(u16),
    Embedded(u16),
}

impl Default for GlslVersion {
    fn default() -> Self {
        Self::Desktop(450)
    }
}

impl FromStr for GlslVersion {
    type Err = BackendError;

    /// `450` is desktop GLSL; `310es` or `310 es` is GLSL ES.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (digits, embedded) = match trimmed.strip_suffix("es") {
            Some(rest) => (rest.trim_end(), true),
            None => (trimmed, false),
        };
        let version: u16 = digits.parse().map_err(|_| BackendError::UnknownVersion(s.to_string()))?;
        Ok(if embedded {
            Self::Embedded(version)
        } else {
            Self::Desktop(version)
        })
    }
}

impl fmt::Display for GlslVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Desktop(v) => write!(f, "{v}"),
            Self::Embedded(v) => write!(f, "{v} es"),
        }
    }
}

impl From<GlslVersion> for glsl::Version {
    fn from(version: GlslVersion) -> Self {
        match version {
            GlslVersion::Desktop(v) => glsl::Version::Desktop(v),
            GlslVersion::Embedded(v) => glsl::Version::Embedded {
                version: v,
                is_webgl: false,
            },
        }
    }
}

/// A sampler, image or uniform block as the GLSL source names it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlslResource {
    /// Identifier in the generated source.
    pub glsl_name: String,
    /// Debug name of the SPIR-V global it came from.
    pub name: Option<String>,
    pub descriptor_set: Option<u32>,
    pub binding: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlslOutput {
    pub source: String,
    pub samplers: Vec<GlslResource>,
    pub images: Vec<GlslResource>,
    pub uniforms: Vec<GlslResource>,
}

#[derive(Debug, Clone, Default)]
pub struct GlslBackend {
    /// Flip Y and remap depth for GL's clip space.
    pub adjust_coordinate_space: bool,
    /// Values for specialization constants, by SpecId. GLSL has no
    /// specialization, so every constant is frozen to its value here or to
    /// its default.
    pub spec_constants: HashMap<u32, f64>,
}

impl GlslBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spec_constant(mut self, spec_id: u32, value: f64) -> Self {
        self.spec_constants.insert(spec_id, value);
        self
    }

    pub fn translate(
        &self,
        bytes: &[u8],
        stage: FragmentType,
        version: GlslVersion,
    ) -> Result<GlslOutput, BackendError> {
        let shader_stage = naga_stage(stage)?;
        if bytes.len() % 4 != 0 {
            return Err(BackendError::Truncated(bytes.len()));
        }
        let module = naga::front::spv::parse_u8_slice(bytes, &naga::front::spv::Options::default())
            .map_err(|e| BackendError::InvalidBinary(e.to_string()))?;
        if !module
            .entry_points
            .iter()
            .any(|ep| ep.stage == shader_stage && ep.name == ENTRY_POINT)
        {
            return Err(BackendError::MissingEntryPoint(stage.name()));
        }
        let info = Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .map_err(|e| BackendError::Validation(e.into_inner().to_string()))?;
        // naga reads every OpSpecConstant as a pipeline override, which the
        // GLSL writer does not accept.
        let constants: naga::back::PipelineConstants = self
            .spec_constants
            .iter()
            .map(|(id, value)| (id.to_string(), *value))
            .collect();
        let (module, info) =
            naga::back::pipeline_constants::process_overrides(&module, &info, &constants)
                .map_err(|e| BackendError::SpecConstants(e.to_string()))?;

        let mut writer_flags = glsl::WriterFlags::empty();
        if self.adjust_coordinate_space {
            writer_flags |= glsl::WriterFlags::ADJUST_COORDINATE_SPACE;
        }
        let options = glsl::Options {
            version: version.into(),
            writer_flags,
            ..glsl::Options::default()
        };
        let pipeline = glsl::PipelineOptions {
            shader_stage,
            entry_point: ENTRY_POINT.to_string(),
            multiview: None,
        };

        let mut source = String::new();
        let reflection = glsl::Writer::new(
            &mut source,
            &module,
            &info,
            &options,
            &pipeline,
            naga::proc::BoundsCheckPolicies::default(),
        )
        .and_then(|mut writer| writer.write())
        .map_err(|e| BackendError::Glsl(e.to_string()))?;

        let resource = |glsl_name: &str, handle: naga::Handle<naga::GlobalVariable>| {
            let global = &module.global_variables[handle];
            GlslResource {
                glsl_name: glsl_name.to_string(),
                name: global.name.clone(),
                descriptor_set: global.binding.as_ref().map(|b| b.group),
                binding: global.binding.as_ref().map(|b| b.binding),
            }
        };

        let mut images = Vec::new();
        let mut samplers = Vec::new();
        for (glsl_name, mapping) in &reflection.texture_mapping {
            images.push(resource(glsl_name, mapping.texture));
            if let Some(sampler) = mapping.sampler {
                samplers.push(resource(glsl_name, sampler));
            }
        }
        let suffix = stage_suffix(stage);
        let mut uniforms: Vec<GlslResource> = reflection
            .uniforms
            .iter()
            .map(|(handle, block)| resource(&suffixed(block, suffix), *handle))
            .collect();
        for list in [&mut images, &mut samplers, &mut uniforms] {
            list.sort_by(|a, b| a.glsl_name.cmp(&b.glsl_name));
        }

        let source = suffix_uniform_blocks(&source, suffix);
        log::debug!(
            "glsl {version} for {}: {} bytes, {} images, {} uniforms",
            stage.name(),
            source.len(),
            images.len(),
            uniforms.len()
        );
        Ok(GlslOutput {
            source,
            samplers,
            images,
            uniforms,
        })
    }
}

fn naga_stage(stage: FragmentType) -> Result<naga::ShaderStage, BackendError> {
    match stage {
        FragmentType::Vertex => Ok(naga::ShaderStage::Vertex),
        FragmentType::Pixel => Ok(naga::ShaderStage::Fragment),
        FragmentType::Compute => Ok(naga::ShaderStage::Compute),
        FragmentType::Geometry | FragmentType::None => {
            Err(BackendError::UnsupportedStage(stage.name()))
        }
    }
}

pub(super) fn stage_suffix(stage: FragmentType) -> &'static str {
    match stage {
        FragmentType::Vertex => "Vertex",
        FragmentType::Geometry => "Geometry",
        FragmentType::Pixel => "Fragment",
        FragmentType::Compute => "Compute",
        FragmentType::None => "",
    }
}

fn suffixed(name: &str, suffix: &str) -> String {
    if name.ends_with(suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

/// Appends `suffix` to every uniform block name that lacks it, renaming
/// each whole-word use in the source.
pub(super) fn suffix_uniform_blocks(source: &str, suffix: &str) -> String {
    let mut renames: Vec<(String, String)> = Vec::new();
    for line in source.lines() {
        let Some(name) = uniform_block_name(line) else {
            continue;
        };
        if name.ends_with(suffix) || renames.iter().any(|(from, _)| from == name) {
            continue;
        }
        renames.push((name.to_string(), suffixed(name, suffix)));
    }
    let mut out = source.to_string();
    for (from, to) in &renames {
        out = replace_word(&out, from, to);
    }
    out
}

/// `layout(...) uniform Name { ...` declares a block named `Name`.
fn uniform_block_name(line: &str) -> Option<&str> {
    let start = line.find("uniform ")? + "uniform ".len();
    let rest = line[start..].trim_start();
    let end = rest.find(|c: char| !is_ident(c)).unwrap_or(rest.len());
    let name = &rest[..end];
    let after = rest[end..].trim_start();
    // `uniform highp sampler2D x;` is a plain uniform, not a block.
    if name.is_empty() || !(after.is_empty() || after.starts_with('{')) {
        return None;
    }
    Some(name)
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn replace_word(source: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(pos) = rest.find(from) {
        out.push_str(&rest[..pos]);
        let before = out.chars().next_back();
        let after = rest[pos + from.len()..].chars().next();
        if before.is_some_and(is_ident) || after.is_some_and(is_ident) {
            out.push_str(from);
        } else {
            out.push_str(to);
        }
        rest = &rest[pos + from.len()..];
    }
    out.push_str(rest);
    out
}
