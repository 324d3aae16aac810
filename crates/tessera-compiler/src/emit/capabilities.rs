//! Capabilities and extensions implied by what a module uses.

use rspirv::spirv::{
    BuiltIn, Capability, Decoration as SpirvDecoration, Dim, ExecutionModel, Op as SpirvOp,
};
use tessera_ir::{Decoration, Library, Operand, Type, TypeKind};

pub const DESCRIPTOR_INDEXING: &str = "SPV_EXT_descriptor_indexing";

pub fn for_opcode(opcode: SpirvOp) -> Option<Capability> {
    match opcode {
        SpirvOp::DPdxFine
        | SpirvOp::DPdyFine
        | SpirvOp::FwidthFine
        | SpirvOp::DPdxCoarse
        | SpirvOp::DPdyCoarse
        | SpirvOp::FwidthCoarse => Some(Capability::DerivativeControl),
        SpirvOp::ImageQuerySize
        | SpirvOp::ImageQuerySizeLod
        | SpirvOp::ImageQueryLevels
        | SpirvOp::ImageQuerySamples => Some(Capability::ImageQuery),
        SpirvOp::EmitVertex | SpirvOp::EndPrimitive => Some(Capability::Geometry),
        _ => None,
    }
}

pub fn for_execution_model(model: ExecutionModel) -> Option<Capability> {
    match model {
        ExecutionModel::Geometry => Some(Capability::Geometry),
        ExecutionModel::TessellationControl | ExecutionModel::TessellationEvaluation => {
            Some(Capability::Tessellation)
        }
        _ => None,
    }
}

pub fn for_decoration(decoration: &Decoration) -> Option<Capability> {
    if decoration.decoration != SpirvDecoration::BuiltIn {
        return None;
    }
    let built_in = *decoration.operands.first()?;
    match built_in {
        b if b == BuiltIn::PrimitiveId as u32
            || b == BuiltIn::InvocationId as u32
            || b == BuiltIn::Layer as u32 =>
        {
            Some(Capability::Geometry)
        }
        b if b == BuiltIn::ClipDistance as u32 => Some(Capability::ClipDistance),
        b if b == BuiltIn::CullDistance as u32 => Some(Capability::CullDistance),
        b if b == BuiltIn::SampleId as u32 || b == BuiltIn::SamplePosition as u32 => {
            Some(Capability::SampleRateShading)
        }
        _ => None,
    }
}

/// Capabilities a type declaration needs, plus the extension enabling them.
pub fn for_type(lib: &Library, ty: &Type) -> (Option<Capability>, Option<&'static str>) {
    let literal = |index: usize| match ty.parameters.get(index) {
        Some(Operand::Literal(value)) => Some(*value),
        _ => None,
    };
    match ty.kind {
        TypeKind::Float if literal(0) == Some(64) => (Some(Capability::Float64), None),
        TypeKind::Int | TypeKind::Uint if literal(0) == Some(64) => (Some(Capability::Int64), None),
        TypeKind::Image => {
            let dim = literal(1);
            let arrayed = literal(3) == Some(1);
            let sampled = literal(5) == Some(1);
            match dim {
                Some(d) if d == Dim::DimCube as u32 && arrayed && sampled => {
                    (Some(Capability::SampledCubeArray), None)
                }
                Some(d) if d == Dim::Dim1D as u32 && sampled => (Some(Capability::Sampled1D), None),
                Some(d) if d == Dim::DimBuffer as u32 && sampled => {
                    (Some(Capability::SampledBuffer), None)
                }
                _ => (None, None),
            }
        }
        TypeKind::RuntimeArray => {
            let opaque = ty.component_type.is_some_and(|element| lib.ty(element).kind.is_opaque());
            if opaque {
                (Some(Capability::RuntimeDescriptorArray), Some(DESCRIPTOR_INDEXING))
            } else {
                (None, None)
            }
        }
        _ => (None, None),
    }
}
