//! std140 layout for uniform blocks.
//!
//! Scalars align to 4, two-component vectors to 8, wider vectors to 16.
//! Matrices are column arrays and array elements are padded to 16 bytes.
//! Structs align to 16 and round their size up to that.

use tessera_ir::spirv::Decoration;
use tessera_ir::{DecorationTarget, IrError, Library, TypeId, TypeKind};

const VEC4: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    pub offsets: Vec<u32>,
    pub size: u32,
}

fn round_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

/// `(size, alignment)` of a type under std140.
pub fn std140_size_align(lib: &Library, ty: TypeId) -> (u32, u32) {
    let t = lib.ty(ty);
    match t.kind {
        TypeKind::Bool | TypeKind::Int | TypeKind::Float => (4, 4),
        TypeKind::Vector => match t.component_count {
            2 => (8, 8),
            3 => (12, VEC4),
            _ => (16, VEC4),
        },
        TypeKind::Matrix => (VEC4 * t.component_count, VEC4),
        TypeKind::FixedArray => {
            let element = t.component_type.map(|e| std140_size_align(lib, e)).unwrap_or((4, 4));
            (array_stride(element) * t.component_count, VEC4)
        }
        TypeKind::Struct => {
            let members: Vec<TypeId> = t.members.iter().map(|m| m.ty).collect();
            let layout = std140_block(lib, &members);
            (layout.size, VEC4)
        }
        _ => (0, 4),
    }
}

fn array_stride((size, align): (u32, u32)) -> u32 {
    round_up(size, align.max(VEC4))
}

/// Member offsets and total size of a block with the given member types.
pub fn std140_block(lib: &Library, members: &[TypeId]) -> BlockLayout {
    let mut offset = 0;
    let mut offsets = Vec::with_capacity(members.len());
    for member in members {
        let (size, align) = std140_size_align(lib, *member);
        offset = round_up(offset, align);
        offsets.push(offset);
        offset += size;
    }
    BlockLayout {
        offsets,
        size: round_up(offset, VEC4),
    }
}

/// Decorates a struct (and the composites it embeds) with std140 offsets,
/// matrix strides and array strides. Returns the struct's layout.
pub(crate) fn decorate_std140(lib: &mut Library, ty: TypeId) -> Result<BlockLayout, IrError> {
    let members: Vec<TypeId> = lib.ty(ty).members.iter().map(|m| m.ty).collect();
    let layout = std140_block(lib, &members);
    for (index, (member, offset)) in members.iter().zip(&layout.offsets).enumerate() {
        let index = index as u32;
        lib.decorate_member(ty, index, Decoration::Offset, vec![*offset])?;
        decorate_member_type(lib, ty, index, *member)?;
    }
    Ok(layout)
}

fn decorate_member_type(
    lib: &mut Library,
    owner: TypeId,
    index: u32,
    member: TypeId,
) -> Result<(), IrError> {
    let kind = lib.ty(member).kind;
    match kind {
        TypeKind::Matrix => {
            lib.decorate_member(owner, index, Decoration::ColMajor, Vec::new())?;
            lib.decorate_member(owner, index, Decoration::MatrixStride, vec![VEC4])?;
        }
        TypeKind::FixedArray => {
            let element = lib.ty(member).component_type;
            if let Some(element) = element {
                let stride = array_stride(std140_size_align(lib, element));
                let target = DecorationTarget::Type(member);
                lib.decorate(target, Decoration::ArrayStride, vec![stride])?;
                if lib.ty(element).kind == TypeKind::Matrix {
                    lib.decorate_member(owner, index, Decoration::ColMajor, Vec::new())?;
                    lib.decorate_member(owner, index, Decoration::MatrixStride, vec![VEC4])?;
                }
                if lib.ty(element).kind == TypeKind::Struct {
                    decorate_std140(lib, element)?;
                }
            }
        }
        TypeKind::Struct => {
            decorate_std140(lib, member)?;
        }
        _ => {}
    }
    Ok(())
}
