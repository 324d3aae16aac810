//! The core shader library every translation depends on.
//!
//! Built once by the host and shared read-only: scalar, vector, matrix and
//! image types, the template bases, and the resolver tables that map
//! operators, constructors, swizzles and the `Math`/`Shader` functions onto
//! SPIR-V. Translated libraries reach it through their dependency module.

use std::sync::Arc;

use rspirv::spirv::{Dim, Op as SpirvOp};
use tessera_core::{BinaryOp, FunctionKey, TypeRef, UnaryOp};
use tessera_ir::resolvers::{BinaryOperatorKey, TypeCastKey, TypeResolvers, UnaryOperatorKey};
use tessera_ir::{
    ExtImportId, InstructionResolver, IrError, Library, Module, Operand, Primitive, ShaderStages,
    SpecConstantKey, StageRequirementsData, StageSymbol, TemplateResolver, TypeId, TypeKind,
};

pub const GLSL_STD_450: &str = "GLSL.std.450";

/// Owner of the static math functions.
pub const MATH: &str = "Math";
/// Owner of the static shader functions (sampling, discard, reserved constants).
pub const SHADER: &str = "Shader";

/// Reserved specialization constants, addressable by name for overrides.
pub const RESERVED_SPEC_CONSTANTS: [&str; 2] = ["LanguageId", "LanguageVersion"];

/// Instruction numbers of the GLSL.std.450 extended set.
mod glsl {
    pub const ROUND: u32 = 1;
    pub const TRUNC: u32 = 3;
    pub const F_ABS: u32 = 4;
    pub const S_ABS: u32 = 5;
    pub const F_SIGN: u32 = 6;
    pub const S_SIGN: u32 = 7;
    pub const FLOOR: u32 = 8;
    pub const CEIL: u32 = 9;
    pub const FRACT: u32 = 10;
    pub const SIN: u32 = 13;
    pub const COS: u32 = 14;
    pub const TAN: u32 = 15;
    pub const ASIN: u32 = 16;
    pub const ACOS: u32 = 17;
    pub const ATAN: u32 = 18;
    pub const ATAN2: u32 = 25;
    pub const POW: u32 = 26;
    pub const EXP: u32 = 27;
    pub const LOG: u32 = 28;
    pub const EXP2: u32 = 29;
    pub const LOG2: u32 = 30;
    pub const SQRT: u32 = 31;
    pub const INVERSE_SQRT: u32 = 32;
    pub const DETERMINANT: u32 = 33;
    pub const MATRIX_INVERSE: u32 = 34;
    pub const F_MIN: u32 = 37;
    pub const S_MIN: u32 = 39;
    pub const F_MAX: u32 = 40;
    pub const S_MAX: u32 = 42;
    pub const F_CLAMP: u32 = 43;
    pub const S_CLAMP: u32 = 45;
    pub const F_MIX: u32 = 46;
    pub const STEP: u32 = 48;
    pub const SMOOTH_STEP: u32 = 49;
    pub const LENGTH: u32 = 66;
    pub const DISTANCE: u32 = 67;
    pub const CROSS: u32 = 68;
    pub const NORMALIZE: u32 = 69;
    pub const FACE_FORWARD: u32 = 70;
    pub const REFLECT: u32 = 71;
    pub const REFRACT: u32 = 72;
}

/// Handles of the types the compiler refers to directly.
#[derive(Debug, Clone, Copy)]
pub struct CoreTypes {
    pub void: TypeId,
    pub boolean: TypeId,
    pub integer: TypeId,
    pub real: TypeId,
    pub real4: TypeId,
}

#[derive(Debug, Clone)]
pub struct ShaderIntrinsics {
    library: Arc<Library>,
    types: CoreTypes,
}

impl ShaderIntrinsics {
    pub fn new() -> Result<Self, IrError> {
        let mut builder = IntrinsicsBuilder::new()?;
        builder.build()?;
        let types = builder.core_types();
        let mut library = builder.lib;
        library.lock();
        log::debug!("intrinsics: {} types", library.types().count());
        Ok(Self {
            library: Arc::new(library),
            types,
        })
    }

    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }

    pub fn types(&self) -> CoreTypes {
        self.types
    }

    /// Dependency module for a translation: the intrinsics, then `extra`.
    pub fn module_with(&self, extra: &Module) -> Module {
        let mut module = Module::new([self.library.clone()]);
        for lib in extra.iter() {
            module.push(lib.clone());
        }
        module
    }
}

// ============================================================================
// Builder
// ============================================================================

const FAMILIES: [&str; 3] = ["Boolean", "Integer", "Real"];

struct IntrinsicsBuilder {
    lib: Library,
    glsl: ExtImportId,
}

fn family_names(scalar: &str) -> [String; 4] {
    [
        scalar.to_string(),
        format!("{scalar}2"),
        format!("{scalar}3"),
        format!("{scalar}4"),
    ]
}

fn keys(names: &[&str]) -> Vec<TypeRef> {
    names.iter().map(|n| TypeRef::named(*n)).collect()
}

impl IntrinsicsBuilder {
    fn new() -> Result<Self, IrError> {
        let mut lib = Library::new("Intrinsics", Module::default())?;
        let glsl = lib.get_or_add_ext_import(GLSL_STD_450)?;
        Ok(Self { lib, glsl })
    }

    fn id(&self, name: &str) -> TypeId {
        // Every name passed here was registered by `build_types`.
        match self.lib.find_type(name, false) {
            Some(id) => id,
            None => unreachable!("intrinsic type `{name}` is not registered"),
        }
    }

    fn core_types(&self) -> CoreTypes {
        CoreTypes {
            void: self.id("Void"),
            boolean: self.id("Boolean"),
            integer: self.id("Integer"),
            real: self.id("Real"),
            real4: self.id("Real4"),
        }
    }

    fn build(&mut self) -> Result<(), IrError> {
        self.build_types()?;
        self.build_templates()?;
        self.build_constructors()?;
        self.build_operators()?;
        self.build_casts()?;
        self.build_math()?;
        self.build_shader()?;
        self.build_reserved_spec_constants()
    }

    // ------------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------------

    fn build_types(&mut self) -> Result<(), IrError> {
        self.lib.add_type("Void", TypeKind::Void)?;
        let boolean = self.lib.add_type("Boolean", TypeKind::Bool)?;
        let integer = self.lib.add_type("Integer", TypeKind::Int)?;
        self.lib.type_mut(integer)?.parameters = vec![Operand::Literal(32), Operand::Literal(1)];
        let real = self.lib.add_type("Real", TypeKind::Float)?;
        self.lib.type_mut(real)?.parameters = vec![Operand::Literal(32)];

        for (scalar, component) in [("Boolean", boolean), ("Integer", integer), ("Real", real)] {
            for count in 2..=4 {
                self.composite(&format!("{scalar}{count}"), TypeKind::Vector, component, count)?;
            }
        }

        for rows in 2..=4 {
            let column = self.id(&format!("Real{rows}"));
            for columns in 2..=4 {
                let name = format!("Real{rows}x{columns}");
                self.composite(&name, TypeKind::Matrix, column, columns)?;
            }
        }

        self.lib.add_type("Sampler", TypeKind::Sampler)?;
        self.image("Image2d", Dim::Dim2D, false)?;
        self.image("DepthImage2d", Dim::Dim2D, true)?;
        self.image("ImageCube", Dim::DimCube, false)?;

        self.lib.add_type(MATH, TypeKind::Unknown)?;
        self.lib.add_type(SHADER, TypeKind::Unknown)?;
        Ok(())
    }

    fn composite(
        &mut self,
        name: &str,
        kind: TypeKind,
        component: TypeId,
        count: u32,
    ) -> Result<TypeId, IrError> {
        let id = self.lib.add_type(name, kind)?;
        let ty = self.lib.type_mut(id)?;
        ty.component_type = Some(component);
        ty.component_count = count;
        ty.parameters = vec![Operand::Type(component), Operand::Literal(count)];
        self.lib.add_dependent(component, id)?;
        Ok(id)
    }

    /// An image type plus its combined sampled-image type `Sampled{name}`.
    fn image(&mut self, name: &str, dim: Dim, depth: bool) -> Result<(), IrError> {
        let real = self.id("Real");
        let image = self.lib.add_type(name, TypeKind::Image)?;
        self.lib.type_mut(image)?.parameters = vec![
            Operand::Type(real),
            Operand::Literal(dim as u32),
            Operand::Literal(u32::from(depth)),
            Operand::Literal(0),
            Operand::Literal(0),
            Operand::Literal(1),
            Operand::Literal(0),
        ];
        self.lib.type_mut(image)?.component_type = Some(real);

        let sampled = self.lib.add_type(format!("Sampled{name}"), TypeKind::SampledImage)?;
        let ty = self.lib.type_mut(sampled)?;
        ty.parameters = vec![Operand::Type(image)];
        ty.component_type = Some(image);
        self.lib.add_dependent(image, sampled)?;
        Ok(())
    }

    fn build_templates(&mut self) -> Result<(), IrError> {
        let templates = [
            ("FixedArray", TemplateResolver::FixedArray),
            ("RuntimeArray", TemplateResolver::RuntimeArray),
            ("PointInput", TemplateResolver::InputStream(Primitive::Points)),
            ("LineInput", TemplateResolver::InputStream(Primitive::Lines)),
            ("TriangleInput", TemplateResolver::InputStream(Primitive::Triangles)),
            ("PointOutput", TemplateResolver::OutputStream(Primitive::Points)),
            ("LineOutput", TemplateResolver::OutputStream(Primitive::Lines)),
            ("TriangleOutput", TemplateResolver::OutputStream(Primitive::Triangles)),
        ];
        let tables = self.lib.resolvers_mut()?;
        for (name, resolver) in templates {
            tables.templates.insert(name.to_string(), resolver);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Constructors, swizzles
    // ------------------------------------------------------------------------

    fn type_resolvers(&mut self, name: &str) -> Result<&mut TypeResolvers, IrError> {
        Ok(self
            .lib
            .resolvers_mut()?
            .types
            .entry(TypeRef::named(name))
            .or_default())
    }

    fn build_constructors(&mut self) -> Result<(), IrError> {
        for scalar in FAMILIES {
            let names = family_names(scalar);
            let r = self.type_resolvers(scalar)?;
            r.default_constructor = Some(InstructionResolver::DefaultConstruct);
            r.constructors.insert(keys(&[scalar]), InstructionResolver::Identity);

            for (count, vector) in names.iter().enumerate().skip(1) {
                let count = count + 1;
                let v2 = names[1].as_str();
                let v3 = names[2].as_str();
                let mut shapes: Vec<Vec<&str>> = vec![vec![scalar], vec![scalar; count]];
                match count {
                    3 => {
                        shapes.push(vec![v2, scalar]);
                        shapes.push(vec![scalar, v2]);
                    }
                    4 => {
                        shapes.push(vec![v3, scalar]);
                        shapes.push(vec![scalar, v3]);
                        shapes.push(vec![v2, v2]);
                        shapes.push(vec![v2, scalar, scalar]);
                        shapes.push(vec![scalar, v2, scalar]);
                        shapes.push(vec![scalar, scalar, v2]);
                    }
                    _ => {}
                }

                let r = self.type_resolvers(vector)?;
                r.default_constructor = Some(InstructionResolver::DefaultConstruct);
                r.field_backup = Some(InstructionResolver::Swizzle);
                r.setter_backup = Some(InstructionResolver::Swizzle);
                for shape in shapes {
                    r.constructors.insert(keys(&shape), InstructionResolver::Construct);
                }
            }
        }

        for rows in 2..=4 {
            let column = format!("Real{rows}");
            for columns in 2..=4 {
                let r = self.type_resolvers(&format!("Real{rows}x{columns}"))?;
                r.default_constructor = Some(InstructionResolver::DefaultConstruct);
                let shape = vec![TypeRef::named(column.clone()); columns];
                r.constructors.insert(shape, InstructionResolver::Construct);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Operators, casts
    // ------------------------------------------------------------------------

    fn binary(
        &mut self,
        lhs: &str,
        rhs: &str,
        op: BinaryOp,
        resolver: InstructionResolver,
    ) -> Result<(), IrError> {
        let key = BinaryOperatorKey::new(TypeRef::named(lhs), TypeRef::named(rhs), op);
        self.lib.resolvers_mut()?.binary.insert(key, resolver);
        Ok(())
    }

    fn unary(
        &mut self,
        operand: &str,
        op: UnaryOp,
        resolver: InstructionResolver,
    ) -> Result<(), IrError> {
        let key = UnaryOperatorKey {
            operand: TypeRef::named(operand),
            op,
        };
        self.lib.resolvers_mut()?.unary.insert(key, resolver);
        Ok(())
    }

    fn build_operators(&mut self) -> Result<(), IrError> {
        use BinaryOp::{Add, And, Div, Ge, Gt, Le, Lt, Mod, Mul, Ne, Or, Sub};
        use InstructionResolver::{Op, OpSwapped};

        let real_ops = [
            (Add, SpirvOp::FAdd),
            (Sub, SpirvOp::FSub),
            (Mul, SpirvOp::FMul),
            (Div, SpirvOp::FDiv),
            (Mod, SpirvOp::FMod),
            (BinaryOp::Eq, SpirvOp::FOrdEqual),
            (Ne, SpirvOp::FOrdNotEqual),
            (Lt, SpirvOp::FOrdLessThan),
            (Le, SpirvOp::FOrdLessThanEqual),
            (Gt, SpirvOp::FOrdGreaterThan),
            (Ge, SpirvOp::FOrdGreaterThanEqual),
        ];
        let integer_ops = [
            (Add, SpirvOp::IAdd),
            (Sub, SpirvOp::ISub),
            (Mul, SpirvOp::IMul),
            (Div, SpirvOp::SDiv),
            (Mod, SpirvOp::SMod),
            (BinaryOp::Eq, SpirvOp::IEqual),
            (Ne, SpirvOp::INotEqual),
            (Lt, SpirvOp::SLessThan),
            (Le, SpirvOp::SLessThanEqual),
            (Gt, SpirvOp::SGreaterThan),
            (Ge, SpirvOp::SGreaterThanEqual),
        ];
        let boolean_ops = [
            (BinaryOp::Eq, SpirvOp::LogicalEqual),
            (Ne, SpirvOp::LogicalNotEqual),
            (And, SpirvOp::LogicalAnd),
            (Or, SpirvOp::LogicalOr),
        ];

        for (family, table, negate) in [
            ("Real", &real_ops[..], Some(SpirvOp::FNegate)),
            ("Integer", &integer_ops[..], Some(SpirvOp::SNegate)),
            ("Boolean", &boolean_ops[..], None),
        ] {
            for name in family_names(family) {
                for (op, opcode) in table {
                    self.binary(&name, &name, *op, Op(*opcode))?;
                }
                match negate {
                    Some(opcode) => self.unary(&name, UnaryOp::Negate, Op(opcode))?,
                    None => self.unary(&name, UnaryOp::Not, Op(SpirvOp::LogicalNot))?,
                }
            }
        }

        for name in family_names("Real").iter().skip(1) {
            self.binary(name, "Real", Mul, Op(SpirvOp::VectorTimesScalar))?;
            self.binary("Real", name, Mul, OpSwapped(SpirvOp::VectorTimesScalar))?;
        }

        for rows in 2..=4 {
            for columns in 2..=4 {
                let matrix = format!("Real{rows}x{columns}");
                self.binary(&matrix, "Real", Mul, Op(SpirvOp::MatrixTimesScalar))?;
                self.binary("Real", &matrix, Mul, OpSwapped(SpirvOp::MatrixTimesScalar))?;
            }
        }
        Ok(())
    }

    fn build_casts(&mut self) -> Result<(), IrError> {
        let reals = family_names("Real");
        let integers = family_names("Integer");
        let tables = self.lib.resolvers_mut()?;
        for (real, integer) in reals.iter().zip(integers.iter()) {
            tables.casts.insert(
                TypeCastKey {
                    from: TypeRef::named(integer.clone()),
                    to: TypeRef::named(real.clone()),
                },
                InstructionResolver::Convert(SpirvOp::ConvertSToF),
            );
            tables.casts.insert(
                TypeCastKey {
                    from: TypeRef::named(real.clone()),
                    to: TypeRef::named(integer.clone()),
                },
                InstructionResolver::Convert(SpirvOp::ConvertFToS),
            );
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------------

    fn function(
        &mut self,
        owner: &str,
        name: &str,
        params: &[&str],
        resolver: InstructionResolver,
    ) -> Result<FunctionKey, IrError> {
        let key = FunctionKey::new(TypeRef::named(owner), name, keys(params));
        self.lib.resolvers_mut()?.functions.insert(key.clone(), resolver);
        Ok(key)
    }

    fn ext(&mut self, name: &str, params: &[&str], instruction: u32) -> Result<(), IrError> {
        let resolver = InstructionResolver::ExtInst {
            import: self.glsl,
            instruction,
        };
        self.function(MATH, name, params, resolver)?;
        Ok(())
    }

    fn require_pixel(&mut self, key: FunctionKey) -> Result<(), IrError> {
        self.lib.set_stage_requirements(
            StageSymbol::Function(key),
            StageRequirementsData::with_stages(ShaderStages::PIXEL),
        )
    }

    fn build_math(&mut self) -> Result<(), IrError> {
        use glsl::*;

        let unary_real = [
            ("Abs", F_ABS),
            ("Sign", F_SIGN),
            ("Floor", FLOOR),
            ("Ceil", CEIL),
            ("Frac", FRACT),
            ("Round", ROUND),
            ("Truncate", TRUNC),
            ("Sin", SIN),
            ("Cos", COS),
            ("Tan", TAN),
            ("ASin", ASIN),
            ("ACos", ACOS),
            ("ATan", ATAN),
            ("Exp", EXP),
            ("Exp2", EXP2),
            ("Log", LOG),
            ("Log2", LOG2),
            ("Sqrt", SQRT),
            ("RSqrt", INVERSE_SQRT),
        ];
        let binary_real = [
            ("ATan2", ATAN2),
            ("Pow", POW),
            ("Min", F_MIN),
            ("Max", F_MAX),
            ("Step", STEP),
        ];
        let ternary_real = [("Clamp", F_CLAMP), ("Lerp", F_MIX), ("SmoothStep", SMOOTH_STEP)];

        for real in family_names("Real") {
            let t = real.as_str();
            for (name, instruction) in unary_real {
                self.ext(name, &[t], instruction)?;
            }
            for (name, instruction) in binary_real {
                self.ext(name, &[t, t], instruction)?;
            }
            for (name, instruction) in ternary_real {
                self.ext(name, &[t, t, t], instruction)?;
            }
            for (name, opcode) in [
                ("Ddx", SpirvOp::DPdx),
                ("Ddy", SpirvOp::DPdy),
                ("FWidth", SpirvOp::Fwidth),
            ] {
                let key = self.function(MATH, name, &[t], InstructionResolver::Op(opcode))?;
                self.require_pixel(key)?;
            }
        }

        for integer in family_names("Integer") {
            let t = integer.as_str();
            self.ext("Abs", &[t], S_ABS)?;
            self.ext("Sign", &[t], S_SIGN)?;
            self.ext("Min", &[t, t], S_MIN)?;
            self.ext("Max", &[t, t], S_MAX)?;
            self.ext("Clamp", &[t, t, t], S_CLAMP)?;
        }

        for vector in family_names("Real").iter().skip(1) {
            let t = vector.as_str();
            self.ext("Length", &[t], LENGTH)?;
            self.ext("Distance", &[t, t], DISTANCE)?;
            self.ext("Normalize", &[t], NORMALIZE)?;
            self.ext("Reflect", &[t, t], REFLECT)?;
            self.ext("Refract", &[t, t, "Real"], REFRACT)?;
            self.ext("FaceForward", &[t, t, t], FACE_FORWARD)?;
            self.function(MATH, "Dot", &[t, t], InstructionResolver::Op(SpirvOp::Dot))?;
        }
        self.ext("Cross", &["Real3", "Real3"], CROSS)?;

        for rows in 2..=4 {
            let vector = format!("Real{rows}");
            for columns in 2..=4 {
                let matrix = format!("Real{rows}x{columns}");
                let transpose = InstructionResolver::Op(SpirvOp::Transpose);
                self.function(MATH, "Transpose", &[&matrix], transpose)?;
                if rows != columns {
                    continue;
                }
                self.ext("Determinant", &[&matrix], DETERMINANT)?;
                self.ext("Invert", &[&matrix], MATRIX_INVERSE)?;
                // Storage is column-major while source products read row-major.
                self.function(
                    MATH,
                    "Multiply",
                    &[&matrix, &matrix],
                    InstructionResolver::OpSwapped(SpirvOp::MatrixTimesMatrix),
                )?;
                self.function(
                    MATH,
                    "Multiply",
                    &[&matrix, &vector],
                    InstructionResolver::OpSwapped(SpirvOp::VectorTimesMatrix),
                )?;
            }
        }
        Ok(())
    }

    fn build_shader(&mut self) -> Result<(), IrError> {
        use InstructionResolver::{ImageQuery, SampleImage};

        let sample = SampleImage {
            op: SpirvOp::ImageSampleImplicitLod,
            lod: false,
        };
        let sample_lod = SampleImage {
            op: SpirvOp::ImageSampleExplicitLod,
            lod: true,
        };

        let key =
            self.function(SHADER, "Sample", &["Image2d", "Sampler", "Real2"], sample.clone())?;
        self.require_pixel(key)?;
        let key =
            self.function(SHADER, "Sample", &["ImageCube", "Sampler", "Real3"], sample.clone())?;
        self.require_pixel(key)?;
        let key = self.function(SHADER, "Sample", &["SampledImage2d", "Real2"], sample)?;
        self.require_pixel(key)?;
        let params = ["Image2d", "Sampler", "Real2", "Real"];
        self.function(SHADER, "SampleLod", &params, sample_lod.clone())?;
        self.function(SHADER, "SampleLod", &["ImageCube", "Sampler", "Real3", "Real"], sample_lod)?;
        let key = self.function(
            SHADER,
            "SampleDref",
            &["DepthImage2d", "Sampler", "Real2", "Real"],
            SampleImage {
                op: SpirvOp::ImageSampleDrefImplicitLod,
                lod: false,
            },
        )?;
        self.require_pixel(key)?;
        let fetch = ImageQuery(SpirvOp::ImageFetch);
        self.function(SHADER, "Fetch", &["Image2d", "Integer2", "Integer"], fetch)?;
        self.function(
            SHADER,
            "SampleSize",
            &["Image2d", "Integer"],
            ImageQuery(SpirvOp::ImageQuerySizeLod),
        )?;

        let key = self.function(SHADER, "Discard", &[], InstructionResolver::Op(SpirvOp::Kill))?;
        self.require_pixel(key)
    }

    fn build_reserved_spec_constants(&mut self) -> Result<(), IrError> {
        let integer = self.id("Integer");
        let owner = TypeRef::named(SHADER);
        for name in RESERVED_SPEC_CONSTANTS {
            let op = self
                .lib
                .add_op(SpirvOp::SpecConstant, Some(integer), vec![Operand::Literal(0)])?;
            self.lib.set_debug_name(op, name)?;
            self.lib.add_spec_constant(SpecConstantKey::new(name), op)?;
            self.lib.map_field_global(&owner, name, op)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "intrinsics_tests.rs"]
mod intrinsics_tests;
