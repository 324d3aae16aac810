//! Stage class generation from a linked stage.

use tessera_core::{
    Attribute, AttributeList, AttributeValue, BinaryOp, ClassDecl, Expr, FieldDecl, FunctionDecl,
    FunctionKey, Stmt, TemplateArg, TypeRef,
};
use tessera_ir::FragmentType;

use super::linking::{FieldLink, ResolvedField, StageLinking};
use super::{ComputeProperties, Fragment, LinkedFieldType, ShaderDefinition, fragment_var_name};
use crate::settings::{NameSettings, Settings};

pub(super) fn generate_stage(
    settings: &Settings,
    def: &ShaderDefinition,
    stage: &StageLinking,
) -> Vec<ClassDecl> {
    let generator = StageGenerator {
        names: &settings.names,
        def,
        stage,
        class_name: format!("{}_{}", def.name, stage.stage.name()),
    };
    match stage.stage {
        FragmentType::Geometry => generator.geometry(),
        _ => vec![generator.basic()],
    }
}

struct StageGenerator<'a> {
    names: &'a NameSettings,
    def: &'a ShaderDefinition,
    stage: &'a StageLinking,
    class_name: String,
}

impl StageGenerator<'_> {
    fn class_ty(&self) -> TypeRef {
        TypeRef::named(self.class_name.clone())
    }

    fn class(&self, stage_attribute: Attribute) -> ClassDecl {
        let mut class = ClassDecl::new(self.class_name.clone()).with_attribute(stage_attribute);
        for attr in &self.def.extra_attributes {
            class = class.with_attribute(attr.clone());
        }
        class
    }

    fn stage_attribute(&self) -> Attribute {
        let name = self.names.stage_attribute(self.stage.stage).unwrap_or_default();
        let attr = Attribute::new(name);
        if self.stage.stage != FragmentType::Compute {
            return attr;
        }
        let size = self.local_size();
        let names = self.names;
        let int = |value: u32| AttributeValue::Int(value.into());
        attr.with_param(names.local_size_x_param.clone(), int(size.local_size_x))
            .with_param(names.local_size_y_param.clone(), int(size.local_size_y))
            .with_param(names.local_size_z_param.clone(), int(size.local_size_z))
    }

    /// Explicit override first, then the first compute fragment's attribute.
    fn local_size(&self) -> ComputeProperties {
        if let Some(size) = self.def.compute {
            return size;
        }
        let attr = self
            .stage
            .fragments
            .first()
            .and_then(|f| f.meta.attributes.find_attribute(&self.names.compute));
        let Some(attr) = attr else {
            return ComputeProperties::default();
        };
        let param = |name: &str, position: usize| {
            attr.int_param(name, position)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(1)
        };
        ComputeProperties {
            local_size_x: param(&self.names.local_size_x_param, 0),
            local_size_y: param(&self.names.local_size_y_param, 1),
            local_size_z: param(&self.names.local_size_z_param, 2),
        }
    }

    // ========================================================================
    // Vertex, pixel and compute
    // ========================================================================

    fn basic(&self) -> ClassDecl {
        let mut class = self.class(self.stage_attribute());
        for field in self.ordered_fields() {
            class = class.with_field(field_decl(field));
        }

        let mut body = Vec::new();
        for fragment in &self.stage.fragments {
            let var = fragment_var_name(fragment.name());
            body.push(instantiate(&var, fragment));
            body.extend(self.input_copies(&var, fragment));
            let main =
                FunctionKey::new(fragment.type_ref(), self.names.main_function.clone(), Vec::new());
            body.push(Stmt::expr(
                Expr::local(var, fragment.type_ref()).call(main, Vec::new(), TypeRef::void()),
            ));
        }
        body.extend(self.output_copies());
        class.with_function(self.entry_point().with_body(body))
    }

    /// Stage outputs lead for vertex stages, stage inputs for the rest;
    /// per-primitive fields come last.
    fn ordered_fields(&self) -> Vec<&ResolvedField> {
        let vertex = &self.stage.vertex;
        let leading = if self.stage.stage == FragmentType::Vertex {
            &vertex.outputs
        } else {
            &vertex.inputs
        };
        let mut fields: Vec<&ResolvedField> =
            leading.iter().filter_map(|name| vertex.fields.get(name)).collect();
        for field in vertex.fields.values() {
            if !leading.contains(&field.name) {
                fields.push(field);
            }
        }
        let primitive = self.stage.primitive.fields.values();
        fields.extend(primitive.filter(|f| !vertex.fields.contains_key(&f.name)));
        fields
    }

    fn entry_point(&self) -> FunctionDecl {
        FunctionDecl::new(self.names.main_function.clone())
            .with_attribute(Attribute::new(self.names.entry_point.clone()))
    }

    fn input_copies(&self, var: &str, fragment: &Fragment) -> Vec<Stmt> {
        let Some(link) = self.stage.fragment_links.get(fragment.name()) else {
            return Vec::new();
        };
        link.fields
            .iter()
            .filter_map(|field| {
                let value = self.read_value(field)?;
                let target = Expr::local(var, fragment.type_ref())
                    .field(field.field.name.clone(), field.field.ty.clone());
                Some(Stmt::expr(Expr::assign(target, value)))
            })
            .collect()
    }

    fn read_value(&self, link: &FieldLink) -> Option<Expr> {
        let ty = link.field.ty.clone();
        match link.linked {
            LinkedFieldType::None => None,
            LinkedFieldType::Fragment => {
                let source = link.dependency.as_ref()?;
                let owner = source.owner.as_ref()?;
                Some(fragment_local(owner).field(source.name.clone(), ty))
            }
            LinkedFieldType::SpecConstant => {
                let name = link.field_name.clone()?;
                Some(Expr::type_name(self.class_ty()).field(name, ty))
            }
            LinkedFieldType::Stage
            | LinkedFieldType::HardwareBuiltIn
            | LinkedFieldType::AppBuiltIn
            | LinkedFieldType::Property => {
                let name = link.field_name.clone()?;
                Some(Expr::this(self.class_ty()).field(name, ty))
            }
        }
    }

    /// Copies fragment fields into the stage outputs once every fragment ran.
    fn output_copies(&self) -> Vec<Stmt> {
        let outputs = self
            .stage
            .vertex
            .resolved_outputs
            .values()
            .chain(self.stage.primitive.resolved_outputs.values());
        let mut copies = Vec::new();
        for output in outputs {
            let Some(owner) = &output.source.owner else {
                continue;
            };
            if !self.stage.fragments.iter().any(|f| f.name() == owner) {
                continue;
            }
            let ty = output.source.ty.clone();
            let value = fragment_local(owner).field(output.source.name.clone(), ty.clone());
            let target = Expr::this(self.class_ty()).field(output.field_name.clone(), ty);
            copies.push(Stmt::expr(Expr::assign(target, value)));
        }
        copies
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    /// `{Name}_GeoIn` and `{Name}_GeoOut` vertex structs plus the stage
    /// class whose `Main` forwards its streams to the geometry fragment.
    fn geometry(&self) -> Vec<ClassDecl> {
        let names = self.names;
        let Some(fragment) = self.stage.fragments.first() else {
            return vec![self.basic()];
        };
        let Some(geometry) = fragment.geometry.as_ref() else {
            return vec![self.basic()];
        };

        let in_name = format!("{}_GeoIn", self.def.name);
        let out_name = format!("{}_GeoOut", self.def.name);
        let input_struct =
            self.vertex_struct(&in_name, &[&names.stage_input, &names.hardware_built_in_input]);
        let output_struct =
            self.vertex_struct(&out_name, &[&names.stage_output, &names.hardware_built_in_output]);

        let stream = |template: &TypeRef, vertex: &str| {
            let arg = TemplateArg::Type(TypeRef::named(vertex.to_string()));
            TypeRef::template(template.name.clone(), vec![arg])
        };
        let input_ty = stream(&geometry.input_stream, &in_name);
        let output_ty = stream(&geometry.output_stream, &out_name);
        let in_vertex = TypeRef::named(in_name.clone());

        let max_vertices = Attribute::new(names.geometry.clone()).with_param(
            names.max_vertices_param.clone(),
            AttributeValue::Int(geometry.max_vertices),
        );
        let mut class = self.class(max_vertices);
        for field in self.stage.primitive.fields.values() {
            class = class.with_field(field_decl(field));
        }

        let integer = TypeRef::named("Integer");
        let fragment_input = "fragmentInput";
        let fragment_output = "fragmentOutput";
        let mut body = vec![Stmt::var(
            fragment_input,
            geometry.input_stream.clone(),
            Some(Expr::construct(geometry.input_stream.clone(), Vec::new())),
        )];

        use LinkedFieldType::{HardwareBuiltIn, Stage};
        let input_vertex_ty = geometry.input_vertex.type_ref();
        let per_vertex: Vec<Stmt> = self
            .stage
            .fragment_links
            .get(geometry.input_vertex.name())
            .map(|link| {
                link.fields
                    .iter()
                    .filter(|f| matches!(f.linked, Stage | HardwareBuiltIn))
                    .filter_map(|f| {
                        let source = f.field_name.clone()?;
                        let i = Expr::local("i", integer.clone());
                        let target = Expr::local(fragment_input, geometry.input_stream.clone())
                            .index(i.clone(), input_vertex_ty.clone())
                            .field(f.field.name.clone(), f.field.ty.clone());
                        let value = Expr::local("input", input_ty.clone())
                            .index(i, in_vertex.clone())
                            .field(source, f.field.ty.clone());
                        Some(Stmt::expr(Expr::assign(target, value)))
                    })
                    .collect()
            })
            .unwrap_or_default();
        if !per_vertex.is_empty() {
            let i = Expr::local("i", integer.clone());
            let size = i32::try_from(geometry.input_size).unwrap_or(i32::MAX);
            body.push(Stmt::for_loop(
                Stmt::var("i", integer.clone(), Some(Expr::int(0))),
                Expr::binary(BinaryOp::Lt, i.clone(), Expr::int(size), TypeRef::named("Boolean")),
                Expr::binary(BinaryOp::AddAssign, i, Expr::int(1), integer),
                per_vertex,
            ));
        }

        body.push(Stmt::var(
            fragment_output,
            geometry.output_stream.clone(),
            Some(Expr::construct(geometry.output_stream.clone(), Vec::new())),
        ));
        let var = fragment_var_name(fragment.name());
        body.push(instantiate(&var, fragment));
        body.extend(self.input_copies(&var, fragment));
        let main = FunctionKey::new(
            fragment.type_ref(),
            names.main_function.clone(),
            vec![geometry.input_stream.clone(), geometry.output_stream.clone()],
        );
        let args = vec![
            Expr::local(fragment_input, geometry.input_stream.clone()),
            Expr::local(fragment_output, geometry.output_stream.clone()),
        ];
        let call = Expr::local(var, fragment.type_ref()).call(main, args, TypeRef::void());
        body.push(Stmt::expr(call));

        let entry = self
            .entry_point()
            .with_param("input", input_ty)
            .with_param("output", output_ty)
            .with_body(body);
        vec![input_struct, output_struct, class.with_function(entry)]
    }

    /// Per-vertex struct of the fields carrying one of `attributes`, each
    /// field keeping only those.
    fn vertex_struct(&self, name: &str, attributes: &[&String]) -> ClassDecl {
        let mut class = ClassDecl::new(name.to_string());
        for field in self.stage.vertex.fields.values() {
            let kept: Vec<Attribute> = field
                .attributes
                .iter()
                .filter(|a| attributes.contains(&&a.name))
                .cloned()
                .collect();
            if kept.is_empty() {
                continue;
            }
            let mut decl = FieldDecl::new(field.name.clone(), field.ty.clone());
            decl.attributes = kept;
            class = class.with_field(decl);
        }
        class
    }
}

/// The local a stage's `Main` holds fragment `owner` in.
fn fragment_local(owner: &str) -> Expr {
    Expr::local(fragment_var_name(owner), TypeRef::named(owner.to_string()))
}

fn instantiate(var: &str, fragment: &Fragment) -> Stmt {
    let ty = fragment.type_ref();
    Stmt::var(var, ty.clone(), Some(Expr::construct(ty, Vec::new())))
}

fn field_decl(field: &ResolvedField) -> FieldDecl {
    let mut decl = FieldDecl::new(field.name.clone(), field.ty.clone());
    decl.attributes = field.attributes.clone();
    decl.initializer = field.initializer.clone();
    decl.is_static = field.is_static;
    decl
}
