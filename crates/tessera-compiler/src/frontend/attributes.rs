//! Attribute validation, run before translation.
//!
//! Checks stage attributes on classes, their parameters, in/out attributes
//! on fields and specialization constants. Problems are reported; the
//! translator carries on with whatever the attributes still imply.

use tessera_core::{
    Attribute, AttributeList, AttributeValue, ClassDecl, FieldDecl, FieldKey, Project,
};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::settings::Settings;

/// Scalar and vector families a specialization constant may have.
const SPEC_CONSTANT_FAMILIES: [&str; 3] = ["Boolean", "Integer", "Real"];

pub fn validate_attributes(project: &Project, settings: &Settings, diag: &mut Diagnostics) {
    let validator = AttributeValidator { settings };
    for class in project.classes() {
        validator.class(class, diag);
    }
}

struct AttributeValidator<'s> {
    settings: &'s Settings,
}

impl AttributeValidator<'_> {
    fn class(&self, class: &ClassDecl, diag: &mut Diagnostics) {
        let names = &self.settings.names;
        let stages: Vec<&Attribute> = class
            .attributes
            .iter()
            .filter(|a| names.stage_of(&a.name).is_some())
            .collect();
        if let [first, rest @ ..] = &stages[..] {
            for other in rest {
                diag.report(DiagnosticKind::ConflictingAttributes, other.span)
                    .message(format!("`{}` conflicts with `{}`", other.name, first.name))
                    .related_to(format!("`{}` declared here", first.name), first.span)
                    .emit();
            }
        }

        if let Some(geometry) = class.attributes.find_attribute(&names.geometry) {
            match geometry.param(&names.max_vertices_param, 0) {
                None => {
                    diag.report(DiagnosticKind::InvalidAttribute, geometry.span)
                        .message(format!(
                            "`{}` requires an integer `{}`",
                            names.geometry, names.max_vertices_param
                        ))
                        .emit();
                }
                Some(value) => {
                    let param = &names.max_vertices_param;
                    self.int_in_range(geometry, param, value, 1, 1024, diag)
                }
            }
        }

        if let Some(compute) = class.attributes.find_attribute(&names.compute) {
            let limits = [
                (&names.local_size_x_param, 1024),
                (&names.local_size_y_param, 1024),
                (&names.local_size_z_param, 64),
            ];
            for (position, (param, max)) in limits.into_iter().enumerate() {
                if let Some(value) = compute.param(param, position) {
                    self.int_in_range(compute, param, value, 1, max, diag);
                }
            }
        }

        for field in &class.fields {
            self.field(field, diag);
        }

        for function in &class.functions {
            if function.name != names.main_function {
                if let Some(attr) = function.attributes.find_attribute(&names.entry_point) {
                    diag.report(DiagnosticKind::IgnoredAttribute, attr.span)
                        .message(format!(
                            "`{}` only applies to `{}`",
                            names.entry_point, names.main_function
                        ))
                        .emit();
                }
            }
        }
    }

    fn int_in_range(
        &self,
        attr: &Attribute,
        param: &str,
        value: &AttributeValue,
        min: i64,
        max: i64,
        diag: &mut Diagnostics,
    ) {
        let Some(int) = value.as_int() else {
            diag.report(DiagnosticKind::InvalidAttribute, attr.span)
                .message(format!("`{param}` expects Integer, found {}", value.kind_name()))
                .emit();
            return;
        };
        if int < min || int > max {
            diag.report(DiagnosticKind::AttributeOutOfRange, attr.span)
                .message(format!("`{param}` must be between {min} and {max}, found {int}"))
                .emit();
        }
    }

    fn field(&self, field: &FieldDecl, diag: &mut Diagnostics) {
        let names = &self.settings.names;
        for attr in &field.attributes {
            if names.stage_of(&attr.name).is_some() {
                diag.report(DiagnosticKind::IgnoredAttribute, attr.span)
                    .message(format!("`{}` only applies to classes", attr.name))
                    .emit();
                continue;
            }

            let is_in_out = names.is_input(&attr.name) || names.is_output(&attr.name);
            if is_in_out {
                if let Some(value) = attr.param(&names.name_param, 0) {
                    if value.as_str().is_none() {
                        diag.report(DiagnosticKind::InvalidAttribute, attr.span)
                            .message(format!(
                                "`{}` expects String, found {}",
                                names.name_param,
                                value.kind_name()
                            ))
                            .emit();
                    }
                }
            }

            let is_hardware = attr.name == names.hardware_built_in_input
                || attr.name == names.hardware_built_in_output;
            if is_hardware {
                let name = attr.string_param(&names.name_param).unwrap_or(&field.name);
                let key = FieldKey::new(name, field.ty.to_string());
                if !self.settings.built_ins.is_any_built_in(&key) {
                    diag.report(DiagnosticKind::UnknownHardwareBuiltIn, attr.span)
                        .message(key.to_string())
                        .emit();
                }
            }

            let valid_spec_constant =
                field.is_static && is_spec_constant_type(&field.ty.to_string());
            if attr.name == names.spec_constant && !valid_spec_constant {
                diag.report(DiagnosticKind::InvalidSpecConstant, attr.span)
                    .message(format!("`{}` must be a static scalar or vector field", field.name))
                    .emit();
            }
        }
    }
}

fn is_spec_constant_type(name: &str) -> bool {
    SPEC_CONSTANT_FAMILIES.iter().any(|family| {
        name.strip_prefix(family)
            .is_some_and(|rest| rest.is_empty() || matches!(rest, "2" | "3" | "4"))
    })
}
