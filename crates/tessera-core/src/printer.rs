//! Renders declarations back to scripting-language source text.

use std::fmt::Write;

use crate::syntax::{
    ClassDecl, EnumDecl, Expr, ExprKind, FieldDecl, FunctionDecl, Literal, PropertyDecl, Stmt,
    TypeDecl,
};
use crate::Attribute;

const INDENT: &str = "  ";

pub struct SourcePrinter<'a> {
    decls: Vec<&'a ClassDecl>,
    enums: Vec<&'a EnumDecl>,
}

impl<'a> SourcePrinter<'a> {
    pub fn new() -> Self {
        Self {
            decls: Vec::new(),
            enums: Vec::new(),
        }
    }

    pub fn class(mut self, class: &'a ClassDecl) -> Self {
        self.decls.push(class);
        self
    }

    pub fn classes(mut self, classes: impl IntoIterator<Item = &'a ClassDecl>) -> Self {
        self.decls.extend(classes);
        self
    }

    pub fn types(mut self, types: &'a [TypeDecl]) -> Self {
        for decl in types {
            match decl {
                TypeDecl::Class(c) => self.decls.push(c),
                TypeDecl::Enum(e) => self.enums.push(e),
            }
        }
        self
    }

    pub fn dump(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.format(&mut out);
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        let mut first = true;
        for e in &self.enums {
            if !first {
                writeln!(w)?;
            }
            first = false;
            format_enum(e, w)?;
        }
        for class in &self.decls {
            if !first {
                writeln!(w)?;
            }
            first = false;
            format_class(class, w)?;
        }
        Ok(())
    }
}

impl Default for SourcePrinter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn format_enum(e: &EnumDecl, w: &mut impl Write) -> std::fmt::Result {
    writeln!(w, "enum {}", e.name)?;
    writeln!(w, "{{")?;
    for (i, v) in e.values.iter().enumerate() {
        let sep = if i + 1 < e.values.len() { "," } else { "" };
        writeln!(w, "{INDENT}{} = {}{sep}", v.name, v.value)?;
    }
    writeln!(w, "}}")
}

fn format_class(class: &ClassDecl, w: &mut impl Write) -> std::fmt::Result {
    if !class.attributes.is_empty() {
        format_attributes(&class.attributes, false, w)?;
        writeln!(w)?;
    }
    writeln!(w, "struct {}", class.name)?;
    writeln!(w, "{{")?;

    let mut section = false;
    for field in &class.fields {
        format_field(field, w)?;
        section = true;
    }
    for property in &class.properties {
        if section {
            writeln!(w)?;
        }
        format_property(property, w)?;
        section = true;
    }
    for ctor in &class.constructors {
        if section {
            writeln!(w)?;
        }
        format_function(ctor, true, w)?;
        section = true;
    }
    for function in &class.functions {
        if section {
            writeln!(w)?;
        }
        format_function(function, false, w)?;
        section = true;
    }

    writeln!(w, "}}")
}

pub fn format_attribute(attr: &Attribute, w: &mut impl Write) -> std::fmt::Result {
    write!(w, "[{}", attr.name)?;
    if !attr.params.is_empty() {
        write!(w, "(")?;
        for (i, param) in attr.params.iter().enumerate() {
            if i > 0 {
                write!(w, ", ")?;
            }
            match &param.name {
                Some(name) => write!(w, "{name} : {}", param.value)?,
                None => write!(w, "{}", param.value)?,
            }
        }
        write!(w, ")")?;
    }
    write!(w, "]")
}

fn format_attributes(attrs: &[Attribute], is_static: bool, w: &mut impl Write) -> std::fmt::Result {
    if is_static {
        write!(w, "[Static]")?;
    }
    for attr in attrs {
        format_attribute(attr, w)?;
    }
    Ok(())
}

fn format_field(field: &FieldDecl, w: &mut impl Write) -> std::fmt::Result {
    write!(w, "{INDENT}")?;
    if field.is_static || !field.attributes.is_empty() {
        format_attributes(&field.attributes, field.is_static, w)?;
        write!(w, " ")?;
    }
    write!(w, "var {} : {}", field.name, field.ty)?;
    if let Some(init) = &field.initializer {
        write!(w, " = {}", expr_text(init))?;
    }
    writeln!(w, ";")
}

fn format_property(property: &PropertyDecl, w: &mut impl Write) -> std::fmt::Result {
    let pad = INDENT;
    if property.is_static || !property.attributes.is_empty() {
        write!(w, "{pad}")?;
        format_attributes(&property.attributes, property.is_static, w)?;
        writeln!(w)?;
    }
    writeln!(w, "{pad}var {} : {}", property.name, property.ty)?;
    writeln!(w, "{pad}{{")?;
    if let Some(get) = &property.get {
        writeln!(w, "{pad}{INDENT}get")?;
        format_block(get, 2, w)?;
    }
    if let Some(set) = &property.set {
        writeln!(w, "{pad}{INDENT}set")?;
        format_block(set, 2, w)?;
    }
    writeln!(w, "{pad}}}")
}

fn format_function(function: &FunctionDecl, is_ctor: bool, w: &mut impl Write) -> std::fmt::Result {
    if function.is_static || !function.attributes.is_empty() {
        write!(w, "{INDENT}")?;
        format_attributes(&function.attributes, function.is_static, w)?;
        writeln!(w)?;
    }
    if is_ctor {
        write!(w, "{INDENT}constructor(")?;
    } else {
        write!(w, "{INDENT}function {}(", function.name)?;
    }
    for (i, p) in function.params.iter().enumerate() {
        if i > 0 {
            write!(w, ", ")?;
        }
        write!(w, "{} : {}", p.name, p.ty)?;
    }
    write!(w, ")")?;
    if !is_ctor && !function.return_type.is_void() {
        write!(w, " : {}", function.return_type)?;
    }
    writeln!(w)?;
    format_block(&function.body, 1, w)
}

fn format_block(body: &[Stmt], depth: usize, w: &mut impl Write) -> std::fmt::Result {
    let pad = INDENT.repeat(depth);
    writeln!(w, "{pad}{{")?;
    for stmt in body {
        format_stmt(stmt, depth + 1, w)?;
    }
    writeln!(w, "{pad}}}")
}

fn format_stmt(stmt: &Stmt, depth: usize, w: &mut impl Write) -> std::fmt::Result {
    let pad = INDENT.repeat(depth);
    match stmt {
        Stmt::Var { .. } | Stmt::Expr { .. } => writeln!(w, "{pad}{};", inline_stmt(stmt)),
        Stmt::If {
            cond,
            then,
            else_body,
            ..
        } => {
            writeln!(w, "{pad}if ({})", expr_text(cond))?;
            format_block(then, depth, w)?;
            if let Some(else_body) = else_body {
                writeln!(w, "{pad}else")?;
                format_block(else_body, depth, w)?;
            }
            Ok(())
        }
        Stmt::While { cond, body, .. } => {
            writeln!(w, "{pad}while ({})", expr_text(cond))?;
            format_block(body, depth, w)
        }
        Stmt::DoWhile { body, cond, .. } => {
            writeln!(w, "{pad}do")?;
            format_block(body, depth, w)?;
            writeln!(w, "{pad}while ({});", expr_text(cond))
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
            ..
        } => {
            let init = init.as_deref().map(inline_stmt).unwrap_or_default();
            let cond = cond.as_ref().map(expr_text).unwrap_or_default();
            let step = step.as_ref().map(expr_text).unwrap_or_default();
            writeln!(w, "{pad}for ({init}; {cond}; {step})")?;
            format_block(body, depth, w)
        }
        Stmt::Loop { body, .. } => {
            writeln!(w, "{pad}loop")?;
            format_block(body, depth, w)
        }
        Stmt::Scope { body, .. } => {
            writeln!(w, "{pad}scope")?;
            format_block(body, depth, w)
        }
        Stmt::Break { .. } => writeln!(w, "{pad}break;"),
        Stmt::Continue { .. } => writeln!(w, "{pad}continue;"),
        Stmt::Return { value, .. } => match value {
            Some(value) => writeln!(w, "{pad}return {};", expr_text(value)),
            None => writeln!(w, "{pad}return;"),
        },
    }
}

fn inline_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Var {
            name,
            init: Some(init),
            ..
        } => format!("var {name} = {}", expr_text(init)),
        Stmt::Var { name, ty, .. } => format!("var {name} : {ty}"),
        Stmt::Expr { expr, .. } => expr_text(expr),
        _ => String::new(),
    }
}

/// Renders an expression on one line.
pub fn expr_text(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal { value } => match value {
            Literal::Bool(v) => v.to_string(),
            Literal::Int(v) => v.to_string(),
            Literal::Real(v) => format!("{v:?}"),
        },
        ExprKind::Local { name } => name.clone(),
        ExprKind::This => "this".to_string(),
        ExprKind::TypeName { target } => target.to_string(),
        ExprKind::Member { target, name, .. } => format!("{}.{name}", operand_text(target)),
        ExprKind::Call {
            target,
            function,
            args,
            ..
        } => {
            let receiver = match target {
                Some(target) => operand_text(target),
                None => function.owner.to_string(),
            };
            format!("{receiver}.{}({})", function.name, args_text(args))
        }
        ExprKind::Construct { args } => format!("{}({})", expr.ty, args_text(args)),
        ExprKind::Binary { op, lhs, rhs } => {
            format!("{} {} {}", operand_text(lhs), op.symbol(), operand_text(rhs))
        }
        ExprKind::Unary { op, operand } => format!("{}{}", op.symbol(), operand_text(operand)),
        ExprKind::Cast { operand } => format!("{} as {}", operand_text(operand), expr.ty),
        ExprKind::Index { target, index } => {
            format!("{}[{}]", operand_text(target), expr_text(index))
        }
    }
}

fn operand_text(expr: &Expr) -> String {
    match expr.kind {
        ExprKind::Binary { .. } | ExprKind::Cast { .. } => format!("({})", expr_text(expr)),
        _ => expr_text(expr),
    }
}

fn args_text(args: &[Expr]) -> String {
    args.iter().map(expr_text).collect::<Vec<_>>().join(", ")
}
