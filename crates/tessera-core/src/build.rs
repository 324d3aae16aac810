//! Constructors for syntax nodes.
//!
//! Used by the compositor to generate composite classes and by tests to
//! build fixtures without spelling out every span.

use crate::syntax::{
    BinaryOp, ClassDecl, Expr, ExprKind, FieldDecl, FunctionDecl, Literal, MemberKind, Param,
    PropertyDecl, Stmt,
};
use crate::{Attribute, AttributeValue, FunctionKey, Span, TypeRef};

impl Expr {
    pub fn new(kind: ExprKind, ty: TypeRef) -> Self {
        Self {
            kind,
            ty,
            span: Span::default(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn bool(value: bool) -> Self {
        Self::new(
            ExprKind::Literal {
                value: Literal::Bool(value),
            },
            TypeRef::named("Boolean"),
        )
    }

    pub fn int(value: i32) -> Self {
        Self::new(
            ExprKind::Literal {
                value: Literal::Int(value),
            },
            TypeRef::named("Integer"),
        )
    }

    pub fn real(value: f32) -> Self {
        Self::new(
            ExprKind::Literal {
                value: Literal::Real(value),
            },
            TypeRef::named("Real"),
        )
    }

    pub fn local(name: impl Into<String>, ty: TypeRef) -> Self {
        Self::new(ExprKind::Local { name: name.into() }, ty)
    }

    pub fn this(ty: TypeRef) -> Self {
        Self::new(ExprKind::This, ty)
    }

    pub fn type_name(target: TypeRef) -> Self {
        Self::new(
            ExprKind::TypeName {
                target: target.clone(),
            },
            target,
        )
    }

    pub fn field(self, name: impl Into<String>, ty: TypeRef) -> Self {
        Self::new(
            ExprKind::Member {
                target: Box::new(self),
                name: name.into(),
                kind: MemberKind::Field,
            },
            ty,
        )
    }

    pub fn property(self, name: impl Into<String>, ty: TypeRef) -> Self {
        Self::new(
            ExprKind::Member {
                target: Box::new(self),
                name: name.into(),
                kind: MemberKind::Property,
            },
            ty,
        )
    }

    /// Instance call on `self`.
    pub fn call(self, function: FunctionKey, args: Vec<Expr>, ty: TypeRef) -> Self {
        Self::new(
            ExprKind::Call {
                target: Some(Box::new(self)),
                function,
                args,
                is_static: false,
            },
            ty,
        )
    }

    pub fn static_call(function: FunctionKey, args: Vec<Expr>, ty: TypeRef) -> Self {
        Self::new(
            ExprKind::Call {
                target: None,
                function,
                args,
                is_static: true,
            },
            ty,
        )
    }

    pub fn construct(ty: TypeRef, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Construct { args }, ty)
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, ty: TypeRef) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        )
    }

    pub fn assign(lhs: Expr, rhs: Expr) -> Self {
        let ty = lhs.ty.clone();
        Self::binary(BinaryOp::Assign, lhs, rhs, ty)
    }

    pub fn cast(self, ty: TypeRef) -> Self {
        Self::new(
            ExprKind::Cast {
                operand: Box::new(self),
            },
            ty,
        )
    }

    pub fn index(self, index: Expr, ty: TypeRef) -> Self {
        Self::new(
            ExprKind::Index {
                target: Box::new(self),
                index: Box::new(index),
            },
            ty,
        )
    }
}

impl Stmt {
    pub fn var(name: impl Into<String>, ty: TypeRef, init: Option<Expr>) -> Self {
        Stmt::Var {
            name: name.into(),
            ty,
            init,
            span: Span::default(),
        }
    }

    pub fn expr(expr: Expr) -> Self {
        Stmt::Expr {
            expr,
            span: Span::default(),
        }
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Stmt::Return {
            value,
            span: Span::default(),
        }
    }

    pub fn if_else(cond: Expr, then: Vec<Stmt>, else_body: Option<Vec<Stmt>>) -> Self {
        Stmt::If {
            cond,
            then,
            else_body,
            span: Span::default(),
        }
    }

    pub fn while_loop(cond: Expr, body: Vec<Stmt>) -> Self {
        Stmt::While {
            cond,
            body,
            span: Span::default(),
        }
    }

    pub fn for_loop(init: Stmt, cond: Expr, step: Expr, body: Vec<Stmt>) -> Self {
        Stmt::For {
            init: Some(Box::new(init)),
            cond: Some(cond),
            step: Some(step),
            body,
            span: Span::default(),
        }
    }
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            attributes: Vec::new(),
            is_static: false,
            initializer: None,
            span: Span::default(),
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_initializer(mut self, init: Expr) -> Self {
        self.initializer = Some(init);
        self
    }

    pub fn make_static(mut self) -> Self {
        self.is_static = true;
        self
    }
}

impl PropertyDecl {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            attributes: Vec::new(),
            is_static: false,
            get: None,
            set: None,
            span: Span::default(),
        }
    }

    pub fn with_getter(mut self, body: Vec<Stmt>) -> Self {
        self.get = Some(body);
        self
    }

    pub fn with_setter(mut self, body: Vec<Stmt>) -> Self {
        self.set = Some(body);
        self
    }
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: TypeRef::void(),
            attributes: Vec::new(),
            is_static: false,
            body: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty,
            span: Span::default(),
        });
        self
    }

    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.return_type = ty;
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }

    pub fn make_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_property(mut self, property: PropertyDecl) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_constructor(mut self, ctor: FunctionDecl) -> Self {
        self.constructors.push(ctor);
        self
    }

    pub fn with_function(mut self, function: FunctionDecl) -> Self {
        self.functions.push(function);
        self
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}
