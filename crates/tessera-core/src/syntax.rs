//! Typed syntax tree handed in by the host.
//!
//! Every name here is already resolved: expressions carry their type,
//! calls carry the structural key of their target. The tree is plain data
//! (serde) so hosts and fixtures can produce it as JSON.

use serde::{Deserialize, Serialize};

use crate::{Attribute, FunctionKey, Span, TypeRef};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: SourceEntry) -> Self {
        self.sources.push(source);
        self
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.sources.iter().flat_map(|s| s.types.iter()).filter_map(|t| match t {
            TypeDecl::Class(c) => Some(c),
            TypeDecl::Enum(_) => None,
        })
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumDecl> {
        self.sources.iter().flat_map(|s| s.types.iter()).filter_map(|t| match t {
            TypeDecl::Enum(e) => Some(e),
            TypeDecl::Class(_) => None,
        })
    }

    pub fn find_class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceEntry {
    pub origin: String,
    #[serde(default)]
    pub code: String,
    /// Opaque host data carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<serde_json::Value>,
    #[serde(default)]
    pub types: Vec<TypeDecl>,
}

impl SourceEntry {
    pub fn new(origin: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            code: code.into(),
            user_data: None,
            types: Vec::new(),
        }
    }

    pub fn with_type(mut self, decl: impl Into<TypeDecl>) -> Self {
        self.types.push(decl.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decl", rename_all = "snake_case")]
pub enum TypeDecl {
    Class(ClassDecl),
    Enum(EnumDecl),
}

impl From<ClassDecl> for TypeDecl {
    fn from(value: ClassDecl) -> Self {
        Self::Class(value)
    }
}

impl From<EnumDecl> for TypeDecl {
    fn from(value: EnumDecl) -> Self {
        Self::Enum(value)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub properties: Vec<PropertyDecl>,
    #[serde(default)]
    pub constructors: Vec<FunctionDecl>,
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
    #[serde(default)]
    pub span: Span,
}

impl ClassDecl {
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::named(self.name.clone())
    }

    pub fn find_function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initializer: Option<Expr>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Vec<Stmt>>,
    /// The incoming value is visible as the local `value`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Vec<Stmt>>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default = "TypeRef::void")]
    pub return_type: TypeRef,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub body: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
}

impl FunctionDecl {
    pub fn key(&self, owner: &TypeRef) -> FunctionKey {
        FunctionKey::new(
            owner.clone(),
            self.name.clone(),
            self.params.iter().map(|p| p.ty.clone()).collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    #[serde(default)]
    pub values: Vec<EnumValue>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub value: i32,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stmt", rename_all = "snake_case")]
pub enum Stmt {
    Var {
        name: String,
        ty: TypeRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init: Option<Expr>,
        #[serde(default)]
        span: Span,
    },
    Expr {
        expr: Expr,
        #[serde(default)]
        span: Span,
    },
    If {
        cond: Expr,
        then: Vec<Stmt>,
        #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
        else_body: Option<Vec<Stmt>>,
        #[serde(default)]
        span: Span,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
    DoWhile {
        body: Vec<Stmt>,
        cond: Expr,
        #[serde(default)]
        span: Span,
    },
    For {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init: Option<Box<Stmt>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cond: Option<Expr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<Expr>,
        body: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
    Loop {
        body: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
    Break {
        #[serde(default)]
        span: Span,
    },
    Continue {
        #[serde(default)]
        span: Span,
    },
    Return {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Expr>,
        #[serde(default)]
        span: Span,
    },
    Scope {
        body: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Var { span, .. }
            | Stmt::Expr { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::For { span, .. }
            | Stmt::Loop { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span }
            | Stmt::Return { span, .. }
            | Stmt::Scope { span, .. } => *span,
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(flatten)]
    pub kind: ExprKind,
    #[serde(default = "TypeRef::void")]
    pub ty: TypeRef,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum ExprKind {
    Literal {
        value: Literal,
    },
    Local {
        name: String,
    },
    This,
    /// Target of a static member access.
    TypeName {
        target: TypeRef,
    },
    Member {
        target: Box<Expr>,
        name: String,
        #[serde(default)]
        kind: MemberKind,
    },
    Call {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Box<Expr>>,
        function: FunctionKey,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(default)]
        is_static: bool,
    },
    /// Constructs a value of the expression's own type.
    Construct {
        #[serde(default)]
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Converts the operand to the expression's own type.
    Cast {
        operand: Box<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i32),
    Real(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    #[default]
    Field,
    Property,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+=")]
    AddAssign,
    #[serde(rename = "-=")]
    SubAssign,
    #[serde(rename = "*=")]
    MulAssign,
    #[serde(rename = "/=")]
    DivAssign,
    #[serde(rename = "%=")]
    ModAssign,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::Assign => "=",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
            Self::MulAssign => "*=",
            Self::DivAssign => "/=",
            Self::ModAssign => "%=",
        }
    }

    pub fn is_assignment(self) -> bool {
        self == Self::Assign || self.compound_base().is_some()
    }

    /// `+=` -> `+`, and so on. `None` for non-compound operators.
    pub fn compound_base(self) -> Option<BinaryOp> {
        match self {
            Self::AddAssign => Some(Self::Add),
            Self::SubAssign => Some(Self::Sub),
            Self::MulAssign => Some(Self::Mul),
            Self::DivAssign => Some(Self::Div),
            Self::ModAssign => Some(Self::Mod),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "-")]
    Negate,
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "++")]
    Increment,
    #[serde(rename = "--")]
    Decrement,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Not => "!",
            Self::Increment => "++",
            Self::Decrement => "--",
        }
    }
}
