//! Syntax tree produced by [`crate::parse`].
//!
//! Nodes own their text and carry byte [`Span`]s into the source they were
//! parsed from. Type references are kept as written; nothing here is resolved.

use std::fmt;

use crate::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    pub package: Option<PackageDecl>,
    pub imports: Vec<ImportDecl>,
    pub types: Vec<ClassDecl>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDecl {
    pub name: String,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub is_static: bool,
    pub is_star: bool,
    pub path: String,
    pub range: Span,
}

impl ImportDecl {
    /// Last segment of a single-type import (`foo.Bar` -> `Bar`).
    pub fn simple_name(&self) -> Option<&str> {
        if self.is_star {
            return None;
        }
        self.path.rsplit('.').next()
    }
}

/// Declared access level, ordered from narrowest to widest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Visibility {
    Private,
    #[default]
    Package,
    Protected,
    Public,
}

impl Visibility {
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Visibility::Private => Some("private"),
            Visibility::Package => None,
            Visibility::Protected => Some("protected"),
            Visibility::Public => Some("public"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub name: String,
    /// Annotation text with whitespace removed, arguments included.
    pub text: String,
    pub range: Span,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_default: bool,
    pub annotations: Vec<Annotation>,
    pub range: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl ClassKind {
    pub fn is_interface(self) -> bool {
        matches!(self, ClassKind::Interface | ClassKind::Annotation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub kind: ClassKind,
    pub modifiers: Modifiers,
    pub name: String,
    pub name_range: Span,
    pub extends: Vec<TypeRef>,
    pub implements: Vec<TypeRef>,
    pub enum_constants: Vec<EnumConstant>,
    pub members: Vec<MemberDecl>,
    pub body_range: Span,
    pub range: Span,
}

impl ClassDecl {
    /// Declaration header: modifiers through the opening brace of the body.
    pub fn header_range(&self) -> Span {
        Span::new(self.range.start, self.body_range.start.max(self.range.start))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    pub name: String,
    pub name_range: Span,
    pub args: Vec<Expr>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberDecl {
    Field(FieldDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
    Initializer(InitializerDecl),
    Type(ClassDecl),
}

impl MemberDecl {
    pub fn range(&self) -> Span {
        match self {
            MemberDecl::Field(decl) => decl.range,
            MemberDecl::Method(decl) => decl.range,
            MemberDecl::Constructor(decl) => decl.range,
            MemberDecl::Initializer(decl) => decl.range,
            MemberDecl::Type(decl) => decl.range,
        }
    }
}

/// A type as written at a use site.
#[derive(Clone, PartialEq, Eq)]
pub struct TypeRef {
    /// Dotted name without type arguments, e.g. `java.util.List` or `int`.
    pub name: String,
    pub type_args: Vec<TypeRef>,
    pub array_dims: u8,
    pub range: Span,
}

impl TypeRef {
    pub fn simple(name: impl Into<String>, range: Span) -> Self {
        TypeRef {
            name: name.into(),
            type_args: Vec::new(),
            array_dims: 0,
            range,
        }
    }

    /// Canonical text with whitespace removed (`Map<String,List<Foo>>[]`).
    pub fn text(&self) -> String {
        self.to_string()
    }

    pub fn is_primitive(&self) -> bool {
        self.array_dims == 0 && is_primitive_name(&self.name)
    }

    pub fn element_type(&self) -> TypeRef {
        TypeRef {
            array_dims: self.array_dims.saturating_sub(1),
            ..self.clone()
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.type_args.is_empty() {
            f.write_str("<")?;
            for (idx, arg) in self.type_args.iter().enumerate() {
                if idx > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        for _ in 0..self.array_dims {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({self} @ {:?})", self.range)
    }
}

pub fn is_primitive_name(name: &str) -> bool {
    matches!(
        name,
        "boolean" | "byte" | "short" | "char" | "int" | "long" | "float" | "double" | "void"
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    pub name: String,
    pub name_range: Span,
    pub initializer: Option<Expr>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub is_final: bool,
    pub ty: TypeRef,
    pub is_varargs: bool,
    pub name: String,
    pub name_range: Span,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub modifiers: Modifiers,
    pub return_ty: TypeRef,
    pub name: String,
    pub name_range: Span,
    pub params: Vec<ParamDecl>,
    pub body: Option<Block>,
    pub range: Span,
}

impl MethodDecl {
    /// Everything up to (but excluding) the body.
    pub fn header_range(&self) -> Span {
        match &self.body {
            Some(body) => Span::new(self.range.start, body.range.start),
            None => self.range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorDecl {
    pub modifiers: Modifiers,
    pub name: String,
    pub name_range: Span,
    pub params: Vec<ParamDecl>,
    pub body: Block,
    pub range: Span,
}

impl ConstructorDecl {
    pub fn header_range(&self) -> Span {
        Span::new(self.range.start, self.body.range.start)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializerDecl {
    pub is_static: bool,
    pub body: Block,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    LocalVar(LocalVarStmt),
    LocalClass(ClassDecl),
    Expr(ExprStmt),
    Return(ReturnStmt),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Try(TryStmt),
    Block(Block),
    Empty(Span),
}

impl Stmt {
    pub fn range(&self) -> Span {
        match self {
            Stmt::LocalVar(stmt) => stmt.range,
            Stmt::LocalClass(decl) => decl.range,
            Stmt::Expr(stmt) => stmt.range,
            Stmt::Return(stmt) => stmt.range,
            Stmt::If(stmt) => stmt.range,
            Stmt::While(stmt) => stmt.range,
            Stmt::For(stmt) => stmt.range,
            Stmt::Try(stmt) => stmt.range,
            Stmt::Block(block) => block.range,
            Stmt::Empty(range) => *range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVarStmt {
    pub is_final: bool,
    pub ty: TypeRef,
    pub name: String,
    pub name_range: Span,
    pub initializer: Option<Expr>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprStmt {
    pub expr: Expr,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnStmt {
    pub expr: Option<Expr>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    /// `else if` branches in source order, kept flat so long chains stay shallow.
    pub else_ifs: Vec<ElseIf>,
    pub else_branch: Option<Box<Stmt>>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElseIf {
    pub condition: Expr,
    pub body: Box<Stmt>,
    pub range: Span,
}

/// `while` and `do ... while` loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Stmt>,
    pub range: Span,
}

/// Basic and enhanced `for` loops. An enhanced loop has a single
/// initializer-less local in `init` and the iterated expression in `iterable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForStmt {
    pub init: Vec<Stmt>,
    pub condition: Option<Expr>,
    pub updates: Vec<Expr>,
    pub iterable: Option<Expr>,
    pub body: Box<Stmt>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryStmt {
    pub body: Block,
    pub catches: Vec<CatchClause>,
    pub finally: Option<Block>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchClause {
    pub param: ParamDecl,
    pub body: Block,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Name(NameExpr),
    Literal(LiteralExpr),
    This(Span),
    FieldAccess(FieldAccessExpr),
    Call(CallExpr),
    New(NewExpr),
    Assign(AssignExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Conditional(ConditionalExpr),
    InstanceOf(InstanceOfExpr),
    Cast(CastExpr),
    Index(IndexExpr),
    Missing(Span),
}

impl Expr {
    pub fn range(&self) -> Span {
        match self {
            Expr::Name(expr) => expr.range,
            Expr::Literal(expr) => expr.range,
            Expr::This(range) => *range,
            Expr::FieldAccess(expr) => expr.range,
            Expr::Call(expr) => expr.range,
            Expr::New(expr) => expr.range,
            Expr::Assign(expr) => expr.range,
            Expr::Unary(expr) => expr.range,
            Expr::Binary(expr) => expr.range,
            Expr::Conditional(expr) => expr.range,
            Expr::InstanceOf(expr) => expr.range,
            Expr::Cast(expr) => expr.range,
            Expr::Index(expr) => expr.range,
            Expr::Missing(range) => *range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameExpr {
    pub name: String,
    pub range: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Int,
    Long,
    Float,
    Double,
    Char,
    String,
    Bool,
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralExpr {
    pub kind: LiteralKind,
    pub value: String,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAccessExpr {
    pub receiver: Box<Expr>,
    pub name: String,
    pub name_range: Span,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallExpr {
    /// A [`Expr::Name`] for unqualified calls, otherwise a [`Expr::FieldAccess`].
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpr {
    pub ty: TypeRef,
    pub args: Vec<Expr>,
    /// Anonymous class body.
    pub body: Option<AnonymousBody>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymousBody {
    pub members: Vec<MemberDecl>,
    pub range: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Compound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignExpr {
    pub op: AssignOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    pub range: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    /// `++`/`--`, prefix or postfix.
    Step,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub expr: Box<Expr>,
    pub range: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalExpr {
    pub condition: Box<Expr>,
    pub then_expr: Box<Expr>,
    pub else_expr: Box<Expr>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceOfExpr {
    pub expr: Box<Expr>,
    pub ty: TypeRef,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastExpr {
    pub ty: TypeRef,
    pub expr: Box<Expr>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexExpr {
    pub target: Box<Expr>,
    pub index: Box<Expr>,
    pub range: Span,
}
