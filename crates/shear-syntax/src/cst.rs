//! Owned, typed concrete syntax tree.
//!
//! Every node records an inclusive [`TokenSpan`] back into the token stream
//! that produced it. The tree is never mutated; all changes are expressed as
//! token-span edits against the original stream (see
//! [`crate::rewrite::TokenRewriter`]).
//!
//! Expression shape is decided once at parse time and carried as a tagged
//! variant, so consumers classify `base.suffix` accesses, calls and
//! constructions by pattern match instead of re-inspecting nodes.

/// Inclusive span of token indices: `start` is the first token of the node,
/// `end` the last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

impl TokenSpan {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "invalid token span {start}..={end}");
        Self { start, end }
    }

    /// True when `other` lies entirely within `self`.
    pub fn contains(self, other: TokenSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True when the spans share at least one token index.
    pub fn overlaps(self, other: TokenSpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompilationUnit {
    pub types: Vec<ClassDecl>,
}

/// A class (or, parsed permissively, interface/enum) declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDecl {
    /// Modifier spellings in source order, annotations included.
    pub modifiers: Vec<String>,
    pub name: String,
    pub extends: Option<String>,
    pub members: Vec<Member>,
    /// Whole declaration, first modifier through closing brace.
    pub span: TokenSpan,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
    Class(ClassDecl),
    /// Anything the restricted grammar does not model (initializer blocks,
    /// enum constants, ...), kept only as a span.
    Other(TokenSpan),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDecl {
    pub modifiers: Vec<String>,
    pub ty: TypeRef,
    pub declarators: Vec<VarDeclarator>,
    /// Whole statement, first modifier through `;`.
    pub span: TokenSpan,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VarDeclarator {
    pub name: String,
    pub name_span: TokenSpan,
    pub init: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDecl {
    pub modifiers: Vec<String>,
    pub return_ty: TypeRef,
    pub name: String,
    pub params: Vec<Param>,
    /// `None` for abstract/interface methods ending in `;`.
    pub body: Option<Block>,
    /// Whole declaration, first modifier through closing brace (or `;`).
    pub span: TokenSpan,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructorDecl {
    pub modifiers: Vec<String>,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: TokenSpan,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub ty: TypeRef,
    pub name: String,
    pub span: TokenSpan,
}

/// A type reference (or `void` in return position).
///
/// `text` is the whitespace-free spelling of the reference, the form used for
/// all name comparisons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRef {
    pub text: String,
    pub span: TokenSpan,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    /// Opening through closing brace.
    pub span: TokenSpan,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    LocalVar(LocalVarDecl),
    Expr { expr: Expr, span: TokenSpan },
    Return { value: Option<Expr>, span: TokenSpan },
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        span: TokenSpan,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        span: TokenSpan,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        span: TokenSpan,
    },
    Block(Block),
    /// A statement the restricted grammar does not model, skipped balanced.
    Other(TokenSpan),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalVarDecl {
    pub modifiers: Vec<String>,
    pub ty: TypeRef,
    pub declarators: Vec<VarDeclarator>,
    pub span: TokenSpan,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Ident { name: String, span: TokenSpan },
    This { span: TokenSpan },
    /// `base.field` where the suffix is a bare identifier.
    FieldAccess {
        base: Box<Expr>,
        field: String,
        span: TokenSpan,
    },
    /// `base.name(args)`, or a direct `name(args)` call when `base` is `None`.
    MethodCall {
        base: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
        span: TokenSpan,
    },
    New(NewExpr),
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        span: TokenSpan,
    },
    /// Any binary/ternary operator application; the operator itself is
    /// irrelevant to the refactoring passes.
    Binary {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: TokenSpan,
    },
    Unary { operand: Box<Expr>, span: TokenSpan },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
        span: TokenSpan,
    },
    Paren { inner: Box<Expr>, span: TokenSpan },
    Literal { span: TokenSpan },
    /// An expression form outside the restricted grammar.
    Other { span: TokenSpan },
}

impl Expr {
    pub fn span(&self) -> TokenSpan {
        match self {
            Expr::Ident { span, .. }
            | Expr::This { span }
            | Expr::FieldAccess { span, .. }
            | Expr::MethodCall { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Index { span, .. }
            | Expr::Paren { span, .. }
            | Expr::Literal { span }
            | Expr::Other { span } => *span,
            Expr::New(new) => new.span,
        }
    }
}

/// An object (or array) creation expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewExpr {
    /// Created type name, `.`-joined for qualified names.
    pub type_name: String,
    /// Tokens of the created name only, excluding `new` and arguments.
    pub type_span: TokenSpan,
    /// True when the created name carries type arguments (or a diamond).
    pub generic: bool,
    /// True for array creations (`new T[...]`).
    pub array: bool,
    pub args: Vec<Expr>,
    pub span: TokenSpan,
}

impl NewExpr {
    /// A "plain" creation: simple single-segment name, no generics, no array.
    /// Only these are retargeted by the propagation pass.
    pub fn is_plain(&self) -> bool {
        !self.generic && !self.array && !self.type_name.contains('.')
    }
}
