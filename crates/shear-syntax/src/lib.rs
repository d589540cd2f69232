//! Syntax primitives for the Shear refactoring engine.
//!
//! This crate provides the tree/rewriter layer the refactoring passes are
//! built on:
//! - [`lex`] / [`TokenStream`]: a full-fidelity token stream. Trivia
//!   (whitespace and comments) are real tokens with indices, so a token index
//!   is a stable anchor into the original text.
//! - [`parse`]: a restricted recursive-descent Java parser producing an owned,
//!   typed concrete syntax tree. Nodes carry inclusive token spans back into
//!   the stream.
//! - [`TokenRewriter`]: an edit list keyed by token spans, with explicit
//!   conflict detection and a single final render.
//! - [`walk`] / [`Visitor`]: enter/exit callbacks over the tree, driving the
//!   refactoring passes.

mod cst;
mod lexer;
mod parser;
mod rewrite;
mod walk;

pub use cst::{
    Block, ClassDecl, CompilationUnit, ConstructorDecl, Expr, FieldDecl, LocalVarDecl, Member,
    MethodDecl, NewExpr, Param, Stmt, TokenSpan, TypeRef, VarDeclarator,
};
pub use lexer::{lex, Token, TokenKind, TokenStream};
pub use parser::{parse, ParseError, ParseResult};
pub use rewrite::{EditOp, RewriteError, TokenEdit, TokenRewriter};
pub use walk::{for_each_expr, for_each_expr_in_stmt, walk, Visitor};
