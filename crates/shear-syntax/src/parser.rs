//! Restricted recursive-descent Java parser.
//!
//! The grammar covers what the refactoring passes need: type declarations,
//! fields, methods, constructors, local declarations, statement nesting and
//! `.`-chained member accesses / calls / creations. Everything else is parsed
//! permissively into `Other` nodes with a span, so traversal and token-span
//! edits still work over code the grammar does not model.
//!
//! The parser never aborts: it records [`ParseError`]s and synchronizes on
//! `;` and braces, so a file with errors still yields a usable tree.

use thiserror::Error;

use crate::cst::{
    Block, ClassDecl, CompilationUnit, ConstructorDecl, Expr, FieldDecl, LocalVarDecl, Member,
    MethodDecl, NewExpr, Param, Stmt, TokenSpan, TypeRef, VarDeclarator,
};
use crate::lexer::{TokenKind, TokenStream};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("parse error at byte {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

#[derive(Clone, Debug)]
pub struct ParseResult {
    pub unit: CompilationUnit,
    pub errors: Vec<ParseError>,
}

pub fn parse(stream: &TokenStream) -> ParseResult {
    Parser::new(stream).parse_unit()
}

struct Parser<'a> {
    stream: &'a TokenStream,
    /// Raw index into the token vector (may sit on trivia).
    cursor: usize,
    /// Index of the last significant token consumed.
    prev: usize,
    errors: Vec<ParseError>,
}

const MODIFIER_KINDS: &[TokenKind] = &[
    TokenKind::PublicKw,
    TokenKind::PrivateKw,
    TokenKind::ProtectedKw,
    TokenKind::StaticKw,
    TokenKind::FinalKw,
    TokenKind::AbstractKw,
    TokenKind::NativeKw,
    TokenKind::SynchronizedKw,
    TokenKind::TransientKw,
    TokenKind::VolatileKw,
    TokenKind::StrictfpKw,
    TokenKind::DefaultKw,
];

impl<'a> Parser<'a> {
    fn new(stream: &'a TokenStream) -> Self {
        Self {
            stream,
            cursor: 0,
            prev: 0,
            errors: Vec::new(),
        }
    }

    // --- cursor helpers -------------------------------------------------

    /// Index of the next significant token, or `None` at end of input.
    fn pos(&self) -> Option<usize> {
        let tokens = self.stream.tokens();
        let mut idx = self.cursor;
        while idx < tokens.len() && tokens[idx].kind.is_trivia() {
            idx += 1;
        }
        (idx < tokens.len()).then_some(idx)
    }

    fn peek(&self) -> Option<TokenKind> {
        self.pos().and_then(|idx| self.stream.kind(idx))
    }

    /// Kind of the `n`th significant token after the current one.
    fn nth(&self, n: usize) -> Option<TokenKind> {
        let tokens = self.stream.tokens();
        let mut idx = self.cursor;
        let mut remaining = n;
        while idx < tokens.len() {
            if !tokens[idx].kind.is_trivia() {
                if remaining == 0 {
                    return Some(tokens[idx].kind);
                }
                remaining -= 1;
            }
            idx += 1;
        }
        None
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    fn at_eof(&self) -> bool {
        self.pos().is_none()
    }

    /// Consumes the next significant token and returns its index.
    fn bump(&mut self) -> Option<usize> {
        let idx = self.pos()?;
        self.cursor = idx + 1;
        self.prev = idx;
        Some(idx)
    }

    fn eat(&mut self, kind: TokenKind) -> Option<usize> {
        if self.at(kind) {
            self.bump()
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Option<usize> {
        match self.eat(kind) {
            Some(idx) => Some(idx),
            None => {
                self.error(message);
                None
            }
        }
    }

    fn error(&mut self, message: &str) {
        let offset = self
            .pos()
            .map(|idx| self.stream.tokens()[idx].start)
            .unwrap_or_else(|| self.stream.source().len());
        self.errors.push(ParseError {
            message: message.to_string(),
            offset,
        });
    }

    fn text_at(&self, idx: usize) -> &'a str {
        self.stream.token_text(idx)
    }

    fn peek_text(&self) -> Option<&'a str> {
        self.pos().map(|idx| self.text_at(idx))
    }

    // --- compilation unit -----------------------------------------------

    fn parse_unit(mut self) -> ParseResult {
        let mut unit = CompilationUnit::default();

        if self.at(TokenKind::PackageKw) {
            self.skip_to_semicolon();
        }
        while self.at(TokenKind::ImportKw) {
            self.skip_to_semicolon();
        }

        while !self.at_eof() {
            let before = self.cursor;
            if let Some(class) = self.try_parse_type_decl() {
                unit.types.push(class);
            } else {
                self.error("expected type declaration");
                self.bump();
            }
            if self.cursor == before {
                // Defensive forward progress.
                self.bump();
            }
        }

        ParseResult {
            unit,
            errors: self.errors,
        }
    }

    fn try_parse_type_decl(&mut self) -> Option<ClassDecl> {
        let start = self.pos()?;
        let checkpoint = self.cursor;
        let modifiers = self.parse_modifiers();
        match self.peek() {
            Some(TokenKind::ClassKw) | Some(TokenKind::InterfaceKw) | Some(TokenKind::EnumKw) => {
                Some(self.parse_class(modifiers, start))
            }
            _ => {
                self.cursor = checkpoint;
                None
            }
        }
    }

    fn parse_modifiers(&mut self) -> Vec<String> {
        let mut modifiers = Vec::new();
        loop {
            match self.peek() {
                Some(kind) if MODIFIER_KINDS.contains(&kind) => {
                    let idx = self.bump().unwrap_or_default();
                    modifiers.push(self.text_at(idx).to_string());
                }
                Some(TokenKind::At) if self.nth(1) == Some(TokenKind::Ident) => {
                    let at = self.bump().unwrap_or_default();
                    let mut end = self.bump().unwrap_or(at);
                    while self.at(TokenKind::Dot) && self.nth(1) == Some(TokenKind::Ident) {
                        self.bump();
                        end = self.bump().unwrap_or(end);
                    }
                    if self.at(TokenKind::LParen) {
                        self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
                        end = self.prev;
                    }
                    let mut text = String::new();
                    for idx in at..=end {
                        if !self.stream.tokens()[idx].kind.is_trivia() {
                            text.push_str(self.text_at(idx));
                        }
                    }
                    modifiers.push(text);
                }
                _ => break,
            }
        }
        modifiers
    }

    fn parse_class(&mut self, modifiers: Vec<String>, start: usize) -> ClassDecl {
        // class / interface / enum keyword.
        self.bump();
        let name = match self.eat(TokenKind::Ident) {
            Some(idx) => self.text_at(idx).to_string(),
            None => {
                self.error("expected type name");
                String::new()
            }
        };

        if self.at(TokenKind::Lt) {
            self.skip_angles(None);
        }

        let mut extends = None;
        if self.eat(TokenKind::ExtendsKw).is_some() {
            extends = self.parse_type_ref().map(|ty| ty.text);
        }
        // Interface lists, `permits` clauses and anything else before the
        // body are irrelevant here.
        while !self.at(TokenKind::LBrace) && !self.at_eof() {
            self.bump();
        }

        let mut members = Vec::new();
        self.expect(TokenKind::LBrace, "expected `{` to open type body");
        while !self.at(TokenKind::RBrace) && !self.at_eof() {
            let before = self.cursor;
            members.push(self.parse_member(&name));
            if self.cursor == before {
                self.bump();
            }
        }
        let end = self
            .expect(TokenKind::RBrace, "expected `}` to close type body")
            .unwrap_or(self.prev);

        ClassDecl {
            modifiers,
            name,
            extends,
            members,
            span: TokenSpan::new(start, end),
        }
    }

    // --- members ---------------------------------------------------------

    fn parse_member(&mut self, class_name: &str) -> Member {
        let start = match self.pos() {
            Some(idx) => idx,
            None => return Member::Other(TokenSpan::new(self.prev, self.prev)),
        };

        if self.at(TokenKind::Semicolon) {
            let idx = self.bump().unwrap_or(start);
            return Member::Other(TokenSpan::new(idx, idx));
        }
        if self.at(TokenKind::LBrace) {
            // Instance initializer block.
            self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
            return Member::Other(TokenSpan::new(start, self.prev));
        }

        let modifiers = self.parse_modifiers();

        if self.at(TokenKind::LBrace) {
            // Static initializer block (`static { ... }`).
            self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
            return Member::Other(TokenSpan::new(start, self.prev));
        }

        if matches!(
            self.peek(),
            Some(TokenKind::ClassKw) | Some(TokenKind::InterfaceKw) | Some(TokenKind::EnumKw)
        ) {
            return Member::Class(self.parse_class(modifiers, start));
        }

        // Constructor: the declared name equals the enclosing class name and
        // is immediately followed by a parameter list.
        if self.at(TokenKind::Ident)
            && self.peek_text() == Some(class_name)
            && self.nth(1) == Some(TokenKind::LParen)
        {
            return self.parse_constructor(modifiers, start);
        }

        // Generic method type parameters.
        if self.at(TokenKind::Lt) && !self.skip_angles(None) {
            return self.recover_member(start);
        }

        let ty = match self.parse_type_or_void() {
            Some(ty) => ty,
            None => return self.recover_member(start),
        };

        let name_idx = match self.eat(TokenKind::Ident) {
            Some(idx) => idx,
            None => return self.recover_member(start),
        };
        let name = self.text_at(name_idx).to_string();

        if self.at(TokenKind::LParen) {
            self.parse_method(modifiers, ty, name, start)
        } else {
            let declarators = self.parse_declarators(name_idx);
            let end = self
                .expect(TokenKind::Semicolon, "expected `;` after field declaration")
                .unwrap_or(self.prev);
            Member::Field(FieldDecl {
                modifiers,
                ty,
                declarators,
                span: TokenSpan::new(start, end),
            })
        }
    }

    fn parse_constructor(&mut self, modifiers: Vec<String>, start: usize) -> Member {
        let name_idx = self.bump().unwrap_or(start);
        let name = self.text_at(name_idx).to_string();
        let params = self.parse_params();
        self.skip_throws_clause();
        if !self.at(TokenKind::LBrace) {
            return self.recover_member(start);
        }
        let body = self.parse_block();
        let span = TokenSpan::new(start, body.span.end);
        Member::Constructor(ConstructorDecl {
            modifiers,
            name,
            params,
            body,
            span,
        })
    }

    fn parse_method(
        &mut self,
        modifiers: Vec<String>,
        return_ty: TypeRef,
        name: String,
        start: usize,
    ) -> Member {
        let params = self.parse_params();
        // `int foo()[]` style trailing dims.
        while self.at(TokenKind::LBracket) && self.nth(1) == Some(TokenKind::RBracket) {
            self.bump();
            self.bump();
        }
        self.skip_throws_clause();

        let body = if self.at(TokenKind::LBrace) {
            Some(self.parse_block())
        } else {
            self.expect(TokenKind::Semicolon, "expected method body or `;`");
            None
        };
        let span = TokenSpan::new(start, self.prev);
        Member::Method(MethodDecl {
            modifiers,
            return_ty,
            name,
            params,
            body,
            span,
        })
    }

    /// Skips a malformed member up to and including the next top-level `;`,
    /// or up to (not including) the closing `}` of the type body.
    fn recover_member(&mut self, start: usize) -> Member {
        self.error("unsupported class member");
        loop {
            match self.peek() {
                None | Some(TokenKind::RBrace) => break,
                Some(TokenKind::Semicolon) => {
                    self.bump();
                    break;
                }
                Some(TokenKind::LBrace) => {
                    self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
                    break;
                }
                Some(TokenKind::LParen) => {
                    self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
                }
                _ => {
                    self.bump();
                }
            }
        }
        Member::Other(TokenSpan::new(start, self.prev.max(start)))
    }

    fn skip_throws_clause(&mut self) {
        if self.at(TokenKind::Ident) && self.peek_text() == Some("throws") {
            self.bump();
            while !self.at(TokenKind::LBrace)
                && !self.at(TokenKind::Semicolon)
                && !self.at_eof()
            {
                self.bump();
            }
        }
    }

    // --- types -----------------------------------------------------------

    fn parse_type_or_void(&mut self) -> Option<TypeRef> {
        if self.at(TokenKind::VoidKw) {
            let idx = self.bump()?;
            return Some(TypeRef {
                text: "void".to_string(),
                span: TokenSpan::new(idx, idx),
            });
        }
        self.parse_type_ref()
    }

    /// Parses `Name(.Name)* <...>? ([])*`; returns `None` (cursor restored)
    /// when the input does not start a type reference.
    fn parse_type_ref(&mut self) -> Option<TypeRef> {
        let checkpoint = self.cursor;
        let start = match self.peek() {
            Some(TokenKind::Ident) => self.bump()?,
            _ => return None,
        };
        let mut text = self.text_at(start).to_string();

        while self.at(TokenKind::Dot) && self.nth(1) == Some(TokenKind::Ident) {
            self.bump();
            let idx = self.bump()?;
            text.push('.');
            text.push_str(self.text_at(idx));
        }

        if self.at(TokenKind::Lt) && !self.skip_angles(Some(&mut text)) {
            self.cursor = checkpoint;
            return None;
        }

        while self.at(TokenKind::LBracket) && self.nth(1) == Some(TokenKind::RBracket) {
            self.bump();
            self.bump();
            text.push_str("[]");
        }

        Some(TypeRef {
            text,
            span: TokenSpan::new(start, self.prev),
        })
    }

    // --- parameters ------------------------------------------------------

    fn parse_params(&mut self) -> Vec<Param> {
        let mut params = Vec::new();
        if self.expect(TokenKind::LParen, "expected `(`").is_none() {
            return params;
        }
        while !self.at(TokenKind::RParen) && !self.at_eof() {
            let before = self.cursor;
            if let Some(param) = self.parse_param() {
                params.push(param);
            }
            if self.eat(TokenKind::Comma).is_none() && !self.at(TokenKind::RParen) {
                // Skip junk until we can make progress again.
                if self.cursor == before {
                    self.bump();
                }
            }
        }
        self.expect(TokenKind::RParen, "expected `)` after parameters");
        params
    }

    fn parse_param(&mut self) -> Option<Param> {
        let start = self.pos()?;
        self.parse_modifiers();
        let ty = self.parse_type_ref()?;
        // Varargs `Type... name`.
        while self.at(TokenKind::Dot) {
            self.bump();
        }
        let name_idx = self.expect(TokenKind::Ident, "expected parameter name")?;
        let name = self.text_at(name_idx).to_string();
        while self.at(TokenKind::LBracket) && self.nth(1) == Some(TokenKind::RBracket) {
            self.bump();
            self.bump();
        }
        Some(Param {
            ty,
            name,
            span: TokenSpan::new(start, self.prev),
        })
    }

    // --- statements ------------------------------------------------------

    fn parse_block(&mut self) -> Block {
        let start = self
            .expect(TokenKind::LBrace, "expected `{`")
            .unwrap_or(self.prev);
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at_eof() {
            let before = self.cursor;
            stmts.push(self.parse_stmt());
            if self.cursor == before {
                self.bump();
            }
        }
        let end = self
            .expect(TokenKind::RBrace, "expected `}`")
            .unwrap_or(self.prev);
        Block {
            stmts,
            span: TokenSpan::new(start, end),
        }
    }

    fn parse_stmt(&mut self) -> Stmt {
        let start = match self.pos() {
            Some(idx) => idx,
            None => return Stmt::Other(TokenSpan::new(self.prev, self.prev)),
        };

        match self.peek() {
            Some(TokenKind::LBrace) => return Stmt::Block(self.parse_block()),
            Some(TokenKind::Semicolon) => {
                self.bump();
                return Stmt::Other(TokenSpan::new(start, start));
            }
            Some(TokenKind::ReturnKw) => {
                self.bump();
                let value = if self.at(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr())
                };
                let end = self
                    .expect(TokenKind::Semicolon, "expected `;` after return")
                    .unwrap_or(self.prev);
                return Stmt::Return {
                    value,
                    span: TokenSpan::new(start, end),
                };
            }
            Some(TokenKind::IfKw) => {
                self.bump();
                let cond = self.parse_paren_expr();
                let then_branch = Box::new(self.parse_stmt());
                let else_branch = if self.eat(TokenKind::ElseKw).is_some() {
                    Some(Box::new(self.parse_stmt()))
                } else {
                    None
                };
                return Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                    span: TokenSpan::new(start, self.prev),
                };
            }
            Some(TokenKind::WhileKw) => {
                self.bump();
                let cond = self.parse_paren_expr();
                let body = Box::new(self.parse_stmt());
                return Stmt::While {
                    cond,
                    body,
                    span: TokenSpan::new(start, self.prev),
                };
            }
            Some(TokenKind::DoKw) => {
                self.bump();
                let body = Box::new(self.parse_stmt());
                self.expect(TokenKind::WhileKw, "expected `while` after do body");
                let cond = self.parse_paren_expr();
                self.expect(TokenKind::Semicolon, "expected `;` after do-while");
                return Stmt::While {
                    cond,
                    body,
                    span: TokenSpan::new(start, self.prev),
                };
            }
            Some(TokenKind::ForKw) => return self.parse_for(start),
            Some(TokenKind::Ident) => {
                // `try`/`switch` bodies still get traversed as plain blocks so
                // member accesses inside them are not lost.
                if let Some("try" | "switch" | "synchronized") = self.peek_text() {
                    return self.parse_braced_construct(start);
                }
                if let Some("throw" | "assert" | "break" | "continue") = self.peek_text() {
                    self.bump();
                    if self.at(TokenKind::Semicolon) {
                        let end = self.bump().unwrap_or(self.prev);
                        return Stmt::Other(TokenSpan::new(start, end));
                    }
                    let expr = self.parse_expr();
                    let end = self
                        .expect(TokenKind::Semicolon, "expected `;`")
                        .unwrap_or(self.prev);
                    return Stmt::Expr {
                        expr,
                        span: TokenSpan::new(start, end),
                    };
                }
            }
            _ => {}
        }

        // Local variable declaration, or an expression statement.
        if let Some(decl) = self.try_parse_local_var(start) {
            return Stmt::LocalVar(decl);
        }

        let expr = self.parse_expr();
        let end = match self.eat(TokenKind::Semicolon) {
            Some(idx) => idx,
            None => {
                self.error("expected `;` after statement");
                self.skip_to_semicolon();
                self.prev
            }
        };
        Stmt::Expr {
            expr,
            span: TokenSpan::new(start, end),
        }
    }

    fn try_parse_local_var(&mut self, start: usize) -> Option<LocalVarDecl> {
        let checkpoint = self.cursor;
        let errors_before = self.errors.len();
        let modifiers = self.parse_modifiers();
        let ty = match self.parse_type_ref() {
            Some(ty) => ty,
            None => {
                self.cursor = checkpoint;
                self.errors.truncate(errors_before);
                return None;
            }
        };
        let looks_like_decl = self.at(TokenKind::Ident)
            && matches!(
                self.nth(1),
                Some(TokenKind::Eq)
                    | Some(TokenKind::Semicolon)
                    | Some(TokenKind::Comma)
                    | Some(TokenKind::LBracket)
            );
        if !looks_like_decl {
            self.cursor = checkpoint;
            self.errors.truncate(errors_before);
            return None;
        }
        let name_idx = self.bump()?;
        let declarators = self.parse_declarators(name_idx);
        let end = self
            .expect(TokenKind::Semicolon, "expected `;` after declaration")
            .unwrap_or(self.prev);
        Some(LocalVarDecl {
            modifiers,
            ty,
            declarators,
            span: TokenSpan::new(start, end),
        })
    }

    fn parse_for(&mut self, start: usize) -> Stmt {
        self.bump();
        self.expect(TokenKind::LParen, "expected `(` after for");

        let header_start = self.pos().unwrap_or(self.prev);
        let checkpoint = self.cursor;
        let errors_before = self.errors.len();

        // For-each: `Type name : iterable`.
        let modifiers = self.parse_modifiers();
        if let Some(ty) = self.parse_type_ref() {
            if self.at(TokenKind::Ident) && self.nth(1) == Some(TokenKind::Colon) {
                let name_idx = self.bump().unwrap_or(self.prev);
                let decl = LocalVarDecl {
                    modifiers,
                    ty,
                    declarators: vec![VarDeclarator {
                        name: self.text_at(name_idx).to_string(),
                        name_span: TokenSpan::new(name_idx, name_idx),
                        init: None,
                    }],
                    span: TokenSpan::new(header_start, name_idx),
                };
                self.bump(); // :
                let iterable = self.parse_expr();
                self.expect(TokenKind::RParen, "expected `)` after for-each header");
                let body = Box::new(self.parse_stmt());
                return Stmt::For {
                    init: Some(Box::new(Stmt::LocalVar(decl))),
                    cond: Some(iterable),
                    update: None,
                    body,
                    span: TokenSpan::new(start, self.prev),
                };
            }
        }
        self.cursor = checkpoint;
        self.errors.truncate(errors_before);

        // Classic three-part header.
        let init = if self.eat(TokenKind::Semicolon).is_some() {
            None
        } else if let Some(decl) = self.try_parse_local_var(header_start) {
            Some(Box::new(Stmt::LocalVar(decl)))
        } else {
            let expr = self.parse_expr();
            let span = TokenSpan::new(header_start, self.prev);
            self.expect(TokenKind::Semicolon, "expected `;` in for header");
            Some(Box::new(Stmt::Expr { expr, span }))
        };

        let cond = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr())
        };
        self.expect(TokenKind::Semicolon, "expected `;` in for header");

        let update = if self.at(TokenKind::RParen) {
            None
        } else {
            let mut expr = self.parse_expr();
            while self.eat(TokenKind::Comma).is_some() {
                let rhs = self.parse_expr();
                let span = TokenSpan::new(expr.span().start, rhs.span().end);
                expr = Expr::Binary {
                    lhs: Box::new(expr),
                    rhs: Box::new(rhs),
                    span,
                };
            }
            Some(expr)
        };
        self.expect(TokenKind::RParen, "expected `)` after for header");

        let body = Box::new(self.parse_stmt());
        Stmt::For {
            init,
            cond,
            update,
            body,
            span: TokenSpan::new(start, self.prev),
        }
    }

    /// `try`/`switch`/`synchronized`: headers are skipped, every `{ ... }`
    /// section is parsed as a block so nested statements stay visible.
    fn parse_braced_construct(&mut self, start: usize) -> Stmt {
        self.bump();
        let mut blocks = Vec::new();
        loop {
            match self.peek() {
                Some(TokenKind::LParen) => {
                    self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
                }
                Some(TokenKind::LBrace) => {
                    blocks.push(Stmt::Block(self.parse_block()));
                    // Continue only into `catch`/`finally`/`else`-like tails.
                    if !(self.at(TokenKind::Ident)
                        && matches!(self.peek_text(), Some("catch" | "finally")))
                    {
                        break;
                    }
                }
                Some(TokenKind::Ident)
                    if matches!(self.peek_text(), Some("catch" | "finally")) =>
                {
                    self.bump();
                }
                _ => break,
            }
        }
        Stmt::Block(Block {
            stmts: blocks,
            span: TokenSpan::new(start, self.prev),
        })
    }

    fn parse_declarators(&mut self, first_name_idx: usize) -> Vec<VarDeclarator> {
        let mut declarators = Vec::new();
        let mut name_idx = first_name_idx;
        loop {
            let name = self.text_at(name_idx).to_string();
            while self.at(TokenKind::LBracket) && self.nth(1) == Some(TokenKind::RBracket) {
                self.bump();
                self.bump();
            }
            let init = if self.eat(TokenKind::Eq).is_some() {
                if self.at(TokenKind::LBrace) {
                    // Array initializer.
                    let init_start = self.pos().unwrap_or(self.prev);
                    self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
                    Some(Expr::Other {
                        span: TokenSpan::new(init_start, self.prev),
                    })
                } else {
                    Some(self.parse_expr())
                }
            } else {
                None
            };
            declarators.push(VarDeclarator {
                name,
                name_span: TokenSpan::new(name_idx, name_idx),
                init,
            });

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
            name_idx = match self.expect(TokenKind::Ident, "expected declarator name") {
                Some(idx) => idx,
                None => break,
            };
        }
        declarators
    }

    // --- expressions -----------------------------------------------------

    fn parse_paren_expr(&mut self) -> Expr {
        self.expect(TokenKind::LParen, "expected `(`");
        let expr = self.parse_expr();
        self.expect(TokenKind::RParen, "expected `)`");
        expr
    }

    fn parse_expr(&mut self) -> Expr {
        let lhs = self.parse_binary();
        if self.eat(TokenKind::Eq).is_some() {
            let value = self.parse_expr();
            let span = TokenSpan::new(lhs.span().start, value.span().end);
            return Expr::Assign {
                target: Box::new(lhs),
                value: Box::new(value),
                span,
            };
        }
        lhs
    }

    fn parse_binary(&mut self) -> Expr {
        let mut lhs = self.parse_unary();
        loop {
            match self.peek() {
                Some(TokenKind::Op)
                | Some(TokenKind::Lt)
                | Some(TokenKind::Gt)
                | Some(TokenKind::Question)
                | Some(TokenKind::Colon) => {
                    self.bump();
                }
                Some(TokenKind::Ident) if self.peek_text() == Some("instanceof") => {
                    self.bump();
                    if let Some(ty) = self.parse_type_ref() {
                        let span = TokenSpan::new(lhs.span().start, ty.span.end);
                        lhs = Expr::Binary {
                            lhs: Box::new(lhs),
                            rhs: Box::new(Expr::Other { span: ty.span }),
                            span,
                        };
                    }
                    continue;
                }
                _ => break,
            }
            let rhs = self.parse_unary();
            let span = TokenSpan::new(lhs.span().start, rhs.span().end);
            lhs = Expr::Binary {
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        lhs
    }

    fn parse_unary(&mut self) -> Expr {
        if self.at(TokenKind::Op) {
            let start = self.bump().unwrap_or(self.prev);
            let operand = self.parse_unary();
            let span = TokenSpan::new(start, operand.span().end);
            return Expr::Unary {
                operand: Box::new(operand),
                span,
            };
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Expr {
        let mut expr = self.parse_primary();
        loop {
            match self.peek() {
                Some(TokenKind::Dot) => match self.nth(1) {
                    Some(TokenKind::Ident) => {
                        self.bump();
                        let name_idx = self.bump().unwrap_or(self.prev);
                        let name = self.text_at(name_idx).to_string();
                        if self.at(TokenKind::LParen) {
                            let args = self.parse_args();
                            let span = TokenSpan::new(expr.span().start, self.prev);
                            expr = Expr::MethodCall {
                                base: Some(Box::new(expr)),
                                name,
                                args,
                                span,
                            };
                        } else {
                            let span = TokenSpan::new(expr.span().start, name_idx);
                            expr = Expr::FieldAccess {
                                base: Box::new(expr),
                                field: name,
                                span,
                            };
                        }
                    }
                    Some(TokenKind::ThisKw) => {
                        self.bump();
                        let idx = self.bump().unwrap_or(self.prev);
                        let span = TokenSpan::new(expr.span().start, idx);
                        expr = Expr::FieldAccess {
                            base: Box::new(expr),
                            field: "this".to_string(),
                            span,
                        };
                    }
                    Some(TokenKind::Lt) => {
                        // Explicit generic method call: `base.<T>name(args)`.
                        self.bump();
                        if !self.skip_angles(None) {
                            break;
                        }
                        let name_idx = match self.eat(TokenKind::Ident) {
                            Some(idx) => idx,
                            None => break,
                        };
                        let name = self.text_at(name_idx).to_string();
                        let args = self.parse_args();
                        let span = TokenSpan::new(expr.span().start, self.prev);
                        expr = Expr::MethodCall {
                            base: Some(Box::new(expr)),
                            name,
                            args,
                            span,
                        };
                    }
                    _ => {
                        // `.class`, `.new`, `.super`: consume and degrade.
                        self.bump();
                        let end = self.bump().unwrap_or(self.prev);
                        let span = TokenSpan::new(expr.span().start, end);
                        expr = Expr::Other { span };
                    }
                },
                Some(TokenKind::LBracket) => {
                    self.bump();
                    let index = self.parse_expr();
                    let end = self
                        .expect(TokenKind::RBracket, "expected `]`")
                        .unwrap_or(self.prev);
                    let span = TokenSpan::new(expr.span().start, end);
                    expr = Expr::Index {
                        base: Box::new(expr),
                        index: Box::new(index),
                        span,
                    };
                }
                Some(TokenKind::Op)
                    if matches!(self.peek_text(), Some("++" | "--")) =>
                {
                    let idx = self.bump().unwrap_or(self.prev);
                    let span = TokenSpan::new(expr.span().start, idx);
                    expr = Expr::Unary {
                        operand: Box::new(expr),
                        span,
                    };
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_primary(&mut self) -> Expr {
        match self.peek() {
            Some(TokenKind::Number) | Some(TokenKind::StringLit) | Some(TokenKind::CharLit) => {
                let idx = self.bump().unwrap_or(self.prev);
                Expr::Literal {
                    span: TokenSpan::new(idx, idx),
                }
            }
            Some(TokenKind::Ident) => {
                let idx = self.bump().unwrap_or(self.prev);
                let name = self.text_at(idx).to_string();
                if self.at(TokenKind::LParen) {
                    let args = self.parse_args();
                    Expr::MethodCall {
                        base: None,
                        name,
                        args,
                        span: TokenSpan::new(idx, self.prev),
                    }
                } else {
                    Expr::Ident {
                        name,
                        span: TokenSpan::new(idx, idx),
                    }
                }
            }
            Some(TokenKind::ThisKw) => {
                let idx = self.bump().unwrap_or(self.prev);
                if self.at(TokenKind::LParen) {
                    let args = self.parse_args();
                    Expr::MethodCall {
                        base: None,
                        name: "this".to_string(),
                        args,
                        span: TokenSpan::new(idx, self.prev),
                    }
                } else {
                    Expr::This {
                        span: TokenSpan::new(idx, idx),
                    }
                }
            }
            Some(TokenKind::SuperKw) => {
                let idx = self.bump().unwrap_or(self.prev);
                if self.at(TokenKind::LParen) {
                    let args = self.parse_args();
                    Expr::MethodCall {
                        base: None,
                        name: "super".to_string(),
                        args,
                        span: TokenSpan::new(idx, self.prev),
                    }
                } else {
                    Expr::Other {
                        span: TokenSpan::new(idx, idx),
                    }
                }
            }
            Some(TokenKind::NewKw) => self.parse_creator(),
            Some(TokenKind::LParen) => {
                let start = self.bump().unwrap_or(self.prev);
                let inner = self.parse_expr();
                let end = self
                    .expect(TokenKind::RParen, "expected `)`")
                    .unwrap_or(self.prev);
                Expr::Paren {
                    inner: Box::new(inner),
                    span: TokenSpan::new(start, end),
                }
            }
            _ => {
                let idx = self.bump().unwrap_or(self.prev);
                Expr::Other {
                    span: TokenSpan::new(idx, idx),
                }
            }
        }
    }

    fn parse_creator(&mut self) -> Expr {
        let start = self.bump().unwrap_or(self.prev); // `new`
        let first = match self.expect(TokenKind::Ident, "expected type after `new`") {
            Some(idx) => idx,
            None => {
                return Expr::Other {
                    span: TokenSpan::new(start, self.prev),
                }
            }
        };
        let mut type_name = self.text_at(first).to_string();
        let mut type_end = first;
        while self.at(TokenKind::Dot) && self.nth(1) == Some(TokenKind::Ident) {
            self.bump();
            let idx = self.bump().unwrap_or(type_end);
            type_name.push('.');
            type_name.push_str(self.text_at(idx));
            type_end = idx;
        }

        let mut generic = false;
        if self.at(TokenKind::Lt) {
            generic = true;
            self.skip_angles(None);
        }

        let mut array = false;
        let mut args = Vec::new();
        if self.at(TokenKind::LBracket) {
            array = true;
            while self.at(TokenKind::LBracket) {
                self.bump();
                if !self.at(TokenKind::RBracket) {
                    self.parse_expr();
                }
                self.expect(TokenKind::RBracket, "expected `]`");
            }
            if self.at(TokenKind::LBrace) {
                self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
            }
        } else if self.at(TokenKind::LParen) {
            args = self.parse_args();
            if self.at(TokenKind::LBrace) {
                // Anonymous class body.
                self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
            }
        } else {
            self.error("expected `(` or `[` after created type");
        }

        Expr::New(NewExpr {
            type_name,
            type_span: TokenSpan::new(first, type_end),
            generic,
            array,
            args,
            span: TokenSpan::new(start, self.prev),
        })
    }

    fn parse_args(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        if self.expect(TokenKind::LParen, "expected `(`").is_none() {
            return args;
        }
        while !self.at(TokenKind::RParen) && !self.at_eof() {
            let before = self.cursor;
            args.push(self.parse_expr());
            if self.eat(TokenKind::Comma).is_none() && !self.at(TokenKind::RParen) {
                if self.cursor == before {
                    self.bump();
                }
            }
        }
        self.expect(TokenKind::RParen, "expected `)`");
        args
    }

    // --- skipping --------------------------------------------------------

    fn skip_to_semicolon(&mut self) {
        while let Some(kind) = self.peek() {
            match kind {
                TokenKind::Semicolon => {
                    self.bump();
                    return;
                }
                TokenKind::LBrace => {
                    self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
                    return;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) {
        let mut depth = 0usize;
        while let Some(kind) = self.peek() {
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    self.bump();
                    return;
                }
            }
            self.bump();
        }
    }

    /// Skips a balanced `< ... >` run, optionally appending the significant
    /// token text to `collect`. Returns false (cursor unspecified, callers
    /// restore their checkpoint) when the run is unbalanced before a
    /// statement boundary.
    fn skip_angles(&mut self, mut collect: Option<&mut String>) -> bool {
        let mut depth = 0usize;
        while let Some(kind) = self.peek() {
            match kind {
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => depth = depth.saturating_sub(1),
                TokenKind::Semicolon
                | TokenKind::LBrace
                | TokenKind::RBrace
                | TokenKind::RParen => return false,
                _ => {}
            }
            let idx = self.bump().unwrap_or(self.prev);
            if let Some(text) = collect.as_deref_mut() {
                text.push_str(self.text_at(idx));
            }
            if depth == 0 {
                return true;
            }
        }
        false
    }
}
