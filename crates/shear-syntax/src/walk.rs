//! Depth-first traversal of the CST with enter/exit callbacks.

use crate::cst::{
    Block, ClassDecl, CompilationUnit, ConstructorDecl, Expr, FieldDecl, LocalVarDecl, Member,
    MethodDecl, Stmt,
};

/// Callbacks invoked by [`walk`]. All methods default to no-ops so visitors
/// implement only what they care about.
///
/// Expression callbacks fire pre-order for every expression node, so a
/// chained `a.b.c()` yields both the outer call and the inner field access.
pub trait Visitor {
    fn enter_class(&mut self, _class: &ClassDecl) {}
    fn exit_class(&mut self, _class: &ClassDecl) {}
    fn enter_method(&mut self, _method: &MethodDecl) {}
    fn exit_method(&mut self, _method: &MethodDecl) {}
    fn enter_constructor(&mut self, _ctor: &ConstructorDecl) {}
    fn exit_constructor(&mut self, _ctor: &ConstructorDecl) {}
    fn field(&mut self, _field: &FieldDecl) {}
    fn local_var(&mut self, _decl: &LocalVarDecl) {}
    fn expr(&mut self, _expr: &Expr) {}
    /// Called once after every type in the unit has been visited.
    fn exit_unit(&mut self, _unit: &CompilationUnit) {}
}

pub fn walk(unit: &CompilationUnit, visitor: &mut dyn Visitor) {
    for class in &unit.types {
        walk_class(class, visitor);
    }
    visitor.exit_unit(unit);
}

fn walk_class(class: &ClassDecl, visitor: &mut dyn Visitor) {
    visitor.enter_class(class);
    for member in &class.members {
        match member {
            Member::Field(field) => {
                visitor.field(field);
                for declarator in &field.declarators {
                    if let Some(init) = &declarator.init {
                        walk_expr(init, visitor);
                    }
                }
            }
            Member::Method(method) => {
                visitor.enter_method(method);
                if let Some(body) = &method.body {
                    walk_block(body, visitor);
                }
                visitor.exit_method(method);
            }
            Member::Constructor(ctor) => {
                visitor.enter_constructor(ctor);
                walk_block(&ctor.body, visitor);
                visitor.exit_constructor(ctor);
            }
            Member::Class(nested) => walk_class(nested, visitor),
            Member::Other(_) => {}
        }
    }
    visitor.exit_class(class);
}

fn walk_block(block: &Block, visitor: &mut dyn Visitor) {
    for stmt in &block.stmts {
        walk_stmt(stmt, visitor);
    }
}

fn walk_stmt(stmt: &Stmt, visitor: &mut dyn Visitor) {
    match stmt {
        Stmt::LocalVar(decl) => {
            visitor.local_var(decl);
            for declarator in &decl.declarators {
                if let Some(init) = &declarator.init {
                    walk_expr(init, visitor);
                }
            }
        }
        Stmt::Expr { expr, .. } => walk_expr(expr, visitor),
        Stmt::Return { value, .. } => {
            if let Some(value) = value {
                walk_expr(value, visitor);
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            walk_expr(cond, visitor);
            walk_stmt(then_branch, visitor);
            if let Some(else_branch) = else_branch {
                walk_stmt(else_branch, visitor);
            }
        }
        Stmt::While { cond, body, .. } => {
            walk_expr(cond, visitor);
            walk_stmt(body, visitor);
        }
        Stmt::For {
            init,
            cond,
            update,
            body,
            ..
        } => {
            if let Some(init) = init {
                walk_stmt(init, visitor);
            }
            if let Some(cond) = cond {
                walk_expr(cond, visitor);
            }
            if let Some(update) = update {
                walk_expr(update, visitor);
            }
            walk_stmt(body, visitor);
        }
        Stmt::Block(block) => walk_block(block, visitor),
        Stmt::Other(_) => {}
    }
}

fn walk_expr(expr: &Expr, visitor: &mut dyn Visitor) {
    visitor.expr(expr);
    match expr {
        Expr::FieldAccess { base, .. } => walk_expr(base, visitor),
        Expr::MethodCall { base, args, .. } => {
            if let Some(base) = base {
                walk_expr(base, visitor);
            }
            for arg in args {
                walk_expr(arg, visitor);
            }
        }
        Expr::New(new) => {
            for arg in &new.args {
                walk_expr(arg, visitor);
            }
        }
        Expr::Assign { target, value, .. } => {
            walk_expr(target, visitor);
            walk_expr(value, visitor);
        }
        Expr::Binary { lhs, rhs, .. } => {
            walk_expr(lhs, visitor);
            walk_expr(rhs, visitor);
        }
        Expr::Unary { operand, .. } => walk_expr(operand, visitor),
        Expr::Index { base, index, .. } => {
            walk_expr(base, visitor);
            walk_expr(index, visitor);
        }
        Expr::Paren { inner, .. } => walk_expr(inner, visitor),
        Expr::Ident { .. }
        | Expr::This { .. }
        | Expr::Literal { .. }
        | Expr::Other { .. } => {}
    }
}

/// Applies `f` pre-order to every expression in a block, without the full
/// visitor machinery. Used for localized scans such as constructor bodies.
pub fn for_each_expr(block: &Block, f: &mut dyn FnMut(&Expr)) {
    struct Fn1<'a> {
        f: &'a mut dyn FnMut(&Expr),
    }
    impl Visitor for Fn1<'_> {
        fn expr(&mut self, expr: &Expr) {
            (self.f)(expr)
        }
    }
    walk_block(block, &mut Fn1 { f });
}

/// As [`for_each_expr`], over a single statement.
pub fn for_each_expr_in_stmt(stmt: &Stmt, f: &mut dyn FnMut(&Expr)) {
    struct Fn1<'a> {
        f: &'a mut dyn FnMut(&Expr),
    }
    impl Visitor for Fn1<'_> {
        fn expr(&mut self, expr: &Expr) {
            (self.f)(expr)
        }
    }
    walk_stmt(stmt, &mut Fn1 { f });
}
