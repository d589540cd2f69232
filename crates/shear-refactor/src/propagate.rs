//! Propagation pass: narrows declaration retyping to identifiers whose
//! recorded usage intersects the moved member set, and retargets matching
//! constructions.
//!
//! Runs over a fresh parse of the text the discovery pass wrote; the usage
//! table is the only state carried between the two passes.

use shear_syntax::{
    walk, ClassDecl, CompilationUnit, ConstructorDecl, Expr, FieldDecl, LocalVarDecl, MethodDecl,
    RewriteError, TokenRewriter, TokenStream, TypeRef, VarDeclarator, Visitor,
};
use tracing::debug;

use crate::scope::ScopeStack;
use crate::usage::UsageTable;
use crate::{MoveSet, SignatureRetype};

/// Runs the propagation pass over one parsed dependent file, using the usage
/// table discovery built for the same file.
pub fn propagate_usages(
    stream: &TokenStream,
    unit: &CompilationUnit,
    source_class: &str,
    new_class: &str,
    moves: &MoveSet,
    table: &UsageTable,
    policy: SignatureRetype,
) -> Result<String, RewriteError> {
    // Under the usage-gated policy, signature positions deferred by the
    // discovery pass are rewritten here, and only when some identifier in
    // the file actually uses a moved member.
    let retype_signatures = policy == SignatureRetype::UsageGated
        && table.any_intersects(&moves.fields, &moves.methods);

    let mut propagator = Propagator {
        rewriter: TokenRewriter::new(stream),
        scope: ScopeStack::new(),
        table,
        moves,
        source_class,
        new_class,
        retype_signatures,
        retyped_declarations: 0,
    };
    walk(unit, &mut propagator);
    debug_assert!(propagator.scope.is_empty(), "scope stack must unwind fully");

    debug!(
        declarations = propagator.retyped_declarations,
        "propagation complete"
    );
    propagator.rewriter.render()
}

struct Propagator<'a> {
    rewriter: TokenRewriter<'a>,
    scope: ScopeStack,
    table: &'a UsageTable,
    moves: &'a MoveSet,
    source_class: &'a str,
    new_class: &'a str,
    retype_signatures: bool,
    retyped_declarations: usize,
}

impl Propagator<'_> {
    /// Retypes one declaration statement when any of its declarators has a
    /// recorded usage intersecting the moved member set.
    fn propagate_declaration(&mut self, ty: &TypeRef, declarators: &[VarDeclarator]) {
        if ty.text != self.source_class {
            return;
        }
        let path = self.scope.path();
        let qualifies = declarators.iter().any(|declarator| {
            self.table
                .lookup(&declarator.name, &path)
                .is_some_and(|usage| usage.intersects(&self.moves.fields, &self.moves.methods))
        });
        if !qualifies {
            return;
        }

        self.rewriter.replace(ty.span, self.new_class);
        self.retyped_declarations += 1;

        // Retarget plain `new Source(...)` initializers in the same
        // statement. Generic, array and qualified creations are out of
        // scope by design.
        for declarator in declarators {
            if let Some(Expr::New(new)) = &declarator.init {
                if new.is_plain() && new.type_name == self.source_class {
                    self.rewriter.replace(new.type_span, self.new_class);
                }
            }
        }
    }

    fn maybe_retype_signatures(&mut self, return_ty: Option<&TypeRef>, params: &[shear_syntax::Param]) {
        if !self.retype_signatures {
            return;
        }
        if let Some(ty) = return_ty {
            if ty.text == self.source_class {
                self.rewriter.replace(ty.span, self.new_class);
            }
        }
        for param in params {
            if param.ty.text == self.source_class {
                self.rewriter.replace(param.ty.span, self.new_class);
            }
        }
    }
}

impl Visitor for Propagator<'_> {
    fn enter_class(&mut self, class: &ClassDecl) {
        self.scope.push_class(&class.name);
    }

    fn exit_class(&mut self, _class: &ClassDecl) {
        self.scope.pop();
    }

    fn enter_method(&mut self, method: &MethodDecl) {
        self.maybe_retype_signatures(Some(&method.return_ty), &method.params);
        self.scope.push_method(&method.name);
    }

    fn exit_method(&mut self, _method: &MethodDecl) {
        self.scope.pop();
    }

    fn enter_constructor(&mut self, ctor: &ConstructorDecl) {
        self.maybe_retype_signatures(None, &ctor.params);
    }

    fn field(&mut self, field: &FieldDecl) {
        self.propagate_declaration(&field.ty, &field.declarators);
    }

    fn local_var(&mut self, decl: &LocalVarDecl) {
        self.propagate_declaration(&decl.ty, &decl.declarators);
    }
}
