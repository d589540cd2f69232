//! Usage-discovery pass: builds the usage table for a dependent file and
//! retypes signature positions of the source type.
//!
//! Declaration retyping is *not* decided here; that narrowing belongs to the
//! propagation pass. Return and parameter types, by contrast, are rewritten
//! unconditionally under the default policy.

use shear_syntax::{
    walk, ClassDecl, CompilationUnit, ConstructorDecl, Expr, FieldDecl, LocalVarDecl, MethodDecl,
    RewriteError, TokenRewriter, TokenStream, Visitor,
};
use tracing::debug;

use crate::scope::ScopeStack;
use crate::usage::UsageTable;
use crate::SignatureRetype;

#[derive(Clone, Debug)]
pub struct DiscoverOutcome {
    /// File text with signature positions retyped (unchanged under the
    /// usage-gated policy).
    pub rewritten: String,
    pub table: UsageTable,
}

/// Runs the usage-discovery pass over one parsed dependent file.
pub fn discover_usages(
    stream: &TokenStream,
    unit: &CompilationUnit,
    source_class: &str,
    new_class: &str,
    policy: SignatureRetype,
) -> Result<DiscoverOutcome, RewriteError> {
    let mut collector = UsageCollector {
        rewriter: TokenRewriter::new(stream),
        scope: ScopeStack::new(),
        table: UsageTable::new(),
        source_class,
        new_class,
        policy,
    };
    walk(unit, &mut collector);
    debug_assert!(collector.scope.is_empty(), "scope stack must unwind fully");

    let table = collector.table;
    debug!(identifiers = table.len(), "usage discovery complete");
    Ok(DiscoverOutcome {
        rewritten: collector.rewriter.render()?,
        table,
    })
}

struct UsageCollector<'a> {
    rewriter: TokenRewriter<'a>,
    scope: ScopeStack,
    table: UsageTable,
    source_class: &'a str,
    new_class: &'a str,
    policy: SignatureRetype,
}

impl UsageCollector<'_> {
    fn retype_signatures(&mut self, return_ty: Option<&shear_syntax::TypeRef>, params: &[shear_syntax::Param]) {
        if self.policy != SignatureRetype::Unconditional {
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

/// Effective base identifier of a member access: the identifier itself, or
/// the rightmost segment of a chained access. Accesses through `this` (and
/// through non-identifier bases such as call results) are not tracked.
pub(crate) fn effective_base(base: &Expr) -> Option<&str> {
    match base {
        Expr::Ident { name, .. } if name != "this" => Some(name),
        Expr::FieldAccess { field, .. } if field != "this" => Some(field),
        _ => None,
    }
}

impl Visitor for UsageCollector<'_> {
    fn enter_class(&mut self, class: &ClassDecl) {
        self.scope.push_class(&class.name);
    }

    fn exit_class(&mut self, _class: &ClassDecl) {
        self.scope.pop();
    }

    fn enter_method(&mut self, method: &MethodDecl) {
        self.retype_signatures(Some(&method.return_ty), &method.params);
        self.scope.push_method(&method.name);
    }

    fn exit_method(&mut self, _method: &MethodDecl) {
        self.scope.pop();
    }

    fn enter_constructor(&mut self, ctor: &ConstructorDecl) {
        // Constructor parameters are signature positions too; constructors do
        // not open a scope frame of their own.
        self.retype_signatures(None, &ctor.params);
    }

    fn field(&mut self, field: &FieldDecl) {
        if field.ty.text != self.source_class {
            return;
        }
        let path = self.scope.path();
        for declarator in &field.declarators {
            self.table.declare(&declarator.name, &path);
        }
    }

    fn local_var(&mut self, decl: &LocalVarDecl) {
        if decl.ty.text != self.source_class {
            return;
        }
        let path = self.scope.path();
        for declarator in &decl.declarators {
            self.table.declare(&declarator.name, &path);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        let path = self.scope.path();
        match expr {
            Expr::FieldAccess { base, field, .. } => {
                if let Some(name) = effective_base(base) {
                    self.table.record_field(name, &path, field);
                }
            }
            Expr::MethodCall {
                base: Some(base),
                name: method,
                ..
            } => {
                if let Some(name) = effective_base(base) {
                    self.table.record_method(name, &path, method);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shear_syntax::parse;

    fn run_discover(source: &str, policy: SignatureRetype) -> DiscoverOutcome {
        let stream = TokenStream::of(source);
        let result = parse(&stream);
        assert_eq!(result.errors, Vec::new());
        discover_usages(&stream, &result.unit, "GodClass", "GodClassextracted", policy).unwrap()
    }

    #[test]
    fn records_accesses_per_declared_identifier() {
        let source = "\
class Client {
    GodClass shared;

    void use(int n) {
        GodClass obj = new GodClass();
        obj.method1();
        obj.field1 = n;
        shared.method2();
    }
}
";
        let outcome = run_discover(source, SignatureRetype::Unconditional);
        let table = &outcome.table;
        assert_eq!(table.len(), 2);

        let class_scope = crate::ScopePath(vec![crate::ScopeFrame::Class("Client".to_string())]);
        let method_scope = crate::ScopePath(vec![
            crate::ScopeFrame::Class("Client".to_string()),
            crate::ScopeFrame::Method("use".to_string()),
        ]);

        let obj = table.lookup("obj", &method_scope).unwrap();
        assert!(obj.methods().contains("method1"));
        assert!(obj.fields().contains("field1"));

        // `shared` is declared on the class; the access inside `use` falls
        // back outward to the class-scope record.
        let shared = table.lookup("shared", &class_scope).unwrap();
        assert!(shared.methods().contains("method2"));
    }

    #[test]
    fn signature_positions_are_retyped_unconditionally() {
        let source = "\
class Client {
    GodClass make(GodClass input, int n) {
        return input;
    }
}
";
        let outcome = run_discover(source, SignatureRetype::Unconditional);
        assert_eq!(
            outcome.rewritten,
            "\
class Client {
    GodClassextracted make(GodClassextracted input, int n) {
        return input;
    }
}
"
        );
    }

    #[test]
    fn usage_gated_policy_leaves_signatures_alone() {
        let source = "class Client { GodClass make() { return null; } }";
        let outcome = run_discover(source, SignatureRetype::UsageGated);
        assert_eq!(outcome.rewritten, source);
    }

    #[test]
    fn this_accesses_are_not_tracked() {
        let source = "\
class GodClassUser {
    GodClass self;
    void m() {
        this.method1();
        this.field1 = 1;
    }
}
";
        let outcome = run_discover(source, SignatureRetype::Unconditional);
        // `self` is declared but nothing was recorded through `this`.
        let scope = crate::ScopePath(vec![crate::ScopeFrame::Class("GodClassUser".to_string())]);
        let usage = outcome.table.lookup("self", &scope).unwrap();
        assert!(usage.fields().is_empty());
        assert!(usage.methods().is_empty());
    }

    #[test]
    fn chained_access_attributes_to_rightmost_base_segment() {
        let source = "\
class Client {
    void m() {
        GodClass inner;
        holder.inner.method1();
    }
}
";
        let outcome = run_discover(source, SignatureRetype::Unconditional);
        let scope = crate::ScopePath(vec![
            crate::ScopeFrame::Class("Client".to_string()),
            crate::ScopeFrame::Method("m".to_string()),
        ]);
        let usage = outcome.table.lookup("inner", &scope).unwrap();
        assert!(usage.methods().contains("method1"));
    }
}
