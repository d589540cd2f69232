//! Extraction pass: moves the selected members out of the source class into
//! generated subclass text, deleting them from the source by token span.

use std::collections::BTreeSet;

use shear_syntax::{
    for_each_expr, ClassDecl, CompilationUnit, ConstructorDecl, Expr, Member, RewriteError,
    TokenRewriter, TokenSpan, TokenStream,
};
use thiserror::Error;
use tracing::debug;

use crate::MoveSet;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("source class `{0}` not found in file")]
    SourceClassNotFound(String),
    #[error(transparent)]
    Rewrite(#[from] RewriteError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractOutcome {
    /// Source file text with the moved members deleted.
    pub rewritten_source: String,
    /// Full text of the generated subclass file, line endings normalized.
    pub subclass_text: String,
    /// Number of constructors that migrated along with the members.
    pub migrated_constructors: usize,
}

/// Runs the extraction pass over one parsed file.
///
/// Members whose names appear in `moves` are appended to the generated
/// subclass and deleted from the source. A constructor migrates in full when
/// its body assigns a moved field or directly calls a moved method; otherwise
/// it stays untouched — a constructor body is never split.
pub fn extract_subclass(
    stream: &TokenStream,
    unit: &CompilationUnit,
    source_class: &str,
    new_class: &str,
    moves: &MoveSet,
) -> Result<ExtractOutcome, ExtractError> {
    let class = find_class(&unit.types, source_class)
        .ok_or_else(|| ExtractError::SourceClassNotFound(source_class.to_string()))?;

    let mut rewriter = TokenRewriter::new(stream);
    let mut code = String::new();
    let mut migrated_constructors = 0usize;

    code.push_str("\n\n");
    code.push_str(&format!("// Extracted subclass ({new_class}) generated by shear\n"));
    code.push_str(&format!("class {new_class} extends {source_class}\n{{\n"));
    code.push_str(&format!("public {new_class}(){{ }}\n"));

    for member in &class.members {
        match member {
            Member::Field(field) => {
                // A multi-declarator statement is keyed by its first
                // declarator only; later declarators never trigger
                // migration on their own.
                let Some(declarator) = field
                    .declarators
                    .first()
                    .filter(|d| moves.fields.contains(&d.name))
                else {
                    continue;
                };
                let modifier = field.modifiers.first().map(String::as_str).unwrap_or("");
                code.push_str(&format!("\t{modifier} {} {};\n", field.ty.text, declarator.name));
                debug!(field = %declarator.name, "migrating field");
                rewriter.delete(field.span);
            }
            Member::Method(method) => {
                if !moves.methods.contains(&method.name) {
                    continue;
                }
                let method_text = stream.slice(method.span);
                code.push_str("\n\t");
                code.push_str(method_text);
                code.push('\n');
                debug!(method = %method.name, "migrating method");
                rewriter.delete(method.span);
            }
            Member::Constructor(ctor) => {
                if constructor_touches_moved_members(ctor, moves) {
                    code.push_str(&render_migrated_constructor(stream, ctor, new_class));
                    debug!(constructor = %ctor.name, "migrating constructor");
                    rewriter.delete(ctor.span);
                    migrated_constructors += 1;
                }
            }
            Member::Class(_) | Member::Other(_) => {}
        }
    }

    code.push('}');

    Ok(ExtractOutcome {
        rewritten_source: rewriter.render()?,
        subclass_text: code.replace("\r\n", "\n"),
        migrated_constructors,
    })
}

fn find_class<'u>(types: &'u [ClassDecl], name: &str) -> Option<&'u ClassDecl> {
    types.iter().find_map(|class| find_in_class(class, name))
}

fn find_in_class<'u>(class: &'u ClassDecl, name: &str) -> Option<&'u ClassDecl> {
    if class.name == name {
        return Some(class);
    }
    class.members.iter().find_map(|member| match member {
        Member::Class(nested) => find_in_class(nested, name),
        _ => None,
    })
}

/// A constructor migrates when its body assigns to a moved field (rightmost
/// segment for chained targets) or directly calls a moved method.
fn constructor_touches_moved_members(ctor: &ConstructorDecl, moves: &MoveSet) -> bool {
    let mut assigned_fields: BTreeSet<String> = BTreeSet::new();
    let mut called_methods: BTreeSet<String> = BTreeSet::new();
    for_each_expr(&ctor.body, &mut |expr| match expr {
        Expr::Assign { target, .. } => {
            if let Some(name) = assignment_target_name(target) {
                assigned_fields.insert(name.to_string());
            }
        }
        Expr::MethodCall { base: None, name, .. } => {
            called_methods.insert(name.clone());
        }
        _ => {}
    });

    assigned_fields.iter().any(|f| moves.fields.contains(f))
        || called_methods.iter().any(|m| moves.methods.contains(m))
}

fn assignment_target_name(target: &Expr) -> Option<&str> {
    match target {
        Expr::Ident { name, .. } => Some(name),
        // `this.x = ...` and `a.b.x = ...` both resolve to the rightmost
        // segment.
        Expr::FieldAccess { field, .. } => Some(field),
        _ => None,
    }
}

fn render_migrated_constructor(
    stream: &TokenStream,
    ctor: &ConstructorDecl,
    new_class: &str,
) -> String {
    let mut text = String::new();
    for modifier in &ctor.modifiers {
        text.push_str(modifier);
        text.push(' ');
    }
    text.push_str(new_class);
    text.push_str(" ( ");
    for param in &ctor.params {
        text.push_str(&param.ty.text);
        text.push(' ');
        text.push_str(&param.name);
        text.push_str(", ");
    }
    if !ctor.params.is_empty() {
        text.truncate(text.len() - 2);
    }
    text.push_str(")\n\t{");
    // Body sliced verbatim between the braces.
    let body = ctor.body.span;
    if body.start + 1 <= body.end.saturating_sub(1) {
        text.push_str(stream.slice(TokenSpan::new(body.start + 1, body.end - 1)));
    }
    text.push_str("}\n");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shear_syntax::parse;

    const GOD_CLASS: &str = "\
public class GodClass {
    private int field1;
    private int field2;
    int keep;

    public GodClass(int seed) {
        this.field1 = seed;
    }

    public int method1() {
        return field1;
    }

    public int method2() {
        return keep;
    }

    void method3() {
        field2 = 0;
    }
}
";

    fn run_extract(source: &str, fields: &[&str], methods: &[&str]) -> ExtractOutcome {
        let stream = TokenStream::of(source);
        let result = parse(&stream);
        let moves = MoveSet::new(
            fields.iter().map(|s| s.to_string()),
            methods.iter().map(|s| s.to_string()),
        );
        extract_subclass(&stream, &result.unit, "GodClass", "GodClassextracted", &moves).unwrap()
    }

    #[test]
    fn moved_members_leave_source_and_enter_subclass() {
        let outcome = run_extract(GOD_CLASS, &["field1", "field2"], &["method1", "method3"]);

        for gone in ["field1", "method1", "method3"] {
            assert!(
                !outcome.rewritten_source.contains(gone),
                "{gone} should have left the source:\n{}",
                outcome.rewritten_source
            );
        }
        // Unmoved members survive untouched.
        assert!(outcome.rewritten_source.contains("int keep;"));
        assert!(outcome.rewritten_source.contains("public int method2()"));

        assert!(outcome
            .subclass_text
            .contains("class GodClassextracted extends GodClass"));
        assert!(outcome.subclass_text.contains("\tprivate int field1;"));
        assert!(outcome.subclass_text.contains("\tprivate int field2;"));
        assert!(outcome.subclass_text.contains("public int method1()"));
        assert!(outcome.subclass_text.contains("void method3()"));
        assert!(!outcome.subclass_text.contains("method2"));
    }

    #[test]
    fn multi_declarator_field_keys_off_its_first_declarator() {
        let source = "\
class GodClass {
    int extra, field2;
    int field1, spare;
}
";
        // A moved name in second position does not trigger migration.
        let outcome = run_extract(source, &["field2"], &[]);
        assert_eq!(outcome.rewritten_source, source);
        assert!(!outcome.subclass_text.contains("field2"));

        // In first position the whole statement migrates.
        let outcome = run_extract(source, &["field1"], &[]);
        assert!(!outcome.rewritten_source.contains("int field1, spare;"));
        assert!(outcome.subclass_text.contains("int field1;"));
    }

    #[test]
    fn constructor_migrates_when_it_writes_a_moved_field() {
        let outcome = run_extract(GOD_CLASS, &["field1"], &[]);
        assert_eq!(outcome.migrated_constructors, 1);
        assert!(!outcome.rewritten_source.contains("public GodClass(int seed)"));
        assert!(outcome
            .subclass_text
            .contains("public GodClassextracted ( int seed)"));
        assert!(outcome.subclass_text.contains("this.field1 = seed;"));
    }

    #[test]
    fn constructor_stays_when_untouched_members_move() {
        let outcome = run_extract(GOD_CLASS, &["field2"], &["method2"]);
        assert_eq!(outcome.migrated_constructors, 0);
        assert!(outcome.rewritten_source.contains("public GodClass(int seed)"));
    }

    #[test]
    fn constructor_migrates_on_direct_call_to_moved_method() {
        let source = "\
class GodClass {
    int field1;
    GodClass() {
        method1();
    }
    void method1() { }
}
";
        let outcome = run_extract(source, &[], &["method1"]);
        assert_eq!(outcome.migrated_constructors, 1);
        assert!(outcome.subclass_text.contains("GodClassextracted ( )"));
    }

    #[test]
    fn missing_source_class_is_an_error() {
        let stream = TokenStream::of("class Other { }");
        let result = parse(&stream);
        let err = extract_subclass(
            &stream,
            &result.unit,
            "GodClass",
            "GodClassextracted",
            &MoveSet::default(),
        )
        .unwrap_err();
        assert_eq!(err, ExtractError::SourceClassNotFound("GodClass".to_string()));
    }

    #[test]
    fn empty_move_set_changes_nothing() {
        let outcome = run_extract(GOD_CLASS, &[], &[]);
        assert_eq!(outcome.rewritten_source, GOD_CLASS);
        assert_eq!(outcome.migrated_constructors, 0);
    }
}
