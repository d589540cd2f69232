//! Token-span keyed rewriter.
//!
//! Edits reference immutable token positions in the original stream and are
//! rendered once, at the end of a pass. The edit set is validated before
//! rendering: the only tolerated overlap is a deletion that strictly subsumes
//! a replacement (the replacement was emitted against the pre-edit stream and
//! the deletion wins). Anything else is a structural defect and fails the
//! render instead of emitting corrupted text.

use thiserror::Error;

use crate::cst::TokenSpan;
use crate::lexer::TokenStream;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditOp {
    Delete,
    Replace(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenEdit {
    pub span: TokenSpan,
    pub op: EditOp,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error("overlapping edits: {first:?} collides with {second:?}")]
    Overlap { first: TokenSpan, second: TokenSpan },
    #[error("edit span {span:?} is outside the token stream (len={len})")]
    OutOfBounds { span: TokenSpan, len: usize },
}

/// Accumulates token-span edits against one stream and renders the final text.
#[derive(Debug)]
pub struct TokenRewriter<'a> {
    stream: &'a TokenStream,
    edits: Vec<TokenEdit>,
}

impl<'a> TokenRewriter<'a> {
    pub fn new(stream: &'a TokenStream) -> Self {
        Self {
            stream,
            edits: Vec::new(),
        }
    }

    pub fn delete(&mut self, span: TokenSpan) {
        self.edits.push(TokenEdit {
            span,
            op: EditOp::Delete,
        });
    }

    pub fn replace(&mut self, span: TokenSpan, text: impl Into<String>) {
        self.edits.push(TokenEdit {
            span,
            op: EditOp::Replace(text.into()),
        });
    }

    /// Validates the edit set and renders the rewritten text.
    ///
    /// Trivia tokens inside a deleted or replaced span disappear with it;
    /// trivia outside any edit is preserved byte-for-byte.
    pub fn render(&self) -> Result<String, RewriteError> {
        let len = self.stream.len();
        for edit in &self.edits {
            if edit.span.end >= len || edit.span.start > edit.span.end {
                return Err(RewriteError::OutOfBounds {
                    span: edit.span,
                    len,
                });
            }
        }

        // Containers first, so a subsumed replacement meets its deletion.
        let mut sorted: Vec<&TokenEdit> = self.edits.iter().collect();
        sorted.sort_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then_with(|| b.span.end.cmp(&a.span.end))
        });

        let mut accepted: Vec<&TokenEdit> = Vec::with_capacity(sorted.len());
        for edit in sorted {
            match accepted.last() {
                Some(last) if last.span.overlaps(edit.span) => {
                    if last == &edit {
                        // Exact duplicate.
                        continue;
                    }
                    let subsumed = last.op == EditOp::Delete
                        && last.span.contains(edit.span)
                        && matches!(edit.op, EditOp::Replace(_));
                    if !subsumed {
                        return Err(RewriteError::Overlap {
                            first: last.span,
                            second: edit.span,
                        });
                    }
                }
                _ => accepted.push(edit),
            }
        }

        let mut out = String::with_capacity(self.stream.source().len());
        let mut next_edit = accepted.iter().peekable();
        let mut index = 0usize;
        while index < len {
            match next_edit.peek() {
                Some(edit) if edit.span.start == index => {
                    if let EditOp::Replace(text) = &edit.op {
                        out.push_str(text);
                    }
                    index = edit.span.end + 1;
                    next_edit.next();
                }
                _ => {
                    out.push_str(self.stream.token_text(index));
                    index += 1;
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stream(source: &str) -> TokenStream {
        TokenStream::of(source)
    }

    /// Index of the `n`th significant token.
    fn sig(stream: &TokenStream, n: usize) -> usize {
        stream
            .tokens()
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.kind.is_trivia())
            .map(|(i, _)| i)
            .nth(n)
            .unwrap()
    }

    #[test]
    fn no_edits_round_trips() {
        let s = stream("class A { int x; }");
        let rewriter = TokenRewriter::new(&s);
        assert_eq!(rewriter.render().unwrap(), "class A { int x; }");
    }

    #[test]
    fn replace_single_token() {
        let s = stream("GodClass obj;");
        let mut rewriter = TokenRewriter::new(&s);
        let idx = sig(&s, 0);
        rewriter.replace(TokenSpan::new(idx, idx), "GodClassextracted");
        assert_eq!(rewriter.render().unwrap(), "GodClassextracted obj;");
    }

    #[test]
    fn delete_span_drops_contained_trivia() {
        let s = stream("int a; int b; int c;");
        let mut rewriter = TokenRewriter::new(&s);
        // Delete `int b;` — tokens from the second `int` through the second `;`.
        let start = sig(&s, 3);
        let end = sig(&s, 5);
        rewriter.delete(TokenSpan::new(start, end));
        assert_eq!(rewriter.render().unwrap(), "int a;  int c;");
    }

    #[test]
    fn delete_subsumes_replace() {
        let s = stream("GodClass f() { }");
        let mut rewriter = TokenRewriter::new(&s);
        let ret = sig(&s, 0);
        rewriter.replace(TokenSpan::new(ret, ret), "GodClassextracted");
        rewriter.delete(TokenSpan::new(ret, sig(&s, 5)));
        assert_eq!(rewriter.render().unwrap(), "");
    }

    #[test]
    fn partial_overlap_is_an_error() {
        let s = stream("a b c d");
        let mut rewriter = TokenRewriter::new(&s);
        rewriter.delete(TokenSpan::new(sig(&s, 0), sig(&s, 2)));
        rewriter.replace(TokenSpan::new(sig(&s, 2), sig(&s, 3)), "x");
        assert!(matches!(
            rewriter.render(),
            Err(RewriteError::Overlap { .. })
        ));
    }

    #[test]
    fn replace_then_replace_same_span_is_an_error() {
        let s = stream("a b");
        let mut rewriter = TokenRewriter::new(&s);
        rewriter.replace(TokenSpan::new(sig(&s, 0), sig(&s, 0)), "x");
        rewriter.replace(TokenSpan::new(sig(&s, 0), sig(&s, 0)), "y");
        assert!(matches!(
            rewriter.render(),
            Err(RewriteError::Overlap { .. })
        ));
    }

    #[test]
    fn out_of_bounds_span() {
        let s = stream("a");
        let mut rewriter = TokenRewriter::new(&s);
        rewriter.delete(TokenSpan::new(0, 99));
        assert!(matches!(
            rewriter.render(),
            Err(RewriteError::OutOfBounds { .. })
        ));
    }
}
