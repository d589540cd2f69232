//! Full-fidelity Java lexer.
//!
//! Unlike an IDE lexer that hides trivia, every whitespace run and comment is
//! a token of its own. Refactoring edits are keyed by token index, and those
//! indices must survive into the final render, so the stream keeps everything.
//!
//! `<` and `>` are always lexed as single tokens (never `>>`, `<=`, ...). The
//! parser balances generics at the token level and treats operators
//! shape-generically, so splitting them costs nothing and avoids the classic
//! `List<List<String>>` ambiguity.

/// Kind of a lexed token.
///
/// Only keywords the parser dispatches on get their own kind; the rest of the
/// Java keyword set lexes as [`TokenKind::Ident`], which is all the
/// refactoring passes need.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Trivia.
    Whitespace,
    LineComment,
    BlockComment,

    Ident,
    Number,
    StringLit,
    CharLit,

    // Keywords.
    ClassKw,
    InterfaceKw,
    EnumKw,
    ExtendsKw,
    ImplementsKw,
    PackageKw,
    ImportKw,
    NewKw,
    ThisKw,
    SuperKw,
    ReturnKw,
    IfKw,
    ElseKw,
    WhileKw,
    ForKw,
    DoKw,
    VoidKw,
    PublicKw,
    PrivateKw,
    ProtectedKw,
    StaticKw,
    FinalKw,
    AbstractKw,
    NativeKw,
    SynchronizedKw,
    TransientKw,
    VolatileKw,
    StrictfpKw,
    DefaultKw,

    // Punctuation.
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    At,
    Eq,
    Lt,
    Gt,
    Question,
    Colon,

    /// Any other operator cluster (`==`, `&&`, `+`, `->`, ...).
    Op,
    /// A byte the lexer could not classify.
    Unknown,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }
}

/// A lexed token: kind plus the byte span of its text in the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

fn keyword_kind(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "class" => TokenKind::ClassKw,
        "interface" => TokenKind::InterfaceKw,
        "enum" => TokenKind::EnumKw,
        "extends" => TokenKind::ExtendsKw,
        "implements" => TokenKind::ImplementsKw,
        "package" => TokenKind::PackageKw,
        "import" => TokenKind::ImportKw,
        "new" => TokenKind::NewKw,
        "this" => TokenKind::ThisKw,
        "super" => TokenKind::SuperKw,
        "return" => TokenKind::ReturnKw,
        "if" => TokenKind::IfKw,
        "else" => TokenKind::ElseKw,
        "while" => TokenKind::WhileKw,
        "for" => TokenKind::ForKw,
        "do" => TokenKind::DoKw,
        "void" => TokenKind::VoidKw,
        "public" => TokenKind::PublicKw,
        "private" => TokenKind::PrivateKw,
        "protected" => TokenKind::ProtectedKw,
        "static" => TokenKind::StaticKw,
        "final" => TokenKind::FinalKw,
        "abstract" => TokenKind::AbstractKw,
        "native" => TokenKind::NativeKw,
        "synchronized" => TokenKind::SynchronizedKw,
        "transient" => TokenKind::TransientKw,
        "volatile" => TokenKind::VolatileKw,
        "strictfp" => TokenKind::StrictfpKw,
        "default" => TokenKind::DefaultKw,
        _ => return None,
    };
    Some(kind)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Lex `input` into a complete token stream, trivia included.
///
/// The lexer never fails: unclassifiable bytes become [`TokenKind::Unknown`]
/// tokens and the caller decides what to do with them.
pub fn lex(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut pos = 0usize;

    while pos < input.len() {
        let rest = &input[pos..];
        let c = rest.chars().next().unwrap_or('\0');
        let start = pos;

        let kind = if c.is_whitespace() {
            pos += scan_while(rest, |c| c.is_whitespace());
            TokenKind::Whitespace
        } else if rest.starts_with("//") {
            pos += rest.find('\n').unwrap_or(rest.len());
            TokenKind::LineComment
        } else if rest.starts_with("/*") {
            pos += match rest[2..].find("*/") {
                Some(idx) => idx + 4,
                // Unterminated comment runs to end of input.
                None => rest.len(),
            };
            TokenKind::BlockComment
        } else if is_ident_start(c) {
            let len = scan_while(rest, is_ident_continue);
            pos += len;
            keyword_kind(&rest[..len]).unwrap_or(TokenKind::Ident)
        } else if c.is_ascii_digit() {
            // Permissive: digits, hex/binary prefixes, underscores, exponent
            // signs and type suffixes all fold into one Number token.
            pos += scan_while(rest, |c| {
                c.is_ascii_alphanumeric() || c == '_' || c == '.'
            });
            TokenKind::Number
        } else if c == '"' {
            pos += scan_string(rest, '"');
            TokenKind::StringLit
        } else if c == '\'' {
            pos += scan_string(rest, '\'');
            TokenKind::CharLit
        } else {
            pos += c.len_utf8();
            match c {
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                ';' => TokenKind::Semicolon,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                '@' => TokenKind::At,
                '?' => TokenKind::Question,
                '<' => TokenKind::Lt,
                '>' => TokenKind::Gt,
                '=' | '!' | '&' | '|' | '+' | '-' | '*' | '/' | '%' | '^' | '~' | ':' => {
                    // Maximal munch for operator clusters that do not start
                    // with `<` or `>`.
                    let len = operator_len(&rest[..]);
                    pos = start + len;
                    match &rest[..len] {
                        "=" => TokenKind::Eq,
                        ":" => TokenKind::Colon,
                        _ => TokenKind::Op,
                    }
                }
                _ => TokenKind::Unknown,
            }
        };

        debug_assert!(pos > start, "lexer must make progress at byte {start}");
        tokens.push(Token { kind, start, end: pos });
    }

    debug_assert_eq!(pos, bytes.len());
    tokens
}

fn scan_while(rest: &str, pred: impl Fn(char) -> bool) -> usize {
    rest.char_indices()
        .find(|&(_, c)| !pred(c))
        .map(|(idx, _)| idx)
        .unwrap_or(rest.len())
}

/// Scans a quoted literal including both quotes; tolerant of escapes and
/// unterminated input.
fn scan_string(rest: &str, quote: char) -> usize {
    let mut chars = rest.char_indices().skip(1);
    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '\n' => return idx,
            c if c == quote => return idx + c.len_utf8(),
            _ => {}
        }
    }
    rest.len()
}

const OPERATORS: &[&str] = &[
    "==", "!=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "->", "::",
];

fn operator_len(rest: &str) -> usize {
    for op in OPERATORS {
        if rest.starts_with(op) {
            return op.len();
        }
    }
    1
}

/// A lexed source file: the original text plus its full token stream.
#[derive(Clone, Debug)]
pub struct TokenStream {
    source: String,
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn of(source: impl Into<String>) -> Self {
        let source = source.into();
        let tokens = lex(&source);
        Self { source, tokens }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn kind(&self, index: usize) -> Option<TokenKind> {
        self.tokens.get(index).map(|t| t.kind)
    }

    /// Text of a single token.
    pub fn token_text(&self, index: usize) -> &str {
        let token = &self.tokens[index];
        &self.source[token.start..token.end]
    }

    /// Exact source slice covering an inclusive token span, trivia included.
    pub fn slice(&self, span: crate::cst::TokenSpan) -> &str {
        if self.tokens.is_empty() || span.start > span.end {
            return "";
        }
        let start = self.tokens[span.start].start;
        let end = self.tokens[span.end].end;
        &self.source[start..end]
    }
}
