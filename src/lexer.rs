//! Lexer for input-format descriptions using logos
//!
//! Format strings scraped from problem statements arrive with LaTeX
//! styling macros, Unicode subscript glyphs and several spellings of
//! the ellipsis. A normalization pass rewrites those to a small ASCII
//! vocabulary, then the logos tokenizer takes over.
//!
//! Recognized tokens:
//! - Identifiers: N, a, ans
//! - Integer literals: 0, 42
//! - Subscript marker `_`, arithmetic operators, brackets, commas
//! - Ellipses: `...`, `…`, `\ldots`, `\cdots`, `\dots`, `⋮`, `\vdots`

use logos::Logos;
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::error::{CompileError, CompileResult};

/// The logos state machine. [`TokenKind`] is the public vocabulary;
/// it adds the Eof marker the stream is terminated with.
#[derive(Logos, Debug, Clone, PartialEq)]
enum Lexeme {
    #[regex(r"\r?\n")]
    Newline,

    #[regex(r"[ \t]+")]
    Space,

    #[token("...")]
    #[token("…")]
    #[token(r"\ldots")]
    #[token(r"\cdots")]
    #[token(r"\dots")]
    Dots,

    #[token("⋮")]
    #[token(r"\vdots")]
    VDots,

    #[token("_")]
    Subscript,

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Number(i64),

    #[regex(r"[A-Za-z][A-Za-z0-9]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"[+\-*/]", |lex| lex.slice().chars().next())]
    Op(char),

    #[regex(r"[({\[]")]
    LParen,

    #[regex(r"[)}\]]")]
    RParen,

    #[token(",")]
    Comma,
}

/// Token kinds of the format-description language
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Newline,
    /// Horizontal whitespace, recognized but dropped before parsing
    Space,
    /// Horizontal ellipsis, in any spelling
    Dots,
    /// Vertical ellipsis
    VDots,
    Subscript,
    Number(i64),
    Ident(String),
    Op(char),
    /// Any opening bracket; kind is not matched against the closer
    LParen,
    RParen,
    Comma,
    Eof,
}

impl From<Lexeme> for TokenKind {
    fn from(lexeme: Lexeme) -> Self {
        match lexeme {
            Lexeme::Newline => TokenKind::Newline,
            Lexeme::Space => TokenKind::Space,
            Lexeme::Dots => TokenKind::Dots,
            Lexeme::VDots => TokenKind::VDots,
            Lexeme::Subscript => TokenKind::Subscript,
            Lexeme::Number(n) => TokenKind::Number(n),
            Lexeme::Ident(s) => TokenKind::Ident(s),
            Lexeme::Op(c) => TokenKind::Op(c),
            Lexeme::LParen => TokenKind::LParen,
            Lexeme::RParen => TokenKind::RParen,
            Lexeme::Comma => TokenKind::Comma,
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Newline => write!(f, "\\n"),
            TokenKind::Space => write!(f, " "),
            TokenKind::Dots => write!(f, "..."),
            TokenKind::VDots => write!(f, "⋮"),
            TokenKind::Subscript => write!(f, "_"),
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::Ident(s) => write!(f, "{}", s),
            TokenKind::Op(c) => write!(f, "{}", c),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Eof => write!(f, "<eof>"),
        }
    }
}

/// A token with its 1-based source position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

static WRAPPER_MACRO: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"\\(?:mathrm|mathit|mathbf|mathtt|operatorname|textrm|textit|textbf|text|mbox|rm)\s*\{([^{}]*)\}",
    )
    .expect("wrapper macro pattern")
});

/// Map a Unicode subscript glyph to its ASCII equivalent
fn subscript_glyph(c: char) -> Option<char> {
    match c {
        '₀'..='₉' => Some((b'0' + (c as u32 - '₀' as u32) as u8) as char),
        '₊' => Some('+'),
        '₋' => Some('-'),
        'ₐ' => Some('a'),
        'ₑ' => Some('e'),
        'ₕ' => Some('h'),
        'ᵢ' => Some('i'),
        'ⱼ' => Some('j'),
        'ₖ' => Some('k'),
        'ₗ' => Some('l'),
        'ₘ' => Some('m'),
        'ₙ' => Some('n'),
        'ₒ' => Some('o'),
        'ₚ' => Some('p'),
        'ᵣ' => Some('r'),
        'ₛ' => Some('s'),
        'ₜ' => Some('t'),
        'ᵤ' => Some('u'),
        'ᵥ' => Some('v'),
        'ₓ' => Some('x'),
        _ => None,
    }
}

/// Normalize raw format text ahead of tokenization.
///
/// Styling wrapper macros are peeled down to their inner text, and each
/// maximal run of Unicode subscript glyphs is replaced by a single `_`
/// marker followed by the ASCII spelling, so `aₙ₋₁` becomes `a_n-1`.
pub fn normalize(source: &str) -> String {
    let mut text = source.to_string();
    loop {
        match WRAPPER_MACRO.replace_all(&text, "$1") {
            Cow::Borrowed(_) => break,
            Cow::Owned(replaced) => text = replaced,
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        match subscript_glyph(c) {
            Some(ascii) => {
                if !in_run {
                    out.push('_');
                    in_run = true;
                }
                out.push(ascii);
            }
            None => {
                in_run = false;
                out.push(c);
            }
        }
    }
    out
}

/// Tokenize normalized text into a position-tagged stream ending in
/// Eof. Space tokens are included; the parser filters them out.
pub fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
    let text = normalize(source);
    let line_starts = line_starts(&text);

    let mut tokens = Vec::new();
    let mut lexer = Lexeme::lexer(&text);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let (line, column) = position(&text, &line_starts, span.start);
        match result {
            Ok(lexeme) => tokens.push(Token {
                kind: lexeme.into(),
                line,
                column,
            }),
            Err(()) => {
                let character = text[span.start..].chars().next().unwrap_or('\0');
                return Err(CompileError::Lexical {
                    line,
                    column,
                    character,
                });
            }
        }
    }

    let (line, column) = position(&text, &line_starts, text.len());
    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
        column,
    });
    Ok(tokens)
}

fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (offset, b) in text.bytes().enumerate() {
        if b == b'\n' {
            starts.push(offset + 1);
        }
    }
    starts
}

fn position(text: &str, line_starts: &[usize], offset: usize) -> (usize, usize) {
    let line = line_starts.partition_point(|&start| start <= offset);
    let line_start = line_starts[line - 1];
    let column = text[line_start..offset].chars().count() + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_tokens() {
        assert_eq!(
            kinds("N M"),
            vec![
                TokenKind::Ident("N".to_string()),
                TokenKind::Space,
                TokenKind::Ident("M".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_subscripted_sequence() {
        assert_eq!(
            kinds("a_1 ... a_N"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Subscript,
                TokenKind::Number(1),
                TokenKind::Space,
                TokenKind::Dots,
                TokenKind::Space,
                TokenKind::Ident("a".to_string()),
                TokenKind::Subscript,
                TokenKind::Ident("N".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unicode_subscript_run() {
        // One `_` per maximal glyph run: aₙ₋₁ lexes as a_n-1
        assert_eq!(
            kinds("aₙ₋₁"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Subscript,
                TokenKind::Ident("n".to_string()),
                TokenKind::Op('-'),
                TokenKind::Number(1),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_ellipsis_spellings() {
        for src in ["...", "…", r"\ldots", r"\cdots", r"\dots"] {
            assert_eq!(kinds(src), vec![TokenKind::Dots, TokenKind::Eof], "{}", src);
        }
        for src in ["⋮", r"\vdots"] {
            assert_eq!(kinds(src), vec![TokenKind::VDots, TokenKind::Eof], "{}", src);
        }
    }

    #[test]
    fn test_wrapper_macro_stripped() {
        assert_eq!(
            kinds(r"\mathrm{N} Q"),
            vec![
                TokenKind::Ident("N".to_string()),
                TokenKind::Space,
                TokenKind::Ident("Q".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_bracket_classes() {
        assert_eq!(
            kinds("A_{i,j}"),
            vec![
                TokenKind::Ident("A".to_string()),
                TokenKind::Subscript,
                TokenKind::LParen,
                TokenKind::Ident("i".to_string()),
                TokenKind::Comma,
                TokenKind::Ident("j".to_string()),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lexical_error_position() {
        let err = tokenize("N\nM %").unwrap_err();
        match err {
            CompileError::Lexical {
                line,
                column,
                character,
            } => {
                assert_eq!(line, 2);
                assert_eq!(column, 3);
                assert_eq!(character, '%');
            }
            other => panic!("expected lexical error, got {:?}", other),
        }
    }
}
