//! Parser for tokenized format descriptions
//!
//! Produces the raw statement tree: items, ellipsis markers and line
//! breaks. The parser is permissive — unexpected tokens at statement
//! level are skipped and unparseable atoms become placeholder items —
//! but every recovery is recorded as a structured diagnostic instead
//! of being dropped silently.

use crate::ast::{BinOpKind, Expr, ItemRef, RawFormat, RawStmt};
use crate::lexer::{Token, TokenKind};

/// Name used for placeholder items substituted at unparseable atoms.
/// The lexer never produces identifiers containing `_`, so the name
/// cannot collide with a real variable.
pub const PLACEHOLDER_NAME: &str = "_error_";

/// A recovered parse problem with its source position
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// Raw tree plus the diagnostics accumulated while building it
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    pub format: RawFormat,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parser over a space-filtered token stream
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let tokens = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Space)
            .collect();
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    fn peek(&self) -> &TokenKind {
        static EOF: TokenKind = TokenKind::Eof;
        self.tokens.get(self.pos).map(|t| &t.kind).unwrap_or(&EOF)
    }

    fn here(&self) -> (usize, usize) {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| (t.line, t.column))
            .unwrap_or((1, 1))
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn report(&mut self, message: impl Into<String>) {
        let (line, column) = self.here();
        self.diagnostics.push(Diagnostic {
            line,
            column,
            message: message.into(),
        });
    }

    /// Parse the full statement list up to Eof
    pub fn parse_format(mut self) -> ParseOutput {
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Eof => break,
                TokenKind::Ident(_) => {
                    let item = self.parse_item();
                    stmts.push(RawStmt::Item(item));
                }
                TokenKind::Newline => {
                    self.advance();
                    stmts.push(RawStmt::Break);
                }
                TokenKind::Dots => {
                    self.advance();
                    stmts.push(RawStmt::Dots);
                }
                TokenKind::VDots => {
                    self.advance();
                    stmts.push(RawStmt::VDots);
                }
                TokenKind::Comma => {
                    self.advance();
                }
                other => {
                    let shown = other.to_string();
                    self.report(format!("ignored unexpected token `{}`", shown));
                    self.advance();
                }
            }
        }
        ParseOutput {
            format: RawFormat { stmts },
            diagnostics: self.diagnostics,
        }
    }

    /// Parse an item starting at an identifier token.
    ///
    /// Each `_` adds one index dimension: either a bracketed
    /// comma-separated list (an empty `{}` adds none) or exactly one
    /// bare expression. In the bare position identifier atoms stay
    /// plain references, so `A_i_j` is a two-index item; inside
    /// brackets items nest fully, so `a_{b_i}` works.
    fn parse_item(&mut self) -> ItemRef {
        let name = match self.advance() {
            TokenKind::Ident(name) => name,
            _ => PLACEHOLDER_NAME.to_string(),
        };
        let mut indices = Vec::new();

        while self.peek() == &TokenKind::Subscript {
            self.advance();
            if self.peek() == &TokenKind::LParen {
                self.advance();
                self.parse_index_list(&mut indices);
            } else {
                indices.push(self.parse_expr(false));
            }
        }

        ItemRef::new(name, indices)
    }

    fn parse_index_list(&mut self, indices: &mut Vec<Expr>) {
        if self.peek() == &TokenKind::RParen {
            // Explicitly empty index list
            self.advance();
            return;
        }
        indices.push(self.parse_expr(true));
        while self.peek() == &TokenKind::Comma {
            self.advance();
            indices.push(self.parse_expr(true));
        }
        if self.peek() == &TokenKind::RParen {
            self.advance();
        } else {
            self.report("unterminated index list");
        }
    }

    /// Additive expression: `+`/`-` bind below `*`/`/`
    fn parse_expr(&mut self, nested: bool) -> Expr {
        let mut left = self.parse_term(nested);
        loop {
            let op = match self.peek() {
                TokenKind::Op('+') => BinOpKind::Add,
                TokenKind::Op('-') => BinOpKind::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term(nested);
            left = Expr::bin(op, left, right);
        }
        left
    }

    fn parse_term(&mut self, nested: bool) -> Expr {
        let mut left = self.parse_atom(nested);
        loop {
            let op = match self.peek() {
                TokenKind::Op('*') => BinOpKind::Mul,
                TokenKind::Op('/') => BinOpKind::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_atom(nested);
            left = Expr::bin(op, left, right);
        }
        left
    }

    fn parse_atom(&mut self, nested: bool) -> Expr {
        match self.peek().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Expr::Num(n)
            }
            TokenKind::Ident(_) => {
                if nested {
                    Expr::Ref(self.parse_item())
                } else {
                    match self.advance() {
                        TokenKind::Ident(name) => Expr::Ref(ItemRef::scalar(name)),
                        _ => unreachable!("peeked an identifier"),
                    }
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr(true);
                if self.peek() == &TokenKind::RParen {
                    self.advance();
                } else {
                    self.report("unclosed parenthesis in expression");
                }
                inner
            }
            other => {
                // Do not consume: the statement loop recovers from it
                self.report(format!("unparseable expression atom at `{}`", other));
                Expr::Ref(ItemRef::scalar(PLACEHOLDER_NAME))
            }
        }
    }
}

/// Tokenize, filter spaces and parse in one step
pub fn parse_source(source: &str) -> crate::error::CompileResult<ParseOutput> {
    let tokens = crate::lexer::tokenize(source)?;
    Ok(Parser::new(tokens).parse_format())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(source: &str) -> ParseOutput {
        parse_source(source).unwrap()
    }

    fn items(out: &ParseOutput) -> Vec<&ItemRef> {
        out.format
            .stmts
            .iter()
            .filter_map(|s| match s {
                RawStmt::Item(item) => Some(item),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_two_scalars() {
        let out = parsed("N M");
        assert_eq!(
            out.format.stmts,
            vec![
                RawStmt::Item(ItemRef::scalar("N")),
                RawStmt::Item(ItemRef::scalar("M")),
            ]
        );
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_sequence_with_dots() {
        let out = parsed("a_1 a_2 ... a_N");
        assert_eq!(
            out.format.stmts,
            vec![
                RawStmt::Item(ItemRef::new("a", vec![Expr::num(1)])),
                RawStmt::Item(ItemRef::new("a", vec![Expr::num(2)])),
                RawStmt::Dots,
                RawStmt::Item(ItemRef::new("a", vec![Expr::var("N")])),
            ]
        );
    }

    #[test]
    fn test_consecutive_subscripts_accumulate() {
        let out = parsed("A_i_j");
        let its = items(&out);
        assert_eq!(its.len(), 1);
        assert_eq!(its[0].indices, vec![Expr::var("i"), Expr::var("j")]);
    }

    #[test]
    fn test_bracketed_index_list() {
        let out = parsed("A_{i,j}");
        let its = items(&out);
        assert_eq!(its[0].indices, vec![Expr::var("i"), Expr::var("j")]);
    }

    #[test]
    fn test_empty_brace_index_list() {
        let out = parsed("A_{}");
        let its = items(&out);
        assert!(its[0].indices.is_empty());
    }

    #[test]
    fn test_nested_subscripted_index() {
        let out = parsed("a_{b_i}");
        let its = items(&out);
        assert_eq!(
            its[0].indices,
            vec![Expr::Ref(ItemRef::new("b", vec![Expr::var("i")]))]
        );
    }

    #[test]
    fn test_arithmetic_index_precedence() {
        let out = parsed("a_{2*i+1}");
        let its = items(&out);
        assert_eq!(
            its[0].indices,
            vec![Expr::bin(
                BinOpKind::Add,
                Expr::bin(BinOpKind::Mul, Expr::num(2), Expr::var("i")),
                Expr::num(1),
            )]
        );
    }

    #[test]
    fn test_break_statements() {
        let out = parsed("N\nM");
        assert_eq!(
            out.format.stmts,
            vec![
                RawStmt::Item(ItemRef::scalar("N")),
                RawStmt::Break,
                RawStmt::Item(ItemRef::scalar("M")),
            ]
        );
    }

    #[test]
    fn test_statement_level_number_reported() {
        let out = parsed("1 u v");
        assert_eq!(
            items(&out)
                .iter()
                .map(|i| i.name.as_str())
                .collect::<Vec<_>>(),
            vec!["u", "v"]
        );
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn test_unparseable_atom_placeholder() {
        let out = parsed("a_*");
        let its = items(&out);
        assert_eq!(its[0].indices, vec![Expr::var(PLACEHOLDER_NAME)]);
        assert!(!out.diagnostics.is_empty());
    }

    #[test]
    fn test_mismatched_bracket_kind_accepted() {
        // Bracket kind is deliberately not checked against its opener
        let out = parsed("A_{i)");
        let its = items(&out);
        assert_eq!(its[0].indices, vec![Expr::var("i")]);
        assert!(out.diagnostics.is_empty());
    }
}
