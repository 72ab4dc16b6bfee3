//! Syntax tree definitions for input-format descriptions
//!
//! Two statement vocabularies share the expression grammar: the raw
//! tree produced by the parser still contains ellipsis markers and line
//! breaks, the normalized tree produced by the analyzer contains only
//! items and loops. Keeping them as separate sum types makes the
//! analyzer a total function from one vocabulary to the other.

use std::collections::BTreeSet;
use std::fmt;

/// Arithmetic operators allowed in index and bound expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOpKind {
    pub fn symbol(self) -> char {
        match self {
            BinOpKind::Add => '+',
            BinOpKind::Sub => '-',
            BinOpKind::Mul => '*',
            BinOpKind::Div => '/',
        }
    }
}

/// An index or bound expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Integer literal
    Num(i64),
    /// Reference to a variable, possibly itself indexed
    Ref(ItemRef),
    /// Binary arithmetic over two sub-expressions
    Bin {
        op: BinOpKind,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn num(value: i64) -> Self {
        Expr::Num(value)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Ref(ItemRef::scalar(name))
    }

    pub fn bin(op: BinOpKind, left: Expr, right: Expr) -> Self {
        Expr::Bin {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Collect every identifier appearing in the expression
    pub fn collect_idents(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Num(_) => {}
            Expr::Ref(item) => item.collect_idents(out),
            Expr::Bin { left, right, .. } => {
                left.collect_idents(out);
                right.collect_idents(out);
            }
        }
    }

    /// A bare, index-free reference to `name`?
    pub fn is_plain_ref(&self, name: &str) -> bool {
        matches!(self, Expr::Ref(item) if item.name == name && item.indices.is_empty())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(n) => write!(f, "{}", n),
            Expr::Ref(item) => write!(f, "{}", item),
            Expr::Bin { op, left, right } => {
                write!(f, "({}{}{})", left, op.symbol(), right)
            }
        }
    }
}

/// A named, possibly indexed variable reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub name: String,
    pub indices: Vec<Expr>,
}

impl ItemRef {
    pub fn new(name: impl Into<String>, indices: Vec<Expr>) -> Self {
        Self {
            name: name.into(),
            indices,
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn collect_idents(&self, out: &mut BTreeSet<String>) {
        out.insert(self.name.clone());
        for index in &self.indices {
            index.collect_idents(out);
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for index in &self.indices {
            write!(f, "_{}", index)?;
        }
        Ok(())
    }
}

/// Statement in the raw tree, straight out of the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawStmt {
    Item(ItemRef),
    /// Horizontal ellipsis marker
    Dots,
    /// Vertical ellipsis marker
    VDots,
    /// Statement-level line separator
    Break,
}

/// The raw top-level statement list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawFormat {
    pub stmts: Vec<RawStmt>,
}

/// Statement in the normalized tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Item(ItemRef),
    Loop(Loop),
}

impl Stmt {
    pub fn collect_idents(&self, out: &mut BTreeSet<String>) {
        match self {
            Stmt::Item(item) => item.collect_idents(out),
            Stmt::Loop(lp) => {
                out.insert(lp.var.clone());
                lp.start.collect_idents(out);
                lp.end.collect_idents(out);
                for stmt in &lp.body {
                    stmt.collect_idents(out);
                }
            }
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Item(item) => write!(f, "{}", item),
            Stmt::Loop(lp) => write!(f, "{}", lp),
        }
    }
}

/// A repeated sequence of statements over an inclusive range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loop {
    /// Induction variable, guaranteed not to collide with identifiers
    /// in scope at construction time
    pub var: String,
    pub start: Expr,
    pub end: Expr,
    pub body: Vec<Stmt>,
}

impl fmt::Display for Loop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "for {} in {}..{} {{", self.var, self.start, self.end)?;
        for (i, stmt) in self.body.iter().enumerate() {
            if i > 0 {
                write!(f, ";")?;
            }
            write!(f, " {}", stmt)?;
        }
        write!(f, " }}")
    }
}

/// The normalized top-level statement list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    pub stmts: Vec<Stmt>,
}

impl Format {
    /// All identifiers appearing anywhere in the tree
    pub fn idents(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for stmt in &self.stmts {
            stmt.collect_idents(&mut out);
        }
        out
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stmt) in self.stmts.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_item() {
        let item = ItemRef::new(
            "a",
            vec![Expr::bin(BinOpKind::Sub, Expr::var("n"), Expr::num(1))],
        );
        assert_eq!(item.to_string(), "a_(n-1)");
    }

    #[test]
    fn test_collect_idents() {
        let lp = Loop {
            var: "i".to_string(),
            start: Expr::num(1),
            end: Expr::var("N"),
            body: vec![Stmt::Item(ItemRef::new("a", vec![Expr::var("i")]))],
        };
        let mut out = BTreeSet::new();
        Stmt::Loop(lp).collect_idents(&mut out);
        let names: Vec<_> = out.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["N", "a", "i"]);
    }

    #[test]
    fn test_plain_ref() {
        assert!(Expr::var("i").is_plain_ref("i"));
        assert!(!Expr::var("i").is_plain_ref("j"));
        assert!(!Expr::Ref(ItemRef::new("i", vec![Expr::num(0)])).is_plain_ref("i"));
    }
}
