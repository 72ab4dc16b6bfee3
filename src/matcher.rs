//! Binding normalized trees against concrete sample text
//!
//! The matcher walks a normalized tree and consumes whitespace-split
//! tokens of one sample in exactly the order the tree demands,
//! producing a name → value environment. Index and bound expressions
//! are evaluated with integer semantics over the merged environment
//! (global scalars plus active loop-induction bindings).

use std::collections::HashMap;

use crate::ast::{Expr, Format, ItemRef, Loop, Stmt};
use crate::error::{CompileError, CompileResult};

/// A matched variable: one token, or a map from comma-joined evaluated
/// index tuples to tokens
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    Scalar(String),
    Array(HashMap<String, String>),
}

impl VarValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            VarValue::Scalar(s) => Some(s),
            VarValue::Array(_) => None,
        }
    }
}

/// Environment produced by one match run
pub type Environment = HashMap<String, VarValue>;

/// Evaluate an index or bound expression.
///
/// `Ref`s resolve through the loop bindings first, then the global
/// environment; a reference that is missing, indexed, or bound to a
/// non-integer token is a match error. Division truncates toward
/// negative infinity.
pub fn evaluate(
    expr: &Expr,
    env: &Environment,
    scopes: &[(String, i64)],
) -> CompileResult<i64> {
    match expr {
        Expr::Num(n) => Ok(*n),
        Expr::Ref(item) => {
            if !item.indices.is_empty() {
                return Err(CompileError::match_error(format!(
                    "indexed reference `{}` cannot be used as a scalar",
                    item
                )));
            }
            if let Some((_, value)) = scopes.iter().rev().find(|(name, _)| name == &item.name) {
                return Ok(*value);
            }
            match env.get(&item.name) {
                Some(VarValue::Scalar(token)) => token.parse::<i64>().map_err(|_| {
                    CompileError::match_error(format!(
                        "variable `{}` holds non-integer value {:?}",
                        item.name, token
                    ))
                }),
                Some(VarValue::Array(_)) => Err(CompileError::match_error(format!(
                    "variable `{}` resolves to a sequence, not a scalar",
                    item.name
                ))),
                None => Err(CompileError::match_error(format!(
                    "unresolved variable `{}` in expression",
                    item.name
                ))),
            }
        }
        Expr::Bin { op, left, right } => {
            let lhs = evaluate(left, env, scopes)?;
            let rhs = evaluate(right, env, scopes)?;
            match op {
                crate::ast::BinOpKind::Add => Ok(lhs + rhs),
                crate::ast::BinOpKind::Sub => Ok(lhs - rhs),
                crate::ast::BinOpKind::Mul => Ok(lhs * rhs),
                crate::ast::BinOpKind::Div => floor_div(lhs, rhs),
            }
        }
    }
}

fn floor_div(lhs: i64, rhs: i64) -> CompileResult<i64> {
    if rhs == 0 {
        return Err(CompileError::match_error(
            "division by zero in index expression",
        ));
    }
    let quotient = lhs / rhs;
    let remainder = lhs % rhs;
    if remainder != 0 && (remainder < 0) != (rhs < 0) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

/// Matcher binding one normalized tree against sample text
pub struct Matcher<'f> {
    format: &'f Format,
}

impl<'f> Matcher<'f> {
    pub fn new(format: &'f Format) -> Self {
        Self { format }
    }

    /// Match one sample, consuming its whitespace-split tokens in tree
    /// order. Requesting a token past the end is a match error;
    /// trailing unconsumed tokens are tolerated (repeated-test-case
    /// samples carry further cases after the first).
    pub fn run(&self, sample: &str) -> CompileResult<Environment> {
        self.run_counted(sample).map(|(env, _)| env)
    }

    /// Like [`run`](Self::run), also reporting how many tokens the
    /// tree consumed.
    pub fn run_counted(&self, sample: &str) -> CompileResult<(Environment, usize)> {
        let tokens: Vec<&str> = sample.split_whitespace().collect();
        let mut state = MatchState {
            tokens,
            pos: 0,
            env: Environment::new(),
            scopes: Vec::new(),
        };
        for stmt in &self.format.stmts {
            state.run_stmt(stmt)?;
        }
        Ok((state.env, state.pos))
    }
}

struct MatchState<'s> {
    tokens: Vec<&'s str>,
    pos: usize,
    env: Environment,
    scopes: Vec<(String, i64)>,
}

impl<'s> MatchState<'s> {
    fn run_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::Item(item) => self.read_item(item),
            Stmt::Loop(lp) => self.run_loop(lp),
        }
    }

    fn run_loop(&mut self, lp: &Loop) -> CompileResult<()> {
        let start = evaluate(&lp.start, &self.env, &self.scopes)?;
        let end = evaluate(&lp.end, &self.env, &self.scopes)?;
        // end < start is an empty range, not an error
        for value in start..=end {
            self.scopes.push((lp.var.clone(), value));
            for stmt in &lp.body {
                let result = self.run_stmt(stmt);
                if result.is_err() {
                    self.scopes.pop();
                    return result;
                }
            }
            self.scopes.pop();
        }
        Ok(())
    }

    fn read_item(&mut self, item: &ItemRef) -> CompileResult<()> {
        let mut key_parts = Vec::with_capacity(item.indices.len());
        for index in &item.indices {
            key_parts.push(evaluate(index, &self.env, &self.scopes)?.to_string());
        }

        let token = match self.tokens.get(self.pos) {
            Some(token) => *token,
            None => {
                return Err(CompileError::match_error(format!(
                    "sample exhausted while reading `{}`",
                    item
                )));
            }
        };
        self.pos += 1;

        if key_parts.is_empty() {
            self.env
                .insert(item.name.clone(), VarValue::Scalar(token.to_string()));
        } else {
            let key = key_parts.join(",");
            match self
                .env
                .entry(item.name.clone())
                .or_insert_with(|| VarValue::Array(HashMap::new()))
            {
                VarValue::Array(map) => {
                    map.insert(key, token.to_string());
                }
                VarValue::Scalar(_) => {
                    return Err(CompileError::match_error(format!(
                        "variable `{}` used both as scalar and sequence",
                        item.name
                    )));
                }
            }
        }
        Ok(())
    }
}
