//! Per-variable type inference across sample instances
//!
//! Observed token values are classified by pattern, unified within one
//! sample instance and then across instances. When a sample does not
//! fit the tree at all, a loop-collapse rewrite (an indexed sequence
//! read becomes a single token read per iteration) is tried once
//! before the original error is surfaced.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Format, Loop, Stmt};
use crate::error::CompileResult;
use crate::matcher::{Matcher, VarValue};

/// Inferred value type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    Int,
    /// Integer that other variables' sizes or indices depend on
    IndexInt,
    Float,
    Char,
    Str,
    /// Reserved for the discriminated multi-part record case
    Query,
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VarType::Int => "int",
            VarType::IndexInt => "index-int",
            VarType::Float => "float",
            VarType::Char => "char",
            VarType::Str => "string",
            VarType::Query => "query",
        };
        write!(f, "{}", name)
    }
}

static INT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+$").expect("integer pattern"));
static FLOAT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?([0-9]+\.[0-9]*|\.[0-9]+)$").expect("float pattern"));

/// Classify one observed token. Total: anything unrecognized is Str.
pub fn classify(token: &str) -> VarType {
    if INT_PATTERN.is_match(token) {
        VarType::Int
    } else if FLOAT_PATTERN.is_match(token) {
        VarType::Float
    } else if token.chars().count() == 1 {
        VarType::Char
    } else {
        VarType::Str
    }
}

/// Unify two candidate types. Commutative and associative: the types
/// form a join semilattice with Str on top, Char and Query only
/// joining into Str, and IndexInt < Int < Float.
pub fn unify(a: VarType, b: VarType) -> VarType {
    use VarType::*;
    if a == b {
        return a;
    }
    match (a, b) {
        (Str, _) | (_, Str) => Str,
        (Char, _) | (_, Char) => Str,
        (IndexInt, Int) | (Int, IndexInt) => Int,
        (IndexInt, Float) | (Float, IndexInt) => Float,
        (Int, Float) | (Float, Int) => Float,
        _ => Str,
    }
}

/// Result of running inference over all sample instances
#[derive(Debug, Clone)]
pub struct InferenceResult {
    /// Per-variable unified type
    pub types: HashMap<String, VarType>,
    /// Variables rewritten by the loop-collapse fallback
    pub collapsed: BTreeSet<String>,
    /// The tree the samples finally matched against (the input tree,
    /// or its collapsed rewrite when the fallback was needed)
    pub matched: Format,
}

/// Infer per-variable types for one normalized tree over its samples.
pub fn infer_types(format: &Format, samples: &[String]) -> CompileResult<InferenceResult> {
    match observe(format, samples) {
        Ok(observed) => Ok(finish(format, format.clone(), observed, BTreeSet::new())),
        Err(original) if original.is_match_error() => {
            let (rewritten, collapsed) = collapse_sequences(format);
            if collapsed.is_empty() {
                return Err(original);
            }
            match observe(&rewritten, samples) {
                Ok(observed) => Ok(finish(format, rewritten, observed, collapsed)),
                // The retry failing means the rewrite was not the
                // problem; report what went wrong the first time.
                Err(_) => Err(original),
            }
        }
        Err(other) => Err(other),
    }
}

fn observe(
    format: &Format,
    samples: &[String],
) -> CompileResult<HashMap<String, VarType>> {
    let matcher = Matcher::new(format);
    let mut types: HashMap<String, VarType> = HashMap::new();
    for sample in samples {
        let env = matcher.run(sample)?;
        for (name, value) in env {
            let observed = match value {
                VarValue::Scalar(token) => classify(&token),
                VarValue::Array(map) => map
                    .values()
                    .map(|token| classify(token))
                    .reduce(unify)
                    .unwrap_or(VarType::Str),
            };
            types
                .entry(name)
                .and_modify(|current| *current = unify(*current, observed))
                .or_insert(observed);
        }
    }
    Ok(types)
}

fn finish(
    original: &Format,
    matched: Format,
    observed: HashMap<String, VarType>,
    collapsed: BTreeSet<String>,
) -> InferenceResult {
    // A variable whose value other sizes or indices depend on must be
    // an integer; tag it so the generator can pick the index template.
    let bound_names = index_refs(&matched);
    let mut types = HashMap::new();
    for name in read_names(original) {
        let inferred = match observed.get(&name) {
            Some(&VarType::Int) if bound_names.contains(&name) => VarType::IndexInt,
            Some(&t) => t,
            // Never observed (every sample had an empty range)
            None if bound_names.contains(&name) => VarType::IndexInt,
            None => VarType::Str,
        };
        types.insert(name, inferred);
    }
    InferenceResult {
        types,
        collapsed,
        matched,
    }
}

/// Names read at statement level, in first-occurrence order
fn read_names(format: &Format) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    fn walk(stmts: &[Stmt], seen: &mut HashSet<String>, order: &mut Vec<String>) {
        for stmt in stmts {
            match stmt {
                Stmt::Item(item) => {
                    if seen.insert(item.name.clone()) {
                        order.push(item.name.clone());
                    }
                }
                Stmt::Loop(lp) => walk(&lp.body, seen, order),
            }
        }
    }
    walk(&format.stmts, &mut seen, &mut order);
    order
}

/// Names referenced inside any index or bound expression
fn index_refs(format: &Format) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    fn walk(stmts: &[Stmt], names: &mut BTreeSet<String>) {
        for stmt in stmts {
            match stmt {
                Stmt::Item(item) => {
                    for index in &item.indices {
                        index.collect_idents(names);
                    }
                }
                Stmt::Loop(lp) => {
                    lp.start.collect_idents(names);
                    lp.end.collect_idents(names);
                    walk(&lp.body, names);
                }
            }
        }
    }
    walk(&format.stmts, &mut names);
    names
}

/// Rewrite loops whose whole body is one item indexed by the loop
/// variable in exactly one position into a single per-iteration token
/// read. Applied top-down, one level only, so a collapsed inner loop
/// does not make its parent collapsible in the same pass.
pub fn collapse_sequences(format: &Format) -> (Format, BTreeSet<String>) {
    let mut collapsed = BTreeSet::new();
    let stmts = format
        .stmts
        .iter()
        .map(|stmt| collapse_stmt(stmt, &mut collapsed))
        .collect();
    (Format { stmts }, collapsed)
}

fn collapse_stmt(stmt: &Stmt, collapsed: &mut BTreeSet<String>) -> Stmt {
    match stmt {
        Stmt::Item(_) => stmt.clone(),
        Stmt::Loop(lp) => {
            if let [Stmt::Item(item)] = lp.body.as_slice() {
                let positions: Vec<usize> = item
                    .indices
                    .iter()
                    .enumerate()
                    .filter(|(_, index)| index.is_plain_ref(&lp.var))
                    .map(|(pos, _)| pos)
                    .collect();
                if let [pos] = positions.as_slice() {
                    let mut item = item.clone();
                    item.indices.remove(*pos);
                    collapsed.insert(item.name.clone());
                    return Stmt::Item(item);
                }
            }
            Stmt::Loop(Loop {
                var: lp.var.clone(),
                start: lp.start.clone(),
                end: lp.end.clone(),
                body: lp
                    .body
                    .iter()
                    .map(|inner| collapse_stmt(inner, collapsed))
                    .collect(),
            })
        }
    }
}
