//! Normalization of raw format trees
//!
//! Two ordered passes turn the parser's raw tree into the normalized
//! tree consumed by the matcher and the variable extractor:
//!
//! 1. Scalar flattening rewrites identifiers that are only ever used
//!    with a single literal index (`T_1`) into synthetic scalars
//!    (`T1`), unless the reference sits next to an ellipsis.
//! 2. Ellipsis collapse replaces `left … right` windows with a Loop
//!    node. The window comparison is a structural diff that also
//!    accepts already-built loops on both sides, so a second pass over
//!    its own output collapses vertical ellipses between row loops
//!    into one nested loop. A freshly built loop with a literal start
//!    is then extended backwards over explicitly written leading
//!    elements (`a_1 a_2 a_3 … a_n` spans the full range).
//!
//! Markers that no pass can convert are dropped, so the output
//! vocabulary contains only items and loops.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::ast::{Expr, Format, ItemRef, Loop, RawFormat, RawStmt, Stmt};

/// Ordered candidate symbols for loop induction variables. When all
/// are taken the first one is reused.
const LOOP_VAR_CANDIDATES: [&str; 5] = ["i", "j", "k", "l", "m"];

/// Position of an expression inside a statement, as child indices.
/// Items index into their index list; loops use 0 = start, 1 = end,
/// 2+k = body statement k; binary operators use 0 = left, 1 = right.
type Path = Vec<usize>;

/// Analyzer turning raw trees into normalized trees
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, raw: RawFormat) -> Format {
        let flattened = flatten_scalars(raw);
        let mut work: Vec<WorkStmt> = flattened
            .stmts
            .into_iter()
            .filter_map(|stmt| match stmt {
                RawStmt::Item(item) => Some(WorkStmt::Stmt(Stmt::Item(item))),
                RawStmt::Dots => Some(WorkStmt::Dots),
                RawStmt::VDots => Some(WorkStmt::VDots),
                RawStmt::Break => None,
            })
            .collect();

        while work.iter().any(WorkStmt::is_marker) {
            let (next, progress) = collapse_pass(&work);
            work = next;
            if !progress {
                break;
            }
        }

        Format {
            stmts: work
                .into_iter()
                .filter_map(|w| match w {
                    WorkStmt::Stmt(stmt) => Some(stmt),
                    _ => None,
                })
                .collect(),
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Working statement form: normalized statements with the ellipsis
/// markers still pending collapse
#[derive(Debug, Clone, PartialEq)]
enum WorkStmt {
    Stmt(Stmt),
    Dots,
    VDots,
}

impl WorkStmt {
    fn is_marker(&self) -> bool {
        !matches!(self, WorkStmt::Stmt(_))
    }
}

// ---------------------------------------------------------------------------
// Scalar flattening

fn visit_item(item: &ItemRef, f: &mut impl FnMut(&ItemRef)) {
    f(item);
    for index in &item.indices {
        visit_expr(index, f);
    }
}

fn visit_expr(expr: &Expr, f: &mut impl FnMut(&ItemRef)) {
    match expr {
        Expr::Num(_) => {}
        Expr::Ref(item) => visit_item(item, f),
        Expr::Bin { left, right, .. } => {
            visit_expr(left, f);
            visit_expr(right, f);
        }
    }
}

fn flatten_scalars(format: RawFormat) -> RawFormat {
    // An identifier qualifies when every reference carries exactly one
    // literal index.
    let mut eligible: HashMap<String, bool> = HashMap::new();
    for stmt in &format.stmts {
        if let RawStmt::Item(item) = stmt {
            visit_item(item, &mut |it: &ItemRef| {
                let single_literal =
                    it.indices.len() == 1 && matches!(it.indices[0], Expr::Num(_));
                eligible
                    .entry(it.name.clone())
                    .and_modify(|ok| *ok &= single_literal)
                    .or_insert(single_literal);
            });
        }
    }

    // References adjacent to an ellipsis (ignoring Breaks) belong to a
    // repetition pattern and must stay indexed.
    let stripped: Vec<&RawStmt> = format
        .stmts
        .iter()
        .filter(|s| !matches!(s, RawStmt::Break))
        .collect();
    let mut disqualified: HashSet<String> = HashSet::new();
    for (pos, stmt) in stripped.iter().enumerate() {
        if let RawStmt::Item(item) = stmt {
            let next_to_marker = [pos.checked_sub(1), pos.checked_add(1)]
                .into_iter()
                .flatten()
                .any(|n| matches!(stripped.get(n), Some(RawStmt::Dots | RawStmt::VDots)));
            if next_to_marker {
                let mut names = BTreeSet::new();
                item.collect_idents(&mut names);
                disqualified.extend(names);
            }
        }
    }

    let flatten: HashSet<String> = eligible
        .into_iter()
        .filter(|(name, ok)| *ok && !disqualified.contains(name))
        .map(|(name, _)| name)
        .collect();
    if flatten.is_empty() {
        return format;
    }

    let stmts = format
        .stmts
        .into_iter()
        .map(|stmt| match stmt {
            RawStmt::Item(item) => RawStmt::Item(flatten_item(item, &flatten)),
            other => other,
        })
        .collect();
    RawFormat { stmts }
}

fn flatten_item(item: ItemRef, flatten: &HashSet<String>) -> ItemRef {
    let indices: Vec<Expr> = item
        .indices
        .into_iter()
        .map(|idx| flatten_expr(idx, flatten))
        .collect();
    if flatten.contains(&item.name) {
        if let [Expr::Num(k)] = indices.as_slice() {
            return ItemRef::scalar(format!("{}{}", item.name, k));
        }
    }
    ItemRef::new(item.name, indices)
}

fn flatten_expr(expr: Expr, flatten: &HashSet<String>) -> Expr {
    match expr {
        Expr::Num(n) => Expr::Num(n),
        Expr::Ref(item) => Expr::Ref(flatten_item(item, flatten)),
        Expr::Bin { op, left, right } => Expr::Bin {
            op,
            left: Box::new(flatten_expr(*left, flatten)),
            right: Box::new(flatten_expr(*right, flatten)),
        },
    }
}

// ---------------------------------------------------------------------------
// Ellipsis collapse

/// One left-to-right scan over the statement list. Returns the new
/// list and whether any marker was converted.
fn collapse_pass(stmts: &[WorkStmt]) -> (Vec<WorkStmt>, bool) {
    let mut out: Vec<WorkStmt> = Vec::new();
    let mut progress = false;
    let mut pos = 0;

    while pos < stmts.len() {
        match &stmts[pos] {
            WorkStmt::Stmt(stmt) => {
                out.push(WorkStmt::Stmt(stmt.clone()));
                pos += 1;
            }
            marker => {
                let left_max = out
                    .iter()
                    .rev()
                    .take_while(|w| !w.is_marker())
                    .count();
                let right_run: Vec<Stmt> = stmts[pos + 1..]
                    .iter()
                    .map_while(|w| match w {
                        WorkStmt::Stmt(stmt) => Some(stmt.clone()),
                        _ => None,
                    })
                    .collect();

                let mut built = None;
                for k in 1..=left_max.min(right_run.len()) {
                    let left: Vec<Stmt> = out[out.len() - k..]
                        .iter()
                        .map(|w| match w {
                            WorkStmt::Stmt(stmt) => stmt.clone(),
                            _ => unreachable!("left window checked marker-free"),
                        })
                        .collect();
                    if let Some(lp) = try_build_loop(&left, &right_run[..k]) {
                        built = Some((k, lp));
                        break;
                    }
                }

                match built {
                    Some((k, mut lp)) => {
                        out.truncate(out.len() - k);
                        extend_backward(&mut out, &mut lp);
                        out.push(WorkStmt::Stmt(Stmt::Loop(lp)));
                        pos += 1 + k;
                        progress = true;
                    }
                    None => {
                        out.push(marker.clone());
                        pos += 1;
                    }
                }
            }
        }
    }

    (out, progress)
}

/// Match a `left … right` window of size K into a Loop node.
fn try_build_loop(left: &[Stmt], right: &[Stmt]) -> Option<Loop> {
    let first = stmt_diff(&left[0], &right[0])?;
    if first.len() != 1 {
        return None;
    }
    let path = first[0].clone();

    // Pairs beyond the first may only vary at the same position.
    let mut varies = vec![true];
    for idx in 1..left.len() {
        let diffs = stmt_diff(&left[idx], &right[idx])?;
        if !diffs.iter().all(|p| *p == path) {
            return None;
        }
        varies.push(!diffs.is_empty());
    }

    let start = expr_at(&left[0], &path)?.clone();
    let end = expr_at(&right[0], &path)?.clone();

    let mut used = BTreeSet::new();
    start.collect_idents(&mut used);
    end.collect_idents(&mut used);
    for stmt in left.iter().chain(right.iter()) {
        stmt.collect_idents(&mut used);
    }
    let var = choose_loop_var(&used);

    let body = left
        .iter()
        .zip(&varies)
        .map(|(stmt, &varies_here)| {
            if varies_here {
                replace_at(stmt, &path, Expr::var(var.clone()))
            } else {
                stmt.clone()
            }
        })
        .collect();

    Some(Loop {
        var,
        start,
        end,
        body,
    })
}

fn choose_loop_var(used: &BTreeSet<String>) -> String {
    LOOP_VAR_CANDIDATES
        .iter()
        .find(|c| !used.contains(**c))
        .unwrap_or(&LOOP_VAR_CANDIDATES[0])
        .to_string()
}

/// Absorb explicitly written leading elements into the loop while its
/// literal start has a matching predecessor window.
fn extend_backward(out: &mut Vec<WorkStmt>, lp: &mut Loop) {
    loop {
        let start = match &lp.start {
            Expr::Num(n) => *n,
            _ => break,
        };
        let k = lp.body.len();
        if out.len() < k {
            break;
        }
        let expected: Vec<Stmt> = lp
            .body
            .iter()
            .map(|stmt| substitute_stmt(stmt, &lp.var, start - 1))
            .collect();
        let tail_matches = out[out.len() - k..]
            .iter()
            .zip(&expected)
            .all(|(w, e)| matches!(w, WorkStmt::Stmt(stmt) if stmt == e));
        if !tail_matches {
            break;
        }
        out.truncate(out.len() - k);
        lp.start = Expr::Num(start - 1);
    }
}

// ---------------------------------------------------------------------------
// Structural diff and tree surgery

fn stmt_diff(a: &Stmt, b: &Stmt) -> Option<Vec<Path>> {
    let mut paths = Vec::new();
    let mut prefix = Vec::new();
    stmt_diff_into(a, b, &mut prefix, &mut paths)?;
    Some(paths)
}

/// Collect the expression positions where two comparable statements
/// differ; `None` when the statements are not comparable at all
/// (different kinds, names, arities or loop shapes).
fn stmt_diff_into(
    a: &Stmt,
    b: &Stmt,
    prefix: &mut Path,
    out: &mut Vec<Path>,
) -> Option<()> {
    match (a, b) {
        (Stmt::Item(x), Stmt::Item(y)) => {
            if x.name != y.name || x.indices.len() != y.indices.len() {
                return None;
            }
            for (c, (ix, iy)) in x.indices.iter().zip(&y.indices).enumerate() {
                prefix.push(c);
                expr_diff_into(ix, iy, prefix, out);
                prefix.pop();
            }
            Some(())
        }
        (Stmt::Loop(x), Stmt::Loop(y)) => {
            if x.var != y.var || x.body.len() != y.body.len() {
                return None;
            }
            prefix.push(0);
            expr_diff_into(&x.start, &y.start, prefix, out);
            prefix.pop();
            prefix.push(1);
            expr_diff_into(&x.end, &y.end, prefix, out);
            prefix.pop();
            for (c, (bx, by)) in x.body.iter().zip(&y.body).enumerate() {
                prefix.push(2 + c);
                stmt_diff_into(bx, by, prefix, out)?;
                prefix.pop();
            }
            Some(())
        }
        _ => None,
    }
}

fn expr_diff_into(a: &Expr, b: &Expr, prefix: &mut Path, out: &mut Vec<Path>) {
    match (a, b) {
        (Expr::Ref(x), Expr::Ref(y))
            if x.name == y.name && x.indices.len() == y.indices.len() =>
        {
            for (c, (ix, iy)) in x.indices.iter().zip(&y.indices).enumerate() {
                prefix.push(c);
                expr_diff_into(ix, iy, prefix, out);
                prefix.pop();
            }
        }
        (
            Expr::Bin {
                op: op_a,
                left: la,
                right: ra,
            },
            Expr::Bin {
                op: op_b,
                left: lb,
                right: rb,
            },
        ) if op_a == op_b => {
            prefix.push(0);
            expr_diff_into(la, lb, prefix, out);
            prefix.pop();
            prefix.push(1);
            expr_diff_into(ra, rb, prefix, out);
            prefix.pop();
        }
        _ => {
            if a != b {
                out.push(prefix.clone());
            }
        }
    }
}

fn expr_at<'a>(stmt: &'a Stmt, path: &[usize]) -> Option<&'a Expr> {
    let (&head, rest) = path.split_first()?;
    match stmt {
        Stmt::Item(item) => expr_child(item.indices.get(head)?, rest),
        Stmt::Loop(lp) => match head {
            0 => expr_child(&lp.start, rest),
            1 => expr_child(&lp.end, rest),
            c => expr_at(lp.body.get(c - 2)?, rest),
        },
    }
}

fn expr_child<'a>(expr: &'a Expr, path: &[usize]) -> Option<&'a Expr> {
    let Some((&head, rest)) = path.split_first() else {
        return Some(expr);
    };
    match expr {
        Expr::Num(_) => None,
        Expr::Ref(item) => expr_child(item.indices.get(head)?, rest),
        Expr::Bin { left, right, .. } => match head {
            0 => expr_child(left, rest),
            1 => expr_child(right, rest),
            _ => None,
        },
    }
}

fn replace_at(stmt: &Stmt, path: &[usize], new: Expr) -> Stmt {
    let Some((&head, rest)) = path.split_first() else {
        return stmt.clone();
    };
    match stmt {
        Stmt::Item(item) => {
            let mut item = item.clone();
            if let Some(slot) = item.indices.get_mut(head) {
                *slot = replace_in_expr(slot, rest, new);
            }
            Stmt::Item(item)
        }
        Stmt::Loop(lp) => {
            let mut lp = lp.clone();
            match head {
                0 => lp.start = replace_in_expr(&lp.start, rest, new),
                1 => lp.end = replace_in_expr(&lp.end, rest, new),
                c => {
                    if let Some(slot) = lp.body.get_mut(c - 2) {
                        *slot = replace_at(slot, rest, new);
                    }
                }
            }
            Stmt::Loop(lp)
        }
    }
}

fn replace_in_expr(expr: &Expr, path: &[usize], new: Expr) -> Expr {
    let Some((&head, rest)) = path.split_first() else {
        return new;
    };
    match expr {
        Expr::Num(n) => Expr::Num(*n),
        Expr::Ref(item) => {
            let mut item = item.clone();
            if let Some(slot) = item.indices.get_mut(head) {
                *slot = replace_in_expr(slot, rest, new);
            }
            Expr::Ref(item)
        }
        Expr::Bin { op, left, right } => {
            let (mut left, mut right) = (left.clone(), right.clone());
            match head {
                0 => left = Box::new(replace_in_expr(&left, rest, new)),
                1 => right = Box::new(replace_in_expr(&right, rest, new)),
                _ => {}
            }
            Expr::Bin {
                op: *op,
                left,
                right,
            }
        }
    }
}

fn substitute_stmt(stmt: &Stmt, var: &str, value: i64) -> Stmt {
    match stmt {
        Stmt::Item(item) => Stmt::Item(substitute_item(item, var, value)),
        Stmt::Loop(lp) => Stmt::Loop(Loop {
            var: lp.var.clone(),
            start: substitute_expr(&lp.start, var, value),
            end: substitute_expr(&lp.end, var, value),
            body: lp
                .body
                .iter()
                .map(|s| substitute_stmt(s, var, value))
                .collect(),
        }),
    }
}

fn substitute_item(item: &ItemRef, var: &str, value: i64) -> ItemRef {
    ItemRef::new(
        item.name.clone(),
        item.indices
            .iter()
            .map(|idx| substitute_expr(idx, var, value))
            .collect(),
    )
}

fn substitute_expr(expr: &Expr, var: &str, value: i64) -> Expr {
    match expr {
        Expr::Num(n) => Expr::Num(*n),
        Expr::Ref(item) if item.name == var && item.indices.is_empty() => Expr::Num(value),
        Expr::Ref(item) => Expr::Ref(substitute_item(item, var, value)),
        Expr::Bin { op, left, right } => Expr::Bin {
            op: *op,
            left: Box::new(substitute_expr(left, var, value)),
            right: Box::new(substitute_expr(right, var, value)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use pretty_assertions::assert_eq;

    fn normalized(source: &str) -> Format {
        let out = parse_source(source).unwrap();
        Analyzer::new().normalize(out.format)
    }

    fn item(name: &str, indices: Vec<Expr>) -> Stmt {
        Stmt::Item(ItemRef::new(name, indices))
    }

    #[test]
    fn test_sequence_collapses_to_full_loop() {
        // Extension must reach back to the first written element
        let format = normalized("N\na_1 a_2 a_3 ... a_N");
        assert_eq!(
            format.stmts,
            vec![
                item("N", vec![]),
                Stmt::Loop(Loop {
                    var: "i".to_string(),
                    start: Expr::num(1),
                    end: Expr::var("N"),
                    body: vec![item("a", vec![Expr::var("i")])],
                }),
            ]
        );
    }

    #[test]
    fn test_loop_var_avoids_used_identifiers() {
        // `i` appears in the start bound, so the loop variable is `j`
        let format = normalized("A_i ... A_N");
        assert_eq!(
            format.stmts,
            vec![Stmt::Loop(Loop {
                var: "j".to_string(),
                start: Expr::var("i"),
                end: Expr::var("N"),
                body: vec![item("A", vec![Expr::var("j")])],
            })]
        );
    }

    #[test]
    fn test_interleaved_window() {
        let format = normalized("x_1 y_1 x_2 y_2 ... x_N y_N");
        assert_eq!(
            format.stmts,
            vec![Stmt::Loop(Loop {
                var: "i".to_string(),
                start: Expr::num(1),
                end: Expr::var("N"),
                body: vec![
                    item("x", vec![Expr::var("i")]),
                    item("y", vec![Expr::var("i")]),
                ],
            })]
        );
    }

    #[test]
    fn test_vertical_ellipsis_builds_nested_loop() {
        let format = normalized(
            "C_{1,1} ... C_{1,W}\nC_{2,1} ... C_{2,W}\n⋮\nC_{H,1} ... C_{H,W}",
        );
        let inner = Loop {
            var: "i".to_string(),
            start: Expr::num(1),
            end: Expr::var("W"),
            body: vec![item("C", vec![Expr::var("j"), Expr::var("i")])],
        };
        assert_eq!(
            format.stmts,
            vec![Stmt::Loop(Loop {
                var: "j".to_string(),
                start: Expr::num(1),
                end: Expr::var("H"),
                body: vec![Stmt::Loop(inner)],
            })]
        );
    }

    #[test]
    fn test_scalar_flattening() {
        let format = normalized("K_1 a_1 a_2 ... a_N");
        assert_eq!(format.stmts.len(), 2);
        assert_eq!(format.stmts[0], item("K1", vec![]));
        assert!(matches!(format.stmts[1], Stmt::Loop(_)));
    }

    #[test]
    fn test_unmatched_marker_dropped() {
        let format = normalized("... a_N");
        assert_eq!(format.stmts, vec![item("a", vec![Expr::var("N")])]);
    }

    #[test]
    fn test_normalization_idempotent() {
        let out = parse_source("N\na_1 a_2 ... a_N").unwrap();
        let once = Analyzer::new().normalize(out.format);
        let work: Vec<WorkStmt> = once.stmts.iter().cloned().map(WorkStmt::Stmt).collect();
        let (again, progress) = collapse_pass(&work);
        assert!(!progress);
        assert_eq!(again, work);
    }

    #[test]
    fn test_arithmetic_bound_preserved() {
        let format = normalized("b_0 b_1 ... b_{N-1}");
        assert_eq!(
            format.stmts,
            vec![Stmt::Loop(Loop {
                var: "i".to_string(),
                start: Expr::num(0),
                end: Expr::bin(crate::ast::BinOpKind::Sub, Expr::var("N"), Expr::num(1)),
                body: vec![item("b", vec![Expr::var("i")])],
            })]
        );
    }
}
