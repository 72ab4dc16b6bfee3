//! Variable descriptor extraction from normalized trees
//!
//! Walks the tree with the enclosing-loop stack and derives, for each
//! variable read at statement level, its dimensionality and one size
//! expression per dimension. An index that is a bare reference to an
//! enclosing loop's induction variable resolves to that loop's end
//! bound; anything else is kept verbatim.

use std::collections::{BTreeSet, HashMap};

use crate::ast::{Expr, Format, Loop, Stmt};
use crate::typing::VarType;

/// Descriptor of one variable the generated code must read
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub var_type: VarType,
    /// One size expression per dimension; empty for scalars
    pub dims: Vec<Expr>,
}

impl Variable {
    pub fn dimensionality(&self) -> usize {
        self.dims.len()
    }
}

/// Extract descriptors from the pre-collapse normalized tree.
///
/// `collapsed` names variables rewritten by the type inferencer's
/// loop-collapse fallback; each loses its trailing dimension here to
/// stay consistent with the tree the samples actually matched.
pub fn extract_variables(
    format: &Format,
    types: &HashMap<String, VarType>,
    collapsed: &BTreeSet<String>,
) -> Vec<Variable> {
    let mut walker = Walker::default();
    walker.walk(&format.stmts, &mut Vec::new());

    let mut variables = Vec::with_capacity(walker.order.len());
    for name in walker.order {
        let mut dims = walker.dims.remove(&name).unwrap_or_default();
        let depth = walker.depth.get(&name).copied().unwrap_or(0);
        let var_type = types.get(&name).copied().unwrap_or(VarType::Str);

        if collapsed.contains(&name) {
            dims.pop();
        }
        // Extra trailing indices on a string are character accesses,
        // not dimensions the reader has to allocate.
        if var_type == VarType::Str && dims.len() > depth {
            dims.truncate(depth);
        }

        variables.push(Variable {
            name,
            var_type,
            dims,
        });
    }
    variables
}

#[derive(Default)]
struct Walker {
    order: Vec<String>,
    dims: HashMap<String, Vec<Expr>>,
    depth: HashMap<String, usize>,
}

impl Walker {
    fn walk<'f>(&mut self, stmts: &'f [Stmt], stack: &mut Vec<&'f Loop>) {
        for stmt in stmts {
            match stmt {
                Stmt::Item(item) => {
                    let resolved: Vec<Expr> = item
                        .indices
                        .iter()
                        .map(|index| resolve_size(index, stack))
                        .collect();
                    match self.dims.get_mut(&item.name) {
                        None => {
                            self.order.push(item.name.clone());
                            self.dims.insert(item.name.clone(), resolved);
                        }
                        Some(existing) => {
                            // The widest usage defines dimensionality
                            if resolved.len() > existing.len() {
                                *existing = resolved;
                            }
                        }
                    }
                    let depth = self.depth.entry(item.name.clone()).or_insert(0);
                    *depth = (*depth).max(stack.len());
                }
                Stmt::Loop(lp) => {
                    stack.push(lp);
                    self.walk(&lp.body, stack);
                    stack.pop();
                }
            }
        }
    }
}

fn resolve_size(index: &Expr, stack: &[&Loop]) -> Expr {
    for lp in stack.iter().rev() {
        if index.is_plain_ref(&lp.var) {
            return lp.end.clone();
        }
    }
    index.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::ast::BinOpKind;
    use crate::parser::parse_source;
    use crate::typing::infer_types;

    fn normalized(source: &str) -> Format {
        let out = parse_source(source).unwrap();
        Analyzer::new().normalize(out.format)
    }

    fn analyzed(source: &str, samples: &[&str]) -> (Format, Vec<Variable>) {
        let format = normalized(source);
        let samples: Vec<String> = samples.iter().map(|s| s.to_string()).collect();
        let result = infer_types(&format, &samples).unwrap();
        let variables = extract_variables(&format, &result.types, &result.collapsed);
        (result.matched, variables)
    }

    #[test]
    fn test_scalars() {
        let (_, vars) = analyzed("N M", &["3 4"]);
        assert_eq!(
            vars,
            vec![
                Variable {
                    name: "N".to_string(),
                    var_type: VarType::Int,
                    dims: vec![],
                },
                Variable {
                    name: "M".to_string(),
                    var_type: VarType::Int,
                    dims: vec![],
                },
            ]
        );
    }

    #[test]
    fn test_sequence_size_resolves_to_bound() {
        let (_, vars) = analyzed("N\na_1 a_2 ... a_N", &["4\n1 2 3 4"]);
        let a = vars.iter().find(|v| v.name == "a").unwrap();
        assert_eq!(a.var_type, VarType::Int);
        assert_eq!(a.dims, vec![Expr::var("N")]);
    }

    #[test]
    fn test_matrix_dimensions() {
        let (_, vars) = analyzed(
            "H W\nC_{1,1} ... C_{1,W}\nC_{2,1} ... C_{2,W}\n⋮\nC_{H,1} ... C_{H,W}",
            &["2 3\n1 2 3 4 5 6"],
        );
        let c = vars.iter().find(|v| v.name == "C").unwrap();
        assert_eq!(c.dims, vec![Expr::var("H"), Expr::var("W")]);
        assert_eq!(c.var_type, VarType::Int);
    }

    #[test]
    fn test_collapsed_variable_drops_trailing_dimension() {
        let (matched, vars) = analyzed(
            "H W\nS_{1,1} ... S_{1,W}\nS_{2,1} ... S_{2,W}\n⋮\nS_{H,1} ... S_{H,W}",
            &["2 3\nab.\n.ba"],
        );
        let s = vars.iter().find(|v| v.name == "S").unwrap();
        assert_eq!(s.var_type, VarType::Str);
        assert_eq!(s.dims, vec![Expr::var("H")]);
        // And the matched tree reads it with a single index
        assert_ne!(matched, normalized("H W"));
    }

    #[test]
    fn test_dimensionality_bounded_by_observed_usage() {
        let (_, vars) = analyzed("N\na_1 a_2 ... a_N", &["4\n1 2 3 4"]);
        for var in &vars {
            assert!(var.dimensionality() <= 1);
        }
    }

    #[test]
    fn test_raw_index_expression_kept() {
        // b is indexed 0-based; the size stays the raw bound expression
        let (_, vars) = analyzed("N\nb_0 b_1 ... b_{N-1}", &["3\n1 2 3"]);
        let b = vars.iter().find(|v| v.name == "b").unwrap();
        assert_eq!(
            b.dims,
            vec![Expr::bin(BinOpKind::Sub, Expr::var("N"), Expr::num(1))]
        );
    }
}
