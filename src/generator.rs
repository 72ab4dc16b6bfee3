//! Universal code generator
//!
//! Consumes variable descriptors plus normalized trees and renders,
//! through the template configuration, the pieces the outer templating
//! layer splices into a target-language skeleton: declarations, an
//! input-reading block mirroring the tree 1:1, and argument lists.
//! Multi-part query formats additionally produce a setup block and one
//! dispatch case per discriminator.
//!
//! The generator never fails: missing metadata degrades to an explicit
//! `<unresolved:name>` marker in the emitted text.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::ast::{BinOpKind, Expr, Format, Loop, Stmt};
use crate::config::{substitute, TemplateConfig};
use crate::typing::VarType;
use crate::variables::Variable;

const SCALAR_ARGUMENT: &str = "{type} {name}";

/// One format part: part 0 is the primary (or setup) section, later
/// parts are query record shapes.
#[derive(Debug, Clone)]
pub struct FormatPart {
    pub variables: Vec<Variable>,
    pub tree: Format,
    /// Literal discriminator taken from the part's first numeric
    /// token, when it has one
    pub discriminator: Option<i64>,
}

/// Generation mode flags
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratorOptions {
    /// Wrap the reading block in a test-case counter loop
    pub repeated_cases: bool,
    /// Emit per-discriminator dispatch cases for parts 1..N
    pub query_mode: bool,
}

/// Context bundle handed to the templating collaborator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedContext {
    pub declarations: String,
    pub input_code: String,
    pub formal_arguments: String,
    pub actual_arguments: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryContext>,
}

/// Query-mode extras: setup block plus ordered dispatch cases
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryContext {
    /// Variable driving the repeat-count loop
    pub counter: String,
    pub setup_code: String,
    pub cases: Vec<QueryCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryCase {
    pub discriminator: i64,
    pub input_code: String,
    pub formal_arguments: String,
    pub actual_arguments: String,
}

fn unresolved(name: &str) -> String {
    format!("<unresolved:{}>", name)
}

/// Template-driven generator over one or more format parts
pub struct UniversalGenerator<'c> {
    config: &'c TemplateConfig,
}

impl<'c> UniversalGenerator<'c> {
    pub fn new(config: &'c TemplateConfig) -> Self {
        Self { config }
    }

    pub fn generate(&self, parts: &[FormatPart], options: GeneratorOptions) -> GeneratedContext {
        let renames = build_renames(parts);

        let mut declared: HashSet<String> = HashSet::new();
        let mut decl_lines: Vec<String> = Vec::new();
        for (idx, part) in parts.iter().enumerate() {
            for var in &part.variables {
                let name = final_name(&renames[idx], &var.name);
                if declared.insert(name.clone()) {
                    decl_lines.push(self.declaration(var, &name, &renames[idx]));
                }
            }
        }

        let mut input_code = match parts.first() {
            Some(part) => self.render_input(part, &renames[0]),
            None => String::new(),
        };

        if options.repeated_cases {
            let counter = fresh_name(&["T", "tt", "tcases"], &declared);
            let int_template = self.config.scalar(VarType::Int);
            decl_lines.insert(
                0,
                substitute(
                    &int_template.declare,
                    &[
                        ("type", int_template.type_name.as_str()),
                        ("name", counter.as_str()),
                        ("default", int_template.default.as_str()),
                    ],
                ),
            );
            input_code = self.wrap_in_counter_loop(&counter, &input_code);
        }

        let (formal_arguments, actual_arguments) = match parts.first() {
            Some(part) => self.arguments(part, &renames[0]),
            None => (String::new(), String::new()),
        };

        let query = if options.query_mode && parts.len() > 1 {
            let cases = parts[1..]
                .iter()
                .enumerate()
                .map(|(pos, part)| {
                    let rename = &renames[pos + 1];
                    let (formal, actual) = self.arguments(part, rename);
                    QueryCase {
                        discriminator: part.discriminator.unwrap_or(pos as i64 + 1),
                        input_code: self.render_input(part, rename),
                        formal_arguments: formal,
                        actual_arguments: actual,
                    }
                })
                .collect();
            Some(QueryContext {
                counter: query_counter(&parts[0])
                    .unwrap_or_else(|| unresolved("query_counter")),
                setup_code: input_code.clone(),
                cases,
            })
        } else {
            None
        };

        GeneratedContext {
            declarations: decl_lines.join("\n"),
            input_code,
            formal_arguments,
            actual_arguments,
            query,
        }
    }

    fn declaration(
        &self,
        var: &Variable,
        name: &str,
        renames: &HashMap<String, String>,
    ) -> String {
        let scalar = self.config.scalar(var.var_type);
        match var.dims.as_slice() {
            [] => substitute(
                &scalar.declare,
                &[
                    ("type", scalar.type_name.as_str()),
                    ("name", name),
                    ("default", scalar.default.as_str()),
                ],
            ),
            [length] => substitute(
                &self.config.seq.declare,
                &[
                    ("type", scalar.type_name.as_str()),
                    ("name", name),
                    ("default", scalar.default.as_str()),
                    ("length", self.render_expr(length, renames).as_str()),
                ],
            ),
            [rows, cols] => substitute(
                &self.config.seq_2d.declare,
                &[
                    ("type", scalar.type_name.as_str()),
                    ("name", name),
                    ("default", scalar.default.as_str()),
                    ("length_i", self.render_expr(rows, renames).as_str()),
                    ("length_j", self.render_expr(cols, renames).as_str()),
                ],
            ),
            _ => unresolved(name),
        }
    }

    fn arguments(
        &self,
        part: &FormatPart,
        renames: &HashMap<String, String>,
    ) -> (String, String) {
        let mut formal = Vec::with_capacity(part.variables.len());
        let mut actual = Vec::with_capacity(part.variables.len());
        for var in &part.variables {
            let name = final_name(renames, &var.name);
            let scalar = self.config.scalar(var.var_type);
            let template = match var.dims.len() {
                0 => SCALAR_ARGUMENT,
                1 => self.config.seq.argument.as_str(),
                2 => self.config.seq_2d.argument.as_str(),
                _ => {
                    formal.push(unresolved(&name));
                    actual.push(name);
                    continue;
                }
            };
            formal.push(substitute(
                template,
                &[("type", scalar.type_name.as_str()), ("name", name.as_str())],
            ));
            actual.push(name);
        }
        (formal.join(", "), actual.join(", "))
    }

    fn render_input(&self, part: &FormatPart, renames: &HashMap<String, String>) -> String {
        let by_name: HashMap<&str, &Variable> = part
            .variables
            .iter()
            .map(|v| (v.name.as_str(), v))
            .collect();
        let mut state = RenderState {
            lines: Vec::new(),
            allocated: HashSet::new(),
            read: HashSet::new(),
        };
        self.render_stmts(&part.tree.stmts, 0, &by_name, renames, &mut state);
        state.lines.join("\n")
    }

    fn render_stmts(
        &self,
        stmts: &[Stmt],
        depth: usize,
        vars: &HashMap<&str, &Variable>,
        renames: &HashMap<String, String>,
        state: &mut RenderState,
    ) {
        for stmt in stmts {
            self.emit_allocations(stmt, depth, vars, renames, state);
            match stmt {
                Stmt::Item(item) => {
                    let indent = self.config.indent_unit().repeat(depth);
                    match vars.get(item.name.as_str()) {
                        None => state.lines.push(format!("{}{}", indent, unresolved(&item.name))),
                        Some(var) => {
                            let name = final_name(renames, &var.name);
                            let scalar = self.config.scalar(var.var_type);
                            let access = self.access_for(var, &name, item, renames);
                            state.lines.push(format!(
                                "{}{}",
                                indent,
                                substitute(
                                    &scalar.input,
                                    &[
                                        ("access", access.as_str()),
                                        ("name", name.as_str()),
                                        ("type", scalar.type_name.as_str()),
                                    ],
                                )
                            ));
                            if var.dims.is_empty() {
                                state.read.insert(var.name.clone());
                            }
                        }
                    }
                }
                Stmt::Loop(lp) => {
                    let indent = self.config.indent_unit().repeat(depth);
                    let length = self.render_expr(&loop_length(lp), renames);
                    state.lines.push(format!(
                        "{}{}",
                        indent,
                        substitute(
                            &self.config.loops.header,
                            &[("loop_var", lp.var.as_str()), ("length", length.as_str())],
                        )
                    ));
                    self.render_stmts(&lp.body, depth + 1, vars, renames, state);
                    state.lines.push(format!("{}{}", indent, self.config.loops.footer));
                }
            }
        }
    }

    /// Emit pending sequence allocations whose sizes are in scope,
    /// just before the statement that first writes the sequence.
    fn emit_allocations(
        &self,
        stmt: &Stmt,
        depth: usize,
        vars: &HashMap<&str, &Variable>,
        renames: &HashMap<String, String>,
        state: &mut RenderState,
    ) {
        let mut used = Vec::new();
        first_reads(stmt, &mut used);
        for name in used {
            let Some(var) = vars.get(name.as_str()) else { continue };
            if var.dims.is_empty() || state.allocated.contains(&var.name) {
                continue;
            }
            let mut size_idents = BTreeSet::new();
            for dim in &var.dims {
                dim.collect_idents(&mut size_idents);
            }
            if !size_idents.iter().all(|n| state.read.contains(n)) {
                // Sizes not read yet; a nested statement list tries again
                continue;
            }
            let scalar = self.config.scalar(var.var_type);
            let final_ = final_name(renames, &var.name);
            let indent = self.config.indent_unit().repeat(depth);
            let line = match var.dims.as_slice() {
                [length] => substitute(
                    &self.config.seq.allocate,
                    &[
                        ("name", final_.as_str()),
                        ("type", scalar.type_name.as_str()),
                        ("default", scalar.default.as_str()),
                        ("length", self.render_expr(length, renames).as_str()),
                    ],
                ),
                [rows, cols] => substitute(
                    &self.config.seq_2d.allocate,
                    &[
                        ("name", final_.as_str()),
                        ("type", scalar.type_name.as_str()),
                        ("default", scalar.default.as_str()),
                        ("length_i", self.render_expr(rows, renames).as_str()),
                        ("length_j", self.render_expr(cols, renames).as_str()),
                    ],
                ),
                _ => continue,
            };
            state.lines.push(format!("{}{}", indent, line));
            state.allocated.insert(var.name.clone());
        }
    }

    fn access_for(
        &self,
        var: &Variable,
        name: &str,
        item: &crate::ast::ItemRef,
        renames: &HashMap<String, String>,
    ) -> String {
        match var.dims.len() {
            0 => name.to_string(),
            1 => match item.indices.first() {
                Some(index) => substitute(
                    &self.config.seq.access,
                    &[
                        ("name", name),
                        ("index", self.render_expr(index, renames).as_str()),
                    ],
                ),
                None => unresolved(name),
            },
            2 => match (item.indices.first(), item.indices.get(1)) {
                (Some(row), Some(col)) => substitute(
                    &self.config.seq_2d.access,
                    &[
                        ("name", name),
                        ("index_i", self.render_expr(row, renames).as_str()),
                        ("index_j", self.render_expr(col, renames).as_str()),
                    ],
                ),
                _ => unresolved(name),
            },
            _ => unresolved(name),
        }
    }

    fn wrap_in_counter_loop(&self, counter: &str, body: &str) -> String {
        let int_template = self.config.scalar(VarType::Int);
        let unit = self.config.indent_unit();
        let mut lines = vec![substitute(
            &int_template.input,
            &[
                ("access", counter),
                ("name", counter),
                ("type", int_template.type_name.as_str()),
            ],
        )];
        lines.push(substitute(
            &self.config.loops.header,
            &[("loop_var", "tc"), ("length", counter)],
        ));
        for line in body.lines() {
            if line.is_empty() {
                lines.push(String::new());
            } else {
                lines.push(format!("{}{}", unit, line));
            }
        }
        lines.push(self.config.loops.footer.clone());
        lines.join("\n")
    }

    fn render_expr(&self, expr: &Expr, renames: &HashMap<String, String>) -> String {
        self.render_prec(expr, 0, renames)
    }

    fn render_prec(&self, expr: &Expr, parent: u8, renames: &HashMap<String, String>) -> String {
        match expr {
            Expr::Num(n) => n.to_string(),
            Expr::Ref(item) => {
                let name = final_name(renames, &item.name);
                match item.indices.as_slice() {
                    [] => name,
                    [index] => substitute(
                        &self.config.seq.access,
                        &[
                            ("name", name.as_str()),
                            ("index", self.render_prec(index, 0, renames).as_str()),
                        ],
                    ),
                    [row, col] => substitute(
                        &self.config.seq_2d.access,
                        &[
                            ("name", name.as_str()),
                            ("index_i", self.render_prec(row, 0, renames).as_str()),
                            ("index_j", self.render_prec(col, 0, renames).as_str()),
                        ],
                    ),
                    _ => unresolved(&name),
                }
            }
            Expr::Bin { op, left, right } => {
                let prec = match op {
                    BinOpKind::Add | BinOpKind::Sub => 1,
                    BinOpKind::Mul | BinOpKind::Div => 2,
                };
                let text = format!(
                    "{} {} {}",
                    self.render_prec(left, prec, renames),
                    op.symbol(),
                    self.render_prec(right, prec + 1, renames),
                );
                if prec < parent {
                    format!("({})", text)
                } else {
                    text
                }
            }
        }
    }
}

struct RenderState {
    lines: Vec<String>,
    allocated: HashSet<String>,
    read: HashSet<String>,
}

/// Statement-level reads in subtree order
fn first_reads(stmt: &Stmt, out: &mut Vec<String>) {
    match stmt {
        Stmt::Item(item) => out.push(item.name.clone()),
        Stmt::Loop(lp) => {
            for inner in &lp.body {
                first_reads(inner, out);
            }
        }
    }
}

/// Number of iterations, 0-based: end − start + 1, constant-folded
fn loop_length(lp: &Loop) -> Expr {
    simplify(&Expr::bin(
        BinOpKind::Add,
        Expr::bin(BinOpKind::Sub, lp.end.clone(), lp.start.clone()),
        Expr::num(1),
    ))
}

fn simplify(expr: &Expr) -> Expr {
    let Expr::Bin { op, left, right } = expr else {
        return expr.clone();
    };
    let op = *op;
    let left = simplify(left);
    let right = simplify(right);

    if let (Expr::Num(a), Expr::Num(b)) = (&left, &right) {
        let folded = match op {
            BinOpKind::Add => Some(a + b),
            BinOpKind::Sub => Some(a - b),
            BinOpKind::Mul => Some(a * b),
            BinOpKind::Div => None,
        };
        if let Some(value) = folded {
            return Expr::Num(value);
        }
    }

    if matches!(op, BinOpKind::Add | BinOpKind::Sub) {
        if let Expr::Num(b) = &right {
            let b = if op == BinOpKind::Sub { -*b } else { *b };
            if b == 0 {
                return left;
            }
            // (x ± a) ± b folds into one adjustment
            if let Expr::Bin {
                op: inner_op,
                left: x,
                right: inner_right,
            } = &left
            {
                if matches!(inner_op, BinOpKind::Add | BinOpKind::Sub) {
                    if let Expr::Num(a) = **inner_right {
                        let a = if *inner_op == BinOpKind::Sub { -a } else { a };
                        let total = a + b;
                        return if total == 0 {
                            (**x).clone()
                        } else if total > 0 {
                            Expr::bin(BinOpKind::Add, (**x).clone(), Expr::num(total))
                        } else {
                            Expr::bin(BinOpKind::Sub, (**x).clone(), Expr::num(-total))
                        };
                    }
                }
            }
        }
        if op == BinOpKind::Add && matches!(&left, Expr::Num(0)) {
            return right;
        }
    }

    Expr::Bin {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn final_name(renames: &HashMap<String, String>, name: &str) -> String {
    renames.get(name).cloned().unwrap_or_else(|| name.to_string())
}

fn fresh_name(candidates: &[&str], used: &HashSet<String>) -> String {
    for candidate in candidates {
        if !used.contains(*candidate) {
            return candidate.to_string();
        }
    }
    let mut n = 1;
    loop {
        let name = format!("t{}", n);
        if !used.contains(&name) {
            return name;
        }
        n += 1;
    }
}

/// Per-part rename maps: a name whose inferred type or dimensionality
/// is inconsistent across parts gets a part-index suffix outside the
/// setup part; everything else keeps its own name and shares one
/// declaration.
fn build_renames(parts: &[FormatPart]) -> Vec<HashMap<String, String>> {
    let mut signatures: HashMap<&str, Vec<(usize, VarType, usize)>> = HashMap::new();
    for (idx, part) in parts.iter().enumerate() {
        for var in &part.variables {
            signatures
                .entry(var.name.as_str())
                .or_default()
                .push((idx, var.var_type, var.dims.len()));
        }
    }

    let conflicted: HashSet<String> = signatures
        .iter()
        .filter(|(_, occurrences)| {
            occurrences.iter().any(|(_, t, d)| {
                (*t, *d) != (occurrences[0].1, occurrences[0].2)
            })
        })
        .map(|(name, _)| name.to_string())
        .collect();

    parts
        .iter()
        .enumerate()
        .map(|(idx, part)| {
            part.variables
                .iter()
                .map(|var| {
                    let renamed = if idx > 0 && conflicted.contains(&var.name) {
                        format!("{}_{}", var.name, idx)
                    } else {
                        var.name.clone()
                    };
                    (var.name.clone(), renamed)
                })
                .collect()
        })
        .collect()
}

/// The variable driving the query repeat loop: `Q`/`q` by name, else
/// the last scalar integer that is not itself a setup-only bound.
fn query_counter(part0: &FormatPart) -> Option<String> {
    let ints: Vec<&Variable> = part0
        .variables
        .iter()
        .filter(|v| v.dims.is_empty() && matches!(v.var_type, VarType::Int | VarType::IndexInt))
        .collect();
    if let Some(var) = ints.iter().find(|v| v.name == "Q" || v.name == "q") {
        return Some(var.name.clone());
    }
    let mut bound_names = BTreeSet::new();
    for var in &part0.variables {
        for dim in &var.dims {
            dim.collect_idents(&mut bound_names);
        }
    }
    if let Some(var) = ints.iter().rev().find(|v| !bound_names.contains(&v.name)) {
        return Some(var.name.clone());
    }
    ints.last().map(|v| v.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::parser::parse_source;
    use crate::typing::infer_types;
    use crate::variables::extract_variables;
    use pretty_assertions::assert_eq;

    fn part(source: &str, samples: &[&str]) -> FormatPart {
        let parsed = parse_source(source).unwrap();
        let discriminator = crate::lexer::tokenize(source)
            .unwrap()
            .into_iter()
            .find_map(|t| match t.kind {
                crate::lexer::TokenKind::Number(n) => Some(n),
                _ => None,
            });
        let format = Analyzer::new().normalize(parsed.format);
        let samples: Vec<String> = samples.iter().map(|s| s.to_string()).collect();
        let inference = infer_types(&format, &samples).unwrap();
        let variables = extract_variables(&format, &inference.types, &inference.collapsed);
        FormatPart {
            variables,
            tree: inference.matched,
            discriminator,
        }
    }

    fn generate_one(source: &str, samples: &[&str]) -> GeneratedContext {
        let config = TemplateConfig::default();
        let generator = UniversalGenerator::new(&config);
        generator.generate(&[part(source, samples)], GeneratorOptions::default())
    }

    #[test]
    fn test_two_scalars() {
        let context = generate_one("N M", &["3 4"]);
        assert_eq!(context.declarations, "int N;\nint M;");
        assert_eq!(context.input_code, "std::cin >> N;\nstd::cin >> M;");
        assert_eq!(context.formal_arguments, "int N, int M");
        assert_eq!(context.actual_arguments, "N, M");
        assert!(context.query.is_none());
    }

    #[test]
    fn test_sequence() {
        let context = generate_one("N\na_1 a_2 ... a_N", &["4\n1 2 3 4"]);
        assert_eq!(context.declarations, "int N;\nstd::vector<int> a;");
        assert_eq!(
            context.input_code,
            "std::cin >> N;\n\
             a.assign(N, 0);\n\
             for (int i = 0; i < N; i++) {\n    \
                 std::cin >> a[i];\n\
             }"
        );
        assert_eq!(
            context.formal_arguments,
            "int N, const std::vector<int> &a"
        );
        assert_eq!(context.actual_arguments, "N, a");
    }

    #[test]
    fn test_zero_based_sequence_length() {
        let context = generate_one("N\nb_0 b_1 ... b_{N-1}", &["3\n1 2 3"]);
        assert!(context.input_code.contains("for (int i = 0; i < N; i++) {"));
        assert!(context.declarations.contains("std::vector<int> b;"));
    }

    #[test]
    fn test_matrix() {
        let context = generate_one(
            "H W\nC_{1,1} ... C_{1,W}\nC_{2,1} ... C_{2,W}\n⋮\nC_{H,1} ... C_{H,W}",
            &["2 3\n1 2 3 4 5 6"],
        );
        assert!(context
            .declarations
            .contains("std::vector<std::vector<int>> C;"));
        assert!(context
            .input_code
            .contains("C.assign(H, std::vector<int>(W, 0));"));
        assert!(context.input_code.contains("std::cin >> C[j][i];"));
    }

    #[test]
    fn test_repeated_cases_wrap() {
        let config = TemplateConfig::default();
        let generator = UniversalGenerator::new(&config);
        let context = generator.generate(
            &[part("N", &["5"])],
            GeneratorOptions {
                repeated_cases: true,
                query_mode: false,
            },
        );
        assert!(context.declarations.starts_with("int T;"));
        assert_eq!(
            context.input_code,
            "std::cin >> T;\n\
             for (int tc = 0; tc < T; tc++) {\n    \
                 std::cin >> N;\n\
             }"
        );
    }

    #[test]
    fn test_query_dispatch() {
        let config = TemplateConfig::default();
        let generator = UniversalGenerator::new(&config);
        let parts = vec![
            part("N Q", &["3 2"]),
            part("1 u v", &["10 20"]),
            part("2 w", &["xyz"]),
        ];
        let context = generator.generate(
            &parts,
            GeneratorOptions {
                repeated_cases: false,
                query_mode: true,
            },
        );
        let query = context.query.expect("query context");
        assert_eq!(query.counter, "Q");
        assert_eq!(query.setup_code, context.input_code);
        assert_eq!(query.cases.len(), 2);
        assert_eq!(query.cases[0].discriminator, 1);
        assert_eq!(query.cases[0].input_code, "std::cin >> u;\nstd::cin >> v;");
        assert_eq!(query.cases[0].formal_arguments, "int u, int v");
        assert_eq!(query.cases[1].discriminator, 2);
        assert!(context.declarations.contains("std::string w;"));
    }

    #[test]
    fn test_conflicting_names_renamed_per_part() {
        let config = TemplateConfig::default();
        let generator = UniversalGenerator::new(&config);
        let parts = vec![
            part("Q", &["2"]),
            part("1 x", &["5"]),
            part("2 x", &["hello"]),
        ];
        let context = generator.generate(
            &parts,
            GeneratorOptions {
                repeated_cases: false,
                query_mode: true,
            },
        );
        assert!(context.declarations.contains("int x_1;"));
        assert!(context.declarations.contains("std::string x_2;"));
        let query = context.query.unwrap();
        assert_eq!(query.cases[0].input_code, "std::cin >> x_1;");
        assert_eq!(query.cases[1].input_code, "std::cin >> x_2;");
    }

    #[test]
    fn test_consistent_names_share_declaration() {
        let config = TemplateConfig::default();
        let generator = UniversalGenerator::new(&config);
        let parts = vec![
            part("Q", &["2"]),
            part("1 x", &["5"]),
            part("2 x", &["7"]),
        ];
        let context = generator.generate(
            &parts,
            GeneratorOptions {
                repeated_cases: false,
                query_mode: true,
            },
        );
        assert_eq!(context.declarations.matches("int x;").count(), 1);
        let query = context.query.unwrap();
        assert_eq!(query.cases[0].input_code, "std::cin >> x;");
        assert_eq!(query.cases[1].input_code, "std::cin >> x;");
    }

    #[test]
    fn test_missing_variable_degrades_to_marker() {
        let config = TemplateConfig::default();
        let generator = UniversalGenerator::new(&config);
        let parsed = parse_source("z").unwrap();
        let tree = Analyzer::new().normalize(parsed.format);
        let context = generator.generate(
            &[FormatPart {
                variables: vec![],
                tree,
                discriminator: None,
            }],
            GeneratorOptions::default(),
        );
        assert_eq!(context.input_code, "<unresolved:z>");
    }

    #[test]
    fn test_loop_length_simplification() {
        let one_based = Loop {
            var: "i".to_string(),
            start: Expr::num(1),
            end: Expr::var("N"),
            body: vec![],
        };
        assert_eq!(loop_length(&one_based), Expr::var("N"));

        let zero_based = Loop {
            var: "i".to_string(),
            start: Expr::num(0),
            end: Expr::bin(BinOpKind::Sub, Expr::var("N"), Expr::num(1)),
            body: vec![],
        };
        assert_eq!(loop_length(&zero_based), Expr::var("N"));

        let offset = Loop {
            var: "i".to_string(),
            start: Expr::num(2),
            end: Expr::var("N"),
            body: vec![],
        };
        assert_eq!(
            loop_length(&offset),
            Expr::bin(BinOpKind::Sub, Expr::var("N"), Expr::num(1))
        );
    }
}
