//! Input-Format-to-Reader Compiler
//!
//! This library turns the input-format descriptions found in
//! competitive-programming problem statements (e.g. `N` followed by
//! `a_1 a_2 ... a_N`) into a typed model of the variables a program
//! must read, and from that model generates declarations, input-reading
//! code and argument lists through a target-language template
//! configuration.
//!
//! # Example
//!
//! ```rust
//! use format_to_reader::{compile, PartSpec, ProblemSpec, TemplateConfig};
//!
//! let problem = ProblemSpec {
//!     parts: vec![PartSpec {
//!         format: "N\na_1 a_2 ... a_N".to_string(),
//!         samples: vec!["3\n1 2 3".to_string()],
//!     }],
//!     repeated_cases: false,
//! };
//! let context = compile(&problem, &TemplateConfig::default()).unwrap();
//! assert!(context.input_code.contains("std::cin >> a[i];"));
//! ```

pub mod analyzer;
pub mod ast;
pub mod config;
pub mod error;
pub mod generator;
pub mod lexer;
pub mod matcher;
pub mod parser;
pub mod typing;
pub mod variables;

pub use analyzer::Analyzer;
pub use config::TemplateConfig;
pub use error::{CompileError, CompileResult};
pub use generator::{
    FormatPart, GeneratedContext, GeneratorOptions, QueryCase, QueryContext, UniversalGenerator,
};
pub use matcher::{Environment, Matcher, VarValue};
pub use parser::{Diagnostic, Parser};
pub use typing::{InferenceResult, VarType};
pub use variables::Variable;

/// One format section with the sample instances that exercise it
#[derive(Debug, Clone, Default)]
pub struct PartSpec {
    pub format: String,
    pub samples: Vec<String>,
}

/// Input contract from the problem-scraping collaborator
#[derive(Debug, Clone, Default)]
pub struct ProblemSpec {
    /// Part 0 is the primary (or setup) format; further parts are
    /// query record shapes
    pub parts: Vec<PartSpec>,
    /// The problem repeats a leading test-case count; the first line
    /// of each primary sample is stripped before matching
    pub repeated_cases: bool,
}

/// Analysis artifacts for one format part
#[derive(Debug, Clone)]
pub struct FormatAnalysis {
    /// The normalized tree the samples matched (after the
    /// loop-collapse fallback when it was needed)
    pub tree: ast::Format,
    pub variables: Vec<Variable>,
    /// Problems the permissive parser recovered from
    pub diagnostics: Vec<Diagnostic>,
    /// First literal numeric token of the format, the discriminator
    /// of a query record shape
    pub discriminator: Option<i64>,
}

/// Run the front half of the pipeline on one format string:
/// lex, parse, normalize, infer types, extract variables.
pub fn analyze_format(format: &str, samples: &[String]) -> CompileResult<FormatAnalysis> {
    let tokens = lexer::tokenize(format)?;
    let discriminator = tokens.iter().find_map(|t| match t.kind {
        lexer::TokenKind::Number(n) => Some(n),
        _ => None,
    });
    let parsed = Parser::new(tokens).parse_format();
    let normalized = Analyzer::new().normalize(parsed.format);
    let inference = typing::infer_types(&normalized, samples)?;
    let variables =
        variables::extract_variables(&normalized, &inference.types, &inference.collapsed);
    Ok(FormatAnalysis {
        tree: inference.matched,
        variables,
        diagnostics: parsed.diagnostics,
        discriminator,
    })
}

/// Full pipeline: analyze every part, then generate the context
/// bundle for the templating collaborator.
pub fn compile(
    problem: &ProblemSpec,
    config: &TemplateConfig,
) -> CompileResult<GeneratedContext> {
    let mut parts = Vec::with_capacity(problem.parts.len());
    for (idx, part) in problem.parts.iter().enumerate() {
        let samples: Vec<String> = if problem.repeated_cases && idx == 0 {
            part.samples.iter().map(|s| strip_first_line(s)).collect()
        } else {
            part.samples.clone()
        };
        let analysis = analyze_format(&part.format, &samples)?;
        parts.push(FormatPart {
            variables: analysis.variables,
            tree: analysis.tree,
            discriminator: analysis.discriminator,
        });
    }
    let generator = UniversalGenerator::new(config);
    Ok(generator.generate(
        &parts,
        GeneratorOptions {
            repeated_cases: problem.repeated_cases,
            query_mode: problem.parts.len() > 1,
        },
    ))
}

fn strip_first_line(sample: &str) -> String {
    sample
        .split_once('\n')
        .map(|(_, rest)| rest.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(format: &str, samples: &[&str]) -> ProblemSpec {
        ProblemSpec {
            parts: vec![PartSpec {
                format: format.to_string(),
                samples: samples.iter().map(|s| s.to_string()).collect(),
            }],
            repeated_cases: false,
        }
    }

    #[test]
    fn test_end_to_end_scalars() {
        let analysis = analyze_format("N M", &["3 4".to_string()]).unwrap();
        assert_eq!(analysis.variables.len(), 2);
        assert_eq!(analysis.variables[0].name, "N");
        assert_eq!(analysis.variables[0].var_type, VarType::Int);
        assert_eq!(analysis.variables[0].dimensionality(), 0);
        assert_eq!(analysis.variables[1].name, "M");
        assert_eq!(analysis.variables[1].var_type, VarType::Int);

        let context = compile(&single("N M", &["3 4"]), &TemplateConfig::default()).unwrap();
        assert_eq!(context.input_code, "std::cin >> N;\nstd::cin >> M;");
    }

    #[test]
    fn test_end_to_end_sequence() {
        let analysis = analyze_format("N\na_1 a_2 a_3 ... a_N", &["4\n1 2 3 4".to_string()])
            .unwrap();
        let a = analysis.variables.iter().find(|v| v.name == "a").unwrap();
        assert_eq!(a.var_type, VarType::Int);
        assert_eq!(a.dimensionality(), 1);
        assert_eq!(a.dims[0], ast::Expr::var("N"));
        // The analyzer collapsed the whole sequence into one loop
        assert_eq!(analysis.tree.stmts.len(), 2);
        assert!(matches!(analysis.tree.stmts[1], ast::Stmt::Loop(_)));
    }

    #[test]
    fn test_end_to_end_repeated_cases() {
        let problem = ProblemSpec {
            parts: vec![PartSpec {
                format: "N M".to_string(),
                samples: vec!["2\n1 2\n3 4".to_string()],
            }],
            repeated_cases: true,
        };
        let context = compile(&problem, &TemplateConfig::default()).unwrap();
        assert!(context.declarations.contains("int T;"));
        assert!(context.input_code.contains("for (int tc = 0; tc < T; tc++) {"));
        assert!(context.input_code.contains("std::cin >> N;"));
    }

    #[test]
    fn test_end_to_end_query() {
        let problem = ProblemSpec {
            parts: vec![
                PartSpec {
                    format: "N Q".to_string(),
                    samples: vec!["5 2".to_string()],
                },
                PartSpec {
                    format: "1 l r".to_string(),
                    samples: vec!["1 3".to_string()],
                },
                PartSpec {
                    format: "2 p x".to_string(),
                    samples: vec!["2 10".to_string()],
                },
            ],
            repeated_cases: false,
        };
        let context = compile(&problem, &TemplateConfig::default()).unwrap();
        let query = context.query.expect("query context");
        assert_eq!(query.counter, "Q");
        assert_eq!(query.cases.len(), 2);
        assert_eq!(query.cases[0].discriminator, 1);
        assert_eq!(query.cases[1].discriminator, 2);
        assert_eq!(query.cases[1].input_code, "std::cin >> p;\nstd::cin >> x;");
    }

    #[test]
    fn test_lexical_error_aborts() {
        let err = analyze_format("N %", &[]).unwrap_err();
        assert!(matches!(err, CompileError::Lexical { .. }));
    }

    #[test]
    fn test_diagnostics_survive_the_pipeline() {
        let analysis = analyze_format("1 u v", &["3 4".to_string()]).unwrap();
        assert_eq!(analysis.diagnostics.len(), 1);
        assert_eq!(analysis.discriminator, Some(1));
    }
}
