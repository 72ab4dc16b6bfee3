//! Example: classic sequence format
//!
//! Analyzes `N` followed by `a_1 a_2 ... a_N` against one sample and
//! prints the generated C++ reading code.
//!
//! Run with: cargo run --example sequence

use format_to_reader::{compile, PartSpec, ProblemSpec, TemplateConfig};

fn main() {
    println!("=== Sequence Format Example ===\n");

    let problem = ProblemSpec {
        parts: vec![PartSpec {
            format: "N\na_1 a_2 ... a_N".to_string(),
            samples: vec!["5\n3 1 4 1 5".to_string()],
        }],
        repeated_cases: false,
    };

    let context = compile(&problem, &TemplateConfig::default()).unwrap();

    println!("Declarations:\n{}\n", context.declarations);
    println!("Input code:\n{}\n", context.input_code);
    println!("Formal arguments: {}", context.formal_arguments);
    println!("Actual arguments: {}", context.actual_arguments);
}
