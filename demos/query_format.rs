//! Example: multi-part query format
//!
//! A setup section (`N Q`) followed by two query record shapes,
//! dispatched on their leading literal discriminator.
//!
//! Run with: cargo run --example query_format

use format_to_reader::{compile, PartSpec, ProblemSpec, TemplateConfig};

fn main() {
    println!("=== Query Format Example ===\n");

    let problem = ProblemSpec {
        parts: vec![
            PartSpec {
                format: "N Q".to_string(),
                samples: vec!["8 3".to_string()],
            },
            PartSpec {
                format: "1 l r".to_string(),
                samples: vec!["2 5".to_string()],
            },
            PartSpec {
                format: "2 p x".to_string(),
                samples: vec!["4 100".to_string()],
            },
        ],
        repeated_cases: false,
    };

    let context = compile(&problem, &TemplateConfig::default()).unwrap();
    let query = context.query.expect("multi-part formats produce a query context");

    println!("Declarations:\n{}\n", context.declarations);
    println!("Setup:\n{}\n", query.setup_code);
    println!("Counter: {}", query.counter);
    for case in &query.cases {
        println!("\nCase {}:\n{}", case.discriminator, case.input_code);
        println!("  formal: {}", case.formal_arguments);
    }
}
