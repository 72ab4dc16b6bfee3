//! Input-Format-to-Reader Compiler CLI
//!
//! Usage:
//!   fmt2reader "N M" --sample samples/1.txt
//!   fmt2reader -f format.txt --sample in1.txt --sample in2.txt --json
//!   fmt2reader "N Q" --part "1 l r" --part "2 p x" --config cpp.json
//!
//! Samples are files containing raw sample input text; the format can
//! be given inline, read from a file, or piped on stdin.

use clap::Parser as ClapParser;
use colored::Colorize;
use std::fs;
use std::io::{self, Read};

use format_to_reader::{
    analyze_format, compile, GeneratedContext, PartSpec, ProblemSpec, TemplateConfig,
};

#[derive(ClapParser, Debug)]
#[command(name = "fmt2reader")]
#[command(version = "0.1.0")]
#[command(about = "Compiles input-format descriptions into input-reading boilerplate")]
struct Args {
    /// Format description (e.g. "N\na_1 a_2 ... a_N")
    #[arg(value_name = "FORMAT")]
    format: Option<String>,

    /// Read the primary format from a file
    #[arg(short = 'f', long = "file")]
    input_file: Option<String>,

    /// Additional query-part format strings, in dispatch order
    #[arg(short = 'p', long = "part")]
    parts: Vec<String>,

    /// Files with raw sample input text for the primary format
    #[arg(short = 's', long = "sample")]
    samples: Vec<String>,

    /// JSON template configuration (defaults to the built-in C++ one)
    #[arg(short = 'c', long = "config")]
    config_file: Option<String>,

    /// The problem repeats a leading test-case count
    #[arg(long = "repeated-cases")]
    repeated_cases: bool,

    /// Output the context bundle as JSON
    #[arg(short = 'j', long = "json")]
    json_output: bool,

    /// Verbose output with per-part analysis
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    // Get the primary format from argument, file, or stdin
    let format = if let Some(format) = args.format {
        format
    } else if let Some(file) = args.input_file {
        fs::read_to_string(&file).unwrap_or_else(|e| {
            eprintln!("{}: Failed to read file '{}': {}", "Error".red(), file, e);
            std::process::exit(1);
        })
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).unwrap_or_else(|e| {
            eprintln!("{}: Failed to read stdin: {}", "Error".red(), e);
            std::process::exit(1);
        });
        buffer
    };

    let samples: Vec<String> = args
        .samples
        .iter()
        .map(|path| {
            fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("{}: Failed to read sample '{}': {}", "Error".red(), path, e);
                std::process::exit(1);
            })
        })
        .collect();

    let config = match args.config_file {
        Some(path) => {
            let text = fs::read_to_string(&path).unwrap_or_else(|e| {
                eprintln!("{}: Failed to read config '{}': {}", "Error".red(), path, e);
                std::process::exit(1);
            });
            match TemplateConfig::from_json(&text) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            }
        }
        None => TemplateConfig::default(),
    };

    let mut problem = ProblemSpec {
        parts: vec![PartSpec {
            format,
            samples,
        }],
        repeated_cases: args.repeated_cases,
    };
    for part in &args.parts {
        problem.parts.push(PartSpec {
            format: part.clone(),
            samples: Vec::new(),
        });
    }

    if args.verbose {
        println!("{}", "Input Format Analysis".bold().blue());
        println!("{}", "=".repeat(40));
        for (idx, part) in problem.parts.iter().enumerate() {
            match analyze_format(&part.format, &part.samples) {
                Ok(analysis) => {
                    println!();
                    println!("{} {}", "Part".bold(), idx.to_string().bold());
                    println!("  {}: {}", "Tree".cyan(), analysis.tree);
                    if let Some(d) = analysis.discriminator {
                        println!("  {}: {}", "Discriminator".cyan(), d);
                    }
                    for diag in &analysis.diagnostics {
                        println!("  {}: {}", "Recovered".yellow(), diag);
                    }
                    for var in &analysis.variables {
                        let dims: Vec<String> =
                            var.dims.iter().map(|d| d.to_string()).collect();
                        println!(
                            "  {}: {} {} [{}]",
                            "Variable".cyan(),
                            var.name,
                            var.var_type,
                            dims.join(", ")
                        );
                    }
                }
                Err(e) => {
                    eprintln!("{}: {}", "Analysis error".red(), e);
                    std::process::exit(1);
                }
            }
        }
        println!();
    }

    let context = match compile(&problem, &config) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("{}: {}", "Compilation error".red(), e);
            std::process::exit(1);
        }
    };

    if args.json_output {
        match serde_json::to_string_pretty(&context) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("{}: Failed to serialize to JSON: {}", "Error".red(), e);
                std::process::exit(1);
            }
        }
    } else {
        print_context(&context);
    }
}

fn print_context(context: &GeneratedContext) {
    println!("{}", "Generated Reader".bold().green());
    println!("{}", "=".repeat(50));
    println!();

    println!("{}", "Declarations".cyan().bold());
    println!("{}", context.declarations);
    println!();

    println!("{}", "Input code".cyan().bold());
    println!("{}", context.input_code);
    println!();

    println!("{}: {}", "Formal arguments".cyan(), context.formal_arguments);
    println!("{}: {}", "Actual arguments".cyan(), context.actual_arguments);

    if let Some(query) = &context.query {
        println!();
        println!("{}", "Query dispatch".bold().yellow());
        println!("{}", "-".repeat(50));
        println!("{}: {}", "Counter".cyan(), query.counter);
        for case in &query.cases {
            println!();
            println!("{} {}", "Case".bold(), case.discriminator.to_string().bold());
            println!("{}", case.input_code);
            println!("  {}: {}", "Formal".cyan(), case.formal_arguments);
            println!("  {}: {}", "Actual".cyan(), case.actual_arguments);
        }
    }
}
