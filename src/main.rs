use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use rslang::config::Environment;
use rslang::diagnostics::render_error;
use rslang::typeck::types::TypeClass;
use rslang::{CheckOptions, Engine, RsError};

#[derive(Parser)]
#[command(name = "rslang", version, about = "Check and evaluate RSLang expressions")]
struct Cli {
    /// Environment file declaring bases, globals and limits
    #[arg(long, global = true)]
    env: Option<PathBuf>,

    /// Print machine-readable JSON instead of rendered reports
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the normalized syntax tree of an expression
    Ast {
        expr: String,
    },
    /// Type-check and classify an expression
    Check {
        expr: String,
        /// Required class of the expression
        #[arg(long, value_enum)]
        expect: Option<Expect>,
        /// Require a set-valued expression
        #[arg(long)]
        domain: bool,
    },
    /// Check and evaluate an expression
    Eval {
        expr: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Expect {
    Logic,
    Typification,
    Function,
    Predicate,
}

impl From<Expect> for TypeClass {
    fn from(e: Expect) -> Self {
        match e {
            Expect::Logic => TypeClass::Logic,
            Expect::Typification => TypeClass::Typification,
            Expect::Function => TypeClass::Function,
            Expect::Predicate => TypeClass::Predicate,
        }
    }
}

fn load_engine(env: Option<&Path>) -> Result<Engine, String> {
    let Some(path) = env else {
        return Ok(Engine::default());
    };
    let env = Environment::load(path).map_err(|e| e.to_string())?;
    Engine::from_environment(&env).map_err(|e| format!("{}: {e}", path.display()))
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("error: cannot serialize output: {e}"),
    }
}

fn report(source: &str, errors: &[RsError]) {
    for err in errors {
        render_error(source, err);
    }
}

#[derive(Serialize)]
struct EvalOutput<'a> {
    success: bool,
    #[serde(rename = "type")]
    ty: Option<String>,
    value: Option<String>,
    iterations: usize,
    errors: &'a [RsError],
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let engine = match load_engine(cli.env.as_deref()) {
        Ok(engine) => engine,
        Err(msg) => {
            eprintln!("error: {msg}");
            std::process::exit(2);
        }
    };

    let success = match cli.command {
        Commands::Ast { expr } => {
            let (ast, errors) = rslang::parse_ast(&expr);
            if cli.json {
                print_json(&ast);
            } else {
                report(&expr, &errors);
                print!("{ast}");
            }
            !ast.has_error()
        }
        Commands::Check { expr, expect, domain } => {
            let options = CheckOptions { expected: expect.map(TypeClass::from), is_domain: domain };
            let result = engine.check(&expr, options);
            if cli.json {
                print_json(&result);
            } else {
                report(&expr, &result.errors);
                if let Some(ty) = &result.ty {
                    println!("type: {ty}");
                }
                if let Some(class) = result.value_class {
                    println!("class: {class}");
                }
            }
            result.success
        }
        Commands::Eval { expr } => {
            let (check, eval) = engine.calculate(&expr);
            let success = eval.as_ref().is_some_and(|r| r.success);
            if cli.json {
                print_json(&EvalOutput {
                    success,
                    ty: check.ty.as_ref().map(ToString::to_string),
                    value: eval.as_ref().and_then(|r| r.value.as_ref()).map(ToString::to_string),
                    iterations: eval.as_ref().map_or(0, |r| r.iterations),
                    errors: &check.errors,
                });
            } else {
                report(&expr, &check.errors);
                if let Some(value) = eval.as_ref().and_then(|r| r.value.as_ref()) {
                    println!("{value}");
                }
            }
            success
        }
    };

    if !success {
        std::process::exit(1);
    }
}
