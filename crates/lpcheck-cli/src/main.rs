use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Builder;
use log::{LevelFilter, info};
use lpcheck_lang::Compiler;
use lpcheck_solver::{LpResult, LpSolver};

#[derive(Parser)]
#[command(name = "lpcheck", version)]
#[command(about = "Exact feasibility checking for systems of linear constraints", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the constraints in a file are satisfiable
    Check {
        /// The problem file
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
        /// Report the first feasible point found instead of selecting a vertex
        #[arg(long)]
        first_feasible: bool,
    },
    /// Parse a file and output the AST
    Parse {
        /// The file to parse
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Pretty,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    Builder::new().filter_level(level).parse_default_env().init();

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Check {
            file,
            format,
            first_feasible,
        } => {
            let source = read_source(&file)?;
            let state = Compiler::compile_source(&source)
                .with_context(|| format!("Compiling {}", file.display()))?;
            info!(
                "checking {} variables against {} constraints",
                state.variables().num_variables(),
                state.constraints().len()
            );

            let result = LpSolver::new()
                .with_vertex_selection(!first_feasible)
                .check(&state);

            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                Format::Pretty => match &result {
                    LpResult::Feasible(model) => {
                        println!("Status: FEASIBLE");
                        print!("{model}");
                    }
                    LpResult::Infeasible => println!("Status: INFEASIBLE"),
                },
            }

            Ok(if result.is_feasible() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Commands::Parse { file, format } => {
            let source = read_source(&file)?;
            let program = lpcheck_lang::Parser::parse(&source)
                .with_context(|| format!("Parsing {}", file.display()))?;

            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&program)?),
                Format::Pretty => println!("{program:#?}"),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_source(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Reading {}", file.display()))
}
