use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{generate, Shell};
use tracing::info;

#[derive(ClapParser)]
#[command(name = "bminorc", about = "B-Minor compiler front end", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage 1 only: print the token stream.
    Tokens { file: PathBuf },
    /// Stages 1-2: print a debug dump of the AST.
    Parse { file: PathBuf },
    /// Stages 1-3: run semantic analysis and report diagnostics.
    Check { file: PathBuf },
    /// Stages 1-4: emit textual LLVM-compatible IR.
    EmitIr {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Stages 1-3 plus the interpreter: execute the program directly.
    Run { file: PathBuf },
    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Tokens { file } => run_tokens(&file),
        Commands::Parse { file } => run_parse(&file),
        Commands::Check { file } => run_check(&file),
        Commands::EmitIr { file, output } => run_emit_ir(&file, output.as_deref()),
        Commands::Run { file } => run_run(&file),
        Commands::Completions { shell } => {
            run_completions(shell);
            0
        }
    };
    process::exit(exit_code);
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "bminorc", &mut std::io::stdout());
}

fn read_source(file: &std::path::Path) -> String {
    match fs::read_to_string(file) {
        Ok(src) => src,
        Err(e) => {
            eprintln!("Error: could not read {}: {e}", file.display());
            process::exit(1);
        }
    }
}

fn run_tokens(file: &std::path::Path) -> i32 {
    let src = read_source(file);
    info!("tokenizing {}", file.display());
    let (tokens, diagnostics) = bminorc::tokenize(&src);
    for token in &tokens {
        println!("{token:?}");
    }
    report(&diagnostics)
}

fn run_parse(file: &std::path::Path) -> i32 {
    let src = read_source(file);
    info!("parsing {}", file.display());
    let (program, diagnostics) = bminorc::parse(&src);
    println!("{program:#?}");
    report(&diagnostics)
}

fn run_check(file: &std::path::Path) -> i32 {
    let src = read_source(file);
    info!("checking {}", file.display());
    let (_, diagnostics) = bminorc::check(&src);
    report(&diagnostics)
}

fn run_emit_ir(file: &std::path::Path, output: Option<&std::path::Path>) -> i32 {
    let src = read_source(file);
    info!("emitting IR for {}", file.display());
    match bminorc::emit_ir(&src) {
        Ok((ir, diagnostics)) => {
            if diagnostics.had_errors() {
                return report(&diagnostics);
            }
            match output {
                Some(path) => {
                    if let Err(e) = fs::write(path, ir) {
                        eprintln!("Error: could not write {}: {e}", path.display());
                        return 1;
                    }
                }
                None => print!("{ir}"),
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}

fn run_run(file: &std::path::Path) -> i32 {
    let src = read_source(file);
    info!("running {}", file.display());
    match bminorc::run_source(&src) {
        Ok((diagnostics, output)) => {
            print!("{output}");
            report(&diagnostics)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}

/// Print accumulated diagnostics (if any) and return the process exit
/// code: `0` iff no diagnostic of severity error was recorded, matching
/// `spec.md` §6/§7.
fn report(diagnostics: &bminorc::Diagnostics) -> i32 {
    if diagnostics.had_errors() {
        eprint!("{diagnostics}");
        1
    } else {
        0
    }
}
