use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap_stdin::FileOrStdin;
use log::error;

use pcc::{compile, CompileOptions};

/// Compile a P program to RISC-V assembly
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Source file, or "-" / nothing for stdin
    #[arg(default_value = "-")]
    input: FileOrStdin,

    /// Write the assembly here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print each symbol table as its scope closes
    #[arg(long)]
    dump: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let file_name = cli.input.filename().to_string();
    let source = match cli.input.contents() {
        Ok(source) => source,
        Err(e) => {
            error!("failed to read {}: {}", file_name, e);
            return ExitCode::FAILURE;
        }
    };

    let options = CompileOptions { dump: cli.dump };
    let assembly = match compile(&source, &file_name, &options) {
        Ok(assembly) => assembly,
        Err(e) => {
            eprint!("{}", e.render(&source));
            return ExitCode::FAILURE;
        }
    };

    match cli.output {
        Some(path) => {
            if let Err(e) = fs::write(&path, assembly) {
                error!("failed to write {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        }
        None => print!("{}", assembly),
    }
    ExitCode::SUCCESS
}
