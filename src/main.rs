use std::{path::PathBuf, process::ExitCode};

use clap::{error::ErrorKind, Parser as ClapParser};
use colored::Colorize;

use kotlite::{
    driver::{self, CompileOptions},
    error::CompileError,
};

#[derive(Debug, ClapParser)]
#[command(version, about = "Compiler for the kotlite language", long_about = None)]
struct Args {
    /// Input source file
    input: PathBuf,

    /// Write the linked binary to this path
    #[arg(short = 'o')]
    output: Option<PathBuf>,

    /// Print the textual SSA IR to stdout
    #[arg(long)]
    dump_ir: bool,

    /// Print the backend's LLVM IR to stdout
    #[arg(long)]
    dump_llvm: bool,

    /// Link and execute the program
    #[arg(long)]
    run: bool,
}

fn main() -> ExitCode {
    // Anything short of success exits with code 1; help and version keep
    // clap's zero exit
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                error.exit();
            }

            let _ = error.print();
            return ExitCode::FAILURE;
        }
    };

    // With neither an output path nor a dump flag, compile and run
    let run = args.run || (args.output.is_none() && !args.dump_ir && !args.dump_llvm);

    let options = CompileOptions {
        input: args.input,
        output: args.output,
        dump_ir: args.dump_ir,
        dump_llvm: args.dump_llvm,
        run,
    };

    match driver::compile(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CompileError::Semantic(errors)) => {
            eprintln!("{}", "Semantic Errors:".red().bold());
            for error in errors {
                eprintln!("  {error}");
            }
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("{} {error}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
