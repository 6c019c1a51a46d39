//! Orchestrates a single compilation: lex, parse, analyze, lower to SSA,
//! emit LLVM IR, and (when asked for a binary) link it against the C
//! runtime with clang.

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use crate::{
    backend::llvm,
    error::CompileError,
    frontend::{lexer::Lexer, parser::Parser},
    middle::{semantic::SemanticAnalyzer, ssa::ast_lowering},
};

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub input: PathBuf,
    /// Where to place the linked binary; defaults to `program`
    pub output: Option<PathBuf>,
    pub dump_ir: bool,
    pub dump_llvm: bool,
    pub run: bool,
}

pub fn compile(options: &CompileOptions) -> Result<(), CompileError> {
    let source = fs::read_to_string(&options.input).map_err(|source| CompileError::Io {
        path: options.input.clone(),
        source,
    })?;

    let tokens = Lexer::new(&source).tokenize();
    let file = Parser::parse(tokens)?;

    let mut analyzer = SemanticAnalyzer::new();
    analyzer.analyze(&file);

    if !analyzer.errors().is_empty() {
        return Err(CompileError::Semantic(analyzer.errors().to_vec()));
    }

    let signatures = analyzer.function_signatures();
    let module = ast_lowering::generate(&file, &signatures);

    if options.dump_ir {
        println!("--- Custom IR ---");
        println!("{}", module.dump());
    }

    let llvm_ir = llvm::emit_module(&module);

    if options.dump_llvm {
        println!("--- LLVM IR ---");
        println!("{llvm_ir}");
    }

    if options.output.is_some() || options.run {
        link_and_maybe_run(options, &llvm_ir)?;
    }

    Ok(())
}

fn link_and_maybe_run(options: &CompileOptions, llvm_ir: &str) -> Result<(), CompileError> {
    let ll_path = PathBuf::from("output.ll");

    fs::write(&ll_path, llvm_ir).map_err(|source| CompileError::WriteOutput {
        path: ll_path.clone(),
        source,
    })?;

    let binary = options
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("program"));

    let status = Command::new("clang")
        .args(["-O3", "-Wno-override-module"])
        .arg(&ll_path)
        .arg(runtime_path())
        .arg("-o")
        .arg(&binary)
        .status()
        .map_err(|source| CompileError::CommandFailed {
            command: "clang".to_owned(),
            source,
        })?;

    if !status.success() {
        return Err(CompileError::LinkFailed);
    }

    if options.run {
        let binary = if binary.components().count() == 1 {
            Path::new(".").join(&binary)
        } else {
            binary
        };

        Command::new(&binary)
            .status()
            .map_err(|source| CompileError::CommandFailed {
                command: binary.display().to_string(),
                source,
            })?;
    } else {
        println!("Binary generated: {}", binary.display());
    }

    Ok(())
}

fn runtime_path() -> PathBuf {
    let local = Path::new("runtime/runtime.c");

    if local.exists() {
        local.to_path_buf()
    } else {
        PathBuf::from("../runtime/runtime.c")
    }
}
