//! opalc-drv - Compiler driver.
//!
//! Orchestrates the pipeline: read the source file, lex, sanitize, parse,
//! lower to an LLVM module, verify it, then JIT-compile and run `.main`,
//! printing the program's exit value and an execution-time line.
//!
//! Stage boundaries consult the shared diagnostic handler:
//!
//! - lexical errors abort before parsing (the token stream contains garbage
//!   the parser would only cascade on);
//! - syntax errors are reported but the recovered program (failed
//!   statements dropped) still lowers and runs - the process exits non-zero
//!   regardless;
//! - lowering errors abort before execution.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, Context as _, Result};
use clap::Parser as ClapParser;
use inkwell::context::Context;
use inkwell::execution_engine::JitFunction;
use inkwell::targets::{InitializationConfig, Target, TargetMachine};
use inkwell::OptimizationLevel;

use opalc_lex::{sanitize, Lexer};
use opalc_low::Lowerer;
use opalc_par::Parser;
use opalc_util::{Handler, SourceMap};

/// Compiler and JIT runner for the Opal language.
#[derive(Debug, ClapParser)]
#[command(name = "opalc", version, about = "Compiler and JIT runner for the Opal language")]
pub struct Cli {
    /// Source file to compile and run.
    pub source_file: PathBuf,

    /// Print the sanitized token stream.
    #[arg(long)]
    pub emit_tokens: bool,

    /// Print the parsed program.
    #[arg(long)]
    pub emit_ast: bool,

    /// Print the LLVM IR of the lowered module.
    #[arg(long)]
    pub emit_ir: bool,

    /// Stop after verifying the IR instead of running it.
    #[arg(long)]
    pub no_run: bool,

    /// Verbose pipeline logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Signature of the synthetic entry function.
type MainFn = unsafe extern "C" fn() -> i64;

/// Runs the full pipeline. Returns the process exit code.
pub fn run(cli: &Cli) -> Result<i32> {
    init_logging(cli.verbose);

    let source = std::fs::read_to_string(&cli.source_file)
        .with_context(|| format!("cannot read source file '{}'", cli.source_file.display()))?;

    let handler = Handler::new();
    let mut sources = SourceMap::new();
    let file = sources.add(cli.source_file.display().to_string(), source.clone());

    // Phase 1: lexing + automatic semicolon insertion.
    let tokens = sanitize(Lexer::new(&source, file, &handler).tokenize());
    log::info!("lexed {} token(s)", tokens.len());

    if cli.emit_tokens {
        for token in &tokens {
            println!(
                "{:?} {:?} [line {}, col {}]",
                token.kind, token.literal, token.span.start.line, token.span.start.column
            );
        }
    }

    if handler.has_errors() {
        handler.report(&sources);
        return Ok(1);
    }

    // Phase 2: parsing (with panic-mode recovery).
    let program = {
        let mut parser = Parser::new(tokens, &handler);
        parser.parse_program()
    };
    log::info!("parsed {} top-level statement(s)", program.len());

    if cli.emit_ast {
        println!("{:#?}", program);
    }

    // Syntax errors are reported here, before any program output; the
    // recovered program still lowers and runs.
    let errors_after_parse = handler.error_count();
    handler.report(&sources);

    // Phase 3: lowering to LLVM IR.
    let context = Context::create();
    let mut lowerer = Lowerer::new(&context, &handler, &mut sources);
    let lower_result = lowerer.lower_program(&program);
    let module = lowerer.finish();

    if let Err(err) = lower_result {
        handler.report(&sources);
        eprintln!("error: {}", err);
        return Ok(1);
    }
    if handler.error_count() > errors_after_parse {
        handler.report(&sources);
        return Ok(1);
    }

    module.set_triple(&TargetMachine::get_default_triple());

    if let Err(err) = module.verify() {
        eprintln!("LLVM IR verification error: {}", err.to_string());
        return Ok(1);
    }

    if cli.emit_ir {
        println!("{}", module.print_to_string().to_string());
    }

    // Surface anything lowering added (import re-use warnings etc.) before
    // the program's own output; the handler's report cursor keeps the
    // diagnostics printed at earlier boundaries from repeating.
    handler.report(&sources);

    if cli.no_run {
        return Ok(if handler.has_errors() { 1 } else { 0 });
    }

    // Phase 4: JIT execution.
    Target::initialize_native(&InitializationConfig::default())
        .map_err(|err| anyhow!("failed to initialize native target: {}", err))?;

    let engine = module
        .create_jit_execution_engine(OptimizationLevel::Aggressive)
        .map_err(|err| anyhow!("failed to create execution engine: {}", err))?;

    // Map the runtime support symbols; printf/memcpy/strlen/pow resolve
    // from the host process.
    if let Some(function) = module.get_function("alloc") {
        engine.add_global_mapping(&function, opalc_runtime::alloc as usize);
    }
    if let Some(function) = module.get_function("_strcat") {
        engine.add_global_mapping(&function, opalc_runtime::_strcat as usize);
    }

    let main_fn: JitFunction<'_, MainFn> = unsafe { engine.get_function(".main") }
        .context("entry function '.main' not found in module")?;

    log::info!("running '.main'");
    let started = Instant::now();
    let result = unsafe { main_fn.call() };
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    println!("\nProgram returned: {}", result);
    println!("=== Executed in {:.6} ms. ===", elapsed_ms);

    Ok(if handler.has_errors() { 1 } else { 0 })
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    let _ = simple_logger::SimpleLogger::new().with_level(level).init();
}
