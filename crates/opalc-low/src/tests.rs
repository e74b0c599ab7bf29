//! Lowering tests.
//!
//! These run the full front end (lex, sanitize, parse) and lower the result,
//! then check the produced IR textually and through LLVM's module verifier.

use inkwell::context::Context;
use opalc_lex::{sanitize, Lexer};
use opalc_par::Parser;
use opalc_util::{Handler, SourceMap};

use crate::Lowerer;

/// Lowers a program that is expected to be clean and returns the verified
/// module's IR.
fn lower_to_ir(source: &str) -> String {
    let handler = Handler::new();
    let mut sources = SourceMap::new();
    let file = sources.add("test.opal", source);

    let tokens = sanitize(Lexer::new(source, file, &handler).tokenize());
    let program = Parser::new(tokens, &handler).parse_program();
    assert!(
        !handler.has_errors(),
        "front end failed: {:?}",
        handler.diagnostics()
    );

    let context = Context::create();
    let mut lowerer = Lowerer::new(&context, &handler, &mut sources);
    lowerer.lower_program(&program).expect("lowering failed");
    assert!(
        !handler.has_errors(),
        "lowering reported errors: {:?}",
        handler.diagnostics()
    );

    let module = lowerer.finish();
    module
        .verify()
        .unwrap_or_else(|e| panic!("module does not verify: {}", e));
    module.print_to_string().to_string()
}

/// Lowers a program expected to produce a user-level diagnostic of `kind`.
fn lower_expect_error(source: &str, kind: &str) {
    let handler = Handler::new();
    let mut sources = SourceMap::new();
    let file = sources.add("test.opal", source);

    let tokens = sanitize(Lexer::new(source, file, &handler).tokenize());
    let program = Parser::new(tokens, &handler).parse_program();
    assert!(!handler.has_errors(), "source must parse cleanly");

    let context = Context::create();
    let mut lowerer = Lowerer::new(&context, &handler, &mut sources);
    let _ = lowerer.lower_program(&program);

    assert!(
        handler.diagnostics().iter().any(|d| d.kind == kind),
        "expected a '{}' diagnostic, got {:?}",
        kind,
        handler.diagnostics()
    );
}

#[test]
fn empty_program_returns_zero() {
    let ir = lower_to_ir("");
    assert!(ir.contains(".main"));
    assert!(ir.contains("ret i64 0"));
}

#[test]
fn arithmetic_with_precedence() {
    let ir = lower_to_ir("var x: int = 2 + 3 * 4;\nprint(\"%d\\n\", x);");
    assert!(ir.contains("@printf"));
    assert!(ir.contains("@alloc"));
    assert!(ir.contains("@memcpy"));
}

#[test]
fn uninitialized_vars_get_defaults() {
    let ir = lower_to_ir("var a: int; var b: float; var c: bool; var d: str;");
    assert!(ir.contains("@a"));
    assert!(ir.contains("@d"));
}

#[test]
fn void_var_has_no_default() {
    lower_expect_error("var v: void;", "Type Error");
}

#[test]
fn redeclaration_reuses_slot() {
    // Two `var x` in the same frame: one global, two stores.
    let ir = lower_to_ir("var x: int = 1; var x: int = 2;");
    let globals = ir.matches("@x").count();
    // One definition plus uses; not two distinct globals (@x and @x.1).
    assert!(!ir.contains("@x.1"), "unexpected second slot: {}", ir);
    assert!(globals >= 2);
}

#[test]
fn assignment_requires_existing_name() {
    lower_expect_error("x = 3;", "Name Error");
}

#[test]
fn mixed_numeric_promotion_uses_sitofp() {
    let ir = lower_to_ir("var a: int = 3; var b: float = 2.5;\nprint(\"%f\\n\", a + b);");
    assert!(ir.contains("sitofp"));
    assert!(ir.contains("fadd"));
}

#[test]
fn pow_on_integers_stays_double() {
    let ir = lower_to_ir("print(\"%f\\n\", 2 ** 10);");
    assert!(ir.contains("@pow"));
    // No truncation back to integer.
    assert!(!ir.contains("fptosi"));
}

#[test]
fn string_concatenation_calls_strcat() {
    let ir = lower_to_ir("var s: str = \"hello \";\ns += \"world\";\nprint(\"%s\\n\", s);");
    assert!(ir.contains("@_strcat"));
}

#[test]
fn string_plus_operator_concatenates() {
    let ir = lower_to_ir("var s: str = \"a\" + \"b\";");
    assert!(ir.contains("@_strcat"));
}

#[test]
fn len_lowers_to_strlen() {
    let ir = lower_to_ir("var s: str = \"abc\"; var n: int = len(s);");
    assert!(ir.contains("@strlen"));
}

#[test]
fn recursion_binds_function_inside_itself() {
    let ir = lower_to_ir(
        "def fact(n: int) -> int:\n    if n <= 1: return 1 end\n    return n * fact(n - 1);\nend\nprint(\"%d\\n\", fact(10));",
    );
    assert!(ir.contains("define i64 @fact"));
    assert!(ir.contains("call i64 @fact"));
}

#[test]
fn while_loop_retests_condition() {
    let ir = lower_to_ir(
        "var i: int = 0; var s: int = 0;\nwhile i < 10:\n    i += 1;\n    if i == 3: continue end\n    if i == 8: break end\n    s += i;\nend\nprint(\"%d\\n\", s);",
    );
    assert!(ir.contains("while_loop_entry"));
    assert!(ir.contains("while_loop_otherwise"));
}

#[test]
fn break_outside_loop_is_reported() {
    lower_expect_error("break;", "Control-flow Error");
}

#[test]
fn continue_outside_loop_is_reported() {
    lower_expect_error("continue;", "Control-flow Error");
}

#[test]
fn module_variables_are_reachable_from_functions() {
    let ir = lower_to_ir("var g: int = 41;\ndef bump() -> int: return g + 1; end\nprint(\"%d\\n\", bump());");
    assert!(ir.contains("@g = global i64 0"));
}

#[test]
fn closures_are_rejected() {
    let source = "def outer() -> int:\n    var x: int = 1;\n    def inner() -> int: return x; end\n    return inner();\nend";
    let handler = Handler::new();
    let mut sources = SourceMap::new();
    let file = sources.add("test.opal", source);
    let tokens = sanitize(Lexer::new(source, file, &handler).tokenize());
    let program = Parser::new(tokens, &handler).parse_program();
    assert!(!handler.has_errors());

    let context = Context::create();
    let mut lowerer = Lowerer::new(&context, &handler, &mut sources);
    let _ = lowerer.lower_program(&program);

    let diagnostics = handler.diagnostics();
    assert!(diagnostics
        .iter()
        .any(|d| d.message.contains("closures are not supported")));
}

#[test]
fn function_locals_are_unreachable_from_module_scope() {
    lower_expect_error(
        "def f() -> int: var local: int = 1; return local; end\nprint(\"%d\\n\", local);",
        "Name Error",
    );
}

#[test]
fn function_locals_use_allocas_not_globals() {
    let ir = lower_to_ir("def f() -> int: var local: int = 1; return local; end\nf();");
    assert!(ir.contains("alloca i64"));
    assert!(!ir.contains("@local"));
}

#[test]
fn call_to_undefined_function_is_reported() {
    lower_expect_error("missing();", "Name Error");
}

#[test]
fn calling_a_variable_is_reported() {
    lower_expect_error("var x: int = 1; x();", "Type Error");
}

#[test]
fn argument_count_mismatch_is_reported() {
    lower_expect_error("def f(a: int) -> int: return a; end\nf(1, 2);", "Type Error");
}

#[test]
fn void_call_as_value_is_reported() {
    lower_expect_error(
        "def noop() -> void: var x: int = 1; end\nvar y: int = noop();",
        "Type Error",
    );
}

#[test]
fn void_function_call_statement_is_fine() {
    let ir = lower_to_ir("def noop() -> void: var x: int = 1; end\nnoop();");
    assert!(ir.contains("define void @noop"));
    assert!(ir.contains("call void @noop"));
}

#[test]
fn string_operands_reject_arithmetic() {
    lower_expect_error("var s: str = \"a\" * \"b\";", "Type Error");
}

#[test]
fn unary_operators() {
    // Constant negations fold; the stored values carry the sign.
    let ir = lower_to_ir("var a: int = -5; var b: float = -2.5; var c: bool = not 0;");
    assert!(ir.contains("i64 -5"));
}

#[test]
fn comparisons_produce_bool_conditions() {
    let ir = lower_to_ir("var x: int = 1;\nif x >= 0:\n    x = 2;\nelse:\n    x = 3;\nend");
    assert!(ir.contains("icmp sge"));
    assert!(ir.contains("if_then"));
    assert!(ir.contains("if_else"));
    assert!(ir.contains("if_merge"));
}

#[test]
fn non_bool_condition_is_reported() {
    lower_expect_error("if 1: var x: int = 1; end", "Type Error");
}

#[test]
fn top_level_return_sets_exit_code() {
    let ir = lower_to_ir("return 7;");
    assert!(ir.contains("ret i64 7"));
}

#[test]
fn statements_after_return_go_to_dead_block() {
    // Must verify even with unreachable trailing statements.
    let ir = lower_to_ir("return 1;\nvar x: int = 2;");
    assert!(ir.contains("after_return"));
}

mod imports {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create temp source");
        file.write_all(contents.as_bytes()).expect("write temp source");
        path
    }

    fn run(source: &str) -> (Handler, std::result::Result<(), crate::LowerError>, String) {
        let handler = Handler::new();
        let mut sources = SourceMap::new();
        let file = sources.add("main.opal", source);
        let tokens = sanitize(Lexer::new(source, file, &handler).tokenize());
        let program = Parser::new(tokens, &handler).parse_program();

        let context = Context::create();
        let mut lowerer = Lowerer::new(&context, &handler, &mut sources);
        let result = lowerer.lower_program(&program);
        let ir = lowerer.finish().print_to_string().to_string();
        (handler, result, ir)
    }

    #[test]
    fn import_lowers_into_current_block() {
        let dir = tempfile::tempdir().unwrap();
        let lib = write_file(&dir, "lib.opal", "var shared: int = 10;\n");

        let source = format!("import \"{}\";\nprint(\"%d\\n\", shared);", lib.display());
        let (handler, result, ir) = run(&source);
        assert!(result.is_ok());
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        assert!(ir.contains("@shared"));
    }

    #[test]
    fn reimport_warns_once_and_emits_no_code() {
        let dir = tempfile::tempdir().unwrap();
        let lib = write_file(&dir, "lib.opal", "var once: int = 1;\n");

        let source = format!(
            "import \"{p}\";\nimport \"{p}\";",
            p = lib.display()
        );
        let (handler, result, _) = run(&source);
        assert!(result.is_ok());
        assert!(!handler.has_errors());
        assert_eq!(handler.warning_count(), 1);
    }

    #[test]
    fn missing_import_is_reported() {
        let (handler, _, _) = run("import \"/no/such/file.opal\";");
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.kind == "Import Error"));
    }

    #[test]
    fn broken_import_aborts_compilation() {
        let dir = tempfile::tempdir().unwrap();
        let lib = write_file(&dir, "broken.opal", "var x int = ;\n");

        let source = format!("import \"{}\";", lib.display());
        let (handler, result, _) = run(&source);
        assert!(matches!(result, Err(crate::LowerError::ImportFailed(_))));
        assert!(handler.has_errors());
    }

    #[test]
    fn cyclic_import_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = dir.path().join("a.opal");
        let b_path = dir.path().join("b.opal");
        std::fs::write(&a_path, format!("import \"{}\";\n", b_path.display())).unwrap();
        std::fs::write(&b_path, format!("import \"{}\";\n", a_path.display())).unwrap();

        let source = format!("import \"{}\";", a_path.display());
        let (handler, _, _) = run(&source);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("cyclic import")));
    }
}
