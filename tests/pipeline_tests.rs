use tacbasic::frontend::parser_error::SyntaxKind;
use tacbasic::runtime::RuntimeError;
use tacbasic::{Artifact, AsmConfig, AsmSyntax, BufferConsole, Error, VmBcConfig};

/// Output written so far, plus how the run ended.
fn run_vm(source: &str, input: &str) -> (String, Result<(), Error>) {
    let artifact = tacbasic::compile_to_bytecode(source).expect("program should compile");
    let mut console = BufferConsole::with_input(input);
    let result = tacbasic::run_bytecode(&artifact, &mut console, limited());
    (console.into_output(), result)
}

fn run_interp(source: &str, input: &str) -> (String, Result<(), Error>) {
    let tac = tacbasic::compile_to_tac(source).expect("program should compile");
    let mut console = BufferConsole::with_input(input);
    let result = tacbasic::run_tac(&tac, &mut console, limited());
    (console.into_output(), result)
}

fn limited() -> VmBcConfig {
    VmBcConfig {
        max_steps: Some(100_000),
        ..VmBcConfig::default()
    }
}

/// Runs both engines and checks they agree; returns the common output.
fn run_both(source: &str, input: &str) -> String {
    let (vm_out, vm_result) = run_vm(source, input);
    let (tac_out, tac_result) = run_interp(source, input);
    assert_eq!(vm_out, tac_out, "outputs differ for:\n{}", source);
    vm_result.expect("bytecode run should succeed");
    tac_result.expect("tac run should succeed");
    vm_out
}

fn compile_error(source: &str) -> tacbasic::frontend::parser_error::ParserError {
    match tacbasic::compile_to_bytecode(source) {
        Err(Error::Syntax(err)) => err,
        other => panic!("expected a syntax error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_sum_program_prints_three() {
    let source = "10 DIM I AS INTEGER\n20 I = 1 + 2\n30 PRINT I\n40 END\n";
    assert_eq!(run_both(source, ""), "3\n");
}

#[test]
fn test_concat_program_prints_ab() {
    let source = "10 DIM S AS STRING\n20 S = \"a\" + \"b\"\n30 PRINT S\n40 END\n";
    assert_eq!(run_both(source, ""), "ab\n");
}

#[test]
fn test_engines_agree_on_sample_programs() {
    let cases = [
        (
            "10 DIM I AS INTEGER\n20 DIM J AS INTEGER\n30 I = 7\n40 J = I * 3 - 4 / 2\n50 PRINT I; \" \"; J\n60 PRINT 10 - 3 - 2\n",
            "",
            "7 19\n5\n",
        ),
        ("10 PRINT (0 - 7) / 2\n20 PRINT 2 * (3 + 4)\n", "", "-3\n14\n"),
        (
            "10 DIM N AS INTEGER\n20 DIM T AS INTEGER\n30 INPUT \"n? \"; N\n40 T = T + N\n50 N = N - 1\n60 IF N = 0 THEN GOTO 80\n70 GOTO 40\n80 PRINT \"total \"; T\n",
            "4\n",
            "n? total 10\n",
        ),
        (
            "10 DIM A AS STRING\n20 DIM B AS STRING\n30 INPUT \"\"; A\n40 INPUT \"\"; B\n50 IF A = B THEN PRINT \"same\"\n60 IF A + B = \"xy\" THEN PRINT A; B\n",
            "x\ny\n",
            "xy\n",
        ),
        (
            "10 DIM S AS STRING\n20 PRINT \"[\"; S; \"]\"\n30 S = \"say \"\"hi\"\"\"\n40 PRINT S\n",
            "",
            "[]\nsay \"hi\"\n",
        ),
        ("10 DIM N AS INTEGER\n20 INPUT \"\"; N\n30 PRINT N\n", "  -12abc\n", "-12\n"),
        ("10 PRINT 2147483647 + 1\n", "", "-2147483648\n"),
        (
            "10 PRINT (0 - 2147483647 - 1) / (0 - 1)\n",
            "",
            "-2147483648\n",
        ),
        ("10 GOTO 30\n20 PRINT \"skipped\"\n30 PRINT \"done\"\n40 DIM X AS INTEGER\n", "", "done\n"),
    ];
    for (source, input, expected) in cases {
        assert_eq!(run_both(source, input), expected, "program:\n{}", source);
    }
}

#[test]
fn test_runtime_errors_match_across_engines() {
    let source = "10 DIM N AS INTEGER\n20 PRINT \"before\"\n30 PRINT 1 / N\n";
    let (vm_out, vm_result) = run_vm(source, "");
    let (tac_out, tac_result) = run_interp(source, "");
    assert_eq!(vm_out, "before\n");
    assert_eq!(vm_out, tac_out);
    for result in [vm_result, tac_result] {
        assert!(matches!(
            result,
            Err(Error::Runtime(RuntimeError::DivisionByZero { .. }))
        ));
    }

    let source = "10 DIM S AS STRING\n20 INPUT \"? \"; S\n";
    for (out, result) in [run_vm(source, ""), run_interp(source, "")] {
        assert_eq!(out, "? ");
        assert!(matches!(result, Err(Error::Runtime(RuntimeError::InputExhausted))));
    }
}

#[test]
fn test_step_limit_applies_to_both_engines() {
    let source = "10 PRINT 1\n20 GOTO 10\n";
    for (_, result) in [run_vm(source, ""), run_interp(source, "")] {
        assert!(matches!(
            result,
            Err(Error::Runtime(RuntimeError::StepLimit(100_000)))
        ));
    }
}

#[test]
fn test_artifact_reserialization_is_idempotent() {
    let sources = [
        "10 DIM I AS INTEGER\n20 I = 1 + 2\n30 PRINT I\n40 END\n",
        "10 DIM S AS STRING\n20 INPUT \"name: \"; S\n30 IF S = \"\" THEN GOTO 20\n40 PRINT \"hi \"; S\n",
    ];
    for source in sources {
        let bytes = tacbasic::compile_to_bytes(source).unwrap();
        let artifact = Artifact::from_bytes(&bytes).unwrap();
        assert_eq!(artifact.to_bytes().unwrap(), bytes);
        assert_eq!(artifact, tacbasic::compile_to_bytecode(source).unwrap());
    }
}

#[test]
fn test_loaded_artifact_runs_the_same() {
    let source = "10 DIM N AS INTEGER\n20 N = 3\n30 PRINT N\n40 N = N - 1\n50 IF N = 0 THEN END\n60 GOTO 30\n";
    let bytes = tacbasic::compile_to_bytes(source).unwrap();
    let artifact = Artifact::from_bytes(&bytes).unwrap();
    let mut console = BufferConsole::new();
    tacbasic::run_bytecode(&artifact, &mut console, VmBcConfig::default()).unwrap();
    assert_eq!(console.output(), "3\n2\n1\n");
}

#[test]
fn test_tac_image_round_trip_runs() {
    let tac = tacbasic::compile_to_tac("10 PRINT \"img\"; 42\n").unwrap();
    let bytes = tacbasic::tac::image::to_bytes(&tac).unwrap();
    let loaded = tacbasic::tac::image::from_bytes(&bytes).unwrap();
    assert_eq!(loaded, tac);
    let mut console = BufferConsole::new();
    tacbasic::run_tac(&loaded, &mut console, VmBcConfig::default()).unwrap();
    assert_eq!(console.output(), "img42\n");
}

#[test]
fn test_type_error_names_operand_types_and_line() {
    let err = compile_error("10 DIM I AS INTEGER\n20 I = 1 + \"x\"\n");
    assert_eq!(err.kind, SyntaxKind::Type);
    assert_eq!(err.line, Some(20));
    let shown = err.to_string();
    assert!(shown.contains("int"), "{}", shown);
    assert!(shown.contains("str"), "{}", shown);
    assert!(shown.contains("line 20"), "{}", shown);
}

#[test]
fn test_undefined_goto_fails_compilation() {
    let err = compile_error("10 PRINT 1\n20 GOTO 99\n");
    assert_eq!(err.kind, SyntaxKind::Parse);
    assert!(err.message.contains("99"));
    assert!(tacbasic::compile_to_asm("10 GOTO 99\n", &AsmConfig::default()).is_err());
}

#[test]
fn test_control_bytes_in_string_literals_are_rejected() {
    let source = "10 DIM S AS STRING\n20 PRINT \"a\0b\"; S\n";
    let err = compile_error(source);
    assert_eq!(err.kind, SyntaxKind::Lex);
    assert_eq!(err.line, Some(20));
    assert!(tacbasic::compile_to_asm(source, &AsmConfig::default()).is_err());
}

#[test]
fn test_line_numbers_must_increase_before_codegen() {
    let err = compile_error("10 PRINT 1\n10 PRINT 2\n");
    assert_eq!(err.kind, SyntaxKind::Parse);
    assert!(matches!(
        tacbasic::compile_to_tac("20 END\n10 END\n"),
        Err(Error::Syntax(_))
    ));
}

#[test]
fn test_assembly_for_both_dialects() {
    let source = "10 DIM S AS STRING\n20 S = \"a\" + \"b\"\n30 PRINT S\n40 END\n";
    let gas = tacbasic::compile_to_asm(source, &AsmConfig::default()).unwrap();
    assert!(gas.contains("call\tconcat_str"));
    assert!(gas.contains("call\tprint_str"));
    assert!(gas.contains("main:"));

    let config = AsmConfig {
        syntax: AsmSyntax::Nasm,
        symbol_prefix: "_".to_string(),
    };
    let nasm = tacbasic::compile_to_asm(source, &config).unwrap();
    assert!(nasm.contains("\textern _concat_str\n"));
    assert!(nasm.contains("\tglobal _main\n"));
    assert!(nasm.contains("section .rodata"));
    assert!(nasm.trim_end().ends_with("ret"));
}
