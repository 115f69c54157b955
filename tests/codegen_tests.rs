use std::collections::HashSet;

use pcc::codegen::CodegenError;
use pcc::{compile, CompileError, CompileOptions};
use rstest::rstest;

fn generate(source: &str) -> String {
    let _ = env_logger::builder().is_test(true).try_init();
    compile(source, "test.p", &CompileOptions::default()).unwrap()
}

fn lines(asm: &str) -> Vec<&str> {
    asm.lines().collect()
}

/// Position of the first line equal to `line` at or after `from`.
fn find_from(asm: &[&str], from: usize, line: &str) -> usize {
    asm[from..]
        .iter()
        .position(|l| *l == line)
        .map(|i| i + from)
        .unwrap_or_else(|| panic!("{:?} not found after line {}", line, from))
}

fn label_definitions(asm: &str) -> Vec<String> {
    asm.lines()
        .filter(|l| !l.starts_with(' ') && l.ends_with(':'))
        .map(|l| l.trim_end_matches(':').to_string())
        .collect()
}

fn branch_targets(asm: &str) -> Vec<String> {
    asm.lines()
        .map(str::trim)
        .filter(|l| l.starts_with("j ") || l.starts_with("beq ") || l.starts_with("bge "))
        .filter_map(|l| l.split_whitespace().last())
        .map(str::to_string)
        .collect()
}

const CONTROL_FLOW: &str = "test;
var n: integer;
fact(k: integer): integer
begin
    if k <= 1 then
    begin
        return 1;
    end
    end if
    return k * fact(k - 1);
end
end
begin
    var i: integer;
    read n;
    i := 0;
    while i < n do
    begin
        if i mod 2 = 0 then
        begin
            print fact(i);
        end
        else
        begin
            print i;
        end
        end if
        i := i + 1;
    end
    end do
    for j := 1 to 10 do
    begin
        for m := 0 to 3 do
        begin
            print j * m;
        end
        end do
    end
    end do
end
end";

#[test]
fn labels_are_unique_and_defined() {
    let asm = generate(CONTROL_FLOW);
    let defined = label_definitions(&asm);
    let unique: HashSet<_> = defined.iter().cloned().collect();
    assert_eq!(unique.len(), defined.len(), "duplicate label in\n{}", asm);

    let targets = branch_targets(&asm);
    assert!(!targets.is_empty());
    for target in targets {
        assert!(unique.contains(&target), "undefined label {}", target);
    }
}

#[test]
fn header_and_main() {
    let asm = generate("test;\nbegin\nend\nend");
    let asm = lines(&asm);
    assert_eq!(
        &asm[..4],
        &[
            "    .file \"test.p\"",
            "    .option nopic",
            ".section    .text",
            "    .align 2",
        ]
    );
    let main = find_from(&asm, 0, "main:");
    assert_eq!(
        &asm[main + 1..],
        &[
            "    addi sp, sp, -128",
            "    sw ra, 124(sp)",
            "    sw s0, 120(sp)",
            "    addi s0, sp, 128",
            "    lw ra, 124(sp)",
            "    lw s0, 120(sp)",
            "    addi sp, sp, 128",
            "    jr ra",
            "    .size main, .-main",
        ]
    );
}

#[test]
fn if_else_uses_three_labels() {
    let asm = generate(
        "test;
var b: boolean;
begin
    if b then
    begin
        print 1;
    end
    else
    begin
        print 2;
    end
    end if
end
end",
    );
    let labels: Vec<_> = label_definitions(&asm)
        .into_iter()
        .filter(|l| l.starts_with(".L"))
        .collect();
    assert_eq!(labels, vec![".L000", ".L001", ".L002"]);

    let asm = lines(&asm);
    let branch = find_from(&asm, 0, "    beq t0, zero, .L001");
    let then_label = find_from(&asm, branch, ".L000:");
    let jump = find_from(&asm, then_label, "    j .L002");
    let else_label = find_from(&asm, jump, ".L001:");
    let join = find_from(&asm, else_label, ".L002:");
    assert!(asm[then_label..jump].contains(&"    jal ra, printInt"));
    assert!(asm[else_label..join].contains(&"    jal ra, printInt"));
}

#[test]
fn if_without_else_uses_two_labels() {
    let asm = generate(
        "test;
begin
    if true then
    begin
        print 1;
    end
    end if
end
end",
    );
    assert_eq!(label_definitions(&asm), vec!["main", ".L000", ".L001"]);
}

#[test]
fn locals_get_descending_offsets() {
    let asm = generate(
        "test;
begin
    var a: integer;
    var b: integer;
    var arr: array 3 of integer;
    var c: integer;
    a := 1;
    b := 2;
    c := 3;
    arr[0] := 4;
end
end",
    );
    let asm = lines(&asm);
    let a = find_from(&asm, 0, "    addi t0, s0, -12");
    let b = find_from(&asm, a, "    addi t0, s0, -16");
    let c = find_from(&asm, b, "    addi t0, s0, -32");
    find_from(&asm, c, "    addi t0, s0, -28");
}

#[test]
fn nested_compound_continues_the_frame() {
    let asm = generate(
        "test;
begin
    var a: integer;
    begin
        var b: integer;
        b := a;
    end
end
end",
    );
    let asm = lines(&asm);
    let store_b = find_from(&asm, 0, "    addi t0, s0, -16");
    find_from(&asm, store_b, "    addi t0, s0, -12");
}

#[test]
fn globals_live_in_data_sections() {
    let asm = generate(
        "test;
var g: integer;
var grid: array 2 of array 3 of integer;
var k: 7;
var pi: 3.14;
var yes: true;
begin
    g := k;
    grid[1][2] := g;
end
end",
    );
    assert!(asm.contains(".comm g, 4, 4\n"));
    assert!(asm.contains(".comm grid, 24, 4\n"));
    assert!(asm.contains("    .type k, @object\nk:\n    .word 7\n"));
    assert!(asm.contains("pi:\n    .float 3.14\n"));
    assert!(asm.contains("yes:\n    .word 1\n"));
    assert!(asm.contains("    la t0, grid\n"));
    assert!(asm.contains("    la t0, k\n"));
}

#[test]
fn literals_are_pooled_after_main() {
    let asm = generate(
        "test;
begin
    var s: string;
    var r: real;
    s := \"hello\";
    r := 1.5;
    s := \"again\";
    print \"bye\";
end
end",
    );
    let end_of_main = asm.find(".size main, .-main").unwrap();
    let pooled = &asm[end_of_main..];
    assert!(pooled.contains("s:\n    .string \"hello\"\n"));
    assert!(pooled.contains("r:\n    .float 1.5\n"));
    assert!(pooled.contains("s.1:\n    .string \"again\"\n"));
    assert!(pooled.contains(".LC0:\n    .string \"bye\"\n"));
    assert!(asm[..end_of_main].contains("    flw ft0, %lo(r)(t0)\n"));
}

#[test]
fn function_calls_use_argument_registers() {
    let asm = generate(
        "test;
add(a, b: integer): integer
begin
    return a + b;
end
end
begin
    print add(1, 2);
end
end",
    );
    let asm = lines(&asm);
    let add = find_from(&asm, 0, "add:");
    find_from(&asm, add, "    sw a0, -12(s0)");
    find_from(&asm, add, "    sw a1, -16(s0)");
    let ret = find_from(&asm, add, "    j .L000");
    let exit = find_from(&asm, ret, ".L000:");
    assert_eq!(asm[exit + 1], "    lw ra, 124(sp)");

    let main = find_from(&asm, exit, "main:");
    let second = find_from(&asm, main, "    lw a1, 0(sp)");
    let first = find_from(&asm, second, "    lw a0, 0(sp)");
    let call = find_from(&asm, first, "    jal ra, add");
    assert_eq!(asm[call + 1], "    addi sp, sp, -4");
    assert_eq!(asm[call + 2], "    sw a0, 0(sp)");
}

#[test]
fn array_parameters_are_copied() {
    let asm = generate(
        "test;
var v: array 2 of integer;
sum(w: array 2 of integer): integer
begin
    return w[0] + w[1];
end
end
begin
    print sum(v);
end
end",
    );
    let asm = lines(&asm);
    let sum = find_from(&asm, 0, "sum:");
    let first = find_from(&asm, sum, "    lw t6, 0(a0)");
    assert_eq!(asm[first + 1], "    sw t6, -16(s0)");
    assert_eq!(asm[first + 2], "    lw t6, 4(a0)");
    assert_eq!(asm[first + 3], "    sw t6, -12(s0)");
}

#[rstest]
#[case("r := 1 + 2.5;", "    fcvt.s.w ft0, t0")]
#[case("r := i;", "    fcvt.s.w ft0, t0")]
#[case("print r / 2.0;", "    fdiv.s ft0, ft0, ft1")]
#[case("print r >= i;", "    fle.s t0, ft1, ft0")]
#[case("print i = 3;", "    seqz t0, t0")]
#[case("print i <> 3;", "    snez t0, t0")]
#[case("print i mod 3;", "    rem t0, t0, t1")]
#[case("print -r;", "    fneg.s ft0, ft0")]
#[case("print not (i < 2);", "    xori t0, t0, 1")]
#[case("print r;", "    jal ra, printReal")]
#[case("print s + s;", "    jal ra, concatString")]
#[case("read s;", "    jal ra, readString")]
#[case("read r;", "    fsw fa0, 0(t1)")]
fn expression_lowering(#[case] stmt: &str, #[case] expected: &str) {
    let asm = generate(&format!(
        "test;
var i: integer;
var r: real;
var s: string;
begin
    {}
end
end",
        stmt
    ));
    assert!(
        asm.lines().any(|l| l == expected),
        "{:?} missing from\n{}",
        expected,
        asm
    );
}

#[test]
fn for_loop_exits_on_upper_bound() {
    let asm = generate(
        "test;
begin
    for i := 1 to 3 do
    begin
        print i;
    end
    end do
end
end",
    );
    let asm = lines(&asm);
    let test = find_from(&asm, 0, ".L000:");
    let exit = find_from(&asm, test, "    bge t0, t1, .L002");
    let body = find_from(&asm, exit, ".L001:");
    let back = find_from(&asm, body, "    j .L000");
    assert_eq!(asm[back - 2], "    addi t0, t0, 1");
    assert_eq!(asm[back + 1], ".L002:");
}

#[test]
fn too_many_arguments() {
    let result = compile(
        "test;
f(a, b, c, d, e, g, h, i, j, k, l, m, n, o, p: integer)
begin
end
end
begin
end
end",
        "test.p",
        &CompileOptions::default(),
    );
    match result {
        Err(CompileError::Codegen(CodegenError::TooManyArguments { count, max, .. })) => {
            assert_eq!(count, 15);
            assert_eq!(max, 14);
        }
        other => panic!("{:?}", other),
    }
}

#[test]
fn locals_beyond_offset_range_are_rejected() {
    let result = compile(
        "test;
begin
    var a: array 268435456 of integer;
    var b: array 268435456 of integer;
    b[0] := 1;
end
end",
        "test.p",
        &CompileOptions::default(),
    );
    match result {
        Err(CompileError::Codegen(CodegenError::FrameOverflow(name))) => assert_eq!(name, "b"),
        other => panic!("{:?}", other),
    }
}

#[test]
fn pooled_labels_skip_runtime_routines() {
    let asm = generate(
        "test;
begin
    var printString: string;
    printString := \"x\";
    print printString;
end
end",
    );
    assert!(asm.contains("printString.1:\n    .string \"x\"\n"));
    assert!(!asm.lines().any(|l| l == "printString:"));
    assert!(asm.lines().any(|l| l == "    jal ra, printString"));
}

