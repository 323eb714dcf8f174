//! End-to-end language tests: compile and run small scripts and check
//! their `PRINT` output and diagnostics.

use std::sync::Arc;

use linescript::{Error, MemberRegistry, MemorySink, Script, ScriptConfig, Severity};

/// Compile and run a script, returning the run result and the sink
fn run(source: &str) -> (Result<(), Error>, MemorySink) {
    let mut sink = MemorySink::new();
    let compiled = Script::compile(
        source,
        Arc::new(MemberRegistry::with_stdlib()),
        &ScriptConfig::default(),
        &mut sink,
    );
    match compiled {
        Ok(mut script) => {
            let result = script.run(&mut sink);
            (result, sink)
        }
        Err(e) => (Err(e), sink),
    }
}

/// Run a script expected to succeed and collect its output lines
fn output(source: &str) -> Vec<String> {
    let (result, sink) = run(source);
    if let Err(e) = result {
        panic!("script failed: {e}\ndiagnostics: {:?}", sink.entries());
    }
    sink.output_lines().iter().map(|s| s.to_string()).collect()
}

fn compile_fails(source: &str) -> MemorySink {
    let (result, sink) = run(source);
    match result {
        Err(Error::ParseFailed { .. }) => sink,
        other => panic!("expected a compile failure, got {other:?}"),
    }
}

fn run_fails(source: &str) -> (Error, MemorySink) {
    let (result, sink) = run(source);
    match result {
        Err(e @ Error::ParseFailed { .. }) => {
            panic!("expected a runtime failure, got compile failure {e}")
        }
        Err(e) => (e, sink),
        Ok(()) => panic!("expected a runtime failure, script succeeded"),
    }
}

// --- arithmetic and precedence ---

#[test]
fn arithmetic_precedence_and_associativity() {
    assert_eq!(output("PRINT 2 + 3 * 4"), vec!["14"]);
    assert_eq!(output("PRINT (2 + 3) * 4"), vec!["20"]);
    assert_eq!(output("PRINT 10 - 3 - 2"), vec!["5"]);
    assert_eq!(output("PRINT 100 / 10 / 5"), vec!["2"]);
    assert_eq!(output("PRINT 2 ** 3"), vec!["8"]);
}

#[test]
fn division_forms() {
    assert_eq!(output("PRINT 7 / 2"), vec!["3.5"]);
    assert_eq!(output("PRINT 7 // 2"), vec!["3"]);
    assert_eq!(output("PRINT -7 // 2"), vec!["-3"]);
    assert_eq!(output("PRINT 7 % 3"), vec!["1"]);
    assert_eq!(output("PRINT -7 % 3"), vec!["-1"]);
}

#[test]
fn mixed_numeric_widening() {
    assert_eq!(output("PRINT 1 + 0.5"), vec!["1.5"]);
    assert_eq!(output("PRINT 2 * 2.5"), vec!["5"]);
    assert_eq!(output("PRINT 1.5 // 1"), vec!["1"]);
}

#[test]
fn integer_arithmetic_is_exact_at_the_range_edge() {
    assert_eq!(
        output("int x = std.maxInt\nx -= 1\nPRINT x"),
        vec![(i64::MAX - 1).to_string()]
    );
    assert_eq!(
        output("PRINT std.maxInt - 2 + 1"),
        vec![(i64::MAX - 1).to_string()]
    );
    assert_eq!(output("PRINT 9007199254740993 + 1"), vec!["9007199254740994"]);
}

#[test]
fn unary_minus() {
    assert_eq!(output("PRINT -5 + 3"), vec!["-2"]);
    assert_eq!(output("PRINT 2 * -3"), vec!["-6"]);
    assert_eq!(output("PRINT -(2 + 3)"), vec!["-5"]);
}

// --- strings ---

#[test]
fn string_operators() {
    assert_eq!(output("PRINT \"a\" + \"b\""), vec!["ab"]);
    assert_eq!(output("PRINT \"a\" + 1"), vec!["a1"]);
    assert_eq!(output("PRINT 1 + \"a\""), vec!["1a"]);
    assert_eq!(output("PRINT \"ab\" * 3"), vec!["ababab"]);
    assert_eq!(output("PRINT \"ab\" * 0"), vec![""]);
}

#[test]
fn character_operator() {
    assert_eq!(output("PRINT $ 97"), vec!["a"]);
    assert_eq!(output("PRINT $ \"abc\""), vec!["97"]);
    assert_eq!(output("PRINT $ \"\""), vec!["0"]);
}

#[test]
fn string_members() {
    assert_eq!(output("string s = \"hello\"\nPRINT s.len"), vec!["5"]);
    assert_eq!(output("string s = \"hello\"\nPRINT s.get(1)"), vec!["e"]);
}

#[test]
fn string_escapes_and_comments() {
    assert_eq!(output(r#"PRINT "say \"hi\"" # trailing comment"#), vec!["say \"hi\""]);
    assert_eq!(output(r##"PRINT "a#b""##), vec!["a#b"]);
}

// --- booleans and comparisons ---

#[test]
fn logic_operators() {
    assert_eq!(output("PRINT True && False"), vec!["false"]);
    assert_eq!(output("PRINT True || False"), vec!["true"]);
    assert_eq!(output("PRINT True ^ True"), vec!["false"]);
    assert_eq!(output("PRINT ! True"), vec!["false"]);
    assert_eq!(output("PRINT True | False"), vec!["true"]);
    assert_eq!(output("PRINT True & False"), vec!["false"]);
}

#[test]
fn comparisons() {
    assert_eq!(output("PRINT 2 < 3"), vec!["true"]);
    assert_eq!(output("PRINT 3 <= 3"), vec!["true"]);
    assert_eq!(output("PRINT 2 > 3"), vec!["false"]);
    assert_eq!(output("PRINT 2 == 2.0"), vec!["true"]);
    assert_eq!(output("PRINT 2 != 3"), vec!["true"]);
    assert_eq!(output("PRINT \"a\" == \"a\""), vec!["true"]);
}

#[test]
fn ternary_expressions() {
    assert_eq!(output("PRINT True ? 1 : 2"), vec!["1"]);
    // chains nest to the right
    assert_eq!(output("PRINT False ? 1 : True ? 2 : 3"), vec!["2"]);
    assert_eq!(output("PRINT False ? 1 : False ? 2 : 3"), vec!["3"]);
    // the dead branch of a constant condition is never evaluated
    assert_eq!(output("PRINT False ? 1 / 0 : 5"), vec!["5"]);
}

// --- variables and assignment ---

#[test]
fn declarations_take_defaults() {
    assert_eq!(output("int x\nPRINT x"), vec!["0"]);
    assert_eq!(output("float f\nPRINT f"), vec!["0"]);
    assert_eq!(output("bool b\nPRINT b"), vec!["false"]);
    assert_eq!(output("string s\nPRINT s"), vec![""]);
    assert_eq!(output("vector2 v\nPRINT v"), vec!["(0, 0)"]);
}

#[test]
fn numeric_assignment_converts() {
    assert_eq!(output("int x\nx = 2.9\nPRINT x"), vec!["2"]);
    assert_eq!(output("float f = 1\nPRINT f"), vec!["1"]);
    assert_eq!(output("int x = 7\nx /= 2\nPRINT x"), vec!["3"]);
}

#[test]
fn compound_assignment() {
    assert_eq!(output("int x = 1\nx += 4\nx *= 2\nx -= 3\nPRINT x"), vec!["7"]);
    assert_eq!(output("string s = \"a\"\ns += 1\nPRINT s"), vec!["a1"]);
    assert_eq!(output("string s = \"ab\"\ns *= 2\nPRINT s"), vec!["abab"]);
    assert_eq!(output("bool b\nb |= True\nPRINT b"), vec!["true"]);
}

#[test]
fn use_before_declaration_fails() {
    compile_fails("PRINT x\nint x");
    compile_fails("int x = x + 1");
}

#[test]
fn redeclaration_fails() {
    compile_fails("int x\nfloat x");
}

#[test]
fn incompatible_assignment_fails() {
    compile_fails("int x\nx = \"text\"");
    compile_fails("bool b\nb = 1");
    compile_fails("int x\nx += \"a\"");
}

// --- control flow ---

#[test]
fn if_elif_else_takes_first_match() {
    let source = "\
int x = 2
if x == 1
PRINT \"one\"
cls
elif x == 2
PRINT \"two\"
cls
elif x > 0
PRINT \"positive\"
cls
else
PRINT \"other\"
cls";
    assert_eq!(output(source), vec!["two"]);
}

#[test]
fn else_branch_runs_when_nothing_matches() {
    let source = "\
int x = 9
if x == 1
PRINT \"one\"
cls
else
PRINT \"other\"
cls";
    assert_eq!(output(source), vec!["other"]);
}

#[test]
fn numeric_guard_uses_default_truthiness() {
    let source = "\
int i = 3
while i
i -= 1
cls
PRINT i";
    assert_eq!(output(source), vec!["0"]);
}

#[test]
fn while_loop_with_break() {
    let source = "\
int i
always
i += 1
if i == 3
break
cls
cls
PRINT i";
    assert_eq!(output(source), vec!["3"]);
}

#[test]
fn continue_skips_rest_of_iteration() {
    let source = "\
int i
int sum
while i < 5
i += 1
if i == 3
continue
cls
sum += i
cls
PRINT sum";
    assert_eq!(output(source), vec!["12"]);
}

#[test]
fn break_stops_only_the_inner_loop() {
    let source = "\
int total
int i
for i = 0 ; i < 3 ; i += 1
always
break
cls
total += 1
cls
PRINT total";
    assert_eq!(output(source), vec!["3"]);
}

#[test]
fn for_loop_forms() {
    let source = "\
int sum
int i
for i = 1 ; i < 4 ; i += 1
sum += i
cls
PRINT sum";
    assert_eq!(output(source), vec!["6"]);

    let source = "\
int sum
int i = 1
for i < 4 ; i += 1
sum += i
cls
PRINT sum";
    assert_eq!(output(source), vec!["6"]);
}

#[test]
fn for_step_runs_after_continue() {
    let source = "\
int hits
int i
for i = 0 ; i < 4 ; i += 1
if i == 2
continue
cls
hits += 1
cls
PRINT hits";
    assert_eq!(output(source), vec!["3"]);
}

#[test]
fn top_level_break_fails() {
    let (error, _) = run_fails("break");
    assert_eq!(error, Error::InvalidBreak);
    let (error, _) = run_fails("continue");
    assert_eq!(error, Error::InvalidContinue);
}

#[test]
fn unclosed_block_fails() {
    compile_fails("while True\nPRINT 1");
}

// --- switch ---

#[test]
fn switch_takes_first_matching_case() {
    let source = "\
int x = 2
switch x
case 1
PRINT \"one\"
cls
case 2 3
PRINT \"few\"
cls
default
PRINT \"many\"
cls";
    assert_eq!(output(source), vec!["few"]);
}

#[test]
fn switch_default_runs_when_nothing_matches() {
    let source = "\
int x = 9
switch x
case 1
PRINT \"one\"
cls
default
PRINT \"many\"
cls";
    assert_eq!(output(source), vec!["many"]);
}

#[test]
fn switch_unifies_int_and_float() {
    let source = "\
float x = 2
switch x
case 2
PRINT \"hit\"
cls
default
PRINT \"miss\"
cls";
    assert_eq!(output(source), vec!["hit"]);
}

#[test]
fn switch_matches_variable_cases_at_run_time() {
    let source = "\
int target = 5
int x = 5
switch x
case target
PRINT \"hit\"
cls
default
PRINT \"miss\"
cls";
    assert_eq!(output(source), vec!["hit"]);
}

#[test]
fn switch_without_default_fails() {
    compile_fails("int x\nswitch x\ncase 1\nPRINT 1\ncls");
}

#[test]
fn switch_warns_on_bad_case_values() {
    let source = "\
int x
switch x
case 1 1 \"a\"
PRINT 1
cls
default
cls";
    let (result, sink) = run(source);
    assert!(result.is_ok());
    assert_eq!(sink.count(Severity::Warning), 2);
}

// --- vectors ---

#[test]
fn vector_construction_and_members() {
    assert_eq!(output("vector2 v = vector2(3, 4)\nPRINT v.magnitude"), vec!["5"]);
    assert_eq!(output("vector2 v = vector2(3, 4)\nPRINT v.x"), vec!["3"]);
    assert_eq!(output("vector2 v = vector2(3, 4)\nPRINT v.sqrMagnitude"), vec!["25"]);
    assert_eq!(
        output("vector2 v = vector2(3, 4)\nPRINT v.normalized"),
        vec!["(0.6, 0.8)"]
    );
    assert_eq!(
        output("vector2 v = vector2(1, 2)\nPRINT v.perpendicular"),
        vec!["(-2, 1)"]
    );
}

#[test]
fn vector_arithmetic() {
    assert_eq!(
        output("PRINT vector2(1, 2) + vector2(3, 4)"),
        vec!["(4, 6)"]
    );
    assert_eq!(
        output("PRINT vector2(3, 4) - vector2(1, 1)"),
        vec!["(2, 3)"]
    );
    assert_eq!(output("PRINT vector2(1, 2) * 3"), vec!["(3, 6)"]);
    assert_eq!(output("PRINT vector2(4, 6) / 2"), vec!["(2, 3)"]);
    assert_eq!(
        output("PRINT vector2(1, 2) * vector2(3, 4)"),
        vec!["(3, 8)"]
    );
    assert_eq!(output("PRINT -vector2(1, 2)"), vec!["(-1, -2)"]);
}

// --- host members ---

#[test]
fn std_constants() {
    assert_eq!(
        output("PRINT std.pi"),
        vec![std::f64::consts::PI.to_string()]
    );
    assert_eq!(output("PRINT std.maxInt"), vec![i64::MAX.to_string()]);
}

#[test]
fn unknown_member_fails_at_compile_time() {
    compile_fails("string s\nPRINT s.size");
    compile_fails("PRINT std.tau");
}

// --- runtime errors ---

#[test]
fn division_by_zero_fails_at_run_time() {
    let (error, sink) = run_fails("PRINT 1 / 0");
    assert_eq!(error, Error::DivisionByZero);
    assert_eq!(sink.count(Severity::RuntimeError), 1);

    let (error, _) = run_fails("int x\nPRINT 10 // x");
    assert_eq!(error, Error::DivisionByZero);
    let (error, _) = run_fails("int x\nPRINT 10 % x");
    assert_eq!(error, Error::DivisionByZero);
}

#[test]
fn invalid_power_fails_at_run_time() {
    let (error, _) = run_fails("PRINT 0 ** 0");
    assert!(matches!(error, Error::InvalidPower { .. }));
    let (error, _) = run_fails("PRINT 0 ** -1");
    assert!(matches!(error, Error::InvalidPower { .. }));
    let (error, _) = run_fails("PRINT -2 ** 0.5");
    assert!(matches!(error, Error::InvalidPower { .. }));
    // a negative base with an integer exponent is fine
    assert_eq!(output("PRINT -2 ** 2"), vec!["4"]);
}

#[test]
fn oversized_string_repeat_fails_at_run_time() {
    let (error, _) = run_fails("PRINT \"ab\" * 4611686018427387904");
    assert!(matches!(error, Error::RuntimeError(_)));
}

#[test]
fn vector_division_by_zero_fails() {
    let (error, _) = run_fails("PRINT vector2(1, 2) / 0");
    assert_eq!(error, Error::DivisionByZero);
}

#[test]
fn output_stops_at_the_failing_statement() {
    let (_, sink) = run_fails("PRINT 1\nint x\nPRINT 2 // x\nPRINT 3");
    assert_eq!(sink.output_lines(), vec!["1"]);
}

// --- larger programs ---

#[test]
fn fizzbuzz_program() {
    let source = "\
int i
string out
for i = 1 ; i <= 15 ; i += 1
out = \"\"
if i % 3 == 0
out += \"Fizz\"
cls
if i % 5 == 0
out += \"Buzz\"
cls
if out.len == 0
out = \"\" + i
cls
PRINT out
cls";
    let lines = output(source);
    assert_eq!(lines.len(), 15);
    assert_eq!(lines[0], "1");
    assert_eq!(lines[2], "Fizz");
    assert_eq!(lines[4], "Buzz");
    assert_eq!(lines[14], "FizzBuzz");
}

#[test]
fn gcd_program() {
    let source = "\
int a = 252
int b = 105
int t
while b != 0
t = b
b = a % b
a = t
cls
PRINT a";
    assert_eq!(output(source), vec!["21"]);
}
