use kotlite::{
    error::SemanticError,
    frontend::{lexer::Lexer, parser::Parser},
    middle::semantic::SemanticAnalyzer,
};
use pretty_assertions::assert_eq;

fn analyze(source: &str) -> Vec<SemanticError> {
    let file = Parser::parse(Lexer::new(source).tokenize()).expect("source should parse");

    let mut analyzer = SemanticAnalyzer::new();
    analyzer.analyze(&file);
    analyzer.errors().to_vec()
}

fn messages(source: &str) -> Vec<String> {
    analyze(source).iter().map(|e| e.to_string()).collect()
}

#[test]
fn valid_program() {
    let source = "fun main() {\n\
                  \x20   val x: Int = 42\n\
                  \x20   var y = x + 10\n\
                  \x20   if (y > 50) {\n\
                  \x20       print_i32(y)\n\
                  \x20   }\n\
                  }";

    assert_eq!(messages(source), Vec::<String>::new());
}

#[test]
fn initializer_type_mismatch() {
    let errors = messages("fun main() { val x: Int = true }");

    assert!(!errors.is_empty());
    assert!(errors[0].contains("Type mismatch"), "got: {}", errors[0]);
}

#[test]
fn undefined_variable_assignment() {
    let errors = messages("fun main() { x = 10 }");

    assert!(!errors.is_empty());
    assert!(errors[0].contains("not defined"), "got: {}", errors[0]);
}

#[test]
fn reassigning_val_is_rejected() {
    let errors = messages("fun main() { val x = 10\n x = 20 }");

    assert!(!errors.is_empty());
    assert!(errors[0].contains("Cannot reassign 'val'"), "got: {}", errors[0]);
}

#[test]
fn builtin_argument_type_mismatch() {
    let errors = messages("fun main() { print_i32(true) }");

    assert!(!errors.is_empty());
    assert!(
        errors[0].contains("expects Int, but got Boolean"),
        "got: {}",
        errors[0]
    );
}

#[test]
fn return_type_mismatch() {
    let errors = messages("fun foo(): Int { return true }");

    assert!(!errors.is_empty());
    assert!(errors[0].contains("Return type mismatch"), "got: {}", errors[0]);
}

#[test]
fn errors_carry_line_and_column() {
    let errors = analyze("fun main() {\n    val x = 10\n    x = 20\n}");

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line, 3);
    assert_eq!(errors[0].column, 5);
    assert_eq!(
        errors[0].to_string(),
        "Error at line 3, col 5: Cannot reassign 'val' variable 'x'."
    );
}

#[test]
fn duplicate_function_names() {
    let errors = messages("fun f() {}\nfun f() {}");

    assert!(errors.iter().any(|e| e.contains("Function 'f' is already defined.")));
}

#[test]
fn duplicate_parameter_names() {
    let errors = messages("fun f(a: Int, a: Int) {}");

    assert!(errors.iter().any(|e| e.contains("Parameter 'a' is already defined.")));
}

#[test]
fn parameters_are_immutable() {
    let errors = messages("fun f(a: Int) { a = 1 }");

    assert!(errors.iter().any(|e| e.contains("Cannot reassign 'val' variable 'a'.")));
}

#[test]
fn unknown_declared_type() {
    let errors = messages("fun main() { val x: Foo = 1 }");

    assert!(errors.iter().any(|e| e.contains("Unknown type 'Foo'.")));
}

#[test]
fn unknown_parameter_type() {
    let errors = messages("fun f(a: Bar) {}");

    assert!(errors
        .iter()
        .any(|e| e.contains("Unknown type 'Bar' for parameter 'a'.")));
}

#[test]
fn arity_mismatch() {
    let errors = messages("fun main() { print_i32(1, 2) }");

    assert!(errors
        .iter()
        .any(|e| e.contains("'print_i32' expects 1 arguments, but got 2.")));
}

#[test]
fn undefined_function_call() {
    let errors = messages("fun main() { missing() }");

    assert!(errors.iter().any(|e| e.contains("Function 'missing' is not defined.")));
}

#[test]
fn functions_may_be_called_before_their_declaration() {
    let source = "fun main() { helper(1) }\nfun helper(x: Int) { print_i32(x) }";

    assert_eq!(messages(source), Vec::<String>::new());
}

#[test]
fn if_condition_must_be_boolean_with_real_position() {
    let errors = analyze("fun main() { if (1) {} }");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Condition of 'if' must be Boolean."));
    assert_eq!((errors[0].line, errors[0].column), (1, 18));
}

#[test]
fn while_condition_must_be_boolean() {
    let errors = messages("fun main() { while (1 + 2) {} }");

    assert!(errors
        .iter()
        .any(|e| e.contains("Condition of 'while' must be Boolean.")));
}

#[test]
fn arithmetic_requires_int_operands() {
    let errors = messages("fun main() { val x = true + 1 }");

    assert!(errors
        .iter()
        .any(|e| e.contains("Arithmetic operators require Int operands.")));
}

#[test]
fn logical_operators_require_booleans() {
    let errors = messages("fun main() { val x = 1 && true }");

    assert!(errors
        .iter()
        .any(|e| e.contains("Logical operators require Boolean operands.")));
}

#[test]
fn equality_requires_same_types() {
    let errors = messages("fun main() { val x = 1 == true }");

    assert!(errors
        .iter()
        .any(|e| e.contains("Equality operators require operands of the same type.")));
}

#[test]
fn unary_operators_check_their_operand() {
    let errors = messages("fun main() { val x = -true\n val y = !1 }");

    assert!(errors.iter().any(|e| e.contains("Unary minus requires Int operand.")));
    assert!(errors.iter().any(|e| e.contains("Unary NOT requires Boolean operand.")));
}

#[test]
fn break_and_continue_outside_a_loop() {
    let errors = messages("fun main() { break\n continue }");

    assert!(errors.iter().any(|e| e.contains("'break' outside of a loop.")));
    assert!(errors.iter().any(|e| e.contains("'continue' outside of a loop.")));
}

#[test]
fn break_inside_a_loop_is_fine() {
    let source = "fun main() { while (true) { break } }";

    assert_eq!(messages(source), Vec::<String>::new());
}

#[test]
fn float_and_string_literals_are_rejected() {
    let errors = messages("fun main() { val x = 1.5\n val y = \"hi\" }");

    assert!(errors.iter().any(|e| e.contains("Float literals are not supported.")));
    assert!(errors.iter().any(|e| e.contains("String literals are not supported.")));
}

#[test]
fn null_literal_is_rejected() {
    let errors = messages("fun main() { val x = null }");

    assert!(errors.iter().any(|e| e.contains("null literals are not supported.")));
}

#[test]
fn unit_values_cannot_be_bound() {
    let errors = messages("fun helper() {}\nfun main() { val x = helper() }");

    assert!(errors
        .iter()
        .any(|e| e.contains("Cannot bind a value of type Unit to a variable.")));
}

#[test]
fn integer_literal_out_of_range() {
    let errors = messages("fun main() { val x = 99999999999 }");

    assert!(errors
        .iter()
        .any(|e| e.contains("Integer literal '99999999999' is out of range.")));
}

#[test]
fn analysis_continues_past_the_first_error() {
    let errors = analyze("fun main() { val x = 10\n x = 20\n y = 1\n print_i32(true) }");

    assert_eq!(errors.len(), 3);
}

#[test]
fn blocks_open_their_own_scope() {
    // Shadowing in a nested block is allowed; using the binding after the
    // block ends is not
    let errors = messages("fun main() { val x = 1\n { val x = 2 }\n { val t = 3 }\n print_i32(t) }");

    assert!(errors.iter().any(|e| e.contains("Variable 't' is not defined.")));
}

#[test]
fn redeclaration_in_the_same_scope_is_rejected() {
    let errors = messages("fun main() { val x = 1\n val x = 2 }");

    assert!(errors
        .iter()
        .any(|e| e.contains("Variable 'x' is already defined in this scope.")));
}

#[test]
fn function_body_shares_the_parameter_scope() {
    let errors = messages("fun f(x: Int) { val x = 1 }");

    assert!(errors
        .iter()
        .any(|e| e.contains("Variable 'x' is already defined in this scope.")));
}

#[test]
fn user_defined_call_types_flow_through() {
    let source = "fun double(x: Int): Int { return x * 2 }\n\
                  fun main() { val y = double(4)\n print_i32(y) }";

    assert_eq!(messages(source), Vec::<String>::new());
}

#[test]
fn return_without_value_in_int_function() {
    let errors = messages("fun f(): Int { return }");

    assert!(errors
        .iter()
        .any(|e| e.contains("Return type mismatch. Expected Int, got Unit.")));
}

#[test]
fn float_return_type_is_unsupported() {
    let errors = messages("fun f(): Float { return 1 }");

    assert!(errors
        .iter()
        .any(|e| e.contains("Type Float is not supported as a return type.")));
}
