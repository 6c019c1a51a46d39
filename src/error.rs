use std::path::PathBuf;

use thiserror::Error;

use crate::middle::ty::Type;

/// The parser aborts on the first mismatch; there is no recovery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Parse error at line {line}, col {column}: {message}")]
pub struct ParseError {
    pub message: &'static str,
    pub line: usize,
    pub column: usize,
}

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Error at line {line}, col {column}: {kind}")]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemanticErrorKind {
    #[error("Function '{name}' is already defined.")]
    FunctionRedefined { name: String },
    #[error("Unknown type '{ty}' for parameter '{name}'.")]
    UnknownParameterType { name: String, ty: String },
    #[error("Type {ty} is not supported for parameter '{name}'.")]
    UnsupportedParameterType { name: String, ty: Type },
    #[error("Parameter '{name}' is already defined.")]
    ParameterRedefined { name: String },
    #[error("Unknown return type '{ty}'.")]
    UnknownReturnType { ty: String },
    #[error("Type {ty} is not supported as a return type.")]
    UnsupportedReturnType { ty: Type },
    #[error("Unknown type '{ty}'.")]
    UnknownType { ty: String },
    #[error("Type mismatch: declared {declared} but initialized with {initialized}.")]
    VarDeclTypeMismatch { declared: Type, initialized: Type },
    #[error("Cannot bind a value of type {ty} to a variable.")]
    UnsupportedBindingType { ty: Type },
    #[error("Variable '{name}' is already defined in this scope.")]
    VariableRedefined { name: String },
    #[error("Variable '{name}' is not defined.")]
    UndefinedVariable { name: String },
    #[error("Cannot reassign 'val' variable '{name}'.")]
    ReassignImmutable { name: String },
    #[error("Type mismatch in assignment to '{name}'. Expected {expected}, got {actual}.")]
    AssignmentTypeMismatch {
        name: String,
        expected: Type,
        actual: Type,
    },
    #[error("Condition of 'if' must be Boolean.")]
    IfConditionNotBoolean,
    #[error("Condition of 'while' must be Boolean.")]
    WhileConditionNotBoolean,
    #[error("Return type mismatch. Expected {expected}, got {actual}.")]
    ReturnTypeMismatch { expected: Type, actual: Type },
    #[error("'break' outside of a loop.")]
    BreakOutsideLoop,
    #[error("'continue' outside of a loop.")]
    ContinueOutsideLoop,
    #[error("Arithmetic operators require Int operands.")]
    ArithmeticOperands,
    #[error("Equality operators require operands of the same type.")]
    EqualityOperands,
    #[error("Equality operators require Int or Boolean operands.")]
    EqualityUnsupportedOperands,
    #[error("Comparison operators require Int operands.")]
    ComparisonOperands,
    #[error("Logical operators require Boolean operands.")]
    LogicalOperands,
    #[error("Unary minus requires Int operand.")]
    UnaryMinusOperand,
    #[error("Unary NOT requires Boolean operand.")]
    UnaryNotOperand,
    #[error("Integer literal '{value}' is out of range.")]
    IntegerOutOfRange { value: String },
    #[error("Float literals are not supported.")]
    FloatLiteralUnsupported,
    #[error("String literals are not supported.")]
    StringLiteralUnsupported,
    #[error("null literals are not supported.")]
    NullLiteralUnsupported,
    #[error("Function '{name}' is not defined.")]
    UndefinedFunction { name: String },
    #[error("Function '{name}' expects {expected} arguments, but got {actual}.")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("Argument {index} of '{name}' expects {expected}, but got {actual}.")]
    ArgumentTypeMismatch {
        index: usize,
        name: String,
        expected: Type,
        actual: Type,
    },
}

/// Top level failure of a single compilation, as reported by the driver.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("semantic analysis failed with {} error(s)", .0.len())]
    Semantic(Vec<SemanticError>),
    #[error("Could not write {path}: {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to invoke '{command}': {source}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Compilation failed during linking.")]
    LinkFailed,
}
