use std::fmt;

use thiserror::Error;

use crate::parser::Location;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SemanticError {
    #[error("symbol '{0}' is redeclared")]
    Redeclared(String),

    #[error("'{0}' declared as an array with an index that is not greater than 0")]
    InvalidArrayDimension(String),

    #[error("'{0}' declared as an array too large to be addressed")]
    ArrayTooLarge(String),

    #[error("invalid operands to binary operator '{op}' ('{left}' and '{right}')")]
    InvalidBinaryOperands {
        op: String,
        left: String,
        right: String,
    },

    #[error("invalid operand to unary operator '{op}' ('{operand}')")]
    InvalidUnaryOperand { op: String, operand: String },

    #[error("the expression of condition must be boolean type")]
    NonBooleanCondition,

    #[error("too few/much arguments provided for function '{0}'")]
    ArgumentCountMismatch(String),

    #[error("incompatible type passing '{arg}' to parameter of type '{param}'")]
    IncompatibleArgument { arg: String, param: String },

    #[error("call of non-function symbol '{0}'")]
    NonFunctionCall(String),

    #[error("use of undeclared symbol '{0}'")]
    UndeclaredSymbol(String),

    #[error("use of non-variable symbol '{0}'")]
    NonVariableSymbol(String),

    #[error("index of array reference must be an integer")]
    NonIntegerIndex,

    #[error("there is an over array subscript on '{0}'")]
    OverSubscript(String),

    #[error("array assignment is not allowed")]
    ArrayAssignment,

    #[error("cannot assign to variable '{0}' which is a constant")]
    AssignToConstant(String),

    #[error("the value of loop variable cannot be modified inside the loop body")]
    AssignToLoopVariable,

    #[error("assigning to '{target}' from incompatible type '{value}'")]
    IncompatibleAssignment { target: String, value: String },

    #[error("variable reference of read statement cannot be a constant or loop variable")]
    ReadConstantOrLoopVariable,

    #[error("variable reference of read statement must be scalar type")]
    ReadNonScalar,

    #[error("expression of print statement must be scalar type")]
    PrintNonScalar,

    #[error("the lower bound and upper bound of iteration count must be in the incremental order")]
    NonIncrementalLoopBounds,

    #[error("bound of iteration count must be an integer, found '{0}'")]
    NonIntegerLoopBound(String),

    #[error("program/procedure should not return a value")]
    ReturnFromVoid,

    #[error("return '{value}' from a function with return type '{expected}'")]
    IncompatibleReturn { value: String, expected: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub location: Location,
    pub error: SemanticError,
}

impl Diagnostic {
    pub fn new(location: Location, error: SemanticError) -> Self {
        Self { location, error }
    }

    /// The message line followed by the offending source line and a caret
    /// under the reported column.
    pub fn render(&self, source: &str) -> String {
        let line = source
            .lines()
            .nth((self.location.line as usize).saturating_sub(1))
            .unwrap_or("");
        let padding = " ".repeat((self.location.col as usize).saturating_sub(1));
        format!("{}\n    {}\n    {}^\n", self, line, padding)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Error> Found in line {}, column {}: {}",
            self.location.line, self.location.col, self.error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_echoes_line_and_caret() {
        let source = "test;\nbegin\n    x := 1;\nend\nend\n";
        let diagnostic = Diagnostic::new(
            Location::new(3, 5),
            SemanticError::UndeclaredSymbol("x".to_string()),
        );
        assert_eq!(
            diagnostic.render(source),
            "<Error> Found in line 3, column 5: use of undeclared symbol 'x'\n        x := 1;\n        ^\n"
        );
    }
}
