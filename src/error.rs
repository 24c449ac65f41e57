use std::fmt::{self, Display};

use crate::object::Object;
use crate::token::{Location, Token, Type};

/// Every diagnostic type can write itself to the error stream. Formatting
/// lives in the `Display` impls so tests can assert on the exact text.
pub trait Report: Display {
    fn report(&self) {
        eprintln!("{self}");
    }
}

/// An error produced while scanning. These are character-level problems like
/// an unterminated string or a stray symbol.
#[derive(Debug)]
pub struct ScanError {
    pub location: Location,
    pub message: String,
}

impl Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[line {line}] Error: {message}",
            line = self.location.line,
            message = self.message
        )
    }
}

impl Report for ScanError {}

/// An error produced while parsing, anchored to the token the parser was
/// looking at when it gave up.
#[derive(Debug)]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.token.r#type == Type::EOF {
            write!(
                f,
                "[line {line}] Error at end: {message}",
                line = self.token.location.line,
                message = self.message
            )
        } else {
            write!(
                f,
                "[line {line}] Error at '{lexeme}': {message}",
                line = self.token.location.line,
                lexeme = self.token.lexeme,
                message = self.message
            )
        }
    }
}

impl Report for ParseError {}

/// An error produced during resolution. Syntactically valid code that is
/// semantically wrong, like reading a local in its own initializer.
#[derive(Debug)]
pub struct ResolveError {
    pub token: Token,
    pub message: String,
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[line {line}] Error at '{lexeme}': {message}",
            line = self.token.location.line,
            lexeme = self.token.lexeme,
            message = self.message
        )
    }
}

impl Report for ResolveError {}

/// An error produced at runtime. Aborts the current script; the message is
/// printed first and the offending line on its own trailing line.
#[derive(Debug)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{message}\n[line {line}]",
            message = self.message,
            line = self.token.location.line
        )
    }
}

impl Report for RuntimeError {}

/// A control-flow signal unwinding out of statement execution. `Return` is
/// not an error: it carries the value of a `return` statement up to the
/// nearest call frame, which swallows it. `Error` keeps unwinding to the
/// top level.
#[derive(Debug)]
pub enum Unwind {
    Return(Object),
    Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Error(error)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scan_error_format() {
        let error = ScanError {
            location: Location::new(3, 7),
            message: "Unexpected character '@'.".to_string(),
        };
        assert_eq!(error.to_string(), "[line 3] Error: Unexpected character '@'.");
    }

    #[test]
    fn parse_error_format_at_token() {
        let error = ParseError {
            token: Token::new(Type::Equal, "=".to_string(), None, Location::new(2, 4)),
            message: "Invalid assignment target.".to_string(),
        };
        assert_eq!(error.to_string(), "[line 2] Error at '=': Invalid assignment target.");
    }

    #[test]
    fn parse_error_format_at_end() {
        let error = ParseError {
            token: Token::new(Type::EOF, String::new(), None, Location::new(5, 0)),
            message: "Expect expression.".to_string(),
        };
        assert_eq!(error.to_string(), "[line 5] Error at end: Expect expression.");
    }

    #[test]
    fn runtime_error_format() {
        let error = RuntimeError {
            token: Token::new(Type::Minus, "-".to_string(), None, Location::new(1, 10)),
            message: "Operands must be numbers.".to_string(),
        };
        assert_eq!(error.to_string(), "Operands must be numbers.\n[line 1]");
    }
}
