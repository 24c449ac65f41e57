#![allow(clippy::needless_return)]

//! Loxide is a tree-walking interpreter for Lox, a small dynamically typed
//! language with lexical scoping, first-class functions, closures and
//! single-inheritance classes. The interpreter runs a source text through
//! four passes, each of which only starts if the previous one succeeded.
//!
//! ## Scanning
//! The [`scanner`](scanner) walks the characters of the source and produces
//! a flat list of [`Token`](token::Token)s, always terminated by `EOF`.
//! Lexical errors (a stray character, an unterminated string) are reported
//! immediately and scanning continues, so one run surfaces every problem in
//! the file.
//!
//! ## Parsing
//! The [`parser`](parser) is a hand-written recursive descent parser that
//! turns the tokens into [`Expr`](expr::Expr) and [`Stmt`](stmt::Stmt)
//! trees. Operator precedence lives in the call structure, one method per
//! level. On a syntax error the parser synchronizes to the next statement
//! boundary and keeps going; the broken declaration is dropped.
//!
//! ## Resolving
//! The [`resolver`](resolver) makes a single static pass over the tree and
//! computes, for every variable use, the number of environments between the
//! use and the binding it refers to. Those distances are what make closures
//! capture the scope that existed at declaration time rather than whatever
//! happens to be live when they run. The pass also rejects code that is
//! syntactically fine but semantically wrong, like `return` at the top
//! level or a local variable read in its own initializer.
//!
//! ## Interpreting
//! The [`interpreter`](interpreter) evaluates the tree directly. Values are
//! [`Object`](object::Object)s; scopes are a chain of
//! [`Environment`](environment::Environment)s; functions capture the
//! environment where they were declared and classes bundle methods that
//! bind `this` on access. A runtime error unwinds the current run and is
//! reported with the offending line.

use std::fs;
use std::io::Write;
use std::process;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub mod ast;
pub mod class;
pub mod environment;
pub mod error;
pub mod expr;
pub mod function;
pub mod interpreter;
pub mod literal;
pub mod object;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stmt;
pub mod token;

use error::Report;
use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;
use scanner::Scanner;

/// How a single run ended. The driver maps these to exit codes; the prompt
/// ignores them and reads the next line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    CompileError,
    RuntimeError,
}

/// The interpreter driver. Owns the interpreter (and with it the global
/// environment), so consecutive `run` calls share definitions. `print`
/// output goes to the writer handed to [`new`](Loxide::new); diagnostics go
/// to stderr.
pub struct Loxide<'output> {
    interpreter: Interpreter<'output>,
}

impl<'output> Loxide<'output> {
    pub fn new(output: &'output mut dyn Write) -> Self {
        Loxide {
            interpreter: Interpreter::new(output),
        }
    }

    /// Runs a script file. Exits the process with 65 on a compile error and
    /// 75 on a runtime error.
    pub fn run_file(&mut self, path: &str) {
        let contents = fs::read_to_string(path)
            .expect("should have been able to read the script file");

        match self.run(&contents) {
            RunOutcome::Success => (),
            RunOutcome::CompileError => process::exit(65),
            RunOutcome::RuntimeError => process::exit(75),
        }
    }

    /// Runs the interactive prompt until end of input. Each line is a fresh
    /// run: errors are reported and forgotten, while the global environment
    /// carries over.
    pub fn run_prompt(&mut self) {
        let mut editor = DefaultEditor::new().expect("to be able to open the line editor");

        let history = home::home_dir().map(|dir| dir.join(".loxide_history"));
        if let Some(history) = &history {
            // Missing history is fine on the first run.
            let _ = editor.load_history(history);
        }

        loop {
            match editor.readline("> ") {
                Ok(line) => {
                    let _ = editor.add_history_entry(&line);
                    self.run(&line);
                },
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(error) => {
                    eprintln!("error reading input: {error}");
                    break;
                },
            }
        }

        if let Some(history) = &history {
            let _ = editor.save_history(history);
        }
    }

    /// Runs a source text through scan, parse, resolve and interpret. Each
    /// pass only runs if the previous one reported no errors.
    pub fn run(&mut self, source: &str) -> RunOutcome {
        let mut scanner = Scanner::new(source);
        let tokens = scanner.scan_tokens();

        if scanner.had_error() {
            return RunOutcome::CompileError;
        }

        let mut parser = Parser::new(tokens);
        let statements = parser.parse();

        if parser.had_error() {
            return RunOutcome::CompileError;
        }

        let mut resolver = Resolver::new(&mut self.interpreter);
        resolver.resolve(&statements);

        if resolver.had_error() {
            return RunOutcome::CompileError;
        }

        match self.interpreter.interpret(&statements) {
            Ok(()) => RunOutcome::Success,
            Err(error) => {
                error.report();
                RunOutcome::RuntimeError
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_program_succeeds_silently() {
        let mut output = Vec::new();
        let mut loxide = Loxide::new(&mut output);

        assert_eq!(loxide.run(""), RunOutcome::Success);

        drop(loxide);
        assert!(output.is_empty());
    }

    #[test]
    fn globals_persist_across_runs() {
        let mut output = Vec::new();
        let mut loxide = Loxide::new(&mut output);

        assert_eq!(loxide.run("var a = 1;"), RunOutcome::Success);
        assert_eq!(loxide.run("print a;"), RunOutcome::Success);

        drop(loxide);
        assert_eq!(std::str::from_utf8(&output).unwrap(), "1\n");
    }

    #[test]
    fn compile_error_prevents_execution() {
        let mut output = Vec::new();
        let mut loxide = Loxide::new(&mut output);

        // The print before the syntax error must not run.
        assert_eq!(loxide.run("print 1; var 2;"), RunOutcome::CompileError);

        drop(loxide);
        assert!(output.is_empty());
    }

    #[test]
    fn runtime_error_stops_at_the_failing_statement() {
        let mut output = Vec::new();
        let mut loxide = Loxide::new(&mut output);

        assert_eq!(loxide.run("print 1; print nil - 1; print 2;"), RunOutcome::RuntimeError);

        drop(loxide);
        assert_eq!(std::str::from_utf8(&output).unwrap(), "1\n");
    }

    #[test]
    fn error_state_clears_between_runs() {
        let mut output = Vec::new();
        let mut loxide = Loxide::new(&mut output);

        assert_eq!(loxide.run("print nil - 1;"), RunOutcome::RuntimeError);
        assert_eq!(loxide.run("print 2;"), RunOutcome::Success);

        drop(loxide);
        assert_eq!(std::str::from_utf8(&output).unwrap(), "2\n");
    }

    #[test]
    fn resolve_error_is_a_compile_error() {
        let mut output = Vec::new();
        let mut loxide = Loxide::new(&mut output);

        assert_eq!(loxide.run("{ var a = a; }"), RunOutcome::CompileError);
    }
}
