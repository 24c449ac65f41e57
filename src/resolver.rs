use std::collections::HashMap;
use std::mem;

use crate::error::{Report, ResolveError};
use crate::expr::Expr;
use crate::interpreter::Interpreter;
use crate::stmt::{ClassData, FunctionData, Stmt};
use crate::token::Token;

/// What kind of function body is being resolved. Guards `return` placement
/// and gives initializers their special return rule.
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

/// What kind of class body is being resolved. Guards `this` and `super`.
enum ClassType {
    None,
    Class,
    Subclass,
}

/// A single pre-interpretation pass over the tree that computes, for every
/// variable use, how many scopes up its binding lives. The distances land in
/// the interpreter's side table; a name that escapes every scope is treated
/// as a global and gets no entry. Misuses that are invisible to the parser
/// (double declaration, `return` at the top level, stray `this`) are
/// reported from here.
pub struct Resolver<'a, 'output> {
    interpreter: &'a mut Interpreter<'output>,
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionType,
    current_class: ClassType,
    had_error: bool,
}

impl<'a, 'output> Resolver<'a, 'output> {
    pub fn new(interpreter: &'a mut Interpreter<'output>) -> Self {
        Resolver {
            interpreter,
            scopes: vec![],
            current_function: FunctionType::None,
            current_class: ClassType::None,
            had_error: false,
        }
    }

    /// Resolves the statements. Resolution keeps going after an error; the
    /// caller checks `had_error` before running the program.
    pub fn resolve(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.resolve_stmt(statement);
        }
    }

    /// Returns whether any resolution error was reported.
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    fn error(&mut self, token: &Token, message: &str) {
        ResolveError {
            token: token.clone(),
            message: message.to_string(),
        }.report();
        self.had_error = true;
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(data) => self.resolve_expr(&data.expr),
            Stmt::Print(data) => self.resolve_expr(&data.expr),
            Stmt::Var(data) => {
                self.declare(&data.name);
                if let Some(initializer) = &data.initializer {
                    self.resolve_expr(initializer);
                }
                self.define(&data.name);
            },
            Stmt::Block(data) => {
                self.begin_scope();
                self.resolve(&data.statements);
                self.end_scope();
            },
            Stmt::If(data) => {
                self.resolve_expr(&data.condition);
                self.resolve_stmt(&data.then_branch);
                if let Some(else_branch) = &data.else_branch {
                    self.resolve_stmt(else_branch);
                }
            },
            Stmt::While(data) => {
                self.resolve_expr(&data.condition);
                self.resolve_stmt(&data.body);
            },
            Stmt::Function(data) => {
                // Declared and defined before the body so the function can
                // call itself.
                self.declare(&data.name);
                self.define(&data.name);

                self.resolve_function(data, FunctionType::Function);
            },
            Stmt::Return(data) => {
                if let FunctionType::None = self.current_function {
                    self.error(&data.keyword, "Can't return from top-level code.");
                }

                if let Some(value) = &data.value {
                    if let FunctionType::Initializer = self.current_function {
                        self.error(&data.keyword, "Can't return a value from an initializer.");
                    }

                    self.resolve_expr(value);
                }
            },
            Stmt::Class(data) => self.resolve_class(data),
        }
    }

    fn resolve_class(&mut self, data: &ClassData) {
        let enclosing_class = mem::replace(&mut self.current_class, ClassType::Class);

        self.declare(&data.name);
        self.define(&data.name);

        if let Some(superclass) = &data.superclass {
            let Expr::Variable(variable) = superclass else { unreachable!() };

            if data.name.lexeme == variable.name.lexeme {
                self.error(&variable.name, "A class can't inherit from itself.");
            }

            self.current_class = ClassType::Subclass;

            self.resolve_expr(superclass);

            // Methods of a subclass close over a scope holding `super`.
            self.begin_scope();
            self.scopes
                .last_mut()
                .expect("scope stack to be not empty")
                .insert("super".to_string(), true);
        }

        // Every method body closes over a scope holding `this`.
        self.begin_scope();
        self.scopes
            .last_mut()
            .expect("scope stack to be not empty")
            .insert("this".to_string(), true);

        for method in &data.methods {
            let declaration = if method.name.lexeme.eq("init") {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, declaration);
        }

        self.end_scope();

        if data.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => (),
            Expr::Grouping(data) => self.resolve_expr(&data.expr),
            Expr::Unary(data) => self.resolve_expr(&data.expr),
            Expr::Binary(data) => {
                self.resolve_expr(&data.left);
                self.resolve_expr(&data.right);
            },
            Expr::Logical(data) => {
                self.resolve_expr(&data.left);
                self.resolve_expr(&data.right);
            },
            Expr::Variable(data) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&data.name.lexeme) == Some(&false) {
                        self.error(
                            &data.name,
                            "Can't read local variable in its own initializer.",
                        );
                    }
                }

                self.resolve_local(&data.name);
            },
            Expr::Assign(data) => {
                self.resolve_expr(&data.value);
                self.resolve_local(&data.name);
            },
            Expr::Call(data) => {
                self.resolve_expr(&data.callee);

                for argument in &data.arguments {
                    self.resolve_expr(argument);
                }
            },
            Expr::Get(data) => {
                // Properties are looked up dynamically; only the object
                // expression is resolved.
                self.resolve_expr(&data.object);
            },
            Expr::Set(data) => {
                self.resolve_expr(&data.value);
                self.resolve_expr(&data.object);
            },
            Expr::This(data) => {
                if let ClassType::None = self.current_class {
                    self.error(&data.keyword, "Can't use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(&data.keyword);
            },
            Expr::Super(data) => {
                match self.current_class {
                    ClassType::Subclass => (),
                    ClassType::None => {
                        self.error(&data.keyword, "Can't use 'super' outside of a class.");
                    },
                    ClassType::Class => {
                        self.error(
                            &data.keyword,
                            "Can't use 'super' in a class with no superclass.",
                        );
                    },
                }

                self.resolve_local(&data.keyword);
            },
        }
    }

    fn resolve_function(&mut self, function: &FunctionData, r#type: FunctionType) {
        let enclosing_function = mem::replace(&mut self.current_function, r#type);

        self.begin_scope();
        for param in &function.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve(&function.body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Marks a name as existing-but-unusable in the innermost scope. Globals
    /// are exempt from declaration tracking.
    fn declare(&mut self, name: &Token) {
        if self.scopes.is_empty() {
            return;
        }

        if self.scopes.last().expect("scope stack to be not empty").contains_key(&name.lexeme) {
            self.error(name, "Already a variable with this name in this scope.");
        }

        self.scopes
            .last_mut()
            .expect("scope stack to be not empty")
            .insert(name.lexeme.to_owned(), false);
    }

    /// Marks a declared name as usable.
    fn define(&mut self, name: &Token) {
        if self.scopes.is_empty() {
            return;
        }

        self.scopes
            .last_mut()
            .expect("scope stack to be not empty")
            .insert(name.lexeme.to_owned(), true);
    }

    /// Finds the innermost scope holding the name and records its distance
    /// in the interpreter's side table. No hit means the name is global.
    fn resolve_local(&mut self, name: &Token) {
        for (i, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.interpreter.resolve(name, i);
                return;
            }
        }
    }
}
