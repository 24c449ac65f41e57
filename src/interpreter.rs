use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::mem;
use std::rc::Rc;

use crate::class::Class;
use crate::environment::Environment;
use crate::error::{RuntimeError, Unwind};
use crate::expr::*;
use crate::function::{Function, NativeFunction};
use crate::literal::Literal;
use crate::object::{Callable, Object};
use crate::stmt::*;
use crate::token::{Token, Type};

type EvalResult = Result<Object, Unwind>;
type ExecResult = Result<(), Unwind>;

fn numbers_error(operator: &Token) -> Unwind {
    Unwind::Error(RuntimeError {
        token: operator.clone(),
        message: "Operands must be numbers.".to_string(),
    })
}

fn number_operands(operator: &Token, left: &Object, right: &Object) -> Result<(f64, f64), Unwind> {
    match (left.as_number(), right.as_number()) {
        (Some(left), Some(right)) => Ok((left, right)),
        _ => Err(numbers_error(operator)),
    }
}

/// Executes statements against the environment chain. `print` output goes to
/// the injected writer; diagnostics are the caller's business. The
/// interpreter owns the side table the resolver fills in, so it outlives a
/// single `run` and keeps earlier definitions alive between prompt lines.
pub struct Interpreter<'output> {
    pub globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<Token, usize>,
    output: &'output mut dyn Write,
}

impl<'output> Interpreter<'output> {
    pub fn new(output: &'output mut dyn Write) -> Self {
        let globals = Rc::new(RefCell::new(Environment::default()));

        for native in NativeFunction::get_globals() {
            let name = native.name.lexeme.clone();
            globals.borrow_mut().define(&name, Object::NativeFunction(native));
        }

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Executes the statements in order. The first runtime error aborts the
    /// rest and is handed back to the caller.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => (),
                Err(Unwind::Error(error)) => return Err(error),
                // The resolver rejects top-level returns, so an unwind that
                // gets here is a bug in the interpreter itself.
                Err(Unwind::Return(_)) => unreachable!("return unwound to the top level"),
            }
        }

        Ok(())
    }

    /// Records the scope distance for a variable use. Called by the resolver.
    pub fn resolve(&mut self, name: &Token, depth: usize) {
        self.locals.insert(name.clone(), depth);
    }

    /// Executes the statements in the given environment, restoring the
    /// previous environment on every exit path, unwinds included.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: Rc<RefCell<Environment>>) -> ExecResult {
        let previous = mem::replace(&mut self.environment, environment);

        let result = statements.iter().try_for_each(|statement| self.execute(statement));

        self.environment = previous;

        result
    }

    fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        match stmt {
            Stmt::Expression(data) => {
                self.evaluate(&data.expr)?;
                Ok(())
            },
            Stmt::Print(data) => {
                let value = self.evaluate(&data.expr)?;
                writeln!(self.output, "{value}").ok();
                Ok(())
            },
            Stmt::Var(data) => {
                let value = match &data.initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Object::Literal(Literal::Nil),
                };

                self.environment.borrow_mut().define(&data.name.lexeme, value);
                Ok(())
            },
            Stmt::Block(data) => {
                let environment = Environment::new(Some(Rc::clone(&self.environment)));
                self.execute_block(&data.statements, Rc::new(RefCell::new(environment)))
            },
            Stmt::If(data) => {
                if self.evaluate(&data.condition)?.as_bool() {
                    self.execute(&data.then_branch)
                } else if let Some(else_branch) = &data.else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            },
            Stmt::While(data) => {
                while self.evaluate(&data.condition)?.as_bool() {
                    self.execute(&data.body)?;
                }
                Ok(())
            },
            Stmt::Function(data) => {
                let function = Function::new(Rc::clone(data), Rc::clone(&self.environment), false);
                self.environment.borrow_mut().define(&data.name.lexeme, Object::Function(function));
                Ok(())
            },
            Stmt::Return(data) => {
                let value = match &data.value {
                    Some(value) => self.evaluate(value)?,
                    None => Object::Literal(Literal::Nil),
                };

                Err(Unwind::Return(value))
            },
            Stmt::Class(data) => self.class_stmt(data),
        }
    }

    fn class_stmt(&mut self, data: &ClassData) -> ExecResult {
        let superclass = match &data.superclass {
            Some(expr) => {
                let value = self.evaluate(expr)?;
                match value {
                    Object::Class(class) => Some(class),
                    _ => {
                        let Expr::Variable(variable) = expr else { unreachable!() };
                        return Err(Unwind::Error(RuntimeError {
                            token: variable.name.clone(),
                            message: "Superclass must be a class.".to_string(),
                        }));
                    },
                }
            },
            None => None,
        };

        // The name exists (as nil) while the methods are built, so the body
        // can mention the class.
        self.environment.borrow_mut().define(&data.name.lexeme, Object::Literal(Literal::Nil));

        // Method closures of a subclass live inside an extra environment
        // that binds `super` to the superclass.
        let previous = match &superclass {
            Some(class) => {
                let mut environment = Environment::new(Some(Rc::clone(&self.environment)));
                environment.define("super", Object::Class(Rc::clone(class)));

                Some(mem::replace(&mut self.environment, Rc::new(RefCell::new(environment))))
            },
            None => None,
        };

        let mut methods = HashMap::new();
        for method in &data.methods {
            let function = Function::new(
                Rc::clone(method),
                Rc::clone(&self.environment),
                method.name.lexeme == "init",
            );
            methods.insert(method.name.lexeme.clone(), function);
        }

        let class = Class::new(data.name.lexeme.clone(), superclass, methods);

        if let Some(previous) = previous {
            self.environment = previous;
        }

        self.environment
            .borrow_mut()
            .assign(&data.name, Object::from(Rc::new(RefCell::new(class))))?;

        Ok(())
    }

    fn evaluate(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal(literal) => Ok(Object::Literal(literal.clone())),
            Expr::Grouping(data) => self.evaluate(&data.expr),
            Expr::Unary(data) => self.unary_expr(data),
            Expr::Binary(data) => self.binary_expr(data),
            Expr::Logical(data) => self.logical_expr(data),
            Expr::Variable(data) => Ok(self.look_up_variable(&data.name)?),
            Expr::Assign(data) => self.assign_expr(data),
            Expr::Call(data) => self.call_expr(data),
            Expr::Get(data) => self.get_expr(data),
            Expr::Set(data) => self.set_expr(data),
            Expr::This(data) => Ok(self.look_up_variable(&data.keyword)?),
            Expr::Super(data) => self.super_expr(data),
        }
    }

    fn unary_expr(&mut self, data: &UnaryData) -> EvalResult {
        let right = self.evaluate(&data.expr)?;

        match data.operator.r#type {
            Type::Minus => (-right).ok_or_else(|| Unwind::Error(RuntimeError {
                token: data.operator.clone(),
                message: "Operand must be a number.".to_string(),
            })),
            Type::Bang => Ok(!right),
            _ => unreachable!(),
        }
    }

    fn binary_expr(&mut self, data: &BinaryData) -> EvalResult {
        let left = self.evaluate(&data.left)?;
        let right = self.evaluate(&data.right)?;

        match data.operator.r#type {
            Type::Greater | Type::GreaterEqual | Type::Less | Type::LessEqual => {
                let (left, right) = number_operands(&data.operator, &left, &right)?;

                let result = match data.operator.r#type {
                    Type::Greater => left > right,
                    Type::GreaterEqual => left >= right,
                    Type::Less => left < right,
                    Type::LessEqual => left <= right,
                    _ => unreachable!(),
                };

                Ok(Object::from(result))
            },
            Type::EqualEqual => Ok(Object::from(left == right)),
            Type::BangEqual => Ok(Object::from(left != right)),
            Type::Minus => (left - right).ok_or_else(|| numbers_error(&data.operator)),
            Type::Star => (left * right).ok_or_else(|| numbers_error(&data.operator)),
            Type::Slash => (left / right).ok_or_else(|| numbers_error(&data.operator)),
            Type::Plus => (left + right).ok_or_else(|| Unwind::Error(RuntimeError {
                token: data.operator.clone(),
                message: "Operands must be two numbers or two strings.".to_string(),
            })),
            _ => unreachable!(),
        }
    }

    /// Short-circuit `and`/`or`. The operand values themselves come back,
    /// not booleans made from them.
    fn logical_expr(&mut self, data: &LogicalData) -> EvalResult {
        let left = self.evaluate(&data.left)?;

        match data.operator.r#type {
            Type::Or if left.as_bool() => Ok(left),
            Type::And if !left.as_bool() => Ok(left),
            _ => self.evaluate(&data.right),
        }
    }

    /// Reads a variable: resolved uses go exactly `distance` scopes up,
    /// everything else is a global by name.
    fn look_up_variable(&self, name: &Token) -> Result<Object, RuntimeError> {
        match self.locals.get(name) {
            Some(distance) => self.environment.borrow().get_at(*distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    fn assign_expr(&mut self, data: &AssignData) -> EvalResult {
        let value = self.evaluate(&data.value)?;

        match self.locals.get(&data.name) {
            Some(distance) => {
                self.environment.borrow_mut().assign_at(*distance, &data.name, value.clone());
            },
            None => self.globals.borrow_mut().assign(&data.name, value.clone())?,
        }

        // An assignment evaluates to the assigned value.
        Ok(value)
    }

    fn call_expr(&mut self, data: &CallData) -> EvalResult {
        let callee = self.evaluate(&data.callee)?;

        let mut arguments = Vec::with_capacity(data.arguments.len());
        for argument in &data.arguments {
            arguments.push(self.evaluate(argument)?);
        }

        let callable: &dyn Callable = match &callee {
            Object::Function(function) => function,
            Object::NativeFunction(function) => function,
            Object::Class(class) => class,
            _ => {
                return Err(Unwind::Error(RuntimeError {
                    token: data.paren.clone(),
                    message: "Can only call functions and classes.".to_string(),
                }));
            },
        };

        if arguments.len() != callable.arity() {
            return Err(Unwind::Error(RuntimeError {
                token: data.paren.clone(),
                message: format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    arguments.len(),
                ),
            }));
        }

        Ok(callable.call(self, arguments)?)
    }

    fn get_expr(&mut self, data: &GetData) -> EvalResult {
        let object = self.evaluate(&data.object)?;

        if let Object::Instance(instance) = &object {
            Ok(instance.borrow().get(&data.name, &object)?)
        } else {
            Err(Unwind::Error(RuntimeError {
                token: data.name.clone(),
                message: "Only instances have properties.".to_string(),
            }))
        }
    }

    fn set_expr(&mut self, data: &SetData) -> EvalResult {
        let object = self.evaluate(&data.object)?;

        let Object::Instance(instance) = object else {
            return Err(Unwind::Error(RuntimeError {
                token: data.name.clone(),
                message: "Only instances have fields.".to_string(),
            }));
        };

        let value = self.evaluate(&data.value)?;
        instance.borrow_mut().set(&data.name, value.clone());

        Ok(value)
    }

    fn super_expr(&mut self, data: &SuperData) -> EvalResult {
        let distance = *self.locals.get(&data.keyword)
            .expect("'super' to have been resolved");

        let superclass = self.environment.borrow().get_at(distance, &data.keyword)?;
        let Object::Class(superclass) = superclass else {
            unreachable!("'super' to hold a class");
        };

        // `this` lives one environment inside the one holding `super`.
        let object = self.environment.borrow().get_at(distance - 1, &Token::from("this"))?;

        let result = match superclass.borrow().find_method(&data.method.lexeme) {
            Some(method) => Ok(Object::Function(method.bind(object))),
            None => Err(Unwind::Error(RuntimeError {
                token: data.method.clone(),
                message: format!("Undefined property '{}'.", data.method.lexeme),
            })),
        };
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;

    /// Runs the full pipeline and returns the captured output plus the
    /// runtime error, if any.
    fn run(source: &str) -> (String, Option<RuntimeError>) {
        let tokens = Scanner::new(source).scan_tokens();

        let mut parser = Parser::new(tokens);
        let statements = parser.parse();
        assert!(!parser.had_error(), "unexpected parse error in {source:?}");

        let mut output = Vec::new();
        let mut interpreter = Interpreter::new(&mut output);

        let mut resolver = Resolver::new(&mut interpreter);
        resolver.resolve(&statements);
        assert!(!resolver.had_error(), "unexpected resolve error in {source:?}");

        let error = interpreter.interpret(&statements).err();

        (String::from_utf8(output).expect("output to be utf-8"), error)
    }

    fn output_of(source: &str) -> String {
        let (output, error) = run(source);
        assert!(error.is_none(), "unexpected runtime error: {error:?}");
        output
    }

    fn error_of(source: &str) -> RuntimeError {
        let (_, error) = run(source);
        error.expect("expected a runtime error")
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(output_of("print 1 + 2 * 3;"), "7\n");
        assert_eq!(output_of("print (1 + 2) * 3;"), "9\n");
    }

    #[test]
    fn unary_minus_and_grouping() {
        assert_eq!(output_of("print -(1 + 2);"), "-3\n");
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(output_of("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn integral_results_print_without_fraction() {
        assert_eq!(output_of("print 10 / 4;"), "2.5\n");
        assert_eq!(output_of("print 10 / 5;"), "2\n");
    }

    #[test]
    fn subtraction_requires_numbers() {
        let error = error_of("print \"a\" - 1;");
        assert_eq!(error.message, "Operands must be numbers.");
        assert_eq!(error.token.location.line, 1);
    }

    #[test]
    fn plus_rejects_mixed_operands() {
        let error = error_of("print \"a\" + 1;");
        assert_eq!(error.message, "Operands must be two numbers or two strings.");
    }

    #[test]
    fn comparison_requires_numbers() {
        let error = error_of("print \"a\" < \"b\";");
        assert_eq!(error.message, "Operands must be numbers.");
    }

    #[test]
    fn unary_minus_requires_number() {
        let error = error_of("print -\"a\";");
        assert_eq!(error.message, "Operand must be a number.");
    }

    #[test]
    fn zero_and_empty_string_are_truthy() {
        assert_eq!(output_of("if (0) print \"t\"; else print \"f\";"), "t\n");
        assert_eq!(output_of("if (\"\") print \"t\"; else print \"f\";"), "t\n");
        assert_eq!(output_of("if (nil) print \"t\"; else print \"f\";"), "f\n");
        assert_eq!(output_of("if (false) print \"t\"; else print \"f\";"), "f\n");
    }

    #[test]
    fn equality_semantics() {
        assert_eq!(output_of("print nil == nil;"), "true\n");
        assert_eq!(output_of("print nil == false;"), "false\n");
        assert_eq!(output_of("print \"3\" == 3;"), "false\n");
        assert_eq!(output_of("print 1 == 1;"), "true\n");
        assert_eq!(output_of("print 1 != 2;"), "true\n");
    }

    #[test]
    fn logical_operators_return_operands() {
        assert_eq!(output_of("print 1 or 2;"), "1\n");
        assert_eq!(output_of("print nil or \"yes\";"), "yes\n");
        assert_eq!(output_of("print nil and 2;"), "nil\n");
        assert_eq!(output_of("print 1 and 2;"), "2\n");
    }

    #[test]
    fn logical_operators_short_circuit() {
        // The right operand would blow up; it must not be evaluated.
        assert_eq!(output_of("var a = true or (1 + nil);"), "");
        assert_eq!(output_of("var a = false and (1 + nil);"), "");
    }

    #[test]
    fn var_without_initializer_is_nil() {
        assert_eq!(output_of("var a; print a;"), "nil\n");
    }

    #[test]
    fn block_shadowing() {
        assert_eq!(
            output_of("var a = 1; { var a = 2; print a; } print a;"),
            "2\n1\n",
        );
    }

    #[test]
    fn undefined_variable_read_is_an_error() {
        let error = error_of("print ghost;");
        assert_eq!(error.message, "Undefined variable 'ghost'.");
    }

    #[test]
    fn assignment_cannot_define_a_global() {
        let error = error_of("ghost = 1;");
        assert_eq!(error.message, "Undefined variable 'ghost'.");
    }

    #[test]
    fn assignment_evaluates_to_the_value() {
        assert_eq!(output_of("var a; print a = 2;"), "2\n");
    }

    #[test]
    fn while_loop_runs_to_completion() {
        assert_eq!(output_of("var i = 0; while (i < 3) i = i + 1; print i;"), "3\n");
    }

    #[test]
    fn function_call_and_return() {
        assert_eq!(output_of("fun add(a, b) { return a + b; } print add(1, 2);"), "3\n");
    }

    #[test]
    fn function_without_return_yields_nil() {
        assert_eq!(output_of("fun f() {} print f();"), "nil\n");
    }

    #[test]
    fn return_unwinds_nested_blocks() {
        assert_eq!(
            output_of("fun f() { while (true) { return \"done\"; } } print f();"),
            "done\n",
        );
    }

    #[test]
    fn arity_is_checked() {
        let error = error_of("fun f(a) {} f();");
        assert_eq!(error.message, "Expected 1 arguments but got 0.");

        let error = error_of("fun f() {} f(1, 2);");
        assert_eq!(error.message, "Expected 0 arguments but got 2.");
    }

    #[test]
    fn only_functions_and_classes_are_callable() {
        let error = error_of("\"not a function\"();");
        assert_eq!(error.message, "Can only call functions and classes.");
    }

    #[test]
    fn closure_keeps_private_state() {
        assert_eq!(
            output_of(
                "fun makeCounter() { var i = 0; fun count() { i = i + 1; print i; } return count; }
                 var counter = makeCounter();
                 counter(); counter(); counter();"
            ),
            "1\n2\n3\n",
        );
    }

    #[test]
    fn closure_captures_lexically_not_dynamically() {
        assert_eq!(
            output_of(
                "var a = \"global\";
                 {
                   fun show() { print a; }
                   show();
                   var a = \"block\";
                   show();
                 }"
            ),
            "global\nglobal\n",
        );
    }

    #[test]
    fn fields_and_methods() {
        assert_eq!(
            output_of("class Box {} var b = Box(); b.value = 42; print b.value;"),
            "42\n",
        );
        assert_eq!(
            output_of("class Greeter { hello() { print \"hi\"; } } Greeter().hello();"),
            "hi\n",
        );
    }

    #[test]
    fn this_is_bound_to_the_receiver() {
        assert_eq!(
            output_of("class Egotist { speak() { print this; } } Egotist().speak();"),
            "<Egotist instance>\n",
        );
    }

    #[test]
    fn initializer_stores_arguments() {
        assert_eq!(
            output_of("class Point { init(x) { this.x = x; } } print Point(5).x;"),
            "5\n",
        );
    }

    #[test]
    fn initializer_returns_the_instance() {
        assert_eq!(output_of("class C { init() { return; } } print C();"), "<C instance>\n");
    }

    #[test]
    fn class_arity_follows_initializer() {
        let error = error_of("class P { init(x, y) {} } P(1);");
        assert_eq!(error.message, "Expected 2 arguments but got 1.");
    }

    #[test]
    fn property_access_requires_an_instance() {
        let error = error_of("var x = 1; x.y;");
        assert_eq!(error.message, "Only instances have properties.");

        let error = error_of("var x = 1; x.y = 2;");
        assert_eq!(error.message, "Only instances have fields.");
    }

    #[test]
    fn unknown_property_is_an_error() {
        let error = error_of("class A {} A().missing;");
        assert_eq!(error.message, "Undefined property 'missing'.");
    }

    #[test]
    fn inherited_methods_and_super() {
        assert_eq!(
            output_of(
                "class A { greet() { print \"A\"; } }
                 class B < A { greet() { super.greet(); print \"B\"; } }
                 B().greet();"
            ),
            "A\nB\n",
        );
    }

    #[test]
    fn methods_are_inherited_without_override() {
        assert_eq!(
            output_of(
                "class A { greet() { print \"A\"; } }
                 class B < A {}
                 B().greet();"
            ),
            "A\n",
        );
    }

    #[test]
    fn superclass_must_be_a_class() {
        let error = error_of("var NotAClass = \"so not\"; class B < NotAClass {}");
        assert_eq!(error.message, "Superclass must be a class.");
    }

    #[test]
    fn callables_stringify() {
        assert_eq!(output_of("fun f() {} print f;"), "<fn f>\n");
        assert_eq!(output_of("class A {} print A;"), "<class A>\n");
        assert_eq!(output_of("print clock;"), "<native fn>\n");
    }

    #[test]
    fn clock_returns_a_number() {
        assert_eq!(output_of("print clock() >= 0;"), "true\n");
    }

    #[test]
    fn instances_are_equal_only_to_themselves() {
        assert_eq!(
            output_of("class A {} var a = A(); var b = A(); print a == a; print a == b;"),
            "true\nfalse\n",
        );
    }
}
