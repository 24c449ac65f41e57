use crate::expr::Expr;
use crate::stmt::{FunctionData, Stmt};

/// Returns a string representation of the expression in parentheses.
macro_rules! parenthesize {
    ( $self:ident, $name:expr, $( $x:expr ),+ ) => {
        {
            let mut string = String::new();
            string += "(";
            string += $name;
            $(
                string += " ";
                string += &$self.print($x);
            )*
            string += ")";

            string
        }
    };
}

/// Renders the tree in parenthesized prefix form, one line per statement.
/// This is a debugging aid and the vocabulary the parser tests use to state
/// the shape they expect.
pub struct AstPrinter;

impl AstPrinter {
    /// Prints an expression.
    pub fn print(&self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(literal) => literal.to_string(),
            Expr::Grouping(data) => parenthesize!(self, "group", &data.expr),
            Expr::Unary(data) => parenthesize!(self, &data.operator.lexeme, &data.expr),
            Expr::Binary(data) => parenthesize!(self, &data.operator.lexeme, &data.left, &data.right),
            Expr::Logical(data) => parenthesize!(self, &data.operator.lexeme, &data.left, &data.right),
            Expr::Variable(data) => data.name.lexeme.clone(),
            Expr::Assign(data) => {
                parenthesize!(self, format!("= {}", data.name.lexeme).as_str(), &data.value)
            },
            Expr::Call(data) => {
                let mut string = String::new();
                string += &self.print(&data.callee);
                string += "(";
                for argument in &data.arguments {
                    string += &self.print(argument);
                    string += " ";
                }
                string = string.trim_end().to_string();
                string += ")";
                string
            },
            Expr::Get(data) => {
                format!("(. {} {})", self.print(&data.object), data.name.lexeme)
            },
            Expr::Set(data) => {
                format!(
                    "(= (. {} {}) {})",
                    self.print(&data.object),
                    data.name.lexeme,
                    self.print(&data.value),
                )
            },
            Expr::This(_) => "this".to_string(),
            Expr::Super(data) => format!("(super {})", data.method.lexeme),
        }
    }

    /// Prints a statement.
    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(data) => parenthesize!(self, "expr", &data.expr),
            Stmt::Print(data) => parenthesize!(self, "print", &data.expr),
            Stmt::Var(data) => {
                match &data.initializer {
                    Some(initializer) => {
                        format!("(var {} = {})", data.name.lexeme, self.print(initializer))
                    },
                    None => format!("(var {})", data.name.lexeme),
                }
            },
            Stmt::Block(data) => {
                let statements = data.statements
                    .iter()
                    .map(|stmt| self.print_stmt(stmt))
                    .collect::<Vec<String>>()
                    .join(" ");

                if statements.is_empty() {
                    "{ }".to_string()
                } else {
                    format!("{{ {statements} }}")
                }
            },
            Stmt::If(data) => {
                let mut string = format!(
                    "(if {} {}",
                    self.print(&data.condition),
                    self.print_stmt(&data.then_branch),
                );
                if let Some(else_branch) = &data.else_branch {
                    string += &format!(" else {}", self.print_stmt(else_branch));
                }
                string += ")";
                string
            },
            Stmt::While(data) => {
                format!(
                    "(while {} {})",
                    self.print(&data.condition),
                    self.print_stmt(&data.body),
                )
            },
            Stmt::Function(data) => self.print_function(data),
            Stmt::Return(data) => {
                match &data.value {
                    Some(value) => parenthesize!(self, "return", value),
                    None => "(return)".to_string(),
                }
            },
            Stmt::Class(data) => {
                let mut string = format!("(class {}", data.name.lexeme);

                if let Some(Expr::Variable(superclass)) = &data.superclass {
                    string += &format!(" < {}", superclass.name.lexeme);
                }

                for method in &data.methods {
                    string += " ";
                    string += &self.print_function(method);
                }

                string += ")";
                string
            },
        }
    }

    fn print_function(&self, data: &FunctionData) -> String {
        let params = data.params
            .iter()
            .map(|param| param.lexeme.as_str())
            .collect::<Vec<&str>>()
            .join(" ");

        let body = data.body
            .iter()
            .map(|stmt| self.print_stmt(stmt))
            .collect::<Vec<String>>()
            .join(" ");

        if body.is_empty() {
            format!("(fun {}({}) {{ }})", data.name.lexeme, params)
        } else {
            format!("(fun {}({}) {{ {} }})", data.name.lexeme, params, body)
        }
    }
}
