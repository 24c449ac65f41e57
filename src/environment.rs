use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::object::Object;
use crate::token::Token;

/// A lexical scope at runtime: a name→value map plus a link to the enclosing
/// scope. Environments are shared (`Rc<RefCell<..>>`) because closures keep
/// the scope they were declared in alive for as long as they live.
#[derive(Debug, Clone)]
pub struct Environment {
    pub enclosing: Option<Rc<RefCell<Environment>>>,
    pub variables: HashMap<String, Object>,
}

impl Environment {
    pub fn new(enclosing: Option<Rc<RefCell<Environment>>>) -> Self {
        Environment {
            enclosing,
            variables: HashMap::new(),
        }
    }

    /// Binds a name in this scope. Defining never fails; re-defining a name
    /// replaces the old binding.
    pub fn define(&mut self, name: &str, value: Object) {
        self.variables.insert(name.to_string(), value);
    }

    /// Walks up `distance` enclosing links. The resolver guarantees the
    /// chain is at least that deep for every distance it hands out.
    fn ancestor(&self, distance: usize) -> Rc<RefCell<Environment>> {
        let parent = self.enclosing.clone()
            .unwrap_or_else(|| panic!("enclosing environment to exist at depth {}", 1));
        let mut environment = Rc::clone(&parent);

        for i in 1..distance {
            let parent = environment.borrow().enclosing.clone()
                .unwrap_or_else(|| panic!("enclosing environment to exist at depth {}", i));
            environment = Rc::clone(&parent);
        }

        environment
    }

    /// Assigns to an existing binding, searching the enclosing chain.
    /// Assignment cannot create a binding; a miss is a runtime error.
    pub fn assign(&mut self, name: &Token, value: Object) -> Result<(), RuntimeError> {
        if self.variables.contains_key(&name.lexeme) {
            self.variables.insert(name.lexeme.clone(), value);
            return Ok(());
        }

        if let Some(enclosing) = &mut self.enclosing {
            return enclosing.borrow_mut().assign(name, value);
        }

        Err(RuntimeError {
            token: name.clone(),
            message: format!("Undefined variable '{}'.", name.lexeme),
        })
    }

    /// Assigns exactly `distance` scopes up. The resolver has already proven
    /// the binding exists there.
    pub fn assign_at(&mut self, distance: usize, name: &Token, value: Object) {
        if distance > 0 {
            self.ancestor(distance).borrow_mut().variables.insert(name.lexeme.clone(), value);
        } else {
            self.variables.insert(name.lexeme.clone(), value);
        }
    }

    /// Reads a binding, searching the enclosing chain.
    pub fn get(&self, name: &Token) -> Result<Object, RuntimeError> {
        if let Some(variable) = self.variables.get(&name.lexeme) {
            return Ok(variable.clone());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow().get(name);
        }

        Err(RuntimeError {
            token: name.clone(),
            message: format!("Undefined variable '{}'.", name.lexeme),
        })
    }

    /// Reads a binding exactly `distance` scopes up.
    pub fn get_at(&self, distance: usize, name: &Token) -> Result<Object, RuntimeError> {
        if distance > 0 {
            match self.ancestor(distance).borrow().variables.get(&name.lexeme) {
                Some(variable) => Ok(variable.clone()),
                None => Err(RuntimeError {
                    token: name.clone(),
                    message: format!("Undefined variable '{}'.", name.lexeme),
                }),
            }
        } else {
            match self.variables.get(&name.lexeme) {
                Some(variable) => Ok(variable.clone()),
                None => Err(RuntimeError {
                    token: name.clone(),
                    message: format!("Undefined variable '{}'.", name.lexeme),
                }),
            }
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::literal::Literal;

    fn token(name: &str) -> Token {
        Token::from(name)
    }

    #[test]
    fn define_and_get() {
        let mut environment = Environment::default();
        environment.define("a", Object::from(1.0));

        assert_eq!(environment.get(&token("a")).unwrap(), Object::from(1.0));
    }

    #[test]
    fn get_walks_enclosing_chain() {
        let globals = Rc::new(RefCell::new(Environment::default()));
        globals.borrow_mut().define("a", Object::from("outer"));

        let inner = Environment::new(Some(Rc::clone(&globals)));
        assert_eq!(inner.get(&token("a")).unwrap(), Object::from("outer"));
    }

    #[test]
    fn get_missing_is_error() {
        let environment = Environment::default();
        let error = environment.get(&token("ghost")).unwrap_err();
        assert_eq!(error.message, "Undefined variable 'ghost'.");
    }

    #[test]
    fn assign_updates_enclosing_binding() {
        let globals = Rc::new(RefCell::new(Environment::default()));
        globals.borrow_mut().define("a", Object::from(1.0));

        let mut inner = Environment::new(Some(Rc::clone(&globals)));
        inner.assign(&token("a"), Object::from(2.0)).unwrap();

        assert_eq!(globals.borrow().get(&token("a")).unwrap(), Object::from(2.0));
    }

    #[test]
    fn assign_cannot_define() {
        let mut environment = Environment::default();
        let error = environment.assign(&token("a"), Object::from(1.0)).unwrap_err();
        assert_eq!(error.message, "Undefined variable 'a'.");
    }

    #[test]
    fn get_at_reads_exact_depth() {
        let globals = Rc::new(RefCell::new(Environment::default()));
        globals.borrow_mut().define("a", Object::from("global"));

        let middle = Rc::new(RefCell::new(Environment::new(Some(Rc::clone(&globals)))));
        middle.borrow_mut().define("a", Object::from("middle"));

        let inner = Environment::new(Some(Rc::clone(&middle)));

        assert_eq!(inner.get_at(1, &token("a")).unwrap(), Object::from("middle"));
        assert_eq!(inner.get_at(2, &token("a")).unwrap(), Object::from("global"));
    }

    #[test]
    fn assign_at_writes_exact_depth() {
        let globals = Rc::new(RefCell::new(Environment::default()));
        globals.borrow_mut().define("a", Object::from("global"));

        let mut inner = Environment::new(Some(Rc::clone(&globals)));
        inner.define("a", Object::from("inner"));

        inner.assign_at(1, &token("a"), Object::from("changed"));

        assert_eq!(globals.borrow().get(&token("a")).unwrap(), Object::from("changed"));
        assert_eq!(inner.get_at(0, &token("a")).unwrap(), Object::from("inner"));
    }

    #[test]
    fn shadowing_leaves_outer_untouched() {
        let globals = Rc::new(RefCell::new(Environment::default()));
        globals.borrow_mut().define("a", Object::Literal(Literal::Nil));

        let mut inner = Environment::new(Some(Rc::clone(&globals)));
        inner.define("a", Object::from(true));

        assert_eq!(inner.get(&token("a")).unwrap(), Object::from(true));
        assert_eq!(
            globals.borrow().get(&token("a")).unwrap(),
            Object::Literal(Literal::Nil),
        );
    }
}
