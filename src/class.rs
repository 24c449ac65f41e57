use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::function::Function;
use crate::interpreter::Interpreter;
use crate::object::{Callable, Object};
use crate::token::Token;

/// A class at runtime: a method table plus an optional superclass link.
/// Methods are shared by every instance; fields live on the instances.
#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<RefCell<Class>>>,
    pub methods: HashMap<String, Function>,
}

impl Class {
    pub fn new(
        name: String,
        superclass: Option<Rc<RefCell<Class>>>,
        methods: HashMap<String, Function>,
    ) -> Self {
        Class { name, superclass, methods }
    }

    /// Looks up a method on this class, walking up the superclass chain.
    /// A subclass method shadows a superclass method of the same name.
    pub fn find_method(&self, name: &str) -> Option<Function> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        if let Some(superclass) = &self.superclass {
            return superclass.borrow().find_method(name);
        }

        None
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<class {}>", self.name)
    }
}

// Calling is implemented on the shared handle because a fresh instance needs
// to hold the very class it was created from, not a copy of it.
impl Callable for Rc<RefCell<Class>> {
    fn arity(&self) -> usize {
        match self.borrow().find_method("init") {
            Some(initializer) => initializer.arity(),
            None => 0,
        }
    }

    fn call(&self, interpreter: &mut Interpreter<'_>, arguments: Vec<Object>) -> Result<Object, RuntimeError> {
        let instance = Object::from(Instance::from(self));

        if let Some(initializer) = self.borrow().find_method("init") {
            initializer.bind(instance.clone()).call(interpreter, arguments)?;
        }

        Ok(instance)
    }
}

/// An instance at runtime: a class reference plus the instance's own mutable
/// field map.
#[derive(Clone)]
pub struct Instance {
    pub class: Rc<RefCell<Class>>,
    pub fields: HashMap<String, Object>,
}

impl Instance {
    /// Property lookup: fields shadow methods. A method hit is bound to the
    /// instance before it is handed out, so `this` works inside it.
    /// `instance` is the shared handle to `self`, needed for the binding.
    pub fn get(&self, name: &Token, instance: &Object) -> Result<Object, RuntimeError> {
        if let Some(field) = self.fields.get(&name.lexeme) {
            Ok(field.clone())
        } else if let Some(method) = self.class.borrow().find_method(&name.lexeme) {
            Ok(Object::from(method.bind(instance.clone())))
        } else {
            Err(RuntimeError {
                token: name.clone(),
                message: format!("Undefined property '{}'.", name.lexeme),
            })
        }
    }

    /// Creates or overwrites a field. Setting never fails.
    pub fn set(&mut self, name: &Token, value: Object) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl From<&Rc<RefCell<Class>>> for Instance {
    fn from(value: &Rc<RefCell<Class>>) -> Self {
        Instance { class: Rc::clone(value), fields: HashMap::new() }
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{} instance>", self.class.borrow().name)
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{} instance>", self.class.borrow().name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn class(name: &str, superclass: Option<Rc<RefCell<Class>>>) -> Rc<RefCell<Class>> {
        Rc::new(RefCell::new(Class::new(name.to_string(), superclass, HashMap::new())))
    }

    #[test]
    fn fields_are_per_instance() {
        let class = class("Point", None);

        let mut first = Instance::from(&class);
        let second = Instance::from(&class);

        first.set(&Token::from("x"), Object::from(1.0));

        let holder = Object::from(second.clone());
        let error = second.get(&Token::from("x"), &holder).unwrap_err();
        assert_eq!(error.message, "Undefined property 'x'.");
    }

    #[test]
    fn set_overwrites_field() {
        let class = class("Point", None);
        let mut instance = Instance::from(&class);

        instance.set(&Token::from("x"), Object::from(1.0));
        instance.set(&Token::from("x"), Object::from(2.0));

        let holder = Object::from(instance.clone());
        assert_eq!(instance.get(&Token::from("x"), &holder).unwrap(), Object::from(2.0));
    }

    #[test]
    fn find_method_walks_superclass_chain() {
        let base = class("Base", None);
        let derived = class("Derived", Some(Rc::clone(&base)));

        assert!(derived.borrow().find_method("missing").is_none());

        // A method present only on the base class is visible from the
        // derived class.
        let declaration = Rc::new(crate::stmt::FunctionData {
            name: Token::from("greet"),
            params: vec![],
            body: vec![],
        });
        let environment = Rc::new(RefCell::new(crate::environment::Environment::default()));
        base.borrow_mut().methods.insert(
            "greet".to_string(),
            Function::new(declaration, environment, false),
        );

        assert!(derived.borrow().find_method("greet").is_some());
    }

    #[test]
    fn class_arity_follows_init() {
        let class = class("Thing", None);
        assert_eq!(Callable::arity(&class), 0);

        let declaration = Rc::new(crate::stmt::FunctionData {
            name: Token::from("init"),
            params: vec![Token::from("a"), Token::from("b")],
            body: vec![],
        });
        let environment = Rc::new(RefCell::new(crate::environment::Environment::default()));
        class.borrow_mut().methods.insert(
            "init".to_string(),
            Function::new(declaration, environment, true),
        );

        assert_eq!(Callable::arity(&class), 2);
    }
}
