use crate::error::{MadError, Result};
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct Binding {
    pub mutable: bool,
    pub value: Value,
}

/// One lexical scope frame.  Frames are shared as `Rc<RefCell<Environment>>`
/// so closures can keep their defining scope alive.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, Binding>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Convenience for `Rc::new(RefCell::new(Environment::with_enclosing(..)))`.
    pub fn child_of(enclosing: &Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            enclosing,
        ))))
    }

    /// Bind `name` in this frame.  A name can only be declared once per frame.
    pub fn define(&mut self, name: &Token, value: Value, mutable: bool) -> Result<()> {
        if self.values.contains_key(&name.lexeme) {
            return Err(MadError::runtime_at(
                name,
                format!("Cannot redeclare variable \"{}\"", name.lexeme),
                &name.lexeme,
            ));
        }

        self.define_unchecked(&name.lexeme, value, mutable);

        Ok(())
    }

    /// Used to seed builtins, which have no source token.
    pub(crate) fn define_unchecked(&mut self, name: &str, value: Value, mutable: bool) {
        debug!("Defining '{}' (mutable={})", name, mutable);

        self.values
            .insert(name.to_string(), Binding { mutable, value });
    }

    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(binding) = self.values.get(&name.lexeme) {
            Ok(binding.value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(MadError::runtime_at(name, "Undefined variable", &name.lexeme))
        }
    }

    pub fn mutate(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(binding) = self.values.get_mut(&name.lexeme) {
            if !binding.mutable {
                return Err(MadError::runtime_at(
                    name,
                    "Variable is immutable. It can be made mutable by declaring it with \"let mut\"",
                    &name.lexeme,
                ));
            }

            binding.value = value;

            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().mutate(name, value)
        } else {
            Err(MadError::runtime_at(name, "Undefined variable", &name.lexeme))
        }
    }
}

#[cfg(test)]
mod environment_tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    #[test]
    fn redeclaring_in_the_same_frame_fails() {
        let mut env = Environment::new();
        env.define(&ident("x"), Value::Number(1.0), false).unwrap();

        let err = env.define(&ident("x"), Value::Number(2.0), false).unwrap_err();
        assert!(err.to_string().contains("Cannot redeclare"), "{}", err);
    }

    #[test]
    fn child_frame_shadows_and_falls_back() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer
            .borrow_mut()
            .define(&ident("a"), Value::Number(1.0), false)
            .unwrap();
        outer
            .borrow_mut()
            .define(&ident("b"), Value::Number(2.0), false)
            .unwrap();

        let inner = Environment::child_of(&outer);
        inner
            .borrow_mut()
            .define(&ident("a"), Value::String("inner".into()), false)
            .unwrap();

        assert_eq!(
            inner.borrow().get(&ident("a")).unwrap(),
            Value::String("inner".into())
        );
        assert_eq!(inner.borrow().get(&ident("b")).unwrap(), Value::Number(2.0));
        assert_eq!(outer.borrow().get(&ident("a")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn mutation_walks_outward_and_respects_mutability() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer
            .borrow_mut()
            .define(&ident("count"), Value::Number(0.0), true)
            .unwrap();
        outer
            .borrow_mut()
            .define(&ident("fixed"), Value::Number(0.0), false)
            .unwrap();

        let inner = Environment::child_of(&outer);
        inner
            .borrow_mut()
            .mutate(&ident("count"), Value::Number(5.0))
            .unwrap();
        assert_eq!(
            outer.borrow().get(&ident("count")).unwrap(),
            Value::Number(5.0)
        );

        let err = inner
            .borrow_mut()
            .mutate(&ident("fixed"), Value::Number(1.0))
            .unwrap_err();
        assert!(err.to_string().contains("let mut"), "{}", err);
    }

    #[test]
    fn unknown_names_are_undefined() {
        let env = Environment::new();

        let err = env.get(&ident("ghost")).unwrap_err();
        assert_eq!(err.to_string(), "[line 1] Error: Undefined variable (ghost)");

        let mut env = env;
        assert!(env.mutate(&ident("ghost"), Value::Nil).is_err());
    }
}
