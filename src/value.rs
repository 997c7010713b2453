use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use crate::ast::{Block, LiteralValue};
use crate::environment::Environment;
use crate::error::Result;
use crate::token::Token;

/// Signature of a builtin.  Builtins receive the interpreter's output sink so
/// that anything they print lands in the same stream as `print`.
pub type NativeFn = fn(&mut dyn Write, &[Value]) -> Result<Value>;

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
    Function(Rc<Callable>),
}

/// Anything that can sit in callee position.
pub enum Callable {
    /// Builtin implemented in Rust.  Declared arity is zero; the builtin itself
    /// decides what to do with however many arguments it receives.
    Native { name: &'static str, func: NativeFn },

    /// User function closing over the frame it was defined in.
    Closure(Closure),
}

pub struct Closure {
    pub name: String,
    pub params: Vec<Token>,
    pub body: Rc<Block>,
    pub env: Rc<RefCell<Environment>>,
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Native { name, .. } => name,
            Callable::Closure(closure) => &closure.name,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Callable::Native { .. } => 0,
            Callable::Closure(closure) => closure.params.len(),
        }
    }
}

// The captured frame usually holds the closure itself, so a derived Debug
// would recurse forever.
impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native { name, .. } => write!(f, "Native({})", name),
            Callable::Closure(closure) => {
                write!(f, "Closure({}/{})", closure.name, closure.params.len())
            }
        }
    }
}

impl Value {
    /// `nil` and `false` are falsy; everything else, `0` and `""` included, is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Kind name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Nil => "nil",
            Value::Function(_) => "function",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&LiteralValue> for Value {
    fn from(literal: &LiteralValue) -> Self {
        match literal {
            LiteralValue::Number(n) => Value::Number(*n),
            LiteralValue::Str(s) => Value::String(s.clone()),
            LiteralValue::Bool(b) => Value::Bool(*b),
            LiteralValue::Nil => Value::Nil,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                // 3.0 → "3"; also folds -0 into "0".
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    let mut buf: itoa::Buffer = itoa::Buffer::new();
                    f.write_str(buf.format(*n as i64))
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),

            Value::Function(callable) => match callable.as_ref() {
                Callable::Native { .. } => write!(f, "<native fn {}>", callable.name()),
                Callable::Closure(_) => write!(f, "<fn {}>", callable.name()),
            },
        }
    }
}
