use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Block, Branch, Expr, Stmt};
use crate::environment::Environment;
use crate::error::{Location, MadError, Result};
use crate::token::{Token, TokenType};
use crate::value::{Callable, Closure, Value};

/// Strings the `+` operator refuses to concatenate.
const NON_CONCATENABLE: [&str; 3] = ["true", "false", "nil"];

/// Deepest chain of user function calls before evaluation gives up.
const MAX_CALL_DEPTH: usize = 1000;

// A call grows the native stack by `STACK_GROWTH` once less than `RED_ZONE`
// remains, so `MAX_CALL_DEPTH` is reached on any thread size.
const RED_ZONE: usize = 100 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

/// Tree‑walking evaluator.  Program output (`print`, `log`) is written to `out`.
pub struct Interpreter<W: Write> {
    out: W,
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,

    /// Top‑level frame reused across `interpret_incremental` calls.
    session: Option<Rc<RefCell<Environment>>>,

    /// Number of user function calls currently on the stack.
    depth: usize,
}

impl<W: Write> Interpreter<W> {
    /// Creates a new Interpreter and seeds the global frame with builtins.
    pub fn new(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'log'");

        globals.borrow_mut().define_unchecked(
            "log",
            Value::Function(Rc::new(Callable::Native {
                name: "log",
                func: |out: &mut dyn Write, args: &[Value]| {
                    for arg in args {
                        writeln!(out, "{}", arg)?;
                    }

                    Ok(Value::Nil)
                },
            })),
            false,
        );

        Self {
            out,
            environment: Rc::clone(&globals),
            globals,
            session: None,
            depth: 0,
        }
    }

    /// Borrow the output sink.
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Give the output sink back, consuming the interpreter.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs a program in a fresh top‑level frame enclosed by the globals.
    /// Stops at the first fatal error and returns it.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        let frame = Environment::child_of(&self.globals);
        self.run_in(frame, statements)?;

        info!("Interpretation completed successfully");

        Ok(())
    }

    /// Like [`interpret`](Self::interpret), but every call shares one
    /// top‑level frame so bindings survive from one input to the next.
    pub fn interpret_incremental(&mut self, statements: &[Stmt]) -> Result<()> {
        let frame = Rc::clone(
            self.session
                .get_or_insert_with(|| Environment::child_of(&self.globals)),
        );

        self.run_in(frame, statements)
    }

    fn run_in(&mut self, frame: Rc<RefCell<Environment>>, statements: &[Stmt]) -> Result<()> {
        let result = self.with_environment(frame, |this| {
            for stmt in statements {
                this.execute(stmt)?;
            }

            Ok(())
        });

        // Output produced before a failure must still reach the sink.
        self.out.flush()?;

        result
    }

    /// Run `f` with `frame` as the current environment, restoring the previous
    /// one afterwards whether or not `f` failed.
    fn with_environment<T>(
        &mut self,
        frame: Rc<RefCell<Environment>>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let previous = std::mem::replace(&mut self.environment, frame);
        let result = f(self);
        self.environment = previous;

        result
    }

    /// Executes a single statement and returns the value it yields: the
    /// expression's value for expression statements, `nil` for the rest.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Value> {
        match stmt {
            Stmt::Expression(expr) => self.evaluate(expr),

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                debug!("Printed value: {}", value);

                Ok(Value::Nil)
            }

            Stmt::Let {
                name,
                initializer,
                mutable,
            } => {
                let value = self.evaluate(initializer)?;
                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment
                    .borrow_mut()
                    .define(name, value, *mutable)?;

                Ok(Value::Nil)
            }

            Stmt::FuncDef { name, params, body } => {
                debug!("Defining function '{}'", name.lexeme);

                let closure = Closure {
                    name: name.lexeme.clone(),
                    params: params.clone(),
                    body: Rc::clone(body),
                    env: Rc::clone(&self.environment),
                };

                self.environment.borrow_mut().define(
                    name,
                    Value::Function(Rc::new(Callable::Closure(closure))),
                    false,
                )?;

                Ok(Value::Nil)
            }

            Stmt::Reassignment { name, value } => {
                let value = self.evaluate(value)?;
                debug!("Assigning {} to '{}'", value, name.lexeme);

                self.environment.borrow_mut().mutate(name, value)?;

                Ok(Value::Nil)
            }
        }
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Variable(name) => self.environment.borrow().get(name),

            Expr::Block(block) => {
                let frame = Environment::child_of(&self.environment);
                self.evaluate_block(block, frame)
            }

            Expr::If { branches } => self.evaluate_if(branches),

            Expr::Call {
                callee,
                token,
                arguments,
                piped,
            } => {
                let mut arg_values = Vec::with_capacity(arguments.len());
                let mut rest = arguments.iter();

                // Left to right: a piped value sits left of its stage.
                if *piped {
                    if let Some(value) = rest.next() {
                        arg_values.push(self.evaluate(value)?);
                    }
                }

                let callee_val = self.evaluate(callee)?;

                for arg in rest {
                    arg_values.push(self.evaluate(arg)?);
                }

                self.invoke_callable(&callee_val, token, &arg_values)
            }
        }
    }

    /// Runs `block` inside `frame`; the block's value is the value of its last
    /// statement, `nil` when empty.
    fn evaluate_block(
        &mut self,
        block: &Block,
        frame: Rc<RefCell<Environment>>,
    ) -> Result<Value> {
        self.with_environment(frame, |this| {
            let mut last = Value::Nil;

            for stmt in &block.statements {
                last = this.execute(stmt)?;
            }

            Ok(last)
        })
    }

    fn evaluate_if(&mut self, branches: &[Branch]) -> Result<Value> {
        for branch in branches {
            let taken = match &branch.condition {
                Some(condition) => self.evaluate(condition)?.is_truthy(),
                None => true,
            };

            if taken {
                let frame = Environment::child_of(&self.environment);
                return self.evaluate_block(&branch.block, frame);
            }
        }

        debug!("No if branch taken");

        Ok(Value::Nil)
    }

    fn evaluate_unary(&mut self, op: &Token, expr: &Expr) -> Result<Value> {
        let right = self.evaluate(expr)?;

        match op.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(MadError::runtime_at(
                    op,
                    "Operand must be a number",
                    format!("Operand: {}", describe(&other)),
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),

            _ => Err(MadError::runtime_at(op, "Invalid unary operator", &op.lexeme)),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value> {
        // Both sides always run, `and`/`or` included.
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        debug!("Binary {} on {} and {}", op.lexeme, left_val, right_val);

        match op.token_type {
            TokenType::AND => Ok(Value::Bool(left_val.is_truthy() && right_val.is_truthy())),

            TokenType::OR => Ok(Value::Bool(left_val.is_truthy() || right_val.is_truthy())),

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            TokenType::PLUS => match (&left_val, &right_val) {
                (Value::String(a), Value::String(b))
                    if !NON_CONCATENABLE.contains(&a.as_str())
                        && !NON_CONCATENABLE.contains(&b.as_str()) =>
                {
                    Ok(Value::String(format!("{}{}", a, b)))
                }
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                _ => Err(operands_error(
                    op,
                    "Operands must be either two numbers or two strings",
                    &left_val,
                    &right_val,
                )),
            },

            TokenType::SLASH => {
                let (a, b) = numbers(op, &left_val, &right_val)?;

                if b == 0.0 {
                    return Err(MadError::runtime_at(
                        op,
                        "Cannot divide by zero",
                        format!("{} / {}", left_val, right_val),
                    ));
                }

                Ok(Value::Number(a / b))
            }

            TokenType::MINUS => {
                numbers(op, &left_val, &right_val).map(|(a, b)| Value::Number(a - b))
            }

            TokenType::STAR => {
                numbers(op, &left_val, &right_val).map(|(a, b)| Value::Number(a * b))
            }

            TokenType::LESS => {
                numbers(op, &left_val, &right_val).map(|(a, b)| Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                numbers(op, &left_val, &right_val).map(|(a, b)| Value::Bool(a <= b))
            }

            TokenType::GREATER => {
                numbers(op, &left_val, &right_val).map(|(a, b)| Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                numbers(op, &left_val, &right_val).map(|(a, b)| Value::Bool(a >= b))
            }

            _ => Err(MadError::runtime_at(op, "Invalid binary operator", &op.lexeme)),
        }
    }

    /// Invokes a callable (native or user‑defined function).
    fn invoke_callable(
        &mut self,
        callee_val: &Value,
        token: &Token,
        args: &[Value],
    ) -> Result<Value> {
        let callable = match callee_val {
            Value::Function(callable) => Rc::clone(callable),
            other => {
                return Err(MadError::runtime_at(
                    token,
                    "Can only call functions",
                    format!("Callee: {}", describe(other)),
                ))
            }
        };

        match callable.as_ref() {
            Callable::Native { name, func } => {
                debug!("Calling native function '{}' with {} args", name, args.len());

                func(&mut self.out, args)
            }

            Callable::Closure(closure) => {
                let arity = callable.arity();

                if args.len() < arity {
                    return Err(arity_error(token, "Missing argument", closure, args.len()));
                }

                if args.len() > arity {
                    return Err(arity_error(token, "Too many arguments", closure, args.len()));
                }

                if self.depth >= MAX_CALL_DEPTH {
                    return Err(MadError::runtime_at(
                        token,
                        "Maximum call depth exceeded",
                        format!(
                            "{} nested calls, in function \"{}\"",
                            MAX_CALL_DEPTH, closure.name
                        ),
                    ));
                }

                debug!("Calling user-defined function '{}'", closure.name);

                // Static scoping: the call frame hangs off the frame the
                // function was defined in, not the caller's.
                let frame = Environment::child_of(&closure.env);
                {
                    let mut frame = frame.borrow_mut();

                    for (param, arg) in closure.params.iter().zip(args) {
                        frame.define(param, arg.clone(), false)?;
                    }
                }

                self.depth += 1;
                let result = stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || {
                    self.evaluate_block(&closure.body, frame)
                });
                self.depth -= 1;

                let result = result?;

                info!("Function '{}' returned: {}", closure.name, result);

                Ok(result)
            }
        }
    }
}

fn numbers(op: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(operands_error(op, "Operands must be numbers", left, right)),
    }
}

fn operands_error(op: &Token, message: &str, left: &Value, right: &Value) -> MadError {
    MadError::runtime(
        message,
        Some(Location::new(
            op.line,
            format!("Operands: {} and {}", describe(left), describe(right)),
        )),
    )
}

fn arity_error(token: &Token, message: &str, closure: &Closure, got: usize) -> MadError {
    MadError::runtime_at(
        token,
        format!("{} for function \"{}\"", message, closure.name),
        format!("expected {}, got {}", closure.params.len(), got),
    )
}

/// Value as shown inside diagnostics.
fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Function(_) => format!("{}", value),
        other => format!("{} ({})", other, other.type_name()),
    }
}
