//! Abstract syntax tree produced by [`crate::parser`] and walked by
//! [`crate::interpreter`].
//!
//! Both blocks and `if` are *expressions*: they yield the value of the last
//! statement they execute.

use serde::Serialize;
use std::rc::Rc;

use crate::token::Token;

/// A **literal constant** that appears directly in the source code.
///
/// The parser copies the decoded value out of the token so the AST does not
/// depend on the scanner's output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    /// Numeric literal, stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// `true` / `false`.
    Bool(bool),

    /// The `nil` literal.
    Nil,
}

/// A braced sequence of statements.  Shared through `Rc` once it becomes the
/// body of a function, so every closure created from the same definition points
/// at one tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

/// One arm of an `if` chain.  `condition` is `None` for a trailing `else`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Branch {
    pub condition: Option<Expr>,
    pub block: Block,
}

/// Every kind of *expression* in the language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// Infix binary operator expression: `a + b`, `x <= y`, `p and q`.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Prefix unary operator expression: `!ready` or `-42`.
    Unary { operator: Token, right: Box<Expr> },

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    /// A literal constant.
    Literal(LiteralValue),

    /// Variable access.
    Variable(Token),

    /// Function call, written `f(a, b)` or produced by a pipe `a -> f(b)`.
    Call {
        callee: Box<Expr>,

        /// The `(` or `->` that introduced the call, kept for diagnostics.
        token: Token,

        arguments: Vec<Expr>,

        /// Set when `arguments[0]` came from the left of a `->`; that argument
        /// is then evaluated before the callee.
        piped: bool,
    },

    /// `{ statement* }`
    Block(Block),

    /// `if c { … } else if d { … } else { … }`
    If { branches: Vec<Branch> },
}

/// Every kind of *statement*.  A program is a `Vec<Stmt>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print expr;`
    Print(Expr),

    /// `let name = expr;` or `let mut name = expr;`
    Let {
        name: Token,
        initializer: Expr,
        mutable: bool,
    },

    /// `func name(a, b) { … };`
    FuncDef {
        name: Token,
        params: Vec<Token>,
        body: Rc<Block>,
    },

    /// `name = expr;`
    Reassignment { name: Token, value: Expr },
}
