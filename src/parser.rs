/*!
Recursive‑descent parser
========================

Definitions
-----------
* **n** = number of tokens (including the sole EOF).

Every token is consumed once through `advance()`, so parsing is **Θ(n)**;
call‑stack depth grows with syntactic nesting.  There is no error recovery:
the first error aborts the whole parse and no partial tree is returned.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `statement`, `declaration`   | `debug`| High‑level descent into grammar branches. |
| Error paths (`consume`, etc.)| `info` | Logged by the `MadError` constructors.    |

--------------------------------------------------------------------------------
Grammar (lowest to highest precedence)
--------------------------------------

```text
program        → statement* EOF ;
statement      → "print" expression ";" | declaration ;
declaration    → "let" "mut"? IDENT "=" expression ";"
               | "func" IDENT "(" parameters? ")" block ";"
               | reassignment ;
reassignment   → IDENT "=" expression ";" | expression ";" ;
expression     → stage ( "->" stage )* ;
stage          → block | ifOrEquality ;
ifOrEquality   → "if" ifChain | equality ;
ifChain        → expression block ( "else" "if" expression block )* ( "else" block )? ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → addition ( ( "and" | "or" | ">" | ">=" | "<" | "<=" ) addition )* ;
addition       → multiplication ( ( "-" | "+" ) multiplication )* ;
multiplication → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil"
               | IDENT | "(" expression ")" | block ;
block          → "{" statement* "}" ;
```

`and` / `or` deliberately share the comparison tier.
*/

use std::rc::Rc;

use crate::ast::{Block, Branch, Expr, LiteralValue, Stmt};
use crate::error::{MadError, Result};
use crate::token::{Token, TokenType};

use log::{debug, info};

/// Parse a complete token stream (as produced by [`crate::scanner::scan`]).
pub fn parse(tokens: &[Token]) -> Result<Vec<Stmt>> {
    Parser::new(tokens).parse()
}

/// Top‑level parser over an immutable slice of tokens.  The slice must end
/// with an `EOF` token.
pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
}

impl<'a> Parser<'a> {
    /// Construct a new parser.
    pub fn new(tokens: &'a [Token]) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self { tokens, current: 0 }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program and return its statement list.
    pub fn parse(&mut self) -> Result<Vec<Stmt>> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            statements.push(self.statement()?);
        }

        info!("Parsed {} top-level statements", statements.len());

        Ok(statements)
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        if self.matches(TokenType::PRINT) {
            debug!("Entering print statement");

            let value: Expr = self.expression()?;
            self.consume(TokenType::SEMICOLON, "Expected \";\" after expression")?;

            return Ok(Stmt::Print(value));
        }

        self.declaration()
    }

    fn declaration(&mut self) -> Result<Stmt> {
        if self.matches(TokenType::LET) {
            let mutable: bool = self.matches(TokenType::MUT);
            debug!("Entering let declaration (mutable={})", mutable);

            return self.let_declaration(mutable);
        }

        if self.matches(TokenType::FUNC) {
            debug!("Entering function declaration");

            return self.function_declaration();
        }

        self.reassignment()
    }

    fn let_declaration(&mut self, mutable: bool) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected variable name")?
            .clone();

        self.consume(TokenType::EQUAL, "Expected \"=\" after variable name")?;

        let initializer: Expr = self.expression()?;

        self.consume(
            TokenType::SEMICOLON,
            "Expected \";\" after variable declaration",
        )?;

        Ok(Stmt::Let {
            name,
            initializer,
            mutable,
        })
    }

    fn function_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected function name")?
            .clone();

        self.consume(TokenType::LEFT_PAREN, "Expected \"(\" after function name")?;

        let mut params: Vec<Token> = Vec::new();

        if !self.matches(TokenType::RIGHT_PAREN) {
            loop {
                // Parameters are read as expressions; only a bare name is a
                // valid shape.
                let start: Token = self.peek().clone();

                match self.expression()? {
                    Expr::Variable(param) => params.push(param),
                    _ => return Err(MadError::parse_at(&start, "Invalid parameter")),
                }

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }

            self.consume(TokenType::RIGHT_PAREN, "Expected \")\" after parameters")?;
        }

        if !self.check(TokenType::LEFT_BRACE) {
            return Err(MadError::parse_at(
                self.peek(),
                format!("Expected block as body of function \"{}\"", name.lexeme),
            ));
        }

        let body: Block = self.block()?;

        self.consume(
            TokenType::SEMICOLON,
            "Expected \";\" after function declaration",
        )?;

        debug!(
            "Function '{}' declared with {} parameter(s)",
            name.lexeme,
            params.len()
        );

        Ok(Stmt::FuncDef {
            name,
            params,
            body: Rc::new(body),
        })
    }

    fn reassignment(&mut self) -> Result<Stmt> {
        if self.check(TokenType::IDENTIFIER) && self.check_next(TokenType::EQUAL) {
            let name: Token = self.advance().clone();
            self.advance(); // "="

            debug!("Entering reassignment of '{}'", name.lexeme);

            let value: Expr = self.expression()?;

            self.consume(
                TokenType::SEMICOLON,
                "Expected \";\" after reassignment statement",
            )?;

            return Ok(Stmt::Reassignment { name, value });
        }

        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expected \";\" after expression")?;

        Ok(Stmt::Expression(expr))
    }

    // ───────────────────────── expression rules ───────────────────

    fn expression(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.stage()?;

        while self.matches(TokenType::PIPE) {
            let pipe: Token = self.previous().clone();
            let stage: Expr = self.stage()?;

            expr = thread(expr, stage, pipe);
        }

        Ok(expr)
    }

    fn stage(&mut self) -> Result<Expr> {
        if self.check(TokenType::LEFT_BRACE) {
            return Ok(Expr::Block(self.block()?));
        }

        if self.matches(TokenType::IF) {
            return self.if_chain();
        }

        self.equality()
    }

    fn if_chain(&mut self) -> Result<Expr> {
        let mut branches: Vec<Branch> = vec![self.branch(true)?];

        while self.matches(TokenType::ELSE) {
            if self.matches(TokenType::IF) {
                branches.push(self.branch(true)?);
            } else {
                branches.push(self.branch(false)?);
                break;
            }
        }

        debug!("Parsed if expression with {} branch(es)", branches.len());

        Ok(Expr::If { branches })
    }

    fn branch(&mut self, with_condition: bool) -> Result<Branch> {
        let condition: Option<Expr> = if with_condition {
            Some(self.expression()?)
        } else {
            None
        };

        if !self.check(TokenType::LEFT_BRACE) {
            return Err(MadError::parse_at(
                self.peek(),
                "Expected block after condition",
            ));
        }

        let block: Block = self.block()?;

        Ok(Branch { condition, block })
    }

    fn block(&mut self) -> Result<Block> {
        self.consume(TokenType::LEFT_BRACE, "Expected \"{\" before block")?;

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.statement()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected \"}\" after block")?;

        Ok(Block { statements })
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.comparison()?;

        while self.matches_any(&[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.comparison()?;

            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.addition()?;

        while self.matches_any(&[
            TokenType::AND,
            TokenType::OR,
            TokenType::GREATER,
            TokenType::GREATER_EQUAL,
            TokenType::LESS,
            TokenType::LESS_EQUAL,
        ]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.addition()?;

            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn addition(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.multiplication()?;

        while self.matches_any(&[TokenType::MINUS, TokenType::PLUS]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.multiplication()?;

            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn multiplication(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.matches_any(&[TokenType::SLASH, TokenType::STAR]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.matches_any(&[TokenType::BANG, TokenType::MINUS]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        while self.matches(TokenType::LEFT_PAREN) {
            expr = self.finish_call(expr)?;
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let token: Token = self.previous().clone();
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected \")\" after arguments")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            token,
            arguments,
            piped: false,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(Expr::Literal(LiteralValue::Bool(false)));
        }

        if self.matches(TokenType::TRUE) {
            return Ok(Expr::Literal(LiteralValue::Bool(true)));
        }

        if self.matches(TokenType::NIL) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if let Some(literal) = self.peek().literal() {
            self.advance();

            return Ok(Expr::Literal(literal));
        }

        if self.matches(TokenType::IDENTIFIER) {
            return Ok(Expr::Variable(self.previous().clone()));
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Expected \")\" after expression")?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        if self.check(TokenType::LEFT_BRACE) {
            return Ok(Expr::Block(self.block()?));
        }

        Err(MadError::parse_at(self.peek(), "Expected expression"))
    }

    // ────────────────────── utility helpers ───────────────────────

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn matches_any(&mut self, ttypes: &[TokenType]) -> bool {
        match ttypes.iter().find(|t| self.check((*t).clone())) {
            Some(_) => {
                self.advance();
                true
            }
            None => false,
        }
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&'a Token> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        Err(MadError::parse_at(self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn check_next(&self, ttype: TokenType) -> bool {
        match self.tokens.get(self.current + 1) {
            Some(token) => token.token_type == ttype,
            None => false,
        }
    }

    #[inline(always)]
    fn advance(&mut self) -> &'a Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token {
        let tokens: &'a [Token] = self.tokens;
        // A stream without EOF still terminates: past the end we keep
        // returning the last token.
        &tokens[self.current.min(tokens.len().saturating_sub(1))]
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token {
        let tokens: &'a [Token] = self.tokens;
        &tokens[self.current.saturating_sub(1)]
    }
}

fn binary(left: Expr, operator: Token, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

/// Feed `value` into `stage` as its first argument.
///
/// A stage that is already a call (`add(1)`, `curry(1)(2)`) receives the value
/// at the front of its innermost argument list; anything else becomes the
/// callee of a new single‑argument call.  Either way the receiving call is
/// marked `piped` so the value still runs before anything in the stage.
fn thread(value: Expr, stage: Expr, pipe: Token) -> Expr {
    match stage {
        Expr::Call {
            callee,
            token,
            mut arguments,
            piped,
        } => match *callee {
            inner @ Expr::Call { .. } => Expr::Call {
                callee: Box::new(thread(value, inner, pipe)),
                token,
                arguments,
                piped,
            },
            callee => {
                arguments.insert(0, value);

                Expr::Call {
                    callee: Box::new(callee),
                    token,
                    arguments,
                    piped: true,
                }
            }
        },
        other => Expr::Call {
            callee: Box::new(other),
            token: pipe,
            arguments: vec![value],
            piped: true,
        },
    }
}
