use crate::ast::{Block, Branch, Expr, LiteralValue, Stmt};

/// Renders parsed programs as parenthesised prefix notation, one top‑level
/// statement per line.  Used by the `parse` subcommand.
pub struct Ast;

impl Ast {
    pub fn print_program(&self, statements: &[Stmt]) -> String {
        statements
            .iter()
            .map(|stmt| self.print_stmt(stmt))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", self.print(expr)),

            Stmt::Print(expr) => format!("(print {})", self.print(expr)),

            Stmt::Let {
                name,
                initializer,
                mutable,
            } => {
                let keyword = if *mutable { "let mut" } else { "let" };
                format!("({} {} {})", keyword, name.lexeme, self.print(initializer))
            }

            Stmt::FuncDef { name, params, body } => {
                let params: Vec<&str> = params.iter().map(|p| p.lexeme.as_str()).collect();
                format!(
                    "(func {} ({}) {})",
                    name.lexeme,
                    params.join(" "),
                    self.print_block(body)
                )
            }

            Stmt::Reassignment { name, value } => {
                format!("(= {} {})", name.lexeme, self.print(value))
            }
        }
    }

    pub fn print(&self, expr: &Expr) -> String {
        match expr {
            Expr::Binary {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                self.print(left),
                self.print(right)
            ),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, self.print(right))
            }

            Expr::Literal(literal) => match literal {
                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }

                LiteralValue::Str(s) => format!("\"{}\"", s),

                LiteralValue::Bool(b) => b.to_string(),

                LiteralValue::Nil => "nil".to_string(),
            },

            Expr::Grouping(expr) => format!("(group {})", self.print(expr)),

            Expr::Variable(token) => token.lexeme.clone(),

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut out = format!("(call {}", self.print(callee));
                for arg in arguments {
                    out.push(' ');
                    out.push_str(&self.print(arg));
                }
                out.push(')');
                out
            }

            Expr::Block(block) => self.print_block(block),

            Expr::If { branches } => {
                let arms: Vec<String> = branches.iter().map(|b| self.print_branch(b)).collect();
                format!("(if {})", arms.join(" "))
            }
        }
    }

    fn print_block(&self, block: &Block) -> String {
        if block.statements.is_empty() {
            return "(block)".to_string();
        }

        let inner: Vec<String> = block
            .statements
            .iter()
            .map(|stmt| self.print_stmt(stmt))
            .collect();

        format!("(block {})", inner.join(" "))
    }

    fn print_branch(&self, branch: &Branch) -> String {
        match &branch.condition {
            Some(condition) => format!(
                "({} {})",
                self.print(condition),
                self.print_block(&branch.block)
            ),
            None => format!("(else {})", self.print_block(&branch.block)),
        }
    }
}
