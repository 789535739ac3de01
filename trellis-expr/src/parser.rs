//! Expression parser using Pratt parsing (precedence climbing).
//!
//! ## Precedence Levels (lowest to highest)
//!
//! 1. `c ? a : b` (Conditional) - right associative
//! 2. `||` (Or) - left associative
//! 3. `&&` (And) - left associative
//! 4. `==`, `!=`, `===`, `!==` (Equality) - left associative
//! 5. `<`, `<=`, `>`, `>=` (Comparison) - left associative
//! 6. `+`, `-` (Addition) - left associative
//! 7. `*`, `/`, `%` (Multiplication) - left associative
//! 8. Unary `!`, `-` - prefix
//! 9. Postfix: `.field`, `[index]`, `.method(args)` - left associative

use crate::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
use crate::error::{ExprError, ExprResult};
use crate::eval::number_value;
use crate::lexer::{tokenize, Token};
use serde_json::Value;
use std::ops::Range;

const MAX_DEPTH: usize = 64;

/// Parses an expression source string.
pub fn parse(source: &str) -> ExprResult<Expr> {
    let tokens = tokenize(source)?;
    let mut stream = TokenStream {
        tokens,
        pos: 0,
        end: source.len(),
        depth: 0,
    };
    if stream.peek().is_none() {
        return Err(ExprError::parse(0, "empty expression"));
    }
    let expr = stream.parse_expr()?;
    if let Some(token) = stream.peek() {
        let message = format!("unexpected `{token}` after expression");
        return Err(ExprError::parse(stream.offset(), message));
    }
    Ok(expr)
}

#[derive(Clone, Copy)]
enum Infix {
    Logical(LogicalOp),
    Binary(BinaryOp),
}

/// Get infix operator metadata: (precedence, op). All infix operators are
/// left associative; higher precedence binds tighter.
fn infix_op_info(token: &Token) -> Option<(u8, Infix)> {
    use Infix::{Binary, Logical};
    match token {
        Token::OrOr => Some((10, Logical(LogicalOp::Or))),
        Token::AndAnd => Some((20, Logical(LogicalOp::And))),
        Token::EqEq | Token::EqEqEq => Some((30, Binary(BinaryOp::Eq))),
        Token::BangEq | Token::BangEqEq => Some((30, Binary(BinaryOp::Ne))),
        Token::Lt => Some((35, Binary(BinaryOp::Lt))),
        Token::LtEq => Some((35, Binary(BinaryOp::Le))),
        Token::Gt => Some((35, Binary(BinaryOp::Gt))),
        Token::GtEq => Some((35, Binary(BinaryOp::Ge))),
        Token::Plus => Some((40, Binary(BinaryOp::Add))),
        Token::Minus => Some((40, Binary(BinaryOp::Sub))),
        Token::Star => Some((50, Binary(BinaryOp::Mul))),
        Token::Slash => Some((50, Binary(BinaryOp::Div))),
        Token::Percent => Some((50, Binary(BinaryOp::Mod))),
        _ => None,
    }
}

struct TokenStream {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl TokenStream {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Byte offset of the current token, or end of input.
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.end)
    }

    fn expect(&mut self, expected: Token, context: &str) -> ExprResult<()> {
        let offset = self.offset();
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(ExprError::parse(
                offset,
                format!("expected `{expected}` {context}, found `{token}`"),
            )),
            None => Err(ExprError::parse(
                offset,
                format!("expected `{expected}` {context}, found end of input"),
            )),
        }
    }

    fn enter(&mut self) -> ExprResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_expr(&mut self) -> ExprResult<Expr> {
        self.enter()?;
        let result = self.parse_conditional();
        self.leave();
        result
    }

    fn parse_conditional(&mut self) -> ExprResult<Expr> {
        let test = self.parse_pratt(0)?;
        if self.peek() != Some(&Token::Question) {
            return Ok(test);
        }
        self.advance();
        let consequent = self.parse_expr()?;
        self.expect(Token::Colon, "in conditional")?;
        let alternate = self.parse_expr()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn parse_pratt(&mut self, min_prec: u8) -> ExprResult<Expr> {
        let mut left = self.parse_prefix()?;

        while let Some((prec, op)) = self.peek().and_then(infix_op_info) {
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = Box::new(self.parse_pratt(prec + 1)?);
            let left_box = Box::new(left);
            left = match op {
                Infix::Logical(op) => Expr::Logical {
                    op,
                    left: left_box,
                    right,
                },
                Infix::Binary(op) => Expr::Binary {
                    op,
                    left: left_box,
                    right,
                },
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> ExprResult<Expr> {
        let op = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.parse_prefix();
        self.leave();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand?),
        })
    }

    fn parse_postfix(&mut self) -> ExprResult<Expr> {
        let mut expr = self.parse_atom()?;

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    let offset = self.offset();
                    let property = match self.advance() {
                        Some(Token::Ident(name)) => name,
                        Some(Token::Number(n)) if n.fract() == 0.0 && n >= 0.0 => {
                            format!("{}", n as u64)
                        }
                        Some(token) => {
                            return Err(ExprError::parse(
                                offset,
                                format!("expected property name after `.`, found `{token}`"),
                            ));
                        }
                        None => {
                            return Err(ExprError::parse(offset, "expected property name after `.`"));
                        }
                    };

                    if self.peek() == Some(&Token::LParen) {
                        // Method syntax: receiver becomes the first argument.
                        let mut args = self.parse_call_args()?;
                        args.insert(0, expr);
                        expr = Expr::Call {
                            function: property,
                            args,
                        };
                    } else {
                        expr = Expr::Member {
                            object: Box::new(expr),
                            property,
                        };
                    }
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(Token::RBracket, "to close index")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Some(Token::LParen) => {
                    let offset = self.offset();
                    let Expr::Ident(function) = expr else {
                        return Err(ExprError::parse(offset, "only named functions can be called"));
                    };
                    let args = self.parse_call_args()?;
                    expr = Expr::Call { function, args };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_call_args(&mut self) -> ExprResult<Vec<Expr>> {
        self.expect(Token::LParen, "to open arguments")?;
        self.parse_list(Token::RParen)
    }

    /// Comma-separated expressions up to and including `close`.
    fn parse_list(&mut self, close: Token) -> ExprResult<Vec<Expr>> {
        let mut items = Vec::new();
        if self.peek() == Some(&close) {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.parse_expr()?);
            let offset = self.offset();
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(token) if token == close => return Ok(items),
                Some(token) => {
                    return Err(ExprError::parse(
                        offset,
                        format!("expected `,` or `{close}`, found `{token}`"),
                    ));
                }
                None => {
                    return Err(ExprError::parse(offset, format!("missing `{close}`")));
                }
            }
        }
    }

    fn parse_atom(&mut self) -> ExprResult<Expr> {
        let offset = self.offset();
        let Some(token) = self.advance() else {
            return Err(ExprError::parse(offset, "unexpected end of input"));
        };
        match token {
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null | Token::Undefined => Ok(Expr::Literal(Value::Null)),
            Token::Number(n) => Ok(Expr::Literal(number_value(n)?)),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Ident(name) => Ok(Expr::Ident(name)),
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(Token::RParen, "to close group")?;
                Ok(inner)
            }
            Token::LBracket => Ok(Expr::Array(self.parse_list(Token::RBracket)?)),
            other => Err(ExprError::parse(offset, format!("unexpected `{other}`"))),
        }
    }
}
