//! Parser descendente recursivo de la gramática de predicados.
//!
//! Precedencia: `not` > `and` > `or`. Las comparaciones y `in`/`not in` son
//! las hojas; un átomo suelto no es un predicado válido.

use super::ast::{Atom, Expr};
use super::token::{Token, tokenize};
use crate::errors::EvalError;

pub fn parse(input: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(parser.error("trailing tokens after predicate"));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, detail: &str) -> EvalError {
        EvalError::Parse { detail: format!("{} (token {})", detail, self.pos) }
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_not()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, EvalError> {
        if self.eat(&Token::Not) {
            // Cuidado con la ambigüedad `not in`: tras un `not` debe venir
            // un predicado, y `in` nunca abre uno.
            if self.peek() == Some(&Token::In) {
                return Err(self.error("`not in` requires a left-hand atom"));
            }
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        if self.eat(&Token::LParen) {
            let inner = self.parse_or()?;
            if !self.eat(&Token::RParen) {
                return Err(self.error("expected `)`"));
            }
            return Ok(inner);
        }
        let lhs = self.parse_atom()?;
        match self.bump() {
            Some(Token::Cmp(op)) => {
                let rhs = self.parse_atom()?;
                Ok(Expr::Cmp { op, lhs, rhs })
            }
            Some(Token::In) => {
                let list = self.parse_list()?;
                Ok(Expr::InList { needle: lhs, list, negated: false })
            }
            Some(Token::Not) => {
                if !self.eat(&Token::In) {
                    return Err(self.error("expected `in` after `not`"));
                }
                let list = self.parse_list()?;
                Ok(Expr::InList { needle: lhs, list, negated: true })
            }
            _ => Err(self.error("expected comparison or `in` after atom")),
        }
    }

    fn parse_atom(&mut self) -> Result<Atom, EvalError> {
        match self.bump() {
            Some(Token::Var(name)) => Ok(Atom::Var(name)),
            Some(Token::Lit(value)) => Ok(Atom::Lit(value)),
            _ => Err(self.error("expected atom")),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Atom>, EvalError> {
        if !self.eat(&Token::LBracket) {
            return Err(self.error("expected `[`"));
        }
        let mut items = Vec::new();
        if self.eat(&Token::RBracket) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_atom()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            if self.eat(&Token::RBracket) {
                return Ok(items);
            }
            return Err(self.error("expected `,` or `]` in list"));
        }
    }
}
